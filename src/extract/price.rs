//! Price text parsing.

/// Parse the first number in `raw` as a price.
///
/// Accepts currency symbols, surrounding words and thousands separators
/// (`"Now $1,299.99"`). A lone comma followed by other than three digits is
/// a decimal comma (`"12,99 €"`). Negative, non-finite or missing numbers
/// give `None`.
pub fn parse_price(raw: &str) -> Option<f64> {
    let start = raw.find(|c: char| c.is_ascii_digit())?;
    if raw[..start].trim_end().ends_with('-') {
        return None;
    }

    let token: String = raw[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    let token = token.trim_end_matches(|c: char| c == ',' || c == '.');

    let normalized = normalize_separators(token)?;
    let value: f64 = normalized.parse().ok()?;
    if value.is_finite() && value >= 0.0 {
        Some(value)
    } else {
        None
    }
}

fn normalize_separators(token: &str) -> Option<String> {
    let has_comma = token.contains(',');
    let has_dot = token.contains('.');

    if has_comma && has_dot {
        // "1.299,99" vs "1,299.99": the last separator is the decimal one.
        let last_comma = token.rfind(',')?;
        let last_dot = token.rfind('.')?;
        return Some(if last_dot > last_comma {
            token.replace(',', "")
        } else {
            token.replace('.', "").replace(',', ".")
        });
    }

    if has_comma {
        let groups: Vec<&str> = token.split(',').collect();
        let thousands = groups.len() > 1
            && groups[1..].iter().all(|g| g.len() == 3)
            && !groups[0].is_empty();
        return if thousands {
            Some(groups.concat())
        } else if groups.len() == 2 {
            Some(format!("{}.{}", groups[0], groups[1]))
        } else {
            None
        };
    }

    Some(token.to_string())
}
