//! Response classification.
//!
//! Many storefront challenge pages answer 200, so the body is inspected as
//! well as the status.

use reqwest::StatusCode;

/// Verdict on one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Usable,
    /// Non-success status.
    BlockedStatus(u16),
    /// Body contained a challenge marker.
    BlockedMarker(String),
}

impl Verdict {
    pub fn is_usable(&self) -> bool {
        matches!(self, Verdict::Usable)
    }

    /// Human-readable reason for a blocked verdict.
    pub fn reason(&self) -> Option<String> {
        match self {
            Verdict::Usable => None,
            Verdict::BlockedStatus(code) => Some(format!("HTTP {}", code)),
            Verdict::BlockedMarker(marker) => Some(format!("challenge page detected ('{}')", marker)),
        }
    }
}

/// Classify a response. `markers` are expected lower-case.
pub fn classify(status: StatusCode, body: &str, markers: &[String]) -> Verdict {
    if !status.is_success() {
        return Verdict::BlockedStatus(status.as_u16());
    }

    let lowered = body.to_lowercase();
    markers
        .iter()
        .find(|m| lowered.contains(m.as_str()))
        .map(|m| Verdict::BlockedMarker(m.clone()))
        .unwrap_or(Verdict::Usable)
}
