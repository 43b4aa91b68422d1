use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Numeric error codes reported by the sensor hub driver.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum HubErrorCode {
    /// Waiting on the hub or a channel ran past its deadline.
    Timeout = 3,

    /// Reading from or writing to the hub connection failed.
    Io = 5,

    /// The channel was used before it attached.
    NotAttached = 52,

    /// The hub answered with something that doesn't decode or doesn't fit
    /// the request.
    Protocol = 56,

    /// The hub reported a fault on the channel.
    Device = 60,
}

impl HubErrorCode {
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Short human readable description of the code.
    pub fn description(&self) -> &'static str {
        match self {
            HubErrorCode::Timeout => "Timed Out",
            HubErrorCode::Io => "IO Issue",
            HubErrorCode::NotAttached => "Device not Attached",
            HubErrorCode::Protocol => "Unexpected Response",
            HubErrorCode::Device => "Device Fault",
        }
    }
}

impl Display for HubErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Error raised by the sensor hub driver.
/// Carries the numeric code, its description and detail on what was going on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Hub error {code} ({description}): {detail}")]
pub struct HubError {
    pub code: HubErrorCode,
    pub description: String,
    pub detail: String,
}

impl HubError {
    pub fn new(code: HubErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            description: code.description().to_string(),
            detail: detail.into(),
        }
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(HubErrorCode::Timeout, detail)
    }

    pub fn io(detail: impl Into<String>) -> Self {
        Self::new(HubErrorCode::Io, detail)
    }

    pub fn not_attached(detail: impl Into<String>) -> Self {
        Self::new(HubErrorCode::NotAttached, detail)
    }

    pub fn protocol(detail: impl Into<String>) -> Self {
        Self::new(HubErrorCode::Protocol, detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_code_description_detail() {
        let err = HubError::timeout("Hub port 1 didn't attach within 5000 ms.");
        assert_eq!(err.code.code(), 3);
        assert_eq!(
            err.to_string(),
            "Hub error 3 (Timed Out): Hub port 1 didn't attach within 5000 ms."
        );
    }
}
