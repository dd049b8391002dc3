//! Health state of a single subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State reported by a subsystem, and by the overall verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StatusState {
    #[default]
    Ok,
    Warning,
    Failure,
    Disabled,
}

impl StatusState {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusState::Ok => "Ok",
            StatusState::Warning => "Warning",
            StatusState::Failure => "Failure",
            StatusState::Disabled => "Disabled",
        }
    }

    /// `Ok` or `Disabled`; neither should hold up the overall verdict.
    pub fn is_ok_or_disabled(self) -> bool {
        matches!(self, StatusState::Ok | StatusState::Disabled)
    }
}

impl fmt::Display for StatusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state plus a human readable message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Status {
    pub state: StatusState,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub msg: String,
}

impl Status {
    pub fn new(state: StatusState, msg: impl Into<String>) -> Self {
        Self {
            state,
            msg: msg.into(),
        }
    }

    pub fn ok(msg: impl Into<String>) -> Self {
        Self::new(StatusState::Ok, msg)
    }

    pub fn warning(msg: impl Into<String>) -> Self {
        Self::new(StatusState::Warning, msg)
    }

    pub fn failure(msg: impl Into<String>) -> Self {
        Self::new(StatusState::Failure, msg)
    }

    pub fn disabled() -> Self {
        Self::new(StatusState::Disabled, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serializes_by_variant_name() {
        let json = serde_json::to_string(&Status::failure("boom")).unwrap();
        assert_eq!(json, r#"{"state":"Failure","msg":"boom"}"#);
    }

    #[test]
    fn test_empty_message_is_omitted() {
        let json = serde_json::to_string(&Status::disabled()).unwrap();
        assert_eq!(json, r#"{"state":"Disabled"}"#);

        let back: Status = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Status::disabled());
    }

    #[test]
    fn test_ok_or_disabled() {
        assert!(StatusState::Ok.is_ok_or_disabled());
        assert!(StatusState::Disabled.is_ok_or_disabled());
        assert!(!StatusState::Warning.is_ok_or_disabled());
        assert!(!StatusState::Failure.is_ok_or_disabled());
    }
}
