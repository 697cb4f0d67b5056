use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot of the credential store.
///
/// `target` is always `Some` and non-empty while `is_connected` is true, and
/// both fields are cleared together on disconnect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub target: Option<String>,
    pub is_connected: bool,
}

impl Credentials {
    pub(crate) fn connected(target: String) -> Self {
        Self {
            target: Some(target),
            is_connected: true,
        }
    }

    /// Target of an active connection, if any.
    pub fn active_target(&self) -> Option<&str> {
        if self.is_connected {
            self.target.as_deref()
        } else {
            None
        }
    }
}

/// Handle returned by `CredentialStore::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_disconnected() {
        let credentials = Credentials::default();
        assert!(!credentials.is_connected);
        assert_eq!(credentials.target, None);
        assert_eq!(credentials.active_target(), None);
    }

    #[test]
    fn test_connected_exposes_target() {
        let credentials = Credentials::connected("10.0.0.5".to_string());
        assert_eq!(credentials.active_target(), Some("10.0.0.5"));
    }

    #[test]
    fn test_serialization_round_trip_shape() {
        let json = serde_json::to_value(Credentials::connected("10.0.0.5".into())).unwrap();
        assert_eq!(json["target"], "10.0.0.5");
        assert_eq!(json["is_connected"], true);
    }
}
