//! Idle Phase Value Object

use derive_more::Display;
use serde::Serialize;

/// Idle supervisor state
///
/// `Inactive -> Active -> Warning -> Expired`; a new session re-enters
/// `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum IdlePhase {
    /// No session
    #[default]
    #[display("inactive")]
    Inactive,
    /// Session live, warning timer armed
    #[display("active")]
    Active,
    /// Warning shown, forced logout countdown running
    #[display("warning")]
    Warning,
    /// Session force-expired
    #[display("expired")]
    Expired,
}

impl IdlePhase {
    /// A session is being supervised
    #[inline]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Active | Self::Warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_phases() {
        assert!(!IdlePhase::Inactive.is_live());
        assert!(IdlePhase::Active.is_live());
        assert!(IdlePhase::Warning.is_live());
        assert!(!IdlePhase::Expired.is_live());
    }

    #[test]
    fn test_display() {
        assert_eq!(IdlePhase::Warning.to_string(), "warning");
        assert_eq!(IdlePhase::default().to_string(), "inactive");
    }
}
