//! Session configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config:
//!
//! ```text
//! { "verbose": true, "log_level": "execution", "ownership_policy": "copy" }
//! ```

use serde::{Deserialize, Serialize};

use crate::log::LogLevel;
use crate::model::Preferences;
use crate::ownership::OwnershipDecision;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Default verbosity for new owners.
    pub verbose: bool,
    /// Default log level for new owners.
    pub log_level: LogLevel,
    /// Answer given to ownership conflicts unless an owner installs its own arbiter.
    pub ownership_policy: OwnershipDecision,
    /// Run the combination-function output check when States are constructed.
    pub param_validation: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_level: LogLevel::Off,
            ownership_policy: OwnershipDecision::Reassign,
            param_validation: true,
        }
    }
}

impl SessionConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Preferences handed to each new Mechanism.
    pub fn preferences(&self) -> Preferences {
        Preferences { verbose: self.verbose, log_level: self.log_level }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(SessionConfig::from_json_str("{}").unwrap(), SessionConfig::default());
    }

    #[test]
    fn test_partial_json() {
        let cfg = SessionConfig::from_json_str(
            r#"{"verbose": true, "log_level": "value_assignment", "ownership_policy": "default"}"#,
        )
        .unwrap();
        assert!(cfg.verbose);
        assert_eq!(cfg.log_level, LogLevel::ValueAssignment);
        assert_eq!(cfg.ownership_policy, OwnershipDecision::Default);
        assert!(cfg.param_validation);
    }

    #[test]
    fn test_bad_json_is_error() {
        assert!(SessionConfig::from_json_str(r#"{"log_level": "sometimes"}"#).is_err());
    }
}
