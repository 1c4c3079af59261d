//! Watcher configuration

use pollwatch_core::Op;
use serde::{Deserialize, Serialize};

/// Initial configuration for a [`Watcher`](crate::Watcher)
///
/// Everything except the channel capacities can also be changed on a live
/// watcher through its mutators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Exclude dot-files and dot-directories (default: false)
    #[serde(default)]
    pub ignore_hidden: bool,

    /// Maximum events delivered per tick, 0 = unlimited (default: 0)
    #[serde(default)]
    pub max_events: usize,

    /// Operation kinds to deliver, empty = all (default: empty)
    #[serde(default)]
    pub ops: Vec<Op>,

    /// Event channel capacity (default: 64)
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Error channel capacity (default: 16)
    #[serde(default = "default_error_capacity")]
    pub error_capacity: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            ignore_hidden: false,
            max_events: 0,
            ops: vec![],
            event_capacity: default_event_capacity(),
            error_capacity: default_error_capacity(),
        }
    }
}

fn default_event_capacity() -> usize {
    64
}

fn default_error_capacity() -> usize {
    16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: WatchConfig = toml::from_str(
            r#"
            ignore_hidden = true
            ops = ["WRITE", "RENAME"]
            "#,
        )
        .unwrap();

        assert!(config.ignore_hidden);
        assert_eq!(config.ops, vec![Op::Write, Op::Rename]);
        assert_eq!(config.max_events, 0);
        assert_eq!(config.event_capacity, 64);
        assert_eq!(config.error_capacity, 16);
    }

    #[test]
    fn test_empty_toml_matches_default() {
        let config: WatchConfig = toml::from_str("").unwrap();
        assert_eq!(config, WatchConfig::default());
    }
}
