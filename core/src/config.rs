/// Configuration management
use crate::error::{CircleError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_DATA_DIR: &str = ".circle";
const DEFAULT_EVENT_CAPACITY: usize = 256;

/// What happens to a contact's thread when the contact is removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Clear the thread and delete its storage key
    #[default]
    PurgeThread,
    /// Keep the thread so re-adding the contact restores it
    RetainThread,
}

/// Circle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the sled database
    pub data_dir: PathBuf,

    /// Thread handling on contact removal
    pub removal_policy: RemovalPolicy,

    /// Buffered events per subscriber before it starts lagging
    pub event_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            removal_policy: RemovalPolicy::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl Config {
    /// Parse leading flags from command line arguments.
    ///
    /// `args[0]` is the program name. Flags are read up to the first word that
    /// is not a flag; that word and everything after it is returned as the
    /// command.
    pub fn from_args(args: &[String]) -> Result<(Self, Vec<String>)> {
        let mut config = Self::default();

        // Env first, flags win
        if let Ok(dir) = std::env::var("CIRCLE_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }
        if std::env::var("CIRCLE_KEEP_THREADS").is_ok() {
            config.removal_policy = RemovalPolicy::RetainThread;
        }

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--data-dir" => {
                    let path = args.get(i + 1).ok_or_else(|| {
                        CircleError::Config("--data-dir requires a path argument".to_string())
                    })?;
                    config.data_dir = PathBuf::from(path);
                    i += 2;
                }
                "--keep-threads" => {
                    config.removal_policy = RemovalPolicy::RetainThread;
                    i += 1;
                }
                flag if flag.starts_with("--") => {
                    return Err(CircleError::Config(format!("Unknown flag: {}", flag)));
                }
                _ => break,
            }
        }

        let command = args.get(i..).map(<[String]>::to_vec).unwrap_or_default();
        Ok((config, command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_flags_then_command() {
        let (config, command) = Config::from_args(&args(&[
            "circle",
            "--data-dir",
            "/tmp/c",
            "--keep-threads",
            "send",
            "Ann",
            "--not-a-flag",
        ]))
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/c"));
        assert_eq!(config.removal_policy, RemovalPolicy::RetainThread);
        assert_eq!(command, args(&["send", "Ann", "--not-a-flag"]));
    }

    #[test]
    fn test_missing_flag_value() {
        let err = Config::from_args(&args(&["circle", "--data-dir"])).unwrap_err();
        assert!(matches!(err, CircleError::Config(_)));
    }

    #[test]
    fn test_unknown_flag() {
        assert!(Config::from_args(&args(&["circle", "--loud", "contacts"])).is_err());
    }

    #[test]
    fn test_no_command() {
        let (_, command) = Config::from_args(&args(&["circle"])).unwrap();
        assert!(command.is_empty());
    }
}
