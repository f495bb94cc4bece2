// Copyright (c) 2022-2023 The pinentry-trezor Authors

//! Environment derived configuration, read once at startup

use std::{path::PathBuf, str::FromStr};

use crate::keypad::{Keypad, Keyset};

/// Display server address, selects the interactive front end
pub const ENV_DISPLAY: &str = "DISPLAY";

/// Set to `1` to disable key flash feedback
pub const ENV_DONT_FLASH: &str = "PINENTRY_TREZOR_DONT_FLASH";

/// Operator keyset (exactly nine symbols)
pub const ENV_KEYSET: &str = "PINENTRY_TREZOR_KEYSET";

/// Set to `1` to omit the keypad grid from terminal prompts
pub const ENV_DONT_EXPLAIN: &str = "PINENTRY_TREZOR_DONT_EXPLAIN";

/// Replaces the caller-provided description on every GETPIN
pub const ENV_FORCE_MESSAGE: &str = "PINENTRY_TREZOR_FORCE_MESSAGE";

/// Enables diagnostic logging to the given file
pub const ENV_LOG_PATH: &str = "PINENTRY_TREZOR_LOG_PATH";

/// PIN entry configuration
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Display target (initial value, `OPTION display=` may replace it per session)
    pub display: Option<String>,
    /// Flash keys on press in the interactive front end
    pub flash: bool,
    /// Operator-supplied keyset
    pub keyset: Option<String>,
    /// Append the keypad grid explanation to terminal prompts
    pub explain: bool,
    /// Message override for GETPIN
    pub force_message: Option<String>,
    /// Diagnostic log file
    pub log_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display: None,
            flash: true,
            keyset: None,
            explain: true,
            force_message: None,
            log_path: None,
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Load configuration using the provided variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |k: &str| lookup(k).filter(|v| !v.is_empty());
        let enabled = |k: &str| lookup(k).as_deref() == Some("1");

        Self {
            display: non_empty(ENV_DISPLAY),
            flash: !enabled(ENV_DONT_FLASH),
            keyset: non_empty(ENV_KEYSET),
            explain: !enabled(ENV_DONT_EXPLAIN),
            force_message: non_empty(ENV_FORCE_MESSAGE),
            log_path: non_empty(ENV_LOG_PATH).map(PathBuf::from),
        }
    }

    /// Build the keypad scheme for this configuration.
    ///
    /// An unusable operator keyset is reported and replaced by the built-in alternates.
    pub fn keypad(&self) -> Keypad {
        let keyset = match self.keyset.as_deref().map(Keyset::from_str) {
            Some(Ok(k)) => Some(k),
            Some(Err(_e)) => {
                #[cfg(feature = "log")]
                log::warn!("Ignoring {ENV_KEYSET}: {_e}");
                None
            }
            None => None,
        };

        match Keypad::with_keyset(keyset) {
            Ok(k) => k,
            Err(_e) => {
                #[cfg(feature = "log")]
                log::warn!("Ignoring {ENV_KEYSET}: {_e}");
                Keypad::default()
            }
        }
    }
}
