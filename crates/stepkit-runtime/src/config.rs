// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Registry configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

/// How a [`FunctionRegistry`](crate::FunctionRegistry) finds and validates
/// its functions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Directories searched for descriptor resources
    pub search_path: Vec<PathBuf>,
    /// Whether descriptors embedded into the binary are searched too
    pub embedded: bool,
    /// Abort loading on the first misconfigured implementation type
    pub strict: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            search_path: Vec::new(),
            embedded: true,
            strict: false,
        }
    }
}

impl RegistryConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional (with defaults):
    /// - `STEPKIT_SEARCH_PATH`: directories in the platform's path-list
    ///   format (default: none)
    /// - `STEPKIT_EMBEDDED`: search embedded descriptors (default: true)
    /// - `STEPKIT_STRICT`: fail on misconfigured types (default: false)
    pub fn from_env() -> Result<Self, ConfigError> {
        let search_path = env::var_os("STEPKIT_SEARCH_PATH")
            .map(|paths| {
                env::split_paths(&paths)
                    .filter(|p| !p.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let embedded = flag("STEPKIT_EMBEDDED", true)?;
        let strict = flag("STEPKIT_STRICT", false)?;

        Ok(Self {
            search_path,
            embedded,
            strict,
        })
    }
}

fn flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    let Ok(value) = env::var(name) else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "" => Ok(default),
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid(name, "must be true or false")),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to serialize tests that modify environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Sets env vars for a test and restores them after
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new() -> Self {
            Self { vars: Vec::new() }
        }

        fn set(&mut self, key: &str, value: &str) {
            let old = env::var(key).ok();
            self.vars.push((key.to_string(), old));
            // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
            unsafe { env::set_var(key, value) };
        }

        fn remove(&mut self, key: &str) {
            let old = env::var(key).ok();
            self.vars.push((key.to_string(), old));
            // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
            unsafe { env::remove_var(key) };
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.vars.drain(..).rev() {
                // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
                unsafe {
                    match value {
                        Some(v) => env::set_var(&key, v),
                        None => env::remove_var(&key),
                    }
                }
            }
        }
    }

    #[test]
    fn test_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();
        guard.remove("STEPKIT_SEARCH_PATH");
        guard.remove("STEPKIT_EMBEDDED");
        guard.remove("STEPKIT_STRICT");

        let config = RegistryConfig::from_env().unwrap();
        assert_eq!(config, RegistryConfig::default());
        assert!(config.embedded);
        assert!(!config.strict);
    }

    #[test]
    fn test_search_path_is_split() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();
        let joined = env::join_paths(["/opt/steps", "/srv/steps"]).unwrap();
        guard.set("STEPKIT_SEARCH_PATH", joined.to_str().unwrap());

        let config = RegistryConfig::from_env().unwrap();
        assert_eq!(
            config.search_path,
            vec![PathBuf::from("/opt/steps"), PathBuf::from("/srv/steps")]
        );
    }

    #[test]
    fn test_flags() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();
        guard.set("STEPKIT_EMBEDDED", "no");
        guard.set("STEPKIT_STRICT", "TRUE");

        let config = RegistryConfig::from_env().unwrap();
        assert!(!config.embedded);
        assert!(config.strict);
    }

    #[test]
    fn test_invalid_flag() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();
        guard.set("STEPKIT_STRICT", "sometimes");

        let err = RegistryConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("STEPKIT_STRICT", _)));
        assert!(err.to_string().contains("STEPKIT_STRICT"));
    }
}
