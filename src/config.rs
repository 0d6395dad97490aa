//! Store-wide settings shared by the calculator, the codec and the CLI.

use thiserror::Error;

/// Default number of positions per persisted window.
pub const DEFAULT_WINDOW_SIZE: u32 = 100;

/// Filter value marking a passing call.
pub const DEFAULT_PASS_TOKEN: &str = "PASS";

/// Invalid configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Window size must be positive.
    #[error("window size must be greater than zero")]
    ZeroWindowSize,

    /// Pass token must not be blank.
    #[error("pass token must not be empty")]
    EmptyPassToken,
}

/// Configuration of the allele store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Positions covered by one encoded window.
    pub window_size: u32,

    /// Filter value treated as passing.
    pub pass_token: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            pass_token: DEFAULT_PASS_TOKEN.to_string(),
        }
    }
}

impl StoreConfig {
    /// Override the encoded window size.
    pub fn with_window_size(mut self, window_size: u32) -> Self {
        self.window_size = window_size;
        self
    }

    /// Override the passing filter value.
    pub fn with_pass_token(mut self, pass_token: impl Into<String>) -> Self {
        self.pass_token = pass_token.into();
        self
    }

    /// Check the values before use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::ZeroWindowSize);
        }
        if self.pass_token.trim().is_empty() {
            return Err(ConfigError::EmptyPassToken);
        }
        Ok(())
    }
}
