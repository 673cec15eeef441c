// Copyright 2025 Power Tuner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy shared by every stage of the analytics engine.
//!
//! Record-level problems ([`Error::Parse`], [`Error::FunctionalInvocation`])
//! are logged and folded into counts by the batch stages. Caller contract
//! violations ([`Error::InvalidInput`]) stop the current call. A configuration
//! without usable samples ([`Error::InsufficientData`]) only removes that
//! configuration from ranking.

use crate::types::ConfigurationKey;
use thiserror::Error;

/// Errors produced by the analytics engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A single report did not match any recognized grammar.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A configuration has no non-error samples left to rank.
    #[error("Insufficient data for configuration {key}: {reason}")]
    InsufficientData {
        /// Configuration that was dropped.
        key: ConfigurationKey,
        /// Why no samples remained.
        reason: String,
    },

    /// Malformed caller input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An invocation signaled a functional error.
    #[error("Functional invocation error for request {request_id}: {message}")]
    FunctionalInvocation {
        /// Request that failed.
        request_id: String,
        /// Captured error text, if any.
        message: String,
    },
}

impl Error {
    /// Build a [`Error::Parse`].
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// Build a [`Error::InvalidInput`].
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Build a [`Error::InsufficientData`].
    pub fn insufficient_data(key: ConfigurationKey, reason: impl Into<String>) -> Self {
        Error::InsufficientData {
            key,
            reason: reason.into(),
        }
    }
}

/// Result alias used across the engine.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_message() {
        let err = Error::invalid_input("empty summary list");
        assert_eq!(err.to_string(), "Invalid input: empty summary list");
    }

    #[test]
    fn test_insufficient_data_names_configuration() {
        let err = Error::insufficient_data(ConfigurationKey::new(512), "no durations");
        assert!(err.to_string().contains("512"));
    }
}
