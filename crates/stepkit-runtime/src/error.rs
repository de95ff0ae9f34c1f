// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for stepkit-runtime.
//!
//! Discovery problems (`Configuration`, `TypeNotFound`) are per registry
//! entry; binding and invocation problems are per call. None of them leave
//! the registry in a different state.

use serde_json::Value;

/// Result type using StepError
pub type Result<T> = std::result::Result<T, StepError>;

/// Errors raised while loading or invoking step functions.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StepError {
    /// No function is registered under the requested name.
    #[error("function '{name}' not found")]
    FunctionNotFound {
        /// The requested name.
        name: String,
    },

    /// An implementation type was loaded but does not provide the function.
    #[error("function '{name}' not found on type {type_name}")]
    FunctionNotFoundForType { name: String, type_name: String },

    /// The implementation type matches no dispatch form, or its description
    /// is inconsistent.
    #[error("invalid step type {type_name}: {reason}")]
    Configuration { type_name: String, reason: String },

    /// A descriptor names a type the loader cannot resolve.
    #[error("cannot load type {type_name} for function '{function}'")]
    TypeNotFound { function: String, type_name: String },

    #[error(transparent)]
    Binding(#[from] BindingError),

    /// The entry point itself failed.
    #[error("function '{function}' failed in {entry_point}: {source}")]
    Invocation {
        function: String,
        entry_point: String,
        #[source]
        source: anyhow::Error,
    },

    /// A descriptor resource could not be read.
    #[error("failed to read descriptor {origin}: {source}")]
    Resource {
        origin: String,
        #[source]
        source: std::io::Error,
    },
}

impl StepError {
    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::FunctionNotFound { .. } => "FUNCTION_NOT_FOUND",
            Self::FunctionNotFoundForType { .. } => "FUNCTION_NOT_FOUND_FOR_TYPE",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::TypeNotFound { .. } => "TYPE_NOT_FOUND",
            Self::Binding(_) => "BINDING_ERROR",
            Self::Invocation { .. } => "INVOCATION_ERROR",
            Self::Resource { .. } => "RESOURCE_ERROR",
        }
    }

    /// Whether this is a discovery-time problem with a single entry
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. }
                | Self::TypeNotFound { .. }
                | Self::FunctionNotFoundForType { .. }
        )
    }

    pub(crate) fn configuration(type_name: &str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }
}

/// An argument could not be bound to its target.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot bind argument '{argument}' of {type_name} to {value}: {reason}")]
pub struct BindingError {
    /// Property or parameter name
    pub argument: String,
    /// Type the argument was bound onto
    pub type_name: String,
    /// The offending value
    pub value: Value,
    pub reason: String,
}

/// Failure to assign a single property on an argument holder.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropertyError {
    /// The holder has no such property. The value is handed back so the
    /// caller can offer it to another holder.
    #[error("unknown property '{name}'")]
    Unknown { name: String, value: Value },

    /// The value does not fit the declared type.
    #[error("property '{name}' expects {expected}: {reason}")]
    Mismatch {
        name: String,
        expected: String,
        value: Value,
        reason: String,
    },
}

impl PropertyError {
    /// Attaches the holder type, producing a binding error
    pub fn into_binding(self, type_name: &str) -> BindingError {
        match self {
            Self::Unknown { name, value } => BindingError {
                argument: name,
                type_name: type_name.to_string(),
                value,
                reason: "no such property".to_string(),
            },
            Self::Mismatch {
                name,
                expected,
                value,
                reason,
            } => BindingError {
                argument: name,
                type_name: type_name.to_string(),
                value,
                reason: format!("expected {}: {}", expected, reason),
            },
        }
    }
}

/// Failure raised by a generated entry-point adapter
#[derive(Debug)]
pub enum EntryPointError {
    /// Parameters could not be bound; the entry point was not called
    Binding(BindingError),
    /// The entry point ran and failed, or its output could not be serialized
    Failed(anyhow::Error),
}

impl From<BindingError> for EntryPointError {
    fn from(err: BindingError) -> Self {
        Self::Binding(err)
    }
}

impl EntryPointError {
    /// Converts into a `StepError` naming the function and entry point
    pub fn into_step_error(self, function: &str, entry_point: &str) -> StepError {
        match self {
            Self::Binding(err) => StepError::Binding(err),
            Self::Failed(source) => StepError::Invocation {
                function: function.to_string(),
                entry_point: entry_point.to_string(),
                source,
            },
        }
    }
}
