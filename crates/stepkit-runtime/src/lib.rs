// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Step function runtime
//!
//! Discovers step functions described by descriptor resources, classifies
//! their implementation types into one of three calling conventions and
//! invokes them with loosely-typed arguments:
//!
//! ```ignore
//! let registry = FunctionRegistry::from_config(&RegistryConfig::from_env()?)?;
//! let result = registry.invoke("hello", &arguments, &InvocationContext::default())?;
//! ```
//!
//! Implementation types describe themselves with `#[derive(StepArguments)]`,
//! `#[step_methods]` and [`register_step_type!`]; nothing is discovered by
//! runtime reflection.

// Allows generated `::stepkit_runtime::...` paths inside this crate
extern crate self as stepkit_runtime;

// Error taxonomy
pub mod error;

// Invocation context and step logger
pub mod context;

// Capability traits implemented by step types
pub mod object;

// Static registration of step types
pub mod step_type;

// Type name resolution
pub mod loader;

// Argument binding
pub mod binder;

// Step functions for each calling convention
pub mod dispatch;

// Where descriptor resources are found
pub mod scope;

// Name to function map
pub mod registry;

// Environment configuration
pub mod config;

pub use config::{ConfigError, RegistryConfig};
pub use context::{InvocationContext, LogLevel, LogSink, Logger, MemorySink, TracingSink};
pub use dispatch::{CallableFunction, ContextFunction, MethodFunction, StepFunction};
pub use error::{BindingError, EntryPointError, PropertyError, Result, StepError};
pub use loader::{InventoryTypeLoader, StaticTypeLoader, TypeLoader};
pub use object::{
    Apply, Arguments, BoundContext, Callable, ContextArgument, ContextParameter, MethodEntry,
    StepArguments, StepMethods, StepObject,
};
pub use registry::FunctionRegistry;
pub use scope::{Resource, SearchScope};
pub use step_type::{ApplyEntry, CallEntry, ParentLink, StepTypeDescriptor, StepTypeRegistration};

pub use stepkit_dsl;
pub use stepkit_dsl::{ArgumentMetadata, StepMetadata};
pub use stepkit_macro::{StepArguments, step_methods};

#[doc(hidden)]
pub mod __private {
    pub use anyhow;
    pub use inventory;
    pub use serde_json;
}
