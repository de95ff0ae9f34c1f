// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Step functions: the uniform invocation contract over the three calling
//! conventions.
//!
//! - [`CallableFunction`]: zero-argument entry point, arguments bound as
//!   properties of the instance
//! - [`ContextFunction`]: single-argument entry point, arguments passed as
//!   a raw mapping or bound onto a fresh holder
//! - [`MethodFunction`]: a `#[step]` method, arguments bound per parameter
//!
//! Every invocation constructs a fresh instance, injects the context, binds
//! and calls. Instances never outlive a call.

mod callable;
mod context;
mod method;
pub(crate) mod select;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use stepkit_dsl::StepMetadata;

use crate::context::InvocationContext;
use crate::error::StepError;
use crate::object::{Arguments, StepObject};
use crate::step_type::Projection;

pub use callable::CallableFunction;
pub use context::ContextFunction;
pub use method::MethodFunction;

/// A discovered, invokable step function
pub trait StepFunction: Send + Sync + fmt::Debug {
    fn metadata(&self) -> &StepMetadata;

    /// Creates a fresh instance, binds `arguments` and calls the entry point
    fn invoke(&self, arguments: &Arguments, context: &InvocationContext)
    -> Result<Value, StepError>;

    /// Binds `arguments` like [`invoke`](Self::invoke) but returns the bound
    /// argument values instead of calling. Unset arguments show their
    /// presentation default.
    fn describe_default_arguments(
        &self,
        arguments: &Arguments,
        context: &InvocationContext,
    ) -> Result<Arguments, StepError>;

    /// `type::entry` identity used in error reports
    fn entry_point(&self) -> String;
}

/// The implementation type a function instantiates, plus the projection
/// chain from a fresh instance to the level holding the entry point.
#[derive(Clone)]
pub(crate) struct Target {
    pub type_name: &'static str,
    pub construct: fn() -> Box<dyn StepObject>,
    pub chain: Arc<[Projection]>,
    /// Type declaring the entry point
    pub owner: &'static str,
}

impl Target {
    /// A fresh instance with the ambient state injected
    pub fn instantiate(&self, context: &InvocationContext) -> Box<dyn StepObject> {
        let mut instance = (self.construct)();
        instance.inject_context(context);
        instance
    }

    /// Walks the projection chain down to the entry-point owner
    pub fn project<'a>(
        &self,
        instance: &'a mut dyn StepObject,
    ) -> Result<&'a mut dyn StepObject, StepError> {
        let mut current = instance;
        for project in self.chain.iter() {
            current = project(current).ok_or_else(|| {
                StepError::configuration(
                    self.type_name,
                    format!("cannot reach embedded {} instance", self.owner),
                )
            })?;
        }
        Ok(current)
    }

    pub fn entry_point(&self, entry: &str) -> String {
        format!("{}::{}", self.owner, entry)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("type_name", &self.type_name)
            .field("owner", &self.owner)
            .field("depth", &self.chain.len())
            .finish()
    }
}
