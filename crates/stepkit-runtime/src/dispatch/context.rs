// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use stepkit_dsl::StepMetadata;
use tracing::debug;

use super::{StepFunction, Target};
use crate::binder::{bind_context, with_presentation_defaults};
use crate::context::InvocationContext;
use crate::error::StepError;
use crate::object::Arguments;
use crate::step_type::ApplyEntry;

/// Step function backed by a single-argument `apply` entry point.
///
/// The parameter is either the caller's mapping, passed through, or a
/// fresh argument holder with the mapping bound onto it.
pub struct ContextFunction {
    metadata: Arc<StepMetadata>,
    target: Target,
    entry: ApplyEntry,
}

impl ContextFunction {
    pub(crate) fn new(metadata: Arc<StepMetadata>, target: Target, entry: ApplyEntry) -> Self {
        Self {
            metadata,
            target,
            entry,
        }
    }

    /// Declared type of the entry point's parameter
    pub fn parameter_type(&self) -> &str {
        &self.entry.parameter_type
    }
}

impl StepFunction for ContextFunction {
    fn metadata(&self) -> &StepMetadata {
        &self.metadata
    }

    fn invoke(&self, arguments: &Arguments, context: &InvocationContext) -> Result<Value, StepError> {
        debug!(function = %self.metadata.name(), entry_point = %self.entry_point(), "Invoking");

        let mut instance = self.target.instantiate(context);
        let bound = bind_context(&self.entry.parameter, arguments, context)?;

        let owner = self.target.project(instance.as_mut())?;
        (self.entry.invoke)(owner, bound)
            .map_err(|e| e.into_step_error(self.metadata.name(), &self.entry_point()))
    }

    fn describe_default_arguments(
        &self,
        arguments: &Arguments,
        context: &InvocationContext,
    ) -> Result<Arguments, StepError> {
        let bound = bind_context(&self.entry.parameter, arguments, context)?;
        Ok(with_presentation_defaults(
            bound.describe(),
            self.metadata.arguments(),
        ))
    }

    fn entry_point(&self) -> String {
        self.target
            .entry_point(&format!("apply({})", self.entry.parameter_type))
    }
}

impl fmt::Debug for ContextFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ContextFunction{{{}::{}({})}}",
            self.target.type_name,
            self.metadata.name(),
            self.entry.parameter_type
        )
    }
}
