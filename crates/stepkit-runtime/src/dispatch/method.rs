// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use stepkit_dsl::StepMetadata;
use tracing::debug;

use super::{StepFunction, Target};
use crate::binder::with_presentation_defaults;
use crate::context::InvocationContext;
use crate::error::StepError;
use crate::object::{Arguments, MethodEntry};

/// Step function backed by a `#[step]` method.
///
/// Each parameter is looked up by its binding name, coerced to the declared
/// type and passed in order. Absent values stay absent: `Option`
/// parameters receive `None`, anything else is a binding error. Defaults are
/// never applied at invocation.
///
/// Describing creates the instance and checks supplied parameters the same
/// way, but leaves absent ones absent so presentation defaults can fill them.
pub struct MethodFunction {
    metadata: Arc<StepMetadata>,
    target: Target,
    entry: MethodEntry,
}

impl MethodFunction {
    pub(crate) fn new(metadata: Arc<StepMetadata>, target: Target, entry: MethodEntry) -> Self {
        Self {
            metadata,
            target,
            entry,
        }
    }

    pub fn method_name(&self) -> &'static str {
        self.entry.method_name
    }
}

impl StepFunction for MethodFunction {
    fn metadata(&self) -> &StepMetadata {
        &self.metadata
    }

    fn invoke(&self, arguments: &Arguments, context: &InvocationContext) -> Result<Value, StepError> {
        debug!(function = %self.metadata.name(), entry_point = %self.entry_point(), "Invoking");

        let mut instance = self.target.instantiate(context);
        let owner = self.target.project(instance.as_mut())?;
        (self.entry.invoke)(owner, arguments)
            .map_err(|e| e.into_step_error(self.metadata.name(), &self.entry_point()))
    }

    fn describe_default_arguments(
        &self,
        arguments: &Arguments,
        context: &InvocationContext,
    ) -> Result<Arguments, StepError> {
        let mut instance = self.target.instantiate(context);
        self.target.project(instance.as_mut())?;

        let values = (self.entry.describe)(arguments)?;
        Ok(with_presentation_defaults(values, self.metadata.arguments()))
    }

    fn entry_point(&self) -> String {
        self.target.entry_point(self.entry.method_name)
    }
}

impl fmt::Debug for MethodFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodFunction{{{}::{}()}}", self.target.type_name, self.entry.method_name)
    }
}
