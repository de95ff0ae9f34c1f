// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use stepkit_dsl::StepMetadata;
use tracing::debug;

use super::{StepFunction, Target};
use crate::binder::{bind_properties, with_presentation_defaults};
use crate::context::InvocationContext;
use crate::error::StepError;
use crate::object::Arguments;
use crate::step_type::CallEntry;

/// Step function backed by a zero-argument `call` entry point.
pub struct CallableFunction {
    metadata: Arc<StepMetadata>,
    target: Target,
    entry: CallEntry,
}

impl CallableFunction {
    pub(crate) fn new(metadata: Arc<StepMetadata>, target: Target, entry: CallEntry) -> Self {
        Self {
            metadata,
            target,
            entry,
        }
    }
}

impl StepFunction for CallableFunction {
    fn metadata(&self) -> &StepMetadata {
        &self.metadata
    }

    fn invoke(&self, arguments: &Arguments, context: &InvocationContext) -> Result<Value, StepError> {
        debug!(function = %self.metadata.name(), entry_point = %self.entry_point(), "Invoking");

        let mut instance = self.target.instantiate(context);
        bind_properties(instance.as_mut(), arguments, self.target.type_name)?;

        let owner = self.target.project(instance.as_mut())?;
        (self.entry.invoke)(owner)
            .map_err(|e| e.into_step_error(self.metadata.name(), &self.entry_point()))
    }

    fn describe_default_arguments(
        &self,
        arguments: &Arguments,
        context: &InvocationContext,
    ) -> Result<Arguments, StepError> {
        let mut instance = self.target.instantiate(context);
        bind_properties(instance.as_mut(), arguments, self.target.type_name)?;
        Ok(with_presentation_defaults(
            instance.describe(),
            self.metadata.arguments(),
        ))
    }

    fn entry_point(&self) -> String {
        self.target.entry_point("call")
    }
}

impl fmt::Debug for CallableFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallableFunction{{{}::{}()}}", self.target.type_name, self.metadata.name())
    }
}
