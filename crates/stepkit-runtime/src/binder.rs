// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Argument binding shared by the dispatch variants.

use serde_json::Value;
use stepkit_dsl::ArgumentMetadata;

use crate::context::InvocationContext;
use crate::error::{BindingError, PropertyError};
use crate::object::{Arguments, BoundContext, ContextParameter, StepObject};

/// Assigns every caller-supplied entry as a property of `target`.
///
/// Null values count as absent: an `Option` property is cleared, any other
/// property keeps its value. Property names are checked regardless of the
/// value, so the first unknown property or type mismatch aborts binding.
pub fn bind_properties(
    target: &mut dyn StepObject,
    arguments: &Arguments,
    type_name: &str,
) -> Result<(), BindingError> {
    for (name, value) in arguments {
        match target.set_property(name, value.clone()) {
            Ok(()) => {}
            Err(PropertyError::Mismatch { .. }) if value.is_null() => {}
            Err(e) => return Err(e.into_binding(type_name)),
        }
    }
    Ok(())
}

/// Produces the parameter of a context entry point
pub fn bind_context(
    parameter: &ContextParameter,
    arguments: &Arguments,
    context: &InvocationContext,
) -> Result<BoundContext, BindingError> {
    match parameter {
        ContextParameter::Map => Ok(BoundContext::Map(arguments.clone())),
        ContextParameter::Object {
            type_name,
            construct,
            ..
        } => {
            let mut holder = construct();
            holder.inject_context(context);
            bind_properties(holder.as_mut(), arguments, type_name)?;
            Ok(BoundContext::Object(holder))
        }
    }
}

/// Fills absent or null entries with the presentation defaults from metadata
pub fn with_presentation_defaults(
    mut values: Arguments,
    metadata: &[ArgumentMetadata],
) -> Arguments {
    for argument in metadata {
        let Some(default) = argument.default_value() else {
            continue;
        };
        let unset = values.get(argument.name()).is_none_or(Value::is_null);
        if unset {
            values.insert(argument.name().to_string(), default.clone());
        }
    }
    values
}
