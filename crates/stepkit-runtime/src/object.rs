// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Capability traits implemented by step types and argument holders.
//!
//! `#[derive(StepArguments)]` implements [`StepObject`], [`StepArguments`]
//! and [`ContextArgument`] for a struct: a typed argument schema plus a
//! setter map, so binding is a match over known field names. Entry points
//! are declared with [`Callable`], [`Apply`] or `#[step_methods]`.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use stepkit_dsl::coercion::coerce_to_type;
use stepkit_dsl::{ArgumentSpec, StepMarker};

use crate::context::InvocationContext;
use crate::error::{BindingError, EntryPointError, PropertyError};

/// Caller-supplied name→value mapping
pub type Arguments = serde_json::Map<String, Value>;

/// Object-safe view of an implementation instance or argument holder.
pub trait StepObject: Any + Send {
    /// Assigns one argument by its binding name
    fn set_property(&mut self, name: &str, value: Value) -> Result<(), PropertyError>;

    /// Current values of every declared argument
    fn describe(&self) -> Arguments;

    /// Delivers the logger and working directory to `inject` fields
    fn inject_context(&mut self, context: &InvocationContext);

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// Static half of a derived argument holder.
pub trait StepArguments: StepObject + Default + Sized {
    /// Fully-qualified type name, as referenced from descriptors
    const TYPE_NAME: &'static str;

    /// Type-level `#[step(..)]` marker
    fn marker() -> StepMarker;

    /// Declared arguments, flattened holders inlined
    fn arguments() -> Vec<ArgumentSpec>;

    /// A fresh, default instance
    fn construct() -> Box<dyn StepObject> {
        Box::new(Self::default())
    }
}

/// Zero-argument entry point; arguments are bound onto the instance itself.
pub trait Callable {
    type Output: Serialize;

    fn call(&mut self) -> anyhow::Result<Self::Output>;
}

/// Single-argument entry point taking a context value.
pub trait Apply<C: ContextArgument> {
    type Output: Serialize;

    fn apply(&mut self, context: C) -> anyhow::Result<Self::Output>;
}

/// How the parameter of an [`Apply`] entry point is produced from the
/// caller's arguments.
#[derive(Clone, Copy)]
pub enum ContextParameter {
    /// The raw mapping is passed through unchanged
    Map,
    /// A fresh holder is constructed and the arguments bound onto it
    Object {
        type_name: &'static str,
        arguments: fn() -> Vec<ArgumentSpec>,
        construct: fn() -> Box<dyn StepObject>,
    },
}

impl std::fmt::Debug for ContextParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Map => f.write_str("Map"),
            Self::Object { type_name, .. } => f.debug_tuple("Object").field(type_name).finish(),
        }
    }
}

/// A context parameter after binding
pub enum BoundContext {
    Map(Arguments),
    Object(Box<dyn StepObject>),
}

impl BoundContext {
    /// The bound values, as a holder would describe them
    pub fn describe(&self) -> Arguments {
        match self {
            Self::Map(arguments) => arguments.clone(),
            Self::Object(holder) => holder.describe(),
        }
    }
}

/// Types usable as the parameter of an [`Apply`] entry point.
pub trait ContextArgument: Sized + 'static {
    fn parameter() -> ContextParameter;

    /// Recovers the typed value from what the binder produced
    fn from_bound(bound: BoundContext) -> Option<Self>;
}

impl ContextArgument for Arguments {
    fn parameter() -> ContextParameter {
        ContextParameter::Map
    }

    fn from_bound(bound: BoundContext) -> Option<Self> {
        match bound {
            BoundContext::Map(arguments) => Some(arguments),
            BoundContext::Object(holder) => Some(holder.describe()),
        }
    }
}

impl ContextArgument for HashMap<String, Value> {
    fn parameter() -> ContextParameter {
        ContextParameter::Map
    }

    fn from_bound(bound: BoundContext) -> Option<Self> {
        Arguments::from_bound(bound).map(|m| m.into_iter().collect())
    }
}

impl ContextArgument for BTreeMap<String, Value> {
    fn parameter() -> ContextParameter {
        ContextParameter::Map
    }

    fn from_bound(bound: BoundContext) -> Option<Self> {
        Arguments::from_bound(bound).map(|m| m.into_iter().collect())
    }
}

/// Step methods declared with `#[step_methods]`
pub trait StepMethods {
    fn step_methods() -> Vec<MethodEntry>;
}

/// Adapter calling one step method with bound parameters
pub type MethodInvoker =
    fn(&mut dyn StepObject, &Arguments) -> Result<Value, EntryPointError>;

/// Checks a step method's supplied parameters without calling it, returning
/// the coerced value of each declared parameter the caller supplied
pub type MethodDescriber = fn(&Arguments) -> Result<Arguments, BindingError>;

/// One `#[step]` method of a type
#[derive(Clone)]
pub struct MethodEntry {
    pub method_name: &'static str,
    pub marker: StepMarker,
    pub parameters: Vec<ArgumentSpec>,
    pub return_type: &'static str,
    pub invoke: MethodInvoker,
    pub describe: MethodDescriber,
}

impl MethodEntry {
    /// Registry key: the marker name, else the method name
    pub fn function_name(&self) -> &'static str {
        self.marker.name().unwrap_or(self.method_name)
    }
}

impl std::fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodEntry")
            .field("method_name", &self.method_name)
            .field("marker", &self.marker)
            .field("parameters", &self.parameters)
            .field("return_type", &self.return_type)
            .finish()
    }
}

// ============================================================================
// Helpers used by generated code
// ============================================================================

/// Assigns a loosely-typed value to a typed field, coercing it first
pub fn assign<T: DeserializeOwned>(
    slot: &mut T,
    name: &str,
    type_name: &str,
    value: Value,
) -> Result<(), PropertyError> {
    let value = coerce_to_type(value, type_name);
    match serde_json::from_value::<T>(value.clone()) {
        Ok(typed) => {
            *slot = typed;
            Ok(())
        }
        Err(e) => Err(PropertyError::Mismatch {
            name: name.to_string(),
            expected: type_name.to_string(),
            value,
            reason: e.to_string(),
        }),
    }
}

/// Serializes a field for `describe`; unserializable values become null
pub fn describe_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Binds one method parameter by name.
///
/// A missing or null value binds as JSON null, which only `Option`
/// parameters accept.
pub fn bind_parameter<T: DeserializeOwned>(
    arguments: &Arguments,
    name: &str,
    type_name: &str,
    owner: &str,
) -> Result<T, BindingError> {
    let value = arguments.get(name).cloned().unwrap_or(Value::Null);
    let missing = value.is_null();
    let value = coerce_to_type(value, type_name);

    serde_json::from_value::<T>(value.clone()).map_err(|e| BindingError {
        argument: name.to_string(),
        type_name: owner.to_string(),
        value,
        reason: if missing {
            format!("missing value for {}", type_name)
        } else {
            format!("expected {}: {}", type_name, e)
        },
    })
}

/// Checks one method parameter the way [`bind_parameter`] binds it.
///
/// Absent and null values stay absent and yield `None`; anything else must
/// deserialize as `T` and is returned coerced.
pub fn check_parameter<T: DeserializeOwned>(
    arguments: &Arguments,
    name: &str,
    type_name: &str,
    owner: &str,
) -> Result<Option<Value>, BindingError> {
    let Some(value) = arguments.get(name).filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    let value = coerce_to_type(value.clone(), type_name);

    match serde_json::from_value::<T>(value.clone()) {
        Ok(_) => Ok(Some(value)),
        Err(e) => Err(BindingError {
            argument: name.to_string(),
            type_name: owner.to_string(),
            value,
            reason: format!("expected {}: {}", type_name, e),
        }),
    }
}

/// Downcasts an instance to the concrete type an adapter was built for
pub fn downcast_target<T: Any>(target: &mut dyn StepObject) -> Result<&mut T, EntryPointError> {
    target.as_any_mut().downcast_mut::<T>().ok_or_else(|| {
        EntryPointError::Failed(anyhow::anyhow!(
            "instance is not a {}",
            std::any::type_name::<T>()
        ))
    })
}

/// Serializes an entry point's output
pub fn to_output<T: Serialize>(output: T) -> Result<Value, EntryPointError> {
    serde_json::to_value(output)
        .map_err(|e| EntryPointError::Failed(anyhow::Error::new(e).context("serializing output")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assign_coerces_before_deserializing() {
        let mut amount: i32 = 0;
        assign(&mut amount, "amount", "i32", json!("69")).unwrap();
        assert_eq!(amount, 69);
    }

    #[test]
    fn test_assign_mismatch_reports_value() {
        let mut amount: i32 = 7;
        let err = assign(&mut amount, "amount", "i32", json!("lots")).unwrap_err();
        assert!(matches!(
            err,
            PropertyError::Mismatch { ref name, ref value, .. } if name == "amount" && value == &json!("lots")
        ));
        assert_eq!(amount, 7);
    }

    #[test]
    fn test_assign_null_to_option_clears() {
        let mut message = Some("old".to_string());
        assign(&mut message, "message", "Option<String>", Value::Null).unwrap();
        assert_eq!(message, None);
    }

    #[test]
    fn test_bind_parameter_absent_option_is_none() {
        let arguments = Arguments::new();
        let location: Option<String> =
            bind_parameter(&arguments, "location", "Option<String>", "x::F").unwrap();
        assert_eq!(location, None);
    }

    #[test]
    fn test_bind_parameter_absent_required_fails() {
        let arguments = Arguments::new();
        let err = bind_parameter::<String>(&arguments, "name", "String", "x::F").unwrap_err();
        assert_eq!(err.argument, "name");
        assert_eq!(err.type_name, "x::F");
        assert_eq!(err.reason, "missing value for String");
    }

    #[test]
    fn test_bind_parameter_coerces() {
        let mut arguments = Arguments::new();
        arguments.insert("amount".into(), json!(69.0));
        let amount: i32 = bind_parameter(&arguments, "amount", "i32", "x::F").unwrap();
        assert_eq!(amount, 69);
    }

    #[test]
    fn test_assign_rejects_unrecognised_bool_text() {
        let mut flag = true;
        let err = assign(&mut flag, "flag", "bool", json!("banana")).unwrap_err();
        assert!(matches!(
            err,
            PropertyError::Mismatch { ref name, ref value, .. } if name == "flag" && value == &json!("banana")
        ));
        assert!(flag);

        assign(&mut flag, "flag", "bool", json!("off")).unwrap();
        assert!(!flag);
    }

    #[test]
    fn test_bind_parameter_rejects_unrecognised_bool_text() {
        let mut arguments = Arguments::new();
        arguments.insert("flag".into(), json!("banana"));
        let err = bind_parameter::<bool>(&arguments, "flag", "bool", "x::F").unwrap_err();
        assert_eq!(err.argument, "flag");
        assert_eq!(err.value, json!("banana"));
        assert!(err.reason.starts_with("expected bool"));

        arguments.insert("flag".into(), json!("YES"));
        assert!(bind_parameter::<bool>(&arguments, "flag", "bool", "x::F").unwrap());
    }

    #[test]
    fn test_check_parameter_keeps_absent_values_absent() {
        let mut arguments = Arguments::new();
        arguments.insert("name".into(), Value::Null);
        assert_eq!(
            check_parameter::<String>(&arguments, "name", "String", "x::F").unwrap(),
            None
        );
        assert_eq!(
            check_parameter::<i32>(&arguments, "amount", "i32", "x::F").unwrap(),
            None
        );

        arguments.insert("amount".into(), json!("69"));
        assert_eq!(
            check_parameter::<i32>(&arguments, "amount", "i32", "x::F").unwrap(),
            Some(json!(69))
        );
    }

    #[test]
    fn test_check_parameter_reports_mismatch() {
        let mut arguments = Arguments::new();
        arguments.insert("amount".into(), json!("lots"));
        let err = check_parameter::<i32>(&arguments, "amount", "i32", "x::F").unwrap_err();
        assert_eq!(err.argument, "amount");
        assert_eq!(err.type_name, "x::F");
        assert!(err.reason.starts_with("expected i32"));
    }

    #[test]
    fn test_raw_mapping_context_passes_through() {
        let mut arguments = Arguments::new();
        arguments.insert("k".into(), json!(1));

        let hash = HashMap::<String, Value>::from_bound(BoundContext::Map(arguments.clone()));
        assert_eq!(hash.unwrap().get("k"), Some(&json!(1)));

        let tree = BTreeMap::<String, Value>::from_bound(BoundContext::Map(arguments.clone()));
        assert_eq!(tree.unwrap().len(), 1);

        assert!(matches!(Arguments::parameter(), ContextParameter::Map));
    }
}
