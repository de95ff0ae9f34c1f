// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Static registration of step implementation types.
//!
//! Each type registered with [`register_step_type!`](crate::register_step_type)
//! submits a [`StepTypeRegistration`] to `inventory`. The registration only
//! holds a function pointer; the full [`StepTypeDescriptor`] (entry points,
//! declared arguments, parent link) is built when a type loader asks for it.

use std::any::Any;
use std::fmt;

use serde_json::Value;
use stepkit_dsl::type_names;
use stepkit_dsl::{ArgumentSpec, StepMarker};

use crate::error::EntryPointError;
use crate::object::{
    Apply, BoundContext, Callable, ContextArgument, ContextParameter, MethodEntry, StepArguments,
    StepObject, downcast_target, to_output,
};

/// Inventory record for one implementation type
pub struct StepTypeRegistration {
    pub type_name: &'static str,
    pub describe: fn() -> StepTypeDescriptor,
}

inventory::collect!(StepTypeRegistration);

impl fmt::Debug for StepTypeRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepTypeRegistration")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Every implementation type registered in the current binary
pub fn registered_step_types() -> impl Iterator<Item = &'static StepTypeRegistration> {
    inventory::iter::<StepTypeRegistration>.into_iter()
}

/// Maps an instance to the embedded instance of its parent type
pub type Projection = fn(&mut dyn StepObject) -> Option<&mut dyn StepObject>;

/// Composition link to the type whose entry points this type inherits
#[derive(Clone, Copy)]
pub struct ParentLink {
    pub type_name: &'static str,
    pub project: Projection,
}

/// The zero-argument entry point of a type
#[derive(Clone)]
pub struct CallEntry {
    pub return_type: String,
    pub invoke: fn(&mut dyn StepObject) -> Result<Value, EntryPointError>,
}

impl CallEntry {
    pub fn of<T>() -> Self
    where
        T: Callable + Any,
    {
        Self {
            return_type: type_names::of::<T::Output>(),
            invoke: invoke_call::<T>,
        }
    }
}

impl fmt::Debug for CallEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call() -> {}", self.return_type)
    }
}

fn invoke_call<T: Callable + Any>(target: &mut dyn StepObject) -> Result<Value, EntryPointError> {
    let target = downcast_target::<T>(target)?;
    let output = target.call().map_err(EntryPointError::Failed)?;
    to_output(output)
}

/// One single-argument entry point of a type
#[derive(Clone)]
pub struct ApplyEntry {
    pub parameter: ContextParameter,
    pub parameter_type: String,
    pub return_type: String,
    pub invoke: fn(&mut dyn StepObject, BoundContext) -> Result<Value, EntryPointError>,
}

impl ApplyEntry {
    pub fn of<T, C>() -> Self
    where
        T: Apply<C> + Any,
        C: ContextArgument,
    {
        Self {
            parameter: C::parameter(),
            parameter_type: type_names::of::<C>(),
            return_type: type_names::of::<<T as Apply<C>>::Output>(),
            invoke: invoke_apply::<T, C>,
        }
    }
}

impl fmt::Debug for ApplyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "apply({}) -> {}", self.parameter_type, self.return_type)
    }
}

fn invoke_apply<T, C>(
    target: &mut dyn StepObject,
    bound: BoundContext,
) -> Result<Value, EntryPointError>
where
    T: Apply<C> + Any,
    C: ContextArgument,
{
    let context = C::from_bound(bound).ok_or_else(|| {
        EntryPointError::Failed(anyhow::anyhow!(
            "bound context is not a {}",
            std::any::type_name::<C>()
        ))
    })?;
    let target = downcast_target::<T>(target)?;
    let output = target.apply(context).map_err(EntryPointError::Failed)?;
    to_output(output)
}

/// Everything dispatch needs to know about an implementation type
#[derive(Clone)]
pub struct StepTypeDescriptor {
    pub type_name: &'static str,
    pub marker: StepMarker,
    /// Bean-style arguments of the instance itself
    pub arguments: Vec<ArgumentSpec>,
    pub construct: fn() -> Box<dyn StepObject>,
    pub call: Option<CallEntry>,
    pub apply: Vec<ApplyEntry>,
    pub methods: Vec<MethodEntry>,
    pub parent: Option<ParentLink>,
}

impl StepTypeDescriptor {
    /// Descriptor with no entry points yet
    pub fn of<T: StepArguments>() -> Self {
        Self {
            type_name: T::TYPE_NAME,
            marker: T::marker(),
            arguments: T::arguments(),
            construct: T::construct,
            call: None,
            apply: Vec::new(),
            methods: Vec::new(),
            parent: None,
        }
    }

    /// Whether any of the three dispatch forms is present on this level
    pub fn has_entry_points(&self) -> bool {
        self.call.is_some() || !self.apply.is_empty() || !self.methods.is_empty()
    }
}

impl fmt::Debug for StepTypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepTypeDescriptor")
            .field("type_name", &self.type_name)
            .field("marker", &self.marker)
            .field("arguments", &self.arguments)
            .field("call", &self.call)
            .field("apply", &self.apply)
            .field("methods", &self.methods)
            .field("parent", &self.parent.map(|p| p.type_name))
            .finish()
    }
}

/// Registers an implementation type and its entry points.
///
/// ```ignore
/// register_step_type!(HelloFunction: call);
/// register_step_type!(ExampleFunction: apply(ExampleContext));
/// register_step_type!(Functions: methods);
/// register_step_type!(AnotherFunction: extends(Greeter, greeter));
/// ```
///
/// `call` requires [`Callable`], `apply(C)` requires [`Apply<C>`] (repeat it
/// for several context types), `methods` requires a `#[step_methods]` impl
/// block, and `extends(Parent, field)` names an embedded field holding the
/// parent type whose entry points are inherited.
#[macro_export]
macro_rules! register_step_type {
    (@capability $descriptor:ident, $ty:ty, ) => {};

    (@capability $descriptor:ident, $ty:ty, call $(, $($rest:tt)*)?) => {
        $descriptor.call = Some($crate::CallEntry::of::<$ty>());
        $crate::register_step_type!(@capability $descriptor, $ty, $($($rest)*)?);
    };

    (@capability $descriptor:ident, $ty:ty, apply($context:ty) $(, $($rest:tt)*)?) => {
        $descriptor.apply.push($crate::ApplyEntry::of::<$ty, $context>());
        $crate::register_step_type!(@capability $descriptor, $ty, $($($rest)*)?);
    };

    (@capability $descriptor:ident, $ty:ty, methods $(, $($rest:tt)*)?) => {
        $descriptor.methods = <$ty as $crate::StepMethods>::step_methods();
        $crate::register_step_type!(@capability $descriptor, $ty, $($($rest)*)?);
    };

    (@capability $descriptor:ident, $ty:ty, extends($parent:ty, $field:ident) $(, $($rest:tt)*)?) => {
        fn __stepkit_project(
            target: &mut dyn $crate::StepObject,
        ) -> ::std::option::Option<&mut dyn $crate::StepObject> {
            target
                .as_any_mut()
                .downcast_mut::<$ty>()
                .map(|instance| &mut instance.$field as &mut dyn $crate::StepObject)
        }
        $descriptor.parent = Some($crate::ParentLink {
            type_name: <$parent as $crate::StepArguments>::TYPE_NAME,
            project: __stepkit_project,
        });
        $crate::register_step_type!(@capability $descriptor, $ty, $($($rest)*)?);
    };

    ($ty:ty : $($capability:tt)*) => {
        const _: () = {
            fn __stepkit_describe() -> $crate::StepTypeDescriptor {
                #[allow(unused_mut)]
                let mut descriptor = $crate::StepTypeDescriptor::of::<$ty>();
                $crate::register_step_type!(@capability descriptor, $ty, $($capability)*);
                descriptor
            }

            $crate::__private::inventory::submit! {
                $crate::StepTypeRegistration {
                    type_name: <$ty as $crate::StepArguments>::TYPE_NAME,
                    describe: __stepkit_describe,
                }
            }
        };
    };
}
