// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Step function metadata
//!
//! This crate holds everything about a step function that does not need to
//! run it:
//! - the metadata model (`StepMetadata`, `ArgumentMetadata`) and the static
//!   halves emitted by `stepkit-macro` (`StepMarker`, `ArgumentSpec`)
//! - the descriptor text parser and the property-file metadata merger
//! - the declarative marker resolver producing final metadata
//! - value coercion used when binding loosely-typed arguments
//! - embedded descriptor resources, collected with `inventory`

// Metadata model and embedded descriptor resources
pub mod step_meta;

// Declared type names (normalization, builtins, top type)
pub mod type_names;

// Type coercion for loosely-typed argument values
pub mod coercion;

// Descriptor text parsing and fragment merging
pub mod descriptor;

// Marker layering and argument resolution
pub mod marker;

pub use descriptor::{
    ArgumentProperties, DescriptorEntry, DescriptorSet, DescriptorWarning, ResourceKind,
    STEP_INDEX, StepProperties, arguments_resource, parse_properties,
};
pub use marker::{build_metadata, resolve_arguments};
pub use step_meta::{
    ArgumentMetadata, ArgumentSpec, DescriptorResource, StepMarker, StepMetadata,
    embedded_resources,
};

#[doc(hidden)]
pub mod __private {
    pub use inventory;
}
