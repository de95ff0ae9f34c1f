// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Declarative marker resolution.
//!
//! Final metadata for a function is produced by layering, in order:
//! the property-file fragment, the marker on the implementation type, and
//! the marker on the step method (for method-based functions). Only the
//! non-empty fields of a marker take part; an empty marker field never
//! blanks out a value that is already set.

use tracing::debug;

use crate::descriptor::{DescriptorWarning, StepProperties};
use crate::step_meta::{ArgumentMetadata, ArgumentSpec, StepMarker, StepMetadata};
use crate::type_names::{TOP_TYPE, is_builtin, normalize};

impl StepProperties {
    /// Applies the marker's non-empty fields over this fragment.
    pub fn configure(&mut self, marker: &StepMarker) {
        if let Some(name) = marker.name() {
            self.name = name.to_string();
        }
        override_field(
            &mut self.display_name,
            marker.display_name(),
            &self.name,
            "displayName",
        );
        override_field(
            &mut self.description,
            marker.description(),
            &self.name,
            "description",
        );
    }

    /// Fragment for one method of a type.
    ///
    /// Starts from this (type-level) fragment, layers the method's own
    /// descriptor fragment if there is one, then the method marker.
    pub fn for_method(
        &self,
        method_name: &str,
        own: Option<&StepProperties>,
        marker: &StepMarker,
    ) -> StepProperties {
        let mut child = StepProperties::new(method_name);
        child.display_name = self.display_name.clone();
        child.description = self.description.clone();
        child.type_name = self.type_name.clone();
        if let Some(own) = own {
            child.merge(own);
        }
        child.configure(marker);
        child
    }
}

fn override_field(target: &mut Option<String>, value: Option<&str>, step: &str, field: &str) {
    let Some(value) = value else {
        return;
    };
    if let Some(previous) = target.as_deref()
        && !previous.is_empty()
        && previous != value
    {
        debug!(
            step = %step,
            field = %field,
            previous = %previous,
            marker = %value,
            "Marker overrides descriptor value"
        );
    }
    *target = Some(value.to_string());
}

/// Builds the final, immutable metadata for a registry entry.
///
/// The display name falls back to the registry key when neither the
/// descriptor nor a marker supplied one.
pub fn build_metadata(
    key: &str,
    properties: &StepProperties,
    return_type: &str,
    arguments: Vec<ArgumentMetadata>,
    implementation_type: &str,
) -> StepMetadata {
    let display_name = properties
        .explicit_display_name()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or(key);

    StepMetadata::new(
        key,
        display_name,
        properties.description().unwrap_or_default(),
        normalize(return_type),
        arguments,
        implementation_type,
    )
}

/// Resolves the argument list of a function.
///
/// Arguments declared in code come first, in declaration order; their
/// declared type always wins and non-empty code attributes override the
/// descriptor text. Arguments only present in the descriptor follow, ordered
/// by name; those need a `type` and are skipped without one. Types that are
/// neither built in nor known to `is_known_type` are reported and widened to
/// the top type.
pub fn resolve_arguments(
    step: &str,
    declared: &[ArgumentSpec],
    fragment: Option<&StepProperties>,
    is_known_type: impl Fn(&str) -> bool,
) -> (Vec<ArgumentMetadata>, Vec<DescriptorWarning>) {
    let mut arguments = Vec::new();
    let mut warnings = Vec::new();

    for spec in declared {
        let file = fragment.and_then(|f| f.argument(spec.name));
        let declared_type = normalize(spec.type_name);

        if let Some(file_type) = file.and_then(|f| f.type_name())
            && normalize(file_type) != declared_type
        {
            warnings.push(DescriptorWarning::TypeOverrideIgnored {
                step: step.to_string(),
                argument: spec.name.to_string(),
                declared: declared_type.clone(),
                type_name: file_type.to_string(),
            });
        }

        let display_name = non_empty(spec.display_name)
            .or_else(|| file.and_then(|f| f.display_name()).filter(|d| !d.is_empty()))
            .unwrap_or(spec.name);
        let description = non_empty(spec.description)
            .or_else(|| file.and_then(|f| f.description()))
            .unwrap_or_default();

        arguments.push(
            ArgumentMetadata::new(spec.name, display_name, description, declared_type)
                .with_default(spec.parsed_default()),
        );
    }

    let Some(fragment) = fragment else {
        return (arguments, warnings);
    };

    for file in fragment.arguments() {
        if declared.iter().any(|spec| spec.name == file.name()) {
            continue;
        }
        let Some(type_name) = file.type_name().filter(|t| !t.trim().is_empty()) else {
            continue;
        };

        let resolved = if is_builtin(type_name) || is_known_type(type_name) {
            normalize(type_name)
        } else {
            warnings.push(DescriptorWarning::UnresolvedType {
                step: step.to_string(),
                argument: file.name().to_string(),
                type_name: type_name.to_string(),
            });
            TOP_TYPE.to_string()
        };

        let display_name = file
            .display_name()
            .filter(|d| !d.is_empty())
            .unwrap_or(file.name());
        arguments.push(ArgumentMetadata::new(
            file.name(),
            display_name,
            file.description().unwrap_or_default(),
            resolved,
        ));
    }

    (arguments, warnings)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
