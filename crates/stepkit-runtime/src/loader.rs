// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Type loaders: resolve a type name from a descriptor to a step type.

use std::collections::HashMap;

use stepkit_dsl::type_names;
use tracing::debug;

use crate::step_type::{StepTypeDescriptor, StepTypeRegistration, registered_step_types};

/// Resolves fully-qualified type names to constructible step types.
pub trait TypeLoader: Send + Sync {
    fn load_type(&self, type_name: &str) -> Option<StepTypeDescriptor>;

    /// Whether the name resolves to a type, either a registered step type or
    /// one every registry understands (scalars, JSON values, mappings)
    fn is_known_type(&self, type_name: &str) -> bool {
        type_names::is_builtin(type_name) || self.load_type(type_name).is_some()
    }
}

/// Loader over every type registered with `register_step_type!` in the
/// current binary.
#[derive(Debug)]
pub struct InventoryTypeLoader {
    types: HashMap<&'static str, &'static StepTypeRegistration>,
}

impl InventoryTypeLoader {
    pub fn new() -> Self {
        let mut types = HashMap::new();
        for registration in registered_step_types() {
            if types.insert(registration.type_name, registration).is_some() {
                debug!(
                    type_name = %registration.type_name,
                    "Step type registered more than once, keeping the last registration"
                );
            }
        }
        debug!(count = types.len(), "Indexed registered step types");
        Self { types }
    }

    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for InventoryTypeLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeLoader for InventoryTypeLoader {
    fn load_type(&self, type_name: &str) -> Option<StepTypeDescriptor> {
        self.types
            .get(type_name.trim())
            .map(|registration| (registration.describe)())
    }
}

/// Loader over an explicit set of descriptors
#[derive(Debug, Default, Clone)]
pub struct StaticTypeLoader {
    types: HashMap<String, StepTypeDescriptor>,
}

impl StaticTypeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, descriptor: StepTypeDescriptor) -> Self {
        self.insert(descriptor);
        self
    }

    pub fn insert(&mut self, descriptor: StepTypeDescriptor) {
        self.types
            .insert(descriptor.type_name.to_string(), descriptor);
    }
}

impl TypeLoader for StaticTypeLoader {
    fn load_type(&self, type_name: &str) -> Option<StepTypeDescriptor> {
        self.types.get(type_name.trim()).cloned()
    }
}
