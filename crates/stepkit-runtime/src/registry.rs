// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Function registry: discovery and lookup of step functions.
//!
//! Loading scans the step index in a [`SearchScope`], resolves every entry's
//! implementation type through a [`TypeLoader`], classifies it, layers the
//! descriptor fragments and markers into [`StepMetadata`] and wraps the
//! result in a [`StepFunction`]. The registry is read-only afterwards and can
//! be shared between threads.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;
use stepkit_dsl::{
    DescriptorSet, DescriptorWarning, ResourceKind, STEP_INDEX, StepMetadata, StepProperties,
    arguments_resource, build_metadata, resolve_arguments,
};
use tracing::{debug, info, warn};

use crate::config::RegistryConfig;
use crate::context::InvocationContext;
use crate::dispatch::select::{Dispatch, Resolved, select};
use crate::dispatch::{CallableFunction, ContextFunction, MethodFunction, StepFunction};
use crate::error::StepError;
use crate::loader::{InventoryTypeLoader, TypeLoader};
use crate::object::{Arguments, ContextParameter};
use crate::scope::SearchScope;

type Functions = Vec<(String, Arc<dyn StepFunction>)>;

/// Name to function map built from one search scope
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, Arc<dyn StepFunction>>,
    problems: Vec<StepError>,
    warnings: Vec<DescriptorWarning>,
}

impl FunctionRegistry {
    /// Loads every function in `scope`.
    ///
    /// Entries whose type cannot be loaded or classified are reported and
    /// skipped; see [`problems`](Self::problems). Unreadable resources abort
    /// the load.
    pub fn load(scope: &SearchScope, loader: &dyn TypeLoader) -> Result<Self, StepError> {
        Self::load_with(scope, loader, false)
    }

    /// Like [`load`](Self::load) but fails on the first misconfigured entry
    pub fn load_strict(scope: &SearchScope, loader: &dyn TypeLoader) -> Result<Self, StepError> {
        Self::load_with(scope, loader, true)
    }

    /// Loads with the scope and strictness from `config`, resolving types
    /// registered in the current binary
    pub fn from_config(config: &RegistryConfig) -> Result<Self, StepError> {
        let scope = SearchScope::from_config(config);
        let loader = InventoryTypeLoader::new();
        Self::load_with(&scope, &loader, config.strict)
    }

    fn load_with(
        scope: &SearchScope,
        loader: &dyn TypeLoader,
        strict: bool,
    ) -> Result<Self, StepError> {
        let mut descriptors = Descriptors::scan(scope)?;
        let mut registry = Self::default();
        let mut resolved: HashMap<String, Resolved> = HashMap::new();

        let (typed, untyped): (Vec<_>, Vec<_>) = descriptors
            .index
            .steps()
            .map(|step| (step.name().to_string(), step.type_name().map(str::to_string)))
            .partition(|(_, type_name)| type_name.is_some());

        for (name, type_name) in typed {
            let Some(type_name) = type_name else {
                continue;
            };

            let outcome = match resolved.get(&type_name) {
                Some(cached) => Ok(cached.clone()),
                None => resolve(loader, &name, &type_name),
            };
            let built = outcome.and_then(|r| {
                resolved.insert(type_name.clone(), r.clone());
                build_functions(&name, &r, &mut descriptors, loader)
            });

            match built {
                Ok(functions) => registry.insert_all(functions),
                Err(e) if e.is_configuration() => {
                    if strict {
                        return Err(e);
                    }
                    warn!(function = %name, type_name = %type_name, error = %e, "Skipping step function");
                    registry.problems.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        for (name, _) in untyped {
            if !registry.functions.contains_key(&name) {
                let warning = DescriptorWarning::MissingTypeName { step: name };
                warn!("{}", warning);
                descriptors.warnings.push(warning);
            }
        }

        registry.warnings = descriptors.warnings;
        info!(
            functions = registry.functions.len(),
            problems = registry.problems.len(),
            "Loaded step functions"
        );
        Ok(registry)
    }

    /// Loads a single function from an explicitly named type.
    ///
    /// Every problem is fatal here: an unknown type, a type matching no
    /// dispatch form, or a type that does not provide `name`.
    pub fn load_function(
        scope: &SearchScope,
        loader: &dyn TypeLoader,
        name: &str,
        type_name: &str,
    ) -> Result<Arc<dyn StepFunction>, StepError> {
        let mut descriptors = Descriptors::scan(scope)?;
        let resolved = resolve(loader, name, type_name)?;

        build_functions(name, &resolved, &mut descriptors, loader)?
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, function)| function)
            .ok_or_else(|| StepError::FunctionNotFoundForType {
                name: name.to_string(),
                type_name: type_name.to_string(),
            })
    }

    fn insert_all(&mut self, functions: Functions) {
        for (name, function) in functions {
            if let Some(previous) = self.functions.insert(name.clone(), function) {
                debug!(
                    function = %name,
                    previous = %previous.metadata().implementation_type(),
                    "Step function redefined, keeping the later definition"
                );
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn StepFunction>> {
        self.functions.get(name)
    }

    /// Like [`get`](Self::get), failing with `FunctionNotFound`
    pub fn function(&self, name: &str) -> Result<&Arc<dyn StepFunction>, StepError> {
        self.get(name).ok_or_else(|| StepError::FunctionNotFound {
            name: name.to_string(),
        })
    }

    pub fn metadata(&self, name: &str) -> Option<&StepMetadata> {
        self.get(name).map(|f| f.metadata())
    }

    /// Invokes a function on a fresh implementation instance
    pub fn invoke(
        &self,
        name: &str,
        arguments: &Arguments,
        context: &InvocationContext,
    ) -> Result<Value, StepError> {
        self.function(name)?.invoke(arguments, context)
    }

    /// Bound argument values of a function, with presentation defaults for
    /// the unset ones. Does not call the entry point.
    pub fn describe_default_arguments(
        &self,
        name: &str,
        arguments: &Arguments,
        context: &InvocationContext,
    ) -> Result<Arguments, StepError> {
        self.function(name)?
            .describe_default_arguments(arguments, context)
    }

    /// Registered names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn functions(&self) -> impl Iterator<Item = &Arc<dyn StepFunction>> {
        self.functions.values()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Entries skipped during loading
    pub fn problems(&self) -> &[StepError] {
        &self.problems
    }

    /// Non-fatal descriptor problems found during loading
    pub fn warnings(&self) -> &[DescriptorWarning] {
        &self.warnings
    }
}

fn resolve(loader: &dyn TypeLoader, function: &str, type_name: &str) -> Result<Resolved, StepError> {
    let descriptor = loader
        .load_type(type_name)
        .ok_or_else(|| StepError::TypeNotFound {
            function: function.to_string(),
            type_name: type_name.to_string(),
        })?;
    select(descriptor, loader)
}

/// Descriptor resources of a scope, read on demand
struct Descriptors<'a> {
    scope: &'a SearchScope,
    index: DescriptorSet,
    fragments: HashMap<String, Option<StepProperties>>,
    warnings: Vec<DescriptorWarning>,
}

impl<'a> Descriptors<'a> {
    fn scan(scope: &'a SearchScope) -> Result<Self, StepError> {
        let mut index = DescriptorSet::new();
        let mut warnings = Vec::new();
        for resource in scope.resources(STEP_INDEX)? {
            debug!(origin = %resource.origin, "Reading step index");
            warnings.extend(index.merge_text(
                ResourceKind::Index,
                &resource.origin,
                &resource.contents,
            ));
        }
        for warning in &warnings {
            warn!("{}", warning);
        }

        Ok(Self {
            scope,
            index,
            fragments: HashMap::new(),
            warnings,
        })
    }

    /// Index fragment for `name` with its argument resources layered on top
    fn fragment(&mut self, name: &str) -> Result<Option<StepProperties>, StepError> {
        if let Some(cached) = self.fragments.get(name) {
            return Ok(cached.clone());
        }

        let mut details = DescriptorSet::new();
        for resource in self.scope.resources(&arguments_resource(name))? {
            let warnings = details.merge_text(
                ResourceKind::Arguments { function: name },
                &resource.origin,
                &resource.contents,
            );
            for warning in warnings {
                warn!("{}", warning);
                self.warnings.push(warning);
            }
        }

        let fragment = match (self.index.get(name), details.get(name)) {
            (None, None) => None,
            (Some(base), None) => Some(base.clone()),
            (base, Some(details)) => {
                let mut fragment = base
                    .cloned()
                    .unwrap_or_else(|| StepProperties::new(name));
                fragment.merge(details);
                Some(fragment)
            }
        };

        self.fragments.insert(name.to_string(), fragment.clone());
        Ok(fragment)
    }

    fn report(&mut self, warnings: Vec<DescriptorWarning>) {
        for warning in warnings {
            warn!("{}", warning);
            self.warnings.push(warning);
        }
    }
}

fn build_functions(
    name: &str,
    resolved: &Resolved,
    descriptors: &mut Descriptors<'_>,
    loader: &dyn TypeLoader,
) -> Result<Functions, StepError> {
    let root = &resolved.root;
    let mut properties = descriptors
        .fragment(name)?
        .unwrap_or_else(|| StepProperties::new(name));
    properties.configure(&root.marker);

    let is_known = |type_name: &str| loader.is_known_type(type_name);

    match &resolved.dispatch {
        Dispatch::Callable(entry) => {
            let (arguments, warnings) =
                resolve_arguments(name, &root.arguments, Some(&properties), is_known);
            descriptors.report(warnings);

            let metadata = build_metadata(name, &properties, &entry.return_type, arguments, root.type_name);
            debug!(function = %name, type_name = %root.type_name, "Discovered callable function");
            let function: Arc<dyn StepFunction> = Arc::new(CallableFunction::new(
                Arc::new(metadata),
                resolved.target.clone(),
                entry.clone(),
            ));
            Ok(vec![(name.to_string(), function)])
        }
        Dispatch::Context(entry) => {
            let declared = match entry.parameter {
                ContextParameter::Object { arguments, .. } => arguments(),
                ContextParameter::Map => Vec::new(),
            };
            let (arguments, warnings) =
                resolve_arguments(name, &declared, Some(&properties), is_known);
            descriptors.report(warnings);

            let metadata = build_metadata(name, &properties, &entry.return_type, arguments, root.type_name);
            debug!(function = %name, type_name = %root.type_name, "Discovered context function");
            let function: Arc<dyn StepFunction> = Arc::new(ContextFunction::new(
                Arc::new(metadata),
                resolved.target.clone(),
                entry.clone(),
            ));
            Ok(vec![(name.to_string(), function)])
        }
        Dispatch::Methods(entries) => {
            let mut functions: Functions = Vec::with_capacity(entries.len());
            for entry in entries {
                let key = entry.function_name();
                let own = descriptors.fragment(key)?;
                let method_properties = properties.for_method(key, own.as_ref(), &entry.marker);

                let (arguments, warnings) =
                    resolve_arguments(key, &entry.parameters, Some(&method_properties), is_known);
                descriptors.report(warnings);

                let metadata = build_metadata(
                    key,
                    &method_properties,
                    entry.return_type,
                    arguments,
                    root.type_name,
                );
                debug!(function = %key, method = %entry.method_name, type_name = %root.type_name, "Discovered method function");
                let function: Arc<dyn StepFunction> = Arc::new(MethodFunction::new(
                    Arc::new(metadata),
                    resolved.target.clone(),
                    entry.clone(),
                ));
                functions.push((key.to_string(), function));
            }
            Ok(functions)
        }
    }
}
