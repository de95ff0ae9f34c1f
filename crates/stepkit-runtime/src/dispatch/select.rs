// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Dispatch strategy selection.
//!
//! Precedence, computed once per implementation type:
//! 1. the first type in the lineage (the type, then its parents) with a
//!    `call` entry point gives a callable function
//! 2. else the first type in the lineage with `apply` entry points gives a
//!    context function; among several, one whose return type is not the
//!    top type is preferred, else the first declared
//! 3. else every `#[step]` method of the type itself gives a method
//!    function, keyed by marker name or method name (first declared wins)
//!
//! A type matching none of these is a configuration error.

use std::collections::HashSet;
use std::sync::Arc;

use stepkit_dsl::type_names;
use tracing::debug;

use super::Target;
use crate::error::StepError;
use crate::loader::TypeLoader;
use crate::object::MethodEntry;
use crate::step_type::{ApplyEntry, CallEntry, Projection, StepTypeDescriptor};

/// Which calling convention a type resolved to
#[derive(Debug, Clone)]
pub(crate) enum Dispatch {
    Callable(CallEntry),
    Context(ApplyEntry),
    Methods(Vec<MethodEntry>),
}

/// Selection result for one implementation type
#[derive(Debug, Clone)]
pub(crate) struct Resolved {
    pub root: StepTypeDescriptor,
    pub target: Target,
    pub dispatch: Dispatch,
}

struct Level {
    descriptor: StepTypeDescriptor,
    chain: Vec<Projection>,
}

/// Classifies `root` and builds the matching dispatch target
pub(crate) fn select(root: StepTypeDescriptor, loader: &dyn TypeLoader) -> Result<Resolved, StepError> {
    let levels = lineage(&root, loader)?;

    let target_for = |level: &Level| Target {
        type_name: root.type_name,
        construct: root.construct,
        chain: Arc::from(level.chain.as_slice()),
        owner: level.descriptor.type_name,
    };

    if let Some(level) = levels.iter().find(|l| l.descriptor.call.is_some())
        && let Some(entry) = level.descriptor.call.clone()
    {
        debug!(type_name = %root.type_name, owner = %level.descriptor.type_name, "Selected call entry point");
        return Ok(Resolved {
            target: target_for(level),
            dispatch: Dispatch::Callable(entry),
            root: root.clone(),
        });
    }

    if let Some(level) = levels.iter().find(|l| !l.descriptor.apply.is_empty()) {
        let entry = preferred_apply(&level.descriptor.apply).clone();
        debug!(
            type_name = %root.type_name,
            owner = %level.descriptor.type_name,
            parameter = %entry.parameter_type,
            "Selected apply entry point"
        );
        return Ok(Resolved {
            target: target_for(level),
            dispatch: Dispatch::Context(entry),
            root: root.clone(),
        });
    }

    let methods = unique_methods(&root.methods);
    if !methods.is_empty() {
        debug!(type_name = %root.type_name, count = methods.len(), "Selected step methods");
        return Ok(Resolved {
            target: target_for(&levels[0]),
            dispatch: Dispatch::Methods(methods),
            root: root.clone(),
        });
    }

    Err(StepError::configuration(
        root.type_name,
        "no call or apply entry point and no #[step] methods",
    ))
}

/// The type followed by its parents, each with the projection chain from a
/// root instance. Fails on unknown parents and cycles.
fn lineage(root: &StepTypeDescriptor, loader: &dyn TypeLoader) -> Result<Vec<Level>, StepError> {
    let mut seen = HashSet::from([root.type_name]);
    let mut levels = vec![Level {
        descriptor: root.clone(),
        chain: Vec::new(),
    }];

    while let Some(parent) = levels.last().and_then(|l| l.descriptor.parent) {
        if !seen.insert(parent.type_name) {
            return Err(StepError::configuration(
                root.type_name,
                format!("cyclic parent chain through {}", parent.type_name),
            ));
        }
        let descriptor = loader.load_type(parent.type_name).ok_or_else(|| {
            StepError::configuration(
                root.type_name,
                format!("parent type {} is not registered", parent.type_name),
            )
        })?;

        let mut chain = levels.last().map(|l| l.chain.clone()).unwrap_or_default();
        chain.push(parent.project);
        levels.push(Level { descriptor, chain });
    }

    Ok(levels)
}

fn preferred_apply(candidates: &[ApplyEntry]) -> &ApplyEntry {
    if candidates.len() > 1
        && let Some(typed) = candidates
            .iter()
            .find(|c| !type_names::is_top_type(&c.return_type))
    {
        return typed;
    }
    &candidates[0]
}

fn unique_methods(methods: &[MethodEntry]) -> Vec<MethodEntry> {
    let mut seen = HashSet::new();
    methods
        .iter()
        .filter(|m| {
            let fresh = seen.insert(m.function_name());
            if !fresh {
                debug!(method = %m.method_name, name = %m.function_name(), "Ignoring duplicate step method");
            }
            fresh
        })
        .cloned()
        .collect()
}
