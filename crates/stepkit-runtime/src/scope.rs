// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Search scope: where descriptor resources are looked up.
//!
//! A scope is a list of directory roots plus, optionally, the resources
//! embedded into the binary with `embed_descriptor!`. A well-known resource
//! path may match in several places; every match is returned, ordered by
//! origin so merging is deterministic. Embedded origins (`embedded:...`)
//! sort before directory origins (`file:...`), so files on the search path
//! override what is compiled in.

use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};

use stepkit_dsl::embedded_resources;
use tracing::debug;

use crate::config::RegistryConfig;
use crate::error::StepError;

/// One descriptor resource found in a scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub origin: String,
    pub contents: Cow<'static, str>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchScope {
    roots: Vec<PathBuf>,
    embedded: bool,
}

impl SearchScope {
    /// An empty scope
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope over the embedded resources only
    pub fn embedded() -> Self {
        Self::new().with_embedded(true)
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        config
            .search_path
            .iter()
            .fold(Self::new().with_embedded(config.embedded), |scope, root| {
                scope.with_root(root)
            })
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    pub fn with_embedded(mut self, embedded: bool) -> Self {
        self.embedded = embedded;
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn includes_embedded(&self) -> bool {
        self.embedded
    }

    /// Every resource at `path`, ordered by origin
    pub fn resources(&self, path: &str) -> Result<Vec<Resource>, StepError> {
        let mut found = Vec::new();

        if self.embedded {
            found.extend(
                embedded_resources()
                    .filter(|resource| resource.path == path)
                    .map(|resource| Resource {
                        origin: format!("embedded:{}", resource.origin),
                        contents: Cow::Borrowed(resource.contents),
                    }),
            );
        }

        for root in &self.roots {
            if let Some(resource) = read_file(root, path)? {
                found.push(resource);
            }
        }

        found.sort_by(|a, b| a.origin.cmp(&b.origin));
        debug!(path = %path, count = found.len(), "Resolved descriptor resources");
        Ok(found)
    }
}

fn read_file(root: &Path, path: &str) -> Result<Option<Resource>, StepError> {
    let file = root.join(path);
    let origin = format!("file:{}", file.display());
    match std::fs::read_to_string(&file) {
        Ok(contents) => Ok(Some(Resource {
            origin,
            contents: Cow::Owned(contents),
        })),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StepError::Resource { origin, source }),
    }
}
