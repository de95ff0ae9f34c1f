// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Step function metadata types
//!
//! These types describe a step function the way callers and code generators
//! see it: its registry name, display text, return type and the ordered list
//! of arguments it accepts. The static halves (`StepMarker`, `ArgumentSpec`)
//! are emitted by the `stepkit-macro` crate; the owned halves
//! (`StepMetadata`, `ArgumentMetadata`) are produced by merging those with
//! descriptor resources at discovery time.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declarative marker attached to an implementation type or to a step method.
///
/// Mirrors `#[step(name = .., display_name = .., description = ..)]`.
/// Absent or empty fields never override a value coming from another source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepMarker {
    pub name: Option<&'static str>,
    pub display_name: Option<&'static str>,
    pub description: Option<&'static str>,
}

impl StepMarker {
    pub fn name(&self) -> Option<&'static str> {
        non_empty(self.name)
    }

    pub fn display_name(&self) -> Option<&'static str> {
        non_empty(self.display_name)
    }

    pub fn description(&self) -> Option<&'static str> {
        non_empty(self.description)
    }

    /// True when the marker carries no usable field at all
    pub fn is_empty(&self) -> bool {
        self.name().is_none() && self.display_name().is_none() && self.description().is_none()
    }
}

fn non_empty(value: Option<&'static str>) -> Option<&'static str> {
    value.filter(|v| !v.trim().is_empty())
}

/// An argument as declared in code: a field of an argument holder or a
/// parameter of a step method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgumentSpec {
    /// Binding name (explicit `#[arg(name)]` or the field/parameter name)
    pub name: &'static str,
    /// Declared Rust type (e.g. "Option<String>", "i32")
    pub type_name: &'static str,
    pub display_name: Option<&'static str>,
    pub description: Option<&'static str>,
    /// Presentation default as JSON text, or a bare string
    pub default_value: Option<&'static str>,
}

impl ArgumentSpec {
    pub const fn new(name: &'static str, type_name: &'static str) -> Self {
        Self {
            name,
            type_name,
            display_name: None,
            description: None,
            default_value: None,
        }
    }

    /// Parses the presentation default.
    ///
    /// Valid JSON is taken as is; anything else is treated as a plain string,
    /// so `default = "DefaultMessage"` and `default = "42"` both work.
    pub fn parsed_default(&self) -> Option<Value> {
        let raw = self.default_value?;
        Some(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
    }
}

/// Final metadata for one argument of a step function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentMetadata {
    name: String,
    display_name: String,
    #[serde(default)]
    description: String,
    declared_type: String,
    #[serde(rename = "default", default, skip_serializing_if = "Option::is_none")]
    default_value: Option<Value>,
}

impl ArgumentMetadata {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
        declared_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            description: description.into(),
            declared_type: declared_type.into(),
            default_value: None,
        }
    }

    pub fn with_default(mut self, value: Option<Value>) -> Self {
        self.default_value = value;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn declared_type(&self) -> &str {
        &self.declared_type
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    /// Prototype text for the argument, e.g. `String name`
    pub fn prototype(&self) -> String {
        match (self.declared_type.is_empty(), self.name.is_empty()) {
            (false, false) => format!("{} {}", self.declared_type, self.name),
            (false, true) => self.declared_type.clone(),
            (true, _) => self.name.clone(),
        }
    }
}

/// Final, immutable metadata for a discovered step function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepMetadata {
    name: String,
    display_name: String,
    #[serde(default)]
    description: String,
    return_type: String,
    arguments: Vec<ArgumentMetadata>,
    implementation_type: String,
}

impl StepMetadata {
    /// Builds metadata; argument names are kept unique (first one wins).
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
        return_type: impl Into<String>,
        arguments: Vec<ArgumentMetadata>,
        implementation_type: impl Into<String>,
    ) -> Self {
        let mut seen = HashSet::new();
        let arguments = arguments
            .into_iter()
            .filter(|arg| seen.insert(arg.name.clone()))
            .collect();

        Self {
            name: name.into(),
            display_name: display_name.into(),
            description: description.into(),
            return_type: return_type.into(),
            arguments,
            implementation_type: implementation_type.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn return_type(&self) -> &str {
        &self.return_type
    }

    pub fn arguments(&self) -> &[ArgumentMetadata] {
        &self.arguments
    }

    pub fn argument(&self, name: &str) -> Option<&ArgumentMetadata> {
        self.arguments.iter().find(|a| a.name == name)
    }

    pub fn implementation_type(&self) -> &str {
        &self.implementation_type
    }

    /// Signature rendering: `name(type1 arg1, type2 arg2) returnType`
    pub fn prototype(&self) -> String {
        let arguments: Vec<String> = self.arguments.iter().map(|a| a.prototype()).collect();
        format!(
            "{}({}) {}",
            self.name,
            arguments.join(", "),
            self.return_type
        )
    }
}

impl fmt::Display for StepMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StepMetadata{{{} [{}] returnType: {}}}",
            self.name,
            self.arguments
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            self.return_type
        )
    }
}

/// A descriptor resource compiled into a binary.
///
/// The embedded counterpart of a resource found on a search path; registered
/// with [`embed_descriptor!`](crate::embed_descriptor).
#[derive(Debug)]
pub struct DescriptorResource {
    /// Where the resource came from (crate name + path); used for ordering
    pub origin: &'static str,
    /// Well-known resource path, e.g. "stepkit/steps.properties"
    pub path: &'static str,
    pub contents: &'static str,
}

inventory::collect!(DescriptorResource);

/// All descriptor resources embedded into the current binary
pub fn embedded_resources() -> impl Iterator<Item = &'static DescriptorResource> {
    inventory::iter::<DescriptorResource>.into_iter()
}

/// Embeds a descriptor resource into the binary so registries built with the
/// embedded scope find it without touching the filesystem.
///
/// ```ignore
/// stepkit_dsl::embed_descriptor!(
///     "stepkit/steps.properties",
///     include_str!("../resources/stepkit/steps.properties")
/// );
/// ```
#[macro_export]
macro_rules! embed_descriptor {
    ($path:literal, $contents:expr) => {
        $crate::__private::inventory::submit! {
            $crate::step_meta::DescriptorResource {
                origin: concat!(env!("CARGO_PKG_NAME"), "/", $path),
                path: $path,
                contents: $contents,
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cheese() -> StepMetadata {
        StepMetadata::new(
            "cheese",
            "Cheesey hello",
            "",
            "String",
            vec![
                ArgumentMetadata::new("name", "name", "", "String"),
                ArgumentMetadata::new("amount", "amount", "", "i32"),
            ],
            "stepkit_sample::Functions",
        )
    }

    #[test]
    fn test_prototype_renders_arguments_and_return_type() {
        assert_eq!(cheese().prototype(), "cheese(String name, i32 amount) String");
    }

    #[test]
    fn test_prototype_is_deterministic() {
        assert_eq!(cheese().prototype(), cheese().prototype());
    }

    #[test]
    fn test_prototype_without_arguments() {
        let meta = StepMetadata::new("ping", "ping", "", "()", vec![], "x::Ping");
        assert_eq!(meta.prototype(), "ping() ()");
    }

    #[test]
    fn test_duplicate_argument_names_keep_first() {
        let meta = StepMetadata::new(
            "dup",
            "dup",
            "",
            "String",
            vec![
                ArgumentMetadata::new("a", "First", "", "String"),
                ArgumentMetadata::new("a", "Second", "", "i64"),
            ],
            "x::Dup",
        );
        assert_eq!(meta.arguments().len(), 1);
        assert_eq!(meta.argument("a").unwrap().display_name(), "First");
    }

    #[test]
    fn test_marker_ignores_blank_fields() {
        let marker = StepMarker {
            name: Some(""),
            display_name: Some("  "),
            description: Some("Says hello"),
        };
        assert_eq!(marker.name(), None);
        assert_eq!(marker.display_name(), None);
        assert_eq!(marker.description(), Some("Says hello"));
        assert!(!marker.is_empty());
        assert!(StepMarker::default().is_empty());
    }

    #[test]
    fn test_parsed_default_accepts_json_and_bare_strings() {
        let mut spec = ArgumentSpec::new("message", "Option<String>");
        assert_eq!(spec.parsed_default(), None);

        spec.default_value = Some("DefaultMessage");
        assert_eq!(spec.parsed_default(), Some(json!("DefaultMessage")));

        spec.default_value = Some("42");
        assert_eq!(spec.parsed_default(), Some(json!(42)));
    }

    #[test]
    fn test_metadata_serializes_camel_case() {
        let value = serde_json::to_value(cheese()).unwrap();
        assert_eq!(value["displayName"], "Cheesey hello");
        assert_eq!(value["returnType"], "String");
        assert_eq!(value["arguments"][1]["declaredType"], "i32");
        assert!(value["arguments"][0].get("default").is_none());
    }
}
