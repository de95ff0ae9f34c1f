// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Descriptor resources and the property-file metadata merger.
//!
//! A descriptor resource is line-oriented `key=value` text. Keys take one of
//! three shapes:
//!
//! - `<function>.<property>` for function-level metadata
//!   (`displayName`, `description`, `typeName`)
//! - `<function>.<argument>.<property>` for argument metadata
//!   (`displayName`, `description`, `type`)
//! - `<function>` alone, only in the step index, as shorthand for
//!   `<function>.typeName`
//!
//! Every entry is folded into a [`DescriptorSet`]; later entries for the same
//! key overwrite earlier ones. Unknown property names produce a
//! [`DescriptorWarning`] and are otherwise ignored.

use std::collections::BTreeMap;

/// Well-known path of the step index resource
pub const STEP_INDEX: &str = "stepkit/steps.properties";

/// Path of the per-function argument resource
pub fn arguments_resource(function: &str) -> String {
    format!("stepkit/{}-arguments.properties", function)
}

/// One `key=value` entry from a descriptor resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorEntry {
    pub key: String,
    pub value: String,
    /// 1-based line the entry starts on
    pub line: usize,
}

/// Problems found while merging descriptors or resolving their types.
///
/// None of these are fatal: the offending field is ignored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorWarning {
    #[error("{origin}:{line}: step {step} has unknown property {property} with value {value}")]
    UnknownStepProperty {
        origin: String,
        line: usize,
        step: String,
        property: String,
        value: String,
    },

    #[error(
        "{origin}:{line}: step {step} argument {argument} has unknown property {property} with value {value}"
    )]
    UnknownArgumentProperty {
        origin: String,
        line: usize,
        step: String,
        argument: String,
        property: String,
        value: String,
    },

    #[error("step {step} argument {argument}: cannot resolve type {type_name}")]
    UnresolvedType {
        step: String,
        argument: String,
        type_name: String,
    },

    #[error("step {step} argument {argument}: declared type {declared} kept over {type_name}")]
    TypeOverrideIgnored {
        step: String,
        argument: String,
        declared: String,
        type_name: String,
    },

    #[error("no typeName for step {step}")]
    MissingTypeName { step: String },
}

/// Which resource an entry stream came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind<'a> {
    /// The step index; bare keys name an implementation type
    Index,
    /// `<function>-arguments.properties`; keys are `<argument>.<property>`
    Arguments { function: &'a str },
}

/// Mutable metadata fragment for one argument
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentProperties {
    name: String,
    display_name: Option<String>,
    description: Option<String>,
    type_name: Option<String>,
}

impl ArgumentProperties {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// Returns the property name back when it is not recognized
    fn set_property(&mut self, property: &str, value: &str) -> Result<(), ()> {
        match property {
            "displayName" => self.display_name = Some(value.to_string()),
            "description" => self.description = Some(value.to_string()),
            "type" => self.type_name = Some(value.to_string()),
            _ => return Err(()),
        }
        Ok(())
    }

    fn merge(&mut self, other: &ArgumentProperties) {
        overwrite(&mut self.display_name, &other.display_name);
        overwrite(&mut self.description, &other.description);
        overwrite(&mut self.type_name, &other.type_name);
    }
}

/// Mutable metadata fragment for one step function
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepProperties {
    pub(crate) name: String,
    pub(crate) display_name: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) type_name: Option<String>,
    pub(crate) arguments: BTreeMap<String, ArgumentProperties>,
}

impl StepProperties {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Explicitly set display name, if any
    pub fn explicit_display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Display name, falling back to the name
    pub fn display_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(&self.name)
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The implementation type to load
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn argument(&self, name: &str) -> Option<&ArgumentProperties> {
        self.arguments.get(name)
    }

    /// Argument fragments ordered by name
    pub fn arguments(&self) -> impl Iterator<Item = &ArgumentProperties> {
        self.arguments.values()
    }

    pub fn set_type_name(&mut self, type_name: impl Into<String>) {
        self.type_name = Some(type_name.into());
    }

    fn set_property(&mut self, property: &str, value: &str) -> Result<(), ()> {
        match property {
            "displayName" => self.display_name = Some(value.to_string()),
            "description" => self.description = Some(value.to_string()),
            "typeName" => self.type_name = Some(value.to_string()),
            _ => return Err(()),
        }
        Ok(())
    }

    fn argument_mut(&mut self, name: &str) -> &mut ArgumentProperties {
        self.arguments
            .entry(name.to_string())
            .or_insert_with(|| ArgumentProperties::new(name))
    }

    /// Layers `other` over this fragment: every field set in `other` wins.
    pub fn merge(&mut self, other: &StepProperties) {
        overwrite(&mut self.display_name, &other.display_name);
        overwrite(&mut self.description, &other.description);
        overwrite(&mut self.type_name, &other.type_name);
        for (name, argument) in &other.arguments {
            self.argument_mut(name).merge(argument);
        }
    }
}

fn overwrite(target: &mut Option<String>, source: &Option<String>) {
    if let Some(value) = source {
        *target = Some(value.clone());
    }
}

/// Accumulated descriptor fragments keyed by function name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorSet {
    steps: BTreeMap<String, StepProperties>,
}

impl DescriptorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and folds in a resource's text
    pub fn merge_text(
        &mut self,
        kind: ResourceKind<'_>,
        origin: &str,
        text: &str,
    ) -> Vec<DescriptorWarning> {
        parse_properties(text)
            .iter()
            .filter_map(|entry| self.apply_entry(kind, origin, entry))
            .collect()
    }

    /// Folds a single entry in
    pub fn apply_entry(
        &mut self,
        kind: ResourceKind<'_>,
        origin: &str,
        entry: &DescriptorEntry,
    ) -> Option<DescriptorWarning> {
        let key = match kind {
            ResourceKind::Index => entry.key.clone(),
            ResourceKind::Arguments { function } => {
                if !entry.key.contains('.') {
                    return None;
                }
                format!("{}.{}", function, entry.key)
            }
        };

        let Some((function, argument, property)) = split_key(&key) else {
            if kind == ResourceKind::Index && !key.is_empty() && !key.contains('.') {
                self.step_mut(&key).type_name = Some(entry.value.clone());
            }
            return None;
        };

        let step = self.step_mut(function);
        match argument {
            None => step.set_property(property, &entry.value).err().map(|_| {
                DescriptorWarning::UnknownStepProperty {
                    origin: origin.to_string(),
                    line: entry.line,
                    step: function.to_string(),
                    property: property.to_string(),
                    value: entry.value.clone(),
                }
            }),
            Some(argument) => step
                .argument_mut(argument)
                .set_property(property, &entry.value)
                .err()
                .map(|_| DescriptorWarning::UnknownArgumentProperty {
                    origin: origin.to_string(),
                    line: entry.line,
                    step: function.to_string(),
                    argument: argument.to_string(),
                    property: property.to_string(),
                    value: entry.value.clone(),
                }),
        }
    }

    /// Layers another set over this one, function by function
    pub fn merge(&mut self, other: &DescriptorSet) {
        for (name, step) in &other.steps {
            self.step_mut(name).merge(step);
        }
    }

    fn step_mut(&mut self, name: &str) -> &mut StepProperties {
        self.steps
            .entry(name.to_string())
            .or_insert_with(|| StepProperties::new(name))
    }

    pub fn get(&self, name: &str) -> Option<&StepProperties> {
        self.steps.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.steps.contains_key(name)
    }

    /// Fragments ordered by function name
    pub fn steps(&self) -> impl Iterator<Item = &StepProperties> {
        self.steps.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Splits `function[.argument].property`.
///
/// Function is the text before the first dot, property the text after the
/// last one, argument whatever sits in between.
fn split_key(key: &str) -> Option<(&str, Option<&str>, &str)> {
    let first = key.find('.')?;
    let last = key.rfind('.')?;
    let function = &key[..first];
    let property = &key[last + 1..];
    if function.is_empty() || property.is_empty() {
        return None;
    }
    if first == last {
        return Some((function, None, property));
    }
    let argument = &key[first + 1..last];
    if argument.is_empty() {
        return None;
    }
    Some((function, Some(argument), property))
}

// ============================================================================
// Properties text parsing
// ============================================================================

/// Parses Java-properties style text.
///
/// Supports `#`/`!` comments, `=`, `:` or whitespace separators, backslash
/// line continuations and the `\t \n \r \f \uXXXX` escapes.
pub fn parse_properties(text: &str) -> Vec<DescriptorEntry> {
    logical_lines(text)
        .into_iter()
        .map(|(line, content)| {
            let (key, value) = split_entry(&content);
            DescriptorEntry { key, value, line }
        })
        .filter(|entry| !entry.key.is_empty())
        .collect()
}

fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (index, raw) in text.lines().enumerate() {
        let trimmed = raw.trim_start();
        let (start, mut buffer) = match pending.take() {
            Some(continued) => continued,
            None => {
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                    continue;
                }
                (index + 1, String::new())
            }
        };

        if ends_with_continuation(trimmed) {
            buffer.push_str(&trimmed[..trimmed.len() - 1]);
            pending = Some((start, buffer));
        } else {
            buffer.push_str(trimmed);
            lines.push((start, buffer));
        }
    }

    if let Some(last) = pending {
        lines.push(last);
    }
    lines
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (String, String) {
    let chars: Vec<char> = line.chars().collect();
    let mut index = 0;
    let mut raw_key = String::new();

    while index < chars.len() {
        let c = chars[index];
        if c == '\\' && index + 1 < chars.len() {
            raw_key.push(c);
            raw_key.push(chars[index + 1]);
            index += 2;
            continue;
        }
        if c == '=' || c == ':' || c.is_whitespace() {
            break;
        }
        raw_key.push(c);
        index += 1;
    }

    // Separator: optional whitespace, at most one '=' or ':', optional whitespace
    while index < chars.len() && chars[index].is_whitespace() {
        index += 1;
    }
    if index < chars.len() && (chars[index] == '=' || chars[index] == ':') {
        index += 1;
    }
    while index < chars.len() && chars[index].is_whitespace() {
        index += 1;
    }

    let raw_value: String = chars[index..].iter().collect();
    (unescape(&raw_key), unescape(raw_value.trim_end_matches(['\r'])))
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{000C}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(text: &str) -> (DescriptorSet, Vec<DescriptorWarning>) {
        let mut set = DescriptorSet::new();
        let warnings = set.merge_text(ResourceKind::Index, "test", text);
        (set, warnings)
    }

    #[test]
    fn test_parse_separators_and_comments() {
        let entries = parse_properties(
            "# comment\n! another\n\nhello.typeName=a::Hello\nbye.typeName : a::Bye\nsp.typeName a::Sp\n",
        );
        let pairs: Vec<_> = entries
            .iter()
            .map(|e| (e.key.as_str(), e.value.as_str(), e.line))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("hello.typeName", "a::Hello", 4),
                ("bye.typeName", "a::Bye", 5),
                ("sp.typeName", "a::Sp", 6),
            ]
        );
    }

    #[test]
    fn test_parse_continuations_and_escapes() {
        let entries = parse_properties(
            "hello.description=Says \\\n    hello\nkey\\=with\\:seps=tab\\there\nuni=caf\\u00e9\n",
        );
        assert_eq!(entries[0].value, "Says hello");
        assert_eq!(entries[0].line, 1);
        assert_eq!(entries[1].key, "key=with:seps");
        assert_eq!(entries[1].value, "tab\there");
        assert_eq!(entries[2].value, "café");
    }

    #[test]
    fn test_even_backslashes_do_not_continue() {
        let entries = parse_properties("path=C:\\\\\nnext=1\n");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].value, "C:\\");
    }

    #[test]
    fn test_function_and_argument_properties() {
        let (set, warnings) = index(
            "hello.typeName=sample::Hello\nhello.displayName=Hello\nhello.name.type=String\nhello.name.description=Who to greet\n",
        );
        assert!(warnings.is_empty());
        let hello = set.get("hello").unwrap();
        assert_eq!(hello.type_name(), Some("sample::Hello"));
        assert_eq!(hello.display_name(), "Hello");
        let name = hello.argument("name").unwrap();
        assert_eq!(name.type_name(), Some("String"));
        assert_eq!(name.description(), Some("Who to greet"));
    }

    #[test]
    fn test_bare_index_key_is_type_shorthand() {
        let (set, _) = index("hello=sample::Hello\n");
        assert_eq!(set.get("hello").unwrap().type_name(), Some("sample::Hello"));
    }

    #[test]
    fn test_bare_key_ignored_in_argument_resources() {
        let mut set = DescriptorSet::new();
        let warnings = set.merge_text(
            ResourceKind::Arguments { function: "cheese" },
            "test",
            "orphan=1\namount.displayName=Amount\n",
        );
        assert!(warnings.is_empty());
        let cheese = set.get("cheese").unwrap();
        assert_eq!(cheese.arguments().count(), 1);
        assert_eq!(cheese.argument("amount").unwrap().display_name(), Some("Amount"));
    }

    #[test]
    fn test_unknown_properties_warn() {
        let (set, warnings) = index("hello.colour=blue\nhello.name.size=3\n");
        assert_eq!(warnings.len(), 2);
        assert!(matches!(
            &warnings[0],
            DescriptorWarning::UnknownStepProperty { property, line: 1, .. } if property == "colour"
        ));
        assert!(matches!(
            &warnings[1],
            DescriptorWarning::UnknownArgumentProperty { argument, property, .. }
                if argument == "name" && property == "size"
        ));
        assert_eq!(set.get("hello").unwrap().type_name(), None);
    }

    #[test]
    fn test_malformed_keys_are_ignored() {
        let (set, warnings) = index(".typeName=x\nhello.=x\nhello..type=x\n");
        assert!(warnings.is_empty());
        assert!(set.get("hello").is_none());
    }

    #[test]
    fn test_later_entries_overwrite() {
        let (set, _) = index("hello.displayName=First\nhello.displayName=Second\n");
        assert_eq!(set.get("hello").unwrap().display_name(), "Second");
    }

    #[test]
    fn test_display_name_falls_back_to_name() {
        let (set, _) = index("hello.typeName=x::Hello\n");
        assert_eq!(set.get("hello").unwrap().display_name(), "hello");
    }

    #[test]
    fn test_merge_disjoint_fragments_commutes() {
        let (a, _) = index("hello.typeName=x::Hello\nhello.name.type=String\n");
        let (b, _) = index("hello.displayName=Hello\nhello.name.description=Who\n");

        let mut ab = DescriptorSet::new();
        ab.merge(&a);
        ab.merge(&b);
        let mut ba = DescriptorSet::new();
        ba.merge(&b);
        ba.merge(&a);
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let (a, _) = index("hello.typeName=x::Hello\nhello.name.type=String\n");
        let mut once = DescriptorSet::new();
        once.merge(&a);
        let mut twice = once.clone();
        twice.merge(&a);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_later_set_wins_on_conflict() {
        let (a, _) = index("hello.displayName=A\n");
        let (b, _) = index("hello.displayName=B\n");
        let mut set = a.clone();
        set.merge(&b);
        assert_eq!(set.get("hello").unwrap().display_name(), "B");
    }

    #[test]
    fn test_arguments_resource_path() {
        assert_eq!(arguments_resource("cheese"), "stepkit/cheese-arguments.properties");
    }
}
