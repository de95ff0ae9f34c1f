// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Registry loading over directory search roots and explicitly described
//! step types.

use std::fs;
use std::path::Path;

use serde_json::{Value, json};
use stepkit_runtime::stepkit_dsl::DescriptorWarning;
use stepkit_runtime::{
    Apply, ApplyEntry, Arguments, CallEntry, Callable, FunctionRegistry, InvocationContext,
    ParentLink, SearchScope, StaticTypeLoader, StepArguments, StepError, StepMethods, StepObject,
    StepTypeDescriptor, step_methods,
};
use tempfile::TempDir;

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Debug, Default, StepArguments)]
pub struct GreetContext {
    pub name: Option<String>,
}

/// Has both a `call` and an `apply` entry point.
#[derive(Debug, Default, StepArguments)]
#[step(display_name = "Both conventions")]
pub struct Both {
    pub name: Option<String>,
}

impl Callable for Both {
    type Output = String;

    fn call(&mut self) -> anyhow::Result<String> {
        Ok(format!("called {}", self.name.as_deref().unwrap_or_default()))
    }
}

impl Apply<GreetContext> for Both {
    type Output = String;

    fn apply(&mut self, context: GreetContext) -> anyhow::Result<String> {
        Ok(format!("applied {}", context.name.unwrap_or_default()))
    }
}

/// Two `apply` entry points, the untyped one declared first.
#[derive(Debug, Default, StepArguments)]
pub struct TwoApplies {}

impl Apply<Arguments> for TwoApplies {
    type Output = Value;

    fn apply(&mut self, arguments: Arguments) -> anyhow::Result<Value> {
        Ok(Value::Object(arguments))
    }
}

impl Apply<GreetContext> for TwoApplies {
    type Output = String;

    fn apply(&mut self, context: GreetContext) -> anyhow::Result<String> {
        Ok(format!("typed {}", context.name.unwrap_or_default()))
    }
}

#[derive(Debug, Default, StepArguments)]
pub struct Parent {
    pub name: Option<String>,
}

impl Callable for Parent {
    type Output = String;

    fn call(&mut self) -> anyhow::Result<String> {
        match &self.name {
            Some(name) => Ok(format!("parent {}", name)),
            None => anyhow::bail!("no name"),
        }
    }
}

#[derive(Debug, Default, StepArguments)]
pub struct Child {
    #[arg(flatten)]
    pub parent: Parent,
}

fn project_parent(target: &mut dyn StepObject) -> Option<&mut dyn StepObject> {
    target
        .as_any_mut()
        .downcast_mut::<Child>()
        .map(|child| &mut child.parent as &mut dyn StepObject)
}

#[derive(Debug, Default, StepArguments)]
pub struct Inert {
    pub name: Option<String>,
}

#[derive(Debug, Default, StepArguments)]
pub struct Duplicates {}

#[step_methods]
impl Duplicates {
    #[step(name = "dup", display_name = "First")]
    pub fn first(&self) -> String {
        "first".to_string()
    }

    #[step(name = "dup", display_name = "Second")]
    pub fn second(&self) -> String {
        "second".to_string()
    }

    #[step(display_name = "Adds numbers")]
    pub fn add(&self, left: i64, right: Option<i64>) -> i64 {
        left + right.unwrap_or_default()
    }
}

fn both() -> StepTypeDescriptor {
    let mut descriptor = StepTypeDescriptor::of::<Both>();
    descriptor.call = Some(CallEntry::of::<Both>());
    descriptor.apply.push(ApplyEntry::of::<Both, GreetContext>());
    descriptor
}

fn two_applies() -> StepTypeDescriptor {
    let mut descriptor = StepTypeDescriptor::of::<TwoApplies>();
    descriptor.apply.push(ApplyEntry::of::<TwoApplies, Arguments>());
    descriptor.apply.push(ApplyEntry::of::<TwoApplies, GreetContext>());
    descriptor
}

fn parent() -> StepTypeDescriptor {
    let mut descriptor = StepTypeDescriptor::of::<Parent>();
    descriptor.call = Some(CallEntry::of::<Parent>());
    descriptor
}

fn child() -> StepTypeDescriptor {
    let mut descriptor = StepTypeDescriptor::of::<Child>();
    descriptor.parent = Some(ParentLink {
        type_name: Parent::TYPE_NAME,
        project: project_parent,
    });
    descriptor
}

fn duplicates() -> StepTypeDescriptor {
    let mut descriptor = StepTypeDescriptor::of::<Duplicates>();
    descriptor.methods = Duplicates::step_methods();
    descriptor
}

fn loader() -> StaticTypeLoader {
    StaticTypeLoader::new()
        .with(both())
        .with(two_applies())
        .with(parent())
        .with(child())
        .with(duplicates())
}

fn write(root: &Path, path: &str, contents: &str) {
    let file = root.join(path);
    fs::create_dir_all(file.parent().unwrap()).unwrap();
    fs::write(file, contents).unwrap();
}

/// A search root holding a step index with one `name.typeName` line per entry
fn root_with_index(entries: &[(&str, &str)], extra: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let mut index: String = entries
        .iter()
        .map(|(name, type_name)| format!("{}.typeName = {}\n", name, type_name))
        .collect();
    index.push_str(extra);
    write(dir.path(), "stepkit/steps.properties", &index);
    dir
}

fn args(value: Value) -> Arguments {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {}", other),
    }
}

// ============================================================================
// Dispatch selection
// ============================================================================

#[test]
fn test_call_takes_precedence_over_apply() {
    let root = root_with_index(&[("both", Both::TYPE_NAME)], "");
    let registry =
        FunctionRegistry::load(&SearchScope::new().with_root(root.path()), &loader()).unwrap();

    let metadata = registry.metadata("both").unwrap();
    assert_eq!(metadata.display_name(), "Both conventions");
    let names: Vec<_> = metadata.arguments().iter().map(|a| a.name()).collect();
    assert_eq!(names, vec!["name"]);

    let result = registry
        .invoke("both", &args(json!({"name": "James"})), &InvocationContext::default())
        .unwrap();
    assert_eq!(result, json!("called James"));
}

#[test]
fn test_typed_apply_is_preferred_over_top_type() {
    let root = root_with_index(&[("typed", TwoApplies::TYPE_NAME)], "");
    let registry =
        FunctionRegistry::load(&SearchScope::new().with_root(root.path()), &loader()).unwrap();

    let function = registry.function("typed").unwrap();
    assert_eq!(function.metadata().return_type(), "String");
    assert_eq!(
        function
            .invoke(&args(json!({"name": "James"})), &InvocationContext::default())
            .unwrap(),
        json!("typed James")
    );
}

#[test]
fn test_entry_point_is_inherited_through_parent() {
    let root = root_with_index(&[("child", Child::TYPE_NAME)], "");
    let registry =
        FunctionRegistry::load(&SearchScope::new().with_root(root.path()), &loader()).unwrap();

    let result = registry
        .invoke("child", &args(json!({"name": "James"})), &InvocationContext::default())
        .unwrap();
    assert_eq!(result, json!("parent James"));

    let err = registry
        .invoke("child", &Arguments::new(), &InvocationContext::default())
        .unwrap_err();
    match err {
        StepError::Invocation { entry_point, .. } => {
            assert_eq!(entry_point, format!("{}::call", Parent::TYPE_NAME));
        }
        other => panic!("expected an invocation error, got {:?}", other),
    }
}

#[test]
fn test_misconfigured_types_are_skipped() {
    let mut orphan = StepTypeDescriptor::of::<Inert>();
    orphan.parent = Some(ParentLink {
        type_name: "registry_test::Missing",
        project: project_parent,
    });
    let mut cyclic = StepTypeDescriptor::of::<Child>();
    cyclic.type_name = "registry_test::Cyclic";
    cyclic.parent = Some(ParentLink {
        type_name: "registry_test::Cyclic",
        project: project_parent,
    });
    let mut inert = StepTypeDescriptor::of::<Inert>();
    inert.type_name = "registry_test::Inert2";
    let loader = StaticTypeLoader::new()
        .with(orphan)
        .with(cyclic)
        .with(inert);

    let root = root_with_index(
        &[
            ("cyclic", "registry_test::Cyclic"),
            ("inert", "registry_test::Inert2"),
            ("orphan", Inert::TYPE_NAME),
            ("unknown", "registry_test::Nowhere"),
        ],
        "",
    );
    let registry =
        FunctionRegistry::load(&SearchScope::new().with_root(root.path()), &loader).unwrap();

    assert!(registry.is_empty());
    let codes: Vec<_> = registry.problems().iter().map(|p| p.error_code()).collect();
    assert_eq!(
        codes,
        vec![
            "CONFIGURATION_ERROR",
            "CONFIGURATION_ERROR",
            "CONFIGURATION_ERROR",
            "TYPE_NOT_FOUND"
        ]
    );
    assert!(registry.problems()[0].to_string().contains("cyclic"));
    assert!(registry.problems()[2].to_string().contains("not registered"));
}

#[test]
fn test_strict_load_fails_on_first_problem() {
    let root = root_with_index(
        &[("both", Both::TYPE_NAME), ("unknown", "registry_test::Nowhere")],
        "",
    );
    let scope = SearchScope::new().with_root(root.path());

    let err = FunctionRegistry::load_strict(&scope, &loader()).unwrap_err();
    assert_eq!(err.error_code(), "TYPE_NOT_FOUND");

    let lenient = FunctionRegistry::load(&scope, &loader()).unwrap();
    assert_eq!(lenient.names().collect::<Vec<_>>(), vec!["both"]);
    assert_eq!(lenient.problems().len(), 1);
}

// ============================================================================
// Method functions
// ============================================================================

#[test]
fn test_duplicate_method_names_keep_the_first() {
    let root = root_with_index(&[("math", Duplicates::TYPE_NAME)], "");
    let registry =
        FunctionRegistry::load(&SearchScope::new().with_root(root.path()), &loader()).unwrap();

    assert_eq!(registry.names().collect::<Vec<_>>(), vec!["add", "dup"]);
    assert_eq!(registry.metadata("dup").unwrap().display_name(), "First");
    assert_eq!(
        registry
            .invoke("dup", &Arguments::new(), &InvocationContext::default())
            .unwrap(),
        json!("first")
    );
}

#[test]
fn test_optional_method_parameters_may_be_absent() {
    let root = root_with_index(&[("math", Duplicates::TYPE_NAME)], "");
    let registry =
        FunctionRegistry::load(&SearchScope::new().with_root(root.path()), &loader()).unwrap();
    let context = InvocationContext::default();

    assert_eq!(
        registry
            .invoke("add", &args(json!({"left": 2, "right": "3"})), &context)
            .unwrap(),
        json!(5)
    );
    assert_eq!(
        registry.invoke("add", &args(json!({"left": 2})), &context).unwrap(),
        json!(2)
    );
    let err = registry
        .invoke("add", &args(json!({"right": 2})), &context)
        .unwrap_err();
    assert_eq!(err.error_code(), "BINDING_ERROR");
}

// ============================================================================
// Descriptor resources
// ============================================================================

#[test]
fn test_later_origin_overrides_earlier_descriptions() {
    let base = tempfile::tempdir().unwrap();
    let first = base.path().join("a");
    let second = base.path().join("b");
    write(
        &first,
        "stepkit/steps.properties",
        &format!("both.typeName = {}\nboth.description = First\n", Both::TYPE_NAME),
    );
    write(&second, "stepkit/steps.properties", "both.description = Second\n");

    // Root order does not matter, origins do
    let scope = SearchScope::new().with_root(&second).with_root(&first);
    let registry = FunctionRegistry::load(&scope, &loader()).unwrap();

    assert_eq!(registry.metadata("both").unwrap().description(), "Second");
}

#[test]
fn test_step_without_type_name_is_reported() {
    let root = root_with_index(&[("both", Both::TYPE_NAME)], "orphan.description = Lost\n");
    let registry =
        FunctionRegistry::load(&SearchScope::new().with_root(root.path()), &loader()).unwrap();

    assert_eq!(registry.len(), 1);
    assert!(registry.warnings().iter().any(
        |w| matches!(w, DescriptorWarning::MissingTypeName { step } if step == "orphan")
    ));
}

#[test]
fn test_argument_resource_warnings() {
    let root = root_with_index(&[("both", Both::TYPE_NAME)], "");
    write(
        root.path(),
        "stepkit/both-arguments.properties",
        "name.colour = red\n\
         name.type = i64\n\
         name.displayName = Person\n\
         name.description = Who to greet\n\
         extra.type = registry_test::Nowhere\n\
         extra.displayName = Extra\n",
    );

    let registry =
        FunctionRegistry::load(&SearchScope::new().with_root(root.path()), &loader()).unwrap();
    let metadata = registry.metadata("both").unwrap();

    let name = metadata.argument("name").unwrap();
    assert_eq!(name.declared_type(), "Option<String>");
    assert_eq!(name.display_name(), "Person");
    assert_eq!(name.description(), "Who to greet");

    let extra = metadata.argument("extra").unwrap();
    assert_eq!(extra.declared_type(), "Value");
    assert_eq!(extra.display_name(), "Extra");

    let warnings = registry.warnings();
    assert!(warnings.iter().any(|w| matches!(
        w,
        DescriptorWarning::UnknownArgumentProperty { argument, property, .. }
            if argument == "name" && property == "colour"
    )));
    assert!(warnings.iter().any(|w| matches!(
        w,
        DescriptorWarning::TypeOverrideIgnored { argument, .. } if argument == "name"
    )));
    assert!(warnings.iter().any(|w| matches!(
        w,
        DescriptorWarning::UnresolvedType { argument, .. } if argument == "extra"
    )));
}

#[test]
fn test_unreadable_index_aborts_loading() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("stepkit/steps.properties")).unwrap();

    let err = FunctionRegistry::load(&SearchScope::new().with_root(root.path()), &loader())
        .unwrap_err();
    assert_eq!(err.error_code(), "RESOURCE_ERROR");
}

#[test]
fn test_registry_is_shareable_between_threads() {
    let root = root_with_index(&[("both", Both::TYPE_NAME)], "");
    let registry = std::sync::Arc::new(
        FunctionRegistry::load(&SearchScope::new().with_root(root.path()), &loader()).unwrap(),
    );

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let registry = registry.clone();
            std::thread::spawn(move || {
                registry
                    .invoke(
                        "both",
                        &args(json!({"name": format!("t{}", i)})),
                        &InvocationContext::default(),
                    )
                    .unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), json!(format!("called t{}", i)));
    }
}
