// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Sample step functions
//!
//! One implementation per calling convention, described by the embedded
//! descriptors under `resources/stepkit/`:
//! - `hello`, `helloGoodbye`: zero-argument `call`, arguments bound onto the
//!   instance (the second one embeds the first)
//! - `example`, `functionExample`: `apply` with a typed holder or a raw map
//! - `anotherFn`: inherits the `apply` entry point of an embedded [`another::Greeter`]
//! - `cheese`, `beer`: `#[step]` methods

use stepkit_runtime::{FunctionRegistry, RegistryConfig, StepError};

pub mod another;
pub mod base;
pub mod example;
pub mod functions;
pub mod hello;

pub use another::{AnotherContext, AnotherFunction, Greeter};
pub use base::BaseFunction;
pub use example::{ExampleContext, ExampleFunction, FunctionExample, StepResult};
pub use functions::Functions;
pub use hello::{HelloFunction, HelloGoodbyeFunction};

stepkit_runtime::stepkit_dsl::embed_descriptor!(
    "stepkit/steps.properties",
    include_str!("../resources/stepkit/steps.properties")
);
stepkit_runtime::stepkit_dsl::embed_descriptor!(
    "stepkit/hello-arguments.properties",
    include_str!("../resources/stepkit/hello-arguments.properties")
);
stepkit_runtime::stepkit_dsl::embed_descriptor!(
    "stepkit/beer-arguments.properties",
    include_str!("../resources/stepkit/beer-arguments.properties")
);

/// Registry over the sample functions and anything else `config` reaches
pub fn registry(config: &RegistryConfig) -> Result<FunctionRegistry, StepError> {
    FunctionRegistry::from_config(config)
}
