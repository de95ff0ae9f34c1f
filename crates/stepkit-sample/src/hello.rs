// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use stepkit_runtime::{Callable, StepArguments, register_step_type};

/// Greets `name`.
#[derive(Debug, Default, StepArguments)]
#[step(display_name = "Says hello")]
pub struct HelloFunction {
    #[arg(display_name = "Name")]
    pub name: Option<String>,
}

impl HelloFunction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

impl Callable for HelloFunction {
    type Output = String;

    fn call(&mut self) -> anyhow::Result<String> {
        Ok(format!("Hello {}", self.name.as_deref().unwrap_or_default()))
    }
}

register_step_type!(HelloFunction: call);

/// Greets, then says goodbye. Reuses [`HelloFunction`] by embedding it, so
/// `name` binds onto the embedded greeter.
#[derive(Debug, Default, StepArguments)]
#[step(name = "helloGoodbye", display_name = "Says hello and goodbye")]
pub struct HelloGoodbyeFunction {
    #[arg(flatten)]
    pub hello: HelloFunction,
    #[arg(display_name = "Goodbye")]
    pub bye: Option<String>,
    #[arg(skip)]
    pub dummy_regular_field: Option<String>,
}

impl Callable for HelloGoodbyeFunction {
    type Output = String;

    fn call(&mut self) -> anyhow::Result<String> {
        let hello = self.hello.call()?;
        Ok(match &self.bye {
            Some(bye) => format!("{} {}", hello, bye),
            None => hello,
        })
    }
}

register_step_type!(HelloGoodbyeFunction: call);
