// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use stepkit_runtime::{Apply, StepArguments, register_step_type};

use crate::base::BaseFunction;

#[derive(Debug, Default, StepArguments)]
pub struct AnotherContext {
    #[arg(display_name = "Name", description = "Who to greet", default = "DefaultName")]
    pub name: Option<String>,
}

/// Reusable greeting entry point
#[derive(Debug, Default, StepArguments)]
pub struct Greeter {
    #[arg(flatten)]
    pub base: BaseFunction,
}

impl Apply<AnotherContext> for Greeter {
    type Output = String;

    fn apply(&mut self, context: AnotherContext) -> anyhow::Result<String> {
        let name = context
            .name
            .ok_or_else(|| anyhow::anyhow!("<name> not provided"))?;
        Ok(format!("Hello {}", name))
    }
}

register_step_type!(Greeter: apply(AnotherContext));

/// Declares no entry point of its own; `apply` comes from the embedded
/// [`Greeter`].
#[derive(Debug, Default, StepArguments)]
#[step(display_name = "Another greeting")]
pub struct AnotherFunction {
    #[arg(flatten)]
    pub greeter: Greeter,
}

register_step_type!(AnotherFunction: extends(Greeter, greeter));
