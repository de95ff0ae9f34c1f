// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use stepkit_runtime::{Apply, Logger, StepArguments, register_step_type};

use crate::base::BaseFunction;

/// Outcome reported by the message functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepResult {
    Success,
    Failure,
}

#[derive(Debug, Default, StepArguments)]
pub struct ExampleContext {
    #[arg(
        display_name = "Message",
        description = "The message to echo",
        default = "DefaultMessage"
    )]
    pub message: Option<String>,
}

/// Echoes the message of its context.
#[derive(Debug, Default, StepArguments)]
#[step(name = "example", display_name = "Some example function")]
pub struct ExampleFunction {
    #[arg(flatten)]
    pub base: BaseFunction,
}

impl Apply<ExampleContext> for ExampleFunction {
    type Output = StepResult;

    fn apply(&mut self, context: ExampleContext) -> anyhow::Result<StepResult> {
        Ok(echo_message(&self.base.logger, context.message.as_deref()))
    }
}

register_step_type!(ExampleFunction: apply(ExampleContext));

/// Same as [`ExampleFunction`], reading the message from the raw argument
/// map instead of a typed holder.
#[derive(Debug, Default, StepArguments)]
#[step(display_name = "Example over raw arguments")]
pub struct FunctionExample {
    #[arg(inject)]
    pub logger: Logger,
}

impl Apply<HashMap<String, Value>> for FunctionExample {
    type Output = StepResult;

    fn apply(&mut self, arguments: HashMap<String, Value>) -> anyhow::Result<StepResult> {
        let message = arguments.get("message").and_then(Value::as_str);
        Ok(echo_message(&self.logger, message))
    }
}

register_step_type!(FunctionExample: apply(HashMap<String, Value>));

fn echo_message(logger: &Logger, message: Option<&str>) -> StepResult {
    match message {
        Some(message) => {
            logger.echo(format!("Hello, {}", message));
            StepResult::Success
        }
        None => {
            logger.error("<message> not provided");
            StepResult::Failure
        }
    }
}
