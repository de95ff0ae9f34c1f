// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stepkit Harness
//!
//! A binary for exercising step functions in isolation. It links against
//! `stepkit-sample` (so the sample functions and their embedded descriptors
//! are registered) and loads any further descriptors reachable through
//! `STEPKIT_SEARCH_PATH`.
//!
//! ## Input Format (via `INPUT_JSON` env var)
//!
//! ```json
//! {
//!   "mode": "invoke",
//!   "function": "cheese",
//!   "arguments": {"name": "James", "amount": 2},
//!   "current_dir": "/tmp"
//! }
//! ```
//!
//! `mode` is one of `invoke` (default), `describe` or `list`. `function` is
//! required except for `list`.
//!
//! ## Output Format (written to stdout)
//!
//! ```json
//! {"status": "completed", "result": "Hello James #2"}
//! {"status": "failed", "error": "...", "code": "BINDING_ERROR"}
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use stepkit_runtime::{Arguments, FunctionRegistry, InvocationContext, Logger, RegistryConfig};
use tracing::{debug, warn};

/// What the harness should do with the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Mode {
    #[default]
    Invoke,
    Describe,
    List,
}

/// Harness request input format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HarnessRequest {
    #[serde(default)]
    mode: Mode,

    /// Registered function name (e.g., "hello", "cheese")
    #[serde(default)]
    function: Option<String>,

    /// Named arguments
    #[serde(default)]
    arguments: Arguments,

    /// Working directory handed to the function; defaults to the process's
    #[serde(default)]
    current_dir: Option<PathBuf>,
}

/// Harness result, one JSON document on stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum HarnessOutput {
    Completed {
        result: Value,
    },
    Failed {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

impl HarnessOutput {
    fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
            code: None,
        }
    }

    fn write(&self) -> ExitCode {
        match serde_json::to_string(self) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("Failed to serialize output: {}", e),
        }
        match self {
            Self::Completed { .. } => ExitCode::SUCCESS,
            Self::Failed { .. } => ExitCode::FAILURE,
        }
    }
}

impl From<stepkit_runtime::StepError> for HarnessOutput {
    fn from(error: stepkit_runtime::StepError) -> Self {
        Self::Failed {
            code: Some(error.error_code().to_string()),
            error: error.to_string(),
        }
    }
}

fn main() -> ExitCode {
    // Load .env file if present
    let dotenv = dotenvy::dotenv();

    // Logs go to stderr; stdout carries the result
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stepkit=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dotenv {
        debug!("No .env file loaded: {}", e);
    }

    let input_json = match std::env::var("INPUT_JSON") {
        Ok(json) => json,
        Err(_) => return HarnessOutput::failed("INPUT_JSON environment variable not set").write(),
    };

    let request: HarnessRequest = match serde_json::from_str(&input_json) {
        Ok(req) => req,
        Err(e) => {
            return HarnessOutput::failed(format!("Failed to parse INPUT_JSON: {}", e)).write();
        }
    };

    let config = match RegistryConfig::from_env() {
        Ok(config) => config,
        Err(e) => return HarnessOutput::failed(format!("Invalid configuration: {}", e)).write(),
    };

    let registry = match stepkit_sample::registry(&config) {
        Ok(registry) => registry,
        Err(e) => return HarnessOutput::from(e).write(),
    };
    for problem in registry.problems() {
        warn!(code = problem.error_code(), "{}", problem);
    }

    execute(&registry, &request).write()
}

/// Run one request against a loaded registry.
fn execute(registry: &FunctionRegistry, request: &HarnessRequest) -> HarnessOutput {
    let outcome = match request.mode {
        Mode::List => list(registry),
        Mode::Invoke | Mode::Describe => {
            let Some(name) = request.function.as_deref() else {
                return HarnessOutput::failed("\"function\" is required");
            };
            let context = InvocationContext::new(
                Logger::tracing(),
                request.current_dir.clone().unwrap_or_else(|| PathBuf::from(".")),
            );
            if request.mode == Mode::Invoke {
                registry.invoke(name, &request.arguments, &context)
            } else {
                describe(registry, name, &request.arguments, &context)
            }
        }
    };
    match outcome {
        Ok(result) => HarnessOutput::Completed { result },
        Err(e) => HarnessOutput::from(e),
    }
}

fn list(registry: &FunctionRegistry) -> stepkit_runtime::Result<Value> {
    let functions: Vec<Value> = registry
        .functions()
        .map(|f| json!(f.metadata()))
        .collect();
    Ok(Value::Array(functions))
}

fn describe(
    registry: &FunctionRegistry,
    name: &str,
    arguments: &Arguments,
    context: &InvocationContext,
) -> stepkit_runtime::Result<Value> {
    let function = registry.function(name)?;
    let defaults = function.describe_default_arguments(arguments, context)?;
    Ok(json!({
        "metadata": function.metadata(),
        "arguments": defaults,
    }))
}
