// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::PathBuf;

use stepkit_runtime::{Logger, StepArguments};

/// Ambient state shared by the sample implementations. Embed it with
/// `#[arg(flatten)]` to receive the logger and working directory.
#[derive(Debug, Default, StepArguments)]
pub struct BaseFunction {
    #[arg(inject)]
    pub logger: Logger,
    #[arg(inject)]
    pub current_dir: PathBuf,
}
