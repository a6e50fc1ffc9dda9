//---------------------------------------------------------------------------//
// Copyright (c) 2025 The tagsmith contributors. All rights reserved.
//
// This file is part of the tagsmith project, a schema-driven codec and
// version migrator for game engine tag files.
//
// This file is licensed under the MIT license, which can be found here:
// https://opensource.org/licenses/MIT
//---------------------------------------------------------------------------//

//! Command implementations. Per-file failures are logged and never escape:
//! the process exits nonzero only when the schema itself failed to load.

use log::{error, info, warn};

use std::path::Path;

use tagsmith_lib::driver::{Driver, FileOutcome};

//---------------------------------------------------------------------------//
//                              Command Variants
//---------------------------------------------------------------------------//

/// This function decodes a single tag file and re-encodes it, reporting
/// whether the recompiled bytes match the original.
pub fn command_single(driver: &Driver, input: &Path, output: &Path) {
    match driver.process_file(input, output) {
        Ok(FileOutcome::Identical) => info!("Recompiled {} byte-identical.", input.display()),
        Ok(FileOutcome::Mismatched) => warn!("Recompiled {} differs from the original.", input.display()),
        Ok(FileOutcome::Written) => info!("Recompiled {}.", input.display()),
        Err(error) => error!("Failed to process {}: {error}", input.display()),
    }
}

/// This function encodes a tag file from a JSON dump.
pub fn command_from_json(driver: &Driver, input: &Path, output: &Path) {
    match driver.process_json(input, output) {
        Ok(_) => info!("Encoded {} from {}.", output.display(), input.display()),
        Err(error) => error!("Failed to encode {}: {error}", output.display()),
    }
}

/// This function walks a directory tree, re-encoding every tag file and
/// logging failures and hash mismatches to the error log.
pub fn command_batch(driver: &Driver, input_dir: &Path, output_dir: &Path, log: &Path) {
    match driver.process_tree(input_dir, output_dir, log) {
        Ok(summary) => info!(
            "Processed {} files ({} mismatched, {} failed). Details in {}.",
            summary.processed(),
            summary.mismatched(),
            summary.failed(),
            log.display(),
        ),
        Err(error) => error!("Failed to walk {}: {error}", input_dir.display()),
    }
}
