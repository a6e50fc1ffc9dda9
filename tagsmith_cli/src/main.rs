//---------------------------------------------------------------------------//
// Copyright (c) 2025 The tagsmith contributors. All rights reserved.
//
// This file is part of the tagsmith project, a schema-driven codec and
// version migrator for game engine tag files.
//
// This file is licensed under the MIT license, which can be found here:
// https://opensource.org/licenses/MIT
//---------------------------------------------------------------------------//

// This is the CLI version of tagsmith.

use clap::{Parser, Subcommand, ValueEnum};
use log::error;
use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};

use std::path::PathBuf;
use std::process::exit;

use tagsmith_lib::binary::Endian;
use tagsmith_lib::driver::Driver;
use tagsmith_lib::groups::Generation;
use tagsmith_lib::schema::Schema;
use tagsmith_lib::tags::CodecOptions;

use crate::commands::{command_batch, command_from_json, command_single};

const PROGRAM_NAME: &str = "tagsmith - CLI Version";

// Modules used by this tool.
pub mod commands;

//---------------------------------------------------------------------------//
//                          Command line definition
//---------------------------------------------------------------------------//

#[derive(Parser)]
#[command(name = PROGRAM_NAME, version, about = "CLI version of tagsmith. Decodes, recompiles and upgrades engine tag files.")]
struct Cli {

    /// Sets the level of verbosity.
    #[arg(short, long)]
    verbose: bool,

    /// Engine generation of the definitions and files to work with.
    #[arg(short, long, value_enum)]
    generation: GenerationArg,

    /// Folder with the definition sources: JSON files for gen1, XML files for gen2.
    #[arg(short, long, value_name = "FOLDER")]
    defs: PathBuf,

    /// Force big-endian files. Defaults to the generation's native order.
    #[arg(long, conflicts_with = "little_endian")]
    big_endian: bool,

    /// Force little-endian files. Defaults to the generation's native order.
    #[arg(long)]
    little_endian: bool,

    /// Keep decoded block/struct versions on re-write instead of promoting to the latest.
    #[arg(long)]
    preserve_version: bool,

    /// Keep string fields as their raw bytes instead of decoded text.
    #[arg(long)]
    preserve_strings: bool,

    /// Keep pad runs, pointers and unknown framing values instead of zeroing them.
    #[arg(long)]
    preserve_padding: bool,

    /// Leave angle fields in radians instead of converting to degrees.
    #[arg(long)]
    no_convert_radians: bool,

    /// Skip recomputing the header checksum.
    #[arg(long)]
    no_checksum: bool,

    /// Write a JSON dump beside each output file.
    #[arg(long)]
    dump_json: bool,

    /// Upgrade decoded tags to the latest schema versions before re-encoding.
    #[arg(long)]
    migrate: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum GenerationArg {
    Gen1,
    Gen2,
}

#[derive(Subcommand)]
enum Commands {

    /// Decodes a single tag file and re-encodes it.
    Single {

        /// Path of the tag file to read.
        input: PathBuf,

        /// Path of the recompiled tag file.
        output: PathBuf,
    },

    /// Encodes a tag file from a JSON dump. The tag group comes from the
    /// output file's extension.
    FromJson {

        /// Path of the JSON dump to read.
        input: PathBuf,

        /// Path of the tag file to write.
        output: PathBuf,
    },

    /// Walks a directory tree, re-encoding every tag file into a mirrored
    /// tree and logging failures and hash mismatches.
    Batch {

        /// Folder to read tag files from.
        input_dir: PathBuf,

        /// Folder to write recompiled files to.
        output_dir: PathBuf,

        /// Path of the error log.
        #[arg(long, default_value = "errors.txt")]
        log: PathBuf,
    },
}

//---------------------------------------------------------------------------//
//                              Main loop
//---------------------------------------------------------------------------//

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let _ = TermLogger::init(level, simplelog::Config::default(), TerminalMode::Mixed, ColorChoice::Auto);

    let generation = match cli.generation {
        GenerationArg::Gen1 => Generation::Gen1,
        GenerationArg::Gen2 => Generation::Gen2,
    };

    // Schema load failure is the only thing that exits nonzero. Everything
    // past this point is logged per file and the run still counts as clean.
    let schema = match Schema::load(generation, &cli.defs) {
        Ok(schema) => schema,
        Err(error) => {
            error!("Failed to load the definitions from {}: {error}", cli.defs.display());
            exit(1);
        },
    };

    let mut options = CodecOptions::default();
    options.set_preserve_version(cli.preserve_version);
    options.set_preserve_strings(cli.preserve_strings);
    options.set_preserve_padding(cli.preserve_padding);
    options.set_convert_radians(!cli.no_convert_radians);
    options.set_generate_checksum(!cli.no_checksum);

    let endian = if cli.big_endian {
        Endian::Big
    } else if cli.little_endian {
        Endian::Little
    } else {
        Driver::default_endian(generation)
    };

    let driver = Driver::new(schema, options, endian, cli.migrate, cli.dump_json);

    match cli.command {
        Commands::Single { input, output } => command_single(&driver, &input, &output),
        Commands::FromJson { input, output } => command_from_json(&driver, &input, &output),
        Commands::Batch { input_dir, output_dir, log } => command_batch(&driver, &input_dir, &output_dir, &log),
    }

    exit(0);
}
