use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use log::{info, warn};
use rusm6502::{assemble_source, parse_source};

#[derive(Parser)]
#[command(name = "rusm6502")]
#[command(about = "An assembler for the x816 dialect of 6502 assembly")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a source file or directory to raw binary
    Assemble {
        /// Input assembly file, or a directory to recurse into for `.asm` files
        #[arg(required = true)]
        input: PathBuf,

        /// Output binary file [default: input filename with .bin extension].
        /// Ignored in directory mode -- each `.asm` file gets a sibling `.bin`.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Parse a source file and print its statement list (for debugging)
    Parse {
        /// Input assembly file
        #[arg(required = true)]
        input: PathBuf,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Assemble { input, output } => {
            if input.is_dir() {
                assemble_dir(&input)
            } else {
                let output_path = output.unwrap_or_else(|| with_bin_extension(&input));
                assemble_file(&input, &output_path)
            }
        }
        Commands::Parse { input } => parse_file(&input),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn with_bin_extension(input: &Path) -> PathBuf {
    let mut path = input.to_path_buf();
    path.set_extension("bin");
    path
}

/// Directory mode (§6): recursively assembles every `.asm` file to a
/// sibling `.bin`. A single file's failure is logged and the batch
/// continues with the next one rather than aborting the whole walk.
fn assemble_dir(dir: &Path) -> rusm6502::Result<()> {
    let mut any_failed = false;
    for entry in walk_asm_files(dir)? {
        let output_path = with_bin_extension(&entry);
        if let Err(e) = assemble_file(&entry, &output_path) {
            warn!("failed to assemble {}: {e}", entry.display());
            any_failed = true;
        }
    }
    if any_failed {
        process::exit(1);
    }
    Ok(())
}

fn walk_asm_files(dir: &Path) -> rusm6502::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in fs::read_dir(&current)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().is_some_and(|ext| ext == "asm") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn assemble_file(input_path: &Path, output_path: &Path) -> rusm6502::Result<()> {
    info!("assembling {}", input_path.display());
    let source = fs::read_to_string(input_path)?;
    let binary = assemble_source(&source)?;
    info!("generated {} bytes", binary.len());
    fs::write(output_path, &binary)?;
    println!("assembled {} to {} ({} bytes)", input_path.display(), output_path.display(), binary.len());
    Ok(())
}

fn parse_file(input_path: &PathBuf) -> rusm6502::Result<()> {
    let source = fs::read_to_string(input_path)?;
    let statements = parse_source(&source)?;
    for statement in &statements {
        println!("{statement:?}");
    }
    Ok(())
}
