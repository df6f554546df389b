//! Subleq assembler CLI.
//!
//! Reads an assembly source file and writes its binary program image.
//!
//! # Usage
//! ```text
//! assembler <input.asm> [OPTIONS]
//! ```
//!
//! # Arguments
//! - `input.asm`: Assembly source file to compile
//!
//! # Options
//! - `-o, --output <file>`: Output file path (defaults to `<input>.bin`)
//! - `-l, --listing`: Log every assembled word with its address and labels
//!
//! # Examples
//! ```text
//! assembler program.asm
//! assembler program.asm -o output.bin
//! assembler program.asm -l
//! ```

use std::env;
use std::fs;
use std::path::Path;
use std::process;
use subleq::virtual_machine::assembler::{assemble_source, render_diagnostic};
use subleq::virtual_machine::program::Program;
use subleq::{error, info};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let input_path = &args[1];
    let mut output_path: Option<String> = None;
    let mut listing = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--output" | "-o") => {
                i += 1;
                if i >= args.len() {
                    error!("{k} requires an argument");
                    process::exit(1);
                }
                output_path = Some(args[i].clone());
                i += 1;
            }
            "--listing" | "-l" => {
                listing = true;
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    if !Path::new(input_path).exists() {
        error!("Input file does not exist: {}", input_path);
        process::exit(1);
    }

    let output_path = output_path.unwrap_or_else(|| default_output_path(input_path));

    if let Some(parent) = Path::new(&output_path).parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        error!("Output directory does not exist: {}", parent.display());
        process::exit(1);
    }

    let source = match fs::read_to_string(input_path) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to read {}: {}", input_path, e);
            process::exit(1);
        }
    };

    let program = match assemble_source(&source) {
        Ok(p) => p,
        Err(e) => {
            error!(
                "Assembly failed:\n{}",
                render_diagnostic(input_path, &source, &e)
            );
            process::exit(1);
        }
    };

    let image = program.to_bytes();

    if let Err(e) = fs::write(&output_path, &image) {
        error!("Failed to write output file: {}", e);
        process::exit(1);
    }

    info!(
        "Compiled {} -> {} ({} words, {} labels, {} bytes)",
        input_path,
        output_path,
        program.len(),
        program.labels.len(),
        image.len()
    );

    if listing {
        for line in listing_lines(&program) {
            info!("{line}");
        }
    }
}

/// `<input>.bin` next to the input file.
fn default_output_path(input_path: &str) -> String {
    let p = Path::new(input_path);
    let stem = p.file_stem().unwrap_or_default().to_string_lossy();
    let parent = p.parent().unwrap_or(Path::new("."));
    parent
        .join(format!("{}.bin", stem))
        .to_string_lossy()
        .into_owned()
}

/// One line per word: address, value, and the labels bound to that address.
fn listing_lines(program: &Program) -> Vec<String> {
    let addr_w = program.len().saturating_sub(1).to_string().len();
    let value_w = program
        .words
        .iter()
        .map(|w| w.to_string().len())
        .max()
        .unwrap_or(1);

    program
        .words
        .iter()
        .enumerate()
        .map(|(address, word)| {
            let labels = program.labels.labels_at(address as i64);
            let line = format!("{:>addr_w$}  {:>value_w$}", address, word);
            if labels.is_empty() {
                line
            } else {
                format!("{line}  {}", labels.join(", "))
            }
        })
        .collect()
}

const USAGE: &str = "\
Subleq Assembler

USAGE:
    {program} <input.asm> [OPTIONS]

ARGS:
    <input.asm>    Assembly source file to compile

OPTIONS:
    -o, --output <file>     Output file path (defaults to <input>.bin)
    -l, --listing           Log every word with its address and labels
    -h, --help              Print this help message

EXAMPLES:
    # Compile to default output name
    {program} program.asm

    # Compile with explicit output
    {program} program.asm -o output.bin

    # Compile and show the listing
    {program} program.asm -l
";

fn print_usage(program: &str) {
    println!("{}", USAGE.replace("{program}", program));
}
