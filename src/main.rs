//! Runs a subleq program.
//!
//! # Usage
//! ```text
//! subleq <program.asm|program.bin> [OPTIONS]
//! ```
//!
//! # Arguments
//! - `program`: Assembly source, or a binary image produced by `assembler`
//!
//! # Options
//! - `-m, --memory <words>`: Memory size in words (grown to fit the program)
//! - `-s, --max-steps <n>`: Stop after `n` instructions
//! - `-i, --input <v1,v2,..>`: Feed a fixed input sequence instead of stdin
//! - `-d, --dump <start>:<end>`: Log a memory window after the run
//! - `--no-timestamps`: Omit elapsed time from log lines
//! - `-v, --verbose`: Log debug messages
//!
//! Defaults for memory size and step limit are read from `SUBLEQ_MEMORY_SIZE`
//! and `SUBLEQ_MAX_STEPS`.

use std::env;
use std::fs;
use std::process;
use std::str::FromStr;
use std::sync::atomic::Ordering;
use subleq::utils::log::{Level, SHOW_TIMESTAMP, set_max_level};
use subleq::virtual_machine::assembler::{assemble_source, render_diagnostic};
use subleq::virtual_machine::errors::VMError;
use subleq::virtual_machine::io::{BufferedIo, InteractiveIo, Io};
use subleq::virtual_machine::isa::Word;
use subleq::virtual_machine::program::Program;
use subleq::virtual_machine::vm::{Step, VM};
use subleq::{debug, error, info, warn};

/// Memory size used when neither `--memory` nor `SUBLEQ_MEMORY_SIZE` is given.
const DEFAULT_MEMORY_SIZE: usize = 1024;
const MEMORY_ENV: &str = "SUBLEQ_MEMORY_SIZE";
const MAX_STEPS_ENV: &str = "SUBLEQ_MAX_STEPS";

#[derive(Debug, PartialEq, Eq)]
struct Options {
    path: String,
    memory: usize,
    max_steps: Option<u64>,
    input: Option<Vec<Word>>,
    dump: Option<(usize, usize)>,
    timestamps: bool,
    verbose: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Help,
    Run(Options),
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("subleq");

    let memory = env_value(MEMORY_ENV).unwrap_or_else(|e| {
        error!("{e}");
        process::exit(1)
    });
    let max_steps = env_value(MAX_STEPS_ENV).unwrap_or_else(|e| {
        error!("{e}");
        process::exit(1)
    });

    let options = match parse_args(
        args.get(1..).unwrap_or_default(),
        memory.unwrap_or(DEFAULT_MEMORY_SIZE),
        max_steps,
    ) {
        Ok(Command::Help) => {
            print_usage(program);
            process::exit(0);
        }
        Ok(Command::Run(options)) => options,
        Err(e) => {
            error!("{e}\n");
            print_usage(program);
            process::exit(1);
        }
    };

    if !options.timestamps {
        SHOW_TIMESTAMP.store(false, Ordering::Relaxed);
    }
    if options.verbose {
        set_max_level(Level::Debug);
    }
    debug!("{:?}", options);

    let loaded = load_program(&options.path).unwrap_or_else(|e| {
        error!("{e}");
        process::exit(1)
    });
    let size = options.memory.max(loaded.len());
    if size > options.memory {
        warn!(
            "Memory grown from {} to {} words to fit the program",
            options.memory, size
        );
    }
    debug!(
        "Loading {} words ({} labels) into {} words of memory",
        loaded.len(),
        loaded.labels.len(),
        size
    );

    match options.input.clone() {
        Some(values) => {
            debug!("Using {} buffered input values", values.len());
            let mut vm = build_vm(size, BufferedIo::new(values), &loaded);
            run(&mut vm, &options);
            for value in vm.io().output() {
                println!("{value}");
            }
        }
        None => {
            debug!("Reading input from stdin");
            let mut vm = build_vm(size, InteractiveIo::stdio(), &loaded);
            run(&mut vm, &options);
        }
    }
}

/// Reads a program from disk, decoding binary images and assembling anything else.
fn load_program(path: &str) -> Result<Program, String> {
    let bytes = fs::read(path).map_err(|e| {
        VMError::SourceUnavailable {
            path: path.to_string(),
            reason: e.to_string(),
        }
        .to_string()
    })?;

    if Program::is_image(&bytes) {
        debug!("{} is a program image ({} bytes)", path, bytes.len());
        return Program::from_bytes(&bytes).map_err(|e| format!("{path}: {e}"));
    }

    let source =
        String::from_utf8(bytes).map_err(|_| format!("{path}: source is not valid utf-8"))?;
    let program = assemble_source(&source).map_err(|e| render_diagnostic(path, &source, &e))?;
    info!("Assembled {} ({} words)", path, program.len());
    Ok(program)
}

fn build_vm<I: Io>(size: usize, io: I, program: &Program) -> VM<I> {
    let mut vm = VM::new(size, io).unwrap_or_else(|e| {
        error!("{e}");
        process::exit(1)
    });
    if let Err(e) = vm.load(&program.words) {
        error!("{e}");
        process::exit(1);
    }
    vm
}

fn run<I: Io>(vm: &mut VM<I>, options: &Options) {
    match options.max_steps {
        Some(limit) => {
            if vm.run_bounded(limit) == Step::Continue {
                warn!(
                    "Step limit of {} reached at pc {} without halting",
                    limit,
                    vm.pc()
                );
            } else {
                info!("Halted at pc {} after {} steps", vm.pc(), vm.steps());
            }
        }
        None => {
            vm.run();
            info!("Halted at pc {} after {} steps", vm.pc(), vm.steps());
        }
    }

    if let Some((start, end)) = options.dump {
        for (address, value) in vm.dump(start, end) {
            info!("[{:>6}] {}", address, value);
        }
    }
}

fn parse_args(
    args: &[String],
    memory: usize,
    max_steps: Option<u64>,
) -> Result<Command, String> {
    let Some(first) = args.first() else {
        return Err("missing program file".to_string());
    };
    if first == "-h" || first == "--help" {
        return Ok(Command::Help);
    }

    let mut options = Options {
        path: first.clone(),
        memory,
        max_steps,
        input: None,
        dump: None,
        timestamps: true,
        verbose: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--memory" | "-m") => {
                options.memory = parse_number(k, flag_value(args, i, k)?)?;
                if options.memory == 0 {
                    return Err("Memory size must be greater than 0".to_string());
                }
                i += 2;
            }
            k @ ("--max-steps" | "-s") => {
                options.max_steps = Some(parse_number(k, flag_value(args, i, k)?)?);
                i += 2;
            }
            k @ ("--input" | "-i") => {
                options.input = Some(parse_input(flag_value(args, i, k)?)?);
                i += 2;
            }
            k @ ("--dump" | "-d") => {
                options.dump = Some(parse_range(flag_value(args, i, k)?)?);
                i += 2;
            }
            "--no-timestamps" => {
                options.timestamps = false;
                i += 1;
            }
            "--verbose" | "-v" => {
                options.verbose = true;
                i += 1;
            }
            "--help" | "-h" => return Ok(Command::Help),
            other => return Err(format!("Unexpected argument: {other}")),
        }
    }

    Ok(Command::Run(options))
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, String> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires an argument"))
}

fn parse_number<T: FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("Invalid value for {flag}: '{value}' is not a valid number"))
}

/// Parses a comma-separated list of words. An empty string is an empty sequence.
fn parse_input(value: &str) -> Result<Vec<Word>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| parse_number("--input", v))
        .collect()
}

fn parse_range(value: &str) -> Result<(usize, usize), String> {
    let (start, end) = value
        .split_once(':')
        .ok_or_else(|| format!("Invalid dump range '{value}', expected <start>:<end>"))?;
    Ok((parse_number("--dump", start)?, parse_number("--dump", end)?))
}

/// Reads an optional numeric setting from the environment.
fn env_value<T: FromStr>(name: &str) -> Result<Option<T>, String> {
    match env::var(name) {
        Ok(raw) => parse_number(name, &raw).map(Some),
        Err(_) => Ok(None),
    }
}

const USAGE: &str = "\
Subleq Runner

USAGE:
    {program} <program> [OPTIONS]

ARGS:
    <program>    Assembly source (.asm) or binary image (.bin)

OPTIONS:
    -m, --memory <words>       Memory size in words (default 1024)
    -s, --max-steps <n>        Stop after n instructions
    -i, --input <v1,v2,..>     Use a fixed input sequence instead of stdin
    -d, --dump <start>:<end>   Log a memory window after the run
    --no-timestamps            Omit elapsed time from log lines
    -v, --verbose              Log debug messages
    -h, --help                 Print this help message

ENVIRONMENT:
    SUBLEQ_MEMORY_SIZE    Default memory size
    SUBLEQ_MAX_STEPS      Default step limit
    SUBLEQ_LOG            Minimum log level (debug, info, warn, error)

EXAMPLES:
    # Run interactively, one value per line on stdin
    {program} programs/cat.asm

    # Run with fixed input
    {program} programs/subtraction.asm -i 8,3

    # Run an assembled image and inspect memory
    {program} subtraction.bin -i 8,3 -d 15:17
";

fn usage(program: &str) -> String {
    USAGE.replace("{program}", program)
}

/// Writes usage to stdout directly so it shows at every log level.
fn print_usage(program: &str) {
    println!("{}", usage(program));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn run_options(list: &[&str]) -> Options {
        match parse_args(&args(list), DEFAULT_MEMORY_SIZE, None) {
            Ok(Command::Run(options)) => options,
            other => panic!("expected run options, got {other:?}"),
        }
    }

    #[test]
    fn defaults_apply_without_flags() {
        let options = run_options(&["prog.asm"]);
        assert_eq!(
            options,
            Options {
                path: "prog.asm".to_string(),
                memory: DEFAULT_MEMORY_SIZE,
                max_steps: None,
                input: None,
                dump: None,
                timestamps: true,
                verbose: false,
            }
        );
    }

    #[test]
    fn environment_defaults_are_overridden_by_flags() {
        let parsed = parse_args(&args(&["p.asm"]), 64, Some(10)).unwrap();
        let Command::Run(options) = parsed else {
            panic!("expected run");
        };
        assert_eq!(options.memory, 64);
        assert_eq!(options.max_steps, Some(10));

        let parsed = parse_args(&args(&["p.asm", "-m", "32", "-s", "5"]), 64, Some(10)).unwrap();
        let Command::Run(options) = parsed else {
            panic!("expected run");
        };
        assert_eq!(options.memory, 32);
        assert_eq!(options.max_steps, Some(5));
    }

    #[test]
    fn parses_all_flags() {
        let options = run_options(&[
            "p.bin",
            "--memory",
            "30",
            "--max-steps",
            "100",
            "--input",
            "8, 3,-4",
            "--dump",
            "15:17",
            "--no-timestamps",
            "-v",
        ]);
        assert_eq!(options.memory, 30);
        assert_eq!(options.max_steps, Some(100));
        assert_eq!(options.input, Some(vec![8, 3, -4]));
        assert_eq!(options.dump, Some((15, 17)));
        assert!(!options.timestamps);
        assert!(options.verbose);
    }

    #[test]
    fn empty_input_is_an_empty_sequence() {
        assert_eq!(run_options(&["p.asm", "-i", ""]).input, Some(vec![]));
    }

    #[test]
    fn help_is_recognized_anywhere() {
        assert_eq!(
            parse_args(&args(&["-h"]), DEFAULT_MEMORY_SIZE, None),
            Ok(Command::Help)
        );
        assert_eq!(
            parse_args(&args(&["p.asm", "--help"]), DEFAULT_MEMORY_SIZE, None),
            Ok(Command::Help)
        );
    }

    #[test]
    fn usage_names_the_binary_and_every_flag() {
        let text = usage("target/debug/subleq");
        assert!(text.contains("target/debug/subleq <program> [OPTIONS]"));
        assert!(!text.contains("{program}"));
        for flag in [
            "--memory",
            "--max-steps",
            "--input",
            "--dump",
            "--no-timestamps",
            "--verbose",
            "--help",
        ] {
            assert!(text.contains(flag), "usage is missing {flag}");
        }
    }

    #[test]
    fn rejects_bad_arguments() {
        for list in [
            &[][..],
            &["p.asm", "-m"][..],
            &["p.asm", "-m", "0"][..],
            &["p.asm", "-m", "lots"][..],
            &["p.asm", "-s", "-3"][..],
            &["p.asm", "-i", "1,x"][..],
            &["p.asm", "-d", "12"][..],
            &["p.asm", "--quiet"][..],
        ] {
            assert!(
                parse_args(&args(list), DEFAULT_MEMORY_SIZE, None).is_err(),
                "accepted {list:?}"
            );
        }
    }

    #[test]
    fn loads_source_and_images() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("sub.asm");
        fs::write(&source_path, include_str!("../programs/subtraction.asm")).unwrap();
        let source_path = source_path.to_string_lossy().into_owned();

        let assembled = load_program(&source_path).unwrap();

        let image_path = dir.path().join("sub.bin");
        fs::write(&image_path, assembled.to_bytes()).unwrap();
        let decoded = load_program(&image_path.to_string_lossy()).unwrap();
        assert_eq!(decoded, assembled);
    }

    #[test]
    fn load_reports_missing_file_and_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.asm");
        let err = load_program(&missing.to_string_lossy()).unwrap_err();
        assert!(err.starts_with("could not read"), "{err}");

        let bad = dir.path().join("bad.asm");
        fs::write(&bad, "subleq 0, nowhere\n").unwrap();
        let err = load_program(&bad.to_string_lossy()).unwrap_err();
        assert!(err.contains("undefined symbol `nowhere`"), "{err}");
        assert!(err.contains("bad.asm:1:11"), "{err}");
    }
}
