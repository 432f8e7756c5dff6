//! CLI entry point for the Ripple-16 assembler binary.
//!
//! Assembles a source file and prints the listing; with `--run` it also
//! executes the program on the pipeline core and reports final state.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use ripple_asm::assemble;
use ripple_core::{Cpu, Program};

const HELP_TEXT: &str =
    "Usage: ripple-asm <input> [--run] [--trace] [--max-cycles <n>] [--help]";

const DEFAULT_MAX_CYCLES: u64 = 1000;

#[derive(Debug, PartialEq, Eq)]
struct CliArgs {
    input: PathBuf,
    run: bool,
    trace: bool,
    max_cycles: u64,
}

#[derive(Debug)]
enum ParseResult {
    Args(CliArgs),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let mut input: Option<PathBuf> = None;
    let mut run = false;
    let mut trace = false;
    let mut max_cycles = DEFAULT_MAX_CYCLES;

    while let Some(arg) = args.next() {
        if arg == "--help" {
            return Ok(ParseResult::Help);
        }

        if arg == "--run" {
            run = true;
            continue;
        }

        if arg == "--trace" {
            trace = true;
            continue;
        }

        if arg == "--max-cycles" {
            let value = args
                .next()
                .ok_or_else(|| String::from("missing value for --max-cycles"))?;
            max_cycles = value
                .to_string_lossy()
                .parse::<u64>()
                .map_err(|_| format!("invalid cycle count: {}", value.to_string_lossy()))?;
            continue;
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if input.is_some() {
            return Err(String::from("multiple input paths provided"));
        }
        input = Some(PathBuf::from(arg));
    }

    let input = input.ok_or_else(|| String::from("missing input path"))?;
    Ok(ParseResult::Args(CliArgs {
        input,
        run: run || trace,
        trace,
        max_cycles,
    }))
}

fn main() -> ExitCode {
    match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{HELP_TEXT}");
            ExitCode::SUCCESS
        }
        Ok(ParseResult::Args(args)) => match run_cli(&args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                eprintln!("error: {error}");
                ExitCode::FAILURE
            }
        },
        Err(error) => {
            eprintln!("error: {error}");
            eprintln!("{HELP_TEXT}");
            ExitCode::FAILURE
        }
    }
}

fn run_cli(args: &CliArgs) -> Result<(), String> {
    let source = std::fs::read_to_string(&args.input)
        .map_err(|error| format!("{}: {error}", args.input.display()))?;

    let program = assemble(&source).map_err(|error| error.to_string())?;

    print_listing(&program);

    if args.run {
        execute(&program, args.max_cycles, args.trace)?;
    }
    Ok(())
}

fn print_listing(program: &Program) {
    for record in &program.records {
        println!(
            "{:03}: {}  {}  {:20}  ; {}",
            record.address, record.hex, record.binary, record.disasm, record.source,
        );
    }
    if !program.symbols.is_empty() {
        println!();
        for (label, address) in &program.symbols {
            println!("{label} = {address:03}");
        }
    }
}

fn execute(program: &Program, max_cycles: u64, trace: bool) -> Result<(), String> {
    let mut cpu = Cpu::with_program(program);

    if trace {
        println!();
        println!("cycle  IF    ID    EX    MEM   WB");
    }

    for _ in 0..max_cycles {
        let running = cpu.step().map_err(|error| error.to_string())?;

        if trace {
            let record = cpu
                .pipeline_history()
                .last()
                .expect("a committed step records one cycle");
            let cell =
                |slot: Option<u16>| slot.map_or_else(|| "----".to_owned(), |raw| format!("{raw:04X}"));
            println!(
                "{:>5}  {}  {}  {}  {}  {}{}",
                record.cycle,
                cell(record.fetch),
                cell(record.decode),
                cell(record.execute),
                cell(record.memory),
                cell(record.writeback),
                if record.stalled { "  stall" } else { "" },
            );
        }

        if !running {
            break;
        }
    }

    println!();
    for (index, value) in cpu.registers().snapshot().iter().enumerate() {
        println!("$r{index} = {value:#06X} ({value})");
    }
    if !cpu.data_memory().entries().is_empty() {
        println!();
        for (address, value) in cpu.data_memory().entries() {
            println!("mem[{address}] = {value:#06X} ({value})");
        }
    }

    let counters = cpu.counters();
    println!();
    println!(
        "cycles={} retired={} stalls={} forwards={} flushes={} halted={}",
        cpu.cycle(),
        counters.instructions,
        counters.stalls,
        counters.forwards,
        counters.flushes,
        cpu.is_halted(),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_args, CliArgs, ParseResult, DEFAULT_MAX_CYCLES};
    use std::ffi::OsString;
    use std::path::PathBuf;

    #[test]
    fn parses_required_input() {
        let result = parse_args([OsString::from("program.asm")].into_iter())
            .expect("input-only args should parse");
        let ParseResult::Args(args) = result else {
            panic!("expected parsed args");
        };
        assert_eq!(
            args,
            CliArgs {
                input: PathBuf::from("program.asm"),
                run: false,
                trace: false,
                max_cycles: DEFAULT_MAX_CYCLES,
            }
        );
    }

    #[test]
    fn trace_implies_run() {
        let result = parse_args(
            [OsString::from("program.asm"), OsString::from("--trace")].into_iter(),
        )
        .expect("valid args should parse");
        let ParseResult::Args(args) = result else {
            panic!("expected parsed args");
        };
        assert!(args.run);
        assert!(args.trace);
    }

    #[test]
    fn parses_max_cycles_value() {
        let result = parse_args(
            [
                OsString::from("program.asm"),
                OsString::from("--run"),
                OsString::from("--max-cycles"),
                OsString::from("50"),
            ]
            .into_iter(),
        )
        .expect("valid args should parse");
        let ParseResult::Args(args) = result else {
            panic!("expected parsed args");
        };
        assert!(args.run);
        assert_eq!(args.max_cycles, 50);
    }

    #[test]
    fn parses_help_flag() {
        let result = parse_args([OsString::from("--help")].into_iter())
            .expect("help should parse without error");
        assert!(matches!(result, ParseResult::Help));
    }

    #[test]
    fn rejects_unknown_flags_and_missing_values() {
        let error = parse_args([OsString::from("--unknown")].into_iter())
            .expect_err("unknown flag should fail parse");
        assert!(error.contains("unknown option"));

        let error = parse_args(
            [OsString::from("program.asm"), OsString::from("--max-cycles")].into_iter(),
        )
        .expect_err("missing value should fail parse");
        assert!(error.contains("--max-cycles"));
    }

    #[test]
    fn rejects_missing_input() {
        let error = parse_args(std::iter::empty()).expect_err("missing input should fail");
        assert!(error.contains("missing input"));
    }
}
