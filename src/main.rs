//! ob1 Emulator - CLI Entry Point
//!
//! Commands:
//! - `ob1-emu run <program>` - Run an ob1 program against a fresh field
//! - `ob1-emu asm <program>` - Compile and print the disassembly listing
//! - `ob1-emu check <program>` - Compile only and report errors

use clap::{Parser, Subcommand};
use ob1::asm::disasm;
use ob1::cpu::FIELD_SIZE;
use ob1::{compile, BitField, Engine, RunStatus};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ob1-emu")]
#[command(version)]
#[command(about = "An emulator of the ob1 one-bit machine")]
struct Cli {
    /// Increase log output (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts, terminates or faults
    Run {
        /// Path to the ob1 source file
        program: String,
        /// Step one instruction at a time and print each one
        #[arg(short, long)]
        step: bool,
        /// Stop after this many ticks even if the program is still running
        #[arg(short, long)]
        max_ticks: Option<u64>,
        /// Set the bit at X,Y before running (repeatable)
        #[arg(long = "set", value_name = "X,Y", value_parser = parse_coords)]
        set: Vec<(usize, usize)>,
        /// Start with the flag set
        #[arg(long)]
        flag: bool,
        /// Start with the pointer at X,Y instead of HOME
        #[arg(long, value_name = "X,Y", value_parser = parse_coords)]
        pointer: Option<(usize, usize)>,
        /// Print the final machine state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compile a program and print its disassembly
    Asm {
        /// Path to the ob1 source file
        program: String,
        /// Show the encoded instruction byte next to each line
        #[arg(long)]
        hex: bool,
    },
    /// Compile a program and report the first error, if any
    Check {
        /// Path to the ob1 source file
        program: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run { program, step, max_ticks, set, flag, pointer, json } => {
            let mut field = BitField::new();
            for (x, y) in set {
                field.set_bit(x, y, true);
            }
            field.set_flag(flag);
            if let Some((x, y)) = pointer {
                field.set_pointer(x, y);
            }
            run_program(&program, Engine::with_field(field), step, max_ticks, json)
        }
        Commands::Asm { program, hex } => assemble_file(&program, hex),
        Commands::Check { program } => check_file(&program),
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `-v`.
fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "warn,ob1=debug",
        _ => "warn,ob1=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_coords(text: &str) -> Result<(usize, usize), String> {
    let (x, y) = text
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got `{}`", text))?;
    let coord = |s: &str| {
        s.trim()
            .parse::<usize>()
            .ok()
            .filter(|&v| v < FIELD_SIZE)
            .ok_or_else(|| format!("coordinate `{}` is not in 0-{}", s.trim(), FIELD_SIZE - 1))
    };
    Ok((coord(x)?, coord(y)?))
}

fn read_source(path: &str) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(s) => Some(s),
        Err(e) => {
            eprintln!("error: failed to read {}: {}", path, e);
            None
        }
    }
}

fn run_program(path: &str, mut engine: Engine, step: bool, max_ticks: Option<u64>, json: bool) -> ExitCode {
    let Some(source) = read_source(path) else {
        return ExitCode::FAILURE;
    };

    match engine.load_program(&source) {
        Ok(lines) => tracing::info!(lines, instructions = engine.program().len(), "loaded {}", path),
        Err(e) => {
            eprintln!("error: {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    }

    let status = if step {
        trace_steps(&mut engine, max_ticks)
    } else if let Some(limit) = max_ticks {
        engine.run_limited(limit)
    } else {
        engine.run()
    };

    if json {
        match serde_json::to_string_pretty(&engine) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("error: failed to serialize machine state: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_field(engine.field());
        println!("counter: {}  ticks: {}", engine.counter(), engine.ticks());
        println!("status: {}", status);
        if status == RunStatus::Ok {
            println!("stopped after the tick limit; the program was still running");
        }
    }

    if status.is_fault() {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}

/// Step through the program, printing each instruction as it executes.
fn trace_steps(engine: &mut Engine, max_ticks: Option<u64>) -> RunStatus {
    let mut ticks = 0u64;
    loop {
        if max_ticks.is_some_and(|limit| ticks >= limit) {
            return RunStatus::Ok;
        }
        let pc = engine.counter();
        let instr = engine.disassemble(pc);
        let status = engine.step();
        let ptr = engine.field().pointer();
        println!(
            "{:03}: {:<9} ptr=({:2},{:2}) flag={}  {}",
            pc, instr, ptr.x, ptr.y, engine.field().flag() as u8, status
        );
        ticks += 1;
        if status != RunStatus::Stepped {
            return status;
        }
    }
}

fn print_field(field: &BitField) {
    let ptr = field.pointer();
    for y in (0..FIELD_SIZE).rev() {
        let row: String = field
            .row(y)
            .iter()
            .enumerate()
            .map(|(x, &bit)| {
                let c = if bit { '1' } else { '0' };
                if ptr.x == x && ptr.y == y {
                    format!("[{}]", c)
                } else {
                    format!(" {} ", c)
                }
            })
            .collect();
        println!("{:2} {}", y, row);
    }
    println!("FLAG={}  POINTER=({}, {})", field.flag() as u8, ptr.x, ptr.y);
}

fn assemble_file(path: &str, hex: bool) -> ExitCode {
    let Some(source) = read_source(path) else {
        return ExitCode::FAILURE;
    };

    let compilation = compile(&source);
    if hex {
        for (addr, instr) in compilation.program.iter().enumerate() {
            println!("{:03}: {:02X}  {}", addr, instr.encode(), disasm::disassemble_instruction(instr));
        }
    } else {
        print!("{}", disasm::listing(&compilation.program));
    }

    match compilation.error {
        Some(e) => {
            eprintln!("error: {}: {}", path, e);
            ExitCode::FAILURE
        }
        None => ExitCode::SUCCESS,
    }
}

fn check_file(path: &str) -> ExitCode {
    let Some(source) = read_source(path) else {
        return ExitCode::FAILURE;
    };

    let compilation = compile(&source);
    match compilation.error {
        Some(e) => {
            eprintln!("error: {}: {}", path, e);
            ExitCode::FAILURE
        }
        None => {
            println!(
                "{}: ok, {} instructions from {} lines",
                path,
                compilation.program.len(),
                compilation.lines_consumed
            );
            ExitCode::SUCCESS
        }
    }
}
