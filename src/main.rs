use std::path::PathBuf;

use anyhow::Context as _;
use bf_vm::{CompileOptions, Machine, TAPE_CAPACITY, calc, compile};
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::filter::EnvFilter;

#[derive(Parser)]
#[command(name = "bf-vm", version, about = "Threaded-code tape language virtual machine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and run a program file against stdin and stdout
    Run {
        /// Path to the program source
        source: PathBuf,
        /// Hold output back until a newline or the end of the run
        #[arg(long, env = "BF_VM_BUFFER_OUTPUT", default_value_t = true, action = ArgAction::Set)]
        buffer_output: bool,
        /// Stop with an error after this many instructions
        #[arg(long)]
        step_limit: Option<u64>,
        /// Number of cells on the tape; zero is widened to one
        #[arg(long, default_value_t = TAPE_CAPACITY)]
        tape_size: usize,
    },
    /// Evaluate a reverse polish expression, e.g. `3 7 + print`
    Calc {
        expression: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            source,
            buffer_output,
            step_limit,
            tape_size,
        } => run_file(source, buffer_output, step_limit, tape_size),
        Commands::Calc { expression } => run_calc(&expression),
    }
}

fn run_file(
    source_path: PathBuf,
    buffer_output: bool,
    step_limit: Option<u64>,
    tape_size: usize,
) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(&source_path).context("source read failed")?;
    debug!(path = %source_path.display(), bytes = source.len(), "loaded source");

    let program = compile(&source, CompileOptions { buffer_output })?;
    debug!(
        instructions = program.len(),
        buffer_output,
        "compiled program"
    );

    let stdin = std::io::stdin();
    let stdin = stdin.lock();
    let stdout = std::io::stdout();
    let mut machine = Machine::new(&program, stdin, stdout.lock()).with_tape_capacity(tape_size);
    if let Some(limit) = step_limit {
        machine = machine.with_step_limit(limit);
    }
    let result = machine.execute();
    debug!(steps = machine.steps(), "run finished");
    result.context("execution failure")?;
    Ok(())
}

fn run_calc(expression: &str) -> anyhow::Result<()> {
    let program = calc::parse(expression)?;
    debug!(instructions = program.len(), "parsed expression");
    let mut machine = calc::StackMachine::new(std::io::stdout().lock());
    machine.run(&program).context("evaluation failure")?;
    Ok(())
}
