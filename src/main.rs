use std::path::PathBuf;

use anyhow::{Context as _, bail};
use clap::Parser;
use tapevm::instruction::disassemble;
use tapevm::machine::DEFAULT_TAPE_LENGTH;
use tapevm::{Cell, IoDriver, Machine, MachineConfig};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tapevm", about = "Run a tape machine program")]
struct Cli {
    /// Program text. Mutually exclusive with --file. A program that is
    /// exactly `--` must follow the separator: `tapevm -- --`.
    #[arg(allow_hyphen_values = true)]
    program: Option<String>,

    /// Read the program from a file instead.
    #[arg(long, conflicts_with = "program")]
    file: Option<PathBuf>,

    /// Number of cells on the tape.
    #[arg(long, default_value_t = DEFAULT_TAPE_LENGTH)]
    tape_length: usize,

    /// Value returned to every input instruction (no reader if omitted).
    #[arg(long, allow_negative_numbers = true)]
    input: Option<Cell>,

    /// Print each output value on stdout.
    #[arg(long)]
    echo: bool,

    /// Print the first N cells after execution.
    #[arg(long)]
    dump: Option<usize>,

    /// Print the disassembly and exit without executing.
    #[arg(long)]
    disassemble: bool,
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tapevm=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_source(cli: &Cli) -> anyhow::Result<String> {
    match (&cli.program, &cli.file) {
        (Some(program), None) => Ok(program.clone()),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read program from {}", path.display())),
        _ => bail!("expected a program argument or --file <PATH>"),
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let source = load_source(&cli)?;

    if cli.disassemble {
        print!("{}", disassemble(source.as_bytes()));
        return Ok(());
    }

    let mut driver = IoDriver::default();
    if let Some(value) = cli.input {
        driver = driver.with_reader(move || value);
    }
    if cli.echo {
        driver = driver.with_writer(|_, value| println!("{value}"));
    }

    let config = MachineConfig {
        tape_length: cli.tape_length,
    };
    let mut machine = Machine::with_config(&driver, config).context("failed to create machine")?;
    machine.load_program(&source)?;

    let result = machine.execute();

    if let Some(n) = cli.dump {
        let cells = &machine.tape()[..n.min(machine.tape_len())];
        let line: Vec<String> = cells.iter().map(|c| c.to_string()).collect();
        println!("{}", line.join(" "));
    }

    match result {
        Ok(steps) => {
            info!(steps, data_pointer = ?machine.data_pointer(), "done");
            Ok(())
        }
        Err(e) => {
            error!(instruction_pointer = ?machine.instruction_pointer(), "{e}");
            Err(e).context("execution failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_may_start_with_decrement() {
        let cli = Cli::try_parse_from(["tapevm", "-+"]).unwrap();
        assert_eq!(cli.program.as_deref(), Some("-+"));
        assert!(cli.file.is_none());
    }

    #[test]
    fn test_hyphen_program_after_flags() {
        let cli = Cli::try_parse_from(["tapevm", "--dump", "2", "-->+"]).unwrap();
        assert_eq!(cli.program.as_deref(), Some("-->+"));
        assert_eq!(cli.dump, Some(2));
    }

    #[test]
    fn test_double_dash_program_after_separator() {
        let cli = Cli::try_parse_from(["tapevm", "--", "--"]).unwrap();
        assert_eq!(cli.program.as_deref(), Some("--"));
    }

    #[test]
    fn test_hyphen_program_loads_as_source() {
        let cli = Cli::try_parse_from(["tapevm", "-+-"]).unwrap();
        assert_eq!(load_source(&cli).unwrap(), "-+-");
    }
}
