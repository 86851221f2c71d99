use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::{Report, Result, WrapErr};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use ls8::{LoadError, Processor, Ram};

const EXIT_USAGE: u8 = 1;
const EXIT_NOT_FOUND: u8 = 2;
const EXIT_MALFORMED: u8 = 3;
const EXIT_FAULT: u8 = 4;

/// Runs a program on the LS-8 emulator
#[derive(Parser, Debug)]
#[command(name = "ls8", version)]
struct Cli {
    /// Program file, one 8-digit binary literal per line
    program: PathBuf,
    /// Log the CPU state before every instruction
    #[arg(short, long)]
    trace: bool,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        if self.trace {
            return LevelFilter::Trace;
        }
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

fn main() -> ExitCode {
    if let Err(err) = color_eyre::install() {
        eprintln!("{:?}", err);
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version end up here as well
            let code = if err.use_stderr() { EXIT_USAGE } else { 0 };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    if let Err(err) = SimpleLogger::new().with_level(cli.log_level()).init() {
        eprintln!("failed to initialize logging: {}", err);
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            eprintln!("{:?}", report);
            ExitCode::from(exit_code(&report))
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let memory = Ram::from_file(&cli.program)
        .wrap_err_with(|| format!("failed to load {}", cli.program.display()))?;
    memory.dump();

    let mut cpu = Processor::new(memory);
    cpu.set_tracing(cli.trace);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let res = cpu.run(&mut out);

    res.wrap_err_with(|| format!("execution stopped at pc 0x{:02X}", cpu.pc))
}

fn exit_code(report: &Report) -> u8 {
    match report.downcast_ref::<LoadError>() {
        Some(LoadError::NotFound { .. }) => EXIT_NOT_FOUND,
        Some(_) => EXIT_MALFORMED,
        None => EXIT_FAULT,
    }
}
