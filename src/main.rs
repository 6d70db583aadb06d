use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use yap::mach::{compile_with, execute_with, Limits};

#[derive(Parser, Debug)]
#[command(name = "yap", version, about = "The Yap scripting language")]
struct Cli {
    /// Source file to compile and run; starts the shell when omitted.
    file: Option<PathBuf>,
    /// Print the disassembly before running.
    #[arg(long)]
    ops: bool,
    /// Operand stack capacity.
    #[arg(long)]
    stack: Option<usize>,
    /// Call frame capacity.
    #[arg(long)]
    frames: Option<usize>,
    /// Instruction buffer capacity in bytes.
    #[arg(long)]
    instructions: Option<usize>,
}

impl Cli {
    fn limits(&self) -> Limits {
        let mut limits = Limits::default();
        if let Some(stack) = self.stack {
            limits.stack = stack;
        }
        if let Some(frames) = self.frames {
            limits.frames = frames;
        }
        if let Some(instructions) = self.instructions {
            limits.instructions = instructions;
        }
        limits
    }
}

fn install_tracing() {
    let filter = EnvFilter::try_from_env("YAP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_file(cli: &Cli, path: &PathBuf) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("{}: {}", path.display(), error);
            return ExitCode::FAILURE;
        }
    };
    let limits = cli.limits();
    let program = match compile_with(&source, &limits) {
        Ok(program) => program,
        Err(error) => {
            eprintln!("{}", error);
            return ExitCode::FAILURE;
        }
    };
    if cli.ops {
        print!("{}", program);
    }
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match execute_with(&program, &limits, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}", error);
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    install_tracing();
    let cli = Cli::parse();
    match &cli.file {
        Some(path) => run_file(&cli, path),
        None => match yap::term::main(&cli.limits()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                eprintln!("{}", error);
                ExitCode::FAILURE
            }
        },
    }
}
