use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scratchpad::figures::{self, Close};
use scratchpad::{EngineConfig, ExecutionEngine, ExecutionResult};
use tracing_subscriber::EnvFilter;

/// Deep snippet recursion needs a deep native stack.
const ENGINE_STACK_SIZE: usize = 256 * 1024 * 1024;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// JSON file with engine settings
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a snippet file ("-" reads standard input)
  Run {
    file: PathBuf,
    /// Working directory (defaults to the file's directory)
    #[arg(long)]
    cwd: Option<PathBuf>,
    /// Write every figure left open as SVG into this directory
    #[arg(long)]
    figures: Option<PathBuf>,
    /// Print the result as JSON instead of a console report
    #[arg(long)]
    json: bool,
  },
  /// Evaluate inline code in the current directory
  Eval {
    code: String,
    #[arg(long)]
    json: bool,
  },
}

fn main() -> Result<()> {
  let filter = EnvFilter::try_from_env("SCRATCHPAD_LOG")
    .unwrap_or_else(|_| EnvFilter::new("warn"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();

  let cli = Cli::parse();
  let worker = std::thread::Builder::new()
    .name("engine".into())
    .stack_size(ENGINE_STACK_SIZE)
    .spawn(move || run(cli))
    .context("cannot start engine thread")?;
  let success = match worker.join() {
    Ok(result) => result?,
    Err(_) => anyhow::bail!("engine thread panicked"),
  };
  if !success {
    std::process::exit(1);
  }
  Ok(())
}

/// Returns whether the snippet finished without an exception.
fn run(cli: Cli) -> Result<bool> {
  let config = match &cli.config {
    Some(path) => EngineConfig::from_json_file(path)?,
    None => EngineConfig::default(),
  };
  let mut engine = ExecutionEngine::with_config(config);

  let (result, figures_dir, json) = match cli.command {
    Commands::Run {
      file,
      cwd,
      figures: figures_dir,
      json,
    } => {
      let source = read_source(&file)?;
      let cwd = cwd.or_else(|| source_directory(&file));
      figures::close(Close::All);
      (engine.run(&source, cwd.as_deref()), figures_dir, json)
    }
    Commands::Eval { code, json } => (engine.run(&code, None), None, json),
  };

  if let Some(dir) = figures_dir {
    export_figures(&engine, &dir)?;
  }
  print_result(&result, json)?;
  Ok(result.is_success())
}

fn read_source(file: &Path) -> Result<String> {
  if file == Path::new("-") {
    let mut source = String::new();
    std::io::stdin()
      .read_to_string(&mut source)
      .context("cannot read snippet from standard input")?;
    return Ok(source);
  }
  std::fs::read_to_string(file)
    .with_context(|| format!("cannot read {}", file.display()))
}

fn source_directory(file: &Path) -> Option<PathBuf> {
  if file == Path::new("-") {
    return None;
  }
  let dir = file.parent()?;
  if dir.as_os_str().is_empty() {
    None
  } else {
    Some(dir.to_path_buf())
  }
}

fn export_figures(engine: &ExecutionEngine, dir: &Path) -> Result<()> {
  std::fs::create_dir_all(dir)
    .with_context(|| format!("cannot create {}", dir.display()))?;
  for figure in engine.get_all_figures() {
    let path = dir.join(format!("figure-{}.svg", figure.number()));
    figure
      .save_svg(&path)
      .with_context(|| format!("cannot export figure {}", figure.number()))?;
    eprintln!("wrote {}", path.display());
  }
  Ok(())
}

fn print_result(result: &ExecutionResult, json: bool) -> Result<()> {
  if json {
    println!("{}", serde_json::to_string_pretty(result)?);
  } else {
    print!("{}", result.console_report());
  }
  Ok(())
}
