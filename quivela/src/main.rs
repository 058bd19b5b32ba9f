#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, NamedSource};
use quivela_core::{CheckOptions, Checker};
use quivela_parse::{format_development, parse_development};
use quivela_verify::{run, BoogieBackend, BoogieVerifier, ProofCache};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_config, ResolvedConfig};

#[derive(Parser, Debug)]
#[command(name = "quivela", version, about = "Equivalence prover for object programs")]
struct Cli {
    /// Verifier executable. Overrides `quivela.toml`.
    #[arg(short = 'b', long = "boogie", global = true)]
    boogie: Option<PathBuf>,

    /// Number of verifier processes run at once.
    #[arg(short = 'j', long, global = true)]
    workers: Option<usize>,

    /// Neither consult nor update the proof cache.
    #[arg(long, global = true)]
    no_cache: bool,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Check every proof in a development and verify the generated programs
    Check {
        /// Input .qvl file
        path: PathBuf,
    },
    /// Print the canonical rendering of a development
    Fmt {
        path: PathBuf,

        /// Only report whether the file is already formatted
        #[arg(long)]
        check: bool,
    },
    /// Check proofs and write the generated programs instead of verifying them
    Emit {
        path: PathBuf,

        /// Directory receiving `taskN.bpl`
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.cmd {
        Cmd::Check { path } => {
            let resolved = resolve_config(&cli, path)?;
            check(path, &resolved)
        }
        Cmd::Fmt { path, check } => format_file(path, *check),
        Cmd::Emit { path, out } => {
            let resolved = resolve_config(&cli, path)?;
            emit(path, out, &resolved)
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(cli: &Cli, path: &Path) -> miette::Result<ResolvedConfig> {
    let mut resolved = load_config(path)?;
    if let Some(config_path) = &resolved.path {
        debug!(path = %config_path.display(), "using configuration");
    }
    let config = &mut resolved.config;
    if let Some(boogie) = &cli.boogie {
        config.verifier.path = boogie.clone();
    }
    if let Some(workers) = cli.workers {
        config.scheduler.workers = workers;
    }
    if cli.no_cache {
        config.cache.enabled = false;
    }
    Ok(resolved)
}

fn check_development(path: &Path, resolved: &ResolvedConfig) -> miette::Result<BoogieBackend> {
    let options = CheckOptions {
        search_paths: resolved.search_paths(),
    };
    let mut checker = Checker::with_options(BoogieBackend::new(), options);
    checker.check_file(path).map_err(miette::Report::new)?;
    Ok(checker.into_backend())
}

fn check(path: &Path, resolved: &ResolvedConfig) -> miette::Result<()> {
    let tasks = check_development(path, resolved)?.into_tasks();
    let config = &resolved.config;

    let work_dir = resolved.work_dir();
    fs::create_dir_all(&work_dir).into_diagnostic()?;
    let mut cache = if config.cache.enabled {
        ProofCache::load(resolved.cache_file()).into_diagnostic()?
    } else {
        ProofCache::disabled()
    };
    let verifier = BoogieVerifier::new(
        config.verifier.path.clone(),
        config.verifier.args.clone(),
        work_dir,
    )?;

    let total = tasks.len();
    let summary = run(tasks, &verifier, &mut cache, &config.scheduler.to_config())?;
    info!(
        verified = summary.verified,
        cached = summary.cached,
        "all {total} proof tasks succeeded"
    );
    println!("{}: ok", path.display());
    Ok(())
}

fn format_file(path: &Path, check: bool) -> miette::Result<()> {
    let src = fs::read_to_string(path).into_diagnostic()?;
    let source = NamedSource::new(path.display().to_string(), src.clone());
    let development = parse_development(&src)
        .map_err(|e| miette::Report::new(e).with_source_code(source.clone()))?;
    let formatted = format_development(&development);

    if !check {
        print!("{formatted}");
        return Ok(());
    }
    if formatted != src {
        return Err(miette::miette!("{} is not formatted", path.display()));
    }
    println!("{}: formatted", path.display());
    Ok(())
}

fn emit(path: &Path, out: &Path, resolved: &ResolvedConfig) -> miette::Result<()> {
    let tasks = check_development(path, resolved)?.into_tasks();
    fs::create_dir_all(out).into_diagnostic()?;
    for (i, task) in tasks.iter().enumerate() {
        let file = out.join(format!("task{i}.bpl"));
        fs::write(&file, &task.program).into_diagnostic()?;
        println!("{}: {}", file.display(), task.describe());
    }
    Ok(())
}
