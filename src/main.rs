use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use finja::output::{color_choice, OutputOptions, ResultPrinter};
use finja::query::SearchRequest;
use finja::utils::progress::heartbeat;
use finja::utils::{init_logging, AppConfig};
use finja::{FinjaError, Session};
use std::path::Path;
use std::process::ExitCode;
use termcolor::StandardStream;
use tracing::info;

/// Index and find stuff
#[derive(Parser)]
#[command(name = "finja")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Index the current directory
    #[arg(short, long)]
    index: bool,

    /// Update the index before searching
    #[arg(short, long)]
    update: bool,

    /// Ignore line numbers when matching search terms
    #[arg(short, long)]
    file_mode: bool,

    /// Lines of context
    #[arg(short, long, default_value_t = 1)]
    context: usize,

    /// Raw output to parse with tools: \0 delimiter (no duplicates, use finjadup)
    #[arg(short, long)]
    raw: bool,

    /// Only read N files and then stop; rerun to continue
    #[arg(short, long, default_value_t = 0, value_name = "N")]
    batch: usize,

    /// Ignore paths containing this text (repeatable)
    #[arg(short, long, value_name = "PAT")]
    pignore: Vec<String>,

    /// Remove unused tokens and rebuild the database file
    #[arg(short, long)]
    vacuum: bool,

    /// Use less memory while indexing
    #[arg(short, long)]
    less_memory: bool,

    /// Forget stored fingerprints so every file is hashed again
    #[arg(long)]
    clear_inodes: bool,

    /// Use international separators (only when creating the index)
    #[arg(long)]
    interpunct: bool,

    /// Print index statistics
    #[arg(long)]
    stats: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Search terms; all must match
    terms: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet);

    match run(cli) {
        Ok(code) => code,
        Err(e) if is_broken_pipe(&e) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let app_config = AppConfig::load().context("Failed to load configuration")?;
    let mut config = app_config.index_config(cli.less_memory);
    config.batch_limit = cli.batch;
    config.reset_fingerprints = cli.clear_inodes;
    config.interpunct = cli.interpunct;

    let cwd = std::env::current_dir()
        .and_then(|dir| dir.canonicalize())
        .context("Cannot access the current directory")?;

    let maintenance = cli.vacuum || cli.stats;
    if !cli.index && !cli.update && !maintenance && cli.terms.is_empty() {
        eprintln!("{}", Cli::command().render_help());
        return Ok(ExitCode::FAILURE);
    }

    if cli.index {
        let mut session = Session::create(&cwd, config.clone())?;
        if session.run_index(false)?.batch_limit_reached {
            return Ok(ExitCode::SUCCESS);
        }
        if !cli.update && !maintenance && cli.terms.is_empty() {
            return Ok(ExitCode::SUCCESS);
        }
    }

    let mut session = Session::discover(&cwd, config)?;

    if cli.update && session.run_index(true)?.batch_limit_reached {
        return Ok(ExitCode::SUCCESS);
    }
    if cli.vacuum {
        let report = session.compact(!cli.raw)?;
        info!(tokens_removed = report.tokens_removed, "Vacuum done");
    }
    if cli.stats {
        print!("{}", session.summary()?);
    }
    if cli.terms.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }

    search(&mut session, &cli, &cwd)?;
    Ok(ExitCode::SUCCESS)
}

fn search(session: &mut Session, cli: &Cli, cwd: &Path) -> Result<()> {
    let request = SearchRequest {
        terms: cli.terms.clone(),
        path_ignores: cli.pignore.clone(),
        file_mode: cli.file_mode,
        update: false,
    };

    let spinner = heartbeat("Searching...", !cli.raw);
    let results = session.search(&request);
    spinner.finish_and_clear();
    let Some(results) = results? else {
        return Ok(());
    };

    let options = OutputOptions {
        context: cli.context,
        raw: cli.raw,
    };
    let stdout = StandardStream::stdout(color_choice(cli.raw));
    let mut printer = ResultPrinter::new(
        stdout.lock(),
        session.store(),
        session.root(),
        cwd,
        &request.terms,
        options,
    );
    printer.print(&results)?;
    Ok(())
}

fn is_broken_pipe(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<FinjaError>() {
        Some(FinjaError::Io(io)) => io.kind() == std::io::ErrorKind::BrokenPipe,
        _ => false,
    }
}
