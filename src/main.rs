//! Command-line front end for the Connect-Four solver

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};

use connect4::{HorizonOutcome, OpeningBook, Position, SearchOutcome, Solver, SolverConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Perfect-play Connect-Four solver", long_about = None)]
struct Cli {
    /// TOML settings file (defaults apply when absent)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve positions given as 1-based column sequences
    Solve(SolveArgs),
    /// Generate an opening book
    Book(BookArgs),
    /// Print the default configuration as TOML
    DefaultConfig,
}

#[derive(Args, Debug)]
struct SolveArgs {
    /// Move sequences such as 4453; read from stdin, one per line, when empty
    positions: Vec<String>,

    /// Only compute win / draw / loss
    #[arg(long)]
    weak: bool,

    /// Print the score of every column instead of the best move
    #[arg(long, conflicts_with = "horizon")]
    analyze: bool,

    /// Look for a forced result within N plies
    #[arg(long, value_name = "N")]
    horizon: Option<usize>,

    /// Time budget per position in milliseconds
    #[arg(long)]
    time_ms: Option<u64>,

    /// Threads for --analyze
    #[arg(long)]
    threads: Option<usize>,

    /// Transposition table size in megabytes
    #[arg(long)]
    tt_size_mb: Option<usize>,

    /// Opening book file
    #[arg(long)]
    book: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct BookArgs {
    /// Store every position with at most this many stones
    #[arg(long)]
    depth: usize,

    /// Output file
    #[arg(long)]
    out: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, log_level),
    )
    .target(env_logger::Target::Stderr)
    .init();

    if let Err(e) = run(cli) {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => SolverConfig::load_or_default(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SolverConfig::default(),
    };

    match cli.command {
        Command::Solve(args) => solve(config, args),
        Command::Book(args) => generate_book(config, args),
        Command::DefaultConfig => {
            print!("{}", SolverConfig::default_toml()?);
            Ok(())
        }
    }
}

fn solve(mut config: SolverConfig, args: SolveArgs) -> Result<()> {
    config.weak |= args.weak;
    if let Some(ms) = args.time_ms {
        config.time_budget_ms = Some(ms);
    }
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    if let Some(size) = args.tt_size_mb {
        config.tt_size_mb = size;
    }
    if args.book.is_some() {
        config.book_path = args.book.clone();
    }
    config.validate()?;

    let mut solver: Solver = config.build_solver();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.positions.is_empty() {
        for line in io::stdin().lock().lines() {
            let line = line.context("reading stdin")?;
            let seq = line.trim();
            if !seq.is_empty() {
                solve_one(&mut solver, &args, seq, &mut out)?;
            }
        }
    } else {
        for seq in &args.positions {
            solve_one(&mut solver, &args, seq.trim(), &mut out)?;
        }
    }
    Ok(())
}

fn solve_one(solver: &mut Solver, args: &SolveArgs, seq: &str, out: &mut impl Write) -> Result<()> {
    let pos: Position = match seq.parse() {
        Ok(pos) => pos,
        Err(e) => {
            warn!("skipping {seq:?}: {e}");
            writeln!(out, "{seq} invalid")?;
            return Ok(());
        }
    };

    let start = Instant::now();
    if args.analyze {
        match solver.analyze(&pos) {
            Ok(scores) => {
                let cols: Vec<String> = scores
                    .iter()
                    .map(|s| s.map_or_else(|| "-".to_string(), |s| s.to_string()))
                    .collect();
                writeln!(
                    out,
                    "{seq} {} {} {}",
                    cols.join(" "),
                    solver.last_stats().nodes,
                    start.elapsed().as_micros()
                )?;
            }
            Err(_) => writeln!(out, "{seq} aborted")?,
        }
    } else if let Some(max_plies) = args.horizon {
        match solver.search_horizon(&pos, max_plies) {
            Ok(HorizonOutcome::Win { plies }) => writeln!(out, "{seq} win {plies}")?,
            Ok(HorizonOutcome::Loss { plies }) => writeln!(out, "{seq} loss {plies}")?,
            Ok(HorizonOutcome::Unresolved) => writeln!(out, "{seq} unresolved")?,
            Err(_) => writeln!(out, "{seq} aborted")?,
        }
    } else {
        match solver.solve(&pos) {
            SearchOutcome::Solved(solution) => writeln!(
                out,
                "{seq} {} {} {} {}",
                solution.score,
                // 0 when the game is over
                solution.best_move.map_or(0, |col| col + 1),
                solution.nodes,
                start.elapsed().as_micros()
            )?,
            SearchOutcome::Aborted => writeln!(out, "{seq} aborted")?,
        }
    }
    Ok(())
}

fn generate_book(config: SolverConfig, args: BookArgs) -> Result<()> {
    config.validate()?;
    let mut solver: Solver = Solver::new(config.tt_size_mb);

    info!("generating opening book to depth {}", args.depth);
    let start = Instant::now();
    let book = OpeningBook::generate(args.depth, &mut solver)?;
    book.write(&args.out)
        .with_context(|| format!("writing {}", args.out.display()))?;
    info!(
        "wrote {} positions to {} in {:?}",
        book.len(),
        args.out.display(),
        start.elapsed()
    );

    // sanity check the file loads back
    let reloaded = OpeningBook::<7, 6>::load(&args.out)?;
    if reloaded != book {
        anyhow::bail!("book at {} does not read back", args.out.display());
    }
    Ok(())
}
