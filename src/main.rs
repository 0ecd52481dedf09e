use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::{info, Level};

use monopoly_markov::simulation::BatchReport;
use monopoly_markov::steady_state::rank;
use monopoly_markov::{
    cross_check, exact_steady_state, simulate, Board, BoardSpec, DiceConfig, RowPolicy,
    SimulationConfig,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Solve the Markov chain exactly.
    Exact,
    /// Only run the Monte Carlo simulation.
    Simulate,
    /// Solve exactly and check the result by simulation.
    Both,
}

#[derive(Parser, Debug)]
#[command(name = "monopoly-markov")]
#[command(about = "Long-run probability of ending a turn on each square of a Monopoly board")]
struct Args {
    /// Values on the faces of each die
    #[arg(long, value_delimiter = ',', default_value = "1,2,3,4,5,6")]
    faces: Vec<u32>,

    /// Number of dice rolled each turn
    #[arg(long, default_value_t = 2)]
    dice: u32,

    #[arg(long, value_enum, default_value_t = Mode::Both)]
    mode: Mode,

    /// Number of simulation batches
    #[arg(long, default_value_t = 3000)]
    batches: u64,

    /// Moves per simulation batch
    #[arg(long, default_value_t = 1000)]
    batch_size: u64,

    /// Square the simulated token starts on, by name or index (default: Go)
    #[arg(long)]
    start: Option<String>,

    /// Seed for the simulation
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// YAML board file (default: the London board)
    #[arg(long)]
    board: Option<PathBuf>,

    /// Renormalize transition rows that don't sum to 1 instead of failing
    #[arg(long)]
    renormalize: bool,

    /// Maximum card draws triggered by one landing (1 to 64)
    #[arg(long)]
    max_card_draws: Option<u32>,

    /// Also solve with the pseudo-inverse and report the difference
    #[arg(long)]
    cross_check: bool,

    /// Print a convergence line every this many batches (0 disables)
    #[arg(long, default_value_t = 500)]
    progress_every: u64,

    /// Print the results as JSON instead of a table
    #[arg(long)]
    json: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Serialize)]
struct SquareReport<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    exact: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    simulated: Option<f64>,
}

#[derive(Serialize)]
struct Report<'a> {
    dice: &'a DiceConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    simulation: Option<SimulationConfig>,
    squares: Vec<SquareReport<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    residual: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cross_check: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    convergence: Vec<BatchReport>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("monopoly-markov failed: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    let level = Level::from_str(&args.log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let board = load_board(&args)?;
    let dice = DiceConfig::new(args.faces.clone(), args.dice);
    let policy = if args.renormalize {
        RowPolicy::Renormalize
    } else {
        RowPolicy::Strict
    };

    info!(
        squares = board.len(),
        faces = ?dice.faces,
        dice = dice.count,
        mode = ?args.mode,
        "starting"
    );

    /*********        EXACT SOLUTION        *********/

    let mut exact = None;
    let mut residual = None;
    let mut cross_check_difference = None;

    if args.mode != Mode::Simulate {
        let start = Instant::now();
        let (matrix, steady) =
            exact_steady_state(&board, &dice, policy).context("solving the steady state")?;
        info!(
            size = matrix.size(),
            residual = steady.residual(),
            elapsed = ?start.elapsed(),
            "solved transition matrix"
        );

        if args.cross_check {
            let difference = cross_check(&matrix, &steady).context("pseudo-inverse cross-check")?;
            info!(difference, "pseudo-inverse cross-check");
            cross_check_difference = Some(difference);
        }

        residual = Some(steady.residual());
        exact = Some(steady.probabilities().to_vec());
    }

    /*********        SIMULATION        *********/

    let mut simulated = None;
    let mut simulation = None;
    let mut convergence = vec![];

    if args.mode != Mode::Exact {
        let config = SimulationConfig {
            batches: args.batches,
            batch_size: args.batch_size,
            start: start_square(&board, args.start.as_deref())?,
            seed: args.seed,
        };

        let start = Instant::now();
        let outcome = simulate(&board, &dice, &config, exact.as_deref())
            .context("simulating the random walk")?;
        info!(
            moves = config.total_moves(),
            elapsed = ?start.elapsed(),
            "simulated random walk"
        );

        simulated = Some(outcome.occupancy);
        simulation = Some(config);
        convergence = outcome.reports;
    }

    /*********        OUTPUT        *********/

    let names = board.names();

    if args.json {
        let report = Report {
            dice: &dice,
            simulation,
            squares: names
                .iter()
                .enumerate()
                .map(|(i, &name)| SquareReport {
                    name,
                    exact: exact.as_ref().map(|p| p[i]),
                    simulated: simulated.as_ref().map(|p| p[i]),
                })
                .collect(),
            residual,
            cross_check: cross_check_difference,
            convergence,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if args.progress_every > 0 && exact.is_some() {
        print_convergence(&convergence, args.progress_every);
    }

    // Rank by the exact solution when there is one
    match (&exact, &simulated) {
        (Some(exact), simulated) => print_ranking(&names, exact, simulated.as_deref()),
        (None, Some(simulated)) => print_ranking(&names, simulated, None),
        (None, None) => unreachable!(),
    }

    Ok(())
}

/// Load the board file, or the London board if none was given.
fn load_board(args: &Args) -> Result<Board> {
    let board = match &args.board {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("reading board file {}", path.display()))?;
            let spec = BoardSpec::from_yaml(&source)
                .with_context(|| format!("parsing board file {}", path.display()))?;
            Board::new(&spec)?
        }
        None => Board::reference()?,
    };

    Ok(match args.max_card_draws {
        Some(draws) => board.with_max_card_draws(draws)?,
        None => board,
    })
}

/// Resolve `--start` as a square name or index.
fn start_square(board: &Board, start: Option<&str>) -> Result<usize> {
    let index = match start {
        None => board.go(),
        Some(s) => match s.parse::<usize>() {
            Ok(i) => board.check_index(i)?,
            Err(_) => board.index_of(s)?,
        },
    };

    Ok(index)
}

fn print_convergence(reports: &[BatchReport], every: u64) {
    for report in reports.iter().filter(|r| r.batch % every == 0) {
        if let Some(distance) = report.distance {
            println!(
                "after \x1b[36m{:>9}\x1b[0m moves: max difference \x1b[33m{:.5}\x1b[0m",
                report.moves, distance
            );
        }
    }
    println!();
}

/// Print squares from most to least likely.
fn print_ranking(names: &[&str], probabilities: &[f64], simulated: Option<&[f64]>) {
    for (i, p) in rank(probabilities) {
        match simulated {
            Some(sim) => println!(
                "{:<26} \x1b[33m{:.4}\x1b[0m  sim \x1b[32m{:.4}\x1b[0m",
                names[i], p, sim[i]
            ),
            None => println!("{:<26} \x1b[33m{:.4}\x1b[0m", names[i], p),
        }
    }

    println!("Total probability: {}", probabilities.iter().sum::<f64>());
}
