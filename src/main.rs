use clap::{Parser, ValueEnum};
use env_logger::Env;
use itertools::Itertools;
use log::{error, info};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

use chest_route::map_file::{MapError, MapFile};
use chest_route::pathfinding::{Cost, Pos};
use chest_route::route::{Direction, Route, StitchError};
use chest_route::solvers::{ExhaustivePlanner, GreedyPlanner, PlanError, Planner, PlannerSettings};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PlannerName {
    /// Nearest target first, must collect the whole goal or fails.
    Greedy,
    /// Tries every collection order, collects as many targets as possible.
    Exhaustive,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Map file to plan a route on.
    map: PathBuf,

    /// Planner implementation to use to find a route.
    #[arg(short, long, value_enum, default_value_t = PlannerName::Greedy)]
    planner: PlannerName,

    /// Energy budget, overrides the map's 'energy' header.
    #[arg(short, long)]
    energy: Option<Cost>,

    /// For the greedy planner, number of targets to collect. Overrides the
    /// map's 'goal' header and the settings file.
    #[arg(long)]
    max_targets: Option<usize>,

    /// For the exhaustive planner, cap on expanded search states. Overrides
    /// the settings file.
    #[arg(long)]
    max_expansions: Option<usize>,

    /// Planner settings JSON file to use.
    #[arg(long)]
    settings_file: Option<PathBuf>,

    /// Also print the route as a list of moves.
    #[arg(long)]
    moves: bool,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Error, Debug)]
enum AppError {
    #[error("Failed loading the map: {0}")]
    Map(#[from] MapError),
    #[error("Failed reading the settings file")]
    SettingsRead(#[from] std::io::Error),
    #[error("Bad JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No energy budget: pass --energy or add an 'energy' header to the map")]
    MissingEnergy,
    #[error("Planning failed: {0}")]
    Plan(#[from] PlanError),
    #[error("Route is not a walk: {0}")]
    Moves(#[from] StitchError),
}

#[derive(Serialize)]
struct Report<'a> {
    planner: &'a str,
    start: Pos,
    energy: Cost,
    targets: usize,
    route: Option<&'a Route>,
    moves: Option<Vec<Direction>>,
}

fn load_settings(cli: &Cli) -> Result<PlannerSettings, AppError> {
    let mut settings = match &cli.settings_file {
        Some(filename) => {
            info!("Loading planner settings from {}", filename.display());
            let data = std::fs::read_to_string(filename)?;
            serde_json::from_str(&data)?
        },
        None => PlannerSettings::default(),
    };
    if cli.max_targets.is_some() {
        settings.max_targets = cli.max_targets;
    }
    if cli.max_expansions.is_some() {
        settings.max_expansions = cli.max_expansions;
    }
    info!("Planner settings: {settings:?}");
    Ok(settings)
}

fn new_planner(name: PlannerName, settings: &PlannerSettings) -> Box<dyn Planner> {
    match name {
        PlannerName::Greedy => Box::new(GreedyPlanner::new(settings.max_targets)),
        PlannerName::Exhaustive => Box::new(ExhaustivePlanner::new(settings.max_expansions)),
    }
}

fn print_text(report: &Report) {
    println!("Planner: {}", report.planner);
    match report.route {
        None => println!("No feasible route within {} energy.", report.energy),
        Some(route) => {
            println!("Collected {}/{} targets for {} energy (budget {}).",
                     route.score(), report.targets, route.cost, report.energy);
            let show = |p: &Pos| format!("({}, {})", p.x, p.y);
            println!("Targets: {}", route.collected.iter().map(show).join(" "));
            println!("Route: {}", route.steps.iter().map(show).join(" "));
        },
    }
    if let Some(moves) = &report.moves {
        println!("Moves: {}", moves.iter().map(|m| format!("{m:?}")).join(" "));
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let mut settings = load_settings(&cli)?;
    let map = MapFile::load(&cli.map)?;
    let energy = cli.energy.or(map.energy).ok_or(AppError::MissingEnergy)?;
    if settings.max_targets.is_none() {
        settings.max_targets = map.goal;
    }
    info!("Map {}: start {:?}, {} targets, {} energy",
          cli.map.display(), map.start, map.targets.len(), energy);

    let mut planner = new_planner(cli.planner, &settings);
    let route = planner.plan(&map.grid, map.start, &map.targets, energy)?;
    let moves = match (&route, cli.moves) {
        (Some(route), true) => Some(route.directions()?),
        _ => None,
    };
    let report = Report {
        planner: planner.name(),
        start: map.start,
        energy,
        targets: map.targets.len(),
        route: route.as_ref(),
        moves,
    };
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_text(&report);
    }
    Ok(())
}

fn main() -> ExitCode {
    // Load .env file
    dotenvy::dotenv().ok();
    // Init logger with default value of info
    // This can be overriden with RUST_LOG env var
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Error while planning a route with underlying error:");
            error!("  {}", err);
            ExitCode::FAILURE
        },
    }
}
