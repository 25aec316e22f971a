//! Head-to-head match runner: pit two agents against each other over a batch
//! of games, alternating colors, and write the results out as CSV.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use flexi_logger::Logger;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};

use quoridor_engine::{
    Agent, AlphaBetaAgent, GreedyPathAgent, MctsAgent, Player, Quoridor, RandomAgent,
};

/// Games longer than this are scored as draws; two stubborn wall-players can
/// shuffle forever otherwise.
const MAX_PLIES: usize = 300;

#[derive(Parser, Debug)]
#[command(name = "quoridor-arena", about = "Run Quoridor matches between AI agents")]
struct Options {
    /// First agent: random | greedy | alphabeta<N> | mcts<N>
    #[arg(long, default_value = "greedy")]
    agent_a: String,

    /// Second agent, same spec format as --agent-a
    #[arg(long, default_value = "mcts200")]
    agent_b: String,

    /// Number of games to play (colors alternate every game)
    #[arg(long, default_value_t = 10)]
    games: usize,

    /// Directory for the CSV results and any saved move lists
    #[arg(long, default_value = "arena-results")]
    out_dir: PathBuf,

    /// Save every finished game's move list next to the CSV
    #[arg(long, default_value_t = false)]
    save_games: bool,

    /// Seed for the agents' randomness
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Log level filter (e.g. info, debug, quoridor_engine=debug)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Build an agent from its spec string, e.g. `alphabeta1` or `mcts400`.
fn create_agent(spec: &str, seed: u64) -> Result<Box<dyn Agent>> {
    match spec {
        "random" => Ok(Box::new(RandomAgent::new(seed))),
        "greedy" => Ok(Box::new(GreedyPathAgent)),
        s if s.starts_with("alphabeta") => {
            let depth = s
                .trim_start_matches("alphabeta")
                .parse()
                .with_context(|| format!("bad alphabeta depth in {spec:?}"))?;
            Ok(Box::new(AlphaBetaAgent::new(depth)))
        }
        s if s.starts_with("mcts") => {
            let evals = s
                .trim_start_matches("mcts")
                .parse()
                .with_context(|| format!("bad mcts eval count in {spec:?}"))?;
            Ok(Box::new(MctsAgent::new(evals, 0.9, seed)))
        }
        _ => bail!("unknown agent spec {spec:?}"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    WinA,
    WinB,
    Draw,
}

struct GameRecord {
    index: usize,
    north: String,
    south: String,
    outcome: Outcome,
    plies: usize,
    millis: u128,
}

/// Play one game to completion (or the ply cap). `a_is_north` decides the
/// color assignment for this game.
fn play_game<'a>(
    a: &'a mut dyn Agent,
    b: &'a mut dyn Agent,
    a_is_north: bool,
    index: usize,
    save_to: Option<&PathBuf>,
) -> Result<GameRecord> {
    let mut game = Quoridor::new();
    let start = Instant::now();

    let mut plies = 0;
    let winner = loop {
        if let Some(winner) = game.winner() {
            break Some(winner);
        }
        if plies >= MAX_PLIES {
            break None;
        }
        let north_to_move = game.current_player() == Player::North;
        let agent = if north_to_move == a_is_north { &mut *a } else { &mut *b };
        let Some(mv) = agent.choose_move(&mut game) else {
            // A search that comes back empty forfeits.
            break Some(game.current_player().opponent());
        };
        game.play(&mv)
            .with_context(|| format!("{} produced an illegal move", agent.name()))?;
        plies += 1;
    };

    if let Some(dir) = save_to {
        let path = dir.join(format!("game-{index:04}.moves"));
        game.save(&path)
            .with_context(|| format!("saving move list to {}", path.display()))?;
    }

    let outcome = match winner {
        Some(Player::North) if a_is_north => Outcome::WinA,
        Some(Player::South) if !a_is_north => Outcome::WinA,
        Some(_) => Outcome::WinB,
        None => Outcome::Draw,
    };
    let (north, south) = if a_is_north {
        (a.name(), b.name())
    } else {
        (b.name(), a.name())
    };
    debug!("game {index}: {north} vs {south} -> {outcome:?} in {plies} plies");

    Ok(GameRecord {
        index,
        north,
        south,
        outcome,
        plies,
        millis: start.elapsed().as_millis(),
    })
}

fn write_csv(path: &PathBuf, records: &[GameRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(["game", "north", "south", "outcome", "plies", "millis"])?;
    for r in records {
        let outcome = match r.outcome {
            Outcome::WinA => "win_a",
            Outcome::WinB => "win_b",
            Outcome::Draw => "draw",
        };
        writer.write_record([
            r.index.to_string(),
            r.north.clone(),
            r.south.clone(),
            outcome.to_string(),
            r.plies.to_string(),
            r.millis.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let options = Options::parse();
    let _logger = Logger::try_with_env_or_str(&options.log_level)?
        .log_to_stderr()
        .start()?;

    let mut agent_a = create_agent(&options.agent_a, options.seed)?;
    let mut agent_b = create_agent(&options.agent_b, options.seed.wrapping_add(1))?;
    fs::create_dir_all(&options.out_dir)
        .with_context(|| format!("creating {}", options.out_dir.display()))?;
    let save_dir = options.save_games.then(|| options.out_dir.clone());

    info!(
        "{} vs {}: {} games",
        agent_a.name(),
        agent_b.name(),
        options.games
    );
    let bar = ProgressBar::new(options.games as u64).with_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} [{elapsed_precise}]")?,
    );

    let mut records = Vec::with_capacity(options.games);
    for index in 0..options.games {
        let record = play_game(
            agent_a.as_mut(),
            agent_b.as_mut(),
            index % 2 == 0,
            index,
            save_dir.as_ref(),
        )?;
        records.push(record);
        bar.inc(1);
    }
    bar.finish();

    let (mut wins_a, mut wins_b, mut draws) = (0, 0, 0);
    for r in &records {
        match r.outcome {
            Outcome::WinA => wins_a += 1,
            Outcome::WinB => wins_b += 1,
            Outcome::Draw => draws += 1,
        }
    }

    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let csv_path = options.out_dir.join(format!("results-{stamp}.csv"));
    write_csv(&csv_path, &records)?;

    println!(
        "{}: {wins_a}  {}: {wins_b}  draws: {draws}  ({} games, results in {})",
        agent_a.name(),
        agent_b.name(),
        options.games,
        csv_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_specs_parse() {
        assert!(create_agent("random", 0).is_ok());
        assert!(create_agent("greedy", 0).is_ok());
        assert_eq!(create_agent("alphabeta2", 0).unwrap().name(), "alphabeta2");
        assert_eq!(create_agent("mcts64", 0).unwrap().name(), "mcts64");
        assert!(create_agent("alphabeta", 0).is_err());
        assert!(create_agent("deepblue", 0).is_err());
    }

    #[test]
    fn a_game_between_cheap_agents_completes() {
        let mut a = RandomAgent::new(5);
        let mut b = GreedyPathAgent;
        let record = play_game(&mut a, &mut b, true, 0, None).unwrap();
        assert!(record.plies > 0);
        assert_eq!(record.north, "random");
        assert_eq!(record.south, "greedy-path");
    }
}
