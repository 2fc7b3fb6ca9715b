use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use instrument_duel_core::{
    builtin_levels, AppConfig, AudioClock, DuelError, InputEdges, InputScript, JsonProfileStore,
    MatchSession, Phase, Profile, ProfileStore, SimulatedBackend, UpgradeKind,
};
use tracing_subscriber::EnvFilter;

/// Upper bound on simulated frames, far beyond any built-in level.
const MAX_SIMULATED_SECONDS: f64 = 600.0;

fn main() -> instrument_duel_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Levels => run_levels(),
        Commands::Simulate {
            level,
            fps,
            offset_ms,
            skip_every,
            config,
            profile,
        } => run_simulate(
            level,
            fps,
            offset_ms,
            skip_every,
            config.as_deref(),
            profile.as_deref(),
        ),
        Commands::Shop { profile, buy } => run_shop(&profile, buy.as_deref()),
    }
}

fn run_levels() -> instrument_duel_core::Result<()> {
    for (index, level) in builtin_levels().iter().enumerate() {
        println!(
            "{index}: {} vs {} ({} notes, {:.0}s, target {})",
            level.name,
            level.enemy_name,
            level.notes.len(),
            level.length_sec,
            level.expected_score
        );
    }
    Ok(())
}

fn run_simulate(
    level_index: usize,
    fps: f64,
    offset_ms: f64,
    skip_every: Option<usize>,
    config_path: Option<&Path>,
    profile_path: Option<&Path>,
) -> instrument_duel_core::Result<()> {
    let levels = builtin_levels();
    let level = levels
        .get(level_index)
        .ok_or_else(|| DuelError::msg(format!("no level {level_index}")))?;
    if !fps.is_finite() || fps <= 0.0 {
        return Err(DuelError::msg("fps must be positive"));
    }

    let mut store = profile_path.map(JsonProfileStore::new);
    let mut profile = match &store {
        Some(store) => store.load()?,
        None => Profile::default(),
    };
    if store.is_some() && level_index > profile.unlocked_level {
        return Err(DuelError::msg(format!("level {level_index} is still locked")));
    }

    let base = match config_path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let config = base.with_upgrades(&profile.upgrades);

    tracing::info!(level = %level.name, fps, offset_ms, ?skip_every, "starting simulated match");

    let mut session = MatchSession::for_level(level, config, SimulatedBackend::new());
    let mut script =
        InputScript::from_chart(session.engine().chart(), offset_ms / 1000.0, skip_every);
    let mut edges = InputEdges::new();
    let dt = 1.0 / fps;

    session.assets_ready();
    let mut simulated = 0.0;
    while !session.timeline().is_finished() {
        if simulated > MAX_SIMULATED_SECONDS {
            return Err(DuelError::msg("simulation did not finish"));
        }
        simulated += dt;
        session.audio_mut().backend_mut().advance(dt);

        if let Phase::Play { start_audio_time } = session.timeline().phase() {
            script.apply_until(session.audio().now() - start_audio_time, &mut edges);
        }
        let report = session.tick(dt, edges.take_snapshot());
        for event in &report.judgments {
            tracing::debug!(?event, "judgment");
        }
        session.pump_scheduler(dt);
    }

    let outcome = session
        .outcome()
        .cloned()
        .ok_or_else(|| DuelError::msg("finished match produced no outcome"))?;

    println!("{} vs {}", level.name, level.enemy_name);
    println!(
        "  perfect {}  good {}  holds {}  miss {}  max combo {}",
        outcome.counts.perfect,
        outcome.counts.good,
        outcome.counts.hold_complete,
        outcome.counts.miss,
        outcome.max_combo
    );
    println!(
        "  score {} x{} = {}  (enemy {})",
        outcome.raw_score, outcome.combo_multiplier, outcome.final_score, outcome.enemy_score
    );
    println!(
        "  {}  earned {}",
        if outcome.win { "YOU WIN" } else { "YOU LOSE" },
        outcome.earned
    );

    if let Some(store) = store.as_mut() {
        profile.record_outcome(level_index, &outcome, levels.len());
        store.save(&profile)?;
        println!("  balance {}", profile.money);
    }

    Ok(())
}

fn run_shop(profile_path: &Path, buy: Option<&str>) -> instrument_duel_core::Result<()> {
    let mut store = JsonProfileStore::new(profile_path);
    let mut profile = store.load()?;

    if let Some(id) = buy {
        let kind: UpgradeKind = id.parse()?;
        let cost = profile.purchase(kind)?;
        store.save(&profile)?;
        println!("bought {} for {cost}", kind.name());
    }

    println!("balance {}", profile.money);
    for kind in UpgradeKind::ALL {
        let level = profile.upgrade_level(kind);
        let price = match kind.cost_at_level(level) {
            Some(cost) => cost.to_string(),
            None => "owned".to_string(),
        };
        println!(
            "  {:<18} {:<22} {:>6}  {}",
            kind.id(),
            kind.name(),
            price,
            kind.description_at_level(level)
        );
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Rhythm duels judged against the audio clock", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the built-in levels.
    Levels,
    /// Play a level headlessly with a scripted player.
    Simulate {
        /// Index of the level to play.
        #[arg(short, long, default_value_t = 0)]
        level: usize,
        /// Simulated frame rate.
        #[arg(long, default_value_t = 60.0)]
        fps: f64,
        /// How far off each onset the scripted player presses, in milliseconds.
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        offset_ms: f64,
        /// Leave every n-th note unplayed.
        #[arg(long)]
        skip_every: Option<usize>,
        /// JSON config overriding the default windows and scoring.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Profile file to read upgrades from and bank the result into.
        #[arg(short, long)]
        profile: Option<PathBuf>,
    },
    /// Show upgrades and optionally buy one.
    Shop {
        /// Profile file to read and update.
        #[arg(short, long)]
        profile: PathBuf,
        /// Upgrade id to buy, e.g. `forgiving-hold`.
        #[arg(long)]
        buy: Option<String>,
    },
}
