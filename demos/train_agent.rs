use std::{env, fs, path::Path, time::Instant};

use anyhow::{Context, Result};
use fareflow::prelude::*;
use time::macros::format_description;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let _guard = init_tracing()?;

    println!("Building pricing environment...");
    let build_start = Instant::now();
    let env = environment()?;
    let build_time = build_start.elapsed();

    let train_start = Instant::now();
    let cfg = TrainerConfig::default().with_iterations(150).with_seed(7);
    let mut trainer = A2cTrainer::new(&env, cfg)?;
    let report = trainer.train()?;
    let train_time = train_start.elapsed();
    let policy = trainer.into_policy();

    let out = Path::new("demos/reports/train_agent");
    let location = StorageLocation::Local(out);
    policy.save(&location, "surge_policy", SerdeFormat::Json)?;

    println!("Comparing agents...");
    let levels = env.config().levels().clone();
    let agents: Vec<Box<dyn Agent + Send>> = vec![
        Box::new(policy.clone()),
        Box::new(RuleBasedAgent::default()),
        Box::new(FixedSurgeAgent::at_multiplier(&levels, 1.0)?),
        Box::new(RandomAgent::new(env.action_space(), 3)),
    ];
    let board = compare_agents(&env, agents, 20, 11)?;

    let mut journal = EpisodeJournal::new();
    let mut eval_env = env.clone();
    let mut greedy = policy;
    eval_env.run_episode(&mut greedy, Some(&mut journal))?;
    journal.to_csv(&location, "greedy_episode")?;

    println!("\n--- Leaderboard (mean episode reward) ---");
    for (rank, entry) in board.entries().iter().enumerate() {
        println!(
            "{}. {:<12} reward {:>8.2}  revenue {:>9.2}  acceptance {:>5.1}%  surge {:.2}",
            rank + 1,
            entry.agent.to_string(),
            entry.mean_reward,
            entry.mean_revenue,
            entry.mean_acceptance_rate * 100.0,
            entry.mean_surge,
        );
    }

    println!("\n--- Timings ---");
    println!("1. Environment build time:   {build_time:?}");
    println!("2. Training time:            {train_time:?}");
    if let Some(r) = report.recent_mean_reward(10) {
        println!("3. Final mean reward:        {r:.2}");
    }

    drop(_guard);
    Ok(())
}

/// Rides from the CSV given as first argument, synthetic rides otherwise.
fn environment() -> Result<Environment<DistanceFarePredictor>> {
    let cfg = EnvConfig::default().with_seed(42);
    let predictor = DistanceFarePredictor::default();
    match env::args().nth(1) {
        Some(path) => load(&path, predictor, cfg)
            .with_context(|| format!("Failed to load rides from {path}")),
        None => {
            let rides = SyntheticRides::default().generate(20_000)?;
            make(rides, predictor, cfg).context("Failed to build pricing environment")
        }
    }
}

// ================================================================================================
// Tracing Configuration
// ================================================================================================

fn init_tracing() -> Result<Option<WorkerGuard>> {
    let app_name = "fareflow";

    // Detect if running in container
    let in_container =
        env::var("CONTAINER").is_ok() || std::path::Path::new("/.dockerenv").exists();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if in_container {
        // Container mode: log to stdout
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
            .init();

        info!("Logging to stdout (container mode)");
        Ok(None)
    } else {
        // Local mode: log to file
        let log_dir = dirs::state_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".local/state")))
            .context("Failed to find a state directory")?
            .join(app_name)
            .join("logs");
        fs::create_dir_all(&log_dir)?;

        let timestamp = time::OffsetDateTime::now_utc()
            .format(&format_description!(
                "[year][month][day]-[hour][minute][second]"
            ))
            .context("Failed to format timestamp")?;
        let file_name = format!("{app_name}-train-{timestamp}.log");

        let file_appender = tracing_appender::rolling::never(&log_dir, &file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(non_blocking)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
            .init();

        info!(log_file = %log_dir.join(file_name).display(), "Logging to file (local mode)");
        Ok(Some(guard))
    }
}
