use std::path::Path;

use anyhow::{Context, Result};
use fareflow::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let levels = SurgeLevels::default();
    let mut engine = QuoteEngine::new(DistanceFarePredictor::default(), agent()?, levels);

    let requests = [
        QuoteRequest::new(2.4, 8, 1, "Back Bay", ServiceCategory::UberX).with_market(85.0, 35.0),
        QuoteRequest::new(5.1, 23, 5, "North End", ServiceCategory::LyftXl),
        QuoteRequest::new(1.2, 13, 2, "Financial District", ServiceCategory::Black)
            .with_market(60.0, 55.0),
    ];

    for req in &requests {
        let both = engine.quote_both(req)?;
        println!(
            "{} -> {} ({:.1} mi, {}:00)",
            req.source, req.service, req.distance, req.hour
        );
        println!(
            "{}",
            serde_json::to_string_pretty(&both).context("Failed to render quote")?
        );
    }

    // A request body as it would arrive over the wire, market fields omitted.
    let body = r#"{"distance": 3.0, "hour": 18, "day_of_week": 4, "source": "Fenway", "service": "UberXL"}"#;
    let req: QuoteRequest = serde_json::from_str(body).context("Failed to parse request")?;
    let res = engine.with_source(SurgeSource::RuleBased).quote(&req)?;
    println!("rule-based: {}", serde_json::to_string_pretty(&res)?);

    Ok(())
}

/// Policy trained by the `train_agent` demo if present, the ratio rule otherwise.
fn agent() -> Result<Box<dyn Agent>> {
    let dir = Path::new("demos/reports/train_agent");
    if dir.join(SerdeFormat::Json.file_name("surge_policy")).exists() {
        let policy =
            ActorCriticPolicy::load(&StorageLocation::Local(dir), "surge_policy", SerdeFormat::Json)?;
        return Ok(Box::new(policy));
    }
    println!("No trained policy found, quoting with the rule-based agent.");
    Ok(Box::new(RuleBasedAgent::default()))
}
