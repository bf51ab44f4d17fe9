use anyhow::{bail, Context, Result};
use tracing::info;

use compat_engine::{telemetry, CompatibilityEngine, Config};

const USAGE: &str = "usage: compat-score <resume-file> <job-file> [method]\n       compat-score --methods";

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    telemetry::init_tracing(&config.rust_log);

    info!("Starting compat-score v{}", env!("CARGO_PKG_VERSION"));
    let engine = CompatibilityEngine::from_config(config)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [flag] if flag == "--methods" => {
            let catalog = engine.catalog().await;
            println!("{}", serde_json::to_string_pretty(&catalog)?);
        }
        [resume, job, rest @ ..] if rest.len() <= 1 => {
            let resume = read(resume)?;
            let job = read(job)?;
            let result = engine.score(&resume, &job, rest.first().map(String::as_str)).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => bail!(USAGE),
    }

    Ok(())
}

fn read(path: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))
}
