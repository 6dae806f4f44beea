use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use delvenet_gateway::config::{load_config, Config, ConfigError, ConfigFormat};
use delvenet_gateway::service::GatewayService;

#[derive(Debug, Parser)]
#[command(
    name = "delvenet-gateway",
    version,
    about = "Reference gateway that drives confidential party aggregation rounds"
)]
struct Cli {
    /// Path to configuration file (TOML or YAML).
    #[arg(long, default_value = "configs/delvenet-gateway.toml")]
    config: PathBuf,
    /// Explicit configuration format override.
    #[arg(long, value_enum, default_value_t = ConfigFormat::Auto)]
    config_format: ConfigFormat,
    /// Run with the built-in sample configuration instead of a file.
    #[arg(long)]
    builtin_config: bool,
    /// Override the per-actor cooldown defined in the config file.
    #[arg(long)]
    cooldown_secs: Option<u64>,
    /// Number of contribution → reveal rounds to execute.
    #[arg(long, default_value_t = 1)]
    rounds: u16,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = if cli.builtin_config {
        Config::sample()
    } else {
        load_config(&cli.config, cli.config_format)?
    };
    if let Some(cooldown_secs) = cli.cooldown_secs {
        config.protocol.cooldown_secs = cooldown_secs;
    }
    config.validate().map_err(|err| match err {
        ConfigError::Validation(reason) => color_eyre::eyre::eyre!(reason),
        other => other.into(),
    })?;

    let mut service = GatewayService::new(&config)?;
    for round in 0..cli.rounds {
        let report = service.run_round()?;
        println!(
            "round {} batch={} request={} party=({}, {}, {}) seed={}",
            round + 1,
            report.batch_id,
            report.request_id,
            report.strength,
            report.agility,
            report.intellect,
            report.seed
        );
        if let Some(batch) = service.keeper().batch(report.batch_id) {
            println!(
                "  accumulators strength={} agility={} intellect={}",
                hex::encode(&batch.strength.digest()[..8]),
                hex::encode(&batch.agility.digest()[..8]),
                hex::encode(&batch.intellect.digest()[..8])
            );
        }
    }

    Ok(())
}
