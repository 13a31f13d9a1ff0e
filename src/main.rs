use clap::Parser;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use roll_under::config::GameConfig;
use std::path::PathBuf;

mod client;
mod ui;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Roll-under dice in the terminal",
    long_about = None
)]
struct Args {
    /// JSON game config; flags below override it.
    #[arg(short, long)]
    config: Option<String>,

    #[arg(short, long)]
    wager: Option<u64>,

    #[arg(short, long)]
    threshold: Option<u32>,

    #[arg(long)]
    sides: Option<u32>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long = "latency-ms")]
    latency_ms: Option<u64>,

    #[arg(long = "pool-max-payout")]
    pool_max_payout: Option<u64>,

    #[arg(long = "reveal-delay-ms")]
    reveal_delay_ms: Option<u64>,

    #[arg(long = "timeout-ms")]
    timeout_ms: Option<u64>,

    #[arg(long = "log-dir", default_value = "~/.roll-under/logs")]
    log_dir: String,
}

impl Args {
    fn game_config(&self) -> Result<GameConfig> {
        let mut config = match &self.config {
            Some(raw) => {
                let path = expand(raw);
                GameConfig::load(&path)
                    .wrap_err_with(|| format!("loading {}", path.display()))?
            }
            None => GameConfig::default(),
        };
        if let Some(sides) = self.sides {
            config.side_count = sides;
        }
        if let Some(wager) = self.wager {
            config.initial_wager = wager;
        }
        if let Some(threshold) = self.threshold {
            config.initial_threshold = Some(threshold);
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(latency) = self.latency_ms {
            config.engine_latency_ms = latency;
        }
        if let Some(cap) = self.pool_max_payout {
            config.pool_max_payout = Some(cap);
        }
        if let Some(delay) = self.reveal_delay_ms {
            config.reveal_delay_ms = delay;
        }
        if let Some(timeout) = self.timeout_ms {
            config.settlement_timeout_ms = timeout;
        }
        config.validate()?;
        Ok(config)
    }
}

fn expand(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let config = args.game_config()?;
    let log_dir = expand(&args.log_dir);
    std::fs::create_dir_all(&log_dir)
        .wrap_err_with(|| format!("creating log dir {}", log_dir.display()))?;
    let _guard = client::init_tracing(&log_dir)?;
    tracing::info!("starting roll-under client");
    client::run_app(config).await
}
