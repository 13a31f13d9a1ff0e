use crate::{
    outcome::{
        DEFAULT_SIDE_COUNT,
        TableError,
    },
    sequencer::{
        SequencerTiming,
        driver::{
            DEFAULT_REVEAL_DELAY,
            DEFAULT_SETTLEMENT_TIMEOUT,
        },
    },
    settlement::LocalSettlement,
    slip::BetSlip,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fs,
    path::Path,
    time::Duration,
};

/// Slider stops this many faces short of the die size.
const SLIDER_HEADROOM: u32 = 5;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    pub side_count: u32,
    /// Upper slider bound; defaults to `side_count - 5`.
    pub max_threshold: Option<u32>,
    /// Defaults to half the die.
    pub initial_threshold: Option<u32>,
    pub initial_wager: u64,
    pub reveal_delay_ms: u64,
    pub settlement_timeout_ms: u64,
    pub pool_max_payout: Option<u64>,
    pub engine_latency_ms: u64,
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            side_count: DEFAULT_SIDE_COUNT,
            max_threshold: None,
            initial_threshold: None,
            initial_wager: 1_000_000,
            reveal_delay_ms: DEFAULT_REVEAL_DELAY.as_millis() as u64,
            settlement_timeout_ms: DEFAULT_SETTLEMENT_TIMEOUT.as_millis() as u64,
            pool_max_payout: None,
            engine_latency_ms: 750,
            seed: None,
        }
    }
}

impl GameConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.side_count < 2 {
            return Err(ConfigError::Invalid(format!(
                "side_count must be at least 2, got {}",
                self.side_count
            )));
        }
        let max = self.max_threshold();
        if max == 0 || max >= self.side_count {
            return Err(ConfigError::Invalid(format!(
                "max_threshold {max} outside 1..{}",
                self.side_count
            )));
        }
        if self.reveal_delay_ms == 0 {
            return Err(ConfigError::Invalid(
                "reveal_delay_ms must be positive".into(),
            ));
        }
        if self.settlement_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "settlement_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn max_threshold(&self) -> u32 {
        self.max_threshold.unwrap_or_else(|| {
            self.side_count
                .saturating_sub(SLIDER_HEADROOM)
                .max(1)
                .min(self.side_count.saturating_sub(1))
        })
    }

    pub fn initial_threshold(&self) -> u32 {
        self.initial_threshold.unwrap_or(self.side_count / 2)
    }

    pub fn timing(&self) -> SequencerTiming {
        SequencerTiming {
            reveal_delay: Duration::from_millis(self.reveal_delay_ms),
            settlement_timeout: Duration::from_millis(self.settlement_timeout_ms),
        }
    }

    pub fn bet_slip(&self) -> Result<BetSlip, TableError> {
        BetSlip::new(
            self.side_count,
            self.max_threshold(),
            self.initial_threshold(),
            self.initial_wager,
            self.pool_max_payout,
        )
    }

    pub fn local_settlement(&self) -> LocalSettlement {
        let house = LocalSettlement::new(self.side_count)
            .with_pool_max_payout(self.pool_max_payout)
            .with_latency(Duration::from_millis(self.engine_latency_ms));
        match self.seed {
            Some(seed) => house.with_seed(seed),
            None => house,
        }
    }
}
