use crate::{
    outcome::{
        Multiplier,
        OutcomeTable,
        SCALE,
    },
    sequencer::Generation,
    settlement::{
        SessionResult,
        SettlementEngine,
        SettlementError,
    },
};
use rand::{
    Rng,
    SeedableRng,
    rngs::StdRng,
};
use std::time::Duration;
use tracing::{
    debug,
    info,
};

#[derive(Clone, Debug)]
struct PendingBet {
    generation: Generation,
    wager: u64,
    entries: Vec<u64>,
}

/// In-process house used by the terminal client in place of a real
/// settlement service. Checks each submission the way the remote pool does
/// and draws the outcome uniformly.
pub struct LocalSettlement {
    side_count: u32,
    pool_max_payout: Option<u64>,
    latency: Duration,
    rng: StdRng,
    pending: Option<PendingBet>,
}

impl LocalSettlement {
    pub fn new(side_count: u32) -> Self {
        Self {
            side_count,
            pool_max_payout: None,
            latency: Duration::ZERO,
            rng: StdRng::from_os_rng(),
            pending: None,
        }
    }

    pub fn with_pool_max_payout(mut self, cap: Option<u64>) -> Self {
        self.pool_max_payout = cap;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn validate(&self, wager: u64, table: &OutcomeTable) -> Result<(), SettlementError> {
        if wager == 0 {
            return Err(SettlementError::Rejected("wager must be positive".into()));
        }
        if table.len() != self.side_count as usize {
            return Err(SettlementError::Rejected(format!(
                "table has {} entries, expected {}",
                table.len(),
                self.side_count
            )));
        }
        let fair_total = u64::from(self.side_count) * SCALE;
        if table.total() > fair_total {
            return Err(SettlementError::Rejected(format!(
                "table expected value {:.4} exceeds 1.0",
                table.expected_value()
            )));
        }
        if let Some(cap) = self.pool_max_payout {
            let max_entry = table.entries().iter().copied().max().unwrap_or(0);
            let max_win = Multiplier::from_scaled(max_entry).apply(wager);
            if max_win > cap {
                return Err(SettlementError::Rejected(format!(
                    "max payout {max_win} exceeds pool capacity {cap}"
                )));
            }
        }
        Ok(())
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl SettlementEngine for LocalSettlement {
    async fn submit(
        &mut self,
        generation: Generation,
        wager: u64,
        table: &OutcomeTable,
    ) -> Result<(), SettlementError> {
        if self.pending.is_some() {
            return Err(SettlementError::Rejected(
                "previous bet has not settled".into(),
            ));
        }
        self.validate(wager, table)?;
        self.simulate_latency().await;
        debug!(%generation, wager, table = %table.fingerprint(), "local house accepted bet");
        self.pending = Some(PendingBet {
            generation,
            wager,
            entries: table.entries().to_vec(),
        });
        Ok(())
    }

    async fn await_result(&mut self) -> Result<SessionResult, SettlementError> {
        let bet = self.pending.take().ok_or(SettlementError::NoPendingBet)?;
        self.simulate_latency().await;
        let result_index = self.rng.random_range(0..self.side_count);
        let scaled = bet.entries.get(result_index as usize).copied().unwrap_or(0);
        let payout = Multiplier::from_scaled(scaled).apply(bet.wager);
        info!(
            generation = %bet.generation,
            result_index,
            payout,
            wager = bet.wager,
            "local house settled bet"
        );
        Ok(SessionResult {
            generation: bet.generation,
            result_index,
            payout,
        })
    }
}
