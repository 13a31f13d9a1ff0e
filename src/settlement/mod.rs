use crate::{
    outcome::OutcomeTable,
    sequencer::Generation,
};
use serde::{
    Deserialize,
    Serialize,
};

pub mod local;

pub use local::LocalSettlement;

/// Outcome reported by the settlement engine for one submitted bet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    /// The play this result settles, echoed from `submit`.
    pub generation: Generation,
    /// Zero-based outcome index in `0..side_count`.
    pub result_index: u32,
    pub payout: u64,
}

impl SessionResult {
    pub fn did_win(&self) -> bool {
        self.payout > 0
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SettlementError {
    #[error("bet rejected: {0}")]
    Rejected(String),
    #[error("settlement transport failed: {0}")]
    Transport(String),
    #[error("no bet is pending settlement")]
    NoPendingBet,
}

/// The external engine that fairly resolves a wager against a submitted table.
///
/// `submit` hands over the bet tagged with its `generation`; `await_result`
/// resolves with the next settled bet, which may belong to an earlier
/// submission the caller has already given up on. The table is sent verbatim
/// and must not be altered by callers after submission.
pub trait SettlementEngine {
    fn submit(
        &mut self,
        generation: Generation,
        wager: u64,
        table: &OutcomeTable,
    ) -> impl Future<Output = Result<(), SettlementError>>;

    fn await_result(&mut self)
    -> impl Future<Output = Result<SessionResult, SettlementError>>;
}
