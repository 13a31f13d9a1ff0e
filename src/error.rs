use crate::{
    outcome::TableError,
    sequencer::{
        Generation,
        Phase,
    },
    settlement::SettlementError,
};
use std::time::Duration;

pub type Result<T, E = SequencerError> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SequencerError {
    #[error("invalid threshold: {0}")]
    InvalidThreshold(#[from] TableError),
    #[error("bet submission failed: {0}")]
    SubmissionFailure(#[from] SettlementError),
    #[error("no settlement result within {0:?}")]
    SettlementTimeout(Duration),
    #[error("settlement reported outcome {result_index} outside 0..{side_count}")]
    MalformedResult { result_index: u32, side_count: u32 },
    #[error("discarded result for superseded play {0}")]
    StaleResult(Generation),
    #[error("a play is already in progress ({0:?})")]
    Busy(Phase),
}

impl SequencerError {
    /// Whether this failure resets the display and is surfaced to the player.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::StaleResult(_) | Self::Busy(_))
    }
}
