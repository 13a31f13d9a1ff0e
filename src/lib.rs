pub mod config;
pub mod error;
pub mod outcome;
pub mod presentation;
pub mod sequencer;
pub mod settlement;
pub mod slip;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use error::{
    Result,
    SequencerError,
};
pub use outcome::{
    Multiplier,
    OutcomeTable,
    SCALE,
    build_table,
    win_multiplier,
};
pub use sequencer::{
    Phase,
    ResultSequencer,
    SequencerEvent,
    SequencerState,
    WinStatus,
};
