use crate::{
    error::{
        Result,
        SequencerError,
    },
    presentation::{
        Presentation,
        SoundCue,
    },
    sequencer::{
        Generation,
        Phase,
        Resolution,
        Sequencer,
        SequencerState,
    },
    settlement::{
        SessionResult,
        SettlementEngine,
    },
    slip::BetSlip,
};
use futures::{
    FutureExt,
    future::LocalBoxFuture,
};
use std::{
    pin::Pin,
    time::Duration,
};
use tokio::time::{
    Instant,
    Sleep,
    sleep,
    timeout_at,
};
use tracing::debug;

pub const DEFAULT_REVEAL_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_SETTLEMENT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SequencerTiming {
    /// Minimum dwell between receiving a result and showing it.
    pub reveal_delay: Duration,
    /// Deadline for submission plus result, measured from `play()`.
    pub settlement_timeout: Duration,
}

impl Default for SequencerTiming {
    fn default() -> Self {
        Self {
            reveal_delay: DEFAULT_REVEAL_DELAY,
            settlement_timeout: DEFAULT_SETTLEMENT_TIMEOUT,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SequencerEvent {
    Submitted(Generation),
    ResultReceived {
        generation: Generation,
        result: SessionResult,
    },
    Revealed(Resolution),
    Failed {
        generation: Generation,
        error: SequencerError,
    },
}

// The engine travels through the stage future and comes back with its output,
// so it is never lost even when the deadline fires.
type StageFuture<E, T> = LocalBoxFuture<'static, (E, Result<T>)>;

enum Stage<E> {
    Idle,
    Submitting {
        generation: Generation,
        deadline: Instant,
        fut: StageFuture<E, ()>,
    },
    Awaiting {
        generation: Generation,
        deadline: Instant,
        fut: StageFuture<E, SessionResult>,
    },
    Revealing {
        generation: Generation,
        timer: Pin<Box<Sleep>>,
    },
}

/// Drives plays against a settlement engine: owns the bet slip, the state
/// machine and whichever suspension point the current play is parked on.
///
/// [`next_event`](Self::next_event) is cancel safe. In-flight futures live in
/// the sequencer, so dropping the call (another `select!` branch winning) loses
/// nothing.
pub struct ResultSequencer<E, P> {
    core: Sequencer<P>,
    slip: BetSlip,
    engine: Option<E>,
    stage: Stage<E>,
    timing: SequencerTiming,
}

impl<E, P> ResultSequencer<E, P>
where
    E: SettlementEngine + 'static,
    P: Presentation,
{
    pub fn new(engine: E, presentation: P, slip: BetSlip) -> Self {
        Self {
            core: Sequencer::new(presentation),
            slip,
            engine: Some(engine),
            stage: Stage::Idle,
            timing: SequencerTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: SequencerTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn timing(&self) -> SequencerTiming {
        self.timing
    }

    pub fn phase(&self) -> Phase {
        self.core.phase()
    }

    pub fn state(&self) -> &SequencerState {
        self.core.state()
    }

    pub fn slip(&self) -> &BetSlip {
        &self.slip
    }

    pub fn presentation(&self) -> &P {
        self.core.presentation()
    }

    /// `None` while a play holds the engine.
    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        !matches!(self.stage, Stage::Idle)
    }

    pub fn set_threshold(&mut self, raw: i64) -> Result<bool> {
        self.ensure_idle()?;
        let changed = self.slip.set_threshold(raw)?;
        if changed {
            self.core.presentation_mut().play_sound(SoundCue::Tick);
        }
        Ok(changed)
    }

    pub fn nudge_threshold(&mut self, delta: i64) -> Result<bool> {
        self.set_threshold(i64::from(self.slip.threshold()).saturating_add(delta))
    }

    pub fn set_wager(&mut self, wager: u64) -> Result<()> {
        self.ensure_idle()?;
        self.slip.set_wager(wager);
        Ok(())
    }

    pub fn set_pool_max_payout(&mut self, cap: Option<u64>) {
        self.slip.set_pool_max_payout(cap);
    }

    /// Starts a play with the slip's current wager and table.
    pub fn play(&mut self) -> Result<Generation> {
        self.ensure_idle()?;
        let Some(mut engine) = self.engine.take() else {
            return Err(SequencerError::Busy(self.core.phase()));
        };
        let ticket = match self.core.begin(self.slip.wager(), self.slip.table()) {
            Ok(ticket) => ticket,
            Err(err) => {
                self.engine = Some(engine);
                return Err(err);
            }
        };

        let timeout = self.timing.settlement_timeout;
        let deadline = Instant::now() + timeout;
        let generation = ticket.generation;
        let wager = ticket.wager;
        let table = ticket.table;
        let fut = async move {
            let outcome =
                timeout_at(deadline, engine.submit(generation, wager, &table)).await;
            let res = match outcome {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(SequencerError::SubmissionFailure(e)),
                Err(_) => Err(SequencerError::SettlementTimeout(timeout)),
            };
            (engine, res)
        }
        .boxed_local();

        self.stage = Stage::Submitting {
            generation,
            deadline,
            fut,
        };
        Ok(generation)
    }

    /// Waits for the play in flight to make progress. Pending forever while
    /// idle.
    pub async fn next_event(&mut self) -> SequencerEvent {
        loop {
            match &mut self.stage {
                Stage::Idle => return std::future::pending().await,
                Stage::Submitting {
                    generation,
                    deadline,
                    fut,
                } => {
                    let generation = *generation;
                    let deadline = *deadline;
                    let (engine, res) = fut.await;
                    match res {
                        Ok(()) => {
                            if self.core.submission_accepted(generation).is_err() {
                                self.engine = Some(engine);
                                self.stage = Stage::Idle;
                                continue;
                            }
                            self.stage = Stage::Awaiting {
                                generation,
                                deadline,
                                fut: self.await_result(engine, deadline),
                            };
                            return SequencerEvent::Submitted(generation);
                        }
                        Err(error) => {
                            self.engine = Some(engine);
                            return self.abort(generation, error);
                        }
                    }
                }
                Stage::Awaiting {
                    generation,
                    deadline,
                    fut,
                } => {
                    let generation = *generation;
                    let deadline = *deadline;
                    let (engine, res) = fut.await;
                    let result = match res {
                        Ok(result) => result,
                        Err(error) => {
                            self.engine = Some(engine);
                            return self.abort(generation, error);
                        }
                    };
                    match self.core.receive_result(result) {
                        Ok(_) => {
                            self.engine = Some(engine);
                            self.stage = Stage::Revealing {
                                generation,
                                timer: Box::pin(sleep(self.timing.reveal_delay)),
                            };
                            return SequencerEvent::ResultReceived { generation, result };
                        }
                        // a play we already gave up on settled late; keep waiting
                        Err(SequencerError::StaleResult(stale)) => {
                            debug!(%stale, %generation, "skipped late result");
                            self.stage = Stage::Awaiting {
                                generation,
                                deadline,
                                fut: self.await_result(engine, deadline),
                            };
                        }
                        Err(error) => {
                            self.engine = Some(engine);
                            self.stage = Stage::Idle;
                            return SequencerEvent::Failed { generation, error };
                        }
                    }
                }
                Stage::Revealing { generation, timer } => {
                    let generation = *generation;
                    timer.as_mut().await;
                    self.stage = Stage::Idle;
                    if let Ok(resolution) = self.core.reveal(generation) {
                        return SequencerEvent::Revealed(resolution);
                    }
                }
            }
        }
    }

    /// Plays once and drives the sequence until it resolves or fails.
    pub async fn play_to_completion(&mut self) -> Result<Resolution> {
        self.play()?;
        loop {
            match self.next_event().await {
                SequencerEvent::Revealed(resolution) => return Ok(resolution),
                SequencerEvent::Failed { error, .. } => return Err(error),
                SequencerEvent::Submitted(_) | SequencerEvent::ResultReceived { .. } => {}
            }
        }
    }

    fn await_result(&self, mut engine: E, deadline: Instant) -> StageFuture<E, SessionResult> {
        let timeout = self.timing.settlement_timeout;
        async move {
            let outcome = timeout_at(deadline, engine.await_result()).await;
            let res = match outcome {
                Ok(Ok(result)) => Ok(result),
                Ok(Err(e)) => Err(SequencerError::SubmissionFailure(e)),
                Err(_) => Err(SequencerError::SettlementTimeout(timeout)),
            };
            (engine, res)
        }
        .boxed_local()
    }

    fn abort(&mut self, generation: Generation, error: SequencerError) -> SequencerEvent {
        self.stage = Stage::Idle;
        if let Err(stale) = self.core.fail(generation, &error) {
            debug!(error = %stale, "failure for superseded play ignored");
        }
        SequencerEvent::Failed { generation, error }
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.is_busy() {
            return Err(SequencerError::Busy(self.core.phase()));
        }
        Ok(())
    }
}
