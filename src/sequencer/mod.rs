use crate::{
    error::{
        Result,
        SequencerError,
    },
    outcome::{
        Multiplier,
        OutcomeTable,
    },
    presentation::{
        DieFace,
        Presentation,
        SoundCue,
    },
    settlement::SessionResult,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;
use tracing::{
    debug,
    error,
    info,
    warn,
};

pub mod driver;

#[cfg(test)]
mod tests;

pub use driver::{
    ResultSequencer,
    SequencerEvent,
    SequencerTiming,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WinStatus {
    Win,
    Loss,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    #[default]
    Idle,
    Submitting,
    AwaitingResult,
    RevealDelay,
    Resolved,
}

impl Phase {
    /// `Resolved` is a resting state: it takes a new play exactly like `Idle`.
    pub fn accepts_play(self) -> bool {
        matches!(self, Phase::Idle | Phase::Resolved)
    }
}

/// What the screen shows. Owned by the sequencer; hosts read it, never write it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SequencerState {
    pub is_animating: bool,
    /// One-based result, set only once the reveal delay has elapsed.
    pub displayed_result: Option<u32>,
    pub win_status: Option<WinStatus>,
    pub achieved_multiplier: Option<Multiplier>,
}

/// Identifies one play; results carrying any other generation are stale.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything the settlement collaborator needs for one play.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayTicket {
    pub generation: Generation,
    pub wager: u64,
    pub table: OutcomeTable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingReveal {
    pub generation: Generation,
    pub result: SessionResult,
    pub win_status: WinStatus,
    pub achieved_multiplier: Option<Multiplier>,
}

/// Committed outcome of one play.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub generation: Generation,
    pub wager: u64,
    pub result_index: u32,
    pub displayed_result: u32,
    pub payout: u64,
    pub win_status: WinStatus,
    pub achieved_multiplier: Option<Multiplier>,
}

#[derive(Clone, Copy, Debug)]
struct InFlight {
    generation: Generation,
    wager: u64,
    side_count: u32,
    win_multiplier: Multiplier,
}

/// State machine behind a single dice screen:
/// `Idle -> Submitting -> AwaitingResult -> RevealDelay -> Resolved`, falling
/// back to `Idle` on any failure.
///
/// Transitions are synchronous; suspension (awaiting the engine, the reveal
/// timer) is left to [`ResultSequencer`]. Every transition after `begin` names
/// the generation it belongs to, and anything addressed to a generation that is
/// no longer in flight is rejected with [`SequencerError::StaleResult`] without
/// touching state.
pub struct Sequencer<P> {
    presentation: P,
    phase: Phase,
    state: SequencerState,
    last_generation: Generation,
    in_flight: Option<InFlight>,
    pending_reveal: Option<PendingReveal>,
}

impl<P: Presentation> Sequencer<P> {
    pub fn new(presentation: P) -> Self {
        Self {
            presentation,
            phase: Phase::Idle,
            state: SequencerState::default(),
            last_generation: Generation::default(),
            in_flight: None,
            pending_reveal: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    pub fn in_flight(&self) -> Option<Generation> {
        self.in_flight.map(|f| f.generation)
    }

    pub fn pending_reveal(&self) -> Option<&PendingReveal> {
        self.pending_reveal.as_ref()
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    pub fn presentation_mut(&mut self) -> &mut P {
        &mut self.presentation
    }

    /// Starts a play: clears the display, starts the animation and fires the
    /// `play` cue. The returned ticket carries the table to submit verbatim.
    ///
    /// Tables only come out of `build_table`, so the threshold is already in
    /// `1..side_count` here.
    pub fn begin(&mut self, wager: u64, table: &OutcomeTable) -> Result<PlayTicket> {
        if !self.phase.accepts_play() {
            warn!(phase = ?self.phase, "play rejected while busy");
            return Err(SequencerError::Busy(self.phase));
        }
        let threshold = table.threshold();
        let generation = self.last_generation.next();
        self.last_generation = generation;
        self.state = SequencerState {
            is_animating: true,
            ..SequencerState::default()
        };
        self.pending_reveal = None;
        self.in_flight = Some(InFlight {
            generation,
            wager,
            side_count: table.side_count(),
            win_multiplier: table.win_multiplier(),
        });
        self.phase = Phase::Submitting;
        self.presentation.play_sound(SoundCue::Play);
        info!(
            %generation,
            wager,
            threshold,
            multiplier = %table.win_multiplier(),
            table = %table.fingerprint(),
            "play started"
        );
        Ok(PlayTicket {
            generation,
            wager,
            table: table.clone(),
        })
    }

    pub fn submission_accepted(&mut self, generation: Generation) -> Result<()> {
        self.expect_current(generation, &[Phase::Submitting])?;
        self.phase = Phase::AwaitingResult;
        debug!(%generation, "bet accepted, awaiting result");
        Ok(())
    }

    /// Records the engine's result and enters the reveal delay. The result's
    /// own generation decides whether it belongs to the play in flight. Win or
    /// loss is taken from `payout > 0` and nothing else.
    pub fn receive_result(&mut self, result: SessionResult) -> Result<PendingReveal> {
        let generation = result.generation;
        let in_flight =
            self.expect_current(generation, &[Phase::Submitting, Phase::AwaitingResult])?;
        if result.result_index >= in_flight.side_count {
            let err = SequencerError::MalformedResult {
                result_index: result.result_index,
                side_count: in_flight.side_count,
            };
            self.reset(&err);
            return Err(err);
        }
        let (win_status, achieved_multiplier) = if result.did_win() {
            (WinStatus::Win, Some(in_flight.win_multiplier))
        } else {
            (WinStatus::Loss, None)
        };
        let pending = PendingReveal {
            generation,
            result,
            win_status,
            achieved_multiplier,
        };
        self.pending_reveal = Some(pending);
        self.phase = Phase::RevealDelay;
        debug!(
            %generation,
            result_index = result.result_index,
            payout = result.payout,
            ?win_status,
            "result received, holding for reveal"
        );
        Ok(pending)
    }

    /// Commits the pending result to the display and fires exactly one of the
    /// `win` / `lose` cues.
    pub fn reveal(&mut self, generation: Generation) -> Result<Resolution> {
        let in_flight = self.expect_current(generation, &[Phase::RevealDelay])?;
        let pending = self
            .pending_reveal
            .take()
            .filter(|p| p.generation == generation)
            .ok_or(SequencerError::StaleResult(generation))?;

        let displayed_result = pending.result.result_index + 1;
        self.state = SequencerState {
            is_animating: false,
            displayed_result: Some(displayed_result),
            win_status: Some(pending.win_status),
            achieved_multiplier: pending.achieved_multiplier,
        };
        self.phase = Phase::Resolved;
        self.in_flight = None;

        self.presentation.play_sound(match pending.win_status {
            WinStatus::Win => SoundCue::Win,
            WinStatus::Loss => SoundCue::Lose,
        });
        if let Some(face) = DieFace::from_displayed(displayed_result) {
            self.presentation.show_face(face);
        }
        info!(
            %generation,
            displayed_result,
            payout = pending.result.payout,
            win_status = ?pending.win_status,
            "play resolved"
        );
        Ok(Resolution {
            generation,
            wager: in_flight.wager,
            result_index: pending.result.result_index,
            displayed_result,
            payout: pending.result.payout,
            win_status: pending.win_status,
            achieved_multiplier: pending.achieved_multiplier,
        })
    }

    /// Aborts the play in flight. Stale generations are ignored.
    pub fn fail(&mut self, generation: Generation, err: &SequencerError) -> Result<()> {
        self.expect_current(generation, &[Phase::Submitting, Phase::AwaitingResult])?;
        self.reset(err);
        Ok(())
    }

    fn expect_current(
        &self,
        generation: Generation,
        phases: &[Phase],
    ) -> Result<InFlight> {
        match self.in_flight {
            Some(in_flight)
                if in_flight.generation == generation && phases.contains(&self.phase) =>
            {
                Ok(in_flight)
            }
            _ => {
                warn!(
                    %generation,
                    current = ?self.in_flight(),
                    phase = ?self.phase,
                    "discarding stale settlement event"
                );
                Err(SequencerError::StaleResult(generation))
            }
        }
    }

    fn reset(&mut self, err: &SequencerError) {
        error!(error = %err, phase = ?self.phase, "play failed");
        self.state = SequencerState::default();
        self.phase = Phase::Idle;
        self.in_flight = None;
        self.pending_reveal = None;
        self.presentation.notify_failure(&err.to_string());
    }
}
