use crate::{
    outcome::OutcomeTable,
    presentation::{
        DieFace,
        Presentation,
        PresentationEvent,
        SoundCue,
    },
    settlement::{
        SessionResult,
        SettlementEngine,
        SettlementError,
    },
    sequencer::Generation,
    slip::BetSlip,
};
use std::{
    collections::VecDeque,
    sync::{
        Arc,
        Mutex,
    },
};
use tokio::sync::mpsc;

/// Presentation that records every cue; clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingPresentation {
    events: Arc<Mutex<Vec<PresentationEvent>>>,
}

impl RecordingPresentation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PresentationEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn sounds(&self) -> Vec<SoundCue> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PresentationEvent::Sound(cue) => Some(cue),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PresentationEvent::Failure(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    pub fn faces(&self) -> Vec<DieFace> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PresentationEvent::Face(face) => Some(face),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl Presentation for RecordingPresentation {
    fn play_sound(&mut self, cue: SoundCue) {
        self.events.lock().unwrap().push(PresentationEvent::Sound(cue));
    }

    fn notify_failure(&mut self, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(PresentationEvent::Failure(message.to_string()));
    }

    fn show_face(&mut self, face: DieFace) {
        self.events.lock().unwrap().push(PresentationEvent::Face(face));
    }
}

type Submissions = Arc<Mutex<Vec<(Generation, u64, OutcomeTable)>>>;
type ScriptedResult = Result<(u32, u64), SettlementError>;

/// Settlement engine scripted from the test through [`FakeSettlementHandle`].
///
/// `submit` and `await_result` each wait for the next scripted response; if the
/// handle never sends one they stay pending, which is how a hung engine is
/// simulated. Scripted results settle accepted bets oldest first, including
/// bets whose play has already timed out.
pub struct FakeSettlement {
    submit_rx: mpsc::UnboundedReceiver<Result<(), SettlementError>>,
    result_rx: mpsc::UnboundedReceiver<ScriptedResult>,
    submissions: Submissions,
    unsettled: VecDeque<Generation>,
}

#[derive(Clone)]
pub struct FakeSettlementHandle {
    submit_tx: mpsc::UnboundedSender<Result<(), SettlementError>>,
    result_tx: mpsc::UnboundedSender<ScriptedResult>,
    submissions: Submissions,
}

impl FakeSettlement {
    pub fn new_with_handle() -> (Self, FakeSettlementHandle) {
        let (submit_tx, submit_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let submissions = Arc::new(Mutex::new(Vec::new()));
        let engine = FakeSettlement {
            submit_rx,
            result_rx,
            submissions: submissions.clone(),
            unsettled: VecDeque::new(),
        };
        let handle = FakeSettlementHandle {
            submit_tx,
            result_tx,
            submissions,
        };
        (engine, handle)
    }
}

impl FakeSettlementHandle {
    pub fn accept(&self) {
        let _ = self.submit_tx.send(Ok(()));
    }

    pub fn reject(&self, reason: &str) {
        let _ = self
            .submit_tx
            .send(Err(SettlementError::Rejected(reason.to_string())));
    }

    /// Settles the oldest accepted bet that has no result yet.
    pub fn resolve(&self, result_index: u32, payout: u64) {
        let _ = self.result_tx.send(Ok((result_index, payout)));
    }

    pub fn fail_result(&self, err: SettlementError) {
        let _ = self.result_tx.send(Err(err));
    }

    pub fn submissions(&self) -> Vec<(Generation, u64, OutcomeTable)> {
        self.submissions.lock().unwrap().clone()
    }
}

impl SettlementEngine for FakeSettlement {
    async fn submit(
        &mut self,
        generation: Generation,
        wager: u64,
        table: &OutcomeTable,
    ) -> Result<(), SettlementError> {
        self.submissions
            .lock()
            .unwrap()
            .push((generation, wager, table.clone()));
        match self.submit_rx.recv().await {
            Some(Ok(())) => {
                self.unsettled.push_back(generation);
                Ok(())
            }
            Some(Err(e)) => Err(e),
            None => Err(SettlementError::Transport("fake engine closed".into())),
        }
    }

    async fn await_result(&mut self) -> Result<SessionResult, SettlementError> {
        let scripted = self
            .result_rx
            .recv()
            .await
            .ok_or_else(|| SettlementError::Transport("fake engine closed".into()))?;
        let generation = self
            .unsettled
            .pop_front()
            .ok_or(SettlementError::NoPendingBet)?;
        let (result_index, payout) = scripted?;
        Ok(SessionResult {
            generation,
            result_index,
            payout,
        })
    }
}

/// 100-sided die, roll under 50, wager 1_000, no pool cap.
pub fn default_slip() -> BetSlip {
    BetSlip::new(100, 95, 50, 1_000, None).unwrap()
}
