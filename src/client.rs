use crate::ui;
use chrono::{
    DateTime,
    Utc,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use futures::StreamExt;
use roll_under::{
    Multiplier,
    Phase,
    ResultSequencer,
    SequencerError,
    SequencerEvent,
    SequencerState,
    config::GameConfig,
    presentation::{
        ChannelPresentation,
        DieFace,
        PresentationEvent,
        SoundCue,
        headline,
    },
    sequencer::Resolution,
    settlement::LocalSettlement,
};
use std::{
    collections::VecDeque,
    path::Path,
    time::Duration,
};
use tokio::{
    sync::mpsc,
    time,
};
use tracing::{
    error,
    info,
    warn,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const HISTORY_DEPTH: usize = 10;
const MAX_ERRORS: usize = 50;
const COARSE_STEP: i64 = 10;
const FRAME_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub resolution: Resolution,
}

#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub phase: Phase,
    pub state: SequencerState,
    pub headline: Option<&'static str>,
    pub face: Option<DieFace>,
    pub spin_frame: usize,
    pub side_count: u32,
    pub threshold: u32,
    pub max_threshold: u32,
    pub roll_under: u32,
    pub wager: u64,
    pub multiplier: Multiplier,
    pub win_chance: f64,
    pub potential_payout: u64,
    pub exceeds_pool: bool,
    pub table_fingerprint: String,
    pub history: Vec<HistoryEntry>,
    pub net: i128,
    pub last_cue: Option<SoundCue>,
    pub status: String,
    pub errors: Vec<String>,
}

pub struct AppController {
    sequencer: ResultSequencer<LocalSettlement, ChannelPresentation>,
    history: VecDeque<HistoryEntry>,
    net: i128,
    face: Option<DieFace>,
    last_cue: Option<SoundCue>,
    spin_frame: usize,
    status: String,
    errors: Vec<String>,
}

impl AppController {
    pub fn new(
        config: &GameConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<PresentationEvent>)> {
        let slip = config.bet_slip().wrap_err("building initial bet slip")?;
        let (presentation, presentation_rx) = ChannelPresentation::new();
        let sequencer =
            ResultSequencer::new(config.local_settlement(), presentation, slip)
                .with_timing(config.timing());
        let controller = Self {
            sequencer,
            history: VecDeque::with_capacity(HISTORY_DEPTH),
            net: 0,
            face: None,
            last_cue: None,
            spin_frame: 0,
            status: String::from("Ready"),
            errors: Vec::new(),
        };
        Ok((controller, presentation_rx))
    }

    pub fn snapshot(&self) -> AppSnapshot {
        let slip = self.sequencer.slip();
        let state = *self.sequencer.state();
        AppSnapshot {
            phase: self.sequencer.phase(),
            state,
            headline: state
                .win_status
                .map(|status| headline(status, state.achieved_multiplier)),
            face: self.face,
            spin_frame: self.spin_frame,
            side_count: slip.side_count(),
            threshold: slip.threshold(),
            max_threshold: slip.max_threshold(),
            roll_under: slip.roll_under_label(),
            wager: slip.wager(),
            multiplier: slip.multiplier(),
            win_chance: slip.win_chance(),
            potential_payout: slip.potential_payout(),
            exceeds_pool: slip.exceeds_pool(),
            table_fingerprint: slip.table().fingerprint(),
            history: self.history.iter().cloned().collect(),
            net: self.net,
            last_cue: self.last_cue,
            status: self.status.clone(),
            errors: self.errors.iter().rev().take(5).cloned().collect(),
        }
    }

    pub fn nudge_threshold(&mut self, delta: i64) {
        if let Err(e) = self.sequencer.nudge_threshold(delta) {
            self.report(e);
        }
    }

    pub fn set_wager(&mut self, wager: u64) {
        match self.sequencer.set_wager(wager) {
            Ok(()) => self.status = format!("Wager set to {wager}"),
            Err(e) => self.report(e),
        }
    }

    pub fn play(&mut self) {
        if self.sequencer.slip().exceeds_pool() {
            self.status = String::from("Payout too high for the pool");
            return;
        }
        match self.sequencer.play() {
            Ok(generation) => {
                self.face = None;
                self.status = format!("Rolling {generation}...");
            }
            Err(e) => self.report(e),
        }
    }

    pub fn on_sequencer_event(&mut self, event: SequencerEvent) {
        match event {
            SequencerEvent::Submitted(generation) => {
                self.status = format!("Bet {generation} accepted, waiting for the die");
            }
            SequencerEvent::ResultReceived { generation, .. } => {
                self.status = format!("Result for {generation} is in");
            }
            SequencerEvent::Revealed(resolution) => {
                self.net += i128::from(resolution.payout) - i128::from(resolution.wager);
                self.status = format!(
                    "Rolled {} | paid {}",
                    resolution.displayed_result, resolution.payout
                );
                self.history.push_front(HistoryEntry {
                    at: Utc::now(),
                    resolution,
                });
                self.history.truncate(HISTORY_DEPTH);
            }
            SequencerEvent::Failed { generation, error } => {
                warn!(%generation, %error, "play aborted");
                self.status = String::from("Play aborted, bet slip unlocked");
            }
        }
    }

    /// Returns whether the cue should ring the terminal bell.
    pub fn on_presentation_event(&mut self, event: PresentationEvent) -> bool {
        match event {
            PresentationEvent::Sound(cue) => {
                self.last_cue = Some(cue);
                matches!(cue, SoundCue::Win | SoundCue::Lose)
            }
            PresentationEvent::Failure(message) => {
                self.push_errors(vec![message]);
                false
            }
            PresentationEvent::Face(face) => {
                self.face = Some(face);
                false
            }
        }
    }

    pub fn advance_spinner(&mut self) -> bool {
        if self.sequencer.state().is_animating {
            self.spin_frame = self.spin_frame.wrapping_add(1);
            return true;
        }
        false
    }

    fn report(&mut self, e: SequencerError) {
        if e.is_user_visible() {
            self.push_errors(vec![e.to_string()]);
        } else {
            self.status = e.to_string();
        }
    }

    fn push_errors(&mut self, mut items: Vec<String>) {
        if items.is_empty() {
            return;
        }
        for item in &items {
            error!("{}", item);
        }
        self.errors.append(&mut items);
        if self.errors.len() > MAX_ERRORS {
            let drain = self.errors.len() - MAX_ERRORS;
            self.errors.drain(0..drain);
        }
    }
}

/// Logs go to a daily-rolled file; the terminal belongs to the UI.
pub fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    let appender = tracing_appender::rolling::daily(log_dir, "roll-under.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("failed to install tracing subscriber: {e}"))?;
    Ok(guard)
}

pub async fn run_app(config: GameConfig) -> Result<()> {
    let (mut controller, mut presentation_rx) = AppController::new(&config)?;
    let mut ui_state = ui::UiState::default();

    info!(?config, "starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(&mut controller, &mut ui_state, &mut presentation_rx).await;
    ui::terminal_exit()?;
    res
}

async fn run_loop(
    controller: &mut AppController,
    ui_state: &mut ui::UiState,
    presentation_rx: &mut mpsc::UnboundedReceiver<PresentationEvent>,
) -> Result<()> {
    let mut frames = time::interval(FRAME_INTERVAL);
    let mut input_events = ui::input_event_stream();
    ui::draw(ui_state, &controller.snapshot())?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => { break; }
            _ = frames.tick() => {
                if controller.advance_spinner() {
                    ui::draw(ui_state, &controller.snapshot())?;
                }
            }
            ev = controller.sequencer.next_event() => {
                controller.on_sequencer_event(ev);
                ui::draw(ui_state, &controller.snapshot())?;
            }
            Some(ev) = presentation_rx.recv() => {
                if controller.on_presentation_event(ev) {
                    ui::ring_bell()?;
                }
            }
            input = input_events.next() => {
                let Some(input) = input else { break; };
                let Some(ev) = ui::interpret_event(ui_state, &input?) else { continue; };
                match ev {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::ThresholdUp => controller.nudge_threshold(1),
                    ui::UserEvent::ThresholdDown => controller.nudge_threshold(-1),
                    ui::UserEvent::ThresholdUpCoarse => controller.nudge_threshold(COARSE_STEP),
                    ui::UserEvent::ThresholdDownCoarse => controller.nudge_threshold(-COARSE_STEP),
                    ui::UserEvent::Play => controller.play(),
                    ui::UserEvent::SetWager(amount) => controller.set_wager(amount),
                    ui::UserEvent::OpenWagerModal | ui::UserEvent::Redraw => {}
                }
                ui::draw(ui_state, &controller.snapshot())?;
            }
        }
    }
    Ok(())
}
