use crate::{
    outcome::Multiplier,
    sequencer::WinStatus,
};
use std::fmt;
use tokio::sync::mpsc;
use tracing::trace;

/// Named audio cues fired by the sequencer and the bet slip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SoundCue {
    Play,
    Win,
    Lose,
    Tick,
}

impl SoundCue {
    pub fn name(self) -> &'static str {
        match self {
            SoundCue::Play => "play",
            SoundCue::Win => "win",
            SoundCue::Lose => "lose",
            SoundCue::Tick => "tick",
        }
    }
}

impl fmt::Display for SoundCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Six-sided face shown by the spinning die once a result is revealed.
///
/// Purely cosmetic: it folds the 1-based result onto six faces and carries no
/// information about whether the bet won.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DieFace(u8);

impl DieFace {
    pub fn from_displayed(displayed: u32) -> Option<Self> {
        if displayed == 0 {
            return None;
        }
        let face = (displayed - 1) % 6 + 1;
        u8::try_from(face).ok().map(DieFace)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

pub fn headline(status: WinStatus, multiplier: Option<Multiplier>) -> &'static str {
    match status {
        WinStatus::Win
            if multiplier.is_some_and(|m| m.scaled() >= 2 * Multiplier::ONE.scaled()) =>
        {
            "You Doubled It"
        }
        WinStatus::Win => "You Win!",
        WinStatus::Loss => "You Lose, Go Home",
    }
}

/// Fire-and-forget side effects driven by the sequencer. Implementations must
/// not block; nothing here is awaited.
pub trait Presentation {
    fn play_sound(&mut self, cue: SoundCue);

    fn notify_failure(&mut self, message: &str);

    fn show_face(&mut self, _face: DieFace) {}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PresentationEvent {
    Sound(SoundCue),
    Failure(String),
    Face(DieFace),
}

/// Forwards every cue to the host's event loop.
#[derive(Clone, Debug)]
pub struct ChannelPresentation {
    tx: mpsc::UnboundedSender<PresentationEvent>,
}

impl ChannelPresentation {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PresentationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: PresentationEvent) {
        if self.tx.send(event).is_err() {
            trace!("presentation receiver dropped");
        }
    }
}

impl Presentation for ChannelPresentation {
    fn play_sound(&mut self, cue: SoundCue) {
        self.send(PresentationEvent::Sound(cue));
    }

    fn notify_failure(&mut self, message: &str) {
        self.send(PresentationEvent::Failure(message.to_string()));
    }

    fn show_face(&mut self, face: DieFace) {
        self.send(PresentationEvent::Face(face));
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn from_displayed__folds_onto_six_faces() {
        assert_eq!(DieFace::from_displayed(0), None);
        assert_eq!(DieFace::from_displayed(1).map(DieFace::value), Some(1));
        assert_eq!(DieFace::from_displayed(6).map(DieFace::value), Some(6));
        assert_eq!(DieFace::from_displayed(7).map(DieFace::value), Some(1));
        assert_eq!(DieFace::from_displayed(31).map(DieFace::value), Some(1));
        assert_eq!(DieFace::from_displayed(100).map(DieFace::value), Some(4));
    }

    #[test]
    fn headline__depends_on_status_and_multiplier() {
        let double = Multiplier::from_scaled(20_000);
        let small = Multiplier::from_scaled(10_526);

        assert_eq!(headline(WinStatus::Win, Some(double)), "You Doubled It");
        assert_eq!(headline(WinStatus::Win, Some(small)), "You Win!");
        assert_eq!(headline(WinStatus::Loss, None), "You Lose, Go Home");
    }

    #[tokio::test]
    async fn channel_presentation__forwards_in_order() {
        // given
        let (mut presentation, mut rx) = ChannelPresentation::new();

        // when
        presentation.play_sound(SoundCue::Play);
        presentation.notify_failure("boom");
        presentation.show_face(DieFace(3));

        // then
        assert_eq!(rx.recv().await, Some(PresentationEvent::Sound(SoundCue::Play)));
        assert_eq!(
            rx.recv().await,
            Some(PresentationEvent::Failure("boom".to_string()))
        );
        assert_eq!(rx.recv().await, Some(PresentationEvent::Face(DieFace(3))));
    }
}
