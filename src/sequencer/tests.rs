#![allow(non_snake_case)]

use super::*;
use crate::{
    outcome::build_table,
    settlement::SettlementError,
    test_helpers::{
        FakeSettlement,
        RecordingPresentation,
        default_slip,
    },
};
use std::time::Duration;

fn arb_result(generation: Generation, result_index: u32, payout: u64) -> SessionResult {
    SessionResult {
        generation,
        result_index,
        payout,
    }
}

fn core() -> (Sequencer<RecordingPresentation>, RecordingPresentation) {
    let presentation = RecordingPresentation::new();
    (Sequencer::new(presentation.clone()), presentation)
}

#[test]
fn begin__from_idle__clears_display_and_starts_animation() {
    // given
    let (mut seq, presentation) = core();
    let table = build_table(50, 100).unwrap();

    // when
    let ticket = seq.begin(1_000, &table).unwrap();

    // then
    assert_eq!(seq.phase(), Phase::Submitting);
    assert_eq!(
        *seq.state(),
        SequencerState {
            is_animating: true,
            ..SequencerState::default()
        }
    );
    assert_eq!(ticket.table, table);
    assert_eq!(ticket.wager, 1_000);
    assert_eq!(seq.in_flight(), Some(ticket.generation));
    assert_eq!(presentation.sounds(), vec![SoundCue::Play]);
}

#[test]
fn receive_result__win__holds_display_until_reveal() {
    // given
    let (mut seq, presentation) = core();
    let table = build_table(50, 100).unwrap();
    let ticket = seq.begin(1_000, &table).unwrap();
    seq.submission_accepted(ticket.generation).unwrap();

    // when
    let pending = seq
        .receive_result(arb_result(ticket.generation, 12, 2_000))
        .unwrap();

    // then
    assert_eq!(seq.phase(), Phase::RevealDelay);
    assert_eq!(pending.win_status, WinStatus::Win);
    assert_eq!(pending.achieved_multiplier, Some(table.win_multiplier()));
    assert!(seq.state().is_animating);
    assert_eq!(seq.state().displayed_result, None);
    assert_eq!(seq.state().win_status, None);
    assert_eq!(presentation.sounds(), vec![SoundCue::Play]);
}

#[test]
fn reveal__win__commits_state_and_fires_win_once() {
    // given
    let (mut seq, presentation) = core();
    let table = build_table(50, 100).unwrap();
    let ticket = seq.begin(1_000, &table).unwrap();
    seq.submission_accepted(ticket.generation).unwrap();
    seq.receive_result(arb_result(ticket.generation, 12, 2_000))
        .unwrap();

    // when
    let resolution = seq.reveal(ticket.generation).unwrap();

    // then
    assert_eq!(seq.phase(), Phase::Resolved);
    assert_eq!(
        *seq.state(),
        SequencerState {
            is_animating: false,
            displayed_result: Some(13),
            win_status: Some(WinStatus::Win),
            achieved_multiplier: Some(table.win_multiplier()),
        }
    );
    assert_eq!(resolution.displayed_result, 13);
    assert_eq!(resolution.payout, 2_000);
    assert_eq!(seq.in_flight(), None);
    assert_eq!(presentation.sounds(), vec![SoundCue::Play, SoundCue::Win]);
    assert_eq!(
        presentation.faces(),
        vec![crate::presentation::DieFace::from_displayed(13).unwrap()]
    );
}

#[test]
fn receive_result__payout_decides_even_inside_threshold() {
    // given
    let (mut seq, _) = core();
    let table = build_table(50, 100).unwrap();
    let ticket = seq.begin(1_000, &table).unwrap();

    // when
    let pending = seq.receive_result(arb_result(ticket.generation, 3, 0)).unwrap();

    // then
    assert_eq!(pending.win_status, WinStatus::Loss);
    assert_eq!(pending.achieved_multiplier, None);
}

#[test]
fn receive_result__index_outside_die__fails_and_resets() {
    // given
    let (mut seq, presentation) = core();
    let table = build_table(50, 100).unwrap();
    let ticket = seq.begin(1_000, &table).unwrap();

    // when
    let res = seq.receive_result(arb_result(ticket.generation, 100, 0));

    // then
    assert_eq!(
        res,
        Err(SequencerError::MalformedResult {
            result_index: 100,
            side_count: 100
        })
    );
    assert_eq!(seq.phase(), Phase::Idle);
    assert_eq!(*seq.state(), SequencerState::default());
    assert_eq!(presentation.failures().len(), 1);
}

#[test]
fn begin__while_in_flight__rejected_without_side_effects() {
    // given
    let (mut seq, presentation) = core();
    let table = build_table(50, 100).unwrap();
    let ticket = seq.begin(1_000, &table).unwrap();
    seq.submission_accepted(ticket.generation).unwrap();

    // when
    let res = seq.begin(1_000, &table);

    // then
    assert_eq!(res, Err(SequencerError::Busy(Phase::AwaitingResult)));
    assert_eq!(seq.in_flight(), Some(ticket.generation));
    assert_eq!(presentation.sounds(), vec![SoundCue::Play]);
}

#[test]
fn fail__in_flight__resets_everything_and_notifies_once() {
    // given
    let (mut seq, presentation) = core();
    let table = build_table(50, 100).unwrap();
    let ticket = seq.begin(1_000, &table).unwrap();
    let err = SequencerError::SubmissionFailure(SettlementError::Rejected(
        "insufficient funds".into(),
    ));

    // when
    seq.fail(ticket.generation, &err).unwrap();

    // then
    assert_eq!(seq.phase(), Phase::Idle);
    assert_eq!(*seq.state(), SequencerState::default());
    assert_eq!(seq.in_flight(), None);
    assert_eq!(presentation.sounds(), vec![SoundCue::Play]);
    assert_eq!(
        presentation.failures(),
        vec!["bet submission failed: bet rejected: insufficient funds".to_string()]
    );
}

#[test]
fn receive_result__after_failure_reset__discarded_as_stale() {
    // given
    let (mut seq, presentation) = core();
    let table = build_table(50, 100).unwrap();
    let first = seq.begin(1_000, &table).unwrap();
    seq.fail(first.generation, &SequencerError::SettlementTimeout(Duration::from_secs(30)))
        .unwrap();
    presentation.clear();

    // when
    let res = seq.receive_result(arb_result(first.generation, 5, 2_000));

    // then
    assert_eq!(res, Err(SequencerError::StaleResult(first.generation)));
    assert_eq!(seq.phase(), Phase::Idle);
    assert_eq!(*seq.state(), SequencerState::default());
    assert!(presentation.events().is_empty());
}

#[test]
fn receive_result__from_superseded_play__does_not_touch_new_play() {
    // given
    let (mut seq, _) = core();
    let table = build_table(50, 100).unwrap();
    let first = seq.begin(1_000, &table).unwrap();
    seq.fail(
        first.generation,
        &SequencerError::SubmissionFailure(SettlementError::Transport("reset".into())),
    )
    .unwrap();
    let second = seq.begin(1_000, &table).unwrap();
    seq.submission_accepted(second.generation).unwrap();

    // when
    let stale = seq.receive_result(arb_result(first.generation, 5, 2_000));
    let fresh = seq.receive_result(arb_result(second.generation, 70, 0));

    // then
    assert_eq!(stale, Err(SequencerError::StaleResult(first.generation)));
    assert!(second.generation > first.generation);
    assert_eq!(fresh.unwrap().win_status, WinStatus::Loss);
    assert_eq!(seq.phase(), Phase::RevealDelay);
}

#[test]
fn reveal__wrong_generation__ignored() {
    let (mut seq, _) = core();
    let table = build_table(50, 100).unwrap();
    let ticket = seq.begin(1_000, &table).unwrap();
    seq.receive_result(arb_result(ticket.generation, 1, 2_000))
        .unwrap();

    let res = seq.reveal(ticket.generation.next().next());

    assert!(matches!(res, Err(SequencerError::StaleResult(_))));
    assert_eq!(seq.phase(), Phase::RevealDelay);
}

#[test]
fn begin__after_resolved__starts_next_generation() {
    let (mut seq, _) = core();
    let table = build_table(50, 100).unwrap();
    let first = seq.begin(1_000, &table).unwrap();
    seq.receive_result(arb_result(first.generation, 1, 2_000))
        .unwrap();
    seq.reveal(first.generation).unwrap();

    let second = seq.begin(1_000, &table).unwrap();

    assert_eq!(second.generation.value(), first.generation.value() + 1);
    assert_eq!(seq.state().displayed_result, None);
    assert!(seq.state().is_animating);
}

#[tokio::test(start_paused = true)]
async fn play_to_completion__scripted_win__resolves_after_reveal_delay() {
    // given
    let (engine, handle) = FakeSettlement::new_with_handle();
    let presentation = RecordingPresentation::new();
    let mut seq = ResultSequencer::new(engine, presentation.clone(), default_slip());
    handle.accept();
    handle.resolve(10, 2_000);
    let started = tokio::time::Instant::now();

    // when
    let resolution = seq.play_to_completion().await.unwrap();

    // then
    assert!(started.elapsed() >= driver::DEFAULT_REVEAL_DELAY);
    assert_eq!(resolution.displayed_result, 11);
    assert_eq!(resolution.win_status, WinStatus::Win);
    assert_eq!(seq.phase(), Phase::Resolved);
    assert!(seq.engine().is_some());
    assert_eq!(
        presentation.sounds(),
        vec![SoundCue::Play, SoundCue::Win]
    );
}

#[tokio::test(start_paused = true)]
async fn set_threshold__while_idle__fires_tick_and_rebuilds_table() {
    // given
    let (engine, _handle) = FakeSettlement::new_with_handle();
    let presentation = RecordingPresentation::new();
    let mut seq = ResultSequencer::new(engine, presentation.clone(), default_slip());

    // when
    let changed = seq.set_threshold(20).unwrap();
    let unchanged = seq.set_threshold(20).unwrap();

    // then
    assert!(changed);
    assert!(!unchanged);
    assert_eq!(seq.slip().table().threshold(), 20);
    assert_eq!(presentation.sounds(), vec![SoundCue::Tick]);
}

#[tokio::test(start_paused = true)]
async fn set_threshold__while_animating__rejected() {
    // given
    let (engine, _handle) = FakeSettlement::new_with_handle();
    let mut seq = ResultSequencer::new(engine, RecordingPresentation::new(), default_slip());
    seq.play().unwrap();

    // when
    let res = seq.set_threshold(10);

    // then
    assert_eq!(res, Err(SequencerError::Busy(Phase::Submitting)));
    assert_eq!(seq.slip().threshold(), 50);
    assert_eq!(seq.set_wager(5), Err(SequencerError::Busy(Phase::Submitting)));
}
