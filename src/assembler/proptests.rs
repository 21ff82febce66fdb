//! Property-based tests for reply assembly
//!
//! These tests verify the merge policy holds across arbitrary frame
//! sequences:
//! - Delta frames concatenate in arrival order
//! - The last snapshot wins, and repeating a snapshot changes nothing
//! - Malformed frames never affect the assembled text
//! - A rejected submission never touches the open turn

use super::*;
use crate::protocol::{DecodeError, Frame};
use proptest::prelude::*;

fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,!?ü⚽\n]{0,20}"
}

fn arb_decode_error() -> impl Strategy<Value = DecodeError> {
    prop_oneof![
        Just(DecodeError::InvalidUtf8),
        Just(DecodeError::MissingContent),
        "[a-z ]{0,10}".prop_map(DecodeError::InvalidJson),
    ]
}

fn awaiting_reply() -> Assembler {
    let mut assembler = Assembler::new();
    assembler
        .submit_user_text("What colours do the balls come in?")
        .unwrap();
    assembler
}

fn run(frames: impl IntoIterator<Item = Result<Frame, DecodeError>>) -> String {
    let mut assembler = awaiting_reply();
    for frame in frames {
        assembler.on_frame(frame);
    }
    assembler.on_stream_end().unwrap().text.clone()
}

proptest! {
    #[test]
    fn prop_deltas_concatenate(payloads in proptest::collection::vec(arb_text(), 0..12)) {
        let text = run(payloads.iter().cloned().map(|p| Ok(Frame::delta(p))));
        prop_assert_eq!(text, payloads.concat());
    }

    #[test]
    fn prop_last_snapshot_wins(payloads in proptest::collection::vec(arb_text(), 1..12)) {
        let text = run(payloads.iter().cloned().map(|p| Ok(Frame::snapshot(p))));
        prop_assert_eq!(&text, payloads.last().unwrap());
    }

    #[test]
    fn prop_repeated_snapshot_is_noop(payloads in proptest::collection::vec(arb_text(), 1..8)) {
        let once = run(payloads.iter().cloned().map(|p| Ok(Frame::snapshot(p))));
        let twice = run(
            payloads
                .iter()
                .flat_map(|p| [Ok(Frame::snapshot(p.clone())), Ok(Frame::snapshot(p.clone()))]),
        );
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_replayed_delta_duplicates(
        prefix in proptest::collection::vec(arb_text(), 0..6),
        replayed in "[a-z]{1,10}",
    ) {
        let mut frames: Vec<Frame> = prefix.into_iter().map(Frame::delta).collect();
        frames.push(Frame::delta(replayed.clone()));
        let once = run(frames.iter().cloned().map(Ok));

        frames.push(Frame::delta(replayed.clone()));
        let twice = run(frames.into_iter().map(Ok));

        prop_assert_ne!(&once, &twice);
        prop_assert_eq!(twice, format!("{once}{replayed}"));
    }

    #[test]
    fn prop_malformed_frames_are_neutral(
        frames in proptest::collection::vec(
            (arb_text(), any::<bool>()).prop_map(|(p, snapshot)| {
                if snapshot { Frame::snapshot(p) } else { Frame::delta(p) }
            }),
            0..10,
        ),
        junk in proptest::collection::vec((0usize..12, arb_decode_error()), 0..5),
    ) {
        let clean = run(frames.iter().cloned().map(Ok));

        let mut noisy: Vec<Result<Frame, DecodeError>> = frames.into_iter().map(Ok).collect();
        for (at, error) in junk {
            let at = at.min(noisy.len());
            noisy.insert(at, Err(error));
        }
        prop_assert_eq!(run(noisy), clean);
    }

    #[test]
    fn prop_submit_while_streaming_leaves_turn(
        payloads in proptest::collection::vec(arb_text(), 1..6),
        intruder in "[a-zA-Z ]{0,20}",
    ) {
        let mut assembler = awaiting_reply();
        for p in &payloads {
            assembler.on_frame(Ok(Frame::delta(p.clone())));
        }
        let len_before = assembler.transcript().len();

        let result = assembler.submit_user_text(&intruder);
        prop_assert!(
            matches!(result, Err(SubmitError::Sequence(_))),
            "expected sequence error"
        );
        prop_assert_eq!(assembler.transcript().len(), len_before);
        prop_assert_eq!(assembler.phase(), Phase::Streaming);
        prop_assert_eq!(
            &assembler.transcript().open_turn().unwrap().text,
            &payloads.concat()
        );
    }

    #[test]
    fn prop_frames_after_end_are_ignored(
        payloads in proptest::collection::vec(arb_text(), 0..6),
        late in proptest::collection::vec(arb_text(), 1..4),
    ) {
        let mut assembler = awaiting_reply();
        for p in &payloads {
            assembler.on_frame(Ok(Frame::delta(p.clone())));
        }
        let final_text = assembler.on_stream_end().unwrap().text.clone();
        for p in late {
            prop_assert_eq!(
                assembler.on_frame(Ok(Frame::snapshot(p))),
                FrameOutcome::Dropped(DropReason::NoReplyInFlight)
            );
        }
        prop_assert_eq!(&assembler.transcript().last().unwrap().text, &final_text);
    }
}
