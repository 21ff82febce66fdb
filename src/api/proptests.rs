//! Property-based tests for the reply wire format
//!
//! The bytes under test are the server's own SSE response body. However
//! that body is chunked on the way to the widget, the decoder must yield
//! exactly the emitted payloads, in order.

use super::sse::{frame_response, STREAM_FAILURE_MESSAGE};
use crate::emitter::FrameStream;
use crate::llm::LlmError;
use crate::protocol::{DecodeError, Frame, FrameDecoder, FrameMode, WireEvent};
use axum::body::to_bytes;
use futures::stream::{self, StreamExt};
use proptest::prelude::*;

fn arb_payload() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 .,!?]{0,40}",
        "[a-z ]{0,10}\n[a-z ]{0,10}",
        "(ball|⚽|ü|日本|\"quoted\"|\\\\| ){0,8}",
    ]
}

fn arb_mode() -> impl Strategy<Value = FrameMode> {
    prop_oneof![Just(FrameMode::Delta), Just(FrameMode::Snapshot)]
}

fn response_body(mode: FrameMode, items: Vec<Result<Frame, LlmError>>) -> Vec<u8> {
    let frames: FrameStream = stream::iter(items).boxed();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let _guard = runtime.enter();
    let response = frame_response(mode, frames);
    runtime.block_on(async move {
        to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    })
}

fn decode_in_chunks(
    mode: FrameMode,
    wire: &[u8],
    cuts: &[usize],
) -> Vec<Result<WireEvent, DecodeError>> {
    let mut decoder = FrameDecoder::new(mode);
    let mut out = Vec::new();
    let mut start = 0;
    for &cut in cuts {
        let cut = cut.min(wire.len()).max(start);
        out.extend(decoder.push(&wire[start..cut]));
        start = cut;
    }
    out.extend(decoder.push(&wire[start..]));
    out.extend(decoder.finish());
    out
}

proptest! {
    #[test]
    fn prop_chunking_preserves_payloads(
        mode in arb_mode(),
        payloads in proptest::collection::vec(arb_payload(), 0..8),
        mut cuts in proptest::collection::vec(0usize..600, 0..12),
    ) {
        let frames: Vec<Frame> = payloads
            .iter()
            .map(|p| Frame { payload: p.clone(), mode })
            .collect();
        let wire = response_body(mode, frames.iter().cloned().map(Ok).collect());
        cuts.sort_unstable();

        let decoded = decode_in_chunks(mode, &wire, &cuts);
        let expected: Vec<Result<WireEvent, DecodeError>> =
            frames.into_iter().map(|f| Ok(WireEvent::Frame(f))).collect();
        prop_assert_eq!(decoded, expected);
    }

    #[test]
    fn prop_provider_error_is_the_last_event(
        payloads in proptest::collection::vec(arb_payload(), 0..4),
        trailing in proptest::collection::vec(arb_payload(), 0..3),
        mut cuts in proptest::collection::vec(0usize..400, 0..6),
    ) {
        let mut items: Vec<Result<Frame, LlmError>> =
            payloads.iter().map(|p| Ok(Frame::delta(p.clone()))).collect();
        items.push(Err(LlmError::network("connection reset")));
        items.extend(trailing.into_iter().map(|p| Ok(Frame::delta(p))));
        let wire = response_body(FrameMode::Delta, items);
        cuts.sort_unstable();

        let decoded = decode_in_chunks(FrameMode::Delta, &wire, &cuts);
        prop_assert_eq!(decoded.len(), payloads.len() + 1);
        prop_assert_eq!(
            decoded.last(),
            Some(&Ok(WireEvent::Error(STREAM_FAILURE_MESSAGE.to_string())))
        );
    }
}
