//! Property-based tests for the stream decoder
//!
//! Verifies the decoder is invariant under chunking of the byte stream
//! and that decoded deltas concatenate to the original text.

use super::*;
use proptest::prelude::*;

/// Encode delta text the way the service does. The generator alphabet
/// excludes backslashes, so the two escapes round-trip exactly.
fn encode_delta(text: &str) -> String {
    let escaped = text.replace('"', "\\\"").replace('\n', "\\n");
    format!("0:\"{escaped}\"\n")
}

fn decode_chunked(wire: &[u8], cuts: &[usize]) -> Vec<StreamRecord> {
    let mut decoder = StreamDecoder::new();
    let mut records = Vec::new();
    let mut rest = wire;
    for &cut in cuts {
        if rest.is_empty() {
            break;
        }
        let n = cut.min(rest.len());
        records.extend(decoder.feed(&rest[..n]));
        rest = &rest[n..];
    }
    records.extend(decoder.feed(rest));
    records.extend(decoder.finish());
    records
}

proptest! {
    #[test]
    fn deltas_concatenate_in_order(
        parts in proptest::collection::vec("[a-zA-Z0-9 àß\u{1F600}\"\n]{0,20}", 0..8),
        cuts in proptest::collection::vec(1usize..9, 0..16),
    ) {
        let mut wire = Vec::new();
        wire.extend_from_slice(b"f:{\"messageId\":\"m1\"}\n");
        for part in &parts {
            wire.extend_from_slice(encode_delta(part).as_bytes());
        }
        wire.extend_from_slice(b"d:{\"finishReason\":\"stop\"}\n");

        let records = decode_chunked(&wire, &cuts);

        prop_assert_eq!(records.last(), Some(&StreamRecord::Done));
        let decoded: String = records
            .iter()
            .filter_map(|r| match r {
                StreamRecord::Delta(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        prop_assert_eq!(decoded, parts.concat());
    }

    #[test]
    fn chunking_never_changes_records(
        parts in proptest::collection::vec("[a-zA-Z0-9 àß\u{1F600}\"\n]{0,20}", 0..8),
        cuts in proptest::collection::vec(1usize..9, 0..16),
    ) {
        let mut wire = Vec::new();
        for part in &parts {
            wire.extend_from_slice(encode_delta(part).as_bytes());
        }
        wire.extend_from_slice(b"e:\n");

        let whole = decode_chunked(&wire, &[]);
        let chunked = decode_chunked(&wire, &cuts);
        prop_assert_eq!(whole, chunked);
    }
}
