//! Property tests for the `av`/`BV` codec.

#![allow(clippy::unwrap_used)]

use metafetch_core::codec::{MAX, decode, decode_av, encode, encode_av};
use proptest::prelude::*;

proptest! {
    #[test]
    fn encode_then_decode_is_identity(n in 0..MAX) {
        let bv = encode(n).unwrap();
        prop_assert_eq!(bv.len(), 12);
        prop_assert!(bv.starts_with("BV1"));
        prop_assert_eq!(decode(&bv), Some(n));
    }

    #[test]
    fn decodable_strings_reencode_to_themselves(body in "[1-9A-HJ-NP-Za-km-z]{9}") {
        let bv = format!("BV1{body}");
        if let Some(n) = decode(&bv) {
            prop_assert_eq!(encode(n), Some(bv));
        }
    }

    #[test]
    fn out_of_range_is_rejected(n in MAX..u64::MAX) {
        prop_assert_eq!(encode(n), None);
    }

    #[test]
    fn av_helpers_agree(n in 0..MAX) {
        let av = format!("av{n}");
        let bv = encode_av(&av).unwrap();
        prop_assert_eq!(decode_av(&bv), Some(av));
    }

    #[test]
    fn decode_never_panics(s in "\\PC{0,16}") {
        let _ = decode(&s);
        let _ = decode_av(&s);
    }
}
