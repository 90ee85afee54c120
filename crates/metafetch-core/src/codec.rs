//! Bijective codec between bilibili numeric video ids and `BV` identifiers.
//!
//! A numeric id `n` in `[0, 2^51)` maps to a 12 character string: the literal
//! header `BV1` followed by nine base-58 digits. Encoding sets the sentinel
//! bit 51, XORs with a fixed mask, then emits nine digits least significant
//! first into a fixed, non-sequential set of positions. Decoding reverses
//! every step and rejects strings whose sentinel bit is not set.
//!
//! All intermediate values stay below `2^52`, so `u64` arithmetic is exact.
//!
//! ```rust
//! use metafetch_core::codec;
//!
//! assert_eq!(codec::encode(1).as_deref(), Some("BV1xx411c7mQ"));
//! assert_eq!(codec::decode("BV1xx411c7mQ"), Some(1));
//! assert_eq!(codec::decode("not-a-bvid"), None);
//! ```

const HEADER: &str = "BV1";
const ALPHABET: &[u8; 58] = b"FcwAPNKTMug3GV5Lj7EJnHpWsx4tb8haYeviqBz6rkCy12mUSDQX9RdoZf";
const BASE: u64 = 58;
const DIGITS: usize = 9;
const ENCODED_LEN: usize = HEADER.len() + DIGITS;

/// Exclusive upper bound of the encodable range.
pub const MAX: u64 = 1 << 51;
const MASK: u64 = MAX - 1;
const XOR: u64 = 0x1552_356C_4CDB;

/// Output position (relative to the end of the header) of each digit,
/// indexed by digit significance.
const POSITIONS: [usize; DIGITS] = [8, 7, 0, 5, 1, 3, 2, 4, 6];

/// Encode a numeric id into its `BV` form.
///
/// Returns `None` when `n` is outside `[0, 2^51)`.
#[must_use]
pub fn encode(n: u64) -> Option<String> {
    if n >= MAX {
        return None;
    }
    let mut tmp = (n | MAX) ^ XOR;
    let mut out = [0_u8; DIGITS];
    for position in POSITIONS {
        out[position] = ALPHABET[usize::try_from(tmp % BASE).ok()?];
        tmp /= BASE;
    }
    let mut encoded = String::with_capacity(ENCODED_LEN);
    encoded.push_str(HEADER);
    encoded.extend(out.iter().map(|&b| char::from(b)));
    Some(encoded)
}

/// Decode a `BV` identifier back into its numeric id.
///
/// Returns `None` unless `s` has the `BV1` header, the fixed length and only
/// alphabet characters, and its sentinel bit is set.
#[must_use]
pub fn decode(s: &str) -> Option<u64> {
    let bytes = s.as_bytes();
    if bytes.len() != ENCODED_LEN || !s.starts_with(HEADER) {
        return None;
    }
    let body = &bytes[HEADER.len()..];
    let mut tmp: u64 = 0;
    for position in POSITIONS.iter().rev() {
        let digit = ALPHABET.iter().position(|&c| c == body[*position])?;
        tmp = tmp * BASE + digit as u64;
    }
    if tmp >> 51 != 1 {
        return None;
    }
    Some((tmp & MASK) ^ XOR)
}

/// Encode an `av<digits>` identifier (prefix case-insensitive).
#[must_use]
pub fn encode_av(av: &str) -> Option<String> {
    let digits = av.get(..2)?.eq_ignore_ascii_case("av").then(|| &av[2..])?;
    encode(digits.parse().ok()?)
}

/// Decode a `BV` identifier into its `av<digits>` form.
///
/// The header is accepted case-insensitively, matching what users paste.
#[must_use]
pub fn decode_av(bv: &str) -> Option<String> {
    let rest = bv.get(..3)?.eq_ignore_ascii_case(HEADER).then(|| &bv[3..])?;
    decode(&format!("{HEADER}{rest}")).map(|n| format!("av{n}"))
}
