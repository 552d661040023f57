//! Text codec for raw infrared frames.
//!
//! On the bus a raw frame is hexadecimal text. Inbound messages carry a
//! count header followed by that many 16-bit values, whitespace separated.
//! Outbound reports are four-digit uppercase tokens without a header.

use core::fmt::Write;

use thiserror::Error;

use crate::{MAX_RAW_ELEMS, STAGING_CAPACITY};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RawCodeError {
    /// Text this long could never have come out of the staging buffer.
    #[error("message of {0} bytes exceeds the staging capacity")]
    Oversized(usize),
    #[error("missing element count header")]
    MissingCount,
    #[error("element count {0} out of range")]
    CountOutOfRange(i64),
    #[error("frame declares {declared} elements, found {found}")]
    Truncated { declared: usize, found: usize },
    #[error("element {index} value {value} outside 16 bits")]
    ValueOutOfRange { index: usize, value: i64 },
}

/// Parse one staged raw-frame message into an owned timing array.
///
/// The first token declares how many values follow; tokens beyond the
/// declared count are ignored. A count of zero is valid and yields an
/// empty array, which callers treat as nothing to transmit. Token
/// scanning is lenient the way `strtol` is: it stops at the first
/// non-hex character, and a token with no leading hex digits scans as
/// zero.
pub fn decode(text: &str) -> Result<Vec<u16>, RawCodeError> {
    if text.len() + 1 > STAGING_CAPACITY {
        return Err(RawCodeError::Oversized(text.len()));
    }

    let mut tokens = text.split_ascii_whitespace();

    let count = tokens.next().map(scan_hex).ok_or(RawCodeError::MissingCount)?;
    if count < 0 || count > MAX_RAW_ELEMS as i64 {
        return Err(RawCodeError::CountOutOfRange(count));
    }
    let declared = count as usize;

    let mut out = Vec::with_capacity(declared);
    for index in 0..declared {
        let token = tokens.next().ok_or(RawCodeError::Truncated {
            declared,
            found: index,
        })?;
        let value = scan_hex(token);
        if !(0..=0xFFFF).contains(&value) {
            return Err(RawCodeError::ValueOutOfRange { index, value });
        }
        out.push(value as u16);
    }

    Ok(out)
}

/// `strtol(tok, _, 16)` style scan: optional sign, then the longest
/// leading run of hex digits. No digits at all scans as zero. Oversized
/// values saturate, which keeps them outside the 16-bit range checks.
fn scan_hex(token: &str) -> i64 {
    let (negative, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token.strip_prefix('+').unwrap_or(token)),
    };

    let mut value: i64 = 0;
    for ch in digits.chars() {
        match ch.to_digit(16) {
            Some(d) => value = value.saturating_mul(16).saturating_add(i64::from(d)),
            None => break,
        }
    }

    if negative {
        -value
    } else {
        value
    }
}

/// Render a timing array as four-digit uppercase hex tokens, single space
/// separated, no trailing separator.
///
/// Appends to `out` and stops before the first token that would not fit
/// whole: a too-small buffer ends up with a valid prefix of the
/// rendering, never a clipped token.
pub fn encode<const N: usize>(values: &[u16], out: &mut heapless::String<N>) {
    for (i, value) in values.iter().enumerate() {
        let sep = if i == 0 { "" } else { " " };
        if out.capacity() - out.len() < sep.len() + 4 {
            break;
        }
        write!(out, "{}{:04X}", sep, value).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_counted_frame() {
        let arr = decode("3 0041 0032 0F9C").unwrap();
        assert_eq!(arr, vec![0x0041, 0x0032, 0x0F9C]);
    }

    #[test]
    fn decoding_is_repeatable() {
        let a = decode("2 00FF 1234").unwrap();
        let b = decode("2 00FF 1234").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn count_zero_is_a_valid_empty_frame() {
        assert_eq!(decode("0").unwrap(), Vec::<u16>::new());
        assert_eq!(decode("0 DEAD BEEF").unwrap(), Vec::<u16>::new());
    }

    #[test]
    fn tokens_beyond_the_count_are_ignored() {
        assert_eq!(decode("2 0001 0002 0003").unwrap(), vec![1, 2]);
    }

    #[test]
    fn count_at_the_limit_is_accepted() {
        let mut msg = format!("{:X}", MAX_RAW_ELEMS);
        for _ in 0..MAX_RAW_ELEMS {
            msg.push_str(" 0001");
        }
        assert_eq!(decode(&msg).unwrap().len(), MAX_RAW_ELEMS);
    }

    #[test]
    fn count_above_the_limit_is_rejected() {
        let over = MAX_RAW_ELEMS as i64 + 1;
        assert_eq!(
            decode(&format!("{:X}", over)),
            Err(RawCodeError::CountOutOfRange(over))
        );
    }

    #[test]
    fn negative_count_is_rejected() {
        assert_eq!(decode("-1 0041"), Err(RawCodeError::CountOutOfRange(-1)));
    }

    #[test]
    fn missing_tokens_fail() {
        assert_eq!(decode(""), Err(RawCodeError::MissingCount));
        assert_eq!(decode("   "), Err(RawCodeError::MissingCount));
        assert_eq!(
            decode("3 0041 0032"),
            Err(RawCodeError::Truncated {
                declared: 3,
                found: 2
            })
        );
    }

    #[test]
    fn sixteen_bit_range_is_enforced() {
        assert_eq!(decode("1 FFFF").unwrap(), vec![0xFFFF]);
        assert_eq!(
            decode("1 10000"),
            Err(RawCodeError::ValueOutOfRange {
                index: 0,
                value: 0x10000
            })
        );
        assert_eq!(
            decode("2 0010 -1A"),
            Err(RawCodeError::ValueOutOfRange {
                index: 1,
                value: -0x1A
            })
        );
    }

    #[test]
    fn tokens_scan_leniently_like_strtol() {
        // Scanning stops at the first non-hex character.
        assert_eq!(decode("1 12G4").unwrap(), vec![0x12]);
        // No leading hex digits scans as zero.
        assert_eq!(decode("1 ZZZZ").unwrap(), vec![0]);
    }

    #[test]
    fn repeated_separators_collapse() {
        assert_eq!(decode("2  0001   0002").unwrap(), vec![1, 2]);
    }

    #[test]
    fn oversized_text_is_rejected_before_parsing() {
        let text = "0".repeat(STAGING_CAPACITY);
        assert_eq!(
            decode(&text),
            Err(RawCodeError::Oversized(STAGING_CAPACITY))
        );
    }

    #[test]
    fn encodes_four_digit_uppercase_tokens() {
        let mut out: heapless::String<64> = heapless::String::new();
        encode(&[0x0041, 0x0032, 0x0F9C], &mut out);
        assert_eq!(out.as_str(), "0041 0032 0F9C");
    }

    #[test]
    fn encodes_empty_array_to_empty_string() {
        let mut out: heapless::String<16> = heapless::String::new();
        encode(&[], &mut out);
        assert_eq!(out.as_str(), "");
    }

    #[test]
    fn encoder_truncates_at_token_boundaries() {
        // Room for exactly two tokens and one separator.
        let mut out: heapless::String<9> = heapless::String::new();
        encode(&[0x0001, 0x0002, 0x0003], &mut out);
        assert_eq!(out.as_str(), "0001 0002");
    }

    #[test]
    fn round_trips_through_a_counted_message() {
        let original = vec![0x0041u16, 0x0032, 0x0F9C, 0xFFFF, 0x0000];
        let mut body: heapless::String<64> = heapless::String::new();
        encode(&original, &mut body);
        let message = format!("{:X} {}", original.len(), body.as_str());
        assert_eq!(decode(&message).unwrap(), original);
    }
}
