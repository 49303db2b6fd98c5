//! Close frame payload codec.
//!
//! A close payload is a 16-bit big-endian status code followed by an
//! optional UTF-8 reason
//! ([RFC-6455 Section 5.5.1](https://datatracker.ietf.org/doc/html/rfc6455#section-5.5.1)).

use log::debug;

use crate::bleed::Writer;
use crate::engine::ERR_INVALID_CLOSE_PAYLOAD;
use crate::error::FrameError;
use crate::utf8::is_valid_utf8;

/// Parsed close payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseFrame<'a> {
    pub code: u16,
    pub reason: &'a str,
}

/// Status codes an endpoint may put on the wire: 1000-1011 minus the
/// reserved sentinels {1004, 1005, 1006}, plus the private range 4000-4999
/// ([RFC-6455 Section 7.4](https://datatracker.ietf.org/doc/html/rfc6455#section-7.4)).
#[inline]
pub const fn is_valid_close_code(code: u16) -> bool {
    matches!(code, 1000..=1003 | 1007..=1011 | 4000..=4999)
}

/// Parse a received close payload.
///
/// An empty payload carries no status at all and yields the 1005 sentinel.
/// A code outside the permitted set or a reason that is not UTF-8 yields
/// 1006 with a fixed diagnostic reason.
pub fn parse_close_payload(payload: &[u8]) -> CloseFrame<'_> {
    if payload.len() < 2 {
        return CloseFrame {
            code: 1005,
            reason: "",
        };
    }

    let code = u16::from_be_bytes([payload[0], payload[1]]);
    let reason = &payload[2..];

    if !is_valid_close_code(code) || !is_valid_utf8(reason) {
        debug!("invalid close payload, code {}", code);
        return CloseFrame {
            code: 1006,
            reason: ERR_INVALID_CLOSE_PAYLOAD,
        };
    }

    CloseFrame {
        code,
        // just validated above
        reason: unsafe { std::str::from_utf8_unchecked(reason) },
    }
}

/// Write a close payload to `dst`, returns the count of written bytes.
///
/// Code 0 and the sentinels 1005/1006 must never reach the wire; they
/// produce an empty payload. An empty `reason` is fine and produces the
/// bare 2-byte code.
pub fn format_close_payload(
    dst: &mut [u8],
    code: u16,
    reason: &[u8],
) -> Result<usize, FrameError> {
    if code == 0 || code == 1005 || code == 1006 {
        return Ok(0);
    }

    let mut writer = Writer::new(dst);
    writer.write_or_err(&code.to_be_bytes(), || FrameError::NotEnoughCapacity)?;
    writer.write_or_err(reason, || FrameError::NotEnoughCapacity)?;
    Ok(writer.pos())
}
