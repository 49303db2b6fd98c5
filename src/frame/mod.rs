//! Websocket data frame.
//!
//! [RFC-6455 Section5](https://datatracker.ietf.org/doc/html/rfc6455#section-5)
//!
//! ```text
//! 0                   1                   2                   3
//! 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
//! |     Extended payload length continued, if payload len == 127  |
//! + - - - - - - - - - - - - - - - +-------------------------------+
//! |                               |Masking-key, if MASK set to 1  |
//! +-------------------------------+-------------------------------+
//! | Masking-key (continued)       |          Payload Data         |
//! +-------------------------------- - - - - - - - - - - - - - - - +
//! :                     Payload Data continued ...                :
//! + - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - +
//! |                     Payload Data continued ...                |
//! +---------------------------------------------------------------+
//! ```
//!

pub mod flag;
pub mod length;
pub mod mask;

pub use flag::{Fin, OpCode};
pub use length::PayloadLen;
pub use mask::Mask;

/// Websocket frame head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHead {
    pub fin: Fin,
    /// RSV1, set on the first frame of a permessage-deflate message.
    pub compressed: bool,
    pub opcode: OpCode,
    pub mask: Mask,
    pub length: PayloadLen,
}

use crate::bleed::Writer;
use crate::error::FrameError;
use crate::role::RoleHelper;

impl FrameHead {
    /// Constructor.
    #[inline]
    pub const fn new(
        fin: Fin,
        compressed: bool,
        opcode: OpCode,
        mask: Mask,
        length: PayloadLen,
    ) -> Self {
        Self {
            fin,
            compressed,
            opcode,
            mask,
            length,
        }
    }

    /// Encode to provided buffer, returns the count of written bytes.
    /// The caller should ensure the buffer is large enough,
    /// otherwise a [`FrameError::NotEnoughCapacity`] error will be returned.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, FrameError> {
        let mut writer = Writer::new(buf);

        macro_rules! writex {
            ($dst: expr) => {
                if writer.remaining() < $dst.len() {
                    return Err(FrameError::NotEnoughCapacity);
                } else {
                    unsafe {
                        writer.write_unchecked($dst);
                    }
                }
            };
        }

        // fin, rsv1, opcode
        let rsv1 = if self.compressed && !matches!(self.opcode, OpCode::Continue) {
            0x40
        } else {
            0x00
        };
        let b1 = self.fin as u8 | rsv1 | self.opcode as u8;

        // mask, payload length
        let b2 = self.mask.to_flag() | self.length.to_flag();

        writex!(&[b1, b2]);

        // extended payload length
        match &self.length {
            PayloadLen::Standard(_) => {}
            PayloadLen::Extended1(v) => writex!(&v.to_be_bytes()),
            PayloadLen::Extended2(v) => writex!(&v.to_be_bytes()),
        };

        // mask key
        match &self.mask {
            Mask::Key(k) => writex!(k),
            Mask::Skip => writex!(&[0u8; 4]),
            Mask::None => {}
        };

        Ok(writer.pos())
    }
}

/// Frame head bytes needed for an unmasked payload of this size:
/// 2, 4 or 10 plus the payload itself.
#[inline]
pub const fn message_frame_size(payload_size: usize) -> usize {
    if payload_size < 126 {
        2 + payload_size
    } else if payload_size <= u16::MAX as usize {
        4 + payload_size
    } else {
        10 + payload_size
    }
}

/// Build a complete outgoing frame in `dst`: head, mask key when `Role`
/// masks its writes, and the payload copied from `src` (masked in place
/// after the copy). Returns the total count of written bytes.
///
/// `reported_len` selects the length encoding in the head; it normally
/// equals `src.len()` but may differ when the payload is streamed or
/// deflated by the caller.
pub fn format_message<Role: RoleHelper>(
    dst: &mut [u8],
    src: &[u8],
    opcode: OpCode,
    reported_len: u64,
    compressed: bool,
    fin: bool,
) -> Result<usize, FrameError> {
    let mask = Role::new_write_mask();
    let head = FrameHead::new(
        Fin::new(fin),
        compressed,
        opcode,
        mask,
        PayloadLen::from_num(reported_len),
    );

    let head_n = head.encode(dst)?;

    if dst.len() - head_n < src.len() {
        return Err(FrameError::NotEnoughCapacity);
    }
    dst[head_n..head_n + src.len()].copy_from_slice(src);

    if let Mask::Key(key) = mask {
        mask::apply_mask4(key, &mut dst[head_n..head_n + src.len()]);
    }

    Ok(head_n + src.len())
}
