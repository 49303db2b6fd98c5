//! Streaming frame parser.
//!
//! [`consume`] eats one transport chunk at a time, re-assembles frame
//! boundaries across chunks, unmasks payloads in place and hands every
//! payload slice to a [`FrameHandler`]. Progress between chunks lives in a
//! caller-owned [`ConnState`].
//!
//! There is no recovery after a protocol violation: the handler's
//! `force_close` is told why, parsing stops, and the host is expected to
//! tear the connection down.

mod state;

pub use state::ConnState;

use log::debug;

use crate::bleed::{slice, slice_to_array};
use crate::frame::mask::{apply_mask4, rotate_key, unmask_and_slide, unmask_loose8, wide_key};
use crate::frame::{OpCode, PayloadLen};
use crate::role::RoleHelper;

pub const ERR_TOO_BIG_MESSAGE: &str = "Received too big message";
pub const ERR_WEBSOCKET_TIMEOUT: &str = "WebSocket timed out from inactivity";
pub const ERR_INVALID_TEXT: &str = "Received invalid UTF-8";
pub const ERR_TOO_BIG_MESSAGE_INFLATION: &str =
    "Received too big message, or other inflation error";
pub const ERR_INVALID_CLOSE_PAYLOAD: &str = "Received invalid close payload";
pub const ERR_PROTOCOL: &str = "Received invalid WebSocket frame";
pub const ERR_TCP_FIN: &str = "Received TCP FIN before WebSocket close frame";

/// Nominal size of a transport read. A continuation slice of exactly this
/// size unmasks through a compile-time-length path.
pub const RECV_BUFFER_LENGTH: usize = 512 * 1024;

/// Writable bytes required past the fresh bytes of every chunk: the loose
/// word XOR may touch one whole word beyond the payload it is given.
pub const POST_PADDING: usize = 8;

/// Hooks the host hangs into the parser. Dispatch is static: the handler
/// type is a parameter of [`consume`], so these calls inline away.
pub trait FrameHandler {
    /// A slice of payload, unmasked, with the wire opcode and FIN bit of
    /// its frame. `remaining` is how many payload bytes of this frame are
    /// still owed by later chunks (0 when the frame is done). `compressed`
    /// is the RSV1 status of the message the slice belongs to.
    ///
    /// Return true to abort parsing of the rest of the chunk.
    fn handle_fragment(
        &mut self,
        data: &[u8],
        remaining: u64,
        opcode: OpCode,
        fin: bool,
        compressed: bool,
    ) -> bool;

    /// Policy gate, consulted with every frame's declared payload length.
    /// Return true to refuse the frame; the engine then forces a close
    /// with [`ERR_TOO_BIG_MESSAGE`].
    fn refuse_payload_length(&mut self, len: u64) -> bool {
        let _ = len;
        false
    }

    /// Consulted when RSV1 shows up. Return true if a compression
    /// extension was negotiated; false fails the connection.
    fn set_compressed(&mut self) -> bool { false }

    /// Terminal error notification. No recovery follows.
    fn force_close(&mut self, reason: &'static str);
}

/// Feed one chunk of received bytes to the parser.
///
/// `buf` is a single caller-owned region holding the `len` fresh bytes at
/// `Role::PRE_PADDING`, laid out as
///
/// ```text
/// [ PRE_PADDING scratch | len fresh bytes | >= POST_PADDING writable ]
/// ```
///
/// The scratch space in front hosts the copy-back of a spilled partial
/// head; the tail absorbs the loose word XOR. The whole region may be
/// rewritten: unmasking slides payloads over their heads, so the chunk is
/// consumed by this call.
///
/// Frames and payload slices are delivered to `handler` in wire order.
/// Any protocol violation reports through `force_close` and abandons the
/// rest of the chunk.
pub fn consume<Role: RoleHelper, H: FrameHandler>(
    buf: &mut [u8],
    len: usize,
    state: &mut ConnState<Role>,
    handler: &mut H,
) {
    assert!(
        buf.len() >= Role::PRE_PADDING + len + POST_PADDING,
        "chunk buffer must hold PRE_PADDING + len + POST_PADDING bytes"
    );

    let mut beg = Role::PRE_PADDING;
    let end = Role::PRE_PADDING + len;

    // restore a spilled partial head right in front of the fresh bytes,
    // so the head parser sees it contiguously
    if !state.spill.is_empty() {
        beg -= state.spill.len();
        buf[beg..Role::PRE_PADDING].copy_from_slice(state.spill.read());
        state.spill.reset();
    }

    if !state.wants_head && !consume_continuation(buf, &mut beg, end, state, handler) {
        return;
    }

    let short = Role::SHORT_FRAME_HEAD_LEN as usize;
    let common = Role::COMMON_FRAME_HEAD_LEN as usize;
    let long = Role::LONG_FRAME_HEAD_LEN as usize;

    while end - beg >= short {
        let b0 = buf[beg];

        // rsv1 only with negotiated compression, rsv2/rsv3 never
        if (b0 & 0x40 != 0 && !handler.set_compressed()) || b0 & 0x30 != 0 {
            debug!("reserved bits rejected, head byte {:#04x}", b0);
            handler.force_close(ERR_PROTOCOL);
            return;
        }
        let opcode = match OpCode::from_flag(b0) {
            Ok(op) => op,
            Err(_) => {
                debug!("reserved opcode {}", b0 & 0x0f);
                handler.force_close(ERR_PROTOCOL);
                return;
            }
        };
        let len7 = buf[beg + 1] & 0x7f;
        if opcode.is_control() && (b0 & 0x80 == 0 || len7 > 125) {
            debug!("fragmented or oversized control frame");
            handler.force_close(ERR_PROTOCOL);
            return;
        }

        let stop = if len7 < 126 {
            consume_message(short, len7 as u64, opcode, buf, &mut beg, end, state, handler)
        } else if len7 == 126 {
            if end - beg < common {
                break;
            }
            let pay =
                PayloadLen::from_byte2(*unsafe { slice_to_array(slice(&buf[..], beg + 2, beg + 4)) });
            consume_message(common, pay.to_num(), opcode, buf, &mut beg, end, state, handler)
        } else {
            if end - beg < long {
                break;
            }
            let pay =
                PayloadLen::from_byte8(*unsafe { slice_to_array(slice(&buf[..], beg + 2, beg + 10)) });
            consume_message(long, pay.to_num(), opcode, buf, &mut beg, end, state, handler)
        };
        if stop {
            return;
        }
    }

    if end > beg {
        // a partial head, at most one long head minus one byte
        state.spill.replace_with_data(&buf[beg..end]);
    }
}

/// One frame whose head starts this chunk. Returns true when `consume`
/// must stop (violation, abort, or the payload runs past the chunk).
#[allow(clippy::too_many_arguments)]
fn consume_message<Role: RoleHelper, H: FrameHandler>(
    head: usize,
    pay_len: u64,
    opcode: OpCode,
    buf: &mut [u8],
    beg: &mut usize,
    end: usize,
    state: &mut ConnState<Role>,
    handler: &mut H,
) -> bool {
    let src = *beg;
    let fin = buf[src] & 0x80 != 0;

    if opcode != OpCode::Continue {
        // no room above an interleaved control frame, and a new data frame
        // cannot barge in while a data message is still open
        if state.op_stack == 1 || (!state.last_fin && opcode.is_data()) {
            debug!("frame ordering violated by {:?}", opcode);
            handler.force_close(ERR_PROTOCOL);
            return true;
        }
        state.op_stack += 1;
        if opcode.is_data() {
            state.compressed = buf[src] & 0x40 != 0;
        }
    } else if state.op_stack == -1 {
        debug!("continuation with nothing to continue");
        handler.force_close(ERR_PROTOCOL);
        return true;
    }
    state.op_code[state.op_stack as usize] = opcode;
    state.last_fin = fin;

    if handler.refuse_payload_length(pay_len) {
        debug!("payload of {} bytes refused", pay_len);
        handler.force_close(ERR_TOO_BIG_MESSAGE);
        return true;
    }

    let avail = end - src;
    let compressed = !opcode.is_control() && state.compressed;

    if pay_len <= (avail - head) as u64 {
        // the whole frame is in this chunk
        let pay = pay_len as usize;
        let data_beg = if Role::READ_MASKED {
            // frames packed in one chunk are never aligned; unmask with
            // the key at the head's tail, sliding the payload over it
            unsafe { unmask_and_slide(head, buf.as_mut_ptr().add(src + head), pay) };
            src
        } else {
            src + head
        };

        if handler.handle_fragment(&buf[data_beg..data_beg + pay], 0, opcode, fin, compressed) {
            return true;
        }

        if fin {
            state.op_stack -= 1;
        }
        *beg = src + head + pay;
        false
    } else {
        // the payload runs past this chunk
        let part = avail - head;
        state.wants_head = false;
        state.remaining = pay_len - part as u64;

        if Role::READ_MASKED {
            state.mask.copy_from_slice(&buf[src + head - 4..src + head]);
            unsafe {
                unmask_loose8(buf.as_mut_ptr().add(src + head), 0, wide_key(state.mask), part);
            }
            // the next chunk resumes at key byte 0
            rotate_key(4 - part % 4, &mut state.mask);
        }

        handler.handle_fragment(&buf[src + head..end], state.remaining, opcode, fin, compressed);
        true
    }
}

/// Payload bytes owed by an earlier chunk. Returns true when the frame
/// completed and `consume` may parse heads again.
fn consume_continuation<Role: RoleHelper, H: FrameHandler>(
    buf: &mut [u8],
    beg: &mut usize,
    end: usize,
    state: &mut ConnState<Role>,
    handler: &mut H,
) -> bool {
    let src = *beg;
    let len = end - src;
    let opcode = state.op_code[state.op_stack as usize];
    let compressed = !opcode.is_control() && state.compressed;

    if state.remaining <= len as u64 {
        // the rest of the frame is here
        let rem = state.remaining as usize;
        if Role::READ_MASKED {
            apply_mask4(state.mask, &mut buf[src..src + rem]);
        }

        if handler.handle_fragment(&buf[src..src + rem], 0, opcode, state.last_fin, compressed) {
            return false;
        }

        if state.last_fin {
            state.op_stack -= 1;
        }
        *beg = src + rem;
        state.remaining = 0;
        state.wants_head = true;
        true
    } else {
        // everything here belongs to the frame, and more is owed
        if Role::READ_MASKED && state.mask != [0; 4] {
            // a slice filling the whole receive buffer unmasks with a
            // compile-time length
            if let Ok(fixed) = <&mut [u8; RECV_BUFFER_LENGTH]>::try_from(&mut buf[src..end]) {
                apply_mask4(state.mask, fixed);
            } else {
                apply_mask4(state.mask, &mut buf[src..end]);
            }
        }

        state.remaining -= len as u64;
        if handler.handle_fragment(&buf[src..end], state.remaining, opcode, state.last_fin, compressed)
        {
            return false;
        }

        if len % 4 != 0 {
            rotate_key(4 - len % 4, &mut state.mask);
        }
        *beg = end;
        false
    }
}
