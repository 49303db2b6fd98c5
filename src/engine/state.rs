use std::marker::PhantomData;

use crate::bleed::Store;
use crate::frame::OpCode;

/// Store an incomplete frame head between consume calls.
/// Sized one byte less than the longest (server-side) head.
pub(super) type SpillStore = Store<13>;

/// Per-connection parser state.
///
/// Created by the host once per connection, handed by reference to every
/// [`consume`](super::consume) call, and thrown away with the connection.
/// The engine itself never holds on to it.
pub struct ConnState<Role> {
    /// The next bytes begin a frame head; otherwise they continue a
    /// payload with [`remaining`](Self::remaining) bytes still owed.
    pub(super) wants_head: bool,
    /// FIN bit of the most recently accepted frame.
    pub(super) last_fin: bool,
    /// RSV1 status of the in-flight message.
    pub(super) compressed: bool,
    /// Fragmentation depth: -1 idle, 0 a data message is open, 1 a control
    /// frame is interleaved inside it.
    pub(super) op_stack: i8,
    /// Wire opcode of the frame at each depth.
    pub(super) op_code: [OpCode; 2],
    /// Partial head carried over from the previous chunk.
    pub(super) spill: SpillStore,
    /// Bytes still owed for a payload split across chunks.
    pub(super) remaining: u64,
    /// Mask key of the in-flight frame, rotated between chunks.
    pub(super) mask: [u8; 4],
    _marker: PhantomData<Role>,
}

impl<Role> ConnState<Role> {
    /// Fresh state for a new connection.
    #[inline]
    pub const fn new() -> Self {
        ConnState {
            wants_head: true,
            last_fin: true,
            compressed: false,
            op_stack: -1,
            op_code: [OpCode::Continue; 2],
            spill: SpillStore::new(),
            remaining: 0,
            mask: [0; 4],
            _marker: PhantomData,
        }
    }

    /// Whether the engine expects a frame head next.
    #[inline]
    pub const fn wants_head(&self) -> bool { self.wants_head }

    /// Bytes still owed for the payload being streamed, 0 between frames.
    #[inline]
    pub const fn remaining(&self) -> u64 { self.remaining }

    /// Fragmentation depth, -1 when no message is open.
    #[inline]
    pub const fn op_depth(&self) -> i8 { self.op_stack }
}

impl<Role> Default for ConnState<Role> {
    #[inline]
    fn default() -> Self { Self::new() }
}

impl<Role> std::fmt::Debug for ConnState<Role> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnState")
            .field("wants_head", &self.wants_head)
            .field("last_fin", &self.last_fin)
            .field("compressed", &self.compressed)
            .field("op_stack", &self.op_stack)
            .field("spill", &self.spill.len())
            .field("remaining", &self.remaining)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::role::Server;

    #[test]
    fn initial_state() {
        let state = ConnState::<Server>::new();
        assert!(state.wants_head());
        assert_eq!(state.remaining(), 0);
        assert_eq!(state.op_depth(), -1);
        assert!(state.last_fin);
        assert!(state.spill.is_empty());
    }
}
