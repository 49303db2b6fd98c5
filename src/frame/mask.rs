//!  Mask flag and key.

/// Payload mask with a 32-bit key.
///
/// `Mask::Skip` is used by server side to skip unmask
/// if mask key equals 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mask {
    Key([u8; 4]),
    Skip,
    None,
}

impl Mask {
    /// Get the flag byte.
    #[inline]
    pub const fn to_flag(&self) -> u8 {
        use Mask::*;
        match self {
            Key(_) | Skip => 0x80,
            None => 0x00,
        }
    }
}

/// Generate a new random key.
#[inline]
pub fn new_rand_key() -> [u8; 4] { rand::random::<[u8; 4]>() }

/// Mask the buffer, byte by byte.
#[inline]
pub fn apply_mask(key: [u8; 4], buf: &mut [u8]) {
    for (i, b) in buf.iter_mut().enumerate() {
        *b ^= key[i & 0x03];
    }
}

/// Mask the buffer, 4 bytes at a time.
#[inline]
pub fn apply_mask4(key: [u8; 4], buf: &mut [u8]) {
    let key4 = u32::from_ne_bytes(key);

    let (prefix, middle, suffix) = unsafe { buf.align_to_mut::<u32>() };

    apply_mask(key, prefix);

    let head = prefix.len() & 3;
    let key4 = if head > 0 {
        if cfg!(target_endian = "big") {
            key4.rotate_left(8 * head as u32)
        } else {
            key4.rotate_right(8 * head as u32)
        }
    } else {
        key4
    };
    for b4 in middle.iter_mut() {
        *b4 ^= key4;
    }

    apply_mask(key4.to_ne_bytes(), suffix);
}

/// Rotate the key so that a payload split at a non-4-aligned boundary
/// resumes at the right key byte.
///
/// After consuming `n` payload bytes, `rotate_key(4 - n % 4, &mut key)`
/// makes `key[0]` the byte to apply to the next payload byte.
#[inline]
pub fn rotate_key(offset: usize, key: &mut [u8; 4]) {
    let original = *key;
    key[offset % 4] = original[0];
    key[(1 + offset) % 4] = original[1];
    key[(2 + offset) % 4] = original[2];
    key[(3 + offset) % 4] = original[3];
}

/// Replicate a 4-byte key into the 64-bit word layout
/// [`unmask_loose8`] consumes.
#[inline]
pub const fn wide_key(key: [u8; 4]) -> u64 {
    let [a, b, c, d] = key;
    u64::from_ne_bytes([a, b, c, d, a, b, c, d])
}

/// XOR `len` bytes at `src` with a replicated key, one 64-bit word at a
/// time, writing each word back `dst_back` bytes before where it was read.
///
/// Loose: always processes `(len >> 3) + 1` whole words, so reads reach up
/// to `src + len + 8` and writes up to `src + len + 8 - dst_back`.
///
/// # Safety
///
/// The whole range touched by those word reads and writes must be inside
/// one allocation owned by the caller.
#[inline]
pub unsafe fn unmask_loose8(src: *mut u8, dst_back: usize, key: u64, len: usize) {
    let mut p = src;
    for _ in 0..(len >> 3) + 1 {
        let w = p.cast::<u64>().read_unaligned() ^ key;
        p.sub(dst_back).cast::<u64>().write_unaligned(w);
        p = p.add(8);
    }
}

/// 32-bit variant of [`unmask_loose8`]: `(len >> 2) + 1` words, reads up to
/// `src + len + 4`, writes up to `src + len + 4 - dst_back`.
///
/// # Safety
///
/// Same contract as [`unmask_loose8`], with 4-byte words.
#[inline]
pub unsafe fn unmask_loose4(src: *mut u8, dst_back: usize, key: u32, len: usize) {
    let mut p = src;
    for _ in 0..(len >> 2) + 1 {
        let w = p.cast::<u32>().read_unaligned() ^ key;
        p.sub(dst_back).cast::<u32>().write_unaligned(w);
        p = p.add(4);
    }
}

/// Unmask a complete in-buffer payload with the key stored in the 4 bytes
/// just before it, sliding the result `head` bytes to the left so that the
/// payload ends up where its frame head began.
///
/// With a 6-byte head the write window of the 8-byte variant could reach
/// into a following frame's head, so that head size takes 4-byte words.
///
/// # Safety
///
/// `src - head .. src + len + 8` (`+ 4` for a 6-byte head) must be inside
/// one allocation owned by the caller, and the 4 bytes before `src` must
/// hold the frame's mask key.
#[inline]
pub unsafe fn unmask_and_slide(head: usize, src: *mut u8, len: usize) {
    let k = src.sub(4);
    let key = [k.read(), k.add(1).read(), k.add(2).read(), k.add(3).read()];
    if head != 6 {
        unmask_loose8(src, head, wide_key(key), len);
    } else {
        unmask_loose4(src, head, u32::from_ne_bytes(key), len);
    }
}
