/// Buffer on stack.
#[derive(Debug, Clone, Copy)]
pub struct Store<const N: usize> {
    len: u8,
    buf: [u8; N],
}

impl<const N: usize> Store<N> {
    #[inline]
    pub const fn new() -> Self {
        Self {
            len: 0,
            buf: [0; N],
        }
    }

    #[inline]
    pub fn replace_with_data(&mut self, data: &[u8]) {
        debug_assert!(data.len() <= N);
        self.buf[..data.len()].copy_from_slice(data);
        self.len = data.len() as u8;
    }

    #[inline]
    pub const fn len(&self) -> usize { self.len as usize }

    #[inline]
    pub const fn is_empty(&self) -> bool { self.len == 0 }

    #[inline]
    pub fn read(&self) -> &[u8] { unsafe { super::slice(&self.buf, 0, self.len as usize) } }

    #[inline]
    pub fn reset(&mut self) { self.len = 0; }
}
