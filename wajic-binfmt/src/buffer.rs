use crate::leb128::write_leb128;

const GROWTH_INCREMENT: usize = 64 * 1024;

/// An append-only byte buffer that doubles its reserved capacity in 64 KiB
/// increments, so repeated small appends during a rewrite pass don't
/// reallocate on every call.
#[derive(Debug, Default)]
pub struct GrowableBuffer {
    data: Vec<u8>,
}

impl GrowableBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Create a buffer pre-reserved for at least `hint` bytes.
    #[must_use]
    pub fn with_capacity_hint(hint: usize) -> Self {
        Self { data: Vec::with_capacity(Self::rounded_capacity(hint)) }
    }

    fn rounded_capacity(hint: usize) -> usize {
        hint.div_ceil(GROWTH_INCREMENT) * GROWTH_INCREMENT
    }

    fn ensure_capacity(&mut self, additional: usize) {
        let needed = self.data.len() + additional;
        if needed > self.data.capacity() {
            let target = Self::rounded_capacity(needed).max(self.data.capacity() * 2);
            self.data.reserve(target - self.data.len());
        }
    }

    /// Append raw bytes.
    pub fn append(&mut self, bytes: &[u8]) {
        self.ensure_capacity(bytes.len());
        self.data.extend_from_slice(bytes);
    }

    /// Append a single byte.
    pub fn push(&mut self, byte: u8) {
        self.ensure_capacity(1);
        self.data.push(byte);
    }

    /// Append a LEB128-encoded unsigned integer.
    pub fn append_leb128(&mut self, value: u32) {
        let mut scratch = Vec::with_capacity(5);
        write_leb128(&mut scratch, value);
        self.append(&scratch);
    }

    /// Current length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consume the buffer, trimming any excess reserved capacity.
    #[must_use]
    pub fn finalize(mut self) -> Vec<u8> {
        self.data.shrink_to_fit();
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_trims_to_exact_length() {
        let mut buf = GrowableBuffer::with_capacity_hint(1);
        buf.append(b"hi");
        let out = buf.finalize();
        assert_eq!(out, b"hi");
        assert_eq!(out.capacity(), out.len());
    }

    #[test]
    fn append_leb128_matches_write_leb128() {
        let mut buf = GrowableBuffer::new();
        buf.append_leb128(300);
        let mut expected = Vec::new();
        write_leb128(&mut expected, 300);
        assert_eq!(buf.finalize(), expected);
    }
}
