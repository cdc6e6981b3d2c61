//! UTF-8-safe growable byte buffer.

/// Error returned when a requested chunk size is too small to make
/// progress splitting a buffer.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("chunk size {0} is too small to split past a single UTF-8 character")]
pub struct SplitError(pub usize);

/// A growable byte sequence with UTF-8-aware truncation and splitting.
///
/// Used to accumulate outgoing chat text and to carve it into
/// frame-sized pieces without cutting a multi-byte character in half.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChatBuffer(Vec<u8>);

/// Returns true if `b` is a UTF-8 continuation byte (`10xxxxxx`).
fn is_continuation(b: u8) -> bool {
    b & 0xC0 == 0x80
}

/// Largest `n' <= max_len` such that cutting `data` at `n'` doesn't split a
/// UTF-8 character.
fn safe_cut(data: &[u8], max_len: usize) -> usize {
    if data.len() <= max_len {
        return data.len();
    }
    let mut n = max_len;
    while n > 0 && is_continuation(data[n]) {
        n -= 1;
    }
    n
}

impl ChatBuffer {
    /// An empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes to the tail.
    pub fn append(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }

    /// The buffer's contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes currently held.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no bytes are held.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Truncate to at most `max_len` bytes, backing up to the nearest
    /// character boundary rather than splitting a UTF-8 sequence.
    pub fn truncated(&self, max_len: usize) -> &[u8] {
        &self.0[..safe_cut(&self.0, max_len)]
    }

    /// Split into chunks of at most `max_len` bytes each, all non-empty,
    /// concatenating back to the original content.
    pub fn split(&self, max_len: usize) -> Result<Vec<Vec<u8>>, SplitError> {
        utf8_split(&self.0, max_len)
    }
}

/// Truncate `data` to at most `max_len` bytes without splitting a UTF-8
/// character.
pub fn truncate(data: &[u8], max_len: usize) -> &[u8] {
    &data[..safe_cut(data, max_len)]
}

/// Split `data` into chunks of at most `max_len` bytes, each non-empty and
/// landing on a character boundary. Fails if `max_len` is too small to make
/// progress (a single character exceeds it).
pub fn utf8_split(data: &[u8], max_len: usize) -> Result<Vec<Vec<u8>>, SplitError> {
    let mut chunks = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        let n = safe_cut(rest, max_len);
        if n == 0 {
            return Err(SplitError(max_len));
        }
        chunks.push(rest[..n].to_vec());
        rest = &rest[n..];
    }
    Ok(chunks)
}
