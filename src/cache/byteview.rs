//! Immutable view over a cached value

use bytes::Bytes;
use std::fmt;

use crate::cache::lru::CacheValue;

/// Immutable snapshot of a value's bytes.
///
/// The buffer is copied in on construction and never handed out mutably;
/// clones share the same allocation.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteView {
    b: Bytes,
}

impl ByteView {
    /// Copy `data` into a new view
    pub fn new(data: &[u8]) -> Self {
        Self {
            b: Bytes::copy_from_slice(data),
        }
    }

    pub fn len(&self) -> usize {
        self.b.len()
    }

    pub fn is_empty(&self) -> bool {
        self.b.is_empty()
    }

    /// Fresh copy of the bytes; mutating it never affects the view
    pub fn to_vec(&self) -> Vec<u8> {
        self.b.to_vec()
    }

    /// Shared read-only handle, cheap to hand to a response body
    pub fn bytes(&self) -> Bytes {
        self.b.clone()
    }
}

impl From<Vec<u8>> for ByteView {
    /// Takes ownership without copying; nobody else can reach the vector.
    fn from(v: Vec<u8>) -> Self {
        Self { b: Bytes::from(v) }
    }
}

impl From<&str> for ByteView {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl CacheValue for ByteView {
    fn size(&self) -> usize {
        self.len()
    }
}

impl fmt::Display for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.b))
    }
}

impl fmt::Debug for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteView({:?})", self.b)
    }
}
