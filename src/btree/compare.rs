//! Key ordering seam.
//!
//! The tree is generic over a comparator so callers can index opaque binary
//! keys under an order other than their byte order (host-endian flow hashes,
//! masked addresses, and similar). `DefaultComparator` covers the common
//! case where the key type's own `Ord` is the intended order.

use std::cmp::Ordering;

/// Total order over keys of type `K`.
pub trait Comparator<K> {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// Orders keys by their natural `Ord` implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultComparator;

impl<K: Ord> Comparator<K> for DefaultComparator {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}
