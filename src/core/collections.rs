//! Collection aliases used throughout the triangulation and the refinement loop.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::core::triangulation::{TriangleKey, VertexKey};

#[cfg(not(feature = "dense-slotmap"))]
use slotmap::SlotMap;

#[cfg(feature = "dense-slotmap")]
use slotmap::DenseSlotMap;

use slotmap::SecondaryMap;

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Arena backing vertices and triangles.
///
/// Keys stay valid until their element is removed; a removed key never
/// resolves again even after its slot is reused.
///
/// # Feature Flags
///
/// - **default**: `DenseSlotMap` (via the default `dense-slotmap` feature)
/// - **--no-default-features**: `SlotMap`
#[cfg(not(feature = "dense-slotmap"))]
pub type StorageMap<K, V> = SlotMap<K, V>;

#[cfg(feature = "dense-slotmap")]
pub type StorageMap<K, V> = DenseSlotMap<K, V>;

// =============================================================================
// HASHING
// =============================================================================

/// `HashMap` with the non-cryptographic `FxHasher`.
///
/// ⚠️ Not DoS-resistant; used only with internal keys.
///
/// # Examples
///
/// ```rust
/// use terra_tin::core::collections::FastHashMap;
///
/// let mut map: FastHashMap<u64, usize> = FastHashMap::default();
/// map.insert(123, 456);
/// ```
pub type FastHashMap<K, V> = FxHashMap<K, V>;

/// `HashSet` with the non-cryptographic `FxHasher`.
pub type FastHashSet<T> = FxHashSet<T>;

// =============================================================================
// SMALL BUFFERS
// =============================================================================

/// Stack-first vector for short, hot-path collections.
pub type SmallBuffer<T, const N: usize> = SmallVec<[T; N]>;

/// An insertion destroys at most two triangles and creates at most four
/// before legalization; flips rarely touch more than a dozen.
pub const INSERTION_BUFFER_SIZE: usize = 16;

/// Triangle keys touched by a single insertion.
pub type TriangleKeyBuffer = SmallBuffer<TriangleKey, INSERTION_BUFFER_SIZE>;

/// Dense per-triangle side data that follows arena generations.
///
/// Lookups with a key whose triangle was removed return `None`.
pub type TriangleSecondaryMap<V> = SecondaryMap<TriangleKey, V>;

/// Dense per-vertex side data.
pub type VertexSecondaryMap<V> = SecondaryMap<VertexKey, V>;

/// Creates a [`FastHashSet`] with pre-allocated capacity.
#[must_use]
pub fn fast_hash_set_with_capacity<T>(capacity: usize) -> FastHashSet<T> {
    FastHashSet::with_capacity_and_hasher(capacity, rustc_hash::FxBuildHasher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_buffer_stays_inline_for_typical_insertions() {
        let mut buffer = TriangleKeyBuffer::new();
        for _ in 0..INSERTION_BUFFER_SIZE {
            buffer.push(TriangleKey::default());
        }
        assert!(!buffer.spilled());
        buffer.push(TriangleKey::default());
        assert!(buffer.spilled());
    }

    #[test]
    fn capacity_helper_preallocates() {
        let set: FastHashSet<u32> = fast_hash_set_with_capacity(64);
        assert!(set.capacity() >= 64);
    }
}
