//! Growable array whose storage is managed exclusively by the allocation seam.

use core::{fmt, slice};

use crate::memory::{free_array, grow_array, grow_capacity};

/// Append-only dynamic array (`count ≤ capacity`).
///
/// Capacity follows [`grow_capacity`]; nothing is allocated before the first
/// push, and storage only shrinks back to zero through [`DynArray::free`] or
/// drop. `T` must not be zero-sized ([`DynArray::new`] refuses it).
pub struct DynArray<T: Copy + Default> {
    data: Box<[T]>,
    count: usize,
}

impl<T: Copy + Default> DynArray<T> {
    /// Empty array, no storage.
    ///
    /// # Panics
    ///
    /// When `T` is zero-sized: the seam would account its storage as zero bytes.
    pub fn new() -> Self {
        assert!(core::mem::size_of::<T>() != 0, "DynArray does not support zero-sized element types");
        Self { data: Box::default(), count: 0 }
    }

    /// Used slots.
    pub fn len(&self) -> usize { self.count }

    /// Whether no slot is used.
    pub fn is_empty(&self) -> bool { self.count == 0 }

    /// Allocated slots.
    pub fn capacity(&self) -> usize { self.data.len() }

    /// Append `value`, growing first when full.
    pub fn push(&mut self, value: T) {
        let capacity = self.capacity();
        if self.count == capacity {
            let data = core::mem::take(&mut self.data);
            self.data = grow_array(data, capacity, grow_capacity(capacity));
        }
        self.data[self.count] = value;
        self.count += 1;
    }

    /// Element at `index`, if `index < len()`.
    pub fn get(&self, index: usize) -> Option<T> { self.as_slice().get(index).copied() }

    /// Used slots as a slice.
    pub fn as_slice(&self) -> &[T] { &self.data[..self.count] }

    /// Iterate over used slots.
    pub fn iter(&self) -> slice::Iter<'_, T> { self.as_slice().iter() }

    /// Release storage through the seam and return to the empty state.
    ///
    /// Freeing an empty array does nothing, so calling this twice is harmless.
    pub fn free(&mut self) {
        let capacity = self.capacity();
        let data = core::mem::take(&mut self.data);
        self.data = free_array(data, capacity);
        self.count = 0;
    }
}

impl<T: Copy + Default> Default for DynArray<T> {
    fn default() -> Self { Self::new() }
}

impl<T: Copy + Default> Drop for DynArray<T> {
    fn drop(&mut self) { self.free(); }
}

impl<T: Copy + Default + fmt::Debug> fmt::Debug for DynArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynArray")
            .field("count", &self.count)
            .field("capacity", &self.capacity())
            .field("items", &self.as_slice())
            .finish()
    }
}

impl<T: Copy + Default + PartialEq> PartialEq for DynArray<T> {
    fn eq(&self, other: &Self) -> bool { self.as_slice() == other.as_slice() }
}

impl<'a, T: Copy + Default> IntoIterator for &'a DynArray<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter { self.iter() }
}

impl<T: Copy + Default> Extend<T> for DynArray<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}
