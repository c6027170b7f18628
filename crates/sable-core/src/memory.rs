//! Allocation seam.
//!
//! Every allocation, growth, shrink and release of chunk or pool storage goes
//! through [`reallocate`]. The seam keeps per-thread heap accounting
//! ([`HeapStats`]) and forwards each request to an optional [`AllocHook`]
//! before the storage is granted, which is where a collector plugs in its
//! heap-pressure checks.
//!
//! Blocks are boxed slices. The empty slice is the absent handle: it owns no
//! heap memory, so `old_size == 0` always means "fresh allocation".

use core::{fmt, mem};
use std::alloc::{handle_alloc_error, Layout};
use std::cell::{Cell, RefCell};

/// Capacity of the first allocation made by a growable array.
pub const MIN_CAPACITY: usize = 8;

/// Growth policy shared by every growable array: 8 first, then doubling.
#[must_use]
pub const fn grow_capacity(capacity: usize) -> usize {
    if capacity < MIN_CAPACITY {
        MIN_CAPACITY
    } else {
        capacity.saturating_mul(2)
    }
}

/* ─────────────────────────── Événements ─────────────────────────── */

/// What a single call to [`reallocate`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum AllocKind {
    /// `0 -> n`: fresh allocation.
    Allocate,
    /// `n -> m`, `m > n > 0`.
    Grow,
    /// `n -> m`, `0 < m < n`.
    Shrink,
    /// `n -> 0`.
    Free,
}

/// Sizes (in bytes) of one request made to the seam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AllocEvent {
    /// Caller-tracked size before the request.
    pub old_size: usize,
    /// Requested size.
    pub new_size: usize,
}

impl AllocEvent {
    /// Classify the request; `None` when sizes are equal (nothing to do).
    pub const fn kind(&self) -> Option<AllocKind> {
        match (self.old_size, self.new_size) {
            (old, new) if old == new => None,
            (0, _) => Some(AllocKind::Allocate),
            (_, 0) => Some(AllocKind::Free),
            (old, new) if new > old => Some(AllocKind::Grow),
            _ => Some(AllocKind::Shrink),
        }
    }

    /// Signed byte delta applied to the live heap.
    pub const fn delta(&self) -> isize {
        self.new_size as isize - self.old_size as isize
    }
}

/* ─────────────────────────── Comptabilité ─────────────────────────── */

/// Heap accounting for the current thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HeapStats {
    /// Live bytes handed out by the seam.
    pub bytes_allocated: usize,
    /// High-water mark of `bytes_allocated`.
    pub peak_bytes: usize,
    /// Fresh allocations (`0 -> n`).
    pub allocations: u64,
    /// In-place growths (`n -> m`, `m > n`).
    pub grows: u64,
    /// Shrinks (`n -> m`, `0 < m < n`).
    pub shrinks: u64,
    /// Releases (`n -> 0`).
    pub frees: u64,
}

impl HeapStats {
    /// All counters at zero.
    pub const fn new() -> Self {
        Self { bytes_allocated: 0, peak_bytes: 0, allocations: 0, grows: 0, shrinks: 0, frees: 0 }
    }

    /// Number of requests that enlarged a block (fresh allocations included).
    pub const fn growth_events(&self) -> u64 { self.allocations + self.grows }

    /// Blocks currently alive.
    pub const fn live_blocks(&self) -> u64 { self.allocations.saturating_sub(self.frees) }

    fn apply(&mut self, event: AllocEvent, kind: AllocKind) {
        self.bytes_allocated = self
            .bytes_allocated
            .saturating_sub(event.old_size)
            .saturating_add(event.new_size);
        self.peak_bytes = self.peak_bytes.max(self.bytes_allocated);
        match kind {
            AllocKind::Allocate => self.allocations += 1,
            AllocKind::Grow => self.grows += 1,
            AllocKind::Shrink => self.shrinks += 1,
            AllocKind::Free => self.frees += 1,
        }
    }
}

impl fmt::Display for HeapStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "live={}B peak={}B alloc={} grow={} shrink={} free={}",
            self.bytes_allocated, self.peak_bytes, self.allocations, self.grows, self.shrinks, self.frees
        )
    }
}

/// Interposition point consulted by the seam before a request is served.
///
/// Hooks run with the hook slot vacated: storage they allocate themselves is
/// accounted but not reported back to them.
pub trait AllocHook {
    /// Called once per effective request, after accounting was updated.
    fn on_reallocate(&mut self, event: AllocEvent, stats: &HeapStats);
}

thread_local! {
    static STATS: Cell<HeapStats> = const { Cell::new(HeapStats::new()) };
    static HOOK: RefCell<Option<Box<dyn AllocHook>>> = const { RefCell::new(None) };
}

/// Snapshot of the current thread's heap accounting.
pub fn stats() -> HeapStats {
    STATS.try_with(Cell::get).unwrap_or_default()
}

/// Zero the current thread's counters (live bytes included).
pub fn reset_stats() {
    let _ = STATS.try_with(|cell| cell.set(HeapStats::new()));
}

/// Install `hook` for the current thread, returning the previous one.
pub fn install_hook(hook: Box<dyn AllocHook>) -> Option<Box<dyn AllocHook>> {
    HOOK.with(|slot| slot.borrow_mut().replace(hook))
}

/// Remove and return the current thread's hook.
pub fn take_hook() -> Option<Box<dyn AllocHook>> {
    HOOK.try_with(|slot| slot.borrow_mut().take()).ok().flatten()
}

fn record(event: AllocEvent, kind: AllocKind) -> HeapStats {
    STATS
        .try_with(|cell| {
            let mut stats = cell.get();
            stats.apply(event, kind);
            cell.set(stats);
            stats
        })
        .unwrap_or_default()
}

fn notify(event: AllocEvent, stats: &HeapStats) {
    let Some(mut hook) = take_hook() else { return };
    hook.on_reallocate(event, stats);
    let _ = HOOK.try_with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_none() {
            *slot = Some(hook);
        }
    });
}

/* ─────────────────────────── Le point unique ─────────────────────────── */

/// Resize `block` from `old_size` to `new_size` bytes.
///
/// - `new_size == 0` releases the block and returns the empty handle.
/// - `old_size == 0` (empty `block`) allocates fresh storage.
/// - otherwise contents up to `min(old_size, new_size)` are preserved and the
///   new tail is default-initialized.
///
/// A non-zero request that cannot be satisfied aborts through
/// [`handle_alloc_error`].
///
/// # Panics
///
/// When `old_size` is not the byte size of `block`, or when `new_size` is not
/// a multiple of the element size. Both are checked before any accounting.
pub fn reallocate<T: Copy + Default>(block: Box<[T]>, old_size: usize, new_size: usize) -> Box<[T]> {
    let elem = mem::size_of::<T>().max(1);
    assert_eq!(block.len() * elem, old_size, "caller-tracked size out of sync with block");
    assert!(
        new_size % elem == 0,
        "requested {new_size} bytes, not a whole number of {elem}-byte elements"
    );

    let event = AllocEvent { old_size, new_size };
    let Some(kind) = event.kind() else { return block };

    let stats = record(event, kind);
    notify(event, &stats);

    #[cfg(feature = "tracing")]
    tracing::trace!(target: "sable::memory", ?kind, old_size, new_size, live = stats.bytes_allocated, "reallocate");

    if kind == AllocKind::Free {
        drop(block);
        return Box::default();
    }

    let new_len = new_size / elem;
    let mut data = block.into_vec();
    if new_len > data.len() {
        if data.try_reserve_exact(new_len - data.len()).is_err() {
            out_of_memory::<T>(new_size);
        }
        data.resize(new_len, T::default());
    } else {
        data.truncate(new_len);
    }
    data.into_boxed_slice()
}

/// Byte size of `count` elements of `T`; overflow is fatal.
pub fn array_bytes<T>(count: usize) -> usize {
    match count.checked_mul(mem::size_of::<T>()) {
        Some(bytes) => bytes,
        None => panic!("capacity overflow: {count} elements of {} bytes", mem::size_of::<T>()),
    }
}

/// Resize an array block from `old_count` to `new_count` elements.
pub fn grow_array<T: Copy + Default>(block: Box<[T]>, old_count: usize, new_count: usize) -> Box<[T]> {
    reallocate(block, array_bytes::<T>(old_count), array_bytes::<T>(new_count))
}

/// Release an array block of `old_count` elements.
pub fn free_array<T: Copy + Default>(block: Box<[T]>, old_count: usize) -> Box<[T]> {
    reallocate(block, array_bytes::<T>(old_count), 0)
}

fn out_of_memory<T>(size: usize) -> ! {
    let layout = Layout::from_size_align(size, mem::align_of::<T>()).unwrap_or_else(|_| Layout::new::<T>());
    handle_alloc_error(layout)
}

/* ─────────────────────────── Tests ─────────────────────────── */
