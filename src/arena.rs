//! Arena storage for registry-owned sorts.
//!
//! Provides `SortId` (a registry-qualified, total-orderable handle) and
//! `Arena` (contiguous storage with free-list reuse). Rolled-back sorts free
//! their slot; the next allocation reuses the most recently freed slot under
//! a new generation, so handles to the freed sort stop resolving.
//!
//! # Determinism
//! - `SortId` ordering is by registry, then slot index, then generation.
//! - Freed slots are reused last-in, first-out.
//! - A slot's generation increases every time it is freed.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Identity of one registry instance.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegistryId(u32);

static NEXT_REGISTRY: AtomicU32 = AtomicU32::new(1);

impl RegistryId {
    /// Allocates a process-unique registry id.
    pub fn fresh() -> Self {
        Self(NEXT_REGISTRY.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

/// Handle of a sort: the owning registry plus the arena slot.
///
/// `SortId` is `Copy`. Once its sort is rolled back the handle never
/// resolves again, even after the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SortId {
    registry: RegistryId,
    slot: u32,
    generation: u32,
}

impl SortId {
    #[inline]
    pub(crate) const fn new(registry: RegistryId, slot: u32, generation: u32) -> Self {
        Self {
            registry,
            slot,
            generation,
        }
    }

    #[inline]
    pub const fn registry(&self) -> RegistryId {
        self.registry
    }

    #[inline]
    pub const fn slot(&self) -> u32 {
        self.slot
    }

    #[inline]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for SortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "SortId({}:{})", self.registry.0, self.slot)
        } else {
            write!(f, "SortId({}:{}#{})", self.registry.0, self.slot, self.generation)
        }
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    data: Option<T>,
    generation: u32,
    next_free: Option<u32>,
}

/// Contiguous storage with free-list reuse.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_list_head: Option<u32>,
    /// Number of live slots (slots with `data.is_some()`).
    live_count: usize,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list_head: None,
            live_count: 0,
        }
    }

    /// Slot index and generation the next `allocate` call will return.
    pub fn next_slot(&self) -> (u32, u32) {
        match self.free_list_head {
            Some(idx) => (idx, self.slots[idx as usize].generation),
            None => (self.slots.len() as u32, 0),
        }
    }

    /// Stores `data` and returns its slot index and generation.
    ///
    /// Reuses the most recently freed slot when there is one.
    pub fn allocate(&mut self, data: T) -> (u32, u32) {
        self.live_count += 1;
        if let Some(idx) = self.free_list_head {
            let slot = &mut self.slots[idx as usize];
            debug_assert!(slot.data.is_none(), "free slot should have no data");
            self.free_list_head = slot.next_free;
            slot.data = Some(data);
            slot.next_free = None;
            (idx, slot.generation)
        } else {
            let idx = self.slots.len() as u32;
            self.slots.push(Slot {
                data: Some(data),
                generation: 0,
                next_free: None,
            });
            (idx, 0)
        }
    }

    /// Frees the slot if `generation` is current, returning its data.
    pub fn deallocate(&mut self, idx: u32, generation: u32) -> Option<T> {
        let slot = self.slots.get_mut(idx as usize)?;
        if slot.generation != generation {
            return None;
        }
        let data = slot.data.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        slot.next_free = self.free_list_head;
        self.free_list_head = Some(idx);
        self.live_count -= 1;
        Some(data)
    }

    pub fn get(&self, idx: u32, generation: u32) -> Option<&T> {
        self.slots
            .get(idx as usize)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.data.as_ref())
    }

    pub fn get_mut(&mut self, idx: u32, generation: u32) -> Option<&mut T> {
        self.slots
            .get_mut(idx as usize)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.data.as_mut())
    }

    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// Drops every slot.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_list_head = None;
        self.live_count = 0;
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}
