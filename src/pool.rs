//! Fixed-capacity particle slots.
//!
//! Every effect in the engine (rain drops, splash decals) lives in a
//! [`ParticlePool`]. The pool is allocated once and never grows: dead slots
//! are kept on a free list and handed out again, and when nothing is free the
//! oldest live slot is recycled instead of failing.
//!
//! Slot indices are stable for the lifetime of the pool, so a renderer can map
//! index `i` to one visual proxy and never rebuild it.
//!
//! # Example
//!
//! ```
//! use squall::pool::ParticlePool;
//!
//! let mut pool: ParticlePool<f32> = ParticlePool::new(2);
//! let a = pool.insert(1.0).unwrap();
//! let b = pool.insert(2.0).unwrap();
//! assert!(!a.recycled && !b.recycled);
//!
//! // Full: the oldest slot is handed out again.
//! let c = pool.insert(3.0).unwrap();
//! assert!(c.recycled);
//! assert_eq!(c.index, a.index);
//! assert_eq!(pool.active_count(), 2);
//! ```

/// One unit of pool capacity.
#[derive(Clone, Debug, Default)]
struct Slot<T> {
    active: bool,
    /// Birth stamp, used to find the oldest slot when recycling.
    born: u64,
    payload: T,
}

/// Result of a successful [`ParticlePool::acquire`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Acquired {
    /// Slot index, stable for the pool's lifetime.
    pub index: usize,
    /// `true` if a live particle was evicted to make room.
    pub recycled: bool,
}

/// Fixed-capacity slot allocator with a free list.
#[derive(Clone, Debug)]
pub struct ParticlePool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    active: usize,
    births: u64,
}

impl<T: Default> ParticlePool<T> {
    /// Allocate a pool with `capacity` slots, all free.
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, Slot::default);
        // Reversed so that slot 0 is handed out first.
        let free = (0..capacity).rev().collect();
        Self {
            slots,
            free,
            active: 0,
            births: 0,
        }
    }
}

impl<T> ParticlePool<T> {
    /// Total number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live slots.
    #[inline]
    pub fn active_count(&self) -> usize {
        self.active
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    /// Whether slot `index` currently holds a live particle.
    #[inline]
    pub fn is_active(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|s| s.active)
    }

    /// Claim a slot.
    ///
    /// Pops the free list first. When the pool is exhausted the oldest live
    /// slot is recycled and reported with `recycled = true`. Returns `None`
    /// only for a zero-capacity pool.
    ///
    /// The payload of the returned slot is whatever the previous occupant
    /// left behind; callers overwrite it through [`get_mut`](Self::get_mut).
    pub fn acquire(&mut self) -> Option<Acquired> {
        let stamp = self.births;
        self.births += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.active = true;
            slot.born = stamp;
            self.active += 1;
            return Some(Acquired {
                index,
                recycled: false,
            });
        }

        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .filter(|(_, s)| s.active)
            .min_by_key(|(_, s)| s.born)?;
        slot.born = stamp;
        log::trace!("pool exhausted, recycling slot {}", index);
        Some(Acquired {
            index,
            recycled: true,
        })
    }

    /// Claim a slot and store `payload` in it.
    pub fn insert(&mut self, payload: T) -> Option<Acquired> {
        let acquired = self.acquire()?;
        self.slots[acquired.index].payload = payload;
        Some(acquired)
    }

    /// Free slot `index`. Returns `false` if it was not live.
    pub fn release(&mut self, index: usize) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if slot.active => {
                slot.active = false;
                self.free.push(index);
                self.active -= 1;
                true
            }
            _ => false,
        }
    }

    /// Payload of a live slot.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots
            .get(index)
            .filter(|s| s.active)
            .map(|s| &s.payload)
    }

    /// Mutable payload of a live slot.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots
            .get_mut(index)
            .filter(|s| s.active)
            .map(|s| &mut s.payload)
    }

    /// Iterate live slots as `(index, payload)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(i, s)| (i, &s.payload))
    }

    /// Iterate every slot in index order, `None` for free ones.
    pub fn slots(&self) -> impl Iterator<Item = Option<&T>> {
        self.slots
            .iter()
            .map(|s| if s.active { Some(&s.payload) } else { None })
    }

    /// Visit every live slot; slots for which `keep` returns `false` are
    /// released in the same pass. Returns the number released.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(usize, &mut T) -> bool,
    {
        let mut released = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.active && !keep(index, &mut slot.payload) {
                slot.active = false;
                self.free.push(index);
                released += 1;
            }
        }
        self.active -= released;
        released
    }

    /// Release live slots until at most `limit` remain.
    ///
    /// No ordering guarantee on which slots go.
    pub fn release_excess(&mut self, limit: usize) -> usize {
        let mut excess = self.active.saturating_sub(limit);
        if excess == 0 {
            return 0;
        }
        self.retain(|_, _| {
            if excess > 0 {
                excess -= 1;
                false
            } else {
                true
            }
        })
    }

    /// Release every slot.
    pub fn clear(&mut self) {
        self.retain(|_, _| false);
    }
}
