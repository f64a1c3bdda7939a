//! Fixed-capacity LRU cache of decoded tablebase blocks.
//!
//! Slots live in an arena and the recency list links them by slot index, so
//! eviction never chases references. The head is the most recently used slot
//! and the tail is the next eviction candidate.

use std::collections::HashMap;
use std::io;

use crate::constants::BLOCK_SIZE;

pub type Block = [u8; BLOCK_SIZE];

struct Slot {
    id: Option<u64>,
    data: Box<Block>,
    prev: Option<usize>,
    next: Option<usize>,
}

impl Slot {
    fn new() -> Self {
        Self {
            id: None,
            data: Box::new([0; BLOCK_SIZE]),
            prev: None,
            next: None,
        }
    }
}

pub struct BlockCache {
    slots: Vec<Slot>,
    capacity: usize,
    resident: HashMap<u64, usize>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl BlockCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::new(),
            capacity,
            resident: HashMap::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.resident.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resident.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub fn contains(&self, id: u64) -> bool {
        self.resident.contains_key(&id)
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Returns the block `id`, calling `load` to fill a slot only on a miss.
    /// A failed load leaves nothing resident for `id`.
    pub fn resolve<F>(&mut self, id: u64, load: F) -> io::Result<&Block>
    where
        F: FnOnce(&mut Block) -> io::Result<()>,
    {
        if let Some(&slot) = self.resident.get(&id) {
            self.hits += 1;
            self.unlink(slot);
            self.push_front(slot);
            return Ok(&*self.slots[slot].data);
        }

        self.misses += 1;
        let slot = self.take_slot();
        self.fill(slot, id, load)?;
        Ok(&*self.slots[slot].data)
    }

    /// Inserts a block ahead of any lookup. Returns `false` when the cache is
    /// already full or the block is resident.
    pub fn preload<F>(&mut self, id: u64, load: F) -> io::Result<bool>
    where
        F: FnOnce(&mut Block) -> io::Result<()>,
    {
        if self.is_full() || self.contains(id) {
            return Ok(false);
        }
        let slot = self.take_slot();
        self.fill(slot, id, load)?;
        Ok(true)
    }

    /// Resident block ids from most to least recently used.
    pub fn recency(&self) -> Vec<u64> {
        let mut order = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            if let Some(id) = self.slots[slot].id {
                order.push(id);
            }
            cursor = self.slots[slot].next;
        }
        order
    }

    fn fill<F>(&mut self, slot: usize, id: u64, load: F) -> io::Result<()>
    where
        F: FnOnce(&mut Block) -> io::Result<()>,
    {
        if let Err(err) = load(&mut self.slots[slot].data) {
            self.free.push(slot);
            return Err(err);
        }
        self.slots[slot].id = Some(id);
        self.resident.insert(id, slot);
        self.push_front(slot);
        Ok(())
    }

    /// A detached slot: a freed one, a new one while below capacity, or the evicted tail.
    fn take_slot(&mut self) -> usize {
        if let Some(slot) = self.free.pop() {
            return slot;
        }
        if self.slots.len() < self.capacity {
            self.slots.push(Slot::new());
            return self.slots.len() - 1;
        }
        match self.tail {
            Some(slot) => {
                self.unlink(slot);
                if let Some(old) = self.slots[slot].id.take() {
                    self.resident.remove(&old);
                }
                self.evictions += 1;
                slot
            }
            None => {
                self.slots.push(Slot::new());
                self.slots.len() - 1
            }
        }
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = (self.slots[slot].prev, self.slots[slot].next);
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }
        self.slots[slot].prev = None;
        self.slots[slot].next = None;
    }

    fn push_front(&mut self, slot: usize) {
        self.slots[slot].prev = None;
        self.slots[slot].next = self.head;
        if let Some(h) = self.head {
            self.slots[h].prev = Some(slot);
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }
}
