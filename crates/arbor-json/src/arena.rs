//! Slab value pool with a free-list
//!
//! Parsed JSON produces many nodes of one uniform size, so the pool hands out
//! fixed-size slots from blocks instead of allocating each node on its own.
//! Released slots are threaded onto a singly linked free-list that spans all
//! blocks; blocks themselves are only returned to the system allocator by
//! [`ValuePool::reset`].
//!
//! Handles are generation-scoped: a slot's generation is bumped every time it
//! is released and the pool's epoch is bumped on every reset, so a stale
//! [`ValueId`] resolves to nothing instead of aliasing a reused slot.

use std::fmt;

use smallvec::{SmallVec, smallvec};
use tracing::{debug, trace, warn};

use crate::config::PoolConfig;
use crate::error::{Error, Result};

/// Handle to one slot of a [`ValuePool`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ValueId {
    epoch: u32,
    block: u32,
    slot: u32,
    generation: u32,
}

impl ValueId {
    /// Generation of the slot when this handle was issued
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Pool epoch when this handle was issued
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    fn index(&self) -> SlotIndex {
        SlotIndex {
            block: self.block,
            slot: self.slot,
        }
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ValueId(epoch={}, block={}, slot={}, gen={})",
            self.epoch, self.block, self.slot, self.generation
        )
    }
}

/// Payload stored in an occupied slot
///
/// Containers own their children through handles into the same pool.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<ValueId>),
    Object(Vec<(String, ValueId)>),
}

impl Node {
    /// Handles of direct children, in order
    pub(crate) fn children(&self) -> impl Iterator<Item = ValueId> + '_ {
        let items: &[ValueId] = match self {
            Node::Array(items) => items,
            _ => &[],
        };
        let entries: &[(String, ValueId)] = match self {
            Node::Object(entries) => entries,
            _ => &[],
        };
        items.iter().copied().chain(entries.iter().map(|(_, id)| *id))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SlotIndex {
    block: u32,
    slot: u32,
}

#[derive(Debug)]
enum SlotState {
    Vacant { next: Option<SlotIndex> },
    Occupied(Node),
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    state: SlotState,
}

#[derive(Debug)]
struct Block {
    slots: Vec<Slot>,
}

/// Snapshot of pool health for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of allocated blocks
    pub total_blocks: usize,
    /// Slots across all blocks
    pub block_capacity: usize,
    /// Slots currently on the free-list
    pub free_count: usize,
    /// Size of the block the next growth will allocate
    pub next_block_size: usize,
}

impl PoolStats {
    /// Slots currently holding a value
    pub fn live_count(&self) -> usize {
        self.block_capacity - self.free_count
    }

    /// Fraction of capacity in use (0.0 for an empty pool)
    pub fn utilization(&self) -> f64 {
        if self.block_capacity == 0 {
            0.0
        } else {
            self.live_count() as f64 / self.block_capacity as f64
        }
    }
}

/// Growable slab allocator for parsed values
///
/// The pool is an explicit value owned by whoever drives parsing. Every
/// mutation takes `&mut self`; independent pools can be used from different
/// threads.
#[derive(Debug)]
pub struct ValuePool {
    blocks: Vec<Block>,
    free_head: Option<SlotIndex>,
    capacity: usize,
    next_block_size: usize,
    epoch: u32,
    config: PoolConfig,
}

impl ValuePool {
    /// Create an empty pool with default sizing; no memory is allocated yet
    pub fn new() -> Self {
        Self::from_valid_config(PoolConfig::default())
    }

    /// Create an empty pool with custom sizing
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: PoolConfig) -> Self {
        Self {
            blocks: Vec::new(),
            free_head: None,
            capacity: 0,
            next_block_size: config.initial_block_size,
            epoch: 0,
            config,
        }
    }

    /// Pool sizing in effect
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Take a slot from the free-list, growing the pool if it is empty.
    ///
    /// The slot starts out holding `null`.
    pub fn acquire(&mut self) -> Result<ValueId> {
        if self.free_head.is_none() {
            self.grow()?;
        }
        let index = self
            .free_head
            .ok_or_else(|| Error::memory("value pool has no free slot after growth"))?;
        let epoch = self.epoch;
        let slot = self
            .slot_at_mut(index)
            .ok_or_else(|| Error::other("free-list points outside the pool"))?;
        let next = match &slot.state {
            SlotState::Vacant { next } => *next,
            SlotState::Occupied(_) => return Err(Error::other("free-list points at a live slot")),
        };
        slot.state = SlotState::Occupied(Node::Null);
        let generation = slot.generation;
        self.free_head = next;
        Ok(ValueId {
            epoch,
            block: index.block,
            slot: index.slot,
            generation,
        })
    }

    /// Return a slot to the free-list.
    ///
    /// The slot's own payload is dropped but its children are not visited;
    /// release them first (or use [`ValuePool::destroy_subtree`]) or their
    /// slots stay occupied until [`ValuePool::reset`]. Returns `false` for a
    /// stale or already released handle.
    pub fn release(&mut self, id: ValueId) -> bool {
        self.take_node(id).is_some()
    }

    /// Release a value and everything below it; returns the number of slots freed.
    ///
    /// Stale handles free nothing, so releasing the same tree twice is harmless.
    pub fn destroy_subtree(&mut self, root: ValueId) -> usize {
        let mut pending: SmallVec<[ValueId; 32]> = smallvec![root];
        let mut released = 0;
        while let Some(id) = pending.pop() {
            let Some(node) = self.take_node(id) else {
                continue;
            };
            match node {
                Node::Array(items) => pending.extend(items),
                Node::Object(entries) => pending.extend(entries.into_iter().map(|(_, child)| child)),
                _ => {}
            }
            released += 1;
        }
        released
    }

    /// Whether the handle still refers to a live slot
    pub fn contains(&self, id: ValueId) -> bool {
        self.node(id).is_some()
    }

    /// Walk blocks and free-list and report counts
    pub fn stats(&self) -> PoolStats {
        let mut free_count = 0;
        let mut cursor = self.free_head;
        while let Some(index) = cursor {
            free_count += 1;
            cursor = match self.slot_at(index).map(|slot| &slot.state) {
                Some(SlotState::Vacant { next }) => *next,
                _ => None,
            };
        }
        PoolStats {
            total_blocks: self.blocks.len(),
            block_capacity: self.blocks.iter().map(|block| block.slots.len()).sum(),
            free_count,
            next_block_size: self.next_block_size,
        }
    }

    /// Release every block and restart growth from the initial block size.
    ///
    /// All handles issued before the reset become stale.
    pub fn reset(&mut self) {
        let released_blocks = self.blocks.len();
        self.blocks = Vec::new();
        self.free_head = None;
        self.capacity = 0;
        self.next_block_size = self.config.initial_block_size;
        self.epoch = self.epoch.wrapping_add(1);
        debug!(released_blocks, epoch = self.epoch, "value pool reset");
    }

    pub(crate) fn node(&self, id: ValueId) -> Option<&Node> {
        if id.epoch != self.epoch {
            return None;
        }
        let slot = self.slot_at(id.index())?;
        match &slot.state {
            SlotState::Occupied(node) if slot.generation == id.generation => Some(node),
            _ => None,
        }
    }

    pub(crate) fn node_mut(&mut self, id: ValueId) -> Option<&mut Node> {
        if id.epoch != self.epoch {
            return None;
        }
        let slot = self.slot_at_mut(id.index())?;
        match &mut slot.state {
            SlotState::Occupied(node) if slot.generation == id.generation => Some(node),
            _ => None,
        }
    }

    /// Vacate a slot and hand back the payload it held
    pub(crate) fn take_node(&mut self, id: ValueId) -> Option<Node> {
        self.node(id)?;
        let head = self.free_head;
        let slot = self.slot_at_mut(id.index())?;
        let state = std::mem::replace(&mut slot.state, SlotState::Vacant { next: head });
        slot.generation = slot.generation.wrapping_add(1);
        self.free_head = Some(id.index());
        match state {
            SlotState::Occupied(node) => Some(node),
            SlotState::Vacant { .. } => None,
        }
    }

    fn slot_at(&self, index: SlotIndex) -> Option<&Slot> {
        self.blocks
            .get(index.block as usize)?
            .slots
            .get(index.slot as usize)
    }

    fn slot_at_mut(&mut self, index: SlotIndex) -> Option<&mut Slot> {
        self.blocks
            .get_mut(index.block as usize)?
            .slots
            .get_mut(index.slot as usize)
    }

    /// Allocate one block at the current growth step and thread it onto the free-list
    fn grow(&mut self) -> Result<()> {
        let mut count = self.next_block_size;
        if let Some(max_slots) = self.config.max_slots {
            let room = max_slots.saturating_sub(self.capacity);
            if room == 0 {
                warn!(
                    capacity = self.capacity,
                    max_slots, "value pool refused to grow past its slot cap"
                );
                return Err(Error::memory(format!(
                    "value pool is at its cap of {max_slots} slots"
                )));
            }
            count = count.min(room);
        }

        let block = u32::try_from(self.blocks.len())
            .map_err(|_| Error::memory("value pool block count overflow"))?;
        let last = u32::try_from(count)
            .map_err(|_| Error::memory(format!("block of {count} slots is too large")))?;

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(count)
            .map_err(|e| Error::memory(format!("failed to allocate block of {count} slots: {e}")))?;
        self.blocks
            .try_reserve(1)
            .map_err(|e| Error::memory(format!("failed to grow block list: {e}")))?;

        let tail = self.free_head;
        slots.extend((1..=last).map(|next| Slot {
            generation: 0,
            state: SlotState::Vacant {
                next: if next < last {
                    Some(SlotIndex { block, slot: next })
                } else {
                    tail
                },
            },
        }));
        self.blocks.push(Block { slots });
        self.free_head = Some(SlotIndex { block, slot: 0 });
        self.capacity += count;

        self.next_block_size = self
            .next_block_size
            .saturating_mul(2)
            .min(self.config.max_block_size);
        debug!(
            block_size = count,
            total_blocks = self.blocks.len(),
            capacity = self.capacity,
            "value pool grew"
        );
        trace!(next_block_size = self.next_block_size, "value pool growth step");
        Ok(())
    }
}

impl Default for ValuePool {
    fn default() -> Self {
        Self::new()
    }
}
