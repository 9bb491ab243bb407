//! Cache of component model counts.
use std::mem::size_of;
use std::num::NonZeroU32;

use log::{debug, info, trace};
use num_bigint::BigUint;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::config::ComponentConfig;
use crate::pack::{PackedComponent, PackingScheme};
use crate::stack::StackLevel;

/// Handle of a cache entry.
///
/// Handles of evicted entries may be reused for new entries.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct CacheEntryId {
    slot: NonZeroU32,
}

impl CacheEntryId {
    fn from_slot(slot: usize) -> CacheEntryId {
        match NonZeroU32::new(slot as u32) {
            Some(slot) => CacheEntryId { slot },
            None => panic!("cache slot 0 is reserved"),
        }
    }

    fn slot(self) -> usize {
        self.slot.get() as usize
    }
}

/// A cached component and what is known about it.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    packed: PackedComponent,
    parent: Option<CacheEntryId>,
    creation_time: u64,
    model_count: Option<BigUint>,
    /// Bit 0 is set once no live component refers to this entry, the remaining bits hold the
    /// number of ticks between creation and solution.
    solution_period_and_flags: u64,
}

impl CacheEntry {
    pub fn packed(&self) -> &PackedComponent {
        &self.packed
    }

    /// Entry of the super-component this component was found in.
    pub fn parent(&self) -> Option<CacheEntryId> {
        self.parent
    }

    pub fn creation_time(&self) -> u64 {
        self.creation_time
    }

    pub fn model_count(&self) -> Option<&BigUint> {
        self.model_count.as_ref()
    }

    pub fn is_solved(&self) -> bool {
        self.model_count.is_some()
    }

    /// Ticks of the cache clock between creating and solving this entry.
    pub fn ticks_to_solve(&self) -> u64 {
        self.solution_period_and_flags >> 1
    }

    pub fn is_deletable(&self) -> bool {
        self.solution_period_and_flags & 1 != 0
    }

    pub fn set_deletable(&mut self) {
        self.solution_period_and_flags |= 1;
    }

    fn set_model_count(&mut self, count: BigUint, time: u64) {
        self.model_count = Some(count);
        self.solution_period_and_flags =
            (time - self.creation_time) << 1 | (self.solution_period_and_flags & 1);
    }

    /// Memory accounted for this entry.
    fn byte_size(&self) -> usize {
        let count_bytes = self
            .model_count
            .as_ref()
            .map(|count| ((count.bits() as usize + 63) / 64) * size_of::<u64>())
            .unwrap_or(0);
        size_of::<CacheEntry>() + size_of::<CacheEntryId>() + self.packed.byte_size() + count_bytes
    }
}

/// Counters of cache activity.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStatistics {
    pub lookups: u64,
    pub hits: u64,
    pub stored: u64,
    pub evicted: u64,
    /// Unsolved entries removed when their component was released.
    pub discarded: u64,
    pub bytes: usize,
}

/// Packed components with their model counts.
pub struct ComponentCache {
    scheme: PackingScheme,
    perform_caching: bool,
    max_bytes: usize,
    /// Slot 0 is never used.
    entries: Vec<Option<CacheEntry>>,
    free_slots: Vec<usize>,
    buckets: FxHashMap<u32, SmallVec<[CacheEntryId; 2]>>,
    /// Advances once per lookup.
    clock: u64,
    statistics: CacheStatistics,
}

impl Default for ComponentCache {
    fn default() -> ComponentCache {
        ComponentCache::new(PackingScheme::default(), &ComponentConfig::default())
    }
}

impl ComponentCache {
    /// Create an empty cache for components packed with the given scheme.
    pub fn new(scheme: PackingScheme, config: &ComponentConfig) -> ComponentCache {
        ComponentCache {
            scheme,
            perform_caching: config.perform_component_caching,
            max_bytes: config.cache_max_bytes,
            entries: vec![None],
            free_slots: vec![],
            buckets: FxHashMap::default(),
            clock: 0,
            statistics: CacheStatistics::default(),
        }
    }

    /// Widths used to pack the components of this cache.
    pub fn scheme(&self) -> &PackingScheme {
        &self.scheme
    }

    /// Adopt changed caching parameters.
    pub fn set_limits(&mut self, config: &ComponentConfig) {
        self.perform_caching = config.perform_component_caching;
        self.max_bytes = config.cache_max_bytes;
        if self.statistics.bytes > self.max_bytes {
            self.compact();
        }
    }

    pub fn statistics(&self) -> CacheStatistics {
        self.statistics
    }

    /// Whether new components are looked up and stored.
    pub fn perform_caching(&self) -> bool {
        self.perform_caching
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len() - 1 - self.free_slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_entry(&self, id: CacheEntryId) -> bool {
        self.entry(id).is_some()
    }

    pub fn entry(&self, id: CacheEntryId) -> Option<&CacheEntry> {
        self.entries.get(id.slot()).and_then(|entry| entry.as_ref())
    }

    pub fn entry_mut(&mut self, id: CacheEntryId) -> Option<&mut CacheEntry> {
        self.entries
            .get_mut(id.slot())
            .and_then(|entry| entry.as_mut())
    }

    /// All stored entries with their handles.
    pub fn entries(&self) -> impl Iterator<Item = (CacheEntryId, &CacheEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| {
                let entry = entry.as_ref()?;
                Some((CacheEntryId::from_slot(slot), entry))
            })
    }

    /// Release the entry of a component that is no longer live.
    ///
    /// A solved entry is kept for later lookups and may be evicted from now on. An unsolved entry
    /// can never produce a hit, so it is removed.
    pub fn release_entry(&mut self, id: CacheEntryId) {
        match self.entry_mut(id) {
            Some(entry) if entry.is_solved() => entry.set_deletable(),
            Some(_) => {
                self.remove_slot(id.slot());
                self.statistics.discarded += 1;
            }
            None => (),
        }
    }

    /// Record the model count of a solved entry.
    pub fn store_value_of(&mut self, id: CacheEntryId, model_count: BigUint) {
        let time = self.clock;
        if let Some(entry) = self.entries.get_mut(id.slot()).and_then(|entry| entry.as_mut()) {
            let old_size = entry.byte_size();
            entry.set_model_count(model_count, time);
            self.statistics.bytes = self.statistics.bytes - old_size + entry.byte_size();
        }
    }

    /// Look up a new component.
    ///
    /// When a solved entry with the same key exists, its model count is included into `level` and
    /// `true` is returned. The caller then drops the component.
    pub fn manage_new_component(&mut self, level: &mut StackLevel, packed: &PackedComponent) -> bool {
        if !self.perform_caching {
            return false;
        }

        self.clock += 1;
        self.statistics.lookups += 1;

        let entries = &self.entries;
        let found = self.buckets.get(&packed.hash()).and_then(|bucket| {
            bucket.iter().find_map(|id| {
                let entry = entries[id.slot()].as_ref()?;
                if entry.packed == *packed {
                    entry.model_count.as_ref()
                } else {
                    None
                }
            })
        });

        match found {
            Some(count) => {
                level.include_solution(count);
                self.statistics.hits += 1;
                true
            }
            None => false,
        }
    }

    /// Store a new, unsolved component.
    pub fn store_as_entry(
        &mut self,
        packed: PackedComponent,
        parent: Option<CacheEntryId>,
    ) -> CacheEntryId {
        let entry = CacheEntry {
            packed,
            parent,
            creation_time: self.clock,
            model_count: None,
            solution_period_and_flags: 0,
        };

        let hash = entry.packed.hash();
        self.statistics.bytes += entry.byte_size();
        self.statistics.stored += 1;

        let id = match self.free_slots.pop() {
            Some(slot) => {
                self.entries[slot] = Some(entry);
                CacheEntryId::from_slot(slot)
            }
            None => {
                self.entries.push(Some(entry));
                CacheEntryId::from_slot(self.entries.len() - 1)
            }
        };

        self.buckets.entry(hash).or_default().push(id);

        trace!("stored component {:?} with hash {:08x}", id, hash);

        if self.statistics.bytes > self.max_bytes {
            self.compact();
        }

        id
    }

    /// Evict solved deletable entries, oldest first, until at most half the budget is used.
    pub fn compact(&mut self) {
        let target = self.max_bytes / 2;
        let before = self.statistics.bytes;

        let mut candidates: Vec<(u64, usize)> = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| {
                let entry = entry.as_ref()?;
                if entry.is_solved() && entry.is_deletable() {
                    Some((entry.creation_time, slot))
                } else {
                    None
                }
            })
            .collect();

        candidates.sort_unstable();

        let mut evicted = 0;
        for (_, slot) in candidates {
            if self.statistics.bytes <= target {
                break;
            }
            self.remove_slot(slot);
            evicted += 1;
        }
        self.statistics.evicted += evicted;

        if evicted == 0 {
            debug!(
                "No cache entries can be evicted, {} bytes are in use",
                self.statistics.bytes
            );
        } else {
            info!(
                "Evicted {} cache entries, {} of {} bytes remain",
                evicted, self.statistics.bytes, before
            );
        }
    }

    fn remove_slot(&mut self, slot: usize) {
        if let Some(entry) = self.entries[slot].take() {
            let id = CacheEntryId::from_slot(slot);
            let hash = entry.packed.hash();
            if let Some(bucket) = self.buckets.get_mut(&hash) {
                bucket.retain(|other| *other != id);
                if bucket.is_empty() {
                    self.buckets.remove(&hash);
                }
            }
            self.statistics.bytes -= entry.byte_size();
            self.free_slots.push(slot);
        }
    }
}
