//! Byte budgeted LRU of composed icons.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use log::debug;

use crate::icon::pixels::PixelBuffer;

struct CacheEntry {
    icon: Arc<PixelBuffer>,
    size_bytes: usize,
    /// Tick of the last access, smallest is evicted first
    last_used: u64,
}

/// Cache counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub size_bytes: usize,
    pub hits: u64,
    pub misses: u64,
}

/// LRU keyed by `K`, bounded by the summed pixel bytes of its icons
pub struct IconCache<K> {
    max_size_bytes: usize,
    entries: HashMap<K, CacheEntry>,
    current_size: usize,
    tick: u64,
    /// Bumped by every clear
    generation: u64,
    hits: u64,
    misses: u64,
}

impl<K: Hash + Eq + Clone> IconCache<K> {
    pub fn new(max_size_bytes: usize) -> IconCache<K> {
        IconCache {
            max_size_bytes,
            entries: HashMap::new(),
            current_size: 0,
            tick: 0,
            generation: 0,
            hits: 0,
            misses: 0,
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub fn get(&mut self, key: &K) -> Option<Arc<PixelBuffer>> {
        let tick = self.next_tick();
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.last_used = tick;
                self.hits += 1;
                Some(entry.icon.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store an icon and return the cached instance for `key`
    ///
    /// If the key is already present the existing icon is kept and returned.
    /// Icons larger than the whole budget are handed back without caching.
    pub fn insert(&mut self, key: K, icon: Arc<PixelBuffer>) -> Arc<PixelBuffer> {
        let tick = self.next_tick();
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.last_used = tick;
            return entry.icon.clone();
        }

        let size_bytes = icon.byte_len();
        if size_bytes > self.max_size_bytes {
            debug!(
                "icon of {} bytes exceeds cache budget {}",
                size_bytes, self.max_size_bytes
            );
            return icon;
        }

        while self.current_size + size_bytes > self.max_size_bytes {
            if !self.evict_oldest() {
                break;
            }
        }

        self.current_size += size_bytes;
        self.entries.insert(
            key,
            CacheEntry {
                icon: icon.clone(),
                size_bytes,
                last_used: tick,
            },
        );
        icon
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Like [`IconCache::insert`] for an icon built while the cache was at
    /// `generation`
    ///
    /// If the cache was cleared since, the icon is handed back without
    /// caching.
    pub fn insert_at(
        &mut self,
        generation: u64,
        key: K,
        icon: Arc<PixelBuffer>,
    ) -> Arc<PixelBuffer> {
        if generation != self.generation {
            debug!(
                "dropping icon built at generation {}, cache is at {}",
                generation, self.generation
            );
            return icon;
        }
        self.insert(key, icon)
    }

    fn evict_oldest(&mut self) -> bool {
        let Some(key) = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone())
        else {
            return false;
        };

        if let Some(entry) = self.entries.remove(&key) {
            self.current_size -= entry.size_bytes;
        }
        true
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Drop every entry, statistics are kept
    pub fn clear(&mut self) {
        self.entries.clear();
        self.current_size = 0;
        self.generation += 1;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            size_bytes: self.current_size,
            hits: self.hits,
            misses: self.misses,
        }
    }
}
