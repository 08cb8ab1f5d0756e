//! Identity-keyed result cache for finished shadow bitmaps.

use crate::foundation::core::ContentKey;
use crate::raster::buffer::RasterBuffer;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Cache configuration.
#[derive(Debug, Clone, Copy)]
pub struct ShadowCacheOpts {
    /// Maximum pixel bytes retained across all entries. Shadow bitmaps vary
    /// widely in size, so the cap is on bytes rather than entry count.
    pub max_bytes: usize,
}

impl Default for ShadowCacheOpts {
    fn default() -> Self {
        Self {
            max_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Cache counters, taken as a snapshot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShadowCacheStats {
    /// Lookups that found an entry.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Entries stored (replacements included).
    pub insertions: u64,
    /// Entries dropped to stay under the byte cap.
    pub evictions: u64,
    /// Entries currently retained.
    pub retained_entries: usize,
    /// Pixel bytes currently retained.
    pub retained_bytes: usize,
}

struct CacheInner {
    map: HashMap<ContentKey, RasterBuffer>,
    lru: VecDeque<ContentKey>,
    bytes: usize,
    hits: u64,
    misses: u64,
    insertions: u64,
    evictions: u64,
}

/// Byte-capped LRU from content identity to finished shadow bitmap.
///
/// Thread-safe behind an internal mutex; buffers come back as storage-sharing
/// clones, so a hit never copies pixels. There is no invalidation API: a
/// caller whose content changes must change its key. One cache per engine,
/// constructed explicitly, so tests can run isolated instances.
pub struct ShadowCache {
    opts: ShadowCacheOpts,
    inner: Mutex<CacheInner>,
}

impl ShadowCache {
    /// Construct an empty cache.
    pub fn new(opts: ShadowCacheOpts) -> Self {
        Self {
            opts,
            inner: Mutex::new(CacheInner {
                map: HashMap::new(),
                lru: VecDeque::new(),
                bytes: 0,
                hits: 0,
                misses: 0,
                insertions: 0,
                evictions: 0,
            }),
        }
    }

    /// Look up a shadow by identity, refreshing its recency on a hit.
    pub fn get(&self, key: &ContentKey) -> Option<RasterBuffer> {
        let mut inner = self.lock();
        match inner.map.get(key).cloned() {
            Some(buf) => {
                inner.hits += 1;
                touch(&mut inner.lru, key);
                Some(buf)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Store a shadow under an identity, evicting least-recently-used entries
    /// until the byte cap holds. An entry larger than the whole cap is not
    /// retained at all.
    pub fn put(&self, key: ContentKey, buffer: RasterBuffer) {
        let bytes = buffer.byte_len();
        if bytes > self.opts.max_bytes {
            return;
        }

        let mut inner = self.lock();
        if let Some(old) = inner.map.remove(&key) {
            inner.bytes = inner.bytes.saturating_sub(old.byte_len());
            if let Some(pos) = inner.lru.iter().position(|k| k == &key) {
                inner.lru.remove(pos);
            }
        }

        inner.bytes = inner.bytes.saturating_add(bytes);
        inner.map.insert(key.clone(), buffer);
        inner.lru.push_back(key);
        inner.insertions += 1;

        while inner.bytes > self.opts.max_bytes {
            let Some(old_key) = inner.lru.pop_front() else {
                break;
            };
            if let Some(old) = inner.map.remove(&old_key) {
                inner.bytes = inner.bytes.saturating_sub(old.byte_len());
                inner.evictions += 1;
            }
        }
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    /// `true` when nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pixel bytes currently retained.
    pub fn bytes(&self) -> usize {
        self.lock().bytes
    }

    /// Drop every entry, keeping counters.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.map.clear();
        inner.lru.clear();
        inner.bytes = 0;
    }

    /// Snapshot the cache counters.
    pub fn stats(&self) -> ShadowCacheStats {
        let inner = self.lock();
        ShadowCacheStats {
            hits: inner.hits,
            misses: inner.misses,
            insertions: inner.insertions,
            evictions: inner.evictions,
            retained_entries: inner.map.len(),
            retained_bytes: inner.bytes,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        // Buffers are immutable and the critical sections never panic past
        // the counters, so a poisoned lock still holds consistent data.
        match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn touch(lru: &mut VecDeque<ContentKey>, key: &ContentKey) {
    if let Some(pos) = lru.iter().position(|k| k == key) {
        lru.remove(pos);
    }
    lru.push_back(key.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Rgba8Premul;

    fn buf(px: u32) -> RasterBuffer {
        RasterBuffer::solid(Rgba8Premul::opaque(1, 2, 3), px, 1, 1.0).unwrap()
    }

    fn key(s: &str) -> ContentKey {
        ContentKey::new(s)
    }

    #[test]
    fn hit_returns_storage_sharing_clone() {
        let cache = ShadowCache::new(ShadowCacheOpts::default());
        let stored = buf(4);
        cache.put(key("a"), stored.clone());
        let got = cache.get(&key("a")).expect("hit");
        assert!(got.shares_pixels(&stored));
        assert!(cache.get(&key("b")).is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.retained_entries, 1);
        assert_eq!(stats.retained_bytes, 16);
    }

    #[test]
    fn evicts_least_recently_used_first() {
        // Each buffer is 40 bytes; cap fits two.
        let cache = ShadowCache::new(ShadowCacheOpts { max_bytes: 80 });
        cache.put(key("a"), buf(10));
        cache.put(key("b"), buf(10));
        // Touch "a" so "b" is now the oldest.
        assert!(cache.get(&key("a")).is_some());
        cache.put(key("c"), buf(10));

        assert!(cache.get(&key("a")).is_some());
        assert!(cache.get(&key("b")).is_none());
        assert!(cache.get(&key("c")).is_some());
        assert_eq!(cache.stats().evictions, 1);
        assert!(cache.bytes() <= 80);
    }

    #[test]
    fn oversize_entry_is_not_retained() {
        let cache = ShadowCache::new(ShadowCacheOpts { max_bytes: 16 });
        cache.put(key("big"), buf(10));
        assert!(cache.is_empty());
        assert_eq!(cache.stats().insertions, 0);
    }

    #[test]
    fn replacing_a_key_adjusts_bytes() {
        let cache = ShadowCache::new(ShadowCacheOpts { max_bytes: 1024 });
        cache.put(key("a"), buf(10));
        cache.put(key("a"), buf(20));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.bytes(), 80);
        assert_eq!(cache.stats().insertions, 2);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn clear_keeps_counters() {
        let cache = ShadowCache::new(ShadowCacheOpts::default());
        cache.put(key("a"), buf(4));
        assert!(cache.get(&key("a")).is_some());
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.bytes(), 0);
        assert_eq!(cache.stats().hits, 1);
        assert!(cache.get(&key("a")).is_none());
    }
}
