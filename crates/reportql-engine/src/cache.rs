//! Result cache
//!
//! Keyed on (schema, request fingerprint, dialect). Entries are whole
//! `GenerationResult`s replaced by reference, never patched in place, so a
//! concurrent reader sees either the old result or the new one. Every entry
//! remembers the catalog generation it was minted against; a schema reload
//! makes it unservable even before the eager purge runs.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use reportql_ir::{Dialect, GenerationResult};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    schema: String,
    fingerprint: String,
    dialect: Dialect,
}

struct CacheEntry {
    result: GenerationResult,
    stored_at: Instant,
    ttl: Duration,
    generation: u64,
}

pub struct ResultCache {
    entries: DashMap<CacheKey, CacheEntry>,
    default_ttl: Duration,
}

impl ResultCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    fn key(schema: &str, fingerprint: &str, dialect: Dialect) -> CacheKey {
        CacheKey {
            schema: schema.to_ascii_uppercase(),
            fingerprint: fingerprint.to_string(),
            dialect,
        }
    }

    /// Look up a cached result. Entries past their TTL or minted against an
    /// older catalog generation are dropped on the way out.
    pub fn get(
        &self,
        schema: &str,
        fingerprint: &str,
        dialect: Dialect,
        current_generation: u64,
    ) -> Option<GenerationResult> {
        let key = Self::key(schema, fingerprint, dialect);
        let hit = match self.entries.get(&key) {
            None => return None,
            Some(entry) => {
                if entry.generation == current_generation && entry.stored_at.elapsed() < entry.ttl
                {
                    Some(entry.result.clone())
                } else {
                    None
                }
            }
        };
        if hit.is_none() {
            self.entries.remove(&key);
            debug!(schema, "evicted stale cache entry");
        }
        hit
    }

    pub fn put(
        &self,
        schema: &str,
        fingerprint: &str,
        dialect: Dialect,
        result: GenerationResult,
        generation: u64,
    ) {
        self.put_with_ttl(schema, fingerprint, dialect, result, generation, self.default_ttl);
    }

    pub fn put_with_ttl(
        &self,
        schema: &str,
        fingerprint: &str,
        dialect: Dialect,
        result: GenerationResult,
        generation: u64,
        ttl: Duration,
    ) {
        self.entries.insert(
            Self::key(schema, fingerprint, dialect),
            CacheEntry {
                result,
                stored_at: Instant::now(),
                ttl,
                generation,
            },
        );
    }

    /// Wholesale purge, run on every schema reload
    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reportql_ir::ComplexityTier;

    fn sample_result() -> GenerationResult {
        GenerationResult {
            sql: "SELECT * FROM SALES".to_string(),
            dialect: Dialect::Oracle,
            valid: true,
            warnings: vec![],
            complexity: ComplexityTier::Simple,
            confidence: 0.9,
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_put_then_get() {
        let cache = ResultCache::new(Duration::from_secs(300));
        cache.put("RETAIL", "abc", Dialect::Oracle, sample_result(), 1);
        let hit = cache.get("retail", "abc", Dialect::Oracle, 1).unwrap();
        assert_eq!(hit.sql, "SELECT * FROM SALES");
    }

    #[test]
    fn test_miss_on_other_dialect() {
        let cache = ResultCache::new(Duration::from_secs(300));
        cache.put("RETAIL", "abc", Dialect::Oracle, sample_result(), 1);
        assert!(cache.get("RETAIL", "abc", Dialect::Postgres, 1).is_none());
    }

    #[test]
    fn test_expired_entry_is_dropped() {
        let cache = ResultCache::new(Duration::from_secs(300));
        cache.put_with_ttl(
            "RETAIL",
            "abc",
            Dialect::Oracle,
            sample_result(),
            1,
            Duration::ZERO,
        );
        assert!(cache.get("RETAIL", "abc", Dialect::Oracle, 1).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_stale_generation_is_dropped() {
        let cache = ResultCache::new(Duration::from_secs(300));
        cache.put("RETAIL", "abc", Dialect::Oracle, sample_result(), 1);
        assert!(cache.get("RETAIL", "abc", Dialect::Oracle, 2).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_all() {
        let cache = ResultCache::new(Duration::from_secs(300));
        cache.put("RETAIL", "abc", Dialect::Oracle, sample_result(), 1);
        cache.put("HCM", "def", Dialect::Mysql, sample_result(), 1);
        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
