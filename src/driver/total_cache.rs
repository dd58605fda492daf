//! Per-driver-instance memoization of query totals.
//!
//! Running a query already tells the backend how many records matched;
//! callers that then ask for a count of the same query should not pay a
//! second network round-trip. Each driver owns one [`QueryTotalCache`]
//! keyed by a deterministic [`fingerprint`] of the pre-pagination query.

use std::collections::HashMap;
use std::hash::BuildHasher;

use ahash::RandomState;
use parking_lot::Mutex;

use super::NativeQuery;

// Fixed seeds so fingerprints are stable across instances and processes.
const SEED_A: u64 = 0x5367_7474_6121_0001;
const SEED_B: u64 = 0x9e37_79b9_7f4a_7c15;
const SEED_C: u64 = 0x2545_f491_4f6c_dd1d;
const SEED_D: u64 = 0x0de4_3355_a1b2_c3d4;

/// Deterministic 64-bit fingerprint of a native query.
///
/// Relies on `serde_json` map keys serializing in sorted order: two
/// structurally equal queries produce the same canonical string and
/// therefore the same fingerprint, regardless of insertion order.
pub fn fingerprint(query: &NativeQuery) -> u64 {
    let canonical = serde_json::to_string(query).unwrap_or_default();
    RandomState::with_seeds(SEED_A, SEED_B, SEED_C, SEED_D).hash_one(canonical)
}

/// Instance-scoped cache of query totals.
///
/// No eviction: entries live as long as the owning driver. Access is
/// serialized internally; the layer itself never queries concurrently.
#[derive(Debug, Default)]
pub struct QueryTotalCache {
    totals: Mutex<HashMap<u64, u64, RandomState>>,
}

impl QueryTotalCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        QueryTotalCache {
            totals: Mutex::new(HashMap::with_hasher(RandomState::new())),
        }
    }

    /// Record the total for a query.
    pub fn store(&self, query: &NativeQuery, total: u64) {
        self.totals.lock().insert(fingerprint(query), total);
    }

    /// Look up the total for an equivalent earlier query.
    pub fn get(&self, query: &NativeQuery) -> Option<u64> {
        self.totals.lock().get(&fingerprint(query)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = json!({"query": {"bool": {"must": [{"multi_match": {"query": "shoes"}}]}}});
        let b = json!({"query": {"bool": {"must": [{"multi_match": {"query": "shoes"}}]}}});
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_fingerprint_ignores_key_insertion_order() {
        let mut first = serde_json::Map::new();
        first.insert("terms".to_string(), json!("shoes"));
        first.insert("params".to_string(), json!({"facets": "*"}));

        let mut second = serde_json::Map::new();
        second.insert("params".to_string(), json!({"facets": "*"}));
        second.insert("terms".to_string(), json!("shoes"));

        assert_eq!(
            fingerprint(&NativeQuery::Object(first)),
            fingerprint(&NativeQuery::Object(second))
        );
    }

    #[test]
    fn test_fingerprint_distinguishes_queries() {
        let shoes = json!({"terms": "shoes"});
        let boots = json!({"terms": "boots"});
        assert_ne!(fingerprint(&shoes), fingerprint(&boots));
    }

    #[test]
    fn test_store_and_get() {
        let cache = QueryTotalCache::new();
        let query = json!({"terms": "shoes"});

        assert_eq!(cache.get(&query), None);
        cache.store(&query, 7);
        assert_eq!(cache.get(&query), Some(7));

        // An equivalent value object hits the same entry.
        assert_eq!(cache.get(&json!({"terms": "shoes"})), Some(7));
        assert_eq!(cache.get(&json!({"terms": "boots"})), None);
    }
}
