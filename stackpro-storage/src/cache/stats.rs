//! Cache statistics.

use serde::Serialize;

/// Snapshot of cache state for debugging and admin endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of live (non-expired) entries.
    pub size: usize,
    /// Keys of the live entries, sorted.
    pub keys: Vec<String>,
    /// Number of cache hits since creation.
    pub hits: u64,
    /// Number of cache misses since creation, expired reads included.
    pub misses: u64,
    /// Number of entries stored, expired ones awaiting a sweep included.
    pub stored: usize,
    /// Number of expired entries evicted, on read or by a sweep.
    pub expirations: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_cache_stats_serialization() {
        let stats = CacheStats {
            size: 1,
            keys: vec!["flag:beta".to_string()],
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["size"], 1);
        assert_eq!(json["keys"][0], "flag:beta");
    }
}
