use std::hash::Hasher;

use fnv::FnvHasher;

use crate::apps::KeyValue;

/// Stable key hash: 64-bit FNV-1a masked to 31 bits. Identical across
/// builds and processes.
pub fn ihash(key: &str) -> u32 {
    let mut h = FnvHasher::default();
    h.write(key.as_bytes());
    (h.finish() & 0x7fff_ffff) as u32
}

/// Reduce partition in `[0, n_reduce)` owning `key`.
pub fn partition_for(key: &str, n_reduce: usize) -> usize {
    ihash(key) as usize % n_reduce.max(1)
}

/// Splits map output into `n_reduce` buckets, preserving emission order
/// inside each bucket.
pub fn bucketize(pairs: Vec<KeyValue>, n_reduce: usize) -> Vec<Vec<KeyValue>> {
    let n = n_reduce.max(1);
    let mut buckets: Vec<Vec<KeyValue>> = (0..n).map(|_| Vec::new()).collect();
    for kv in pairs {
        let r = partition_for(&kv.key, n);
        buckets[r].push(kv);
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_for_stays_in_range() {
        let n = 10;
        for key in ["a", "b", "c", "xyz", "otro", ""] {
            assert!(partition_for(key, n) < n);
        }
    }

    #[test]
    fn ihash_is_stable_and_non_negative() {
        // FNV-1a 64 of "a" is 0xaf63dc4c8601ec8c
        assert_eq!(ihash("a"), 0xaf63dc4c8601ec8c_u64 as u32 & 0x7fff_ffff);
        assert_eq!(ihash("hello"), ihash("hello"));
        assert!(ihash("zzz") <= 0x7fff_ffff);
    }

    #[test]
    fn bucketize_sends_equal_keys_to_the_same_bucket() {
        let pairs = vec![
            KeyValue::new("a", "1"),
            KeyValue::new("b", "1"),
            KeyValue::new("a", "1"),
        ];
        let buckets = bucketize(pairs, 3);
        assert_eq!(buckets.len(), 3);

        let a_bucket = partition_for("a", 3);
        let a_count = buckets[a_bucket].iter().filter(|kv| kv.key == "a").count();
        assert_eq!(a_count, 2);

        let total: usize = buckets.iter().map(Vec::len).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn bucketize_always_returns_n_buckets() {
        let buckets = bucketize(Vec::new(), 4);
        assert_eq!(buckets.len(), 4);
        assert!(buckets.iter().all(Vec::is_empty));
    }
}
