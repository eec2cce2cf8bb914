//! Extendible hash table with directory doubling and bucket splitting.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use burrow_common::constants::DEFAULT_HASH_BUCKET_SIZE;
use parking_lot::Mutex;

/// A bucket shared by one or more directory slots.
///
/// The number of slots referencing a bucket is always
/// `2^(global_depth - local_depth)`; sharing is by `Arc`, never by
/// duplication, so a split replaces some references and leaves the
/// rest pointing at the original.
struct Bucket<K, V> {
    data: Mutex<BucketData<K, V>>,
}

struct BucketData<K, V> {
    /// Number of low-order hash bits all keys in this bucket share.
    local_depth: u32,
    items: HashMap<K, V>,
}

impl<K, V> Bucket<K, V> {
    fn new(local_depth: u32, items: HashMap<K, V>) -> Self {
        Self {
            data: Mutex::new(BucketData { local_depth, items }),
        }
    }
}

/// Directory state: the slot vector together with the depths it encodes.
struct Directory<K, V> {
    /// Number of low-order hash bits used to index the directory.
    global_depth: u32,
    /// Number of distinct buckets.
    num_buckets: usize,
    /// `2^global_depth` slots, each referencing a bucket.
    slots: Vec<Arc<Bucket<K, V>>>,
}

/// A concurrent extendible hash table.
///
/// Lookups hash the key and use its low `global_depth` bits as the
/// directory index. Inserting into a full bucket splits it, doubling
/// the directory when the bucket's local depth would exceed the global
/// depth; a single split may not separate entries that agree on the new
/// bit, so insertion loops until the key fits. Removal never merges
/// buckets or shrinks the directory.
///
/// The directory (with `global_depth` and the bucket count) sits behind
/// one table lock; each bucket's contents and local depth sit behind a
/// per-bucket lock. Insertion acquires the bucket lock first and the
/// table lock inside it; lookups read the slot under the table lock,
/// release it, then take only the bucket lock.
///
/// The hasher is pluggable (`S: BuildHasher`) so tests can drive the
/// split machinery with a deterministic hash; the default is the
/// standard library's `RandomState`.
///
/// # Example
///
/// ```
/// use burrow_storage::hash::ExtendibleHashTable;
///
/// let table = ExtendibleHashTable::new(2);
/// table.insert(1u64, "a");
/// table.insert(2u64, "b");
/// table.insert(3u64, "c");
///
/// assert_eq!(table.find(&1), Some("a"));
/// assert!(table.remove(&1));
/// assert_eq!(table.find(&1), None);
/// ```
pub struct ExtendibleHashTable<K, V, S = RandomState> {
    /// Maximum number of entries per bucket.
    bucket_size: usize,
    hasher: S,
    dir: Mutex<Directory<K, V>>,
}

impl<K, V> ExtendibleHashTable<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Creates a table with the given bucket capacity and the default
    /// hasher.
    pub fn new(bucket_size: usize) -> Self {
        Self::with_hasher(bucket_size, RandomState::new())
    }
}

impl<K, V> Default for ExtendibleHashTable<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_HASH_BUCKET_SIZE)
    }
}

impl<K, V, S> ExtendibleHashTable<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
{
    /// Creates a table with the given bucket capacity and hasher.
    pub fn with_hasher(bucket_size: usize, hasher: S) -> Self {
        let initial = Arc::new(Bucket::new(0, HashMap::new()));
        Self {
            bucket_size: bucket_size.max(1),
            hasher,
            dir: Mutex::new(Directory {
                global_depth: 0,
                num_buckets: 1,
                slots: vec![initial],
            }),
        }
    }

    /// Returns the number of low-order hash bits used to index the
    /// directory.
    pub fn global_depth(&self) -> u32 {
        self.dir.lock().global_depth
    }

    /// Returns the local depth of the bucket referenced by the given
    /// directory slot.
    ///
    /// Returns `-1` when the slot is out of range or the bucket is
    /// empty (a diagnostic convention).
    pub fn local_depth(&self, slot: usize) -> i32 {
        let bucket = {
            let dir = self.dir.lock();
            match dir.slots.get(slot) {
                Some(bucket) => Arc::clone(bucket),
                None => return -1,
            }
        };
        let data = bucket.data.lock();
        if data.items.is_empty() {
            -1
        } else {
            data.local_depth as i32
        }
    }

    /// Returns the number of distinct buckets.
    pub fn num_buckets(&self) -> usize {
        self.dir.lock().num_buckets
    }

    /// Looks up the value for a key.
    pub fn find(&self, key: &K) -> Option<V> {
        let bucket = self.bucket_for(key);
        let data = bucket.data.lock();
        data.items.get(key).cloned()
    }

    /// Returns true if the key is present.
    pub fn contains(&self, key: &K) -> bool {
        let bucket = self.bucket_for(key);
        let data = bucket.data.lock();
        data.items.contains_key(key)
    }

    /// Removes a key; returns whether it was present.
    pub fn remove(&self, key: &K) -> bool {
        let bucket = self.bucket_for(key);
        let mut data = bucket.data.lock();
        data.items.remove(key).is_some()
    }

    /// Inserts or updates a key.
    ///
    /// On overflow the target bucket splits, doubling the directory if
    /// its local depth would exceed the global depth, and the insert
    /// retries: one split is not always enough when the existing
    /// entries all agree on the newly examined hash bit.
    pub fn insert(&self, key: K, value: V) {
        loop {
            let cur = self.bucket_for(&key);
            let mut data = cur.data.lock();

            // The directory may have been rewritten between reading the
            // slot and acquiring the bucket lock; re-check the routing
            // before touching the bucket.
            {
                let dir = self.dir.lock();
                let idx = self.slot_index(&dir, &key);
                if !Arc::ptr_eq(&dir.slots[idx], &cur) {
                    continue;
                }
            }

            // Room left, or an update of an existing key: no split.
            if data.items.contains_key(&key) || data.items.len() < self.bucket_size {
                data.items.insert(key.clone(), value.clone());
                return;
            }

            // Overflow: split this bucket.
            let mut dir = self.dir.lock();

            data.local_depth += 1;
            if data.local_depth > dir.global_depth {
                // Append a copy of every existing slot in order; every
                // bucket then has two references where it had one.
                let len = dir.slots.len();
                for i in 0..len {
                    let dup = Arc::clone(&dir.slots[i]);
                    dir.slots.push(dup);
                }
                dir.global_depth += 1;
                tracing::debug!(global_depth = dir.global_depth, "doubled hash directory");
            }
            dir.num_buckets += 1;

            // Entries whose hash has the new bit set migrate to the
            // fresh bucket; the rest stay.
            let bit = 1u64 << (data.local_depth - 1);
            let (keep, moved): (HashMap<K, V>, HashMap<K, V>) = data
                .items
                .drain()
                .partition(|(k, _)| self.hash_key(k) & bit == 0);
            data.items = keep;
            let fresh = Arc::new(Bucket::new(data.local_depth, moved));

            // Every slot that references the split bucket and has the
            // distinguishing bit set in its index is redirected. More
            // than one slot can qualify.
            let idx_bit = bit as usize;
            for (i, slot) in dir.slots.iter_mut().enumerate() {
                if i & idx_bit != 0 && Arc::ptr_eq(slot, &cur) {
                    *slot = Arc::clone(&fresh);
                }
            }

            // Guards drop here; the next iteration re-routes the key.
        }
    }

    fn hash_key(&self, key: &K) -> u64 {
        self.hasher.hash_one(key)
    }

    fn slot_index(&self, dir: &Directory<K, V>, key: &K) -> usize {
        (self.hash_key(key) & ((1u64 << dir.global_depth) - 1)) as usize
    }

    fn bucket_for(&self, key: &K) -> Arc<Bucket<K, V>> {
        let dir = self.dir.lock();
        let idx = self.slot_index(&dir, key);
        Arc::clone(&dir.slots[idx])
    }
}

impl<K, V, S> std::fmt::Debug for ExtendibleHashTable<K, V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dir = self.dir.lock();
        f.debug_struct("ExtendibleHashTable")
            .field("global_depth", &dir.global_depth)
            .field("num_buckets", &dir.num_buckets)
            .field("bucket_size", &self.bucket_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::hash::Hasher;

    /// Hashes a u64 key to itself, so tests can place keys in specific
    /// buckets by choosing their low bits.
    #[derive(Clone, Default)]
    struct IdentityBuild;

    struct IdentityHasher(u64);

    impl Hasher for IdentityHasher {
        fn finish(&self) -> u64 {
            self.0
        }

        fn write(&mut self, bytes: &[u8]) {
            let mut buf = [0u8; 8];
            let n = bytes.len().min(8);
            buf[..n].copy_from_slice(&bytes[..n]);
            self.0 = u64::from_le_bytes(buf);
        }

        fn write_u64(&mut self, n: u64) {
            self.0 = n;
        }
    }

    impl BuildHasher for IdentityBuild {
        type Hasher = IdentityHasher;

        fn build_hasher(&self) -> IdentityHasher {
            IdentityHasher(0)
        }
    }

    fn identity_table(bucket_size: usize) -> ExtendibleHashTable<u64, u64, IdentityBuild> {
        ExtendibleHashTable::with_hasher(bucket_size, IdentityBuild)
    }

    #[test]
    fn test_insert_find_remove() {
        let table = ExtendibleHashTable::new(4);
        for i in 0..32u64 {
            table.insert(i, i * 10);
        }
        for i in 0..32u64 {
            assert_eq!(table.find(&i), Some(i * 10));
        }

        assert!(table.remove(&7));
        assert!(!table.remove(&7));
        assert_eq!(table.find(&7), None);
        assert_eq!(table.find(&8), Some(80));
    }

    #[test]
    fn test_update_existing_never_splits() {
        let table = identity_table(2);
        table.insert(0, 1);
        table.insert(2, 1);
        let depth = table.global_depth();
        let buckets = table.num_buckets();

        // Full bucket, but the key already exists: upsert in place.
        table.insert(0, 99);

        assert_eq!(table.find(&0), Some(99));
        assert_eq!(table.global_depth(), depth);
        assert_eq!(table.num_buckets(), buckets);
    }

    #[test]
    fn test_split_doubles_directory() {
        let table = identity_table(2);
        // 0b00 and 0b10 share a bucket; 0b01 forces the first split.
        table.insert(0b00, 0);
        table.insert(0b10, 0);
        table.insert(0b01, 0);

        assert!(table.global_depth() >= 1);
        assert!(table.num_buckets() >= 2);
        for key in [0b00u64, 0b10, 0b01] {
            assert_eq!(table.find(&key), Some(0));
        }
    }

    #[test]
    fn test_cascading_splits_until_bit_distinguishes() {
        let table = identity_table(2);
        // 0 and 2 differ only at bit 1; 4 differs from 0 only at bit 2.
        // Separating them forces repeated splits of the even bucket.
        table.insert(0, 0);
        table.insert(2, 0);
        table.insert(4, 0);

        assert_eq!(table.global_depth(), 2);
        assert_eq!(table.num_buckets(), 3);
        for key in [0u64, 2, 4] {
            assert_eq!(table.find(&key), Some(0));
        }
    }

    #[test]
    fn test_deep_collision_cascade_terminates() {
        let table = identity_table(2);
        // 3 = 0b00011, 11 = 0b01011, 19 = 0b10011: the third insert
        // keeps splitting until bit 3 finally separates 3 from 11.
        table.insert(3, 0);
        table.insert(11, 0);
        table.insert(19, 0);

        assert_eq!(table.global_depth(), 4);
        for key in [3u64, 11, 19] {
            assert_eq!(table.find(&key), Some(0));
        }
    }

    #[test]
    fn test_local_depth_conventions() {
        let table = identity_table(2);
        // Empty bucket reports -1.
        assert_eq!(table.local_depth(0), -1);
        // Out-of-range slot reports -1.
        assert_eq!(table.local_depth(1000), -1);

        table.insert(1, 0);
        assert_eq!(table.local_depth(0), 0);
    }

    #[test]
    fn test_local_depth_bounded_by_global() {
        let table = identity_table(2);
        for key in 0..64u64 {
            table.insert(key, key);
        }

        let global = table.global_depth();
        for slot in 0..(1usize << global) {
            let local = table.local_depth(slot);
            assert!(local <= global as i32);
        }
    }

    #[test]
    fn test_removal_never_shrinks() {
        let table = identity_table(2);
        for key in 0..16u64 {
            table.insert(key, key);
        }
        let depth = table.global_depth();
        let buckets = table.num_buckets();

        for key in 0..16u64 {
            assert!(table.remove(&key));
        }

        assert_eq!(table.global_depth(), depth);
        assert_eq!(table.num_buckets(), buckets);
    }

    #[test]
    fn test_concurrent_readers_and_writers() {
        use std::sync::Arc as StdArc;

        let table = StdArc::new(ExtendibleHashTable::<u64, u64>::new(1024));
        let mut handles = Vec::new();
        for t in 0..4u64 {
            let table = StdArc::clone(&table);
            handles.push(std::thread::spawn(move || {
                for i in 0..100u64 {
                    let key = t * 1000 + i;
                    table.insert(key, key);
                    assert_eq!(table.find(&key), Some(key));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        for t in 0..4u64 {
            for i in 0..100u64 {
                let key = t * 1000 + i;
                assert_eq!(table.find(&key), Some(key));
            }
        }
    }
}
