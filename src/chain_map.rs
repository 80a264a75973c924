//! ChainMap: separate-chaining table over a slotmap arena of entries.

use slotmap::{DefaultKey, SlotMap};

use crate::error::TableError;
use crate::murmur3;
use crate::primes;

/// Occupied-bucket ratio above which insert grows the table by one schedule
/// step.
pub const LOAD_FACTOR_LIMIT: f64 = 0.8;

#[derive(Debug)]
struct Entry<V> {
    key: Box<str>,
    value: V,
    hash: u32, // cached digest; growth re-buckets from this, never from key bytes
    next: Option<DefaultKey>,
}

/// A separate-chaining hash map from string keys to `V`.
///
/// Buckets hold the head of a singly-linked chain of entries whose digests
/// collide modulo the current capacity; the chain nodes live in a slotmap
/// arena rather than behind raw pointers. Insertion prepends, so the newest
/// entry for a bucket is found first, including a newer entry for the same
/// key, which shadows (without replacing) any older one until it is removed.
///
/// The load factor is deliberately the ratio of *occupied buckets* to
/// capacity, not of entries to capacity; it undercounts entry density
/// whenever chains are longer than one. Crossing [`LOAD_FACTOR_LIMIT`]
/// during insert grows the table to the next prime capacity.
#[derive(Debug)]
pub struct ChainMap<V> {
    buckets: Vec<Option<DefaultKey>>,
    slots: SlotMap<DefaultKey, Entry<V>>,
    /// Buckets holding at least one entry. Drives the load factor; not the
    /// entry count (see [`ChainMap::len`]).
    occupied: usize,
    capacity_index: usize,
}

impl<V> ChainMap<V> {
    /// An empty table at the first capacity on the schedule (53 buckets).
    pub fn new() -> Self {
        Self::with_capacity_index(0).expect("capacity schedule is never empty")
    }

    /// An empty table at the given position in the prime capacity schedule.
    ///
    /// Returns [`TableError::CapacityIndexOutOfRange`] past the end of the
    /// schedule.
    pub fn with_capacity_index(index: usize) -> Result<Self, TableError> {
        let capacity = primes::capacity_at(index)
            .ok_or(TableError::CapacityIndexOutOfRange { index })?;
        Ok(Self {
            buckets: vec![None; capacity as usize],
            slots: SlotMap::with_key(),
            occupied: 0,
            capacity_index: index,
        })
    }

    /// Number of entries, counting shadowed duplicates.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of buckets holding at least one entry. This is the `size` that
    /// drives growth, not the entry count.
    pub fn occupied_buckets(&self) -> usize {
        self.occupied
    }

    /// Current bucket-array length; always a prime from the schedule.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Position in the prime capacity schedule; increases by one per growth
    /// step.
    pub fn capacity_index(&self) -> usize {
        self.capacity_index
    }

    /// Occupied buckets over capacity.
    pub fn load_factor(&self) -> f64 {
        self.occupied as f64 / self.buckets.len() as f64
    }

    /// Inserts an entry for `key`, prepending to its bucket chain.
    ///
    /// An existing entry with the same key is not replaced: the new entry
    /// shadows it for `get` and `remove` until removed. Crossing the load
    /// threshold grows the table in place; once the capacity schedule is
    /// exhausted the table stops growing and chains simply lengthen.
    pub fn insert(&mut self, key: &str, value: V) {
        let hash = murmur3::hash_key(key);
        let index = self.bucket_index(hash);
        let head = self.buckets[index];
        if head.is_none() {
            self.occupied += 1;
        }
        let slot = self.slots.insert(Entry {
            key: Box::from(key),
            value,
            hash,
            next: head,
        });
        self.buckets[index] = Some(slot);

        if self.load_factor() > LOAD_FACTOR_LIMIT {
            self.grow();
        }
    }

    /// Value of the newest entry whose key matches exactly, or `None`.
    /// Absence is not an error.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.find_slot(key).map(|slot| &self.slots[slot].value)
    }

    /// Mutable counterpart of [`ChainMap::get`].
    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let slot = self.find_slot(key)?;
        Some(&mut self.slots[slot].value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.find_slot(key).is_some()
    }

    /// Unlinks and returns the newest entry whose key matches exactly.
    ///
    /// Removing a shadowing duplicate un-shadows the older entry. The
    /// occupied-bucket count decrements only when the bucket empties.
    pub fn remove(&mut self, key: &str) -> Result<V, TableError> {
        let index = self.bucket_index(murmur3::hash_key(key));
        let mut prev: Option<DefaultKey> = None;
        let mut cursor = self.buckets[index];

        while let Some(slot) = cursor {
            if &*self.slots[slot].key == key {
                let next = self.slots[slot].next;
                match prev {
                    Some(p) => self.slots[p].next = next,
                    None => self.buckets[index] = next,
                }
                let entry = self.slots.remove(slot).unwrap();
                if self.buckets[index].is_none() {
                    self.occupied -= 1;
                }
                return Ok(entry.value);
            }
            prev = cursor;
            cursor = self.slots[slot].next;
        }

        Err(TableError::KeyNotFound)
    }

    /// Iterates over `(key, value)` for every entry, shadowed duplicates
    /// included, in arbitrary order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            it: self.slots.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, V> {
        IterMut {
            it: self.slots.iter_mut(),
        }
    }

    #[inline]
    fn bucket_index(&self, hash: u32) -> usize {
        (hash as usize) % self.buckets.len()
    }

    fn find_slot(&self, key: &str) -> Option<DefaultKey> {
        let mut cursor = self.buckets[self.bucket_index(murmur3::hash_key(key))];
        while let Some(slot) = cursor {
            let entry = &self.slots[slot];
            if &*entry.key == key {
                return Some(slot);
            }
            cursor = entry.next;
        }
        None
    }

    /// Grows to the next capacity on the schedule, relinking every entry in
    /// place. Entries keep their arena slots; only bucket heads and `next`
    /// links change, with the target bucket recomputed from each entry's
    /// stored digest. Old chains are walked head-to-tail and appended
    /// tail-wise, so relative chain order (and with it last-inserted-wins)
    /// survives growth.
    fn grow(&mut self) {
        let Some(new_capacity) = primes::capacity_at(self.capacity_index + 1) else {
            // Schedule exhausted: saturate and keep chaining.
            return;
        };
        let new_capacity = new_capacity as usize;
        let mut heads: Vec<Option<DefaultKey>> = vec![None; new_capacity];
        let mut tails: Vec<Option<DefaultKey>> = vec![None; new_capacity];
        let mut occupied = 0;

        for head in std::mem::take(&mut self.buckets) {
            let mut cursor = head;
            while let Some(slot) = cursor {
                cursor = self.slots[slot].next;
                let index = (self.slots[slot].hash as usize) % new_capacity;
                self.slots[slot].next = None;
                match tails[index] {
                    Some(tail) => self.slots[tail].next = Some(slot),
                    None => {
                        heads[index] = Some(slot);
                        occupied += 1;
                    }
                }
                tails[index] = Some(slot);
            }
        }

        self.buckets = heads;
        self.occupied = occupied;
        self.capacity_index += 1;
    }
}

impl<V> Default for ChainMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over immutable entries in `ChainMap`.
pub struct Iter<'a, V> {
    it: slotmap::basic::Iter<'a, DefaultKey, Entry<V>>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, e)| (&*e.key, &e.value))
    }
}

/// Iterator over mutable entries in `ChainMap`.
pub struct IterMut<'a, V> {
    it: slotmap::basic::IterMut<'a, DefaultKey, Entry<V>>,
}

impl<'a, V> Iterator for IterMut<'a, V> {
    type Item = (&'a str, &'a mut V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, e)| (&*e.key, &mut e.value))
    }
}

#[cfg(test)]
impl<V> ChainMap<V> {
    /// Walks every chain and asserts the structural invariants: capacity on
    /// schedule, every entry reachable via exactly one chain, entries
    /// bucketed by their stored digest, occupied count exact.
    pub(crate) fn check_invariants(&self) {
        assert_eq!(
            self.buckets.len(),
            primes::capacity_at(self.capacity_index).unwrap() as usize
        );
        let mut reachable = 0usize;
        let mut occupied = 0usize;
        for (index, head) in self.buckets.iter().enumerate() {
            if head.is_some() {
                occupied += 1;
            }
            let mut cursor = *head;
            while let Some(slot) = cursor {
                let entry = &self.slots[slot];
                assert_eq!(
                    (entry.hash as usize) % self.buckets.len(),
                    index,
                    "entry bucketed by stored digest"
                );
                assert_eq!(entry.hash, murmur3::hash_key(&entry.key));
                reachable += 1;
                assert!(reachable <= self.slots.len(), "cycle or cross-link in chain");
                cursor = entry.next;
            }
        }
        assert_eq!(reachable, self.slots.len(), "every entry reachable exactly once");
        assert_eq!(occupied, self.occupied);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Two distinct keys sharing a bucket at the given capacity, found by
    /// scanning digests. Terminates by pigeonhole.
    fn colliding_pair(capacity: usize) -> (String, String) {
        let mut seen: HashMap<usize, String> = HashMap::new();
        let mut i = 0u32;
        loop {
            let key = format!("probe-{i}");
            let bucket = (murmur3::hash_key(&key) as usize) % capacity;
            if let Some(first) = seen.get(&bucket) {
                return (first.clone(), key);
            }
            seen.insert(bucket, key);
            i += 1;
        }
    }

    /// Invariant: creation lands on the schedule; out-of-range indices are a
    /// checked error, not undefined behavior.
    #[test]
    fn creation_on_schedule() {
        let map: ChainMap<i32> = ChainMap::new();
        assert_eq!(map.capacity(), 53);
        assert_eq!(map.capacity_index(), 0);
        assert!(map.is_empty());
        assert_eq!(map.occupied_buckets(), 0);

        let map: ChainMap<i32> = ChainMap::with_capacity_index(3).unwrap();
        assert_eq!(map.capacity(), 389);

        assert_eq!(
            ChainMap::<i32>::with_capacity_index(26).unwrap_err(),
            TableError::CapacityIndexOutOfRange { index: 26 }
        );
    }

    /// Invariant: keys colliding into one bucket chain stay independently
    /// reachable, and the occupied count tracks the bucket, not the chain
    /// length.
    #[test]
    fn colliding_keys_share_bucket() {
        let mut map = ChainMap::new();
        let (a, b) = colliding_pair(map.capacity());

        map.insert(&a, 1);
        map.insert(&b, 2);
        map.check_invariants();
        assert_eq!(map.len(), 2);
        assert_eq!(map.occupied_buckets(), 1);
        assert_eq!(map.get(&a), Some(&1));
        assert_eq!(map.get(&b), Some(&2));

        // Removing one chained entry leaves the bucket occupied.
        assert_eq!(map.remove(&a), Ok(1));
        map.check_invariants();
        assert_eq!(map.occupied_buckets(), 1);
        assert_eq!(map.get(&b), Some(&2));

        assert_eq!(map.remove(&b), Ok(2));
        map.check_invariants();
        assert_eq!(map.occupied_buckets(), 0);
        assert!(map.is_empty());
    }

    /// Invariant: inserting an existing key chains a shadowing duplicate
    /// rather than replacing; remove unlinks the newest first.
    #[test]
    fn duplicate_keys_chain_rather_than_replace() {
        let mut map = ChainMap::new();
        map.insert("dup", 1);
        map.insert("dup", 2);
        map.check_invariants();

        assert_eq!(map.len(), 2);
        assert_eq!(map.occupied_buckets(), 1);
        assert_eq!(map.get("dup"), Some(&2));

        assert_eq!(map.remove("dup"), Ok(2));
        assert_eq!(map.get("dup"), Some(&1));
        assert_eq!(map.remove("dup"), Ok(1));
        assert_eq!(map.remove("dup"), Err(TableError::KeyNotFound));
        map.check_invariants();
    }

    /// Invariant: growth re-buckets every entry from its stored digest and
    /// leaves all keys resolvable at the next capacity.
    #[test]
    fn growth_rebuckets_all_entries() {
        let mut map = ChainMap::new();
        let mut inserted = Vec::new();
        for i in 0..200 {
            let key = format!("grow-{i:03}");
            map.insert(&key, i);
            inserted.push(key);
            if map.capacity_index() == 1 {
                break;
            }
        }
        assert_eq!(map.capacity_index(), 1, "0.8 occupancy must be crossed");
        assert_eq!(map.capacity(), 97);
        map.check_invariants();
        for (i, key) in inserted.iter().enumerate() {
            assert_eq!(map.get(key), Some(&(i as i32)));
        }
    }

    /// Invariant: relative chain order survives growth, so a shadowing
    /// duplicate still wins after the table re-buckets.
    #[test]
    fn growth_preserves_duplicate_shadowing() {
        let mut map = ChainMap::new();
        map.insert("dup", 1);
        map.insert("dup", 2);
        for i in 0..200 {
            map.insert(&format!("filler-{i:03}"), 0);
            if map.capacity_index() == 1 {
                break;
            }
        }
        assert_eq!(map.capacity_index(), 1);
        map.check_invariants();
        assert_eq!(map.get("dup"), Some(&2));
        assert_eq!(map.remove("dup"), Ok(2));
        assert_eq!(map.get("dup"), Some(&1));
    }

    /// Invariant: the load factor counts occupied buckets; a single hot key
    /// never grows the table no matter how many entries chain behind it.
    #[test]
    fn occupied_tracks_buckets_not_entries() {
        let mut map = ChainMap::new();
        for i in 0..50 {
            map.insert("same", i);
        }
        map.check_invariants();
        assert_eq!(map.len(), 50);
        assert_eq!(map.occupied_buckets(), 1);
        assert_eq!(map.capacity_index(), 0);
        assert_eq!(map.get("same"), Some(&49));
    }

    /// Invariant: the empty key and keys of every tail length round-trip.
    #[test]
    fn short_keys_round_trip() {
        let mut map = ChainMap::new();
        for (i, key) in ["", "a", "ab", "abc", "abcd", "abcde"].iter().enumerate() {
            map.insert(key, i);
        }
        map.check_invariants();
        for (i, key) in ["", "a", "ab", "abc", "abcd", "abcde"].iter().enumerate() {
            assert_eq!(map.get(key), Some(&i));
        }
    }

    /// Invariant: `get_mut` mutates the stored value in place; lookups
    /// observe the update.
    #[test]
    fn get_mut_updates_in_place() {
        let mut map = ChainMap::new();
        map.insert("k", 10);
        *map.get_mut("k").unwrap() += 5;
        assert_eq!(map.get("k"), Some(&15));
        assert!(map.get_mut("missing").is_none());
    }

    /// Invariant: a key that is a prefix of a stored key never matches it;
    /// lookup and removal both use exact equality.
    #[test]
    fn prefix_keys_do_not_match() {
        let mut map = ChainMap::new();
        map.insert("prefix-and-more", 1);
        assert_eq!(map.get("prefix"), None);
        assert_eq!(map.remove("prefix"), Err(TableError::KeyNotFound));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("prefix-and-more"), Some(&1));
    }
}
