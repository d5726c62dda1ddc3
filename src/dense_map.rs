//! A dense, open-addressed hash table mapping sparse 64-bit OSM node ids to
//! gap-free 32-bit indices.
//!
//! This is the component that dominates peak memory: the engine needs two of
//! these (one sized to the highway-node count, one to the intersection
//! count) alive at once during P3. A flat, linearly-probed array keeps the
//! per-entry overhead to one `i64` key + one `u32` value, with no pointer
//! chasing.

use rustc_hash::FxHasher;
use std::hash::Hasher;

/// Sentinel returned by [`DenseIdMap::get`] for an absent key.
pub const ABSENT: u32 = u32::MAX;

/// OSM node ids are always non-negative; `i64::MIN` can never be a real key,
/// so it doubles as the "slot empty" marker without a separate bitset.
const EMPTY_KEY: i64 = i64::MIN;

const MAX_LOAD_FACTOR: f64 = 0.75;

/// Dense map from a sparse `i64` key space to `u32` indices in `[0, len())`,
/// assigned by the caller (see [`DenseIdMap::put`]) rather than by the map
/// itself — the map only stores the assignment, it doesn't hand out ids.
pub struct DenseIdMap {
    keys: Vec<i64>,
    values: Vec<u32>,
    len: usize,
    mask: usize,
}

impl DenseIdMap {
    /// Construct a table sized to hold `capacity_hint` entries at a load
    /// factor of at most [`MAX_LOAD_FACTOR`]. Sizing once, up front, against
    /// a good hint is the point — see the P1 pass, whose sole purpose is to
    /// produce this number for the highway map.
    pub fn new(capacity_hint: usize) -> Self {
        let min_slots = ((capacity_hint as f64 / MAX_LOAD_FACTOR).ceil() as usize).max(16);
        let slots = min_slots.next_power_of_two();
        Self {
            keys: vec![EMPTY_KEY; slots],
            values: vec![ABSENT; slots],
            len: 0,
            mask: slots - 1,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.keys.len()
    }

    fn mix(key: i64) -> u64 {
        let mut hasher = FxHasher::default();
        hasher.write_i64(key);
        hasher.finish()
    }

    /// Insert or overwrite `k -> v`. `v` must not equal [`ABSENT`].
    pub fn put(&mut self, k: i64, v: u32) {
        debug_assert_ne!(k, EMPTY_KEY, "OSM node ids must not be i64::MIN");
        debug_assert_ne!(v, ABSENT, "ABSENT is a reserved sentinel value");

        if (self.len + 1) as f64 > self.keys.len() as f64 * MAX_LOAD_FACTOR {
            self.grow();
        }

        let mut idx = (Self::mix(k) as usize) & self.mask;
        loop {
            let slot_key = self.keys[idx];
            if slot_key == EMPTY_KEY {
                self.keys[idx] = k;
                self.values[idx] = v;
                self.len += 1;
                return;
            }
            if slot_key == k {
                self.values[idx] = v;
                return;
            }
            idx = (idx + 1) & self.mask;
        }
    }

    /// Look up `k`, returning [`ABSENT`] if it was never inserted.
    pub fn get(&self, k: i64) -> u32 {
        let mut idx = (Self::mix(k) as usize) & self.mask;
        loop {
            let slot_key = self.keys[idx];
            if slot_key == EMPTY_KEY {
                return ABSENT;
            }
            if slot_key == k {
                return self.values[idx];
            }
            idx = (idx + 1) & self.mask;
        }
    }

    pub fn contains(&self, k: i64) -> bool {
        self.get(k) != ABSENT
    }

    /// Double the table and rehash. Only exercised if the caller's
    /// `capacity_hint` undershot the real entry count — with P1 sizing the
    /// highway map and half-of-`N_total` sizing the intersection map, this
    /// is a safety net, not the common path.
    fn grow(&mut self) {
        let new_slots = self.keys.len() * 2;
        let old_keys = std::mem::replace(&mut self.keys, vec![EMPTY_KEY; new_slots]);
        let old_values = std::mem::replace(&mut self.values, vec![ABSENT; new_slots]);
        self.mask = new_slots - 1;
        self.len = 0;

        for (k, v) in old_keys.into_iter().zip(old_values) {
            if k != EMPTY_KEY {
                self.put(k, v);
            }
        }
    }
}
