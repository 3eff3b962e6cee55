//! Shared transposition table.
//!
//! Fixed-capacity associative store mapping Zobrist keys to search results.
//! Buckets hold four 16-byte slots (one cache line). Each slot is a pair of
//! atomic words: one carries the 48-bit key tag, generation, and depth, the
//! other the packed move, score, static eval, and bound. Probes are
//! lock-free and re-verify the key tag, so a torn read degrades to a miss
//! or to stale data for the same position; stores serialize through a small
//! array of shard locks indexed by bucket.
//!
//! The table can be persisted: magic `SRTT`, version, slot count,
//! configured megabytes, generation, then the raw slot pairs.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use parking_lot::Mutex;

use crate::board::Move;

/// Bound classification of a stored score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Exact,
    Lower,
    Upper,
}

impl Bound {
    const fn to_bits(self) -> u64 {
        match self {
            Bound::Exact => 0,
            Bound::Lower => 1,
            Bound::Upper => 2,
        }
    }

    const fn from_bits(bits: u64) -> Bound {
        match bits & 0b11 {
            1 => Bound::Lower,
            2 => Bound::Upper,
            _ => Bound::Exact,
        }
    }
}

/// Decoded table entry.
#[derive(Clone, Copy, Debug)]
pub struct TtEntry {
    pub mv: Move,
    pub score: i16,
    pub static_eval: i16,
    pub depth: i8,
    pub bound: Bound,
    pub generation: u8,
}

impl TtEntry {
    /// The stored best move, when one was recorded.
    #[must_use]
    pub fn best_move(&self) -> Option<Move> {
        if self.mv == Move::null() {
            None
        } else {
            Some(self.mv)
        }
    }
}

/// Depth sentinel marking an empty slot.
const EMPTY_DEPTH_BYTE: u64 = 0;

struct Slot {
    /// key_tag(48) | generation(8) | depth_byte(8); zero means empty.
    meta: AtomicU64,
    /// mv(16) | score(16) | static_eval(16) | bound(2).
    data: AtomicU64,
}

impl Slot {
    const fn empty() -> Self {
        Slot {
            meta: AtomicU64::new(0),
            data: AtomicU64::new(0),
        }
    }
}

#[repr(align(64))]
struct Bucket {
    slots: [Slot; 4],
}

impl Bucket {
    const fn empty() -> Self {
        Bucket {
            slots: [Slot::empty(), Slot::empty(), Slot::empty(), Slot::empty()],
        }
    }
}

const SHARD_COUNT: usize = 64;

/// Persisted-file failure; the in-memory table is left untouched.
#[derive(Debug)]
pub enum TtFileError {
    Io(std::io::Error),
    BadMagic([u8; 4]),
    BadVersion(u32),
    BadSlotCount(u64),
}

impl fmt::Display for TtFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TtFileError::Io(e) => write!(f, "hash file i/o error: {e}"),
            TtFileError::BadMagic(found) => {
                write!(f, "bad hash file magic {found:?}, expected \"SRTT\"")
            }
            TtFileError::BadVersion(v) => write!(f, "unsupported hash file version {v}"),
            TtFileError::BadSlotCount(n) => write!(f, "invalid hash file slot count {n}"),
        }
    }
}

impl std::error::Error for TtFileError {}

impl From<std::io::Error> for TtFileError {
    fn from(e: std::io::Error) -> Self {
        TtFileError::Io(e)
    }
}

const MAGIC: [u8; 4] = *b"SRTT";
const FILE_VERSION: u32 = 1;

pub struct TranspositionTable {
    buckets: Vec<Bucket>,
    bucket_mask: usize,
    shards: Vec<Mutex<()>>,
    generation: AtomicU8,
    configured_mb: usize,
}

#[inline]
fn key_tag(key: u64) -> u64 {
    key >> 16
}

#[inline]
fn pack_meta(key: u64, generation: u8, depth: i8) -> u64 {
    let depth_byte = (depth as i16 + 1) as u64 & 0xFF;
    (key_tag(key) << 16) | (u64::from(generation) << 8) | depth_byte
}

#[inline]
fn pack_data(mv: Move, score: i16, static_eval: i16, bound: Bound) -> u64 {
    u64::from(mv.as_u16())
        | (u64::from(score as u16) << 16)
        | (u64::from(static_eval as u16) << 32)
        | (bound.to_bits() << 48)
}

fn decode(meta: u64, data: u64) -> TtEntry {
    TtEntry {
        mv: Move::from_u16((data & 0xFFFF) as u16),
        score: ((data >> 16) & 0xFFFF) as u16 as i16,
        static_eval: ((data >> 32) & 0xFFFF) as u16 as i16,
        depth: (((meta & 0xFF) as i16) - 1) as i8,
        bound: Bound::from_bits(data >> 48),
        generation: ((meta >> 8) & 0xFF) as u8,
    }
}

impl TranspositionTable {
    /// Create a table of approximately `size_mb` megabytes: the largest
    /// power-of-two bucket count whose storage fits.
    #[must_use]
    pub fn new(size_mb: usize) -> Self {
        let size_mb = size_mb.max(1);
        let bytes = size_mb * 1024 * 1024;
        let max_buckets = bytes / std::mem::size_of::<Bucket>();
        let num_buckets = if max_buckets.is_power_of_two() {
            max_buckets
        } else {
            (max_buckets.next_power_of_two() / 2).max(1)
        };

        let mut buckets = Vec::with_capacity(num_buckets);
        buckets.resize_with(num_buckets, Bucket::empty);

        let mut shards = Vec::with_capacity(SHARD_COUNT);
        shards.resize_with(SHARD_COUNT, || Mutex::new(()));

        TranspositionTable {
            buckets,
            bucket_mask: num_buckets - 1,
            shards,
            generation: AtomicU8::new(0),
            configured_mb: size_mb,
        }
    }

    #[must_use]
    pub fn configured_mb(&self) -> usize {
        self.configured_mb
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.buckets.len() * 4
    }

    /// Bump the search epoch and return the new generation tag.
    pub fn prepare_for_search(&self) -> u8 {
        self.generation.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    #[must_use]
    pub fn generation(&self) -> u8 {
        self.generation.load(Ordering::Relaxed)
    }

    #[inline]
    fn bucket_index(&self, key: u64) -> usize {
        (key as usize) & self.bucket_mask
    }

    /// Lock-free lookup. A stale pairing of the two slot words for the same
    /// key yields plausible old data; a pairing across keys fails the tag
    /// check and reads as a miss.
    #[must_use]
    pub fn probe(&self, key: u64) -> Option<TtEntry> {
        let bucket = &self.buckets[self.bucket_index(key)];
        let tag = key_tag(key);

        for slot in &bucket.slots {
            let meta = slot.meta.load(Ordering::Relaxed);
            if meta & 0xFF == EMPTY_DEPTH_BYTE {
                continue;
            }
            if meta >> 16 == tag {
                let data = slot.data.load(Ordering::Relaxed);
                return Some(decode(meta, data));
            }
        }

        None
    }

    /// Store an entry, serializing writers per shard. The replacement
    /// victim is the matching-key slot if any, else an empty slot, else
    /// the oldest-and-shallowest slot in the bucket.
    pub fn store(
        &self,
        key: u64,
        mv: Move,
        score: i16,
        static_eval: i16,
        depth: i8,
        bound: Bound,
        generation: u8,
    ) {
        let bucket_idx = self.bucket_index(key);
        let _guard = self.shards[bucket_idx % SHARD_COUNT].lock();
        let bucket = &self.buckets[bucket_idx];
        let tag = key_tag(key);

        let meta = pack_meta(key, generation, depth);
        let data = pack_data(mv, score, static_eval, bound);

        // Same position: keep the deeper result unless the new bound is
        // exact or the old entry is from an earlier search.
        for slot in &bucket.slots {
            let slot_meta = slot.meta.load(Ordering::Relaxed);
            if slot_meta & 0xFF != EMPTY_DEPTH_BYTE && slot_meta >> 16 == tag {
                let existing = decode(slot_meta, slot.data.load(Ordering::Relaxed));
                let replace = bound == Bound::Exact
                    || existing.generation != generation
                    || depth >= existing.depth;
                if replace {
                    slot.data.store(data, Ordering::Relaxed);
                    slot.meta.store(meta, Ordering::Relaxed);
                }
                return;
            }
        }

        for slot in &bucket.slots {
            if slot.meta.load(Ordering::Relaxed) & 0xFF == EMPTY_DEPTH_BYTE {
                slot.data.store(data, Ordering::Relaxed);
                slot.meta.store(meta, Ordering::Relaxed);
                return;
            }
        }

        // Evict: lowest (depth, recency) score loses
        let mut victim = 0;
        let mut worst_priority = i32::MAX;
        for (idx, slot) in bucket.slots.iter().enumerate() {
            let slot_meta = slot.meta.load(Ordering::Relaxed);
            let entry_depth = ((slot_meta & 0xFF) as i32) - 1;
            let age = generation.wrapping_sub(((slot_meta >> 8) & 0xFF) as u8);
            let priority = entry_depth * 2 - i32::from(age) * 2;
            if priority < worst_priority {
                worst_priority = priority;
                victim = idx;
            }
        }
        let slot = &bucket.slots[victim];
        slot.data.store(data, Ordering::Relaxed);
        slot.meta.store(meta, Ordering::Relaxed);
    }

    /// Reset every slot to empty.
    pub fn clear(&self) {
        for bucket in &self.buckets {
            for slot in &bucket.slots {
                slot.meta.store(0, Ordering::Relaxed);
                slot.data.store(0, Ordering::Relaxed);
            }
        }
    }

    /// Estimated fill rate in thousandths, sampled from the table head.
    /// Feeds the UCI `hashfull` field.
    #[must_use]
    pub fn hashfull_per_mille(&self) -> u32 {
        let sample_buckets = self.buckets.len().min(250);
        if sample_buckets == 0 {
            return 0;
        }
        let mut occupied = 0u32;
        for bucket in &self.buckets[..sample_buckets] {
            for slot in &bucket.slots {
                if slot.meta.load(Ordering::Relaxed) & 0xFF != EMPTY_DEPTH_BYTE {
                    occupied += 1;
                }
            }
        }
        occupied * 1000 / (sample_buckets as u32 * 4)
    }

    /// Persist the whole table.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TtFileError> {
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);

        out.write_all(&MAGIC)?;
        out.write_all(&FILE_VERSION.to_le_bytes())?;
        out.write_all(&(self.slot_count() as u64).to_le_bytes())?;
        out.write_all(&(self.configured_mb as u64).to_le_bytes())?;
        out.write_all(&[self.generation.load(Ordering::Relaxed)])?;

        for bucket in &self.buckets {
            for slot in &bucket.slots {
                out.write_all(&slot.meta.load(Ordering::Relaxed).to_le_bytes())?;
                out.write_all(&slot.data.load(Ordering::Relaxed).to_le_bytes())?;
            }
        }

        out.flush()?;
        Ok(())
    }

    /// Load a persisted table. Returns a fresh table; the caller swaps it
    /// in only on success, so a corrupt file leaves the current table
    /// untouched.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TtFileError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(TtFileError::BadMagic(magic));
        }

        let mut buf4 = [0u8; 4];
        reader.read_exact(&mut buf4)?;
        let version = u32::from_le_bytes(buf4);
        if version != FILE_VERSION {
            return Err(TtFileError::BadVersion(version));
        }

        let mut buf8 = [0u8; 8];
        reader.read_exact(&mut buf8)?;
        let slot_count = u64::from_le_bytes(buf8);
        let bucket_count = slot_count / 4;
        if slot_count == 0 || slot_count % 4 != 0 || !bucket_count.is_power_of_two() {
            return Err(TtFileError::BadSlotCount(slot_count));
        }

        reader.read_exact(&mut buf8)?;
        let configured_mb = u64::from_le_bytes(buf8) as usize;

        let mut gen_byte = [0u8; 1];
        reader.read_exact(&mut gen_byte)?;

        let bucket_count = bucket_count as usize;
        let mut buckets = Vec::with_capacity(bucket_count);
        buckets.resize_with(bucket_count, Bucket::empty);
        for bucket in &buckets {
            for slot in &bucket.slots {
                reader.read_exact(&mut buf8)?;
                slot.meta.store(u64::from_le_bytes(buf8), Ordering::Relaxed);
                reader.read_exact(&mut buf8)?;
                slot.data.store(u64::from_le_bytes(buf8), Ordering::Relaxed);
            }
        }

        let mut shards = Vec::with_capacity(SHARD_COUNT);
        shards.resize_with(SHARD_COUNT, || Mutex::new(()));

        Ok(TranspositionTable {
            bucket_mask: bucket_count - 1,
            buckets,
            shards,
            generation: AtomicU8::new(gen_byte[0]),
            configured_mb: configured_mb.max(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Square;

    fn test_move() -> Move {
        Move::quiet(Square::new(1, 4), Square::new(3, 4))
    }

    #[test]
    fn test_store_probe_round_trip() {
        let tt = TranspositionTable::new(1);
        let generation = tt.prepare_for_search();
        let key = 0xDEAD_BEEF_CAFE_F00Du64;

        tt.store(key, test_move(), 42, 17, 9, Bound::Lower, generation);

        let entry = tt.probe(key).expect("entry stored");
        assert_eq!(entry.best_move(), Some(test_move()));
        assert_eq!(entry.score, 42);
        assert_eq!(entry.static_eval, 17);
        assert_eq!(entry.depth, 9);
        assert_eq!(entry.bound, Bound::Lower);
        assert_eq!(entry.generation, generation);
    }

    #[test]
    fn test_probe_miss() {
        let tt = TranspositionTable::new(1);
        assert!(tt.probe(0x1234_5678_9ABC_DEF0).is_none());
    }

    #[test]
    fn test_negative_scores_round_trip() {
        let tt = TranspositionTable::new(1);
        let generation = tt.prepare_for_search();
        tt.store(99, test_move(), -31000, -5, 0, Bound::Upper, generation);
        let entry = tt.probe(99).expect("stored");
        assert_eq!(entry.score, -31000);
        assert_eq!(entry.static_eval, -5);
        assert_eq!(entry.depth, 0);
    }

    #[test]
    fn test_same_key_keeps_deeper_entry() {
        let tt = TranspositionTable::new(1);
        let generation = tt.prepare_for_search();
        let key = 777u64;

        tt.store(key, test_move(), 10, 0, 12, Bound::Lower, generation);
        tt.store(key, Move::null(), 20, 0, 3, Bound::Lower, generation);

        let entry = tt.probe(key).expect("stored");
        assert_eq!(entry.depth, 12, "shallow same-generation store must not clobber");

        // An exact bound replaces regardless of depth
        tt.store(key, test_move(), 30, 0, 3, Bound::Exact, generation);
        let entry = tt.probe(key).expect("stored");
        assert_eq!(entry.depth, 3);
        assert_eq!(entry.bound, Bound::Exact);
    }

    #[test]
    fn test_clear_empties_table() {
        let tt = TranspositionTable::new(1);
        let generation = tt.prepare_for_search();
        tt.store(5, test_move(), 1, 1, 1, Bound::Exact, generation);
        assert!(tt.probe(5).is_some());
        tt.clear();
        assert!(tt.probe(5).is_none());
        assert_eq!(tt.hashfull_per_mille(), 0);
    }

    #[test]
    fn test_generation_wraps() {
        let tt = TranspositionTable::new(1);
        let mut last = tt.generation();
        for _ in 0..300 {
            let next = tt.prepare_for_search();
            assert_eq!(next, last.wrapping_add(1));
            last = next;
        }
    }

    #[test]
    fn test_bucket_eviction_prefers_old_and_shallow() {
        let tt = TranspositionTable::new(1);
        let generation = tt.prepare_for_search();

        // Five keys in the same bucket (identical low bits) with distinct
        // key tags force one eviction
        let keys: Vec<u64> = (0..5u64).map(|i| 0x42 | (i + 1) << 32).collect();
        for (i, &key) in keys.iter().enumerate() {
            let depth = if i == 0 { 1 } else { 10 + i as i8 };
            tt.store(key, test_move(), 0, 0, depth, Bound::Exact, generation);
        }

        // The shallow first entry should be the victim
        assert!(tt.probe(keys[0]).is_none());
        for &key in &keys[1..] {
            assert!(tt.probe(key).is_some());
        }
    }

    #[test]
    fn test_save_load_preserves_probes() {
        let tt = TranspositionTable::new(1);
        let generation = tt.prepare_for_search();
        let keys: Vec<u64> = (1..100u64)
            .map(|i| i.wrapping_mul(0x9E37_79B9_7F4A_7C15))
            .collect();
        for (i, &key) in keys.iter().enumerate() {
            tt.store(
                key,
                test_move(),
                i as i16,
                -(i as i16),
                (i % 40) as i8,
                Bound::Exact,
                generation,
            );
        }

        let path = std::env::temp_dir().join(format!("sirocco_tt_{}.bin", std::process::id()));
        tt.save(&path).expect("save");
        let loaded = TranspositionTable::load(&path).expect("load");
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.slot_count(), tt.slot_count());
        assert_eq!(loaded.configured_mb(), tt.configured_mb());
        for &key in &keys {
            let a = tt.probe(key);
            let b = loaded.probe(key);
            match (a, b) {
                (None, None) => {}
                (Some(x), Some(y)) => {
                    assert_eq!(x.score, y.score);
                    assert_eq!(x.depth, y.depth);
                    assert_eq!(x.mv, y.mv);
                    assert_eq!(x.bound, y.bound);
                }
                other => panic!("probe mismatch after reload: {other:?}"),
            }
        }
    }

    #[test]
    fn test_load_rejects_bad_magic() {
        let path = std::env::temp_dir().join(format!("sirocco_tt_bad_{}.bin", std::process::id()));
        std::fs::write(&path, b"XXTT-not-a-table").unwrap();
        assert!(matches!(
            TranspositionTable::load(&path),
            Err(TtFileError::BadMagic(_))
        ));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_rejects_truncated_file() {
        let tt = TranspositionTable::new(1);
        let path = std::env::temp_dir().join(format!("sirocco_tt_trunc_{}.bin", std::process::id()));
        tt.save(&path).expect("save");
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
        assert!(matches!(
            TranspositionTable::load(&path),
            Err(TtFileError::Io(_))
        ));
        std::fs::remove_file(&path).ok();
    }
}
