use std::hash::Hasher;

use crate::layout::NUM_BUCKETS;

/// Initial value of the DJB hash fold.
pub const HASH_SEED: u32 = 5381;

/// The CDB key hash: `h = ((h << 5) + h) ^ c` over every byte, starting at
/// [`HASH_SEED`], with 32-bit wraparound at each step.
///
/// Both 32-bit and 64-bit files use this 32-bit hash, so 64-bit files gain
/// address space but not collision resistance.
pub fn hash(key: &[u8]) -> u32 {
    key.iter().fold(HASH_SEED, |h, &c| step(h, c))
}

#[inline]
fn step(h: u32, c: u8) -> u32 {
    (h.wrapping_shl(5).wrapping_add(h)) ^ u32::from(c)
}

/// Which of the 256 hash tables a key with this hash belongs to.
pub fn bucket_index(hash: u32) -> usize {
    hash as usize % NUM_BUCKETS
}

/// First slot probed for `hash` in a table of `slot_count` slots.
///
/// Must stay `(hash / 256) % slot_count` for compatibility with other
/// CDB implementations. `slot_count` must be non-zero.
pub fn probe_start(hash: u32, slot_count: u64) -> u64 {
    (u64::from(hash) / NUM_BUCKETS as u64) % slot_count
}

/// Incremental form of [`hash`], for keys assembled from several parts.
#[derive(Clone, Copy, Debug)]
pub struct CdbHasher(u32);

impl CdbHasher {
    pub fn new() -> Self {
        Self(HASH_SEED)
    }

    pub fn reset(&mut self) {
        self.0 = HASH_SEED;
    }

    /// The 32-bit hash of everything written so far.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl Default for CdbHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for CdbHasher {
    fn finish(&self) -> u64 {
        u64::from(self.0)
    }

    fn write(&mut self, bytes: &[u8]) {
        self.0 = bytes.iter().fold(self.0, |h, &c| step(h, c));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_values() {
        assert_eq!(hash(b""), 5381);
        assert_eq!(hash(b"a"), 177_604);
        assert_eq!(hash(b"foo"), 193_410_979);
        assert_eq!(hash(b"This is a test"), 3_132_333_678);
    }

    #[test]
    fn long_keys_wrap_at_32_bits() {
        let key = b"hello world".repeat(10);
        assert_eq!(hash(&key), 402_470_533);
    }

    #[test]
    fn bucket_and_probe() {
        let h = hash(b"foo");
        assert_eq!(bucket_index(h), 163);
        assert_eq!(probe_start(h, 7), (193_410_979 / 256) % 7);
        assert_eq!(probe_start(255, 3), 0);
    }

    #[test]
    fn hasher_matches_one_shot() {
        let mut hasher = CdbHasher::new();
        hasher.write(b"This is ");
        hasher.write(b"a test");
        assert_eq!(hasher.value(), hash(b"This is a test"));
        assert_eq!(hasher.finish(), u64::from(hash(b"This is a test")));

        hasher.reset();
        assert_eq!(hasher.value(), HASH_SEED);
    }

    proptest! {
        #[test]
        fn split_point_does_not_matter(key in proptest::collection::vec(any::<u8>(), 0..64), at in 0usize..64) {
            let at = at.min(key.len());
            let mut hasher = CdbHasher::default();
            hasher.write(&key[..at]);
            hasher.write(&key[at..]);
            prop_assert_eq!(hasher.value(), hash(&key));
        }
    }
}
