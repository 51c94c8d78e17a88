use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::world_core::config::PermutationKind;

/// Ken Perlin's canonical 2002 permutation of 0..=255.
const CLASSIC: [u8; 256] = [
    151, 160, 137, 91, 90, 15, 131, 13, 201, 95, 96, 53, 194, 233, 7, 225, 140, 36, 103, 30, 69,
    142, 8, 99, 37, 240, 21, 10, 23, 190, 6, 148, 247, 120, 234, 75, 0, 26, 197, 62, 94, 252, 219,
    203, 117, 35, 11, 32, 57, 177, 33, 88, 237, 149, 56, 87, 174, 20, 125, 136, 171, 168, 68, 175,
    74, 165, 71, 134, 139, 48, 27, 166, 77, 146, 158, 231, 83, 111, 229, 122, 60, 211, 133, 230,
    220, 105, 92, 41, 55, 46, 245, 40, 244, 102, 143, 54, 65, 25, 63, 161, 1, 216, 80, 73, 209, 76,
    132, 187, 208, 89, 18, 169, 200, 196, 135, 130, 116, 188, 159, 86, 164, 100, 109, 198, 173,
    186, 3, 64, 52, 217, 226, 250, 124, 123, 5, 202, 38, 147, 118, 126, 255, 82, 85, 212, 207, 206,
    59, 227, 47, 16, 58, 17, 182, 189, 28, 42, 223, 183, 170, 213, 119, 248, 152, 2, 44, 154, 163,
    70, 221, 153, 101, 155, 167, 43, 172, 9, 129, 22, 39, 253, 19, 98, 108, 110, 79, 113, 224, 232,
    178, 185, 112, 104, 218, 246, 97, 228, 251, 34, 242, 193, 238, 210, 144, 12, 191, 179, 162,
    241, 81, 51, 145, 235, 249, 14, 239, 107, 49, 192, 214, 31, 181, 199, 106, 157, 184, 84, 204,
    176, 115, 121, 50, 45, 127, 4, 150, 254, 138, 236, 205, 93, 222, 114, 67, 29, 24, 72, 243, 141,
    128, 195, 78, 66, 215, 61, 156, 180,
];

pub const TABLE_LEN: usize = 512;

/// Gradient hash table: a permutation of 0..=255 stored twice so lookups of
/// `p[i + 1]` never need to wrap.
#[derive(Clone, PartialEq, Eq)]
pub struct PermutationTable {
    values: [u8; TABLE_LEN],
}

impl PermutationTable {
    pub fn from_seed(seed: u32) -> Self {
        let mut base: Vec<u8> = (0..=255u8).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed as u64);
        base.shuffle(&mut rng);
        Self::doubled(&base)
    }

    pub fn classic() -> Self {
        Self::doubled(&CLASSIC)
    }

    pub fn new(kind: PermutationKind, seed: u32) -> Self {
        match kind {
            PermutationKind::Seeded => Self::from_seed(seed),
            PermutationKind::Classic => Self::classic(),
        }
    }

    fn doubled(base: &[u8]) -> Self {
        debug_assert_eq!(base.len(), 256);
        let mut values = [0u8; TABLE_LEN];
        values[..256].copy_from_slice(base);
        values[256..].copy_from_slice(base);
        Self { values }
    }

    #[inline]
    pub fn get(&self, index: usize) -> usize {
        self.values[index] as usize
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.values
    }
}

impl std::fmt::Debug for PermutationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermutationTable")
            .field("head", &&self.values[..8])
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_gives_identical_tables() {
        for seed in [0, 1, 42, 0xDEAD_BEEF, u32::MAX] {
            assert_eq!(PermutationTable::from_seed(seed), PermutationTable::from_seed(seed));
        }
    }

    #[test]
    fn different_seeds_shuffle_differently() {
        assert_ne!(PermutationTable::from_seed(1), PermutationTable::from_seed(2));
    }

    #[test]
    fn table_is_a_duplicated_permutation() {
        let table = PermutationTable::from_seed(42);
        let values = table.as_slice();
        assert_eq!(values.len(), TABLE_LEN);
        assert_eq!(&values[..256], &values[256..]);

        let mut seen = [false; 256];
        for &v in &values[..256] {
            assert!(!seen[v as usize], "value {v} appears twice");
            seen[v as usize] = true;
        }
    }

    #[test]
    fn classic_table_starts_with_reference_values() {
        let table = PermutationTable::classic();
        assert_eq!(&table.as_slice()[..4], &[151, 160, 137, 91]);
        assert_eq!(table.get(256), 151);

        let mut sorted = CLASSIC.to_vec();
        sorted.sort_unstable();
        assert!(sorted.iter().enumerate().all(|(i, &v)| i == v as usize));
    }
}
