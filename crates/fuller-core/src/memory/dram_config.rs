use std::fmt::{self, Display, Formatter};

use serde::Deserialize;

use crate::memory::{AggressorPtr, PhysAddr};
use crate::util::PAGE_SIZE;

/// Bit position of the channel parity within a [`BankHash`].
const CHANNEL_BIT: usize = 5;

/// Number of bank/rank parity functions per profile.
const BANK_FN_COUNT: usize = 5;

/// XOR-fold functions of one microarchitecture: five bank/rank groups plus
/// the channel group, each a list of physical address bit indices.
struct HashFns {
    banks: [&'static [u32]; BANK_FN_COUNT],
    channel: &'static [u32],
}

// Bank, rank and channel functions from https://github.com/IAIK/rowhammerjs.
// Bit indices apply to the dual-DIMM layout; with a single DIMM every
// non-channel index drops by one.

const SANDY_FNS: HashFns = HashFns {
    banks: [
        &[14, 18], // BA0
        &[15, 19], // BA1
        &[16, 20], // BA2
        &[17, 21], // rank
        &[17, 21],
    ],
    channel: &[6],
};

const IVY_HASWELL_FNS: HashFns = HashFns {
    banks: [
        &[14, 18], // BA0
        &[15, 19], // BA1
        &[16, 20], // rank
        &[17, 21], // BA2
        &[17, 21],
    ],
    channel: &[7, 8, 9, 12, 13, 18, 19],
};

const SKYLAKE_FNS: HashFns = HashFns {
    banks: [
        &[7, 14], // BG0
        &[15, 19], // BG1
        &[16, 20], // rank
        &[17, 21], // BA0
        &[18, 22], // BA1
    ],
    channel: &[8, 9, 12, 13, 18, 19],
};

/// Microarchitecture profile selecting the DRAM addressing functions.
///
/// Selected at startup (typically from the JSON attack configuration) rather
/// than at build time, so all profiles are testable in a single build.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DramProfile {
    /// Sandy Bridge memory controllers
    SandyBridge,
    /// Ivy Bridge memory controllers
    IvyBridge,
    /// Haswell memory controllers (same bank functions as Ivy Bridge)
    Haswell,
    /// Skylake memory controllers (bank groups, extra address bit)
    Skylake,
    /// Fallback for machines with unknown addressing functions. Hashing
    /// degrades to a single bank set; hammering still runs but aggressor
    /// selection is blind.
    Generic,
}

impl DramProfile {
    fn hash_fns(&self) -> Option<&'static HashFns> {
        match self {
            DramProfile::SandyBridge => Some(&SANDY_FNS),
            DramProfile::IvyBridge | DramProfile::Haswell => Some(&IVY_HASWELL_FNS),
            DramProfile::Skylake => Some(&SKYLAKE_FNS),
            DramProfile::Generic => None,
        }
    }

    /// Row size multiplier of this profile. Skylake addresses one extra bank
    /// group bit, doubling the stride between row repeats.
    pub fn arch_shift(&self) -> usize {
        match self {
            DramProfile::Skylake => 2,
            _ => 1,
        }
    }

    /// Number of DRAM rows the bytes of a single OS page are scattered
    /// across.
    fn page_span(&self, dimms: usize) -> usize {
        match (self, dimms) {
            (DramProfile::Skylake, 1) => 2,
            (DramProfile::Skylake, _) => 4,
            (_, 1) => 1,
            (_, _) => 2,
        }
    }
}

/// Identifier of the bank/rank/channel combination a physical address maps
/// to (0-63).
///
/// Two addresses with equal `BankHash` and equal row index reside in the
/// physically same DRAM row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BankHash(usize);

impl BankHash {
    /// Creates a bank hash from its raw set index.
    pub fn new(set: usize) -> Self {
        BankHash(set)
    }

    /// Returns the raw set index.
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl Display for BankHash {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        write!(fmt, "{}", self.0)
    }
}

/// DRAM geometry of the attacked machine.
///
/// Immutable value constructed once via [`DramConfig::new`] and passed by
/// reference to every hashing and arrangement call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DramConfig {
    profile: DramProfile,
    dimms: usize,
    ranks_per_dimm: usize,
    banks_per_rank: usize,
    row_bytes: usize,
    page_span_row: usize,
    row_size: usize,
    pages_per_row: u64,
}

impl DramConfig {
    /// Builds the geometry for `dimms` installed DIMMs (1 or 2) under the
    /// given profile.
    ///
    /// # Panics
    ///
    /// Panics if `dimms` is not 1 or 2.
    pub fn new(profile: DramProfile, dimms: usize) -> Self {
        assert!(
            (1..=2).contains(&dimms),
            "dimm count must be 1 or 2, got {}",
            dimms
        );
        let ranks_per_dimm = 2;
        let banks_per_rank = 8;
        let row_bytes = 8 * 1024; //bytes for a row in a bank
        let page_span_row = profile.page_span(dimms);
        let row_size = row_bytes * banks_per_rank * ranks_per_dimm * dimms * profile.arch_shift();
        let pages_per_row = (row_bytes / (PAGE_SIZE / page_span_row)) as u64;
        DramConfig {
            profile,
            dimms,
            ranks_per_dimm,
            banks_per_rank,
            row_bytes,
            page_span_row,
            row_size,
            pages_per_row,
        }
    }

    /// Returns the profile this geometry was built for.
    pub fn profile(&self) -> DramProfile {
        self.profile
    }

    /// Returns the number of installed DIMMs.
    pub fn dimms(&self) -> usize {
        self.dimms
    }

    /// Byte distance after which physical addresses revisit the same row of
    /// the same bank.
    pub fn row_size(&self) -> usize {
        self.row_size
    }

    /// Number of (partial) OS pages whose bytes fall into one DRAM row.
    pub fn pages_per_row(&self) -> u64 {
        self.pages_per_row
    }

    /// Index of the DRAM row containing `phys`, within whichever bank its
    /// hash designates. Row numbering restarts per bank set, so index reuse
    /// across sets is expected.
    pub fn row_index(&self, phys: PhysAddr) -> u64 {
        (phys.as_usize() / self.row_size) as u64
    }

    /// Computes the bank set of a physical address.
    ///
    /// XOR-folds the profile's bit groups into one parity bit each; the
    /// channel parity (dual-DIMM only) lands at bit 5. With a single DIMM
    /// every non-channel bit index is lowered by one. The result depends on
    /// nothing but `phys` and this configuration.
    pub fn bank_hash(&self, phys: PhysAddr) -> BankHash {
        let Some(fns) = self.profile.hash_fns() else {
            return BankHash(0);
        };
        let p = phys.as_usize();
        let single_dimm_shift = if self.dimms == 1 { 1 } else { 0 };
        let mut set = 0;
        for (pos, bits) in fns.banks.iter().enumerate() {
            let mut parity = 0;
            for &bit in *bits {
                parity ^= (p >> (bit as usize - single_dimm_shift)) & 1;
            }
            set |= parity << pos;
        }
        if self.dimms == 2 {
            let mut parity = 0;
            for &bit in fns.channel {
                parity ^= (p >> bit as usize) & 1;
            }
            set |= parity << CHANNEL_BIT;
        }
        BankHash(set)
    }

    /// Returns every (bank set, companion address) pair one page touches,
    /// primary pair first.
    ///
    /// A 4096-byte page may physically straddle several DRAM rows (see
    /// [`pages_per_row`](Self::pages_per_row)); the extra pairs are derived
    /// by flipping profile-specific bits in both the hash and the virtual
    /// address.
    pub fn aliased_sets(
        &self,
        set: BankHash,
        vaddr: AggressorPtr,
    ) -> Vec<(BankHash, AggressorPtr)> {
        let flip = |hash_bits: usize, addr_bits: usize| {
            (
                BankHash(set.0 ^ hash_bits),
                ((vaddr as usize) ^ addr_bits) as AggressorPtr,
            )
        };
        let mut spans = vec![(set, vaddr)];
        match (self.profile, self.dimms) {
            (DramProfile::SandyBridge, 2) => {
                spans.push(flip(1 << CHANNEL_BIT, 1 << 6));
            }
            (DramProfile::IvyBridge | DramProfile::Haswell, 2) => {
                spans.push(flip(1 << CHANNEL_BIT, 1 << 7));
            }
            (DramProfile::Skylake, 1) => {
                spans.push(flip(1, 1 << 6));
            }
            (DramProfile::Skylake, 2) => {
                spans.push(flip(1, 1 << 7));
                spans.push(flip(1 << CHANNEL_BIT, 1 << 8));
                spans.push(flip(1 | 1 << CHANNEL_BIT, 1 << 7 | 1 << 8));
            }
            _ => {}
        }
        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_row_size_products() {
        // 8192 bytes/row x 8 banks x 2 ranks x dimms x shift
        let haswell_two = DramConfig::new(DramProfile::Haswell, 2);
        assert_eq!(haswell_two.row_size(), 262144);
        let haswell_one = DramConfig::new(DramProfile::Haswell, 1);
        assert_eq!(haswell_one.row_size(), 131072);
        let ivy_two = DramConfig::new(DramProfile::IvyBridge, 2);
        assert_eq!(ivy_two.row_size(), 262144);
        let skylake_two = DramConfig::new(DramProfile::Skylake, 2);
        assert_eq!(skylake_two.row_size(), 524288);
        let generic_one = DramConfig::new(DramProfile::Generic, 1);
        assert_eq!(generic_one.row_size(), 131072);
    }

    #[test]
    fn test_pages_per_row() {
        assert_eq!(DramConfig::new(DramProfile::Haswell, 1).pages_per_row(), 2);
        assert_eq!(DramConfig::new(DramProfile::Haswell, 2).pages_per_row(), 4);
        assert_eq!(DramConfig::new(DramProfile::Skylake, 1).pages_per_row(), 4);
        assert_eq!(DramConfig::new(DramProfile::Skylake, 2).pages_per_row(), 8);
    }

    #[test]
    fn test_bank_hash_known_bits() {
        let config = DramConfig::new(DramProfile::Haswell, 2);
        // bit 14 is in the BA0 group only
        assert_eq!(config.bank_hash(PhysAddr::new(1 << 14)), BankHash::new(1));
        // bit 17 feeds both the fourth and fifth group
        assert_eq!(
            config.bank_hash(PhysAddr::new(1 << 17)),
            BankHash::new(0b11000)
        );
        // bit 7 only feeds the channel parity
        assert_eq!(
            config.bank_hash(PhysAddr::new(1 << 7)),
            BankHash::new(1 << 5)
        );
        // both bits of the paired rank/BA2 groups cancel out
        assert_eq!(
            config.bank_hash(PhysAddr::new(1 << 17 | 1 << 21)),
            BankHash::new(0)
        );
    }

    #[test]
    fn test_bank_hash_single_dimm_shift() {
        let config = DramConfig::new(DramProfile::Haswell, 1);
        // BA0 group drops from {14, 18} to {13, 17}; no channel parity
        assert_eq!(config.bank_hash(PhysAddr::new(1 << 13)), BankHash::new(1));
        assert_eq!(config.bank_hash(PhysAddr::new(1 << 7)), BankHash::new(0));
    }

    #[test]
    fn test_skylake_bank_groups() {
        let config = DramConfig::new(DramProfile::Skylake, 2);
        assert_eq!(config.bank_hash(PhysAddr::new(1 << 7)), BankHash::new(1));
        assert_eq!(
            config.bank_hash(PhysAddr::new(1 << 22)),
            BankHash::new(0b10000)
        );
    }

    #[test]
    fn test_generic_profile_hashes_to_zero() {
        let config = DramConfig::new(DramProfile::Generic, 2);
        let mut rng = rand::rng();
        for _ in 0..1000 {
            let phys = PhysAddr::new(rng.random::<u64>() as usize);
            assert_eq!(config.bank_hash(phys), BankHash::new(0));
        }
    }

    #[test]
    fn test_bank_hash_deterministic() {
        let config = DramConfig::new(DramProfile::Skylake, 2);
        let rebuilt = DramConfig::new(DramProfile::Skylake, 2);
        assert_eq!(config, rebuilt);
        let mut rng = rand::rng();
        for _ in 0..1000 {
            let phys = PhysAddr::new(rng.random::<u64>() as usize);
            assert_eq!(config.bank_hash(phys), config.bank_hash(phys));
            assert_eq!(config.bank_hash(phys), rebuilt.bank_hash(phys));
        }
    }

    #[test]
    fn test_aliased_sets_per_profile() {
        let vaddr = 0x1000 as AggressorPtr;
        let primary = BankHash::new(0);

        let sandy_one = DramConfig::new(DramProfile::SandyBridge, 1);
        assert_eq!(sandy_one.aliased_sets(primary, vaddr).len(), 1);

        let sandy_two = DramConfig::new(DramProfile::SandyBridge, 2);
        let spans = sandy_two.aliased_sets(primary, vaddr);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].0, BankHash::new(1 << 5));
        assert_eq!(spans[1].1 as usize, 0x1040);

        let haswell_two = DramConfig::new(DramProfile::Haswell, 2);
        let spans = haswell_two.aliased_sets(primary, vaddr);
        assert_eq!(spans[1].0, BankHash::new(1 << 5));
        assert_eq!(spans[1].1 as usize, 0x1080);

        let skylake_one = DramConfig::new(DramProfile::Skylake, 1);
        let spans = skylake_one.aliased_sets(primary, vaddr);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].0, BankHash::new(1));
        assert_eq!(spans[1].1 as usize, 0x1040);

        let skylake_two = DramConfig::new(DramProfile::Skylake, 2);
        let spans = skylake_two.aliased_sets(primary, vaddr);
        assert_eq!(spans.len(), 4);
        assert_eq!(spans[1].0, BankHash::new(1));
        assert_eq!(spans[1].1 as usize, 0x1080);
        assert_eq!(spans[2].0, BankHash::new(1 << 5));
        assert_eq!(spans[2].1 as usize, 0x1100);
        assert_eq!(spans[3].0, BankHash::new(0b100001));
        assert_eq!(spans[3].1 as usize, 0x1180);
    }

    #[test]
    #[should_panic(expected = "dimm count must be 1 or 2")]
    fn test_invalid_dimm_count() {
        DramConfig::new(DramProfile::Haswell, 3);
    }
}
