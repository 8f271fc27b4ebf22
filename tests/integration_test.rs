use std::convert::Infallible;

use fuller::config::{AttackConfig, EvictionStrategy};
use fuller::hammerer::Hammering;
use fuller::memory::{
    AddressRange, AggressorPtr, BankHash, BytePointer, Memory, PhysAddr, RowGroups,
    VirtToPhysResolver, write_and_flush,
};
use fuller::util::{PAGE_SIZE, Size};
use fuller_evict::{DECOY_COUNT, EvictHammerer, EvictionSet};
use fuller_flush::{FlushHammerer, FlushInstruction};

const CONFIG_FILE: &str = "config/attack-config.json";

/// Resolver with a scripted physical layout, so arrangement is testable
/// without CAP_SYS_ADMIN.
struct StubResolver {
    base: u64,
    frames: Vec<u64>,
}

impl VirtToPhysResolver for StubResolver {
    type Error = Infallible;
    fn get_phys(&mut self, virt: u64) -> Result<PhysAddr, Self::Error> {
        let page = ((virt - self.base) / PAGE_SIZE as u64) as usize;
        Ok(PhysAddr::new(self.frames[page] as usize))
    }
}

#[test]
fn test_three_page_arrangement() -> anyhow::Result<()> {
    let config = AttackConfig::from_jsonfile(CONFIG_FILE)?;
    let dram = config.dram_config();
    assert_eq!(dram.row_size(), 262144);
    assert_eq!(dram.pages_per_row(), 4);

    const BASE: usize = 0x2000000000;
    let mapping = Memory::new(BASE as *mut u8, 3 * PAGE_SIZE);
    // rows 0, 128 and 256 of bank set 0
    let mut resolver = StubResolver {
        base: BASE as u64,
        frames: vec![0, 0x2000000, 0x4000000],
    };
    let mut groups = RowGroups::new();
    groups.populate(&mapping, &dram, &mut resolver)?;

    // each page lands in set 0 and, via the channel alias, in set 32
    assert_eq!(groups.num_sets(), 2);
    for row in [0, 128, 256] {
        for set in [BankHash::new(0), BankHash::new(1 << 5)] {
            let pages = groups.pages(set, row);
            assert_eq!(pages.len(), 1);
            assert_eq!(pages[0] as usize, BASE + row as usize / 128 * PAGE_SIZE);
        }
    }

    let (first, second) = groups
        .aggressor_pair(BankHash::new(0))
        .expect("set 0 spans three rows");
    assert_eq!(first as usize, BASE);
    assert_eq!(second as usize, BASE + PAGE_SIZE);
    Ok(())
}

#[test]
fn test_config_driven_hammer_run() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = AttackConfig::from_jsonfile(CONFIG_FILE)?;

    let mem = Memory::mmap(Size::KB(8).bytes())?;
    let pattern: u64 = rand::random();
    write_and_flush(&mem, 0, pattern);
    write_and_flush(&mem, PAGE_SIZE, !pattern);
    let first = AddressRange::new(mem.addr(0) as AggressorPtr, PAGE_SIZE);
    let second = AddressRange::new(mem.addr(PAGE_SIZE) as AggressorPtr, PAGE_SIZE);

    match config.eviction {
        EvictionStrategy::Flush => {
            let instruction =
                FlushInstruction::for_profile(config.profile, config.disable_clflushopt);
            let hammerer = FlushHammerer::new(first, second, 2048, instruction, config.fence);
            hammerer.hammer()?;
        }
        EvictionStrategy::DecoySet => {
            let decoy_mem = Memory::mmap((2 * DECOY_COUNT + 2) * PAGE_SIZE)?;
            let first_decoys = std::array::from_fn(|decoy| {
                decoy_mem.addr((2 + decoy) * PAGE_SIZE) as AggressorPtr
            });
            let second_decoys = std::array::from_fn(|decoy| {
                decoy_mem.addr((2 + DECOY_COUNT + decoy) * PAGE_SIZE) as AggressorPtr
            });
            let hammerer = EvictHammerer::new(
                EvictionSet::new(first, first_decoys),
                EvictionSet::new(second, second_decoys),
                256,
            );
            hammerer.hammer()?;
            decoy_mem.dealloc();
        }
    }

    // two isolated pages and a short run: the patterns must survive
    let first_word = unsafe { std::ptr::read_volatile(mem.addr(0) as *const u64) };
    assert_eq!(first_word, pattern);
    let second_word = unsafe { std::ptr::read_volatile(mem.addr(PAGE_SIZE) as *const u64) };
    assert_eq!(second_word, !pattern);
    mem.dealloc();
    Ok(())
}
