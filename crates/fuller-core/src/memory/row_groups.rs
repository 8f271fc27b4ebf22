use std::collections::HashMap;

use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use log::{debug, info, trace};

use crate::memory::{AggressorPtr, BankHash, BytePointer, DramConfig, VirtToPhysResolver};
use crate::util::{NamedProgress, PAGE_SIZE};

/// Pages of a memory mapping grouped by bank set and DRAM row.
///
/// The primary artifact handed to attack orchestration code: for a chosen
/// bank set it answers which virtual pages lie in which row, so the caller
/// can pick aggressor rows around a victim row. Built once per mapping scan
/// by [`RowGroups::populate`] and read-only afterwards.
#[derive(Debug, Default)]
pub struct RowGroups {
    groups: HashMap<BankHash, HashMap<u64, Vec<AggressorPtr>>>,
}

impl RowGroups {
    /// Creates an empty grouping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Walks `mapping` one page at a time and files every page under the
    /// (bank set, row index) pairs it touches.
    ///
    /// Each page is resolved to its physical address, hashed to its bank set
    /// and row, and inserted under the primary pair plus every aliased pair
    /// from [`DramConfig::aliased_sets`]. No page is processed twice;
    /// completion order across pages carries no meaning.
    ///
    /// # Errors
    ///
    /// Propagates resolver failures unchanged. A non-resident page is a
    /// caller bug (the mapping must be created with `MAP_POPULATE`) and
    /// leaves the grouping partially filled; discard it in that case.
    ///
    /// # Panics
    ///
    /// Panics if the mapping length is not a multiple of the page size.
    pub fn populate<R: VirtToPhysResolver>(
        &mut self,
        mapping: &dyn BytePointer,
        config: &DramConfig,
        resolver: &mut R,
    ) -> Result<(), R::Error> {
        let len = mapping.len();
        assert!(
            len.is_multiple_of(PAGE_SIZE),
            "mapping length ({}) must be divisible by PAGE_SIZE ({})",
            len,
            PAGE_SIZE
        );
        let pages = len / PAGE_SIZE;
        info!("arranging {} pages into bank sets and rows", pages);
        let progress = ProgressBar::new(pages as u64);
        progress.set_style(ProgressStyle::named_bar("Arrange pages"));
        for offset in (0..len).step_by(PAGE_SIZE) {
            let page = mapping.addr(offset) as AggressorPtr;
            let phys = resolver.get_phys(page as u64)?;
            let row = config.row_index(phys);
            let set = config.bank_hash(phys);
            trace!("page {:p}: phys {:p}, set {}, row {}", page, phys, set, row);
            for (span_set, _) in config.aliased_sets(set, page) {
                // The page base goes in under every set it spans; the
                // companion address only selects the extra set.
                // TODO: evaluate recording the companion address itself
                // alongside the page base
                self.insert(span_set, row, page);
            }
            progress.inc(1);
        }
        progress.finish_and_clear();
        debug!(
            "bank set occupancy: {}",
            self.groups
                .iter()
                .sorted_by_key(|(set, _)| **set)
                .map(|(set, rows)| format!("{}:{}", set, rows.len()))
                .join(" ")
        );
        info!("address arrangement done: {} bank sets", self.groups.len());
        Ok(())
    }

    fn insert(&mut self, set: BankHash, row: u64, page: AggressorPtr) {
        self.groups
            .entry(set)
            .or_default()
            .entry(row)
            .or_default()
            .push(page);
    }

    /// Returns the bank sets that received at least one page.
    pub fn sets(&self) -> impl Iterator<Item = BankHash> + '_ {
        self.groups.keys().copied()
    }

    /// Returns the row-to-pages mapping of one bank set.
    pub fn rows(&self, set: BankHash) -> Option<&HashMap<u64, Vec<AggressorPtr>>> {
        self.groups.get(&set)
    }

    /// Returns the pages recorded for one (bank set, row) pair, in insertion
    /// order. Empty if the pair never occurred.
    pub fn pages(&self, set: BankHash, row: u64) -> &[AggressorPtr] {
        self.groups
            .get(&set)
            .and_then(|rows| rows.get(&row))
            .map_or(&[], |pages| pages.as_slice())
    }

    /// Picks one page from each of the two lowest-numbered rows of a bank
    /// set: a candidate aggressor pair for hammering that bank.
    pub fn aggressor_pair(&self, set: BankHash) -> Option<(AggressorPtr, AggressorPtr)> {
        let rows = self.groups.get(&set)?;
        let mut rows = rows.iter().sorted_by_key(|(row, _)| **row);
        let (_, first) = rows.next()?;
        let (_, second) = rows.next()?;
        Some((*first.first()?, *second.first()?))
    }

    /// Number of distinct bank sets in the grouping.
    pub fn num_sets(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if no page has been arranged yet.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
