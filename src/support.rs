//! Junction support tables and the scans that fill them.
//!
//! Discovery scans count every junction found in every record. Targeted
//! scans visit only the planned windows around a target set and collect the
//! records supporting each target. Tables from independent shards merge
//! associatively (counts add, record sets union).

use crate::alignment::{AlignmentRecord, RecordKey};
use crate::bam_io::{AlignmentSource, ScanScope};
use crate::chrom_order::ChromosomeOrder;
use crate::progress::{Counters, ProgressObserver};
use crate::regions::plan_regions;
use crate::shard::run_sharded;
use crate::types::{HashMap, HashMapExt, HashSet, HashSetExt, Junction, Region};
use anyhow::Result;
use std::collections::BTreeMap;
use std::collections::hash_map::Entry;

/// A value that can be accumulated per junction and merged across shards.
pub trait Support: Default + Send + 'static {
    fn absorb(&mut self, other: Self);
}

impl Support for u64 {
    fn absorb(&mut self, other: Self) {
        *self += other;
    }
}

/// Records supporting one junction, deduplicated by `RecordKey`.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: BTreeMap<RecordKey, AlignmentRecord>,
}

impl RecordSet {
    /// Returns false when an identical record was already present.
    pub fn insert(&mut self, record: AlignmentRecord) -> bool {
        match self.records.entry(record.key()) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, key: &RecordKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AlignmentRecord> {
        self.records.values()
    }
}

impl Support for RecordSet {
    fn absorb(&mut self, other: Self) {
        for (key, record) in other.records {
            self.records.entry(key).or_insert(record);
        }
    }
}

#[derive(Debug, Clone)]
pub struct SupportTable<V> {
    entries: HashMap<Junction, V>,
}

pub type CountTable = SupportTable<u64>;
pub type RecordTable = SupportTable<RecordSet>;

impl<V> Default for SupportTable<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V: Support> SupportTable<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, junction: &Junction) -> Option<&V> {
        self.entries.get(junction)
    }

    pub fn contains(&self, junction: &Junction) -> bool {
        self.entries.contains_key(junction)
    }

    /// The value for `junction`, created empty on first use.
    pub fn entry(&mut self, junction: Junction) -> &mut V {
        self.entries.entry(junction).or_default()
    }

    pub fn insert(&mut self, junction: Junction, value: V) {
        self.entries.insert(junction, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Junction, &V)> {
        self.entries.iter()
    }

    pub fn junctions(&self) -> impl Iterator<Item = &Junction> {
        self.entries.keys()
    }

    /// Union with `other`, combining values of shared junctions.
    pub fn merge(&mut self, other: Self) {
        for (junction, value) in other.entries {
            match self.entries.entry(junction) {
                Entry::Occupied(mut slot) => slot.get_mut().absorb(value),
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
            }
        }
    }

    /// Junctions in output order.
    pub fn sorted_junctions(&self, order: &ChromosomeOrder) -> Vec<Junction> {
        let mut junctions: Vec<Junction> = self.entries.keys().cloned().collect();
        order.sort_junctions(&mut junctions);
        junctions
    }
}

impl CountTable {
    pub fn increment(&mut self, junction: Junction) {
        *self.entry(junction) += 1;
    }

    pub fn count(&self, junction: &Junction) -> u64 {
        self.get(junction).copied().unwrap_or(0)
    }

    /// Make the key set exactly `known`: known junctions that were not seen
    /// get a count of 0, discovered junctions outside `known` are dropped.
    pub fn reconcile(&mut self, known: &HashSet<Junction>) {
        self.entries.retain(|junction, _| known.contains(junction));
        for junction in known {
            self.entries.entry(junction.clone()).or_insert(0);
        }
    }

    /// Drop junctions failing either criterion. Runs once, after accumulation.
    pub fn apply_filter(&mut self, filter: &SupportFilter) -> FilterReport {
        let mut report = FilterReport::default();
        self.entries.retain(|junction, count| {
            let mut drop = false;
            if *count < filter.min_support {
                report.below_min_support += 1;
                drop = true;
            }
            if filter.strand_required && !junction.strand.is_known() {
                report.unknown_strand += 1;
                drop = true;
            }
            if drop {
                report.removed += 1;
            }
            !drop
        });
        report
    }
}

impl RecordTable {
    pub fn total_records(&self) -> usize {
        self.entries.values().map(RecordSet::len).sum()
    }
}

/// Post-filters for discovery counts. A junction is removed when its count
/// is below `min_support` or when `strand_required` is set and its strand is
/// unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct SupportFilter {
    pub min_support: u64,
    pub strand_required: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub below_min_support: usize,
    pub unknown_strand: usize,
    pub removed: usize,
}

/// Count every junction in one source.
pub fn count_junctions<S>(
    source: &S,
    counters: &Counters,
    observer: &dyn ProgressObserver,
) -> Result<CountTable>
where
    S: AlignmentSource + ?Sized,
{
    let mut table = CountTable::new();
    source.scan(ScanScope::All, &mut |record| {
        counters.tick(observer);
        let junctions = record.junctions()?;
        counters.found(junctions.len() as u64);
        for junction in junctions {
            table.increment(junction);
        }
        Ok(())
    })?;
    Ok(table)
}

/// Discovery mode over several sources, one shard per source.
pub fn discover<S>(
    sources: &[S],
    threads: usize,
    observer: &dyn ProgressObserver,
) -> Result<CountTable>
where
    S: AlignmentSource,
{
    let counters = Counters::default();
    let jobs: Vec<usize> = (0..sources.len()).collect();
    let tables = run_sharded(jobs, threads, |idx| {
        count_junctions(&sources[idx], &counters, observer)
    })?;

    let mut merged = CountTable::new();
    for table in tables {
        merged.merge(table);
    }
    tracing::info!(
        lines_read = counters.lines(),
        junctions = merged.len(),
        files = sources.len(),
        "junction discovery complete"
    );
    Ok(merged)
}

/// The junctions a targeted search looks for.
///
/// A target with a known strand only accepts support on that strand. A
/// target whose strand is unknown accepts support from either strand.
#[derive(Debug, Clone, Default)]
pub struct TargetSet {
    targets: HashSet<Junction>,
}

impl TargetSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, junction: Junction) -> bool {
        self.targets.insert(junction)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Junction> {
        self.targets.iter()
    }

    pub fn contains(&self, junction: &Junction) -> bool {
        self.targets.contains(junction)
    }

    /// Targets supported by a decoded junction.
    pub fn matching(&self, junction: &Junction) -> Vec<&Junction> {
        let mut hits = Vec::with_capacity(2);
        if let Some(t) = self.targets.get(junction) {
            hits.push(t);
        }
        if junction.strand.is_known()
            && let Some(t) = self.targets.get(&junction.unstranded())
        {
            hits.push(t);
        }
        hits
    }
}

impl FromIterator<Junction> for TargetSet {
    fn from_iter<I: IntoIterator<Item = Junction>>(iter: I) -> Self {
        let mut targets = HashSet::new();
        targets.extend(iter);
        Self { targets }
    }
}

/// Options for a targeted scan.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub read_span: u64,
    pub threads: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            read_span: crate::regions::DEFAULT_READ_SPAN,
            threads: 1,
        }
    }
}

/// Collect records supporting targets inside `regions`.
pub fn collect_in_regions<S>(
    source: &S,
    regions: &[Region],
    targets: &TargetSet,
    counters: &Counters,
    observer: &dyn ProgressObserver,
) -> Result<RecordTable>
where
    S: AlignmentSource + ?Sized,
{
    let mut table = RecordTable::new();
    source.scan(ScanScope::Regions(regions), &mut |record| {
        counters.tick(observer);
        for junction in record.junctions()? {
            for target in targets.matching(&junction) {
                if table.entry(target.clone()).insert(record.clone()) {
                    counters.found(1);
                }
            }
        }
        Ok(())
    })?;
    Ok(table)
}

/// Targeted mode: plan windows around `targets`, scan only those, and keep
/// every record whose junctions match a target.
pub fn find_support<S>(
    source: &S,
    targets: &TargetSet,
    config: &SearchConfig,
    order: &ChromosomeOrder,
    observer: &dyn ProgressObserver,
) -> Result<RecordTable>
where
    S: AlignmentSource + ?Sized,
{
    let regions = plan_regions(targets.iter(), config.read_span, order);
    tracing::info!(targets = targets.len(), regions = regions.len(), "searching for supporting alignments");

    let shard_count = config.threads.max(1).saturating_mul(4);
    let chunk_len = regions.len().div_ceil(shard_count).max(1);
    let jobs: Vec<Vec<Region>> = regions.chunks(chunk_len).map(<[Region]>::to_vec).collect();

    let counters = Counters::default();
    let tables = run_sharded(jobs, config.threads, |chunk| {
        collect_in_regions(source, &chunk, targets, &counters, observer)
    })?;

    let mut merged = RecordTable::new();
    for table in tables {
        merged.merge(table);
    }
    tracing::info!(
        lines_read = counters.lines(),
        supporting_alignments = counters.matches(),
        "targeted search complete"
    );
    Ok(merged)
}
