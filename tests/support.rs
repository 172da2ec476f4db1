use anyhow::Result;
use junctools::mates::{expand_mates, supporting_reads};
use junctools::progress::{Counters, REPORT_EVERY};
use junctools::report::unique_records;
use junctools::support::{count_junctions, discover, find_support};
use junctools::{
    AlignmentRecord, AlignmentSource, ChromosomeOrder, CountTable, HashSet, Junction, ProgressObserver,
    ScanScope, SearchConfig, Silent, Strand, SupportFilter, TargetSet, parse_cigar,
};
use noodles::sam::alignment::record::Flags;
use std::sync::atomic::{AtomicU64, Ordering};

/// Records held in memory; region scans return every mapped record that
/// overlaps a window, once per window, like an index query.
struct MemorySource {
    records: Vec<AlignmentRecord>,
}

impl AlignmentSource for MemorySource {
    fn scan(
        &self,
        scope: ScanScope<'_>,
        visit: &mut dyn FnMut(AlignmentRecord) -> Result<()>,
    ) -> Result<()> {
        match scope {
            ScanScope::All => {
                for record in &self.records {
                    visit(record.clone())?;
                }
            }
            ScanScope::Regions(regions) => {
                for region in regions {
                    for record in &self.records {
                        if record.is_mapped() && region.overlaps(&record.chromosome, record.start, record.end()) {
                            visit(record.clone())?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn record(chrom: &str, start: u64, cigar: &str, read: &str, strand: Strand) -> AlignmentRecord {
    AlignmentRecord::new(chrom, start, parse_cigar(cigar).unwrap(), read).with_strand(strand)
}

fn sample_source() -> MemorySource {
    MemorySource {
        records: vec![
            record("I", 100, "50M200N50M", "r1", Strand::Forward),
            record("I", 120, "30M200N70M", "r2", Strand::Forward),
            record("I", 110, "40M200N60M", "r3", Strand::Reverse),
            record("I", 100, "50M200N20M100N30M", "r4", Strand::Unknown),
            record("II", 5000, "100M", "r5", Strand::Unknown),
            record("II", 5000, "20M1000N80M", "r6", Strand::Forward),
            AlignmentRecord::new("*", 0, Vec::new(), "r7").with_flags(Flags::UNMAPPED),
        ],
    }
}

#[test]
fn discovery_counts_every_supporting_record() {
    let n = 17;
    let source = MemorySource {
        records: (0..n)
            .map(|i| record("I", 100 - i, &format!("{}M200N50M", 50 + i), &format!("r{i}"), Strand::Forward))
            .collect(),
    };
    let table = discover(&[source], 1, &Silent).unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.count(&Junction::new("I", 150, 349, Strand::Forward)), n);
}

#[test]
fn discovery_keys_on_all_four_fields() {
    let table = discover(&[sample_source()], 1, &Silent).unwrap();
    assert_eq!(table.count(&Junction::new("I", 150, 349, Strand::Forward)), 2);
    assert_eq!(table.count(&Junction::new("I", 150, 349, Strand::Reverse)), 1);
    assert_eq!(table.count(&Junction::new("I", 150, 349, Strand::Unknown)), 1);
    assert_eq!(table.count(&Junction::new("I", 370, 469, Strand::Unknown)), 1);
    assert_eq!(table.count(&Junction::new("II", 5020, 6019, Strand::Forward)), 1);
    assert_eq!(table.len(), 5);
}

#[test]
fn multiple_sources_are_summed_and_sharding_does_not_change_counts() {
    let sources: Vec<MemorySource> = (0..5).map(|_| sample_source()).collect();
    let serial = discover(&sources, 1, &Silent).unwrap();
    let sharded = discover(&sources, 4, &Silent).unwrap();
    assert_eq!(serial.count(&Junction::new("I", 150, 349, Strand::Forward)), 10);

    let order = ChromosomeOrder::lexical();
    let serial_rows: Vec<(Junction, u64)> = serial
        .sorted_junctions(&order)
        .into_iter()
        .map(|j| {
            let c = serial.count(&j);
            (j, c)
        })
        .collect();
    let sharded_rows: Vec<(Junction, u64)> = sharded
        .sorted_junctions(&order)
        .into_iter()
        .map(|j| {
            let c = sharded.count(&j);
            (j, c)
        })
        .collect();
    assert_eq!(serial_rows, sharded_rows);
}

#[test]
fn merge_is_associative() {
    let a = count_junctions(&sample_source(), &Counters::default(), &Silent).unwrap();
    let b = count_junctions(&sample_source(), &Counters::default(), &Silent).unwrap();
    let c = count_junctions(&sample_source(), &Counters::default(), &Silent).unwrap();

    let mut left = a.clone();
    left.merge(b.clone());
    left.merge(c.clone());

    let mut bc = b;
    bc.merge(c);
    let mut right = a;
    right.merge(bc);

    for junction in left.junctions() {
        assert_eq!(left.count(junction), right.count(junction));
    }
    assert_eq!(left.len(), right.len());
}

#[test]
fn reconciliation_makes_key_set_exactly_known() {
    let mut table = discover(&[sample_source()], 1, &Silent).unwrap();
    let seen = Junction::new("I", 150, 349, Strand::Forward);
    let unseen = Junction::new("III", 10, 20, Strand::Reverse);
    let known: HashSet<Junction> = [seen.clone(), unseen.clone()].into_iter().collect();

    table.reconcile(&known);
    let keys: HashSet<Junction> = table.junctions().cloned().collect();
    assert_eq!(keys, known);
    assert_eq!(table.count(&seen), 2);
    assert_eq!(table.count(&unseen), 0);
    assert!(table.contains(&unseen));
}

#[test]
fn filters_combine_with_or() {
    let mut table = CountTable::new();
    let strong_stranded = Junction::new("I", 10, 20, Strand::Forward);
    let strong_unknown = Junction::new("I", 30, 40, Strand::Unknown);
    let weak_stranded = Junction::new("I", 50, 60, Strand::Reverse);
    let weak_unknown = Junction::new("I", 70, 80, Strand::Unknown);
    for _ in 0..5 {
        table.increment(strong_stranded.clone());
        table.increment(strong_unknown.clone());
    }
    table.increment(weak_stranded.clone());
    table.increment(weak_unknown.clone());

    let report = table.apply_filter(&SupportFilter {
        min_support: 2,
        strand_required: true,
    });
    assert_eq!(report.below_min_support, 2);
    assert_eq!(report.unknown_strand, 2);
    assert_eq!(report.removed, 3);
    assert_eq!(table.junctions().collect::<Vec<_>>(), vec![&strong_stranded]);
}

#[test]
fn default_filter_keeps_everything() {
    let mut table = discover(&[sample_source()], 1, &Silent).unwrap();
    let before = table.len();
    let report = table.apply_filter(&SupportFilter::default());
    assert_eq!(report.removed, 0);
    assert_eq!(table.len(), before);
}

#[test]
fn unknown_strand_target_collects_both_strands() {
    let source = sample_source();
    let target = Junction::new("I", 150, 349, Strand::Unknown);
    let targets: TargetSet = [target.clone()].into_iter().collect();
    let table = find_support(&source, &targets, &SearchConfig::default(), &ChromosomeOrder::lexical(), &Silent)
        .unwrap();

    assert_eq!(table.len(), 1);
    let reads: Vec<&str> = table.get(&target).unwrap().iter().map(|r| r.read_id.as_str()).collect();
    assert_eq!(reads, ["r1", "r4", "r3", "r2"]);
}

#[test]
fn stranded_target_requires_exact_match() {
    let source = sample_source();
    let target = Junction::new("I", 150, 349, Strand::Reverse);
    let targets: TargetSet = [target.clone()].into_iter().collect();
    let table = find_support(&source, &targets, &SearchConfig::default(), &ChromosomeOrder::lexical(), &Silent)
        .unwrap();
    let reads: Vec<&str> = table.get(&target).unwrap().iter().map(|r| r.read_id.as_str()).collect();
    assert_eq!(reads, ["r3"]);
}

#[test]
fn targeted_search_deduplicates_records_seen_in_several_windows() {
    let source = sample_source();
    let targets: TargetSet = [
        Junction::new("I", 150, 349, Strand::Forward),
        Junction::new("I", 370, 469, Strand::Unknown),
        Junction::new("II", 5020, 6019, Strand::Forward),
        Junction::new("II", 9000, 9100, Strand::Forward),
    ]
    .into_iter()
    .collect();
    let config = SearchConfig {
        read_span: 0,
        threads: 1,
    };
    let table = find_support(&source, &targets, &config, &ChromosomeOrder::lexical(), &Silent).unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.get(&Junction::new("I", 150, 349, Strand::Forward)).unwrap().len(), 2);
    assert_eq!(table.get(&Junction::new("I", 370, 469, Strand::Unknown)).unwrap().len(), 1);
    assert_eq!(table.total_records(), 4);
}

#[test]
fn sharded_targeted_search_matches_serial() {
    let source = MemorySource {
        records: (0..200u64)
            .map(|i| {
                let chrom = if i % 2 == 0 { "I" } else { "II" };
                record(chrom, 1000 * i + 1, "30M100N30M", &format!("q{i}"), Strand::Forward)
            })
            .collect(),
    };
    let targets: TargetSet = (0..200u64)
        .step_by(3)
        .map(|i| {
            let chrom = if i % 2 == 0 { "I" } else { "II" };
            Junction::new(chrom, 1000 * i + 31, 1000 * i + 130, Strand::Unknown)
        })
        .collect();
    let order = ChromosomeOrder::lexical();

    let serial = find_support(&source, &targets, &SearchConfig { read_span: 150, threads: 1 }, &order, &Silent)
        .unwrap();
    let sharded = find_support(&source, &targets, &SearchConfig { read_span: 150, threads: 4 }, &order, &Silent)
        .unwrap();

    assert_eq!(serial.len(), targets.len());
    assert_eq!(serial.len(), sharded.len());
    for junction in serial.junctions() {
        let a: Vec<_> = serial.get(junction).unwrap().iter().map(|r| r.key()).collect();
        let b: Vec<_> = sharded.get(junction).unwrap().iter().map(|r| r.key()).collect();
        assert_eq!(a, b);
    }
}

#[test]
fn mate_expansion_adds_every_alignment_of_supporting_reads() {
    let junction = Junction::new("I", 150, 349, Strand::Forward);
    let spliced = record("I", 100, "50M200N50M", "pair", Strand::Forward)
        .with_flags(Flags::SEGMENTED | Flags::FIRST_SEGMENT);
    let mate = record("I", 900, "100M", "pair", Strand::Unknown)
        .with_flags(Flags::SEGMENTED | Flags::LAST_SEGMENT | Flags::REVERSE_COMPLEMENTED);
    let supplementary = record("V", 77, "40M", "pair", Strand::Unknown)
        .with_flags(Flags::SEGMENTED | Flags::FIRST_SEGMENT | Flags::SUPPLEMENTARY);
    let unrelated = record("I", 120, "100M", "other", Strand::Unknown);
    let source = MemorySource {
        records: vec![spliced, mate, supplementary, unrelated],
    };

    let targets: TargetSet = [junction.clone()].into_iter().collect();
    let table = find_support(&source, &targets, &SearchConfig::default(), &ChromosomeOrder::lexical(), &Silent)
        .unwrap();
    assert_eq!(table.get(&junction).unwrap().len(), 1);
    assert_eq!(supporting_reads(&table).len(), 1);

    let expanded = expand_mates(&source, table, &Silent).unwrap();
    let records = expanded.get(&junction).unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.read_id == "pair"));
    assert_eq!(records.iter().filter(|r| !r.is_primary).count(), 1);
}

#[test]
fn mate_expansion_only_touches_junctions_each_read_supports() {
    let j1 = Junction::new("I", 150, 349, Strand::Forward);
    let j2 = Junction::new("I", 400, 599, Strand::Forward);
    let j3 = Junction::new("II", 1000, 1099, Strand::Forward);
    let first = Flags::SEGMENTED | Flags::FIRST_SEGMENT;
    let last = Flags::SEGMENTED | Flags::LAST_SEGMENT | Flags::REVERSE_COMPLEMENTED;
    let source = MemorySource {
        records: vec![
            record("I", 100, "50M200N50M", "a", Strand::Forward).with_flags(first),
            record("I", 100, "50M200N50M200N50M", "b", Strand::Forward).with_flags(first),
            record("I", 900, "100M", "a", Strand::Unknown).with_flags(last),
            record("I", 1200, "100M", "b", Strand::Unknown).with_flags(last),
            record("V", 77, "40M", "a", Strand::Unknown).with_flags(first | Flags::SECONDARY),
            record("X", 10, "30M", "b", Strand::Unknown).with_flags(first | Flags::SECONDARY),
            record("II", 900, "100M", "c", Strand::Unknown),
        ],
    };

    let targets: TargetSet = [j1.clone(), j2.clone(), j3.clone()].into_iter().collect();
    let table = find_support(&source, &targets, &SearchConfig::default(), &ChromosomeOrder::lexical(), &Silent)
        .unwrap();
    assert_eq!(table.get(&j1).unwrap().len(), 2);
    assert_eq!(table.get(&j2).unwrap().len(), 1);

    let expanded = expand_mates(&source, table, &Silent).unwrap();
    let reads_of = |junction: &Junction| {
        let mut reads: Vec<(String, u64)> = expanded
            .get(junction)
            .unwrap()
            .iter()
            .map(|r| (r.read_id.clone(), r.start))
            .collect();
        reads.sort();
        reads
    };
    assert_eq!(
        reads_of(&j1),
        [
            ("a".to_string(), 77),
            ("a".to_string(), 100),
            ("a".to_string(), 900),
            ("b".to_string(), 10),
            ("b".to_string(), 100),
            ("b".to_string(), 1200),
        ]
    );
    assert_eq!(
        reads_of(&j2),
        [("b".to_string(), 10), ("b".to_string(), 100), ("b".to_string(), 1200)]
    );
    assert!(expanded.get(&j3).is_none_or(|set| set.is_empty()));
}

#[test]
fn unplaced_mates_do_not_disable_the_rank_table() {
    let junction = Junction::new("II", 150, 349, Strand::Forward);
    let source = MemorySource {
        records: vec![
            record("II", 100, "50M200N50M", "a", Strand::Forward)
                .with_flags(Flags::SEGMENTED | Flags::FIRST_SEGMENT),
            AlignmentRecord::new("*", 0, Vec::new(), "a")
                .with_flags(Flags::SEGMENTED | Flags::LAST_SEGMENT | Flags::UNMAPPED),
            record("II", 100, "50M200N50M", "b", Strand::Forward),
            record("X", 40, "60M", "b", Strand::Unknown).with_flags(Flags::SUPPLEMENTARY),
        ],
    };
    let targets: TargetSet = [junction].into_iter().collect();
    let order = ChromosomeOrder::new([("X", 1), ("II", 2)]);
    let table = find_support(&source, &targets, &SearchConfig::default(), &order, &Silent).unwrap();
    let expanded = expand_mates(&source, table, &Silent).unwrap();

    let placed: Vec<(&str, &str)> = unique_records(&expanded, &order)
        .iter()
        .map(|r| (r.chromosome.as_str(), r.read_id.as_str()))
        .collect();
    assert_eq!(placed, [("X", "b"), ("II", "a"), ("II", "b"), ("*", "a")]);
}

struct CountingObserver {
    calls: AtomicU64,
    last_lines: AtomicU64,
}

impl ProgressObserver for CountingObserver {
    fn report(&self, lines_read: u64, _matches_found: u64) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.last_lines.store(lines_read, Ordering::Relaxed);
    }
}

#[test]
fn progress_is_reported_every_fixed_number_of_records() {
    let total = REPORT_EVERY * 2 + 10;
    let source = MemorySource {
        records: (0..total)
            .map(|i| record("I", i + 1, "10M", &format!("p{i}"), Strand::Unknown))
            .collect(),
    };
    let observer = CountingObserver {
        calls: AtomicU64::new(0),
        last_lines: AtomicU64::new(0),
    };
    let counters = Counters::default();
    count_junctions(&source, &counters, &observer).unwrap();
    assert_eq!(observer.calls.load(Ordering::Relaxed), 2);
    assert_eq!(observer.last_lines.load(Ordering::Relaxed), REPORT_EVERY * 2);
    assert_eq!(counters.lines(), total);
}

#[test]
fn sharded_runner_returns_every_result_or_the_first_error() {
    let mut squares = junctools::run_sharded((1..=20u64).collect(), 4, |n| Ok(n * n)).unwrap();
    squares.sort_unstable();
    assert_eq!(squares, (1..=20u64).map(|n| n * n).collect::<Vec<_>>());

    let err = junctools::run_sharded((1..=20u64).collect(), 4, |n| {
        if n == 13 { anyhow::bail!("job {n} failed") } else { Ok(n) }
    })
    .unwrap_err();
    assert_eq!(err.to_string(), "job 13 failed");
}
