use junctools::chrom_order::ResolvedOrder;
use junctools::{ChromosomeOrder, Error, Junction, Region, Strand, plan_regions};
use std::cmp::Ordering;

fn junction(chrom: &str, start: u64, end: u64) -> Junction {
    Junction::new(chrom, start, end, Strand::Forward)
}

fn worm_order() -> ChromosomeOrder {
    ChromosomeOrder::parse_pairs(["I=1", "II=2", "III=3", "IV=4", "V=5", "X=6", "MtDNA=7"]).unwrap()
}

#[test]
fn single_junction_is_padded_on_both_sides() {
    let junctions = [junction("I", 500, 700)];
    let regions = plan_regions(&junctions, 150, &ChromosomeOrder::lexical());
    assert_eq!(regions, vec![Region::new("I", 350, 850)]);
}

#[test]
fn padding_is_clamped_at_chromosome_start() {
    let junctions = [junction("I", 40, 90)];
    let regions = plan_regions(&junctions, 150, &ChromosomeOrder::lexical());
    assert_eq!(regions, vec![Region::new("I", 1, 240)]);
}

#[test]
fn overlapping_and_touching_windows_merge() {
    let junctions = [
        junction("I", 500, 700),
        junction("I", 800, 900),   // [650, 1050] overlaps [350, 850]
        junction("I", 1350, 1400), // [1200, 1550], separate
        junction("I", 1700, 1800), // [1550, 1950] touches the previous close
    ];
    let regions = plan_regions(&junctions, 150, &ChromosomeOrder::lexical());
    assert_eq!(
        regions,
        vec![Region::new("I", 350, 1050), Region::new("I", 1200, 1950)]
    );
}

#[test]
fn windows_cover_every_padded_junction_and_are_disjoint() {
    let junctions: Vec<Junction> = (0..50u64)
        .map(|i| junction(if i % 3 == 0 { "II" } else { "I" }, 1000 + i * 137 % 5000, 1200 + i * 137 % 5000))
        .collect();
    let span = 75;
    let regions = plan_regions(&junctions, span, &ChromosomeOrder::lexical());

    for j in &junctions {
        let open = j.start.saturating_sub(span).max(1);
        let close = j.end + span;
        assert!(
            regions
                .iter()
                .any(|r| r.chromosome == j.chromosome && r.start <= open && close <= r.end),
            "{j} not covered"
        );
    }
    for (i, a) in regions.iter().enumerate() {
        for b in &regions[i + 1..] {
            assert!(!a.overlaps(&b.chromosome, b.start, b.end), "{a} overlaps {b}");
        }
    }
    for pair in regions.windows(2) {
        if pair[0].chromosome == pair[1].chromosome {
            assert!(pair[0].end < pair[1].start);
        }
    }
}

#[test]
fn regions_follow_chromosome_order() {
    let junctions = [junction("X", 100, 200), junction("II", 100, 200), junction("I", 100, 200)];
    let chroms: Vec<String> = plan_regions(&junctions, 10, &worm_order())
        .into_iter()
        .map(|r| r.chromosome)
        .collect();
    assert_eq!(chroms, ["I", "II", "X"]);

    let chroms: Vec<String> = plan_regions(&junctions, 10, &ChromosomeOrder::lexical())
        .into_iter()
        .map(|r| r.chromosome)
        .collect();
    assert_eq!(chroms, ["I", "II", "X"]);
}

#[test]
fn empty_input_plans_nothing() {
    let junctions: Vec<Junction> = Vec::new();
    assert!(plan_regions(&junctions, 150, &ChromosomeOrder::lexical()).is_empty());
}

#[test]
fn ranked_order_when_every_label_is_known() {
    let order = worm_order();
    let mut labels = vec!["MtDNA", "V", "I", "X", "IV"];
    order.sort_by(&mut labels, |l| *l, |_, _| Ordering::Equal);
    assert_eq!(labels, ["I", "IV", "V", "X", "MtDNA"]);
    assert!(order.resolve(labels.iter().copied()).is_ranked());
}

#[test]
fn unknown_label_falls_back_to_lexical_for_the_whole_sort() {
    let order = worm_order();
    let mut labels = vec!["MtDNA", "V", "I", "chrUn", "IV"];
    order.sort_by(&mut labels, |l| *l, |_, _| Ordering::Equal);
    assert_eq!(labels, ["I", "IV", "MtDNA", "V", "chrUn"]);
    assert!(matches!(order.resolve(labels.iter().copied()), ResolvedOrder::Lexical));
}

#[test]
fn sorting_is_idempotent_and_total() {
    let order = worm_order();
    let mut junctions = vec![
        Junction::new("II", 10, 20, Strand::Reverse),
        Junction::new("I", 30, 40, Strand::Forward),
        Junction::new("II", 10, 20, Strand::Forward),
        Junction::new("I", 30, 35, Strand::Unknown),
        Junction::new("MtDNA", 1, 5, Strand::Forward),
    ];
    order.sort_junctions(&mut junctions);
    let once = junctions.clone();
    order.sort_junctions(&mut junctions);
    assert_eq!(once, junctions);

    let resolved = order.resolve(junctions.iter().map(|j| j.chromosome.as_str()));
    for a in &junctions {
        for b in &junctions {
            let ab = resolved.compare(&a.chromosome, &b.chromosome);
            let ba = resolved.compare(&b.chromosome, &a.chromosome);
            assert_eq!(ab, ba.reverse());
        }
    }
    assert_eq!(junctions[0], Junction::new("I", 30, 35, Strand::Unknown));
    assert_eq!(junctions[4].chromosome, "MtDNA");
}

#[test]
fn rank_table_from_file_and_errors() {
    let dir = std::env::temp_dir().join(format!("junctools_ranks_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("ranks.tsv");
    std::fs::write(&path, "# worm\nI\t1\nII\t2\n\nX 3\n").unwrap();

    let order = ChromosomeOrder::from_file(&path).unwrap();
    let mut labels = vec!["X", "II", "I"];
    order.sort_by(&mut labels, |l| *l, |_, _| Ordering::Equal);
    assert_eq!(labels, ["I", "II", "X"]);

    std::fs::write(&path, "I\tone\n").unwrap();
    match ChromosomeOrder::from_file(&path) {
        Err(Error::MalformedTargetLine { line_no, .. }) => assert_eq!(line_no, 1),
        other => panic!("unexpected: {other:?}"),
    }
    assert!(matches!(ChromosomeOrder::parse_pairs(["I"]), Err(Error::Config(_))));
    let _ = std::fs::remove_dir_all(&dir);
}
