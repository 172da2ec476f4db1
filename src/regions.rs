//! Scan-window planning for targeted junction searches.

use crate::chrom_order::ChromosomeOrder;
use crate::types::{HashMap, HashMapExt, Junction, Region};

/// Default padding: an estimate of the longest alignment span.
pub const DEFAULT_READ_SPAN: u64 = 150;

/// Merge the padded intervals `[start - read_span, end + read_span]` of all
/// junctions into disjoint windows.
///
/// Windows come back grouped by chromosome (in `order`) and sorted by start
/// within a chromosome. Windows that touch or overlap are merged, so no two
/// windows of one chromosome share a base. Starts are clamped to 1.
pub fn plan_regions<'a, I>(junctions: I, read_span: u64, order: &ChromosomeOrder) -> Vec<Region>
where
    I: IntoIterator<Item = &'a Junction>,
{
    let mut by_chrom: HashMap<&str, Vec<(u64, i32)>> = HashMap::new();
    for j in junctions {
        let open = j.start.saturating_sub(read_span).max(1);
        let close = j.end.saturating_add(read_span);
        let endpoints = by_chrom.entry(j.chromosome.as_str()).or_default();
        endpoints.push((open, 1));
        endpoints.push((close, -1));
    }

    let mut chroms: Vec<&str> = by_chrom.keys().copied().collect();
    order.sort_by(&mut chroms, |c| *c, |_, _| std::cmp::Ordering::Equal);

    let mut regions = Vec::new();
    for chrom in chroms {
        let Some(mut endpoints) = by_chrom.remove(chrom) else {
            continue;
        };
        // opens sort before closes at the same coordinate so touching windows merge
        endpoints.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)));

        let mut depth = 0i32;
        let mut region_start = 0u64;
        for (pos, delta) in endpoints {
            if depth == 0 {
                region_start = pos;
            }
            depth += delta;
            if depth == 0 {
                regions.push(Region::new(chrom, region_start, pos));
            }
        }
    }

    tracing::debug!(regions = regions.len(), read_span, "planned scan regions");
    regions
}
