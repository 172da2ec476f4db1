//! Non-redundant union of GFF3 files.
//!
//! Features sharing `(seqid, type, start, end, strand)` collapse into one:
//! integer scores are summed (any non-integer score makes the result `.`),
//! attributes are merged tag by tag, and each merged feature gets a fresh
//! numeric `ID`.

use crate::chrom_order::ChromosomeOrder;
use crate::error::Error;
use crate::gff::{self, GffFeature};
use noodles::gff::feature::RecordBuf;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

type FeatureKey = (String, String, u64, u64, String);

#[derive(Debug, Default)]
pub struct MergedFeatures {
    /// `##File n = path` lines.
    pub header: Vec<String>,
    pub features: Vec<GffFeature>,
}

pub fn merge_files(paths: &[PathBuf], order: &ChromosomeOrder) -> Result<MergedFeatures, Error> {
    let mut header = Vec::with_capacity(paths.len());
    let mut groups: Vec<Vec<RecordBuf>> = Vec::new();
    let mut index: BTreeMap<FeatureKey, usize> = BTreeMap::new();

    for (n, path) in paths.iter().enumerate() {
        header.push(format!("##File {} = {}", n + 1, path.display()));
        for (_, record) in gff::read_records(path)? {
            let feature = GffFeature::from_record(&record);
            let key = (feature.seqid, feature.ty, feature.start, feature.end, feature.strand);
            match index.get(&key) {
                Some(&slot) => groups[slot].push(record),
                None => {
                    index.insert(key, groups.len());
                    groups.push(vec![record]);
                }
            }
        }
    }

    let mut features: Vec<GffFeature> = groups
        .iter()
        .enumerate()
        .filter_map(|(idx, group)| merge_group(group, idx + 1))
        .collect();

    order.sort_by(
        &mut features,
        |f| f.seqid.as_str(),
        |a, b| (a.start, a.end, &a.strand).cmp(&(b.start, b.end, &b.strand)),
    );

    Ok(MergedFeatures { header, features })
}

fn merge_group(group: &[RecordBuf], id: usize) -> Option<GffFeature> {
    let score = group
        .iter()
        .map(|record| record.score().filter(|s| s.fract() == 0.0).map(|s| s as i64))
        .sum::<Option<i64>>()
        .map(|s| s.to_string())
        .unwrap_or_else(|| ".".to_string());

    let mut attrs: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for record in group {
        for (tag, value) in record.attributes().as_ref() {
            let values = attrs.entry(tag.to_string()).or_default();
            values.extend(value.iter().map(|v| v.to_string()));
        }
    }
    attrs.insert("ID".to_string(), BTreeSet::from([id.to_string()]));

    let attributes = attrs
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(tag, values)| format!("{tag}={}", values.into_iter().collect::<Vec<_>>().join(",")))
        .collect::<Vec<_>>()
        .join(";");

    let mut merged = GffFeature::from_record(group.first()?);
    merged.score = score;
    merged.attributes = attributes;
    Some(merged)
}
