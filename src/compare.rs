//! Position-level comparison of two or more GFF3 files: features unique to
//! each file, shared by every pair (three files only) and shared by all.
//!
//! Features are identified by `(seqid, start, end, strand)`. When a file
//! holds several features at one position the last one is kept.

use crate::chrom_order::ChromosomeOrder;
use crate::error::Error;
use crate::gff::{self, GffFeature};
use crate::types::{HashMap, HashMapExt};
use std::path::{Path, PathBuf};

type FeaturePosition = (String, u64, u64, String);

#[derive(Debug, Default)]
pub struct Comparison {
    /// Features per input file, in input order.
    pub unique: Vec<Vec<GffFeature>>,
    /// `((i, j), features)` for every pair of input indices, only with three inputs.
    pub pairs: Vec<((usize, usize), Vec<GffFeature>)>,
    /// Features present in every file, as written in the first.
    pub common: Vec<GffFeature>,
}

fn load(path: &Path, types: &[String]) -> Result<HashMap<FeaturePosition, GffFeature>, Error> {
    let mut features = HashMap::new();
    for (_, feature) in gff::read_features(path)? {
        if !types.is_empty() && !types.iter().any(|t| *t == feature.ty) {
            continue;
        }
        let position = (
            feature.seqid.clone(),
            feature.start,
            feature.end,
            feature.strand.clone(),
        );
        features.insert(position, feature);
    }
    tracing::info!(path = %path.display(), features = features.len(), "loaded features");
    Ok(features)
}

fn sorted(mut features: Vec<GffFeature>, order: &ChromosomeOrder) -> Vec<GffFeature> {
    order.sort_by(
        &mut features,
        |f| f.seqid.as_str(),
        |a, b| (a.start, a.end, &a.strand).cmp(&(b.start, b.end, &b.strand)),
    );
    features
}

/// Features of `sets[first]` whose position is in every set of `others`.
fn shared(
    sets: &[HashMap<FeaturePosition, GffFeature>],
    first: usize,
    others: &[usize],
    order: &ChromosomeOrder,
) -> Vec<GffFeature> {
    let features = sets[first]
        .iter()
        .filter(|(position, _)| others.iter().all(|&o| sets[o].contains_key(*position)))
        .map(|(_, feature)| feature.clone())
        .collect();
    sorted(features, order)
}

/// Compare `paths`, keeping only features whose type is in `types` (all
/// types when empty).
pub fn compare_files(paths: &[PathBuf], types: &[String], order: &ChromosomeOrder) -> Result<Comparison, Error> {
    let sets = paths
        .iter()
        .map(|path| load(path, types))
        .collect::<Result<Vec<_>, _>>()?;

    let unique = (0..sets.len())
        .map(|i| {
            let features = sets[i]
                .iter()
                .filter(|(position, _)| {
                    sets.iter()
                        .enumerate()
                        .all(|(j, other)| j == i || !other.contains_key(*position))
                })
                .map(|(_, feature)| feature.clone())
                .collect();
            sorted(features, order)
        })
        .collect();

    let mut pairs = Vec::new();
    if sets.len() == 3 {
        for i in 0..sets.len() {
            for j in i + 1..sets.len() {
                pairs.push(((i, j), shared(&sets, i, &[j], order)));
            }
        }
    }

    let common = match sets.len() {
        0 => Vec::new(),
        n => shared(&sets, 0, &(1..n).collect::<Vec<_>>(), order),
    };

    Ok(Comparison {
        unique,
        pairs,
        common,
    })
}
