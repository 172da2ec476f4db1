//! Final outputs: GFF3 intron/exon features for counted junctions and
//! alignment files for collected records.

use crate::alignment::AlignmentRecord;
use crate::bam_io::AlignmentWriter;
use crate::chrom_order::ChromosomeOrder;
use crate::convert;
use crate::error::Error;
use crate::gff::{self, GffFeature};
use crate::support::{CountTable, RecordTable};
use crate::types::{HashSet, HashSetExt, Junction};
use anyhow::{Context, Result};
use noodles::sam;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Output extension for per-junction alignment files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum AlignmentFormat {
    #[default]
    Sam,
    Bam,
}

impl AlignmentFormat {
    pub fn extension(self) -> &'static str {
        match self {
            AlignmentFormat::Sam => "sam",
            AlignmentFormat::Bam => "bam",
        }
    }
}

/// One feature of type `ty` per table entry, sorted, IDs numbered from 1.
pub fn count_features(table: &CountTable, ty: &str, order: &ChromosomeOrder) -> Vec<GffFeature> {
    table
        .sorted_junctions(order)
        .iter()
        .enumerate()
        .map(|(idx, junction)| GffFeature::from_junction(ty, junction, table.count(junction), idx + 1))
        .collect()
}

/// A buffered sink on `path`, or stdout when no path is given.
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).map_err(|e| Error::io(e, path))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

/// Write a GFF3 document and return how many features it holds.
pub fn write_gff3(path: Option<&Path>, extra_header: &[String], features: &[GffFeature]) -> Result<usize> {
    let mut out = open_output(path)?;
    let n = gff::write_features(&mut out, extra_header, features)
        .with_context(|| describe(path))?;
    out.flush().with_context(|| describe(path))?;
    Ok(n)
}

/// Write features as BED12 and return how many lines were written.
pub fn write_bed(path: Option<&Path>, features: &[GffFeature]) -> Result<usize> {
    let mut out = open_output(path)?;
    let n = convert::write_bed(&mut out, features).with_context(|| describe(path))?;
    out.flush().with_context(|| describe(path))?;
    Ok(n)
}

fn describe(path: Option<&Path>) -> String {
    match path {
        Some(path) => format!("failed to write {}", path.display()),
        None => "failed to write to stdout".to_string(),
    }
}

/// Every record of the table once, in chromosome then position order.
pub fn unique_records<'a>(table: &'a RecordTable, order: &ChromosomeOrder) -> Vec<&'a AlignmentRecord> {
    let mut seen = HashSet::new();
    let mut records: Vec<&AlignmentRecord> = table
        .iter()
        .flat_map(|(_, set)| set.iter())
        .filter(|record| seen.insert(record.key()))
        .collect();
    sort_records(&mut records, order);
    records
}

/// Placed records by chromosome then position, unplaced ones last.
fn sort_records(records: &mut Vec<&AlignmentRecord>, order: &ChromosomeOrder) {
    let (mut placed, mut unplaced): (Vec<&AlignmentRecord>, Vec<&AlignmentRecord>) =
        records.drain(..).partition(|r| r.is_placed());
    order.sort_by(&mut placed, |r| r.chromosome.as_str(), |a, b| a.cmp_position(b));
    unplaced.sort_by(|a, b| a.cmp_position(b));
    placed.append(&mut unplaced);
    *records = placed;
}

/// All supporting records, deduplicated, into one file.
pub fn write_merged(
    table: &RecordTable,
    header: &sam::Header,
    path: &Path,
    order: &ChromosomeOrder,
) -> Result<u64> {
    let mut writer = AlignmentWriter::create(path, header)?;
    for record in unique_records(table, order) {
        writer.write(record)?;
    }
    let written = writer.finish()?;
    tracing::info!(path = %path.display(), records = written, "wrote supporting alignments");
    Ok(written)
}

/// One file per supported junction, named after its coordinates, inside `dir`.
pub fn write_per_junction(
    table: &RecordTable,
    header: &sam::Header,
    dir: &Path,
    format: AlignmentFormat,
    order: &ChromosomeOrder,
) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for junction in table.sorted_junctions(order) {
        let Some(set) = table.get(&junction) else {
            continue;
        };
        if set.is_empty() {
            continue;
        }
        let mut records: Vec<&AlignmentRecord> = set.iter().collect();
        sort_records(&mut records, order);

        let path = dir.join(format!("{}.{}", junction.file_stem(), format.extension()));
        let mut writer = AlignmentWriter::create(&path, header)?;
        for record in records {
            writer.write(record)?;
        }
        let written = writer.finish()?;
        tracing::debug!(junction = %junction, path = %path.display(), records = written, "wrote junction file");
        paths.push(path);
    }
    tracing::info!(files = paths.len(), dir = %dir.display(), "wrote per-junction alignment files");
    Ok(paths)
}

/// Targets without a single supporting record, in input order.
pub fn unsupported<'a>(targets: &'a [Junction], table: &RecordTable) -> Vec<&'a Junction> {
    targets
        .iter()
        .filter(|t| table.get(t).is_none_or(|set| set.is_empty()))
        .collect()
}

pub fn warn_unsupported(targets: &[Junction], table: &RecordTable) {
    for junction in unsupported(targets, table) {
        tracing::warn!(junction = %junction, "no supporting alignments found");
    }
}
