//! Loading target junctions: command-line coordinates, GFF3 features and
//! aligner splice-site tables.

use crate::error::Error;
use crate::gff::{self, parse_coord};
use crate::types::{Junction, Strand};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const COMMAND_LINE: &str = "<command line>";

/// Parse `chrom:start-end`, `chrom:start..end` or `chrom_start_end`.
/// Thousands separators (`,`) are ignored. The strand is unknown.
pub fn parse_coordinate(text: &str) -> Option<Junction> {
    let cleaned = text.trim().replace(',', "").replace("..", "-");
    let (chrom, range) = match cleaned.rsplit_once(':') {
        Some(split) => split,
        None => {
            let mut parts = cleaned.rsplitn(3, '_');
            let end = parts.next()?;
            let start = parts.next()?;
            let chrom = parts.next()?;
            return build(chrom, start, end);
        }
    };
    let (start, end) = range.split_once('-').or_else(|| range.split_once('_'))?;
    build(chrom, start, end)
}

fn build(chrom: &str, start: &str, end: &str) -> Option<Junction> {
    let start: u64 = start.trim().parse().ok()?;
    let end: u64 = end.trim().parse().ok()?;
    if chrom.is_empty() || start == 0 || start > end {
        return None;
    }
    Some(Junction::new(chrom, start, end, Strand::Unknown))
}

/// Parse every command-line coordinate, failing on the first bad one.
pub fn parse_coordinates<S: AsRef<str>>(items: &[S]) -> Result<Vec<Junction>, Error> {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let item = item.as_ref();
            parse_coordinate(item).ok_or_else(|| {
                Error::line(
                    COMMAND_LINE,
                    idx + 1,
                    item,
                    "expected chrom:start-end or chrom:start..end",
                )
            })
        })
        .collect()
}

/// Junctions from columns 1, 4, 5 and 7 of a GFF3 file.
pub fn read_gff3(path: &Path) -> Result<Vec<Junction>, Error> {
    Ok(gff::read_features(path)?
        .into_iter()
        .map(|(_, feature)| feature.junction())
        .collect())
}

/// Junctions from a HISAT2-style splice-site table:
/// `chrom, left, right[, strand]`, where `left` is the 0-based last base of
/// the upstream exon. The intron starts at `left + 2` in 1-based terms and
/// `right` is already its 1-based end.
pub fn read_tsv(path: &Path) -> Result<Vec<Junction>, Error> {
    let file = File::open(path).map_err(|e| Error::io(e, path))?;
    let mut junctions = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| Error::io(e, path))?;
        let line_no = idx + 1;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 3 {
            return Err(Error::line(path, line_no, &line, "expected at least 3 tab-separated columns"));
        }
        let left: u64 = cols[1]
            .trim()
            .parse()
            .map_err(|_| Error::line(path, line_no, &line, "start is not an integer"))?;
        let start = left + 2;
        let end = parse_coord(cols[2], path, line_no, &line, "end")?;
        if start > end {
            return Err(Error::line(path, line_no, &line, "start is after end"));
        }
        let strand = cols
            .get(3)
            .and_then(|s| s.trim().chars().next())
            .map(Strand::from_char)
            .unwrap_or_default();
        junctions.push(Junction::new(cols[0], start, end, strand));
    }
    Ok(junctions)
}

/// Collect targets from all sources, dropping duplicates but keeping the
/// first-seen order.
pub fn load_targets(
    coordinates: &[String],
    gff3: Option<&Path>,
    tsv: Option<&Path>,
) -> Result<Vec<Junction>, Error> {
    let mut targets = parse_coordinates(coordinates)?;
    if let Some(path) = gff3 {
        let loaded = read_gff3(path)?;
        tracing::info!(path = %path.display(), junctions = loaded.len(), "loaded GFF3 targets");
        targets.extend(loaded);
    }
    if let Some(path) = tsv {
        let loaded = read_tsv(path)?;
        tracing::info!(path = %path.display(), junctions = loaded.len(), "loaded TSV targets");
        targets.extend(loaded);
    }

    let mut seen = crate::types::HashSet::default();
    targets.retain(|j| seen.insert(j.clone()));
    Ok(targets)
}
