//! Conversion of other junction formats into GFF3 intron features, and of
//! features back out to BED12.

use crate::error::Error;
use crate::gff::{self, GffFeature, parse_coord};
use crate::types::{Junction, Strand};
use clap::ValueEnum;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// STAR `SJ.out.tab`
    Star,
    /// BED12 split-read features (two blocks per intron)
    Bed,
    /// `chrom:start-end (s strand)` lines
    List,
    /// GFF3 features, kept as they are
    Gff3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Gff3,
    /// BED12, one block spanning each feature
    Bed,
}

/// Colour of every BED item.
const BED_ITEM_RGB: &str = "255,0,0";

/// Read `path` in `format` and return GFF3 features, one per data line.
pub fn convert(path: &Path, format: InputFormat) -> Result<Vec<GffFeature>, Error> {
    let file = File::open(path).map_err(|e| Error::io(e, path))?;
    let mut features = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| Error::io(e, path))?;
        let line_no = idx + 1;
        if format == InputFormat::Gff3 && line.trim_end() == gff::FASTA_DIRECTIVE {
            break;
        }
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let id = features.len() + 1;
        let feature = match format {
            InputFormat::Star => star_line(&line, path, line_no, id)?,
            InputFormat::Bed => match bed_line(&line, path, line_no, id)? {
                Some(feature) => feature,
                None => continue,
            },
            InputFormat::List => list_line(&line, path, line_no)?,
            InputFormat::Gff3 => GffFeature::parse(&line, path, line_no)?,
        };
        features.push(feature);
    }
    Ok(features)
}

/// STAR columns: chrom, start, end, strand (0/1/2), motif, annotated,
/// unique reads, multi-mapping reads, max overhang.
fn star_line(line: &str, path: &Path, line_no: usize, id: usize) -> Result<GffFeature, Error> {
    let cols: Vec<&str> = line.trim().split('\t').collect();
    if cols.len() < 8 {
        return Err(Error::line(path, line_no, line, "expected at least 8 STAR columns"));
    }
    let start = parse_coord(cols[1], path, line_no, line, "start")?;
    let end = parse_coord(cols[2], path, line_no, line, "end")?;
    let strand = match cols[3].trim() {
        "0" => Strand::Unknown,
        "1" => Strand::Forward,
        "2" => Strand::Reverse,
        _ => return Err(Error::line(path, line_no, line, "strand code must be 0, 1 or 2")),
    };
    let unique: u64 = cols[6]
        .trim()
        .parse()
        .map_err(|_| Error::line(path, line_no, line, "unique read count is not an integer"))?;
    let multi: u64 = cols[7]
        .trim()
        .parse()
        .map_err(|_| Error::line(path, line_no, line, "multi-mapping read count is not an integer"))?;
    let junction = Junction::new(cols[0], start, end, strand);
    Ok(GffFeature::intron(&junction, unique + multi, id))
}

/// BED12 with two blocks flanking the intron. Returns `None` for lines
/// without columns (e.g. `track` lines).
fn bed_line(line: &str, path: &Path, line_no: usize, id: usize) -> Result<Option<GffFeature>, Error> {
    let cols: Vec<&str> = line.trim().split('\t').collect();
    if cols.len() <= 1 {
        return Ok(None);
    }
    if cols.len() < 11 {
        return Err(Error::line(path, line_no, line, "expected BED12 columns"));
    }
    let chrom_start: u64 = cols[1]
        .trim()
        .parse()
        .map_err(|_| Error::line(path, line_no, line, "chromStart is not an integer"))?;
    let chrom_end: u64 = cols[2]
        .trim()
        .parse()
        .map_err(|_| Error::line(path, line_no, line, "chromEnd is not an integer"))?;
    let sizes: Vec<u64> = cols[10]
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| s.trim().parse())
        .collect::<Result<_, _>>()
        .map_err(|_| Error::line(path, line_no, line, "blockSizes are not integers"))?;
    let [left, right, ..] = sizes[..] else {
        return Err(Error::line(path, line_no, line, "expected two blocks"));
    };
    let start = chrom_start + left + 1;
    let end = chrom_end
        .checked_sub(right)
        .filter(|&end| end >= start)
        .ok_or_else(|| Error::line(path, line_no, line, "blocks leave no intron"))?;

    let strand = cols
        .get(5)
        .and_then(|s| s.trim().chars().next())
        .map(Strand::from_char)
        .unwrap_or_default();
    let junction = Junction::new(cols[0], start, end, strand);
    let mut feature = GffFeature::intron(&junction, "", id);
    feature.score = cols[4].trim().to_string();
    Ok(Some(feature))
}

/// `II:2107356-2107465 (- strand)`; score 0 and no attributes.
fn list_line(line: &str, path: &Path, line_no: usize) -> Result<GffFeature, Error> {
    let cleaned = line.trim().replace(',', "");
    let bad = || Error::line(path, line_no, line, "expected chrom:start-end (s strand)");
    let (coords, rest) = cleaned.split_once(' ').ok_or_else(bad)?;
    let (chrom, range) = coords.rsplit_once(':').ok_or_else(bad)?;
    let (start, end) = range.split_once('-').ok_or_else(bad)?;
    let start = parse_coord(start, path, line_no, line, "start")?;
    let end = parse_coord(end, path, line_no, line, "end")?;
    let strand = rest
        .trim()
        .trim_start_matches('(')
        .chars()
        .next()
        .map(Strand::from_char)
        .unwrap_or_default();
    let junction = Junction::new(chrom, start, end, strand);
    let mut feature = GffFeature::intron(&junction, 0, 0);
    feature.attributes = ".".to_string();
    Ok(feature)
}

/// One BED12 line for `feature`: a single block covering `[start, end]`,
/// named after the feature type and its 1-based position in the output.
pub fn bed_line_for(feature: &GffFeature, n: usize) -> String {
    let chrom_start = feature.start - 1;
    let score = match feature.score.as_str() {
        "." | "" => "0",
        score => score,
    };
    [
        feature.seqid.clone(),
        chrom_start.to_string(),
        feature.end.to_string(),
        format!("{}{n}", feature.ty),
        score.to_string(),
        feature.strand.clone(),
        chrom_start.to_string(),
        feature.end.to_string(),
        BED_ITEM_RGB.to_string(),
        "1".to_string(),
        (feature.end - feature.start + 1).to_string(),
        "0".to_string(),
    ]
    .join("\t")
}

/// Write every feature as BED12 and return how many lines were written.
pub fn write_bed<'a, W, I>(out: &mut W, features: I) -> std::io::Result<usize>
where
    W: Write + ?Sized,
    I: IntoIterator<Item = &'a GffFeature>,
{
    let mut n = 0;
    for feature in features {
        n += 1;
        writeln!(out, "{}", bed_line_for(feature, n))?;
    }
    Ok(n)
}
