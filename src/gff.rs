//! GFF3 features: records are parsed with noodles-gff, written back as the
//! nine tab-separated columns with 1-based inclusive coordinates.

use crate::error::Error;
use crate::types::{Junction, Strand};
use noodles::gff;
use noodles::gff::feature::RecordBuf;
use noodles::gff::feature::record::{Phase, Strand as GffStrand};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

pub const GFF3_HEADER: &str = "##gff-version 3";

/// Records end here; what follows is sequence data.
pub(crate) const FASTA_DIRECTIVE: &str = "##FASTA";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GffFeature {
    pub seqid: String,
    pub source: String,
    pub ty: String,
    pub start: u64,
    pub end: u64,
    pub score: String,
    pub strand: String,
    pub phase: String,
    pub attributes: String,
}

impl GffFeature {
    /// An intron feature as written for counted junctions.
    pub fn intron(junction: &Junction, score: impl ToString, id: usize) -> Self {
        Self::from_junction("intron", junction, score, id)
    }

    pub fn from_junction(ty: &str, junction: &Junction, score: impl ToString, id: usize) -> Self {
        Self {
            seqid: junction.chromosome.clone(),
            source: ".".to_string(),
            ty: ty.to_string(),
            start: junction.start,
            end: junction.end,
            score: score.to_string(),
            strand: junction.strand.to_string(),
            phase: ".".to_string(),
            attributes: format!("ID={id}"),
        }
    }

    pub fn from_record(record: &RecordBuf) -> Self {
        Self {
            seqid: record.reference_sequence_name().to_string(),
            source: record.source().to_string(),
            ty: record.ty().to_string(),
            start: record.start().get() as u64,
            end: record.end().get() as u64,
            score: record
                .score()
                .map(|s| s.to_string())
                .unwrap_or_else(|| ".".to_string()),
            strand: strand_text(record.strand()).to_string(),
            phase: match record.phase() {
                Some(Phase::Zero) => "0",
                Some(Phase::One) => "1",
                Some(Phase::Two) => "2",
                None => ".",
            }
            .to_string(),
            attributes: render_attributes(record.attributes()),
        }
    }

    pub fn junction(&self) -> Junction {
        let strand = self
            .strand
            .chars()
            .next()
            .map(Strand::from_char)
            .unwrap_or_default();
        Junction::new(self.seqid.clone(), self.start, self.end, strand)
    }

    /// Parse one data line; `path` and `line_no` only feed the error.
    pub fn parse(line: &str, path: &Path, line_no: usize) -> Result<Self, Error> {
        parse_record(line, path, line_no).map(|record| Self::from_record(&record))
    }
}

impl fmt::Display for GffFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.seqid,
            self.source,
            self.ty,
            self.start,
            self.end,
            self.score,
            self.strand,
            self.phase,
            self.attributes
        )
    }
}

fn strand_text(strand: GffStrand) -> &'static str {
    match strand {
        GffStrand::Forward => "+",
        GffStrand::Reverse => "-",
        GffStrand::None => ".",
        GffStrand::Unknown => "?",
    }
}

/// Column 9 as `tag=v1,v2` pairs joined by `;`, or `.` when empty.
fn render_attributes(attributes: &gff::feature::record_buf::Attributes) -> String {
    let pairs: Vec<String> = attributes
        .as_ref()
        .iter()
        .map(|(tag, value)| {
            let values: Vec<String> = value.iter().map(|v| v.to_string()).collect();
            format!("{tag}={}", values.join(","))
        })
        .collect();
    if pairs.is_empty() {
        ".".to_string()
    } else {
        pairs.join(";")
    }
}

fn parse_record(line: &str, path: &Path, line_no: usize) -> Result<RecordBuf, Error> {
    let mut reader = gff::io::Reader::new(line.as_bytes());
    let record = match reader.record_bufs().next() {
        Some(Ok(record)) => record,
        Some(Err(e)) => return Err(Error::line(path, line_no, line, e.to_string())),
        None => return Err(Error::line(path, line_no, line, "expected a feature record")),
    };
    if record.start() > record.end() {
        return Err(Error::line(path, line_no, line, "start is after end"));
    }
    Ok(record)
}

pub(crate) fn parse_coord(
    text: &str,
    path: &Path,
    line_no: usize,
    line: &str,
    what: &str,
) -> Result<u64, Error> {
    let value: u64 = text
        .trim()
        .parse()
        .map_err(|_| Error::line(path, line_no, line, format!("{what} is not a positive integer")))?;
    if value == 0 {
        return Err(Error::line(path, line_no, line, format!("{what} must be 1-based")));
    }
    Ok(value)
}

/// Every record of a GFF3 file with its 1-based line number. Blank lines,
/// comments and directives are skipped; reading stops at `##FASTA`.
pub fn read_records(path: &Path) -> Result<Vec<(usize, RecordBuf)>, Error> {
    let file = File::open(path).map_err(|e| Error::io(e, path))?;
    let mut records = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| Error::io(e, path))?;
        let line_no = idx + 1;
        if line.trim_end() == FASTA_DIRECTIVE {
            break;
        }
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        records.push((line_no, parse_record(&line, path, line_no)?));
    }
    Ok(records)
}

/// Every feature of a GFF3 file with its 1-based line number.
pub fn read_features(path: &Path) -> Result<Vec<(usize, GffFeature)>, Error> {
    Ok(read_records(path)?
        .into_iter()
        .map(|(line_no, record)| (line_no, GffFeature::from_record(&record)))
        .collect())
}

/// Write a header then every feature.
pub fn write_features<'a, W, I>(out: &mut W, extra_header: &[String], features: I) -> std::io::Result<usize>
where
    W: Write + ?Sized,
    I: IntoIterator<Item = &'a GffFeature>,
{
    writeln!(out, "{GFF3_HEADER}")?;
    for line in extra_header {
        writeln!(out, "{line}")?;
    }
    let mut n = 0;
    for feature in features {
        writeln!(out, "{feature}")?;
        n += 1;
    }
    Ok(n)
}
