//! Alignment-file access: streaming BAM records (whole file or by region)
//! and writing record subsets back out as SAM or BAM.

use crate::alignment::{self, AlignmentRecord};
use crate::error::Error;
use crate::types::Region;
use anyhow::{Context, Result};
use noodles::core::Position;
use noodles::sam::alignment::RecordBuf;
use noodles::sam::alignment::record_buf::{Cigar as SamCigar, QualityScores, Sequence};
use noodles::{bam, core, sam};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Which part of a source a scan visits.
#[derive(Debug, Clone, Copy)]
pub enum ScanScope<'a> {
    /// Every record in file order, unmapped ones included.
    All,
    /// Records overlapping any of the windows, window by window.
    Regions(&'a [Region]),
}

/// A readable stream of alignment records.
///
/// `scan` takes `&self` and opens its own cursor on every call, so several
/// workers can scan the same source at once.
pub trait AlignmentSource: Sync {
    fn scan(
        &self,
        scope: ScanScope<'_>,
        visit: &mut dyn FnMut(AlignmentRecord) -> Result<()>,
    ) -> Result<()>;
}

pub struct BamSource {
    path: PathBuf,
    header: sam::Header,
    reference_names: Vec<String>,
    keep_query: bool,
}

impl BamSource {
    pub fn open(path: &Path) -> Result<Self> {
        let mut reader = bam::io::reader::Builder::default()
            .build_from_path(path)
            .map_err(|e| Error::io(e, path))?;
        let header = reader
            .read_header()
            .with_context(|| format!("failed to read BAM header from {}", path.display()))?;
        let reference_names = header
            .reference_sequences()
            .keys()
            .map(|name| name.to_string())
            .collect();
        Ok(Self {
            path: path.to_path_buf(),
            header,
            reference_names,
            keep_query: false,
        })
    }

    /// Copy query sequence and qualities into every record.
    pub fn with_query(mut self, keep_query: bool) -> Self {
        self.keep_query = keep_query;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &sam::Header {
        &self.header
    }

    pub fn reference_names(&self) -> &[String] {
        &self.reference_names
    }

    /// Fail with `UnindexedInput` unless a `.bai` or `.csi` sits next to the file.
    pub fn require_index(&self) -> Result<(), Error> {
        let has_index = ["bai", "csi"].iter().any(|ext| {
            let mut name = self.path.as_os_str().to_owned();
            name.push(".");
            name.push(ext);
            Path::new(&name).exists()
        });
        if has_index {
            Ok(())
        } else {
            Err(Error::UnindexedInput(self.path.clone()))
        }
    }

    fn scan_all(&self, visit: &mut dyn FnMut(AlignmentRecord) -> Result<()>) -> Result<()> {
        let mut reader = bam::io::reader::Builder::default()
            .build_from_path(&self.path)
            .map_err(|e| Error::io(e, &self.path))?;
        reader.read_header()?;
        for result in reader.records() {
            let record = result.with_context(|| format!("failed to read {}", self.path.display()))?;
            visit(alignment::from_bam(record, &self.reference_names, self.keep_query)?)?;
        }
        Ok(())
    }

    fn scan_regions(
        &self,
        regions: &[Region],
        visit: &mut dyn FnMut(AlignmentRecord) -> Result<()>,
    ) -> Result<()> {
        self.require_index()?;
        let mut reader = bam::io::indexed_reader::Builder::default()
            .build_from_path(&self.path)
            .map_err(|e| Error::io(e, &self.path))?;
        let header = reader.read_header()?;

        for region in regions {
            if !self.reference_names.iter().any(|n| *n == region.chromosome) {
                tracing::warn!(chromosome = %region.chromosome, "chromosome not in alignment header, skipping");
                continue;
            }
            let start = Position::try_from(region.start.max(1) as usize)?;
            let end = Position::try_from(region.end.max(1) as usize)?;
            let query_region = core::Region::new(region.chromosome.as_str(), start..=end);
            let query = reader
                .query(&header, &query_region)
                .with_context(|| format!("failed to query {region}"))?;
            for result in query {
                let record = result?;
                visit(alignment::from_bam(record, &self.reference_names, self.keep_query)?)?;
            }
        }
        Ok(())
    }
}

impl AlignmentSource for BamSource {
    fn scan(
        &self,
        scope: ScanScope<'_>,
        visit: &mut dyn FnMut(AlignmentRecord) -> Result<()>,
    ) -> Result<()> {
        match scope {
            ScanScope::All => self.scan_all(visit),
            ScanScope::Regions(regions) => self.scan_regions(regions, visit),
        }
    }
}

/// Writes records as SAM or BAM (by output extension) under a copied header.
pub struct AlignmentWriter {
    inner: Box<dyn sam::alignment::io::Write>,
    header: sam::Header,
    path: PathBuf,
    written: u64,
}

impl AlignmentWriter {
    pub fn create(path: &Path, header: &sam::Header) -> Result<Self> {
        let file = File::create(path).map_err(|e| Error::io(e, path))?;
        let mut inner: Box<dyn sam::alignment::io::Write> = if is_bam_path(path) {
            Box::new(bam::io::Writer::new(file))
        } else {
            Box::new(sam::io::Writer::new(BufWriter::new(file)))
        };
        inner.write_alignment_header(header)?;
        Ok(Self {
            inner,
            header: header.clone(),
            path: path.to_path_buf(),
            written: 0,
        })
    }

    pub fn write(&mut self, record: &AlignmentRecord) -> Result<()> {
        match &record.raw {
            Some(raw) => self.inner.write_alignment_record(&self.header, raw)?,
            None => {
                let buf = to_record_buf(record, &self.header)?;
                self.inner.write_alignment_record(&self.header, &buf)?;
            }
        }
        self.written += 1;
        Ok(())
    }

    pub fn write_buf(&mut self, record: &RecordBuf) -> Result<()> {
        self.inner.write_alignment_record(&self.header, record)?;
        self.written += 1;
        Ok(())
    }

    /// Flush and close; returns the number of records written.
    pub fn finish(mut self) -> Result<u64> {
        self.inner
            .finish(&self.header)
            .with_context(|| format!("failed to finish {}", self.path.display()))?;
        Ok(self.written)
    }
}

pub fn is_bam_path(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("bam"))
}

/// Build a SAM record from the decoded fields of a record that has no raw
/// BAM backing (e.g. records constructed in memory).
pub fn to_record_buf(record: &AlignmentRecord, header: &sam::Header) -> Result<RecordBuf> {
    let mut out = RecordBuf::default();
    *out.name_mut() = Some(record.read_id.as_bytes().to_vec().into());
    *out.flags_mut() = record.flags;

    if record.is_mapped() {
        let id = header
            .reference_sequences()
            .keys()
            .position(|name| AsRef::<[u8]>::as_ref(name) == record.chromosome.as_bytes())
            .ok_or_else(|| anyhow::anyhow!("chromosome {} not in header", record.chromosome))?;
        *out.reference_sequence_id_mut() = Some(id);
        *out.alignment_start_mut() = Some(Position::try_from(record.start as usize)?);
    }

    let ops: SamCigar = record.operations.iter().map(|op| op.to_sam()).collect();
    *out.cigar_mut() = ops;
    if let Some(seq) = &record.query_sequence {
        *out.sequence_mut() = Sequence::from(seq.clone());
    }
    if let Some(qual) = &record.query_qualities {
        *out.quality_scores_mut() = QualityScores::from(qual.clone());
    }
    Ok(out)
}
