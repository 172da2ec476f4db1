//! Cut spliced alignments into one record per exon segment.

use crate::alignment::AlignmentRecord;
use crate::bam_io::{self, AlignmentSource, AlignmentWriter, ScanScope};
use crate::cigar::{DecodeMode, Segment};
use crate::progress::{Counters, ProgressObserver};
use anyhow::{Context, Result};
use noodles::core::Position;
use noodles::sam;
use noodles::sam::alignment::RecordBuf;
use noodles::sam::alignment::record_buf::{Cigar as SamCigar, QualityScores, Sequence};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitReport {
    pub records_read: u64,
    pub records_written: u64,
}

/// The records a single alignment becomes. Unmapped records and records
/// without skips come back as one record with the original layout.
pub fn split_record(record: &AlignmentRecord, header: &sam::Header) -> Result<Vec<RecordBuf>> {
    let base = match &record.raw {
        Some(raw) => RecordBuf::try_from_alignment_record(header, raw)
            .with_context(|| format!("failed to copy record {}", record.read_id))?,
        None => bam_io::to_record_buf(record, header)?,
    };
    if !record.is_mapped() {
        return Ok(vec![base]);
    }

    let decoded = record.decode(DecodeMode::Segments)?;
    if decoded.junctions.is_empty() {
        return Ok(vec![base]);
    }

    // Leading, trailing or back-to-back skips leave segments that cover no
    // reference bases.
    let pieces = decoded
        .segments
        .iter()
        .filter(|segment| segment.ref_len > 0 && !segment.operations.is_empty())
        .map(|segment| segment_record(&base, record.start, segment))
        .collect::<Result<Vec<_>>>()?;
    if pieces.is_empty() {
        return Ok(vec![base]);
    }
    Ok(pieces)
}

fn segment_record(base: &RecordBuf, start: u64, segment: &Segment) -> Result<RecordBuf> {
    let mut out = base.clone();
    let position = (start + segment.ref_offset) as usize;
    *out.alignment_start_mut() = Some(Position::try_from(position)?);
    *out.cigar_mut() = segment.operations.iter().map(|op| op.to_sam()).collect::<SamCigar>();
    *out.template_length_mut() = 0;

    let range = segment.query_start..segment.query_end;
    let seq: &[u8] = base.sequence().as_ref();
    if !seq.is_empty() {
        let cut = seq
            .get(range.clone())
            .ok_or_else(|| anyhow::anyhow!("segment {range:?} exceeds sequence length {}", seq.len()))?;
        *out.sequence_mut() = Sequence::from(cut.to_vec());
    }
    let qual: &[u8] = base.quality_scores().as_ref();
    if !qual.is_empty() {
        let cut = qual
            .get(range.clone())
            .ok_or_else(|| anyhow::anyhow!("segment {range:?} exceeds quality length {}", qual.len()))?;
        *out.quality_scores_mut() = QualityScores::from(cut.to_vec());
    }
    Ok(out)
}

/// Split every record of `source` into `writer`.
pub fn split_alignments<S>(
    source: &S,
    header: &sam::Header,
    writer: &mut AlignmentWriter,
    observer: &dyn ProgressObserver,
) -> Result<SplitReport>
where
    S: AlignmentSource + ?Sized,
{
    let counters = Counters::default();
    let mut written = 0u64;
    source.scan(ScanScope::All, &mut |record| {
        counters.tick(observer);
        let pieces = split_record(&record, header)?;
        if pieces.len() > 1 {
            counters.found(1);
        }
        for piece in &pieces {
            writer.write_buf(piece)?;
            written += 1;
        }
        Ok(())
    })?;
    Ok(SplitReport {
        records_read: counters.lines(),
        records_written: written,
    })
}
