use crate::cigar::{self, DecodeMode, Decoded, Operation};
use crate::error::Error;
use crate::types::{Junction, Strand};
use anyhow::Result;
use noodles::bam;
use noodles::sam::alignment::record::Flags;
use noodles::sam::alignment::record::data::field::{Tag, Value};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Reference name of records without a reference sequence.
pub const UNPLACED: &str = "*";

/// One alignment as seen by the junction engine.
///
/// Records read from a file keep the original BAM record in `raw` so they can
/// be written back out unchanged.
#[derive(Debug, Clone)]
pub struct AlignmentRecord {
    pub chromosome: String,
    /// 1-based position of the first aligned base; 0 when unplaced.
    pub start: u64,
    pub operations: Vec<Operation>,
    pub query_sequence: Option<Vec<u8>>,
    pub query_qualities: Option<Vec<u8>>,
    pub read_id: String,
    pub strand_hint: Strand,
    pub flags: Flags,
    pub is_primary: bool,
    pub raw: Option<bam::Record>,
}

/// Identity of a record for set semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub chromosome: String,
    pub start: u64,
    pub read_id: String,
    pub flags: u16,
}

impl AlignmentRecord {
    /// A mapped, primary record without sequence, mostly useful in tests and
    /// for callers that decode from other sources.
    pub fn new(
        chromosome: impl Into<String>,
        start: u64,
        operations: Vec<Operation>,
        read_id: impl Into<String>,
    ) -> Self {
        Self {
            chromosome: chromosome.into(),
            start,
            operations,
            query_sequence: None,
            query_qualities: None,
            read_id: read_id.into(),
            strand_hint: Strand::Unknown,
            flags: Flags::empty(),
            is_primary: true,
            raw: None,
        }
    }

    pub fn with_strand(mut self, strand: Strand) -> Self {
        self.strand_hint = strand;
        self
    }

    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.is_primary = !flags.is_secondary() && !flags.is_supplementary();
        self.flags = flags;
        self
    }

    pub fn key(&self) -> RecordKey {
        RecordKey {
            chromosome: self.chromosome.clone(),
            start: self.start,
            read_id: self.read_id.clone(),
            flags: self.flags.bits(),
        }
    }

    pub fn is_mapped(&self) -> bool {
        !self.flags.is_unmapped() && self.start > 0
    }

    /// Has a reference sequence and a position, mapped or not.
    pub fn is_placed(&self) -> bool {
        self.chromosome != UNPLACED && self.start > 0
    }

    /// Last reference base covered, skips included.
    pub fn end(&self) -> u64 {
        let len = cigar::reference_len(&self.operations);
        if len == 0 { self.start } else { self.start + len - 1 }
    }

    /// Orientation of the read itself, used for exon features.
    pub fn read_strand(&self) -> Strand {
        if self.flags.is_reverse_complemented() {
            Strand::Reverse
        } else {
            Strand::Forward
        }
    }

    pub fn decode(&self, mode: DecodeMode) -> Result<Decoded, Error> {
        if !self.is_mapped() {
            return Ok(Decoded::default());
        }
        cigar::decode(self.start, &self.operations, mode).map_err(|e| match e {
            Error::MalformedCigar(msg) => Error::MalformedCigar(format!(
                "{msg} (read {} at {}:{})",
                self.read_id, self.chromosome, self.start
            )),
            other => other,
        })
    }

    /// Junctions of this record, stranded by the aligner hint.
    pub fn junctions(&self) -> Result<Vec<Junction>, Error> {
        let decoded = self.decode(DecodeMode::Junctions)?;
        Ok(decoded
            .junctions
            .into_iter()
            .map(|span| Junction::new(self.chromosome.clone(), span.start, span.end, self.strand_hint))
            .collect())
    }

    /// Output order: chromosome, start, read id, flags.
    pub fn cmp_position(&self, other: &Self) -> Ordering {
        (self.start, &self.read_id, self.flags.bits())
            .cmp(&(other.start, &other.read_id, other.flags.bits()))
    }
}

impl PartialEq for AlignmentRecord {
    fn eq(&self, other: &Self) -> bool {
        self.chromosome == other.chromosome
            && self.start == other.start
            && self.read_id == other.read_id
            && self.flags == other.flags
    }
}

impl Eq for AlignmentRecord {}

impl Hash for AlignmentRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.chromosome.hash(state);
        self.start.hash(state);
        self.read_id.hash(state);
        self.flags.bits().hash(state);
    }
}

/// Convert a BAM record. `reference_names` maps reference ids to names.
///
/// Sequence and qualities are only copied when `keep_query` is set.
pub fn from_bam(
    record: bam::Record,
    reference_names: &[String],
    keep_query: bool,
) -> Result<AlignmentRecord> {
    let flags = record.flags();

    let chromosome = match record.reference_sequence_id().transpose()? {
        Some(id) => reference_names
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("reference id {id} missing from header"))?,
        None => UNPLACED.to_string(),
    };

    let start = match record.alignment_start().transpose()? {
        Some(pos) => pos.get() as u64,
        None => 0,
    };

    let mut operations = Vec::new();
    for op in record.cigar().iter() {
        operations.push(Operation::try_from_sam(op?)?);
    }

    let (query_sequence, query_qualities) = if keep_query {
        let seq: Vec<u8> = record.sequence().iter().collect();
        let qual: Vec<u8> = record.quality_scores().iter().collect();
        (
            (!seq.is_empty()).then_some(seq),
            (!qual.is_empty()).then_some(qual),
        )
    } else {
        (None, None)
    };

    let read_id = record.name().map(|n| n.to_string()).unwrap_or_default();
    let strand_hint = splice_strand(&record);

    Ok(AlignmentRecord {
        chromosome,
        start,
        operations,
        query_sequence,
        query_qualities,
        read_id,
        strand_hint,
        flags,
        is_primary: !flags.is_secondary() && !flags.is_supplementary(),
        raw: Some(record),
    })
}

/// Transcript strand from the aligner: `XS` (HISAT2, STAR), else minimap2's
/// `ts`, which is relative to the read and flips on reverse-strand records.
fn splice_strand(record: &bam::Record) -> Strand {
    let xs_tag = Tag::new(b'X', b'S');
    let ts_tag = Tag::new(b't', b's');

    if let Some(c) = get_char_tag(record, xs_tag) {
        let strand = Strand::from_char(c as char);
        if strand.is_known() {
            return strand;
        }
    }

    if let Some(c) = get_char_tag(record, ts_tag) {
        let strand = Strand::from_char(c as char);
        if strand.is_known() {
            return if record.flags().is_reverse_complemented() {
                strand.flip()
            } else {
                strand
            };
        }
    }

    Strand::Unknown
}

fn get_char_tag(record: &bam::Record, tag: Tag) -> Option<u8> {
    let data = record.data();
    let value = data.get(&tag)?;
    let value = value.ok()?;
    match value {
        Value::Character(c) => Some(c),
        Value::String(s) => s.first().copied(),
        _ => None,
    }
}
