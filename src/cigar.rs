//! Decoding of run-length alignment operations (CIGAR) into splice junctions
//! and per-exon segments.

use crate::error::Error;
use noodles::sam::alignment::record::cigar::{Op as SamCigarOp, op::Kind as CigarKind};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Match,
    Insertion,
    Deletion,
    Skip,
    SoftClip,
    HardClip,
    Padding,
}

impl OpKind {
    /// Advances the reference cursor.
    pub fn consumes_reference(self) -> bool {
        matches!(self, OpKind::Match | OpKind::Deletion | OpKind::Skip)
    }

    /// Advances the query cursor.
    pub fn consumes_query(self) -> bool {
        matches!(self, OpKind::Match | OpKind::Insertion | OpKind::SoftClip)
    }

    pub fn as_char(self) -> char {
        match self {
            OpKind::Match => 'M',
            OpKind::Insertion => 'I',
            OpKind::Deletion => 'D',
            OpKind::Skip => 'N',
            OpKind::SoftClip => 'S',
            OpKind::HardClip => 'H',
            OpKind::Padding => 'P',
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            // `=` and `X` consume both sequences exactly like `M`.
            'M' | '=' | 'X' => Some(OpKind::Match),
            'I' => Some(OpKind::Insertion),
            'D' => Some(OpKind::Deletion),
            'N' => Some(OpKind::Skip),
            'S' => Some(OpKind::SoftClip),
            'H' => Some(OpKind::HardClip),
            'P' => Some(OpKind::Padding),
            _ => None,
        }
    }
}

/// One `(kind, length)` pair of a CIGAR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operation {
    pub kind: OpKind,
    pub len: u32,
}

impl Operation {
    pub fn new(kind: OpKind, len: u32) -> Self {
        Self { kind, len }
    }

    /// Build from a SAM numeric op code (0=M, 1=I, 2=D, 3=N, 4=S, 5=H, 6=P, 7==, 8=X)
    /// and a signed length, as found in raw BAM data or foreign tuples.
    pub fn from_raw(code: u8, len: i64) -> Result<Self, Error> {
        let kind = match code {
            0 | 7 | 8 => OpKind::Match,
            1 => OpKind::Insertion,
            2 => OpKind::Deletion,
            3 => OpKind::Skip,
            4 => OpKind::SoftClip,
            5 => OpKind::HardClip,
            6 => OpKind::Padding,
            _ => return Err(Error::MalformedCigar(format!("unknown operation code {code}"))),
        };
        let len = u32::try_from(len)
            .map_err(|_| Error::MalformedCigar(format!("invalid operation length {len}")))?;
        Ok(Self { kind, len })
    }

    pub fn try_from_sam(op: SamCigarOp) -> Result<Self, Error> {
        let kind = match op.kind() {
            CigarKind::Match | CigarKind::SequenceMatch | CigarKind::SequenceMismatch => {
                OpKind::Match
            }
            CigarKind::Insertion => OpKind::Insertion,
            CigarKind::Deletion => OpKind::Deletion,
            CigarKind::Skip => OpKind::Skip,
            CigarKind::SoftClip => OpKind::SoftClip,
            CigarKind::HardClip => OpKind::HardClip,
            CigarKind::Pad => OpKind::Padding,
        };
        let len = u32::try_from(op.len())
            .map_err(|_| Error::MalformedCigar(format!("operation length {} out of range", op.len())))?;
        Ok(Self { kind, len })
    }

    pub fn to_sam(self) -> SamCigarOp {
        let kind = match self.kind {
            OpKind::Match => CigarKind::Match,
            OpKind::Insertion => CigarKind::Insertion,
            OpKind::Deletion => CigarKind::Deletion,
            OpKind::Skip => CigarKind::Skip,
            OpKind::SoftClip => CigarKind::SoftClip,
            OpKind::HardClip => CigarKind::HardClip,
            OpKind::Padding => CigarKind::Pad,
        };
        SamCigarOp::new(kind, self.len as usize)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.len, self.kind.as_char())
    }
}

/// Parse a text CIGAR such as `50M200N50M`. `*` is the empty CIGAR.
pub fn parse_cigar(text: &str) -> Result<Vec<Operation>, Error> {
    if text == "*" {
        return Ok(Vec::new());
    }
    let mut ops = Vec::new();
    let mut len: Option<u32> = None;
    for c in text.chars() {
        if let Some(d) = c.to_digit(10) {
            let next = len
                .unwrap_or(0)
                .checked_mul(10)
                .and_then(|l| l.checked_add(d))
                .ok_or_else(|| Error::MalformedCigar(format!("length overflow in {text:?}")))?;
            len = Some(next);
            continue;
        }
        let kind = OpKind::from_char(c)
            .ok_or_else(|| Error::MalformedCigar(format!("unknown operation {c:?} in {text:?}")))?;
        let n = len
            .take()
            .ok_or_else(|| Error::MalformedCigar(format!("operation {c:?} without length in {text:?}")))?;
        ops.push(Operation::new(kind, n));
    }
    if len.is_some() {
        return Err(Error::MalformedCigar(format!("trailing length in {text:?}")));
    }
    Ok(ops)
}

/// What `decode` should report besides junctions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    #[default]
    Junctions,
    /// Also cut the alignment into one segment per exon.
    Segments,
}

/// Junction coordinates relative to nothing but the reference, 1-based inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: u64,
    pub end: u64,
}

/// A run of non-skip operations between two skips (or an alignment end).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Reference offset of the segment start from the alignment start.
    pub ref_offset: u64,
    /// Reference bases covered by `Match` and `Deletion` inside the segment.
    pub ref_len: u64,
    /// Half-open query range `[query_start, query_end)`.
    pub query_start: usize,
    pub query_end: usize,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoded {
    pub junctions: Vec<Span>,
    /// Empty unless decoded with `DecodeMode::Segments`.
    pub segments: Vec<Segment>,
}

/// Decode the junctions implied by every `Skip`, in operation order.
///
/// `start` is the 1-based reference position of the first aligned base.
/// `Match`, `Deletion` and `Skip` advance the reference cursor; a `Skip` of
/// length `L` at cursor `c` yields `[c, c + L - 1]`.
pub fn decode(start: u64, ops: &[Operation], mode: DecodeMode) -> Result<Decoded, Error> {
    let mut out = Decoded::default();
    let mut ref_pos = start;
    let mut query_pos = 0usize;

    let mut seg_offset = 0u64;
    let mut seg_ref_len = 0u64;
    let mut seg_query_start = 0usize;
    let mut seg_ops: Vec<Operation> = Vec::new();

    for op in ops {
        let len = op.len as u64;
        if op.kind == OpKind::Skip {
            if op.len == 0 {
                return Err(Error::MalformedCigar("zero-length skip".to_string()));
            }
            out.junctions.push(Span {
                start: ref_pos,
                end: ref_pos + len - 1,
            });
            if mode == DecodeMode::Segments {
                out.segments.push(Segment {
                    ref_offset: seg_offset,
                    ref_len: seg_ref_len,
                    query_start: seg_query_start,
                    query_end: query_pos,
                    operations: std::mem::take(&mut seg_ops),
                });
            }
            ref_pos += len;
            seg_offset = ref_pos - start;
            seg_ref_len = 0;
            seg_query_start = query_pos;
            continue;
        }

        if op.kind.consumes_reference() {
            ref_pos += len;
            seg_ref_len += len;
        }
        if op.kind.consumes_query() {
            query_pos += op.len as usize;
        }
        if mode == DecodeMode::Segments {
            seg_ops.push(*op);
        }
    }

    if mode == DecodeMode::Segments {
        out.segments.push(Segment {
            ref_offset: seg_offset,
            ref_len: seg_ref_len,
            query_start: seg_query_start,
            query_end: query_pos,
            operations: seg_ops,
        });
    }

    Ok(out)
}

/// Junction spans only.
pub fn junction_spans(start: u64, ops: &[Operation]) -> Result<Vec<Span>, Error> {
    Ok(decode(start, ops, DecodeMode::Junctions)?.junctions)
}

/// Number of reference bases the alignment covers, skips included.
pub fn reference_len(ops: &[Operation]) -> u64 {
    ops.iter()
        .filter(|op| op.kind.consumes_reference())
        .map(|op| op.len as u64)
        .sum()
}
