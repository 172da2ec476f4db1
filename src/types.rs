use std::fmt;

// Fast hash maps / sets using AHash instead of the default SipHash.
// Import these throughout the codebase with `use crate::types::{HashMap, HashSet}`.
// Also import `HashMapExt` / `HashSetExt` when you need `::new()` or `::with_capacity()`.
pub type HashMap<K, V> = ahash::HashMap<K, V>;
pub type HashSet<K> = ahash::HashSet<K>;
pub use ahash::HashMapExt;
pub use ahash::HashSetExt;

/// Orientation of a junction or alignment relative to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Strand {
    Forward,
    Reverse,
    #[default]
    Unknown,
}

impl Strand {
    /// `+` and `-` map to a defined strand, anything else is unknown.
    pub fn from_char(c: char) -> Self {
        match c {
            '+' => Strand::Forward,
            '-' => Strand::Reverse,
            _ => Strand::Unknown,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
            Strand::Unknown => '.',
        }
    }

    pub fn is_known(self) -> bool {
        self != Strand::Unknown
    }

    pub fn flip(self) -> Self {
        match self {
            Strand::Forward => Strand::Reverse,
            Strand::Reverse => Strand::Forward,
            Strand::Unknown => Strand::Unknown,
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A splice junction (intron), 1-based inclusive on both ends.
///
/// Equality and hashing cover all four fields, so the same coordinates on
/// different strands are different junctions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Junction {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
    pub strand: Strand,
}

impl Junction {
    pub fn new(chromosome: impl Into<String>, start: u64, end: u64, strand: Strand) -> Self {
        Self {
            chromosome: chromosome.into(),
            start,
            end,
            strand,
        }
    }

    /// Same coordinates with the strand erased.
    pub fn unstranded(&self) -> Self {
        Self {
            strand: Strand::Unknown,
            ..self.clone()
        }
    }

    /// File stem used when each junction gets its own output file.
    pub fn file_stem(&self) -> String {
        match self.strand {
            Strand::Unknown => format!("{}_{}_{}", self.chromosome, self.start, self.end),
            s => format!("{}_{}_{}_{}", self.chromosome, self.start, self.end, s),
        }
    }
}

impl fmt::Display for Junction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chromosome, self.start, self.end)?;
        if self.strand.is_known() {
            write!(f, " ({})", self.strand)?;
        }
        Ok(())
    }
}

/// A scan window on one chromosome, 1-based closed `[start, end]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Region {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
}

impl Region {
    pub fn new(chromosome: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            chromosome: chromosome.into(),
            start,
            end,
        }
    }

    /// True when `[start, end]` on `chromosome` shares at least one base with this window.
    pub fn overlaps(&self, chromosome: &str, start: u64, end: u64) -> bool {
        self.chromosome == chromosome && start <= self.end && self.start <= end
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chromosome, self.start, self.end)
    }
}
