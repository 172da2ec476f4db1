//! Ordering of chromosome labels for every sorted output.
//!
//! A label→rank table captures an organism's canonical order (roman numerals,
//! `MtDNA` last, and so on). Whether the table is used is decided once per
//! sort: if any label in the data is missing from the table, the whole sort
//! falls back to plain lexical order.

use crate::error::Error;
use crate::types::{HashMap, HashMapExt, Junction};
use std::cmp::Ordering;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct ChromosomeOrder {
    ranks: HashMap<String, u32>,
}

/// The comparator chosen for one dataset.
#[derive(Debug, Clone, Copy)]
pub enum ResolvedOrder<'a> {
    Ranked(&'a HashMap<String, u32>),
    Lexical,
}

impl ResolvedOrder<'_> {
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match self {
            ResolvedOrder::Ranked(ranks) => match (ranks.get(a), ranks.get(b)) {
                (Some(ra), Some(rb)) => ra.cmp(rb).then_with(|| a.cmp(b)),
                // unreachable for a resolved dataset, keep the order total anyway
                _ => a.cmp(b),
            },
            ResolvedOrder::Lexical => a.cmp(b),
        }
    }

    pub fn is_ranked(&self) -> bool {
        matches!(self, ResolvedOrder::Ranked(_))
    }
}

impl ChromosomeOrder {
    pub fn new<I, S>(ranks: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self {
            ranks: ranks.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Lexical order for every dataset.
    pub fn lexical() -> Self {
        Self::default()
    }

    /// Parse `LABEL=RANK` items, e.g. `I=1`, `II=2`, `MtDNA=11`.
    pub fn parse_pairs<'a>(items: impl IntoIterator<Item = &'a str>) -> Result<Self, Error> {
        let mut ranks = HashMap::new();
        for item in items {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let (label, rank) = item
                .split_once('=')
                .ok_or_else(|| Error::Config(format!("expected LABEL=RANK, got {item:?}")))?;
            let rank: u32 = rank
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("rank is not an integer in {item:?}")))?;
            ranks.insert(label.trim().to_string(), rank);
        }
        Ok(Self { ranks })
    }

    /// Read a two-column `LABEL<TAB>RANK` file; `#` lines are comments.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(e, path))?;
        let mut ranks = HashMap::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut cols = line.split_whitespace();
            let (Some(label), Some(rank)) = (cols.next(), cols.next()) else {
                return Err(Error::line(path, idx + 1, line, "expected LABEL and RANK"));
            };
            let rank: u32 = rank
                .parse()
                .map_err(|_| Error::line(path, idx + 1, line, "rank is not an integer"))?;
            ranks.insert(label.to_string(), rank);
        }
        Ok(Self { ranks })
    }

    /// Add the entries of `other`, overriding ranks of shared labels.
    pub fn extend(&mut self, other: ChromosomeOrder) {
        self.ranks.extend(other.ranks);
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// Pick the comparator for a dataset with the given labels.
    pub fn resolve<'a, I>(&self, labels: I) -> ResolvedOrder<'_>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if self.ranks.is_empty() {
            return ResolvedOrder::Lexical;
        }
        for label in labels {
            if !self.ranks.contains_key(label) {
                tracing::debug!(label, "chromosome missing from rank table, sorting lexically");
                return ResolvedOrder::Lexical;
            }
        }
        ResolvedOrder::Ranked(&self.ranks)
    }

    /// Sort by chromosome, then by `then` for equal chromosomes.
    pub fn sort_by<T, C, F>(&self, items: &mut [T], chromosome: C, then: F)
    where
        C: Fn(&T) -> &str,
        F: Fn(&T, &T) -> Ordering,
    {
        let resolved = self.resolve(items.iter().map(&chromosome));
        items.sort_by(|a, b| {
            resolved
                .compare(chromosome(a), chromosome(b))
                .then_with(|| then(a, b))
        });
    }

    /// Sort junctions by chromosome, start, end, then strand.
    pub fn sort_junctions(&self, junctions: &mut [Junction]) {
        self.sort_by(
            junctions,
            |j| j.chromosome.as_str(),
            |a, b| (a.start, a.end, a.strand).cmp(&(b.start, b.end, b.strand)),
        );
    }
}
