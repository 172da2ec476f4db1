//! junctools: decode, count and collect splice junctions from spliced
//! alignments.
//!
//! # Library usage
//!
//! ```no_run
//! use junctools::{AlignmentRecord, ChromosomeOrder, CountTable, parse_cigar};
//!
//! // Any alignment source works: BAM files through `BamSource`, or records
//! // built in memory.
//! let ops = parse_cigar("50M200N50M").unwrap();
//! let record = AlignmentRecord::new("I", 100, ops, "read1");
//!
//! let mut table = CountTable::new();
//! for junction in record.junctions().unwrap() {
//!     table.increment(junction);
//! }
//! // [I:150-349]
//! let sorted = table.sorted_junctions(&ChromosomeOrder::lexical());
//! ```

// Internal modules, not part of the public API.
pub(crate) mod shard;
pub(crate) mod types;

// Public modules.
pub mod alignment;
pub mod bam_io;
pub mod chrom_order;
pub mod cigar;
pub mod compare;
pub mod convert;
pub mod error;
pub mod exons;
pub mod gff;
pub mod mates;
pub mod merge;
pub mod progress;
pub mod regions;
pub mod report;
pub mod split;
pub mod support;
pub mod targets;

// Binary front end.
#[doc(hidden)]
pub mod cli;
#[doc(hidden)]
pub mod pipeline;

// Flat re-exports for the most commonly used public types.
pub use alignment::{AlignmentRecord, RecordKey};
pub use bam_io::{AlignmentSource, AlignmentWriter, BamSource, ScanScope};
pub use chrom_order::ChromosomeOrder;
pub use cigar::{DecodeMode, OpKind, Operation, decode, parse_cigar};
pub use error::Error;
pub use progress::{LogProgress, ProgressObserver, Silent};
pub use regions::plan_regions;
pub use support::{CountTable, RecordTable, SearchConfig, SupportFilter, TargetSet};
pub use types::{Junction, Region, Strand};

// Re-exports needed by integration tests in tests/.
#[doc(hidden)]
pub use types::{HashMap, HashSet};
#[doc(hidden)]
pub use shard::run_sharded;
