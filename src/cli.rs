use crate::chrom_order::ChromosomeOrder;
use crate::convert::{InputFormat, OutputFormat};
use crate::regions::DEFAULT_READ_SPAN;
use crate::report::AlignmentFormat;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "junctools",
    about = "Decode, count and collect splice junctions from spliced alignments",
    version
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Number of threads (CPUs) to use
    #[arg(short = 'p', long = "threads", default_value_t = 1, global = true)]
    pub threads: usize,

    /// Set logging level to WARN
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Chromosome ranks for sorted output, e.g. I=1,II=2,MtDNA=7
    #[arg(long = "chrom-rank", value_name = "LABEL=RANK", value_delimiter = ',', global = true)]
    pub chrom_rank: Vec<String>,

    /// File of LABEL<TAB>RANK lines, merged before --chrom-rank
    #[arg(long = "chrom-rank-file", value_name = "FILE", global = true)]
    pub chrom_rank_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Count every splice junction in one or more BAM files (GFF3 output)
    Introns {
        /// Input BAM files; counts are summed
        #[arg(required = true, value_name = "BAM")]
        bams: Vec<PathBuf>,

        /// Report exactly these junctions (GFF3), with 0 for unseen ones
        #[arg(long, value_name = "GFF3")]
        known: Option<PathBuf>,

        /// Drop junctions supported by fewer reads
        #[arg(short = 'm', long = "min-support", default_value_t = 0)]
        min_support: u64,

        /// Drop junctions whose strand is unknown
        #[arg(short = 's', long = "strand-required")]
        strand_required: bool,

        /// Output GFF3 path (stdout if omitted)
        #[arg(short = 'o', long = "out", value_name = "GFF3")]
        out: Option<PathBuf>,
    },

    /// Collect the alignments supporting given junctions from an indexed BAM
    Support {
        /// Indexed input BAM (.bai or .csi next to it)
        #[arg(value_name = "BAM")]
        bam: PathBuf,

        /// Junction coordinates, chrom:start-end or chrom:start..end
        #[arg(short = 'i', long = "intron", value_name = "COORD", num_args = 1..)]
        introns: Vec<String>,

        /// Target junctions from a GFF3 file
        #[arg(short = 'g', long = "gff3", value_name = "GFF3")]
        gff3: Option<PathBuf>,

        /// Target junctions from a HISAT2 splice-site table
        #[arg(short = 't', long = "tsv", value_name = "TSV")]
        tsv: Option<PathBuf>,

        /// Also collect mates and alternative alignments of supporting reads
        #[arg(short = 'r', long = "mates")]
        mates: bool,

        /// Single output file (SAM or BAM by extension); one file per junction if omitted
        #[arg(short = 'o', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,

        /// Format of per-junction output files
        #[arg(long, value_enum, default_value_t = AlignmentFormat::Sam)]
        ext: AlignmentFormat,

        /// Bases added around each junction when planning scan windows
        #[arg(long = "read-span", default_value_t = DEFAULT_READ_SPAN)]
        read_span: u64,
    },

    /// Count exon blocks of every mapped alignment (GFF3 output)
    Exons {
        #[arg(value_name = "BAM")]
        bam: PathBuf,

        /// Output GFF3 path (stdout if omitted)
        #[arg(short = 'o', long = "out", value_name = "GFF3")]
        out: Option<PathBuf>,
    },

    /// Split spliced alignments into one record per exon
    Split {
        #[arg(value_name = "IN.bam")]
        input: PathBuf,

        /// SAM or BAM by extension
        #[arg(value_name = "OUT")]
        output: PathBuf,
    },

    /// Convert STAR, BED12, coordinate-list or GFF3 junctions to GFF3 or BED12
    Convert {
        #[arg(long = "from", value_enum)]
        from: InputFormat,

        #[arg(long = "to", value_enum, default_value_t = OutputFormat::Gff3)]
        to: OutputFormat,

        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output path (stdout if omitted)
        #[arg(short = 'o', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Non-redundant union of GFF3 files
    Merge {
        #[arg(required = true, value_name = "GFF3")]
        inputs: Vec<PathBuf>,

        /// Output GFF3 path (stdout if omitted)
        #[arg(short = 'o', long = "out", value_name = "GFF3")]
        out: Option<PathBuf>,
    },

    /// Compare GFF3 files by feature position: unique to each, shared by all
    Diff {
        #[arg(required = true, num_args = 2.., value_name = "GFF3")]
        inputs: Vec<PathBuf>,

        /// Only compare features of these types (column 3), comma separated or repeated
        #[arg(short = 't', long = "type", value_name = "TYPE", value_delimiter = ',')]
        types: Vec<String>,

        /// Output directory to create
        #[arg(short = 'o', long = "out", value_name = "DIR", default_value = "diff_output")]
        out: PathBuf,

        /// Write into the output directory even if it already exists
        #[arg(short = 'f', long = "force")]
        force: bool,
    },
}

impl Args {
    /// Rank table from `--chrom-rank-file` then `--chrom-rank`; lexical if neither is set.
    pub fn chromosome_order(&self) -> Result<ChromosomeOrder> {
        let mut order = match &self.chrom_rank_file {
            Some(path) => ChromosomeOrder::from_file(path)?,
            None => ChromosomeOrder::lexical(),
        };
        order.extend(ChromosomeOrder::parse_pairs(
            self.chrom_rank.iter().map(String::as_str),
        )?);
        Ok(order)
    }
}
