use crate::bam_io::{AlignmentWriter, BamSource};
use crate::chrom_order::ChromosomeOrder;
use crate::cli::{Args, Command};
use crate::compare;
use crate::convert::{self, InputFormat, OutputFormat};
use crate::error::Error;
use crate::exons;
use crate::gff::GffFeature;
use crate::mates;
use crate::merge;
use crate::progress::LogProgress;
use crate::report::{self, AlignmentFormat};
use crate::split;
use crate::support::{self, SearchConfig, SupportFilter, TargetSet};
use crate::targets;
use crate::types::{HashSet, Junction};
use anyhow::{Result, bail};
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct Stats {
    pub command: &'static str,
    /// GFF3 features written.
    pub features: u64,
    /// Alignment records written.
    pub alignments: u64,
    /// Output files created.
    pub files: u64,
}

pub fn run(args: &Args) -> Result<Stats> {
    let order = args.chromosome_order()?;
    let threads = args.threads.max(1);

    match &args.command {
        Command::Introns {
            bams,
            known,
            min_support,
            strand_required,
            out,
        } => {
            let filter = SupportFilter {
                min_support: *min_support,
                strand_required: *strand_required,
            };
            let features = run_introns(bams, known.as_deref(), &filter, out.as_deref(), threads, &order)?;
            Ok(Stats {
                command: "introns",
                features: features as u64,
                ..Stats::default()
            })
        }
        Command::Support {
            bam,
            introns,
            gff3,
            tsv,
            mates,
            out,
            ext,
            read_span,
        } => {
            let request = SupportRequest {
                bam,
                coordinates: introns,
                gff3: gff3.as_deref(),
                tsv: tsv.as_deref(),
                mates: *mates,
                out: out.as_deref(),
                ext: *ext,
                config: SearchConfig {
                    read_span: *read_span,
                    threads,
                },
            };
            run_support(&request, &order)
        }
        Command::Exons { bam, out } => {
            let features = run_exons(bam, out.as_deref(), &order)?;
            Ok(Stats {
                command: "exons",
                features: features as u64,
                ..Stats::default()
            })
        }
        Command::Split { input, output } => {
            let alignments = run_split(input, output)?;
            Ok(Stats {
                command: "split",
                alignments,
                ..Stats::default()
            })
        }
        Command::Convert { from, to, input, out } => {
            let features = run_convert(input, *from, *to, out.as_deref())?;
            Ok(Stats {
                command: "convert",
                features: features as u64,
                ..Stats::default()
            })
        }
        Command::Merge { inputs, out } => {
            let features = run_merge(inputs, out.as_deref(), &order)?;
            Ok(Stats {
                command: "merge",
                features: features as u64,
                ..Stats::default()
            })
        }
        Command::Diff {
            inputs,
            types,
            out,
            force,
        } => run_diff(inputs, types, out, *force, &order),
    }
}

/// Discovery: count, reconcile with the known set, filter, write GFF3.
pub fn run_introns(
    bams: &[PathBuf],
    known: Option<&Path>,
    filter: &SupportFilter,
    out: Option<&Path>,
    threads: usize,
    order: &ChromosomeOrder,
) -> Result<usize> {
    let sources = bams
        .iter()
        .map(|path| BamSource::open(path))
        .collect::<Result<Vec<_>>>()?;

    let progress = LogProgress::new("counting junctions");
    let mut table = support::discover(&sources, threads, &progress)?;

    if let Some(path) = known {
        let known: HashSet<Junction> = targets::read_gff3(path)?.into_iter().collect();
        let discovered = table.len();
        table.reconcile(&known);
        tracing::info!(
            known = known.len(),
            discovered,
            "reconciled with known junctions"
        );
    }

    let removed = table.apply_filter(filter);
    if filter.min_support > 0 {
        tracing::info!(
            removed = removed.below_min_support,
            min_support = filter.min_support,
            "removed junctions below minimum support"
        );
    }
    if filter.strand_required {
        tracing::info!(removed = removed.unknown_strand, "removed junctions with unknown strand");
    }

    let features = report::count_features(&table, "intron", order);
    report::write_gff3(out, &[], &features)
}

/// Everything the targeted search needs besides the chromosome order.
#[derive(Debug)]
pub struct SupportRequest<'a> {
    pub bam: &'a Path,
    pub coordinates: &'a [String],
    pub gff3: Option<&'a Path>,
    pub tsv: Option<&'a Path>,
    pub mates: bool,
    pub out: Option<&'a Path>,
    pub ext: AlignmentFormat,
    pub config: SearchConfig,
}

/// Targeted search: index check first, then region scan, optional mate
/// expansion, then one merged file or one file per junction.
pub fn run_support(request: &SupportRequest<'_>, order: &ChromosomeOrder) -> Result<Stats> {
    let source = BamSource::open(request.bam)?;
    source.require_index()?;

    let targets = targets::load_targets(request.coordinates, request.gff3, request.tsv)?;
    if targets.is_empty() {
        bail!("no target junctions given (use --intron, --gff3 or --tsv)");
    }
    let target_set: TargetSet = targets.iter().cloned().collect();

    let progress = LogProgress::new("searching alignments");
    let mut table = support::find_support(&source, &target_set, &request.config, order, &progress)?;
    if request.mates {
        table = mates::expand_mates(&source, table, &progress)?;
    }
    report::warn_unsupported(&targets, &table);

    let mut stats = Stats {
        command: "support",
        ..Stats::default()
    };
    match request.out {
        Some(path) => {
            stats.alignments = report::write_merged(&table, source.header(), path, order)?;
            stats.files = 1;
        }
        None => {
            let paths = report::write_per_junction(&table, source.header(), Path::new("."), request.ext, order)?;
            stats.alignments = table.total_records() as u64;
            stats.files = paths.len() as u64;
        }
    }
    Ok(stats)
}

pub fn run_exons(bam: &Path, out: Option<&Path>, order: &ChromosomeOrder) -> Result<usize> {
    let source = BamSource::open(bam)?;
    let progress = LogProgress::new("counting exons");
    let table = exons::count_exons(&source, &progress)?;
    let features = report::count_features(&table, "exon", order);
    report::write_gff3(out, &[], &features)
}

pub fn run_split(input: &Path, output: &Path) -> Result<u64> {
    let source = BamSource::open(input)?;
    let mut writer = AlignmentWriter::create(output, source.header())?;
    let progress = LogProgress::new("splitting alignments");
    let report = split::split_alignments(&source, source.header(), &mut writer, &progress)?;
    let written = writer.finish()?;
    tracing::info!(
        records_read = report.records_read,
        records_written = written,
        path = %output.display(),
        "split alignments"
    );
    Ok(written)
}

pub fn run_convert(input: &Path, from: InputFormat, to: OutputFormat, out: Option<&Path>) -> Result<usize> {
    let features = convert::convert(input, from)?;
    match to {
        OutputFormat::Gff3 => report::write_gff3(out, &[], &features),
        OutputFormat::Bed => report::write_bed(out, &features),
    }
}

pub fn run_merge(inputs: &[PathBuf], out: Option<&Path>, order: &ChromosomeOrder) -> Result<usize> {
    let merged = merge::merge_files(inputs, order)?;
    tracing::info!(files = inputs.len(), features = merged.features.len(), "merged GFF3 files");
    report::write_gff3(out, &merged.header, &merged.features)
}

/// Compare GFF3 files and write one GFF3 per result set into `dir`.
pub fn run_diff(
    inputs: &[PathBuf],
    types: &[String],
    dir: &Path,
    force: bool,
    order: &ChromosomeOrder,
) -> Result<Stats> {
    if inputs.len() < 2 {
        bail!("two or more GFF3 files are required");
    }
    if dir.exists() {
        if !force {
            bail!("output directory {} already exists (use --force to write into it)", dir.display());
        }
        tracing::warn!(dir = %dir.display(), "output directory exists, files may be overwritten");
    }
    std::fs::create_dir_all(dir).map_err(|e| Error::io(e, dir))?;

    if !types.is_empty() {
        tracing::info!(types = %types.join(" or "), "comparing features of matching types");
    }
    let comparison = compare::compare_files(inputs, types, order)?;
    let header: Vec<String> = inputs
        .iter()
        .enumerate()
        .map(|(n, path)| format!("##File {} = {}", n + 1, path.display()))
        .collect();

    let mut stats = Stats {
        command: "diff",
        ..Stats::default()
    };
    let mut write = |name: String, features: &[GffFeature]| -> Result<()> {
        let n = report::write_gff3(Some(&dir.join(name)), &header, features)?;
        stats.features += n as u64;
        stats.files += 1;
        Ok(())
    };

    tracing::info!(features = comparison.common.len(), "features common to all files");
    write("features_common_to_all.gff3".to_string(), &comparison.common)?;
    for ((i, j), features) in &comparison.pairs {
        tracing::info!(features = features.len(), "features common to files #{} and #{}", i + 1, j + 1);
        write(format!("features_common_to_{}_and_{}.gff3", i + 1, j + 1), features)?;
    }
    for (i, features) in comparison.unique.iter().enumerate() {
        tracing::info!(features = features.len(), "features unique to file #{}", i + 1);
        write(format!("features_unique_to_{}.gff3", i + 1), features)?;
    }
    tracing::info!(dir = %dir.display(), "wrote comparison");
    Ok(stats)
}
