use crate::bam_io::{AlignmentSource, ScanScope};
use crate::cigar::DecodeMode;
use crate::progress::{Counters, ProgressObserver};
use crate::support::CountTable;
use crate::types::Junction;
use anyhow::Result;

/// Count exon blocks: every segment between skips of every mapped record
/// becomes `[start + ref_offset, start + ref_offset + ref_len - 1]` on the
/// read's own strand. The result reuses the junction table type, keyed by
/// exon intervals instead of introns.
pub fn count_exons<S>(source: &S, observer: &dyn ProgressObserver) -> Result<CountTable>
where
    S: AlignmentSource + ?Sized,
{
    let counters = Counters::default();
    let mut table = CountTable::new();
    source.scan(ScanScope::All, &mut |record| {
        counters.tick(observer);
        if !record.is_mapped() {
            return Ok(());
        }
        let decoded = record.decode(DecodeMode::Segments)?;
        let strand = record.read_strand();
        for segment in decoded.segments {
            if segment.ref_len == 0 {
                continue;
            }
            let start = record.start + segment.ref_offset;
            let end = start + segment.ref_len - 1;
            table.increment(Junction::new(record.chromosome.clone(), start, end, strand));
            counters.found(1);
        }
        Ok(())
    })?;
    tracing::info!(
        lines_read = counters.lines(),
        exons = table.len(),
        "exon counting complete"
    );
    Ok(table)
}
