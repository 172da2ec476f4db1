//! Second pass that pulls in every alignment of a supporting read: its
//! mate, secondary and supplementary alignments.

use crate::bam_io::{AlignmentSource, ScanScope};
use crate::progress::{Counters, ProgressObserver};
use crate::support::RecordTable;
use crate::types::{HashMap, HashMapExt, Junction};
use anyhow::Result;

/// Read ids mapped to every junction their records support.
pub fn supporting_reads(table: &RecordTable) -> HashMap<String, Vec<Junction>> {
    let mut reads: HashMap<String, Vec<Junction>> = HashMap::new();
    for (junction, records) in table.iter() {
        for record in records.iter() {
            let junctions = reads.entry(record.read_id.clone()).or_default();
            if !junctions.contains(junction) {
                junctions.push(junction.clone());
            }
        }
    }
    reads
}

/// Scan the whole source once and add every record of a supporting read to
/// each junction that read supports. Junctions not supported by any read in
/// the table are left untouched.
pub fn expand_mates<S>(
    source: &S,
    table: RecordTable,
    observer: &dyn ProgressObserver,
) -> Result<RecordTable>
where
    S: AlignmentSource + ?Sized,
{
    let reads = supporting_reads(&table);
    tracing::info!(reads = reads.len(), "searching for mates and alternative alignments");

    let counters = Counters::default();
    let mut expanded = table;
    source.scan(ScanScope::All, &mut |record| {
        counters.tick(observer);
        let Some(junctions) = reads.get(&record.read_id) else {
            return Ok(());
        };
        for junction in junctions {
            if expanded.entry(junction.clone()).insert(record.clone()) {
                counters.found(1);
            }
        }
        Ok(())
    })?;

    tracing::info!(
        lines_read = counters.lines(),
        added = counters.matches(),
        total = expanded.total_records(),
        "mate expansion complete"
    );
    Ok(expanded)
}
