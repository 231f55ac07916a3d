//! Tab-separated output table

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use inoliblist_core::{CandidateRecord, HEADERS};

/// Name of the list inside the output folder
pub const OUTPUT_FILE_NAME: &str = "inoliblist.tsv";

/// Write the header row and every record, sorted by repository URL.
///
/// Returns `None` without touching the file system when there are no
/// records, so an empty run never replaces a previous list.
pub fn write_table(dir: &Path, records: &[CandidateRecord]) -> io::Result<Option<PathBuf>> {
    if records.is_empty() {
        return Ok(None);
    }

    let mut rows: Vec<Vec<String>> = records.iter().map(CandidateRecord::to_row).collect();
    rows.sort();

    fs::create_dir_all(dir)?;
    let path = dir.join(OUTPUT_FILE_NAME);
    let mut writer = BufWriter::new(File::create(&path)?);

    writeln!(writer, "{}", HEADERS.join("\t"))?;
    for row in &rows {
        writeln!(writer, "{}", row.join("\t"))?;
    }
    writer.flush()?;

    Ok(Some(path))
}
