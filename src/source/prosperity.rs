//! Raw tick dumps exported by the Prosperity venue. One line per order book
//! snapshot, semicolon-delimited, no header, exactly 17 fields. Absent price
//! levels are empty fields, never zero.

use std::fs::{read_to_string, remove_file, rename};
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::{PipelineError, Result};

pub const FIELD_COUNT: usize = 17;

/// Normalized schema, in the exact field order of the raw export.
pub const COLUMNS: [&str; FIELD_COUNT] = [
    "day",
    "timestamp",
    "product",
    "bid_price_1",
    "bid_volume_1",
    "bid_price_2",
    "bid_volume_2",
    "bid_price_3",
    "bid_volume_3",
    "ask_price_1",
    "ask_volume_1",
    "ask_price_2",
    "ask_volume_2",
    "ask_price_3",
    "ask_volume_3",
    "mid_price",
    "profit_and_loss",
];

/// Column positions within the normalized schema.
pub mod col {
    pub const DAY: usize = 0;
    pub const TIMESTAMP: usize = 1;
    pub const PRODUCT: usize = 2;
    pub const BID_PRICE_1: usize = 3;
    pub const BID_VOLUME_1: usize = 4;
    pub const ASK_PRICE_1: usize = 9;
    pub const ASK_VOLUME_1: usize = 10;
    pub const MID_PRICE: usize = 15;
    pub const PROFIT_AND_LOSS: usize = 16;
}

/// Split one raw line strictly on `;`. Field values pass through untouched,
/// empty fields stay empty.
pub fn split_record<'a>(path: &Path, line: usize, raw: &'a str) -> Result<Vec<&'a str>> {
    let fields: Vec<&str> = raw.split(';').collect();
    if fields.len() != FIELD_COUNT {
        return Err(PipelineError::MalformedRecord {
            path: path.to_path_buf(),
            line,
            expected: FIELD_COUNT,
            found: fields.len(),
        });
    }
    Ok(fields)
}

fn write_normalized(input: &Path, tmp: &Path) -> Result<usize> {
    let contents = read_to_string(input)?;
    let mut writer = csv::Writer::from_path(tmp)?;
    writer.write_record(COLUMNS)?;

    let mut rows = 0;
    for (idx, line) in contents.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let fields = split_record(input, idx + 1, line)?;
        writer.write_record(&fields)?;
        rows += 1;
    }
    writer.flush()?;
    Ok(rows)
}

/// Normalize one raw file into a headered CSV at `output`, preserving row
/// order and field values. Writes to a temporary path and renames on success
/// so a failure never leaves a partial output behind. Returns the row count.
pub fn normalize_file(input: &Path, output: &Path) -> Result<usize> {
    let mut tmp = output.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    match write_normalized(input, &tmp) {
        Ok(rows) => {
            rename(&tmp, output)?;
            Ok(rows)
        }
        Err(e) => {
            let _ = remove_file(&tmp);
            Err(e)
        }
    }
}

/// Normalize every raw `.csv` in `raw_dir`, writing a sibling file whose stem
/// carries `suffix` before the extension. Files already carrying the suffix
/// are skipped so re-runs are idempotent, as is anything in `exclude` (the
/// driver passes its combined output here in case it lives inside `raw_dir`).
/// One file's failure is logged and does not stop the others. Returns the
/// paths written, sorted by name.
pub fn organize_dir(raw_dir: &Path, suffix: &str, exclude: &[&Path]) -> Result<Vec<PathBuf>> {
    let mut raw_files = Vec::new();
    for entry in raw_dir.read_dir()? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if stem.ends_with(suffix) {
            continue;
        }
        if exclude.iter().any(|e| *e == path) {
            continue;
        }
        raw_files.push(path);
    }
    // read_dir order is platform-dependent
    raw_files.sort();

    let mut written = Vec::new();
    for path in raw_files {
        // file_stem checked above
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        let output = path.with_file_name(format!("{stem}{suffix}.csv"));
        match normalize_file(&path, &output) {
            Ok(rows) => {
                info!("normalized {} rows: {} -> {}", rows, path.display(), output.display());
                written.push(output);
            }
            Err(e) => {
                warn!("skipping {}: {}", path.display(), e);
            }
        }
    }
    Ok(written)
}
