//! Vesta is the merged corpus: every normalized file in a directory loaded
//! into one table, stably sorted by `(day, timestamp)`. The merge is a
//! disjoint union of its source files, it never drops or duplicates rows.

use std::fs::{remove_file, rename};
use std::path::{Path, PathBuf};

use csv::StringRecord;
use rand::thread_rng;
use rand_distr::{Distribution, Uniform};

use crate::error::{PipelineError, Result};
use crate::source::prosperity::{col, COLUMNS};

#[derive(Clone, Debug)]
pub struct Vesta {
    header: StringRecord,
    rows: Vec<StringRecord>,
}

/// Sort key for one row. Keys that fail to parse sort before parseable ones
/// and keep their relative order; the sort never drops a row.
fn sort_key(row: &StringRecord) -> (Option<i64>, Option<i64>) {
    (
        row.get(col::DAY).and_then(|v| v.parse().ok()),
        row.get(col::TIMESTAMP).and_then(|v| v.parse().ok()),
    )
}

impl Vesta {
    /// Load every `*{suffix}.csv` under `dir` and concatenate the rows. Files
    /// are read in name order so the merge is deterministic. All files must
    /// share the same header.
    pub fn from_dir(dir: &Path, suffix: &str) -> Result<Self> {
        let mut files = Vec::new();
        for entry in dir.read_dir()? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.ends_with(suffix) {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(PipelineError::EmptyCorpus(format!(
                "no *{suffix}.csv files under {}",
                dir.display()
            )));
        }
        Self::from_files(&files)
    }

    pub fn from_files(files: &[PathBuf]) -> Result<Self> {
        let mut header: Option<StringRecord> = None;
        let mut rows = Vec::new();

        for file in files {
            let mut reader = csv::Reader::from_path(file)?;
            let file_header = reader.headers()?.clone();

            match &header {
                None => header = Some(file_header),
                Some(expected) => {
                    if *expected != file_header {
                        return Err(PipelineError::SchemaMismatch {
                            path: file.clone(),
                            expected: expected.iter().map(String::from).collect(),
                            found: file_header.iter().map(String::from).collect(),
                        });
                    }
                }
            }

            for record in reader.records() {
                rows.push(record?);
            }
        }

        let header = header
            .ok_or_else(|| PipelineError::EmptyCorpus("no files to merge".to_string()))?;
        if rows.is_empty() {
            return Err(PipelineError::EmptyCorpus(
                "merged corpus has zero rows".to_string(),
            ));
        }
        Ok(Self { header, rows })
    }

    /// Stable sort by `(day, timestamp)` ascending. Rows with equal keys keep
    /// their relative input order.
    pub fn sort(&mut self) {
        self.rows.sort_by_key(sort_key);
    }

    /// Write the combined table to `path` via a temporary file renamed on
    /// success.
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let result = (|| -> Result<()> {
            let mut writer = csv::Writer::from_path(&tmp)?;
            writer.write_record(&self.header)?;
            for row in &self.rows {
                writer.write_record(row)?;
            }
            writer.flush()?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                rename(&tmp, path)?;
                Ok(())
            }
            Err(e) => {
                let _ = remove_file(&tmp);
                Err(e)
            }
        }
    }

    pub fn header(&self) -> &StringRecord {
        &self.header
    }

    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Unique product identifiers in first-seen order.
    pub fn products(&self) -> Vec<String> {
        let mut products: Vec<String> = Vec::new();
        for row in &self.rows {
            if let Some(product) = row.get(col::PRODUCT) {
                if !products.iter().any(|p| p == product) {
                    products.push(product.to_string());
                }
            }
        }
        products
    }

    /// Synthetic corpus for tests and benches: `snapshots` book snapshots per
    /// day for each symbol, days running up to 0, venue clock stepping in
    /// hundreds. Level 1 is always populated, levels 2 and 3 are left absent.
    pub fn random(days: i64, snapshots: i64, symbols: Vec<&str>) -> Self {
        let price_dist: Uniform<f64> = Uniform::new(1990.0, 2010.0);
        let size_dist: Uniform<f64> = Uniform::new(1.0, 50.0);
        let mut rng = thread_rng();

        let mut rows = Vec::new();
        for day in (1 - days)..=0 {
            for snap in 0..snapshots {
                let timestamp = snap * 100;
                for symbol in &symbols {
                    let mid = price_dist.sample(&mut rng).round();
                    let bid = mid - 1.0;
                    let ask = mid + 1.0;
                    let bid_size = size_dist.sample(&mut rng).round();
                    let ask_size = size_dist.sample(&mut rng).round();

                    let row = StringRecord::from(vec![
                        day.to_string(),
                        timestamp.to_string(),
                        symbol.to_string(),
                        bid.to_string(),
                        bid_size.to_string(),
                        String::new(),
                        String::new(),
                        String::new(),
                        String::new(),
                        ask.to_string(),
                        ask_size.to_string(),
                        String::new(),
                        String::new(),
                        String::new(),
                        String::new(),
                        mid.to_string(),
                        "0.0".to_string(),
                    ]);
                    rows.push(row);
                }
            }
        }

        Self {
            header: StringRecord::from(COLUMNS.to_vec()),
            rows,
        }
    }
}
