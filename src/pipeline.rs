//! End-to-end driver: organize raw files, merge and sort the corpus, write
//! the combined table, then fit and evaluate one regression per product.
//! Stages run strictly in sequence, each stage only reads files the previous
//! stage has finished writing.

use std::fs::{create_dir_all, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::input::vesta::Vesta;
use crate::model::{fit_product, CsvPlotSink, FeatureFrame, NullPlotSink, ProductReport};
use crate::source::prosperity;

fn default_suffix() -> String {
    "ORGANIZED".to_string()
}

/// Injected configuration for one run. All paths come from the caller, the
/// pipeline has no built-in locations.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Directory holding the raw semicolon-delimited dumps. Normalized files
    /// are written beside them.
    pub raw_dir: PathBuf,
    /// Marker appended to the stem of each normalized file.
    #[serde(default = "default_suffix")]
    pub organized_suffix: String,
    /// Path of the single merged, sorted table. May live inside `raw_dir`;
    /// it is never picked up as a raw input on re-runs.
    pub combined_output: PathBuf,
    /// When set, per-product `(timestamp, actual)` eval pairs are written
    /// here for external charting.
    #[serde(default)]
    pub plot_dir: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

/// Run the whole pipeline, returning one report per product in first-seen
/// order.
pub fn run(config: &PipelineConfig) -> Result<Vec<ProductReport>> {
    let organized = prosperity::organize_dir(
        &config.raw_dir,
        &config.organized_suffix,
        &[config.combined_output.as_path()],
    )?;
    info!("organized {} raw files under {}", organized.len(), config.raw_dir.display());

    let mut table = Vesta::from_dir(&config.raw_dir, &config.organized_suffix)?;
    table.sort();
    table.write(&config.combined_output)?;
    info!(
        "merged {} rows into {}",
        table.len(),
        config.combined_output.display()
    );

    if let Some(plot_dir) = &config.plot_dir {
        create_dir_all(plot_dir)?;
    }

    let mut reports = Vec::new();
    for product in table.products() {
        let frame = FeatureFrame::extract(&table, &product)?;
        let report = match &config.plot_dir {
            Some(plot_dir) => {
                let mut sink = CsvPlotSink::create(&plot_dir.join(format!("{product}.csv")))?;
                fit_product(&frame, &mut sink)?
            }
            None => fit_product(&frame, &mut NullPlotSink)?,
        };
        info!(
            "fitted {}: train_rows={} eval_rows={} mse={:.6} r2={:.6}",
            report.product, report.train_rows, report.eval_rows, report.mse, report.r2
        );
        reports.push(report);
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::PipelineConfig;

    #[test]
    fn test_that_config_defaults_apply() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"raw_dir": "/data/raw", "combined_output": "/data/combined_data.csv"}"#,
        )
        .unwrap();

        assert_eq!(config.organized_suffix, "ORGANIZED");
        assert!(config.plot_dir.is_none());
    }
}
