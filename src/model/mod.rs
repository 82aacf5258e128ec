//! Model fitting runs over the merged corpus one product at a time: project
//! the fixed feature set and target, split train/eval without shuffling, hand
//! the matrices to the regression collaborator and report its evaluation
//! metrics. Rows are time-ordered, the split must never shuffle.
pub mod ols;

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::input::vesta::Vesta;
use crate::source::prosperity::col;

pub const NUM_FEATURES: usize = 6;

/// Feature columns, in matrix order.
pub const FEATURES: [&str; NUM_FEATURES] = [
    "timestamp",
    "day",
    "bid_price_1",
    "bid_volume_1",
    "ask_price_1",
    "ask_volume_1",
];

pub const TARGET: &str = "mid_price";

const FEATURE_COLS: [usize; NUM_FEATURES] = [
    col::TIMESTAMP,
    col::DAY,
    col::BID_PRICE_1,
    col::BID_VOLUME_1,
    col::ASK_PRICE_1,
    col::ASK_VOLUME_1,
];

/// Explicit numeric coercion: empty or unparseable fields are missing, never
/// zero and never an error.
pub fn coerce_or_missing(field: &str) -> Option<f64> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse().ok()
}

/// Per-product feature matrix and target vector, rows in corpus order.
/// Created fresh per training run, never persisted.
#[derive(Clone, Debug)]
pub struct FeatureFrame {
    pub product: String,
    pub rows: Vec<[f64; NUM_FEATURES]>,
    pub target: Vec<f64>,
    /// Coerced alongside the features but not fed to the model; missing
    /// values are NaN.
    pub profit_and_loss: Vec<f64>,
}

/// Borrowed train or eval segment of a frame.
pub struct Segment<'a> {
    pub rows: &'a [[f64; NUM_FEATURES]],
    pub target: &'a [f64],
}

impl FeatureFrame {
    /// Project `table` onto the feature set for one product. Rows where
    /// `mid_price`, `timestamp` or `bid_price_1` fail coercion are dropped;
    /// other features that fail coercion are carried as NaN.
    pub fn extract(table: &Vesta, product: &str) -> Result<Self> {
        let mut rows = Vec::new();
        let mut target = Vec::new();
        let mut profit_and_loss = Vec::new();

        for record in table.rows() {
            if record.get(col::PRODUCT) != Some(product) {
                continue;
            }

            let timestamp = coerce_or_missing(record.get(col::TIMESTAMP).unwrap_or(""));
            let mid_price = coerce_or_missing(record.get(col::MID_PRICE).unwrap_or(""));
            let bid_price_1 = coerce_or_missing(record.get(col::BID_PRICE_1).unwrap_or(""));
            let (Some(_), Some(mid_price), Some(_)) = (timestamp, mid_price, bid_price_1) else {
                continue;
            };

            let mut row = [f64::NAN; NUM_FEATURES];
            for (slot, column) in row.iter_mut().zip(FEATURE_COLS) {
                if let Some(value) = coerce_or_missing(record.get(column).unwrap_or("")) {
                    *slot = value;
                }
            }

            rows.push(row);
            target.push(mid_price);
            profit_and_loss.push(
                coerce_or_missing(record.get(col::PROFIT_AND_LOSS).unwrap_or(""))
                    .unwrap_or(f64::NAN),
            );
        }

        if rows.is_empty() {
            return Err(PipelineError::EmptyCorpus(format!(
                "product {product} has no usable rows"
            )));
        }
        Ok(Self {
            product: product.to_string(),
            rows,
            target,
            profit_and_loss,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Leading train rows end at exactly `floor(0.8 * n)`.
    pub fn split_point(&self) -> usize {
        self.rows.len() * 8 / 10
    }

    /// Order-preserving train/eval split. `train ++ eval` reconstructs the
    /// frame exactly.
    pub fn split(&self) -> (Segment<'_>, Segment<'_>) {
        let at = self.split_point();
        let (train_rows, eval_rows) = self.rows.split_at(at);
        let (train_target, eval_target) = self.target.split_at(at);
        (
            Segment {
                rows: train_rows,
                target: train_target,
            },
            Segment {
                rows: eval_rows,
                target: eval_target,
            },
        )
    }
}

/// Observational sink receiving `(timestamp, actual)` pairs for display.
/// Nothing in the pipeline consumes its output.
pub trait PlotSink {
    fn observe(&mut self, timestamp: f64, actual: f64);

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

pub struct NullPlotSink;

impl PlotSink for NullPlotSink {
    fn observe(&mut self, _timestamp: f64, _actual: f64) {}
}

/// Writes observed pairs to a CSV for external charting.
pub struct CsvPlotSink {
    writer: csv::Writer<File>,
}

impl CsvPlotSink {
    pub fn create(path: &Path) -> Result<Self> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["timestamp", TARGET])?;
        Ok(Self { writer })
    }
}

impl PlotSink for CsvPlotSink {
    fn observe(&mut self, timestamp: f64, actual: f64) {
        let _ = self
            .writer
            .write_record([timestamp.to_string(), actual.to_string()]);
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Fit metrics for one product, serializable for the CLI report stream.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ProductReport {
    pub product: String,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    pub mse: f64,
    pub r2: f64,
    pub train_rows: usize,
    pub eval_rows: usize,
}

/// Fit the training segment, evaluate on the held-out segment and stream the
/// eval `(timestamp, actual)` pairs to `sink`. Reports metrics back without
/// interpreting them.
pub fn fit_product(frame: &FeatureFrame, sink: &mut dyn PlotSink) -> Result<ProductReport> {
    let (train, eval) = frame.split();
    if train.rows.is_empty() || eval.rows.is_empty() {
        return Err(PipelineError::EmptyCorpus(format!(
            "product {} has too few rows ({}) for a train/eval split",
            frame.product,
            frame.len()
        )));
    }

    let model = ols::fit(&frame.product, train.rows, train.target)?;

    let predicted: Vec<f64> = eval.rows.iter().map(|row| model.predict(row)).collect();
    let mse = ols::mean_squared_error(eval.target, &predicted);
    let r2 = ols::r2_score(eval.target, &predicted);

    for (row, actual) in eval.rows.iter().zip(eval.target) {
        sink.observe(row[0], *actual);
    }
    sink.flush()?;

    Ok(ProductReport {
        product: frame.product.clone(),
        intercept: model.intercept,
        coefficients: model.coefficients.to_vec(),
        mse,
        r2,
        train_rows: train.rows.len(),
        eval_rows: eval.rows.len(),
    })
}

#[cfg(test)]
mod tests {
    use csv::StringRecord;

    use super::{coerce_or_missing, fit_product, FeatureFrame, NullPlotSink, PlotSink};
    use crate::error::PipelineError;
    use crate::input::vesta::Vesta;

    #[test]
    fn test_that_coercion_is_missing_not_zero() {
        assert_eq!(coerce_or_missing("2026"), Some(2026.0));
        assert_eq!(coerce_or_missing("2026.5"), Some(2026.5));
        assert_eq!(coerce_or_missing(" -1 "), Some(-1.0));
        assert_eq!(coerce_or_missing(""), None);
        assert_eq!(coerce_or_missing("   "), None);
        assert_eq!(coerce_or_missing("KELP"), None);
    }

    fn frame_of(n: usize) -> FeatureFrame {
        FeatureFrame {
            product: "KELP".to_string(),
            rows: (0..n).map(|i| [i as f64; 6]).collect(),
            target: (0..n).map(|i| i as f64).collect(),
            profit_and_loss: vec![0.0; n],
        }
    }

    #[test]
    fn test_that_split_point_is_floor_of_four_fifths() {
        assert_eq!(frame_of(10).split_point(), 8);
        assert_eq!(frame_of(11).split_point(), 8);
        assert_eq!(frame_of(14).split_point(), 11);
        assert_eq!(frame_of(5).split_point(), 4);
        assert_eq!(frame_of(1).split_point(), 0);
    }

    #[test]
    fn test_that_split_preserves_order() {
        let frame = frame_of(11);
        let (train, eval) = frame.split();

        assert_eq!(train.target.len(), 8);
        assert_eq!(eval.target.len(), 3);

        let rejoined: Vec<f64> = train.target.iter().chain(eval.target).copied().collect();
        assert_eq!(rejoined, frame.target);
    }

    #[test]
    fn test_that_rows_missing_required_columns_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let table = {
            let path = dir.path().join("aORGANIZED.csv");
            let contents = format!(
                "{}\n{}\n{}\n",
                crate::source::prosperity::COLUMNS.join(","),
                "0,1000,KELP,2025,5,,,,,2027,5,,,,,2026,0",
                // empty bid_price_1: present in the table, absent from the frame
                "0,1100,KELP,,5,,,,,2027,5,,,,,2026,0",
            );
            std::fs::write(&path, contents).unwrap();
            Vesta::from_files(&[path]).unwrap()
        };

        assert_eq!(table.len(), 2);
        let frame = FeatureFrame::extract(&table, "KELP").unwrap();
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.target, vec![2026.0]);
        assert_eq!(frame.rows[0], [1000.0, 0.0, 2025.0, 5.0, 2027.0, 5.0]);
    }

    #[test]
    fn test_that_optional_features_coerce_to_nan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aORGANIZED.csv");
        let contents = format!(
            "{}\n{}\n",
            crate::source::prosperity::COLUMNS.join(","),
            // ask side and profit_and_loss absent
            "0,1000,KELP,2025,5,,,,,,,,,,,2026,",
        );
        std::fs::write(&path, contents).unwrap();

        let table = Vesta::from_files(&[path]).unwrap();
        let frame = FeatureFrame::extract(&table, "KELP").unwrap();

        assert_eq!(frame.len(), 1);
        assert!(frame.rows[0][4].is_nan());
        assert!(frame.rows[0][5].is_nan());
        assert!(frame.profit_and_loss[0].is_nan());
    }

    #[test]
    fn test_that_unknown_product_is_an_empty_corpus() {
        let table = Vesta::random(1, 10, vec!["KELP"]);
        let err = FeatureFrame::extract(&table, "RESIN").unwrap_err();
        assert!(matches!(err, PipelineError::EmptyCorpus(_)));
    }

    #[test]
    fn test_that_fit_reports_eval_pairs_to_the_sink() {
        struct Recorder(Vec<(f64, f64)>);
        impl PlotSink for Recorder {
            fn observe(&mut self, timestamp: f64, actual: f64) {
                self.0.push((timestamp, actual));
            }
        }

        let mut table = Vesta::random(2, 50, vec!["KELP"]);
        table.sort();
        let frame = FeatureFrame::extract(&table, "KELP").unwrap();

        let mut sink = Recorder(Vec::new());
        let report = fit_product(&frame, &mut sink).unwrap();

        assert_eq!(report.train_rows, 80);
        assert_eq!(report.eval_rows, 20);
        assert_eq!(sink.0.len(), 20);
        let (first_ts, first_actual) = sink.0[0];
        assert_eq!(first_ts, frame.rows[80][0]);
        assert_eq!(first_actual, frame.target[80]);
    }

    #[test]
    fn test_that_frames_with_missing_features_fail_the_fit() {
        let mut frame = frame_of(20);
        // absent ask level: survives extraction as NaN, rejected by the
        // collaborator
        frame.rows[3][4] = f64::NAN;

        let err = fit_product(&frame, &mut NullPlotSink).unwrap_err();
        assert!(matches!(err, PipelineError::Regression { .. }));
    }

    #[test]
    fn test_that_tiny_frames_cannot_be_split() {
        let frame = frame_of(1);
        let err = fit_product(&frame, &mut NullPlotSink).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyCorpus(_)));
    }
}
