//! Ordinary least squares, consumed by the pipeline as a black box: fit on a
//! feature matrix and target vector, predict on held-out rows. Solved by SVD
//! on an intercept-augmented design matrix so collinear feature columns still
//! give a least-squares solution.

use nalgebra::{DMatrix, DVector};

use crate::error::{PipelineError, Result};
use crate::model::NUM_FEATURES;

const SVD_EPS: f64 = 1e-10;

#[derive(Clone, Debug)]
pub struct OlsModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl OlsModel {
    pub fn predict(&self, features: &[f64; NUM_FEATURES]) -> f64 {
        let mut value = self.intercept;
        for (coefficient, feature) in self.coefficients.iter().zip(features) {
            value += coefficient * feature;
        }
        value
    }
}

/// Fit `target ~ 1 + rows` by least squares. `product` only labels the error
/// when the solver fails.
pub fn fit(product: &str, rows: &[[f64; NUM_FEATURES]], target: &[f64]) -> Result<OlsModel> {
    if rows.is_empty() {
        return Err(PipelineError::EmptyCorpus(format!(
            "product {product} has no training rows"
        )));
    }

    // NaN or infinity in the design matrix stops the SVD iteration from ever
    // converging, so non-finite input is rejected up front
    for (i, row) in rows.iter().enumerate() {
        if row.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::Regression {
                product: product.to_string(),
                reason: format!("non-finite feature in training row {i}"),
            });
        }
    }
    if let Some(i) = target.iter().position(|v| !v.is_finite()) {
        return Err(PipelineError::Regression {
            product: product.to_string(),
            reason: format!("non-finite target in training row {i}"),
        });
    }

    let design = DMatrix::from_fn(rows.len(), NUM_FEATURES + 1, |r, c| {
        if c == 0 {
            1.0
        } else {
            rows[r][c - 1]
        }
    });
    let y = DVector::from_column_slice(target);

    let beta = design
        .svd(true, true)
        .solve(&y, SVD_EPS)
        .map_err(|reason| PipelineError::Regression {
            product: product.to_string(),
            reason: reason.to_string(),
        })?;

    Ok(OlsModel {
        intercept: beta[0],
        coefficients: beta.iter().skip(1).copied().collect(),
    })
}

pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return f64::NAN;
    }
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p) * (a - p))
        .sum();
    sum / actual.len() as f64
}

/// Coefficient of determination. A constant evaluation target scores 1.0 only
/// for a perfect fit, 0.0 otherwise.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return f64::NAN;
    }
    let mean: f64 = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean) * (a - mean)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p) * (a - p))
        .sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}
