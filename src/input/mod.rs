//! Inputs wrap around a dataset providing a simple transparent interface that downstream stages
//! build their operations around.
//!
//! Sources should be read through inputs so that model-fitting code never has to touch raw files
//! or marshall vendor formats itself.
pub mod vesta;
