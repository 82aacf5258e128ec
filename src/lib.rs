//! Salvinia turns raw semicolon-delimited tick dumps from a trading
//! competition venue into a clean, typed, time-ordered feature table and fits
//! a linear regression per product predicting mid-price from top-of-book
//! features.
//!
//! The pipeline is four sequential, stateless transforms: normalize each raw
//! file ([`source::prosperity`]), merge and sort the corpus
//! ([`input::vesta`]), extract per-product features ([`model`]), then hand
//! matrices to the regression collaborator ([`model::ols`]). Every stage is a
//! pure function from one immutable input to one immutable output.
pub mod error;
pub mod input;
pub mod model;
pub mod pipeline;
pub mod source;
