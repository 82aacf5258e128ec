//! Sources are external raw data formats that are reshaped into normalized files consumed by
//! Inputs. Each Source has its own internal format; normalization is a pure reshape that must not
//! mutate field values so that downstream stages own all type coercion.
pub mod prosperity;
