//! Core domain types and logic.

pub mod statement;
pub mod format;
pub mod pivot;
pub mod ratios;
pub mod comparison;
pub mod quote;
pub mod provider;
pub mod macro_series;
pub mod news;
pub mod config_validation;
pub mod error;
