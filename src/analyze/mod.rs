// src/analyze/mod.rs
//! Record prioritization.

pub mod scoring;

pub use crate::analyze::scoring::{ScoreFactor, Scorer};
