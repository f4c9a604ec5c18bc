//! Line aggregation and priority scoring.
//!
//! This module groups hot-zone stops by line, normalizes the per-entity
//! metrics, combines them with configurable weights into a 0–100 priority
//! score, and ranks the result.

pub mod aggregate;
pub mod grade;
pub mod score;
pub mod types;
pub mod utility;
pub mod weights;
