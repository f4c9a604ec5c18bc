use crate::analyzers::types::PriorityCategory;

/// Converts a priority score (0–100) into an urgency band.
///
/// | Range       | Category |
/// |-------------|----------|
/// | > 75        | Critical |
/// | > 50        | High     |
/// | > 25        | Medium   |
/// | <= 25       | Low      |
pub fn category(score: f64) -> PriorityCategory {
    match score {
        s if s > 75.0 => PriorityCategory::Critical,
        s if s > 50.0 => PriorityCategory::High,
        s if s > 25.0 => PriorityCategory::Medium,
        _ => PriorityCategory::Low,
    }
}
