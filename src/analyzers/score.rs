use crate::analyzers::grade::category;
use crate::analyzers::types::{
    AcBreakdown, Factor, FactorMetric, LineAggregate, PriorityResult, ScoringMode, ScoringSummary,
    StopExposure,
};
use crate::analyzers::utility::{mean, min_max_normalize, quantile};
use crate::analyzers::weights::Weights;
use crate::error::Result;
use crate::transit::AcStatus;
use tracing::debug;

/// An entity the priority scorer can rank.
pub trait Scorable {
    const MODE: ScoringMode;

    fn entity_id(&self) -> &str;

    /// Raw, un-normalized value of one of the mode's factors.
    fn raw_metric(&self, factor: Factor) -> f64;
}

impl Scorable for LineAggregate {
    const MODE: ScoringMode = ScoringMode::Line;

    fn entity_id(&self) -> &str {
        &self.line_id
    }

    fn raw_metric(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Temperature => self.mean_temperature,
            Factor::HotStops => self.hot_stop_count as f64,
            Factor::AirConditioning => self.air_conditioning.urgency(),
            Factor::Passengers => self.total_passengers as f64,
            Factor::LackOfShelter => self.stops_without_shelter as f64,
            Factor::LackOfBench => self.stops_without_bench as f64,
        }
    }
}

impl Scorable for StopExposure {
    const MODE: ScoringMode = ScoringMode::Stop;

    fn entity_id(&self) -> &str {
        &self.stop_id
    }

    fn raw_metric(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Temperature => self.temperature,
            Factor::Passengers => self.daily_passengers as f64,
            Factor::LackOfShelter => lack(self.has_shelter),
            Factor::LackOfBench => lack(self.has_bench),
            // Line-only factors; stop mode never scores them.
            Factor::HotStops | Factor::AirConditioning => 0.0,
        }
    }
}

fn lack(present: bool) -> f64 {
    if present { 0.0 } else { 1.0 }
}

/// Scores and ranks a batch of entities.
///
/// Each factor of the entity's mode is min-max normalized across the batch
/// (a factor with one shared value normalizes to 0 for everyone), weighted by
/// the unit-sum weights and scaled to 0–100. Results are sorted by descending
/// score, ties by ascending entity id, and ranked from 1.
///
/// # Errors
///
/// Returns [`crate::HeatError::InvalidConfig`] when the weights are invalid
/// for the mode.
#[tracing::instrument(skip_all, fields(mode = %T::MODE, entities = entities.len()))]
pub fn score<T: Scorable>(entities: &[T], weights: &Weights) -> Result<Vec<PriorityResult>> {
    let weights = weights.normalized_for(T::MODE)?;

    let columns: Vec<(Factor, f64, Vec<f64>, Vec<f64>)> = weights
        .iter()
        .map(|&(factor, weight)| {
            let raw: Vec<f64> = entities.iter().map(|e| e.raw_metric(factor)).collect();
            let normalized = min_max_normalize(&raw);
            (factor, weight, raw, normalized)
        })
        .collect();

    let mut results: Vec<PriorityResult> = entities
        .iter()
        .enumerate()
        .map(|(i, entity)| {
            let metrics: Vec<FactorMetric> = columns
                .iter()
                .map(|(factor, weight, raw, normalized)| FactorMetric {
                    factor: *factor,
                    raw: raw[i],
                    normalized: normalized[i],
                    weight: *weight,
                })
                .collect();
            let weighted: f64 = metrics.iter().map(|m| m.normalized * m.weight).sum();
            let score = (100.0 * weighted).clamp(0.0, 100.0);

            PriorityResult {
                entity_id: entity.entity_id().to_string(),
                mode: T::MODE,
                score,
                rank: 0,
                category: category(score),
                metrics,
            }
        })
        .collect();

    rank(&mut results);
    debug!(ranked = results.len(), "Priority scores computed");
    Ok(results)
}

/// Sorts by descending score then ascending entity id and assigns 1-based ranks.
pub fn rank(results: &mut [PriorityResult]) {
    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });
    for (i, r) in results.iter_mut().enumerate() {
        r.rank = i + 1;
    }
}

/// Summarizes a ranked batch. Pass the line aggregates in line mode to
/// include the air-conditioning breakdown.
pub fn summarize(
    mode: ScoringMode,
    results: &[PriorityResult],
    aggregates: Option<&[LineAggregate]>,
) -> ScoringSummary {
    let mut scores: Vec<f64> = results.iter().map(|r| r.score).collect();
    scores.sort_by(f64::total_cmp);

    let air_conditioning = aggregates.map(|aggs| {
        let mut breakdown = AcBreakdown::default();
        for agg in aggs {
            match agg.air_conditioning {
                AcStatus::None => breakdown.none += 1,
                AcStatus::Partial => breakdown.partial += 1,
                AcStatus::Full => breakdown.full += 1,
                AcStatus::Unknown => breakdown.unknown += 1,
            }
        }
        breakdown
    });

    ScoringSummary {
        mode,
        entities: scores.len(),
        mean_score: mean(&scores),
        median_score: quantile(&scores, 0.5).unwrap_or(0.0),
        min_score: scores.first().copied().unwrap_or(0.0),
        max_score: scores.last().copied().unwrap_or(0.0),
        air_conditioning,
    }
}
