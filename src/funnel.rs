//! Funnel presentation
//!
//! Pure transformations from raw stage counts into view-ready funnels:
//! per-stage percentage of the first stage, drop-off rates between
//! consecutive stages, and the biggest drop. No I/O, deterministic for
//! a given input.

use serde::{Deserialize, Serialize};

/// Raw stage data as delivered by the analytics service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCount {
    pub name: String,
    pub user_count: u64,
}

/// A stage with its percentage of the first-stage baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelStage {
    pub name: String,
    pub user_count: u64,
    pub percentage_of_first_stage: f64,
}

/// Loss between two consecutive stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropoffPoint {
    pub from_stage: String,
    pub to_stage: String,
    pub dropoff_rate_percent: f64,
}

/// View-ready funnel: ordered stages plus derived drop-off points
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Funnel {
    pub stages: Vec<FunnelStage>,
    pub dropoff_points: Vec<DropoffPoint>,
}

impl Funnel {
    /// The drop-off point with the highest rate
    ///
    /// Ties go to the earliest stage pair, so the result is stable
    /// regardless of how the input was assembled.
    pub fn biggest_drop(&self) -> Option<&DropoffPoint> {
        let mut biggest: Option<&DropoffPoint> = None;
        for point in &self.dropoff_points {
            match biggest {
                Some(current) if point.dropoff_rate_percent <= current.dropoff_rate_percent => {}
                _ => biggest = Some(point),
            }
        }
        biggest
    }
}

/// Derive a view-ready funnel from ordered stage counts
///
/// The first stage is the 100% baseline; if it has zero users every
/// percentage is 0 rather than NaN. Drop-off between stages with a
/// zero-count predecessor is likewise 0.
pub fn compute_funnel(stage_counts: &[StageCount]) -> Funnel {
    let first_count = stage_counts.first().map_or(0, |s| s.user_count);

    let stages: Vec<FunnelStage> = stage_counts
        .iter()
        .map(|stage| FunnelStage {
            name: stage.name.clone(),
            user_count: stage.user_count,
            percentage_of_first_stage: if first_count == 0 {
                0.0
            } else {
                stage.user_count as f64 / first_count as f64 * 100.0
            },
        })
        .collect();

    let dropoff_points = stage_counts
        .windows(2)
        .map(|pair| DropoffPoint {
            from_stage: pair[0].name.clone(),
            to_stage: pair[1].name.clone(),
            dropoff_rate_percent: dropoff_rate(pair[0].user_count, pair[1].user_count),
        })
        .collect();

    Funnel {
        stages,
        dropoff_points,
    }
}

fn dropoff_rate(current: u64, next: u64) -> f64 {
    if current == 0 {
        return 0.0;
    }
    (1.0 - next as f64 / current as f64) * 100.0
}
