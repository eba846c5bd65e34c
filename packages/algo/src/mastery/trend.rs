//! Outcome history analysis
//!
//! Windowed success rates over the bounded per-topic outcome history, the
//! improvement trend derived from them, and the block-based consistency
//! score consumed by weakness detection.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::TrendParams;
use crate::sanitize::{clamp_unit, std_dev};
use crate::types::ImprovementTrend;

/// One retained attempt outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeSample {
    pub correct: bool,
    pub difficulty: u8,
}

/// Harder problems count more towards the windowed rate.
fn difficulty_weight(difficulty: u8) -> f64 {
    0.5 + difficulty as f64 / 5.0
}

fn weighted_rate<'a>(samples: impl Iterator<Item = &'a OutcomeSample>) -> Option<f64> {
    let (hit, total) = samples.fold((0.0, 0.0), |(hit, total), s| {
        let w = difficulty_weight(s.difficulty);
        (if s.correct { hit + w } else { hit }, total + w)
    });
    (total > 0.0).then(|| hit / total)
}

/// Append an outcome, evicting the oldest once `capacity` is reached.
pub fn push_outcome(history: &mut VecDeque<OutcomeSample>, sample: OutcomeSample, capacity: usize) {
    history.push_back(sample);
    while history.len() > capacity.max(1) {
        history.pop_front();
    }
}

/// Plain success rate over the last `window` outcomes, 0 when empty.
pub fn recent_rate(history: &VecDeque<OutcomeSample>, window: usize) -> f64 {
    let skip = history.len().saturating_sub(window);
    let recent: Vec<_> = history.iter().skip(skip).collect();
    if recent.is_empty() {
        return 0.0;
    }
    recent.iter().filter(|s| s.correct).count() as f64 / recent.len() as f64
}

/// Number of samples inside the recent window.
pub fn recent_len(history: &VecDeque<OutcomeSample>, window: usize) -> usize {
    history.len().min(window)
}

/// Compare the latest window with the one before it.
///
/// With fewer than `min_baseline_samples` in the earlier window the trend
/// falls back to the batch's mastery delta.
pub fn classify_trend(
    history: &VecDeque<OutcomeSample>,
    mastery_before: f64,
    mastery_after: f64,
    params: &TrendParams,
) -> ImprovementTrend {
    let n = history.len();
    let recent_start = n.saturating_sub(params.window_size);
    let baseline_start = recent_start.saturating_sub(params.window_size);
    let baseline_len = recent_start - baseline_start;

    if baseline_len < params.min_baseline_samples {
        let delta = mastery_after - mastery_before;
        return if delta > params.mastery_delta_threshold {
            ImprovementTrend::Improving
        } else if delta < -params.mastery_delta_threshold {
            ImprovementTrend::Declining
        } else {
            ImprovementTrend::Stable
        };
    }

    let baseline = weighted_rate(history.iter().skip(baseline_start).take(baseline_len));
    let recent = weighted_rate(history.iter().skip(recent_start));
    match (baseline, recent) {
        (Some(b), Some(r)) if r - b > params.improving_threshold => ImprovementTrend::Improving,
        (Some(b), Some(r)) if r - b < params.declining_threshold => ImprovementTrend::Declining,
        _ => ImprovementTrend::Stable,
    }
}

/// Stability of performance across the history, 1 = perfectly steady.
///
/// The most recent full blocks of `block_size` outcomes are scored by their
/// success rates; σ of those rates is normalised against 0.5, the largest
/// spread a set of rates in `[0, 1]` can have. Histories with fewer than two
/// full blocks fall back to a fixed value per trend.
pub fn consistency_score(
    history: &VecDeque<OutcomeSample>,
    trend: ImprovementTrend,
    block_size: usize,
) -> f64 {
    let block_size = block_size.max(1);
    let skip = history.len() % block_size;
    let samples: Vec<&OutcomeSample> = history.iter().skip(skip).collect();
    let rates: Vec<f64> = samples
        .chunks(block_size)
        .map(|block| block.iter().filter(|s| s.correct).count() as f64 / block.len() as f64)
        .collect();

    if rates.len() < 2 {
        return match trend {
            ImprovementTrend::Improving => 0.8,
            ImprovementTrend::Stable => 0.6,
            ImprovementTrend::Declining => 0.3,
        };
    }
    clamp_unit(1.0 - (std_dev(&rates) / 0.5).min(1.0))
}
