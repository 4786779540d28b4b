//! Path deviation analysis
//!
//! Scores how far a trace strays from the straight chord joining its first
//! and last points. Two families of measures are produced:
//!
//! - area based: signed trapezoidal area under the literal `y(x)` path
//!   against the area under the chord, and their normalized discrepancy
//! - perpendicular: the chord is resampled at a fixed resolution, each sample
//!   is matched to its nearest point on the actual path, and the distances
//!   are integrated along the chord and divided by its length
//!
//! The perpendicular measure is an average lateral offset in pixels and does
//! not grow with path length.

use crate::config::AnalysisConfig;
use crate::error::ComputeError;
use crate::metrics::mean;
use crate::trace::{Trace, TraceMap};
use crate::types::{Point, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Deviation scores for one trace
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviationRecord {
    /// Signed area under the real path
    pub auc: f64,
    /// Area under the straight chord
    pub auc_optimal: f64,
    /// `|auc - auc_optimal| / (|auc_optimal| + epsilon)`
    pub auc_ratio: f64,
    /// Mean perpendicular distance from chord to path
    pub auc_perp: f64,
}

/// Per-session reduction of deviation records
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AucRatioMetrics {
    pub mean_ratio: f64,
    pub max_ratio: f64,
    pub min_ratio: f64,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    pub mean_perp: f64,
}

/// Mean absolute deviation of `y` from its mean
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MadRecord {
    pub mad: f64,
    pub mad_max: f64,
}

/// Trapezoidal integral of `y` over `x` in the given order
pub fn trapezoid(y: &[f64], x: &[f64]) -> f64 {
    y.windows(2)
        .zip(x.windows(2))
        .map(|(ys, xs)| 0.5 * (ys[0] + ys[1]) * (xs[1] - xs[0]))
        .sum()
}

/// `n` evenly spaced values from `start` to `end` inclusive
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Distance from `p` to segment `ab`, projection clamped to the segment
pub fn point_to_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let (abx, aby) = (b.x - a.x, b.y - a.y);
    let length_sq = abx * abx + aby * aby;
    if length_sq == 0.0 {
        return p.distance_to(&a);
    }
    let t = (((p.x - a.x) * abx + (p.y - a.y) * aby) / length_sq).clamp(0.0, 1.0);
    p.distance_to(&Point::new(a.x + t * abx, a.y + t * aby))
}

/// Computes deviation records with fixed resolution and epsilon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviationAnalyzer {
    resolution: usize,
    epsilon: f64,
}

impl Default for DeviationAnalyzer {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl DeviationAnalyzer {
    pub fn new(resolution: usize, epsilon: f64) -> Self {
        Self {
            resolution,
            epsilon,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.perpendicular_resolution, config.auc_epsilon)
    }

    /// Area under the literal path
    pub fn auc(&self, trace: &Trace) -> f64 {
        let points = trace.points();
        let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
        trapezoid(&ys, &xs)
    }

    /// Area under the chord resampled to the trace's point count
    pub fn auc_optimal(&self, trace: &Trace) -> f64 {
        match (trace.first_point(), trace.last_point()) {
            (Some(first), Some(last)) => {
                let xs = linspace(first.x, last.x, trace.len());
                let ys = linspace(first.y, last.y, trace.len());
                trapezoid(&ys, &xs)
            }
            _ => 0.0,
        }
    }

    pub fn auc_ratio(&self, auc: f64, auc_optimal: f64) -> f64 {
        (auc - auc_optimal).abs() / (auc_optimal.abs() + self.epsilon)
    }

    /// Arc-length-normalized perpendicular deviation
    pub fn auc_perp(&self, trace: &Trace) -> f64 {
        let path = trace.points();
        let (first, last) = match (path.first(), path.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return 0.0,
        };

        let xs = linspace(first.x, last.x, self.resolution);
        let ys = linspace(first.y, last.y, self.resolution);
        let samples: Vec<Point> = xs.iter().zip(&ys).map(|(x, y)| Point::new(*x, *y)).collect();

        let distances: Vec<f64> = samples
            .iter()
            .map(|sample| nearest_distance(*sample, &path))
            .collect();

        let mut arc = Vec::with_capacity(samples.len());
        let mut travelled = 0.0;
        for (idx, sample) in samples.iter().enumerate() {
            if idx > 0 {
                travelled += samples[idx - 1].distance_to(sample);
            }
            arc.push(travelled);
        }

        let integral = trapezoid(&distances, &arc);
        if travelled > 0.0 {
            integral / travelled
        } else {
            integral
        }
    }

    /// All deviation scores for one trace
    pub fn analyze(&self, trace: &Trace) -> Result<DeviationRecord, ComputeError> {
        if trace.len() < 2 {
            return Err(ComputeError::EmptyTrace(format!(
                "deviation needs at least 2 points, session {} has {}",
                trace.session_id(),
                trace.len()
            )));
        }
        let auc = self.auc(trace);
        let auc_optimal = self.auc_optimal(trace);
        Ok(DeviationRecord {
            auc,
            auc_optimal,
            auc_ratio: self.auc_ratio(auc, auc_optimal),
            auc_perp: self.auc_perp(trace),
        })
    }

    /// Deviation records for every trace, in trace order
    pub fn analyze_all(
        &self,
        traces: &TraceMap,
    ) -> Result<BTreeMap<SessionId, Vec<DeviationRecord>>, ComputeError> {
        traces
            .iter()
            .map(|(session_id, list)| {
                let records = list
                    .iter()
                    .map(|trace| self.analyze(trace))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((session_id.clone(), records))
            })
            .collect()
    }
}

fn nearest_distance(sample: Point, path: &[Point]) -> f64 {
    if path.len() == 1 {
        return sample.distance_to(&path[0]);
    }
    path.windows(2)
        .map(|seg| point_to_segment_distance(sample, seg[0], seg[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Reduce deviation records to per-session ratio and area summaries
pub fn auc_ratio_metrics(
    records: &BTreeMap<SessionId, Vec<DeviationRecord>>,
) -> BTreeMap<SessionId, AucRatioMetrics> {
    records
        .iter()
        .map(|(session_id, list)| {
            if list.is_empty() {
                return (session_id.clone(), AucRatioMetrics::default());
            }
            let ratios: Vec<f64> = list.iter().map(|r| r.auc_ratio).collect();
            let areas: Vec<f64> = list.iter().map(|r| r.auc).collect();
            let perps: Vec<f64> = list.iter().map(|r| r.auc_perp).collect();
            let metrics = AucRatioMetrics {
                mean_ratio: mean(&ratios),
                max_ratio: ratios.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                min_ratio: ratios.iter().copied().fold(f64::INFINITY, f64::min),
                mean: mean(&areas),
                max: areas.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                min: areas.iter().copied().fold(f64::INFINITY, f64::min),
                mean_perp: mean(&perps),
            };
            (session_id.clone(), metrics)
        })
        .collect()
}

/// Mean and maximum absolute deviation of `y` within one trace
pub fn trace_mad(trace: &Trace) -> MadRecord {
    let ys: Vec<f64> = trace.events().iter().map(|e| e.y).collect();
    let centre = mean(&ys);
    let deviations: Vec<f64> = ys.iter().map(|y| (y - centre).abs()).collect();
    MadRecord {
        mad: mean(&deviations),
        mad_max: deviations.iter().copied().fold(0.0, f64::max),
    }
}

/// Per-session average of the trace MAD values
pub fn mad(traces: &TraceMap) -> BTreeMap<SessionId, MadRecord> {
    traces
        .iter()
        .map(|(session_id, list)| {
            let per_trace: Vec<MadRecord> = list.iter().map(trace_mad).collect();
            let mads: Vec<f64> = per_trace.iter().map(|m| m.mad).collect();
            let maxes: Vec<f64> = per_trace.iter().map(|m| m.mad_max).collect();
            (
                session_id.clone(),
                MadRecord {
                    mad: mean(&mads),
                    mad_max: mean(&maxes),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Event, EventType};
    use pretty_assertions::assert_eq;

    fn trace_of(points: &[(f64, f64)]) -> Trace {
        let events = points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| Event::new("S", EventType::MouseMove, i as f64 * 10.0, x, y))
            .collect();
        Trace::new("S", 0, events)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_trapezoid_and_linspace() {
        assert!(approx(trapezoid(&[0.0, 1.0, 2.0], &[0.0, 1.0, 2.0]), 2.0));
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(3.0, 9.0, 1), vec![3.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_point_to_segment_clamps() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!(approx(point_to_segment_distance(Point::new(5.0, 3.0), a, b), 3.0));
        assert!(approx(point_to_segment_distance(Point::new(-3.0, 4.0), a, b), 5.0));
        assert!(approx(point_to_segment_distance(Point::new(1.0, 1.0), a, a), 2f64.sqrt()));
    }

    #[test]
    fn test_straight_dense_trace_has_zero_perp() {
        let points: Vec<(f64, f64)> = (0..=50).map(|i| (i as f64 * 0.2, i as f64 * 0.2)).collect();
        let record = DeviationAnalyzer::default().analyze(&trace_of(&points)).unwrap();
        assert!(record.auc_perp.abs() < 1e-9);
        assert!(approx(record.auc, 50.0));
        assert!(approx(record.auc_optimal, 50.0));
        assert!(record.auc_ratio.abs() < 1e-9);
    }

    #[test]
    fn test_flat_horizontal_trace_has_zero_ratio() {
        // both areas are exactly zero; epsilon keeps the ratio defined
        let record = DeviationAnalyzer::default()
            .analyze(&trace_of(&[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)]))
            .unwrap();
        assert_eq!(record.auc, 0.0);
        assert_eq!(record.auc_optimal, 0.0);
        assert_eq!(record.auc_ratio, 0.0);
        assert_eq!(record.auc_perp, 0.0);
    }

    #[test]
    fn test_detour_scores_positive() {
        let analyzer = DeviationAnalyzer::default();
        let record = analyzer
            .analyze(&trace_of(&[(0.0, 0.0), (5.0, 5.0), (10.0, 0.0)]))
            .unwrap();
        assert!(approx(record.auc, 25.0));
        assert!(approx(record.auc_optimal, 0.0));
        assert!(approx(record.auc_ratio, 25.0 / 1e-6));
        assert!(record.auc_perp > 0.0);
        assert!(record.auc_perp < 5.0);
    }

    #[test]
    fn test_auc_ratio_never_negative() {
        let analyzer = DeviationAnalyzer::default();
        let shapes: [&[(f64, f64)]; 4] = [
            &[(0.0, 0.0), (10.0, -4.0), (20.0, 3.0)],
            &[(10.0, 10.0), (0.0, 20.0), (-5.0, 0.0)],
            &[(0.0, 5.0), (5.0, 5.0)],
            &[(3.0, 3.0), (3.0, 3.0)],
        ];
        for shape in shapes {
            let record = analyzer.analyze(&trace_of(shape)).unwrap();
            assert!(record.auc_ratio >= 0.0);
        }
    }

    #[test]
    fn test_single_point_trace_rejected() {
        match DeviationAnalyzer::default().analyze(&trace_of(&[(1.0, 1.0)])) {
            Err(ComputeError::EmptyTrace(_)) => {}
            other => panic!("expected empty trace error, got {:?}", other),
        }
    }

    #[test]
    fn test_auc_ratio_metrics() {
        let mut records = BTreeMap::new();
        records.insert(
            "S".to_string(),
            vec![
                DeviationRecord {
                    auc: 10.0,
                    auc_optimal: 8.0,
                    auc_ratio: 0.25,
                    auc_perp: 1.0,
                },
                DeviationRecord {
                    auc: -2.0,
                    auc_optimal: -2.0,
                    auc_ratio: 0.0,
                    auc_perp: 3.0,
                },
            ],
        );
        records.insert("empty".to_string(), Vec::new());

        let metrics = auc_ratio_metrics(&records);
        assert_eq!(
            metrics["S"],
            AucRatioMetrics {
                mean_ratio: 0.125,
                max_ratio: 0.25,
                min_ratio: 0.0,
                mean: 4.0,
                max: 10.0,
                min: -2.0,
                mean_perp: 2.0,
            }
        );
        assert_eq!(metrics["empty"], AucRatioMetrics::default());
    }

    #[test]
    fn test_mad() {
        let mut traces = TraceMap::new();
        traces.insert(
            "S".to_string(),
            vec![
                trace_of(&[(0.0, 0.0), (1.0, 4.0)]),
                trace_of(&[(0.0, 1.0), (1.0, 1.0), (2.0, 4.0)]),
            ],
        );
        let out = mad(&traces);
        // trace 1: mean 2, deviations 2,2 -> mad 2, max 2
        // trace 2: mean 2, deviations 1,1,2 -> mad 4/3, max 2
        assert!(approx(out["S"].mad, (2.0 + 4.0 / 3.0) / 2.0));
        assert!(approx(out["S"].mad_max, 2.0));
    }
}
