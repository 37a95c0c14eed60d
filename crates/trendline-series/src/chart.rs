//! Phase → chart point transformation.
//!
//! Points are emitted in phase order:
//! - phase 0 always contributes a start point at its `open` value;
//! - later phases contribute a start point only when they do not continue the
//!   previous phase (different boundary label or `close != open`), which
//!   bridges gaps without duplicating continuous joins;
//! - every phase contributes an end point at its `close` value.
//!
//! Each point keeps the index of its owning phase so hover/lookup can find the
//! phase again; the index is a back-reference only.

use crate::payload::{AxisDescriptor, GeneratedPayload, Phase};
use crate::range::{axis_range, AxisRange};
use crate::timeline::{resolve_label, Timeline};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Boundary {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Milliseconds; strictly increasing within one series.
    pub timestamp: i64,
    pub value: f64,
    pub phase_index: usize,
    pub boundary: Boundary,
}

/// Apply axis clamping: subjective axes clamp into `[0, 100]`, objective axes
/// pass values through.
pub fn clamp_phases<'a>(phases: &'a [Phase], axis: &AxisDescriptor) -> Cow<'a, [Phase]> {
    if axis.is_subjective() {
        Cow::Owned(phases.iter().map(Phase::clamped).collect())
    } else {
        Cow::Borrowed(phases)
    }
}

/// Build the point sequence for one series.
pub fn build_points(phases: &[Phase], axis: &AxisDescriptor) -> Vec<ChartPoint> {
    let phases = clamp_phases(phases, axis);
    let mut timeline = Timeline::new();
    let mut points = Vec::with_capacity(phases.len() * 2);

    for (index, phase) in phases.iter().enumerate() {
        let needs_start = match index.checked_sub(1).map(|prev| &phases[prev]) {
            None => true,
            Some(prev) => is_discontinuous(prev, phase),
        };

        if needs_start {
            let resolved = resolve_label(&phase.start_label, index * 2);
            points.push(ChartPoint {
                timestamp: timeline.push(resolved.timestamp),
                value: phase.open,
                phase_index: index,
                boundary: Boundary::Start,
            });
        }

        let resolved = resolve_label(&phase.end_label, index * 2 + 1);
        points.push(ChartPoint {
            timestamp: timeline.push(resolved.timestamp),
            value: phase.close,
            phase_index: index,
            boundary: Boundary::End,
        });
    }

    points
}

fn is_discontinuous(prev: &Phase, next: &Phase) -> bool {
    prev.end_label.trim() != next.start_label.trim() || (prev.close - next.open).abs() > f64::EPSILON
}

/// Look up the phase a point belongs to.
pub fn phase_for_point<'a>(phases: &'a [Phase], point: &ChartPoint) -> Option<&'a Phase> {
    phases.get(point.phase_index)
}

// ============================================================================
// Dual-axis bundle
// ============================================================================

/// One renderable series: clamped phases, their points, and the axis range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub subject: String,
    pub metric: String,
    pub axis: AxisDescriptor,
    pub phases: Vec<Phase>,
    pub points: Vec<ChartPoint>,
    pub range: AxisRange,
}

impl ChartSeries {
    pub fn build(subject: &str, metric: &str, axis: &AxisDescriptor, phases: &[Phase]) -> Self {
        let clamped = clamp_phases(phases, axis).into_owned();
        let points = build_points(&clamped, axis);
        let range = axis_range(&clamped, axis);
        Self {
            subject: subject.to_string(),
            metric: metric.to_string(),
            axis: axis.clone(),
            phases: clamped,
            points,
            range,
        }
    }

    pub fn phase_at(&self, point: &ChartPoint) -> Option<&Phase> {
        phase_for_point(&self.phases, point)
    }
}

/// Primary series plus an optional differently-scaled secondary series.
///
/// Each series is ranged against its own axis descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualAxisChart {
    pub primary: ChartSeries,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<ChartSeries>,
}

impl DualAxisChart {
    pub fn from_payload(payload: &GeneratedPayload) -> Self {
        let primary = ChartSeries::build(
            &payload.subject,
            &payload.metric,
            &payload.y_axis,
            &payload.phases,
        );
        let secondary = payload
            .secondary
            .as_ref()
            .filter(|s| !s.phases.is_empty())
            .map(|s| ChartSeries::build(&s.subject, &s.metric, &s.y_axis, &s.phases));
        Self { primary, secondary }
    }
}
