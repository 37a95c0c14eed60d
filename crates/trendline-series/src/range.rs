//! Value-axis range computation.

use crate::payload::{AxisDescriptor, AxisKind, Phase};
use serde::{Deserialize, Serialize};

/// Fraction of the span added above and below an objective series.
pub const OBJECTIVE_PADDING: f64 = 0.08;
/// Fraction of the magnitude used when every value is identical.
pub const FLAT_PADDING: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    pub const SUBJECTIVE: AxisRange = AxisRange {
        min: 0.0,
        max: 100.0,
    };

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Range for one series on its own axis.
///
/// Subjective axes are always `[0, 100]`. Objective axes use the min/max of
/// every open/high/low/close value, padded by 8% of the span; a flat series is
/// padded by 5% of its magnitude (or by 1 when the value is zero). A series with
/// no finite values falls back to the subjective range.
pub fn axis_range(phases: &[Phase], axis: &AxisDescriptor) -> AxisRange {
    if axis.kind == AxisKind::Subjective {
        return AxisRange::SUBJECTIVE;
    }

    let mut values = phases
        .iter()
        .flat_map(Phase::values)
        .filter(|v| v.is_finite());

    let Some(first) = values.next() else {
        return AxisRange::SUBJECTIVE;
    };
    let (min, max) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));

    let span = max - min;
    if span > 0.0 {
        let pad = span * OBJECTIVE_PADDING;
        return AxisRange {
            min: min - pad,
            max: max + pad,
        };
    }

    let magnitude = min.abs();
    let pad = if magnitude == 0.0 {
        1.0
    } else {
        magnitude * FLAT_PADDING
    };
    AxisRange {
        min: min - pad,
        max: max + pad,
    }
}
