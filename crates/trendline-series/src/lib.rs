//! Narrative trend series for Trendline
//!
//! This crate owns the data model a generator produces (a [`GeneratedPayload`]
//! made of ordered [`Phase`]s) and the pure functions that turn it into
//! something a chart can draw:
//!
//! - [`timeline`]: free-form time labels → strictly increasing timestamps
//! - [`chart`]: phases → [`ChartPoint`]s (bridging discontinuities, clamping
//!   subjective values) plus the dual-axis bundle used by renderers
//! - [`range`]: value-axis ranges for subjective and objective axes
//!
//! Everything here is deterministic and side-effect free; points are rebuilt on
//! every render and never persisted.

pub mod chart;
pub mod payload;
pub mod range;
pub mod timeline;

pub use chart::{build_points, clamp_phases, phase_for_point, Boundary, ChartPoint, ChartSeries, DualAxisChart};
pub use payload::{
    AxisDescriptor, AxisKind, GeneratedPayload, Impact, KeyEvent, Phase, SecondarySeries, Zone,
};
pub use range::{axis_range, AxisRange};
pub use timeline::{resolve_label, LabelKind, ResolvedLabel, Timeline, DAY_MS};
