//! Property tests for the phase transformer.
//!
//! 1. Timestamps are strictly increasing for any label mix
//! 2. Subjective values always land in [0, 100]
//! 3. Objective ranges always contain every value
//! 4. One end point per phase, and at most one start point per phase

use proptest::prelude::*;
use trendline_series::*;

// ============================================================================
// Strategies
// ============================================================================

fn label_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        (1900u32..2100).prop_map(|y| y.to_string()),
        (1990u32..2030, 1u32..=4).prop_map(|(y, q)| format!("{y} Q{q}")),
        (1u32..40).prop_map(|n| format!("第{n}季")),
        (1u32..40).prop_map(|n| format!("Season {n}")),
        (1u32..500).prop_map(|n| format!("part-{n}x")),
        Just("dawn".to_string()),
        Just("".to_string()),
        Just("2020".to_string()),
        mixed_digit_label_strategy(),
    ]
}

/// Digit runs mixing ASCII, Arabic-Indic and fullwidth digits.
fn mixed_digit_label_strategy() -> impl Strategy<Value = String> {
    let digits = prop::collection::vec(
        prop::sample::select(vec!['7', '\u{0661}', '\u{06F5}', '\u{FF11}', '\u{FF19}']),
        1..40,
    );
    (prop::sample::select(vec!["", "season ", "Q", "第"]), digits)
        .prop_map(|(prefix, ds)| format!("{prefix}{}", ds.into_iter().collect::<String>()))
}

fn value_strategy() -> impl Strategy<Value = f64> {
    -250.0f64..250.0
}

fn phase_strategy() -> impl Strategy<Value = Phase> {
    (
        label_strategy(),
        label_strategy(),
        value_strategy(),
        value_strategy(),
        value_strategy(),
        value_strategy(),
    )
        .prop_map(|(s, e, o, h, l, c)| Phase::new(&s, &e, o, h, l, c))
}

fn phases_strategy() -> impl Strategy<Value = Vec<Phase>> {
    prop::collection::vec(phase_strategy(), 0..12)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn timestamps_strictly_increase(phases in phases_strategy()) {
        for axis in [AxisDescriptor::default(), AxisDescriptor::objective("m", None)] {
            let points = build_points(&phases, &axis);
            for w in points.windows(2) {
                prop_assert!(w[1].timestamp > w[0].timestamp);
            }
        }
    }

    #[test]
    fn subjective_points_are_bounded(phases in phases_strategy()) {
        let points = build_points(&phases, &AxisDescriptor::default());
        for p in &points {
            prop_assert!((0.0..=100.0).contains(&p.value));
        }
    }

    #[test]
    fn objective_range_contains_all_values(phases in phases_strategy()) {
        prop_assume!(!phases.is_empty());
        let axis = AxisDescriptor::objective("m", None);
        let range = axis_range(&phases, &axis);
        for v in phases.iter().flat_map(Phase::values) {
            prop_assert!(range.min <= v && v <= range.max);
        }
    }

    #[test]
    fn point_counts_are_bounded(phases in phases_strategy()) {
        let points = build_points(&phases, &AxisDescriptor::default());
        let ends = points.iter().filter(|p| p.boundary == Boundary::End).count();
        prop_assert_eq!(ends, phases.len());
        prop_assert!(points.len() <= phases.len() * 2);
        if !phases.is_empty() {
            prop_assert_eq!(points[0].boundary, Boundary::Start);
            prop_assert_eq!(points[0].phase_index, 0);
        }
    }
}

#[test]
fn clamping_examples() {
    let phase = Phase::new("2020", "2021", 150.0, 90.0, -20.0, 40.0);
    let clamped = phase.clamped();
    assert_eq!(clamped.open, 100.0);
    assert_eq!(clamped.low, 0.0);

    let objective = clamp_phases(std::slice::from_ref(&phase), &AxisDescriptor::objective("m", None));
    assert_eq!(objective[0].open, 150.0);
}

#[test]
fn dual_axis_chart_ranges_each_series_separately() {
    let payload: GeneratedPayload = serde_json::from_value(serde_json::json!({
        "subject": "Streaming",
        "metric": "Audience momentum",
        "timeframe": "2015-2025",
        "y_axis": { "label": "Momentum", "kind": "subjective" },
        "phases": [
            { "start_label": "2015", "end_label": "2017", "open": 10, "high": 40, "low": 5, "close": 35 },
            { "start_label": "2017", "end_label": "2019", "open": 35, "high": 70, "low": 30, "close": 65 },
            { "start_label": "2019", "end_label": "2021", "open": 65, "high": 120, "low": 60, "close": 90 },
            { "start_label": "2021", "end_label": "2023", "open": 90, "high": 95, "low": 70, "close": 75 },
            { "start_label": "2023", "end_label": "2025", "open": 75, "high": 80, "low": 60, "close": 70, "zone": "projected" }
        ],
        "secondary": {
            "subject": "Cable",
            "metric": "Subscribers",
            "y_axis": { "label": "Subscribers", "unit": "m", "kind": "objective" },
            "phases": [
                { "start_label": "2015", "end_label": "2019", "open": 100, "high": 100, "low": 80, "close": 82 },
                { "start_label": "2019", "end_label": "2025", "open": 82, "high": 82, "low": 50, "close": 52 }
            ]
        }
    }))
    .unwrap();

    let chart = DualAxisChart::from_payload(&payload);
    assert_eq!(chart.primary.range, AxisRange::SUBJECTIVE);
    assert_eq!(chart.primary.points.len(), 6);
    assert_eq!(chart.primary.phases[2].high, 100.0);

    let secondary = chart.secondary.expect("secondary series");
    assert_eq!(secondary.points.len(), 3);
    assert!(secondary.range.min < 50.0);
    assert!(secondary.range.max > 100.0);
}
