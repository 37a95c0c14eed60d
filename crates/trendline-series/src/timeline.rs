//! Time label resolution.
//!
//! Phase boundaries carry human-authored labels ("2021", "Q3 2022",
//! "第3季", "Season 4", "Act II"...). Charts need a strictly increasing numeric
//! x-axis, so every label is mapped onto a millisecond timestamp by the first
//! rule that matches:
//!
//! | rule | example          | timestamp                                  |
//! |------|------------------|--------------------------------------------|
//! | a    | `2021`           | Jan 1 2021                                 |
//! | b    | `2022 Q3`        | Jul 1 2022                                 |
//! | c    | `mid-2019 boom`  | Jan 1 2019                                 |
//! | d    | `第3季`          | Jan 1 of year `10000 + 3`                  |
//! | e    | `Season 4`       | Jan 1 of year `20000 + 4`                  |
//! | f    | `Act 7b`         | Jan 1 of year `30000 + 7`                  |
//! | g    | `dawn`           | epoch + `boundary_index` days              |
//!
//! The synthetic years for (d)–(f) are opaque sort keys, not dates: the bases
//! only keep the label families from colliding with each other or with real
//! calendar years. [`Timeline`] then enforces strict monotonicity.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

/// One synthetic day, in milliseconds.
pub const DAY_MS: i64 = 86_400_000;

pub const LOCALIZED_ORDINAL_BASE_YEAR: i32 = 10_000;
pub const ENGLISH_ORDINAL_BASE_YEAR: i32 = 20_000;
pub const EMBEDDED_INTEGER_BASE_YEAR: i32 = 30_000;

/// Ordinals are folded into `[0, ORDINAL_SPAN)` so the synthetic ranges stay disjoint.
const ORDINAL_SPAN: u64 = 10_000;

static PLAIN_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}$").expect("plain year regex"));

static YEAR_THEN_QUARTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9]{4})\s*年?\s*[-/,]?\s*Q\s*([1-4])").expect("year-quarter regex")
});

static QUARTER_THEN_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Q\s*([1-4])\s*[-/,]?\s*(?:of\s+)?([0-9]{4})").expect("quarter-year regex")
});

static YEAR_LOCALIZED_QUARTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{4})\s*年?\s*第?\s*([1-4一二三四])\s*季度").expect("localized quarter regex")
});

static EMBEDDED_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^0-9])([0-9]{4})(?:[^0-9]|$)").expect("embedded year regex"));

static LOCALIZED_ORDINAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"第\s*([0-9零〇一二两三四五六七八九十百千]+)\s*(?:阶段|季|期|集|章|部|回|轮|代|届|话|卷|篇|幕|场)",
    )
    .expect("localized ordinal regex")
});

static ENGLISH_ORDINAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:season|episode|ep|stage|phase|chapter|part|round|volume|vol|book|act|generation|gen|wave|level|term)\.?\s*#?\s*([0-9]+)",
    )
    .expect("english ordinal regex")
});

static EMBEDDED_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("embedded integer regex"));

/// Which resolution rule produced a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Year,
    Quarter,
    EmbeddedYear,
    LocalizedOrdinal,
    EnglishOrdinal,
    EmbeddedInteger,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLabel {
    pub timestamp: i64,
    pub kind: LabelKind,
}

/// Resolve one boundary label. `boundary_index` only matters for the fallback.
pub fn resolve_label(label: &str, boundary_index: usize) -> ResolvedLabel {
    let label = label.trim();

    let resolved = plain_year(label)
        .map(|ts| (ts, LabelKind::Year))
        .or_else(|| quarter(label).map(|ts| (ts, LabelKind::Quarter)))
        .or_else(|| embedded_year(label).map(|ts| (ts, LabelKind::EmbeddedYear)))
        .or_else(|| {
            synthetic(&LOCALIZED_ORDINAL, label, LOCALIZED_ORDINAL_BASE_YEAR, parse_localized_number)
                .map(|ts| (ts, LabelKind::LocalizedOrdinal))
        })
        .or_else(|| {
            synthetic(&ENGLISH_ORDINAL, label, ENGLISH_ORDINAL_BASE_YEAR, parse_ascii_number)
                .map(|ts| (ts, LabelKind::EnglishOrdinal))
        })
        .or_else(|| embedded_integer(label).map(|ts| (ts, LabelKind::EmbeddedInteger)));

    match resolved {
        Some((timestamp, kind)) => ResolvedLabel { timestamp, kind },
        None => ResolvedLabel {
            timestamp: fallback_timestamp(boundary_index),
            kind: LabelKind::Fallback,
        },
    }
}

/// Strictly increasing timestamp sequence.
///
/// Any timestamp that does not exceed the previously emitted one is pushed to
/// `previous + DAY_MS`.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    last: Option<i64>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, timestamp: i64) -> i64 {
        let next = match self.last {
            Some(prev) if timestamp <= prev => prev.saturating_add(DAY_MS),
            _ => timestamp,
        };
        self.last = Some(next);
        next
    }
}

// ============================================================================
// Rules
// ============================================================================

fn plain_year(label: &str) -> Option<i64> {
    if !PLAIN_YEAR.is_match(label) {
        return None;
    }
    year_start(label.parse().ok()?)
}

fn quarter(label: &str) -> Option<i64> {
    let year_then_quarter = || {
        let cap = YEAR_THEN_QUARTER.captures(label)?;
        quarter_start(cap[1].parse().ok()?, cap[2].parse().ok()?)
    };
    let quarter_then_year = || {
        let cap = QUARTER_THEN_YEAR.captures(label)?;
        quarter_start(cap[2].parse().ok()?, cap[1].parse().ok()?)
    };
    let localized = || {
        let cap = YEAR_LOCALIZED_QUARTER.captures(label)?;
        let q = parse_localized_number(&cap[2])?;
        quarter_start(cap[1].parse().ok()?, u32::try_from(q).ok()?)
    };
    year_then_quarter()
        .or_else(quarter_then_year)
        .or_else(localized)
}

fn embedded_year(label: &str) -> Option<i64> {
    let cap = EMBEDDED_YEAR.captures(label)?;
    year_start(cap[1].parse().ok()?)
}

fn synthetic(
    re: &Regex,
    label: &str,
    base_year: i32,
    parse: fn(&str) -> Option<u64>,
) -> Option<i64> {
    let cap = re.captures(label)?;
    let n = parse(&cap[1])?;
    synthetic_year(base_year, n)
}

fn embedded_integer(label: &str) -> Option<i64> {
    let m = EMBEDDED_INTEGER.find(label)?;
    let n = parse_ascii_number(m.as_str())?;
    synthetic_year(EMBEDDED_INTEGER_BASE_YEAR, n)
}

fn fallback_timestamp(boundary_index: usize) -> i64 {
    i64::try_from(boundary_index)
        .unwrap_or(i64::MAX / DAY_MS)
        .saturating_mul(DAY_MS)
}

fn synthetic_year(base_year: i32, n: u64) -> Option<i64> {
    let offset = i32::try_from(n % ORDINAL_SPAN).ok()?;
    year_start(base_year + offset)
}

fn year_start(year: i32) -> Option<i64> {
    day_start(year, 1)
}

fn quarter_start(year: i32, quarter: u32) -> Option<i64> {
    if !(1..=4).contains(&quarter) {
        return None;
    }
    day_start(year, (quarter - 1) * 3 + 1)
}

fn day_start(year: i32, month: u32) -> Option<i64> {
    let date = NaiveDate::from_ymd_opt(year, month, 1)?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis())
}

// ============================================================================
// Numbers
// ============================================================================

/// Parse a run of ASCII digits. Runs longer than `u64` can hold keep only
/// their trailing digits; anything other than `0-9` is rejected.
fn parse_ascii_number(s: &str) -> Option<u64> {
    const MAX_DIGITS: usize = 18;
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // All bytes are ASCII here, so any byte offset is a char boundary.
    s[s.len().saturating_sub(MAX_DIGITS)..].parse().ok()
}

/// Arabic digits or Chinese numerals (一, 十二, 二十三, 一百零五, 两千...).
fn parse_localized_number(s: &str) -> Option<u64> {
    if s.chars().all(|c| c.is_ascii_digit()) {
        return parse_ascii_number(s);
    }

    let mut total: u64 = 0;
    let mut current: u64 = 0;
    for ch in s.chars() {
        let digit = match ch {
            '零' | '〇' => Some(0),
            '一' => Some(1),
            '二' | '两' => Some(2),
            '三' => Some(3),
            '四' => Some(4),
            '五' => Some(5),
            '六' => Some(6),
            '七' => Some(7),
            '八' => Some(8),
            '九' => Some(9),
            _ => None,
        };
        if let Some(d) = digit {
            current = d;
            continue;
        }
        let unit = match ch {
            '十' => 10,
            '百' => 100,
            '千' => 1000,
            _ => return None,
        };
        let multiplier = if current == 0 { 1 } else { current };
        total = total.saturating_add(multiplier.saturating_mul(unit));
        current = 0;
    }
    Some(total.saturating_add(current))
}
