//! Short-term trend classification for forecast series
//!
//! A forecast series is reduced to one sample per calendar day (the sample
//! nearest local noon), the days after today form the comparison window, and
//! the last value of that window is compared with the current reading.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::ForecastSample;

/// Tunable constants of the classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendParams {
    /// Maximum number of future days considered
    pub window_days: usize,
    /// Fraction of `|current|` below which a change counts as stable
    pub relative_threshold: f64,
    /// Lower bound of the stability threshold, in measurement units
    pub minimum_threshold: f64,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            window_days: 5,
            relative_threshold: 0.05,
            minimum_threshold: 10.0,
        }
    }
}

impl TrendParams {
    #[must_use]
    pub fn threshold_for(&self, current: f64) -> f64 {
        (current.abs() * self.relative_threshold).max(self.minimum_threshold)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendKind {
    Stable,
    Increasing,
    Decreasing,
}

impl std::fmt::Display for TrendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendKind::Stable => write!(f, "stable"),
            TrendKind::Increasing => write!(f, "increasing"),
            TrendKind::Decreasing => write!(f, "decreasing"),
        }
    }
}

/// Outcome of a classification. Never stored; recompute from current inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub kind: TrendKind,
    /// `last window value - current value`
    pub change: f64,
    /// `change / |current| * 100`, or 0 when current is 0
    pub percent_change: f64,
    /// Whole calendar days between the first and last window day
    pub day_span: i64,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
}

impl Trend {
    #[must_use]
    pub fn arrow(&self) -> &'static str {
        match self.kind {
            TrendKind::Stable => "→",
            TrendKind::Increasing => "↗",
            TrendKind::Decreasing => "↘",
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} ({:+.1}, {:+.1}%) over {} day{}",
            self.arrow(),
            self.kind,
            self.change,
            self.percent_change,
            self.day_span,
            if self.day_span == 1 { "" } else { "s" }
        )
    }
}

/// One representative sample for a calendar day
#[derive(Debug, Clone, PartialEq)]
pub struct DailySample {
    pub date: NaiveDate,
    pub timestamp: NaiveDateTime,
    pub value: f64,
    pub confidence: Option<f64>,
}

/// Calendar-day difference, ignoring any time of day
#[must_use]
pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

fn seconds_from_noon(timestamp: NaiveDateTime) -> i64 {
    (timestamp.time() - NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN))
        .num_seconds()
        .abs()
}

/// Keep one sample per calendar day, the one closest to 12:00.
///
/// When two samples are equally close to noon, the later one in input order
/// replaces the earlier. The result is ascending by date.
#[must_use]
pub fn reduce_daily(samples: &[ForecastSample]) -> Vec<DailySample> {
    let mut by_day: BTreeMap<NaiveDate, &ForecastSample> = BTreeMap::new();

    for sample in samples {
        let date = sample.timestamp.date();
        let replaces = by_day.get(&date).is_none_or(|kept| {
            seconds_from_noon(sample.timestamp) <= seconds_from_noon(kept.timestamp)
        });
        if replaces {
            by_day.insert(date, sample);
        }
    }

    by_day
        .into_iter()
        .map(|(date, sample)| DailySample {
            date,
            timestamp: sample.timestamp,
            value: sample.value,
            confidence: sample.confidence,
        })
        .collect()
}

/// Classify the short-term trend of `samples` relative to `current`.
///
/// Returns `None` when there is no current value, fewer than two samples, or
/// fewer than two days after `today` to compare.
#[must_use]
pub fn classify(
    samples: &[ForecastSample],
    current: Option<f64>,
    today: NaiveDate,
    params: &TrendParams,
) -> Option<Trend> {
    let current = current.filter(|value| value.is_finite())?;
    if samples.len() < 2 {
        return None;
    }

    let daily = reduce_daily(samples);
    if daily.len() < 2 {
        return None;
    }

    let window: Vec<&DailySample> = daily
        .iter()
        .filter(|day| day.date > today)
        .take(params.window_days)
        .collect();
    if window.len() < 2 || window.iter().any(|day| !day.value.is_finite()) {
        return None;
    }

    let first = window.first()?;
    let last = window.last()?;

    let change = last.value - current;
    let percent_change = if current == 0.0 {
        0.0
    } else {
        change / current.abs() * 100.0
    };

    let kind = if change.abs() < params.threshold_for(current) {
        TrendKind::Stable
    } else if change > 0.0 {
        TrendKind::Increasing
    } else {
        TrendKind::Decreasing
    };

    Some(Trend {
        kind,
        change,
        percent_change,
        day_span: days_between(first.date, last.date),
        window_start: first.date,
        window_end: last.date,
    })
}

/// [`classify`] with today taken from the local clock
#[must_use]
pub fn classify_now(
    samples: &[ForecastSample],
    current: Option<f64>,
    params: &TrendParams,
) -> Option<Trend> {
    classify(samples, current, Local::now().date_naive(), params)
}
