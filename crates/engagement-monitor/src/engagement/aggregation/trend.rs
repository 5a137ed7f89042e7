use super::super::domain::{EmployeeId, EngagementScore};
use super::super::scoring::round_half_up;
use super::views::{TrendGranularity, TrendPoint};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;

/// One score observation feeding a trend series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreSample {
    pub employee_id: EmployeeId,
    pub score: u8,
    pub recorded_at: DateTime<Utc>,
}

impl From<&EngagementScore> for ScoreSample {
    fn from(record: &EngagementScore) -> Self {
        Self {
            employee_id: record.employee_id.clone(),
            score: record.recorded_score,
            recorded_at: record.created_at,
        }
    }
}

pub fn period_start(at: DateTime<Utc>, granularity: TrendGranularity) -> NaiveDate {
    let date = at.date_naive();
    match granularity {
        TrendGranularity::Weekly => {
            date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
        }
        TrendGranularity::Monthly => date.with_day(1).unwrap_or(date),
    }
}

fn period_label(start: NaiveDate, granularity: TrendGranularity) -> String {
    match granularity {
        TrendGranularity::Weekly => start.format("%Y-%m-%d").to_string(),
        TrendGranularity::Monthly => start.format("%b").to_string(),
    }
}

/// Averages samples per period, ordered by period start.
pub fn compute_trend(samples: &[ScoreSample], granularity: TrendGranularity) -> Vec<TrendPoint> {
    let mut buckets: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();
    for sample in samples {
        let bucket = buckets
            .entry(period_start(sample.recorded_at, granularity))
            .or_default();
        bucket.0 += u64::from(sample.score);
        bucket.1 += 1;
    }

    buckets
        .into_iter()
        .map(|(start, (total, count))| TrendPoint {
            period: period_label(start, granularity),
            period_start: start,
            average_score: round_half_up(total, count) as u8,
            samples: count as usize,
        })
        .collect()
}
