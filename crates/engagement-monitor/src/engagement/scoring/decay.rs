use chrono::{DateTime, Datelike, Utc};

/// Whole calendar months between two instants, ignoring the day of month.
/// A reference point in the future counts as zero elapsed months.
pub fn months_elapsed(since: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let month_index = |at: DateTime<Utc>| i64::from(at.year()) * 12 + i64::from(at.month0());
    let elapsed = month_index(now) - month_index(since);
    elapsed.clamp(0, i64::from(u32::MAX)) as u32
}

/// Subtracts `points_per_month` for every elapsed month, floored at zero.
pub fn decay_score(
    score: u8,
    scored_at: DateTime<Utc>,
    now: DateTime<Utc>,
    points_per_month: u8,
) -> u8 {
    let penalty = u64::from(months_elapsed(scored_at, now)) * u64::from(points_per_month);
    u64::from(score).saturating_sub(penalty) as u8
}
