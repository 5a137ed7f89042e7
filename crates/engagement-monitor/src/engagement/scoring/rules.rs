use super::super::domain::SurveyAnswers;

pub(crate) const MAX_SCORE: u8 = 100;

/// Integer division rounding halves upward, matching how dashboard averages are displayed.
pub(crate) fn round_half_up(numerator: u64, denominator: u64) -> u64 {
    if denominator == 0 {
        return 0;
    }
    (2 * numerator + denominator) / (2 * denominator)
}

/// `round(mean(answers) * 20)`: a mean of 1..5 lands on 20..100.
pub(crate) fn standard_score(answers: &SurveyAnswers) -> u8 {
    let scaled = round_half_up(u64::from(answers.sum()) * 20, answers.len() as u64);
    scaled.min(u64::from(MAX_SCORE)) as u8
}

/// `round(mean(answers) * 5)`, at most 25 points per pulse.
pub(crate) fn pulse_boost(answers: &SurveyAnswers) -> u8 {
    round_half_up(u64::from(answers.sum()) * 5, answers.len() as u64) as u8
}

pub(crate) fn pulse_score(prior: u8, boost: u8) -> u8 {
    prior.min(MAX_SCORE).saturating_add(boost).min(MAX_SCORE)
}
