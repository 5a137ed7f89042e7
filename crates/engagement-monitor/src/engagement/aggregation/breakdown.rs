use super::super::domain::SurveyResponse;
use super::super::scoring::round_half_up;
use super::views::QuestionAverage;

/// Average answer per question, rounded to one decimal. Each question is averaged over
/// the surveys that asked it, so pulse and standard surveys can be mixed.
pub fn compute_breakdown(surveys: &[SurveyResponse]) -> Vec<QuestionAverage> {
    let mut totals: Vec<(u64, u64)> = Vec::new();
    for survey in surveys {
        let values = survey.answers.values();
        if totals.len() < values.len() {
            totals.resize(values.len(), (0, 0));
        }
        for (slot, value) in totals.iter_mut().zip(values) {
            slot.0 += u64::from(*value);
            slot.1 += 1;
        }
    }

    totals
        .into_iter()
        .enumerate()
        .filter(|(_, (_, count))| *count > 0)
        .map(|(index, (total, count))| QuestionAverage {
            question: index + 1,
            label: format!("q{}", index + 1),
            average: round_half_up(total * 10, count) as f64 / 10.0,
            responses: count as usize,
        })
        .collect()
}
