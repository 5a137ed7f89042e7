use crate::infra::{end_of_day, InMemoryEngagementRepository};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use engagement_monitor::config::AppConfig;
use engagement_monitor::engagement::{
    CompanyStats, EngagementConfig, EngagementService, ImportSummary, RosterEntry,
    SurveyAnswers, TrendGranularity, TrendPoint, TrendScope,
};
use engagement_monitor::error::AppError;
use engagement_monitor::import::{ImportedSurvey, SurveyCsvImporter};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct ReportArgs {
    /// Survey export (`Employee Email, Submitted At, Q1..Q5`). Uses sample data when omitted.
    #[arg(long)]
    pub(crate) surveys_csv: Option<PathBuf>,
    /// Reporting date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Trend bucket width: weekly or monthly.
    #[arg(long, value_parser = parse_granularity)]
    pub(crate) granularity: Option<TrendGranularity>,
    /// Print the report as JSON instead of text.
    #[arg(long)]
    pub(crate) json: bool,
}

fn parse_granularity(raw: &str) -> Result<TrendGranularity, String> {
    TrendGranularity::parse(raw).ok_or_else(|| format!("'{raw}' is not weekly or monthly"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ReportDataSource {
    SurveyExport,
    Sample,
}

#[derive(Debug, Serialize)]
pub(crate) struct EngagementReport {
    pub(crate) as_of: NaiveDate,
    pub(crate) data_source: ReportDataSource,
    pub(crate) risk_policy: &'static str,
    pub(crate) imported: ImportSummary,
    pub(crate) stats: CompanyStats,
    pub(crate) granularity: TrendGranularity,
    pub(crate) trend: Vec<TrendPoint>,
    pub(crate) roster: Vec<RosterEntry>,
}

/// Replays `surveys` into a throwaway repository and summarizes the result as of `as_of`.
pub(crate) fn build_report(
    surveys: Vec<ImportedSurvey>,
    data_source: ReportDataSource,
    config: EngagementConfig,
    as_of: NaiveDate,
    granularity: TrendGranularity,
) -> Result<EngagementReport, AppError> {
    let service = EngagementService::new(Arc::new(InMemoryEngagementRepository::default()), config);
    let now = end_of_day(as_of);
    let relevant: Vec<ImportedSurvey> = surveys
        .into_iter()
        .filter(|survey| survey.submitted_at <= now)
        .collect();

    let imported = service.import_surveys(relevant)?;
    Ok(EngagementReport {
        as_of,
        data_source,
        risk_policy: config.scoring.risk_policy.label(),
        imported,
        stats: service.company_stats(now)?,
        granularity,
        trend: service.trend(granularity, &TrendScope::Company)?,
        roster: service.roster(now)?,
    })
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs {
        surveys_csv,
        as_of,
        granularity,
        json,
    } = args;

    let config = AppConfig::load()?;
    let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());
    let (surveys, data_source) = match surveys_csv {
        Some(path) => (
            SurveyCsvImporter::from_path(path)?,
            ReportDataSource::SurveyExport,
        ),
        None => (sample_surveys(as_of), ReportDataSource::Sample),
    };

    let report = build_report(
        surveys,
        data_source,
        config.engagement,
        as_of,
        granularity.unwrap_or_default(),
    )?;

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(body) => println!("{body}"),
            Err(err) => println!("Report could not be serialized: {err}"),
        }
    } else {
        render_report(&report);
    }
    Ok(())
}

pub(crate) fn render_report(report: &EngagementReport) {
    println!("Employee engagement report");
    println!(
        "As of {} ({} risk thresholds)",
        report.as_of, report.risk_policy
    );
    match report.data_source {
        ReportDataSource::SurveyExport => println!(
            "Data source: survey export ({} surveys, {} employees)",
            report.imported.surveys_imported, report.imported.employees_created
        ),
        ReportDataSource::Sample => println!("Data source: sample data (no export provided)"),
    }

    println!("\nCompany overview");
    println!("- Employees: {}", report.stats.total_employees);
    println!(
        "- Average engagement: {} (across {} scored employees)",
        report.stats.avg_engagement, report.stats.scored_employees
    );
    println!("- High risk: {}", report.stats.high_risk_count);

    if report.trend.is_empty() {
        println!("\nTrend ({}): no scores yet", report.granularity.label());
    } else {
        println!("\nTrend ({})", report.granularity.label());
        for point in &report.trend {
            println!(
                "- {} ({}): {} from {} scores",
                point.period, point.period_start, point.average_score, point.samples
            );
        }
    }

    if report.roster.is_empty() {
        println!("\nEmployees needing attention: none");
    } else {
        println!("\nEmployees needing attention");
        for entry in &report.roster {
            let score = entry
                .score
                .map(|score| score.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("- {} [{}] score {}", entry.email, entry.risk_label, score);
        }
    }
}

const SAMPLE_PATTERNS: [(&str, &[&[u8]]); 6] = [
    (
        "sarah.chen@company.com",
        &[&[4, 4, 5, 4, 4], &[4, 5, 4, 4, 4], &[5, 5, 4], &[4, 4, 4, 5, 4]],
    ),
    (
        "mike.johnson@company.com",
        &[&[3, 3, 3, 3, 2], &[3, 2, 3, 2, 2], &[2, 2, 3, 2, 2]],
    ),
    ("emma.wilson@company.com", &[&[2, 1, 2, 2, 1], &[1, 1, 2, 1, 1]]),
    (
        "james.brown@company.com",
        &[&[4, 3, 4, 3, 4], &[3, 3, 4, 3, 3], &[3, 3, 3]],
    ),
    ("lisa.anderson@company.com", &[&[5, 5, 5, 5, 4]]),
    ("david.kim@company.com", &[&[3, 4, 3, 3, 4], &[2, 2, 2]]),
];

/// Deterministic survey history spread over the months before `as_of`.
pub(crate) fn sample_surveys(as_of: NaiveDate) -> Vec<ImportedSurvey> {
    let mut surveys = Vec::new();
    for (offset, (email, answer_sets)) in SAMPLE_PATTERNS.iter().enumerate() {
        let count = answer_sets.len() as i64;
        for (index, answers) in answer_sets.iter().enumerate() {
            let months_back = count - index as i64 - 1;
            let day = as_of - Duration::days(months_back * 30 + offset as i64 + 1);
            let Ok(answers) = SurveyAnswers::new(answers.to_vec()) else {
                continue;
            };
            surveys.push(ImportedSurvey {
                email: (*email).to_string(),
                submitted_at: end_of_day(day),
                answers,
            });
        }
    }
    surveys
}
