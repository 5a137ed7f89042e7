//! CSV import for survey exports (`Employee Email, Submitted At, Q1..Q5`).

mod normalizer;
mod parser;

use chrono::{DateTime, Utc};
use std::io::Read;
use std::path::Path;

use crate::engagement::domain::{normalize_email, SurveyAnswers, ValidationError};
use parser::SurveyRecord;

/// A validated row ready to be replayed through the engagement service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedSurvey {
    pub email: String,
    pub submitted_at: DateTime<Utc>,
    pub answers: SurveyAnswers,
}

#[derive(Debug, thiserror::Error)]
pub enum SurveyImportError {
    #[error("failed to read survey export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid survey CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("survey export line {line}: {reason}")]
    Row { line: u64, reason: RowError },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("missing submission time")]
    MissingTimestamp,
    #[error("unparseable submission time '{0}'")]
    Timestamp(String),
    #[error("answer to Q{question} is not a number: '{value}'")]
    NotANumber { question: usize, value: String },
    #[error("Q{0} is blank but a later question is answered")]
    Gap(usize),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub struct SurveyCsvImporter;

impl SurveyCsvImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<ImportedSurvey>, SurveyImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse and validate every row. The first invalid row aborts the import.
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<ImportedSurvey>, SurveyImportError> {
        parser::parse_records(reader)?
            .into_iter()
            .map(|record| {
                let line = record.line;
                validate_record(record).map_err(|reason| SurveyImportError::Row { line, reason })
            })
            .collect()
    }
}

fn validate_record(record: SurveyRecord) -> Result<ImportedSurvey, RowError> {
    let email = normalize_email(&record.email)?;

    let raw_time = record.submitted_at.ok_or(RowError::MissingTimestamp)?;
    let submitted_at =
        normalizer::parse_timestamp(&raw_time).ok_or(RowError::Timestamp(raw_time))?;

    let mut values = Vec::with_capacity(record.answers.len());
    let mut first_blank = None;
    for (index, cell) in record.answers.into_iter().enumerate() {
        let question = index + 1;
        match (cell, first_blank) {
            (None, None) => first_blank = Some(question),
            (None, Some(_)) => {}
            (Some(_), Some(blank)) => return Err(RowError::Gap(blank)),
            (Some(value), None) => {
                let parsed = value
                    .parse::<u8>()
                    .map_err(|_| RowError::NotANumber { question, value })?;
                values.push(parsed);
            }
        }
    }

    Ok(ImportedSurvey {
        email,
        submitted_at,
        answers: SurveyAnswers::new(values)?,
    })
}
