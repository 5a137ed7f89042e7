use serde::{Deserialize, Deserializer};
use std::io::Read;

use super::normalizer::clean_cell;

/// One CSV row before validation. `line` is the 1-based line in the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SurveyRecord {
    pub(crate) line: u64,
    pub(crate) email: String,
    pub(crate) submitted_at: Option<String>,
    pub(crate) answers: [Option<String>; 5],
}

pub(crate) fn parse_records<R: Read>(reader: R) -> Result<Vec<SurveyRecord>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut records = Vec::new();

    for (index, result) in csv_reader.records().enumerate() {
        let raw = result?;
        let line = raw
            .position()
            .map(|position| position.line())
            .unwrap_or(index as u64 + 2);
        let row: SurveyRow = raw.deserialize(Some(&headers))?;

        records.push(SurveyRecord {
            line,
            email: clean_cell(&row.email),
            submitted_at: row.submitted_at,
            answers: [row.q1, row.q2, row.q3, row.q4, row.q5],
        });
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct SurveyRow {
    #[serde(rename = "Employee Email", default)]
    email: String,
    #[serde(
        rename = "Submitted At",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    submitted_at: Option<String>,
    #[serde(rename = "Q1", default, deserialize_with = "empty_string_as_none")]
    q1: Option<String>,
    #[serde(rename = "Q2", default, deserialize_with = "empty_string_as_none")]
    q2: Option<String>,
    #[serde(rename = "Q3", default, deserialize_with = "empty_string_as_none")]
    q3: Option<String>,
    #[serde(rename = "Q4", default, deserialize_with = "empty_string_as_none")]
    q4: Option<String>,
    #[serde(rename = "Q5", default, deserialize_with = "empty_string_as_none")]
    q5: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt
        .map(|value| clean_cell(&value))
        .filter(|value| !value.is_empty()))
}
