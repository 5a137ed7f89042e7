use super::super::domain::{Employee, RiskTier};
use super::super::scoring::{round_half_up, CurrentScore};
use super::views::{CompanyStats, RosterEntry};
use std::cmp::Ordering;

pub const NO_DATA_LABEL: &str = "No data";

/// An employee paired with their decayed score, or `None` when nothing was recorded yet.
#[derive(Debug, Clone)]
pub struct EmployeeStanding {
    pub employee: Employee,
    pub current: Option<CurrentScore>,
}

impl EmployeeStanding {
    pub fn risk(&self) -> Option<RiskTier> {
        self.current.map(|current| current.risk)
    }

    pub fn to_entry(&self) -> RosterEntry {
        RosterEntry {
            employee_id: self.employee.id.clone(),
            email: self.employee.email.clone(),
            name: self.employee.name.clone(),
            score: self.current.map(|current| current.score),
            risk: self.risk(),
            risk_label: self.risk().map(RiskTier::label).unwrap_or(NO_DATA_LABEL),
        }
    }
}

/// Headline numbers for the company overview. Employees without data are counted in
/// the head count but skipped by the average and the high-risk tally.
pub fn company_stats(standings: &[EmployeeStanding]) -> CompanyStats {
    let scores: Vec<u8> = standings
        .iter()
        .filter_map(|standing| standing.current.map(|current| current.score))
        .collect();
    let total: u64 = scores.iter().map(|score| u64::from(*score)).sum();

    CompanyStats {
        total_employees: standings.len(),
        avg_engagement: round_half_up(total, scores.len() as u64) as u8,
        high_risk_count: standings
            .iter()
            .filter(|standing| standing.risk() == Some(RiskTier::High))
            .count(),
        scored_employees: scores.len(),
    }
}

fn roster_order(left: &EmployeeStanding, right: &EmployeeStanding) -> Ordering {
    let by_standing = match (left.current, right.current) {
        (Some(l), Some(r)) => l
            .risk
            .urgency()
            .cmp(&r.risk.urgency())
            .then(l.score.cmp(&r.score)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_standing.then_with(|| left.employee.email.cmp(&right.employee.email))
}

/// Most at-risk employees first: High, Medium, Low, then employees without data.
pub fn rank_roster(mut standings: Vec<EmployeeStanding>, limit: usize) -> Vec<RosterEntry> {
    standings.sort_by(roster_order);
    standings
        .iter()
        .take(limit)
        .map(EmployeeStanding::to_entry)
        .collect()
}
