//! End-to-end scenarios through the public service facade and the CSV importer.

mod common {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, TimeZone, Utc};

    use engagement_monitor::engagement::{
        Employee, EmployeeId, EngagementConfig, EngagementRepository, EngagementScore,
        EngagementService, RepositoryError, SurveyResponse,
    };

    pub(super) fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 8, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    pub(super) fn service() -> EngagementService<MemoryRepository> {
        EngagementService::new(
            Arc::new(MemoryRepository::default()),
            EngagementConfig::default(),
        )
    }

    #[derive(Default)]
    pub(super) struct MemoryRepository {
        sequence: AtomicU64,
        employees: Mutex<HashMap<EmployeeId, Employee>>,
        surveys: Mutex<Vec<SurveyResponse>>,
        scores: Mutex<Vec<EngagementScore>>,
    }

    impl EngagementRepository for MemoryRepository {
        fn next_sequence(&self) -> Result<u64, RepositoryError> {
            Ok(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
        }

        fn insert_employee(&self, employee: Employee) -> Result<Employee, RepositoryError> {
            let mut guard = self.employees.lock().expect("mutex poisoned");
            if guard.contains_key(&employee.id) {
                return Err(RepositoryError::Conflict);
            }
            guard.insert(employee.id.clone(), employee.clone());
            Ok(employee)
        }

        fn update_employee(&self, employee: Employee) -> Result<(), RepositoryError> {
            let mut guard = self.employees.lock().expect("mutex poisoned");
            guard.insert(employee.id.clone(), employee);
            Ok(())
        }

        fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
            Ok(self.employees.lock().expect("mutex poisoned").get(id).cloned())
        }

        fn employee_by_email(&self, email: &str) -> Result<Option<Employee>, RepositoryError> {
            Ok(self
                .employees
                .lock()
                .expect("mutex poisoned")
                .values()
                .find(|employee| employee.email == email)
                .cloned())
        }

        fn employees(&self) -> Result<Vec<Employee>, RepositoryError> {
            let mut employees: Vec<Employee> = self
                .employees
                .lock()
                .expect("mutex poisoned")
                .values()
                .cloned()
                .collect();
            employees.sort_by(|left, right| left.id.cmp(&right.id));
            Ok(employees)
        }

        fn insert_survey(&self, survey: SurveyResponse) -> Result<SurveyResponse, RepositoryError> {
            self.surveys
                .lock()
                .expect("mutex poisoned")
                .push(survey.clone());
            Ok(survey)
        }

        fn surveys(
            &self,
            employee_id: &EmployeeId,
        ) -> Result<Vec<SurveyResponse>, RepositoryError> {
            let mut surveys: Vec<SurveyResponse> = self
                .surveys
                .lock()
                .expect("mutex poisoned")
                .iter()
                .filter(|survey| &survey.employee_id == employee_id)
                .cloned()
                .collect();
            surveys.sort_by_key(|survey| survey.created_at);
            Ok(surveys)
        }

        fn insert_score(&self, score: EngagementScore) -> Result<EngagementScore, RepositoryError> {
            self.scores.lock().expect("mutex poisoned").push(score.clone());
            Ok(score)
        }

        fn update_score(&self, score: EngagementScore) -> Result<(), RepositoryError> {
            let mut guard = self.scores.lock().expect("mutex poisoned");
            let existing = guard
                .iter_mut()
                .find(|existing| existing.id == score.id)
                .ok_or(RepositoryError::NotFound)?;
            *existing = score;
            Ok(())
        }

        fn latest_score(
            &self,
            employee_id: &EmployeeId,
        ) -> Result<Option<EngagementScore>, RepositoryError> {
            Ok(self
                .scores
                .lock()
                .expect("mutex poisoned")
                .iter()
                .filter(|score| &score.employee_id == employee_id)
                .max_by_key(|score| score.created_at)
                .cloned())
        }

        fn scores(&self) -> Result<Vec<EngagementScore>, RepositoryError> {
            Ok(self.scores.lock().expect("mutex poisoned").clone())
        }
    }
}

use std::io::Cursor;

use common::*;
use engagement_monitor::engagement::{
    EmployeeRegistration, RiskTier, TrendGranularity, TrendScope,
};
use engagement_monitor::import::SurveyCsvImporter;

const EXPORT: &str = "Employee Email,Submitted At,Q1,Q2,Q3,Q4,Q5\n\
sarah.chen@company.com,2025-01-06T10:00:00Z,4,4,4,4,4\n\
mike.j@company.com,2025-01-07T10:00:00Z,3,3,3,3,3\n\
sarah.chen@company.com,2025-02-03T10:00:00Z,5,4,5,,\n\
emma.w@company.com,2025-02-10T10:00:00Z,1,2,1,2,1\n\
mike.j@company.com,2025-03-03T10:00:00Z,2,2,3,2,2\n";

#[test]
fn imported_export_feeds_dashboards() {
    let service = service();
    let surveys = SurveyCsvImporter::from_reader(Cursor::new(EXPORT)).expect("export parses");
    let summary = service.import_surveys(surveys).expect("import succeeds");
    assert_eq!(summary.employees_created, 3);
    assert_eq!(summary.surveys_imported, 5);

    let now = at(2025, 3, 3);
    let stats = service.company_stats(now).expect("stats");
    assert_eq!(stats.total_employees, 3);
    // sarah: 80 decayed one month then +23 = 101 -> 100, minus one month = 98
    // emma: 28 minus one month = 26, mike: 44
    assert_eq!(stats.avg_engagement, 56);
    assert_eq!(stats.high_risk_count, 1);

    let roster = service.roster(now).expect("roster");
    let tiers: Vec<(String, Option<RiskTier>)> = roster
        .into_iter()
        .map(|entry| (entry.email, entry.risk))
        .collect();
    assert_eq!(
        tiers,
        vec![
            ("emma.w@company.com".to_string(), Some(RiskTier::High)),
            ("mike.j@company.com".to_string(), Some(RiskTier::Medium)),
            ("sarah.chen@company.com".to_string(), Some(RiskTier::Low)),
        ]
    );

    let monthly = service
        .trend(TrendGranularity::Monthly, &TrendScope::Company)
        .expect("trend");
    let labels: Vec<(&str, u8)> = monthly
        .iter()
        .map(|point| (point.period.as_str(), point.average_score))
        .collect();
    assert_eq!(labels, vec![("Jan", 70), ("Feb", 64), ("Mar", 44)]);
}

#[test]
fn provisioned_employee_decays_until_next_survey() {
    let service = service();
    let provisioned = service
        .register_employee(
            EmployeeRegistration {
                email: "lina@company.com".to_string(),
                department: Some("Support".to_string()),
                ..EmployeeRegistration::default()
            },
            at(2024, 1, 15),
        )
        .expect("registered");
    let id = provisioned.employee.id;

    let a_year_later = service
        .current_score(&id, at(2025, 2, 1))
        .expect("read")
        .expect("scored");
    assert_eq!(a_year_later.months_since_update, 13);
    assert_eq!(a_year_later.score, 49);
    assert_eq!(a_year_later.risk, RiskTier::Medium);

    let run = service.apply_decay_batch(at(2025, 2, 1)).expect("batch");
    assert_eq!(run.decayed, 1);

    let detail = service.employee_detail(&id, at(2025, 2, 1)).expect("detail");
    assert_eq!(detail.current.map(|current| current.score), Some(49));
    assert_eq!(detail.employee.department.as_deref(), Some("Support"));
}
