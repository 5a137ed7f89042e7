use super::domain::{Employee, EmployeeId, EngagementScore, SurveyResponse};

/// Storage abstraction so the service can be exercised without a database.
///
/// `surveys` returns records ordered by `created_at` ascending; `latest_score` returns
/// the record with the greatest `created_at`.
pub trait EngagementRepository: Send + Sync {
    /// Next value of the counter behind generated IDs. Values must stay unique for the
    /// lifetime of the store, across service restarts included.
    fn next_sequence(&self) -> Result<u64, RepositoryError>;

    fn insert_employee(&self, employee: Employee) -> Result<Employee, RepositoryError>;
    fn update_employee(&self, employee: Employee) -> Result<(), RepositoryError>;
    fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError>;
    fn employee_by_email(&self, email: &str) -> Result<Option<Employee>, RepositoryError>;
    fn employees(&self) -> Result<Vec<Employee>, RepositoryError>;

    fn insert_survey(&self, survey: SurveyResponse) -> Result<SurveyResponse, RepositoryError>;
    fn surveys(&self, employee_id: &EmployeeId) -> Result<Vec<SurveyResponse>, RepositoryError>;

    fn insert_score(&self, score: EngagementScore) -> Result<EngagementScore, RepositoryError>;
    fn update_score(&self, score: EngagementScore) -> Result<(), RepositoryError>;
    fn latest_score(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Option<EngagementScore>, RepositoryError>;
    fn scores(&self) -> Result<Vec<EngagementScore>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
