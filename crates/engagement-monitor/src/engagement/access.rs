use serde::{Deserialize, Serialize};

use super::domain::EmployeeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Hr,
    Employee,
}

impl Role {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hr" => Some(Self::Hr),
            "employee" => Some(Self::Employee),
            _ => None,
        }
    }
}

/// Authenticated caller as reported by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub role: Role,
    pub employee_id: Option<EmployeeId>,
}

/// What a request is trying to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource<'a> {
    CompanyDashboard,
    EmployeeRoster,
    EmployeeAdmin,
    EmployeeDetail(&'a EmployeeId),
    SurveySubmission(&'a EmployeeId),
}

/// Single authorization rule set. HR sees every dashboard and employee but never fills in
/// surveys; employees only reach their own detail page and survey.
pub fn can_access(role: Role, caller: Option<&EmployeeId>, resource: Resource<'_>) -> bool {
    match (role, resource) {
        (Role::Hr, Resource::SurveySubmission(_)) => false,
        (Role::Hr, _) => true,
        (Role::Employee, Resource::EmployeeDetail(target))
        | (Role::Employee, Resource::SurveySubmission(target)) => caller == Some(target),
        (Role::Employee, _) => false,
    }
}

impl Identity {
    pub fn can_access(&self, resource: Resource<'_>) -> bool {
        can_access(self.role, self.employee_id.as_ref(), resource)
    }
}

/// Resolves a bearer credential to an identity. Session handling lives outside this crate.
pub trait IdentityProvider: Send + Sync {
    fn resolve(&self, token: &str) -> Result<Option<Identity>, IdentityError>;
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}
