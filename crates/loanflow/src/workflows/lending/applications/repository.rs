use super::assignment::{BankReview, BranchAssignment};
use super::audit::AuditEntry;
use super::domain::{ApplicationId, ApplicationState, LoanApplication};

/// Storage abstraction for the lending pipeline, so the engine can be
/// exercised against in-memory doubles and swapped onto a database later.
///
/// Implementations must make each method atomic: transitions on the same
/// application serialize through `update_application`'s expected-state check,
/// and `insert_assignment`'s uniqueness check is the authoritative duplicate
/// signal under concurrent routing attempts.
pub trait LendingRepository: Send + Sync {
    fn insert_application(
        &self,
        application: LoanApplication,
    ) -> Result<LoanApplication, RepositoryError>;

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<LoanApplication>, RepositoryError>;

    /// Replace the stored record only if it is still in `expected_state`.
    fn update_application(
        &self,
        application: LoanApplication,
        expected_state: ApplicationState,
    ) -> Result<LoanApplication, RepositoryError>;

    fn delete_application(&self, id: &ApplicationId) -> Result<(), RepositoryError>;

    /// Insert the single allowed assignment row for an application. A second
    /// insert for the same application fails with `Conflict`.
    fn insert_assignment(
        &self,
        assignment: BranchAssignment,
    ) -> Result<BranchAssignment, RepositoryError>;

    /// Roll back an assignment whose follow-up state write failed.
    fn remove_assignment(&self, id: &ApplicationId) -> Result<(), RepositoryError>;

    fn fetch_assignment(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<BranchAssignment>, RepositoryError>;

    fn insert_review(&self, review: BankReview) -> Result<BankReview, RepositoryError>;

    fn reviews_for(&self, id: &ApplicationId) -> Result<Vec<BankReview>, RepositoryError>;

    /// Append one trail row. Purely additive; a well-formed entry is never
    /// rejected.
    fn append_audit(&self, entry: AuditEntry) -> Result<(), RepositoryError>;

    /// The application's trail in recording order. Remains readable after the
    /// record itself is deleted.
    fn audit_trail(&self, id: &ApplicationId) -> Result<Vec<AuditEntry>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record moved from {expected} to {actual} during update")]
    StaleState {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
