use loanflow::config::LendingConfig;
use loanflow::workflows::lending::applications::{
    ApplicationId, ApplicationState, AuditEntry, BankReview, BranchAssignment,
    InMemoryBankDirectory, LendingRepository, LoanApplication, RepositoryError, WorkflowConfig,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct Store {
    applications: HashMap<ApplicationId, LoanApplication>,
    assignments: HashMap<ApplicationId, BranchAssignment>,
    reviews: Vec<BankReview>,
    audit: Vec<AuditEntry>,
}

/// Process-local storage backing the service until a database adapter lands.
/// One mutex over the whole store keeps every repository call atomic.
#[derive(Default, Clone)]
pub(crate) struct InMemoryLendingRepository {
    store: Arc<Mutex<Store>>,
}

impl LendingRepository for InMemoryLendingRepository {
    fn insert_application(
        &self,
        application: LoanApplication,
    ) -> Result<LoanApplication, RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        if guard.applications.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        guard
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<LoanApplication>, RepositoryError> {
        let guard = self.store.lock().expect("repository mutex poisoned");
        Ok(guard.applications.get(id).cloned())
    }

    fn update_application(
        &self,
        application: LoanApplication,
        expected_state: ApplicationState,
    ) -> Result<LoanApplication, RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        let existing = guard
            .applications
            .get(&application.id)
            .ok_or(RepositoryError::NotFound)?;
        if existing.state != expected_state {
            return Err(RepositoryError::StaleState {
                expected: expected_state.label(),
                actual: existing.state.label(),
            });
        }
        guard
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn delete_application(&self, id: &ApplicationId) -> Result<(), RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        guard
            .applications
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn insert_assignment(
        &self,
        assignment: BranchAssignment,
    ) -> Result<BranchAssignment, RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        if guard.assignments.contains_key(&assignment.application_id) {
            return Err(RepositoryError::Conflict);
        }
        guard
            .assignments
            .insert(assignment.application_id.clone(), assignment.clone());
        Ok(assignment)
    }

    fn remove_assignment(&self, id: &ApplicationId) -> Result<(), RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        guard
            .assignments
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn fetch_assignment(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<BranchAssignment>, RepositoryError> {
        let guard = self.store.lock().expect("repository mutex poisoned");
        Ok(guard.assignments.get(id).cloned())
    }

    fn insert_review(&self, review: BankReview) -> Result<BankReview, RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        guard.reviews.push(review.clone());
        Ok(review)
    }

    fn reviews_for(&self, id: &ApplicationId) -> Result<Vec<BankReview>, RepositoryError> {
        let guard = self.store.lock().expect("repository mutex poisoned");
        Ok(guard
            .reviews
            .iter()
            .filter(|review| &review.application_id == id)
            .cloned()
            .collect())
    }

    fn append_audit(&self, entry: AuditEntry) -> Result<(), RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        guard.audit.push(entry);
        Ok(())
    }

    fn audit_trail(&self, id: &ApplicationId) -> Result<Vec<AuditEntry>, RepositoryError> {
        let guard = self.store.lock().expect("repository mutex poisoned");
        Ok(guard
            .audit
            .iter()
            .filter(|entry| &entry.application_id == id)
            .cloned()
            .collect())
    }
}

/// Routing catalog used until the bank/branch master data service is wired
/// in. The entries mirror the partner products live today.
pub(crate) fn default_bank_directory() -> InMemoryBankDirectory {
    InMemoryBankDirectory::with_entries(
        ["bni-kur", "bri-briguna", "mandiri-kum"],
        ["jakarta-pusat", "surabaya-darmo", "medan-kota", "semarang-simpang-lima"],
    )
}

pub(crate) fn workflow_config(lending: &LendingConfig) -> WorkflowConfig {
    WorkflowConfig {
        default_agent_company: lending.default_agent_company.clone(),
    }
}
