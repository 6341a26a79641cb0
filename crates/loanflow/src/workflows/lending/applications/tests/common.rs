use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::workflows::lending::applications::assignment::{
    BankReview, BranchAssignment, InMemoryBankDirectory,
};
use crate::workflows::lending::applications::audit::AuditEntry;
use crate::workflows::lending::applications::domain::{
    Actor, ActorRole, ApplicantProfile, ApplicationId, ApplicationState, CallerContext,
    LoanApplication, LoanTerms, SubmissionKind,
};
use crate::workflows::lending::applications::repository::{LendingRepository, RepositoryError};
use crate::workflows::lending::applications::service::{
    ApplicationSubmission, LendingWorkflowService, WorkflowConfig,
};

pub(super) fn applicant() -> ApplicantProfile {
    ApplicantProfile {
        full_name: "Siti Rahmawati".to_string(),
        phone: "+62-812-5550-1234".to_string(),
        email: Some("siti.rahmawati@example.id".to_string()),
        identity_number: "3174052208910003".to_string(),
        tax_number: None,
        address: "Jl. Kebon Jeruk 17, Jakarta Barat".to_string(),
    }
}

pub(super) fn terms() -> LoanTerms {
    LoanTerms {
        amount: 25_000_000,
        tenor_months: 24,
        grace_period_months: 3,
        bank_interest_rate: 6.5,
    }
}

pub(super) fn submission() -> ApplicationSubmission {
    ApplicationSubmission {
        kind: SubmissionKind::IndividualWorker {
            employer_name: "Hyundai Engineering".to_string(),
            placement_country: "South Korea".to_string(),
        },
        applicant: applicant(),
        terms: terms(),
        agent_company_id: Some("agent-jkt-01".to_string()),
    }
}

pub(super) fn business_submission() -> ApplicationSubmission {
    ApplicationSubmission {
        kind: SubmissionKind::BusinessLoan {
            business_name: "Warung Berkah Jaya".to_string(),
            business_license_number: "NIB-1234567890123".to_string(),
        },
        applicant: applicant(),
        terms: terms(),
        agent_company_id: None,
    }
}

pub(super) fn agent() -> Actor {
    Actor {
        id: "agent-1".to_string(),
        role: ActorRole::Agent,
    }
}

pub(super) fn owner() -> Actor {
    Actor {
        id: "owner-1".to_string(),
        role: ActorRole::Owner,
    }
}

pub(super) fn validator() -> Actor {
    Actor {
        id: "validator-1".to_string(),
        role: ActorRole::Validator,
    }
}

pub(super) fn bank_staff() -> Actor {
    Actor {
        id: "bank-reviewer-1".to_string(),
        role: ActorRole::BankStaff,
    }
}

pub(super) fn ctx() -> CallerContext {
    CallerContext {
        ip: Some("10.0.0.5".to_string()),
        user_agent: Some("loanflow-tests".to_string()),
    }
}

pub(super) fn directory() -> InMemoryBankDirectory {
    InMemoryBankDirectory::with_entries(
        ["bni-kur", "bri-briguna", "mandiri-kum"],
        ["jakarta-pusat", "surabaya-darmo", "medan-kota"],
    )
}

pub(super) fn workflow_config() -> WorkflowConfig {
    WorkflowConfig {
        default_agent_company: "agent-hq".to_string(),
    }
}

pub(super) type Service = LendingWorkflowService<MemoryRepository, InMemoryBankDirectory>;

pub(super) fn build_service() -> (Arc<Service>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service = Arc::new(LendingWorkflowService::new(
        repository.clone(),
        Arc::new(directory()),
        workflow_config(),
    ));
    (service, repository)
}

pub(super) fn submit(service: &Service) -> LoanApplication {
    service
        .create(submission(), agent(), ctx())
        .expect("create succeeds")
}

pub(super) fn submit_checked(service: &Service) -> LoanApplication {
    let application = submit(service);
    service
        .assign_to_branch(&application.id, "bni-kur", "jakarta-pusat", agent(), ctx())
        .expect("assignment succeeds");
    service.get(&application.id).expect("fetch after routing")
}

pub(super) fn submit_validated(service: &Service) -> LoanApplication {
    let application = submit_checked(service);
    service
        .transition(
            &application.id,
            ApplicationState::Validated,
            validator(),
            None,
            ctx(),
        )
        .expect("validation succeeds")
}

#[derive(Default)]
struct Inner {
    applications: HashMap<ApplicationId, LoanApplication>,
    assignments: HashMap<ApplicationId, BranchAssignment>,
    reviews: Vec<BankReview>,
    audit: Vec<AuditEntry>,
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    inner: Arc<Mutex<Inner>>,
}

impl LendingRepository for MemoryRepository {
    fn insert_application(
        &self,
        application: LoanApplication,
    ) -> Result<LoanApplication, RepositoryError> {
        let mut guard = self.inner.lock().expect("repository mutex poisoned");
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
        let guard = self.inner.lock().expect("repository mutex poisoned");
        Ok(guard.applications.get(id).cloned())
    }

    fn update_application(
        &self,
        application: LoanApplication,
        expected_state: ApplicationState,
    ) -> Result<LoanApplication, RepositoryError> {
        let mut guard = self.inner.lock().expect("repository mutex poisoned");
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
        let mut guard = self.inner.lock().expect("repository mutex poisoned");
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
        let mut guard = self.inner.lock().expect("repository mutex poisoned");
        if guard.assignments.contains_key(&assignment.application_id) {
            return Err(RepositoryError::Conflict);
        }
        guard
            .assignments
            .insert(assignment.application_id.clone(), assignment.clone());
        Ok(assignment)
    }

    fn remove_assignment(&self, id: &ApplicationId) -> Result<(), RepositoryError> {
        let mut guard = self.inner.lock().expect("repository mutex poisoned");
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
        let guard = self.inner.lock().expect("repository mutex poisoned");
        Ok(guard.assignments.get(id).cloned())
    }

    fn insert_review(&self, review: BankReview) -> Result<BankReview, RepositoryError> {
        let mut guard = self.inner.lock().expect("repository mutex poisoned");
        guard.reviews.push(review.clone());
        Ok(review)
    }

    fn reviews_for(&self, id: &ApplicationId) -> Result<Vec<BankReview>, RepositoryError> {
        let guard = self.inner.lock().expect("repository mutex poisoned");
        Ok(guard
            .reviews
            .iter()
            .filter(|review| &review.application_id == id)
            .cloned()
            .collect())
    }

    fn append_audit(&self, entry: AuditEntry) -> Result<(), RepositoryError> {
        let mut guard = self.inner.lock().expect("repository mutex poisoned");
        guard.audit.push(entry);
        Ok(())
    }

    fn audit_trail(&self, id: &ApplicationId) -> Result<Vec<AuditEntry>, RepositoryError> {
        let guard = self.inner.lock().expect("repository mutex poisoned");
        Ok(guard
            .audit
            .iter()
            .filter(|entry| &entry.application_id == id)
            .cloned()
            .collect())
    }
}
