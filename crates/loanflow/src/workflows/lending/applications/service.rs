use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::assignment::{BankDirectory, BankReview, BranchAssignment, ReviewDecision};
use super::audit::{AuditAction, AuditEntry};
use super::domain::{
    Actor, ActorRole, ApplicantProfile, ApplicationId, ApplicationState, CallerContext,
    LoanApplication, LoanTerms, SubmissionKind,
};
use super::integrity::{self, IntegrityError, IntegrityReport};
use super::repository::{LendingRepository, RepositoryError};
use super::transaction::{TransactionIdError, TransactionIdGenerator};

/// Construction-time knobs for the engine.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Agent company applied when an owner submits without naming one.
    pub default_agent_company: String,
}

/// Inbound creation payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    pub kind: SubmissionKind,
    pub applicant: ApplicantProfile,
    pub terms: LoanTerms,
    #[serde(default)]
    pub agent_company_id: Option<String>,
}

/// Partial update of the mutable business fields. Only meaningful while the
/// record has no content hash.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationUpdate {
    #[serde(default)]
    pub applicant: Option<ApplicantProfile>,
    #[serde(default)]
    pub terms: Option<LoanTerms>,
}

/// Engine owning the lifecycle state machine and its role gates. Routing,
/// hashing, and audit recording all run through here; nothing else writes
/// application state.
pub struct LendingWorkflowService<R, D> {
    repository: Arc<R>,
    directory: Arc<D>,
    transaction_ids: Arc<TransactionIdGenerator>,
    config: WorkflowConfig,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

impl<R, D> LendingWorkflowService<R, D>
where
    R: LendingRepository + 'static,
    D: BankDirectory + 'static,
{
    pub fn new(repository: Arc<R>, directory: Arc<D>, config: WorkflowConfig) -> Self {
        Self::with_generator(
            repository,
            directory,
            config,
            Arc::new(TransactionIdGenerator::default()),
        )
    }

    pub fn with_generator(
        repository: Arc<R>,
        directory: Arc<D>,
        config: WorkflowConfig,
        transaction_ids: Arc<TransactionIdGenerator>,
    ) -> Self {
        Self {
            repository,
            directory,
            transaction_ids,
            config,
        }
    }

    /// Intake a new application. Generates the transaction identifier and
    /// records the creation in the audit trail.
    pub fn create(
        &self,
        submission: ApplicationSubmission,
        actor: Actor,
        context: CallerContext,
    ) -> Result<LoanApplication, WorkflowError> {
        require_role(&actor, &[ActorRole::Owner, ActorRole::Agent], "create")?;
        validate_fields(&submission.kind, &submission.applicant, &submission.terms)?;

        let now = Utc::now();
        let transaction_id = self.transaction_ids.next(now.date_naive())?;
        let agent_company_id = submission
            .agent_company_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| self.config.default_agent_company.clone());

        let application = LoanApplication {
            id: next_application_id(),
            transaction_id,
            kind: submission.kind,
            applicant: submission.applicant,
            terms: submission.terms,
            state: ApplicationState::Submitted,
            content_hash: None,
            created_by: actor.clone(),
            agent_company_id,
            validated_by: None,
            created_at: now,
            updated_at: now,
            bank_approved_at: None,
        };

        let stored = self.repository.insert_application(application)?;
        self.record_audit(AuditAction::Create, actor, None, Some(&stored), context)?;

        info!(
            application = %stored.id,
            transaction = %stored.transaction_id,
            kind = stored.kind.label(),
            "loan application submitted"
        );
        Ok(stored)
    }

    /// Route a submitted application to a bank product and branch, moving it
    /// to `Checked`. The assignment row and the state write stand or fall
    /// together: if the state write loses a race, the row is rolled back.
    pub fn assign_to_branch(
        &self,
        id: &ApplicationId,
        bank_product_id: &str,
        branch_id: &str,
        actor: Actor,
        context: CallerContext,
    ) -> Result<BranchAssignment, WorkflowError> {
        require_role(&actor, &[ActorRole::Agent], "route to a branch")?;

        let current = self.fetch_required(id)?;
        if current.state != ApplicationState::Submitted {
            if self.repository.fetch_assignment(id)?.is_some() {
                return Err(WorkflowError::AlreadyAssigned(id.clone()));
            }
            return Err(WorkflowError::InvalidTransition {
                from: current.state.label(),
                to: ApplicationState::Checked.label(),
            });
        }

        if !self.directory.bank_product_exists(bank_product_id) {
            return Err(WorkflowError::ReferenceNotFound {
                entity: "bank product",
                id: bank_product_id.to_string(),
            });
        }
        if !self.directory.branch_exists(branch_id) {
            return Err(WorkflowError::ReferenceNotFound {
                entity: "branch",
                id: branch_id.to_string(),
            });
        }

        let now = Utc::now();
        let assignment = BranchAssignment {
            application_id: id.clone(),
            bank_product_id: bank_product_id.to_string(),
            branch_id: branch_id.to_string(),
            assigned_at: now,
        };

        // The repository's uniqueness check is the authoritative duplicate
        // signal; no separate existence pre-check.
        let assignment = match self.repository.insert_assignment(assignment) {
            Ok(assignment) => assignment,
            Err(RepositoryError::Conflict) => {
                return Err(WorkflowError::AlreadyAssigned(id.clone()));
            }
            Err(other) => return Err(other.into()),
        };

        let mut updated = current.clone();
        updated.state = ApplicationState::Checked;
        updated.updated_at = now;

        let stored = match self
            .repository
            .update_application(updated, ApplicationState::Submitted)
        {
            Ok(stored) => stored,
            Err(err) => {
                if let Err(rollback) = self.repository.remove_assignment(id) {
                    warn!(application = %id, error = %rollback, "assignment rollback failed");
                }
                return Err(err.into());
            }
        };

        self.record_audit(
            AuditAction::Route,
            actor,
            Some(&current),
            Some(&stored),
            context,
        )?;

        info!(
            application = %id,
            bank_product = bank_product_id,
            branch = branch_id,
            "application routed to branch"
        );
        Ok(assignment)
    }

    /// Execute a role-gated lifecycle transition. The routing transition goes
    /// through [`Self::assign_to_branch`] because it needs the product and
    /// branch selection.
    pub fn transition(
        &self,
        id: &ApplicationId,
        target: ApplicationState,
        actor: Actor,
        comments: Option<String>,
        context: CallerContext,
    ) -> Result<LoanApplication, WorkflowError> {
        let current = self.fetch_required(id)?;

        match (current.state, target) {
            (ApplicationState::Submitted, ApplicationState::Checked) => {
                Err(WorkflowError::Validation(
                    "bank product and branch must be selected through the assignment operation"
                        .to_string(),
                ))
            }
            (
                ApplicationState::Submitted | ApplicationState::Checked,
                ApplicationState::Rejected,
            ) => {
                require_role(
                    &actor,
                    &[ActorRole::Agent, ActorRole::Validator],
                    "reject an application",
                )?;
                self.apply_transition(&current, target, actor, AuditAction::Reject, context, |_| {})
            }
            (ApplicationState::Checked, ApplicationState::Validated) => {
                require_role(&actor, &[ActorRole::Validator], "validate an application")?;

                // Hash and state land in one repository write: no reader can
                // observe a validated record without its digest.
                let validator = actor.id.clone();
                let content_hash = integrity::compute_hash(&current)?;

                self.apply_transition(
                    &current,
                    target,
                    actor,
                    AuditAction::Validate,
                    context,
                    move |application| {
                        application.validated_by = Some(validator);
                        application.content_hash = Some(content_hash);
                    },
                )
            }
            (ApplicationState::Validated, ApplicationState::BankApproved) => {
                require_role(&actor, &[ActorRole::BankStaff], "approve an application")?;
                if self.repository.fetch_assignment(id)?.is_none() {
                    return Err(WorkflowError::Validation(
                        "no branch assignment on record for this application".to_string(),
                    ));
                }

                let now = Utc::now();
                let stored = self.apply_transition(
                    &current,
                    target,
                    actor.clone(),
                    AuditAction::BankApprove,
                    context,
                    move |application| {
                        application.bank_approved_at = Some(now);
                    },
                )?;

                self.repository.insert_review(BankReview {
                    application_id: id.clone(),
                    reviewer_id: actor.id,
                    decision: ReviewDecision::Approved,
                    comments,
                    decided_at: now,
                })?;
                Ok(stored)
            }
            (ApplicationState::Validated, ApplicationState::BankRejected) => {
                require_role(&actor, &[ActorRole::BankStaff], "reject an application")?;
                let comments = comments
                    .filter(|text| !text.trim().is_empty())
                    .ok_or_else(|| {
                        WorkflowError::Validation(
                            "rejection comments are required".to_string(),
                        )
                    })?;

                let now = Utc::now();
                let stored = self.apply_transition(
                    &current,
                    target,
                    actor.clone(),
                    AuditAction::BankReject,
                    context,
                    |_| {},
                )?;

                self.repository.insert_review(BankReview {
                    application_id: id.clone(),
                    reviewer_id: actor.id,
                    decision: ReviewDecision::Rejected,
                    comments: Some(comments),
                    decided_at: now,
                })?;
                Ok(stored)
            }
            (from, to) => Err(WorkflowError::InvalidTransition {
                from: from.label(),
                to: to.label(),
            }),
        }
    }

    /// Amend applicant or loan-term fields while the record is still mutable.
    /// The immutability guard runs before any other business rule.
    pub fn update_fields(
        &self,
        id: &ApplicationId,
        update: ApplicationUpdate,
        actor: Actor,
        context: CallerContext,
    ) -> Result<LoanApplication, WorkflowError> {
        let current = self.fetch_required(id)?;
        if current.content_hash.is_some() {
            return Err(WorkflowError::ImmutableRecord(id.clone()));
        }

        require_role(
            &actor,
            &[ActorRole::Owner, ActorRole::Agent],
            "amend an application",
        )?;

        if update.applicant.is_none() && update.terms.is_none() {
            return Err(WorkflowError::Validation("no fields to update".to_string()));
        }

        let mut updated = current.clone();
        if let Some(applicant) = update.applicant {
            updated.applicant = applicant;
        }
        if let Some(terms) = update.terms {
            updated.terms = terms;
        }
        validate_fields(&updated.kind, &updated.applicant, &updated.terms)?;
        updated.updated_at = Utc::now();

        let stored = self.repository.update_application(updated, current.state)?;
        self.record_audit(
            AuditAction::UpdateFields,
            actor,
            Some(&current),
            Some(&stored),
            context,
        )?;
        Ok(stored)
    }

    /// Remove a record that never reached validation. The deletion itself is
    /// audited, and the trail stays readable afterward.
    pub fn delete(
        &self,
        id: &ApplicationId,
        actor: Actor,
        context: CallerContext,
    ) -> Result<(), WorkflowError> {
        let current = self.fetch_required(id)?;
        if current.content_hash.is_some() {
            return Err(WorkflowError::ImmutableRecord(id.clone()));
        }

        require_role(
            &actor,
            &[ActorRole::Owner, ActorRole::Agent],
            "delete an application",
        )?;

        self.record_audit(AuditAction::Delete, actor, Some(&current), None, context)?;
        self.repository.delete_application(id)?;

        info!(application = %id, "loan application deleted before validation");
        Ok(())
    }

    /// Recompute the stored record's digest and report the comparison. A
    /// mismatch on a hash-bearing record is a security-relevant finding and
    /// is logged, never swallowed.
    pub fn verify_integrity(&self, id: &ApplicationId) -> Result<IntegrityReport, WorkflowError> {
        let application = self.fetch_required(id)?;
        let report = integrity::verify(&application)?;

        if !report.is_valid && report.state.hash_bearing() {
            warn!(
                application = %id,
                stored = report.stored_hash.as_deref().unwrap_or("<none>"),
                computed = %report.computed_hash,
                "content hash mismatch on a validated record"
            );
        }
        Ok(report)
    }

    pub fn get(&self, id: &ApplicationId) -> Result<LoanApplication, WorkflowError> {
        self.fetch_required(id)
    }

    pub fn assignment_for(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<BranchAssignment>, WorkflowError> {
        Ok(self.repository.fetch_assignment(id)?)
    }

    pub fn reviews_for(&self, id: &ApplicationId) -> Result<Vec<BankReview>, WorkflowError> {
        Ok(self.repository.reviews_for(id)?)
    }

    /// The application's trail in recording order; readable even after the
    /// record itself was deleted.
    pub fn audit_trail(&self, id: &ApplicationId) -> Result<Vec<AuditEntry>, WorkflowError> {
        Ok(self.repository.audit_trail(id)?)
    }

    fn fetch_required(&self, id: &ApplicationId) -> Result<LoanApplication, WorkflowError> {
        self.repository
            .fetch_application(id)?
            .ok_or_else(|| WorkflowError::ApplicationNotFound(id.clone()))
    }

    fn apply_transition(
        &self,
        current: &LoanApplication,
        target: ApplicationState,
        actor: Actor,
        action: AuditAction,
        context: CallerContext,
        mutate: impl FnOnce(&mut LoanApplication),
    ) -> Result<LoanApplication, WorkflowError> {
        let mut updated = current.clone();
        updated.state = target;
        updated.updated_at = Utc::now();
        mutate(&mut updated);

        let stored = self.repository.update_application(updated, current.state)?;
        self.record_audit(action, actor, Some(current), Some(&stored), context)?;

        info!(
            application = %stored.id,
            from = current.state.label(),
            to = stored.state.label(),
            "application transitioned"
        );
        Ok(stored)
    }

    fn record_audit(
        &self,
        action: AuditAction,
        actor: Actor,
        before: Option<&LoanApplication>,
        after: Option<&LoanApplication>,
        context: CallerContext,
    ) -> Result<(), WorkflowError> {
        let application_id = before
            .or(after)
            .map(|application| application.id.clone())
            .expect("audit entries always reference a record");

        let entry = AuditEntry::from_snapshots(
            application_id,
            action,
            actor,
            before,
            after,
            context,
            Utc::now(),
        )?;
        Ok(self.repository.append_audit(entry)?)
    }
}

fn require_role(
    actor: &Actor,
    allowed: &[ActorRole],
    action: &'static str,
) -> Result<(), WorkflowError> {
    if allowed.contains(&actor.role) {
        Ok(())
    } else {
        Err(WorkflowError::RoleDenied {
            role: actor.role.label(),
            action,
        })
    }
}

fn require(value: &str, field: &'static str) -> Result<(), WorkflowError> {
    if value.trim().is_empty() {
        Err(WorkflowError::Validation(format!(
            "required field missing: {field}"
        )))
    } else {
        Ok(())
    }
}

fn validate_fields(
    kind: &SubmissionKind,
    applicant: &ApplicantProfile,
    terms: &LoanTerms,
) -> Result<(), WorkflowError> {
    require(&applicant.full_name, "applicant full name")?;
    require(&applicant.phone, "applicant phone")?;
    require(&applicant.identity_number, "applicant identity number")?;
    require(&applicant.address, "applicant address")?;

    if terms.amount == 0 {
        return Err(WorkflowError::Validation(
            "loan amount must be greater than zero".to_string(),
        ));
    }
    if terms.tenor_months == 0 {
        return Err(WorkflowError::Validation(
            "tenor must be at least one month".to_string(),
        ));
    }

    match kind {
        SubmissionKind::IndividualWorker {
            employer_name,
            placement_country,
        } => {
            require(employer_name, "employer name")?;
            require(placement_country, "placement country")?;
        }
        SubmissionKind::BusinessLoan {
            business_name,
            business_license_number,
        } => {
            require(business_name, "business name")?;
            require(business_license_number, "business license number")?;
        }
    }
    Ok(())
}

/// Error raised by the workflow engine.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Validation(String),
    #[error("cannot move an application from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error("application {0} is validated and immutable")]
    ImmutableRecord(ApplicationId),
    #[error("application {0} is already routed to a branch")]
    AlreadyAssigned(ApplicationId),
    #[error("{entity} {id} does not exist")]
    ReferenceNotFound { entity: &'static str, id: String },
    #[error("application {0} not found")]
    ApplicationNotFound(ApplicationId),
    #[error("{role} is not permitted to {action}")]
    RoleDenied {
        role: &'static str,
        action: &'static str,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
    #[error(transparent)]
    TransactionId(#[from] TransactionIdError),
    #[error("failed to snapshot application for audit: {0}")]
    AuditSnapshot(#[from] serde_json::Error),
}
