use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::transaction::TransactionId;

/// Identifier wrapper for loan applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of an application inside the approval pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationState {
    Submitted,
    Checked,
    Validated,
    BankApproved,
    BankRejected,
    Rejected,
}

impl ApplicationState {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationState::Submitted => "submitted",
            ApplicationState::Checked => "checked",
            ApplicationState::Validated => "validated",
            ApplicationState::BankApproved => "bank_approved",
            ApplicationState::BankRejected => "bank_rejected",
            ApplicationState::Rejected => "rejected",
        }
    }

    /// States whose records carry a content hash. A record enters this set via
    /// the validation transition and never leaves it.
    pub const fn hash_bearing(self) -> bool {
        matches!(
            self,
            ApplicationState::Validated
                | ApplicationState::BankApproved
                | ApplicationState::BankRejected
        )
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationState::BankApproved
                | ApplicationState::BankRejected
                | ApplicationState::Rejected
        )
    }
}

/// Roles allowed to act on an application, one per party in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Owner,
    Agent,
    Validator,
    BankStaff,
}

impl ActorRole {
    pub const fn label(self) -> &'static str {
        match self {
            ActorRole::Owner => "owner",
            ActorRole::Agent => "agent",
            ActorRole::Validator => "validator",
            ActorRole::BankStaff => "bank_staff",
        }
    }
}

/// The identity performing an operation; every request carries one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
}

/// Submission flow variant. Each variant has its own required-field set and
/// routing default, but shares the core state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmissionKind {
    IndividualWorker {
        employer_name: String,
        placement_country: String,
    },
    BusinessLoan {
        business_name: String,
        business_license_number: String,
    },
}

impl SubmissionKind {
    pub const fn label(&self) -> &'static str {
        match self {
            SubmissionKind::IndividualWorker { .. } => "individual_worker",
            SubmissionKind::BusinessLoan { .. } => "business_loan",
        }
    }
}

/// Applicant identity and contact fields. Opaque to the pipeline: presence is
/// checked at intake, content is never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantProfile {
    pub full_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub identity_number: String,
    pub tax_number: Option<String>,
    pub address: String,
}

/// Requested loan terms. Numeric fields are stored as submitted; pricing and
/// scoring happen outside this service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub amount: u64,
    pub tenor_months: u16,
    pub grace_period_months: u8,
    pub bank_interest_rate: f64,
}

/// The central record moved through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub id: ApplicationId,
    pub transaction_id: TransactionId,
    pub kind: SubmissionKind,
    pub applicant: ApplicantProfile,
    pub terms: LoanTerms,
    pub state: ApplicationState,
    /// Set exactly once, by the validation transition. Non-null if and only if
    /// the state is hash-bearing; once set, business fields are frozen.
    pub content_hash: Option<String>,
    pub created_by: Actor,
    pub agent_company_id: String,
    pub validated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub bank_approved_at: Option<DateTime<Utc>>,
}

impl LoanApplication {
    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.id.clone(),
            transaction_id: self.transaction_id.formatted(),
            kind: self.kind.label(),
            state: self.state.label(),
            content_hash: self.content_hash.clone(),
            agent_company_id: self.agent_company_id.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// Sanitized representation of an application's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub transaction_id: String,
    pub kind: &'static str,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    pub agent_company_id: String,
    pub updated_at: DateTime<Utc>,
}

/// Opaque caller metadata captured into the audit trail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}
