use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{Actor, ApplicationId, CallerContext, LoanApplication};

/// Action tag for one trail row, one per successful operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    UpdateFields,
    Route,
    Reject,
    Validate,
    BankApprove,
    BankReject,
    Delete,
}

impl AuditAction {
    pub const fn label(self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::UpdateFields => "update_fields",
            AuditAction::Route => "route",
            AuditAction::Reject => "reject",
            AuditAction::Validate => "validate",
            AuditAction::BankApprove => "bank_approve",
            AuditAction::BankReject => "bank_reject",
            AuditAction::Delete => "delete",
        }
    }
}

/// One append-only trail row. Entries are never updated or deleted; the
/// ordered set for an application replays everything that happened to it
/// before it became immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub application_id: ApplicationId,
    pub action: AuditAction,
    pub actor: Actor,
    pub recorded_at: DateTime<Utc>,
    /// Full record snapshot before the operation; `None` for creation.
    pub old_state: Option<Value>,
    /// Full record snapshot after the operation; `None` for deletion.
    pub new_state: Option<Value>,
    pub old_hash: Option<String>,
    pub new_hash: Option<String>,
    pub context: CallerContext,
}

impl AuditEntry {
    /// Build a trail row from the record as it looked before and after a
    /// successful operation. Snapshots are full states, not diffs, so the
    /// record can be reconstructed at any point in its history.
    pub fn from_snapshots(
        application_id: ApplicationId,
        action: AuditAction,
        actor: Actor,
        before: Option<&LoanApplication>,
        after: Option<&LoanApplication>,
        context: CallerContext,
        recorded_at: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            application_id,
            action,
            actor,
            recorded_at,
            old_state: before.map(serde_json::to_value).transpose()?,
            new_state: after.map(serde_json::to_value).transpose()?,
            old_hash: before.and_then(|application| application.content_hash.clone()),
            new_hash: after.and_then(|application| application.content_hash.clone()),
            context,
        })
    }
}
