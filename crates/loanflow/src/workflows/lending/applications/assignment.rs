use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::ApplicationId;

/// One-time routing of an application to a bank product and branch for
/// underwriting. At most one row ever exists per application; the row is
/// never replaced or updated through normal operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchAssignment {
    pub application_id: ApplicationId,
    pub bank_product_id: String,
    pub branch_id: String,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    pub const fn label(self) -> &'static str {
        match self {
            ReviewDecision::Approved => "approved",
            ReviewDecision::Rejected => "rejected",
        }
    }
}

/// One bank-staff decision on an assigned application. Immutable once
/// created; comments are mandatory when the decision is a rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankReview {
    pub application_id: ApplicationId,
    pub reviewer_id: String,
    pub decision: ReviewDecision,
    pub comments: Option<String>,
    pub decided_at: DateTime<Utc>,
}

/// Catalog lookups for routing targets, so the engine can distinguish a stale
/// product/branch selection from a routing conflict.
pub trait BankDirectory: Send + Sync {
    fn bank_product_exists(&self, bank_product_id: &str) -> bool;
    fn branch_exists(&self, branch_id: &str) -> bool;
}

/// Static directory used for service wiring and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBankDirectory {
    products: BTreeSet<String>,
    branches: BTreeSet<String>,
}

impl InMemoryBankDirectory {
    pub fn with_entries<P, B>(products: P, branches: B) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        B: IntoIterator,
        B::Item: Into<String>,
    {
        Self {
            products: products.into_iter().map(Into::into).collect(),
            branches: branches.into_iter().map(Into::into).collect(),
        }
    }
}

impl BankDirectory for InMemoryBankDirectory {
    fn bank_product_exists(&self, bank_product_id: &str) -> bool {
        self.products.contains(bank_product_id)
    }

    fn branch_exists(&self, branch_id: &str) -> bool {
        self.branches.contains(branch_id)
    }
}
