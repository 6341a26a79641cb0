use serde::Serialize;
use sha2::{Digest, Sha256};

use super::domain::{
    Actor, ApplicantProfile, ApplicationId, ApplicationState, LoanApplication, LoanTerms,
    SubmissionKind,
};

/// Business fields covered by the content digest, serialized in this fixed
/// declaration order. The stored hash itself and the administrative
/// timestamps are excluded so the digest stays stable across audit-only
/// writes and state moves after validation.
#[derive(Serialize)]
struct CanonicalSnapshot<'a> {
    id: &'a ApplicationId,
    transaction_id: &'a str,
    kind: &'a SubmissionKind,
    applicant: &'a ApplicantProfile,
    terms: &'a LoanTerms,
    created_by: &'a Actor,
    agent_company_id: &'a str,
}

impl<'a> CanonicalSnapshot<'a> {
    fn of(application: &'a LoanApplication) -> Self {
        Self {
            id: &application.id,
            transaction_id: application.transaction_id.as_str(),
            kind: &application.kind,
            applicant: &application.applicant,
            terms: &application.terms,
            created_by: &application.created_by,
            agent_company_id: &application.agent_company_id,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IntegrityError {
    #[error("failed to canonicalize application fields: {0}")]
    Canonicalize(#[from] serde_json::Error),
}

/// Compute the SHA-256 digest of the application's canonical business fields,
/// hex-encoded. Two calls over byte-identical field values yield the same
/// digest regardless of in-memory layout or locale.
pub fn compute_hash(application: &LoanApplication) -> Result<String, IntegrityError> {
    let bytes = serde_json::to_vec(&CanonicalSnapshot::of(application))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Outcome of recomputing a stored record's digest. A mismatch on a
/// hash-bearing record means the immutability guard was bypassed out of band;
/// callers escalate it, this function only reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub application_id: ApplicationId,
    pub stored_hash: Option<String>,
    pub computed_hash: String,
    pub is_valid: bool,
    pub state: ApplicationState,
}

pub fn verify(application: &LoanApplication) -> Result<IntegrityReport, IntegrityError> {
    let computed_hash = compute_hash(application)?;
    let is_valid = application.content_hash.as_deref() == Some(computed_hash.as_str());

    Ok(IntegrityReport {
        application_id: application.id.clone(),
        stored_hash: application.content_hash.clone(),
        computed_hash,
        is_valid,
        state: application.state,
    })
}
