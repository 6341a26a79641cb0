use chrono::{Duration, Utc};

use super::common::*;
use crate::workflows::lending::applications::domain::ApplicationState;
use crate::workflows::lending::applications::integrity;
use crate::workflows::lending::applications::repository::LendingRepository;

#[test]
fn hash_is_deterministic_for_unchanged_fields() {
    let (service, _) = build_service();
    let application = submit(&service);

    let first = integrity::compute_hash(&application).expect("hash computes");
    let second = integrity::compute_hash(&application).expect("hash computes");
    assert_eq!(first, second);
}

#[test]
fn any_business_field_change_moves_the_hash() {
    let (service, _) = build_service();
    let application = submit(&service);
    let baseline = integrity::compute_hash(&application).expect("hash computes");

    let mut amount_changed = application.clone();
    amount_changed.terms.amount += 1;
    assert_ne!(
        baseline,
        integrity::compute_hash(&amount_changed).expect("hash computes")
    );

    let mut name_changed = application.clone();
    name_changed.applicant.full_name.push('X');
    assert_ne!(
        baseline,
        integrity::compute_hash(&name_changed).expect("hash computes")
    );
}

#[test]
fn administrative_timestamps_do_not_affect_the_hash() {
    let (service, _) = build_service();
    let application = submit(&service);
    let baseline = integrity::compute_hash(&application).expect("hash computes");

    let mut touched = application.clone();
    touched.updated_at = Utc::now() + Duration::hours(6);
    touched.state = ApplicationState::Checked;
    assert_eq!(
        baseline,
        integrity::compute_hash(&touched).expect("hash computes")
    );
}

#[test]
fn validation_stores_a_sha256_hex_digest() {
    let (service, _) = build_service();
    let application = submit_validated(&service);

    let digest = application.content_hash.as_deref().expect("hash stored");
    assert_eq!(digest.len(), 64);
    assert!(digest.bytes().all(|b| b.is_ascii_hexdigit()));

    let report = service
        .verify_integrity(&application.id)
        .expect("verification runs");
    assert!(report.is_valid);
    assert_eq!(report.state, ApplicationState::Validated);
    assert_eq!(report.stored_hash.as_deref(), Some(digest));
    assert_eq!(report.computed_hash, digest);
}

#[test]
fn out_of_band_corruption_fails_verification() {
    let (service, repository) = build_service();
    let application = submit_validated(&service);
    let stored_hash = application.content_hash.clone();

    // Write around the engine, simulating a bypass of the immutability guard.
    let mut corrupted = application.clone();
    corrupted.terms.amount = 999_000_000;
    repository
        .update_application(corrupted, ApplicationState::Validated)
        .expect("raw write lands");

    let report = service
        .verify_integrity(&application.id)
        .expect("verification runs");
    assert!(!report.is_valid);
    assert_eq!(report.state, ApplicationState::Validated);
    assert_eq!(report.stored_hash, stored_hash);
    assert_ne!(Some(report.computed_hash), stored_hash);
}

#[test]
fn unvalidated_records_report_missing_stored_hash() {
    let (service, _) = build_service();
    let application = submit(&service);

    let report = service
        .verify_integrity(&application.id)
        .expect("verification runs");
    assert!(report.stored_hash.is_none());
    assert!(!report.is_valid);
    assert_eq!(report.state, ApplicationState::Submitted);
}
