use chrono::NaiveDate;

use crate::workflows::lending::applications::transaction::{
    TransactionId, TransactionIdError, TransactionIdGenerator,
};

fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

#[test]
fn generator_emits_daily_sequence() {
    let generator = TransactionIdGenerator::default();
    let today = day(2025, 8, 6);

    let first = generator.next(today).expect("first id");
    let second = generator.next(today).expect("second id");
    assert_eq!(first.as_str(), "2508060001");
    assert_eq!(second.as_str(), "2508060002");
}

#[test]
fn sequence_resets_on_a_new_day() {
    let generator = TransactionIdGenerator::default();
    generator.next(day(2025, 8, 6)).expect("id");
    generator.next(day(2025, 8, 6)).expect("id");

    let rolled = generator.next(day(2025, 8, 7)).expect("id");
    assert_eq!(rolled.as_str(), "2508070001");
}

#[test]
fn sequence_exhausts_at_four_digits() {
    let generator = TransactionIdGenerator::default();
    let today = day(2025, 8, 6);
    for _ in 0..9999 {
        generator.next(today).expect("id within the daily range");
    }

    match generator.next(today) {
        Err(TransactionIdError::SequenceExhausted(date)) => assert_eq!(date, today),
        other => panic!("expected exhaustion, got {other:?}"),
    }
}

#[test]
fn formatted_rendering_round_trips() {
    let id = TransactionId::new("2508060042").expect("valid id");
    assert_eq!(id.formatted(), "250806-0042");
    assert_eq!(id.to_string(), "250806-0042");

    let parsed = TransactionId::parse(&id.formatted()).expect("formatted form parses");
    assert_eq!(parsed, id);
}

#[test]
fn canonical_form_parses_directly() {
    let parsed = TransactionId::parse("2512310007").expect("canonical form parses");
    assert_eq!(parsed.as_str(), "2512310007");
}

#[test]
fn month_out_of_range_is_rejected() {
    match TransactionId::new("2513060001") {
        Err(TransactionIdError::MonthOutOfRange(13)) => {}
        other => panic!("expected month error, got {other:?}"),
    }
}

#[test]
fn day_zero_is_rejected() {
    match TransactionId::new("2508000001") {
        Err(TransactionIdError::DayOutOfRange(0)) => {}
        other => panic!("expected day error, got {other:?}"),
    }
}

#[test]
fn day_thirty_one_is_accepted_in_any_month() {
    // Syntactic validation only: February 31 passes the day-range check.
    let id = TransactionId::new("2502310001").expect("syntactically valid");
    assert_eq!(id.formatted(), "250231-0001");
}

#[test]
fn malformed_candidates_are_rejected() {
    assert!(matches!(
        TransactionId::new("25080600"),
        Err(TransactionIdError::Malformed(_))
    ));
    assert!(matches!(
        TransactionId::new("25O8060001"),
        Err(TransactionIdError::Malformed(_))
    ));
    assert!(matches!(
        TransactionId::parse("2508-060001"),
        Err(TransactionIdError::Malformed(_))
    ));
}
