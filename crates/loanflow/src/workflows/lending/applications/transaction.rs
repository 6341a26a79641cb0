use std::fmt;
use std::sync::Mutex;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Canonical ten-digit transaction identifier: `YYMMDD` issue date plus a
/// four-digit disambiguator unique within that calendar day.
///
/// The canonical form is what gets stored and exchanged; the `Display`
/// rendering inserts a separator after the date (`YYMMDD-xxxx`) purely for
/// humans and is accepted back by [`TransactionId::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(String);

impl TransactionId {
    /// Validate and wrap a canonical ten-digit candidate.
    ///
    /// Well-formedness is syntactic: fixed width, month 01-12, day 01-31.
    /// A day of 31 in a 30-day month is accepted; calendar correctness is not
    /// this identifier's job.
    pub fn new(raw: impl Into<String>) -> Result<Self, TransactionIdError> {
        let raw = raw.into();
        if raw.len() != 10 || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TransactionIdError::Malformed(raw));
        }

        let month: u8 = raw[2..4].parse().expect("digits checked above");
        if !(1..=12).contains(&month) {
            return Err(TransactionIdError::MonthOutOfRange(month));
        }

        let day: u8 = raw[4..6].parse().expect("digits checked above");
        if !(1..=31).contains(&day) {
            return Err(TransactionIdError::DayOutOfRange(day));
        }

        Ok(Self(raw))
    }

    /// Parse either the canonical form or the human-facing `YYMMDD-xxxx`
    /// rendering back into a canonical identifier.
    pub fn parse(raw: &str) -> Result<Self, TransactionIdError> {
        let trimmed = raw.trim();
        match trimmed.split_once('-') {
            Some((date, suffix)) if date.len() == 6 => Self::new(format!("{date}{suffix}")),
            Some(_) => Err(TransactionIdError::Malformed(trimmed.to_string())),
            None => Self::new(trimmed),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-facing rendering with the cosmetic separator.
    pub fn formatted(&self) -> String {
        format!("{}-{}", &self.0[..6], &self.0[6..])
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransactionIdError {
    #[error("transaction id must be exactly ten digits, got {0:?}")]
    Malformed(String),
    #[error("transaction id month {0:02} outside 01-12")]
    MonthOutOfRange(u8),
    #[error("transaction id day {0:02} outside 01-31")]
    DayOutOfRange(u8),
    #[error("daily transaction sequence exhausted for {0}")]
    SequenceExhausted(NaiveDate),
}

#[derive(Debug)]
struct GeneratorDay {
    day: NaiveDate,
    sequence: u16,
}

/// Issues daily-sequential transaction identifiers. The counter resets when
/// the calendar day changes; at most 9999 identifiers exist per day.
#[derive(Debug)]
pub struct TransactionIdGenerator {
    state: Mutex<Option<GeneratorDay>>,
}

impl Default for TransactionIdGenerator {
    fn default() -> Self {
        Self {
            state: Mutex::new(None),
        }
    }
}

impl TransactionIdGenerator {
    pub fn next(&self, today: NaiveDate) -> Result<TransactionId, TransactionIdError> {
        let mut guard = self.state.lock().expect("transaction id mutex poisoned");

        let day = match guard.as_mut() {
            Some(day) if day.day == today => day,
            _ => {
                *guard = Some(GeneratorDay {
                    day: today,
                    sequence: 0,
                });
                guard.as_mut().expect("state just set")
            }
        };

        if day.sequence >= 9999 {
            return Err(TransactionIdError::SequenceExhausted(today));
        }
        day.sequence += 1;

        TransactionId::new(format!(
            "{:02}{:02}{:02}{:04}",
            today.year().rem_euclid(100),
            today.month(),
            today.day(),
            day.sequence
        ))
    }
}
