//! Core library for the loan approval pipeline service: workflow engine,
//! branch assignment, content hashing, audit trail, and transaction
//! identifiers, plus the configuration and telemetry shared with the API
//! binary.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
