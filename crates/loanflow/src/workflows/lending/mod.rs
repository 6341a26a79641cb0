//! Lending workflows: the multi-party loan approval pipeline.

pub mod applications;
