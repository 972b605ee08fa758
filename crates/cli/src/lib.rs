//! `leasex-cli`: batch evaluation of lease extractions, locating fields in
//! annotation documents, scoring them with `leasex-scoring`, and writing
//! reports.

pub mod evaluate;
pub mod judge;
pub mod json_ref;
pub mod report;
