//! Step-wizard engine behind the student wellbeing platform's self-assessments and counselor
//! booking, plus the peer chat message stream.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
