//! Domain logic for running stored Python snippets.
//!
//! Everything here is free of HTTP concerns: static validation of submitted
//! source, the filesystem script store, harness generation, subprocess
//! management, and output decoding. The `api` crate is a thin adapter over
//! [`scripting::orchestrator::ScriptOrchestrator`].

pub mod error;
pub mod scripting;
