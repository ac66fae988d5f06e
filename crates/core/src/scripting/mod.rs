//! Script execution subsystem.
//!
//! Submitted Python source is vetted by [`validator`] before it is stored.
//! At execution time the [`orchestrator`] resolves a logical path through a
//! [`repository::ScriptRepository`], generates a disposable harness
//! ([`harness`]), runs it as a child process under a wall-clock deadline
//! ([`runner`]) and turns whatever came back into an
//! [`outcome::ExecutionOutcome`] ([`decoder`]).

pub mod config;
pub mod decoder;
pub mod harness;
pub mod orchestrator;
pub mod outcome;
pub mod repository;
pub mod runner;
pub mod validator;
