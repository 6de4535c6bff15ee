//! pg-runner - batch CRUD and raw-query runner for PostgreSQL.
//!
//! Translates a small set of operation descriptors (execute-raw-query,
//! select, insert, update, delete) into parameterized SQL, executes them
//! over a pooled connection with per-item failure isolation, and exposes
//! live schema discovery for capability lists.

pub mod batch;
pub mod cli;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod logging;
pub mod statement;
