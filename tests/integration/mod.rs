//! Integration test modules.

mod batch_test;
mod config_test;
mod statement_test;
