//! E2E test suite entry point.

mod catalog_workflow;
mod fixture;
mod search_workflow;
