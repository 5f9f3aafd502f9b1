//! Sample data shared by the integration tests and e2e scenarios.

pub mod fixtures;
