//! In-memory doubles for exercising the deployer without a remote API

pub mod fake_api;

pub use fake_api::{ApiCall, FakeFunctionApi};
