//! Deployment engine

pub mod container;
pub mod orchestrator;
pub mod ownership;
pub mod progress;
pub mod requests;
pub mod resources;
pub mod tags;
pub mod waiter;

pub use orchestrator::Deployer;
