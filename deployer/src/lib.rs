//! fndeploy library
//!
//! Content-addressed deployment of local directories as serverless
//! functions: packing, digest-based incremental uploads, build progress and
//! ownership checks before anything destructive.

pub mod api;
pub mod app;
pub mod archive;
pub mod cancel;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod utils;

#[cfg(any(test, feature = "test"))]
pub mod testing;
