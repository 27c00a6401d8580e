//! HTTP adapter for the functions API

pub mod client;
pub mod functions;

pub use client::HttpClient;
