//! Wire models for the Serverless Functions API
//!
//! Only the fields the deployer reads or writes are modelled; unknown fields
//! are ignored on decode.

pub mod models;
