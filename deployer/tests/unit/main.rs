//! Integration tests

mod test_archive;
mod test_http;
mod test_resources;
mod test_transfer;
