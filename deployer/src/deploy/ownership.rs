//! Ownership check gating destructive operations

use tracing::warn;

use crate::deploy::tags::is_created_by_us;
use crate::errors::DeployError;

/// Fail with `NotOwned` unless `tags` carry the ownership marker
///
/// Call with tags from a fresh fetch, right before the destructive request.
pub fn check_ownership(tags: &[String], resource: &str) -> Result<(), DeployError> {
    if is_created_by_us(tags) {
        return Ok(());
    }

    warn!("Refusing to modify {}: not created by this tool", resource);
    Err(DeployError::NotOwned(resource.to_string()))
}
