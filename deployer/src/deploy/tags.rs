//! Resource tags recording ownership and the deployed code digest

/// Added to every resource created by the deployer
pub const TAG_CREATED_BY: &str = "created_by=fndeploy";

/// Prefix of the tag holding the digest of the last uploaded archive
pub const TAG_CODE_ARCHIVE_DIGEST_PREFIX: &str = "code_archive_digest=";

/// Append `tag` unless it is already present
pub fn set_tag(mut tags: Vec<String>, tag: &str) -> Vec<String> {
    if !tags.iter().any(|t| t == tag) {
        tags.push(tag.to_string());
    }
    tags
}

pub fn set_created_by(tags: Vec<String>) -> Vec<String> {
    set_tag(tags, TAG_CREATED_BY)
}

/// Replace any digest tag with one for `digest`
pub fn set_code_archive_digest(tags: &[String], digest: &str) -> Vec<String> {
    let mut out: Vec<String> = tags
        .iter()
        .filter(|t| !t.starts_with(TAG_CODE_ARCHIVE_DIGEST_PREFIX))
        .cloned()
        .collect();
    out.push(format!("{}{}", TAG_CODE_ARCHIVE_DIGEST_PREFIX, digest));
    out
}

/// Digest recorded in the first digest tag, if any
pub fn code_archive_digest(tags: &[String]) -> Option<&str> {
    tags.iter()
        .find_map(|t| t.strip_prefix(TAG_CODE_ARCHIVE_DIGEST_PREFIX))
}

/// Whether the tags mark the resource as created by the deployer
pub fn is_created_by_us(tags: &[String]) -> bool {
    tags.iter().any(|t| t == TAG_CREATED_BY)
}
