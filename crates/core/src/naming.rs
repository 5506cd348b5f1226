//! Artifact and workspace naming rules.

use crate::job::Operation;

/// Suffix the transform appends to encrypted artifacts.
pub const ENCRYPTED_SUFFIX: &str = ".out";

/// Name of the artifact the transform writes for `file_name`.
///
/// Encryption appends [`ENCRYPTED_SUFFIX`]; decryption strips one trailing
/// suffix and otherwise leaves the name unchanged (the transform then
/// overwrites its input).
pub fn processed_file_name(file_name: &str, operation: Operation) -> String {
    match operation {
        Operation::Encrypt => format!("{file_name}{ENCRYPTED_SUFFIX}"),
        Operation::Decrypt => match file_name.strip_suffix(ENCRYPTED_SUFFIX) {
            Some(stem) if !stem.is_empty() => stem.to_string(),
            _ => file_name.to_string(),
        },
    }
}

/// Whether `name` is a single path component safe to create in a directory.
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Directory name for a job's private workspace.
///
/// Ids made only of `[A-Za-z0-9_-]` become `job-<id>`; anything else is
/// hex-encoded as `jobx-<hex>`, so distinct ids never share a directory.
pub fn workspace_dir_name(job_id: &str) -> String {
    let safe = !job_id.is_empty()
        && job_id.len() <= 64
        && job_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if safe {
        format!("job-{job_id}")
    } else {
        format!("jobx-{}", hex::encode(job_id))
    }
}
