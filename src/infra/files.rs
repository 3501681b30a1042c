use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Mode of newly created files, before the umask
#[cfg(unix)]
const NEW_FILE_MODE: u32 = 0o644;

pub fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    serde_yml::from_str(&content).with_context(|| format!("parsing {:?}", path))
}

/// `Ok(None)` when the file does not exist; parse errors still fail
pub fn load_yaml_if_exists<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("reading {:?}", path)),
    };

    serde_yml::from_str(&content)
        .map(Some)
        .with_context(|| format!("parsing {:?}", path))
}

/// Replaces `path` with the YAML form of `value`.
///
/// The document is written to a sibling temp file and renamed over the
/// target, so readers see either the old or the new content.
pub fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_yml::to_string(value).with_context(|| format!("serializing {:?}", path))?;
    write_atomic(path, content.as_bytes())
}

pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("creating {:?}", dir))?;

    let mut tmp =
        temp_file_for(path, dir).with_context(|| format!("creating temp file in {:?}", dir))?;
    tmp.write_all(content)
        .with_context(|| format!("writing {:?}", tmp.path()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("syncing {:?}", tmp.path()))?;
    tmp.persist(path)
        .with_context(|| format!("replacing {:?}", path))?;
    Ok(())
}

/// Temp file next to `target` that keeps the target's permissions, or gets
/// the usual new-file mode when there is no target yet
fn temp_file_for(target: &Path, dir: &Path) -> io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(NEW_FILE_MODE));
    }
    let tmp = builder.tempfile_in(dir)?;

    match fs::metadata(target) {
        Ok(existing) => tmp.as_file().set_permissions(existing.permissions())?,
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    Ok(tmp)
}
