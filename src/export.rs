use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs::{create_dir_all, metadata, File, Permissions},
    io::{stdout, BufWriter, Write},
    path::Path,
};
use tempfile::NamedTempFile;
use tracing::debug;

/// Write `contents` to `path` via a sibling temp file and rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    create_dir_all(dir).with_context(|| format!("creating directory {}", dir.display()))?;

    let mut outfile = NamedTempFile::new_in(dir)?;
    let mut writer = BufWriter::new(&mut outfile);
    writer.write_all(contents)?;
    writer.flush()?;
    drop(writer);
    set_export_permissions(outfile.as_file(), path)?;
    outfile
        .persist(path)
        .with_context(|| format!("writing {}", path.display()))?;
    debug!(path = %path.display(), bytes = contents.len(), "wrote file");
    Ok(())
}

/// Keep the mode of a file being replaced; new files get 0644 rather than
/// the temp file's 0600.
#[cfg(unix)]
fn set_export_permissions(file: &File, target: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let perms = match metadata(target) {
        Ok(meta) => meta.permissions(),
        Err(_) => Permissions::from_mode(0o644),
    };
    file.set_permissions(perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_export_permissions(_file: &File, _target: &Path) -> Result<()> {
    Ok(())
}

/// Pretty-print `value` as JSON to stdout, or into `path` when given.
pub fn export_json<T: Serialize + ?Sized>(value: &T, path: Option<&Path>) -> Result<()> {
    let mut body = serde_json::to_string_pretty(value)?;
    body.push('\n');
    match path {
        Some(path) => write_atomic(path, body.as_bytes()),
        None => {
            let mut out = stdout().lock();
            out.write_all(body.as_bytes())?;
            out.flush()?;
            Ok(())
        }
    }
}
