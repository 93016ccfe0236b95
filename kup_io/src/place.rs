use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use tempfile::TempPath;

use kup_core::Error;
use kup_core::catalog::{ArtifactKind, ToolSpec};

/// Result of placing a staged artifact.
#[derive(Debug)]
pub struct Placed {
    pub path: PathBuf,
    /// Set when the post-install hook failed. The binary stays installed;
    /// this is a warning, not a rollback condition.
    pub post_install_error: Option<Error>,
}

/// Turn a staged download into an installed executable at
/// `dest_dir/tool.name`.
///
/// The staged file is consumed: a raw binary is renamed (or copied) away,
/// and an archive is deleted after extraction regardless of outcome.
pub fn place(staged: TempPath, tool: &ToolSpec, dest_dir: &Path) -> Result<Placed, Error> {
    let final_path = dest_dir.join(tool.name);

    match tool.artifact {
        ArtifactKind::Binary => move_into_place(staged, &final_path)?,
        ArtifactKind::TarGz { entry } => extract_entry(&staged, entry, &final_path)?,
    }

    set_executable(&final_path)?;

    let post_install_error = match tool.post_install {
        Some(hook) => hook(&final_path)
            .err()
            .map(|message| Error::PostInstall { message }),
        None => None,
    };

    Ok(Placed {
        path: final_path,
        post_install_error,
    })
}

/// Atomic rename first; fall back to a byte copy when the staging file lives
/// on a different filesystem than the destination.
fn move_into_place(staged: TempPath, dest: &Path) -> Result<(), Error> {
    match staged.persist(dest) {
        Ok(()) => Ok(()),
        Err(err) => {
            let staged = err.path;
            fs::copy(&staged, dest).map_err(|e| {
                Error::storage(format!("failed to copy binary to {}: {e}", dest.display()))
            })?;
            // Dropping the TempPath deletes the staged copy.
            drop(staged);
            Ok(())
        }
    }
}

/// Extract exactly one named entry from a gzip+tar archive into `dest`.
fn extract_entry(archive_path: &Path, entry_name: &str, dest: &Path) -> Result<(), Error> {
    let file = fs::File::open(archive_path)
        .map_err(|e| Error::storage(format!("failed to open staged archive: {e}")))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let entries = archive.entries().map_err(|e| Error::ArchiveCorrupt {
        message: e.to_string(),
    })?;

    for entry in entries {
        let mut entry = entry.map_err(|e| Error::ArchiveCorrupt {
            message: e.to_string(),
        })?;

        let matches = {
            let path = entry.path().map_err(|e| Error::ArchiveCorrupt {
                message: e.to_string(),
            })?;
            let stripped = path.strip_prefix("./").unwrap_or(&path);
            stripped == Path::new(entry_name)
        };
        if !matches {
            continue;
        }

        let mut out = fs::File::create(dest)
            .map_err(|e| Error::storage(format!("failed to create {}: {e}", dest.display())))?;

        return match io::copy(&mut entry, &mut out) {
            Ok(_) => Ok(()),
            Err(e) => {
                // Don't leave a truncated binary behind.
                let _ = fs::remove_file(dest);
                if matches!(
                    e.kind(),
                    io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof
                ) {
                    Err(Error::ArchiveCorrupt {
                        message: format!("while extracting '{entry_name}': {e}"),
                    })
                } else {
                    Err(Error::storage(format!(
                        "failed to write {}: {e}",
                        dest.display()
                    )))
                }
            }
        };
    }

    Err(Error::ArchiveEntryNotFound {
        entry: entry_name.to_string(),
    })
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<(), Error> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|e| {
        Error::storage(format!("failed to make {} executable: {e}", path.display()))
    })
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<(), Error> {
    Ok(())
}
