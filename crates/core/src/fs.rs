//! Filesystem utilities

use std::fs;
use std::io;
use std::path::Path;

use log::{error, info};

/// Ensure a directory exists, creating it if necessary
///
/// Returns true if the directory exists (either already existed or was created).
pub fn ensure_dir_exists(path: &Path) -> bool {
    if path.is_dir() {
        return true;
    }

    match fs::create_dir_all(path) {
        Ok(_) => {
            info!("Created directory: {}", path.display());
            true
        }
        Err(e) => {
            error!("Failed to create directory {}: {}", path.display(), e);
            false
        }
    }
}

/// Check if a path exists
pub fn path_exists(path: &Path) -> bool {
    path.exists()
}

/// Replace `target` with whatever `write` produces, as a whole-file snapshot.
///
/// The content is written to a sibling `.tmp` file first and renamed over the
/// target, so readers never observe a half-written file. On error the
/// temporary file is removed and `target` is left as it was.
pub fn replace_file<F, E>(target: &Path, write: F) -> Result<(), E>
where
    F: FnOnce(fs::File) -> Result<(), E>,
    E: From<io::Error>,
{
    let Some(file_name) = target.file_name() else {
        let e = io::Error::new(io::ErrorKind::InvalidInput, "target has no file name");
        return Err(e.into());
    };
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = target.with_file_name(tmp_name);

    let result = fs::File::create(&tmp_path)
        .map_err(E::from)
        .and_then(write)
        .and_then(|_| fs::rename(&tmp_path, target).map_err(E::from));
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}
