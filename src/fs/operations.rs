use std::{
    ffi::OsString,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tokio::{
    fs::{self, File},
    io::{self, AsyncWriteExt},
};

/// Path of the scratch file used while `path` is being replaced.
fn scratch_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|v| v.to_os_string())
        .unwrap_or_else(|| OsString::from("unnamed"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replaces contents of `path` in one step. Data is written next to the target and renamed over
/// it, so readers observe either the previous contents or the new ones, never a half written file.
pub async fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), io::Error> {
    let scratch = scratch_path(path);
    let mut file = File::create(&scratch).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(&scratch, path).await
}

/// Reads a file to a string, treating a missing file as `None`.
pub async fn read_if_exists(path: &Path) -> Result<Option<String>, io::Error> {
    match fs::read_to_string(path).await {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
