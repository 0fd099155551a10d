use std::{
    env, io,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};

const APPLICATION_NAME: &str = "feedblock";

pub fn create_application_default_path() -> Result<PathBuf> {
    let path = {
        #[cfg(windows)]
        {
            let mut path = env::var("APPDATA")
                .map(PathBuf::from)
                .map_err(|_| anyhow!("APPDATA should be present on Windows"))?;
            path.push(APPLICATION_NAME);
            path
        }
        #[cfg(not(windows))]
        {
            let mut path = env::var("XDG_STATE_HOME")
                .map(PathBuf::from)
                .or_else(|_| {
                    env::var("HOME").map(|home| {
                        let mut path = PathBuf::from(home);
                        path.push(".local/state");
                        path
                    })
                })
                .map_err(|_| anyhow!("Couldn't find neither XDG_STATE_HOME nor HOME"))?;
            path.push(APPLICATION_NAME);
            path
        }
    };

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

/// Layout of the application directory. Both surfaces derive every file location from here.
#[derive(Debug, Clone)]
pub struct AppPaths {
    dir: PathBuf,
}

impl AppPaths {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Uses `dir` when given, the platform default otherwise.
    pub fn resolve(dir: Option<PathBuf>) -> Result<Self> {
        Ok(Self::new(dir.map_or_else(create_application_default_path, Ok)?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Socket the content daemon listens on.
    pub fn socket_file(&self) -> PathBuf {
        self.dir.join("content.sock")
    }

    /// User stylesheet the content daemon renders visibility rules into.
    pub fn stylesheet_file(&self) -> PathBuf {
        self.dir.join("feed-blocker.css")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.dir.join("logs")
    }
}
