use std::{collections::BTreeMap, future::Future, path::PathBuf};

use anyhow::Result;
use tracing::{debug, info};

use crate::fs::operations::{read_if_exists, write_atomically};

/// The page as far as the presentation adapter is concerned: named style blocks plus at most one
/// banner. Edits are collected in memory and become visible on [Document::commit].
pub trait Document {
    fn has_style(&self, id: &str) -> bool;

    fn insert_style(&mut self, id: &str, css: String);

    /// Returns true if a block was removed.
    fn remove_style(&mut self, id: &str) -> bool;

    fn has_banner(&self) -> bool;

    fn insert_banner(&mut self, css: String);

    /// Returns true if a banner was removed.
    fn remove_banner(&mut self) -> bool;

    /// Publishes the current contents. Returns true if anything had to be written.
    fn commit(&mut self) -> impl Future<Output = Result<bool>>;
}

const HEADER: &str = "/* Managed by feedblock. Changes are overwritten. */\n";

/// [Document] backed by a user stylesheet on disk.
///
/// Committing compares the rendered sheet with what's currently in the file, not with what was
/// written last, so a sheet edited or deleted by someone else is restored on the next commit.
pub struct StylesheetDocument {
    path: PathBuf,
    styles: BTreeMap<String, String>,
    banner: Option<String>,
}

impl StylesheetDocument {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            styles: BTreeMap::new(),
            banner: None,
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn render(&self) -> String {
        let mut sheet = String::from(HEADER);
        for (id, css) in &self.styles {
            sheet.push_str(&format!("\n/* {id} */\n{css}\n"));
        }
        if let Some(banner) = &self.banner {
            sheet.push_str(&format!("\n/* feed-blocked-message */\n{banner}\n"));
        }
        sheet
    }
}

impl Document for StylesheetDocument {
    fn has_style(&self, id: &str) -> bool {
        self.styles.contains_key(id)
    }

    fn insert_style(&mut self, id: &str, css: String) {
        self.styles.insert(id.to_string(), css);
    }

    fn remove_style(&mut self, id: &str) -> bool {
        self.styles.remove(id).is_some()
    }

    fn has_banner(&self) -> bool {
        self.banner.is_some()
    }

    fn insert_banner(&mut self, css: String) {
        self.banner = Some(css);
    }

    fn remove_banner(&mut self) -> bool {
        self.banner.take().is_some()
    }

    async fn commit(&mut self) -> Result<bool> {
        let rendered = self.render();
        let on_disk = read_if_exists(&self.path).await?;
        if on_disk.as_deref() == Some(rendered.as_str()) {
            debug!("Stylesheet {:?} is up to date", self.path);
            return Ok(false);
        }
        write_atomically(&self.path, rendered.as_bytes()).await?;
        info!(
            "Wrote stylesheet {:?} with {} blocks",
            self.path,
            self.styles.len() + usize::from(self.banner.is_some())
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::{Document, StylesheetDocument};

    #[tokio::test]
    async fn test_commit_writes_only_on_change() -> Result<()> {
        let dir = tempdir()?;
        let mut document = StylesheetDocument::new(dir.path().join("sheet.css"));
        document.insert_style("a", "a { color: red; }".into());

        assert!(document.commit().await?);
        assert!(!document.commit().await?);

        document.insert_banner("b::before { content: \"x\"; }".into());
        assert!(document.commit().await?);
        assert_eq!(std::fs::read_to_string(document.path())?, document.render());
        Ok(())
    }

    #[tokio::test]
    async fn test_commit_restores_external_changes() -> Result<()> {
        let dir = tempdir()?;
        let mut document = StylesheetDocument::new(dir.path().join("sheet.css"));
        document.insert_style("a", "a { display: none; }".into());
        document.commit().await?;

        std::fs::write(document.path(), "/* emptied by hand */")?;
        assert!(document.commit().await?);
        assert_eq!(std::fs::read_to_string(document.path())?, document.render());

        std::fs::remove_file(document.path())?;
        assert!(document.commit().await?);
        assert!(document.path().exists());
        Ok(())
    }
}
