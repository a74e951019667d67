//! Template loading and caching.
//!
//! The cache is a freshness-checked map: each entry remembers the file
//! modification time observed when it was read. With auto-reload enabled the
//! file is stat'ed before every render and re-read when the mtime changes;
//! with it disabled the first successful read is served for the process
//! lifetime.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use hyper::body::Bytes;
use tokio::fs;
use tokio::sync::RwLock;

use super::TemplateError;

/// A cached template, valid while the file's modification time is unchanged
#[derive(Debug, Clone)]
struct CachedTemplate {
    content: Bytes,
    modified: Option<SystemTime>,
}

/// Loads templates from a fixed directory with an mtime-keyed cache
pub struct TemplateEngine {
    directory: PathBuf,
    auto_reload: bool,
    cache: RwLock<HashMap<String, CachedTemplate>>,
}

impl TemplateEngine {
    /// Create an engine rooted at `directory`.
    ///
    /// Relative paths are resolved against the current working directory at
    /// startup; the result is absolute for the process lifetime.
    pub fn new(directory: &str, auto_reload: bool) -> std::io::Result<Self> {
        let path = Path::new(directory);
        let directory = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        Ok(Self {
            directory,
            auto_reload,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Absolute directory template names are resolved against
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Render a template by name, returning its bytes verbatim
    pub async fn render(&self, name: &str) -> Result<Bytes, TemplateError> {
        let path = self.directory.join(name);

        if self.auto_reload {
            self.render_fresh(name, &path).await
        } else {
            self.render_cached(name, &path).await
        }
    }

    /// Auto-reload path: stat first, serve the cache only while the
    /// modification time matches what was observed at read
    async fn render_fresh(&self, name: &str, path: &Path) -> Result<Bytes, TemplateError> {
        let modified = match fs::metadata(path).await {
            Ok(meta) => meta.modified().ok(),
            Err(e) => {
                // A deleted template must never be served from cache
                self.cache.write().await.remove(name);
                return Err(map_io_error(name, e));
            }
        };

        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(name) {
                // Re-read when either mtime is unavailable
                if entry.modified.is_some() && entry.modified == modified {
                    return Ok(entry.content.clone());
                }
            }
        }

        self.load_and_cache(name, path, modified).await
    }

    /// Cache-forever path: the first successful read wins for the process
    /// lifetime, even if the file later changes or disappears
    async fn render_cached(&self, name: &str, path: &Path) -> Result<Bytes, TemplateError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(name) {
                return Ok(entry.content.clone());
            }
        }

        let modified = fs::metadata(path)
            .await
            .ok()
            .and_then(|m| m.modified().ok());
        self.load_and_cache(name, path, modified).await
    }

    async fn load_and_cache(
        &self,
        name: &str,
        path: &Path,
        modified: Option<SystemTime>,
    ) -> Result<Bytes, TemplateError> {
        let content = match fs::read(path).await {
            Ok(c) => Bytes::from(c),
            Err(e) => {
                self.cache.write().await.remove(name);
                return Err(map_io_error(name, e));
            }
        };

        let mut cache = self.cache.write().await;
        cache.insert(
            name.to_string(),
            CachedTemplate {
                content: content.clone(),
                modified,
            },
        );
        Ok(content)
    }
}

fn map_io_error(name: &str, e: std::io::Error) -> TemplateError {
    if e.kind() == ErrorKind::NotFound {
        TemplateError::NotFound(name.to_string())
    } else {
        TemplateError::Io {
            name: name.to_string(),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_template(dir: &TempDir, name: &str, content: &[u8]) {
        std::fs::write(dir.path().join(name), content).expect("write template");
    }

    fn engine(dir: &TempDir, auto_reload: bool) -> TemplateEngine {
        TemplateEngine::new(dir.path().to_str().expect("utf-8 path"), auto_reload)
            .expect("engine")
    }

    #[test]
    fn test_relative_directory_becomes_absolute() {
        let engine = TemplateEngine::new("./html", true).expect("engine");
        assert!(engine.directory().is_absolute());
        assert!(engine.directory().ends_with("html"));
    }

    #[tokio::test]
    async fn test_render_returns_verbatim_bytes() {
        let dir = TempDir::new().expect("tempdir");
        write_template(&dir, "tictactoe.html", b"<html>...</html>");

        let engine = engine(&dir, true);
        let content = engine.render("tictactoe.html").await.expect("render");
        assert_eq!(&content[..], b"<html>...</html>");
    }

    #[tokio::test]
    async fn test_repeated_renders_are_identical() {
        let dir = TempDir::new().expect("tempdir");
        write_template(&dir, "tictactoe.html", b"<html>game</html>");

        let engine = engine(&dir, true);
        let first = engine.render("tictactoe.html").await.expect("render");
        let second = engine.render("tictactoe.html").await.expect("render");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_missing_template_is_not_found() {
        let dir = TempDir::new().expect("tempdir");

        let engine = engine(&dir, true);
        let err = engine.render("missing.html").await.expect_err("no file");
        assert!(matches!(err, TemplateError::NotFound(name) if name == "missing.html"));
    }

    #[tokio::test]
    async fn test_auto_reload_picks_up_modified_file() {
        let dir = TempDir::new().expect("tempdir");
        write_template(&dir, "tictactoe.html", b"version one");

        let engine = engine(&dir, true);
        assert_eq!(
            &engine.render("tictactoe.html").await.expect("render")[..],
            b"version one"
        );

        write_template(&dir, "tictactoe.html", b"version two");
        // Force a distinct mtime; coarse filesystem timestamps would
        // otherwise make the rewrite invisible to the freshness check
        let file = std::fs::File::options()
            .write(true)
            .open(dir.path().join("tictactoe.html"))
            .expect("open");
        file.set_modified(SystemTime::now() + Duration::from_secs(2))
            .expect("set mtime");

        assert_eq!(
            &engine.render("tictactoe.html").await.expect("render")[..],
            b"version two"
        );
    }

    #[tokio::test]
    async fn test_auto_reload_fails_after_delete() {
        let dir = TempDir::new().expect("tempdir");
        write_template(&dir, "tictactoe.html", b"<html></html>");

        let engine = engine(&dir, true);
        engine.render("tictactoe.html").await.expect("render");

        std::fs::remove_file(dir.path().join("tictactoe.html")).expect("delete");
        let err = engine.render("tictactoe.html").await.expect_err("deleted");
        assert!(matches!(err, TemplateError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_cache_forever_serves_cached_after_delete() {
        let dir = TempDir::new().expect("tempdir");
        write_template(&dir, "tictactoe.html", b"<html></html>");

        let engine = engine(&dir, false);
        engine.render("tictactoe.html").await.expect("render");

        std::fs::remove_file(dir.path().join("tictactoe.html")).expect("delete");
        let content = engine.render("tictactoe.html").await.expect("cached");
        assert_eq!(&content[..], b"<html></html>");
    }

    #[tokio::test]
    async fn test_cache_forever_first_miss_is_not_found() {
        let dir = TempDir::new().expect("tempdir");

        let engine = engine(&dir, false);
        let err = engine.render("tictactoe.html").await.expect_err("no file");
        assert!(matches!(err, TemplateError::NotFound(_)));
    }
}
