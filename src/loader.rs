//! Policy list loader with optional auto-download.
//!
//! Resolves the `public_suffix_list.dat` path, refreshes it from the
//! upstream URL when missing or stale, then parses and compiles it.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::compile::{compile, CompileOptions};
use crate::database::SuffixDatabase;
use crate::error::{PslError, Result};
use crate::parser::{parse_rules, parse_rules_from_file};

/// Default update interval: 7 days
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Upstream location of the policy list
pub const DEFAULT_LIST_URL: &str = "https://publicsuffix.org/list/public_suffix_list.dat";

/// File name used inside a data directory
pub const DEFAULT_FILENAME: &str = "public_suffix_list.dat";

/// Serializable loader configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Explicit policy file path (overrides `data_dir`)
    pub path: Option<PathBuf>,
    /// Directory holding `public_suffix_list.dat`
    pub data_dir: Option<PathBuf>,
    /// Download URL; `None` uses [`DEFAULT_LIST_URL`]
    pub url: Option<String>,
    pub update_interval_secs: u64,
    pub include_private: bool,
    pub auto_download: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            path: None,
            data_dir: None,
            url: None,
            update_interval_secs: DEFAULT_UPDATE_INTERVAL.as_secs(),
            include_private: true,
            auto_download: false,
        }
    }
}

impl LoaderConfig {
    /// Parse a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            PslError::ConfigError(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&text)
    }
}

/// Loads and compiles the public suffix list
pub struct SuffixLoader {
    path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    url: Option<String>,
    update_interval: Duration,
    options: CompileOptions,
    download_lock: Mutex<()>,
}

impl SuffixLoader {
    /// Create a new loader (no download URL, default interval and options)
    pub fn new() -> Self {
        Self {
            path: None,
            data_dir: None,
            url: None,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            options: CompileOptions::default(),
            download_lock: Mutex::new(()),
        }
    }

    /// Build a loader from a configuration
    pub fn from_config(config: &LoaderConfig) -> Self {
        let mut loader = Self::new()
            .with_update_interval(Duration::from_secs(config.update_interval_secs))
            .with_options(CompileOptions::new().with_private(config.include_private));
        if let Some(ref path) = config.path {
            loader = loader.with_path(path);
        }
        if let Some(ref dir) = config.data_dir {
            loader = loader.with_data_dir(dir);
        }
        if config.auto_download {
            loader = loader.with_url(config.url.as_deref().unwrap_or(DEFAULT_LIST_URL));
        }
        loader
    }

    /// Set the policy file path
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set data directory
    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Enable downloads from `url`
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set update interval for checking file freshness
    /// Default is 7 days (DEFAULT_UPDATE_INTERVAL)
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    /// Set compile options
    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolved policy file path
    pub fn list_path(&self) -> PathBuf {
        if let Some(ref path) = self.path {
            return path.clone();
        }

        match self.data_dir {
            Some(ref dir) => dir.join(DEFAULT_FILENAME),
            None => PathBuf::from(DEFAULT_FILENAME),
        }
    }

    /// Make sure the policy file exists, downloading it when missing or stale.
    pub fn ensure_list(&self) -> Result<PathBuf> {
        let path = self.list_path();

        if self.should_download(&path) {
            if let Some(ref url) = self.url {
                if let Err(e) = self.download(&path, url) {
                    if !path.exists() {
                        return Err(e);
                    }
                    warn!(error = %e, path = %path.display(), "download failed, using existing file");
                }
            }
        }

        Ok(path)
    }

    /// Load, parse, and compile the policy list.
    pub fn load(&self) -> Result<SuffixDatabase> {
        let path = self.ensure_list()?;
        let rules = parse_rules_from_file(&path)?;
        let db = compile(&rules, &self.options)?;
        info!(
            path = %path.display(),
            rules = rules.len(),
            nodes = db.node_count(),
            "loaded public suffix list"
        );
        Ok(db)
    }

    /// Check if file needs download
    fn should_download(&self, path: &Path) -> bool {
        match fs::metadata(path) {
            Ok(meta) => {
                if meta.len() == 0 {
                    return true;
                }
                match meta.modified() {
                    Ok(mtime) => SystemTime::now()
                        .duration_since(mtime)
                        .map(|d| d > self.update_interval)
                        .unwrap_or(true),
                    Err(_) => true,
                }
            }
            Err(_) => true,
        }
    }

    /// Download file from URL
    #[cfg(feature = "download")]
    fn download(&self, path: &Path, url: &str) -> Result<()> {
        let _lock = self.download_lock.lock();

        // Double-check after acquiring lock
        if !self.should_download(path) {
            return Ok(());
        }

        debug!(path = %path.display(), url, "downloading public suffix list");

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = path.with_extension("tmp");

        let response = ureq::get(url)
            .call()
            .map_err(|e| PslError::DownloadError(format!("Download failed: {}", e)))?;

        let (_, body) = response.into_parts();
        write_temp_file(&mut body.into_reader(), &tmp_path)?;

        if let Err(e) = verify_list_file(&tmp_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(PslError::DownloadError(format!("Verification failed: {}", e)));
        }

        fs::rename(&tmp_path, path)?;

        info!(path = %path.display(), "downloaded public suffix list");
        Ok(())
    }

    #[cfg(not(feature = "download"))]
    fn download(&self, path: &Path, url: &str) -> Result<()> {
        let _lock = self.download_lock.lock();
        debug!(path = %path.display(), url, "download requested without download support");
        Err(PslError::DownloadError(
            "built without the `download` feature".to_string(),
        ))
    }
}

/// Stream `reader` into `tmp_path`; a partial file is removed on failure.
#[cfg(feature = "download")]
fn write_temp_file(reader: &mut impl std::io::Read, tmp_path: &Path) -> Result<()> {
    use std::io::Write;

    let mut file = fs::File::create(tmp_path)?;
    let written = std::io::copy(reader, &mut file).and_then(|_| file.flush());
    drop(file);
    if let Err(e) = written {
        let _ = fs::remove_file(tmp_path);
        return Err(e.into());
    }
    Ok(())
}

impl Default for SuffixLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Verify a policy file parses and holds at least one rule
pub fn verify_list_file(path: impl AsRef<Path>) -> Result<()> {
    let text = fs::read_to_string(path.as_ref())?;
    let rules = parse_rules(&text)?;
    if rules.is_empty() {
        return Err(PslError::InvalidRule(format!(
            "no rules in {}",
            path.as_ref().display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[cfg(feature = "download")]
    #[test]
    fn test_interrupted_download_leaves_no_temp_file() {
        struct Interrupted(bool);

        impl std::io::Read for Interrupted {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if self.0 {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        "connection reset",
                    ));
                }
                self.0 = true;
                let chunk = b"com\nco.uk\n";
                buf[..chunk.len()].copy_from_slice(chunk);
                Ok(chunk.len())
            }
        }

        let dir = temp_dir("psl_engine_test_loader_interrupted");
        let tmp_path = dir.join("public_suffix_list.tmp");

        let err = write_temp_file(&mut Interrupted(false), &tmp_path).unwrap_err();
        assert!(matches!(err, PslError::IoError(_)));
        assert!(!tmp_path.exists());

        write_temp_file(&mut &b"com\n"[..], &tmp_path).unwrap();
        assert_eq!(fs::read_to_string(&tmp_path).unwrap(), "com\n");
    }

    #[test]
    fn test_list_path_resolution() {
        let loader = SuffixLoader::new();
        assert_eq!(loader.list_path(), PathBuf::from(DEFAULT_FILENAME));

        let loader = SuffixLoader::new().with_data_dir("/var/lib/psl");
        assert_eq!(
            loader.list_path(),
            PathBuf::from("/var/lib/psl").join(DEFAULT_FILENAME)
        );

        let loader = SuffixLoader::new()
            .with_data_dir("/var/lib/psl")
            .with_path("/etc/psl.dat");
        assert_eq!(loader.list_path(), PathBuf::from("/etc/psl.dat"));
    }

    #[test]
    fn test_load_local_file() {
        let dir = temp_dir("psl_engine_test_loader_local");
        fs::write(dir.join(DEFAULT_FILENAME), "com\nuk\nco.uk\n").unwrap();

        let db = SuffixLoader::new().with_data_dir(&dir).load().unwrap();
        assert_eq!(db.registrable_domain("www.example.co.uk"), Some("example.co.uk"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_fresh_file_is_not_downloaded() {
        let dir = temp_dir("psl_engine_test_loader_fresh");
        let path = dir.join(DEFAULT_FILENAME);
        fs::write(&path, "com\n").unwrap();

        // An unroutable URL would fail if a download were attempted
        let loader = SuffixLoader::new()
            .with_path(&path)
            .with_url("http://127.0.0.1:9/public_suffix_list.dat");
        assert!(!loader.should_download(&path));
        assert_eq!(loader.ensure_list().unwrap(), path);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_stale_or_empty_file_needs_download() {
        let dir = temp_dir("psl_engine_test_loader_stale");
        let path = dir.join(DEFAULT_FILENAME);

        let loader = SuffixLoader::new().with_update_interval(Duration::ZERO);
        assert!(loader.should_download(&path));

        fs::write(&path, "").unwrap();
        assert!(SuffixLoader::new().should_download(&path));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_failed_download_falls_back_to_existing_file() {
        let dir = temp_dir("psl_engine_test_loader_fallback");
        let path = dir.join(DEFAULT_FILENAME);
        fs::write(&path, "com\n").unwrap();

        let loader = SuffixLoader::new()
            .with_path(&path)
            .with_update_interval(Duration::ZERO)
            .with_url("http://127.0.0.1:9/public_suffix_list.dat");
        let db = loader.load().unwrap();
        assert_eq!(db.registrable_domain("a.example.com"), Some("example.com"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file_without_url_fails() {
        let dir = temp_dir("psl_engine_test_loader_missing");
        let result = SuffixLoader::new().with_data_dir(&dir).load();
        assert!(result.is_err());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_verify_list_file() {
        let dir = temp_dir("psl_engine_test_loader_verify");
        let good = dir.join("good.dat");
        let empty = dir.join("empty.dat");
        let bad = dir.join("bad.dat");
        fs::write(&good, "// comment\ncom\n").unwrap();
        fs::write(&empty, "// only comments\n").unwrap();
        fs::write(&bad, "<html>not a list</html>\n").unwrap();

        assert!(verify_list_file(&good).is_ok());
        assert!(verify_list_file(&empty).is_err());
        assert!(verify_list_file(&bad).is_err());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_config_from_json() {
        let config = LoaderConfig::from_json(
            r#"{"data_dir": "/var/lib/psl", "include_private": false, "auto_download": true}"#,
        )
        .unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/psl")));
        assert!(!config.include_private);
        assert_eq!(config.update_interval_secs, DEFAULT_UPDATE_INTERVAL.as_secs());

        let loader = SuffixLoader::from_config(&config);
        assert_eq!(loader.url.as_deref(), Some(DEFAULT_LIST_URL));
        assert!(!loader.options.include_private);
        assert_eq!(
            loader.list_path(),
            PathBuf::from("/var/lib/psl").join(DEFAULT_FILENAME)
        );
    }

    #[test]
    fn test_config_without_download_has_no_url() {
        let loader = SuffixLoader::from_config(&LoaderConfig::default());
        assert!(loader.url.is_none());
    }

    #[test]
    fn test_config_rejects_bad_json() {
        assert!(matches!(
            LoaderConfig::from_json("{not json"),
            Err(PslError::JsonError(_))
        ));
        assert!(matches!(
            LoaderConfig::from_json_file("/nonexistent/psl.json"),
            Err(PslError::ConfigError(_))
        ));
    }
}
