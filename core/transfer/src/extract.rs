//! Media extraction through an external engine.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use clipferry_common::{Error, Result};

/// Media written to the staging area by an extractor.
#[derive(Debug, Clone)]
pub struct ExtractedMedia {
    /// Final path of the written file.
    pub path: PathBuf,
    /// Container extension the engine reported (e.g., "mp4").
    pub extension: String,
    /// Size of the written file.
    pub bytes_written: u64,
}

/// External engine that fetches a remote video onto local disk.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Fetch `source_url` and write the media next to `destination`.
    ///
    /// `destination` carries no extension; the engine appends the container
    /// format it resolves.
    ///
    /// # Errors
    /// - Source unreachable or unsupported; the engine's own detail is
    ///   surfaced verbatim
    async fn extract(&self, source_url: &str, destination: &Path) -> Result<ExtractedMedia>;
}

/// Extractor backed by the yt-dlp binary.
pub struct YtDlpExtractor {
    binary: PathBuf,
}

impl YtDlpExtractor {
    /// Create an extractor spawning the given binary.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    async fn extract(&self, source_url: &str, destination: &Path) -> Result<ExtractedMedia> {
        let template = format!("{}.%(ext)s", destination.display());

        let output = Command::new(&self.binary)
            .kill_on_drop(true)
            .arg("--no-playlist")
            .arg("--no-progress")
            .arg("--no-simulate")
            .arg("--print")
            .arg("after_move:filepath")
            .arg("--output")
            .arg(&template)
            .arg(source_url)
            .output()
            .await
            .map_err(|e| {
                Error::Extraction(format!("Failed to launch {}: {}", self.binary.display(), e))
            })?;

        if !output.status.success() {
            return Err(Error::Extraction(failure_detail(&output.stderr)));
        }

        // The engine prints the final path once the file is in place.
        let stdout = String::from_utf8_lossy(&output.stdout);
        let path = stdout
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .map(|line| PathBuf::from(line.trim()))
            .ok_or_else(|| {
                Error::Extraction("Extractor did not report an output file".to_string())
            })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4")
            .to_string();

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| Error::Extraction(format!("Extractor output missing: {}", e)))?;

        tracing::debug!(
            path = %path.display(),
            bytes = metadata.len(),
            "Extraction finished"
        );

        Ok(ExtractedMedia {
            path,
            extension,
            bytes_written: metadata.len(),
        })
    }
}

/// Pick the engine's own error line out of its stderr.
fn failure_detail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    text.lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| "Extractor exited with an error".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_failure_detail_picks_last_error_line() {
        let stderr = b"WARNING: something minor\nERROR: unsupported URL\n\n";
        assert_eq!(failure_detail(stderr), "ERROR: unsupported URL");
        assert_eq!(failure_detail(b""), "Extractor exited with an error");
    }

    #[tokio::test]
    async fn test_missing_binary_is_extraction_error() {
        let extractor = YtDlpExtractor::new("/nonexistent/yt-dlp");
        let temp = TempDir::new().unwrap();

        let result = extractor
            .extract("https://example.com/v/123", &temp.path().join("clip"))
            .await;
        assert!(matches!(result, Err(Error::Extraction(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_reported_path_is_resolved() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let media = temp.path().join("clip.mp4");
        std::fs::write(&media, b"media bytes").unwrap();

        // Stand-in engine: writes nothing, reports the prepared file.
        let script = temp.path().join("fake-extractor");
        std::fs::write(&script, format!("#!/bin/sh\necho {}\n", media.display())).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let extractor = YtDlpExtractor::new(&script);
        let extracted = extractor
            .extract("https://example.com/v/123", &temp.path().join("clip"))
            .await
            .unwrap();

        assert_eq!(extracted.path, media);
        assert_eq!(extracted.extension, "mp4");
        assert_eq!(extracted.bytes_written, 11);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_engine_stderr_surfaces_verbatim() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let script = temp.path().join("fake-extractor");
        std::fs::write(&script, "#!/bin/sh\necho 'ERROR: unsupported URL' >&2\nexit 1\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let extractor = YtDlpExtractor::new(&script);
        let result = extractor
            .extract("https://example.com/v/123", &temp.path().join("clip"))
            .await;

        match result {
            Err(Error::Extraction(detail)) => assert_eq!(detail, "ERROR: unsupported URL"),
            other => panic!("Expected extraction error, got {:?}", other),
        }
    }
}
