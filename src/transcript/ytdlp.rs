//! Subtitle download through the yt-dlp command line tool.

use super::vtt::parse_vtt;
use super::TranscriptStrategy;
use crate::config::TranscriptSettings;
use crate::error::{LingoError, Result};
use crate::models::CaptionItem;
use crate::process::{BoundedCommand, ProcessLimiter, Termination};
use crate::youtube::watch_url;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const WORKDIR_PREFIX: &str = "subs-";

/// Downloads subtitles (manual or auto-generated) with yt-dlp and parses the VTT file.
pub struct YtDlpStrategy {
    executable: String,
    languages: Vec<String>,
    timeout: Duration,
    temp_root: PathBuf,
    limiter: ProcessLimiter,
}

impl YtDlpStrategy {
    pub fn new(settings: &TranscriptSettings, temp_root: PathBuf, limiter: ProcessLimiter) -> Self {
        Self {
            executable: settings.ytdlp_path.clone(),
            languages: settings.languages.clone(),
            timeout: Duration::from_secs(settings.ytdlp_timeout_seconds),
            temp_root,
            limiter,
        }
    }

    /// `--sub-langs` value: each language plus its regional variants.
    fn sub_langs(&self) -> String {
        self.languages
            .iter()
            .map(|lang| format!("{}.*", lang))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn command(&self, output_dir: &Path, video_id: &str) -> BoundedCommand {
        let template = output_dir.join("%(id)s");

        BoundedCommand::new(&self.executable)
            .args([
                "--skip-download",
                "--write-auto-subs",
                "--write-subs",
                "--no-playlist",
                "--sub-langs",
            ])
            .arg(self.sub_langs())
            .args(["--sub-format", "vtt", "-o"])
            .arg(template.to_string_lossy())
            .arg(watch_url(video_id))
            .timeout(self.timeout)
            .limiter(self.limiter.clone())
    }
}

#[async_trait]
impl TranscriptStrategy for YtDlpStrategy {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    #[instrument(skip(self))]
    async fn fetch(&self, video_id: &str) -> Result<Vec<CaptionItem>> {
        tokio::fs::create_dir_all(&self.temp_root).await?;

        // Removed on drop, whichever way this function exits.
        let workdir = tempfile::Builder::new()
            .prefix(WORKDIR_PREFIX)
            .tempdir_in(&self.temp_root)?;

        let output = self.command(workdir.path(), video_id).run().await?;

        match output.termination {
            Termination::TimedOut => {
                return Err(LingoError::UpstreamTimeout(format!(
                    "yt-dlp did not finish within {}s",
                    self.timeout.as_secs()
                )))
            }
            Termination::OutputLimit => {
                return Err(LingoError::UpstreamFailure(
                    "yt-dlp produced too much output".to_string(),
                ))
            }
            Termination::Exited(_) => {}
        }

        let Some(path) = pick_subtitle_file(workdir.path(), &self.languages)? else {
            if output.success() {
                debug!("yt-dlp found no subtitles");
                return Ok(Vec::new());
            }
            return Err(LingoError::UpstreamFailure(format!(
                "yt-dlp exited with {:?}: {}",
                output.exit_code(),
                output.stderr_tail(300)
            )));
        };

        let content = tokio::fs::read_to_string(&path).await?;
        let items = parse_vtt(&content);

        info!(
            file = ?path.file_name(),
            items = items.len(),
            "Parsed yt-dlp subtitles"
        );
        Ok(items)
    }
}

/// Choose the downloaded `.vtt` file that best matches the preferred languages.
///
/// yt-dlp names files `<id>.<lang>.vtt`; an exact language match wins over a regional
/// variant, and earlier languages win over later ones.
fn pick_subtitle_file(dir: &Path, languages: &[String]) -> Result<Option<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("vtt"))
        .collect();

    let rank = |path: &PathBuf| -> usize {
        let lang = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|stem| stem.rsplit_once('.'))
            .map(|(_, lang)| lang.to_string())
            .unwrap_or_default();

        languages
            .iter()
            .enumerate()
            .find_map(|(i, wanted)| {
                if lang == *wanted {
                    Some(i * 2)
                } else if lang.starts_with(&format!("{}-", wanted)) {
                    Some(i * 2 + 1)
                } else {
                    None
                }
            })
            .unwrap_or(usize::MAX)
    };

    files.sort_by(|a, b| rank(a).cmp(&rank(b)).then_with(|| a.cmp(b)));
    Ok(files.into_iter().next())
}

/// Remove scratch directories left behind by a process that was killed outright.
///
/// Only directories untouched for at least `older_than` are removed, so downloads that
/// are still running keep theirs. Returns the number of directories removed.
pub fn sweep_stale_workdirs(temp_root: &Path, older_than: Duration) -> Result<usize> {
    let entries = match std::fs::read_dir(temp_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        if !entry.file_name().to_string_lossy().starts_with(WORKDIR_PREFIX) {
            continue;
        }
        let Ok(meta) = entry.metadata() else { continue };
        if !meta.is_dir() {
            continue;
        }

        let age = meta
            .modified()
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .unwrap_or_default();
        if age < older_than {
            continue;
        }

        match std::fs::remove_dir_all(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %entry.path().display(), error = %e, "Failed to remove stale scratch directory"),
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn langs(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pick_subtitle_file_prefers_exact_language() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["abc12345678.en-GB.vtt", "abc12345678.en.vtt", "abc12345678.de.vtt", "notes.txt"] {
            std::fs::write(dir.path().join(name), "WEBVTT\n").unwrap();
        }

        let picked = pick_subtitle_file(dir.path(), &langs(&["en"])).unwrap().unwrap();
        assert_eq!(picked.file_name().unwrap(), "abc12345678.en.vtt");

        let picked = pick_subtitle_file(dir.path(), &langs(&["de", "en"])).unwrap().unwrap();
        assert_eq!(picked.file_name().unwrap(), "abc12345678.de.vtt");
    }

    #[test]
    fn test_pick_subtitle_file_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(pick_subtitle_file(dir.path(), &langs(&["en"])).unwrap().is_none());
    }

    #[test]
    fn test_sub_langs() {
        let settings = TranscriptSettings {
            languages: langs(&["en", "es"]),
            ..Default::default()
        };
        let strategy = YtDlpStrategy::new(&settings, PathBuf::from("/tmp"), ProcessLimiter::new(1));
        assert_eq!(strategy.sub_langs(), "en.*,es.*");
    }

    #[test]
    fn test_sweep_stale_workdirs() {
        let root = tempfile::tempdir().unwrap();
        let stale = root.path().join("subs-abc123");
        std::fs::create_dir(&stale).unwrap();
        std::fs::write(stale.join("abc12345678.en.vtt"), "WEBVTT\n").unwrap();
        std::fs::create_dir(root.path().join("keep-me")).unwrap();
        std::fs::write(root.path().join("subs-file"), "not a dir").unwrap();

        // Fresh directories survive a sweep with a grace period.
        assert_eq!(sweep_stale_workdirs(root.path(), Duration::from_secs(3600)).unwrap(), 0);
        assert!(stale.exists());

        assert_eq!(sweep_stale_workdirs(root.path(), Duration::ZERO).unwrap(), 1);
        assert!(!stale.exists());
        assert!(root.path().join("keep-me").exists());
        assert!(root.path().join("subs-file").exists());

        assert_eq!(sweep_stale_workdirs(&root.path().join("missing"), Duration::ZERO).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_executable_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let settings = TranscriptSettings {
            ytdlp_path: "lingo-no-such-yt-dlp".to_string(),
            ..Default::default()
        };
        let strategy = YtDlpStrategy::new(&settings, root.path().join("tmp"), ProcessLimiter::new(1));

        let err = strategy.fetch("abc12345678").await.unwrap_err();
        assert!(matches!(err, LingoError::ToolNotFound(_)));

        // The scratch directory is cleaned up on the error path too.
        let leftovers = std::fs::read_dir(root.path().join("tmp")).unwrap().count();
        assert_eq!(leftovers, 0);
    }
}
