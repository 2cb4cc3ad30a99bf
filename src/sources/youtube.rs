use async_process::Command;
use regex::Regex;
use serde::Deserialize;
use std::{path::PathBuf, sync::LazyLock, time::Duration};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::TrackRef;
use crate::{config::Config, error::ResolveError};

static YOUTUBE_VIDEO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.|music\.|m\.)?youtu(?:be\.com/watch\?(?:.*&)?v=|\.be/)([\w-]+)")
        .expect("static regex")
});

/// Entrada impresa por `yt-dlp --dump-json`, flat o completa.
#[derive(Debug, Deserialize)]
struct YtDlpEntry {
    id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
}

impl YtDlpEntry {
    fn into_track(self) -> Option<TrackRef> {
        let url = self
            .webpage_url
            .or_else(|| self.id.as_deref().map(watch_url))
            .or(self.url)?;
        let title = self.title.unwrap_or_else(|| url.clone());
        Some(TrackRef::Remote { title, url })
    }
}

fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

/// Resuelve URLs y búsquedas a través de yt-dlp.
pub struct YouTubeResolver {
    program: String,
    cookies: Option<PathBuf>,
    timeout: Duration,
    // Limitar procesos yt-dlp concurrentes
    rate_limiter: Semaphore,
}

impl YouTubeResolver {
    pub fn new(config: &Config) -> Self {
        Self {
            program: config.ytdlp_path.clone(),
            cookies: config.ytdlp_cookies.clone(),
            timeout: config.resolve_timeout,
            rate_limiter: Semaphore::new(3),
        }
    }

    /// Extrae el id de video de un link de YouTube (watch o corto).
    pub fn youtube_video_id(query: &str) -> Option<&str> {
        YOUTUBE_VIDEO
            .captures(query)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    fn is_http_url(query: &str) -> bool {
        url::Url::parse(query)
            .map(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or(false)
    }

    pub async fn resolve(&self, query: &str) -> Result<TrackRef, ResolveError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResolveError::NotFound(String::new()));
        }

        if let Some(id) = Self::youtube_video_id(query) {
            let url = watch_url(id);
            let lookup = self.run(&["--no-playlist", "--dump-json", &url]).await;
            return match lookup {
                Ok(stdout) => Ok(parse_entries(&stdout).unwrap_or(TrackRef::Remote {
                    title: url.clone(),
                    url,
                })),
                Err(ResolveError::Backend(reason)) => {
                    warn!("yt-dlp no pudo obtener metadata de {url}: {reason}");
                    Err(ResolveError::NotFound(query.to_string()))
                }
                Err(e) => Err(e),
            };
        }

        if Self::is_http_url(query) {
            debug!("Using direct URL {query}");
            return Ok(TrackRef::Remote {
                title: query.to_string(),
                url: query.to_string(),
            });
        }

        info!("🔍 Buscando: {query}");
        let search = format!("ytsearch1:{query}");
        let stdout = self
            .run(&["--flat-playlist", "--skip-download", "--dump-json", &search])
            .await?;

        parse_entries(&stdout).ok_or_else(|| ResolveError::NotFound(query.to_string()))
    }

    /// Verifica que yt-dlp se ejecuta, para `--health-check`.
    pub async fn verify(&self) -> anyhow::Result<String> {
        let output = Command::new(&self.program).arg("--version").output().await?;
        if !output.status.success() {
            anyhow::bail!("{} --version exited with {}", self.program, output.status);
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn run(&self, args: &[&str]) -> Result<String, ResolveError> {
        let mut command = Command::new(&self.program);
        command.arg("--no-warnings");
        if let Some(cookies) = &self.cookies {
            command.arg("--cookies").arg(cookies);
        }
        command.args(args);

        self.output(command).await
    }

    /// Ejecuta un comando preparado bajo el límite de concurrencia y `resolve_timeout`.
    async fn output(&self, mut command: Command) -> Result<String, ResolveError> {
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| ResolveError::Backend(e.to_string()))?;

        // Un proceso colgado se mata al expirar el timeout
        command.kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| ResolveError::Timeout(self.timeout))?
            .map_err(|e| ResolveError::Backend(format!("could not run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ResolveError::Backend(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Primera entrada parseable de la salida JSON (una por línea) de yt-dlp.
fn parse_entries(stdout: &str) -> Option<TrackRef> {
    stdout
        .lines()
        .filter_map(|line| serde_json::from_str::<YtDlpEntry>(line).ok())
        .find_map(YtDlpEntry::into_track)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_youtube_url_detection() {
        assert_eq!(
            YouTubeResolver::youtube_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            YouTubeResolver::youtube_video_id("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            YouTubeResolver::youtube_video_id("http://music.youtube.com/watch?list=x&v=a_b-c"),
            Some("a_b-c")
        );
        assert_eq!(YouTubeResolver::youtube_video_id("https://example.com/video"), None);
        assert_eq!(YouTubeResolver::youtube_video_id("never gonna give you up"), None);
    }

    #[test]
    fn http_detection_ignores_plain_text() {
        assert!(YouTubeResolver::is_http_url("https://cdn.example.com/a.mp3"));
        assert!(!YouTubeResolver::is_http_url("ftp://example.com/a.mp3"));
        assert!(!YouTubeResolver::is_http_url("lofi hip hop"));
    }

    #[test]
    fn parses_flat_search_output() {
        let stdout = "garbage line\n\
            {\"id\":\"abc123\",\"title\":\"Lofi Beats\",\"url\":\"https://www.youtube.com/watch?v=abc123\"}\n\
            {\"id\":\"zzz\",\"title\":\"Second\"}\n";
        assert_eq!(
            parse_entries(stdout),
            Some(TrackRef::Remote {
                title: "Lofi Beats".into(),
                url: "https://www.youtube.com/watch?v=abc123".into(),
            })
        );
    }

    fn resolver(timeout: &str) -> YouTubeResolver {
        let config = Config::from_lookup(|key| match key {
            "DISCORD_TOKEN" => Some("token".to_string()),
            "RESOLVE_TIMEOUT" => Some(timeout.to_string()),
            _ => None,
        })
        .unwrap();
        YouTubeResolver::new(&config)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_backend_times_out() {
        let resolver = resolver("50ms");
        let mut command = Command::new("sleep");
        command.arg("5");

        assert_eq!(
            resolver.output(command).await,
            Err(ResolveError::Timeout(Duration::from_millis(50)))
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_backend_reports_stderr() {
        let resolver = resolver("5s");
        let mut command = Command::new("sh");
        command.args(["-c", "echo 'ERROR: blocked' >&2; exit 1"]);

        assert_eq!(
            resolver.output(command).await,
            Err(ResolveError::Backend("ERROR: blocked".to_string()))
        );
    }

    #[tokio::test]
    async fn missing_program_is_a_backend_error() {
        let resolver = YouTubeResolver {
            program: "/nonexistent/yt-dlp".to_string(),
            ..resolver("5s")
        };

        assert!(matches!(
            resolver.resolve("lofi beats").await,
            Err(ResolveError::Backend(_))
        ));
    }

    #[test]
    fn empty_search_output_yields_nothing() {
        assert_eq!(parse_entries(""), None);
        assert_eq!(parse_entries("{\"title\":\"no url\"}"), None);
    }
}
