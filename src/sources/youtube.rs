use async_process::Command;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::{sync::OnceLock, time::Duration};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::{is_url, TrackResolver};
use crate::{
    audio::track::{format_duration, Track},
    error::{PlayerError, PlayerResult},
};

/// Resultados que se piden a yt-dlp para el autoplay
const RELATED_CANDIDATES: usize = 5;

/// Resolver basado en yt-dlp
pub struct YtDlpResolver {
    program: String,
    rate_limiter: Semaphore,
}

/// Información extraída de yt-dlp
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    id: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    thumbnails: Option<Vec<Thumbnail>>,
    webpage_url: Option<String>,
    url: Option<String>,
    is_live: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl YtDlpInfo {
    fn into_track(self) -> Option<Track> {
        let locator = self
            .webpage_url
            .or(self.url)
            .or_else(|| {
                self.id
                    .as_ref()
                    .map(|id| format!("https://www.youtube.com/watch?v={}", id))
            })?;
        let title = self.title.unwrap_or_else(|| locator.clone());

        let duration = match (self.is_live, self.duration) {
            (Some(true), _) => "🔴 EN VIVO".to_string(),
            (_, Some(secs)) if secs > 0.0 => format_duration(Duration::from_secs_f64(secs)),
            _ => "--:--".to_string(),
        };

        let thumbnail = self
            .thumbnail
            .or_else(|| self.thumbnails.and_then(|t| t.into_iter().last().map(|t| t.url)));

        let track = Track::new(title, locator, duration);
        Some(match thumbnail {
            Some(thumbnail) => track.with_thumbnail(thumbnail),
            None => track,
        })
    }
}

/// Una línea JSON por resultado; las que no se entienden se ignoran
fn parse_tracks(stdout: &str) -> Vec<Track> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<YtDlpInfo>(line) {
            Ok(info) => info.into_track(),
            Err(e) => {
                debug!("Línea de yt-dlp ignorada: {}", e);
                None
            }
        })
        .collect()
}

impl YtDlpResolver {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            // Limitar procesos concurrentes para evitar rate limiting
            rate_limiter: Semaphore::new(3),
        }
    }

    async fn run(&self, args: &[&str]) -> PlayerResult<String> {
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| PlayerError::ResolutionFailed(e.to_string()))?;

        let output = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                warn!("⚠️ No se pudo ejecutar {}: {}", self.program, e);
                PlayerError::ResolutionFailed(format!("{} no disponible", self.program))
            })?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            warn!("⚠️ yt-dlp terminó con error: {}", error.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Busca hasta `limit` resultados para un texto libre
    async fn search(&self, query: &str, limit: usize) -> PlayerResult<Vec<Track>> {
        info!("🔍 Buscando en YouTube: {}", query);
        let search_query = format!("ytsearch{}:{}", limit, query);
        let stdout = self
            .run(&[
                "--dump-json",
                "--flat-playlist",
                "--skip-download",
                "--no-warnings",
                &search_query,
            ])
            .await?;
        Ok(parse_tracks(&stdout))
    }

    async fn lookup(&self, url: &str) -> PlayerResult<Track> {
        debug!("📊 Obteniendo info de: {}", url);
        let stdout = self
            .run(&["--no-playlist", "--dump-json", "--skip-download", "--no-warnings", url])
            .await?;
        parse_tracks(&stdout)
            .into_iter()
            .next()
            .ok_or_else(|| PlayerError::ResolutionFailed(url.to_string()))
    }
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    async fn resolve(&self, query: &str) -> PlayerResult<Track> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PlayerError::invalid("Debes indicar una canción o URL"));
        }

        if is_url(query) {
            return self.lookup(query).await;
        }

        self.search(query, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PlayerError::ResolutionFailed(query.to_string()))
    }

    async fn related(&self, seed: &Track) -> PlayerResult<Track> {
        self.search(seed.title(), RELATED_CANDIDATES)
            .await?
            .into_iter()
            .find(|candidate| candidate.locator() != seed.locator())
            .ok_or_else(|| PlayerError::ResolutionFailed(seed.title().to_string()))
    }
}

/// Verifica si es una URL de YouTube
pub fn is_youtube_url(url: &str) -> bool {
    static YOUTUBE: OnceLock<Regex> = OnceLock::new();
    YOUTUBE
        .get_or_init(|| {
            Regex::new(
                r"^(https?://)?(www\.)?(youtube\.com/(watch\?v=|embed/|v/|shorts/)|youtu\.be/|music\.youtube\.com/)",
            )
            .expect("valid YouTube regex")
        })
        .is_match(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_youtube_url_detection() {
        assert!(is_youtube_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(is_youtube_url("https://music.youtube.com/watch?v=test"));
        assert!(!is_youtube_url("https://example.com/video"));
    }

    #[test]
    fn test_parse_flat_search_output() {
        let stdout = concat!(
            r#"{"id":"abc","title":"Lofi Beats","duration":215.0,"url":"https://www.youtube.com/watch?v=abc","thumbnails":[{"url":"small.jpg"},{"url":"big.jpg"}]}"#,
            "\n",
            "not json\n",
            r#"{"id":"live1","title":"Radio 24/7","is_live":true,"webpage_url":"https://www.youtube.com/watch?v=live1"}"#,
            "\n"
        );

        let tracks = parse_tracks(stdout);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].title(), "Lofi Beats");
        assert_eq!(tracks[0].duration(), "3:35");
        assert_eq!(tracks[0].locator(), "https://www.youtube.com/watch?v=abc");
        assert_eq!(tracks[0].thumbnail(), Some("big.jpg"));
        assert_eq!(tracks[1].duration(), "🔴 EN VIVO");
    }

    #[test]
    fn test_locator_falls_back_to_id() {
        let tracks = parse_tracks(r#"{"id":"xyz","title":"Only id"}"#);
        assert_eq!(tracks[0].locator(), "https://www.youtube.com/watch?v=xyz");
        assert_eq!(tracks[0].duration(), "--:--");
    }
}
