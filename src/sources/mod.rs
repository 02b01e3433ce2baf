pub mod youtube;

use async_trait::async_trait;

use crate::{audio::track::Track, error::PlayerResult};

pub use youtube::YtDlpResolver;

/// Convierte consultas en pistas reproducibles
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackResolver: Send + Sync {
    /// Resuelve una URL o texto libre a la mejor coincidencia
    async fn resolve(&self, query: &str) -> PlayerResult<Track>;

    /// Busca una pista relacionada con `seed` para el autoplay
    async fn related(&self, seed: &Track) -> PlayerResult<Track>;
}

/// Verifica si la consulta es una URL http(s)
pub fn is_url(query: &str) -> bool {
    url::Url::parse(query.trim())
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_detection() {
        assert!(is_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_url(" http://example.com/song.mp3 "));
        assert!(!is_url("lofi beats"));
        assert!(!is_url("ftp://example.com/song.mp3"));
    }
}
