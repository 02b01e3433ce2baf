use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub application_id: u64,
    pub guild_id: Option<u64>, // Para registrar comandos solo en un servidor de pruebas
    pub command_prefix: String,

    // Reproducción
    pub default_volume: u8,
    pub max_queue_size: usize,
    pub filter_restart_delay_ms: u64,
    pub queue_page_size: usize,

    // Presencia
    pub auto_leave_secs: u64,

    // Herramientas externas
    pub ytdlp_path: String,
    pub ffmpeg_path: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN")?,
            application_id: std::env::var("APPLICATION_ID")?.parse()?,
            guild_id: std::env::var("GUILD_ID").ok().and_then(|s| s.parse().ok()),
            command_prefix: std::env::var("COMMAND_PREFIX").unwrap_or_else(|_| "!".to_string()),

            // Reproducción
            default_volume: std::env::var("DEFAULT_VOLUME")
                .unwrap_or_else(|_| "50".to_string())
                .parse()?,
            max_queue_size: std::env::var("MAX_QUEUE_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,
            filter_restart_delay_ms: std::env::var("FILTER_RESTART_DELAY_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()?,
            queue_page_size: std::env::var("QUEUE_PAGE_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,

            // Presencia
            auto_leave_secs: std::env::var("AUTO_LEAVE_SECS")
                .unwrap_or_else(|_| "300".to_string()) // 5 minutos
                .parse()?,

            // Herramientas externas
            ytdlp_path: std::env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string()),
            ffmpeg_path: std::env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - The Discord token must not be empty
    /// - Default volume must be within 1..=100
    /// - Queue size and page size must be greater than 0
    /// - The command prefix must not be empty
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("DISCORD_TOKEN must not be empty");
        }

        if !(1..=100).contains(&self.default_volume) {
            anyhow::bail!("Default volume must be between 1 and 100, got: {}", self.default_volume);
        }

        if self.max_queue_size == 0 {
            anyhow::bail!("Max queue size must be greater than 0");
        }

        if self.queue_page_size == 0 {
            anyhow::bail!("Queue page size must be greater than 0");
        }

        if self.command_prefix.trim().is_empty() {
            anyhow::bail!("Command prefix must not be empty");
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// The token is never included.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: App ID {} (Guild: {}), prefix '{}'\n  \
            Playback: {}% vol, {} max queue, {} per page, filter restart {}ms\n  \
            Presence: auto-leave after {}\n  \
            Tools: {} / {}",
            self.application_id,
            self.guild_id.map_or("global".to_string(), |id| id.to_string()),
            self.command_prefix,
            self.default_volume,
            self.max_queue_size,
            self.queue_page_size,
            self.filter_restart_delay_ms,
            humantime::format_duration(self.auto_leave()),
            self.ytdlp_path,
            self.ffmpeg_path,
        )
    }

    pub fn auto_leave(&self) -> Duration {
        Duration::from_secs(self.auto_leave_secs)
    }

    /// Subconjunto que necesita el gestor de colas
    pub fn player_settings(&self) -> PlayerSettings {
        PlayerSettings {
            default_volume: self.default_volume,
            max_queue_size: self.max_queue_size,
            page_size: self.queue_page_size,
            filter_restart_delay: Duration::from_millis(self.filter_restart_delay_ms),
        }
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),
            application_id: 0,
            guild_id: None,
            command_prefix: "!".to_string(),

            default_volume: 50,
            max_queue_size: 100,
            filter_restart_delay_ms: 1000,
            queue_page_size: 10,

            auto_leave_secs: 300,

            ytdlp_path: "yt-dlp".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
        }
    }
}

/// Parámetros de reproducción que comparten todos los servidores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSettings {
    pub default_volume: u8,
    pub max_queue_size: usize,
    pub page_size: usize,
    pub filter_restart_delay: Duration,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Config::default().player_settings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn with_token() -> Config {
        Config {
            discord_token: "token".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_defaults_are_valid_once_token_is_set() {
        assert!(Config::default().validate().is_err());
        assert!(with_token().validate().is_ok());
    }

    #[test]
    fn test_volume_out_of_range_is_rejected() {
        let mut config = with_token();
        config.default_volume = 0;
        assert!(config.validate().is_err());
        config.default_volume = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_player_settings_mirror_config() {
        let settings = with_token().player_settings();
        assert_eq!(settings.default_volume, 50);
        assert_eq!(settings.max_queue_size, 100);
        assert_eq!(settings.page_size, 10);
        assert_eq!(settings.filter_restart_delay, Duration::from_millis(1000));
    }

    #[test]
    fn test_summary_hides_token() {
        let summary = with_token().summary();
        assert!(!summary.contains("token"));
        assert!(summary.contains("5m"));
    }
}
