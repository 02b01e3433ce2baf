//! Adaptadores de songbird para las interfaces del gestor de colas.

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::{ChildContainer, HttpRequest, Input, YoutubeDl},
    tracks::{Track as SongbirdTrack, TrackHandle},
    Songbird,
};
use std::{
    process::{Command, Stdio},
    sync::Arc,
};
use tracing::{debug, info, warn};

use super::events::register_track_events;
use crate::{
    audio::session::{
        AudioBackend, EventSink, SessionHandle, StartRequest, VoiceConnection, VoiceConnector,
    },
    error::{PlayerError, PlayerResult},
    sources::youtube::is_youtube_url,
};

/// Une al bot a canales de voz a través de songbird
pub struct SongbirdConnector {
    songbird: Arc<Songbird>,
}

impl SongbirdConnector {
    pub fn new(songbird: Arc<Songbird>) -> Self {
        Self { songbird }
    }
}

#[async_trait]
impl VoiceConnector for SongbirdConnector {
    async fn join(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> PlayerResult<Box<dyn VoiceConnection>> {
        match self.songbird.join(guild_id, channel_id).await {
            Ok(_call) => {
                info!("🔊 Conectado al canal de voz {} en guild {}", channel_id, guild_id);
                Ok(Box::new(SongbirdConnection {
                    songbird: Arc::clone(&self.songbird),
                    guild_id,
                    channel_id,
                }))
            }
            Err(e) => {
                // Un join fallido puede dejar un Call a medias
                if let Err(leave) = self.songbird.remove(guild_id).await {
                    debug!("Limpieza tras join fallido en {}: {:?}", guild_id, leave);
                }
                Err(PlayerError::ConnectionError(e.to_string()))
            }
        }
    }
}

struct SongbirdConnection {
    songbird: Arc<Songbird>,
    guild_id: GuildId,
    channel_id: ChannelId,
}

#[async_trait]
impl VoiceConnection for SongbirdConnection {
    fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    async fn release(&mut self) {
        match self.songbird.remove(self.guild_id).await {
            Ok(()) => info!("👋 Desconectado del canal de voz en guild {}", self.guild_id),
            Err(e) => warn!("⚠️ Error al salir del canal en guild {}: {:?}", self.guild_id, e),
        }
    }
}

/// Reproduce pistas en el `Call` de songbird del servidor.
///
/// Sin filtros, YouTube se reproduce con el `YoutubeDl` de songbird y otras URL
/// con `HttpRequest`. Con filtros, yt-dlp se encadena a ffmpeg `-af` y la
/// salida de ffmpeg alimenta a songbird.
pub struct SongbirdBackend {
    songbird: Arc<Songbird>,
    http: reqwest::Client,
    ytdlp: String,
    ffmpeg: String,
}

impl SongbirdBackend {
    pub fn new(songbird: Arc<Songbird>, ytdlp: impl Into<String>, ffmpeg: impl Into<String>) -> Self {
        Self {
            songbird,
            http: reqwest::Client::new(),
            ytdlp: ytdlp.into(),
            ffmpeg: ffmpeg.into(),
        }
    }

    fn build_input(&self, request: &StartRequest) -> PlayerResult<Input> {
        let locator = request.track.locator().to_string();
        match request.filters.to_ffmpeg_arg() {
            Some(chain) => self.filtered_input(&locator, &chain),
            None if is_youtube_url(&locator) => Ok(YoutubeDl::new(self.http.clone(), locator).into()),
            None => Ok(HttpRequest::new(self.http.clone(), locator).into()),
        }
    }

    /// yt-dlp → ffmpeg -af <cadena> → songbird
    fn filtered_input(&self, locator: &str, chain: &str) -> PlayerResult<Input> {
        debug!("🎛️ Aplicando filtros [{}] a {}", chain, locator);

        let mut ytdlp = Command::new(&self.ytdlp)
            .args(["-f", "bestaudio/best", "-o", "-", "-q", "--no-playlist", locator])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PlayerError::SessionError(format!("No se pudo iniciar yt-dlp: {}", e)))?;

        let Some(download) = ytdlp.stdout.take() else {
            let _ = ytdlp.kill();
            return Err(PlayerError::SessionError("yt-dlp sin salida".to_string()));
        };

        let ffmpeg = Command::new(&self.ffmpeg)
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-i",
                "pipe:0",
                "-af",
                chain,
                "-f",
                "wav",
                "-ar",
                "48000",
                "-ac",
                "2",
                "pipe:1",
            ])
            .stdin(Stdio::from(download))
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn();

        match ffmpeg {
            Ok(ffmpeg) => Ok(ChildContainer::from(vec![ytdlp, ffmpeg]).into()),
            Err(e) => {
                let _ = ytdlp.kill();
                Err(PlayerError::SessionError(format!("No se pudo iniciar ffmpeg: {}", e)))
            }
        }
    }
}

/// Volumen 1-100 a la ganancia lineal de songbird
fn volume_to_gain(level: u8) -> f32 {
    f32::from(level) / 100.0
}

#[async_trait]
impl AudioBackend for SongbirdBackend {
    async fn start(
        &self,
        guild_id: GuildId,
        request: StartRequest,
        events: EventSink,
    ) -> PlayerResult<Box<dyn SessionHandle>> {
        let call = self
            .songbird
            .get(guild_id)
            .ok_or_else(|| PlayerError::SessionError("sin conexión de voz".to_string()))?;
        let input = self.build_input(&request)?;

        // Se crea en pausa para registrar los eventos antes del primer `Play`
        let track = SongbirdTrack::new(input)
            .volume(volume_to_gain(request.volume))
            .pause();
        let handle = {
            let mut call = call.lock().await;
            call.play_only(track)
        };

        if let Err(e) = register_track_events(&handle, &events) {
            let _ = handle.stop();
            return Err(e);
        }
        handle
            .play()
            .map_err(|e| PlayerError::SessionError(e.to_string()))?;

        Ok(Box::new(SongbirdSession { handle }))
    }
}

struct SongbirdSession {
    handle: TrackHandle,
}

impl SessionHandle for SongbirdSession {
    fn stop(&self) {
        if let Err(e) = self.handle.stop() {
            debug!("stop sobre un track terminado: {}", e);
        }
    }

    fn pause(&self) {
        if let Err(e) = self.handle.pause() {
            debug!("pause sobre un track terminado: {}", e);
        }
    }

    fn resume(&self) {
        if let Err(e) = self.handle.play() {
            debug!("play sobre un track terminado: {}", e);
        }
    }

    fn set_volume(&self, level: u8) {
        if let Err(e) = self.handle.set_volume(volume_to_gain(level)) {
            debug!("set_volume sobre un track terminado: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_to_gain() {
        assert_eq!(volume_to_gain(100), 1.0);
        assert_eq!(volume_to_gain(50), 0.5);
    }
}
