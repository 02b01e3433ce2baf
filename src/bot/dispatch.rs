use std::{fmt::Write as _, sync::Arc};
use tracing::{info, warn};

use super::{
    request::{Command, CommandRequest},
    settings::SettingsRegistry,
};
use crate::{
    audio::{manager::QueueManager, state::QueueSnapshot},
    error::{PlayerError, PlayerResult},
    sources::TrackResolver,
    voice::OccupancyMonitor,
};

/// Respuesta de texto plano para el autor del comando
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    /// Sólo visible para el autor cuando el origen lo permite
    pub ephemeral: bool,
}

impl Reply {
    pub fn public(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }

    pub fn private(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }
}

/// Single entry point that authorizes a [`CommandRequest`], runs it against
/// the [`QueueManager`] and turns the outcome into a [`Reply`].
pub struct Dispatcher {
    manager: Arc<QueueManager>,
    resolver: Arc<dyn TrackResolver>,
    settings: Arc<SettingsRegistry>,
    occupancy: Arc<OccupancyMonitor>,
}

impl Dispatcher {
    pub fn new(
        manager: Arc<QueueManager>,
        resolver: Arc<dyn TrackResolver>,
        settings: Arc<SettingsRegistry>,
        occupancy: Arc<OccupancyMonitor>,
    ) -> Self {
        Self {
            manager,
            resolver,
            settings,
            occupancy,
        }
    }

    pub async fn dispatch(&self, request: CommandRequest) -> Reply {
        let authorized = request.command.is_read_only()
            || self.settings.is_authorized(request.guild_id, &request.member);

        info!(
            "📝 Comando {} ({:?}) de {} en guild {}",
            request.command.name(),
            request.origin,
            request.user_id,
            request.guild_id
        );

        match self.execute(request, authorized).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!("⚠️ Comando rechazado: {}", err);
                Reply::private(err.user_message())
            }
        }
    }

    async fn execute(&self, request: CommandRequest, authorized: bool) -> PlayerResult<Reply> {
        let guild_id = request.guild_id;

        let reply = match request.command {
            Command::Play(query) => {
                let Some(voice_channel) = request.voice_channel else {
                    return Ok(Reply::private("❌ Debes estar en un canal de voz"));
                };
                if !authorized {
                    return Err(PlayerError::NotAuthorized);
                }

                let track = self
                    .resolver
                    .resolve(&query)
                    .await?
                    .with_requester(request.user_id);
                let text_channel = self
                    .settings
                    .notification_channel(guild_id, request.text_channel);

                let position = self
                    .manager
                    .enqueue(guild_id, voice_channel, text_channel, track.clone(), true)
                    .await?;

                if position == 1 {
                    Reply::public(format!(
                        "🎵 Reproduciendo: **{}** `[{}]`",
                        track.title(),
                        track.duration()
                    ))
                } else {
                    Reply::public(format!(
                        "➕ Agregado a la cola en la posición {}: **{}** `[{}]`",
                        position,
                        track.title(),
                        track.duration()
                    ))
                }
            }
            Command::Skip => {
                let track = self.manager.skip(guild_id, authorized).await?;
                Reply::public(format!("⏭️ Saltando: **{}**", track.title()))
            }
            Command::Stop => {
                self.manager.stop(guild_id, authorized).await?;
                self.occupancy.cancel(guild_id);
                Reply::public("⏹️ Reproducción detenida y cola vaciada")
            }
            Command::Pause => {
                self.manager.pause(guild_id).await?;
                Reply::public("⏸️ Pausado")
            }
            Command::Resume => {
                self.manager.resume(guild_id).await?;
                Reply::public("▶️ Reanudado")
            }
            Command::Volume(level) => {
                let level = self.manager.set_volume(guild_id, level, authorized).await?;
                Reply::public(format!("🔊 Volumen: {}%", level))
            }
            Command::Queue => {
                let snapshot = self
                    .manager
                    .snapshot(guild_id)
                    .await
                    .ok_or(PlayerError::NothingPlaying)?;
                Reply::public(render_queue(&snapshot))
            }
            Command::NowPlaying => {
                let track = self
                    .manager
                    .now_playing(guild_id)
                    .await
                    .ok_or(PlayerError::NothingPlaying)?;
                Reply::public(format!(
                    "🎶 Sonando ahora: **{}** `[{}]`",
                    track.title(),
                    track.duration()
                ))
            }
            Command::Shuffle => {
                let count = self.manager.shuffle(guild_id, authorized).await?;
                Reply::public(format!("🔀 Cola mezclada ({} canciones)", count))
            }
            Command::Loop(mode) => {
                let mode = self.manager.toggle_loop(guild_id, mode, authorized).await?;
                Reply::public(format!("🔁 Modo de repetición: **{}**", mode))
            }
            Command::Remove(position) => {
                let track = self
                    .manager
                    .remove_track(guild_id, position, authorized)
                    .await?;
                Reply::public(format!("➖ Eliminado: **{}**", track.title()))
            }
            Command::Clear => {
                let removed = self.manager.clear_queue(guild_id, authorized).await?;
                Reply::public(format!("🗑️ Cola limpiada ({} canciones)", removed))
            }
            Command::Filter(name) => {
                let preset = self.manager.set_filter(guild_id, &name, authorized).await?;
                Reply::public(format!("🎛️ Filtro aplicado: **{}**", preset))
            }
            Command::Autoplay => {
                let enabled = self.manager.toggle_autoplay(guild_id, authorized).await?;
                Reply::public(format!("🔄 Autoplay {}", on_off(enabled)))
            }
            Command::AlwaysOn => {
                let enabled = self.manager.toggle_always_on(guild_id, authorized).await?;
                Reply::public(format!("🌙 Modo 24/7 {}", on_off(enabled)))
            }
            Command::Setup {
                music_channel,
                dj_role,
            } => {
                if !SettingsRegistry::can_configure(&request.member) {
                    return Err(PlayerError::NotAuthorized);
                }
                let settings = self.settings.apply_setup(guild_id, music_channel, dj_role);
                let channel = settings
                    .music_channel
                    .map_or("sin fijar".to_string(), |id| format!("<#{}>", id));
                let role = settings
                    .dj_role
                    .map_or("ninguno".to_string(), |id| format!("<@&{}>", id));
                Reply::private(format!(
                    "⚙️ Configuración guardada\nCanal de música: {}\nRol DJ: {}",
                    channel, role
                ))
            }
            Command::Help => Reply::private(help_text()),
        };

        Ok(reply)
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "activado"
    } else {
        "desactivado"
    }
}

/// Lista de la cola en texto plano: la actual y una página de siguientes
pub fn render_queue(snapshot: &QueueSnapshot) -> String {
    let mut out = String::from("📜 **Cola de reproducción**\n");

    match &snapshot.current {
        Some(track) => {
            let _ = writeln!(out, "🎵 **{}** `[{}]`", track.title(), track.duration());
        }
        None => {
            let _ = writeln!(out, "⏸️ Nada sonando ({})", snapshot.status);
        }
    }

    for (i, track) in snapshot.upcoming.iter().enumerate() {
        let _ = writeln!(out, "{}. {} `[{}]`", i + 2, track.title(), track.duration());
    }

    let shown = 1 + snapshot.upcoming.len();
    if snapshot.total > shown {
        let _ = writeln!(out, "… y {} más", snapshot.total - shown);
    }

    let _ = write!(
        out,
        "🔁 {} · 🔄 autoplay {} · 🌙 24/7 {} · 🔊 {}% · 🎛️ {}",
        snapshot.loop_mode,
        on_off(snapshot.autoplay),
        on_off(snapshot.always_on),
        snapshot.volume,
        snapshot.filters
    );
    out
}

fn help_text() -> String {
    [
        "🎵 **Comandos**",
        "`play <canción|url>` · `skip` · `stop` · `pause` · `resume`",
        "`queue` · `nowplaying` · `shuffle` · `clear` · `remove <n>`",
        "`loop [off|song|queue]` · `volume <1-100>`",
        "`filter <bassboost|nightcore|vaporwave|karaoke|clear>`",
        "`autoplay` · `247` · `/setup` (Gestionar servidor)",
    ]
    .join("\n")
}
