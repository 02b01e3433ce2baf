//! # Bot Module
//!
//! Discord glue for the jukebox: command registration, request parsing, the
//! dispatcher and the serenity [`EventHandler`].
//!
//! Text commands, slash commands and player buttons are turned into a
//! [`request::CommandRequest`] by [`handlers`] and executed by
//! [`dispatch::Dispatcher`]. Voice state updates feed the
//! [`OccupancyMonitor`] so the bot leaves channels nobody is listening in.

use anyhow::Result;
use serenity::{
    all::{Context, EventHandler, GuildId, Interaction, Message, Ready, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub mod commands;
pub mod dispatch;
pub mod handlers;
pub mod notifier;
pub mod request;
pub mod settings;

use crate::{audio::manager::QueueManager, config::Config, voice::OccupancyMonitor};
use dispatch::Dispatcher;

/// Serenity event handler for the jukebox.
///
/// Owns nothing playback-related itself; every command goes through the
/// shared [`Dispatcher`] and every voice change through the
/// [`OccupancyMonitor`].
pub struct JukeboxBot {
    config: Arc<Config>,
    manager: Arc<QueueManager>,
    occupancy: Arc<OccupancyMonitor>,
    dispatcher: Dispatcher,
}

impl JukeboxBot {
    pub fn new(
        config: Config,
        manager: Arc<QueueManager>,
        occupancy: Arc<OccupancyMonitor>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            config: Arc::new(config),
            manager,
            occupancy,
            dispatcher,
        }
    }

    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);
                info!("🏠 Registrando comandos para guild específica: {}", guild_id);

                if !ctx.cache.guilds().contains(&guild_id) {
                    warn!("⚠️ El bot no está en la guild especificada: {}", guild_id);
                    return Ok(());
                }

                commands::register_guild_commands(ctx, guild_id)
                    .await
                    .map_err(|e| {
                        error!("❌ Error registrando comandos de guild: {:?}", e);
                        anyhow::anyhow!("No se pudieron registrar comandos de guild. Verifica que el bot tenga permisos de 'applications.commands' en la guild.")
                    })?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                info!("🌐 Registrando comandos globalmente");
                commands::register_global_commands(ctx).await.map_err(|e| {
                    error!("❌ Error registrando comandos globales: {:?}", e);
                    anyhow::anyhow!("No se pudieron registrar comandos globales. Verifica que el bot tenga permisos de 'applications.commands'.")
                })?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for JukeboxBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if let Err(e) =
            handlers::handle_message(&ctx, &msg, &self.config.command_prefix, &self.dispatcher).await
        {
            error!("Error manejando mensaje: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command_interaction) => {
                if let Err(e) =
                    handlers::handle_command(&ctx, command_interaction, &self.dispatcher).await
                {
                    error!("Error manejando comando: {:?}", e);
                }
            }
            Interaction::Component(component_interaction) => {
                if let Err(e) =
                    handlers::handle_component(&ctx, component_interaction, &self.dispatcher).await
                {
                    error!("Error manejando componente: {:?}", e);
                }
            }
            _ => {}
        }
    }

    /// Detecta desconexiones del bot y cambios de ocupación en su canal
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let Some(guild_id) = new.guild_id else {
            return;
        };

        let current_user_id = ctx.cache.current_user().id;
        if new.user_id == current_user_id && old.is_some() && new.channel_id.is_none() {
            info!("🔌 Bot desconectado en guild {}", guild_id);
            self.occupancy.cancel(guild_id);
            self.manager.cleanup(guild_id).await;
            return;
        }

        let Some(channel_id) = self.manager.connected_channel(guild_id).await else {
            return;
        };

        let humans = handlers::count_humans(&ctx, guild_id, channel_id);
        debug!("👥 {} oyentes en {} (guild {})", humans, channel_id, guild_id);
        self.occupancy.on_membership_change(guild_id, humans).await;
    }
}
