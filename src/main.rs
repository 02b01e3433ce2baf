use anyhow::Result;
use serenity::{http::Http, model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info};

use guild_jukebox::{
    audio::manager::{Collaborators, QueueManager},
    bot::{dispatch::Dispatcher, notifier::ChannelNotifier, settings::SettingsRegistry, JukeboxBot},
    config::Config,
    sources::{TrackResolver, YtDlpResolver},
    voice::{OccupancyMonitor, SongbirdBackend, SongbirdConnector},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("guild_jukebox=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Guild Jukebox v{}", env!("CARGO_PKG_VERSION"));

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check().await;
    }

    // Cargar configuración
    let config = Config::load()?;
    info!("⚙️ {}", config.summary());

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    // El notificador necesita su propio cliente HTTP: el handler se construye antes que el Client
    let http = Arc::new(Http::new(&config.discord_token));
    let songbird = Songbird::serenity();
    let resolver: Arc<dyn TrackResolver> = Arc::new(YtDlpResolver::new(config.ytdlp_path.clone()));

    let (manager, events) = QueueManager::new(
        config.player_settings(),
        Collaborators {
            connector: Arc::new(SongbirdConnector::new(songbird.clone())),
            backend: Arc::new(SongbirdBackend::new(
                songbird.clone(),
                config.ytdlp_path.clone(),
                config.ffmpeg_path.clone(),
            )),
            resolver: resolver.clone(),
            notifier: Arc::new(ChannelNotifier::new(http)),
        },
    );
    tokio::spawn(manager.clone().run_events(events));

    let occupancy = OccupancyMonitor::new(manager.clone(), config.auto_leave());
    let dispatcher = Dispatcher::new(
        manager.clone(),
        resolver,
        Arc::new(SettingsRegistry::new()),
        occupancy.clone(),
    );
    let handler = JukeboxBot::new(config.clone(), manager, occupancy, dispatcher);

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    // Manejar shutdown graceful
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        shard_manager.shutdown_all().await;
    });

    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}

async fn health_check() -> Result<()> {
    let ytdlp = std::env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string());
    let ffmpeg = std::env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string());

    let yt_dlp = async_process::Command::new(&ytdlp)
        .arg("--version")
        .output()
        .await?;

    let ffmpeg = async_process::Command::new(&ffmpeg)
        .arg("-version")
        .output()
        .await?;

    if yt_dlp.status.success() && ffmpeg.status.success() {
        println!("OK");
        Ok(())
    } else {
        anyhow::bail!("Dependencias faltantes");
    }
}
