use serenity::async_trait;
use songbird::{
    tracks::{PlayMode, TrackHandle},
    Event as VoiceEvent, EventContext, EventHandler as VoiceEventHandler, TrackEvent,
};
use tracing::{debug, error};

use crate::{
    audio::session::{EventSink, SessionEventKind},
    error::{PlayerError, PlayerResult},
};

/// Reenvía el inicio de un track al gestor
pub struct TrackStartHandler {
    pub sink: EventSink,
}

#[async_trait]
impl VoiceEventHandler for TrackStartHandler {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        debug!("▶️ Sesión {} comenzó", self.sink.generation());
        self.sink.emit(SessionEventKind::Started);
        None
    }
}

/// Reenvía el fin de un track, natural o por `stop`
pub struct TrackEndHandler {
    pub sink: EventSink,
}

#[async_trait]
impl VoiceEventHandler for TrackEndHandler {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        debug!("🎵 Sesión {} terminó", self.sink.generation());
        self.sink.emit(SessionEventKind::Finished);
        None
    }
}

/// Handler para errores de tracks
pub struct TrackErrorHandler {
    pub sink: EventSink,
}

#[async_trait]
impl VoiceEventHandler for TrackErrorHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        let mut reason = "error desconocido".to_string();
        if let EventContext::Track(track_list) = ctx {
            for (state, _handle) in *track_list {
                if let PlayMode::Errored(err) = &state.playing {
                    reason = format!("{:?}", err);
                }
            }
        }

        error!("❌ Error en la sesión {}: {}", self.sink.generation(), reason);
        self.sink.emit(SessionEventKind::Errored(reason));
        None
    }
}

/// Registra los tres handlers de ciclo de vida sobre un track
pub fn register_track_events(handle: &TrackHandle, sink: &EventSink) -> PlayerResult<()> {
    handle
        .add_event(
            VoiceEvent::Track(TrackEvent::Play),
            TrackStartHandler { sink: sink.clone() },
        )
        .map_err(handler_error)?;
    handle
        .add_event(
            VoiceEvent::Track(TrackEvent::End),
            TrackEndHandler { sink: sink.clone() },
        )
        .map_err(handler_error)?;
    handle
        .add_event(
            VoiceEvent::Track(TrackEvent::Error),
            TrackErrorHandler { sink: sink.clone() },
        )
        .map_err(handler_error)?;

    Ok(())
}

fn handler_error(e: impl std::fmt::Display) -> PlayerError {
    PlayerError::SessionError(format!("Error al agregar event handler: {}", e))
}
