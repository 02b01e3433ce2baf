use serenity::model::id::ChannelId;

use super::{
    effects::FilterChain,
    queue::{LoopMode, TrackQueue},
    session::{Generation, SessionHandle, VoiceConnection},
    track::Track,
};
use crate::config::PlayerSettings;

pub(crate) struct ActiveSession {
    pub generation: Generation,
    pub handle: Box<dyn SessionHandle>,
    pub paused: bool,
}

/// Qué está haciendo el servidor ahora mismo.
///
/// Sólo `Playing` acepta eventos de sesión; `Restarting` y `AwaitingAutoplay`
/// reservan una generación para una tarea diferida que debe comprobarla antes
/// de tocar el estado.
pub(crate) enum Activity {
    Idle,
    Playing(ActiveSession),
    Restarting(Generation),
    AwaitingAutoplay(Generation),
}

impl Activity {
    fn label(&self) -> &'static str {
        match self {
            Activity::Idle => "idle",
            Activity::Playing(session) if session.paused => "paused",
            Activity::Playing(_) => "playing",
            Activity::Restarting(_) => "restarting",
            Activity::AwaitingAutoplay(_) => "autoplay",
        }
    }
}

/// Estado de reproducción de un servidor con conexión de voz.
pub struct GuildPlayback {
    pub(crate) instance: Generation,
    pub(crate) queue: TrackQueue,
    pub(crate) loop_mode: LoopMode,
    pub(crate) autoplay: bool,
    pub(crate) always_on: bool,
    pub(crate) volume: u8,
    pub(crate) filters: FilterChain,
    pub(crate) text_channel: ChannelId,
    pub(crate) connection: Option<Box<dyn VoiceConnection>>,
    pub(crate) activity: Activity,
    pub(crate) last_played: Option<Track>,
}

impl GuildPlayback {
    pub(crate) fn new(
        instance: Generation,
        text_channel: ChannelId,
        settings: &PlayerSettings,
    ) -> Self {
        Self {
            instance,
            queue: TrackQueue::new(settings.max_queue_size),
            loop_mode: LoopMode::Off,
            autoplay: false,
            always_on: false,
            volume: settings.default_volume,
            filters: FilterChain::default(),
            text_channel,
            connection: None,
            activity: Activity::Idle,
            last_played: None,
        }
    }

    /// Sesión viva, si la hay
    pub(crate) fn live_session(&self) -> Option<&ActiveSession> {
        match &self.activity {
            Activity::Playing(session) => Some(session),
            _ => None,
        }
    }

    pub(crate) fn live_session_mut(&mut self) -> Option<&mut ActiveSession> {
        match &mut self.activity {
            Activity::Playing(session) => Some(session),
            _ => None,
        }
    }

    /// Un evento sólo es válido si viene de la sesión viva
    pub(crate) fn accepts(&self, generation: Generation) -> bool {
        self.live_session()
            .is_some_and(|session| session.generation == generation)
    }

    /// Saca la sesión viva y deja el estado en reposo
    pub(crate) fn take_session(&mut self) -> Option<ActiveSession> {
        match std::mem::replace(&mut self.activity, Activity::Idle) {
            Activity::Playing(session) => Some(session),
            _ => None,
        }
    }

    pub(crate) fn is_waiting_on(&self, generation: Generation) -> bool {
        matches!(
            self.activity,
            Activity::Restarting(g) | Activity::AwaitingAutoplay(g) if g == generation
        )
    }

    pub(crate) fn snapshot(&self, page_size: usize) -> QueueSnapshot {
        QueueSnapshot {
            current: self.live_session().and(self.queue.current().cloned()),
            upcoming: self
                .queue
                .iter()
                .skip(1)
                .take(page_size.saturating_sub(1))
                .cloned()
                .collect(),
            total: self.queue.len(),
            loop_mode: self.loop_mode,
            autoplay: self.autoplay,
            always_on: self.always_on,
            volume: self.volume,
            filters: self.filters.clone(),
            status: self.activity.label(),
            voice_channel: self.connection.as_ref().map(|c| c.channel_id()),
        }
    }
}

/// Vista de sólo lectura del estado de un servidor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSnapshot {
    /// Pista en reproducción (o en pausa)
    pub current: Option<Track>,
    /// Siguientes pistas, limitadas al tamaño de página
    pub upcoming: Vec<Track>,
    /// Total de pistas en cola, incluida la actual
    pub total: usize,
    pub loop_mode: LoopMode,
    pub autoplay: bool,
    pub always_on: bool,
    pub volume: u8,
    pub filters: FilterChain,
    pub status: &'static str,
    pub voice_channel: Option<ChannelId>,
}
