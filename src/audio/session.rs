//! Seams between the queue manager and the outside world.
//!
//! The manager never talks to Discord or to an audio pipeline directly. It
//! opens voice connections through a [`VoiceConnector`], starts audio through
//! an [`AudioBackend`] and reports asynchronous outcomes through a
//! [`Notifier`]. Backends report lifecycle changes through an [`EventSink`]
//! that is tagged with the generation of the session it belongs to, so events
//! from a superseded session can be told apart from live ones.

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use std::fmt;
use tokio::sync::mpsc;
use tracing::debug;

use super::{effects::FilterChain, track::Track};
use crate::error::PlayerResult;

/// Identificador monótono de un inicio de sesión o de un estado de servidor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEventKind {
    Started,
    Finished,
    Errored(String),
}

/// Evento de ciclo de vida emitido por una sesión de audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub guild_id: GuildId,
    pub generation: Generation,
    pub kind: SessionEventKind,
}

/// Handed to a backend when a session starts; every event it emits carries
/// the guild and generation of that session.
#[derive(Debug, Clone)]
pub struct EventSink {
    guild_id: GuildId,
    generation: Generation,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSink {
    pub fn new(
        guild_id: GuildId,
        generation: Generation,
        tx: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            guild_id,
            generation,
            tx,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn emit(&self, kind: SessionEventKind) {
        let event = SessionEvent {
            guild_id: self.guild_id,
            generation: self.generation,
            kind,
        };
        if self.tx.send(event).is_err() {
            debug!(
                "📭 Evento de sesión {} descartado: el gestor ya no escucha",
                self.generation
            );
        }
    }
}

/// Qué reproducir y cómo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRequest {
    pub track: Track,
    pub filters: FilterChain,
    pub volume: u8,
}

/// Control de una sesión de audio en curso. Las llamadas son best-effort.
pub trait SessionHandle: Send + Sync {
    fn stop(&self);
    fn pause(&self);
    fn resume(&self);
    fn set_volume(&self, level: u8);
}

#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Starts playing `request` on the guild's open voice connection.
    ///
    /// Lifecycle events for the new session must be reported through `events`.
    async fn start(
        &self,
        guild_id: GuildId,
        request: StartRequest,
        events: EventSink,
    ) -> PlayerResult<Box<dyn SessionHandle>>;
}

#[async_trait]
pub trait VoiceConnection: Send + Sync {
    fn channel_id(&self) -> ChannelId;

    /// Cierra la conexión; no falla
    async fn release(&mut self);
}

#[async_trait]
pub trait VoiceConnector: Send + Sync {
    async fn join(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> PlayerResult<Box<dyn VoiceConnection>>;
}

/// Avisos que el gestor publica en el canal de texto del servidor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    NowPlaying(Track),
    SessionFailed { track: Track, reason: String },
    AutoplayQueued(Track),
    QueueFinished,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, channel_id: ChannelId, notice: Notice);
}
