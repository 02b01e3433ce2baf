//! Fakes compartidos por las pruebas del gestor y del despacho.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering},
        Arc,
    },
};
use tokio::sync::{mpsc, Notify};

use super::{
    effects::FilterChain,
    manager::{Collaborators, QueueManager},
    session::{
        AudioBackend, EventSink, Generation, Notice, Notifier, SessionEvent, SessionEventKind,
        SessionHandle, StartRequest, VoiceConnection, VoiceConnector,
    },
    track::Track,
};
use crate::{
    config::PlayerSettings,
    error::{PlayerError, PlayerResult},
    sources::{MockTrackResolver, TrackResolver},
};

pub const GUILD: GuildId = GuildId::new(1);
pub const VOICE: ChannelId = ChannelId::new(10);
pub const TEXT: ChannelId = ChannelId::new(20);

pub fn track(title: &str) -> Track {
    Track::new(title, format!("https://www.youtube.com/watch?v={}", title), "3:00")
}

#[derive(Debug, Clone)]
pub struct StartRecord {
    pub title: String,
    pub filters: FilterChain,
    pub volume: u8,
    pub generation: Generation,
}

#[derive(Default)]
struct HandleLog {
    stops: AtomicUsize,
    paused: AtomicBool,
    volume: AtomicU8,
}

/// Imita a songbird: `stop` dispara un evento `Finished` de su generación
struct FakeSession {
    sink: EventSink,
    log: Arc<HandleLog>,
}

impl SessionHandle for FakeSession {
    fn stop(&self) {
        self.log.stops.fetch_add(1, Ordering::SeqCst);
        self.sink.emit(SessionEventKind::Finished);
    }

    fn pause(&self) {
        self.log.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.log.paused.store(false, Ordering::SeqCst);
    }

    fn set_volume(&self, level: u8) {
        self.log.volume.store(level, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeBackend {
    starts: Mutex<Vec<StartRecord>>,
    sessions: Mutex<Vec<(EventSink, Arc<HandleLog>)>>,
    failing: Mutex<HashSet<String>>,
}

impl FakeBackend {
    pub fn fail_locator(&self, locator: &str) {
        self.failing.lock().insert(locator.to_string());
    }

    pub fn starts(&self) -> Vec<StartRecord> {
        self.starts.lock().clone()
    }

    pub fn started_titles(&self) -> Vec<String> {
        self.starts.lock().iter().map(|s| s.title.clone()).collect()
    }

    pub fn latest_generation(&self) -> Generation {
        self.starts.lock().last().expect("no session started").generation
    }

    pub fn latest_volume(&self) -> u8 {
        let sessions = self.sessions.lock();
        let (_, log) = sessions.last().expect("no session started");
        log.volume.load(Ordering::SeqCst)
    }

    pub fn latest_paused(&self) -> bool {
        let sessions = self.sessions.lock();
        let (_, log) = sessions.last().expect("no session started");
        log.paused.load(Ordering::SeqCst)
    }

    /// La sesión más reciente termina sola
    pub fn finish_latest(&self) {
        let sessions = self.sessions.lock();
        let (sink, _) = sessions.last().expect("no session started");
        sink.emit(SessionEventKind::Finished);
    }

    pub fn error_latest(&self, reason: &str) {
        let sessions = self.sessions.lock();
        let (sink, _) = sessions.last().expect("no session started");
        sink.emit(SessionEventKind::Errored(reason.to_string()));
    }
}

#[async_trait]
impl AudioBackend for FakeBackend {
    async fn start(
        &self,
        _guild_id: GuildId,
        request: StartRequest,
        events: EventSink,
    ) -> PlayerResult<Box<dyn SessionHandle>> {
        if self.failing.lock().contains(request.track.locator()) {
            return Err(PlayerError::SessionError("stream unavailable".to_string()));
        }

        let log = Arc::new(HandleLog::default());
        log.volume.store(request.volume, Ordering::SeqCst);
        self.starts.lock().push(StartRecord {
            title: request.track.title().to_string(),
            filters: request.filters,
            volume: request.volume,
            generation: events.generation(),
        });
        self.sessions.lock().push((events.clone(), Arc::clone(&log)));

        events.emit(SessionEventKind::Started);
        Ok(Box::new(FakeSession { sink: events, log }))
    }
}

struct FakeConnection {
    channel_id: ChannelId,
    releases: Arc<AtomicUsize>,
}

#[async_trait]
impl VoiceConnection for FakeConnection {
    fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    async fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeConnector {
    joins: Mutex<Vec<(GuildId, ChannelId)>>,
    releases: Arc<AtomicUsize>,
    failing: AtomicBool,
}

impl FakeConnector {
    pub fn fail_joins(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn joins(&self) -> Vec<(GuildId, ChannelId)> {
        self.joins.lock().clone()
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VoiceConnector for FakeConnector {
    async fn join(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> PlayerResult<Box<dyn VoiceConnection>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PlayerError::ConnectionError("missing permissions".to_string()));
        }
        self.joins.lock().push((guild_id, channel_id));
        Ok(Box::new(FakeConnection {
            channel_id,
            releases: Arc::clone(&self.releases),
        }))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<(ChannelId, Notice)>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<(ChannelId, Notice)> {
        self.notices.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, channel_id: ChannelId, notice: Notice) {
        self.notices.lock().push((channel_id, notice));
    }
}

/// Resolvedor cuyo `related` se queda esperando hasta que la prueba lo suelte
pub struct GatedResolver {
    related: PlayerResult<Track>,
    /// Se avisa cuando empieza una búsqueda
    pub entered: Notify,
    pub release: Notify,
}

impl GatedResolver {
    pub fn new(related: PlayerResult<Track>) -> Arc<Self> {
        Arc::new(Self {
            related,
            entered: Notify::new(),
            release: Notify::new(),
        })
    }
}

#[async_trait]
impl TrackResolver for GatedResolver {
    async fn resolve(&self, query: &str) -> PlayerResult<Track> {
        Err(PlayerError::ResolutionFailed(query.to_string()))
    }

    async fn related(&self, _seed: &Track) -> PlayerResult<Track> {
        self.entered.notify_one();
        self.release.notified().await;
        self.related.clone()
    }
}

/// Gestor conectado a fakes, con el receptor de eventos a mano
pub struct Harness {
    pub manager: Arc<QueueManager>,
    pub backend: Arc<FakeBackend>,
    pub connector: Arc<FakeConnector>,
    pub notifier: Arc<RecordingNotifier>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Harness {
    pub fn new(resolver: MockTrackResolver) -> Self {
        Self::with_resolver(Arc::new(resolver))
    }

    pub fn with_resolver(resolver: Arc<dyn TrackResolver>) -> Self {
        let backend = Arc::new(FakeBackend::default());
        let connector = Arc::new(FakeConnector::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let (manager, events) = QueueManager::new(
            PlayerSettings::default(),
            Collaborators {
                connector: connector.clone(),
                backend: backend.clone(),
                resolver,
                notifier: notifier.clone(),
            },
        );

        Self {
            manager,
            backend,
            connector,
            notifier,
            events,
        }
    }

    pub fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.try_recv().ok()
    }

    /// Entrega todos los eventos pendientes, incluidos los que se generen mientras tanto
    pub async fn drain(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.manager.handle_event(event).await;
        }
    }
}
