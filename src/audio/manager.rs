use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use super::{
    effects::FilterPreset,
    queue::LoopMode,
    session::{
        AudioBackend, EventSink, Generation, Notice, Notifier, SessionEvent, SessionEventKind,
        StartRequest, VoiceConnector,
    },
    state::{ActiveSession, Activity, GuildPlayback, QueueSnapshot},
    track::Track,
};
use crate::{
    config::PlayerSettings,
    error::{ensure_authorized, PlayerError, PlayerResult},
    sources::TrackResolver,
};

/// Una entrada del registro. Crear y destruir el estado ocurre bajo su mutex;
/// la entrada se borra del mapa cuando queda vacía.
type Slot = Arc<Mutex<Option<GuildPlayback>>>;

/// External capabilities the manager drives.
pub struct Collaborators {
    pub connector: Arc<dyn VoiceConnector>,
    pub backend: Arc<dyn AudioBackend>,
    pub resolver: Arc<dyn TrackResolver>,
    pub notifier: Arc<dyn Notifier>,
}

/// Resultado de una salida automática por canal vacío
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Se liberó la conexión y se destruyó el estado
    Left,
    /// Modo 24/7 activo: la conexión se mantiene
    Retained,
    /// El estado ya no existe o fue reemplazado
    Stale,
}

/// Trabajo pendiente que debe hacerse sin sostener el lock del servidor
enum Followup {
    Done,
    Autoplay { seed: Track, generation: Generation },
}

/// Owns the playback state of every guild.
///
/// All mutations of one guild's [`GuildPlayback`] happen under that guild's
/// lock, so commands and session events for the same guild are applied one at
/// a time while different guilds progress independently.
///
/// Every session start is tagged with a fresh [`Generation`]. Session events
/// carry the generation they were started with and are only applied if it is
/// still the live one, which makes late `finished`/`errored` events from a
/// stopped or replaced session harmless.
///
/// # Flow
///
/// 1. [`enqueue`](Self::enqueue) creates the state, joins voice and starts index 0
/// 2. The backend reports [`SessionEvent`]s into the channel returned by [`new`](Self::new)
/// 3. [`run_events`](Self::run_events) feeds them to [`handle_event`](Self::handle_event),
///    which advances the queue according to the loop mode
/// 4. When the queue runs dry the state is torn down, unless autoplay or 24/7 keeps it
pub struct QueueManager {
    slots: DashMap<GuildId, Slot>,
    connector: Arc<dyn VoiceConnector>,
    backend: Arc<dyn AudioBackend>,
    resolver: Arc<dyn TrackResolver>,
    notifier: Arc<dyn Notifier>,
    settings: PlayerSettings,
    generations: AtomicU64,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl QueueManager {
    pub fn new(
        settings: PlayerSettings,
        collaborators: Collaborators,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let manager = Arc::new(Self {
            slots: DashMap::new(),
            connector: collaborators.connector,
            backend: collaborators.backend,
            resolver: collaborators.resolver,
            notifier: collaborators.notifier,
            settings,
            generations: AtomicU64::new(0),
            events,
        });

        info!("🎚️ Gestor de colas inicializado");
        (manager, receiver)
    }

    pub fn settings(&self) -> &PlayerSettings {
        &self.settings
    }

    fn slot(&self, guild_id: GuildId) -> Slot {
        self.slots.entry(guild_id).or_default().value().clone()
    }

    fn existing_slot(&self, guild_id: GuildId) -> Option<Slot> {
        self.slots.get(&guild_id).map(|slot| slot.value().clone())
    }

    fn is_registered(&self, guild_id: GuildId, slot: &Slot) -> bool {
        self.slots
            .get(&guild_id)
            .is_some_and(|current| Arc::ptr_eq(current.value(), slot))
    }

    /// Borra la entrada del registro si su estado ya no existe. Se llama con
    /// el lock de `slot` tomado.
    fn forget_if_empty(&self, guild_id: GuildId, slot: &Slot, state: &Option<GuildPlayback>) {
        if state.is_none() {
            self.slots
                .remove_if(&guild_id, |_, current| Arc::ptr_eq(current, slot));
        }
    }

    fn next_generation(&self) -> Generation {
        Generation::new(self.generations.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Aplica `f` al estado del servidor, o `NothingPlaying` si no existe
    async fn with_state<T, F>(&self, guild_id: GuildId, f: F) -> PlayerResult<T>
    where
        F: FnOnce(&mut GuildPlayback) -> PlayerResult<T> + Send,
        T: Send,
    {
        let slot = self
            .existing_slot(guild_id)
            .ok_or(PlayerError::NothingPlaying)?;
        let mut guard = slot.lock().await;
        let state = guard.as_mut().ok_or(PlayerError::NothingPlaying)?;
        f(state)
    }

    /// Agrega una pista ya resuelta y devuelve su posición (base 1).
    ///
    /// Sin estado previo: crea el estado, se une a `voice_channel` y empieza
    /// a reproducir. Con estado: sólo agrega al final, salvo que el servidor
    /// esté en reposo (modo 24/7) o esperando un autoplay; entonces la pista
    /// suena en el acto y el resultado del autoplay se descarta.
    pub async fn enqueue(
        &self,
        guild_id: GuildId,
        voice_channel: ChannelId,
        text_channel: ChannelId,
        track: Track,
        authorized: bool,
    ) -> PlayerResult<usize> {
        ensure_authorized(authorized)?;

        // Una entrada borrada mientras esperábamos su lock ya no es la del registro
        let (slot, mut guard) = loop {
            let slot = self.slot(guild_id);
            let guard = Arc::clone(&slot).lock_owned().await;
            if self.is_registered(guild_id, &slot) {
                break (slot, guard);
            }
        };

        if let Some(state) = guard.as_mut() {
            let position = state.queue.push(track)?;
            if let Activity::AwaitingAutoplay(generation) = state.activity {
                debug!("🔄 Autoplay {} reemplazado por una pista nueva en {}", generation, guild_id);
                state.activity = Activity::Idle;
            }
            if matches!(state.activity, Activity::Idle) {
                let followup = self.play_head(guild_id, &mut guard).await;
                self.forget_if_empty(guild_id, &slot, &guard);
                drop(guard);
                self.run_followup(guild_id, followup).await;
            }
            return Ok(position);
        }

        let mut state = GuildPlayback::new(self.next_generation(), text_channel, &self.settings);
        if let Err(e) = state.queue.push(track) {
            self.forget_if_empty(guild_id, &slot, &guard);
            return Err(e);
        }

        let connection = match self.connector.join(guild_id, voice_channel).await {
            Ok(connection) => connection,
            Err(e) => {
                warn!("⚠️ No se pudo entrar al canal {} en {}: {}", voice_channel, guild_id, e);
                self.forget_if_empty(guild_id, &slot, &guard);
                return Err(e);
            }
        };
        info!("🔊 Conectado al canal de voz {} en {}", voice_channel, guild_id);

        state.connection = Some(connection);
        *guard = Some(state);

        let followup = self.play_head(guild_id, &mut guard).await;
        self.forget_if_empty(guild_id, &slot, &guard);
        drop(guard);
        self.run_followup(guild_id, followup).await;

        Ok(1)
    }

    /// Detiene la sesión viva; el evento `finished` resultante avanza la cola
    pub async fn skip(&self, guild_id: GuildId, authorized: bool) -> PlayerResult<Track> {
        ensure_authorized(authorized)?;
        self.with_state(guild_id, |state| {
            let session = state.live_session().ok_or(PlayerError::NothingPlaying)?;
            session.handle.stop();
            let track = state
                .queue
                .current()
                .cloned()
                .ok_or(PlayerError::NothingPlaying)?;
            info!("⏭️ Saltando: {}", track.title());
            Ok(track)
        })
        .await
    }

    /// Vacía la cola, detiene la sesión y libera la conexión
    pub async fn stop(&self, guild_id: GuildId, authorized: bool) -> PlayerResult<()> {
        ensure_authorized(authorized)?;
        let slot = self
            .existing_slot(guild_id)
            .ok_or(PlayerError::NothingPlaying)?;
        let mut guard = slot.lock().await;
        let state = guard.as_mut().ok_or(PlayerError::NothingPlaying)?;

        state.queue.clear();
        info!("⏹️ Reproducción detenida en {}", guild_id);
        self.destroy(guild_id, &mut guard).await;
        self.forget_if_empty(guild_id, &slot, &guard);
        Ok(())
    }

    pub async fn pause(&self, guild_id: GuildId) -> PlayerResult<()> {
        self.with_state(guild_id, |state| {
            let session = state
                .live_session_mut()
                .ok_or(PlayerError::NothingPlaying)?;
            session.handle.pause();
            session.paused = true;
            info!("⏸️ Pausado en {}", guild_id);
            Ok(())
        })
        .await
    }

    pub async fn resume(&self, guild_id: GuildId) -> PlayerResult<()> {
        self.with_state(guild_id, |state| {
            let session = state
                .live_session_mut()
                .ok_or(PlayerError::NothingPlaying)?;
            session.handle.resume();
            session.paused = false;
            info!("▶️ Reanudado en {}", guild_id);
            Ok(())
        })
        .await
    }

    /// Guarda el volumen (1-100) y lo aplica a la sesión viva si existe
    pub async fn set_volume(
        &self,
        guild_id: GuildId,
        level: i64,
        authorized: bool,
    ) -> PlayerResult<u8> {
        ensure_authorized(authorized)?;
        let level = u8::try_from(level)
            .ok()
            .filter(|level| (1..=100).contains(level))
            .ok_or_else(|| PlayerError::invalid("El volumen debe estar entre 1 y 100"))?;

        self.with_state(guild_id, move |state| {
            state.volume = level;
            if let Some(session) = state.live_session() {
                session.handle.set_volume(level);
            }
            info!("🔊 Volumen en {}: {}%", guild_id, level);
            Ok(level)
        })
        .await
    }

    /// Reemplaza la cadena de filtros y reinicia la pista actual con ella.
    ///
    /// La sesión viva se detiene en el acto; la nueva arranca tras
    /// `filter_restart_delay` si nada cambió el estado mientras tanto.
    pub async fn set_filter(
        self: &Arc<Self>,
        guild_id: GuildId,
        name: &str,
        authorized: bool,
    ) -> PlayerResult<FilterPreset> {
        ensure_authorized(authorized)?;
        let preset: FilterPreset = name.parse()?;

        let slot = self
            .existing_slot(guild_id)
            .ok_or(PlayerError::NothingPlaying)?;
        let mut guard = slot.lock().await;
        let state = guard.as_mut().ok_or(PlayerError::NothingPlaying)?;

        state.filters = preset.chain();
        info!("🎛️ Filtro {} en {}: [{}]", preset, guild_id, state.filters);

        if let Some(session) = state.take_session() {
            session.handle.stop();
            let generation = self.next_generation();
            state.activity = Activity::Restarting(generation);

            let manager = Arc::clone(self);
            let delay = self.settings.filter_restart_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                manager.restart(guild_id, generation).await;
            });
        }

        Ok(preset)
    }

    /// Fija el modo de repetición, o pasa al siguiente si `mode` es `None`
    pub async fn toggle_loop(
        &self,
        guild_id: GuildId,
        mode: Option<LoopMode>,
        authorized: bool,
    ) -> PlayerResult<LoopMode> {
        ensure_authorized(authorized)?;
        self.with_state(guild_id, move |state| {
            let next = mode.unwrap_or(state.loop_mode.next());
            state.loop_mode = next;
            info!("🔁 Modo de repetición en {}: {}", guild_id, state.loop_mode);
            Ok(state.loop_mode)
        })
        .await
    }

    pub async fn toggle_autoplay(&self, guild_id: GuildId, authorized: bool) -> PlayerResult<bool> {
        ensure_authorized(authorized)?;
        self.with_state(guild_id, |state| {
            state.autoplay = !state.autoplay;
            info!("🔄 Autoplay en {}: {}", guild_id, state.autoplay);
            Ok(state.autoplay)
        })
        .await
    }

    /// Alterna el modo 24/7. Al desactivarlo en reposo y sin cola, el
    /// servidor se limpia en el acto.
    pub async fn toggle_always_on(
        &self,
        guild_id: GuildId,
        authorized: bool,
    ) -> PlayerResult<bool> {
        ensure_authorized(authorized)?;
        let slot = self
            .existing_slot(guild_id)
            .ok_or(PlayerError::NothingPlaying)?;
        let mut guard = slot.lock().await;
        let state = guard.as_mut().ok_or(PlayerError::NothingPlaying)?;

        state.always_on = !state.always_on;
        let always_on = state.always_on;
        info!("🌙 Modo 24/7 en {}: {}", guild_id, always_on);

        if !always_on && matches!(state.activity, Activity::Idle) && state.queue.is_empty() {
            self.destroy(guild_id, &mut guard).await;
            self.forget_if_empty(guild_id, &slot, &guard);
        }
        Ok(always_on)
    }

    pub async fn remove_track(
        &self,
        guild_id: GuildId,
        position: i64,
        authorized: bool,
    ) -> PlayerResult<Track> {
        ensure_authorized(authorized)?;
        self.with_state(guild_id, move |state| {
            let position = usize::try_from(position)
                .map_err(|_| PlayerError::invalid("La posición debe ser positiva"))?;
            state.queue.remove(position)
        })
        .await
    }

    /// Vacía la cola excepto la pista actual
    pub async fn clear_queue(&self, guild_id: GuildId, authorized: bool) -> PlayerResult<usize> {
        ensure_authorized(authorized)?;
        self.with_state(guild_id, |state| {
            let removed = state.queue.clear_upcoming();
            info!("🗑️ {} canciones quitadas de la cola en {}", removed, guild_id);
            Ok(removed)
        })
        .await
    }

    pub async fn shuffle(&self, guild_id: GuildId, authorized: bool) -> PlayerResult<usize> {
        ensure_authorized(authorized)?;
        self.with_state(guild_id, |state| {
            let shuffled = state.queue.shuffle_upcoming(&mut rand::thread_rng());
            info!("🔀 Cola mezclada en {} ({} canciones)", guild_id, shuffled);
            Ok(shuffled)
        })
        .await
    }

    pub async fn snapshot(&self, guild_id: GuildId) -> Option<QueueSnapshot> {
        let slot = self.existing_slot(guild_id)?;
        let guard = slot.lock().await;
        guard
            .as_ref()
            .map(|state| state.snapshot(self.settings.page_size))
    }

    /// Pista en reproducción, si hay una sesión viva
    pub async fn now_playing(&self, guild_id: GuildId) -> Option<Track> {
        self.snapshot(guild_id).await.and_then(|s| s.current)
    }

    /// Identidad del estado actual del servidor
    pub async fn instance(&self, guild_id: GuildId) -> Option<Generation> {
        let slot = self.existing_slot(guild_id)?;
        let guard = slot.lock().await;
        guard.as_ref().map(|state| state.instance)
    }

    pub async fn connected_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        let slot = self.existing_slot(guild_id)?;
        let guard = slot.lock().await;
        guard
            .as_ref()
            .and_then(|state| state.connection.as_ref())
            .map(|connection| connection.channel_id())
    }

    /// Sale del canal si el estado sigue siendo `instance` y no está en modo 24/7
    pub async fn auto_leave(&self, guild_id: GuildId, instance: Generation) -> LeaveOutcome {
        let Some(slot) = self.existing_slot(guild_id) else {
            return LeaveOutcome::Stale;
        };
        let mut guard = slot.lock().await;

        match guard.as_ref() {
            Some(state) if state.instance != instance => LeaveOutcome::Stale,
            None => LeaveOutcome::Stale,
            Some(state) if state.always_on => {
                info!("🌙 Canal vacío en {}, modo 24/7: me quedo", guild_id);
                LeaveOutcome::Retained
            }
            Some(_) => {
                info!("👋 Canal vacío en {}, saliendo", guild_id);
                self.destroy(guild_id, &mut guard).await;
                self.forget_if_empty(guild_id, &slot, &guard);
                LeaveOutcome::Left
            }
        }
    }

    /// Destruye el estado del servidor sin importar el modo 24/7
    pub async fn cleanup(&self, guild_id: GuildId) -> bool {
        let Some(slot) = self.existing_slot(guild_id) else {
            return false;
        };
        let mut guard = slot.lock().await;
        if guard.is_none() {
            return false;
        }
        self.destroy(guild_id, &mut guard).await;
        self.forget_if_empty(guild_id, &slot, &guard);
        true
    }

    /// Consume los eventos de sesión hasta que se cierre el canal
    pub async fn run_events(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<SessionEvent>) {
        info!("🎧 Escuchando eventos de sesión");
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        debug!("Canal de eventos de sesión cerrado");
    }

    pub async fn handle_event(&self, event: SessionEvent) {
        let guild_id = event.guild_id;
        let Some(slot) = self.existing_slot(guild_id) else {
            debug!("Evento para {} sin estado, ignorado", guild_id);
            return;
        };
        let mut guard = slot.lock().await;

        if !guard
            .as_ref()
            .is_some_and(|state| state.accepts(event.generation))
        {
            debug!(
                "🕰️ Evento {:?} de la sesión {} ignorado en {}: obsoleto",
                event.kind, event.generation, guild_id
            );
            return;
        }

        let followup = match event.kind {
            SessionEventKind::Started => {
                self.announce_now_playing(&guard).await;
                Followup::Done
            }
            SessionEventKind::Finished => self.advance(guild_id, &mut guard).await,
            SessionEventKind::Errored(reason) => {
                self.fail_current(guild_id, &mut guard, reason).await
            }
        };
        self.forget_if_empty(guild_id, &slot, &guard);
        drop(guard);
        self.run_followup(guild_id, followup).await;
    }

    async fn announce_now_playing(&self, slot: &Option<GuildPlayback>) {
        let Some(state) = slot.as_ref() else { return };
        if let Some(track) = state.queue.current().cloned() {
            let channel = state.text_channel;
            self.notifier.notify(channel, Notice::NowPlaying(track)).await;
        }
    }

    /// Cierra la pista actual según el modo de repetición y reproduce la siguiente
    async fn advance(&self, guild_id: GuildId, slot: &mut Option<GuildPlayback>) -> Followup {
        if let Some(state) = slot.as_mut() {
            state.take_session();
            state.last_played = state.queue.current().cloned();
            state.queue.complete(state.loop_mode);
            debug!("🎶 Pista terminada en {} (loop: {})", guild_id, state.loop_mode);
        }
        self.play_head(guild_id, slot).await
    }

    /// Descarta la pista actual sin reintentar y reproduce la siguiente
    async fn fail_current(
        &self,
        guild_id: GuildId,
        slot: &mut Option<GuildPlayback>,
        reason: String,
    ) -> Followup {
        if let Some(state) = slot.as_mut() {
            state.take_session();
            if let Some(track) = state.queue.drop_current() {
                error!("❌ Error reproduciendo {} en {}: {}", track.title(), guild_id, reason);
                state.last_played = Some(track.clone());
                let channel = state.text_channel;
                self.notifier
                    .notify(channel, Notice::SessionFailed { track, reason })
                    .await;
            }
        }
        self.play_head(guild_id, slot).await
    }

    /// Arranca la pista en la posición 0. Las pistas que no arrancan se
    /// descartan hasta que una lo haga o la cola quede vacía.
    async fn play_head(&self, guild_id: GuildId, slot: &mut Option<GuildPlayback>) -> Followup {
        loop {
            let Some(state) = slot.as_mut() else {
                return Followup::Done;
            };
            let Some(track) = state.queue.current().cloned() else {
                return self.queue_exhausted(guild_id, slot).await;
            };

            let generation = self.next_generation();
            let request = StartRequest {
                track: track.clone(),
                filters: state.filters.clone(),
                volume: state.volume,
            };
            let sink = EventSink::new(guild_id, generation, self.events.clone());

            match self.backend.start(guild_id, request, sink).await {
                Ok(handle) => {
                    info!("🎵 Reproduciendo en {}: {} (sesión {})", guild_id, track.title(), generation);
                    state.activity = Activity::Playing(ActiveSession {
                        generation,
                        handle,
                        paused: false,
                    });
                    return Followup::Done;
                }
                Err(err) => {
                    error!("❌ No se pudo iniciar {} en {}: {}", track.title(), guild_id, err);
                    state.activity = Activity::Idle;
                    state.queue.drop_current();
                    state.last_played = Some(track.clone());
                    let channel = state.text_channel;
                    self.notifier
                        .notify(
                            channel,
                            Notice::SessionFailed {
                                track,
                                reason: err.to_string(),
                            },
                        )
                        .await;
                }
            }
        }
    }

    async fn queue_exhausted(&self, guild_id: GuildId, slot: &mut Option<GuildPlayback>) -> Followup {
        let Some(state) = slot.as_mut() else {
            return Followup::Done;
        };

        if state.autoplay {
            if let Some(seed) = state.last_played.clone() {
                let generation = self.next_generation();
                state.activity = Activity::AwaitingAutoplay(generation);
                return Followup::Autoplay { seed, generation };
            }
        }

        self.go_idle(guild_id, slot).await;
        Followup::Done
    }

    /// Deja el servidor en reposo: con 24/7 conserva la conexión, si no lo destruye
    async fn go_idle(&self, guild_id: GuildId, slot: &mut Option<GuildPlayback>) {
        let Some(state) = slot.as_mut() else { return };
        state.activity = Activity::Idle;
        let channel = state.text_channel;
        let always_on = state.always_on;

        self.notifier.notify(channel, Notice::QueueFinished).await;

        if always_on {
            info!("🌙 Cola terminada en {}, modo 24/7: conexión retenida", guild_id);
        } else {
            self.destroy(guild_id, slot).await;
        }
    }

    async fn destroy(&self, guild_id: GuildId, slot: &mut Option<GuildPlayback>) {
        let Some(mut state) = slot.take() else { return };
        if let Some(session) = state.take_session() {
            session.handle.stop();
        }
        if let Some(mut connection) = state.connection.take() {
            connection.release().await;
        }
        info!("👋 Estado de reproducción eliminado en {}", guild_id);
    }

    async fn run_followup(&self, guild_id: GuildId, followup: Followup) {
        if let Followup::Autoplay { seed, generation } = followup {
            self.autoplay(guild_id, seed, generation).await;
        }
    }

    /// Busca una pista relacionada sin sostener el lock y la encola si el
    /// estado sigue esperándola. Después suena lo que haya en la cola; si no
    /// queda nada, el servidor pasa a reposo.
    async fn autoplay(&self, guild_id: GuildId, seed: Track, generation: Generation) {
        info!("🔄 Autoplay en {}: buscando algo parecido a {}", guild_id, seed.title());
        let related = self.resolver.related(&seed).await;

        let Some(slot) = self.existing_slot(guild_id) else {
            debug!("🕰️ Resultado de autoplay descartado en {}: sin estado", guild_id);
            return;
        };
        let mut guard = slot.lock().await;
        let Some(state) = guard
            .as_mut()
            .filter(|state| state.is_waiting_on(generation))
        else {
            debug!("🕰️ Resultado de autoplay descartado en {}: el estado cambió", guild_id);
            return;
        };
        state.activity = Activity::Idle;

        match related {
            Ok(track) => match state.queue.push(track.clone()) {
                Ok(_) => {
                    let channel = state.text_channel;
                    self.notifier
                        .notify(channel, Notice::AutoplayQueued(track))
                        .await;
                }
                Err(err) => warn!("⚠️ No se pudo encolar el autoplay en {}: {}", guild_id, err),
            },
            Err(err) => warn!("⚠️ Autoplay sin resultados en {}: {}", guild_id, err),
        }

        if let Followup::Autoplay { .. } = self.play_head(guild_id, &mut guard).await {
            warn!("⚠️ Nada reproducible tras el autoplay en {}, no se buscará otra", guild_id);
            self.go_idle(guild_id, &mut guard).await;
        }
        self.forget_if_empty(guild_id, &slot, &guard);
    }

    /// Arranca de nuevo la pista actual tras un cambio de filtros
    async fn restart(&self, guild_id: GuildId, generation: Generation) {
        let Some(slot) = self.existing_slot(guild_id) else { return };
        let mut guard = slot.lock().await;
        if !guard
            .as_ref()
            .is_some_and(|state| state.is_waiting_on(generation))
        {
            debug!("🕰️ Reinicio con filtros cancelado en {}: el estado cambió", guild_id);
            return;
        }

        if let Some(state) = guard.as_mut() {
            state.activity = Activity::Idle;
        }
        let followup = self.play_head(guild_id, &mut guard).await;
        self.forget_if_empty(guild_id, &slot, &guard);
        drop(guard);
        self.run_followup(guild_id, followup).await;
    }
}
