use dashmap::{mapref::entry::Entry, DashMap};
use serenity::model::id::GuildId;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::audio::{
    manager::{LeaveOutcome, QueueManager},
    session::Generation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupancyState {
    /// Hay al menos un humano en el canal del bot
    Occupied,
    /// Canal vacío, temporizador de salida armado
    PendingLeave,
    /// El bot salió; sólo un nuevo `enqueue` lo trae de vuelta
    Left,
}

struct LeaveTimer {
    epoch: u64,
    token: CancellationToken,
}

struct Presence {
    state: OccupancyState,
    timer: Option<LeaveTimer>,
}

impl Presence {
    fn occupied() -> Self {
        Self {
            state: OccupancyState::Occupied,
            timer: None,
        }
    }

    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.token.cancel();
        }
    }
}

/// Watches who is left in the bot's voice channel and leaves after it has
/// been without humans for `auto_leave`.
///
/// There is at most one timer per guild. A timer remembers the playback
/// state instance it was armed for, so it never tears down a state that was
/// created after it was armed.
pub struct OccupancyMonitor {
    manager: Arc<QueueManager>,
    auto_leave: Duration,
    guilds: DashMap<GuildId, Presence>,
    epochs: AtomicU64,
}

impl OccupancyMonitor {
    pub fn new(manager: Arc<QueueManager>, auto_leave: Duration) -> Arc<Self> {
        Arc::new(Self {
            manager,
            auto_leave,
            guilds: DashMap::new(),
            epochs: AtomicU64::new(0),
        })
    }

    pub fn state(&self, guild_id: GuildId) -> Option<OccupancyState> {
        self.guilds.get(&guild_id).map(|presence| presence.state)
    }

    /// Recibe el número de humanos en el canal del bot tras un cambio de voz
    pub async fn on_membership_change(self: &Arc<Self>, guild_id: GuildId, humans: usize) {
        let instance = self.manager.instance(guild_id).await;

        if humans > 0 {
            match self.guilds.entry(guild_id) {
                Entry::Occupied(mut entry) => {
                    let presence = entry.get_mut();
                    if presence.state == OccupancyState::Left && instance.is_none() {
                        return;
                    }
                    if presence.state == OccupancyState::PendingLeave {
                        info!("👥 Alguien volvió al canal en {}, salida cancelada", guild_id);
                    }
                    presence.disarm();
                    presence.state = OccupancyState::Occupied;
                }
                Entry::Vacant(entry) => {
                    if instance.is_some() {
                        entry.insert(Presence::occupied());
                    }
                }
            }
            return;
        }

        let Some(instance) = instance else {
            debug!("Canal vacío en {} sin estado de reproducción", guild_id);
            return;
        };

        let epoch = self.epochs.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken::new();
        match self.guilds.entry(guild_id) {
            Entry::Occupied(entry) if entry.get().state == OccupancyState::PendingLeave => {
                return;
            }
            Entry::Occupied(mut entry) => {
                let presence = entry.get_mut();
                presence.disarm();
                presence.state = OccupancyState::PendingLeave;
                presence.timer = Some(LeaveTimer {
                    epoch,
                    token: token.clone(),
                });
            }
            Entry::Vacant(entry) => {
                entry.insert(Presence {
                    state: OccupancyState::PendingLeave,
                    timer: Some(LeaveTimer {
                        epoch,
                        token: token.clone(),
                    }),
                });
            }
        }

        info!(
            "⏳ Canal vacío en {}, saldré en {}",
            guild_id,
            humantime::format_duration(self.auto_leave)
        );

        let monitor = Arc::clone(self);
        let delay = self.auto_leave;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Temporizador de salida {} cancelado en {}", epoch, guild_id);
                }
                _ = tokio::time::sleep(delay) => {
                    monitor.expire(guild_id, epoch, instance).await;
                }
            }
        });
    }

    /// Cancela cualquier salida pendiente y olvida el servidor
    pub fn cancel(&self, guild_id: GuildId) {
        if let Some((_, mut presence)) = self.guilds.remove(&guild_id) {
            presence.disarm();
            debug!("Monitor de ocupación reiniciado en {}", guild_id);
        }
    }

    async fn expire(&self, guild_id: GuildId, epoch: u64, instance: Generation) {
        {
            let Some(mut presence) = self.guilds.get_mut(&guild_id) else {
                return;
            };
            let armed = presence.state == OccupancyState::PendingLeave
                && presence.timer.as_ref().is_some_and(|t| t.epoch == epoch);
            if !armed {
                debug!("Temporizador {} obsoleto en {}", epoch, guild_id);
                return;
            }
            presence.timer = None;
        }

        match self.manager.auto_leave(guild_id, instance).await {
            LeaveOutcome::Left => {
                if let Some(mut presence) = self.guilds.get_mut(&guild_id) {
                    presence.state = OccupancyState::Left;
                }
            }
            LeaveOutcome::Retained | LeaveOutcome::Stale => {
                self.guilds.remove(&guild_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::{track, Harness, GUILD, TEXT, VOICE};
    use crate::sources::MockTrackResolver;
    use pretty_assertions::assert_eq;

    const AUTO_LEAVE: Duration = Duration::from_secs(300);

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    async fn playing() -> (Harness, Arc<OccupancyMonitor>) {
        let h = Harness::new(MockTrackResolver::new());
        h.manager
            .enqueue(GUILD, VOICE, TEXT, track("a"), true)
            .await
            .unwrap();
        let monitor = OccupancyMonitor::new(h.manager.clone(), AUTO_LEAVE);
        (h, monitor)
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_channel_leaves_after_timeout() {
        let (h, monitor) = playing().await;

        monitor.on_membership_change(GUILD, 0).await;
        assert_eq!(monitor.state(GUILD), Some(OccupancyState::PendingLeave));

        tokio::time::sleep(AUTO_LEAVE + Duration::from_secs(1)).await;
        settle().await;

        assert_eq!(monitor.state(GUILD), Some(OccupancyState::Left));
        assert!(h.manager.snapshot(GUILD).await.is_none());
        assert_eq!(h.connector.releases(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_returning_human_cancels_leave() {
        let (h, monitor) = playing().await;

        monitor.on_membership_change(GUILD, 0).await;
        tokio::time::sleep(Duration::from_secs(120)).await;
        monitor.on_membership_change(GUILD, 1).await;
        assert_eq!(monitor.state(GUILD), Some(OccupancyState::Occupied));

        tokio::time::sleep(AUTO_LEAVE * 2).await;
        settle().await;

        assert!(h.manager.snapshot(GUILD).await.is_some());
        assert_eq!(h.connector.releases(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_on_retains_connection() {
        let (h, monitor) = playing().await;
        h.manager.toggle_always_on(GUILD, true).await.unwrap();

        monitor.on_membership_change(GUILD, 0).await;
        tokio::time::sleep(AUTO_LEAVE + Duration::from_secs(1)).await;
        settle().await;

        assert!(h.manager.snapshot(GUILD).await.is_some());
        assert_eq!(h.connector.releases(), 0);
        assert_eq!(monitor.state(GUILD), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_from_replaced_state_is_ignored() {
        let (h, monitor) = playing().await;

        monitor.on_membership_change(GUILD, 0).await;
        h.manager.stop(GUILD, true).await.unwrap();
        h.manager
            .enqueue(GUILD, VOICE, TEXT, track("b"), true)
            .await
            .unwrap();

        tokio::time::sleep(AUTO_LEAVE + Duration::from_secs(1)).await;
        settle().await;

        let snapshot = h.manager.snapshot(GUILD).await.unwrap();
        assert_eq!(snapshot.current.unwrap().title(), "b");
        assert_eq!(h.connector.releases(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_disarms_timer() {
        let (h, monitor) = playing().await;

        monitor.on_membership_change(GUILD, 0).await;
        monitor.cancel(GUILD);
        assert_eq!(monitor.state(GUILD), None);

        tokio::time::sleep(AUTO_LEAVE + Duration::from_secs(1)).await;
        settle().await;

        assert!(h.manager.snapshot(GUILD).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_empty_updates_keep_single_timer() {
        let (h, monitor) = playing().await;

        monitor.on_membership_change(GUILD, 0).await;
        tokio::time::sleep(Duration::from_secs(200)).await;
        monitor.on_membership_change(GUILD, 0).await;

        // El primer temporizador sigue mandando
        tokio::time::sleep(Duration::from_secs(101)).await;
        settle().await;
        assert_eq!(h.connector.releases(), 1);
    }

    #[tokio::test]
    async fn test_empty_channel_without_state_is_ignored() {
        let h = Harness::new(MockTrackResolver::new());
        let monitor = OccupancyMonitor::new(h.manager.clone(), AUTO_LEAVE);

        monitor.on_membership_change(GUILD, 0).await;
        assert_eq!(monitor.state(GUILD), None);
    }
}
