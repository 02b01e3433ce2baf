use serenity::{async_trait, http::Http, model::id::ChannelId};
use std::sync::Arc;
use tracing::{debug, error};

use crate::audio::session::{Notice, Notifier};

/// Publica los avisos del gestor como mensajes de texto
pub struct ChannelNotifier {
    http: Arc<Http>,
}

impl ChannelNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, channel_id: ChannelId, notice: Notice) {
        let content = render_notice(&notice);
        debug!("📣 Aviso para {}: {}", channel_id, content);
        if let Err(e) = channel_id.say(&*self.http, content).await {
            error!("Error al enviar aviso a {}: {:?}", channel_id, e);
        }
    }
}

pub fn render_notice(notice: &Notice) -> String {
    match notice {
        Notice::NowPlaying(track) => match track.requested_by() {
            Some(user) => format!(
                "🎵 Reproduciendo: **{}** `[{}]` · pedido por <@{}>",
                track.title(),
                track.duration(),
                user
            ),
            None => format!("🎵 Reproduciendo: **{}** `[{}]`", track.title(), track.duration()),
        },
        Notice::SessionFailed { track, .. } => {
            format!("❌ No se pudo reproducir **{}**, pasando a la siguiente", track.title())
        }
        Notice::AutoplayQueued(track) => format!("🔄 Autoplay: **{}**", track.title()),
        Notice::QueueFinished => "✅ La cola terminó".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::track::Track;
    use pretty_assertions::assert_eq;
    use serenity::model::id::UserId;

    #[test]
    fn test_render_notice() {
        let track = Track::new("lofi", "https://youtu.be/x", "3:00");
        assert_eq!(
            render_notice(&Notice::NowPlaying(track.clone().with_requester(UserId::new(5)))),
            "🎵 Reproduciendo: **lofi** `[3:00]` · pedido por <@5>"
        );
        assert_eq!(
            render_notice(&Notice::SessionFailed {
                track,
                reason: "403".to_string()
            }),
            "❌ No se pudo reproducir **lofi**, pasando a la siguiente"
        );
    }
}
