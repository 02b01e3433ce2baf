use serenity::model::id::UserId;
use std::time::Duration;

/// Una pista ya resuelta: título, localizador reproducible y duración legible.
///
/// Es un valor inmutable; la cola y el estado de reproducción sólo la clonan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    title: String,
    locator: String,
    duration: String,
    thumbnail: Option<String>,
    requested_by: Option<UserId>,
}

impl Track {
    pub fn new(
        title: impl Into<String>,
        locator: impl Into<String>,
        duration: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            locator: locator.into(),
            duration: duration.into(),
            thumbnail: None,
            requested_by: None,
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    pub fn with_requester(mut self, user_id: UserId) -> Self {
        self.requested_by = Some(user_id);
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn duration(&self) -> &str {
        &self.duration
    }

    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnail.as_deref()
    }

    pub fn requested_by(&self) -> Option<UserId> {
        self.requested_by
    }
}

/// Formatea una duración como `m:ss` o `h:mm:ss`
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
