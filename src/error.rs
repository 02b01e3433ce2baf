use thiserror::Error;

/// Errores que devuelven las operaciones del gestor de colas.
///
/// Todos se entregan de forma síncrona a quien invoca la operación, salvo
/// `SessionError`, que nace en eventos asíncronos de la sesión de audio y se
/// reporta por el canal de texto del servidor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerError {
    #[error("se requieren permisos de DJ")]
    NotAuthorized,

    #[error("no hay nada reproduciéndose")]
    NothingPlaying,

    #[error("argumento inválido: {0}")]
    InvalidArgument(String),

    #[error("no se pudo conectar al canal de voz: {0}")]
    ConnectionError(String),

    #[error("no se encontraron resultados para: {0}")]
    ResolutionFailed(String),

    #[error("error en la sesión de audio: {0}")]
    SessionError(String),
}

pub type PlayerResult<T> = Result<T, PlayerError>;

impl PlayerError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Texto corto para responder al usuario
    pub fn user_message(&self) -> String {
        match self {
            Self::NotAuthorized => "🚫 Necesitas permisos de DJ para usar este comando".to_string(),
            Self::NothingPlaying => "❌ No hay nada reproduciéndose actualmente".to_string(),
            Self::InvalidArgument(reason) => format!("⚠️ {}", reason),
            Self::ConnectionError(_) => "❌ No pude unirme al canal de voz".to_string(),
            Self::ResolutionFailed(query) => format!("🔍 No se encontraron resultados para `{}`", query),
            Self::SessionError(_) => "❌ Ocurrió un error al reproducir la canción".to_string(),
        }
    }
}

pub(crate) fn ensure_authorized(authorized: bool) -> PlayerResult<()> {
    if authorized {
        Ok(())
    } else {
        Err(PlayerError::NotAuthorized)
    }
}
