use rand::{seq::SliceRandom, Rng};
use std::{collections::VecDeque, fmt, str::FromStr};
use tracing::{debug, info};

use super::track::Track;
use crate::error::{PlayerError, PlayerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    Off,
    Song,
    Queue,
}

impl LoopMode {
    /// Siguiente modo en el ciclo off → song → queue → off
    pub fn next(self) -> Self {
        match self {
            LoopMode::Off => LoopMode::Song,
            LoopMode::Song => LoopMode::Queue,
            LoopMode::Queue => LoopMode::Off,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LoopMode::Off => "off",
            LoopMode::Song => "song",
            LoopMode::Queue => "queue",
        }
    }
}

impl FromStr for LoopMode {
    type Err = PlayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "off" | "none" | "disable" => Ok(LoopMode::Off),
            "song" | "track" | "one" => Ok(LoopMode::Song),
            "queue" | "all" => Ok(LoopMode::Queue),
            other => Err(PlayerError::invalid(format!(
                "Modo de repetición desconocido `{}` (off, song, queue)",
                other
            ))),
        }
    }
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cola de un servidor. La posición 0 es la pista actual.
#[derive(Debug)]
pub struct TrackQueue {
    items: VecDeque<Track>,
    max_size: usize,
}

impl TrackQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            items: VecDeque::new(),
            max_size,
        }
    }

    /// Agrega una pista al final y devuelve su posición (base 1)
    pub fn push(&mut self, track: Track) -> PlayerResult<usize> {
        if self.items.len() >= self.max_size {
            return Err(PlayerError::invalid(format!(
                "La cola está llena (máximo {} canciones)",
                self.max_size
            )));
        }

        info!("➕ Agregado a la cola: {}", track.title());
        self.items.push_back(track);
        Ok(self.items.len())
    }

    pub fn current(&self) -> Option<&Track> {
        self.items.front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.items.iter()
    }

    /// Cierra la pista actual según el modo de repetición.
    ///
    /// `Song` deja la cola igual, `Queue` rota la actual al final y `Off` la descarta.
    pub fn complete(&mut self, mode: LoopMode) {
        match mode {
            LoopMode::Song => {
                debug!("🔂 Repitiendo pista actual");
            }
            LoopMode::Queue => {
                self.items.rotate_left(1.min(self.items.len()));
                debug!("🔁 Pista actual movida al final de la cola");
            }
            LoopMode::Off => {
                self.items.pop_front();
            }
        }
    }

    /// Descarta la pista actual sin importar el modo de repetición
    pub fn drop_current(&mut self) -> Option<Track> {
        self.items.pop_front()
    }

    /// Elimina la pista en `position` (base 1). La actual no se puede eliminar.
    pub fn remove(&mut self, position: usize) -> PlayerResult<Track> {
        if position == 1 {
            return Err(PlayerError::invalid(
                "No puedes eliminar la canción actual, usa skip",
            ));
        }
        if position == 0 || position > self.items.len() {
            return Err(PlayerError::invalid(format!(
                "Posición inválida: la cola tiene {} canciones",
                self.items.len()
            )));
        }

        let track = self
            .items
            .remove(position - 1)
            .ok_or_else(|| PlayerError::invalid("Posición inválida"))?;
        info!("➖ Eliminado de la cola: {}", track.title());
        Ok(track)
    }

    /// Vacía la cola excepto la pista actual; devuelve cuántas se quitaron
    pub fn clear_upcoming(&mut self) -> usize {
        let removed = self.items.len().saturating_sub(1);
        self.items.truncate(1);
        removed
    }

    /// Mezcla las pistas siguientes sin tocar la actual
    pub fn shuffle_upcoming<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let upcoming = self.items.len().saturating_sub(1);
        if upcoming > 1 {
            self.items.make_contiguous()[1..].shuffle(rng);
        }
        upcoming
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
