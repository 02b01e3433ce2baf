//! Normalized command requests.
//!
//! Text messages, slash commands and button presses all become one
//! [`CommandRequest`] that the dispatcher handles through a single entry point.

use serenity::model::{
    id::{ChannelId, GuildId, RoleId, UserId},
    Permissions,
};
use std::fmt;

use crate::audio::queue::LoopMode;

/// Origen de la petición
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Text,
    Slash,
    Button,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play(String),
    Skip,
    Stop,
    Queue,
    Pause,
    Resume,
    Volume(i64),
    NowPlaying,
    Shuffle,
    Loop(Option<LoopMode>),
    Remove(i64),
    Clear,
    Filter(String),
    Autoplay,
    AlwaysOn,
    Setup {
        music_channel: Option<ChannelId>,
        dj_role: Option<RoleId>,
    },
    Help,
}

impl Command {
    /// Consultas que no pasan por el control de DJ
    pub fn is_read_only(&self) -> bool {
        matches!(self, Command::Queue | Command::NowPlaying | Command::Help)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Play(_) => "play",
            Command::Skip => "skip",
            Command::Stop => "stop",
            Command::Queue => "queue",
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::Volume(_) => "volume",
            Command::NowPlaying => "nowplaying",
            Command::Shuffle => "shuffle",
            Command::Loop(_) => "loop",
            Command::Remove(_) => "remove",
            Command::Clear => "clear",
            Command::Filter(_) => "filter",
            Command::Autoplay => "autoplay",
            Command::AlwaysOn => "247",
            Command::Setup { .. } => "setup",
            Command::Help => "help",
        }
    }

    /// Interpreta un mensaje de texto con prefijo.
    ///
    /// Devuelve `None` si el mensaje no es un comando conocido.
    pub fn from_text(content: &str, prefix: &str) -> Option<Result<Command, ParseError>> {
        let body = content.trim().strip_prefix(prefix)?;
        let mut parts = body.split_whitespace();
        let name = parts.next()?.to_lowercase();
        let args: Vec<&str> = parts.collect();

        let command = match name.as_str() {
            "play" | "p" => {
                let query = args.join(" ");
                if query.is_empty() {
                    Err(ParseError::MissingArgument("canción o URL"))
                } else {
                    Ok(Command::Play(query))
                }
            }
            "skip" | "s" => Ok(Command::Skip),
            "stop" => Ok(Command::Stop),
            "queue" | "q" => Ok(Command::Queue),
            "pause" => Ok(Command::Pause),
            "resume" => Ok(Command::Resume),
            "volume" | "vol" => parse_number(args.first().copied(), "volumen").map(Command::Volume),
            "nowplaying" | "np" => Ok(Command::NowPlaying),
            "shuffle" => Ok(Command::Shuffle),
            "loop" => parse_loop(args.first().copied()).map(Command::Loop),
            "remove" => parse_number(args.first().copied(), "posición").map(Command::Remove),
            "clear" => Ok(Command::Clear),
            "filter" => match args.first() {
                Some(name) => Ok(Command::Filter(name.to_string())),
                None => Err(ParseError::MissingArgument("filtro")),
            },
            "autoplay" => Ok(Command::Autoplay),
            "247" => Ok(Command::AlwaysOn),
            "help" => Ok(Command::Help),
            _ => return None,
        };
        Some(command)
    }

    /// Interpreta un comando slash a partir de su nombre y opciones
    pub fn from_slash(name: &str, options: &[(String, OptionValue)]) -> Option<Result<Command, ParseError>> {
        let find = |key: &str| {
            options
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value)
        };
        let text = |key: &str| match find(key) {
            Some(OptionValue::Text(value)) => Some(value.clone()),
            _ => None,
        };
        let integer = |key: &str| match find(key) {
            Some(OptionValue::Integer(value)) => Some(*value),
            _ => None,
        };

        let command = match name {
            "play" => text("query")
                .map(Command::Play)
                .ok_or(ParseError::MissingArgument("canción o URL")),
            "skip" => Ok(Command::Skip),
            "stop" => Ok(Command::Stop),
            "queue" => Ok(Command::Queue),
            "pause" => Ok(Command::Pause),
            "resume" => Ok(Command::Resume),
            "volume" => integer("level")
                .map(Command::Volume)
                .ok_or(ParseError::MissingArgument("volumen")),
            "nowplaying" => Ok(Command::NowPlaying),
            "shuffle" => Ok(Command::Shuffle),
            "loop" => parse_loop(text("mode").as_deref()).map(Command::Loop),
            "remove" => integer("position")
                .map(Command::Remove)
                .ok_or(ParseError::MissingArgument("posición")),
            "clear" => Ok(Command::Clear),
            "filter" => text("type")
                .map(Command::Filter)
                .ok_or(ParseError::MissingArgument("filtro")),
            "autoplay" => Ok(Command::Autoplay),
            "247" => Ok(Command::AlwaysOn),
            "setup" => Ok(Command::Setup {
                music_channel: match find("channel") {
                    Some(OptionValue::Channel(id)) => Some(*id),
                    _ => None,
                },
                dj_role: match find("djrole") {
                    Some(OptionValue::Role(id)) => Some(*id),
                    _ => None,
                },
            }),
            "help" => Ok(Command::Help),
            _ => return None,
        };
        Some(command)
    }

    /// Botones del reproductor
    pub fn from_button(custom_id: &str) -> Option<Command> {
        match custom_id {
            "pause" => Some(Command::Pause),
            "resume" => Some(Command::Resume),
            "skip" => Some(Command::Skip),
            "stop" => Some(Command::Stop),
            "queue" => Some(Command::Queue),
            _ => None,
        }
    }
}

fn parse_number(arg: Option<&str>, what: &'static str) -> Result<i64, ParseError> {
    let arg = arg.ok_or(ParseError::MissingArgument(what))?;
    arg.parse()
        .map_err(|_| ParseError::InvalidNumber(arg.to_string()))
}

/// Sin argumento, el modo pasa al siguiente del ciclo
fn parse_loop(arg: Option<&str>) -> Result<Option<LoopMode>, ParseError> {
    match arg {
        None => Ok(None),
        Some(mode) => mode
            .parse()
            .map(Some)
            .map_err(|_| ParseError::InvalidLoopMode(mode.to_string())),
    }
}

/// Valor de una opción de comando slash, ya extraído de Discord
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Text(String),
    Integer(i64),
    Channel(ChannelId),
    Role(RoleId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    MissingArgument(&'static str),
    InvalidNumber(String),
    InvalidLoopMode(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MissingArgument(what) => write!(f, "⚠️ Falta el argumento: {}", what),
            ParseError::InvalidNumber(value) => write!(f, "⚠️ `{}` no es un número válido", value),
            ParseError::InvalidLoopMode(value) => {
                write!(f, "⚠️ Modo `{}` desconocido. Usa off, song o queue", value)
            }
        }
    }
}

/// Roles y permisos de quien envía la petición
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberAccess {
    pub roles: Vec<RoleId>,
    pub permissions: Permissions,
}

impl MemberAccess {
    pub fn new(roles: Vec<RoleId>, permissions: Permissions) -> Self {
        Self { roles, permissions }
    }
}

/// One command from any origin, with everything the dispatcher needs to
/// authorize and execute it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub origin: Origin,
    pub guild_id: GuildId,
    pub text_channel: ChannelId,
    pub user_id: UserId,
    /// Canal de voz del autor, si está en uno
    pub voice_channel: Option<ChannelId>,
    pub member: MemberAccess,
    pub command: Command,
}
