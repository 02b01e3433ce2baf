//! Per-guild Discord music controller.
//!
//! The [`audio`] layer owns queues and playback state, [`voice`] binds it to
//! songbird, [`sources`] resolves queries through yt-dlp and [`bot`] wires it
//! all to serenity.

pub mod audio;
pub mod bot;
pub mod config;
pub mod error;
pub mod sources;
pub mod voice;
