//! # Audio Module
//!
//! Per-guild playback control.
//!
//! ## Architecture
//!
//! ### [`manager`] - Queue Manager
//! - Owns one [`state::GuildPlayback`] per guild behind a per-guild lock
//! - Applies commands and session events, advancing the queue by loop mode
//! - Discards events from superseded sessions by generation
//!
//! ### [`queue`] - Queue Management
//! - Index 0 is the current track
//! - Song/queue/off loop semantics, shuffle and removal of upcoming tracks
//!
//! ### [`effects`] - Filter Presets
//! - Named presets mapped to ffmpeg filter chains
//!
//! ### [`session`] - Seams
//! - Traits for voice connections, audio backends and notifications
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use guild_jukebox::audio::{manager::QueueManager, track::Track};
//! use serenity::all::{ChannelId, GuildId};
//! use std::sync::Arc;
//!
//! # async fn example(manager: Arc<QueueManager>) -> anyhow::Result<()> {
//! let guild_id = GuildId::new(123456789);
//! let track = Track::new("lofi beats", "https://youtu.be/jfKfPfyJRdk", "∞");
//!
//! manager
//!     .enqueue(guild_id, ChannelId::new(1), ChannelId::new(2), track, true)
//!     .await?;
//! manager.pause(guild_id).await?;
//! manager.resume(guild_id).await?;
//! manager.skip(guild_id, true).await?;
//! # Ok(())
//! # }
//! ```

pub mod effects;
pub mod manager;
pub mod queue;
pub mod session;
pub mod state;
pub mod track;

#[cfg(test)]
pub(crate) mod testing;
