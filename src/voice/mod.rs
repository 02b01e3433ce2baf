//! Voice plumbing: songbird adapters for the queue manager's connection and
//! audio seams, track lifecycle forwarding, and the occupancy monitor that
//! leaves empty channels.

pub mod driver;
pub mod events;
pub mod occupancy;

pub use driver::{SongbirdBackend, SongbirdConnector};
pub use occupancy::{OccupancyMonitor, OccupancyState};
