//! # Audio Module
//!
//! Per-guild voice sessions and the playback queue state machine.
//!
//! ## Architecture
//!
//! ### [`player`] - Player
//! - Owns one [`session::RoomSlot`] per guild behind its own lock
//! - Joins and leaves voice channels through the [`crate::voice::VoiceGateway`]
//! - Reacts to enqueue/skip/pause/resume commands and to the gateway's
//!   end/error signals, one event at a time per guild
//!
//! ### [`queue`] - Queue
//! - FIFO of pending tracks, only the head is ever active
//! - Derives the room's [`queue::PlaybackState`]
//!
//! ### [`session`] - Sessions
//! - The bot's voice connection for a guild and the epoch that invalidates
//!   work started before a leave
//!
//! ## State machine
//!
//! ```text
//!  Idle --enqueue--> Draining --gateway ok--> Playing <--resume/pause--> Paused
//!   ^                   |                        |
//!   |                   +--gateway refused--+    +--ended/errored/skip--+
//!   |                                       v                           v
//!   +------------ queue empty <---------- advance <---------------------+
//! ```

pub mod player;
pub mod queue;
pub mod session;
