//! Error taxonomy shared by the voice gateway, the resolvers and the player.
//!
//! Startup and transport glue use [`anyhow`]; everything the playback core
//! reacts to is one of the typed errors below so handlers can turn it into a
//! reply without string matching.

use std::time::Duration;
use thiserror::Error;

/// Failures reported by a [`crate::voice::VoiceGateway`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// El miembro no está conectado a ningún canal de voz.
    #[error("member is not in a voice channel")]
    NotInVoice,

    #[error("failed to join voice channel: {0}")]
    Join(String),

    #[error("failed to leave voice channel: {0}")]
    Leave(String),

    #[error("playback request failed: {0}")]
    Playback(String),

    /// The playback id is not (or no longer) known to the gateway.
    #[error("unknown playback {0}")]
    UnknownPlayback(u64),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

/// Failures reported by an [`crate::sources::AudioResolver`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("nothing found for `{0}`")]
    NotFound(String),

    #[error("search backend failed: {0}")]
    Backend(String),

    #[error("resolution timed out after {0:?}")]
    Timeout(Duration),
}
