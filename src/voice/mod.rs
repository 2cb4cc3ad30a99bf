//! # Voice Gateway
//!
//! The contract between the playback core and whatever actually moves audio
//! into a voice channel. [`driver::SongbirdGateway`] is the production
//! implementation; tests use the recording fake in `testing`.
//!
//! Playback lifecycle is reported explicitly: every [`VoiceGateway::play`]
//! receives a [`PlaybackNotifier`] and must call [`PlaybackNotifier::ended`]
//! or [`PlaybackNotifier::errored`] exactly when the stream finishes. The
//! player never infers completion from audio activity.

pub mod driver;
#[cfg(test)]
pub mod testing;

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use std::fmt;
use tokio::sync::mpsc;
use tracing::debug;

use crate::{error::GatewayError, sources::TrackRef};

pub use driver::SongbirdGateway;

/// Identifica una petición de reproducción durante toda la vida del proceso.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaybackId(pub u64);

impl fmt::Display for PlaybackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lo que devuelve el gateway al unirse a un canal de voz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionHandle {
    pub channel_id: ChannelId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Ended,
    Errored(String),
}

/// Señal de ciclo de vida emitida por el gateway para un playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSignal {
    pub guild_id: GuildId,
    pub playback_id: PlaybackId,
    pub outcome: PlaybackOutcome,
}

pub type SignalSender = mpsc::UnboundedSender<PlaybackSignal>;
pub type SignalReceiver = mpsc::UnboundedReceiver<PlaybackSignal>;

/// Notifica al player el final de un playback.
#[derive(Debug, Clone)]
pub struct PlaybackNotifier {
    guild_id: GuildId,
    playback_id: PlaybackId,
    tx: SignalSender,
}

impl PlaybackNotifier {
    pub fn new(guild_id: GuildId, playback_id: PlaybackId, tx: SignalSender) -> Self {
        Self {
            guild_id,
            playback_id,
            tx,
        }
    }

    pub fn playback_id(&self) -> PlaybackId {
        self.playback_id
    }

    pub fn ended(&self) {
        self.send(PlaybackOutcome::Ended);
    }

    pub fn errored(&self, reason: impl Into<String>) {
        self.send(PlaybackOutcome::Errored(reason.into()));
    }

    fn send(&self, outcome: PlaybackOutcome) {
        let signal = PlaybackSignal {
            guild_id: self.guild_id,
            playback_id: self.playback_id,
            outcome,
        };
        if self.tx.send(signal).is_err() {
            // El player ya no existe, estamos apagando
            debug!("Dropping signal for playback {}", self.playback_id);
        }
    }
}

/// Entrar/salir de canales de voz y controlar la reproducción en ellos.
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    async fn join(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<ConnectionHandle, GatewayError>;

    /// Sale del canal de voz de la guild. No estar conectado no es un error.
    async fn leave(&self, guild_id: GuildId) -> Result<(), GatewayError>;

    async fn play(
        &self,
        guild_id: GuildId,
        track: &TrackRef,
        notifier: PlaybackNotifier,
    ) -> Result<(), GatewayError>;

    async fn pause(&self, playback_id: PlaybackId) -> Result<(), GatewayError>;

    async fn resume(&self, playback_id: PlaybackId) -> Result<(), GatewayError>;

    /// Detiene un playback de inmediato. Puede emitir igualmente su señal `ended`.
    async fn stop(&self, playback_id: PlaybackId) -> Result<(), GatewayError>;
}
