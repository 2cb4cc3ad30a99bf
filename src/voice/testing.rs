//! Recording in-memory gateway for unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use std::collections::{HashMap, HashSet};

use super::{ConnectionHandle, PlaybackId, PlaybackNotifier, VoiceGateway};
use crate::{error::GatewayError, sources::TrackRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Join(GuildId, ChannelId),
    Leave(GuildId),
    Play(PlaybackId, String),
    Pause(PlaybackId),
    Resume(PlaybackId),
    Stop(PlaybackId),
}

#[derive(Default)]
pub struct FakeGateway {
    calls: Mutex<Vec<GatewayCall>>,
    notifiers: Mutex<HashMap<PlaybackId, PlaybackNotifier>>,
    failing_tracks: Mutex<HashSet<String>>,
    fail_joins: Mutex<bool>,
    hang_joins: Mutex<bool>,
    hang_plays: Mutex<bool>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Títulos pasados a `play`, en orden.
    pub fn played(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                GatewayCall::Play(_, title) => Some(title.clone()),
                _ => None,
            })
            .collect()
    }

    /// Playback id de la última llamada a `play`.
    pub fn last_playback(&self) -> Option<PlaybackId> {
        self.calls.lock().iter().rev().find_map(|call| match call {
            GatewayCall::Play(id, _) => Some(*id),
            _ => None,
        })
    }

    pub fn fail_joins(&self, fail: bool) {
        *self.fail_joins.lock() = fail;
    }

    /// Hace que `join` nunca responda.
    pub fn hang_joins(&self, hang: bool) {
        *self.hang_joins.lock() = hang;
    }

    /// Hace que `play` nunca responda.
    pub fn hang_plays(&self, hang: bool) {
        *self.hang_plays.lock() = hang;
    }

    pub fn fail_track(&self, title: &str) {
        self.failing_tracks.lock().insert(title.to_string());
    }

    /// Emite la señal de fin natural de un playback.
    pub fn finish(&self, playback_id: PlaybackId) {
        if let Some(notifier) = self.notifiers.lock().remove(&playback_id) {
            notifier.ended();
        }
    }

    /// Emite una señal de error para un playback.
    pub fn break_playback(&self, playback_id: PlaybackId, reason: &str) {
        if let Some(notifier) = self.notifiers.lock().remove(&playback_id) {
            notifier.errored(reason);
        }
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl VoiceGateway for FakeGateway {
    async fn join(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<ConnectionHandle, GatewayError> {
        self.record(GatewayCall::Join(guild_id, channel_id));
        let hang = *self.hang_joins.lock();
        if hang {
            std::future::pending::<()>().await;
        }
        if *self.fail_joins.lock() {
            return Err(GatewayError::Join("missing permissions".into()));
        }
        Ok(ConnectionHandle { channel_id })
    }

    async fn leave(&self, guild_id: GuildId) -> Result<(), GatewayError> {
        self.record(GatewayCall::Leave(guild_id));
        Ok(())
    }

    async fn play(
        &self,
        _guild_id: GuildId,
        track: &TrackRef,
        notifier: PlaybackNotifier,
    ) -> Result<(), GatewayError> {
        let playback_id = notifier.playback_id();
        self.record(GatewayCall::Play(playback_id, track.title().to_string()));
        let hang = *self.hang_plays.lock();
        if hang {
            std::future::pending::<()>().await;
        }
        if self.failing_tracks.lock().contains(track.title()) {
            return Err(GatewayError::Playback("unsupported codec".into()));
        }
        self.notifiers.lock().insert(playback_id, notifier);
        Ok(())
    }

    async fn pause(&self, playback_id: PlaybackId) -> Result<(), GatewayError> {
        self.record(GatewayCall::Pause(playback_id));
        Ok(())
    }

    async fn resume(&self, playback_id: PlaybackId) -> Result<(), GatewayError> {
        self.record(GatewayCall::Resume(playback_id));
        Ok(())
    }

    async fn stop(&self, playback_id: PlaybackId) -> Result<(), GatewayError> {
        self.record(GatewayCall::Stop(playback_id));
        // songbird reporta un track detenido como terminado
        if let Some(notifier) = self.notifiers.lock().remove(&playback_id) {
            notifier.ended();
        }
        Ok(())
    }
}
