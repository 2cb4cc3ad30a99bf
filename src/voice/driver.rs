use async_trait::async_trait;
use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    error::JoinError,
    input::{File, Input, YoutubeDl},
    tracks::TrackHandle,
    Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{ConnectionHandle, PlaybackId, PlaybackNotifier, VoiceGateway};
use crate::{error::GatewayError, sources::TrackRef};

/// Handles de tracks activos, indexados por playback y etiquetados con su guild.
struct TrackRegistry<H> {
    entries: DashMap<PlaybackId, (GuildId, H)>,
}

impl<H: Clone> TrackRegistry<H> {
    fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    fn insert(&self, guild_id: GuildId, playback_id: PlaybackId, handle: H) {
        self.entries.insert(playback_id, (guild_id, handle));
    }

    fn get(&self, playback_id: PlaybackId) -> Option<H> {
        self.entries
            .get(&playback_id)
            .map(|entry| entry.value().1.clone())
    }

    fn remove(&self, playback_id: PlaybackId) -> Option<H> {
        self.entries
            .remove(&playback_id)
            .map(|(_, (_, handle))| handle)
    }

    /// Olvida todos los tracks de una guild; devuelve cuántos había.
    fn forget_guild(&self, guild_id: GuildId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, (owner, _)| *owner != guild_id);
        before.saturating_sub(self.entries.len())
    }
}

/// Gateway de voz sobre el manager de songbird registrado en el cliente de serenity.
pub struct SongbirdGateway {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    tracks: Arc<TrackRegistry<TrackHandle>>,
}

impl SongbirdGateway {
    pub fn new(manager: Arc<Songbird>) -> Self {
        Self {
            manager,
            http: reqwest::Client::new(),
            tracks: Arc::new(TrackRegistry::new()),
        }
    }

    fn input_for(&self, track: &TrackRef) -> Input {
        match track {
            TrackRef::Asset { path, .. } => File::new(path.clone()).into(),
            TrackRef::Remote { url, .. } => YoutubeDl::new(self.http.clone(), url.clone()).into(),
        }
    }

    fn track(&self, playback_id: PlaybackId) -> Result<TrackHandle, GatewayError> {
        self.tracks
            .get(playback_id)
            .ok_or(GatewayError::UnknownPlayback(playback_id.0))
    }
}

#[async_trait]
impl VoiceGateway for SongbirdGateway {
    async fn join(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<ConnectionHandle, GatewayError> {
        match self.manager.join(guild_id, channel_id).await {
            Ok(_call) => {
                info!("🔊 Conectado al canal de voz {} en guild {}", channel_id, guild_id);
                Ok(ConnectionHandle { channel_id })
            }
            Err(e) => {
                error!("Error al conectar al canal de voz en guild {}: {:?}", guild_id, e);
                // Una llamada a medio abrir bloquearía el siguiente intento
                if let Err(cleanup) = self.manager.remove(guild_id).await {
                    debug!("No call to clean up in guild {}: {:?}", guild_id, cleanup);
                }
                Err(GatewayError::Join(e.to_string()))
            }
        }
    }

    async fn leave(&self, guild_id: GuildId) -> Result<(), GatewayError> {
        // songbird suelta los tracks con la llamada, aunque no siempre emita End
        let forgotten = self.tracks.forget_guild(guild_id);
        if forgotten > 0 {
            debug!("Dropped {} track handles for guild {}", forgotten, guild_id);
        }

        match self.manager.remove(guild_id).await {
            Ok(()) => {
                info!("👋 Desconectado del canal de voz en guild {}", guild_id);
                Ok(())
            }
            Err(JoinError::NoCall) => {
                debug!("Leave requested for guild {} without an active call", guild_id);
                Ok(())
            }
            Err(e) => Err(GatewayError::Leave(e.to_string())),
        }
    }

    async fn play(
        &self,
        guild_id: GuildId,
        track: &TrackRef,
        notifier: PlaybackNotifier,
    ) -> Result<(), GatewayError> {
        let call = self
            .manager
            .get(guild_id)
            .ok_or_else(|| GatewayError::Playback(format!("no voice call in guild {guild_id}")))?;

        let input = self.input_for(track);
        let handle = {
            let mut call = call.lock().await;
            call.play_input(input)
        };

        let playback_id = notifier.playback_id();
        self.tracks.insert(guild_id, playback_id, handle.clone());

        for (event, kind) in [
            (TrackEvent::End, SignalKind::Ended),
            (TrackEvent::Error, SignalKind::Errored),
        ] {
            let registered = handle.add_event(
                Event::Track(event),
                TrackSignalHandler {
                    kind,
                    notifier: notifier.clone(),
                    tracks: self.tracks.clone(),
                },
            );
            if let Err(e) = registered {
                self.tracks.remove(playback_id);
                if let Err(stop) = handle.stop() {
                    debug!("Track {} was already gone: {:?}", playback_id, stop);
                }
                return Err(GatewayError::Playback(format!(
                    "could not register track events: {e}"
                )));
            }
        }

        debug!("Started playback {} of {} in guild {}", playback_id, track, guild_id);
        Ok(())
    }

    async fn pause(&self, playback_id: PlaybackId) -> Result<(), GatewayError> {
        self.track(playback_id)?
            .pause()
            .map_err(|e| GatewayError::Playback(e.to_string()))
    }

    async fn resume(&self, playback_id: PlaybackId) -> Result<(), GatewayError> {
        self.track(playback_id)?
            .play()
            .map_err(|e| GatewayError::Playback(e.to_string()))
    }

    async fn stop(&self, playback_id: PlaybackId) -> Result<(), GatewayError> {
        let Some(handle) = self.tracks.remove(playback_id) else {
            return Err(GatewayError::UnknownPlayback(playback_id.0));
        };
        handle
            .stop()
            .map_err(|e| GatewayError::Playback(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy)]
enum SignalKind {
    Ended,
    Errored,
}

/// Reenvía al player los eventos de fin/error de songbird.
struct TrackSignalHandler {
    kind: SignalKind,
    notifier: PlaybackNotifier,
    tracks: Arc<TrackRegistry<TrackHandle>>,
}

#[async_trait]
impl VoiceEventHandler for TrackSignalHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        self.tracks.remove(self.notifier.playback_id());

        match self.kind {
            SignalKind::Ended => {
                debug!("🎵 Playback {} ended", self.notifier.playback_id());
                self.notifier.ended();
            }
            SignalKind::Errored => {
                let mut reason = String::from("track error");
                if let EventContext::Track(track_list) = ctx {
                    if let Some((state, _handle)) = track_list.first() {
                        reason = format!("{:?}", state.playing);
                    }
                }
                warn!("❌ Error en playback {}: {}", self.notifier.playback_id(), reason);
                self.notifier.errored(reason);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn forgetting_a_guild_keeps_other_guilds_tracks() {
        let registry = TrackRegistry::new();
        let (g1, g2) = (GuildId::new(1), GuildId::new(2));
        registry.insert(g1, PlaybackId(1), "a");
        registry.insert(g1, PlaybackId(2), "b");
        registry.insert(g2, PlaybackId(3), "c");

        assert_eq!(registry.forget_guild(g1), 2);
        assert_eq!(registry.get(PlaybackId(1)), None);
        assert_eq!(registry.get(PlaybackId(3)), Some("c"));
        assert_eq!(registry.forget_guild(g1), 0);
    }

    #[test]
    fn remove_returns_the_handle_once() {
        let registry = TrackRegistry::new();
        registry.insert(GuildId::new(1), PlaybackId(7), "a");

        assert_eq!(registry.remove(PlaybackId(7)), Some("a"));
        assert_eq!(registry.remove(PlaybackId(7)), None);
    }
}
