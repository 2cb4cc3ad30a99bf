use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use super::{
    queue::{PlaybackQueue, QueueItem},
    session::{RoomSlot, VoiceSession},
};
use crate::{
    error::GatewayError,
    sources::TrackRef,
    voice::{
        PlaybackNotifier, PlaybackOutcome, PlaybackId, PlaybackSignal, SignalReceiver,
        SignalSender, VoiceGateway,
    },
};

/// Quién pide, y desde dónde.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomContext {
    pub guild_id: GuildId,
    /// Canal de voz actual del miembro, si lo hay.
    pub voice_channel: Option<ChannelId>,
    pub member: UserId,
}

#[derive(Debug, Clone, Copy)]
pub struct PlayerSettings {
    pub gateway_timeout: Duration,
    pub max_queue_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The room was idle and the track is now playing.
    Started,
    /// Agregado detrás del head actual.
    Queued { position: usize },
    Full,
    /// The bot left the room while the track was being resolved.
    Cancelled,
    /// Nada de la cola pudo iniciarse.
    Unplayable,
    NotConnected(GatewayError),
}

enum Advance {
    Playing,
    Idle,
    JoinFailed(GatewayError),
}

/// Owns every room's voice session and playback queue.
///
/// Each guild has one [`RoomSlot`] behind its own async mutex. All commands
/// and gateway signals for a guild take that lock, so they are applied one
/// at a time while other guilds proceed independently.
pub struct Player {
    gateway: Arc<dyn VoiceGateway>,
    settings: PlayerSettings,
    rooms: DashMap<GuildId, Arc<Mutex<RoomSlot>>>,
    next_playback: AtomicU64,
    signals: SignalSender,
}

impl Player {
    /// Creates the player and the receiving end of its gateway signals.
    ///
    /// Hand the receiver to [`Player::spawn_signal_loop`] so playback can advance.
    pub fn new(
        gateway: Arc<dyn VoiceGateway>,
        settings: PlayerSettings,
    ) -> (Arc<Self>, SignalReceiver) {
        let (signals, receiver) = mpsc::unbounded_channel();
        let player = Arc::new(Self {
            gateway,
            settings,
            rooms: DashMap::new(),
            next_playback: AtomicU64::new(1),
            signals,
        });
        (player, receiver)
    }

    /// Procesa las señales del gateway hasta que el player se libera.
    pub fn spawn_signal_loop(player: &Arc<Self>, mut receiver: SignalReceiver) -> JoinHandle<()> {
        let player = Arc::downgrade(player);
        tokio::spawn(async move {
            while let Some(signal) = receiver.recv().await {
                let Some(player) = player.upgrade() else {
                    break;
                };
                player.handle_signal(signal).await;
            }
            debug!("Playback signal loop stopped");
        })
    }

    fn room(&self, guild_id: GuildId) -> Arc<Mutex<RoomSlot>> {
        self.rooms.entry(guild_id).or_default().clone()
    }

    fn existing_room(&self, guild_id: GuildId) -> Option<Arc<Mutex<RoomSlot>>> {
        self.rooms.get(&guild_id).map(|room| room.clone())
    }

    async fn guarded<T>(
        &self,
        operation: &'static str,
        request: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        let after = self.settings.gateway_timeout;
        tokio::time::timeout(after, request)
            .await
            .map_err(|_| GatewayError::Timeout { operation, after })?
    }

    async fn connect(
        &self,
        guild_id: GuildId,
        voice_channel: Option<ChannelId>,
        slot: &mut RoomSlot,
    ) -> Result<(), GatewayError> {
        let channel_id = voice_channel.ok_or(GatewayError::NotInVoice)?;
        let connection = self
            .guarded("join", self.gateway.join(guild_id, channel_id))
            .await?;

        // songbird mantiene una sola llamada por guild; reconectar la mueve
        if let Some(previous) = slot.session.replace(VoiceSession {
            guild_id,
            connection,
        }) {
            debug!(
                "Replaced voice session in guild {} (was channel {})",
                previous.guild_id, previous.connection.channel_id
            );
        }
        Ok(())
    }

    /// Se une al canal de voz del miembro, reemplazando la sesión existente.
    pub async fn join(&self, ctx: &RoomContext) -> Result<(), GatewayError> {
        let room = self.room(ctx.guild_id);
        let mut slot = room.lock().await;

        match self.connect(ctx.guild_id, ctx.voice_channel, &mut slot).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("No se pudo conectar al canal de voz en guild {}: {}", ctx.guild_id, e);
                Err(e)
            }
        }
    }

    /// Descarta sesión y cola de la guild y sale del canal de voz.
    pub async fn leave(&self, guild_id: GuildId) -> Result<(), GatewayError> {
        let room = self.room(guild_id);
        let mut slot = room.lock().await;

        if slot.reset().is_some() {
            // Discord confirmará la salida con un voice state update propio
            slot.leave_echo_pending = true;
            debug!("Voice session for guild {} removed", guild_id);
        }

        self.guarded("leave", self.gateway.leave(guild_id))
            .await
            .inspect_err(|e| warn!("Error al salir del canal de voz en guild {}: {}", guild_id, e))
    }

    /// Tears a room down after the platform disconnected the bot from voice.
    ///
    /// The first disconnect after a [`Player::leave`] is that leave's own echo
    /// and is ignored, so a session opened since then survives it.
    pub async fn handle_disconnect(&self, guild_id: GuildId) {
        let Some(room) = self.existing_room(guild_id) else {
            return;
        };
        let mut slot = room.lock().await;

        if std::mem::take(&mut slot.leave_echo_pending) {
            debug!("Ignoring disconnect echo of our own leave in guild {}", guild_id);
            return;
        }
        if slot.session.is_none() {
            return;
        }

        if let Some(playback_id) = slot.active_playback() {
            if let Err(e) = self.guarded("stop", self.gateway.stop(playback_id)).await {
                warn!("Error al detener {} en guild {}: {}", playback_id, guild_id, e);
            }
        }
        slot.reset();
        info!("🔌 Bot desconectado externamente en guild {}", guild_id);
    }

    /// Epoch actual de la guild; se devuelve a [`Player::enqueue`].
    pub async fn epoch(&self, guild_id: GuildId) -> u64 {
        self.room(guild_id).lock().await.epoch
    }

    /// Agrega un track. Solo inicia reproducción si la guild estaba inactiva.
    pub async fn enqueue(&self, ctx: &RoomContext, track: TrackRef, epoch: u64) -> EnqueueOutcome {
        let room = self.room(ctx.guild_id);
        let mut slot = room.lock().await;

        if slot.epoch != epoch {
            info!(
                "Descartando {} en guild {}: el bot salió mientras se resolvía",
                track, ctx.guild_id
            );
            return EnqueueOutcome::Cancelled;
        }

        let item = QueueItem::new(track, ctx.voice_channel, ctx.member);
        if let Some(queue) = slot.queue.as_mut() {
            if queue.len() >= self.settings.max_queue_size {
                return EnqueueOutcome::Full;
            }
            let position = queue.push(item);
            return EnqueueOutcome::Queued { position };
        }

        let mut queue = PlaybackQueue::new();
        queue.push(item);
        slot.queue = Some(queue);
        debug!("Guild {}: Idle -> Draining", ctx.guild_id);

        match self.advance(ctx.guild_id, &mut slot).await {
            Advance::Playing => EnqueueOutcome::Started,
            Advance::Idle => EnqueueOutcome::Unplayable,
            Advance::JoinFailed(e) => EnqueueOutcome::NotConnected(e),
        }
    }

    /// Inicia el head de la cola, descartando los que el gateway rechaza.
    async fn advance(&self, guild_id: GuildId, slot: &mut RoomSlot) -> Advance {
        loop {
            let Some(head) = slot.queue.as_ref().and_then(PlaybackQueue::head) else {
                if slot.queue.take().is_some() {
                    debug!("Guild {}: queue drained -> Idle", guild_id);
                }
                return Advance::Idle;
            };
            let track = head.track.clone();
            let voice_channel = head.voice_channel;
            let requested_by = head.requested_by;

            if slot.session.is_none() {
                if let Err(e) = self.connect(guild_id, voice_channel, slot).await {
                    warn!("No se puede iniciar {} en guild {}: {}", track, guild_id, e);
                    slot.queue = None;
                    return Advance::JoinFailed(e);
                }
            }

            let playback_id = PlaybackId(self.next_playback.fetch_add(1, Ordering::Relaxed));
            let notifier = PlaybackNotifier::new(guild_id, playback_id, self.signals.clone());

            match self
                .guarded("play", self.gateway.play(guild_id, &track, notifier))
                .await
            {
                Ok(()) => {
                    if let Some(head) = slot.queue.as_mut().and_then(PlaybackQueue::head_mut) {
                        head.playback = Some(playback_id);
                    }
                    info!(
                        "▶️ Reproduciendo {} en guild {} para {} ({})",
                        track, guild_id, requested_by, playback_id
                    );
                    return Advance::Playing;
                }
                Err(e) => {
                    warn!("Saltando {} en guild {}: {}", track, guild_id, e);
                    if let Some(queue) = slot.queue.as_mut() {
                        queue.pop_head();
                    }
                }
            }
        }
    }

    /// Applies a gateway lifecycle signal. Signals for anything but the
    /// current head are stale and ignored.
    pub async fn handle_signal(&self, signal: PlaybackSignal) {
        let PlaybackSignal {
            guild_id,
            playback_id,
            outcome,
        } = signal;

        let Some(room) = self.existing_room(guild_id) else {
            debug!("Ignoring signal for {} in unknown guild {}", playback_id, guild_id);
            return;
        };
        let mut slot = room.lock().await;

        let Some(queue) = slot.queue.as_mut() else {
            debug!("Ignoring signal for {} in idle guild {}", playback_id, guild_id);
            return;
        };
        if !queue.is_head_playback(playback_id) {
            debug!("Ignoring stale signal for {} in guild {}", playback_id, guild_id);
            return;
        }

        debug!("Guild {}: {} reported while {:?}", guild_id, playback_id, queue.state());
        match outcome {
            PlaybackOutcome::Ended => {
                if queue.head().is_some_and(|head| head.paused_by_user) {
                    debug!("Playback {} reported end while paused, keeping it", playback_id);
                    return;
                }
                debug!("Playback {} finished in guild {}", playback_id, guild_id);
            }
            PlaybackOutcome::Errored(reason) => {
                warn!("Playback {} falló en guild {}: {}", playback_id, guild_id, reason);
            }
        }

        queue.pop_head();
        self.advance(guild_id, &mut slot).await;
    }

    /// Pausa el head. Devuelve si se pausó algo.
    pub async fn pause(&self, guild_id: GuildId) -> bool {
        let Some(room) = self.existing_room(guild_id) else {
            return false;
        };
        let mut slot = room.lock().await;
        let Some(head) = slot.queue.as_mut().and_then(PlaybackQueue::head_mut) else {
            return false;
        };
        let Some(playback_id) = head.playback.filter(|_| !head.paused_by_user) else {
            return false;
        };

        match self.guarded("pause", self.gateway.pause(playback_id)).await {
            Ok(()) => {
                head.paused_by_user = true;
                info!("⏸️ Pausado {} en guild {}", head.track.title(), guild_id);
                true
            }
            Err(e) => {
                warn!("Error al pausar en guild {}: {}", guild_id, e);
                false
            }
        }
    }

    /// Reanuda un head pausado por un usuario. Devuelve si se reanudó algo.
    pub async fn resume(&self, guild_id: GuildId) -> bool {
        let Some(room) = self.existing_room(guild_id) else {
            return false;
        };
        let mut slot = room.lock().await;
        let Some(head) = slot.queue.as_mut().and_then(PlaybackQueue::head_mut) else {
            return false;
        };
        let Some(playback_id) = head.playback.filter(|_| head.paused_by_user) else {
            return false;
        };

        match self.guarded("resume", self.gateway.resume(playback_id)).await {
            Ok(()) => {
                head.paused_by_user = false;
                info!("▶️ Reanudado {} en guild {}", head.track.title(), guild_id);
                true
            }
            Err(e) => {
                warn!("Error al reanudar en guild {}: {}", guild_id, e);
                false
            }
        }
    }

    /// Halts and removes the head, then starts the next item.
    /// Returns the skipped title, or `None` when nothing was queued.
    pub async fn skip(&self, guild_id: GuildId) -> Option<String> {
        let room = self.existing_room(guild_id)?;
        let mut slot = room.lock().await;

        let head = slot.queue.as_ref().and_then(PlaybackQueue::head)?;
        let playback = head.playback;
        let title = head.track.title().to_string();

        if let Some(playback_id) = playback {
            if let Err(e) = self.guarded("stop", self.gateway.stop(playback_id)).await {
                warn!("Error al detener {} en guild {}: {}", playback_id, guild_id, e);
            }
        }
        if let Some(queue) = slot.queue.as_mut() {
            queue.pop_head();
        }
        info!("⏭️ Saltado {} en guild {}", title, guild_id);

        self.advance(guild_id, &mut slot).await;
        Some(title)
    }

    #[cfg(test)]
    pub async fn state(&self, guild_id: GuildId) -> super::queue::PlaybackState {
        use super::queue::PlaybackState;

        let Some(room) = self.existing_room(guild_id) else {
            return PlaybackState::Idle;
        };
        let slot = room.lock().await;
        slot.queue
            .as_ref()
            .map_or(PlaybackState::Idle, PlaybackQueue::state)
    }

    #[cfg(test)]
    pub async fn session(&self, guild_id: GuildId) -> Option<VoiceSession> {
        let room = self.existing_room(guild_id)?;
        let slot = room.lock().await;
        slot.session
    }

    #[cfg(test)]
    pub async fn queue_titles(&self, guild_id: GuildId) -> Option<Vec<String>> {
        let room = self.existing_room(guild_id)?;
        let slot = room.lock().await;
        slot.queue.as_ref().map(PlaybackQueue::titles)
    }
}
