use serenity::model::id::{ChannelId, UserId};
use std::collections::VecDeque;
use tracing::info;

use crate::{sources::TrackRef, voice::PlaybackId};

/// Estado de reproducción observable de una guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No existe cola para la guild.
    Idle,
    /// The head has been requested from the gateway but is not playing yet.
    Draining,
    Playing,
    Paused,
}

#[derive(Debug, Clone)]
pub struct QueueItem {
    pub track: TrackRef,
    /// Canal de voz de quien lo agregó, usado para (re)conectar.
    pub voice_channel: Option<ChannelId>,
    pub requested_by: UserId,
    /// Solo presente mientras el gateway reproduce este item.
    pub playback: Option<PlaybackId>,
    pub paused_by_user: bool,
}

impl QueueItem {
    pub fn new(track: TrackRef, voice_channel: Option<ChannelId>, requested_by: UserId) -> Self {
        Self {
            track,
            voice_channel,
            requested_by,
            playback: None,
            paused_by_user: false,
        }
    }
}

/// FIFO of pending tracks for one room. Only the head is ever active.
#[derive(Debug, Default)]
pub struct PlaybackQueue {
    items: VecDeque<QueueItem>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega un item y devuelve su posición (desde 1).
    pub fn push(&mut self, item: QueueItem) -> usize {
        info!("➕ Agregado a la cola: {}", item.track.title());
        self.items.push_back(item);
        self.items.len()
    }

    pub fn head(&self) -> Option<&QueueItem> {
        self.items.front()
    }

    pub fn head_mut(&mut self) -> Option<&mut QueueItem> {
        self.items.front_mut()
    }

    pub fn pop_head(&mut self) -> Option<QueueItem> {
        self.items.pop_front()
    }

    /// Indica si `playback_id` pertenece al head actual.
    pub fn is_head_playback(&self, playback_id: PlaybackId) -> bool {
        self.head().and_then(|head| head.playback) == Some(playback_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn titles(&self) -> Vec<String> {
        self.items
            .iter()
            .map(|item| item.track.title().to_string())
            .collect()
    }

    pub fn state(&self) -> PlaybackState {
        match self.head() {
            None => PlaybackState::Draining,
            Some(head) => match (head.playback, head.paused_by_user) {
                (None, _) => PlaybackState::Draining,
                (Some(_), false) => PlaybackState::Playing,
                (Some(_), true) => PlaybackState::Paused,
            },
        }
    }
}
