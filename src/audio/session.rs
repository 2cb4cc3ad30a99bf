use serenity::model::id::GuildId;

use super::queue::PlaybackQueue;
use crate::voice::{ConnectionHandle, PlaybackId};

/// Presencia del bot en el canal de voz de una guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceSession {
    pub guild_id: GuildId,
    pub connection: ConnectionHandle,
}

/// Todo lo que el player guarda por guild, tras un único lock.
#[derive(Debug, Default)]
pub struct RoomSlot {
    pub session: Option<VoiceSession>,
    /// `None` significa que la guild está inactiva.
    pub queue: Option<PlaybackQueue>,
    /// Bumped whenever the bot leaves; work started before that is discarded.
    pub epoch: u64,
    /// A `leave` dropped a live session and Discord has not yet echoed the
    /// resulting voice state update.
    pub leave_echo_pending: bool,
}

impl RoomSlot {
    /// Descarta sesión y cola e invalida los comandos en curso.
    pub fn reset(&mut self) -> Option<VoiceSession> {
        self.epoch += 1;
        self.queue = None;
        self.session.take()
    }

    /// Playback id del head, si el gateway lo está reproduciendo.
    pub fn active_playback(&self) -> Option<PlaybackId> {
        self.queue
            .as_ref()
            .and_then(PlaybackQueue::head)
            .and_then(|head| head.playback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{audio::queue::QueueItem, sources::TrackRef};
    use pretty_assertions::assert_eq;
    use serenity::model::id::{ChannelId, UserId};

    #[test]
    fn reset_bumps_epoch_and_returns_the_session() {
        let session = VoiceSession {
            guild_id: GuildId::new(1),
            connection: ConnectionHandle {
                channel_id: ChannelId::new(10),
            },
        };
        let mut queue = PlaybackQueue::new();
        queue.push(QueueItem::new(
            TrackRef::Remote {
                title: "a".into(),
                url: "https://example.com/a".into(),
            },
            Some(ChannelId::new(10)),
            UserId::new(7),
        ));
        queue.head_mut().unwrap().playback = Some(PlaybackId(4));

        let mut slot = RoomSlot {
            session: Some(session),
            queue: Some(queue),
            ..Default::default()
        };
        assert_eq!(slot.active_playback(), Some(PlaybackId(4)));

        assert_eq!(slot.reset(), Some(session));
        assert_eq!(slot.epoch, 1);
        assert_eq!(slot.active_playback(), None);
        assert_eq!(slot.reset(), None);
        assert_eq!(slot.epoch, 2);
    }
}
