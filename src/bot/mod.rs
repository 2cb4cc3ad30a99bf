//! # Bot Module
//!
//! Discord-facing side of the bot.
//!
//! - [`JukeboxBot`] implements Serenity's [`EventHandler`]: it filters inbound
//!   messages, captures the author's voice channel from the cache and hands
//!   the text to the [`router::Router`]
//! - [`router`] parses `<prefix><command> <params>` and dispatches
//! - [`commands`] is the static command table, [`help`] renders it
//! - [`handlers`] turn commands into [`crate::audio::player::Player`] calls
//!   and reply text

use anyhow::Result;
use serenity::{
    all::{Context, EventHandler, Message, Ready, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{debug, error, info};

pub mod commands;
pub mod handlers;
pub mod help;
pub mod router;

use crate::{
    audio::player::{Player, RoomContext},
    config::Config,
    sources::AudioResolver,
};
use handlers::{CommandContext, Services};
use router::Router;

/// Event handler de Serenity para el jukebox.
pub struct JukeboxBot {
    router: Router,
    player: Arc<Player>,
}

impl JukeboxBot {
    pub fn new(
        config: &Config,
        player: Arc<Player>,
        resolver: Arc<dyn AudioResolver>,
    ) -> Result<Self> {
        let services = Services {
            player: player.clone(),
            resolver,
            prefix: config.command_prefix.clone(),
        };

        Ok(Self {
            router: Router::new(services)?,
            player,
        })
    }

    /// Builds the command context, or `None` for messages the bot must not
    /// act on: its own, other bots', and anything outside a guild text channel.
    fn command_context(ctx: &Context, msg: &Message) -> Option<CommandContext> {
        if msg.author.bot || msg.author.id == ctx.cache.current_user().id {
            return None;
        }
        let guild_id = msg.guild_id?;

        let voice_channel = guild_id.to_guild_cached(&ctx.cache).and_then(|guild| {
            guild
                .voice_states
                .get(&msg.author.id)
                .and_then(|voice_state| voice_state.channel_id)
        });

        Some(CommandContext {
            room: RoomContext {
                guild_id,
                voice_channel,
                member: msg.author.id,
            },
            text_channel: msg.channel_id,
        })
    }
}

#[async_trait]
impl EventHandler for JukeboxBot {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea", ready.user.name);
        info!("📊 Conectado a {} guilds", ready.guilds.len());
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let Some(command_ctx) = Self::command_context(&ctx, &msg) else {
            return;
        };

        let Some(reply) = self.router.route(&command_ctx, &msg.content).await else {
            return;
        };

        if let Err(e) = command_ctx.text_channel.say(&ctx.http, reply).await {
            error!("Error al responder en canal {}: {:?}", command_ctx.text_channel, e);
        }
    }

    /// Limpia el estado cuando alguien más desconecta al bot del canal de voz.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id {
            return;
        }

        if old.is_some() && new.channel_id.is_none() {
            if let Some(guild_id) = new.guild_id {
                debug!("Bot voice state cleared in guild {}", guild_id);
                self.player.handle_disconnect(guild_id).await;
            }
        }
    }
}
