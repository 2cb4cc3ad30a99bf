use serenity::model::id::ChannelId;
use std::sync::Arc;
use tracing::warn;

use super::{commands::CommandKind, help};
use crate::{
    audio::player::{EnqueueOutcome, Player, RoomContext},
    error::{GatewayError, ResolveError},
    sources::{AudioResolver, TrackRef},
};

/// Dependencias compartidas por todos los handlers.
pub struct Services {
    pub player: Arc<Player>,
    pub resolver: Arc<dyn AudioResolver>,
    pub prefix: String,
}

/// De dónde vino un comando.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext {
    pub room: RoomContext,
    pub text_channel: ChannelId,
}

/// Runs the handler for `kind`. Failures are logged and turned into replies
/// here; nothing propagates back to the router.
pub async fn dispatch(
    kind: CommandKind,
    ctx: &CommandContext,
    params: &str,
    services: &Services,
) -> Option<String> {
    match kind {
        CommandKind::Help => Some(help::render(&services.prefix, params)),
        CommandKind::Invoke => handle_invoke(ctx, services).await,
        CommandKind::Leave => handle_leave(ctx, services).await,
        CommandKind::Meme => handle_meme(ctx, params, services).await,
        CommandKind::Play => handle_play(ctx, params, services).await,
        CommandKind::Pause => services
            .player
            .pause(ctx.room.guild_id)
            .await
            .then(|| "⏸️ Paused".to_string()),
        CommandKind::Resume => services
            .player
            .resume(ctx.room.guild_id)
            .await
            .then(|| "▶️ Resumed".to_string()),
        CommandKind::Skip => services
            .player
            .skip(ctx.room.guild_id)
            .await
            .map(|title| format!("⏭️ Skipped **{}**", title)),
    }
}

async fn handle_invoke(ctx: &CommandContext, services: &Services) -> Option<String> {
    match services.player.join(&ctx.room).await {
        Ok(()) => ctx
            .room
            .voice_channel
            .map(|channel| format!("🔊 Joined <#{}>", channel)),
        Err(e) => Some(join_failure_reply(&e)),
    }
}

async fn handle_leave(ctx: &CommandContext, services: &Services) -> Option<String> {
    match services.player.leave(ctx.room.guild_id).await {
        Ok(()) => Some("👋 Left the voice channel".to_string()),
        // El player ya lo registró; el estado se limpia de todas formas
        Err(_) => None,
    }
}

async fn handle_meme(ctx: &CommandContext, params: &str, services: &Services) -> Option<String> {
    if params.is_empty() {
        let assets = services.resolver.describe_assets();
        return Some(format!("🔉 Available sounds:\n{}", assets.join("\n")));
    }

    let epoch = services.player.epoch(ctx.room.guild_id).await;
    match services.resolver.resolve_asset(params).await {
        Ok(track) => enqueue(ctx, track, epoch, services).await,
        Err(ResolveError::NotFound(_)) => Some(format!(
            "❓ No sound named `{}`. Use `{}meme` to list them.",
            params, services.prefix
        )),
        Err(e) => {
            warn!("Error buscando el asset `{}`: {}", params, e);
            None
        }
    }
}

async fn handle_play(ctx: &CommandContext, params: &str, services: &Services) -> Option<String> {
    if params.is_empty() {
        return Some(format!("Usage: `{}play <url or search text>`", services.prefix));
    }

    // Capturado antes de la búsqueda lenta, así un `leave` intermedio la cancela
    let epoch = services.player.epoch(ctx.room.guild_id).await;
    match services.resolver.resolve_remote(params).await {
        Ok(track) => enqueue(ctx, track, epoch, services).await,
        Err(ResolveError::NotFound(_)) => Some(format!("❓ Nothing found for `{}`", params)),
        Err(e) => {
            warn!("Error resolviendo `{}`: {}", params, e);
            Some("❌ Search failed, try again later".to_string())
        }
    }
}

async fn enqueue(
    ctx: &CommandContext,
    track: TrackRef,
    epoch: u64,
    services: &Services,
) -> Option<String> {
    let title = track.title().to_string();
    match services.player.enqueue(&ctx.room, track, epoch).await {
        EnqueueOutcome::Started => Some(format!("▶️ Now playing **{}**", title)),
        EnqueueOutcome::Queued { position } => {
            Some(format!("➕ Queued **{}** (position {})", title, position))
        }
        EnqueueOutcome::Full => Some("❌ The queue is full".to_string()),
        EnqueueOutcome::Cancelled => None,
        EnqueueOutcome::Unplayable => Some(format!("❌ Could not play **{}**", title)),
        EnqueueOutcome::NotConnected(e) => Some(join_failure_reply(&e)),
    }
}

fn join_failure_reply(error: &GatewayError) -> String {
    match error {
        GatewayError::NotInVoice => "❌ Join a voice channel first".to_string(),
        _ => "❌ Could not join the voice channel".to_string(),
    }
}
