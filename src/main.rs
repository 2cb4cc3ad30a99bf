use anyhow::{Context, Result};
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info};

mod audio;
mod bot;
mod config;
mod error;
mod sources;
mod voice;

use crate::audio::player::Player;
use crate::bot::JukeboxBot;
use crate::config::Config;
use crate::sources::{LocalAssets, SourceResolver, YouTubeResolver};
use crate::voice::SongbirdGateway;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("jukebox_bot=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando jukebox-bot v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    let youtube = YouTubeResolver::new(&config);

    if std::env::args().any(|arg| arg == "--health-check") {
        let version = youtube.verify().await.context("yt-dlp is not usable")?;
        info!("yt-dlp {}", version);
        println!("OK");
        return Ok(());
    }

    info!("{}", config.summary());

    let assets = LocalAssets::load(&config.assets_file, &config.assets_dir)?;
    let resolver = Arc::new(SourceResolver::new(assets, youtube));

    let songbird = Songbird::serenity();
    let gateway = Arc::new(SongbirdGateway::new(songbird.clone()));
    let (player, signals) = Player::new(gateway, config.player_settings());
    Player::spawn_signal_loop(&player, signals);

    let handler = JukeboxBot::new(&config, player, resolver)?;

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("⚠️ Señal de apagado recibida, cerrando shards...");
                shard_manager.shutdown_all().await;
            }
            Err(e) => error!("No se pudo escuchar Ctrl+C: {:?}", e),
        }
    });

    info!("🚀 Bot iniciado");
    if let Err(why) = client.start().await {
        error!("Error del cliente: {:?}", why);
    }

    Ok(())
}
