//! # Sources
//!
//! Turns the free text of a command into a playable [`TrackRef`].
//!
//! Two backends are combined behind [`AudioResolver`]:
//!
//! - [`local::LocalAssets`]: a static table of sound clips shipped next to the
//!   bot, looked up by name or alias.
//! - [`youtube::YouTubeResolver`]: direct URLs, or the top hit of a `yt-dlp`
//!   text search.

pub mod local;
pub mod youtube;

use async_trait::async_trait;
use std::{fmt, path::PathBuf};

use crate::error::ResolveError;

pub use local::LocalAssets;
pub use youtube::YouTubeResolver;

/// An opaque, playable reference handed to the voice gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackRef {
    /// Un archivo de sonido de la tabla local.
    Asset { name: String, path: PathBuf },
    /// Un stream que el gateway obtiene vía yt-dlp.
    Remote { title: String, url: String },
}

impl TrackRef {
    pub fn title(&self) -> &str {
        match self {
            Self::Asset { name, .. } => name,
            Self::Remote { title, .. } => title,
        }
    }
}

impl fmt::Display for TrackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asset { name, .. } => write!(f, "{name}"),
            Self::Remote { title, url } => write!(f, "{title} <{url}>"),
        }
    }
}

/// Resolution contract consumed by the command handlers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioResolver: Send + Sync {
    /// Busca un clip local por nombre o alias.
    async fn resolve_asset(&self, name: &str) -> Result<TrackRef, ResolveError>;

    /// Resuelve una URL o texto de búsqueda a un stream remoto.
    async fn resolve_remote(&self, query: &str) -> Result<TrackRef, ResolveError>;

    /// Una línea por asset local, para `meme` sin parámetros.
    fn describe_assets(&self) -> Vec<String>;
}

/// Production resolver: local table first for assets, yt-dlp for everything remote.
pub struct SourceResolver {
    assets: LocalAssets,
    youtube: YouTubeResolver,
}

impl SourceResolver {
    pub fn new(assets: LocalAssets, youtube: YouTubeResolver) -> Self {
        Self { assets, youtube }
    }
}

#[async_trait]
impl AudioResolver for SourceResolver {
    async fn resolve_asset(&self, name: &str) -> Result<TrackRef, ResolveError> {
        self.assets
            .lookup(name)
            .map(|entry| entry.track())
            .ok_or_else(|| ResolveError::NotFound(name.to_string()))
    }

    async fn resolve_remote(&self, query: &str) -> Result<TrackRef, ResolveError> {
        self.youtube.resolve(query).await
    }

    fn describe_assets(&self) -> Vec<String> {
        self.assets.describe()
    }
}
