use regex::Regex;
use tracing::{debug, info};

use super::{
    commands,
    handlers::{self, CommandContext, Services},
};

/// Mensaje de chat separado en comando y parámetros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInput {
    /// Token alfabético en minúsculas.
    pub command: String,
    /// Todo lo que sigue al token, sin espacios extremos.
    pub remainder: String,
}

/// Matches `<prefix> <token><rest>` at the start of a message.
pub struct CommandParser {
    pattern: Regex,
}

impl CommandParser {
    pub fn new(prefix: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(
            r"(?s)^\s*{}\s*([A-Za-z]+)(.*)$",
            regex::escape(prefix)
        ))?;
        Ok(Self { pattern })
    }

    pub fn parse(&self, text: &str) -> Option<ParsedInput> {
        let caps = self.pattern.captures(text)?;
        Some(ParsedInput {
            command: caps.get(1)?.as_str().to_lowercase(),
            remainder: caps
                .get(2)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default(),
        })
    }
}

/// Parsea el texto y ejecuta el handler correspondiente.
pub struct Router {
    parser: CommandParser,
    services: Services,
}

impl Router {
    pub fn new(services: Services) -> Result<Self, regex::Error> {
        Ok(Self {
            parser: CommandParser::new(&services.prefix)?,
            services,
        })
    }

    /// Returns the reply to post, if any. Text that is not a known command
    /// is ignored silently.
    pub async fn route(&self, ctx: &CommandContext, text: &str) -> Option<String> {
        let input = self.parser.parse(text)?;
        let Some(command) = commands::find(&input.command) else {
            debug!("Ignoring unknown command `{}`", input.command);
            return None;
        };

        info!(
            "📝 Comando {}{} de {} en guild {}",
            self.services.prefix, command.name, ctx.room.member, ctx.room.guild_id
        );
        handlers::dispatch(command.kind, ctx, &input.remainder, &self.services).await
    }
}
