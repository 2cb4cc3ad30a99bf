//! Static command table.

/// Selector de handler. El dispatch hace match exhaustivo sobre esto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Help,
    Invoke,
    Leave,
    Meme,
    Play,
    Pause,
    Resume,
    Skip,
}

#[derive(Debug)]
pub struct Command {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    /// Uso sin el prefijo.
    pub usage: &'static str,
    pub kind: CommandKind,
}

impl Command {
    fn answers_to(&self, token: &str) -> bool {
        self.name == token || self.aliases.iter().any(|alias| *alias == token)
    }
}

pub static COMMANDS: &[Command] = &[
    Command {
        name: "help",
        aliases: &["h"],
        description: "List all commands, or describe one",
        usage: "help [command]",
        kind: CommandKind::Help,
    },
    Command {
        name: "invoke",
        aliases: &[],
        description: "Bring the bot into your voice channel",
        usage: "invoke",
        kind: CommandKind::Invoke,
    },
    Command {
        name: "leave",
        aliases: &[],
        description: "Leave the voice channel and clear the queue",
        usage: "leave",
        kind: CommandKind::Leave,
    },
    Command {
        name: "meme",
        aliases: &["m"],
        description: "Queue a sound clip (no name lists the clips)",
        usage: "meme <name or alias>",
        kind: CommandKind::Meme,
    },
    Command {
        name: "play",
        aliases: &["p"],
        description: "Queue a track from a URL or a search",
        usage: "play <url or search text>",
        kind: CommandKind::Play,
    },
    Command {
        name: "pause",
        aliases: &[],
        description: "Pause the current track",
        usage: "pause",
        kind: CommandKind::Pause,
    },
    Command {
        name: "resume",
        aliases: &[],
        description: "Resume the paused track",
        usage: "resume",
        kind: CommandKind::Resume,
    },
    Command {
        name: "skip",
        aliases: &["s"],
        description: "Skip the current track",
        usage: "skip",
        kind: CommandKind::Skip,
    },
];

/// Busca un comando por nombre o alias exacto (en minúsculas).
pub fn find(token: &str) -> Option<&'static Command> {
    COMMANDS.iter().find(|command| command.answers_to(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_and_aliases_are_unique() {
        let mut seen = HashSet::new();
        for command in COMMANDS {
            assert!(seen.insert(command.name), "duplicate token {}", command.name);
            for alias in command.aliases {
                assert!(seen.insert(*alias), "duplicate token {}", alias);
            }
        }
    }

    #[test]
    fn finds_by_name_or_alias() {
        assert_eq!(find("play").map(|c| c.kind), Some(CommandKind::Play));
        assert_eq!(find("p").map(|c| c.kind), Some(CommandKind::Play));
        assert_eq!(find("s").map(|c| c.kind), Some(CommandKind::Skip));
        assert_eq!(find("h").map(|c| c.kind), Some(CommandKind::Help));
        assert!(find("stop").is_none());
        assert!(find("").is_none());
    }
}
