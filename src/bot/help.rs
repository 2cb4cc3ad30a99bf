use super::commands::{self, Command, COMMANDS};

/// Renders `help` output: the whole table, or one command when `query` names it.
pub fn render(prefix: &str, query: &str) -> String {
    let query = query.trim();
    let query = query.strip_prefix(prefix).unwrap_or(query).trim();

    if query.is_empty() {
        return COMMANDS
            .iter()
            .map(|command| summary_line(prefix, command))
            .collect::<Vec<_>>()
            .join("\n");
    }

    match commands::find(&query.to_lowercase()) {
        Some(command) => format!(
            "{}\nUsage: `{}{}`",
            command.description, prefix, command.usage
        ),
        None => format!(
            "❓ Command `{}` not found. Use `{}help` to list commands.",
            query, prefix
        ),
    }
}

fn summary_line(prefix: &str, command: &Command) -> String {
    if command.aliases.is_empty() {
        format!("`{}{}`: {}", prefix, command.name, command.description)
    } else {
        format!(
            "`{}{}` ({}): {}",
            prefix,
            command.name,
            command.aliases.join(", "),
            command.description
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lists_one_line_per_command() {
        let text = render("$", "");
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), COMMANDS.len());
        assert_eq!(lines[0], "`$help` (h): List all commands, or describe one");
        assert_eq!(lines[1], "`$invoke`: Bring the bot into your voice channel");
        assert!(lines.contains(&"`$play` (p): Queue a track from a URL or a search"));
    }

    #[test]
    fn describes_a_single_command() {
        assert_eq!(
            render("$", "play"),
            "Queue a track from a URL or a search\nUsage: `$play <url or search text>`"
        );
        assert_eq!(render("$", " P "), render("$", "play"));
        assert_eq!(render("$", "$play"), render("$", "play"));
    }

    #[test]
    fn unknown_command_is_reported_without_listing() {
        let text = render("$", "nonexistent");
        assert_eq!(
            text,
            "❓ Command `nonexistent` not found. Use `$help` to list commands."
        );
        assert_eq!(text.lines().count(), 1);
    }
}
