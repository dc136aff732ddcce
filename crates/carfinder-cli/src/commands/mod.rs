//! Slash commands for interactive mode

mod prompts;

pub use prompts::Menu;

/// Result of executing a slash command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Show a numbered menu and accept a choice on the next line
    OpenMenu(Menu),
    /// Print the progress checklist
    ShowProgress,
    /// Fetch and print the alerts feed
    ShowAlerts,
    /// Fetch and print the server-side history of this conversation
    ShowHistory,
    /// Start a fresh conversation
    Clear,
    /// Show a message to the user
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse a slash command. Returns `None` if `input` is not one.
pub fn execute_command(input: &str) -> Option<CommandResult> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let command = rest.split_whitespace().next().unwrap_or("").to_lowercase();

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),
        "starters" | "s" => CommandResult::OpenMenu(Menu::Starters),
        "actions" | "a" => CommandResult::OpenMenu(Menu::QuickActions),
        "progress" | "p" => CommandResult::ShowProgress,
        "alerts" => CommandResult::ShowAlerts,
        "history" => CommandResult::ShowHistory,
        "clear" | "new" => CommandResult::Clear,
        "quit" | "exit" | "q" => CommandResult::Exit,
        _ => CommandResult::Unknown(command),
    })
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?       Show this help message
  /starters, /s       Show conversation starters
  /actions, /a        Show quick actions
  /progress, /p       Show preference progress
  /alerts             Show the latest vehicle alerts
  /history            Show this conversation as stored on the server
  /clear, /new        Start a new conversation
  /quit, /exit, /q    Exit carfinder

After /starters or /actions, type a number to send that prompt.
Press Ctrl-C while a reply is streaming to stop it."#
        .to_string()
}
