//! Canned prompts offered in interactive mode

/// A conversation starter: a short label plus the message it sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Starter {
    pub label: &'static str,
    pub message: &'static str,
}

pub const STARTERS: [Starter; 4] = [
    Starter {
        label: "First Car",
        message: "Help me find my first car",
    },
    Starter {
        label: "Family Vehicle",
        message: "I need a family-friendly option",
    },
    Starter {
        label: "Electric",
        message: "Show me electric vehicles",
    },
    Starter {
        label: "Budget Friendly",
        message: "Best value under $30k",
    },
];

pub const QUICK_ACTIONS: [&str; 5] = [
    "What's popular in my area?",
    "Compare SUVs vs Sedans",
    "Best fuel-efficient cars",
    "Most reliable brands",
    "Save my preferences",
];

/// A numbered list the user can pick from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Menu {
    Starters,
    QuickActions,
}

impl Menu {
    pub fn len(&self) -> usize {
        match self {
            Menu::Starters => STARTERS.len(),
            Menu::QuickActions => QUICK_ACTIONS.len(),
        }
    }

    /// Message for a 1-based menu choice
    pub fn pick(&self, choice: usize) -> Option<&'static str> {
        let index = choice.checked_sub(1)?;
        match self {
            Menu::Starters => STARTERS.get(index).map(|s| s.message),
            Menu::QuickActions => QUICK_ACTIONS.get(index).copied(),
        }
    }

    /// Parse `input` as a menu choice
    pub fn choose(&self, input: &str) -> Option<&'static str> {
        input.trim().parse::<usize>().ok().and_then(|n| self.pick(n))
    }

    pub fn render(&self) -> String {
        let lines: Vec<String> = match self {
            Menu::Starters => STARTERS
                .iter()
                .enumerate()
                .map(|(i, s)| format!("  {}. {:<16} {}", i + 1, s.label, s.message))
                .collect(),
            Menu::QuickActions => QUICK_ACTIONS
                .iter()
                .enumerate()
                .map(|(i, a)| format!("  {}. {}", i + 1, a))
                .collect(),
        };
        format!(
            "{}\n(type 1-{} to send)",
            lines.join("\n"),
            self.len()
        )
    }
}
