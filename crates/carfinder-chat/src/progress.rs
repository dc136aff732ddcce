//! Advisory progress flags for the preference-gathering flow.
//!
//! Flags are guessed from what the user types and from side effects the
//! server reports. They only ever go from false to true.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use carfinder_api::stream::PREFERENCES_SAVED;

static PREFERENCES_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)suv|sedan").unwrap());

static BUDGET_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\$|budget|under|price").unwrap());

static FEATURES_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)leather|heated|sunroof|awd|feature").unwrap());

/// Which preference-gathering steps look done
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressFlags {
    /// A body style was mentioned
    pub preferences: bool,
    /// A budget was mentioned
    pub budget: bool,
    /// Must-have features were mentioned
    pub features: bool,
    /// The server confirmed preferences were saved
    pub saved: bool,
}

impl ProgressFlags {
    /// Update from user input. Returns true if any flag changed.
    pub fn observe_input(&mut self, text: &str) -> bool {
        let before = *self;
        self.preferences |= PREFERENCES_PATTERN.is_match(text);
        self.budget |= BUDGET_PATTERN.is_match(text);
        self.features |= FEATURES_PATTERN.is_match(text);
        *self != before
    }

    /// Update from a server side effect. Unknown names are ignored.
    pub fn observe_side_effect(&mut self, name: &str) -> bool {
        if name == PREFERENCES_SAVED && !self.saved {
            self.saved = true;
            return true;
        }
        false
    }

    /// Steps in display order with their completion state
    pub fn steps(&self) -> [(&'static str, bool); 4] {
        [
            ("Vehicle preferences", self.preferences),
            ("Budget range", self.budget),
            ("Must-have features", self.features),
            ("Save preferences", self.saved),
        ]
    }

    pub fn completed(&self) -> usize {
        self.steps().iter().filter(|(_, done)| *done).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_style_sets_preferences() {
        let mut flags = ProgressFlags::default();
        assert!(flags.observe_input("Looking for a compact SUV"));
        assert!(flags.preferences);
        assert!(!flags.budget);
        assert!(!flags.features);
    }

    #[test]
    fn test_budget_patterns() {
        for text in ["around $25k", "my BUDGET is tight", "under 30 grand", "what price?"] {
            let mut flags = ProgressFlags::default();
            assert!(flags.observe_input(text), "{text}");
            assert!(flags.budget, "{text}");
        }
    }

    #[test]
    fn test_feature_patterns() {
        let mut flags = ProgressFlags::default();
        flags.observe_input("needs heated seats and AWD");
        assert!(flags.features);
    }

    #[test]
    fn test_unrelated_input_changes_nothing() {
        let mut flags = ProgressFlags::default();
        assert!(!flags.observe_input("hello there"));
        assert_eq!(flags, ProgressFlags::default());
    }

    #[test]
    fn test_flags_are_monotonic() {
        let mut flags = ProgressFlags::default();
        flags.observe_input("sedan");
        assert!(!flags.observe_input("nothing relevant"));
        assert!(flags.preferences);

        assert!(flags.observe_side_effect(PREFERENCES_SAVED));
        assert!(!flags.observe_side_effect(PREFERENCES_SAVED));
        assert!(!flags.observe_side_effect("end"));
        assert!(flags.saved);
    }

    #[test]
    fn test_completed_count() {
        let mut flags = ProgressFlags::default();
        flags.observe_input("SUV under $40k with a sunroof");
        assert_eq!(flags.completed(), 3);
        flags.observe_side_effect(PREFERENCES_SAVED);
        assert_eq!(flags.completed(), 4);
    }
}
