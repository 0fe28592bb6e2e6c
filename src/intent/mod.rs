//! Intent detection for incoming chat messages
//!
//! Chat messages that ask for a picture ("draw me a cat") must be routed to
//! image generation instead of the chat model. Detection is an ordered list
//! of pattern rules; the first rule that matches wins and no conversation
//! state is touched. Today there is a single rule (image generation), but the
//! rule list keeps the matching logic testable in isolation and gives new
//! intents an obvious place to land.

use regex::Regex;

/// What a chat message is asking for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Generate an image from the extracted prompt. An empty prompt means
    /// the message was all trigger phrase ("create an image") and the caller
    /// must reject it without contacting any upstream.
    GenerateImage { prompt: String },
    /// Ordinary conversation.
    Chat,
}

/// Phrases that mark a message as an image request.
const IMAGE_TRIGGERS: [&str; 5] = [
    "generate me an image",
    "give me an image",
    "make me an image",
    "create an image",
    "draw me",
];

struct ImageRule {
    triggers: &'static [&'static str],
    strip: Regex,
}

impl ImageRule {
    fn matches(&self, message: &str) -> bool {
        let lowered = message.to_lowercase();
        self.triggers.iter().any(|t| lowered.contains(t))
    }

    /// Remove the leading request phrasing, leaving only the subject.
    fn extract_prompt(&self, message: &str) -> String {
        self.strip.replace(message.trim(), "").trim().to_string()
    }
}

pub struct IntentClassifier {
    image: ImageRule,
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self {
            image: ImageRule {
                triggers: &IMAGE_TRIGGERS,
                strip: Regex::new(
                    r"(?i)^(generate|give|make|create|draw)\b\s*(me\b\s*)?(an?\b\s*)?(image\b\s*)?(of\b\s*)?(an?\b\s*)?",
                )
                .expect("image strip pattern is valid"),
            },
        }
    }

    pub fn classify(&self, message: &str) -> Intent {
        if self.image.matches(message) {
            return Intent::GenerateImage {
                prompt: self.image.extract_prompt(message),
            };
        }
        Intent::Chat
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}
