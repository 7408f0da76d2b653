//! Query classification: should a post be answered from its neighbourhood
//! (exploratory) or by direct similarity (declarative)?

use std::fmt;
use std::str::FromStr;

use gaiwan_core::model::{ParseEnumError, normalize_token};
use gaiwan_core::text::tokenize;
use gaiwan_core::{ClassifierConfig, Post};
use serde::{Deserialize, Serialize};

/// Retrieval strategy for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    /// Question-like query: local personalized propagation around the post.
    Exploratory,
    /// Statement: rank by one-hop combined affinity.
    Declarative,
}

impl RetrievalMode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Exploratory => "exploratory",
            Self::Declarative => "declarative",
        }
    }
}

impl fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetrievalMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "exploratory" | "local" => Ok(Self::Exploratory),
            "declarative" | "global" => Ok(Self::Declarative),
            _ => Err(ParseEnumError {
                expected: "retrieval mode",
                got: s.to_string(),
            }),
        }
    }
}

/// Leading words that open a question.
const INTERROGATIVES: &[&str] = &[
    "what", "when", "where", "who", "whom", "whose", "why", "how", "which", "explain", "is",
    "are", "am", "was", "were", "do", "does", "did", "can", "could", "should", "would", "will",
    "shall", "may", "might", "has", "have", "had", "isn", "aren", "doesn", "didn", "won",
    "anyone", "anybody",
];

/// Labels posts as [`RetrievalMode::Exploratory`] or
/// [`RetrievalMode::Declarative`].
#[derive(Debug, Clone, Default)]
pub struct QueryClassifier {
    config: ClassifierConfig,
}

impl QueryClassifier {
    #[must_use]
    pub const fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Exploratory when the text asks a question: a `?` outside any URL, or
    /// an interrogative first word (after mentions are stripped). Replies
    /// and posts with mentions count too when the config enables those
    /// cues.
    #[must_use]
    pub fn classify(&self, post: &Post) -> RetrievalMode {
        let exploratory = is_question(post.text())
            || (self.config.reply_is_exploratory && post.reply_to().is_some())
            || (self.config.mention_is_exploratory && !post.entities().mentions.is_empty());
        if exploratory {
            RetrievalMode::Exploratory
        } else {
            RetrievalMode::Declarative
        }
    }
}

fn is_question(text: &str) -> bool {
    let has_mark = text
        .split_whitespace()
        .filter(|word| !word.contains("://") && !word.starts_with("www."))
        .any(|word| word.contains('?'));
    if has_mark {
        return true;
    }
    tokenize(text)
        .first()
        .is_some_and(|first| INTERROGATIVES.contains(&first.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> RetrievalMode {
        QueryClassifier::default().classify(&Post::original("1", "u", text))
    }

    #[test]
    fn question_mark_is_exploratory() {
        assert_eq!(classify("this works, right?"), RetrievalMode::Exploratory);
    }

    #[test]
    fn interrogative_lead_is_exploratory() {
        assert_eq!(classify("How do lifetimes work"), RetrievalMode::Exploratory);
        assert_eq!(classify("@bob why not"), RetrievalMode::Exploratory);
        assert_eq!(classify("Explain the borrow checker"), RetrievalMode::Exploratory);
    }

    #[test]
    fn statement_is_declarative() {
        assert_eq!(classify("Shipped the new release today."), RetrievalMode::Declarative);
        assert_eq!(classify(""), RetrievalMode::Declarative);
    }

    #[test]
    fn question_mark_inside_url_is_ignored() {
        assert_eq!(
            classify("Read this https://example.com/post?id=4"),
            RetrievalMode::Declarative
        );
    }

    #[test]
    fn interrogative_later_in_text_is_not_enough() {
        assert_eq!(classify("I know how it works"), RetrievalMode::Declarative);
    }

    #[test]
    fn context_cues_are_opt_in() {
        let reply = Post::original("2", "u", "agreed").with_reply_to("1");
        let mention = Post::original("3", "u", "nice work @amy").with_entities_from_text();

        let baseline = QueryClassifier::default();
        assert_eq!(baseline.classify(&reply), RetrievalMode::Declarative);
        assert_eq!(baseline.classify(&mention), RetrievalMode::Declarative);

        let cued = QueryClassifier::new(ClassifierConfig {
            reply_is_exploratory: true,
            mention_is_exploratory: true,
        });
        assert_eq!(cued.classify(&reply), RetrievalMode::Exploratory);
        assert_eq!(cued.classify(&mention), RetrievalMode::Exploratory);
    }

    #[test]
    fn mode_parses_aliases() {
        assert_eq!("local".parse::<RetrievalMode>(), Ok(RetrievalMode::Exploratory));
        assert_eq!(" GLOBAL ".parse::<RetrievalMode>(), Ok(RetrievalMode::Declarative));
        assert_eq!(
            "declarative".parse::<RetrievalMode>().map(|m| m.to_string()),
            Ok("declarative".to_string())
        );
        assert!("sideways".parse::<RetrievalMode>().is_err());
    }
}
