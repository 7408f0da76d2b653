//! Immutable configuration values passed into each component constructor.
//!
//! Every field has a serde default so a partial TOML document fills in the
//! rest. Nothing here reads files or the environment; callers that keep
//! config on disk read it themselves and hand the text to
//! [`EngineConfig::from_toml_str`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub affinity: AffinityConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML for this shape or
    /// if any value fails [`EngineConfig::validate`].
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config =
            toml::from_str::<Self>(content).context("Failed to parse engine config")?;
        config.validate().context("Invalid engine config")?;
        Ok(config)
    }

    /// Validate every nested section.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retrieval.validate()?;
        self.affinity.validate()
    }
}

/// Text index, structural edge weights, and propagation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Probability of teleporting back to the query post at each
    /// propagation step.
    #[serde(default = "default_local_alpha")]
    pub local_alpha: f64,
    /// Cosine similarities below this floor are not stored.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// Hard cap on propagation iterations.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Minimum number of posts a term must appear in.
    #[serde(default = "default_min_df")]
    pub min_df: usize,
    /// Maximum fraction of posts a term may appear in.
    #[serde(default = "default_max_df")]
    pub max_df: f64,
    /// Rows per similarity batch. Bounds memory only; never changes results.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Share of the structural graph in the combined affinity graph.
    #[serde(default = "default_graph_weight")]
    pub graph_weight: f64,
    #[serde(default = "default_reply_weight")]
    pub reply_weight: f64,
    #[serde(default = "default_quote_weight")]
    pub quote_weight: f64,
    #[serde(default = "default_sibling_weight")]
    pub sibling_weight: f64,
    #[serde(default = "default_structural_conversation_weight")]
    pub conversation_weight: f64,
    #[serde(default = "default_user_similarity_weight")]
    pub user_similarity_weight: f64,
    /// Author pairs whose combined affinity is below this floor are not
    /// projected onto their posts.
    #[serde(default = "default_user_affinity_floor")]
    pub user_affinity_floor: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            local_alpha: default_local_alpha(),
            similarity_threshold: default_similarity_threshold(),
            max_iterations: default_max_iterations(),
            min_df: default_min_df(),
            max_df: default_max_df(),
            batch_size: default_batch_size(),
            graph_weight: default_graph_weight(),
            reply_weight: default_reply_weight(),
            quote_weight: default_quote_weight(),
            sibling_weight: default_sibling_weight(),
            conversation_weight: default_structural_conversation_weight(),
            user_similarity_weight: default_user_similarity_weight(),
            user_affinity_floor: default_user_affinity_floor(),
        }
    }
}

impl RetrievalConfig {
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first field out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        unit_interval("local_alpha", self.local_alpha)?;
        unit_interval("similarity_threshold", self.similarity_threshold)?;
        unit_interval("graph_weight", self.graph_weight)?;
        finite("max_df", self.max_df)?;
        if self.max_df <= 0.0 || self.max_df > 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "max_df",
                value: self.max_df,
                expected: "(0, 1]",
            });
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        non_negative("reply_weight", self.reply_weight)?;
        non_negative("quote_weight", self.quote_weight)?;
        non_negative("sibling_weight", self.sibling_weight)?;
        non_negative("conversation_weight", self.conversation_weight)?;
        non_negative("user_similarity_weight", self.user_similarity_weight)?;
        non_negative("user_affinity_floor", self.user_affinity_floor)
    }
}

/// Weights for the user-to-user affinity signals.
///
/// `*_weight` fields directly under a signal name (`content_weight`,
/// `interaction_weight`, ...) scale that whole signal in the combined
/// affinity; the remaining weights scale terms inside one signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffinityConfig {
    /// Content-compression similarity must exceed this to keep an edge.
    #[serde(default = "default_ncd_threshold")]
    pub ncd_threshold: f64,
    /// Authors with fewer authored posts are skipped by the content signal.
    #[serde(default = "default_min_posts_per_user")]
    pub min_posts_per_user: usize,

    #[serde(default = "default_one")]
    pub content_weight: f64,

    #[serde(default = "default_one")]
    pub interaction_weight: f64,
    #[serde(default = "default_like_weight")]
    pub like_weight: f64,
    #[serde(default = "default_retweet_weight")]
    pub retweet_weight: f64,
    #[serde(default = "default_affinity_conversation_weight")]
    pub conversation_weight: f64,

    #[serde(default = "default_one")]
    pub engagement_weight: f64,
    #[serde(default = "default_mention_weight")]
    pub mention_weight: f64,
    #[serde(default = "default_engagement_reply_weight")]
    pub reply_weight: f64,
    #[serde(default = "default_engagement_quote_weight")]
    pub quote_weight: f64,

    #[serde(default = "default_temporal_weight")]
    pub temporal_weight: f64,

    #[serde(default = "default_mutual_follow_weight")]
    pub mutual_follow_weight: f64,

    #[serde(default = "default_one")]
    pub overlap_weight: f64,
    #[serde(default = "default_community_weight")]
    pub community_weight: f64,
    #[serde(default = "default_media_weight")]
    pub media_weight: f64,
    #[serde(default = "default_url_weight")]
    pub url_weight: f64,
}

impl Default for AffinityConfig {
    fn default() -> Self {
        Self {
            ncd_threshold: default_ncd_threshold(),
            min_posts_per_user: default_min_posts_per_user(),
            content_weight: default_one(),
            interaction_weight: default_one(),
            like_weight: default_like_weight(),
            retweet_weight: default_retweet_weight(),
            conversation_weight: default_affinity_conversation_weight(),
            engagement_weight: default_one(),
            mention_weight: default_mention_weight(),
            reply_weight: default_engagement_reply_weight(),
            quote_weight: default_engagement_quote_weight(),
            temporal_weight: default_temporal_weight(),
            mutual_follow_weight: default_mutual_follow_weight(),
            overlap_weight: default_one(),
            community_weight: default_community_weight(),
            media_weight: default_media_weight(),
            url_weight: default_url_weight(),
        }
    }
}

impl AffinityConfig {
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first field out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        unit_interval("ncd_threshold", self.ncd_threshold)?;
        for (field, value) in [
            ("content_weight", self.content_weight),
            ("interaction_weight", self.interaction_weight),
            ("like_weight", self.like_weight),
            ("retweet_weight", self.retweet_weight),
            ("conversation_weight", self.conversation_weight),
            ("engagement_weight", self.engagement_weight),
            ("mention_weight", self.mention_weight),
            ("reply_weight", self.reply_weight),
            ("quote_weight", self.quote_weight),
            ("temporal_weight", self.temporal_weight),
            ("mutual_follow_weight", self.mutual_follow_weight),
            ("overlap_weight", self.overlap_weight),
            ("community_weight", self.community_weight),
            ("media_weight", self.media_weight),
            ("url_weight", self.url_weight),
        ] {
            non_negative(field, value)?;
        }
        Ok(())
    }
}

/// Extra cues for query classification beyond the question heuristic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Treat any reply as needing local conversation context.
    #[serde(default)]
    pub reply_is_exploratory: bool,
    /// Treat any post that mentions users as needing local context.
    #[serde(default)]
    pub mention_is_exploratory: bool,
}

fn finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { field })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            expected: ">= 0",
        });
    }
    Ok(())
}

fn unit_interval(field: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            expected: "[0, 1]",
        });
    }
    Ok(())
}

const fn default_local_alpha() -> f64 {
    0.6
}

const fn default_similarity_threshold() -> f64 {
    0.27
}

const fn default_max_iterations() -> usize {
    18
}

const fn default_min_df() -> usize {
    2
}

const fn default_max_df() -> f64 {
    0.95
}

const fn default_batch_size() -> usize {
    1000
}

const fn default_graph_weight() -> f64 {
    0.3
}

const fn default_reply_weight() -> f64 {
    1.0
}

const fn default_quote_weight() -> f64 {
    0.8
}

const fn default_sibling_weight() -> f64 {
    0.5
}

const fn default_structural_conversation_weight() -> f64 {
    0.4
}

const fn default_user_similarity_weight() -> f64 {
    0.4
}

const fn default_user_affinity_floor() -> f64 {
    0.1
}

const fn default_ncd_threshold() -> f64 {
    0.7
}

const fn default_min_posts_per_user() -> usize {
    1
}

const fn default_one() -> f64 {
    1.0
}

const fn default_like_weight() -> f64 {
    0.7
}

const fn default_retweet_weight() -> f64 {
    0.8
}

const fn default_affinity_conversation_weight() -> f64 {
    0.9
}

const fn default_mention_weight() -> f64 {
    0.7
}

const fn default_engagement_reply_weight() -> f64 {
    0.8
}

const fn default_engagement_quote_weight() -> f64 {
    0.6
}

const fn default_temporal_weight() -> f64 {
    0.5
}

const fn default_mutual_follow_weight() -> f64 {
    0.8
}

const fn default_community_weight() -> f64 {
    0.6
}

const fn default_media_weight() -> f64 {
    0.4
}

const fn default_url_weight() -> f64 {
    0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(EngineConfig::default().validate(), Ok(()));
    }

    #[test]
    fn retrieval_defaults_match_documented_values() {
        let config = RetrievalConfig::default();
        assert!((config.local_alpha - 0.6).abs() < f64::EPSILON);
        assert!((config.similarity_threshold - 0.27).abs() < f64::EPSILON);
        assert_eq!(config.max_iterations, 18);
        assert_eq!(config.min_df, 2);
        assert_eq!(config.batch_size, 1000);
    }

    #[test]
    fn zero_iterations_rejected() {
        let config = RetrievalConfig {
            max_iterations: 0,
            ..RetrievalConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroIterations));
    }

    #[test]
    fn zero_batch_size_rejected() {
        let config = RetrievalConfig {
            batch_size: 0,
            ..RetrievalConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroBatchSize));
    }

    #[test]
    fn negative_edge_weight_rejected() {
        let config = RetrievalConfig {
            sibling_weight: -0.1,
            ..RetrievalConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "sibling_weight",
                ..
            })
        ));
    }

    #[test]
    fn negative_affinity_floor_rejected() {
        let config = RetrievalConfig {
            user_affinity_floor: -0.5,
            ..RetrievalConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "user_affinity_floor",
                ..
            })
        ));
        assert!((RetrievalConfig::default().user_affinity_floor - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn alpha_above_one_rejected() {
        let config = RetrievalConfig {
            local_alpha: 1.2,
            ..RetrievalConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "local_alpha",
                ..
            })
        ));
    }

    #[test]
    fn zero_max_df_rejected() {
        let config = RetrievalConfig {
            max_df: 0.0,
            ..RetrievalConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn nan_weight_rejected() {
        let config = AffinityConfig {
            media_weight: f64::NAN,
            ..AffinityConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonFinite {
                field: "media_weight"
            })
        );
    }

    #[test]
    fn negative_affinity_weight_rejected() {
        let config = AffinityConfig {
            like_weight: -1.0,
            ..AffinityConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = EngineConfig::from_toml_str(
            r"
            [retrieval]
            graph_weight = 0.5
            max_iterations = 40

            [affinity]
            ncd_threshold = 0.5
            ",
        )
        .expect("parse");

        assert!((config.retrieval.graph_weight - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.retrieval.max_iterations, 40);
        assert!((config.retrieval.reply_weight - 1.0).abs() < f64::EPSILON);
        assert!((config.affinity.ncd_threshold - 0.5).abs() < f64::EPSILON);
        assert!(!config.classifier.reply_is_exploratory);
    }

    #[test]
    fn empty_toml_is_default() {
        let config = EngineConfig::from_toml_str("").expect("parse");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn toml_with_invalid_value_rejected() {
        let err = EngineConfig::from_toml_str("[retrieval]\nmax_iterations = 0\n")
            .expect_err("should reject");
        assert!(format!("{err:#}").contains("max_iterations"));
    }

    #[test]
    fn malformed_toml_rejected() {
        assert!(EngineConfig::from_toml_str("[retrieval\n").is_err());
    }
}
