//! Canonical post records.
//!
//! Archives deliver posts in several shapes: ordinary authored posts,
//! posts from community archives, long-form notes, and posts that are only
//! known because someone favorited them. [`Post`] is a closed enum over
//! those shapes with one accessor surface, so downstream code never
//! branches on provenance unless it actually cares.

use std::collections::BTreeSet;
use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ParseEnumError, normalize_token};
use crate::text::extract_entities;

/// Where a post record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Original,
    Community,
    Note,
    FavoriteOnly,
}

impl Provenance {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Community => "community",
            Self::Note => "note",
            Self::FavoriteOnly => "favorite_only",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provenance {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "original" => Ok(Self::Original),
            "community" => Ok(Self::Community),
            "note" => Ok(Self::Note),
            "favorite_only" | "favorite-only" | "like" => Ok(Self::FavoriteOnly),
            _ => Err(ParseEnumError {
                expected: "provenance",
                got: s.to_string(),
            }),
        }
    }
}

/// Entities referenced by a post's text. All sets are ordered so iteration
/// is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default)]
    pub mentions: BTreeSet<String>,
    #[serde(default)]
    pub hashtags: BTreeSet<String>,
    #[serde(default)]
    pub urls: BTreeSet<String>,
    /// Media-type tags (`photo`, `video`, `animated_gif`, ...).
    #[serde(default)]
    pub media: BTreeSet<String>,
}

/// An ordinary post with an author; may reply to, quote, or reshare another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoredPost {
    pub id: String,
    pub author: String,
    pub text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reply_to: Option<String>,
    #[serde(default)]
    pub quoted: Option<String>,
    /// Author whose post this one reshares.
    #[serde(default)]
    pub reshare_of: Option<String>,
    #[serde(default)]
    pub entities: Entities,
    #[serde(default)]
    pub favorited_by: BTreeSet<String>,
}

impl AuthoredPost {
    #[must_use]
    pub fn new(id: impl Into<String>, author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author: author.into(),
            text: text.into(),
            created_at: None,
            reply_to: None,
            quoted: None,
            reshare_of: None,
            entities: Entities::default(),
            favorited_by: BTreeSet::new(),
        }
    }
}

/// An authored post that arrived through a community archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityPost {
    #[serde(flatten)]
    pub post: AuthoredPost,
    pub community_id: String,
}

/// Long-form note. Notes never reply to or quote anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePost {
    pub id: String,
    pub author: String,
    pub text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub entities: Entities,
    #[serde(default)]
    pub favorited_by: BTreeSet<String>,
}

/// A post known only from somebody's favorites; its author may be unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoritePost {
    pub id: String,
    #[serde(default)]
    pub author: Option<String>,
    pub text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub entities: Entities,
    #[serde(default)]
    pub favorited_by: BTreeSet<String>,
}

/// One canonical post record, tagged by provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provenance", rename_all = "snake_case")]
pub enum Post {
    Original(AuthoredPost),
    Community(CommunityPost),
    Note(NotePost),
    FavoriteOnly(FavoritePost),
}

impl Post {
    #[must_use]
    pub fn original(id: impl Into<String>, author: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Original(AuthoredPost::new(id, author, text))
    }

    #[must_use]
    pub fn community(
        id: impl Into<String>,
        author: impl Into<String>,
        community_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::Community(CommunityPost {
            post: AuthoredPost::new(id, author, text),
            community_id: community_id.into(),
        })
    }

    #[must_use]
    pub fn note(id: impl Into<String>, author: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Note(NotePost {
            id: id.into(),
            author: author.into(),
            text: text.into(),
            created_at: None,
            entities: Entities::default(),
            favorited_by: BTreeSet::new(),
        })
    }

    #[must_use]
    pub fn favorite(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::FavoriteOnly(FavoritePost {
            id: id.into(),
            author: None,
            text: text.into(),
            created_at: None,
            entities: Entities::default(),
            favorited_by: BTreeSet::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[must_use]
    pub const fn provenance(&self) -> Provenance {
        match self {
            Self::Original(_) => Provenance::Original,
            Self::Community(_) => Provenance::Community,
            Self::Note(_) => Provenance::Note,
            Self::FavoriteOnly(_) => Provenance::FavoriteOnly,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Original(p) => &p.id,
            Self::Community(c) => &c.post.id,
            Self::Note(n) => &n.id,
            Self::FavoriteOnly(f) => &f.id,
        }
    }

    #[must_use]
    pub fn author(&self) -> Option<&str> {
        match self {
            Self::Original(p) => Some(&p.author),
            Self::Community(c) => Some(&c.post.author),
            Self::Note(n) => Some(&n.author),
            Self::FavoriteOnly(f) => f.author.as_deref(),
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Original(p) => &p.text,
            Self::Community(c) => &c.post.text,
            Self::Note(n) => &n.text,
            Self::FavoriteOnly(f) => &f.text,
        }
    }

    #[must_use]
    pub const fn created_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Original(p) => p.created_at,
            Self::Community(c) => c.post.created_at,
            Self::Note(n) => n.created_at,
            Self::FavoriteOnly(f) => f.created_at,
        }
    }

    #[must_use]
    pub fn reply_to(&self) -> Option<&str> {
        self.authored().and_then(|p| p.reply_to.as_deref())
    }

    #[must_use]
    pub fn quoted(&self) -> Option<&str> {
        self.authored().and_then(|p| p.quoted.as_deref())
    }

    #[must_use]
    pub fn reshare_of(&self) -> Option<&str> {
        self.authored().and_then(|p| p.reshare_of.as_deref())
    }

    #[must_use]
    pub fn community_id(&self) -> Option<&str> {
        match self {
            Self::Community(c) => Some(&c.community_id),
            _ => None,
        }
    }

    #[must_use]
    pub const fn entities(&self) -> &Entities {
        match self {
            Self::Original(p) => &p.entities,
            Self::Community(c) => &c.post.entities,
            Self::Note(n) => &n.entities,
            Self::FavoriteOnly(f) => &f.entities,
        }
    }

    #[must_use]
    pub const fn favorited_by(&self) -> &BTreeSet<String> {
        match self {
            Self::Original(p) => &p.favorited_by,
            Self::Community(c) => &c.post.favorited_by,
            Self::Note(n) => &n.favorited_by,
            Self::FavoriteOnly(f) => &f.favorited_by,
        }
    }

    const fn authored(&self) -> Option<&AuthoredPost> {
        match self {
            Self::Original(p) => Some(p),
            Self::Community(c) => Some(&c.post),
            Self::Note(_) | Self::FavoriteOnly(_) => None,
        }
    }

    fn authored_mut(&mut self) -> Option<&mut AuthoredPost> {
        match self {
            Self::Original(p) => Some(p),
            Self::Community(c) => Some(&mut c.post),
            Self::Note(_) | Self::FavoriteOnly(_) => None,
        }
    }

    fn entities_mut(&mut self) -> &mut Entities {
        match self {
            Self::Original(p) => &mut p.entities,
            Self::Community(c) => &mut c.post.entities,
            Self::Note(n) => &mut n.entities,
            Self::FavoriteOnly(f) => &mut f.entities,
        }
    }

    // -----------------------------------------------------------------------
    // Builders
    //
    // Setters for fields a variant does not carry (a reply parent on a note,
    // say) leave the post unchanged.
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn with_reply_to(mut self, parent: impl Into<String>) -> Self {
        if let Some(p) = self.authored_mut() {
            p.reply_to = Some(parent.into());
        }
        self
    }

    #[must_use]
    pub fn with_quoted(mut self, quoted: impl Into<String>) -> Self {
        if let Some(p) = self.authored_mut() {
            p.quoted = Some(quoted.into());
        }
        self
    }

    #[must_use]
    pub fn with_reshare_of(mut self, author: impl Into<String>) -> Self {
        if let Some(p) = self.authored_mut() {
            p.reshare_of = Some(author.into());
        }
        self
    }

    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        let author = author.into();
        match &mut self {
            Self::Original(p) => p.author = author,
            Self::Community(c) => c.post.author = author,
            Self::Note(n) => n.author = author,
            Self::FavoriteOnly(f) => f.author = Some(author),
        }
        self
    }

    #[must_use]
    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        match &mut self {
            Self::Original(p) => p.created_at = Some(at),
            Self::Community(c) => c.post.created_at = Some(at),
            Self::Note(n) => n.created_at = Some(at),
            Self::FavoriteOnly(f) => f.created_at = Some(at),
        }
        self
    }

    #[must_use]
    pub fn with_entities(mut self, entities: Entities) -> Self {
        *self.entities_mut() = entities;
        self
    }

    /// Replace the entity sets with whatever can be read off the text.
    #[must_use]
    pub fn with_entities_from_text(self) -> Self {
        let entities = extract_entities(self.text());
        self.with_entities(entities)
    }

    #[must_use]
    pub fn with_media<I, S>(mut self, media: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entities_mut()
            .media
            .extend(media.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entities_mut()
            .urls
            .extend(urls.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_mentions<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entities_mut()
            .mentions
            .extend(users.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn favorited_by_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let users = users.into_iter().map(Into::into);
        match &mut self {
            Self::Original(p) => p.favorited_by.extend(users),
            Self::Community(c) => c.post.favorited_by.extend(users),
            Self::Note(n) => n.favorited_by.extend(users),
            Self::FavoriteOnly(f) => f.favorited_by.extend(users),
        }
        self
    }
}
