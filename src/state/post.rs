//! Post identifiers and resolved post content
//!
//! A `PostIdentifier` is what the crawler discovers on an account page; a `PostContent` is
//! what the content resolver turns it into. `PostEntry` keeps both outcomes of resolution
//! in one ordered list so that unresolvable posts are never dropped.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Hosts whose status URLs are accepted as post identifiers
const POST_HOSTS: &[&str] = &[
    "x.com",
    "www.x.com",
    "mobile.x.com",
    "twitter.com",
    "www.twitter.com",
    "mobile.twitter.com",
];

/// Unique reference to a single post
///
/// Identifiers are canonicalised to `https://x.com/<author>/status/<id>` so that the same post
/// reached through different URL spellings compares equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostIdentifier {
    id: String,
    author: Option<String>,
}

impl PostIdentifier {
    /// Parses a status URL or a bare numeric post id
    ///
    /// # Arguments
    ///
    /// * `raw` - A URL such as `https://x.com/user/status/123` or an id such as `123`
    ///
    /// # Returns
    ///
    /// * `Some(PostIdentifier)` - The input names a post
    /// * `None` - The input is not a recognisable post reference
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if raw.chars().all(|c| c.is_ascii_digit()) {
            return Some(Self {
                id: raw.to_string(),
                author: None,
            });
        }

        let url = Url::parse(raw).ok()?;
        let host = url.host_str()?.to_ascii_lowercase();
        if !POST_HOSTS.contains(&host.as_str()) {
            return None;
        }

        let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
        let marker = segments
            .iter()
            .position(|s| *s == "status" || *s == "statuses")?;
        let id = segments.get(marker + 1)?;
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let author = marker
            .checked_sub(1)
            .and_then(|i| segments.get(i))
            .filter(|name| **name != "i")
            .map(|name| name.to_string());

        Some(Self {
            id: id.to_string(),
            author,
        })
    }

    /// Numeric post id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Author handle embedded in the URL, if any
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    /// Canonical status URL
    pub fn url(&self) -> String {
        format!(
            "https://x.com/{}/status/{}",
            self.author.as_deref().unwrap_or("i"),
            self.id
        )
    }
}

impl fmt::Display for PostIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// Which remote API produced a `PostContent`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    Primary,
    Fallback,
}

impl ContentSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

/// Post author
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub handle: String,
}

/// Interaction counters; fields the source API does not report stay `None`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionCounters {
    pub likes: u64,
    pub reposts: u64,
    pub replies: Option<u64>,
    pub views: Option<u64>,
    pub bookmarks: Option<u64>,
}

/// Kind of a long-form article block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    HeadingOne,
    HeadingTwo,
    HeadingThree,
    Quote,
    BulletItem,
    NumberedItem,
    Paragraph,
}

impl SectionKind {
    /// Maps an article block type to a section kind; unknown types are paragraphs
    pub fn from_block_type(block_type: &str) -> Self {
        match block_type {
            "header-one" => Self::HeadingOne,
            "header-two" => Self::HeadingTwo,
            "header-three" => Self::HeadingThree,
            "blockquote" => Self::Quote,
            "unordered-list-item" => Self::BulletItem,
            "ordered-list-item" => Self::NumberedItem,
            _ => Self::Paragraph,
        }
    }
}

/// One block of a long-form article body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSection {
    pub kind: SectionKind,
    pub text: String,
}

/// Long-form article attached to a post
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub created_at: Option<String>,
    pub modified_at: Option<String>,
    pub cover_image: Option<String>,
    pub sections: Vec<ArticleSection>,
}

/// Fully resolved content of one post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostContent {
    pub identifier: PostIdentifier,
    pub source: ContentSource,
    pub author: Author,
    /// Timestamp exactly as reported by the source API
    pub posted_at: String,
    pub text: String,
    /// Media URLs in display order
    pub media: Vec<String>,
    pub counters: InteractionCounters,
    pub article: Option<Article>,
}

/// A discovered post after resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PostEntry {
    Resolved(PostContent),
    /// Both APIs failed; only the reference survives
    Unavailable { identifier: PostIdentifier },
}

impl PostEntry {
    pub fn identifier(&self) -> &PostIdentifier {
        match self {
            Self::Resolved(content) => &content.identifier,
            Self::Unavailable { identifier } => identifier,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}
