//! Remote content API response shapes and error classification
//!
//! Two APIs serve post content:
//!
//! | API | Request | Required field |
//! |-----|---------|----------------|
//! | Primary | `GET {base}/{author}/status/{id}` | `tweet` |
//! | Fallback | `GET {base}/tweet-result?id={id}&token=0` | non-empty `text` |
//!
//! Bodies that deserialize but miss the required field are `Malformed`, never a panic.

use crate::state::{
    Article, ArticleSection, Author, ContentSource, InteractionCounters, PostContent,
    PostIdentifier, SectionKind,
};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Failure of a single API request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Timeout, connection failure, server error or rate limit
    #[error("transient failure: {0}")]
    Transient(String),

    /// The API refused the request
    #[error("rejected with HTTP {status}")]
    Rejected { status: u16 },

    /// The body did not match the expected shape
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Whether another attempt may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Classifies a transport-level error
    pub fn from_reqwest(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Transient("request timeout".to_string())
        } else if error.is_connect() {
            Self::Transient("connection failed".to_string())
        } else if let Some(status) = error.status() {
            Self::from_status(status)
        } else if error.is_decode() {
            Self::Malformed(error.to_string())
        } else {
            Self::Transient(error.to_string())
        }
    }

    /// Classifies a non-success HTTP status
    pub fn from_status(status: StatusCode) -> Self {
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            Self::Transient(format!("HTTP {}", status.as_u16()))
        } else {
            Self::Rejected {
                status: status.as_u16(),
            }
        }
    }
}

// Primary API

#[derive(Debug, Deserialize)]
pub(crate) struct PrimaryResponse {
    #[serde(default)]
    pub tweet: Option<PrimaryTweet>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PrimaryTweet {
    pub text: String,
    pub created_at: String,
    pub author: PrimaryAuthor,
    pub media: Option<PrimaryMedia>,
    pub likes: Option<u64>,
    pub retweets: Option<u64>,
    pub replies: Option<u64>,
    pub views: Option<u64>,
    pub bookmarks: Option<u64>,
    pub article: Option<PrimaryArticle>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PrimaryAuthor {
    pub name: String,
    pub screen_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PrimaryMedia {
    pub all: Vec<PrimaryMediaItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PrimaryMediaItem {
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PrimaryArticle {
    pub title: Option<String>,
    pub created_at: Option<String>,
    pub modified_at: Option<String>,
    /// Either a URL string or an object carrying `url`
    pub cover_image: Option<Value>,
    pub content: ArticleContent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ArticleContent {
    pub blocks: Vec<ArticleBlock>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ArticleBlock {
    pub text: String,
    #[serde(rename = "type")]
    pub block_type: String,
}

/// Converts a primary API body into post content
pub(crate) fn parse_primary(
    identifier: &PostIdentifier,
    body: &[u8],
) -> Result<PostContent, ApiError> {
    let response: PrimaryResponse =
        serde_json::from_slice(body).map_err(|e| ApiError::Malformed(e.to_string()))?;
    let tweet = response
        .tweet
        .ok_or_else(|| ApiError::Malformed("missing `tweet` object".to_string()))?;

    let media = tweet
        .media
        .map(|m| m.all.into_iter().filter_map(|item| item.url).collect())
        .unwrap_or_default();

    Ok(PostContent {
        identifier: identifier.clone(),
        source: ContentSource::Primary,
        author: Author {
            name: tweet.author.name,
            handle: tweet.author.screen_name,
        },
        posted_at: tweet.created_at,
        text: tweet.text,
        media,
        counters: InteractionCounters {
            likes: tweet.likes.unwrap_or(0),
            reposts: tweet.retweets.unwrap_or(0),
            replies: tweet.replies,
            views: tweet.views,
            bookmarks: tweet.bookmarks,
        },
        article: tweet.article.map(convert_article),
    })
}

fn convert_article(article: PrimaryArticle) -> Article {
    let cover_image = article.cover_image.and_then(|value| match value {
        Value::String(url) => Some(url),
        Value::Object(map) => map.get("url").and_then(Value::as_str).map(str::to_string),
        _ => None,
    });

    let sections = article
        .content
        .blocks
        .into_iter()
        .filter_map(|block| {
            let text = block.text.trim();
            if text.is_empty() {
                return None;
            }
            Some(ArticleSection {
                kind: SectionKind::from_block_type(&block.block_type),
                text: text.to_string(),
            })
        })
        .collect();

    Article {
        title: article.title.unwrap_or_else(|| "Untitled".to_string()),
        created_at: article.created_at,
        modified_at: article.modified_at,
        cover_image,
        sections,
    }
}

// Fallback API

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct FallbackResponse {
    pub text: Option<String>,
    pub created_at: String,
    pub user: FallbackUser,
    #[serde(rename = "mediaDetails")]
    pub media_details: Vec<FallbackMedia>,
    pub favorite_count: Option<u64>,
    pub retweet_count: Option<u64>,
    pub conversation_count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct FallbackUser {
    pub name: String,
    pub screen_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct FallbackMedia {
    pub media_url_https: Option<String>,
}

/// Converts a fallback API body into post content
pub(crate) fn parse_fallback(
    identifier: &PostIdentifier,
    body: &[u8],
) -> Result<PostContent, ApiError> {
    let response: FallbackResponse =
        serde_json::from_slice(body).map_err(|e| ApiError::Malformed(e.to_string()))?;

    let text = response
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::Malformed("missing `text`".to_string()))?;

    Ok(PostContent {
        identifier: identifier.clone(),
        source: ContentSource::Fallback,
        author: Author {
            name: response.user.name,
            handle: response.user.screen_name,
        },
        posted_at: response.created_at,
        text,
        media: response
            .media_details
            .into_iter()
            .filter_map(|m| m.media_url_https)
            .collect(),
        counters: InteractionCounters {
            likes: response.favorite_count.unwrap_or(0),
            reposts: response.retweet_count.unwrap_or(0),
            replies: response.conversation_count,
            views: None,
            bookmarks: None,
        },
        article: None,
    })
}
