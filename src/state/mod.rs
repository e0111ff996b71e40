//! State module for the values that flow through a crawl run
//!
//! # Components
//!
//! - `Account`: the handle being crawled
//! - `PostIdentifier` / `PostContent` / `PostEntry`: discovered and resolved posts
//! - `CrawlOutcome`: the terminal result for one account
//! - `RunProgress`: completed-out-of-total counter shown with every written result

mod outcome;
mod post;

// Re-export main types
pub use outcome::{Account, CrawlOutcome, RunProgress};
pub use post::{
    Article, ArticleSection, Author, ContentSource, InteractionCounters, PostContent, PostEntry,
    PostIdentifier, SectionKind,
};
