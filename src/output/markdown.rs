//! Markdown document rendering
//!
//! This module renders the long-form results document: one section per account, one
//! subsection per post with its author, text, media and counters, and structured article
//! bodies for long-form posts.

use crate::state::{
    Account, Article, ArticleSection, CrawlOutcome, PostContent, PostEntry, RunProgress,
    SectionKind,
};
use crate::storage::RunStatus;
use chrono::{DateTime, FixedOffset};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats the document header
///
/// # Arguments
///
/// * `started_at` - Run start time
/// * `total_accounts` - Number of accounts the run intends to crawl
///
/// # Returns
///
/// A markdown string ending with a horizontal rule
pub fn render_header(started_at: &DateTime<FixedOffset>, total_accounts: usize) -> String {
    let mut md = String::new();

    md.push_str("# Crawl Results\n\n");
    md.push_str(&format!(
        "- **Crawled at**: {}\n",
        started_at.format(TIME_FORMAT)
    ));
    md.push_str(&format!("- **Total accounts**: {}\n\n", total_accounts));
    md.push_str("---\n\n");

    md
}

/// Formats one account section, tagged with its progress
pub fn render_section(account: &Account, outcome: &CrawlOutcome, progress: RunProgress) -> String {
    let mut md = String::new();

    match outcome {
        CrawlOutcome::Success(entries) => {
            md.push_str(&format!(
                "## {} ({} posts) {}\n\n",
                account,
                entries.len(),
                progress
            ));
            for (index, entry) in entries.iter().enumerate() {
                md.push_str(&render_entry(index + 1, entry));
            }
        }
        CrawlOutcome::NoNewPosts => {
            md.push_str(&format!("## {} {}\n\n", account, progress));
            md.push_str("_No new posts in the recency window._\n\n");
        }
        CrawlOutcome::Failed(reason) => {
            md.push_str(&format!("## {} {}\n\n", account, progress));
            md.push_str(&format!("_Crawl failed: {}_\n\n", reason));
        }
    }

    md.push_str("---\n\n");
    md
}

/// Formats one post, numbered within its account
pub fn render_entry(number: usize, entry: &PostEntry) -> String {
    match entry {
        PostEntry::Resolved(content) => match &content.article {
            Some(article) => render_article(number, content, article),
            None => render_post(number, content),
        },
        PostEntry::Unavailable { identifier } => format!(
            "### {}. Post {}\n\n> content unavailable\n\n- URL: {}\n\n",
            number,
            identifier.id(),
            identifier.url()
        ),
    }
}

fn render_post(number: usize, content: &PostContent) -> String {
    let mut md = String::new();

    md.push_str(&format!(
        "### {}. {} (@{})\n\n",
        number, content.author.name, content.author.handle
    ));
    md.push_str(&format!("- **Posted**: {}\n", content.posted_at));
    md.push_str(&format!("- **Link**: {}\n", content.identifier.url()));
    md.push_str(&format!("- **Source**: {}\n\n", content.source.label()));

    if !content.text.is_empty() {
        for line in content.text.lines() {
            md.push_str(&format!("> {}\n", line));
        }
        md.push('\n');
    }

    md.push_str(&render_media(&content.media));
    md.push_str(&render_counters(content));
    md
}

fn render_article(number: usize, content: &PostContent, article: &Article) -> String {
    let mut md = String::new();

    md.push_str(&format!("### {}. Article: {}\n\n", number, article.title));
    md.push_str(&format!(
        "- **Author**: {} (@{})\n",
        content.author.name, content.author.handle
    ));
    md.push_str(&format!(
        "- **Published**: {}\n",
        article.created_at.as_deref().unwrap_or(&content.posted_at)
    ));
    if let Some(modified) = &article.modified_at {
        md.push_str(&format!("- **Updated**: {}\n", modified));
    }
    md.push_str(&format!("- **Link**: {}\n\n", content.identifier.url()));

    if let Some(cover) = &article.cover_image {
        md.push_str(&format!("![cover]({})\n\n", cover));
    }

    let mut numbered = 0;
    for section in &article.sections {
        if section.kind == SectionKind::NumberedItem {
            numbered += 1;
        } else {
            numbered = 0;
        }
        md.push_str(&render_article_section(section, numbered));
    }
    if !article.sections.is_empty() {
        md.push('\n');
    }

    md.push_str(&render_media(&content.media));
    md.push_str(&render_counters(content));
    md
}

fn render_article_section(section: &ArticleSection, number: usize) -> String {
    match section.kind {
        SectionKind::HeadingOne => format!("#### {}\n\n", section.text),
        SectionKind::HeadingTwo => format!("##### {}\n\n", section.text),
        SectionKind::HeadingThree => format!("###### {}\n\n", section.text),
        SectionKind::Quote => format!("> {}\n\n", section.text),
        SectionKind::BulletItem => format!("- {}\n", section.text),
        SectionKind::NumberedItem => format!("{}. {}\n", number, section.text),
        SectionKind::Paragraph => format!("{}\n\n", section.text),
    }
}

fn render_media(media: &[String]) -> String {
    if media.is_empty() {
        return String::new();
    }

    let mut md = String::from("**Media**:\n\n");
    for (index, url) in media.iter().enumerate() {
        md.push_str(&format!("- ![media {}]({})\n", index + 1, url));
    }
    md.push('\n');
    md
}

fn render_counters(content: &PostContent) -> String {
    let counters = &content.counters;
    let mut parts = vec![
        format!("**Likes**: {}", group_digits(counters.likes)),
        format!("**Reposts**: {}", group_digits(counters.reposts)),
    ];
    if let Some(replies) = counters.replies {
        parts.push(format!("**Replies**: {}", group_digits(replies)));
    }
    if let Some(views) = counters.views {
        parts.push(format!("**Views**: {}", group_digits(views)));
    }
    if let Some(bookmarks) = counters.bookmarks {
        parts.push(format!("**Bookmarks**: {}", group_digits(bookmarks)));
    }

    format!("{}\n\n", parts.join(" | "))
}

/// Formats the closing totals section
///
/// # Arguments
///
/// * `completed_at` - Time the run finished
/// * `accounts_written` - Accounts with a written outcome
/// * `total_posts` - Post references across all accounts
/// * `unavailable_posts` - Posts whose content could not be resolved
/// * `status` - Final run status
pub fn render_footer(
    completed_at: &DateTime<FixedOffset>,
    accounts_written: usize,
    total_posts: usize,
    unavailable_posts: usize,
    status: RunStatus,
) -> String {
    let mut md = String::new();

    md.push_str("## Totals\n\n");
    md.push_str(&format!("- **Accounts written**: {}\n", accounts_written));
    md.push_str(&format!("- **Total posts**: {}\n", total_posts));
    md.push_str(&format!("- **Content unavailable**: {}\n", unavailable_posts));
    md.push_str(&format!(
        "- **Completed at**: {}\n",
        completed_at.format(TIME_FORMAT)
    ));
    md.push_str(&format!("- **Status**: {}\n", status.to_db_string()));

    md
}

/// Groups digits in threes: 1234567 -> "1,234,567"
fn group_digits(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
