//! Scripts evaluated in the account page

/// Evaluates to `true` once at least one post has rendered
pub const CONTENT_PROBE: &str = "document.querySelectorAll('article').length > 0";

/// Key sent between discovery passes to load older posts
pub const SCROLL_KEY: &str = "PageDown";

/// Builds the discovery script
///
/// The script walks rendered posts, skips those older than `recency_hours` according to their
/// `<time datetime>` attribute, and returns the first status link of each remaining post as a
/// canonical `https://x.com/<user>/status/<id>` URL, without duplicates, in page order.
pub fn discovery_script(recency_hours: u32) -> String {
    format!(
        r#"(() => {{
    const cutoff = Date.now() - {hours} * 60 * 60 * 1000;
    const result = [];
    for (const article of document.querySelectorAll('article')) {{
        const time = article.querySelector('time');
        const stamp = time && time.getAttribute('datetime');
        if (!stamp || new Date(stamp).getTime() < cutoff) continue;
        const link = article.querySelector('a[href*="/status/"]');
        if (!link) continue;
        const href = link.getAttribute('href') || '';
        const parts = href.split('/status/');
        const id = (parts[1] || '').split('/')[0].split('?')[0];
        if (!id) continue;
        const url = 'https://x.com' + parts[0] + '/status/' + id;
        if (!result.includes(url)) result.push(url);
    }}
    return result;
}})()"#,
        hours = recency_hours
    )
}
