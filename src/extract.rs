//! Structural article extraction.
//!
//! No per-site rules: candidate links are harvested from landing pages
//! with generic headline/URL heuristics, and article bodies come from
//! paragraph patterns inside common content containers. A page yielding
//! zero usable candidates is an empty result, not an error; a page with
//! no recognizable anchor structure at all is a `ParseError`.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

use crate::error::ParseError;

/// Minimum headline length for a link to count as an article.
const MIN_HEADLINE_CHARS: usize = 15;

/// Minimum paragraph length worth keeping in a body.
const MIN_PARAGRAPH_CHARS: usize = 30;

/// Link or headline fragments that mark navigation, utility pages, and
/// other non-article content.
const EXCLUDE_PATTERNS: &[&str] = &[
    "signup", "subscribe", "login", "mailto:", "javascript:", "newsletter", "privacy", "terms",
    "contact", "about", "careers", "advertise", "podcasts", "gallery", "photos", "/video",
    "alerts", "shop", "games", "author",
];

/// Headline words that suggest actual news content.
const NEWS_INDICATORS: &[&str] = &[
    "story", "article", "news", "report", "breaking", "update", "says", "dies", "killed",
    "arrest", "court", "government", "president", "minister", "war", "attack", "fire", "crash",
    "death", "hospital", "school", "police", "election", "economy",
];

/// URL path fragments that suggest an article page.
const ARTICLE_PATH_HINTS: &[&str] = &["/story/", "/news/", "/article/", "/politics/", "/world/"];

/// Image URL fragments to skip when choosing a lead image.
const IMAGE_SKIP_HINTS: &[&str] = &["logo", "icon", ".svg", "footer", "avatar", "sprite"];

static SEL_ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static SEL_PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static SEL_IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").unwrap());
static SEL_CONTAINERS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "article",
        "main",
        "[role=\"main\"]",
        "[class*=\"article\"]",
        "[class*=\"story\"]",
        "[class*=\"content\"]",
    ]
    .iter()
    .map(|s| Selector::parse(s).unwrap())
    .collect()
});

/// A headline/link pair harvested from a landing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink {
    pub headline: String,
    pub url: String,
}

/// Harvest candidate article links from a landing page.
///
/// Relative hrefs are resolved against `base`. Duplicate URLs within one
/// page are collapsed, encounter order preserved.
pub fn index_candidates(html: &str, base: &Url) -> Result<Vec<CandidateLink>, ParseError> {
    let document = Html::parse_document(html);

    let mut anchors_seen = 0usize;
    let mut seen_urls = std::collections::HashSet::new();
    let mut out = Vec::new();

    for element in document.select(&SEL_ANCHOR) {
        anchors_seen += 1;
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let headline = element.text().collect::<Vec<_>>().join(" ");
        let headline = headline.split_whitespace().collect::<Vec<_>>().join(" ");

        let Ok(resolved) = base.join(href) else {
            continue;
        };
        let url = resolved.to_string();

        if is_news_link(&headline, &url) && seen_urls.insert(url.clone()) {
            out.push(CandidateLink { headline, url });
        }
    }

    if anchors_seen == 0 {
        return Err(ParseError::new(
            base.as_str(),
            "no anchor elements found in document",
        ));
    }

    tracing::debug!(
        candidates = out.len(),
        anchors = anchors_seen,
        base = %base,
        "indexed landing page"
    );
    Ok(out)
}

/// Heuristic gate: does this headline/link pair look like a news article?
pub fn is_news_link(headline: &str, link: &str) -> bool {
    if headline.chars().count() < MIN_HEADLINE_CHARS {
        return false;
    }
    if !link.starts_with("http://") && !link.starts_with("https://") {
        return false;
    }

    let headline_lower = headline.to_lowercase();
    let link_lower = link.to_lowercase();
    if EXCLUDE_PATTERNS
        .iter()
        .any(|p| link_lower.contains(p) || headline_lower.contains(p))
    {
        return false;
    }

    let has_news_words = NEWS_INDICATORS.iter().any(|w| headline_lower.contains(w));
    let has_article_path = ARTICLE_PATH_HINTS.iter().any(|p| link_lower.contains(p));
    has_news_words || has_article_path
}

/// Extract body text from an article page.
///
/// Tries common content containers first and falls back to every
/// paragraph on the page. Paragraphs are joined with blank lines so the
/// ranking engine can count them.
pub fn extract_body(html: &str) -> String {
    let document = Html::parse_document(html);

    for selector in SEL_CONTAINERS.iter() {
        if let Some(container) = document.select(selector).next() {
            let body = collect_paragraphs(container.select(&SEL_PARAGRAPH));
            if body.chars().count() >= 100 {
                return body;
            }
        }
    }

    collect_paragraphs(document.select(&SEL_PARAGRAPH))
}

fn collect_paragraphs<'a>(paragraphs: impl Iterator<Item = scraper::ElementRef<'a>>) -> String {
    paragraphs
        .map(|p| {
            p.text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|t| t.chars().count() >= MIN_PARAGRAPH_CHARS)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Pick a lead image: skip logos and icons, prefer images whose URL
/// names an article/story or that declare a generous width.
pub fn extract_image(html: &str, base: &Url) -> Option<String> {
    let document = Html::parse_document(html);

    let mut fallback = None;
    for img in document.select(&SEL_IMG) {
        let Some(src) = img.value().attr("src") else {
            continue;
        };
        let src_lower = src.to_lowercase();
        if IMAGE_SKIP_HINTS.iter().any(|h| src_lower.contains(h)) {
            continue;
        }

        let Ok(resolved) = base.join(src) else {
            continue;
        };
        let resolved = resolved.to_string();
        let named_like_article = ["article", "story", "news"]
            .iter()
            .any(|g| src_lower.contains(g));
        let wide = img
            .value()
            .attr("width")
            .and_then(|w| w.parse::<u32>().ok())
            .is_some_and(|w| w > 300);

        if named_like_article || wide {
            return Some(resolved);
        }
        fallback.get_or_insert(resolved);
    }
    fallback
}
