//! HTML-to-excerpt reduction.
//!
//! The heuristic is deliberately fixed: drop structural noise, drop
//! deny-listed `div`s, prefer `<main>` then `div[role=main]`, fall back to
//! `<body>`, and hard-cut the result to a character ceiling.

use crate::fetch::{FetchError, PageFetcher};
use cheatguard_common::RunMode;
use scraper::{ElementRef, Html};
use std::sync::Arc;
use std::time::Duration;

/// Elements that never contribute text.
pub const NOISE_TAGS: &[&str] = &["header", "footer", "nav", "aside", "script", "style"];

/// `div` classes known to carry site chrome rather than content.
pub const DEFAULT_DENY_CLASSES: &[&str] = &["extra-services", "labstabs"];

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractConfig {
    /// Hard ceiling in characters for the excerpt.
    pub max_chars: usize,
    pub timeout: Duration,
    pub user_agent: String,
    pub deny_classes: Vec<String>,
    /// Put `<url>\n` in front of the page text (counted against `max_chars`).
    pub prefix_source_url: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self::for_mode(RunMode::default())
    }
}

impl ExtractConfig {
    pub fn for_mode(mode: RunMode) -> Self {
        Self {
            max_chars: mode.excerpt_ceiling(),
            timeout: DEFAULT_FETCH_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            deny_classes: DEFAULT_DENY_CLASSES.iter().map(|s| s.to_string()).collect(),
            prefix_source_url: mode.prefix_source_url(),
        }
    }
}

/// Reduce an HTML document to its visible primary text, cut to `max_chars`.
///
/// ```
/// use cheatguard_web::{extract_text, ExtractConfig};
///
/// let html = "<html><body><nav>Menu</nav><main><p>Hello World</p></main></body></html>";
/// assert_eq!(extract_text(html, &ExtractConfig::default()), "Hello World");
/// ```
pub fn extract_text(html: &str, config: &ExtractConfig) -> String {
    let mut document = Html::parse_document(html);
    strip_noise(&mut document, &config.deny_classes);

    let text = primary_region(&document)
        .or_else(|| first_element(&document, |el| el.value().name() == "body"))
        .map(visible_text)
        .unwrap_or_default();

    truncate_chars(&text, config.max_chars)
}

fn strip_noise(document: &mut Html, deny_classes: &[String]) {
    let doomed: Vec<_> = document
        .tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| is_noise(el, deny_classes))
        .map(|el| el.id())
        .collect();

    for id in doomed {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn is_noise(el: &ElementRef<'_>, deny_classes: &[String]) -> bool {
    let value = el.value();
    let name = value.name();
    if NOISE_TAGS.contains(&name) {
        return true;
    }
    name == "div"
        && value
            .classes()
            .any(|class| deny_classes.iter().any(|deny| deny == class))
}

fn primary_region(document: &Html) -> Option<ElementRef<'_>> {
    first_element(document, |el| el.value().name() == "main").or_else(|| {
        first_element(document, |el| {
            el.value().name() == "div" && el.value().attr("role") == Some("main")
        })
    })
}

fn first_element<'a>(
    document: &'a Html,
    pred: impl Fn(&ElementRef<'a>) -> bool,
) -> Option<ElementRef<'a>> {
    document
        .tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| pred(el))
}

/// Trimmed text segments joined by newlines; blank segments vanish.
fn visible_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cut to at most `max` characters. Not word or sentence aware.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Second pipeline stage: URL in, bounded excerpt out.
#[derive(Clone)]
pub struct ContentExtractor {
    fetcher: Arc<dyn PageFetcher>,
    config: ExtractConfig,
}

impl ContentExtractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: ExtractConfig) -> Self {
        Self { fetcher, config }
    }

    /// Fetch and reduce one page, surfacing fetch failures.
    ///
    /// A page with no visible text yields an empty excerpt even when the
    /// source URL would be prefixed.
    pub async fn try_extract(&self, url: &str) -> Result<String, FetchError> {
        let html = self.fetcher.fetch(url).await?;
        let text = extract_text(&html, &self.config);
        if text.is_empty() {
            tracing::debug!(target: "web.extract", url, "extract.empty_page");
            return Ok(text);
        }

        let excerpt = if self.config.prefix_source_url {
            truncate_chars(&format!("{url}\n{text}"), self.config.max_chars)
        } else {
            text
        };
        tracing::debug!(
            target: "web.extract",
            url,
            chars = excerpt.chars().count(),
            "extract.ok"
        );
        Ok(excerpt)
    }

    /// Fetch and reduce one page; any failure is logged and yields `""`.
    pub async fn extract(&self, url: &str) -> String {
        match self.try_extract(url).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(target: "web.extract", url, error = %e, "extract.fetch.failed");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ExtractConfig {
        ExtractConfig::default()
    }

    #[test]
    fn main_wins_over_navigation() {
        let html = r#"<html><body><nav>Menu</nav><main>Hello World</main></body></html>"#;
        assert_eq!(extract_text(html, &cfg()), "Hello World");
    }

    #[test]
    fn body_is_the_fallback() {
        let html = "<html><body>Fallback text</body></html>";
        assert_eq!(extract_text(html, &cfg()), "Fallback text");
    }

    #[test]
    fn role_main_div_is_second_choice() {
        let html = r#"<body><div>outside</div><div role="main"><p>inside</p><p>more</p></div></body>"#;
        assert_eq!(extract_text(html, &cfg()), "inside\nmore");
    }

    #[test]
    fn noise_tags_never_contribute() {
        let html = r#"
            <html><head><style>.x{color:red}</style><script>var secret = 1;</script></head>
            <body>
              <header>Site header</header>
              <aside>Related links</aside>
              <p>  Article   body </p>
              <script>track()</script>
              <footer>Copyright</footer>
            </body></html>"#;
        let text = extract_text(html, &cfg());
        assert_eq!(text, "Article   body");
        for noise in ["Site header", "Related", "track", "Copyright", "secret", "color"] {
            assert!(!text.contains(noise), "{noise} leaked into {text:?}");
        }
    }

    #[test]
    fn main_nested_in_noise_is_not_primary() {
        let html = r#"<body><header><main>Header main</main></header><p>Body text</p></body>"#;
        assert_eq!(extract_text(html, &cfg()), "Body text");
    }

    #[test]
    fn deny_listed_divs_are_dropped() {
        let html = r#"<body><main>
              <div class="card extra-services">Buy now</div>
              <div class="labstabs">Tabs</div>
              <p>Keep me</p>
              <section class="labstabs">Sections are not divs</section>
            </main></body>"#;
        assert_eq!(
            extract_text(html, &cfg()),
            "Keep me\nSections are not divs"
        );
    }

    #[test]
    fn custom_deny_list_replaces_the_default() {
        let mut config = cfg();
        config.deny_classes = vec!["promo".into()];
        let html = r#"<body><div class="promo">Ad</div><div class="labstabs">Tabs</div></body>"#;
        assert_eq!(extract_text(html, &config), "Tabs");
    }

    #[test]
    fn output_is_cut_to_the_ceiling() {
        let body = "word ".repeat(2000);
        let html = format!("<body><main>{body}</main></body>");
        let text = extract_text(&html, &cfg());
        assert_eq!(text.chars().count(), 3000);

        let digest = ExtractConfig::for_mode(RunMode::Digest);
        let text = extract_text(&html, &digest);
        assert_eq!(text.chars().count(), 4000);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("", 0), "");
    }

    #[test]
    fn empty_document_yields_empty_text() {
        assert_eq!(extract_text("", &cfg()), "");
        assert_eq!(extract_text("<nav>only nav</nav>", &cfg()), "");
    }
}
