// Page-content features: forms, external resources, redirects and lure text

use super::FeatureExtractor;
use crate::config::Watchlists;
use crate::models::{Feature, FeatureSource, FeatureVector};
use crate::utils::http_fetch::{FetchedPage, PageFetcher};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use tracing::debug;
use url::Url;

lazy_static! {
    /// Script statements that move the browser elsewhere
    static ref JS_REDIRECT_PATTERN: Regex = Regex::new(
        r"(?:window|document|self|top)\.location\b|\blocation\.(?:href\s*=[^=]|replace\s*\(|assign\s*\()"
    )
    .expect("Invalid JS redirect regex");

    static ref FORM_SELECTOR: Selector = selector("form");
    static ref PASSWORD_SELECTOR: Selector = selector("input[type=\"password\" i]");
    static ref RESOURCE_SELECTORS: [Selector; 3] = [
        selector("img"),
        selector("script"),
        selector("link[rel~=\"stylesheet\" i]"),
    ];
    static ref ANCHOR_SELECTOR: Selector = selector("a");
    static ref META_SELECTOR: Selector = selector("meta[http-equiv]");
    static ref SCRIPT_SELECTOR: Selector = selector("script");
    static ref TITLE_SELECTOR: Selector = selector("title");
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("Invalid built-in CSS selector")
}

/// `host[:port]` of an absolute URL, lower-cased
fn authority(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    Some(match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

/// Absolute reference to another authority
fn is_external(reference: &str, base: Option<&str>) -> bool {
    if !reference.starts_with("http") {
        return false;
    }
    match authority(reference) {
        Some(other) => Some(other.as_str()) != base,
        None => false,
    }
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Inline style hides the element
fn is_hidden(style: &str) -> bool {
    let compact: String = style
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    compact.contains("display:none") || compact.contains("visibility:hidden")
}

/// Lower-cased text outside script, style and noscript, whitespace collapsed
fn visible_text(document: &Html) -> String {
    let mut text = String::new();
    for node in document.root_element().descendants() {
        let Some(chunk) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| matches!(e.name(), "script" | "style" | "noscript"))
        });
        if !hidden {
            text.push_str(chunk);
        }
    }
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

pub struct ContentFeatureExtractor {
    fetcher: Arc<dyn PageFetcher>,
    watchlists: Arc<Watchlists>,
}

impl ContentFeatureExtractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>, watchlists: Arc<Watchlists>) -> Self {
        Self {
            fetcher,
            watchlists,
        }
    }

    /// Features of an already fetched page, relative to the URL that was requested
    pub fn analyze_page(&self, url: &str, page: &FetchedPage) -> FeatureVector {
        let document = Html::parse_document(&page.body);
        let base = authority(url);
        let base = base.as_deref();
        let mut features = FeatureVector::new();

        // Forms
        let forms: Vec<_> = document.select(&FORM_SELECTOR).collect();
        let external_action = forms.iter().any(|form| {
            form.value()
                .attr("action")
                .is_some_and(|action| is_external(action.trim(), base))
        });
        features
            .set_flag(Feature::HasForm, !forms.is_empty())
            .set_flag(
                Feature::FormWithPassword,
                document.select(&PASSWORD_SELECTOR).next().is_some(),
            )
            .set_flag(Feature::FormExternalAction, external_action);

        // Resources and links
        let mut resources = 0;
        let mut external_resources = 0;
        for sel in RESOURCE_SELECTORS.iter() {
            for element in document.select(sel) {
                resources += 1;
                let reference = element
                    .value()
                    .attr("src")
                    .filter(|s| !s.is_empty())
                    .or_else(|| element.value().attr("href"))
                    .unwrap_or("");
                if is_external(reference.trim(), base) {
                    external_resources += 1;
                }
            }
        }

        let anchors: Vec<_> = document.select(&ANCHOR_SELECTOR).collect();
        let external_links = anchors
            .iter()
            .filter_map(|a| a.value().attr("href"))
            .filter(|href| is_external(href.trim(), base))
            .count();

        features
            .set(
                Feature::ExternalResourceRatio,
                ratio(external_resources, resources),
            )
            .set(
                Feature::ExternalLinkRatio,
                ratio(external_links, anchors.len()),
            );

        // Redirects
        let meta_refresh = document.select(&META_SELECTOR).any(|meta| {
            meta.value()
                .attr("http-equiv")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("refresh"))
        });
        let js_redirect = document
            .select(&SCRIPT_SELECTOR)
            .any(|script| JS_REDIRECT_PATTERN.is_match(&element_text(script)));
        features.set_flag(
            Feature::HasRedirect,
            meta_refresh || js_redirect || page.redirect_count > 0,
        );

        // Link visibility
        let invisible = anchors
            .iter()
            .filter(|a| a.value().attr("style").is_some_and(is_hidden))
            .count();
        features
            .set_count(Feature::VisibleLinksCount, anchors.len() - invisible)
            .set_count(Feature::InvisibleLinksCount, invisible);

        // Title and lure text
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
            .unwrap_or_default();
        let url_in_title = !host.is_empty()
            && document
                .select(&TITLE_SELECTOR)
                .next()
                .map(|t| element_text(t).to_lowercase())
                .is_some_and(|title| title.contains(&host));
        features
            .set_flag(Feature::UrlInTitle, url_in_title)
            .set_count(
                Feature::SuspiciousTextScore,
                self.watchlists.lure_phrase_count(&visible_text(&document)),
            );

        features
    }
}

#[async_trait]
impl FeatureExtractor for ContentFeatureExtractor {
    fn source(&self) -> FeatureSource {
        FeatureSource::Content
    }

    async fn extract(&self, url: &str) -> FeatureVector {
        match self.fetcher.fetch(url).await {
            Some(page) => self.analyze_page(url, &page),
            None => {
                debug!("Content unavailable for {}, using empty features", url);
                self.empty()
            },
        }
    }

    /// All ten content features set to 0
    fn empty(&self) -> FeatureVector {
        Feature::for_source(FeatureSource::Content)
            .map(|f| (f, 0.0))
            .collect()
    }
}
