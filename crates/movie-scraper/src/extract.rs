//! HTML field extraction rules.
//!
//! Pages are parsed once with `scraper` (html5ever) and queried with CSS
//! selectors. Every rule is best-effort: malformed markup, missing elements
//! or unresolvable URLs yield "no match", never an error.
//!
//! `Page` is not `Send`; build it and pull everything out of it inside
//! synchronous code, never across an `.await`.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

static ANCHOR: Lazy<Selector> = Lazy::new(|| selector("a[href]"));
static IMG: Lazy<Selector> = Lazy::new(|| selector("img"));
static H1: Lazy<Selector> = Lazy::new(|| selector("h1"));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static META: Lazy<Selector> = Lazy::new(|| selector("meta[name]"));
static CENTER: Lazy<Selector> = Lazy::new(|| selector("center"));
static STYLED: Lazy<Selector> = Lazy::new(|| selector("[style]"));

static AGE_GATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)age\s+verification|over\s+18|please\s+verify\s+your\s+age|you\s+must\s+be\s+18|are\s+you\s+18",
    )
    .expect("age gate pattern")
});

static BACKGROUND_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)background(?:-image)?\s*:[^;]*url\(\s*['"]?([^'")]+?)['"]?\s*\)"#)
        .expect("background image pattern")
});

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

/// Image embedded in an anchor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRef {
    /// Absolute image URL
    pub src: Option<String>,
    pub title: Option<String>,
    pub alt: Option<String>,
}

impl ImageRef {
    /// `title`, else `alt`
    pub fn label(&self) -> Option<&str> {
        self.title.as_deref().or(self.alt.as_deref())
    }
}

/// Hyperlink with its resolved target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub url: Url,
    /// Inner text, tags stripped and whitespace collapsed
    pub text: String,
    pub image: Option<ImageRef>,
}

/// Result tile of a card-based layout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Card {
    pub title: Option<String>,
    pub image_url: Option<String>,
}

/// Selectors describing a provider's card layout
pub struct CardRule<'a> {
    /// Matches each tile
    pub card: &'a Selector,
    /// Matches the visible title inside a tile
    pub title: &'a Selector,
}

/// Parsed page plus the URL it was fetched from
pub struct Page {
    url: Url,
    document: Html,
}

impl Page {
    pub fn parse(url: Url, body: &str) -> Self {
        Self {
            url,
            document: Html::parse_document(body),
        }
    }

    /// Every `<a href>` whose target resolves to an http(s) URL
    pub fn anchors(&self) -> Vec<Anchor> {
        self.document
            .select(&ANCHOR)
            .filter_map(|a| {
                let url = self.resolve(a.value().attr("href")?)?;
                Some(Anchor {
                    url,
                    text: element_text(&a),
                    image: a.select(&IMG).next().map(|img| self.image_ref(&img)),
                })
            })
            .collect()
    }

    /// Anchors pointing at the page's own site
    pub fn site_anchors(&self) -> Vec<Anchor> {
        let mut anchors = self.anchors();
        anchors.retain(|anchor| same_site(&anchor.url, &self.url));
        anchors
    }

    /// First non-empty `<h1>`, falling back to `<title>`
    pub fn primary_title(&self) -> Option<String> {
        first_text(self.document.select(&H1)).or_else(|| first_text(self.document.select(&TITLE)))
    }

    /// `content` of `<meta name="description">`, empty when absent
    pub fn meta_description(&self) -> String {
        self.document
            .select(&META)
            .find(|meta| {
                meta.value()
                    .attr("name")
                    .is_some_and(|name| name.trim().eq_ignore_ascii_case("description"))
            })
            .and_then(|meta| meta.value().attr("content"))
            .map(collapse_whitespace)
            .unwrap_or_default()
    }

    /// Result tiles matching `rule`, in document order
    pub fn cards(&self, rule: &CardRule<'_>) -> Vec<Card> {
        self.document
            .select(rule.card)
            .map(|card| Card {
                title: card_title(&card, rule.title),
                image_url: self.card_image(&card),
            })
            .collect()
    }

    fn resolve(&self, href: &str) -> Option<Url> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }
        let url = self.url.join(href).ok()?;
        matches!(url.scheme(), "http" | "https").then_some(url)
    }

    fn image_ref(&self, img: &ElementRef<'_>) -> ImageRef {
        let attr = |name: &str| {
            img.value()
                .attr(name)
                .map(collapse_whitespace)
                .filter(|value| !value.is_empty())
        };
        ImageRef {
            src: self.image_src(img),
            title: attr("title"),
            alt: attr("alt"),
        }
    }

    fn image_src(&self, img: &ElementRef<'_>) -> Option<String> {
        ["src", "data-src"]
            .iter()
            .filter_map(|name| img.value().attr(name))
            .find_map(|src| self.resolve(src))
            .map(String::from)
    }

    fn card_image(&self, card: &ElementRef<'_>) -> Option<String> {
        if let Some(src) = card.select(&IMG).find_map(|img| self.image_src(&img)) {
            return Some(src);
        }

        std::iter::once(*card)
            .chain(card.select(&STYLED))
            .filter_map(|el| el.value().attr("style"))
            .filter_map(|style| BACKGROUND_IMAGE.captures(style))
            .find_map(|caps| self.resolve(caps.get(1)?.as_str()))
            .map(String::from)
    }
}

/// Case-insensitive age-gate phrase scan over the raw page
pub fn is_age_gate(body: &str) -> bool {
    AGE_GATE.is_match(body)
}

/// Whether both URLs are on the same host, ignoring a `www.` prefix
pub fn same_site(a: &Url, b: &Url) -> bool {
    fn bare(host: &str) -> &str {
        host.strip_prefix("www.").unwrap_or(host)
    }
    match (a.host_str(), b.host_str()) {
        (Some(a), Some(b)) => bare(a).eq_ignore_ascii_case(bare(b)),
        _ => false,
    }
}

/// Lowercase, non-alphanumeric runs collapsed to one hyphen, trimmed
pub fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    NON_ALNUM
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

/// Readable title from a URL slug: "at-arm-s-length" -> "At Arm S Length"
pub fn humanize_slug(slug: &str) -> String {
    let spaced = slug.replace(['-', '_'], " ");
    let titled = collapse_whitespace(&spaced)
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");
    decode_entities(&titled)
}

/// Final path segment, percent-decoded, ignoring a trailing slash
pub fn last_path_segment(url: &Url) -> Option<String> {
    let segment = url.path().trim_end_matches('/').rsplit('/').next()?;
    if segment.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    let decoded = decoded.trim().to_string();
    (!decoded.is_empty()).then_some(decoded)
}

/// Split on any whitespace and rejoin with single spaces
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let fragment = Html::parse_fragment(text);
    let decoded: String = fragment.root_element().text().collect();
    if decoded.is_empty() {
        text.to_string()
    } else {
        decoded
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn element_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn first_text<'a>(mut elements: impl Iterator<Item = ElementRef<'a>>) -> Option<String> {
    elements.find_map(|el| {
        let text = element_text(&el);
        (!text.is_empty()).then_some(text)
    })
}

fn card_title(card: &ElementRef<'_>, title: &Selector) -> Option<String> {
    first_text(card.select(&CENTER))
        .or_else(|| first_text(card.select(title)))
        .or_else(|| {
            card.text()
                .flat_map(|chunk| chunk.lines())
                .map(collapse_whitespace)
                .find(|line| !line.is_empty())
        })
}
