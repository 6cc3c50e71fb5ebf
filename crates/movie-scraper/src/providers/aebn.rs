//! AEBN: card-based search results.
//!
//! Results come as tiles whose visible title is not always inside the
//! detail link. Extraction runs two passes over the page:
//!
//! 1. detail anchors (`/movies/...`, no fragment, no scene links), each with
//!    a title from its cover image or, failing that, its URL slug
//! 2. result cards with their visible titles
//!
//! A card is paired with the first anchor whose title slug or final path
//! segment equals the card title's slug. When no card pairs with anything,
//! the anchors themselves are the results.

use super::SiteLayout;
use crate::extract::{self, Anchor, CardRule, Page};
use once_cell::sync::Lazy;
use scraper::Selector;
use shared::{CandidateResult, ProviderKind};

const DETAIL_PREFIX: &str = "/movies/";

static CARD: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".dts-collection-item, .card, .tile").expect("card selector")
});

static CARD_TITLE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".dts-collection-item-title, .card-title, .title").expect("card title selector")
});

pub struct AebnLayout;

/// Detail link with its derived title and comparison keys
#[derive(Debug)]
struct DetailAnchor {
    url: String,
    title: String,
    title_slug: String,
    segment_slug: String,
    image: Option<String>,
}

impl DetailAnchor {
    fn from_anchor(anchor: Anchor) -> Option<Self> {
        let path = anchor.url.path().to_ascii_lowercase();
        let is_scene = path.split('/').any(|segment| segment == "scene" || segment == "scenes");
        if !path.starts_with(DETAIL_PREFIX) || anchor.url.fragment().is_some() || is_scene {
            return None;
        }

        let segment = extract::last_path_segment(&anchor.url);
        let image_label = anchor
            .image
            .as_ref()
            .and_then(|image| image.label())
            .map(str::to_string);
        let title = image_label
            .or_else(|| segment.as_deref().map(extract::humanize_slug))
            .filter(|title| !title.is_empty())
            .or_else(|| (!anchor.text.is_empty()).then(|| anchor.text.clone()))?;

        Some(Self {
            title_slug: extract::slugify(&title),
            segment_slug: segment.as_deref().map(extract::slugify).unwrap_or_default(),
            url: anchor.url.to_string(),
            title,
            image: anchor.image.and_then(|image| image.src),
        })
    }

    fn matches(&self, slug: &str) -> bool {
        self.title_slug == slug || self.segment_slug == slug
    }

    fn into_candidate(self) -> CandidateResult {
        CandidateResult::new(ProviderKind::Aebn, self.title, self.url).with_image(self.image)
    }
}

impl SiteLayout for AebnLayout {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Aebn
    }

    fn extract_candidates(&self, page: &Page) -> Vec<CandidateResult> {
        let anchors: Vec<DetailAnchor> = page
            .site_anchors()
            .into_iter()
            .filter_map(DetailAnchor::from_anchor)
            .collect();

        let rule = CardRule {
            card: &CARD,
            title: &CARD_TITLE,
        };

        let correlated: Vec<CandidateResult> = page
            .cards(&rule)
            .into_iter()
            .filter_map(|card| {
                let title = card.title?;
                let slug = extract::slugify(&title);
                if slug.is_empty() {
                    return None;
                }
                let anchor = anchors.iter().find(|anchor| anchor.matches(&slug))?;
                let image = card.image_url.or_else(|| anchor.image.clone());
                Some(CandidateResult::new(ProviderKind::Aebn, title, anchor.url.as_str()).with_image(image))
            })
            .collect();

        if correlated.is_empty() {
            anchors.into_iter().map(DetailAnchor::into_candidate).collect()
        } else {
            correlated
        }
    }
}
