//! GEVI: anchor-based search results.
//!
//! Result pages are plain link lists. A link is a detail link when one of
//! its path segments starts with a detail keyword.

use super::SiteLayout;
use crate::extract::{self, Anchor, Page};
use shared::{CandidateResult, ProviderKind};
use url::Url;

const DETAIL_KEYWORDS: [&str; 2] = ["movie", "video"];

pub struct GeviLayout;

impl GeviLayout {
    fn is_detail_url(url: &Url) -> bool {
        url.path_segments()
            .map(|mut segments| {
                segments.any(|segment| {
                    let segment = segment.to_ascii_lowercase();
                    DETAIL_KEYWORDS.iter().any(|kw| segment.starts_with(kw))
                })
            })
            .unwrap_or(false)
    }

    fn candidate(anchor: Anchor) -> Option<CandidateResult> {
        let name = if anchor.text.is_empty() {
            extract::last_path_segment(&anchor.url)?
        } else {
            anchor.text
        };
        let image = anchor.image.and_then(|image| image.src);

        Some(CandidateResult::new(ProviderKind::Gevi, name, anchor.url.as_str()).with_image(image))
    }
}

impl SiteLayout for GeviLayout {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gevi
    }

    fn extract_candidates(&self, page: &Page) -> Vec<CandidateResult> {
        page.site_anchors()
            .into_iter()
            .filter(|anchor| Self::is_detail_url(&anchor.url))
            .filter_map(Self::candidate)
            .collect()
    }
}
