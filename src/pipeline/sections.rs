//! Split generated text into the `<ocr>`, `<caption>` and `<short_caption>`
//! blocks the default prompt asks for.
//!
//! The `.txt` output always keeps the full text; the parsed sections only
//! feed diagnostics so a prompt override that drops the tags still works.

use crate::prompts::SECTION_TAGS;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static RE_SECTION: Lazy<Regex> = Lazy::new(|| {
    let tags = SECTION_TAGS.join("|");
    Regex::new(&format!(r"(?s)<({tags})>(.*?)</({tags})>")).unwrap()
});

/// Tagged blocks found in one response. Missing tags stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageSections {
    pub ocr: Option<String>,
    pub caption: Option<String>,
    pub short_caption: Option<String>,
}

impl ImageSections {
    /// True when no tagged block was found at all.
    pub fn is_empty(&self) -> bool {
        self.ocr.is_none() && self.caption.is_none() && self.short_caption.is_none()
    }
}

/// Extract the tagged blocks from `text`. The first occurrence of each tag
/// wins; mismatched open/close pairs are ignored.
pub fn parse_sections(text: &str) -> ImageSections {
    let mut sections = ImageSections::default();

    for cap in RE_SECTION.captures_iter(text) {
        if cap[1] != cap[3] {
            continue;
        }
        let body = cap[2].trim().to_string();
        let slot = match &cap[1] {
            "ocr" => &mut sections.ocr,
            "caption" => &mut sections.caption,
            _ => &mut sections.short_caption,
        };
        if slot.is_none() {
            *slot = Some(body);
        }
    }

    sections
}
