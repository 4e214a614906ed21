//! Finding the APR label of one farm among look-alike farm panels.
//!
//! A page can render several panels for the same pool (the active farm plus
//! ended or upcoming ones). Inactive panels carry the `hidden` class and are
//! never considered. Of the remaining candidates, the first one in document
//! order that contains a label node wins.

use aprwatch_common::Addressing;
use tracing::debug;

use crate::browser::{BrowserError, NodeHandle, PageHandle};

/// Label node holding the percentage text inside a farm panel.
pub const DEFAULT_LABEL_SELECTOR: &str = r#"div[data-type="info"]"#;

/// Quote `value` as a CSS string literal.
pub fn css_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\a "),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

/// Selector matching every marker for `addressing`, visible or not.
///
/// This is what signals that the page has rendered its farm list.
pub fn readiness_selector(addressing: &Addressing) -> String {
    match addressing {
        Addressing::ByElementId(id) => format!("div[id={}]", css_string(id)),
        Addressing::ByAttributeSubstring { attribute, key } => {
            format!("[{attribute}*={}]", css_string(key))
        }
    }
}

/// Selector matching the visible marker candidates for `addressing`.
pub fn marker_selector(addressing: &Addressing) -> String {
    format!("{}:not(.hidden)", readiness_selector(addressing))
}

/// Characters that can be part of a farm key.
fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// True when `key` occurs in `value` as a whole token, with no
/// `[A-Za-z0-9_-]` character directly on either side. `3514-r` matches
/// `/v2farms/3514-r?tab=1` but not `13514-r`, `3514-rx` or `3514-r-v2`,
/// and `3514` does not match `3514-r`.
pub fn contains_token(value: &str, key: &str) -> bool {
    if key.is_empty() {
        return false;
    }
    value.match_indices(key).any(|(start, _)| {
        let end = start + key.len();
        let before = value[..start].chars().next_back();
        let after = value[end..].chars().next();
        !before.is_some_and(is_token_char) && !after.is_some_and(is_token_char)
    })
}

/// Resolves a target's addressing strategy to its single label node.
#[derive(Debug, Clone)]
pub struct DomLocator {
    label_selector: String,
}

impl Default for DomLocator {
    fn default() -> Self {
        Self::new(DEFAULT_LABEL_SELECTOR)
    }
}

impl DomLocator {
    pub fn new(label_selector: impl Into<String>) -> Self {
        Self {
            label_selector: label_selector.into(),
        }
    }

    /// First label node of the first visible marker that has one.
    pub async fn locate(
        &self,
        page: &dyn PageHandle,
        addressing: &Addressing,
    ) -> Result<Option<Box<dyn NodeHandle>>, BrowserError> {
        let selector = marker_selector(addressing);
        let candidates = page.find_all(&selector).await?;
        debug!(
            target: "scrape.locator",
            key = addressing.key(),
            %selector,
            candidates = candidates.len(),
            "marker candidates"
        );

        for candidate in candidates {
            if let Addressing::ByAttributeSubstring { attribute, key } = addressing {
                let value = candidate.attribute(attribute).await?;
                if !value.as_deref().is_some_and(|v| contains_token(v, key)) {
                    debug!(target: "scrape.locator", key = %key, ?value, "skipping partial key match");
                    continue;
                }
            }

            let mut labels = candidate.find_all(&self.label_selector).await?;
            if !labels.is_empty() {
                return Ok(Some(labels.swap_remove(0)));
            }
        }
        Ok(None)
    }
}
