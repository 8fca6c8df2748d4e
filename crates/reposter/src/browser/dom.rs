//! Element queries over a snapshot of the rendered page.

use scraper::{ElementRef, Html, Selector};

use crate::error::{AgentError, Result};

/// Parse a CSS selector, mapping failures to [`AgentError::InvalidSelector`].
pub fn compile_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| AgentError::InvalidSelector {
        selector: selector.to_string(),
        reason: format!("{e:?}"),
    })
}

/// Parsed page HTML.
///
/// Lookups return `Vec`/`Option` so callers decide explicitly whether an
/// absent element means "skip the item" or "use a default".
pub struct PageSnapshot {
    document: Html,
}

impl PageSnapshot {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    /// All elements matching `selector`, in document order.
    pub fn query_all(&self, selector: &Selector) -> Vec<ElementRef<'_>> {
        self.document.select(selector).collect()
    }

    /// First descendant of `scope` matching `selector`.
    pub fn query_one<'a>(scope: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
        scope.select(selector).next()
    }

    /// Text content with whitespace runs collapsed.
    pub fn text_of(element: ElementRef<'_>) -> String {
        element
            .text()
            .flat_map(str::split_whitespace)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
