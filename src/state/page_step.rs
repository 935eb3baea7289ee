//! Step definitions for the page state machine
//!
//! Both labels share the `Start -> CookieCheck` prefix, then branch:
//!
//! - `LIST`: `WaitCards -> EnqueueItems -> EnqueueNextPage -> Done`
//! - `DETAIL`: `WaitTitle -> RevealPhone -> Extract -> Emit -> Done`
use super::Label;
use std::fmt;

/// A named step in the processing of a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageStep {
    // ===== Common Prefix =====
    /// Initial step of every new request
    Start,

    /// Best-effort dismissal of the consent overlay
    CookieCheck,

    // ===== LIST Branch =====
    /// Waiting for at least one item card
    WaitCards,

    /// Enqueueing every item-card link as a DETAIL request
    EnqueueItems,

    /// Enqueueing the next listing page, if any
    EnqueueNextPage,

    // ===== DETAIL Branch =====
    /// Waiting for the primary heading
    WaitTitle,

    /// Best-effort phone reveal
    RevealPhone,

    /// Running the extraction engine
    Extract,

    /// Handing the record to the output sink
    Emit,

    // ===== Terminal =====
    /// The request completed successfully
    Done,
}

impl PageStep {
    /// Returns the step that follows `self` on the branch selected by `label`
    ///
    /// Returns None for `Done`, and for steps that do not belong to the
    /// label's branch.
    pub fn successor(&self, label: Label) -> Option<Self> {
        match (self, label) {
            (Self::Start, _) => Some(Self::CookieCheck),
            (Self::CookieCheck, Label::List) => Some(Self::WaitCards),
            (Self::CookieCheck, Label::Detail) => Some(Self::WaitTitle),

            (Self::WaitCards, Label::List) => Some(Self::EnqueueItems),
            (Self::EnqueueItems, Label::List) => Some(Self::EnqueueNextPage),
            (Self::EnqueueNextPage, Label::List) => Some(Self::Done),

            (Self::WaitTitle, Label::Detail) => Some(Self::RevealPhone),
            (Self::RevealPhone, Label::Detail) => Some(Self::Extract),
            (Self::Extract, Label::Detail) => Some(Self::Emit),
            (Self::Emit, Label::Detail) => Some(Self::Done),

            _ => None,
        }
    }

    /// Returns true if this is the terminal step
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::CookieCheck => "cookie_check",
            Self::WaitCards => "wait_cards",
            Self::EnqueueItems => "enqueue_items",
            Self::EnqueueNextPage => "enqueue_next_page",
            Self::WaitTitle => "wait_title",
            Self::RevealPhone => "reveal_phone",
            Self::Extract => "extract",
            Self::Emit => "emit",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for PageStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
