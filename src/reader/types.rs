//! Core types for the reader session

use serde::{Deserialize, Serialize};

/// Identifier of a chapter on the server
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChapterId(pub i64);

impl std::fmt::Display for ChapterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Page layout strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReadingMode {
    /// One physical page per display unit, paged navigation
    #[default]
    SinglePage,
    /// Two physical pages joined into a spread
    DoublePage,
    /// Vertical scroll, one page per unit, configurable gap
    ContinuousVertical,
    /// Horizontal scroll, one page per unit
    ContinuousHorizontal,
    /// Vertical scroll with no inter-page gap
    Webtoon,
}

impl ReadingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingMode::SinglePage => "Single page",
            ReadingMode::DoublePage => "Double page",
            ReadingMode::ContinuousVertical => "Continuous vertical",
            ReadingMode::ContinuousHorizontal => "Continuous horizontal",
            ReadingMode::Webtoon => "Webtoon",
        }
    }

    /// Whether pages are reached by scrolling rather than discrete paging
    #[must_use]
    pub const fn is_continuous(&self) -> bool {
        matches!(
            self,
            ReadingMode::ContinuousVertical
                | ReadingMode::ContinuousHorizontal
                | ReadingMode::Webtoon
        )
    }

    /// Layout family: display units are either flat (1:1) or paired
    #[must_use]
    pub const fn family(&self) -> LayoutFamily {
        match self {
            ReadingMode::DoublePage => LayoutFamily::Paired,
            _ => LayoutFamily::Flat,
        }
    }
}

/// Whether display units map 1:1 to physical pages or join them in pairs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutFamily {
    Flat,
    Paired,
}

/// Horizontal reading direction for paged modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReadingDirection {
    #[default]
    LeftToRight,
    RightToLeft,
}

/// Edge a freshly turned page is aligned to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageEdge {
    Left,
    Right,
}

/// Pending chapter-boundary transition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TransitionMode {
    /// Steady reading within the current chapter
    #[default]
    None,
    /// Navigating to the previous chapter boundary
    Previous,
    /// Navigating to the next chapter boundary
    Next,
}

/// Direction of a chapter-boundary transition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransitionDirection {
    Previous,
    Next,
}

impl From<TransitionDirection> for TransitionMode {
    fn from(dir: TransitionDirection) -> Self {
        match dir {
            TransitionDirection::Previous => TransitionMode::Previous,
            TransitionDirection::Next => TransitionMode::Next,
        }
    }
}

/// One physical page inside a display unit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageSlot {
    /// Position within the chapter (0-indexed, stable)
    pub index: usize,
    /// Image URL
    pub url: String,
    /// Alternative text for the display layer
    pub alt: String,
}

impl PageSlot {
    #[must_use]
    pub fn new(index: usize, url: impl Into<String>) -> Self {
        Self {
            index,
            url: url.into(),
            alt: format!("Page #{}", index + 1),
        }
    }
}

/// One display unit: a single page, or two joined as a spread
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
    /// Position within the display list (0-indexed)
    pub index: usize,
    pub primary: PageSlot,
    /// Present only in double-page layout; always `primary.index + 1`
    pub secondary: Option<PageSlot>,
}

impl Page {
    /// Whether this unit joins two physical pages
    #[must_use]
    pub const fn is_spread(&self) -> bool {
        self.secondary.is_some()
    }

    /// Last physical page index covered by this unit
    #[must_use]
    pub fn last_physical_index(&self) -> usize {
        self.secondary
            .as_ref()
            .map_or(self.primary.index, |s| s.index)
    }
}

/// Mutable load record for one page URL
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageLoadState {
    pub url: String,
    pub loaded: bool,
    pub error: bool,
}

impl PageLoadState {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            loaded: false,
            error: false,
        }
    }
}

/// Whether opening a chapter jumps to the stored reading position
/// or starts from the beginning
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ResumeMode {
    #[default]
    FirstPage,
    LastRead,
}
