//! Page layout conversion
//!
//! Produces the display-unit list from the flat page-url list and the
//! active reading mode. Conversion is pure and keyed to layout-family
//! changes; rebuilding on every render would churn display state for
//! nothing, so callers check [`needs_rebuild`] first.

use super::types::{LayoutFamily, Page, PageEdge, PageSlot, ReadingDirection, ReadingMode};

/// Build the display-unit list for a reading mode.
///
/// Flat modes map each physical page 1:1. Double-page joins pages in
/// sequential pairs starting at an even boundary; an odd trailing page
/// stays single.
#[must_use]
pub fn pages_for_mode(urls: &[String], mode: ReadingMode) -> Vec<Page> {
    match mode.family() {
        LayoutFamily::Flat => flat_pages(urls),
        LayoutFamily::Paired => paired_pages(urls),
    }
}

fn flat_pages(urls: &[String]) -> Vec<Page> {
    urls.iter()
        .enumerate()
        .map(|(i, url)| Page {
            index: i,
            primary: PageSlot::new(i, url.clone()),
            secondary: None,
        })
        .collect()
}

fn paired_pages(urls: &[String]) -> Vec<Page> {
    let mut pages = Vec::with_capacity(urls.len().div_ceil(2));
    let mut physical = 0;
    while physical < urls.len() {
        let secondary = urls
            .get(physical + 1)
            .map(|url| PageSlot::new(physical + 1, url.clone()));
        let advance = if secondary.is_some() { 2 } else { 1 };
        pages.push(Page {
            index: pages.len(),
            primary: PageSlot::new(physical, urls[physical].clone()),
            secondary,
        });
        physical += advance;
    }
    pages
}

/// Whether a mode switch changes the layout family.
///
/// Same family means the display list is structurally identical and must
/// not be regenerated.
#[must_use]
pub fn needs_rebuild(prev: ReadingMode, next: ReadingMode) -> bool {
    prev.family() != next.family()
}

/// Last physical page index covered by a display unit, clamped into the
/// chapter. Re-pairing anchors on this so the reader lands on the spread
/// containing what was already viewed instead of splitting the pair.
#[must_use]
pub fn next_index_from_page(page: &Page, total_pages: usize) -> usize {
    page.last_physical_index()
        .min(total_pages.saturating_sub(1))
}

/// Display-unit index containing a physical page
#[must_use]
pub fn display_index_for(pages: &[Page], physical: usize) -> usize {
    pages
        .iter()
        .position(|p| {
            p.primary.index == physical || p.secondary.as_ref().is_some_and(|s| s.index == physical)
        })
        .unwrap_or_else(|| pages.len().saturating_sub(1))
}

/// Rebuild the display list for a mode switch and re-derive the current
/// display index so the viewed page stays on screen.
#[must_use]
pub fn remap_for_mode_change(
    urls: &[String],
    prev_mode: ReadingMode,
    next_mode: ReadingMode,
    current_index: usize,
) -> (Vec<Page>, usize) {
    let prev_pages = pages_for_mode(urls, prev_mode);
    let physical = prev_pages
        .get(current_index.min(prev_pages.len().saturating_sub(1)))
        .map_or(0, |p| next_index_from_page(p, urls.len()));

    let next_pages = pages_for_mode(urls, next_mode);
    let index = display_index_for(&next_pages, physical);
    (next_pages, index)
}

/// Effective inter-page gap. Webtoon pages are drawn to join seamlessly,
/// so the configured gap is ignored there.
#[must_use]
pub const fn page_gap(mode: ReadingMode, configured: u16) -> u16 {
    match mode {
        ReadingMode::Webtoon => 0,
        _ => configured,
    }
}

/// Edge a page starts at after a discrete page turn.
///
/// Continuous modes keep their scroll position; paged modes snap to the
/// direction-dependent origin so horizontal offset never carries over
/// from a wider previous page.
#[must_use]
pub const fn start_edge(mode: ReadingMode, direction: ReadingDirection) -> Option<PageEdge> {
    if mode.is_continuous() {
        return None;
    }
    Some(match direction {
        ReadingDirection::LeftToRight => PageEdge::Left,
        ReadingDirection::RightToLeft => PageEdge::Right,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("http://host/p{i}.png")).collect()
    }

    #[test]
    fn flat_layout_maps_one_to_one() {
        let urls = urls(5);
        let pages = pages_for_mode(&urls, ReadingMode::SinglePage);
        assert_eq!(pages.len(), 5);
        for (i, page) in pages.iter().enumerate() {
            assert_eq!(page.index, i);
            assert_eq!(page.primary.index, i);
            assert!(page.secondary.is_none());
        }
    }

    #[test]
    fn paired_layout_starts_at_even_boundary() {
        let urls = urls(6);
        let pages = pages_for_mode(&urls, ReadingMode::DoublePage);
        assert_eq!(pages.len(), 3);
        for (i, page) in pages.iter().enumerate() {
            assert_eq!(page.primary.index, i * 2);
            assert_eq!(page.secondary.as_ref().unwrap().index, i * 2 + 1);
        }
    }

    #[test]
    fn odd_page_count_leaves_trailing_single() {
        let urls = urls(5);
        let pages = pages_for_mode(&urls, ReadingMode::DoublePage);
        assert_eq!(pages.len(), 3);
        assert!(pages[2].secondary.is_none());
        assert_eq!(pages[2].primary.index, 4);
    }

    #[test]
    fn round_trip_preserves_flat_order() {
        let urls = urls(7);
        let paired = pages_for_mode(&urls, ReadingMode::DoublePage);
        let mut recovered = Vec::new();
        for page in &paired {
            recovered.push(page.primary.url.clone());
            if let Some(s) = &page.secondary {
                recovered.push(s.url.clone());
            }
        }
        assert_eq!(recovered, urls);

        let flat = pages_for_mode(&urls, ReadingMode::SinglePage);
        assert!(flat.iter().all(|p| !p.is_spread()));
    }

    #[test]
    fn conversion_is_idempotent() {
        let urls = urls(9);
        for mode in [ReadingMode::SinglePage, ReadingMode::DoublePage] {
            assert_eq!(pages_for_mode(&urls, mode), pages_for_mode(&urls, mode));
        }
    }

    #[test]
    fn rebuild_only_on_family_change() {
        assert!(needs_rebuild(
            ReadingMode::SinglePage,
            ReadingMode::DoublePage
        ));
        assert!(needs_rebuild(
            ReadingMode::DoublePage,
            ReadingMode::Webtoon
        ));
        assert!(!needs_rebuild(
            ReadingMode::SinglePage,
            ReadingMode::ContinuousVertical
        ));
        assert!(!needs_rebuild(ReadingMode::Webtoon, ReadingMode::Webtoon));
    }

    #[test]
    fn next_index_clamps_below_total() {
        let urls = urls(5);
        let pages = pages_for_mode(&urls, ReadingMode::DoublePage);
        let last = pages.last().unwrap();
        assert!(next_index_from_page(last, urls.len()) < urls.len());
    }

    #[test]
    fn remap_into_double_lands_on_covering_spread() {
        let urls = urls(8);
        // Viewing physical page 5 in single mode
        let (pages, index) = remap_for_mode_change(
            &urls,
            ReadingMode::SinglePage,
            ReadingMode::DoublePage,
            5,
        );
        assert_eq!(pages.len(), 4);
        // Spread (4,5) contains it
        assert_eq!(index, 2);
        assert_eq!(pages[index].primary.index, 4);
        assert_eq!(pages[index].secondary.as_ref().unwrap().index, 5);
    }

    #[test]
    fn remap_out_of_double_flattens() {
        let urls = urls(8);
        // Spread (2,3) is current; flattening lands on its last page
        let (pages, index) = remap_for_mode_change(
            &urls,
            ReadingMode::DoublePage,
            ReadingMode::SinglePage,
            1,
        );
        assert_eq!(pages.len(), 8);
        assert_eq!(index, 3);
        assert!(pages.iter().all(|p| !p.is_spread()));
    }

    #[test]
    fn remap_on_last_page_stays_in_bounds() {
        let urls = urls(5);
        let (pages, index) = remap_for_mode_change(
            &urls,
            ReadingMode::SinglePage,
            ReadingMode::DoublePage,
            4,
        );
        assert!(index < pages.len());
        assert_eq!(pages[index].primary.index, 4);
    }

    #[test]
    fn webtoon_forces_zero_gap() {
        assert_eq!(page_gap(ReadingMode::Webtoon, 12), 0);
        assert_eq!(page_gap(ReadingMode::ContinuousVertical, 12), 12);
        assert_eq!(page_gap(ReadingMode::SinglePage, 12), 12);
    }

    #[test]
    fn start_edge_follows_direction() {
        assert_eq!(
            start_edge(ReadingMode::SinglePage, ReadingDirection::LeftToRight),
            Some(PageEdge::Left)
        );
        assert_eq!(
            start_edge(ReadingMode::SinglePage, ReadingDirection::RightToLeft),
            Some(PageEdge::Right)
        );
        assert_eq!(
            start_edge(ReadingMode::Webtoon, ReadingDirection::LeftToRight),
            None
        );
    }
}
