//! crates/learnhub_core/src/browse.rs
//!
//! The library page's view state as an explicit reducer.
//!
//! Rule: any change to the query, filter, sort key, sort order or page size
//! sends the view back to page 1. Page changes are clamped to the pages that
//! exist for the last loaded result count.

use crate::catalog::{total_pages, CatalogQuery, Filter, PageSize, SortKey, SortOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseMode {
    /// A free-text query is active; results come pre-ranked.
    Search,
    /// Plain catalog browsing.
    Browse,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrowseState {
    pub query: Option<String>,
    pub filter: Filter,
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
    pub page: usize,
    pub page_size: PageSize,
    pub total_count: usize,
}

impl Default for BrowseState {
    fn default() -> Self {
        Self {
            query: None,
            filter: Filter::default(),
            sort_key: SortKey::default(),
            sort_order: SortOrder::default(),
            page: 1,
            page_size: PageSize::default(),
            total_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BrowseAction {
    QueryChanged(Option<String>),
    FilterChanged(Filter),
    SortKeyChanged(SortKey),
    SortOrderChanged(SortOrder),
    PageSizeChanged(PageSize),
    PageChanged(usize),
    ResultsLoaded { total_count: usize },
}

impl BrowseState {
    pub fn mode(&self) -> BrowseMode {
        match self.query.as_deref() {
            Some(q) if !q.trim().is_empty() => BrowseMode::Search,
            _ => BrowseMode::Browse,
        }
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.total_count, self.page_size)
    }

    fn clamp_page(&self, page: usize) -> usize {
        page.clamp(1, self.total_pages().max(1))
    }

    /// The catalog query this state renders.
    pub fn to_query(&self) -> CatalogQuery {
        CatalogQuery {
            text: self.query.clone(),
            filter: self.filter.clone(),
            sort_key: self.sort_key,
            sort_order: self.sort_order,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

pub fn reduce(state: BrowseState, action: BrowseAction) -> BrowseState {
    match action {
        BrowseAction::QueryChanged(query) => BrowseState {
            query,
            page: 1,
            ..state
        },
        BrowseAction::FilterChanged(filter) => BrowseState {
            filter,
            page: 1,
            ..state
        },
        BrowseAction::SortKeyChanged(sort_key) => BrowseState {
            sort_key,
            page: 1,
            ..state
        },
        BrowseAction::SortOrderChanged(sort_order) => BrowseState {
            sort_order,
            page: 1,
            ..state
        },
        BrowseAction::PageSizeChanged(page_size) => BrowseState {
            page_size,
            page: 1,
            ..state
        },
        BrowseAction::PageChanged(page) => {
            let page = state.clamp_page(page);
            BrowseState { page, ..state }
        }
        BrowseAction::ResultsLoaded { total_count } => {
            let loaded = BrowseState {
                total_count,
                ..state
            };
            let page = loaded.clamp_page(loaded.page);
            BrowseState { page, ..loaded }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SkillLevel;

    fn on_page_three() -> BrowseState {
        let state = reduce(
            BrowseState::default(),
            BrowseAction::ResultsLoaded { total_count: 100 },
        );
        reduce(state, BrowseAction::PageChanged(3))
    }

    #[test]
    fn starts_on_page_one_in_browse_mode() {
        let state = BrowseState::default();
        assert_eq!(state.page, 1);
        assert_eq!(state.mode(), BrowseMode::Browse);
    }

    #[test]
    fn every_input_change_resets_to_page_one() {
        let filter = Filter {
            skill_levels: [SkillLevel::Expert].into(),
            ..Filter::default()
        };
        let actions = vec![
            BrowseAction::QueryChanged(Some("spindle".into())),
            BrowseAction::FilterChanged(filter),
            BrowseAction::SortKeyChanged(SortKey::Newest),
            BrowseAction::SortOrderChanged(SortOrder::Asc),
            BrowseAction::PageSizeChanged(PageSize::FortyEight),
        ];
        for action in actions {
            let state = on_page_three();
            assert_eq!(state.page, 3);
            let next = reduce(state, action.clone());
            assert_eq!(next.page, 1, "{action:?} should reset the page");
        }
    }

    #[test]
    fn page_changes_are_clamped() {
        let state = on_page_three();
        // 100 items at 12 per page -> 9 pages
        let state = reduce(state, BrowseAction::PageChanged(50));
        assert_eq!(state.page, 9);
        let state = reduce(state, BrowseAction::PageChanged(0));
        assert_eq!(state.page, 1);
    }

    #[test]
    fn empty_results_keep_page_at_one() {
        let state = on_page_three();
        let state = reduce(state, BrowseAction::ResultsLoaded { total_count: 0 });
        assert_eq!(state.page, 1);
        assert_eq!(state.total_pages(), 0);
        let state = reduce(state, BrowseAction::PageChanged(4));
        assert_eq!(state.page, 1);
    }

    #[test]
    fn shrinking_results_pull_the_page_back() {
        let state = on_page_three();
        let state = reduce(state, BrowseAction::ResultsLoaded { total_count: 13 });
        assert_eq!(state.page, 2);
    }

    #[test]
    fn blank_query_is_browse_mode() {
        let state = reduce(
            BrowseState::default(),
            BrowseAction::QueryChanged(Some("   ".into())),
        );
        assert_eq!(state.mode(), BrowseMode::Browse);
        let state = reduce(state, BrowseAction::QueryChanged(Some("lathe".into())));
        assert_eq!(state.mode(), BrowseMode::Search);
        assert_eq!(state.to_query().text.as_deref(), Some("lathe"));
    }
}
