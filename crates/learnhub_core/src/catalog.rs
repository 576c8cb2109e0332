//! crates/learnhub_core/src/catalog.rs
//!
//! Client-side catalog shaping: filtering, sorting, pagination and facet counts.
//!
//! Everything here is a pure function of its inputs. The external search
//! backend is assumed to hand items over already ranked, which is why
//! [`SortKey::Relevance`] never reorders anything.

use crate::domain::{ContentItem, SkillLevel};
use chrono::{DateTime, Utc};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

//=========================================================================================
// Filter
//=========================================================================================

/// An inclusive `[min, max]` range where either bound may be left open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InclusiveRange<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T: PartialOrd> InclusiveRange<T> {
    pub fn new(min: Option<T>, max: Option<T>) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: &T) -> bool {
        self.min.as_ref().map_or(true, |min| value >= min)
            && self.max.as_ref().map_or(true, |max| value <= max)
    }

    fn is_open(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// The set of optional constraints a catalog view is narrowed by.
///
/// Dimensions combine with AND; values inside a multi-select dimension
/// combine with OR. An empty dimension imposes no constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub machine_models: BTreeSet<String>,
    pub processes: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub skill_levels: BTreeSet<SkillLevel>,
    pub authors: BTreeSet<Uuid>,
    pub duration: Option<InclusiveRange<u32>>,
    pub created: Option<InclusiveRange<DateTime<Utc>>>,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        self.machine_models.is_empty()
            && self.processes.is_empty()
            && self.tags.is_empty()
            && self.skill_levels.is_empty()
            && self.authors.is_empty()
            && self.duration.as_ref().map_or(true, InclusiveRange::is_open)
            && self.created.as_ref().map_or(true, InclusiveRange::is_open)
    }
}

fn one_of<T: Ord>(selected: &BTreeSet<T>, value: &T) -> bool {
    selected.is_empty() || selected.contains(value)
}

/// Returns true iff `item` satisfies every non-empty dimension of `filter`.
pub fn matches(item: &ContentItem, filter: &Filter) -> bool {
    one_of(&filter.machine_models, &item.machine_model)
        && one_of(&filter.processes, &item.process)
        && one_of(&filter.skill_levels, &item.skill_level)
        && one_of(&filter.authors, &item.author_id)
        && (filter.tags.is_empty() || item.tags.iter().any(|t| filter.tags.contains(t)))
        && filter
            .duration
            .as_ref()
            .map_or(true, |r| r.contains(&item.duration_seconds))
        && filter
            .created
            .as_ref()
            .map_or(true, |r| r.contains(&item.created_at))
}

/// Case-insensitive free-text match used by "search mode".
///
/// A blank query matches everything.
pub fn matches_text(item: &ContentItem, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    item.title.to_lowercase().contains(&needle)
        || item.description.to_lowercase().contains(&needle)
        || item.machine_model.to_lowercase().contains(&needle)
        || item.process.to_lowercase().contains(&needle)
        || item.tags.iter().any(|t| t.to_lowercase().contains(&needle))
}

//=========================================================================================
// Sorting
//=========================================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Relevance,
    Newest,
    MostViewed,
    Recommended,
}

impl SortKey {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "relevance" => Some(SortKey::Relevance),
            "newest" => Some(SortKey::Newest),
            "most_viewed" => Some(SortKey::MostViewed),
            "recommended" => Some(SortKey::Recommended),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

const RECOMMENDED_VIEW_WEIGHT: f64 = 0.7;
const RECOMMENDED_AGE_WEIGHT: f64 = 0.3;

/// Weighted score used by [`SortKey::Recommended`]:
/// `0.7 * view_count + 0.3 * age_in_days`.
pub fn recommended_score(item: &ContentItem, now: DateTime<Utc>) -> f64 {
    let age_days = (now - item.created_at).num_days().max(0) as f64;
    RECOMMENDED_VIEW_WEIGHT * item.view_count as f64 + RECOMMENDED_AGE_WEIGHT * age_days
}

/// The ascending comparator for `key`. `Relevance` treats every pair as equal.
fn compare(a: &ContentItem, b: &ContentItem, key: SortKey, now: DateTime<Utc>) -> Ordering {
    match key {
        SortKey::Relevance => Ordering::Equal,
        SortKey::Newest => a.created_at.cmp(&b.created_at),
        SortKey::MostViewed => a.view_count.cmp(&b.view_count),
        SortKey::Recommended => recommended_score(a, now).total_cmp(&recommended_score(b, now)),
    }
}

/// Stable in-place sort.
///
/// `Desc` flips the comparator rather than reversing the output, so ties
/// keep their input order in both directions.
pub fn sort<T: Borrow<ContentItem>>(
    items: &mut [T],
    key: SortKey,
    order: SortOrder,
    now: DateTime<Utc>,
) {
    if key == SortKey::Relevance {
        return;
    }
    items.sort_by(|a, b| {
        let ord = compare(a.borrow(), b.borrow(), key, now);
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

//=========================================================================================
// Pagination
//=========================================================================================

/// The page sizes the catalog UI offers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageSize {
    #[default]
    Twelve,
    TwentyFour,
    FortyEight,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Unsupported page size {0}; expected 12, 24 or 48")]
pub struct PageSizeError(pub usize);

impl PageSize {
    pub fn get(self) -> usize {
        match self {
            PageSize::Twelve => 12,
            PageSize::TwentyFour => 24,
            PageSize::FortyEight => 48,
        }
    }
}

impl TryFrom<usize> for PageSize {
    type Error = PageSizeError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            12 => Ok(PageSize::Twelve),
            24 => Ok(PageSize::TwentyFour),
            48 => Ok(PageSize::FortyEight),
            other => Err(PageSizeError(other)),
        }
    }
}

/// `ceil(count / page_size)`, which is 0 for an empty result.
pub fn total_pages(count: usize, page_size: PageSize) -> usize {
    count.div_ceil(page_size.get())
}

/// Everything that determines one rendered catalog page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogQuery {
    /// Free-text query; `Some` puts the view in search mode.
    pub text: Option<String>,
    pub filter: Filter,
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
    /// 1-indexed. Page 0 or a page past the end yields an empty slice.
    pub page: usize,
    pub page_size: PageSize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPage<'a> {
    pub items: Vec<&'a ContentItem>,
    pub total_count: usize,
    pub total_pages: usize,
}

/// Filters, sorts and slices `items` into the requested page.
///
/// Never clamps the page: callers reset to page 1 when their inputs change
/// (see [`crate::browse`]).
pub fn apply<'a>(items: &'a [ContentItem], query: &CatalogQuery, now: DateTime<Utc>) -> CatalogPage<'a> {
    let text = query.text.as_deref().unwrap_or("");
    let mut selected: Vec<&ContentItem> = items
        .iter()
        .filter(|item| matches_text(item, text) && matches(item, &query.filter))
        .collect();
    sort(&mut selected, query.sort_key, query.sort_order, now);

    let total_count = selected.len();
    let size = query.page_size.get();
    let page_items = match query.page.checked_sub(1) {
        Some(zero_based) => selected
            .into_iter()
            .skip(zero_based.saturating_mul(size))
            .take(size)
            .collect(),
        None => Vec::new(),
    };

    CatalogPage {
        items: page_items,
        total_count,
        total_pages: total_pages(total_count, query.page_size),
    }
}

//=========================================================================================
// Facets
//=========================================================================================

/// Per-value counts for each categorical filter dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Facets {
    pub machine_models: BTreeMap<String, usize>,
    pub processes: BTreeMap<String, usize>,
    pub skill_levels: BTreeMap<SkillLevel, usize>,
    pub tags: BTreeMap<String, usize>,
    pub authors: BTreeMap<Uuid, usize>,
}

pub fn facets<'a, I>(items: I) -> Facets
where
    I: IntoIterator<Item = &'a ContentItem>,
{
    let mut facets = Facets::default();
    for item in items {
        *facets.machine_models.entry(item.machine_model.clone()).or_default() += 1;
        *facets.processes.entry(item.process.clone()).or_default() += 1;
        *facets.skill_levels.entry(item.skill_level).or_default() += 1;
        *facets.authors.entry(item.author_id).or_default() += 1;
        for tag in &item.tags {
            *facets.tags.entry(tag.clone()).or_default() += 1;
        }
    }
    facets
}
