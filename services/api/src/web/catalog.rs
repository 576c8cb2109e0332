//! services/api/src/web/catalog.rs
//!
//! The library page: filtered, sorted and paginated clip listings, plus the
//! user's bookmarks.

use crate::error::{ApiError, ErrorBody};
use crate::web::dto::{CatalogPageDto, ClipDto, FacetsDto, ToggleBookmarkResponse};
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use learnhub_core::bookmarks::BookmarkSet;
use learnhub_core::browse::{BrowseMode, BrowseState};
use learnhub_core::catalog::{self, Filter, InclusiveRange, PageSize, SortKey, SortOrder};
use learnhub_core::domain::SkillLevel;
use learnhub_core::validation::ValidationErrors;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::IntoParams;
use uuid::Uuid;

//=========================================================================================
// Query string
//=========================================================================================

/// Catalog query string. Set-valued dimensions are comma separated.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CatalogParams {
    /// Free-text search; switches the listing into search mode.
    pub q: Option<String>,
    pub machine_models: Option<String>,
    pub processes: Option<String>,
    pub tags: Option<String>,
    /// Any of `beginner`, `intermediate`, `advanced`, `expert`.
    pub skill_levels: Option<String>,
    /// Author ids.
    pub authors: Option<String>,
    pub min_duration: Option<u32>,
    pub max_duration: Option<u32>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    /// `relevance` (default), `newest`, `most_viewed` or `recommended`.
    pub sort: Option<String>,
    /// `asc` or `desc` (default).
    pub order: Option<String>,
    /// 1-indexed, defaults to 1.
    pub page: Option<usize>,
    /// 12 (default), 24 or 48.
    pub page_size: Option<usize>,
}

fn split_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn string_set(raw: Option<&str>) -> BTreeSet<String> {
    split_list(raw).map(str::to_string).collect()
}

/// Turns the query string into the browse state it describes.
pub fn parse_catalog_params(params: &CatalogParams) -> Result<BrowseState, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let mut skill_levels = BTreeSet::new();
    for raw in split_list(params.skill_levels.as_deref()) {
        match raw.parse::<SkillLevel>() {
            Ok(level) => {
                skill_levels.insert(level);
            }
            Err(e) => errors.add("skill_levels", e.to_string()),
        }
    }

    let mut authors = BTreeSet::new();
    for raw in split_list(params.authors.as_deref()) {
        match Uuid::parse_str(raw) {
            Ok(id) => {
                authors.insert(id);
            }
            Err(_) => errors.add("authors", format!("'{raw}' is not a valid author id")),
        }
    }

    if let (Some(min), Some(max)) = (params.min_duration, params.max_duration) {
        if min > max {
            errors.add("min_duration", "Minimum duration is above the maximum");
        }
    }
    if let (Some(after), Some(before)) = (params.created_after, params.created_before) {
        if after > before {
            errors.add("created_after", "Start date is after the end date");
        }
    }

    let sort_key = match params.sort.as_deref() {
        None => SortKey::default(),
        Some(raw) => SortKey::parse(raw).unwrap_or_else(|| {
            errors.add("sort", format!("Unknown sort key '{raw}'"));
            SortKey::default()
        }),
    };
    let sort_order = match params.order.as_deref() {
        None => SortOrder::default(),
        Some(raw) => SortOrder::parse(raw).unwrap_or_else(|| {
            errors.add("order", format!("Unknown sort order '{raw}'"));
            SortOrder::default()
        }),
    };
    let page_size = match params.page_size {
        None => PageSize::default(),
        Some(raw) => PageSize::try_from(raw).unwrap_or_else(|e| {
            errors.add("page_size", e.to_string());
            PageSize::default()
        }),
    };

    let duration = (params.min_duration.is_some() || params.max_duration.is_some())
        .then(|| InclusiveRange::new(params.min_duration, params.max_duration));
    let created = (params.created_after.is_some() || params.created_before.is_some())
        .then(|| InclusiveRange::new(params.created_after, params.created_before));

    errors.into_result()?;

    Ok(BrowseState {
        query: params.q.clone().filter(|q| !q.trim().is_empty()),
        filter: Filter {
            machine_models: string_set(params.machine_models.as_deref()),
            processes: string_set(params.processes.as_deref()),
            tags: string_set(params.tags.as_deref()),
            skill_levels,
            authors,
            duration,
            created,
        },
        sort_key,
        sort_order,
        page: params.page.unwrap_or(1),
        page_size,
        total_count: 0,
    })
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /catalog - One page of clips plus facet counts for the filter panel.
#[utoipa::path(
    get,
    path = "/catalog",
    params(CatalogParams),
    responses(
        (status = 200, description = "Catalog page", body = CatalogPageDto),
        (status = 422, description = "Invalid query parameters", body = ErrorBody)
    ),
    tag = "Catalog"
)]
pub async fn catalog_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CatalogParams>,
) -> Result<Json<CatalogPageDto>, ApiError> {
    let browse = parse_catalog_params(&params)?;
    let query = browse.to_query();

    let clips = state.db.list_clips().await.map_err(|e| {
        error!("Failed to list clips: {:?}", e);
        e
    })?;

    // Facets cover the text matches, before any facet filter is applied.
    let text = query.text.as_deref().unwrap_or("");
    let facets = catalog::facets(clips.iter().filter(|c| catalog::matches_text(c, text)));
    let page = catalog::apply(&clips, &query, Utc::now());

    let mode = match browse.mode() {
        BrowseMode::Search => "search",
        BrowseMode::Browse => "browse",
    };

    Ok(Json(CatalogPageDto {
        items: page.items.into_iter().map(ClipDto::from).collect(),
        page: query.page,
        page_size: query.page_size.get(),
        total_count: page.total_count,
        total_pages: page.total_pages,
        mode: mode.to_string(),
        facets: FacetsDto::from(facets),
    }))
}

/// GET /bookmarks - The user's bookmarked clips, most recent first.
#[utoipa::path(
    get,
    path = "/bookmarks",
    responses(
        (status = 200, description = "Bookmarked clips", body = [ClipDto]),
        (status = 401, description = "Not signed in")
    ),
    tag = "Catalog"
)]
pub async fn list_bookmarks_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<ClipDto>>, ApiError> {
    let bookmarked = state.db.list_bookmarks(user_id).await.map_err(|e| {
        error!("Failed to list bookmarks: {:?}", e);
        e
    })?;
    let clips = state.db.list_clips().await?;
    let by_id: HashMap<Uuid, _> = clips.iter().map(|c| (c.id, c)).collect();

    Ok(Json(
        bookmarked
            .iter()
            .filter_map(|id| by_id.get(id))
            .map(|clip| ClipDto::from(*clip))
            .collect(),
    ))
}

/// POST /bookmarks/{clip_id}/toggle - Flip a bookmark.
///
/// The toggle is applied optimistically; if the store rejects it the
/// previous state is restored and reported with `persisted: false`.
#[utoipa::path(
    post,
    path = "/bookmarks/{clip_id}/toggle",
    params(("clip_id" = Uuid, Path, description = "The clip to bookmark or un-bookmark")),
    responses(
        (status = 200, description = "Toggle persisted", body = ToggleBookmarkResponse),
        (status = 404, description = "Unknown clip", body = ErrorBody),
        (status = 503, description = "Store rejected the toggle; rolled back", body = ToggleBookmarkResponse)
    ),
    tag = "Catalog"
)]
pub async fn toggle_bookmark_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(clip_id): Path<Uuid>,
) -> Result<(StatusCode, Json<ToggleBookmarkResponse>), ApiError> {
    state.db.get_clip(clip_id).await?;
    let mut bookmarks: BookmarkSet = state.db.list_bookmarks(user_id).await?.into_iter().collect();

    let pending = bookmarks.toggle(clip_id);
    let stored = if pending.now_bookmarked() {
        state.db.add_bookmark(user_id, clip_id).await
    } else {
        state.db.remove_bookmark(user_id, clip_id).await
    };

    match stored {
        Ok(()) => {
            let bookmarked = bookmarks.confirm(pending);
            Ok((
                StatusCode::OK,
                Json(ToggleBookmarkResponse {
                    clip_id,
                    bookmarked,
                    persisted: true,
                }),
            ))
        }
        Err(e) => {
            warn!("Bookmark toggle for clip {} rolled back: {:?}", clip_id, e);
            bookmarks.rollback(pending);
            Ok((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ToggleBookmarkResponse {
                    clip_id,
                    bookmarked: bookmarks.contains(clip_id),
                    persisted: false,
                }),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lists_and_defaults() {
        let params = CatalogParams {
            machine_models: Some("VF-2, ST-10,".into()),
            skill_levels: Some("beginner,expert".into()),
            min_duration: Some(60),
            ..CatalogParams::default()
        };
        let state = parse_catalog_params(&params).unwrap();
        assert_eq!(state.filter.machine_models.len(), 2);
        assert!(state.filter.skill_levels.contains(&SkillLevel::Expert));
        assert_eq!(state.filter.duration, Some(InclusiveRange::new(Some(60), None)));
        assert_eq!(state.page, 1);
        assert_eq!(state.page_size, PageSize::Twelve);
        assert_eq!(state.sort_key, SortKey::Relevance);
        assert_eq!(state.sort_order, SortOrder::Desc);
        assert_eq!(state.mode(), BrowseMode::Browse);
    }

    #[test]
    fn collects_every_invalid_field() {
        let params = CatalogParams {
            skill_levels: Some("guru".into()),
            authors: Some("nobody".into()),
            sort: Some("alphabetical".into()),
            page_size: Some(10),
            ..CatalogParams::default()
        };
        let errors = parse_catalog_params(&params).unwrap_err();
        for field in ["skill_levels", "authors", "sort", "page_size"] {
            assert!(errors.get(field).is_some(), "missing error for {field}");
        }
    }

    #[test]
    fn blank_query_stays_in_browse_mode() {
        let params = CatalogParams {
            q: Some("   ".into()),
            ..CatalogParams::default()
        };
        assert_eq!(parse_catalog_params(&params).unwrap().mode(), BrowseMode::Browse);
    }
}
