/// In-memory filter, sort, and pagination over normalized event snapshots.
use crate::domain::Event;
use crate::errors::{ApiError, ApiResult};
use crate::geo::{classify_region, Region};
use crate::utils::parse_event_date;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Most recent primary-geometry date first.
    #[default]
    Date,
    /// Ascending by title.
    Title,
    /// Ascending by primary category title.
    Type,
}

/// Search criteria. All present filters compose conjunctively.
#[derive(Debug, Clone)]
pub struct Criteria {
    pub search: Option<String>,
    pub category: Option<String>,
    pub region: Option<Region>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub sort: SortKey,
    /// 1-indexed page number.
    pub page: usize,
    pub page_size: usize,
}

impl Default for Criteria {
    fn default() -> Self {
        Self {
            search: None,
            category: None,
            region: None,
            date_from: None,
            date_to: None,
            sort: SortKey::Date,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of a filtered, sorted result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// Execute the criteria against an immutable snapshot of events.
///
/// Deterministic and side-effect-free: the same `(events, criteria)` pair
/// always yields the same page. An empty result is a valid answer; only
/// unusable page or date parameters are errors.
pub fn query(events: &[Event], criteria: &Criteria) -> ApiResult<Page<Event>> {
    if criteria.page == 0 {
        return Err(ApiError::InvalidQuery("page numbers start at 1".to_string()));
    }
    if criteria.page_size == 0 {
        return Err(ApiError::InvalidQuery("page size must be positive".to_string()));
    }

    let date_from = parse_bound(criteria.date_from.as_deref(), false)?;
    let date_to = parse_bound(criteria.date_to.as_deref(), true)?;

    let mut matches: Vec<&Event> = events
        .iter()
        .filter(|e| matches_search(e, criteria.search.as_deref()))
        .filter(|e| matches_category(e, criteria.category.as_deref()))
        .filter(|e| matches_region(e, criteria.region))
        .filter(|e| matches_dates(e, date_from, date_to))
        .collect();

    sort_events(&mut matches, criteria.sort);

    let total = matches.len();
    let total_pages = total.div_ceil(criteria.page_size);
    let start = (criteria.page - 1).saturating_mul(criteria.page_size);
    let items = matches
        .into_iter()
        .skip(start)
        .take(criteria.page_size)
        .cloned()
        .collect();

    Ok(Page {
        items,
        page: criteria.page,
        page_size: criteria.page_size,
        total,
        total_pages,
    })
}

/// Parse a criteria date bound as RFC 3339 or `YYYY-MM-DD`. A bare `to`
/// date is pushed to the end of its day so the bound stays inclusive.
fn parse_bound(raw: Option<&str>, end_of_day: bool) -> ApiResult<Option<DateTime<Utc>>> {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let time = if end_of_day {
            date.and_hms_opt(23, 59, 59)
        } else {
            date.and_hms_opt(0, 0, 0)
        };
        if let Some(ndt) = time {
            return Ok(Some(Utc.from_utc_datetime(&ndt)));
        }
    }
    Err(ApiError::InvalidQuery(format!("unparsable date bound: {raw}")))
}

fn matches_search(event: &Event, search: Option<&str>) -> bool {
    let Some(term) = search.filter(|s| !s.is_empty()) else {
        return true;
    };
    let term = term.to_lowercase();
    event.title.to_lowercase().contains(&term)
        || event
            .description
            .as_ref()
            .is_some_and(|d| d.to_lowercase().contains(&term))
        || event
            .categories
            .iter()
            .any(|c| c.title.to_lowercase().contains(&term))
}

fn matches_category(event: &Event, category: Option<&str>) -> bool {
    let Some(category) = category.filter(|c| !c.is_empty() && *c != "all") else {
        return true;
    };
    event.categories.iter().any(|c| c.title == category)
}

/// Events lacking usable geometry never match a specific region filter.
fn matches_region(event: &Event, region: Option<Region>) -> bool {
    let Some(region) = region else {
        return true;
    };
    event
        .primary_geometry()
        .map(|g| classify_region(g.coordinates[0], g.coordinates[1]) == region)
        .unwrap_or(false)
}

fn matches_dates(
    event: &Event,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> bool {
    if from.is_none() && to.is_none() {
        return true;
    }
    let Some(date) = event
        .primary_geometry()
        .and_then(|g| parse_event_date(&g.date))
    else {
        return false;
    };
    from.map_or(true, |f| date >= f) && to.map_or(true, |t| date <= t)
}

fn sort_events(events: &mut [&Event], key: SortKey) {
    match key {
        SortKey::Date => {
            // Unparsable or absent dates sort as epoch zero, i.e. oldest.
            events.sort_by_key(|e| {
                std::cmp::Reverse(
                    e.primary_geometry()
                        .and_then(|g| parse_event_date(&g.date))
                        .map(|d| d.timestamp_millis())
                        .unwrap_or(0),
                )
            });
        }
        SortKey::Title => events.sort_by(|a, b| a.title.cmp(&b.title)),
        SortKey::Type => events.sort_by(|a, b| {
            let ta = a.primary_category().map(|c| c.title.as_str()).unwrap_or("");
            let tb = b.primary_category().map(|c| c.title.as_str()).unwrap_or("");
            ta.cmp(tb)
        }),
    }
}
