use std::cmp::Ordering;
use std::fmt;

use crate::record::UserRecord;

pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    CreatedAt,
}

impl SortKey {
    pub fn toggled(self) -> Self {
        match self {
            SortKey::Name => SortKey::CreatedAt,
            SortKey::CreatedAt => SortKey::Name,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Name => write!(f, "Name"),
            SortKey::CreatedAt => write!(f, "Created At"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "Ascending"),
            SortOrder::Desc => write!(f, "Descending"),
        }
    }
}

/// User controlled parameters of the users table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableViewState {
    pub search_text: String,
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
    pub current_page: usize, // 1 based
}

impl Default for TableViewState {
    fn default() -> Self {
        TableViewState {
            search_text: String::new(),
            sort_key: SortKey::default(),
            sort_order: SortOrder::default(),
            current_page: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableView {
    pub page_items: Vec<UserRecord>,
    pub total_pages: usize,
    pub total_matches: usize,
}

/// Filters, sorts and paginates `records` according to `state`.
///
/// An out of range page (including page 0) yields an empty page, the page is
/// never clamped here.
pub fn compute_view(records: &[UserRecord], state: &TableViewState) -> TableView {
    let mut rows = filter_records(records, &state.search_text);
    sort_records(&mut rows, state.sort_key, state.sort_order);

    let total_matches = rows.len();
    let total_pages = total_matches.div_ceil(PAGE_SIZE);
    let page_items = if state.current_page == 0 {
        Vec::new()
    } else {
        let begin = (state.current_page - 1).saturating_mul(PAGE_SIZE);
        rows.into_iter()
            .skip(begin)
            .take(PAGE_SIZE)
            .cloned()
            .collect()
    };

    TableView {
        page_items,
        total_pages,
        total_matches,
    }
}

// Case insensitive literal substring match on name or email
pub fn filter_records<'a>(records: &'a [UserRecord], term: &str) -> Vec<&'a UserRecord> {
    if term.is_empty() {
        return records.iter().collect();
    }
    let term = term.to_lowercase();
    records
        .iter()
        .filter(|r| r.name.to_lowercase().contains(&term) || r.email.to_lowercase().contains(&term))
        .collect()
}

/// Stable sort, equal keys keep their relative order in both directions.
///
/// Missing or unparseable creation dates compare equal to each other and sort
/// before any valid date (i.e. first when ascending, last when descending).
pub fn sort_records(rows: &mut Vec<&UserRecord>, key: SortKey, order: SortOrder) {
    let direct = |ordering: Ordering| match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    };

    match key {
        SortKey::Name => rows.sort_by(|a, b| direct(a.name.cmp(&b.name))),
        SortKey::CreatedAt => {
            // Parse each timestamp once instead of on every comparison
            let mut keyed: Vec<_> = rows.drain(..).map(|r| (r.created(), r)).collect();
            keyed.sort_by(|(a, _), (b, _)| direct(a.cmp(b)));
            rows.extend(keyed.into_iter().map(|(_, r)| r));
        }
    }
}
