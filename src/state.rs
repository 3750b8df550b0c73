use tracing::trace;

use crate::record::UserRecord;
use crate::table::{SortKey, SortOrder, TableViewState};

/// User driven transitions of the users page.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetSearchText(String),
    SetSortKey(SortKey),
    SetSortOrder(SortOrder),
    SetCurrentPage(usize),
    SelectRecord(UserRecord),
    ClearSelection,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewState {
    pub table: TableViewState,
    pub selected: Option<UserRecord>,
}

impl ViewState {
    /// Applies one action. Every action is accepted, nothing is validated here.
    pub fn reduce(self, action: Action) -> ViewState {
        trace!("Reduce {action:?}");
        let ViewState {
            mut table,
            mut selected,
        } = self;

        match action {
            Action::SetSearchText(text) => {
                // A new filter invalidates the old pagination
                table.search_text = text;
                table.current_page = 1;
            }
            Action::SetSortKey(key) => table.sort_key = key,
            Action::SetSortOrder(order) => table.sort_order = order,
            Action::SetCurrentPage(page) => table.current_page = page,
            Action::SelectRecord(record) => selected = Some(record),
            Action::ClearSelection => selected = None,
        }

        ViewState { table, selected }
    }
}
