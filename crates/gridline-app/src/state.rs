// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    Criterion, Density, DisplayMode, Field, FilterCriteria, PageInfo, PinSide, Record,
    RecordId, RecordPatch, SortDirection, SortSpec, Status, VirtualScroll, Viewport,
    WindowRange, apply, page_info, paginate, toggle_sort, validate_record,
};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_OVERSCAN: usize = 5;
pub const MIN_COLUMN_WIDTH: u16 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PinnedColumns {
    pub left: Vec<Field>,
    pub right: Vec<Field>,
}

impl PinnedColumns {
    pub fn side_of(&self, field: Field) -> Option<PinSide> {
        if self.left.contains(&field) {
            Some(PinSide::Left)
        } else if self.right.contains(&field) {
            Some(PinSide::Right)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridState {
    pub records: Vec<Record>,
    pub visible_columns: Vec<Field>,
    pub pinned: PinnedColumns,
    pub frozen: Vec<Field>,
    pub column_widths: BTreeMap<Field, u16>,
    pub sort: SortSpec,
    pub filters: FilterCriteria,
    pub search: String,
    pub selected: BTreeSet<RecordId>,
    pub page: usize,
    pub page_size: usize,
    pub display: DisplayMode,
    pub scroll: VirtualScroll,
    pub density: Density,
    pub inline_edit: bool,
    pub bulk_actions: bool,
    pub loading: bool,
    pub error: Option<String>,
    pub status_line: Option<String>,
}

impl Default for GridState {
    fn default() -> Self {
        let density = Density::default();
        Self {
            records: Vec::new(),
            visible_columns: Field::ALL.to_vec(),
            pinned: PinnedColumns::default(),
            frozen: Vec::new(),
            column_widths: Field::ALL
                .into_iter()
                .map(|field| (field, field.default_width()))
                .collect(),
            sort: SortSpec::new(),
            filters: FilterCriteria::new(),
            search: String::new(),
            selected: BTreeSet::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            display: DisplayMode::Virtualized,
            scroll: VirtualScroll::new(Viewport::new(density.row_height(), 20, DEFAULT_OVERSCAN)),
            density,
            inline_edit: false,
            bulk_actions: true,
            loading: false,
            error: None,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridCommand {
    SetRecords(Vec<Record>),
    SetLoading(bool),
    SetError(Option<String>),
    SetSearch(String),
    SetSortSpec(SortSpec),
    ToggleSort(Field),
    ClearSort,
    SetFilter(Field, Criterion),
    ClearFilter(Field),
    ReplaceFilters(FilterCriteria),
    ClearFilters,
    ToggleRowSelection(RecordId),
    SelectAllInView,
    ClearSelection,
    SetPage(usize),
    NextPage,
    PrevPage,
    SetPageSize(usize),
    ToggleColumnVisibility(Field),
    ShowAllColumns,
    ReorderColumns(Vec<Field>),
    PinColumn(Field, Option<PinSide>),
    FreezeColumn(Field),
    ResizeColumn(Field, u16),
    SetDensity(Density),
    ToggleInlineEdit,
    ToggleBulkActions,
    ToggleVirtualization,
    ScrollTo(i64),
    ScrollBy(i64),
    ScrollToIndex(usize),
    /// Scrolls the minimum distance that brings the row into the viewport.
    RevealIndex(usize),
    ResizeViewport(u32),
    DeleteRow(RecordId),
    UpdateRow(RecordId, RecordPatch),
    BulkDelete(Vec<RecordId>),
    BulkUpdate(Vec<RecordId>, RecordPatch),
    BulkSetStatus(Status),
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    RecordsLoaded(usize),
    LoadingChanged(bool),
    ErrorChanged(Option<String>),
    SearchChanged(String),
    FiltersChanged(usize),
    SortChanged(SortSpec),
    SortUnavailable(Field),
    SelectionChanged(usize),
    PageChanged(PageInfo),
    ColumnsChanged,
    KeepOneColumnVisible,
    ColumnResized(Field, u16),
    DensityChanged(Density),
    InlineEditChanged(bool),
    BulkActionsChanged(bool),
    DisplayModeChanged(DisplayMode),
    Scrolled(WindowRange),
    RowsDeleted(usize),
    RowsUpdated(usize),
    RowNotFound(RecordId),
    EditRejected(String),
    NothingSelected,
    StatusUpdated(String),
    StatusCleared,
}

/// The rows a renderer should draw for the active display mode.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleRows<'a> {
    pub rows: Vec<&'a Record>,
    /// Position of `rows[0]` within the full ordered view.
    pub first_index: usize,
    pub total: usize,
    pub window: Option<WindowRange>,
    pub page: Option<PageInfo>,
}

impl GridState {
    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    pub fn view(&self) -> Vec<&Record> {
        apply(&self.records, &self.filters, &self.search, &self.sort)
    }

    pub fn visible_rows(&self) -> VisibleRows<'_> {
        let view = self.view();
        let total = view.len();
        match self.display {
            DisplayMode::Virtualized => {
                let window = self.scroll.window(total);
                VisibleRows {
                    rows: window.slice(&view).to_vec(),
                    first_index: window.start_index,
                    total,
                    window: Some(window),
                    page: None,
                }
            }
            DisplayMode::Paged => {
                let (rows, info) = paginate(&view, self.page, self.page_size);
                VisibleRows {
                    rows: rows.to_vec(),
                    first_index: info.offset(),
                    total,
                    window: None,
                    page: Some(info),
                }
            }
        }
    }

    pub fn page_info(&self) -> PageInfo {
        page_info(self.view().len(), self.page, self.page_size)
    }

    pub fn record(&self, id: RecordId) -> Option<&Record> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn sort_direction_for(&self, field: Field) -> Option<SortDirection> {
        self.sort
            .iter()
            .find(|key| key.field == field)
            .map(|key| key.direction)
    }

    pub fn column_width(&self, field: Field) -> u16 {
        self.column_widths
            .get(&field)
            .copied()
            .unwrap_or_else(|| field.default_width())
    }

    /// Visible columns with left pins first, then frozen, then the rest, then right pins.
    pub fn ordered_columns(&self) -> Vec<Field> {
        let visible = |field: &&Field| self.visible_columns.contains(field);
        let mut ordered: Vec<Field> = self.pinned.left.iter().filter(visible).copied().collect();
        ordered.extend(
            self.frozen
                .iter()
                .filter(visible)
                .filter(|field| self.pinned.side_of(**field).is_none())
                .copied(),
        );
        ordered.extend(self.visible_columns.iter().copied().filter(|field| {
            self.pinned.side_of(*field).is_none() && !self.frozen.contains(field)
        }));
        ordered.extend(self.pinned.right.iter().filter(visible).copied());
        ordered
    }

    /// Columns that stay in place during horizontal scrolling.
    pub fn is_fixed_column(&self, field: Field) -> bool {
        self.pinned.side_of(field).is_some() || self.frozen.contains(&field)
    }

    pub fn dispatch(&mut self, command: GridCommand) -> Vec<GridEvent> {
        match command {
            GridCommand::SetRecords(records) => {
                self.records = records;
                let known: BTreeSet<RecordId> = self.records.iter().map(|r| r.id).collect();
                self.selected.retain(|id| known.contains(id));
                self.loading = false;
                self.error = None;
                self.clamp_to_view();
                vec![GridEvent::RecordsLoaded(self.records.len())]
            }
            GridCommand::SetLoading(loading) => {
                self.loading = loading;
                vec![GridEvent::LoadingChanged(loading)]
            }
            GridCommand::SetError(error) => {
                self.error = error.clone();
                self.loading = false;
                vec![GridEvent::ErrorChanged(error)]
            }
            GridCommand::SetSearch(search) => {
                self.search = search;
                self.page = 1;
                self.clamp_to_view();
                let label = if self.search.is_empty() {
                    "search cleared".to_owned()
                } else {
                    format!("search {:?}", self.search)
                };
                vec![
                    GridEvent::SearchChanged(self.search.clone()),
                    self.set_status(&label),
                ]
            }
            GridCommand::SetSortSpec(sort) => {
                self.sort = sort;
                self.sort_changed()
            }
            GridCommand::ToggleSort(field) => {
                if !field.is_sortable() {
                    return vec![
                        GridEvent::SortUnavailable(field),
                        self.set_status(&format!("{} is not sortable", field.label())),
                    ];
                }
                self.sort = toggle_sort(self.sort.first().copied(), field)
                    .into_iter()
                    .collect();
                self.sort_changed()
            }
            GridCommand::ClearSort => {
                self.sort.clear();
                self.sort_changed()
            }
            GridCommand::SetFilter(field, criterion) => {
                self.filters.set(field, criterion);
                self.filters_changed()
            }
            GridCommand::ClearFilter(field) => {
                self.filters.remove(field);
                self.filters_changed()
            }
            GridCommand::ReplaceFilters(filters) => {
                self.filters = filters;
                self.filters_changed()
            }
            GridCommand::ClearFilters => {
                self.filters.clear();
                self.filters_changed()
            }
            GridCommand::ToggleRowSelection(id) => {
                if self.record(id).is_none() {
                    return vec![GridEvent::RowNotFound(id)];
                }
                if !self.selected.remove(&id) {
                    self.selected.insert(id);
                }
                vec![GridEvent::SelectionChanged(self.selected.len())]
            }
            GridCommand::SelectAllInView => {
                let ids: Vec<RecordId> = self.view().iter().map(|record| record.id).collect();
                if !ids.is_empty() && ids.iter().all(|id| self.selected.contains(id)) {
                    for id in &ids {
                        self.selected.remove(id);
                    }
                } else {
                    self.selected.extend(ids);
                }
                vec![GridEvent::SelectionChanged(self.selected.len())]
            }
            GridCommand::ClearSelection => {
                self.selected.clear();
                vec![GridEvent::SelectionChanged(0)]
            }
            GridCommand::SetPage(page) => {
                self.page = page;
                self.page_changed()
            }
            GridCommand::NextPage => {
                self.page = self.page.saturating_add(1);
                self.page_changed()
            }
            GridCommand::PrevPage => {
                self.page = self.page.saturating_sub(1);
                self.page_changed()
            }
            GridCommand::SetPageSize(size) => {
                self.page_size = size.max(1);
                self.page = 1;
                self.page_changed()
            }
            GridCommand::ToggleColumnVisibility(field) => {
                if let Some(index) = self.visible_columns.iter().position(|f| *f == field) {
                    if self.visible_columns.len() <= 1 {
                        return vec![
                            GridEvent::KeepOneColumnVisible,
                            self.set_status("keep one column visible"),
                        ];
                    }
                    self.visible_columns.remove(index);
                    vec![
                        GridEvent::ColumnsChanged,
                        self.set_status(&format!("column hidden: {}", field.label())),
                    ]
                } else {
                    self.visible_columns.push(field);
                    vec![
                        GridEvent::ColumnsChanged,
                        self.set_status(&format!("column shown: {}", field.label())),
                    ]
                }
            }
            GridCommand::ShowAllColumns => {
                for field in Field::ALL {
                    if !self.visible_columns.contains(&field) {
                        self.visible_columns.push(field);
                    }
                }
                vec![GridEvent::ColumnsChanged, self.set_status("all columns shown")]
            }
            GridCommand::ReorderColumns(order) => {
                let mut deduped = Vec::with_capacity(order.len());
                for field in order {
                    if !deduped.contains(&field) {
                        deduped.push(field);
                    }
                }
                if deduped.is_empty() {
                    return vec![GridEvent::KeepOneColumnVisible];
                }
                self.visible_columns = deduped;
                vec![GridEvent::ColumnsChanged]
            }
            GridCommand::PinColumn(field, side) => {
                self.pinned.left.retain(|f| *f != field);
                self.pinned.right.retain(|f| *f != field);
                let label = match side {
                    Some(PinSide::Left) => {
                        self.pinned.left.push(field);
                        format!("{} pinned left", field.label())
                    }
                    Some(PinSide::Right) => {
                        self.pinned.right.push(field);
                        format!("{} pinned right", field.label())
                    }
                    None => format!("{} unpinned", field.label()),
                };
                vec![GridEvent::ColumnsChanged, self.set_status(&label)]
            }
            GridCommand::FreezeColumn(field) => {
                let label = if let Some(index) = self.frozen.iter().position(|f| *f == field) {
                    self.frozen.remove(index);
                    format!("{} unfrozen", field.label())
                } else {
                    self.frozen.push(field);
                    format!("{} frozen", field.label())
                };
                vec![GridEvent::ColumnsChanged, self.set_status(&label)]
            }
            GridCommand::ResizeColumn(field, width) => {
                let width = width.max(MIN_COLUMN_WIDTH);
                self.column_widths.insert(field, width);
                vec![GridEvent::ColumnResized(field, width)]
            }
            GridCommand::SetDensity(density) => {
                self.density = density;
                self.scroll.set_item_extent(density.row_height());
                vec![
                    GridEvent::DensityChanged(density),
                    self.set_status(&format!("density {}", density.as_str())),
                ]
            }
            GridCommand::ToggleInlineEdit => {
                self.inline_edit = !self.inline_edit;
                let label = if self.inline_edit {
                    "inline edit on"
                } else {
                    "inline edit off"
                };
                vec![
                    GridEvent::InlineEditChanged(self.inline_edit),
                    self.set_status(label),
                ]
            }
            GridCommand::ToggleBulkActions => {
                self.bulk_actions = !self.bulk_actions;
                if !self.bulk_actions {
                    self.selected.clear();
                }
                let label = if self.bulk_actions {
                    "bulk actions on"
                } else {
                    "bulk actions off"
                };
                vec![
                    GridEvent::BulkActionsChanged(self.bulk_actions),
                    self.set_status(label),
                ]
            }
            GridCommand::ToggleVirtualization => {
                self.display = match self.display {
                    DisplayMode::Virtualized => DisplayMode::Paged,
                    DisplayMode::Paged => DisplayMode::Virtualized,
                };
                self.clamp_to_view();
                let label = match self.display {
                    DisplayMode::Virtualized => "virtualization on",
                    DisplayMode::Paged => "pagination on",
                };
                vec![
                    GridEvent::DisplayModeChanged(self.display),
                    self.set_status(label),
                ]
            }
            GridCommand::ScrollTo(offset) => {
                self.scroll.handle_scroll(offset);
                self.scrolled()
            }
            GridCommand::ScrollBy(delta) => {
                self.scroll.scroll_by(delta);
                self.scrolled()
            }
            GridCommand::ScrollToIndex(index) => {
                self.scroll.scroll_to_index(index);
                self.scrolled()
            }
            GridCommand::RevealIndex(index) => {
                self.scroll.ensure_visible(index);
                self.scrolled()
            }
            GridCommand::ResizeViewport(extent) => {
                self.scroll.resize(extent);
                self.scroll.clamp_to(self.view().len());
                self.scrolled()
            }
            GridCommand::DeleteRow(id) => {
                let before = self.records.len();
                self.records.retain(|record| record.id != id);
                if self.records.len() == before {
                    return vec![GridEvent::RowNotFound(id)];
                }
                self.selected.remove(&id);
                self.clamp_to_view();
                vec![
                    GridEvent::RowsDeleted(1),
                    self.set_status(&format!("deleted row {id}")),
                ]
            }
            GridCommand::UpdateRow(id, patch) => self.update_rows(&[id], &patch),
            GridCommand::BulkDelete(ids) => {
                let doomed: BTreeSet<RecordId> = ids.into_iter().collect();
                let before = self.records.len();
                self.records.retain(|record| !doomed.contains(&record.id));
                let removed = before - self.records.len();
                self.selected.clear();
                self.clamp_to_view();
                vec![
                    GridEvent::RowsDeleted(removed),
                    GridEvent::SelectionChanged(0),
                    self.set_status(&format!("deleted {removed} rows")),
                ]
            }
            GridCommand::BulkUpdate(ids, patch) => self.update_rows(&ids, &patch),
            GridCommand::BulkSetStatus(status) => {
                if self.selected.is_empty() {
                    return vec![GridEvent::NothingSelected, self.set_status("select rows first")];
                }
                let ids: Vec<RecordId> = self.selected.iter().copied().collect();
                self.update_rows(&ids, &RecordPatch::status(status))
            }
            GridCommand::SetStatus(message) => vec![self.set_status(&message)],
            GridCommand::ClearStatus => {
                self.status_line = None;
                vec![GridEvent::StatusCleared]
            }
        }
    }

    // All-or-nothing: one invalid result rejects the whole batch.
    fn update_rows(&mut self, ids: &[RecordId], patch: &RecordPatch) -> Vec<GridEvent> {
        let mut updates = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(index) = self.records.iter().position(|record| record.id == *id) else {
                return vec![GridEvent::RowNotFound(*id)];
            };
            let updated = patch.apply_to(&self.records[index]);
            if let Err(error) = validate_record(&updated) {
                let message = format!("row {id}: {error:#}");
                return vec![
                    GridEvent::EditRejected(message.clone()),
                    self.set_status(&message),
                ];
            }
            updates.push((index, updated));
        }

        let count = updates.len();
        for (index, updated) in updates {
            self.records[index] = updated;
        }
        self.clamp_to_view();
        let label = if count == 1 {
            "row updated".to_owned()
        } else {
            format!("{count} rows updated")
        };
        vec![GridEvent::RowsUpdated(count), self.set_status(&label)]
    }

    fn sort_changed(&mut self) -> Vec<GridEvent> {
        let label = match self.sort.as_slice() {
            [] => "sort cleared".to_owned(),
            keys => {
                let parts: Vec<String> = keys
                    .iter()
                    .map(|key| format!("{} {}", key.field.label(), key.direction.as_str()))
                    .collect();
                format!("sort {}", parts.join(", "))
            }
        };
        vec![
            GridEvent::SortChanged(self.sort.clone()),
            self.set_status(&label),
        ]
    }

    fn filters_changed(&mut self) -> Vec<GridEvent> {
        self.page = 1;
        self.clamp_to_view();
        let count = self.filters.len();
        let label = if count == 0 {
            "filters cleared".to_owned()
        } else {
            format!("{count} filters active")
        };
        vec![GridEvent::FiltersChanged(count), self.set_status(&label)]
    }

    fn page_changed(&mut self) -> Vec<GridEvent> {
        let info = self.page_info();
        self.page = info.page;
        vec![GridEvent::PageChanged(info)]
    }

    fn scrolled(&mut self) -> Vec<GridEvent> {
        let window = self.scroll.window(self.view().len());
        vec![GridEvent::Scrolled(window)]
    }

    fn clamp_to_view(&mut self) {
        let total = self.view().len();
        self.page = page_info(total, self.page, self.page_size).page;
        self.scroll.clamp_to(total);
    }

    fn set_status(&mut self, message: &str) -> GridEvent {
        self.status_line = Some(message.to_owned());
        GridEvent::StatusUpdated(message.to_owned())
    }
}
