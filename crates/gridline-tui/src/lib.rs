// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use gridline_app::{
    Criterion, Density, DisplayMode, Field, FieldKind, GridCommand, GridEvent, GridState,
    NumericRange, PinSide, Record, RecordId, RecordPatch, RendererTable, SortDirection, Status,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

const SORT_ASC: &str = "▲";
const SORT_DESC: &str = "▼";
const FILTER_MARK: &str = "▽";
const PIN_LEFT_MARK: &str = "◧";
const PIN_RIGHT_MARK: &str = "◨";
const FROZEN_MARK: &str = "❄";
const CHECKED: &str = "[x]";
const UNCHECKED: &str = "[ ]";
const PARTIAL: &str = "[-]";
const CURSOR_MARK: &str = "▏";
const SELECT_COLUMN_WIDTH: u16 = 3;
const RESIZE_STEP: u16 = 2;
// Borders plus the header row.
const TABLE_CHROME_ROWS: u16 = 3;
const STATUS_ROWS: u16 = 3;
const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);

pub trait GridRuntime {
    fn load_records(&mut self, force: bool) -> Result<Vec<Record>>;
    fn source_label(&self) -> String {
        "records".to_owned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, PartialEq, Default)]
enum InputMode {
    #[default]
    Grid,
    Search(String),
    Filter {
        field: Field,
        buffer: String,
    },
    Edit {
        record: RecordId,
        field: Field,
        buffer: String,
    },
    ConfirmDelete(Vec<RecordId>),
}

#[derive(Debug, Clone, PartialEq, Default)]
struct ViewData {
    /// Index into the full ordered view.
    cursor_row: usize,
    /// Index into `GridState::ordered_columns`.
    cursor_col: usize,
    /// First scrollable column drawn after the fixed ones.
    column_offset: usize,
    /// Inner table width; 0 until the terminal has been measured.
    table_width: u16,
    input: InputMode,
    help_visible: bool,
    status_token: u64,
    source_label: String,
}

/// What the key handler needs to know about the cell under the cursor.
#[derive(Debug, Clone, Copy, PartialEq)]
struct KeyContext {
    record: Option<RecordId>,
    field: Option<Field>,
    pin: Option<PinSide>,
    width: u16,
    density: Density,
}

#[derive(Debug, Clone, PartialEq)]
enum TuiCommand {
    Grid(GridCommand),
    Ui(UiCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UiCommand {
    MoveRow(isize),
    MoveColumn(isize),
    HalfPageDown,
    HalfPageUp,
    FullPageDown,
    FullPageUp,
    JumpFirstRow,
    JumpLastRow,
    JumpFirstColumn,
    JumpLastColumn,
    OpenSearch,
    OpenFilter(Field),
    OpenEdit(RecordId, Field),
    ConfirmDelete(RecordId),
    ConfirmBulkDelete,
    Reload,
    ToggleHelp,
    Dismiss,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptKey {
    Submit,
    Cancel,
    Changed,
    Ignored,
}

pub fn run_app<R: GridRuntime>(state: &mut GridState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let renderers = RendererTable::standard();
    let mut view_data = ViewData {
        source_label: runtime.source_label(),
        ..ViewData::default()
    };
    let (internal_tx, internal_rx) = mpsc::channel();

    load_records(state, runtime, &mut view_data, &internal_tx, false);

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_rx);

        match terminal.size() {
            Ok(size) => fit_to_terminal(state, &mut view_data, size.width, size.height),
            Err(error) => {
                result = Err(error).context("read terminal size");
                break;
            }
        }

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data, &renderers)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn fit_to_terminal(state: &mut GridState, view_data: &mut ViewData, width: u16, height: u16) {
    let body_rows = height.saturating_sub(STATUS_ROWS + TABLE_CHROME_ROWS).max(1);
    if state.scroll.viewport().viewport_extent != u32::from(body_rows) {
        debug!(body_rows, "viewport resized");
        state.dispatch(GridCommand::ResizeViewport(u32::from(body_rows)));
        sync_cursor(state, view_data);
    }
    let inner_width = width.saturating_sub(2);
    if view_data.table_width != inner_width {
        view_data.table_width = inner_width;
        adjust_column_offset(state, view_data);
    }
}

fn process_internal_events(
    state: &mut GridState,
    view_data: &mut ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(GridCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn dispatch(
    state: &mut GridState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: GridCommand,
) -> Vec<GridEvent> {
    let events = state.dispatch(command);
    if events
        .iter()
        .any(|event| matches!(event, GridEvent::StatusUpdated(_)))
    {
        view_data.status_token = view_data.status_token.saturating_add(1);
        schedule_status_clear(internal_tx, view_data.status_token);
    }
    sync_cursor(state, view_data);
    events
}

fn emit_status(
    state: &mut GridState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    dispatch(
        state,
        view_data,
        internal_tx,
        GridCommand::SetStatus(message.into()),
    );
}

fn load_records<R: GridRuntime>(
    state: &mut GridState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    force: bool,
) {
    state.dispatch(GridCommand::SetLoading(true));
    match runtime.load_records(force) {
        Ok(records) => {
            let count = records.len();
            dispatch(state, view_data, internal_tx, GridCommand::SetRecords(records));
            emit_status(state, view_data, internal_tx, format!("loaded {count} rows"));
        }
        Err(error) => {
            warn!(error = %format!("{error:#}"), "record load failed");
            dispatch(
                state,
                view_data,
                internal_tx,
                GridCommand::SetError(Some(format!("{error:#}"))),
            );
        }
    }
}

/// Returns `true` when the app should exit.
fn handle_key_event<R: GridRuntime>(
    state: &mut GridState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if view_data.help_visible {
        if matches!(
            key.code,
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')
        ) {
            view_data.help_visible = false;
        }
        return false;
    }

    match std::mem::take(&mut view_data.input) {
        InputMode::Grid => {}
        InputMode::Search(mut buffer) => {
            match apply_prompt_key(&mut buffer, key) {
                PromptKey::Submit => {}
                PromptKey::Cancel => {
                    dispatch(
                        state,
                        view_data,
                        internal_tx,
                        GridCommand::SetSearch(String::new()),
                    );
                }
                PromptKey::Changed => {
                    dispatch(
                        state,
                        view_data,
                        internal_tx,
                        GridCommand::SetSearch(buffer.clone()),
                    );
                    view_data.input = InputMode::Search(buffer);
                }
                PromptKey::Ignored => view_data.input = InputMode::Search(buffer),
            }
            return false;
        }
        InputMode::Filter { field, mut buffer } => {
            match apply_prompt_key(&mut buffer, key) {
                PromptKey::Submit => {
                    let command = match criterion_for_input(field, &buffer) {
                        Some(criterion) => GridCommand::SetFilter(field, criterion),
                        None => GridCommand::ClearFilter(field),
                    };
                    dispatch(state, view_data, internal_tx, command);
                }
                PromptKey::Cancel => emit_status(state, view_data, internal_tx, "filter cancelled"),
                PromptKey::Changed | PromptKey::Ignored => {
                    view_data.input = InputMode::Filter { field, buffer };
                }
            }
            return false;
        }
        InputMode::Edit {
            record,
            field,
            mut buffer,
        } => {
            match apply_prompt_key(&mut buffer, key) {
                PromptKey::Submit => match RecordPatch::parse_field(field, &buffer) {
                    Ok(patch) => {
                        let events = dispatch(
                            state,
                            view_data,
                            internal_tx,
                            GridCommand::UpdateRow(record, patch),
                        );
                        // Rejected edits stay open so the value can be fixed.
                        if events
                            .iter()
                            .any(|event| matches!(event, GridEvent::EditRejected(_)))
                        {
                            view_data.input = InputMode::Edit {
                                record,
                                field,
                                buffer,
                            };
                        }
                    }
                    Err(error) => {
                        emit_status(state, view_data, internal_tx, format!("{error:#}"));
                        view_data.input = InputMode::Edit {
                            record,
                            field,
                            buffer,
                        };
                    }
                },
                PromptKey::Cancel => emit_status(state, view_data, internal_tx, "edit cancelled"),
                PromptKey::Changed | PromptKey::Ignored => {
                    view_data.input = InputMode::Edit {
                        record,
                        field,
                        buffer,
                    };
                }
            }
            return false;
        }
        InputMode::ConfirmDelete(ids) => {
            if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
                let command = if ids.len() == 1 {
                    GridCommand::DeleteRow(ids[0])
                } else {
                    GridCommand::BulkDelete(ids)
                };
                dispatch(state, view_data, internal_tx, command);
            } else {
                emit_status(state, view_data, internal_tx, "delete cancelled");
            }
            return false;
        }
    }

    let Some(command) = command_for_key(key, key_context(state, view_data)) else {
        return false;
    };
    match command {
        TuiCommand::Grid(command) => {
            if requires_bulk_actions(&command) && !state.bulk_actions {
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    "bulk actions off -- press b to enable",
                );
                return false;
            }
            dispatch(state, view_data, internal_tx, command);
            false
        }
        TuiCommand::Ui(command) => {
            apply_ui_command(state, runtime, view_data, internal_tx, command)
        }
    }
}

fn apply_ui_command<R: GridRuntime>(
    state: &mut GridState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: UiCommand,
) -> bool {
    let rows_per_screen = state.scroll.viewport().full_count() as isize;
    let cursor = view_data.cursor_row as isize;
    match command {
        UiCommand::MoveRow(delta) => move_cursor_to(state, view_data, cursor + delta),
        UiCommand::HalfPageDown => {
            move_cursor_to(state, view_data, cursor + (rows_per_screen / 2).max(1));
        }
        UiCommand::HalfPageUp => {
            move_cursor_to(state, view_data, cursor - (rows_per_screen / 2).max(1));
        }
        UiCommand::FullPageDown => move_cursor_to(state, view_data, cursor + rows_per_screen),
        UiCommand::FullPageUp => move_cursor_to(state, view_data, cursor - rows_per_screen),
        UiCommand::JumpFirstRow => move_cursor_to(state, view_data, 0),
        UiCommand::JumpLastRow => move_cursor_to(state, view_data, isize::MAX),
        UiCommand::MoveColumn(delta) => {
            let last = state.ordered_columns().len().saturating_sub(1) as isize;
            view_data.cursor_col = (view_data.cursor_col as isize + delta).clamp(0, last) as usize;
            adjust_column_offset(state, view_data);
        }
        UiCommand::JumpFirstColumn => {
            view_data.cursor_col = 0;
            adjust_column_offset(state, view_data);
        }
        UiCommand::JumpLastColumn => {
            view_data.cursor_col = state.ordered_columns().len().saturating_sub(1);
            adjust_column_offset(state, view_data);
        }
        UiCommand::OpenSearch => {
            view_data.input = InputMode::Search(state.search.clone());
        }
        UiCommand::OpenFilter(field) => {
            let buffer = state
                .filters
                .get(field)
                .map(filter_prefill)
                .unwrap_or_default();
            view_data.input = InputMode::Filter { field, buffer };
        }
        UiCommand::OpenEdit(record, field) => {
            if !state.inline_edit {
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    "inline edit off -- press i to enable",
                );
            } else if !field.is_editable() {
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    format!("{} is not editable", field.label()),
                );
            } else if let Some(current) = state.record(record) {
                let buffer = current.value(field).to_string();
                view_data.input = InputMode::Edit {
                    record,
                    field,
                    buffer,
                };
            }
        }
        UiCommand::ConfirmDelete(record) => {
            view_data.input = InputMode::ConfirmDelete(vec![record]);
        }
        UiCommand::ConfirmBulkDelete => {
            if !state.bulk_actions {
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    "bulk actions off -- press b to enable",
                );
            } else if state.selected.is_empty() {
                emit_status(state, view_data, internal_tx, "select rows first");
            } else {
                view_data.input = InputMode::ConfirmDelete(state.selected.iter().copied().collect());
            }
        }
        UiCommand::Reload => load_records(state, runtime, view_data, internal_tx, true),
        UiCommand::ToggleHelp => view_data.help_visible = true,
        UiCommand::Dismiss => {
            dispatch(state, view_data, internal_tx, GridCommand::ClearStatus);
        }
        UiCommand::Quit => return true,
    }
    false
}

fn requires_bulk_actions(command: &GridCommand) -> bool {
    matches!(
        command,
        GridCommand::ToggleRowSelection(_)
            | GridCommand::SelectAllInView
            | GridCommand::BulkDelete(_)
            | GridCommand::BulkUpdate(..)
            | GridCommand::BulkSetStatus(_)
    )
}

fn command_for_key(key: KeyEvent, context: KeyContext) -> Option<TuiCommand> {
    use TuiCommand::{Grid, Ui};

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') => Some(Ui(UiCommand::Quit)),
            KeyCode::Char('d') => Some(Ui(UiCommand::HalfPageDown)),
            KeyCode::Char('u') => Some(Ui(UiCommand::HalfPageUp)),
            KeyCode::Char('r') => Some(Ui(UiCommand::Reload)),
            _ => None,
        };
    }

    let command = match key.code {
        KeyCode::Char('q') => Ui(UiCommand::Quit),
        KeyCode::Char('j') | KeyCode::Down => Ui(UiCommand::MoveRow(1)),
        KeyCode::Char('k') | KeyCode::Up => Ui(UiCommand::MoveRow(-1)),
        KeyCode::Char('h') | KeyCode::Left => Ui(UiCommand::MoveColumn(-1)),
        KeyCode::Char('l') | KeyCode::Right => Ui(UiCommand::MoveColumn(1)),
        KeyCode::PageDown => Ui(UiCommand::FullPageDown),
        KeyCode::PageUp => Ui(UiCommand::FullPageUp),
        KeyCode::Char('g') | KeyCode::Home => Ui(UiCommand::JumpFirstRow),
        KeyCode::Char('G') | KeyCode::End => Ui(UiCommand::JumpLastRow),
        KeyCode::Char('^') => Ui(UiCommand::JumpFirstColumn),
        KeyCode::Char('$') => Ui(UiCommand::JumpLastColumn),
        KeyCode::Char(']') => Grid(GridCommand::NextPage),
        KeyCode::Char('[') => Grid(GridCommand::PrevPage),
        KeyCode::Char('s') => Grid(GridCommand::ToggleSort(context.field?)),
        KeyCode::Char('S') => Grid(GridCommand::ClearSort),
        KeyCode::Char('/') => Ui(UiCommand::OpenSearch),
        KeyCode::Char('f') => Ui(UiCommand::OpenFilter(context.field?)),
        KeyCode::Char('x') => Grid(GridCommand::ClearFilter(context.field?)),
        KeyCode::Char('F') => Grid(GridCommand::ClearFilters),
        KeyCode::Char(' ') => Grid(GridCommand::ToggleRowSelection(context.record?)),
        KeyCode::Char('a') => Grid(GridCommand::SelectAllInView),
        KeyCode::Char('A') => Grid(GridCommand::ClearSelection),
        KeyCode::Char('1') => Grid(GridCommand::BulkSetStatus(Status::Active)),
        KeyCode::Char('0') => Grid(GridCommand::BulkSetStatus(Status::Inactive)),
        KeyCode::Char('e') | KeyCode::Enter => {
            Ui(UiCommand::OpenEdit(context.record?, context.field?))
        }
        KeyCode::Char('d') => Ui(UiCommand::ConfirmDelete(context.record?)),
        KeyCode::Char('D') => Ui(UiCommand::ConfirmBulkDelete),
        KeyCode::Char('c') => Grid(GridCommand::ToggleColumnVisibility(context.field?)),
        KeyCode::Char('C') => Grid(GridCommand::ShowAllColumns),
        KeyCode::Char('p') => {
            let side = (context.pin != Some(PinSide::Left)).then_some(PinSide::Left);
            Grid(GridCommand::PinColumn(context.field?, side))
        }
        KeyCode::Char('P') => {
            let side = (context.pin != Some(PinSide::Right)).then_some(PinSide::Right);
            Grid(GridCommand::PinColumn(context.field?, side))
        }
        KeyCode::Char('o') => Grid(GridCommand::FreezeColumn(context.field?)),
        KeyCode::Char('+') | KeyCode::Char('>') => Grid(GridCommand::ResizeColumn(
            context.field?,
            context.width.saturating_add(RESIZE_STEP),
        )),
        KeyCode::Char('-') | KeyCode::Char('<') => Grid(GridCommand::ResizeColumn(
            context.field?,
            context.width.saturating_sub(RESIZE_STEP),
        )),
        KeyCode::Char('z') => Grid(GridCommand::SetDensity(context.density.next())),
        KeyCode::Char('i') => Grid(GridCommand::ToggleInlineEdit),
        KeyCode::Char('b') => Grid(GridCommand::ToggleBulkActions),
        KeyCode::Char('v') => Grid(GridCommand::ToggleVirtualization),
        KeyCode::Char('r') => Ui(UiCommand::Reload),
        KeyCode::Char('?') => Ui(UiCommand::ToggleHelp),
        KeyCode::Esc => Ui(UiCommand::Dismiss),
        _ => return None,
    };
    Some(command)
}

fn apply_prompt_key(buffer: &mut String, key: KeyEvent) -> PromptKey {
    match key.code {
        KeyCode::Enter => PromptKey::Submit,
        KeyCode::Esc => PromptKey::Cancel,
        KeyCode::Backspace => {
            if buffer.pop().is_some() {
                PromptKey::Changed
            } else {
                PromptKey::Ignored
            }
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            buffer.push(ch);
            PromptKey::Changed
        }
        _ => PromptKey::Ignored,
    }
}

/// Maps filter prompt text to a criterion; `None` clears the column's filter.
///
/// Numeric columns take `min..max` with either side optional, or a single
/// exact value. Select columns snap to a known option ignoring case.
fn criterion_for_input(field: Field, raw: &str) -> Option<Criterion> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let criterion = match field.kind() {
        FieldKind::Number => {
            let (min, max) = raw.split_once("..").unwrap_or((raw, raw));
            Criterion::Range(NumericRange::parse(min, max))
        }
        FieldKind::Select => {
            let canonical = field
                .options()
                .iter()
                .find(|option| option.eq_ignore_ascii_case(raw))
                .map_or_else(|| raw.to_owned(), |option| (*option).to_owned());
            Criterion::Equals(canonical)
        }
        FieldKind::Text | FieldKind::Date => Criterion::Contains(raw.to_owned()),
    };
    (!criterion.is_empty()).then_some(criterion)
}

fn filter_prefill(criterion: &Criterion) -> String {
    match criterion {
        Criterion::Contains(value) | Criterion::Equals(value) => value.clone(),
        Criterion::Range(range) => {
            let bound = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();
            format!("{}..{}", bound(range.min), bound(range.max))
        }
    }
}

fn key_context(state: &GridState, view_data: &ViewData) -> KeyContext {
    let field = current_field(state, view_data);
    KeyContext {
        record: current_record(state, view_data),
        field,
        pin: field.and_then(|field| state.pinned.side_of(field)),
        width: field.map_or(0, |field| state.column_width(field)),
        density: state.density,
    }
}

fn current_record(state: &GridState, view_data: &ViewData) -> Option<RecordId> {
    state
        .view()
        .get(view_data.cursor_row)
        .map(|record| record.id)
}

fn current_field(state: &GridState, view_data: &ViewData) -> Option<Field> {
    state.ordered_columns().get(view_data.cursor_col).copied()
}

fn move_cursor_to(state: &mut GridState, view_data: &mut ViewData, target: isize) {
    let total = state.view().len();
    if total == 0 {
        view_data.cursor_row = 0;
        return;
    }
    let index = target.clamp(0, total as isize - 1) as usize;
    view_data.cursor_row = index;
    follow_cursor(state, index);
}

fn follow_cursor(state: &mut GridState, index: usize) {
    match state.display {
        DisplayMode::Virtualized => {
            state.dispatch(GridCommand::RevealIndex(index));
        }
        DisplayMode::Paged => {
            let page = index / state.page_size.max(1) + 1;
            if page != state.page {
                state.dispatch(GridCommand::SetPage(page));
            }
        }
    }
}

/// Keeps both cursors inside the current view after any state change.
fn sync_cursor(state: &mut GridState, view_data: &mut ViewData) {
    let total = state.view().len();
    view_data.cursor_row = view_data.cursor_row.min(total.saturating_sub(1));
    if total > 0 {
        match state.display {
            DisplayMode::Paged => {
                let info = state.page_info();
                let start = info.offset();
                let end = (start + info.page_size).min(total);
                if !(start..end).contains(&view_data.cursor_row) {
                    view_data.cursor_row = start;
                }
            }
            DisplayMode::Virtualized => follow_cursor(state, view_data.cursor_row),
        }
    }
    let columns = state.ordered_columns().len();
    view_data.cursor_col = view_data.cursor_col.min(columns.saturating_sub(1));
    adjust_column_offset(state, view_data);
}

fn scrollable_columns(state: &GridState) -> Vec<Field> {
    state
        .ordered_columns()
        .into_iter()
        .filter(|field| !state.is_fixed_column(*field))
        .collect()
}

/// Columns drawn in `width` cells: fixed columns always, then as many
/// scrollable columns from `offset` as fit (at least one).
fn layout_columns(state: &GridState, width: u16, offset: usize) -> Vec<Field> {
    let spacing = u32::from(state.density.column_spacing());
    let cost = |field: Field| u32::from(state.column_width(field)) + spacing;

    let mut left = Vec::new();
    let mut middle = Vec::new();
    let mut right = Vec::new();
    for field in state.ordered_columns() {
        match state.pinned.side_of(field) {
            Some(PinSide::Right) => right.push(field),
            Some(PinSide::Left) => left.push(field),
            None if state.frozen.contains(&field) => left.push(field),
            None => middle.push(field),
        }
    }

    let budget = if width == 0 {
        u32::MAX
    } else {
        u32::from(width)
    };
    let mut used: u32 = left.iter().chain(&right).map(|field| cost(*field)).sum();
    if state.bulk_actions {
        used += u32::from(SELECT_COLUMN_WIDTH) + spacing;
    }

    let mut shown = left;
    let mut any_scrollable = false;
    for field in middle.into_iter().skip(offset) {
        let needed = cost(field);
        if any_scrollable && used.saturating_add(needed) > budget {
            break;
        }
        used = used.saturating_add(needed);
        shown.push(field);
        any_scrollable = true;
    }
    shown.extend(right);
    shown
}

fn adjust_column_offset(state: &GridState, view_data: &mut ViewData) {
    let scrollable = scrollable_columns(state);
    view_data.column_offset = view_data
        .column_offset
        .min(scrollable.len().saturating_sub(1));
    let Some(field) = current_field(state, view_data) else {
        return;
    };
    let Some(index) = scrollable.iter().position(|candidate| *candidate == field) else {
        return;
    };
    if index < view_data.column_offset {
        view_data.column_offset = index;
        return;
    }
    while view_data.column_offset < index
        && !layout_columns(state, view_data.table_width, view_data.column_offset).contains(&field)
    {
        view_data.column_offset += 1;
    }
}

struct DrawnRows<'a> {
    first_index: usize,
    rows: Vec<&'a Record>,
}

/// Rows that fit on screen. The virtualized window carries overscan rows that a
/// terminal cannot show partially, so drawing starts at the first visible row.
fn drawn_rows(state: &GridState, cursor_row: usize) -> DrawnRows<'_> {
    let visible = state.visible_rows();
    let fit = state.scroll.viewport().full_count();
    let skip = match visible.window {
        Some(_) => state
            .scroll
            .first_visible_index()
            .saturating_sub(visible.first_index),
        None => cursor_row
            .saturating_sub(visible.first_index)
            .saturating_sub(fit - 1),
    };
    DrawnRows {
        first_index: visible.first_index + skip,
        rows: visible.rows.into_iter().skip(skip).take(fit).collect(),
    }
}

fn render(
    frame: &mut ratatui::Frame<'_>,
    state: &GridState,
    view_data: &ViewData,
    renderers: &RendererTable,
) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(STATUS_ROWS)])
        .split(frame.area());

    render_table(frame, layout[0], state, view_data, renderers);

    let status_widget = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[1]);

    if view_data.help_visible {
        let area = centered_rect(72, 80, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &GridState,
    view_data: &ViewData,
    renderers: &RendererTable,
) {
    let block = Block::default()
        .title(table_title(state, view_data))
        .borders(Borders::ALL);

    if let Some(error) = &state.error {
        let body = Paragraph::new(format!("{error}\n\npress r to retry"))
            .style(Style::default().fg(Color::Red))
            .block(block);
        frame.render_widget(body, area);
        return;
    }

    let columns = layout_columns(state, view_data.table_width, view_data.column_offset);
    let cursor_field = current_field(state, view_data);

    let mut widths = Vec::with_capacity(columns.len() + 1);
    let mut header_cells = Vec::with_capacity(columns.len() + 1);
    if state.bulk_actions {
        widths.push(Constraint::Length(SELECT_COLUMN_WIDTH));
        header_cells.push(Cell::from(select_all_marker(state)));
    }
    for field in &columns {
        widths.push(Constraint::Length(state.column_width(*field)));
        header_cells.push(
            Cell::from(header_label(state, *field)).style(
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
        );
    }

    let drawn = drawn_rows(state, view_data.cursor_row);
    let row_height = u16::try_from(state.density.row_height()).unwrap_or(1);
    let rows = drawn.rows.iter().enumerate().map(|(offset, record)| {
        let is_cursor = drawn.first_index + offset == view_data.cursor_row;
        let mut cells = Vec::with_capacity(columns.len() + 1);
        if state.bulk_actions {
            let marker = if state.selected.contains(&record.id) {
                CHECKED
            } else {
                UNCHECKED
            };
            cells.push(Cell::from(marker));
        }
        for field in &columns {
            let text = truncate_label(
                &renderers.render(*field, record),
                usize::from(state.column_width(*field)),
            );
            let mut style = cell_style(*field, record);
            if is_cursor {
                style = style.bg(Color::DarkGray);
                if cursor_field == Some(*field) {
                    style = Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD);
                }
            }
            cells.push(Cell::from(text).style(style));
        }
        Row::new(cells).height(row_height)
    });

    let table = Table::new(rows, widths)
        .header(Row::new(header_cells))
        .column_spacing(state.density.column_spacing())
        .block(block);
    frame.render_widget(table, area);
}

fn cell_style(field: Field, record: &Record) -> Style {
    match field {
        Field::Status => match record.status {
            Status::Active => Style::default().fg(Color::Green),
            Status::Inactive => Style::default().fg(Color::DarkGray),
        },
        _ => Style::default(),
    }
}

fn header_label(state: &GridState, field: Field) -> String {
    let mut label = field.label().to_owned();
    if let Some((position, key)) = state
        .sort
        .iter()
        .enumerate()
        .find(|(_, key)| key.field == field)
    {
        label.push(' ');
        label.push_str(match key.direction {
            SortDirection::Asc => SORT_ASC,
            SortDirection::Desc => SORT_DESC,
        });
        if state.sort.len() > 1 {
            label.push_str(&(position + 1).to_string());
        }
    }
    if state.filters.get(field).is_some() {
        label.push(' ');
        label.push_str(FILTER_MARK);
    }
    match state.pinned.side_of(field) {
        Some(PinSide::Left) => {
            label.push(' ');
            label.push_str(PIN_LEFT_MARK);
        }
        Some(PinSide::Right) => {
            label.push(' ');
            label.push_str(PIN_RIGHT_MARK);
        }
        None if state.frozen.contains(&field) => {
            label.push(' ');
            label.push_str(FROZEN_MARK);
        }
        None => {}
    }
    label
}

fn select_all_marker(state: &GridState) -> &'static str {
    let view = state.view();
    let selected_in_view = view
        .iter()
        .filter(|record| state.selected.contains(&record.id))
        .count();
    if selected_in_view == 0 {
        UNCHECKED
    } else if selected_in_view == view.len() {
        CHECKED
    } else {
        PARTIAL
    }
}

fn table_title(state: &GridState, view_data: &ViewData) -> String {
    let source = if view_data.source_label.is_empty() {
        "records"
    } else {
        view_data.source_label.as_str()
    };
    if state.loading {
        return format!("{source} | loading");
    }

    let visible = state.visible_rows();
    let total = state.records.len();
    let mut parts = vec![source.to_owned()];
    if visible.total == total {
        parts.push(format!("{total} rows"));
    } else {
        parts.push(format!("{} of {total} rows", visible.total));
    }
    if let Some(window) = visible.window
        && visible.total > 0
    {
        parts.push(format!(
            "window {}-{}",
            window.start_index + 1,
            window.end_index + 1
        ));
    }
    if let Some(page) = visible.page {
        parts.push(format!("page {}/{}", page.page, page.total_pages.max(1)));
    }
    if !state.selected.is_empty() {
        parts.push(format!("{} selected", state.selected.len()));
    }
    if !state.search.is_empty() {
        parts.push(format!("search {:?}", state.search));
    }
    parts.join(" | ")
}

fn status_text(state: &GridState, view_data: &ViewData) -> String {
    match &view_data.input {
        InputMode::Search(buffer) => {
            return format!("SEARCH | /{buffer}{CURSOR_MARK} | enter keep | esc clear");
        }
        InputMode::Filter { field, buffer } => {
            return format!(
                "FILTER | {}: {buffer}{CURSOR_MARK} | {} | enter apply | esc cancel",
                field.label(),
                filter_hint(*field)
            );
        }
        InputMode::Edit {
            record,
            field,
            buffer,
        } => {
            return format!(
                "EDIT | row {record} {}: {buffer}{CURSOR_MARK} | enter save | esc cancel",
                field.label()
            );
        }
        InputMode::ConfirmDelete(ids) => {
            return match ids.as_slice() {
                [id] => format!("CONFIRM | delete row {id}? y/n"),
                _ => format!("CONFIRM | delete {} rows? y/n", ids.len()),
            };
        }
        InputMode::Grid => {}
    }

    let default = "j/k/h/l g/G ]/[ | s/S | / | f/x/F | space a/A 1/0 | e d/D | c/C p/P o +/- | z i b v | r | ? | q";
    match &state.status_line {
        Some(status) => format!("GRID | {status} | {default}"),
        None => format!("GRID | {default}"),
    }
}

fn filter_hint(field: Field) -> String {
    match field.kind() {
        FieldKind::Number => "min..max".to_owned(),
        FieldKind::Select => field.options().join("/"),
        FieldKind::Text | FieldKind::Date => "contains".to_owned(),
    }
}

fn help_overlay_text() -> &'static str {
    "j/k or arrows   move row\n\
     h/l             move column\n\
     ctrl+d/ctrl+u   half page\n\
     pgdn/pgup       full page\n\
     g/G ^/$         first/last row, column\n\
     ]/[             next/previous page (paged mode)\n\
     s / S           cycle sort on column / clear sort\n\
     /               search all columns\n\
     f / x / F       filter column / clear column / clear all\n\
     space a A       toggle row / select all in view / clear selection\n\
     1 / 0           mark selected active / inactive\n\
     e or enter      edit cell (inline edit on)\n\
     d / D           delete row / delete selected\n\
     c / C           hide column / show all\n\
     p / P / o       pin left / pin right / freeze\n\
     + / -           widen / narrow column\n\
     z               cycle density\n\
     i / b / v       inline edit / bulk actions / virtualization\n\
     r               reload from source\n\
     q               quit"
}

fn truncate_label(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_owned();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut truncated: String = value.chars().take(max_chars - 1).collect();
    truncated.push('…');
    truncated
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        GridRuntime, InputMode, KeyContext, TuiCommand, UiCommand, ViewData, command_for_key,
        criterion_for_input, drawn_rows, filter_prefill, fit_to_terminal, handle_key_event,
        header_label, layout_columns, render, status_text, table_title, truncate_label,
    };
    use anyhow::{Result, anyhow};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use gridline_app::{
        Criterion, Density, DisplayMode, Field, GridCommand, GridState, NumericRange, PinSide,
        Record, RecordId, RendererTable, SortKey, Status,
    };
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::sync::mpsc;
    use time::{Date, Month};

    #[derive(Debug, Default)]
    struct TestRuntime {
        records: Vec<Record>,
        loads: usize,
        forced: usize,
        fail: bool,
    }

    impl GridRuntime for TestRuntime {
        fn load_records(&mut self, force: bool) -> Result<Vec<Record>> {
            self.loads += 1;
            if force {
                self.forced += 1;
            }
            if self.fail {
                return Err(anyhow!("cannot reach http://127.0.0.1:1/users"));
            }
            Ok(self.records.clone())
        }
    }

    fn record(id: i64, name: &str, salary: f64) -> Record {
        Record {
            id: RecordId::new(id),
            name: name.to_owned(),
            email: format!("user{id}@company.com"),
            role: if id % 2 == 0 { "Engineer" } else { "Designer" }.to_owned(),
            department: "Engineering".to_owned(),
            salary,
            join_date: Date::from_calendar_date(2023, Month::January, 15).expect("valid date"),
            status: Status::Active,
            avatar: None,
        }
    }

    fn records(count: i64) -> Vec<Record> {
        (1..=count)
            .map(|id| record(id, &format!("Person {id:03}"), 40_000.0 + 1_000.0 * id as f64))
            .collect()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn setup(count: i64) -> (GridState, TestRuntime, ViewData) {
        let mut state = GridState::with_records(records(count));
        state.dispatch(GridCommand::ResizeViewport(10));
        let runtime = TestRuntime {
            records: records(count),
            ..TestRuntime::default()
        };
        (state, runtime, ViewData::default())
    }

    fn press(
        state: &mut GridState,
        runtime: &mut TestRuntime,
        view_data: &mut ViewData,
        keys: &[KeyCode],
    ) -> bool {
        let (tx, _rx) = mpsc::channel();
        let mut quit = false;
        for code in keys {
            quit = handle_key_event(state, runtime, view_data, &tx, key(*code));
        }
        quit
    }

    fn context(field: Field) -> KeyContext {
        KeyContext {
            record: Some(RecordId::new(4)),
            field: Some(field),
            pin: None,
            width: 10,
            density: Density::Standard,
        }
    }

    #[test]
    fn keys_map_to_grid_commands_for_cursor_cell() {
        assert_eq!(
            command_for_key(key(KeyCode::Char('s')), context(Field::Salary)),
            Some(TuiCommand::Grid(GridCommand::ToggleSort(Field::Salary)))
        );
        assert_eq!(
            command_for_key(key(KeyCode::Char(' ')), context(Field::Name)),
            Some(TuiCommand::Grid(GridCommand::ToggleRowSelection(
                RecordId::new(4)
            )))
        );
        assert_eq!(
            command_for_key(key(KeyCode::Char('+')), context(Field::Email)),
            Some(TuiCommand::Grid(GridCommand::ResizeColumn(Field::Email, 12)))
        );
        assert_eq!(
            command_for_key(key(KeyCode::Char('z')), context(Field::Email)),
            Some(TuiCommand::Grid(GridCommand::SetDensity(
                Density::Comfortable
            )))
        );
        assert_eq!(
            command_for_key(key(KeyCode::Enter), context(Field::Role)),
            Some(TuiCommand::Ui(UiCommand::OpenEdit(RecordId::new(4), Field::Role)))
        );
        assert_eq!(
            command_for_key(
                KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL),
                context(Field::Role)
            ),
            Some(TuiCommand::Ui(UiCommand::HalfPageDown))
        );
        assert_eq!(command_for_key(key(KeyCode::F(5)), context(Field::Role)), None);
    }

    #[test]
    fn pin_keys_toggle_against_current_side() {
        let pinned_left = KeyContext {
            pin: Some(PinSide::Left),
            ..context(Field::Name)
        };
        assert_eq!(
            command_for_key(key(KeyCode::Char('p')), pinned_left),
            Some(TuiCommand::Grid(GridCommand::PinColumn(Field::Name, None)))
        );
        assert_eq!(
            command_for_key(key(KeyCode::Char('P')), pinned_left),
            Some(TuiCommand::Grid(GridCommand::PinColumn(
                Field::Name,
                Some(PinSide::Right)
            )))
        );
    }

    #[test]
    fn cell_commands_need_a_cell() {
        let empty = KeyContext {
            record: None,
            field: None,
            ..context(Field::Name)
        };
        assert_eq!(command_for_key(key(KeyCode::Char('s')), empty), None);
        assert_eq!(command_for_key(key(KeyCode::Char('d')), empty), None);
        assert_eq!(
            command_for_key(key(KeyCode::Char('/')), empty),
            Some(TuiCommand::Ui(UiCommand::OpenSearch))
        );
    }

    #[test]
    fn filter_input_parses_per_field_kind() {
        assert_eq!(
            criterion_for_input(Field::Salary, "50000.."),
            Some(Criterion::Range(NumericRange::new(Some(50_000.0), None)))
        );
        assert_eq!(
            criterion_for_input(Field::Salary, "45000"),
            Some(Criterion::Range(NumericRange::new(
                Some(45_000.0),
                Some(45_000.0)
            )))
        );
        assert_eq!(criterion_for_input(Field::Salary, "lots..many"), None);
        assert_eq!(
            criterion_for_input(Field::Role, "engineer"),
            Some(Criterion::Equals("Engineer".to_owned()))
        );
        assert_eq!(
            criterion_for_input(Field::Status, "INACTIVE"),
            Some(Criterion::Equals("inactive".to_owned()))
        );
        assert_eq!(
            criterion_for_input(Field::Name, " smith "),
            Some(Criterion::Contains("smith".to_owned()))
        );
        assert_eq!(criterion_for_input(Field::Name, "   "), None);
        assert_eq!(
            filter_prefill(&Criterion::Range(NumericRange::new(None, Some(9.5)))),
            "..9.5"
        );
    }

    #[test]
    fn moving_cursor_reveals_rows() {
        let (mut state, mut runtime, mut view_data) = setup(100);
        press(&mut state, &mut runtime, &mut view_data, &[KeyCode::Char('G')]);
        assert_eq!(view_data.cursor_row, 99);
        assert_eq!(state.scroll.first_visible_index(), 90);

        press(&mut state, &mut runtime, &mut view_data, &[KeyCode::Char('g')]);
        assert_eq!(view_data.cursor_row, 0);
        assert_eq!(state.scroll.first_visible_index(), 0);

        let drawn = drawn_rows(&state, view_data.cursor_row);
        assert_eq!(drawn.first_index, 0);
        assert_eq!(drawn.rows.len(), 10);
    }

    #[test]
    fn taller_terminal_fills_rows_above_the_tail() {
        let (mut state, mut runtime, mut view_data) = setup(100);
        press(&mut state, &mut runtime, &mut view_data, &[KeyCode::Char('G')]);
        assert_eq!(state.scroll.first_visible_index(), 90);

        fit_to_terminal(&mut state, &mut view_data, 160, 36);
        assert_eq!(state.scroll.viewport().viewport_extent, 30);
        assert_eq!(view_data.cursor_row, 99);
        let drawn = drawn_rows(&state, view_data.cursor_row);
        assert_eq!(drawn.first_index, 70);
        assert_eq!(drawn.rows.len(), 30);
    }

    #[test]
    fn comfortable_rows_keep_cursor_on_screen_with_odd_body_height() -> Result<()> {
        let (mut state, mut runtime, mut view_data) = setup(100);
        state.dispatch(GridCommand::SetDensity(Density::Comfortable));
        fit_to_terminal(&mut state, &mut view_data, 160, 15);
        assert_eq!(state.scroll.viewport().viewport_extent, 9);

        press(&mut state, &mut runtime, &mut view_data, &[KeyCode::Char('j'); 4]);
        assert_eq!(view_data.cursor_row, 4);
        assert_eq!(state.scroll.first_visible_index(), 1);

        let drawn = drawn_rows(&state, view_data.cursor_row);
        assert_eq!(drawn.first_index, 1);
        assert_eq!(drawn.rows.len(), 4);
        assert_eq!(drawn.rows[3].id, RecordId::new(5));

        let mut terminal = Terminal::new(TestBackend::new(160, 15))?;
        terminal.draw(|frame| render(frame, &state, &view_data, &RendererTable::standard()))?;
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("Person 005"));
        assert!(!text.contains("Person 001"));
        Ok(())
    }

    #[test]
    fn paged_mode_moves_between_pages() {
        let (mut state, mut runtime, mut view_data) = setup(45);
        press(&mut state, &mut runtime, &mut view_data, &[KeyCode::Char('v')]);
        assert_eq!(state.display, DisplayMode::Paged);

        press(&mut state, &mut runtime, &mut view_data, &[KeyCode::Char(']')]);
        assert_eq!(state.page, 2);
        assert_eq!(view_data.cursor_row, 20);

        press(&mut state, &mut runtime, &mut view_data, &[KeyCode::Char('k')]);
        assert_eq!(state.page, 1);
        assert_eq!(view_data.cursor_row, 19);

        let drawn = drawn_rows(&state, view_data.cursor_row);
        assert_eq!(drawn.first_index, 10);
        assert_eq!(drawn.rows.last().map(|r| r.id), Some(RecordId::new(20)));
    }

    #[test]
    fn search_prompt_filters_live_and_escape_clears() {
        let (mut state, mut runtime, mut view_data) = setup(30);
        let mut keys = vec![KeyCode::Char('/')];
        keys.extend("person 02".chars().map(KeyCode::Char));
        press(&mut state, &mut runtime, &mut view_data, &keys);
        assert_eq!(state.search, "person 02");
        assert_eq!(state.view().len(), 10);
        assert!(status_text(&state, &view_data).starts_with("SEARCH | /person 02"));

        press(&mut state, &mut runtime, &mut view_data, &[KeyCode::Esc]);
        assert!(state.search.is_empty());
        assert_eq!(view_data.input, InputMode::Grid);
    }

    #[test]
    fn filter_prompt_applies_range_to_cursor_column() {
        let (mut state, mut runtime, mut view_data) = setup(30);
        view_data.cursor_col = 5;
        let mut keys = vec![KeyCode::Char('f')];
        keys.extend("65000..".chars().map(KeyCode::Char));
        keys.push(KeyCode::Enter);
        press(&mut state, &mut runtime, &mut view_data, &keys);
        assert_eq!(state.view().len(), 6);
        assert!(header_label(&state, Field::Salary).contains('▽'));

        press(&mut state, &mut runtime, &mut view_data, &[KeyCode::Char('x')]);
        assert_eq!(state.view().len(), 30);
    }

    #[test]
    fn inline_edit_requires_toggle_and_validates() {
        let (mut state, mut runtime, mut view_data) = setup(5);
        view_data.cursor_col = 2;
        press(&mut state, &mut runtime, &mut view_data, &[KeyCode::Char('e')]);
        assert_eq!(view_data.input, InputMode::Grid);
        assert_eq!(
            state.status_line.as_deref(),
            Some("inline edit off -- press i to enable")
        );

        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[KeyCode::Char('i'), KeyCode::Char('e')],
        );
        assert!(matches!(view_data.input, InputMode::Edit { .. }));
        let mut keys = vec![KeyCode::Backspace; 40];
        keys.extend("broken".chars().map(KeyCode::Char));
        keys.push(KeyCode::Enter);
        press(&mut state, &mut runtime, &mut view_data, &keys);
        assert_eq!(state.records[0].email, "user1@company.com");
        assert!(matches!(view_data.input, InputMode::Edit { .. }));
        assert!(
            state
                .status_line
                .as_deref()
                .is_some_and(|status| status.contains("email"))
        );

        let mut keys = vec![KeyCode::Backspace; 10];
        keys.extend("new@company.com".chars().map(KeyCode::Char));
        keys.push(KeyCode::Enter);
        press(&mut state, &mut runtime, &mut view_data, &keys);
        assert_eq!(state.records[0].email, "new@company.com");
        assert_eq!(view_data.input, InputMode::Grid);
    }

    #[test]
    fn delete_asks_for_confirmation() {
        let (mut state, mut runtime, mut view_data) = setup(5);
        press(&mut state, &mut runtime, &mut view_data, &[KeyCode::Char('d')]);
        assert_eq!(status_text(&state, &view_data), "CONFIRM | delete row 1? y/n");
        press(&mut state, &mut runtime, &mut view_data, &[KeyCode::Char('n')]);
        assert_eq!(state.records.len(), 5);

        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[KeyCode::Char('d'), KeyCode::Char('y')],
        );
        assert_eq!(state.records.len(), 4);
        assert_eq!(state.records[0].id, RecordId::new(2));
    }

    #[test]
    fn bulk_keys_respect_bulk_toggle() {
        let (mut state, mut runtime, mut view_data) = setup(6);
        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[KeyCode::Char(' '), KeyCode::Char('j'), KeyCode::Char(' ')],
        );
        assert_eq!(state.selected.len(), 2);

        press(&mut state, &mut runtime, &mut view_data, &[KeyCode::Char('0')]);
        assert_eq!(
            state
                .records
                .iter()
                .filter(|record| record.status == Status::Inactive)
                .count(),
            2
        );

        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[KeyCode::Char('D'), KeyCode::Char('y')],
        );
        assert_eq!(state.records.len(), 4);
        assert!(state.selected.is_empty());

        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[KeyCode::Char('b'), KeyCode::Char('a')],
        );
        assert!(state.selected.is_empty());
        assert_eq!(
            state.status_line.as_deref(),
            Some("bulk actions off -- press b to enable")
        );
    }

    #[test]
    fn reload_failure_sets_error_and_retry_recovers() {
        let (mut state, mut runtime, mut view_data) = setup(3);
        runtime.fail = true;
        press(&mut state, &mut runtime, &mut view_data, &[KeyCode::Char('r')]);
        assert!(state.error.as_deref().is_some_and(|e| e.contains("cannot reach")));
        assert!(!state.loading);

        runtime.fail = false;
        press(&mut state, &mut runtime, &mut view_data, &[KeyCode::Char('r')]);
        assert!(state.error.is_none());
        assert_eq!(state.status_line.as_deref(), Some("loaded 3 rows"));
        assert_eq!(runtime.forced, 2);
    }

    #[test]
    fn quit_and_help_keys() {
        let (mut state, mut runtime, mut view_data) = setup(3);
        assert!(!press(&mut state, &mut runtime, &mut view_data, &[KeyCode::Char('?')]));
        assert!(view_data.help_visible);
        assert!(!press(&mut state, &mut runtime, &mut view_data, &[KeyCode::Char('q')]));
        assert!(!view_data.help_visible);
        assert!(press(&mut state, &mut runtime, &mut view_data, &[KeyCode::Char('q')]));
    }

    #[test]
    fn layout_keeps_fixed_columns_while_scrolling() {
        let mut state = GridState::with_records(records(3));
        state.dispatch(GridCommand::PinColumn(Field::Status, Some(PinSide::Right)));
        state.dispatch(GridCommand::FreezeColumn(Field::Name));
        let columns = layout_columns(&state, 60, 2);
        assert_eq!(columns.first(), Some(&Field::Name));
        assert_eq!(columns.last(), Some(&Field::Status));
        assert!(!columns.contains(&Field::Id));
        assert!(!columns.contains(&Field::Email));
        assert!(columns.contains(&Field::Role));

        assert_eq!(layout_columns(&state, 0, 0).len(), Field::ALL.len());
    }

    #[test]
    fn header_shows_sort_and_pin_markers() {
        let mut state = GridState::default();
        state.dispatch(GridCommand::ToggleSort(Field::Salary));
        assert_eq!(header_label(&state, Field::Salary), "Salary ▲");
        state.dispatch(GridCommand::ToggleSort(Field::Salary));
        assert_eq!(header_label(&state, Field::Salary), "Salary ▼");

        state.dispatch(GridCommand::SetSortSpec(vec![
            SortKey::asc(Field::Role),
            SortKey::desc(Field::Name),
        ]));
        assert_eq!(header_label(&state, Field::Name), "Name ▼2");

        state.dispatch(GridCommand::PinColumn(Field::Email, Some(PinSide::Left)));
        assert_eq!(header_label(&state, Field::Email), "Email ◧");
    }

    #[test]
    fn title_reports_window_and_page() {
        let (mut state, _runtime, view_data) = setup(100);
        assert_eq!(table_title(&state, &view_data), "records | 100 rows | window 1-16");

        state.dispatch(GridCommand::ToggleVirtualization);
        state.dispatch(GridCommand::SetSearch("Person 01".to_owned()));
        assert_eq!(
            table_title(&state, &view_data),
            "records | 10 of 100 rows | page 1/1 | search \"Person 01\""
        );
    }

    #[test]
    fn truncate_label_marks_cut_text() {
        assert_eq!(truncate_label("Engineering", 20), "Engineering");
        assert_eq!(truncate_label("Engineering", 6), "Engin…");
        assert_eq!(truncate_label("Engineering", 0), "");
    }

    #[test]
    fn render_draws_formatted_cells() -> Result<()> {
        let (mut state, _runtime, view_data) = setup(3);
        state.dispatch(GridCommand::ToggleSort(Field::Name));
        let mut terminal = Terminal::new(TestBackend::new(160, 20))?;
        terminal.draw(|frame| render(frame, &state, &view_data, &RendererTable::standard()))?;

        let buffer = terminal.backend().buffer();
        let text: String = buffer
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("Name ▲"));
        assert!(text.contains("$41,000.00"));
        assert!(text.contains("Jan 15, 2023"));
        assert!(text.contains("● Active"));
        Ok(())
    }
}
