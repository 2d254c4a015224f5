// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Windowing for virtualized rendering.
//!
//! Given the length of the current view and a [`Viewport`], [`compute_window`]
//! returns the contiguous index range that has to be materialized. Extents are
//! abstract units: terminal lines for the TUI, pixels for anything else.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub scroll_offset: i64,
    pub item_extent: u32,
    pub viewport_extent: u32,
    pub overscan: usize,
}

impl Viewport {
    pub const fn new(item_extent: u32, viewport_extent: u32, overscan: usize) -> Self {
        Self {
            scroll_offset: 0,
            item_extent,
            viewport_extent,
            overscan,
        }
    }

    /// A zero extent would divide by zero; it behaves like 1.
    pub const fn effective_item_extent(&self) -> u32 {
        if self.item_extent == 0 {
            1
        } else {
            self.item_extent
        }
    }

    pub const fn visible_count(&self) -> usize {
        self.viewport_extent.div_ceil(self.effective_item_extent()) as usize
    }

    /// Items that fit without being cut off at the bottom edge, at least one.
    /// `visible_count` also counts a trailing partial item.
    pub const fn full_count(&self) -> usize {
        let count = (self.viewport_extent / self.effective_item_extent()) as usize;
        if count == 0 { 1 } else { count }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowRange {
    pub start_index: usize,
    /// Inclusive.
    pub end_index: usize,
    pub visible_count: usize,
    pub padding_offset: u64,
    pub total_extent: u64,
}

impl WindowRange {
    pub const fn contains(&self, index: usize) -> bool {
        index >= self.start_index && index <= self.end_index
    }

    pub fn slice<'a, T>(&self, view: &'a [T]) -> &'a [T] {
        if view.is_empty() {
            return &view[..0];
        }
        let end = self.end_index.min(view.len() - 1);
        let start = self.start_index.min(end);
        &view[start..=end]
    }
}

pub fn compute_window(item_count: usize, viewport: &Viewport) -> WindowRange {
    let extent = viewport.effective_item_extent();
    let visible_count = viewport.visible_count();
    if item_count == 0 {
        return WindowRange {
            visible_count,
            ..WindowRange::default()
        };
    }

    let last_index = item_count - 1;
    let offset = viewport.scroll_offset.max(0) as u64;
    let raw_start = usize::try_from(offset / u64::from(extent))
        .unwrap_or(usize::MAX)
        .min(last_index);
    let raw_end = raw_start
        .saturating_add(visible_count)
        .saturating_add(viewport.overscan)
        .min(last_index);
    let start_index = raw_start.saturating_sub(viewport.overscan);

    WindowRange {
        start_index,
        end_index: raw_end,
        visible_count,
        padding_offset: start_index as u64 * u64::from(extent),
        total_extent: item_count as u64 * u64::from(extent),
    }
}

/// Scroll state for a virtualized view. The scroll offset is the only stored
/// position; the window is always derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualScroll {
    viewport: Viewport,
}

impl VirtualScroll {
    pub const fn new(viewport: Viewport) -> Self {
        Self { viewport }
    }

    pub const fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub const fn scroll_offset(&self) -> i64 {
        self.viewport.scroll_offset
    }

    pub fn handle_scroll(&mut self, offset: i64) {
        self.viewport.scroll_offset = offset;
    }

    pub fn scroll_by(&mut self, delta: i64) {
        self.viewport.scroll_offset = self.viewport.scroll_offset.saturating_add(delta).max(0);
    }

    pub fn scroll_to_index(&mut self, index: usize) {
        let extent = i64::from(self.viewport.effective_item_extent());
        self.viewport.scroll_offset = i64::try_from(index)
            .unwrap_or(i64::MAX)
            .saturating_mul(extent);
    }

    pub fn resize(&mut self, viewport_extent: u32) {
        self.viewport.viewport_extent = viewport_extent;
    }

    pub fn set_item_extent(&mut self, item_extent: u32) {
        let index = self.first_visible_index();
        self.viewport.item_extent = item_extent;
        self.scroll_to_index(index);
    }

    pub fn set_overscan(&mut self, overscan: usize) {
        self.viewport.overscan = overscan;
    }

    /// Index of the first item at the top edge, ignoring overscan.
    pub fn first_visible_index(&self) -> usize {
        let extent = i64::from(self.viewport.effective_item_extent());
        usize::try_from(self.viewport.scroll_offset.max(0) / extent).unwrap_or(0)
    }

    /// Scrolls the minimum amount needed for `index` to sit fully inside the viewport.
    pub fn ensure_visible(&mut self, index: usize) {
        let visible = self.viewport.full_count();
        let first = self.first_visible_index();
        if index < first {
            self.scroll_to_index(index);
        } else if index >= first + visible {
            self.scroll_to_index(index + 1 - visible);
        }
    }

    /// Keeps the offset within the scrollable range after the item count
    /// shrinks or the viewport grows.
    pub fn clamp_to(&mut self, item_count: usize) {
        let visible = self.viewport.full_count();
        let max_first = item_count.saturating_sub(visible);
        if self.first_visible_index() > max_first {
            self.scroll_to_index(max_first);
        }
        if self.viewport.scroll_offset < 0 {
            self.viewport.scroll_offset = 0;
        }
    }

    pub fn window(&self, item_count: usize) -> WindowRange {
        compute_window(item_count, &self.viewport)
    }
}

impl Default for VirtualScroll {
    fn default() -> Self {
        Self::new(Viewport::new(1, 20, 5))
    }
}
