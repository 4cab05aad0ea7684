//! Paginated grid of value slots with cyclic page navigation.
//!
//! Every page is a full-screen grid of `cols` x `rows` reading boxes. Slots
//! fill the grid row-major; when a page is full the next slot opens a new
//! page. A tap on the visible page moves to the next one, wrapping from the
//! last page back to the first:
//!
//! ```text
//!  page 0 --tap--> page 1 --tap--> ... --tap--> page N-1 --tap--> page 0
//! ```
//!
//! Pages live in a `Vec` and are addressed by index, so disposal is a plain
//! iteration.

use alloc::vec::Vec;

use crate::config::NO_DATA_TEXT;
use crate::render::{GridCell, RenderBridge, TextRole};
use crate::slot::ValueSlot;
use crate::template::{Template, TemplateError};

#[derive(Debug, Clone, Copy)]
struct Page<H> {
    /// Root surface shown when the page is active.
    surface: H,
    /// Grid container holding the reading boxes; receives taps.
    container: H,
}

/// The dashboard's pages and the slots placed on them.
pub struct ScreenSet<R: RenderBridge> {
    bridge: R,
    cols: u8,
    rows: u8,
    pages: Vec<Page<R::Handle>>,
    current: usize,
    next_col: u8,
    next_row: u8,
}

impl<R: RenderBridge> ScreenSet<R> {
    /// Empty screen set over `bridge`. The first page is created lazily by
    /// the first [`new_value`](Self::new_value) and reuses the surface that
    /// is active at that moment.
    ///
    /// A zero column or row count is treated as one.
    pub fn new(
        bridge: R,
        cols: u8,
        rows: u8,
    ) -> Self {
        Self {
            bridge,
            cols: cols.max(1),
            rows: rows.max(1),
            pages: Vec::new(),
            current: 0,
            next_col: 0,
            next_row: 0,
        }
    }

    /// Create a reading box in the next free grid cell and return its slot.
    ///
    /// The box shows `title` above a reading label that starts out as the
    /// no-data placeholder. `format` is validated before anything is created,
    /// so a bad format leaves the screen set untouched.
    pub fn new_value(
        &mut self,
        title: &'static str,
        format: &'static str,
    ) -> Result<ValueSlot<R::Handle>, TemplateError> {
        let template = Template::parse(format)?;

        if self.next_col == 0 && self.next_row == 0 {
            self.add_page();
        }
        let page_index = self.pages.len() - 1;
        let page_container = self.pages[page_index].container;
        let cell = GridCell::at(self.next_col, self.next_row);

        let value_box = self.bridge.create_container(Some(page_container));
        self.bridge.set_grid_cell(value_box, cell);

        let title_label = self.bridge.create_label(value_box, TextRole::Title);
        self.bridge.set_text(title_label, title);

        let reading_label = self.bridge.create_label(value_box, TextRole::Reading);
        self.bridge.set_text(reading_label, NO_DATA_TEXT);

        debug!("Slot {} placed on page {} at ({}, {})", title, page_index, cell.col, cell.row);

        self.next_col = (self.next_col + 1) % self.cols;
        if self.next_col == 0 {
            self.next_row = (self.next_row + 1) % self.rows;
        }

        Ok(ValueSlot::new(title, template, reading_label))
    }

    fn add_page(&mut self) {
        let surface = if self.pages.is_empty() {
            self.bridge.active_surface()
        } else {
            self.bridge.create_container(None)
        };
        let container = self.bridge.create_container(Some(surface));
        self.bridge.set_grid_layout(container, self.cols, self.rows);
        self.bridge.register_tap_handler(container);
        self.pages.push(Page { surface, container });
        info!("Page {} created", self.pages.len() - 1);
    }

    /// Show the page after the current one, wrapping to the first.
    /// Does nothing before the first page exists.
    pub fn advance(&mut self) {
        if self.pages.is_empty() {
            return;
        }
        self.current = (self.current + 1) % self.pages.len();
        self.bridge.switch_active_surface(self.pages[self.current].surface);
        debug!("Switched to page {}", self.current);
    }

    /// Route a tap reported by the renderer. Advances when `target` is the
    /// visible page's container and returns whether it did.
    pub fn handle_tap(
        &mut self,
        target: R::Handle,
    ) -> bool {
        match self.pages.get(self.current) {
            Some(page) if page.container == target => {
                self.advance();
                true
            }
            _ => false,
        }
    }

    /// Render `slot`'s latest reading.
    #[inline]
    pub fn flush(
        &mut self,
        slot: &ValueSlot<R::Handle>,
    ) {
        slot.flush(&mut self.bridge);
    }

    /// Index of the visible page.
    #[inline]
    pub const fn current_page(&self) -> usize { self.current }

    #[inline]
    pub fn page_count(&self) -> usize { self.pages.len() }

    /// Slots per page.
    #[inline]
    pub const fn capacity(&self) -> usize { self.cols as usize * self.rows as usize }

    /// Grid cell the next [`new_value`](Self::new_value) will use.
    #[inline]
    pub const fn next_cell(&self) -> GridCell { GridCell::at(self.next_col, self.next_row) }

    /// Surface and grid container of page `index`.
    pub fn page_handles(
        &self,
        index: usize,
    ) -> Option<(R::Handle, R::Handle)> {
        self.pages.get(index).map(|page| (page.surface, page.container))
    }

    #[inline]
    pub const fn bridge(&self) -> &R { &self.bridge }

    #[inline]
    pub fn bridge_mut(&mut self) -> &mut R { &mut self.bridge }
}

impl<R: RenderBridge> Drop for ScreenSet<R> {
    /// Switch back to the first page, then release every page. The surface
    /// that is active keeps existing (only its grid container goes), every
    /// other surface is deleted whole.
    fn drop(&mut self) {
        let Some(first) = self.pages.first().copied() else {
            return;
        };
        self.bridge.switch_active_surface(first.surface);
        let active = self.bridge.active_surface();

        for page in self.pages.drain(..) {
            if page.surface == active {
                self.bridge.delete_handle(page.container);
            } else {
                self.bridge.delete_handle(page.surface);
            }
        }
        debug!("Screen set released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DASH_COLS, DASH_ROWS};
    use crate::mocks::{BridgeCall, ROOT_SURFACE, RecordingBridge};
    use proptest::prelude::*;

    /// Grid cell and page index of the box holding `slot`'s reading label.
    fn placement(
        screens: &ScreenSet<&mut RecordingBridge>,
        slot: &ValueSlot<u32>,
    ) -> (usize, GridCell) {
        let bridge = screens.bridge();
        let value_box = bridge.parent(slot.label()).unwrap();
        let container = bridge.parent(value_box).unwrap();
        let page = (0..screens.page_count())
            .find(|&i| screens.page_handles(i).unwrap().1 == container)
            .unwrap();
        (page, bridge.grid_cell(value_box).unwrap())
    }

    #[test]
    fn test_leaf_scenario_layout() {
        let mut bridge = RecordingBridge::new();
        let mut screens = ScreenSet::new(&mut bridge, DASH_COLS, DASH_ROWS);
        let slots: Vec<_> = ["Voltage", "Current", "SoC", "Energy Left"]
            .into_iter()
            .map(|title| screens.new_value(title, "%d").unwrap())
            .collect();

        assert_eq!(screens.page_count(), 1);
        let cells: Vec<_> = slots.iter().map(|s| placement(&screens, s)).collect();
        assert_eq!(
            cells,
            [
                (0, GridCell::at(0, 0)),
                (0, GridCell::at(1, 0)),
                (0, GridCell::at(0, 1)),
                (0, GridCell::at(1, 1)),
            ]
        );
        assert_eq!(screens.next_cell(), GridCell::at(0, 2));
    }

    #[test]
    fn test_seventh_value_opens_second_page() {
        let mut bridge = RecordingBridge::new();
        let mut screens = ScreenSet::new(&mut bridge, 2, 3);
        for _ in 0..6 {
            screens.new_value("x", "%d").unwrap();
        }
        assert_eq!(screens.page_count(), 1);
        assert_eq!(screens.next_cell(), GridCell::at(0, 0));

        let seventh = screens.new_value("seventh", "%d").unwrap();
        assert_eq!(screens.page_count(), 2);
        assert_eq!(placement(&screens, &seventh), (1, GridCell::at(0, 0)));
    }

    #[test]
    fn test_first_page_reuses_active_surface() {
        let mut bridge = RecordingBridge::new();
        let mut screens = ScreenSet::new(&mut bridge, 1, 1);
        screens.new_value("a", "%d").unwrap();
        screens.new_value("b", "%d").unwrap();
        let (first_surface, _) = screens.page_handles(0).unwrap();
        let (second_surface, _) = screens.page_handles(1).unwrap();
        assert_eq!(first_surface, ROOT_SURFACE);
        assert_ne!(second_surface, ROOT_SURFACE);
        assert_eq!(screens.bridge().parent(second_surface), None);
    }

    #[test]
    fn test_new_value_shows_title_and_placeholder() {
        let mut bridge = RecordingBridge::new();
        let mut screens = ScreenSet::new(&mut bridge, 2, 3);
        let slot = screens.new_value("SoC", "%d%%").unwrap();
        let bridge = screens.bridge();
        assert_eq!(bridge.text(slot.label()), Some(NO_DATA_TEXT));

        let value_box = bridge.parent(slot.label()).unwrap();
        let title_label = bridge
            .calls()
            .iter()
            .find_map(|call| match call {
                BridgeCall::CreateLabel {
                    container,
                    role: TextRole::Title,
                    handle,
                } if *container == value_box => Some(*handle),
                _ => None,
            })
            .unwrap();
        assert_eq!(bridge.text(title_label), Some("SoC"));
    }

    #[test]
    fn test_page_container_has_grid_and_tap() {
        let mut bridge = RecordingBridge::new();
        let mut screens = ScreenSet::new(&mut bridge, 2, 3);
        screens.new_value("a", "%d").unwrap();
        let (_, container) = screens.page_handles(0).unwrap();
        let calls = screens.bridge().calls();
        assert!(calls.contains(&BridgeCall::SetGridLayout { container, cols: 2, rows: 3 }));
        assert!(calls.contains(&BridgeCall::RegisterTap(container)));
    }

    #[test]
    fn test_bad_format_creates_nothing() {
        let mut bridge = RecordingBridge::new();
        let mut screens = ScreenSet::new(&mut bridge, 2, 3);
        assert_eq!(screens.new_value("bad", "%s").err(), Some(TemplateError::UnknownConversion('s')));
        assert_eq!(screens.page_count(), 0);
        assert!(screens.bridge().calls().is_empty());
        assert_eq!(screens.next_cell(), GridCell::at(0, 0));
    }

    #[test]
    fn test_flush_through_screen_set() {
        let mut bridge = RecordingBridge::new();
        let mut screens = ScreenSet::new(&mut bridge, 2, 3);
        let slot = screens.new_value("Voltage", "%d V").unwrap();
        slot.writer().update_integer(42);
        screens.flush(&slot);
        assert_eq!(screens.bridge().text(slot.label()), Some("42 V"));
    }

    #[test]
    fn test_advance_wraps() {
        let mut bridge = RecordingBridge::new();
        let mut screens = ScreenSet::new(&mut bridge, 1, 2);
        for _ in 0..5 {
            screens.new_value("x", "%d").unwrap();
        }
        assert_eq!(screens.page_count(), 3);
        screens.advance();
        assert_eq!(screens.current_page(), 1);
        screens.advance();
        assert_eq!(screens.current_page(), 2);
        screens.advance();
        assert_eq!(screens.current_page(), 0);
        assert_eq!(screens.bridge().active_surface(), ROOT_SURFACE);
    }

    #[test]
    fn test_advance_without_pages_is_noop() {
        let mut bridge = RecordingBridge::new();
        let mut screens = ScreenSet::new(&mut bridge, 2, 3);
        screens.advance();
        assert_eq!(screens.current_page(), 0);
        assert!(screens.bridge().calls().is_empty());
    }

    #[test]
    fn test_tap_only_on_visible_page() {
        let mut bridge = RecordingBridge::new();
        let mut screens = ScreenSet::new(&mut bridge, 1, 1);
        let slot = screens.new_value("a", "%d").unwrap();
        screens.new_value("b", "%d").unwrap();
        let (_, first) = screens.page_handles(0).unwrap();
        let (_, second) = screens.page_handles(1).unwrap();

        assert!(!screens.handle_tap(second));
        assert!(!screens.handle_tap(slot.label()));
        assert_eq!(screens.current_page(), 0);

        assert!(screens.handle_tap(first));
        assert_eq!(screens.current_page(), 1);
        assert!(screens.handle_tap(second));
        assert_eq!(screens.current_page(), 0);
    }

    #[test]
    fn test_drop_switches_to_first_page_then_releases() {
        let mut bridge = RecordingBridge::new();
        let (first, second, third) = {
            let mut screens = ScreenSet::new(&mut bridge, 1, 1);
            for _ in 0..3 {
                screens.new_value("x", "%d").unwrap();
            }
            screens.advance();
            screens.bridge_mut().clear_calls();
            (
                screens.page_handles(0).unwrap(),
                screens.page_handles(1).unwrap(),
                screens.page_handles(2).unwrap(),
            )
        };

        assert_eq!(
            bridge.calls(),
            [
                BridgeCall::SwitchSurface(first.0),
                BridgeCall::Delete(first.1),
                BridgeCall::Delete(second.0),
                BridgeCall::Delete(third.0),
            ]
        );
        // Only the shared root surface is left.
        assert_eq!(bridge.active_surface(), ROOT_SURFACE);
        assert_eq!(bridge.live_count(), 1);
    }

    #[test]
    fn test_drop_without_pages_touches_nothing() {
        let mut bridge = RecordingBridge::new();
        drop(ScreenSet::new(&mut bridge, 2, 3));
        assert!(bridge.calls().is_empty());
    }

    #[test]
    fn test_zero_grid_is_clamped() {
        let mut bridge = RecordingBridge::new();
        let mut screens = ScreenSet::new(&mut bridge, 0, 0);
        assert_eq!(screens.capacity(), 1);
        screens.new_value("a", "%d").unwrap();
        screens.new_value("b", "%d").unwrap();
        assert_eq!(screens.page_count(), 2);
    }

    proptest! {
        #[test]
        fn test_allocation_is_row_major(cols in 1u8..5, rows in 1u8..5, count in 1usize..40) {
            let mut bridge = RecordingBridge::new();
            let mut screens = ScreenSet::new(&mut bridge, cols, rows);
            let capacity = screens.capacity();
            let slots: Vec<_> = (0..count).map(|_| screens.new_value("x", "%d").unwrap()).collect();

            prop_assert_eq!(screens.page_count(), count.div_ceil(capacity));
            for (i, slot) in slots.iter().enumerate() {
                let offset = i % capacity;
                let expected = GridCell::at((offset % cols as usize) as u8, (offset / cols as usize) as u8);
                prop_assert_eq!(placement(&screens, slot), (i / capacity, expected));
            }
        }

        #[test]
        fn test_advance_is_cyclic(cols in 1u8..4, rows in 1u8..4, count in 1usize..30, start in 0usize..10) {
            let mut bridge = RecordingBridge::new();
            let mut screens = ScreenSet::new(&mut bridge, cols, rows);
            for _ in 0..count {
                screens.new_value("x", "%d").unwrap();
            }
            for _ in 0..start {
                screens.advance();
            }
            let page = screens.current_page();
            let surface = screens.bridge().active_surface();
            for _ in 0..screens.page_count() {
                screens.advance();
            }
            prop_assert_eq!(screens.current_page(), page);
            prop_assert_eq!(screens.bridge().active_surface(), surface);
        }
    }
}
