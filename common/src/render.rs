//! Contract between the dashboard core and whatever draws it.
//!
//! The core never draws pixels itself. [`ScreenSet`](crate::ScreenSet) and
//! [`ValueSlot`](crate::ValueSlot) only ask a [`RenderBridge`] to create
//! containers and labels, place them on a grid, change label text and switch
//! the visible surface. [`WidgetTree`](crate::WidgetTree) is the
//! `embedded-graphics` implementation; tests use a recording double.

use core::fmt::Debug;

/// Placement of a child inside a grid container.
///
/// Children always stretch to fill their cell in both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GridCell {
    pub col: u8,
    pub col_span: u8,
    pub row: u8,
    pub row_span: u8,
}

impl GridCell {
    /// A single cell at `(col, row)`.
    #[inline]
    pub const fn at(
        col: u8,
        row: u8,
    ) -> Self {
        Self {
            col,
            col_span: 1,
            row,
            row_span: 1,
        }
    }
}

/// What a label shows, so the renderer can pick font and placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TextRole {
    /// Quantity name at the top of a reading box.
    Title,
    /// Formatted value (or the no-data placeholder).
    Reading,
}

/// Retained-mode rendering primitives.
///
/// Handles are opaque and cheap to copy. A surface is a full-screen root; at
/// most one surface is active (visible) at a time.
pub trait RenderBridge {
    type Handle: Copy + PartialEq + Debug;

    /// The surface currently shown.
    fn active_surface(&self) -> Self::Handle;

    /// Create a container inside `parent`, or a new detached surface when
    /// `parent` is `None`.
    fn create_container(
        &mut self,
        parent: Option<Self::Handle>,
    ) -> Self::Handle;

    /// Create an empty text label inside `container`.
    fn create_label(
        &mut self,
        container: Self::Handle,
        role: TextRole,
    ) -> Self::Handle;

    fn set_text(
        &mut self,
        label: Self::Handle,
        text: &str,
    );

    /// Lay out the children of `container` on a `cols` x `rows` grid.
    fn set_grid_layout(
        &mut self,
        container: Self::Handle,
        cols: u8,
        rows: u8,
    );

    /// Place `child` in a cell of its parent's grid.
    fn set_grid_cell(
        &mut self,
        child: Self::Handle,
        cell: GridCell,
    );

    /// Make `container` report taps (see [`ScreenSet::handle_tap`](crate::ScreenSet::handle_tap)).
    fn register_tap_handler(
        &mut self,
        container: Self::Handle,
    );

    fn switch_active_surface(
        &mut self,
        surface: Self::Handle,
    );

    /// Delete `handle` together with everything inside it.
    fn delete_handle(
        &mut self,
        handle: Self::Handle,
    );
}

impl<T: RenderBridge + ?Sized> RenderBridge for &mut T {
    type Handle = T::Handle;

    fn active_surface(&self) -> Self::Handle { (**self).active_surface() }

    fn create_container(
        &mut self,
        parent: Option<Self::Handle>,
    ) -> Self::Handle {
        (**self).create_container(parent)
    }

    fn create_label(
        &mut self,
        container: Self::Handle,
        role: TextRole,
    ) -> Self::Handle {
        (**self).create_label(container, role)
    }

    fn set_text(
        &mut self,
        label: Self::Handle,
        text: &str,
    ) {
        (**self).set_text(label, text);
    }

    fn set_grid_layout(
        &mut self,
        container: Self::Handle,
        cols: u8,
        rows: u8,
    ) {
        (**self).set_grid_layout(container, cols, rows);
    }

    fn set_grid_cell(
        &mut self,
        child: Self::Handle,
        cell: GridCell,
    ) {
        (**self).set_grid_cell(child, cell);
    }

    fn register_tap_handler(
        &mut self,
        container: Self::Handle,
    ) {
        (**self).register_tap_handler(container);
    }

    fn switch_active_surface(
        &mut self,
        surface: Self::Handle,
    ) {
        (**self).switch_active_surface(surface);
    }

    fn delete_handle(
        &mut self,
        handle: Self::Handle,
    ) {
        (**self).delete_handle(handle);
    }
}
