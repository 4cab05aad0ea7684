//! Retained widget tree drawn with `embedded-graphics`.
//!
//! [`WidgetTree`] is the board-independent [`RenderBridge`]: it keeps surfaces,
//! containers and labels in an arena, lays them out on demand and draws the
//! active surface onto any `DrawTarget<Color = Rgb565>`.
//!
//! # Layout
//!
//! - A surface covers the whole screen; its containers fill it.
//! - A container with a grid layout splits its area into equal cells and
//!   stretches each child over its cell (and span).
//! - A container without a grid (a reading box) stacks its labels in equal
//!   horizontal bands, top to bottom.
//!
//! # Dirty Tracking
//!
//! Every change that can alter the picture (text change, page switch,
//! structure change) marks the tree dirty. [`WidgetTree::render_if_dirty`]
//! redraws only then, so a consumer ticking every 100 ms with unchanged
//! readings costs no display traffic.
//!
//! Handles of deleted widgets are ignored by every operation.

mod primitives;

use alloc::string::String;
use alloc::vec::Vec;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

pub use primitives::{draw_box_background, draw_centered_text};

use crate::colors::BLACK;
use crate::config::NO_DATA_TEXT;
use crate::render::{GridCell, RenderBridge, TextRole};
use crate::styles::{PLACEHOLDER_STYLE, READING_STYLE, TITLE_STYLE};

/// Handle of a widget in a [`WidgetTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WidgetId(u32);

impl WidgetId {
    /// The surface that exists from the start and is active initially.
    pub const ROOT: Self = Self(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Surface,
    Container,
    Label(TextRole),
}

#[derive(Debug)]
struct Node {
    kind: Kind,
    parent: Option<WidgetId>,
    children: Vec<WidgetId>,
    grid: Option<(u8, u8)>,
    cell: Option<GridCell>,
    tappable: bool,
    text: String,
}

impl Node {
    const fn new(
        kind: Kind,
        parent: Option<WidgetId>,
    ) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            grid: None,
            cell: None,
            tappable: false,
            text: String::new(),
        }
    }
}

/// Arena of widgets plus the active surface.
pub struct WidgetTree {
    /// Indexed by `WidgetId`; `None` once deleted. Ids are never reused.
    nodes: Vec<Option<Node>>,
    active: WidgetId,
    bounds: Rectangle,
    dirty: bool,
}

impl WidgetTree {
    /// Tree with a single root surface covering `size`.
    pub fn new(size: Size) -> Self {
        let mut nodes = Vec::new();
        nodes.push(Some(Node::new(Kind::Surface, None)));
        Self {
            nodes,
            active: WidgetId::ROOT,
            bounds: Rectangle::new(Point::zero(), size),
            dirty: true,
        }
    }

    /// Whether something changed since the last draw.
    #[inline]
    pub const fn is_dirty(&self) -> bool { self.dirty }

    /// Current text of a label.
    pub fn text(
        &self,
        id: WidgetId,
    ) -> Option<&str> {
        match self.node(id) {
            Some(node) if matches!(node.kind, Kind::Label(_)) => Some(node.text.as_str()),
            _ => None,
        }
    }

    pub fn parent(
        &self,
        id: WidgetId,
    ) -> Option<WidgetId> {
        self.node(id).and_then(|node| node.parent)
    }

    pub fn is_alive(
        &self,
        id: WidgetId,
    ) -> bool {
        self.node(id).is_some()
    }

    /// Number of live widgets, root included.
    pub fn widget_count(&self) -> usize { self.nodes.iter().filter(|n| n.is_some()).count() }

    /// Screen area of a widget on its surface.
    pub fn bounds_of(
        &self,
        id: WidgetId,
    ) -> Option<Rectangle> {
        let node = self.node(id)?;
        match node.parent {
            None => Some(self.bounds),
            Some(parent) => {
                let parent_area = self.bounds_of(parent)?;
                let siblings = &self.node(parent)?.children;
                let index = siblings.iter().position(|&c| c == id)?;
                Some(self.child_area(parent, parent_area, index))
            }
        }
    }

    fn node(
        &self,
        id: WidgetId,
    ) -> Option<&Node> {
        self.nodes.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn node_mut(
        &mut self,
        id: WidgetId,
    ) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    fn insert(
        &mut self,
        kind: Kind,
        parent: Option<WidgetId>,
    ) -> WidgetId {
        let id = WidgetId(self.nodes.len() as u32);
        let parent = match parent {
            Some(p) => match self.node_mut(p) {
                Some(node) => {
                    node.children.push(id);
                    Some(p)
                }
                None => {
                    warn!("Parent widget {} is gone, creating detached", p.0);
                    None
                }
            },
            None => None,
        };
        let kind = if parent.is_none() && kind == Kind::Container {
            Kind::Surface
        } else {
            kind
        };
        self.nodes.push(Some(Node::new(kind, parent)));
        self.dirty = true;
        id
    }

    // =========================================================================
    // Layout
    // =========================================================================

    /// Area of the `index`th child of `parent` when `parent` covers `area`.
    fn child_area(
        &self,
        parent: WidgetId,
        area: Rectangle,
        index: usize,
    ) -> Rectangle {
        let Some(node) = self.node(parent) else {
            return area;
        };
        let child = node.children[index];
        match (node.grid, self.node(child).and_then(|c| c.cell)) {
            (Some((cols, rows)), Some(cell)) => grid_area(area, cols, rows, cell),
            (Some(_), None) => area,
            (None, _) if node.kind == Kind::Container => {
                let labels = node.children.len() as u32;
                band_area(area, labels, index as u32)
            }
            (None, _) => area,
        }
    }

    /// Deepest tappable container on the active surface containing `point`.
    pub fn hit_test(
        &self,
        point: Point,
    ) -> Option<WidgetId> {
        let mut found = None;
        self.hit_test_in(self.active, self.bounds, point, &mut found);
        found
    }

    fn hit_test_in(
        &self,
        id: WidgetId,
        area: Rectangle,
        point: Point,
        found: &mut Option<WidgetId>,
    ) {
        let Some(node) = self.node(id) else {
            return;
        };
        if !area.contains(point) {
            return;
        }
        if node.tappable {
            *found = Some(id);
        }
        for index in 0..node.children.len() {
            let child_area = self.child_area(id, area, index);
            self.hit_test_in(node.children[index], child_area, point, found);
        }
    }

    // =========================================================================
    // Drawing
    // =========================================================================

    /// Draw the active surface if anything changed. Returns whether it drew.
    pub fn render_if_dirty<D>(
        &mut self,
        display: &mut D,
    ) -> Result<bool, D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        if !self.dirty {
            return Ok(false);
        }
        self.draw(display)?;
        self.dirty = false;
        Ok(true)
    }

    /// Draw the whole active surface.
    pub fn draw<D>(
        &self,
        display: &mut D,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        display.clear(BLACK)?;
        self.draw_node(display, self.active, self.bounds)
    }

    fn draw_node<D>(
        &self,
        display: &mut D,
        id: WidgetId,
        area: Rectangle,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let Some(node) = self.node(id) else {
            return Ok(());
        };
        match node.kind {
            Kind::Surface => {}
            // Grid containers only position their children
            Kind::Container if node.grid.is_some() => {}
            Kind::Container => draw_box_background(display, area)?,
            Kind::Label(TextRole::Title) => draw_centered_text(display, area, &node.text, TITLE_STYLE)?,
            Kind::Label(TextRole::Reading) => {
                let style = if node.text == NO_DATA_TEXT {
                    PLACEHOLDER_STYLE
                } else {
                    READING_STYLE
                };
                draw_centered_text(display, area, &node.text, style)?;
            }
        }
        for index in 0..node.children.len() {
            let child_area = self.child_area(id, area, index);
            self.draw_node(display, node.children[index], child_area)?;
        }
        Ok(())
    }
}

/// Cell (with span) of a `cols` x `rows` grid over `area`. Remainder pixels
/// go to the later cells so the grid always covers the whole area.
fn grid_area(
    area: Rectangle,
    cols: u8,
    rows: u8,
    cell: GridCell,
) -> Rectangle {
    let cols = u32::from(cols.max(1));
    let rows = u32::from(rows.max(1));
    let col_end = (u32::from(cell.col) + u32::from(cell.col_span.max(1))).min(cols);
    let row_end = (u32::from(cell.row) + u32::from(cell.row_span.max(1))).min(rows);
    let col = u32::from(cell.col).min(col_end);
    let row = u32::from(cell.row).min(row_end);

    let w = area.size.width;
    let h = area.size.height;
    let x0 = w * col / cols;
    let x1 = w * col_end / cols;
    let y0 = h * row / rows;
    let y1 = h * row_end / rows;

    Rectangle::new(
        area.top_left + Point::new(x0 as i32, y0 as i32),
        Size::new(x1 - x0, y1 - y0),
    )
}

/// The `index`th of `count` equal horizontal bands over `area`.
fn band_area(
    area: Rectangle,
    count: u32,
    index: u32,
) -> Rectangle {
    let count = count.max(1);
    let h = area.size.height;
    let y0 = h * index / count;
    let y1 = h * (index + 1) / count;
    Rectangle::new(
        area.top_left + Point::new(0, y0 as i32),
        Size::new(area.size.width, y1 - y0),
    )
}

// =============================================================================
// RenderBridge
// =============================================================================

impl RenderBridge for WidgetTree {
    type Handle = WidgetId;

    fn active_surface(&self) -> WidgetId { self.active }

    fn create_container(
        &mut self,
        parent: Option<WidgetId>,
    ) -> WidgetId {
        self.insert(Kind::Container, parent)
    }

    fn create_label(
        &mut self,
        container: WidgetId,
        role: TextRole,
    ) -> WidgetId {
        self.insert(Kind::Label(role), Some(container))
    }

    fn set_text(
        &mut self,
        label: WidgetId,
        text: &str,
    ) {
        let Some(node) = self.node_mut(label) else {
            return;
        };
        if node.text != text {
            node.text.clear();
            node.text.push_str(text);
            self.dirty = true;
        }
    }

    fn set_grid_layout(
        &mut self,
        container: WidgetId,
        cols: u8,
        rows: u8,
    ) {
        if let Some(node) = self.node_mut(container) {
            node.grid = Some((cols, rows));
            self.dirty = true;
        }
    }

    fn set_grid_cell(
        &mut self,
        child: WidgetId,
        cell: GridCell,
    ) {
        if let Some(node) = self.node_mut(child) {
            node.cell = Some(cell);
            self.dirty = true;
        }
    }

    fn register_tap_handler(
        &mut self,
        container: WidgetId,
    ) {
        if let Some(node) = self.node_mut(container) {
            node.tappable = true;
        }
    }

    fn switch_active_surface(
        &mut self,
        surface: WidgetId,
    ) {
        let is_surface = self.node(surface).is_some_and(|node| node.kind == Kind::Surface);
        if is_surface && surface != self.active {
            self.active = surface;
            self.dirty = true;
        }
    }

    /// Delete a widget and its subtree. The active surface cannot be deleted.
    fn delete_handle(
        &mut self,
        handle: WidgetId,
    ) {
        if handle == self.active {
            warn!("Refusing to delete the active surface");
            return;
        }
        let Some(parent) = self.node(handle).map(|node| node.parent) else {
            return;
        };
        if let Some(parent) = parent.and_then(|p| self.node_mut(p)) {
            parent.children.retain(|&c| c != handle);
        }

        let mut doomed = alloc::vec![handle];
        while let Some(id) = doomed.pop() {
            if let Some(node) = self.nodes.get_mut(id.0 as usize).and_then(Option::take) {
                doomed.extend(node.children);
            }
        }
        self.dirty = true;
    }
}
