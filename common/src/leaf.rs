//! Nissan Leaf pack readings and the application dashboard.
//!
//! The battery frame carries one reading per payload byte:
//!
//! | Byte | Reading      | Format     |
//! |------|--------------|------------|
//! | 0    | Voltage      | `%d V`     |
//! | 1    | Current      | `%d A`     |
//! | 2    | SoC          | `%d%%`     |
//! | 3    | Energy Left  | `%d Gids`  |
//!
//! Bytes are taken as unsigned integers. A short payload only updates the
//! readings it actually carries.

use embedded_can::Frame;

use crate::config::{DASH_COLS, DASH_ROWS};
use crate::frame::CanFrame;
use crate::render::RenderBridge;
use crate::screens::ScreenSet;
use crate::slot::{ValueSlot, ValueWriter};
use crate::template::TemplateError;

/// Something that consumes received frames on the producer side.
pub trait FrameSink {
    fn accept(
        &self,
        frame: &CanFrame,
    );
}

/// Producer-side handles to the four dashboard readings.
#[derive(Debug, Clone)]
pub struct LeafWriters {
    pub voltage: ValueWriter,
    pub current: ValueWriter,
    pub soc: ValueWriter,
    pub gids: ValueWriter,
}

impl FrameSink for LeafWriters {
    fn accept(
        &self,
        frame: &CanFrame,
    ) {
        let targets = [&self.voltage, &self.current, &self.soc, &self.gids];
        for (writer, &byte) in targets.into_iter().zip(frame.data()) {
            writer.update_integer(i32::from(byte));
        }
    }
}

/// The dashboard: its screens plus the four reading slots.
///
/// Owned by the consumer. The producer only gets [`LeafWriters`].
pub struct LeafDashboard<R: RenderBridge> {
    screens: ScreenSet<R>,
    voltage: ValueSlot<R::Handle>,
    current: ValueSlot<R::Handle>,
    soc: ValueSlot<R::Handle>,
    gids: ValueSlot<R::Handle>,
}

impl<R: RenderBridge> LeafDashboard<R> {
    /// Dashboard on the default 2 x 3 grid.
    pub fn new(bridge: R) -> Result<Self, TemplateError> { Self::with_grid(bridge, DASH_COLS, DASH_ROWS) }

    pub fn with_grid(
        bridge: R,
        cols: u8,
        rows: u8,
    ) -> Result<Self, TemplateError> {
        let mut screens = ScreenSet::new(bridge, cols, rows);
        let voltage = screens.new_value("Voltage", "%d V")?;
        let current = screens.new_value("Current", "%d A")?;
        let soc = screens.new_value("SoC", "%d%%")?;
        let gids = screens.new_value("Energy Left", "%d Gids")?;
        info!("Dashboard ready with {} page(s)", screens.page_count());

        Ok(Self {
            screens,
            voltage,
            current,
            soc,
            gids,
        })
    }

    /// Handles for the producer.
    pub fn writers(&self) -> LeafWriters {
        LeafWriters {
            voltage: self.voltage.writer(),
            current: self.current.writer(),
            soc: self.soc.writer(),
            gids: self.gids.writer(),
        }
    }

    /// Render every reading. Called on the display tick.
    pub fn flush(&mut self) {
        for slot in [&self.voltage, &self.current, &self.soc, &self.gids] {
            self.screens.flush(slot);
        }
    }

    /// Forward a tap reported by the renderer.
    #[inline]
    pub fn handle_tap(
        &mut self,
        target: R::Handle,
    ) -> bool {
        self.screens.handle_tap(target)
    }

    /// Tap the visible page, for inputs without coordinates (buttons).
    pub fn tap_visible_page(&mut self) -> bool {
        match self.screens.page_handles(self.screens.current_page()) {
            Some((_, container)) => self.screens.handle_tap(container),
            None => false,
        }
    }

    #[inline]
    pub fn advance(&mut self) { self.screens.advance(); }

    /// All slots in creation order.
    pub const fn slots(&self) -> [&ValueSlot<R::Handle>; 4] { [&self.voltage, &self.current, &self.soc, &self.gids] }

    #[inline]
    pub const fn screens(&self) -> &ScreenSet<R> { &self.screens }

    #[inline]
    pub fn bridge_mut(&mut self) -> &mut R { self.screens.bridge_mut() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NO_DATA_TEXT;
    use crate::mocks::RecordingBridge;
    use crate::render::GridCell;
    use crate::slot::Reading;

    #[test]
    fn test_decode_full_frame() {
        let mut bridge = RecordingBridge::new();
        let mut dash = LeafDashboard::new(&mut bridge).unwrap();
        let writers = dash.writers();
        writers.accept(&CanFrame::standard(0x1DB, &[200, 15, 80, 250, 9, 9, 9, 9]).unwrap());
        dash.flush();

        let texts: Vec<_> = dash
            .slots()
            .iter()
            .map(|slot| dash.screens().bridge().text(slot.label()).unwrap().to_string())
            .collect();
        assert_eq!(texts, ["200 V", "15 A", "80%", "250 Gids"]);
    }

    #[test]
    fn test_short_frame_updates_prefix_only() {
        let mut bridge = RecordingBridge::new();
        let mut dash = LeafDashboard::new(&mut bridge).unwrap();
        dash.writers().accept(&CanFrame::standard(0x1DB, &[101, 7]).unwrap());

        let [voltage, current, soc, gids] = dash.slots();
        assert_eq!(voltage.reading(), Reading::Integer(101));
        assert_eq!(current.reading(), Reading::Integer(7));
        assert_eq!(soc.reading(), Reading::NoData);
        assert_eq!(gids.reading(), Reading::NoData);

        let soc_label = soc.label();
        dash.flush();
        assert_eq!(dash.screens().bridge().text(soc_label), Some(NO_DATA_TEXT));
    }

    #[test]
    fn test_bytes_are_unsigned() {
        let mut bridge = RecordingBridge::new();
        let dash = LeafDashboard::new(&mut bridge).unwrap();
        dash.writers().accept(&CanFrame::standard(0x1DB, &[0xFF]).unwrap());
        assert_eq!(dash.slots()[0].reading(), Reading::Integer(255));
    }

    #[test]
    fn test_layout_on_first_page() {
        let mut bridge = RecordingBridge::new();
        let dash = LeafDashboard::new(&mut bridge).unwrap();
        assert_eq!(dash.screens().page_count(), 1);
        assert_eq!(dash.screens().next_cell(), GridCell::at(0, 2));
        let titles: Vec<_> = dash.slots().iter().map(|s| s.title()).collect();
        assert_eq!(titles, ["Voltage", "Current", "SoC", "Energy Left"]);
    }

    #[test]
    fn test_small_grid_spreads_pages_and_taps_cycle() {
        let mut bridge = RecordingBridge::new();
        let mut dash = LeafDashboard::with_grid(&mut bridge, 1, 2).unwrap();
        assert_eq!(dash.screens().page_count(), 2);
        let (_, first) = dash.screens().page_handles(0).unwrap();
        let (_, second) = dash.screens().page_handles(1).unwrap();
        assert!(dash.handle_tap(first));
        assert!(dash.handle_tap(second));
        assert_eq!(dash.screens().current_page(), 0);
    }

    #[test]
    fn test_button_tap_cycles_pages() {
        let mut bridge = RecordingBridge::new();
        let mut dash = LeafDashboard::with_grid(&mut bridge, 1, 1).unwrap();
        assert_eq!(dash.screens().page_count(), 4);
        for expected in [1, 2, 3, 0] {
            assert!(dash.tap_visible_page());
            assert_eq!(dash.screens().current_page(), expected);
        }
    }

    #[test]
    fn test_empty_frame_changes_nothing() {
        let mut bridge = RecordingBridge::new();
        let dash = LeafDashboard::new(&mut bridge).unwrap();
        dash.writers().accept(&CanFrame::standard(0x1DB, &[]).unwrap());
        assert!(dash.slots().iter().all(|s| s.reading() == Reading::NoData));
    }
}
