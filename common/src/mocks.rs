//! Test doubles for the transceiver and the renderer.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use core::time::Duration;

use crate::bus::{BusConfig, DriverFault, Transceiver};
use crate::frame::CanFrame;
use crate::render::{GridCell, RenderBridge, TextRole};

// =============================================================================
// Transceiver
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Install,
    Uninstall,
    Start,
    Stop,
    Receive,
}

/// Fault to report from the next call of each kind. `None` means success.
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    pub install: Option<DriverFault>,
    pub uninstall: Option<DriverFault>,
    pub start: Option<DriverFault>,
    pub stop: Option<DriverFault>,
}

/// Scripted transceiver that logs every call.
///
/// It models the driver's own rules and panics on misuse (installing twice,
/// starting or uninstalling without an install), so any test driving it
/// through [`CanBus`](crate::CanBus) also checks the call order.
pub struct MockTransceiver {
    calls: Rc<RefCell<Vec<Call>>>,
    faults: Rc<RefCell<Faults>>,
    frames: VecDeque<Result<CanFrame, DriverFault>>,
    installed_with: Option<BusConfig>,
    running: bool,
}

impl MockTransceiver {
    pub fn new() -> Self {
        Self {
            calls: Rc::default(),
            faults: Rc::default(),
            frames: VecDeque::new(),
            installed_with: None,
            running: false,
        }
    }

    /// Shared call log; stays readable after the bus is dropped.
    pub fn calls(&self) -> Rc<RefCell<Vec<Call>>> { Rc::clone(&self.calls) }

    /// Shared fault switches, adjustable while the bus owns the mock.
    pub fn faults(&self) -> Rc<RefCell<Faults>> { Rc::clone(&self.faults) }

    pub fn fail_install(
        self,
        fault: DriverFault,
    ) -> Self {
        self.faults.borrow_mut().install = Some(fault);
        self
    }

    pub fn fail_uninstall(
        self,
        fault: DriverFault,
    ) -> Self {
        self.faults.borrow_mut().uninstall = Some(fault);
        self
    }

    pub fn fail_start(
        self,
        fault: DriverFault,
    ) -> Self {
        self.faults.borrow_mut().start = Some(fault);
        self
    }

    pub fn fail_stop(
        self,
        fault: DriverFault,
    ) -> Self {
        self.faults.borrow_mut().stop = Some(fault);
        self
    }

    /// Queue a receive outcome. Once the queue is empty, receive times out.
    pub fn with_frame(
        mut self,
        outcome: Result<CanFrame, DriverFault>,
    ) -> Self {
        self.frames.push_back(outcome);
        self
    }

    pub fn installed_with(&self) -> Option<BusConfig> { self.installed_with }

    fn log(
        &self,
        call: Call,
    ) {
        self.calls.borrow_mut().push(call);
    }
}

impl Transceiver for MockTransceiver {
    fn install(
        &mut self,
        config: &BusConfig,
    ) -> Result<(), DriverFault> {
        self.log(Call::Install);
        assert!(self.installed_with.is_none(), "driver installed twice");
        if let Some(fault) = self.faults.borrow().install {
            return Err(fault);
        }
        self.installed_with = Some(*config);
        Ok(())
    }

    fn uninstall(&mut self) -> Result<(), DriverFault> {
        self.log(Call::Uninstall);
        assert!(self.installed_with.is_some(), "uninstall without install");
        // The driver is gone even if it reports a failure
        self.installed_with = None;
        self.running = false;
        self.faults.borrow().uninstall.map_or(Ok(()), Err)
    }

    fn start(&mut self) -> Result<(), DriverFault> {
        self.log(Call::Start);
        assert!(self.installed_with.is_some(), "start without install");
        if let Some(fault) = self.faults.borrow().start {
            return Err(fault);
        }
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DriverFault> {
        self.log(Call::Stop);
        assert!(self.installed_with.is_some(), "stop without install");
        self.running = false;
        self.faults.borrow().stop.map_or(Ok(()), Err)
    }

    fn receive(
        &mut self,
        _timeout: Duration,
    ) -> Result<CanFrame, DriverFault> {
        self.log(Call::Receive);
        if !self.running {
            return Err(DriverFault::InvalidState);
        }
        self.frames.pop_front().unwrap_or(Err(DriverFault::Timeout))
    }
}

// =============================================================================
// Renderer
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCall {
    CreateContainer { parent: Option<u32>, handle: u32 },
    CreateLabel { container: u32, role: TextRole, handle: u32 },
    SetText(u32, String),
    SetGridLayout { container: u32, cols: u8, rows: u8 },
    SetGridCell(u32, GridCell),
    RegisterTap(u32),
    SwitchSurface(u32),
    Delete(u32),
}

/// Renderer that draws nothing and records every call.
///
/// Handle 0 is the initially active surface.
pub struct RecordingBridge {
    next: u32,
    active: u32,
    parents: HashMap<u32, Option<u32>>,
    texts: HashMap<u32, String>,
    calls: Vec<BridgeCall>,
}

pub const ROOT_SURFACE: u32 = 0;

impl RecordingBridge {
    pub fn new() -> Self {
        Self {
            next: ROOT_SURFACE + 1,
            active: ROOT_SURFACE,
            parents: HashMap::from([(ROOT_SURFACE, None)]),
            texts: HashMap::new(),
            calls: Vec::new(),
        }
    }

    pub fn calls(&self) -> &[BridgeCall] { &self.calls }

    pub fn clear_calls(&mut self) { self.calls.clear(); }

    /// Current text of a live label.
    pub fn text(
        &self,
        label: u32,
    ) -> Option<&str> {
        self.texts.get(&label).map(String::as_str)
    }

    pub fn parent(
        &self,
        handle: u32,
    ) -> Option<u32> {
        self.parents.get(&handle).copied().flatten()
    }

    pub fn is_alive(
        &self,
        handle: u32,
    ) -> bool {
        self.parents.contains_key(&handle)
    }

    pub fn live_count(&self) -> usize { self.parents.len() }

    pub fn grid_cell(
        &self,
        handle: u32,
    ) -> Option<GridCell> {
        self.calls.iter().rev().find_map(|call| match call {
            BridgeCall::SetGridCell(h, cell) if *h == handle => Some(*cell),
            _ => None,
        })
    }

    fn allocate(
        &mut self,
        parent: Option<u32>,
    ) -> u32 {
        if let Some(parent) = parent {
            assert!(self.is_alive(parent), "child of deleted handle {parent}");
        }
        let handle = self.next;
        self.next += 1;
        self.parents.insert(handle, parent);
        handle
    }
}

impl RenderBridge for RecordingBridge {
    type Handle = u32;

    fn active_surface(&self) -> u32 { self.active }

    fn create_container(
        &mut self,
        parent: Option<u32>,
    ) -> u32 {
        let handle = self.allocate(parent);
        self.calls.push(BridgeCall::CreateContainer { parent, handle });
        handle
    }

    fn create_label(
        &mut self,
        container: u32,
        role: TextRole,
    ) -> u32 {
        let handle = self.allocate(Some(container));
        self.texts.insert(handle, String::new());
        self.calls.push(BridgeCall::CreateLabel { container, role, handle });
        handle
    }

    fn set_text(
        &mut self,
        label: u32,
        text: &str,
    ) {
        assert!(self.is_alive(label), "set_text on deleted handle {label}");
        self.texts.insert(label, text.to_string());
        self.calls.push(BridgeCall::SetText(label, text.to_string()));
    }

    fn set_grid_layout(
        &mut self,
        container: u32,
        cols: u8,
        rows: u8,
    ) {
        self.calls.push(BridgeCall::SetGridLayout { container, cols, rows });
    }

    fn set_grid_cell(
        &mut self,
        child: u32,
        cell: GridCell,
    ) {
        self.calls.push(BridgeCall::SetGridCell(child, cell));
    }

    fn register_tap_handler(
        &mut self,
        container: u32,
    ) {
        self.calls.push(BridgeCall::RegisterTap(container));
    }

    fn switch_active_surface(
        &mut self,
        surface: u32,
    ) {
        assert_eq!(self.parent(surface), None, "{surface} is not a surface");
        self.active = surface;
        self.calls.push(BridgeCall::SwitchSurface(surface));
    }

    fn delete_handle(
        &mut self,
        handle: u32,
    ) {
        assert_ne!(handle, self.active, "deleting the active surface");
        let mut doomed = vec![handle];
        while let Some(h) = doomed.pop() {
            self.parents.remove(&h);
            self.texts.remove(&h);
            doomed.extend(self.parents.iter().filter(|(_, p)| **p == Some(h)).map(|(c, _)| *c));
        }
        self.calls.push(BridgeCall::Delete(handle));
    }
}
