//! # Simulated Board
//!
//! In-memory stand-ins for the hardware collaborators and the control
//! endpoint. They let the vendor layer run on a development host: the
//! `apollo-vendor` binary replays requests against them, and the tests use
//! them to observe which side effects happened and in which stage.
//!
//! The simulated JTAG and SPI engines loop their output back as input, so a
//! scan or SPI transaction reads back what was sent.

use std::sync::{Arc, Mutex};

use tracing::debug;

use super::{
    hardware::{DeviceContext, FpgaControl, JtagEngine, Leds, TapState, UsbSwitch},
    pipe::{ControlPipe, TransferError},
    request::{ControlStage, Direction, VendorRequest},
    vendor::{StatusAcknowledged, VendorDispatcher},
};

#[cfg(feature = "debug-spi")]
use super::hardware::SpiEngine;

/// Capacity of the simulated endpoint 0 transfer buffer.
pub const CONTROL_BUFFER_SIZE: usize = 256;

/// Configuration state of the FPGA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FpgaState {
    /// Running a bitstream.
    #[default]
    Configured,
    /// Held in reset.
    Offline,
}

/// Who drives a set of shared lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Owner {
    /// The debug controller running the vendor interface.
    #[default]
    DebugController,
    /// The FPGA.
    Fpga,
}

/// Snapshot of the simulated device-wide hardware state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareState {
    /// Active LED blink pattern.
    pub led_pattern: u16,
    /// FPGA configuration state.
    pub fpga: FpgaState,
    /// Number of reconfigurations triggered so far.
    pub reconfigurations: u32,
    /// Owner of the USB differential pair.
    pub usb_port: Owner,
    /// Owner of the configuration flash SPI lines.
    pub flash_lines: Owner,
    /// Whether the JTAG engine holds its pins.
    pub jtag_active: bool,
}

impl Default for HardwareState {
    fn default() -> Self {
        Self {
            led_pattern: 0,
            fpga: FpgaState::Configured,
            reconfigurations: 0,
            usb_port: Owner::DebugController,
            flash_lines: Owner::Fpga,
            jtag_active: false,
        }
    }
}

/// A side effect observed on the simulated hardware.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum HardwareEvent {
    LedPattern(u16),
    Reconfigure,
    ForceOffline,
    UsbHandOff,
    JtagStart,
    JtagStop,
    JtagClearOut,
    JtagLoadOut(Vec<u8>),
    JtagScan { bits: usize, advance_state: bool },
    JtagRunClock { cycles: u16, tms: bool },
    JtagGotoState(TapState),
    DebugSpi(Vec<u8>),
    FlashSpi(Vec<u8>),
    TakeFlashLines,
    ReleaseFlashLines,
}

#[derive(Debug, Default)]
struct Board {
    state: HardwareState,
    events: Vec<HardwareEvent>,
}

/// The simulated board. Clones share the same hardware.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBoard {
    board: Arc<Mutex<Board>>,
}

impl SimulatedBoard {
    /// Create a board in its power-on state.
    #[must_use]
    pub fn new() -> Self {
        Default::default()
    }

    /// Collaborators acting on this board.
    #[must_use]
    pub fn device_context(&self) -> DeviceContext {
        DeviceContext {
            leds: Box::new(self.clone()),
            fpga: Box::new(self.clone()),
            usb_switch: Box::new(self.clone()),
            jtag: Box::new(SimulatedJtag::new(self.clone())),
            #[cfg(feature = "debug-spi")]
            spi: Box::new(SimulatedSpi::new(self.clone())),
        }
    }

    /// A dispatcher acting on this board.
    #[must_use]
    pub fn dispatcher(&self) -> VendorDispatcher {
        VendorDispatcher::new(self.device_context())
    }

    /// The current hardware state.
    #[must_use]
    pub fn state(&self) -> HardwareState {
        self.board.lock().unwrap().state.clone()
    }

    /// Every side effect so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<HardwareEvent> {
        self.board.lock().unwrap().events.clone()
    }

    fn record(&self, event: HardwareEvent, update: impl FnOnce(&mut HardwareState)) {
        let mut board = self.board.lock().unwrap();

        debug!("simulated hardware: {:?}", event);
        update(&mut board.state);
        board.events.push(event);
    }
}

impl Leds for SimulatedBoard {
    fn set_blink_pattern(&mut self, pattern: u16) {
        self.record(HardwareEvent::LedPattern(pattern), |state| {
            state.led_pattern = pattern
        });
    }
}

impl FpgaControl for SimulatedBoard {
    fn trigger_reconfiguration(&mut self) {
        self.record(HardwareEvent::Reconfigure, |state| {
            state.fpga = FpgaState::Configured;
            state.reconfigurations += 1;
        });
    }

    fn force_offline(&mut self) {
        self.record(HardwareEvent::ForceOffline, |state| {
            state.fpga = FpgaState::Offline
        });
    }
}

impl UsbSwitch for SimulatedBoard {
    fn hand_off_to_fpga(&mut self, _ack: &StatusAcknowledged) {
        self.record(HardwareEvent::UsbHandOff, |state| state.usb_port = Owner::Fpga);
    }
}

/// A JTAG engine whose TDO is wired to its TDI.
#[derive(Debug)]
struct SimulatedJtag {
    board: SimulatedBoard,
    out_buffer: Vec<u8>,
    in_buffer: Vec<u8>,
    state: TapState,
}

impl SimulatedJtag {
    fn new(board: SimulatedBoard) -> Self {
        Self {
            board,
            out_buffer: Vec::new(),
            in_buffer: Vec::new(),
            state: TapState::TestLogicReset,
        }
    }
}

impl JtagEngine for SimulatedJtag {
    fn start(&mut self) {
        self.board
            .record(HardwareEvent::JtagStart, |state| state.jtag_active = true);
    }

    fn stop(&mut self) {
        self.board
            .record(HardwareEvent::JtagStop, |state| state.jtag_active = false);
    }

    fn clear_out_buffer(&mut self) {
        self.out_buffer.clear();
        self.board.record(HardwareEvent::JtagClearOut, |_| ());
    }

    fn set_out_buffer(&mut self, data: &[u8]) {
        self.out_buffer = data.to_vec();
        self.board
            .record(HardwareEvent::JtagLoadOut(data.to_vec()), |_| ());
    }

    fn in_buffer(&self) -> &[u8] {
        &self.in_buffer
    }

    fn scan(&mut self, bits: usize, advance_state: bool) {
        let mut captured = self.out_buffer.clone();
        captured.resize(bits.div_ceil(8), 0);
        if bits % 8 != 0 {
            if let Some(last) = captured.last_mut() {
                *last &= (1u8 << (bits % 8)) - 1;
            }
        }
        self.in_buffer = captured;

        if advance_state {
            self.state = match self.state {
                TapState::ShiftDr => TapState::Exit1Dr,
                TapState::ShiftIr => TapState::Exit1Ir,
                other => other,
            };
        }
        self.board
            .record(HardwareEvent::JtagScan { bits, advance_state }, |_| ());
    }

    fn run_clock(&mut self, cycles: u16, tms: bool) {
        self.board
            .record(HardwareEvent::JtagRunClock { cycles, tms }, |_| ());
    }

    fn goto_state(&mut self, state: TapState) {
        self.state = state;
        self.board.record(HardwareEvent::JtagGotoState(state), |_| ());
    }

    fn state(&self) -> TapState {
        self.state
    }
}

/// An SPI engine whose MISO is wired to its MOSI.
#[cfg(feature = "debug-spi")]
#[derive(Debug)]
struct SimulatedSpi {
    board: SimulatedBoard,
    response: Vec<u8>,
}

#[cfg(feature = "debug-spi")]
impl SimulatedSpi {
    const fn new(board: SimulatedBoard) -> Self {
        Self {
            board,
            response: Vec::new(),
        }
    }
}

#[cfg(feature = "debug-spi")]
impl SpiEngine for SimulatedSpi {
    fn debug_transfer(&mut self, command: &[u8]) {
        self.response = command.to_vec();
        self.board
            .record(HardwareEvent::DebugSpi(command.to_vec()), |_| ());
    }

    fn flash_transfer(&mut self, command: &[u8]) {
        self.response = command.to_vec();
        self.board
            .record(HardwareEvent::FlashSpi(command.to_vec()), |_| ());
    }

    fn response(&self) -> &[u8] {
        &self.response
    }

    fn take_flash_lines(&mut self) {
        self.board.record(HardwareEvent::TakeFlashLines, |state| {
            state.flash_lines = Owner::DebugController
        });
    }

    fn release_flash_lines(&mut self) {
        self.board.record(HardwareEvent::ReleaseFlashLines, |state| {
            state.flash_lines = Owner::Fpga
        });
    }
}

/// How a simulated control transfer ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The host saw the status stage. `response` is what it read during an IN
    /// data stage.
    Completed {
        /// Bytes delivered to the host.
        response: Vec<u8>,
    },
    /// The device stalled the transfer in `stage`.
    Stalled {
        /// The stage that was rejected.
        stage: ControlStage,
    },
}

/// What a setup handler asked the endpoint to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Send these bytes in the IN data stage, or an empty status stage.
    Send(Vec<u8>),
    /// Receive this many bytes in the OUT data stage.
    Receive(usize),
}

/// A simulated endpoint 0 that records what handlers submit.
#[derive(Debug, Default)]
pub struct SimulatedEndpoint {
    halted: bool,
    submissions: Vec<Submission>,
    received: Vec<u8>,
}

impl SimulatedEndpoint {
    /// Create an idle endpoint.
    #[must_use]
    pub fn new() -> Self {
        Default::default()
    }

    /// Halt the endpoint, so every further submission fails.
    pub fn halt(&mut self) {
        self.halted = true;
    }

    /// Submissions made during the current transfer.
    #[must_use]
    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    /// Forget the previous transfer.
    pub fn reset(&mut self) {
        self.submissions.clear();
        self.received.clear();
    }

    /// Run a complete control transfer the way the device stack does.
    ///
    /// `out_data` is what the host sends in an OUT data stage. It is cut to
    /// the length the setup handler armed.
    pub fn run(
        &mut self,
        dispatcher: &mut VendorDispatcher,
        request: &VendorRequest,
        out_data: &[u8],
    ) -> TransferOutcome {
        self.reset();

        if !dispatcher.control_xfer_cb(ControlStage::Setup, request, self) {
            return TransferOutcome::Stalled {
                stage: ControlStage::Setup,
            };
        }

        let response = match self.submissions.last() {
            Some(Submission::Send(data)) => data.clone(),
            Some(Submission::Receive(length)) => {
                let length = (*length).min(out_data.len());
                self.received = out_data[..length].to_vec();
                Vec::new()
            }
            // Accepted without arming anything: nothing for the host.
            None => {
                return TransferOutcome::Stalled {
                    stage: ControlStage::Setup,
                }
            }
        };

        if request.has_data_stage()
            && !dispatcher.control_xfer_cb(ControlStage::Data, request, self)
        {
            return TransferOutcome::Stalled {
                stage: ControlStage::Data,
            };
        }

        // The host has acknowledged the status stage. The device stack does
        // not look at the outcome of this stage any more.
        dispatcher.control_xfer_cb(ControlStage::Ack, request, self);

        TransferOutcome::Completed { response }
    }
}

impl ControlPipe for SimulatedEndpoint {
    fn send(&mut self, request: &VendorRequest, data: &[u8]) -> Result<(), TransferError> {
        if self.halted {
            return Err(TransferError::Stalled);
        }
        if data.len() > CONTROL_BUFFER_SIZE {
            return Err(TransferError::ResponseTooLong {
                len: data.len(),
                max: CONTROL_BUFFER_SIZE,
            });
        }
        if !data.is_empty() && request.direction() != Direction::In {
            return Err(TransferError::WrongDirection {
                expected: Direction::Out,
            });
        }

        let length = data.len().min(usize::from(request.length));
        self.submissions.push(Submission::Send(data[..length].to_vec()));
        Ok(())
    }

    fn receive(&mut self, request: &VendorRequest, length: usize) -> Result<(), TransferError> {
        if self.halted {
            return Err(TransferError::Stalled);
        }
        if length != 0 && request.direction() != Direction::Out {
            return Err(TransferError::WrongDirection {
                expected: Direction::In,
            });
        }

        self.submissions.push(Submission::Receive(length));
        Ok(())
    }

    fn received(&self) -> &[u8] {
        &self.received
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn out_request(request: u8, length: u16) -> VendorRequest {
        VendorRequest {
            request_type: 0x40,
            request,
            value: 0,
            index: 0,
            length,
        }
    }

    fn in_request(request: u8, length: u16) -> VendorRequest {
        VendorRequest {
            request_type: 0xc0,
            ..out_request(request, length)
        }
    }

    #[test]
    fn responses_are_cut_to_the_requested_length() {
        let mut endpoint = SimulatedEndpoint::new();

        endpoint.send(&in_request(0xa0, 4), b"Apollo").unwrap();

        assert_eq!(endpoint.submissions(), &[Submission::Send(b"Apol".to_vec())]);
    }

    #[test]
    fn in_data_on_an_out_request_is_refused() {
        let mut endpoint = SimulatedEndpoint::new();

        assert_eq!(
            endpoint.send(&out_request(0xa0, 4), b"data"),
            Err(TransferError::WrongDirection {
                expected: Direction::Out
            })
        );
        assert!(endpoint.submissions().is_empty());
    }

    #[test]
    fn oversized_responses_are_refused() {
        let mut endpoint = SimulatedEndpoint::new();
        let data = [0; CONTROL_BUFFER_SIZE + 1];

        assert_eq!(
            endpoint.send(&in_request(0xb2, u16::MAX), &data),
            Err(TransferError::ResponseTooLong {
                len: CONTROL_BUFFER_SIZE + 1,
                max: CONTROL_BUFFER_SIZE
            })
        );
    }

    #[test]
    fn halted_endpoint_refuses_everything() {
        let mut endpoint = SimulatedEndpoint::new();
        endpoint.halt();

        assert_eq!(
            endpoint.send(&out_request(0xa1, 0), &[]),
            Err(TransferError::Stalled)
        );
        assert_eq!(
            endpoint.receive(&out_request(0xb1, 4), 4),
            Err(TransferError::Stalled)
        );
    }

    #[test]
    fn jtag_loopback_masks_partial_bytes() {
        let mut jtag = SimulatedJtag::new(SimulatedBoard::new());

        jtag.set_out_buffer(&[0xff, 0xff]);
        jtag.scan(12, false);

        assert_eq!(jtag.in_buffer(), &[0xff, 0x0f]);
    }

    #[test]
    fn board_starts_in_power_on_state() {
        let board = SimulatedBoard::new();

        assert_eq!(board.state(), HardwareState::default());
        assert_eq!(board.state().usb_port, Owner::DebugController);
        assert_eq!(board.state().flash_lines, Owner::Fpga);
        assert!(board.events().is_empty());
    }
}
