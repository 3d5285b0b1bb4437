//! # Hardware Collaborators
//!
//! Vendor requests act on hardware that is driven by other parts of the
//! firmware: the status LEDs, the FPGA configuration lines, the USB port
//! switch, the JTAG engine and (on boards that route them) the debug and
//! configuration flash SPI lines. This module defines the interface each of
//! them presents and bundles them into a [`DeviceContext`].
//!
//! Each collaborator exclusively owns the state it drives. The vendor layer
//! never reads or caches that state; it only calls into it.

use std::fmt::Debug;

use super::vendor::StatusAcknowledged;

/// The LED pattern scheduler.
pub trait Leds: Debug {
    /// Switch to blink pattern `pattern`. Setting the active pattern again
    /// changes nothing.
    fn set_blink_pattern(&mut self, pattern: u16);
}

/// The FPGA reconfiguration and offline control driver.
pub trait FpgaControl: Debug {
    /// Pulse PROGRAM so the FPGA reloads its configuration from flash.
    fn trigger_reconfiguration(&mut self);

    /// Hold the FPGA in reset so a broken bitstream cannot take the board
    /// down with it.
    fn force_offline(&mut self);
}

/// The switch that connects the shared USB port to either the debug
/// controller or the FPGA.
pub trait UsbSwitch: Debug {
    /// Hand the USB differential pair to the FPGA.
    ///
    /// The debug controller drops off the bus once this returns.
    fn hand_off_to_fpga(&mut self, ack: &StatusAcknowledged);
}

/// States of the IEEE 1149.1 TAP controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
#[repr(u8)]
pub enum TapState {
    TestLogicReset = 0,
    RunTestIdle = 1,
    SelectDrScan = 2,
    CaptureDr = 3,
    ShiftDr = 4,
    Exit1Dr = 5,
    PauseDr = 6,
    Exit2Dr = 7,
    UpdateDr = 8,
    SelectIrScan = 9,
    CaptureIr = 10,
    ShiftIr = 11,
    Exit1Ir = 12,
    PauseIr = 13,
    Exit2Ir = 14,
    UpdateIr = 15,
}

impl TryFrom<u16> for TapState {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        use TapState::*;

        const STATES: [TapState; 16] = [
            TestLogicReset,
            RunTestIdle,
            SelectDrScan,
            CaptureDr,
            ShiftDr,
            Exit1Dr,
            PauseDr,
            Exit2Dr,
            UpdateDr,
            SelectIrScan,
            CaptureIr,
            ShiftIr,
            Exit1Ir,
            PauseIr,
            Exit2Ir,
            UpdateIr,
        ];

        STATES.get(usize::from(value)).copied().ok_or(value)
    }
}

/// The JTAG bit-banging engine and its scan buffers.
pub trait JtagEngine: Debug {
    /// Claim the JTAG pins.
    fn start(&mut self);

    /// Release the JTAG pins.
    fn stop(&mut self);

    /// Zero the outgoing scan buffer.
    fn clear_out_buffer(&mut self);

    /// Load `data` into the start of the outgoing scan buffer.
    fn set_out_buffer(&mut self, data: &[u8]);

    /// The bits captured by the last scan.
    fn in_buffer(&self) -> &[u8];

    /// Shift `bits` bits from the outgoing buffer into the incoming one.
    ///
    /// With `advance_state`, TMS is raised on the last bit so the TAP leaves
    /// the shift state.
    fn scan(&mut self, bits: usize, advance_state: bool);

    /// Toggle TCK `cycles` times with TMS held at `tms`.
    fn run_clock(&mut self, cycles: u16, tms: bool);

    /// Walk the TAP to `state` along the shortest path.
    fn goto_state(&mut self, state: TapState);

    /// The state the TAP is believed to be in.
    fn state(&self) -> TapState;
}

/// Owner of the SPI lines to the FPGA's debug port and to its configuration
/// flash.
#[cfg(feature = "debug-spi")]
pub trait SpiEngine: Debug {
    /// Run one transaction on the debug SPI port.
    fn debug_transfer(&mut self, command: &[u8]);

    /// Run one transaction on the configuration flash.
    ///
    /// The flash lines must have been taken first.
    fn flash_transfer(&mut self, command: &[u8]);

    /// The bytes clocked in during the last transaction.
    fn response(&self) -> &[u8];

    /// Take the configuration flash lines away from the FPGA.
    fn take_flash_lines(&mut self);

    /// Give the configuration flash lines back to the FPGA.
    fn release_flash_lines(&mut self);
}

/// The hardware a vendor request may act on.
///
/// This handle is passed to every handler. A handler touches only the
/// collaborator its opcode is about.
#[derive(Debug)]
pub struct DeviceContext {
    /// The LED pattern scheduler.
    pub leds: Box<dyn Leds>,
    /// FPGA configuration lines.
    pub fpga: Box<dyn FpgaControl>,
    /// USB port ownership.
    pub usb_switch: Box<dyn UsbSwitch>,
    /// The JTAG engine.
    pub jtag: Box<dyn JtagEngine>,
    /// Debug and configuration flash SPI.
    #[cfg(feature = "debug-spi")]
    pub spi: Box<dyn SpiEngine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tap_state_from_request_value() {
        assert_eq!(TapState::try_from(0), Ok(TapState::TestLogicReset));
        assert_eq!(TapState::try_from(11), Ok(TapState::ShiftIr));
        assert_eq!(TapState::try_from(15), Ok(TapState::UpdateIr));
        assert_eq!(TapState::try_from(16), Err(16));
    }

    #[test]
    fn tap_state_numbering_is_dense() {
        for value in 0..16u16 {
            let state = TapState::try_from(value).unwrap();
            assert_eq!(u16::from(state as u8), value);
        }
    }
}
