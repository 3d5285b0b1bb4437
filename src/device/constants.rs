//! # Vendor Interface Constants
//!
//! This module collects the numeric assignments of the vendor interface. The
//! opcode values are shared with the host tooling, so changing any of them
//! breaks the protocol.

// Allow missing docs to avoid repeating the opcode table for all constants.
#![allow(missing_docs)]

/// Vendor request codes (`bRequest`), grouped by function.
pub mod request {
    // Identification and status.
    pub const GET_ID: u8 = 0xa0;
    pub const SET_LED_PATTERN: u8 = 0xa1;

    // JTAG requests.
    pub const JTAG_CLEAR_OUT_BUFFER: u8 = 0xb0;
    pub const JTAG_SET_OUT_BUFFER: u8 = 0xb1;
    pub const JTAG_GET_IN_BUFFER: u8 = 0xb2;
    pub const JTAG_SCAN: u8 = 0xb3;
    pub const JTAG_RUN_CLOCK: u8 = 0xb4;
    pub const JTAG_GOTO_STATE: u8 = 0xb5;
    pub const JTAG_GET_STATE: u8 = 0xb6;
    pub const JTAG_BULK_SCAN: u8 = 0xb7;
    pub const JTAG_STOP: u8 = 0xbe;
    pub const JTAG_START: u8 = 0xbf;

    // General programming requests.
    pub const TRIGGER_RECONFIGURATION: u8 = 0xc0;
    pub const FORCE_FPGA_OFFLINE: u8 = 0xc1;
    pub const ALLOW_FPGA_TAKEOVER_USB: u8 = 0xc2;

    // Debug and configuration flash SPI requests.
    pub const DEBUG_SPI_SEND: u8 = 0x50;
    pub const DEBUG_SPI_READ_RESPONSE: u8 = 0x51;
    pub const FLASH_SPI_SEND: u8 = 0x52;
    pub const TAKE_FLASH_LINES: u8 = 0x53;
    pub const RELEASE_FLASH_LINES: u8 = 0x54;

    // Self-test requests.
    pub const GET_RAIL_VOLTAGE: u8 = 0xe0;

    /// Microsoft OS 1.0 descriptor request. Windows issues this with the
    /// vendor code advertised in the OS string descriptor.
    pub const GET_MS_DESCRIPTOR: u8 = 0xee;
}

/// Constants for the `bmRequestType` field of a SETUP packet.
pub mod request_type {
    pub const DIRECTION_IN: u8 = 1 << 7;
    pub const TYPE_SHIFT: u8 = 5;
    pub const TYPE_MASK: u8 = 0x3;
    pub const RECIPIENT_MASK: u8 = 0x1f;
}

/// The response to [`GET_ID`](request::GET_ID), NUL terminator included.
pub const IDENTITY: &[u8] = b"Apollo Debug Module\0";

/// Size in bytes of the JTAG engine's scan buffers.
pub const JTAG_BUFFER_SIZE: usize = 256;

/// Largest scan the JTAG engine accepts, in bits.
pub const JTAG_MAX_SCAN_BITS: usize = JTAG_BUFFER_SIZE * 8;

/// Size in bytes of the SPI engine's command/response buffer.
pub const SPI_BUFFER_SIZE: usize = 256;

/// Constants of the Microsoft OS 1.0 Extended Compat ID descriptor.
pub mod ms_os_descriptor {
    /// The only `wIndex` for which the descriptor is served.
    pub const COMPAT_ID_INDEX: u16 = 0x0004;

    /// Descriptor format version, BCD.
    pub const BCD_VERSION: u16 = 0x0100;

    /// Total length of the descriptor: a 16-byte header and one 24-byte
    /// function section.
    pub const LENGTH: usize = 40;

    /// Interface the generic driver binds to.
    pub const FIRST_INTERFACE: u8 = 0x02;

    pub const COMPATIBLE_ID: [u8; 8] = *b"WINUSB\0\0";
}
