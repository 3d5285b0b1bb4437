//! # Control Requests
//!
//! The decoded form of a USB SETUP packet and the stages of the control
//! transfer it starts. For the field layout, see Section "9.3 USB Device
//! Requests" in the USB 2.0 specification.

use std::fmt;

use thiserror::Error;

use super::constants::request_type::{DIRECTION_IN, RECIPIENT_MASK, TYPE_MASK, TYPE_SHIFT};

/// Direction of the data stage of a control transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Host-to-device.
    Out,
    /// Device-to-host.
    In,
}

/// The type bits of `bmRequestType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Kind {
    Standard = 0,
    Class = 1,
    Vendor = 2,
    Reserved = 3,
}

/// The recipient bits of `bmRequestType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Recipient {
    Device,
    Interface,
    Endpoint,
    Other,
    Reserved(u8),
}

/// A decoded `bmRequestType` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestType {
    /// Direction of the data stage, if there is one.
    pub direction: Direction,
    /// Whether the request is defined by the USB spec, a class or the vendor.
    pub kind: Kind,
    /// Whom the request is addressed to.
    pub recipient: Recipient,
}

impl From<u8> for RequestType {
    fn from(value: u8) -> Self {
        let direction = if value & DIRECTION_IN != 0 {
            Direction::In
        } else {
            Direction::Out
        };
        let kind = match (value >> TYPE_SHIFT) & TYPE_MASK {
            0 => Kind::Standard,
            1 => Kind::Class,
            2 => Kind::Vendor,
            _ => Kind::Reserved,
        };
        let recipient = match value & RECIPIENT_MASK {
            0 => Recipient::Device,
            1 => Recipient::Interface,
            2 => Recipient::Endpoint,
            3 => Recipient::Other,
            other => Recipient::Reserved(other),
        };

        Self {
            direction,
            kind,
            recipient,
        }
    }
}

impl From<RequestType> for u8 {
    fn from(ty: RequestType) -> Self {
        let direction = match ty.direction {
            Direction::Out => 0,
            Direction::In => DIRECTION_IN,
        };
        let recipient = match ty.recipient {
            Recipient::Device => 0,
            Recipient::Interface => 1,
            Recipient::Endpoint => 2,
            Recipient::Other => 3,
            Recipient::Reserved(bits) => bits & RECIPIENT_MASK,
        };

        direction | ((ty.kind as u8) << TYPE_SHIFT) | recipient
    }
}

/// Represent a vendor control request.
///
/// The device stack hands the same request to every stage of one control
/// transfer. It is never kept beyond that transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorRequest {
    /// The raw `bmRequestType`, see [`RequestType`].
    pub request_type: u8,
    /// The vendor opcode.
    pub request: u8,
    /// Opcode-specific parameter, e.g. the LED pattern.
    pub value: u16,
    /// Opcode-specific parameter, e.g. the descriptor index.
    pub index: u16,
    /// Number of bytes in the data stage (OUT) or the most the host accepts
    /// (IN).
    pub length: u16,
}

#[allow(missing_docs)]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SetupPacketError {
    #[error("SETUP packets are 8 bytes long, got {0}")]
    WrongLength(usize),
    #[error("Not a vendor request: bmRequestType {0:#04x}")]
    NotVendor(u8),
}

impl VendorRequest {
    /// Decode an 8-byte SETUP packet.
    ///
    /// Only vendor requests are accepted; standard and class requests are
    /// answered elsewhere in the device stack.
    pub fn from_setup_packet(packet: &[u8]) -> Result<Self, SetupPacketError> {
        let packet: &[u8; 8] = packet
            .try_into()
            .map_err(|_| SetupPacketError::WrongLength(packet.len()))?;

        let request = Self {
            request_type: packet[0],
            request: packet[1],
            value: u16::from_le_bytes([packet[2], packet[3]]),
            index: u16::from_le_bytes([packet[4], packet[5]]),
            length: u16::from_le_bytes([packet[6], packet[7]]),
        };

        match request.kind().kind {
            Kind::Vendor => Ok(request),
            _ => Err(SetupPacketError::NotVendor(request.request_type)),
        }
    }

    /// Generates the byte representation of the SETUP packet.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut packet = [0; 8];

        packet[0] = self.request_type;
        packet[1] = self.request;
        packet[2..4].copy_from_slice(&self.value.to_le_bytes());
        packet[4..6].copy_from_slice(&self.index.to_le_bytes());
        packet[6..8].copy_from_slice(&self.length.to_le_bytes());

        packet
    }

    /// Decode `bmRequestType`.
    #[must_use]
    pub fn kind(&self) -> RequestType {
        RequestType::from(self.request_type)
    }

    /// Direction of the data stage.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.kind().direction
    }

    /// Zero-length transfers go straight from SETUP to the status stage.
    #[must_use]
    pub const fn has_data_stage(&self) -> bool {
        self.length != 0
    }
}

/// The points in a control transfer at which the vendor layer is invoked.
///
/// For one transfer they always occur in declaration order. `Data` is skipped
/// when [`VendorRequest::has_data_stage`] is false.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlStage {
    /// The SETUP packet has arrived.
    Setup,
    /// The data stage has completed; OUT payloads are now available.
    Data,
    /// The host has acknowledged the status stage.
    Ack,
}

impl fmt::Display for ControlStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Setup => "setup",
            Self::Data => "data",
            Self::Ack => "status acknowledgment",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_vendor_in_packet() {
        let packet = [0xc1, 0xee, 0x00, 0x00, 0x04, 0x00, 0x28, 0x00];
        let request = VendorRequest::from_setup_packet(&packet).unwrap();

        assert_eq!(request.request, 0xee);
        assert_eq!(request.value, 0);
        assert_eq!(request.index, 0x0004);
        assert_eq!(request.length, 0x28);
        assert_eq!(
            request.kind(),
            RequestType {
                direction: Direction::In,
                kind: Kind::Vendor,
                recipient: Recipient::Interface,
            }
        );
        assert_eq!(request.to_bytes(), packet);
    }

    #[test]
    fn standard_requests_are_refused() {
        // GET_DESCRIPTOR(Device)
        let packet = [0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x12, 0x00];

        assert_eq!(
            VendorRequest::from_setup_packet(&packet),
            Err(SetupPacketError::NotVendor(0x80))
        );
    }

    #[test]
    fn short_packets_are_refused() {
        assert_eq!(
            VendorRequest::from_setup_packet(&[0x40, 0xa0]),
            Err(SetupPacketError::WrongLength(2))
        );
    }

    #[test]
    fn request_type_encoding() {
        let out_to_device = RequestType {
            direction: Direction::Out,
            kind: Kind::Vendor,
            recipient: Recipient::Device,
        };

        assert_eq!(u8::from(out_to_device), 0x40);
        assert_eq!(RequestType::from(0x40), out_to_device);
    }

    #[test]
    fn zero_length_requests_skip_the_data_stage() {
        let request = VendorRequest {
            request_type: 0x40,
            request: 0xa1,
            value: 3,
            index: 0,
            length: 0,
        };

        assert!(!request.has_data_stage());
        assert!(VendorRequest { length: 1, ..request }.has_data_stage());
    }
}
