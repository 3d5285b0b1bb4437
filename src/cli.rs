//! This module implements the CLI interface.
//!
//! A request is given either field by field (`--request`, `--value`, ...) or
//! as a raw 8-byte SETUP packet with `--setup`.
use std::num::ParseIntError;

use anyhow::{bail, Context, Result};
use clap::Parser;

use apollo_vendor::device::request::{Direction, Kind, Recipient, RequestType, VendorRequest};

/// Bytes given as a hex string, e.g. `9f00`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None
)]
pub struct Cli {
    /// Enable verbose logging. Can be specified multiple times to
    /// increase verbosity.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print the opcode table and exit.
    #[arg(long)]
    pub list: bool,

    /// Vendor opcode (bRequest), decimal or 0x-prefixed hex.
    #[arg(long, value_parser = parse_u8, required_unless_present_any = ["list", "setup"])]
    request: Option<u8>,

    /// The request's wValue.
    #[arg(long, value_parser = parse_u16, default_value = "0")]
    value: u16,

    /// The request's wIndex.
    #[arg(long, value_parser = parse_u16, default_value = "0")]
    index: u16,

    /// The request's wLength. Defaults to the payload length for OUT
    /// requests and to 64 for IN requests.
    #[arg(long, value_parser = parse_u16)]
    length: Option<u16>,

    /// Make this a device-to-host (IN) request.
    #[arg(long = "in", conflicts_with = "data")]
    device_to_host: bool,

    /// Payload of the OUT data stage, as hex.
    #[arg(long, value_parser = parse_hex)]
    data: Option<HexBytes>,

    /// A raw SETUP packet as 16 hex digits. This option is mutually
    /// exclusive with --request.
    #[arg(long, value_parser = parse_hex, conflicts_with = "request")]
    setup: Option<HexBytes>,
}

impl Cli {
    /// The request to replay.
    pub fn vendor_request(&self) -> Result<VendorRequest> {
        if let Some(HexBytes(packet)) = &self.setup {
            return VendorRequest::from_setup_packet(packet).context("Invalid --setup packet");
        }

        let Some(request) = self.request else {
            bail!("No request given");
        };
        let direction = if self.device_to_host {
            Direction::In
        } else {
            Direction::Out
        };
        let length = match (self.length, direction) {
            (Some(length), _) => length,
            (None, Direction::In) => 64,
            (None, Direction::Out) => u16::try_from(self.payload().len())
                .context("OUT payload does not fit into wLength")?,
        };

        Ok(VendorRequest {
            request_type: RequestType {
                direction,
                kind: Kind::Vendor,
                recipient: Recipient::Device,
            }
            .into(),
            request,
            value: self.value,
            index: self.index,
            length,
        })
    }

    /// What the host sends in the OUT data stage.
    pub fn payload(&self) -> &[u8] {
        self.data.as_ref().map_or(&[], |HexBytes(data)| data.as_slice())
    }
}

fn parse_number(s: &str) -> Result<u32, ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

fn parse_u8(s: &str) -> Result<u8, String> {
    let n = parse_number(s).map_err(|e| e.to_string())?;
    u8::try_from(n).map_err(|_| format!("{s} does not fit into a byte"))
}

fn parse_u16(s: &str) -> Result<u16, String> {
    let n = parse_number(s).map_err(|e| e.to_string())?;
    u16::try_from(n).map_err(|_| format!("{s} does not fit into 16 bits"))
}

fn parse_hex(s: &str) -> Result<HexBytes, String> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.len() % 2 != 0 {
        return Err("hex strings need an even number of digits".to_string());
    }

    (0..s.len())
        .step_by(2)
        .map(|i| {
            s.get(i..i + 2)
                .and_then(|byte| u8::from_str_radix(byte, 16).ok())
                .ok_or_else(|| format!("{s} is not a hex string"))
        })
        .collect::<Result<Vec<u8>, String>>()
        .map(HexBytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_in_decimal_and_hex() {
        assert_eq!(parse_u8("0xa0"), Ok(0xa0));
        assert_eq!(parse_u8("160"), Ok(0xa0));
        assert!(parse_u8("0x100").is_err());
        assert_eq!(parse_u16("0x0004"), Ok(4));
    }

    #[test]
    fn hex_payloads() {
        assert_eq!(parse_hex("9f00"), Ok(HexBytes(vec![0x9f, 0x00])));
        assert_eq!(parse_hex(""), Ok(HexBytes(vec![])));
        assert!(parse_hex("9f0").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn in_requests_default_to_64_bytes() {
        let cli = Cli::parse_from(["apollo-vendor", "--request", "0xa0", "--in"]);
        let request = cli.vendor_request().unwrap();

        assert_eq!(request.request_type, 0xc0);
        assert_eq!(request.request, 0xa0);
        assert_eq!(request.length, 64);
    }

    #[test]
    fn out_requests_default_to_payload_length() {
        let cli = Cli::parse_from(["apollo-vendor", "--request", "0x50", "--data", "9f0000"]);
        let request = cli.vendor_request().unwrap();

        assert_eq!(request.request_type, 0x40);
        assert_eq!(request.length, 3);
        assert_eq!(cli.payload(), &[0x9f, 0x00, 0x00]);
    }

    #[test]
    fn raw_setup_packets() {
        let cli = Cli::parse_from(["apollo-vendor", "--setup", "c1ee000004002800"]);
        let request = cli.vendor_request().unwrap();

        assert_eq!(request.request, 0xee);
        assert_eq!(request.index, 4);
        assert_eq!(request.length, 40);

        let cli = Cli::parse_from(["apollo-vendor", "--setup", "8006000100001200"]);
        assert!(cli.vendor_request().is_err());
    }
}
