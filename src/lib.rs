//! # Apollo Vendor Requests
//!
//! This crate contains the vendor-request layer of the Apollo debug module.
//! It steers USB control transfers carrying one of the vendor opcodes through
//! their setup, data and status stages to the handler that implements them.
//!
//! Start at [`device::vendor::VendorDispatcher`].

pub mod device;
