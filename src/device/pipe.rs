//! # Control Pipe
//!
//! This module exposes the [`ControlPipe`] trait, which is implemented by the
//! USB device stack that owns endpoint 0. Vendor request handlers use it to
//! move the bytes of a control transfer without any knowledge of the device
//! controller underneath.

use std::fmt::Debug;

use thiserror::Error;

use super::request::{Direction, VendorRequest};

/// Reasons the device stack refuses a transfer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// The control endpoint is halted.
    #[error("The control endpoint stalled")]
    Stalled,
    /// The response does not fit the endpoint 0 transfer buffer.
    #[error("Response of {len} bytes exceeds the {max} byte control buffer")]
    ResponseTooLong {
        /// Bytes the handler wanted to send.
        len: usize,
        /// Capacity of the transfer buffer.
        max: usize,
    },
    /// The handler tried to move data against the request's direction.
    #[error("The data stage of this request is {expected:?}")]
    WrongDirection {
        /// The direction `bmRequestType` announced.
        expected: Direction,
    },
}

/// The control transfer primitive of the device stack.
///
/// One transfer is in flight at a time. Handlers call exactly one of
/// [`send`](ControlPipe::send) or [`receive`](ControlPipe::receive) during the
/// setup stage to accept the request; whatever they return without doing so
/// leaves the stack to stall.
pub trait ControlPipe: Debug {
    /// Accept `request` and queue `data` for its IN data stage.
    ///
    /// An empty `data` accepts the request with a zero-length status stage.
    /// The stack never sends more than the host asked for in
    /// [`VendorRequest::length`].
    fn send(&mut self, request: &VendorRequest, data: &[u8]) -> Result<(), TransferError>;

    /// Accept `request` and arm the OUT data stage for `length` bytes.
    fn receive(&mut self, request: &VendorRequest, length: usize) -> Result<(), TransferError>;

    /// The payload of the completed OUT data stage.
    ///
    /// Only meaningful during the data stage of a transfer that armed
    /// [`receive`](ControlPipe::receive).
    fn received(&self) -> &[u8];
}

/// Acknowledge `request` with an empty status stage.
pub fn acknowledge(
    pipe: &mut dyn ControlPipe,
    request: &VendorRequest,
) -> Result<(), TransferError> {
    pipe.send(request, &[])
}
