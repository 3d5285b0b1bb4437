//! # Device Side of the Vendor Interface
//!
//! Everything needed to answer vendor requests on the debug controller: the
//! decoded [`request`], the [`pipe`] into the USB device stack, the
//! [`hardware`] collaborators that vendor requests act on and the [`vendor`]
//! dispatch layer itself. [`sim`] provides in-memory stand-ins for the
//! hardware and the device stack.

#![deny(missing_docs)]
#![deny(rustdoc::all)]
#![deny(clippy::must_use_candidate)]
#![deny(missing_debug_implementations)]

pub mod constants;
pub mod hardware;
pub mod pipe;
pub mod request;
pub mod sim;
pub mod vendor;
