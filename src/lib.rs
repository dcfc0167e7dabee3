//! Poll-mode data-plane core for the XL710 (i40e) 40GbE family.
//!
//! Covers the Rx/Tx descriptor rings, queue lifecycle, and mode selection
//! between the single-buffer, bulk-alloc and scattered Rx paths and the
//! full-featured and simple Tx paths. PCI/device bring-up, physical memory
//! management and the mempool allocator itself are external collaborators
//! reached through the traits in [`external`] and [`mempool`].
#![no_std]

extern crate alloc;

pub mod config;
pub mod descriptor;
pub mod error;
pub mod external;
pub mod mempool;
pub mod mode;
pub mod ptype;
pub mod queue;
pub mod rx;
pub mod sw_ring;
pub mod tx;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{RxQueueConfig, TxQueueConfig};
pub use error::{ConfigError, OffloadErrno, PrepareError};
pub use external::{DmaZone, TailRegister, VsiMap};
pub use mempool::{Mbuf, Mempool, OlFlags, PacketType, PktHash};
pub use queue::{RxQueue, TxQueue};
