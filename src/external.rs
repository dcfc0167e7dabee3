//! Interfaces to the collaborators spec.md §1 explicitly treats as external:
//! PCI/device bring-up, physical memory, and the mempool allocator. This
//! crate never implements these traits; a platform layer does, the same way
//! hermit's `drivers::net::*` modules reach `mm::device_alloc::DeviceAlloc`
//! and `arch::mm::paging::virt_to_phys` through a seam rather than owning
//! page tables themselves.

use core::fmt;

/// A DMA-coherent allocation backing one hardware ring.
///
/// Base address must be 128-byte aligned and the total size 4 KiB aligned
/// (spec.md §3). Implementors are responsible for actually satisfying that;
/// the core only ever calls `as_mut_ptr`/`phys_addr` and trusts the result.
pub trait DmaZone {
    /// Host-virtual pointer to the start of the zone.
    fn as_mut_ptr(&mut self) -> *mut u8;

    /// Device-visible (physical/IOVA) address of the zone, used to program
    /// the ring base address registers at queue start.
    fn phys_addr(&self) -> u64;

    /// Size in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The write-only MMIO tail register for one Rx or Tx queue (spec.md §2
/// item 2, §6). A single `write` maps to the queue's RDT/TDT register.
///
/// Every call site precedes `write` with [`write_barrier`] as required by
/// spec.md §5; the trait does not do this itself so the barrier is visible
/// at the call site, matching the explicit `fence(Ordering::SeqCst)` calls
/// in the virtqueue push path this crate is modeled on.
pub trait TailRegister {
    fn write(&mut self, value: u32);
}

/// Write-memory barrier: must be issued before every tail register write so
/// the device observes ring writes before the tail advance (spec.md §5).
#[inline(always)]
pub fn write_barrier() {
    core::sync::atomic::fence(core::sync::atomic::Ordering::Release);
}

/// Read-memory barrier: issued after scanning a group of descriptor
/// statuses back-to-front so an observed DD bit implies its earlier
/// siblings' writebacks are visible too (spec.md §4.2, §5).
#[inline(always)]
pub fn read_barrier() {
    core::sync::atomic::fence(core::sync::atomic::Ordering::Acquire);
}

/// Queue→VSI/traffic-class lookup (Glossary "VSI"). The core only ever
/// consults this at setup time to record where a queue lives; it never
/// programs VSI state itself.
pub trait VsiMap {
    /// Returns the (vsi_id, queue_within_vsi) pair for a port-relative queue
    /// index, or `None` if the queue is not mapped to any VSI yet.
    fn lookup(&self, port: u16, queue_id: u16) -> Option<(u16, u16)>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumaSocket(pub i32);

impl fmt::Display for NumaSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "socket {}", self.0)
    }
}
