//! Software shadow rings tracking the buffer owning each hardware slot
//! (spec.md §2 item 3, §9 "cyclic next_id/last_id references").
//!
//! Hardware descriptors carry no buffer identity once overwritten with a
//! replacement address, so the driver keeps its own parallel array indexed
//! the same way as the hardware ring.

use alloc::vec::Vec;

use crate::mempool::Mbuf;

/// One entry per Rx hardware descriptor: the buffer currently posted there.
pub struct RxSwRing<B: Mbuf> {
    entries: Vec<Option<B>>,
}

impl<B: Mbuf> RxSwRing<B> {
    pub fn new(nb_desc: u16) -> Self {
        RxSwRing {
            entries: alloc::vec![None; nb_desc as usize],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn get(&self, idx: u16) -> Option<B> {
        self.entries[idx as usize]
    }

    #[inline]
    pub fn set(&mut self, idx: u16, buf: Option<B>) {
        self.entries[idx as usize] = buf;
    }

    #[inline]
    pub fn take(&mut self, idx: u16) -> Option<B> {
        self.entries[idx as usize].take()
    }
}

/// One entry per Tx hardware descriptor, plus the `next_id`/`last_id`
/// chaining used by the cleanup protocol (spec.md §4.4.1): each RS-marked
/// descriptor's sw_ring slot records the index of the *last* descriptor of
/// the packet group it closes, so a single writeback DD observation can
/// reclaim every buffer back to the previous RS mark in one pass.
pub struct TxSwRing<B: Mbuf> {
    entries: Vec<TxEntry<B>>,
}

#[derive(Clone, Copy)]
struct TxEntry<B: Mbuf> {
    mbuf: Option<B>,
    last_id: u16,
}

impl<B: Mbuf> TxSwRing<B> {
    pub fn new(nb_desc: u16) -> Self {
        TxSwRing {
            entries: alloc::vec![
                TxEntry {
                    mbuf: None,
                    last_id: 0
                };
                nb_desc as usize
            ],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn mbuf(&self, idx: u16) -> Option<B> {
        self.entries[idx as usize].mbuf
    }

    #[inline]
    pub fn set_mbuf(&mut self, idx: u16, buf: Option<B>) {
        self.entries[idx as usize].mbuf = buf;
    }

    #[inline]
    pub fn take_mbuf(&mut self, idx: u16) -> Option<B> {
        self.entries[idx as usize].mbuf.take()
    }

    #[inline]
    pub fn last_id(&self, idx: u16) -> u16 {
        self.entries[idx as usize].last_id
    }

    #[inline]
    pub fn set_last_id(&mut self, idx: u16, last: u16) {
        self.entries[idx as usize].last_id = last;
    }
}
