//! Per-queue configuration and the validation invariants enforced at setup
//! time (spec.md §3 "Queue configuration", §4.7).

use crate::error::ConfigError;

pub const MIN_RING_DESC: u16 = 64;
pub const MAX_RING_DESC: u16 = 4096;
pub const RING_DESC_ALIGN: u16 = 32;

/// Minimum `rx_free_thresh` for the bulk-alloc Rx path's 8-descriptor
/// look-ahead to have room to work (spec.md §4.2).
pub const RX_BULK_ALLOC_MIN_FREE_THRESH: u16 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxQueueConfig {
    pub nb_desc: u16,
    pub rx_free_thresh: u16,
    pub crc_len: u16,
    pub scattered: bool,
    pub socket: crate::external::NumaSocket,
}

impl RxQueueConfig {
    /// Validates the invariants spec.md §3/§4.7 place on an Rx queue before
    /// any DMA zone or software ring is allocated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nb_desc < MIN_RING_DESC
            || self.nb_desc > MAX_RING_DESC
            || self.nb_desc % RING_DESC_ALIGN != 0
        {
            return Err(ConfigError::BadRingSize(self.nb_desc));
        }
        if self.rx_free_thresh >= self.nb_desc {
            return Err(ConfigError::RxFreeThreshTooLarge {
                thresh: self.rx_free_thresh,
                nb_desc: self.nb_desc,
            });
        }
        if self.nb_desc % self.rx_free_thresh != 0 {
            return Err(ConfigError::RxFreeThreshNotDivisor {
                thresh: self.rx_free_thresh,
                nb_desc: self.nb_desc,
            });
        }
        if self.crc_len != 0 && self.crc_len != 4 {
            return Err(ConfigError::BadCrcLen(self.crc_len));
        }
        Ok(())
    }

    /// Whether this queue qualifies for the bulk-alloc Rx path's 8-descriptor
    /// look-ahead (spec.md §4.2). A queue that does not meet this still
    /// validates; `RxMode::select` just falls back to the single-buffer path
    /// for it instead of failing setup.
    pub fn bulk_alloc_capable(&self) -> bool {
        !self.scattered && self.rx_free_thresh >= RX_BULK_ALLOC_MIN_FREE_THRESH
    }
}

bitflags::bitflags! {
    /// Per-queue Tx behavior flags (spec.md §3 "Configuration", §4.5 step 1).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TxqFlags: u32 {
        /// Buffers posted to this queue are never shared (no external
        /// refcount holder), so the simple path's bulk-free can return them
        /// straight to the mempool instead of going through a per-segment
        /// free that checks a refcount first.
        const NOREFCOUNT = 1 << 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxQueueConfig {
    pub nb_desc: u16,
    pub tx_rs_thresh: u16,
    pub tx_free_thresh: u16,
    pub txq_flags: TxqFlags,
    pub socket: crate::external::NumaSocket,
}

impl TxQueueConfig {
    /// Whether the simple, no-offload Tx fast path may be selected for this
    /// queue (spec.md §4.5): it requires a large enough RS group that the
    /// O(1) pacing cursors stay meaningfully ahead of the ring.
    pub fn simple_path_eligible(&self) -> bool {
        self.tx_rs_thresh >= 32
    }

    /// Validates the invariants spec.md §3/§4.7 place on a Tx queue.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nb_desc < MIN_RING_DESC
            || self.nb_desc > MAX_RING_DESC
            || self.nb_desc % RING_DESC_ALIGN != 0
        {
            return Err(ConfigError::BadRingSize(self.nb_desc));
        }
        if self.tx_rs_thresh == 0 {
            return Err(ConfigError::TxRsThreshZero);
        }
        let rs_limit = self.nb_desc - 2;
        if self.tx_rs_thresh >= rs_limit {
            return Err(ConfigError::TxRsThreshTooLarge {
                thresh: self.tx_rs_thresh,
                limit: rs_limit,
            });
        }
        if self.tx_free_thresh == 0 {
            return Err(ConfigError::TxFreeThreshZero);
        }
        let free_limit = self.nb_desc - 3;
        if self.tx_free_thresh >= free_limit {
            return Err(ConfigError::TxFreeThreshTooLarge {
                thresh: self.tx_free_thresh,
                limit: free_limit,
            });
        }
        if self.tx_rs_thresh > self.tx_free_thresh {
            return Err(ConfigError::TxRsThreshAboveFreeThresh {
                thresh: self.tx_rs_thresh,
                free_thresh: self.tx_free_thresh,
            });
        }
        if self.nb_desc % self.tx_rs_thresh != 0 {
            return Err(ConfigError::TxRsThreshNotDivisor {
                thresh: self.tx_rs_thresh,
                nb_desc: self.nb_desc,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::NumaSocket;

    fn valid_rx() -> RxQueueConfig {
        RxQueueConfig {
            nb_desc: 128,
            rx_free_thresh: 32,
            crc_len: 0,
            scattered: false,
            socket: NumaSocket(0),
        }
    }

    fn valid_tx() -> TxQueueConfig {
        TxQueueConfig {
            nb_desc: 128,
            tx_rs_thresh: 32,
            tx_free_thresh: 32,
            txq_flags: TxqFlags::empty(),
            socket: NumaSocket(0),
        }
    }

    #[test]
    fn accepts_well_formed_rx_config() {
        assert!(valid_rx().validate().is_ok());
    }

    #[test]
    fn rejects_ring_size_not_multiple_of_32() {
        let mut c = valid_rx();
        c.nb_desc = 130;
        assert_eq!(c.validate(), Err(ConfigError::BadRingSize(130)));
    }

    #[test]
    fn small_free_thresh_still_validates_but_loses_bulk_alloc_eligibility() {
        let mut c = valid_rx();
        c.rx_free_thresh = 8;
        assert!(c.validate().is_ok());
        assert!(!c.bulk_alloc_capable());
    }

    #[test]
    fn scattered_rx_is_never_bulk_alloc_capable() {
        let mut c = valid_rx();
        c.scattered = true;
        assert!(c.validate().is_ok());
        assert!(!c.bulk_alloc_capable());
    }

    #[test]
    fn accepts_well_formed_tx_config() {
        assert!(valid_tx().validate().is_ok());
    }

    #[test]
    fn rejects_rs_thresh_above_free_thresh() {
        let mut c = valid_tx();
        c.tx_rs_thresh = 64;
        c.tx_free_thresh = 32;
        assert!(matches!(
            c.validate(),
            Err(ConfigError::TxRsThreshAboveFreeThresh { .. })
        ));
    }

    #[test]
    fn simple_path_requires_rs_thresh_of_at_least_32() {
        let mut c = valid_tx();
        assert!(c.simple_path_eligible());
        c.tx_rs_thresh = 16;
        c.tx_free_thresh = 16;
        assert!(!c.simple_path_eligible());
    }

    #[test]
    fn norefcount_flag_roundtrips() {
        let mut c = valid_tx();
        assert!(!c.txq_flags.contains(TxqFlags::NOREFCOUNT));
        c.txq_flags |= TxqFlags::NOREFCOUNT;
        assert!(c.txq_flags.contains(TxqFlags::NOREFCOUNT));
    }
}
