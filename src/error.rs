//! Error types surfaced at the two places the core is allowed to fail
//! synchronously: queue setup and packet preflight. The burst entry points
//! themselves never return `Result` — see `rx::` and `tx::`.

use thiserror::Error;

/// Raised by `rx_queue_setup`/`tx_queue_setup` when the caller's
/// configuration violates one of the invariants in the data model. No queue
/// is installed when this is returned.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("nb_desc {0} is out of range [64, 4096] or not a multiple of 32")]
    BadRingSize(u16),
    #[error("rx_free_thresh {thresh} must be < nb_rx_desc {nb_desc}")]
    RxFreeThreshTooLarge { thresh: u16, nb_desc: u16 },
    #[error("nb_rx_desc {nb_desc} is not a multiple of rx_free_thresh {thresh}")]
    RxFreeThreshNotDivisor { thresh: u16, nb_desc: u16 },
    #[error("crc_len must be 0 or 4, got {0}")]
    BadCrcLen(u16),
    #[error("tx_rs_thresh {0} must be >= 1")]
    TxRsThreshZero,
    #[error("tx_rs_thresh {thresh} must be < nb_tx_desc - 2 ({limit})")]
    TxRsThreshTooLarge { thresh: u16, limit: u16 },
    #[error("tx_rs_thresh {thresh} must be <= tx_free_thresh {free_thresh}")]
    TxRsThreshAboveFreeThresh { thresh: u16, free_thresh: u16 },
    #[error("tx_rs_thresh {thresh} does not divide nb_tx_desc {nb_desc}")]
    TxRsThreshNotDivisor { thresh: u16, nb_desc: u16 },
    #[error("tx_free_thresh {0} must be >= 1")]
    TxFreeThreshZero,
    #[error("tx_free_thresh {thresh} must be < nb_tx_desc - 3 ({limit})")]
    TxFreeThreshTooLarge { thresh: u16, limit: u16 },
    #[error("DMA zone allocation failed for {0} descriptors")]
    DmaAllocFailed(u16),
    #[error("software ring allocation failed for {0} slots")]
    SwRingAllocFailed(u16),
}

/// The two preflight rejection codes from spec.md §4.6/§7. Kept as their own
/// type rather than a bare `i32` so callers can match on it without
/// memorizing errno numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffloadErrno {
    /// Malformed length/MSS/segment count.
    Einval,
    /// Offload flag outside the supported mask.
    Enotsup,
}

impl OffloadErrno {
    /// The reference driver stores `-errno` (negative) into the thread-local
    /// error slot rather than the positive convention used everywhere else
    /// in the codebase. That looks like a bug, but callers built against the
    /// reference behavior depend on it, so it is preserved here rather than
    /// silently "fixed". See spec.md §9, second open question.
    pub fn as_negated_raw(self) -> i32 {
        match self {
            OffloadErrno::Einval => -22,
            OffloadErrno::Enotsup => -95,
        }
    }
}

/// Returned by `tx_prepare` on the first rejected packet.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("packet {index} rejected: {errno:?}")]
pub struct PrepareError {
    pub index: usize,
    pub errno: OffloadErrno,
}
