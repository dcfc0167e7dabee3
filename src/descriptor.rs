//! Bit-exact hardware descriptor layouts (spec.md §3, §6).
//!
//! Two 16-byte Tx forms and one 32-byte Rx slot, both with a *read* shape
//! the driver writes and a *writeback* shape the hardware fills in place.
//! All multi-byte fields are little-endian; on a little-endian host (the
//! only target this driver supports, matching DPDK's own i40e PMD) that
//! means a plain `u64`/`u32` load already has the right byte order, so no
//! explicit `to_le`/`from_le` conversions appear below.

/// 32-byte Rx descriptor slot. The same memory is the *read* form before
/// the driver hands the slot to hardware and the *writeback* form once the
/// DD bit is observed; `qw0`/`qw1` are reinterpreted depending on which side
/// of that transition the caller is on.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct RxDesc {
    pub qw0: u64,
    pub qw1: u64,
}

impl RxDesc {
    /// Populate the *read* form: packet buffer address and an optional
    /// header-split buffer address (spec.md §3 "read form").
    #[inline]
    pub fn set_read_form(&mut self, pkt_addr: u64, hdr_addr: u64) {
        self.qw0 = pkt_addr;
        self.qw1 = hdr_addr;
    }

    #[inline]
    pub fn status_quadword(&self) -> u64 {
        self.qw1
    }

    /// QW0: the RSS-hash/FDIR-filter-ID union in the high dword, and
    /// whatever flexible bytes the filter program placed in the low dword
    /// (spec.md §4.1 step 4).
    #[inline]
    pub fn hash_quadword(&self) -> u64 {
        self.qw0
    }
}

/// Bit positions within the Rx writeback QW1 (spec.md §6).
pub mod rx_qw1 {
    pub const DD_SHIFT: u32 = 0;
    pub const EOF_SHIFT: u32 = 1;
    pub const L2TAG1P_SHIFT: u32 = 2;
    pub const FLM_SHIFT: u32 = 11;
    /// FLTSTAT: 2-bit filter status. `0b01` means qw0's high dword holds an
    /// FDIR filter ID; `0b11` means it holds an RSS hash (spec.md §4.1 step
    /// 4). The two other encodings carry no hash/filter payload.
    pub const FLTSTAT_SHIFT: u32 = 12;
    pub const FLTSTAT_MASK: u64 = 0x3;
    pub const FLTSTAT_FD_ID: u64 = 0b01;
    pub const FLTSTAT_RSS_HASH: u64 = 0b11;
    pub const STATUS_MASK: u64 = 0x7FFFF;

    pub const ERROR_SHIFT: u32 = 19;
    pub const ERROR_MASK: u64 = 0xFF;
    pub const ERROR_RXE_SHIFT: u32 = 0;
    pub const ERROR_EIPE_SHIFT: u32 = 1;
    pub const ERROR_IPE_SHIFT: u32 = 2;
    pub const ERROR_L4E_SHIFT: u32 = 3;
    pub const ERROR_OVERSIZE_SHIFT: u32 = 5;
    /// Low six error bits; if all clear, both IP and L4 checksums are
    /// accepted as good without consulting the individual bits
    /// (spec.md §4.1 step 4).
    pub const ERROR_LOW6_MASK: u64 = 0x3F;

    pub const PTYPE_SHIFT: u32 = 30;
    pub const PTYPE_MASK: u64 = 0xFF;
    pub const LENGTH_PBUF_SHIFT: u32 = 38;
    pub const LENGTH_PBUF_MASK: u64 = 0x3FFF;
    pub const L2TAG1_SHIFT: u32 = 48;
    pub const L2TAG1_MASK: u64 = 0xFFFF;
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RxStatus: u64 {
        const DD   = 1 << rx_qw1::DD_SHIFT;
        const EOF  = 1 << rx_qw1::EOF_SHIFT;
        const L2TAG1P = 1 << rx_qw1::L2TAG1P_SHIFT;
        const FLM  = 1 << rx_qw1::FLM_SHIFT;
    }
}

/// Snapshot of everything the driver needs out of a writeback descriptor,
/// taken in one shot before the slot is overwritten with a replacement
/// buffer address (spec.md §4.1 step 3, "snapshot the writeback").
#[derive(Debug, Clone, Copy)]
pub struct RxWriteback {
    pub status: RxStatus,
    pub length_pbuf: u16,
    pub ptype: u8,
    pub l2tag1: u16,
    pub error_bits: u8,
    /// RSS hash, read out of qw0's high dword when FLTSTAT says it's valid
    /// (spec.md §4.1 step 4).
    pub rss_hash: Option<u32>,
    /// FDIR filter-ID match: qw0's high dword as `hi`, low dword as `lo`,
    /// present when FLM is set or FLTSTAT names an FD filter ID.
    pub fdir_id: Option<(u32, u32)>,
}

impl RxWriteback {
    #[inline]
    pub fn parse(qw0: u64, qw1: u64) -> Self {
        let status_bits = qw1 & rx_qw1::STATUS_MASK;
        let fltstat = (qw1 >> rx_qw1::FLTSTAT_SHIFT) & rx_qw1::FLTSTAT_MASK;
        let flm = status_bits & (1 << rx_qw1::FLM_SHIFT) != 0;
        let hi = (qw0 >> 32) as u32;
        let lo = (qw0 & 0xFFFF_FFFF) as u32;

        let rss_hash = (fltstat == rx_qw1::FLTSTAT_RSS_HASH).then_some(hi);
        let fdir_id = (flm || fltstat == rx_qw1::FLTSTAT_FD_ID).then_some((hi, lo));

        RxWriteback {
            status: RxStatus::from_bits_truncate(status_bits),
            length_pbuf: ((qw1 >> rx_qw1::LENGTH_PBUF_SHIFT) & rx_qw1::LENGTH_PBUF_MASK) as u16,
            ptype: ((qw1 >> rx_qw1::PTYPE_SHIFT) & rx_qw1::PTYPE_MASK) as u8,
            l2tag1: ((qw1 >> rx_qw1::L2TAG1_SHIFT) & rx_qw1::L2TAG1_MASK) as u16,
            error_bits: ((qw1 >> rx_qw1::ERROR_SHIFT) & rx_qw1::ERROR_MASK) as u8,
            rss_hash,
            fdir_id,
        }
    }

    #[inline]
    pub fn dd(&self) -> bool {
        self.status.contains(RxStatus::DD)
    }

    #[inline]
    pub fn eof(&self) -> bool {
        self.status.contains(RxStatus::EOF)
    }
}

/// Tx descriptor type field, shared by the data and context forms
/// (spec.md §3 "Hardware Tx descriptor").
pub mod tx_qw1 {
    pub const DTYPE_SHIFT: u32 = 0;
    pub const DTYPE_MASK: u64 = 0xF;
    pub const DTYPE_DATA: u64 = 0x0;
    pub const DTYPE_CONTEXT: u64 = 0x1;
    pub const DTYPE_DONE: u64 = 0xF;

    pub const CMD_SHIFT: u32 = 4;
    pub const CMD_MASK: u64 = 0x3FF;
    pub const OFFSET_SHIFT: u32 = 14;
    pub const OFFSET_MASK: u64 = 0x3FF;
    pub const BUFSZ_SHIFT: u32 = 24;
    pub const BUFSZ_MASK: u64 = 0x3FFF;
    pub const L2TAG1_SHIFT: u32 = 48;
}

bitflags::bitflags! {
    /// Command bits packed into Tx QW1[13:4] (spec.md §3, §4.4).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TxCmd: u64 {
        const EOP            = 1 << 0;
        const ICRC           = 1 << 1;
        const RS             = 1 << 2;
        const IEEE1588_TMST  = 1 << 8;
        const TSO            = 1 << 9;
        const IL2TAG1        = 1 << 7;
    }
}

/// 16-byte Tx *data* descriptor (spec.md §3).
#[repr(C)]
#[derive(Clone, Copy)]
pub struct TxDataDesc {
    pub buffer_addr: u64,
    pub cmd_type_offset_bsz: u64,
}

impl TxDataDesc {
    #[inline]
    pub fn build(
        buffer_addr: u64,
        cmd: TxCmd,
        maclen_iplen_dwords: u64,
        bufsz: u16,
        l2tag1: u16,
    ) -> Self {
        let qw1 = tx_qw1::DTYPE_DATA
            | (cmd.bits() & tx_qw1::CMD_MASK) << tx_qw1::CMD_SHIFT
            | (maclen_iplen_dwords & tx_qw1::OFFSET_MASK) << tx_qw1::OFFSET_SHIFT
            | ((bufsz as u64) & tx_qw1::BUFSZ_MASK) << tx_qw1::BUFSZ_SHIFT
            | (l2tag1 as u64) << tx_qw1::L2TAG1_SHIFT;
        TxDataDesc {
            buffer_addr,
            cmd_type_offset_bsz: qw1,
        }
    }

    #[inline]
    pub fn dtype(&self) -> u64 {
        self.cmd_type_offset_bsz & tx_qw1::DTYPE_MASK
    }

    /// True once hardware has written back DD into this, the *last* data
    /// descriptor of a packet whose RS bit the driver set (spec.md §3).
    #[inline]
    pub fn is_done(&self) -> bool {
        self.dtype() == tx_qw1::DTYPE_DONE
    }

    #[inline]
    pub fn mark_done(&mut self) {
        self.cmd_type_offset_bsz =
            (self.cmd_type_offset_bsz & !tx_qw1::DTYPE_MASK) | tx_qw1::DTYPE_DONE;
    }

    #[inline]
    pub fn clear_type(&mut self) {
        self.cmd_type_offset_bsz &= !tx_qw1::DTYPE_MASK;
    }
}

/// 16-byte Tx *context* descriptor (spec.md §3, §4.4 step 3).
#[repr(C)]
#[derive(Clone, Copy)]
pub struct TxContextDesc {
    pub tunneling_params_and_l2tag2: u64,
    pub cmd_tso_mss: u64,
}

pub mod tx_ctx_qw1 {
    pub const CMD_SHIFT: u32 = 4;
    pub const TSO_LEN_SHIFT: u32 = 30;
    pub const TSO_LEN_MASK: u64 = 0x3FFFF;
    pub const MSS_SHIFT: u32 = 50;
    pub const MSS_MASK: u64 = 0x3FFF;
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TxCtxCmd: u64 {
        const TSO            = 1 << 0;
        const IEEE1588_TMST  = 1 << 1;
    }
}

impl TxContextDesc {
    #[inline]
    pub fn build(
        tunneling_params: u32,
        l2tag2: u16,
        cmd: TxCtxCmd,
        tso_len: u32,
        mss: u16,
    ) -> Self {
        let qw1 = tx_qw1::DTYPE_CONTEXT
            | (cmd.bits() & 0x3) << tx_ctx_qw1::CMD_SHIFT
            | ((tso_len as u64) & tx_ctx_qw1::TSO_LEN_MASK) << tx_ctx_qw1::TSO_LEN_SHIFT
            | ((mss as u64) & tx_ctx_qw1::MSS_MASK) << tx_ctx_qw1::MSS_SHIFT;
        TxContextDesc {
            tunneling_params_and_l2tag2: (tunneling_params as u64) | (l2tag2 as u64) << 32,
            cmd_tso_mss: qw1,
        }
    }
}
