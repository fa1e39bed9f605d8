// src/mem/addr.rs
//
// 役割:
// - 物理アドレス / 仮想アドレスに型を付ける。
// - PAE の 3 段テーブルに合わせて、仮想アドレスは 32bit、物理アドレスは 64bit で持つ。
// やること:
// - 生の整数に対して「これは物理」「これは仮想」と区別できるようにする。
// - 境界揃え（1GiB / 2MiB / 4KiB）の小さなヘルパ。
// やらないこと:
// - ページテーブルのエントリを組み立てる処理（それは mem::paging 側で行う）。

use core::fmt;

use crate::mem::layout::mask;

/// 物理アドレス（バイト単位）
///
/// エントリの base フィールドは下位 32bit しか持たないので、
/// 実際にテーブルへ書かれるのは下位 32bit だけ（mem::paging でマスクする）。
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct PhysAddr(pub u64);

/// 仮想アドレス（バイト単位, 32bit）
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct VirtAddr(pub u32);

impl PhysAddr {
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// 下位 `bits` ビットを切り捨てる。
    pub const fn align_down(self, bits: u32) -> PhysAddr {
        PhysAddr(self.0 & !(mask(bits) as u64))
    }

    pub const fn is_aligned(self, bits: u32) -> bool {
        self.0 & (mask(bits) as u64) == 0
    }

    pub const fn offset(self, bytes: u64) -> PhysAddr {
        PhysAddr(self.0 + bytes)
    }
}

impl VirtAddr {
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// 下位 `bits` ビットを切り捨てる。
    pub const fn align_down(self, bits: u32) -> VirtAddr {
        VirtAddr(self.0 & !mask(bits))
    }

    pub const fn is_aligned(self, bits: u32) -> bool {
        self.0 & mask(bits) == 0
    }
}

// --- Debug 実装（ログで見やすくするため） ---

impl fmt::Debug for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysAddr({:#x})", self.0)
    }
}

impl fmt::Debug for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtAddr({:#x})", self.0)
    }
}
