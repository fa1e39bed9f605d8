// src/mem/paging.rs
//
// 役割:
// - PAE の 3 種類のエントリ（PDPTE / PDE / PTE）のビット詰め・取り出しを行う。
// - PDE は「PT へのポインタ」と「2MiB 大ページ」の 2 形をタグ付き enum で表す。
// やること:
// - フィールドごとにマスク＋シフトするだけ。値の妥当性は見ない（幅で切るだけ）。
// - invocation の属性ワード（VmAttributes）の解釈。
// やらないこと:
// - テーブルへの書き込み（mem::phys / arch 側の責務）。
//
// エントリは 64bit（high word, low word）。ここで扱うフィールドはすべて low word にあり、
// high word は常に 0 で書く。ビット位置はハードウェアがそのまま読むので 1bit もずらさないこと。

use core::fmt;

use crate::mem::addr::PhysAddr;

bitflags::bitflags! {
    /// エントリ low word の 1bit フィールド
    ///
    /// - PAGE_SIZE: PDE の大ページ判別子（PTE では同じ bit 7 が PAT）
    /// - LARGE_PAT: 大ページ PDE の PAT（bit 12）
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct EntryBits: u64 {
        const PRESENT = 1 << 0;
        const READ_WRITE = 1 << 1;
        const SUPER_USER = 1 << 2;
        const WRITE_THROUGH = 1 << 3;
        const CACHE_DISABLED = 1 << 4;
        const ACCESSED = 1 << 5;
        const DIRTY = 1 << 6;
        const PAGE_SIZE = 1 << 7;
        const GLOBAL = 1 << 8;
        const LARGE_PAT = 1 << 12;
    }
}

bitflags::bitflags! {
    /// Map 要求の属性ワード（syscall 引数 1）
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct VmAttributes: u32 {
        const WRITE_THROUGH = 1 << 0;
        const CACHE_DISABLED = 1 << 1;
        const PAT = 1 << 2;
    }
}

impl VmAttributes {
    /// 未定義ビットは捨てる
    pub const fn from_word(word: u32) -> Self {
        VmAttributes::from_bits_truncate(word)
    }
}

/// PTE の PAT ビット（4KiB エントリでは bit 7）
const PTE_PAT: u64 = 1 << 7;

const AVL_SHIFT: u64 = 9;
const AVL_MASK: u64 = 0x7;

const BASE_4K_MASK: u64 = 0xffff_f000;
const BASE_2M_MASK: u64 = 0xffe0_0000;

#[inline(always)]
const fn flag(on: bool, bits: EntryBits) -> u64 {
    if on {
        bits.bits()
    } else {
        0
    }
}

#[inline(always)]
const fn pte_pat(on: bool) -> u64 {
    if on {
        PTE_PAT
    } else {
        0
    }
}

#[inline(always)]
const fn has(raw: u64, bits: EntryBits) -> bool {
    raw & bits.bits() != 0
}

#[inline(always)]
const fn avl_bits(avl: u8) -> u64 {
    ((avl as u64) & AVL_MASK) << AVL_SHIFT
}

#[inline(always)]
const fn avl_of(raw: u64) -> u8 {
    ((raw >> AVL_SHIFT) & AVL_MASK) as u8
}

/// テーブルに書かれる生のエントリ（64bit）
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct RawEntry(pub u64);

impl RawEntry {
    pub const ZERO: RawEntry = RawEntry(0);

    /// [low word, high word]
    pub const fn words(self) -> [u32; 2] {
        [self.0 as u32, (self.0 >> 32) as u32]
    }

    pub const fn is_present(self) -> bool {
        has(self.0, EntryBits::PRESENT)
    }
}

impl fmt::Debug for RawEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawEntry({:#018x})", self.0)
    }
}

// ─────────────────────────────────────────────
// PDPTE（トップレベル）
// ─────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pdpte {
    pub pd_base_address: PhysAddr,
    pub avl: u8,
    pub cache_disabled: bool,
    pub write_through: bool,
    pub present: bool,
}

impl Pdpte {
    /// PD を指す present なエントリ
    pub const fn new(pd_base_address: PhysAddr, cache_disabled: bool, write_through: bool) -> Self {
        Pdpte {
            pd_base_address,
            avl: 0,
            cache_disabled,
            write_through,
            present: true,
        }
    }

    /// unmap で書く「全フィールド 0」のエントリ
    pub const fn invalid() -> Self {
        Pdpte {
            pd_base_address: PhysAddr(0),
            avl: 0,
            cache_disabled: false,
            write_through: false,
            present: false,
        }
    }

    pub const fn encode(&self) -> RawEntry {
        RawEntry(
            (self.pd_base_address.0 & BASE_4K_MASK)
                | avl_bits(self.avl)
                | flag(self.cache_disabled, EntryBits::CACHE_DISABLED)
                | flag(self.write_through, EntryBits::WRITE_THROUGH)
                | flag(self.present, EntryBits::PRESENT),
        )
    }

    pub const fn decode(raw: RawEntry) -> Self {
        let w = raw.0;
        Pdpte {
            pd_base_address: PhysAddr(w & BASE_4K_MASK),
            avl: avl_of(w),
            cache_disabled: has(w, EntryBits::CACHE_DISABLED),
            write_through: has(w, EntryBits::WRITE_THROUGH),
            present: has(w, EntryBits::PRESENT),
        }
    }
}

// ─────────────────────────────────────────────
// PDE（2 段目）: PT ポインタ / 2MiB 大ページ
// ─────────────────────────────────────────────

/// PT を指す PDE（bit 7 = 0）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PdeSmall {
    pub pt_base_address: PhysAddr,
    pub avl: u8,
    pub accessed: bool,
    pub cache_disabled: bool,
    pub write_through: bool,
    pub super_user: bool,
    pub read_write: bool,
    pub present: bool,
}

/// 2MiB フレームを直接写す PDE（bit 7 = 1）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PdeLarge {
    pub page_base_address: PhysAddr,
    pub pat: bool,
    pub avl: u8,
    pub global: bool,
    pub dirty: bool,
    pub accessed: bool,
    pub cache_disabled: bool,
    pub write_through: bool,
    pub super_user: bool,
    pub read_write: bool,
    pub present: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pde {
    Small(PdeSmall),
    Large(PdeLarge),
}

impl PdeSmall {
    pub const fn encode(&self) -> RawEntry {
        RawEntry(
            (self.pt_base_address.0 & BASE_4K_MASK)
                | avl_bits(self.avl)
                | flag(self.accessed, EntryBits::ACCESSED)
                | flag(self.cache_disabled, EntryBits::CACHE_DISABLED)
                | flag(self.write_through, EntryBits::WRITE_THROUGH)
                | flag(self.super_user, EntryBits::SUPER_USER)
                | flag(self.read_write, EntryBits::READ_WRITE)
                | flag(self.present, EntryBits::PRESENT),
        )
    }

    const fn decode(w: u64) -> Self {
        PdeSmall {
            pt_base_address: PhysAddr(w & BASE_4K_MASK),
            avl: avl_of(w),
            accessed: has(w, EntryBits::ACCESSED),
            cache_disabled: has(w, EntryBits::CACHE_DISABLED),
            write_through: has(w, EntryBits::WRITE_THROUGH),
            super_user: has(w, EntryBits::SUPER_USER),
            read_write: has(w, EntryBits::READ_WRITE),
            present: has(w, EntryBits::PRESENT),
        }
    }
}

impl PdeLarge {
    /// ブートの kernel 窓 / identity map で使う属性（global, rw, supervisor, present）
    pub const fn kernel_window(page_base_address: PhysAddr) -> Self {
        PdeLarge {
            page_base_address,
            pat: false,
            avl: 0,
            global: true,
            dirty: false,
            accessed: false,
            cache_disabled: false,
            write_through: false,
            super_user: false,
            read_write: true,
            present: true,
        }
    }

    pub const fn encode(&self) -> RawEntry {
        RawEntry(
            (self.page_base_address.0 & BASE_2M_MASK)
                | flag(self.pat, EntryBits::LARGE_PAT)
                | avl_bits(self.avl)
                | flag(self.global, EntryBits::GLOBAL)
                | EntryBits::PAGE_SIZE.bits()
                | flag(self.dirty, EntryBits::DIRTY)
                | flag(self.accessed, EntryBits::ACCESSED)
                | flag(self.cache_disabled, EntryBits::CACHE_DISABLED)
                | flag(self.write_through, EntryBits::WRITE_THROUGH)
                | flag(self.super_user, EntryBits::SUPER_USER)
                | flag(self.read_write, EntryBits::READ_WRITE)
                | flag(self.present, EntryBits::PRESENT),
        )
    }

    const fn decode(w: u64) -> Self {
        PdeLarge {
            page_base_address: PhysAddr(w & BASE_2M_MASK),
            pat: has(w, EntryBits::LARGE_PAT),
            avl: avl_of(w),
            global: has(w, EntryBits::GLOBAL),
            dirty: has(w, EntryBits::DIRTY),
            accessed: has(w, EntryBits::ACCESSED),
            cache_disabled: has(w, EntryBits::CACHE_DISABLED),
            write_through: has(w, EntryBits::WRITE_THROUGH),
            super_user: has(w, EntryBits::SUPER_USER),
            read_write: has(w, EntryBits::READ_WRITE),
            present: has(w, EntryBits::PRESENT),
        }
    }
}

impl Pde {
    pub const fn encode(&self) -> RawEntry {
        match self {
            Pde::Small(e) => e.encode(),
            Pde::Large(e) => e.encode(),
        }
    }

    /// bit 7 で形を判別する
    pub const fn decode(raw: RawEntry) -> Self {
        if has(raw.0, EntryBits::PAGE_SIZE) {
            Pde::Large(PdeLarge::decode(raw.0))
        } else {
            Pde::Small(PdeSmall::decode(raw.0))
        }
    }

    pub const fn is_present(&self) -> bool {
        match self {
            Pde::Small(e) => e.present,
            Pde::Large(e) => e.present,
        }
    }
}

// ─────────────────────────────────────────────
// PTE（4KiB 葉）
// ─────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pte {
    pub page_base_address: PhysAddr,
    pub avl: u8,
    pub global: bool,
    pub pat: bool,
    pub dirty: bool,
    pub accessed: bool,
    pub cache_disabled: bool,
    pub write_through: bool,
    pub super_user: bool,
    pub read_write: bool,
    pub present: bool,
}

impl Pte {
    pub const fn encode(&self) -> RawEntry {
        RawEntry(
            (self.page_base_address.0 & BASE_4K_MASK)
                | avl_bits(self.avl)
                | flag(self.global, EntryBits::GLOBAL)
                | pte_pat(self.pat)
                | flag(self.dirty, EntryBits::DIRTY)
                | flag(self.accessed, EntryBits::ACCESSED)
                | flag(self.cache_disabled, EntryBits::CACHE_DISABLED)
                | flag(self.write_through, EntryBits::WRITE_THROUGH)
                | flag(self.super_user, EntryBits::SUPER_USER)
                | flag(self.read_write, EntryBits::READ_WRITE)
                | flag(self.present, EntryBits::PRESENT),
        )
    }

    pub const fn decode(raw: RawEntry) -> Self {
        let w = raw.0;
        Pte {
            page_base_address: PhysAddr(w & BASE_4K_MASK),
            avl: avl_of(w),
            global: has(w, EntryBits::GLOBAL),
            pat: w & PTE_PAT != 0,
            dirty: has(w, EntryBits::DIRTY),
            accessed: has(w, EntryBits::ACCESSED),
            cache_disabled: has(w, EntryBits::CACHE_DISABLED),
            write_through: has(w, EntryBits::WRITE_THROUGH),
            super_user: has(w, EntryBits::SUPER_USER),
            read_write: has(w, EntryBits::READ_WRITE),
            present: has(w, EntryBits::PRESENT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdpte_bit_positions() {
        let e = Pdpte::new(PhysAddr(0x1234_5000), true, true);
        // base | PCD(4) | PWT(3) | P(0)
        assert_eq!(e.encode(), RawEntry(0x1234_5019));
        assert_eq!(e.encode().words(), [0x1234_5019, 0]);
        assert_eq!(Pdpte::invalid().encode(), RawEntry::ZERO);
    }

    #[test]
    fn pdpte_fields_are_masked_to_width() {
        let e = Pdpte {
            pd_base_address: PhysAddr(0xf_1234_5fff),
            avl: 0xff,
            cache_disabled: false,
            write_through: false,
            present: true,
        };
        // 下位 12bit と 32bit より上は落ち、avl は 3bit だけ残る
        assert_eq!(e.encode(), RawEntry(0x1234_5000 | (0x7 << 9) | 1));
        assert_eq!(Pdpte::decode(e.encode()).avl, 0x7);
    }

    #[test]
    fn large_pde_for_kernel_window() {
        let e = PdeLarge::kernel_window(PhysAddr(0x0040_0000));
        // base | G(8) | PS(7) | RW(1) | P(0)
        assert_eq!(e.encode(), RawEntry(0x0040_0183));

        let with_pat = PdeLarge { pat: true, ..e };
        assert_eq!(with_pat.encode().0 & (1 << 12), 1 << 12);
        // 2MiB 未満の base ビットは捨てる
        let unaligned = PdeLarge::kernel_window(PhysAddr(0x0041_f000));
        assert_eq!(unaligned.encode(), RawEntry(0x0040_0183));
    }

    #[test]
    fn pde_decode_uses_page_size_bit() {
        let small = PdeSmall {
            pt_base_address: PhysAddr(0x0030_2000),
            avl: 2,
            accessed: true,
            cache_disabled: false,
            write_through: false,
            super_user: true,
            read_write: true,
            present: true,
        };
        let raw = small.encode();
        assert_eq!(raw.0 & EntryBits::PAGE_SIZE.bits(), 0);
        assert_eq!(Pde::decode(raw), Pde::Small(small));

        let large = PdeLarge::kernel_window(PhysAddr(0x0060_0000));
        assert_eq!(Pde::decode(large.encode()), Pde::Large(large));
        assert!(Pde::decode(large.encode()).is_present());
        assert!(!Pde::decode(RawEntry::ZERO).is_present());
    }

    #[test]
    fn pte_pat_lives_at_bit_seven() {
        let e = Pte {
            page_base_address: PhysAddr(0x00ab_c000),
            avl: 0,
            global: false,
            pat: true,
            dirty: true,
            accessed: false,
            cache_disabled: false,
            write_through: false,
            super_user: true,
            read_write: true,
            present: true,
        };
        // base | PAT(7) | D(6) | US(2) | RW(1) | P(0)
        assert_eq!(e.encode(), RawEntry(0x00ab_c0c7));
        assert_eq!(Pte::decode(e.encode()), e);
    }

    #[test]
    fn vm_attributes_drop_unknown_bits() {
        let attr = VmAttributes::from_word(0xffff_fff3);
        assert!(attr.contains(VmAttributes::WRITE_THROUGH));
        assert!(attr.contains(VmAttributes::CACHE_DISABLED));
        assert!(!attr.contains(VmAttributes::PAT));
        assert_eq!(attr.bits(), 0x3);
    }
}
