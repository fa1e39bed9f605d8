// src/mem/layout.rs
//
// ia32 PAE 仮想アドレスレイアウト（3 段: PDPT → PD → PT）
//
// 目的:
// - 「ユーザ空間」と「カーネル窓」の境界を定数として固定しておく。
// - index 抽出などのビット演算は副作用なしの純粋関数としてここに集約する。
//
// 想定レイアウト:
//
//   0x0000_0000 ..= 0xbfff_ffff
//     - user 空間（PDPT index 0..=2）
//     - ブート直後は identity map（virt == phys）
//
//   0xc000_0000 ..= 0xffff_ffff
//     - kernel 窓（PDPT index 3）
//     - PADDR_BASE から始まる物理メモリを写す。全アドレス空間で共有。
//
// 重要:
// - PPTR_BASE は 1GiB 境界でなければならない（copy_global_mappings は PDPT 単位でコピーする）。

/// 4KiB ページのビット数
pub const PAGE_BITS: u32 = 12;
/// PT の index ビット数（512 エントリ）
pub const PT_BITS: u32 = 9;
/// PD の index ビット数（512 エントリ）
pub const PD_BITS: u32 = 9;
/// PDPT の index ビット数（4 エントリ）
pub const PDPT_BITS: u32 = 2;

pub const IA32_4K_BITS: u32 = 12;
pub const IA32_2M_BITS: u32 = 21;
pub const IA32_1G_BITS: u32 = 30;

pub const PT_ENTRIES: usize = 1 << PT_BITS;
pub const PD_ENTRIES: usize = 1 << PD_BITS;
pub const PDPT_ENTRIES: usize = 1 << PDPT_BITS;

/// 1 エントリのバイト数（PAE は 64bit エントリ）
pub const ENTRY_BYTES: u64 = 8;

/// kernel / user の分割点（kernel 窓の先頭仮想アドレス）
pub const PPTR_BASE: u32 = 0xc000_0000;

/// kernel 窓の先頭に写す物理アドレス
pub const PADDR_BASE: u32 = 0x0000_0000;

/// user が map できる仮想アドレスの上限（これ以上は拒否）
pub const PPTR_USER_TOP: u32 = PPTR_BASE;

/// kernel 窓が始まる PDPT index
pub const KERNEL_PDPT_FIRST_INDEX: usize = (PPTR_BASE >> IA32_1G_BITS) as usize;

/// ASID の下位ビット（pool 内 index）
pub const ASID_LOW_BITS: u32 = 10;
/// ASID の上位ビット（pool の番号）
pub const ASID_HIGH_BITS: u32 = 2;

pub const ASID_POOL_ENTRIES: usize = 1 << ASID_LOW_BITS;
pub const ASID_POOLS: usize = 1 << ASID_HIGH_BITS;

/// 下位 `bits` ビットのマスク
#[inline(always)]
pub const fn mask(bits: u32) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    }
}

/// 仮想アドレスの PDPT index（bits 31..30）
#[inline(always)]
pub const fn pdpt_index(vaddr: u32) -> usize {
    (vaddr >> IA32_1G_BITS) as usize
}

/// 仮想アドレスの PD index（bits 29..21）
#[inline(always)]
pub const fn pd_index(vaddr: u32) -> usize {
    ((vaddr >> (PAGE_BITS + PT_BITS)) & mask(PD_BITS)) as usize
}

/// 仮想アドレスの PT index（bits 20..12）
#[inline(always)]
pub const fn pt_index(vaddr: u32) -> usize {
    ((vaddr >> PAGE_BITS) & mask(PT_BITS)) as usize
}
