// src/arch/phys_window.rs
//
// 役割:
// - 「物理アドレス → kernel 窓の仮想アドレス」変換をここに集約する。
// - テーブルスロットへのアクセスは必ず volatile で行う（ハードウェアが直接読むメモリなので）。
//
// 設計方針:
// - phys_to_kernel_ptr() 以外で PPTR_BASE / PADDR_BASE を足し引きしない。
// - unsafe はこのファイルに閉じ込める。

use volatile::Volatile;

use crate::mem::addr::PhysAddr;
use crate::mem::layout::{PADDR_BASE, PPTR_BASE};
use crate::mem::paging::RawEntry;
use crate::mem::phys::PhysMem;

/// 物理アドレス → kernel 窓のポインタ
///
/// 窓は PADDR_BASE から 1GiB 分なので、上位ビットは 32bit で折り返す。
#[inline(always)]
pub fn phys_to_kernel_ptr(paddr: PhysAddr) -> *mut u8 {
    let pptr = (paddr.as_u64() as u32)
        .wrapping_sub(PADDR_BASE)
        .wrapping_add(PPTR_BASE);
    pptr as usize as *mut u8
}

/// kernel 窓のポインタ → 物理アドレス
#[inline(always)]
pub fn kernel_ptr_to_phys(pptr: *const u8) -> PhysAddr {
    let paddr = (pptr as usize as u32)
        .wrapping_sub(PPTR_BASE)
        .wrapping_add(PADDR_BASE);
    PhysAddr(paddr as u64)
}

/// kernel 窓経由で物理メモリ上のテーブルを触る PhysMem
pub struct KernelWindow {
    _private: (),
}

impl KernelWindow {
    /// # Safety
    /// - 変換が有効で、kernel 窓（PPTR_BASE 以降）が map 済みであること
    /// - 渡される物理アドレスは retype 済みのテーブルオブジェクトを指していること
    pub unsafe fn new() -> Self {
        KernelWindow { _private: () }
    }

    fn slot(&self, slot: PhysAddr) -> *mut Volatile<u64> {
        debug_assert!(slot.is_aligned(3), "table slot must be 8-byte aligned");
        phys_to_kernel_ptr(slot) as *mut Volatile<u64>
    }
}

impl PhysMem for KernelWindow {
    fn read_entry(&self, slot: PhysAddr) -> RawEntry {
        // Safety: KernelWindow::new() の前提による
        RawEntry(unsafe { (*self.slot(slot)).read() })
    }

    fn write_entry(&mut self, slot: PhysAddr, entry: RawEntry) {
        // Safety: KernelWindow::new() の前提による
        unsafe { (*self.slot(slot)).write(entry.0) }
    }

    fn clear(&mut self, base: PhysAddr, size_bits: u32) {
        let words = (1u64 << size_bits) / 8;
        for i in 0..words {
            self.write_entry(base.offset(i * 8), RawEntry::ZERO);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_translation_is_offset_by_split() {
        let p = phys_to_kernel_ptr(PhysAddr(0x0012_3000));
        assert_eq!(p as usize, 0xc012_3000);
        assert_eq!(kernel_ptr_to_phys(p), PhysAddr(0x0012_3000));
    }
}
