// src/arch/cpu.rs
// CPU 命令ラッパ。unsafe は最小限。
//
// - Mmu: active root レジスタ（CR3）と変換キャッシュ無効化の境界
// - Ia32Mmu: 実機用（32bit PAE の CR3 を arch::instr 経由で読み書きする）
//
// テストは testutil::RecordingMmu で呼び出し順を記録する。

use crate::mem::addr::PhysAddr;

/// ハードウェアの変換状態に触る操作
pub trait Mmu {
    /// いま CPU が使っている root の物理アドレス
    fn read_root(&self) -> PhysAddr;

    /// root レジスタを書き換える（同じ値でもトップレベルのキャッシュが捨てられる）
    fn write_root(&mut self, root: PhysAddr);

    /// 変換キャッシュ（TLB / paging-structure cache）を無効化する
    fn invalidate_page_structure_cache(&mut self);
}

// PAE の CR3: bits 31..5 が PDPT の物理アドレス（32 バイト境界）、bit 3 / 4 が PWT / PCD
const CR3_PDPT_MASK: u32 = !0x1f;
const CR3_FLAGS_MASK: u32 = 0x18;

/// CR3 の値 → root の物理アドレス
pub const fn cr3_root(cr3: u32) -> PhysAddr {
    PhysAddr((cr3 & CR3_PDPT_MASK) as u64)
}

/// 今の CR3 の PWT / PCD を残したまま root だけ差し替えた値
pub const fn cr3_with_root(old: u32, root: PhysAddr) -> u32 {
    (root.as_u64() as u32 & CR3_PDPT_MASK) | (old & CR3_FLAGS_MASK)
}

#[cfg(target_arch = "x86")]
pub use self::ia32::Ia32Mmu;

#[cfg(target_arch = "x86")]
mod ia32 {
    use super::{cr3_root, cr3_with_root, Mmu};
    use crate::arch::instr;
    use crate::mem::addr::PhysAddr;

    pub struct Ia32Mmu {
        _private: (),
    }

    impl Ia32Mmu {
        /// # Safety
        /// - ring0 で、PAE が有効な状態で動いていること
        /// - 書き込む root が kernel 窓を含む正しい PDPT であることは呼び出し側が保証する
        pub unsafe fn new() -> Self {
            Ia32Mmu { _private: () }
        }
    }

    impl Mmu for Ia32Mmu {
        fn read_root(&self) -> PhysAddr {
            // Safety: Ia32Mmu::new() の前提による
            cr3_root(unsafe { instr::read_cr3() })
        }

        fn write_root(&mut self, root: PhysAddr) {
            // Safety: Ia32Mmu::new() の前提による
            unsafe {
                let old = instr::read_cr3();
                instr::write_cr3(cr3_with_root(old, root));
            }
        }

        /// CR3 の書き戻しで PDPTE レジスタと非 global の TLB が捨てられる。
        /// global なのは kernel 窓だけで、ブート後は変わらない。
        fn invalidate_page_structure_cache(&mut self) {
            // Safety: Ia32Mmu::new() の前提による
            unsafe {
                let cr3 = instr::read_cr3();
                instr::write_cr3(cr3);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cr3_keeps_cache_flags_and_drops_low_root_bits() {
        assert_eq!(cr3_root(0x0012_3418), PhysAddr(0x0012_3400));
        assert_eq!(cr3_with_root(0x0000_1018, PhysAddr(0x0045_6020)), 0x0045_6038);
        assert_eq!(cr3_with_root(0xffff_ffe7, PhysAddr(0x0045_6000)), 0x0045_6000);
    }
}
