// src/arch/boot_pd.rs
//
// 役割:
// - 変換を有効にする前に、カーネル自身が走るためのトップレベル（PDPT）と PD 群を作る。
//
// やること:
// - PDPT の全スロットを、連続した静的 PD 配列の各 PD に向ける。
// - PPTR_BASE 未満: 2MiB 大ページで identity map（virt == phys）。
// - PPTR_BASE 以上: virt - PPTR_BASE + PADDR_BASE へ 2MiB 大ページで map。
//
// やらないこと:
// - 物理窓（arch::phys_window）や PhysMem を経由したアクセス。
//   ここは変換が無効な状態で走るので、静的配列へ直接ビットを詰めるだけにする。
//
// 属性はすべて global / rw / supervisor / present。

use core::mem::size_of;

use crate::mem::addr::PhysAddr;
use crate::mem::layout::{IA32_2M_BITS, PADDR_BASE, PDPT_ENTRIES, PD_ENTRIES, PPTR_BASE};
use crate::mem::paging::{PdeLarge, Pdpte, RawEntry};

/// ブート用 PDPT（4 エントリだがページ境界・ページサイズで置く）
#[repr(C, align(4096))]
pub struct BootPdpt(pub [RawEntry; PDPT_ENTRIES]);

/// PDPT の全スロットぶんの PD（4 × 512 エントリ, 連続）
#[repr(C, align(4096))]
pub struct BootPds(pub [RawEntry; PDPT_ENTRIES * PD_ENTRIES]);

#[repr(C)]
pub struct BootTables {
    pub pdpt: BootPdpt,
    pub pds: BootPds,
}

/// BootTables 先頭から PD 配列までのオフセット
pub const BOOT_PDS_OFFSET: u64 = size_of::<BootPdpt>() as u64;

/// PD 1 枚のバイト数
const PD_BYTES: u64 = (PD_ENTRIES * size_of::<RawEntry>()) as u64;

impl BootTables {
    pub const fn zeroed() -> Self {
        BootTables {
            pdpt: BootPdpt([RawEntry::ZERO; PDPT_ENTRIES]),
            pds: BootPds([RawEntry::ZERO; PDPT_ENTRIES * PD_ENTRIES]),
        }
    }

    /// テーブルを組み立てて、root（PDPT）の物理アドレスを返す。
    ///
    /// `tables_paddr` は self が置かれている物理アドレス。
    pub fn init(&mut self, tables_paddr: PhysAddr) -> PhysAddr {
        let pds_paddr = tables_paddr.offset(BOOT_PDS_OFFSET);

        // まず PDPT の全スロットに PD を繋ぐ
        for (i, slot) in self.pdpt.0.iter_mut().enumerate() {
            let pd_base = pds_paddr.offset(i as u64 * PD_BYTES);
            *slot = Pdpte::new(pd_base, false, false).encode();
        }

        // identity map: 0 ..= PPTR_BASE
        let split = PPTR_BASE as u64;
        let mut i: u64 = 0;
        while (i << IA32_2M_BITS) < split {
            self.pds.0[i as usize] = PdeLarge::kernel_window(PhysAddr(i << IA32_2M_BITS)).encode();
            i += 1;
        }

        // kernel 窓: PPTR_BASE ..= 4GiB を PADDR_BASE から
        let window = (1u64 << 32) - split;
        let first = (split >> IA32_2M_BITS) as usize;
        let mut i: u64 = 0;
        while (i << IA32_2M_BITS) < window {
            let paddr = PhysAddr((i << IA32_2M_BITS) + PADDR_BASE as u64);
            self.pds.0[first + i as usize] = PdeLarge::kernel_window(paddr).encode();
            i += 1;
        }

        tables_paddr
    }

    /// 連続した PD 配列（get_boot_pd 相当）
    pub fn boot_pds(&self) -> &[RawEntry] {
        &self.pds.0
    }
}

// ─────────────────────────────────────────────
// 静的テーブル（変換無効のうちに触るので物理アドレスでリンクする）
// ─────────────────────────────────────────────

#[cfg_attr(target_os = "none", link_section = ".phys.data")]
static mut BOOT_TABLES: BootTables = BootTables::zeroed();

/// ブート用テーブルを組み立てて root の物理アドレスを返す。
///
/// # Safety
/// - 変換が無効（virt == phys）な状態で、1 CPU から 1 回だけ呼ぶこと。
/// - `.phys.data` が物理アドレスでリンクされていること。
pub unsafe fn init_boot_pd() -> PhysAddr {
    let tables = &mut *core::ptr::addr_of_mut!(BOOT_TABLES);
    let paddr = PhysAddr(tables as *mut BootTables as usize as u64);
    tables.init(paddr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::paging::{Pde, RawEntry};

    const TABLES_AT: PhysAddr = PhysAddr(0x0010_0000);

    fn built() -> Box<BootTables> {
        let mut t = Box::new(BootTables::zeroed());
        t.init(TABLES_AT);
        t
    }

    #[test]
    fn every_pdpt_slot_points_at_its_pd() {
        let t = built();
        for (i, raw) in t.pdpt.0.iter().enumerate() {
            let e = Pdpte::decode(*raw);
            assert!(e.present);
            assert_eq!(
                e.pd_base_address,
                PhysAddr(0x0010_0000 + 0x1000 + i as u64 * 0x1000)
            );
        }
    }

    #[test]
    fn low_half_is_identity_mapped_with_large_pages() {
        let t = built();
        assert_eq!(t.boot_pds()[0], RawEntry(0x0000_0183));

        // PPTR_BASE 直前の 2MiB
        let last_low = (PPTR_BASE >> IA32_2M_BITS) as usize - 1;
        match Pde::decode(t.boot_pds()[last_low]) {
            Pde::Large(e) => {
                assert_eq!(e.page_base_address, PhysAddr(0xbfe0_0000));
                assert!(e.global && e.read_write && e.present);
                assert!(!e.super_user);
            }
            other => panic!("expected large mapping, got {:?}", other),
        }
    }

    #[test]
    fn high_window_maps_onto_paddr_base() {
        let t = built();
        let first = (PPTR_BASE >> IA32_2M_BITS) as usize;
        for (k, raw) in t.boot_pds()[first..].iter().enumerate() {
            match Pde::decode(*raw) {
                Pde::Large(e) => assert_eq!(
                    e.page_base_address,
                    PhysAddr(PADDR_BASE as u64 + ((k as u64) << IA32_2M_BITS))
                ),
                other => panic!("slot {} not large: {:?}", first + k, other),
            }
        }
    }

    #[test]
    fn static_tables_are_built_in_place() {
        let root = unsafe { init_boot_pd() };
        let tables = unsafe { &*core::ptr::addr_of!(BOOT_TABLES) };

        assert_eq!(root, PhysAddr(tables as *const BootTables as usize as u64));
        assert!(Pdpte::decode(tables.pdpt.0[KERNEL_WINDOW_SLOT]).present);
        assert_eq!(tables.boot_pds()[1], RawEntry(0x0020_0183));
    }

    const KERNEL_WINDOW_SLOT: usize = 3;
}
