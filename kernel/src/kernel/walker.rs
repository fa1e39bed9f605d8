// src/kernel/walker.rs
//
// 役割:
// - root（PDPT の物理アドレス）と仮想アドレスから、各段のスロットを探す。
// - 見つからなければ LookupFault を返す（何も書き換えない）。
//
// 返すのはスロットの「物理アドレス」。実際の読み書きは PhysMem に任せる
// （kernel 窓への変換は PhysMem の実装側で行う）。

use crate::kernel::error::LookupFault;
use crate::mem::addr::{PhysAddr, VirtAddr};
use crate::mem::layout::{
    mask, pd_index, pdpt_index, pt_index, ENTRY_BYTES, IA32_2M_BITS, PAGE_BITS, PD_BITS, PT_BITS,
};
use crate::mem::paging::{Pde, Pdpte, Pte};
use crate::mem::phys::PhysMem;

/// PDPT が欠けていたときに残っているビット数（PD + PT + offset）
pub const PD_LOOKUP_BITS_LEFT: u32 = PAGE_BITS + PT_BITS + PD_BITS;
/// PD が欠けていたときに残っているビット数（PT + offset）
pub const PT_LOOKUP_BITS_LEFT: u32 = PAGE_BITS + PT_BITS;

#[inline(always)]
const fn slot_of(table: PhysAddr, index: usize) -> PhysAddr {
    table.offset(index as u64 * ENTRY_BYTES)
}

/// PDPT のスロット（PDPT は常にあるので失敗しない）
pub fn lookup_pdpt_slot(root: PhysAddr, vaddr: VirtAddr) -> PhysAddr {
    slot_of(root, pdpt_index(vaddr.as_u32()))
}

pub fn lookup_pd_slot<P: PhysMem + ?Sized>(
    mem: &P,
    root: PhysAddr,
    vaddr: VirtAddr,
) -> Result<PhysAddr, LookupFault> {
    let pdpte = Pdpte::decode(mem.read_entry(lookup_pdpt_slot(root, vaddr)));
    if !pdpte.present {
        return Err(LookupFault::MissingCapability {
            bits_left: PD_LOOKUP_BITS_LEFT,
        });
    }
    Ok(slot_of(pdpte.pd_base_address, pd_index(vaddr.as_u32())))
}

/// PT のスロット。PD エントリが大ページのときも「PT がない」扱い。
pub fn lookup_pt_slot<P: PhysMem + ?Sized>(
    mem: &P,
    root: PhysAddr,
    vaddr: VirtAddr,
) -> Result<PhysAddr, LookupFault> {
    let pd_slot = lookup_pd_slot(mem, root, vaddr)?;
    match Pde::decode(mem.read_entry(pd_slot)) {
        Pde::Small(e) if e.present => Ok(slot_of(e.pt_base_address, pt_index(vaddr.as_u32()))),
        _ => Err(LookupFault::MissingCapability {
            bits_left: PT_LOOKUP_BITS_LEFT,
        }),
    }
}

/// 3 段を辿って物理アドレスを返す（大ページも辿る）
pub fn translate<P: PhysMem + ?Sized>(mem: &P, root: PhysAddr, vaddr: VirtAddr) -> Option<PhysAddr> {
    let va = vaddr.as_u32() as u64;
    let pd_slot = lookup_pd_slot(mem, root, vaddr).ok()?;

    match Pde::decode(mem.read_entry(pd_slot)) {
        Pde::Large(e) if e.present => {
            Some(e.page_base_address.offset(va & mask(IA32_2M_BITS) as u64))
        }
        Pde::Small(e) if e.present => {
            let pte_slot = slot_of(e.pt_base_address, pt_index(vaddr.as_u32()));
            let pte = Pte::decode(mem.read_entry(pte_slot));
            if !pte.present {
                return None;
            }
            Some(pte.page_base_address.offset(va & mask(PAGE_BITS) as u64))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::paging::{PdeLarge, PdeSmall};
    use crate::testutil::FakePhysMem;

    fn small_pde(pt: PhysAddr) -> Pde {
        Pde::Small(PdeSmall {
            pt_base_address: pt,
            avl: 0,
            accessed: false,
            cache_disabled: false,
            write_through: false,
            super_user: true,
            read_write: true,
            present: true,
        })
    }

    #[test]
    fn missing_pdpte_reports_thirty_bits_left() {
        let mut mem = FakePhysMem::new(PhysAddr(0x0010_0000), 4);
        let root = mem.alloc_frames(1);

        assert_eq!(lookup_pdpt_slot(root, VirtAddr(0x8000_0000)), root.offset(16));
        assert_eq!(
            lookup_pd_slot(&mem, root, VirtAddr(0x8000_0000)),
            Err(LookupFault::MissingCapability { bits_left: 30 })
        );
        assert_eq!(translate(&mem, root, VirtAddr(0x8000_0000)), None);
    }

    #[test]
    fn walks_through_small_and_large_directory_entries() {
        let mut mem = FakePhysMem::new(PhysAddr(0x0010_0000), 8);
        let root = mem.alloc_frames(1);
        let pd = mem.alloc_frames(1);
        let pt = mem.alloc_frames(1);

        mem.write_entry(root, Pdpte::new(pd, false, false).encode());

        // PD[0] → PT, PT[3] → 0x0055_5000
        mem.write_entry(pd, small_pde(pt).encode());
        let pte = Pte {
            page_base_address: PhysAddr(0x0055_5000),
            avl: 0,
            global: false,
            pat: false,
            dirty: false,
            accessed: false,
            cache_disabled: false,
            write_through: false,
            super_user: true,
            read_write: true,
            present: true,
        };
        mem.write_entry(pt.offset(3 * 8), pte.encode());

        // PD[1] → 2MiB 大ページ
        mem.write_entry(pd.offset(8), PdeLarge::kernel_window(PhysAddr(0x0400_0000)).encode());

        assert_eq!(
            lookup_pt_slot(&mem, root, VirtAddr(0x0000_3abc)),
            Ok(pt.offset(3 * 8))
        );
        assert_eq!(
            translate(&mem, root, VirtAddr(0x0000_3abc)),
            Some(PhysAddr(0x0055_5abc))
        );
        assert_eq!(translate(&mem, root, VirtAddr(0x0000_4000)), None);

        assert_eq!(
            lookup_pt_slot(&mem, root, VirtAddr(0x0020_0000)),
            Err(LookupFault::MissingCapability { bits_left: 21 })
        );
        assert_eq!(
            translate(&mem, root, VirtAddr(0x0021_2345)),
            Some(PhysAddr(0x0401_2345))
        );
    }
}
