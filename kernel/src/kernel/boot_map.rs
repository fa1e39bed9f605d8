// src/kernel/boot_map.rs
//
// 初期タスク（最初のユーザイメージ）の root に PD / PT / フレームを差し込む。
// ブート中にしか呼ばれないので、前提条件が破れていたら panic する（返す相手がいない）。
//
// 各関数は「親のスロットが present であること」を確かめてから子を書く。
// 書いたあとは毎回変換キャッシュを無効化する。

use crate::arch::cpu::Mmu;
use crate::cap::{FrameCap, PageDirectoryCap, PageTableCap, PdptCap};
use crate::kernel::walker::{lookup_pd_slot, lookup_pdpt_slot, lookup_pt_slot};
use crate::mem::paging::{PdeSmall, Pdpte, Pte};
use crate::mem::phys::PhysMem;

pub fn map_it_pd_cap<P: PhysMem + ?Sized, M: Mmu + ?Sized>(
    mem: &mut P,
    mmu: &mut M,
    vspace: &PdptCap,
    pd: &PageDirectoryCap,
) {
    let Some(mapping) = pd.mapping else {
        panic!("map_it_pd_cap: pd cap is not mapped");
    };

    let slot = lookup_pdpt_slot(vspace.base, mapping.vaddr);
    mem.write_entry(slot, Pdpte::new(pd.base, false, false).encode());
    mmu.invalidate_page_structure_cache();
}

pub fn map_it_pt_cap<P: PhysMem + ?Sized, M: Mmu + ?Sized>(
    mem: &mut P,
    mmu: &mut M,
    vspace: &PdptCap,
    pt: &PageTableCap,
) {
    let Some(mapping) = pt.mapping else {
        panic!("map_it_pt_cap: pt cap is not mapped");
    };

    let Ok(pd_slot) = lookup_pd_slot(&*mem, vspace.base, mapping.vaddr) else {
        panic!("map_it_pt_cap: pdpte not present");
    };

    let pde = PdeSmall {
        pt_base_address: pt.base,
        avl: 0,
        accessed: false,
        cache_disabled: false,
        write_through: false,
        super_user: true,
        read_write: true,
        present: true,
    };
    mem.write_entry(pd_slot, pde.encode());
    mmu.invalidate_page_structure_cache();
}

pub fn map_it_frame_cap<P: PhysMem + ?Sized, M: Mmu + ?Sized>(
    mem: &mut P,
    mmu: &mut M,
    vspace: &PdptCap,
    frame: &FrameCap,
) {
    let Some(mapping) = frame.mapping else {
        panic!("map_it_frame_cap: frame cap is not mapped");
    };

    let Ok(pt_slot) = lookup_pt_slot(&*mem, vspace.base, mapping.vaddr) else {
        panic!("map_it_frame_cap: pde not present");
    };

    let pte = Pte {
        page_base_address: frame.base,
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
    mem.write_entry(pt_slot, pte.encode());
    mmu.invalidate_page_structure_cache();
}
