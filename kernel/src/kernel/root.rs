// src/kernel/root.rs
//
// root（PDPT）capability の判定と、新しい root への kernel 窓のコピー。
//
// - is_vtable_root:       種別が PDPT か
// - is_valid_native_root: PDPT かつ ASID に bind 済み
// - get_valid_native_root: 上が成り立つときの root 物理アドレス

use crate::cap::Cap;
use crate::mem::addr::PhysAddr;
use crate::mem::layout::{ENTRY_BYTES, KERNEL_PDPT_FIRST_INDEX, PDPT_ENTRIES};
use crate::mem::phys::PhysMem;

pub fn is_vtable_root(cap: &Cap) -> bool {
    matches!(cap, Cap::Pdpt(_))
}

pub fn is_valid_native_root(cap: &Cap) -> bool {
    match cap {
        Cap::Pdpt(p) => p.mapped_asid.is_some(),
        _ => false,
    }
}

/// ia32 ではネイティブ root 以外の vtable root はない
pub fn is_valid_vtable_root(cap: &Cap) -> bool {
    is_valid_native_root(cap)
}

pub fn get_valid_native_root(cap: &Cap) -> Option<PhysAddr> {
    match cap {
        Cap::Pdpt(p) if p.mapped_asid.is_some() => Some(p.base),
        _ => None,
    }
}

/// kernel root の kernel 窓部分（PDPT index KERNEL_PDPT_FIRST_INDEX 以降）を new_root へ写す
pub fn copy_global_mappings<P: PhysMem + ?Sized>(
    mem: &mut P,
    kernel_root: PhysAddr,
    new_root: PhysAddr,
) {
    for i in KERNEL_PDPT_FIRST_INDEX..PDPT_ENTRIES {
        let off = i as u64 * ENTRY_BYTES;
        let entry = mem.read_entry(kernel_root.offset(off));
        mem.write_entry(new_root.offset(off), entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cap::{Asid, PageDirectoryCap, PdptCap};
    use crate::mem::paging::{Pdpte, RawEntry};
    use crate::testutil::FakePhysMem;

    #[test]
    fn native_root_requires_pdpt_bound_to_asid() {
        let unbound = Cap::Pdpt(PdptCap {
            base: PhysAddr(0x1000),
            mapped_asid: None,
        });
        let bound = Cap::Pdpt(PdptCap {
            base: PhysAddr(0x1000),
            mapped_asid: Some(Asid(7)),
        });
        let pd = Cap::PageDirectory(PageDirectoryCap {
            base: PhysAddr(0x2000),
            mapping: None,
        });

        assert!(is_vtable_root(&unbound));
        assert!(!is_valid_native_root(&unbound));
        assert!(is_valid_vtable_root(&bound));
        assert_eq!(get_valid_native_root(&bound), Some(PhysAddr(0x1000)));
        assert!(!is_vtable_root(&pd));
        assert_eq!(get_valid_native_root(&pd), None);
        assert_eq!(get_valid_native_root(&Cap::Null), None);
    }

    #[test]
    fn only_kernel_window_slots_are_copied() {
        let mut mem = FakePhysMem::new(PhysAddr(0x0020_0000), 4);
        let kroot = mem.alloc_frames(1);
        let uroot = mem.alloc_frames(1);

        for i in 0..PDPT_ENTRIES as u64 {
            let pd = PhysAddr(0x0100_0000 + i * 0x1000);
            mem.write_entry(kroot.offset(i * 8), Pdpte::new(pd, false, false).encode());
        }
        copy_global_mappings(&mut mem, kroot, uroot);

        for i in 0..KERNEL_PDPT_FIRST_INDEX as u64 {
            assert_eq!(mem.read_entry(uroot.offset(i * 8)), RawEntry::ZERO);
        }
        assert_eq!(
            mem.read_entry(uroot.offset(3 * 8)),
            mem.read_entry(kroot.offset(3 * 8))
        );
    }
}
