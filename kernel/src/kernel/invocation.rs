// src/kernel/invocation.rs
//
// PageDirectory capability への invocation（Map / Unmap）。
//
// Map の前提条件（この順で調べ、最初に破れたものを返す。破れたら何も書き換えない）:
//   1. label が PageDirectoryMap / PageDirectoryUnmap       → IllegalOperation
//   2. 引数ワード 2 個以上・追加 capability 1 個以上         → TruncatedMessage
//   3. PD がまだ map されていない                           → InvalidCapability{0}
//   4. vaddr（1GiB 境界に切り下げ）< PPTR_USER_TOP           → InvalidArgument{0}
//   5. 追加 capability が有効なネイティブ root              → InvalidCapability{1}
//   6. その ASID が root に解決する                         → FailedLookup
//   7. 解決した root == 渡された root                        → InvalidCapability{1}
//   8. 宛先 PDPT スロットが空                               → DeleteFirst
//
// Unmap の前提条件:
//   - この capability が最後の 1 つ                         → RevokeFirst

use crate::arch::cpu::Mmu;
use crate::cap::{Asid, Cap, CapSlot, Mapping, PdptCap};
use crate::kernel::error::SyscallError;
use crate::kernel::trace::trace_invocation;
use crate::kernel::walker::lookup_pdpt_slot;
use crate::kernel::{root, KernelState, LogEvent, ThreadState};
use crate::logging;
use crate::mem::addr::{PhysAddr, VirtAddr};
use crate::mem::layout::{IA32_1G_BITS, PAGE_BITS, PPTR_USER_TOP};
use crate::mem::paging::{Pdpte, VmAttributes};
use crate::mem::phys::PhysMem;

/// PD オブジェクトのサイズ（512 エントリ × 8 バイト = 4KiB）
const PD_SIZE_BITS: u32 = PAGE_BITS;

/// PageDirectory が受け付ける操作。それ以外の label は Other（他の object 向け）。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvocationLabel {
    PageDirectoryMap,
    PageDirectoryUnmap,
    Other(u32),
}

/// 1 回の invocation 要求（syscall 引数の取り出しは済んでいる）
#[derive(Clone, Copy, Debug)]
pub struct Invocation<'a> {
    pub label: InvocationLabel,
    /// メッセージレジスタ: [vaddr, attr]
    pub args: &'a [u32],
    /// 追加 capability: [vspace root]
    pub extra_caps: &'a [CapSlot],
}

impl<P: PhysMem, M: Mmu> KernelState<P, M> {
    pub fn decode_page_directory_invocation(
        &mut self,
        inv: &Invocation<'_>,
        pd_slot: CapSlot,
    ) -> Result<(), SyscallError> {
        trace_invocation(inv.label);

        let pd_cap = match self.caps.get(pd_slot) {
            Ok(Cap::PageDirectory(c)) => *c,
            _ => {
                logging::error("PageDirectory invocation: not a page directory cap");
                return Err(SyscallError::InvalidCapability { cap_number: 0 });
            }
        };

        match inv.label {
            InvocationLabel::PageDirectoryMap => {}
            InvocationLabel::PageDirectoryUnmap => {
                if !self.caps.is_final_capability(pd_slot) {
                    logging::error("PageDirectory Unmap: cannot unmap if more than one cap exists");
                    return Err(SyscallError::RevokeFirst);
                }
                self.set_current_thread_state(ThreadState::Restart);
                self.perform_page_directory_unmap(pd_slot);
                return Ok(());
            }
            _ => {
                logging::error("PageDirectory: illegal operation");
                return Err(SyscallError::IllegalOperation);
            }
        }

        if inv.args.len() < 2 || inv.extra_caps.is_empty() {
            logging::error("PageDirectory Map: truncated message");
            return Err(SyscallError::TruncatedMessage);
        }

        if pd_cap.mapping.is_some() {
            logging::error("PageDirectory Map: page directory is already mapped");
            return Err(SyscallError::InvalidCapability { cap_number: 0 });
        }

        let vaddr = VirtAddr(inv.args[0]).align_down(IA32_1G_BITS);
        let attr = VmAttributes::from_word(inv.args[1]);

        if vaddr.as_u32() >= PPTR_USER_TOP {
            logging::error("PageDirectory Map: mapping address too high");
            return Err(SyscallError::InvalidArgument { arg_number: 0 });
        }

        let vspace = self.caps.get(inv.extra_caps[0]).copied().unwrap_or(Cap::Null);
        let (vspace_root, asid) = match (root::get_valid_native_root(&vspace), vspace) {
            (Some(r), Cap::Pdpt(PdptCap { mapped_asid: Some(asid), .. })) => (r, asid),
            _ => {
                logging::error("PageDirectory Map: invalid vspace root");
                return Err(SyscallError::InvalidCapability { cap_number: 1 });
            }
        };

        let resolved = match self.asids.find_vspace_for_asid(asid) {
            Ok(r) => r,
            Err(_) => {
                logging::error("PageDirectory Map: asid lookup failed");
                return Err(SyscallError::FailedLookup { was_source: false });
            }
        };

        if resolved != vspace_root {
            logging::error("PageDirectory Map: asid lookup failed (root mismatch)");
            return Err(SyscallError::InvalidCapability { cap_number: 1 });
        }

        let pdpt_slot = lookup_pdpt_slot(vspace_root, vaddr);
        if self.phys.read_entry(pdpt_slot).is_present() {
            logging::error("PageDirectory Map: page directory already mapped here");
            return Err(SyscallError::DeleteFirst);
        }

        let pdpte = Pdpte::new(
            pd_cap.base,
            attr.contains(VmAttributes::CACHE_DISABLED),
            attr.contains(VmAttributes::WRITE_THROUGH),
        );

        self.perform_page_directory_map(pd_slot, pdpte, pdpt_slot, vspace_root, Mapping { asid, vaddr });
        self.set_current_thread_state(ThreadState::Restart);
        Ok(())
    }

    fn perform_page_directory_map(
        &mut self,
        pd_slot: CapSlot,
        pdpte: Pdpte,
        pdpt_slot: PhysAddr,
        vspace_root: PhysAddr,
        mapping: Mapping,
    ) {
        // スロットと capability は続けて書く（間に観測点を置かない）
        self.phys.write_entry(pdpt_slot, pdpte.encode());
        if let Ok(Cap::PageDirectory(c)) = self.caps.get_mut(pd_slot) {
            c.mapping = Some(mapping);
        }

        self.push_event(LogEvent::PageDirectoryMapped {
            pd: pdpte.pd_base_address,
            root: vspace_root,
            asid: mapping.asid,
            vaddr: mapping.vaddr,
        });
        logging::info_hex("PageDirectory mapped at", mapping.vaddr.as_u32() as u64);

        self.synchronize_after_structural_change(vspace_root);
    }

    fn perform_page_directory_unmap(&mut self, pd_slot: CapSlot) {
        let pd_cap = match self.caps.get(pd_slot) {
            Ok(Cap::PageDirectory(c)) => *c,
            _ => return,
        };

        let Some(mapping) = pd_cap.mapping else {
            return;
        };

        self.unmap_page_directory(mapping.asid, mapping.vaddr, pd_cap.base);
        self.phys.clear(pd_cap.base, PD_SIZE_BITS);

        if let Ok(Cap::PageDirectory(c)) = self.caps.get_mut(pd_slot) {
            c.mapping = None;
        }
    }

    /// `asid` の root から `vaddr` の PD を外す。
    ///
    /// ASID がもう解決しない、またはスロットがこの PD を指していない
    /// （ASID が別の root に bind し直された）なら、テーブルにも CPU にも触らない。
    pub fn unmap_page_directory(&mut self, asid: Asid, vaddr: VirtAddr, pd: PhysAddr) {
        let vspace_root = match self.asids.find_vspace_for_asid(asid) {
            Ok(r) => r,
            Err(_) => {
                logging::info_u64("PageDirectory unmap: asid no longer resolves", asid.0 as u64);
                return;
            }
        };

        let pdpt_slot = lookup_pdpt_slot(vspace_root, vaddr);
        let current = Pdpte::decode(self.phys.read_entry(pdpt_slot));
        if !current.present || current.pd_base_address != pd {
            logging::info_u64("PageDirectory unmap: slot names another directory", asid.0 as u64);
            return;
        }
        self.phys.write_entry(pdpt_slot, Pdpte::invalid().encode());

        self.push_event(LogEvent::PageDirectoryUnmapped { pd, asid, vaddr });
        logging::info_hex("PageDirectory unmapped from", vaddr.as_u32() as u64);

        self.synchronize_after_structural_change(vspace_root);
    }
}
