// src/kernel/asid.rs
//
// 役割:
// - ASID → root（PDPT 物理アドレス）の対応表。
// - 上位 ASID_HIGH_BITS で pool を選び、下位 ASID_LOW_BITS で pool 内スロットを選ぶ。
//
// 不変条件:
// - 1 つの ASID が同時に解決する root は高々 1 つ。
// - pool スロットに root が書かれている間、その root の capability は mapped_asid = Some(asid)。
//
// pool の作成自体は外（untyped retype）の責務。ここでは install_pool で受け取るだけ。

use crate::cap::{Asid, Cap, CapSlot};
use crate::kernel::error::{LookupFault, SyscallError};
use crate::kernel::{KernelState, LogEvent};
use crate::logging;
use crate::arch::cpu::Mmu;
use crate::mem::addr::PhysAddr;
use crate::mem::layout::{mask, ASID_HIGH_BITS, ASID_LOW_BITS, ASID_POOLS, ASID_POOL_ENTRIES};
use crate::mem::phys::PhysMem;

pub struct AsidPool {
    entries: [Option<PhysAddr>; ASID_POOL_ENTRIES],
}

impl AsidPool {
    pub const fn new() -> Self {
        AsidPool {
            entries: [None; ASID_POOL_ENTRIES],
        }
    }
}

impl Default for AsidPool {
    fn default() -> Self {
        Self::new()
    }
}

const NO_POOL: Option<AsidPool> = None;

pub struct AsidTable {
    pools: [Option<AsidPool>; ASID_POOLS],
}

impl Default for AsidTable {
    fn default() -> Self {
        Self::new()
    }
}

#[inline(always)]
const fn asid_high(asid: Asid) -> usize {
    (asid.0 >> ASID_LOW_BITS) as usize
}

#[inline(always)]
const fn asid_low(asid: Asid) -> usize {
    (asid.0 & mask(ASID_LOW_BITS)) as usize
}

/// ASID として表現できる範囲か
pub const fn asid_in_range(asid: Asid) -> bool {
    asid.0 >> (ASID_LOW_BITS + ASID_HIGH_BITS) == 0
}

impl AsidTable {
    pub const fn new() -> Self {
        AsidTable {
            pools: [NO_POOL; ASID_POOLS],
        }
    }

    /// `high` 番目の pool を登録する
    pub fn install_pool(&mut self, high: usize, pool: AsidPool) -> Result<(), SyscallError> {
        let slot = self
            .pools
            .get_mut(high)
            .ok_or(SyscallError::InvalidArgument { arg_number: 0 })?;
        if slot.is_some() {
            return Err(SyscallError::DeleteFirst);
        }
        *slot = Some(pool);
        Ok(())
    }

    fn pool(&self, asid: Asid) -> Option<&AsidPool> {
        if !asid_in_range(asid) {
            return None;
        }
        self.pools[asid_high(asid)].as_ref()
    }

    fn pool_mut(&mut self, asid: Asid) -> Option<&mut AsidPool> {
        if !asid_in_range(asid) {
            return None;
        }
        self.pools[asid_high(asid)].as_mut()
    }

    /// ASID が指す root。pool がない / スロットが空なら InvalidRoot。
    pub fn find_vspace_for_asid(&self, asid: Asid) -> Result<PhysAddr, LookupFault> {
        self.pool(asid)
            .and_then(|p| p.entries[asid_low(asid)])
            .ok_or(LookupFault::InvalidRoot)
    }
}

impl<P: PhysMem, M: Mmu> KernelState<P, M> {
    /// `vspace`（未 bind の PDPT capability）を `asid` に bind する
    pub fn perform_asid_pool_invocation(
        &mut self,
        asid: Asid,
        vspace: CapSlot,
    ) -> Result<(), SyscallError> {
        let root = match self.caps.get(vspace) {
            Ok(Cap::Pdpt(p)) if p.mapped_asid.is_none() => p.base,
            _ => {
                logging::error("asid bind: vspace is not an unbound pdpt");
                return Err(SyscallError::InvalidCapability { cap_number: 0 });
            }
        };

        let pool = match self.asids.pool_mut(asid) {
            Some(p) => p,
            None => {
                logging::error("asid bind: no pool for asid");
                return Err(SyscallError::FailedLookup { was_source: false });
            }
        };
        let entry = &mut pool.entries[asid_low(asid)];
        if entry.is_some() {
            logging::error("asid bind: asid already in use");
            return Err(SyscallError::DeleteFirst);
        }

        *entry = Some(root);
        if let Ok(Cap::Pdpt(p)) = self.caps.get_mut(vspace) {
            p.mapped_asid = Some(asid);
        }

        self.push_event(LogEvent::AsidBound { asid, root });
        logging::info_u64("asid bound", asid.0 as u64);
        Ok(())
    }

    /// `asid` の bind を外す。pool の中身が `vspace` の root でなければ何もしない。
    ///
    /// 外した root がいま CPU に載っていれば kernel root へ切り替える。
    pub fn delete_asid(&mut self, asid: Asid, vspace: CapSlot) -> Result<(), SyscallError> {
        let root = match self.caps.get(vspace) {
            Ok(Cap::Pdpt(p)) => p.base,
            _ => return Err(SyscallError::InvalidCapability { cap_number: 0 }),
        };

        let kernel_root = self.kernel_root;
        let Some(pool) = self.asids.pool_mut(asid) else {
            return Ok(());
        };
        let entry = &mut pool.entries[asid_low(asid)];
        if *entry != Some(root) {
            return Ok(());
        }
        *entry = None;

        if let Ok(Cap::Pdpt(p)) = self.caps.get_mut(vspace) {
            p.mapped_asid = None;
        }
        self.push_event(LogEvent::AsidDeleted { asid, root });
        logging::info_u64("asid deleted", asid.0 as u64);

        if self.mmu.read_root() == root {
            self.mmu.write_root(kernel_root);
            self.push_event(LogEvent::RootReloaded(kernel_root));
        }
        Ok(())
    }
}
