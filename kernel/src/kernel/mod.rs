// src/kernel/mod.rs
//
// PAE 仮想メモリ部分系の状態（KernelState）と、それを操作するサブモジュール群。
//
// - KernelState: 物理メモリ / MMU / capability 表 / ASID 表 / スレッド / イベントログ
// - walker:      テーブルを辿るだけ（状態なし）
// - root:        root capability の判定と kernel 窓のコピー
// - asid:        ASID → root の対応表
// - invocation:  PageDirectory の Map / Unmap
// - consistency: テーブル変更後の root 再ロードとキャッシュ無効化
// - boot_map:    初期タスク用の map_it_*（ブート専用）
//
// [設計上の不変条件]
//
// 1. PD capability の mapping と root のスロット
//    - mapping = Some(m) のとき、m.asid が解決する root の pdpt_index(m.vaddr) に
//      その PD を指す present な PDPTE が書かれている。
//    - invocation の途中（スロット書き込みと mapping 更新の間）を観測する経路はない。
//
// 2. 構造変更と同期
//    - 成功した Map / Unmap の構造変更 1 回につき、synchronize_after_structural_change を 1 回だけ呼ぶ。
//    - 呼ぶのは invocation が結果を返す前（遅延・まとめ呼びはしない）。
//
// 3. アクティブ root
//    - current thread の vtable capability が有効なネイティブ root なら、それがアクティブ root。

pub mod asid;
pub mod boot_map;
pub mod consistency;
pub mod error;
pub mod invocation;
pub mod root;
pub mod trace;
pub mod walker;


use crate::arch::cpu::Mmu;
use crate::cap::{Asid, CapSlot, CapTable};
use crate::logging;
use crate::mem::addr::{PhysAddr, VirtAddr};
use crate::mem::phys::PhysMem;

use self::asid::AsidTable;

pub const MAX_THREADS: usize = 4;
const EVENT_LOG_CAP: usize = 256;

//
// ──────────────────────────────────────────────
// ThreadState / Tcb
// ──────────────────────────────────────────────
//

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadState {
    Running,
    /// syscall を終えて再開待ち
    Restart,
    Inactive,
}

#[derive(Clone, Copy, Debug)]
pub struct Tcb {
    pub state: ThreadState,
    /// このスレッドの vtable root capability
    pub vtable: Option<CapSlot>,
}

impl Tcb {
    const fn inactive() -> Self {
        Tcb {
            state: ThreadState::Inactive,
            vtable: None,
        }
    }
}

//
// ──────────────────────────────────────────────
// LogEvent（抽象イベントログ）
// ──────────────────────────────────────────────
//

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogEvent {
    PageDirectoryMapped {
        pd: PhysAddr,
        root: PhysAddr,
        asid: Asid,
        vaddr: VirtAddr,
    },
    PageDirectoryUnmapped {
        pd: PhysAddr,
        asid: Asid,
        vaddr: VirtAddr,
    },
    AsidBound {
        asid: Asid,
        root: PhysAddr,
    },
    AsidDeleted {
        asid: Asid,
        root: PhysAddr,
    },
    RootReloaded(PhysAddr),
    CachesInvalidated,
}

//
// ──────────────────────────────────────────────
// KernelState
// ──────────────────────────────────────────────
//

pub struct KernelState<P: PhysMem, M: Mmu> {
    pub phys: P,
    pub mmu: M,
    pub caps: CapTable,
    pub asids: AsidTable,

    threads: [Tcb; MAX_THREADS],
    cur_thread: usize,

    /// kernel 自身の root（ブート時に作ったもの）
    kernel_root: PhysAddr,

    event_log: [Option<LogEvent>; EVENT_LOG_CAP],
    event_log_len: usize,
}

impl<P: PhysMem, M: Mmu> KernelState<P, M> {
    /// thread 0 を Running / current にして始める
    pub fn new(phys: P, mmu: M, kernel_root: PhysAddr) -> Self {
        let mut threads = [Tcb::inactive(); MAX_THREADS];
        threads[0].state = ThreadState::Running;

        logging::init();
        logging::info_hex("KernelState::new kernel_root", kernel_root.as_u64());

        KernelState {
            phys,
            mmu,
            caps: CapTable::new(),
            asids: AsidTable::new(),
            threads,
            cur_thread: 0,
            kernel_root,
            event_log: [None; EVENT_LOG_CAP],
            event_log_len: 0,
        }
    }

    pub fn kernel_root(&self) -> PhysAddr {
        self.kernel_root
    }

    /// 新しく作った root に kernel 窓を入れる
    pub fn copy_global_mappings(&mut self, new_root: PhysAddr) {
        root::copy_global_mappings(&mut self.phys, self.kernel_root, new_root);
    }

    // --- スレッド ---

    pub fn current_thread(&self) -> usize {
        self.cur_thread
    }

    pub fn switch_to(&mut self, idx: usize) {
        if idx >= MAX_THREADS {
            logging::error("switch_to: thread index out of range");
            return;
        }
        self.cur_thread = idx;
        self.threads[idx].state = ThreadState::Running;
    }

    pub fn thread(&self, idx: usize) -> Option<&Tcb> {
        self.threads.get(idx)
    }

    pub fn set_thread_vtable(&mut self, idx: usize, vtable: Option<CapSlot>) {
        if let Some(t) = self.threads.get_mut(idx) {
            t.vtable = vtable;
        }
    }

    fn set_current_thread_state(&mut self, state: ThreadState) {
        self.threads[self.cur_thread].state = state;
    }

    /// current thread の vtable が有効なネイティブ root ならその物理アドレス
    pub fn active_vtable_root(&self) -> Option<PhysAddr> {
        let slot = self.threads[self.cur_thread].vtable?;
        let cap = self.caps.get(slot).ok()?;
        root::get_valid_native_root(cap)
    }

    // --- イベントログ ---

    fn push_event(&mut self, ev: LogEvent) {
        if self.event_log_len < EVENT_LOG_CAP {
            self.event_log[self.event_log_len] = Some(ev);
            self.event_log_len += 1;
        }
    }

    pub fn events(&self) -> impl Iterator<Item = &LogEvent> + '_ {
        self.event_log[..self.event_log_len].iter().flatten()
    }

    pub fn clear_events(&mut self) {
        self.event_log = [None; EVENT_LOG_CAP];
        self.event_log_len = 0;
    }

    pub fn dump_events(&self) {
        logging::info("=== KernelState Event Log Dump ===");
        for ev in self.events() {
            log_event(ev);
        }
        logging::info("=== End of Event Log ===");
    }
}

fn log_event(ev: &LogEvent) {
    match *ev {
        LogEvent::PageDirectoryMapped { pd, root, asid, vaddr } => {
            logging::info("EVENT: PageDirectoryMapped");
            logging::info_hex("  pd", pd.as_u64());
            logging::info_hex("  root", root.as_u64());
            logging::info_u64("  asid", asid.0 as u64);
            logging::info_hex("  vaddr", vaddr.as_u32() as u64);
        }
        LogEvent::PageDirectoryUnmapped { pd, asid, vaddr } => {
            logging::info("EVENT: PageDirectoryUnmapped");
            logging::info_hex("  pd", pd.as_u64());
            logging::info_u64("  asid", asid.0 as u64);
            logging::info_hex("  vaddr", vaddr.as_u32() as u64);
        }
        LogEvent::AsidBound { asid, root } => {
            logging::info("EVENT: AsidBound");
            logging::info_u64("  asid", asid.0 as u64);
            logging::info_hex("  root", root.as_u64());
        }
        LogEvent::AsidDeleted { asid, root } => {
            logging::info("EVENT: AsidDeleted");
            logging::info_u64("  asid", asid.0 as u64);
            logging::info_hex("  root", root.as_u64());
        }
        LogEvent::RootReloaded(root) => {
            logging::info("EVENT: RootReloaded");
            logging::info_hex("  root", root.as_u64());
        }
        LogEvent::CachesInvalidated => logging::info("EVENT: CachesInvalidated"),
    }
}
