// src/kernel/consistency.rs
//
// テーブル構造を変えたあとの CPU 同期。
//
// 1. 変更した root がアクティブ root なら、root レジスタを読んだ値で書き戻す
//    （トップレベルエントリはレジスタ書き込みでしか読み直されない）
// 2. 変換キャッシュを無条件に無効化する
//
// 成功した構造変更 1 回につき 1 回だけ呼ぶ。まとめたり遅らせたりしない。

use crate::arch::cpu::Mmu;
use crate::kernel::trace::{trace_sync, SyncEvent};
use crate::kernel::{KernelState, LogEvent};
use crate::mem::addr::PhysAddr;
use crate::mem::phys::PhysMem;

impl<P: PhysMem, M: Mmu> KernelState<P, M> {
    pub fn synchronize_after_structural_change(&mut self, affected_root: PhysAddr) {
        if self.active_vtable_root() == Some(affected_root) {
            let current = self.mmu.read_root();
            self.mmu.write_root(current);
            self.push_event(LogEvent::RootReloaded(current));
            trace_sync(SyncEvent::RootReloaded);
        }

        self.mmu.invalidate_page_structure_cache();
        self.push_event(LogEvent::CachesInvalidated);
        trace_sync(SyncEvent::CachesInvalidated);
    }
}
