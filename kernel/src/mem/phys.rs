// src/mem/phys.rs
//
// 役割:
// - 「物理アドレスのテーブルスロットを読む / 書く」ための境界（trait）を定義する。
// - カーネル本体は arch::phys_window::KernelWindow（物理窓経由の volatile アクセス）を使い、
//   テストは testutil::FakePhysMem を使う。
//
// やること:
// - エントリ 1 個（64bit, アライン済み）の読み書き。
// - オブジェクト 1 個分のゼロクリア。
//
// やらないこと:
// - 物理フレームの確保（untyped retype の責務）。

use crate::mem::addr::PhysAddr;
use crate::mem::paging::RawEntry;

/// 物理メモリ上のテーブルへのアクセス手段
///
/// スロットの書き込みは 1 ワード単位で原子的であることを前提にする
/// （present ビットの切替を page fault handler が並行して読んでも壊れない）。
pub trait PhysMem {
    /// `slot` は 8 バイト境界の物理アドレス
    fn read_entry(&self, slot: PhysAddr) -> RawEntry;

    fn write_entry(&mut self, slot: PhysAddr, entry: RawEntry);

    /// `base` から `1 << size_bits` バイトを 0 で埋める
    fn clear(&mut self, base: PhysAddr, size_bits: u32);
}
