// src/arch/mod.rs
//
// アーキ依存部。unsafe をできるだけここに閉じ込める方針。
// - boot_pd: 変換有効化前のブート用 PDPT / PD 構築
// - cpu: CR3 / 変換キャッシュ無効化（Mmu）
// - instr: ia32 特権命令（CR3 / ポート I/O）の asm! ラッパ
// - phys_window: 物理アドレス → kernel 窓（PhysMem の実機実装）

pub mod boot_pd;
pub mod cpu;
#[cfg(target_arch = "x86")]
pub mod instr;
pub mod phys_window;
