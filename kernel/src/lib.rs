// src/lib.rs
//
// ia32 PAE（3 段ページング）の仮想メモリ部分系。
//
// - mem:     アドレス型・レイアウト定数・エントリのビット詰め・物理メモリ境界
// - arch:    ブート用テーブル構築・CR3 / TLB・物理窓
// - cap:     この部分系が触る capability の欄
// - kernel:  テーブル walk・ASID 表・Map / Unmap invocation・同期
// - logging: シリアル（bare metal）/ リングバッファ（hosted）
//
// テストは hosted（std あり）で走らせる。

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod cap;
pub mod kernel;
pub mod logging;
pub mod mem;

#[cfg(test)]
mod testutil;
