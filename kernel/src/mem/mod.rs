// src/mem/mod.rs
//
// 役割:
// - メモリ関連のサブモジュールをまとめる中継点。
// - addr.rs / layout.rs / paging.rs / phys.rs を公開する。

pub mod addr;
pub mod layout;
pub mod paging;
pub mod phys;
