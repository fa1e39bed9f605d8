// src/kernel/trace.rs
//
// 低コスト trace（観測性）を 1 箇所に集約する。
// - invocation の入口（どの操作が decode されたか）
// - 同期の各段（root 再ロード / キャッシュ無効化）
//
// 設計方針:
// - logging 側に新 API を要求しない（info のみで完結）
// - no_std 前提で heap 確保なし（固定文字列のみ）
//
// feature:
// - vspace_trace: 有効化。無効なら全関数が空になる。

use super::invocation::InvocationLabel;

// SyncEvent は feature off でも存在させる（呼び出し側に cfg を撒かないため）
#[derive(Clone, Copy)]
pub enum SyncEvent {
    RootReloaded,
    CachesInvalidated,
}

#[inline(always)]
pub fn trace_invocation(label: InvocationLabel) {
    #[cfg(feature = "vspace_trace")]
    {
        use crate::logging;
        match label {
            InvocationLabel::PageDirectoryMap => logging::info("[trace] invocation PageDirectoryMap"),
            InvocationLabel::PageDirectoryUnmap => {
                logging::info("[trace] invocation PageDirectoryUnmap")
            }
            InvocationLabel::Other(word) => logging::info_u64("[trace] invocation other label", word as u64),
        }
    }
    #[cfg(not(feature = "vspace_trace"))]
    {
        let _ = label;
    }
}

#[inline(always)]
pub fn trace_sync(event: SyncEvent) {
    #[cfg(feature = "vspace_trace")]
    {
        use crate::logging;
        match event {
            SyncEvent::RootReloaded => logging::info("[trace] sync root reloaded"),
            SyncEvent::CachesInvalidated => logging::info("[trace] sync caches invalidated"),
        }
    }
    #[cfg(not(feature = "vspace_trace"))]
    {
        let _ = event;
    }
}
