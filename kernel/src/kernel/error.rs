// src/kernel/error.rs
//
// この部分系が上に返すエラーは 2 種類だけ。
// - LookupFault: テーブルを辿って途中で止まった理由（データとして返す。ここでは再試行しない）
// - SyscallError: invocation の前提条件違反（最初に破れたものだけを返し、何も書き換えない）

use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupFault {
    /// present でないエントリで止まった。`bits_left` は未解決のアドレスビット数
    MissingCapability { bits_left: u32 },
    /// ASID がどの root にも解決しない
    InvalidRoot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyscallError {
    /// 他にコピーが残っている
    RevokeFirst,
    /// 知らない操作
    IllegalOperation,
    /// 引数ワード / 追加 capability が足りない
    TruncatedMessage,
    /// 種別違い / root 不一致 / 既に map 済み
    InvalidCapability { cap_number: u32 },
    /// アドレス範囲外
    InvalidArgument { arg_number: u32 },
    /// ASID が解決しない
    FailedLookup { was_source: bool },
    /// 宛先スロットが埋まっている
    DeleteFirst,
}

impl fmt::Display for LookupFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupFault::MissingCapability { bits_left } => {
                write!(f, "missing capability ({} bits left)", bits_left)
            }
            LookupFault::InvalidRoot => write!(f, "invalid root"),
        }
    }
}

impl fmt::Display for SyscallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyscallError::RevokeFirst => write!(f, "revoke first"),
            SyscallError::IllegalOperation => write!(f, "illegal operation"),
            SyscallError::TruncatedMessage => write!(f, "truncated message"),
            SyscallError::InvalidCapability { cap_number } => {
                write!(f, "invalid capability (cap {})", cap_number)
            }
            SyscallError::InvalidArgument { arg_number } => {
                write!(f, "invalid argument (arg {})", arg_number)
            }
            SyscallError::FailedLookup { was_source } => {
                write!(f, "failed lookup (source: {})", was_source)
            }
            SyscallError::DeleteFirst => write!(f, "delete first"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_detail_field() {
        assert_eq!(
            SyscallError::InvalidCapability { cap_number: 1 }.to_string(),
            "invalid capability (cap 1)"
        );
        assert_eq!(
            LookupFault::MissingCapability { bits_left: 30 }.to_string(),
            "missing capability (30 bits left)"
        );
    }
}
