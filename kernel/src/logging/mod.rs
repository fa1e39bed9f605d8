// src/logging/mod.rs
//
// 役割:
// - カーネル全体のログ出力の入口（info / error / info_u64 / info_hex）。
// - no_std 前提で heap 確保なし（固定文字列 + 数値）。
//
// 出力先:
// - bare metal (ia32, target_os = "none"): COM1 シリアル
// - hosted ビルド（テスト含む）: 固定長リングバッファ（ring.rs）

#[cfg(all(target_arch = "x86", target_os = "none"))]
mod serial;
#[cfg(not(all(target_arch = "x86", target_os = "none")))]
mod ring;

#[cfg(not(all(target_arch = "x86", target_os = "none")))]
pub use ring::recent_contains;

pub fn init() {
    #[cfg(all(target_arch = "x86", target_os = "none"))]
    serial::init();
}

pub fn info(msg: &str) {
    emit(&["[INFO] ", msg]);
}

pub fn error(msg: &str) {
    emit(&["[ERROR] ", msg]);
}

pub fn info_u64(label: &str, value: u64) {
    info_kv(label, value);
}

pub fn info_kv(key: &str, value: u64) {
    let mut buf = [0u8; 21];
    let s = u64_to_decimal(value, &mut buf);

    if key.is_empty() {
        emit(&["[INFO] ", s]);
        return;
    }
    emit(&["[INFO] ", key, " = ", s]);
}

/// アドレス系は 16 進で出す
pub fn info_hex(key: &str, value: u64) {
    let mut buf = [0u8; 18];
    let s = u64_to_hex(value, &mut buf);
    emit(&["[INFO] ", key, " = ", s]);
}

fn emit(parts: &[&str]) {
    #[cfg(all(target_arch = "x86", target_os = "none"))]
    serial::write_parts_line(parts);

    #[cfg(not(all(target_arch = "x86", target_os = "none")))]
    ring::push_line(parts);
}

fn u64_to_decimal(mut value: u64, buf: &mut [u8; 21]) -> &str {
    if value == 0 {
        let last = buf.len() - 1;
        buf[last] = b'0';
        return unsafe { core::str::from_utf8_unchecked(&buf[last..]) };
    }

    let mut i = buf.len();
    while value > 0 {
        let digit = (value % 10) as u8;
        i -= 1;
        buf[i] = b'0' + digit;
        value /= 10;
    }

    unsafe { core::str::from_utf8_unchecked(&buf[i..]) }
}

fn u64_to_hex(value: u64, buf: &mut [u8; 18]) -> &str {
    buf[0] = b'0';
    buf[1] = b'x';
    for i in 0..16 {
        let n = ((value >> ((15 - i) * 4)) & 0xF) as u8;
        buf[2 + i] = if n < 10 { b'0' + n } else { b'a' + (n - 10) };
    }
    // 全部 ASCII
    unsafe { core::str::from_utf8_unchecked(&buf[..]) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_and_hex_rendering() {
        let mut d = [0u8; 21];
        assert_eq!(u64_to_decimal(0, &mut d), "0");
        let mut d = [0u8; 21];
        assert_eq!(u64_to_decimal(1234567, &mut d), "1234567");

        let mut h = [0u8; 18];
        assert_eq!(u64_to_hex(0xc000_1000, &mut h), "0x00000000c0001000");
    }

    #[test]
    fn lines_reach_the_ring() {
        info_hex("logging_selftest_addr", 0xdead_b000);
        assert!(recent_contains("logging_selftest_addr = 0x00000000deadb000"));
    }
}
