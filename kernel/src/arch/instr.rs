// src/arch/instr.rs
//
// ia32 の特権命令（CR3 / ポート I/O）の最小ラッパ。
// asm! はこのファイルにだけ置く。呼び出し側の前提はすべて # Safety に書く。

use core::arch::asm;

/// # Safety
/// ring0 で動いていること
#[inline(always)]
pub unsafe fn read_cr3() -> u32 {
    let value: u32;
    asm!("mov {}, cr3", out(reg) value, options(nomem, nostack, preserves_flags));
    value
}

/// # Safety
/// - ring0 で動いていること
/// - `value` が kernel 窓を含む正しい PDPT を指していること
#[inline(always)]
pub unsafe fn write_cr3(value: u32) {
    asm!("mov cr3, {}", in(reg) value, options(nostack, preserves_flags));
}

/// # Safety
/// `port` への書き込みが副作用として安全であること
#[inline(always)]
pub unsafe fn outb(port: u16, value: u8) {
    asm!("out dx, al", in("dx") port, in("al") value, options(nomem, nostack, preserves_flags));
}

/// # Safety
/// `port` からの読み出しが副作用として安全であること
#[inline(always)]
pub unsafe fn inb(port: u16) -> u8 {
    let value: u8;
    asm!("in al, dx", out("al") value, in("dx") port, options(nomem, nostack, preserves_flags));
    value
}
