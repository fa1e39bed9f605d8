// src/logging/serial.rs
//
// COM1 (0x3F8) への最小限のシリアル出力。
// - init(): 115200bps, 8N1 に初期化
// - write_parts_line(): 断片をまとめて 1 行として送信
//
// 行の途中に他 CPU の出力が割り込まないよう、送信は spin::Mutex で直列化する。

use spin::Mutex;
use crate::arch::instr::{inb, outb};

const COM1: u16 = 0x3F8;

static SERIAL: Mutex<Serial> = Mutex::new(Serial { initialized: false });

struct Serial {
    initialized: bool,
}

impl Serial {
    fn init(&mut self) {
        if self.initialized {
            return;
        }

        // Safety: COM1 の標準レジスタだけを触る
        unsafe {
            outb(COM1 + 1, 0x00); // 割り込み無効

            outb(COM1 + 3, 0x80); // DLAB
            outb(COM1, 0x01); // 115200bps
            outb(COM1 + 1, 0x00);

            outb(COM1 + 3, 0x03); // 8N1
            outb(COM1 + 2, 0xC7); // FIFO
            outb(COM1 + 4, 0x0B);
        }

        self.initialized = true;
    }

    fn write_byte(&mut self, byte: u8) {
        // Safety: 同上
        unsafe {
            while (inb(COM1 + 5) & 0x20) == 0 {}
            outb(COM1, byte);
        }
    }

    fn write_str(&mut self, s: &str) {
        for b in s.bytes() {
            self.write_byte(b);
        }
    }
}

pub fn init() {
    SERIAL.lock().init();
}

pub fn write_parts_line(parts: &[&str]) {
    let mut serial = SERIAL.lock();
    if !serial.initialized {
        return;
    }
    for p in parts {
        serial.write_str(p);
    }
    serial.write_str("\r\n");
}
