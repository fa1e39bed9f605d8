// src/logging/ring.rs
//
// hosted ビルド用のログ出力先。
// - 直近 RING_LINES 行だけを固定長で保持する（heap なし）。
// - 長すぎる行は LINE_BYTES で切る。
// - テストは recent_contains() で「このログが出たか」を確認する。
//
// テストビルドではリングをスレッドごとに持つ。
// テストは並列に走るので、共有リングだと他のテストの行で押し出される。

use spin::Mutex;

const RING_LINES: usize = 256;
const LINE_BYTES: usize = 120;

struct Ring {
    lines: [[u8; LINE_BYTES]; RING_LINES],
    lens: [usize; RING_LINES],
    next: usize,
}

impl Ring {
    const fn new() -> Self {
        Ring {
            lines: [[0; LINE_BYTES]; RING_LINES],
            lens: [0; RING_LINES],
            next: 0,
        }
    }

    fn push(&mut self, parts: &[&str]) {
        let slot = self.next;
        let mut len = 0;

        for p in parts {
            for &b in p.as_bytes() {
                if len == LINE_BYTES {
                    break;
                }
                self.lines[slot][len] = b;
                len += 1;
            }
        }

        self.lens[slot] = len;
        self.next = (slot + 1) % RING_LINES;
    }

    fn contains(&self, needle: &[u8]) -> bool {
        if needle.is_empty() {
            return false;
        }
        (0..RING_LINES).any(|i| {
            let line = &self.lines[i][..self.lens[i]];
            line.windows(needle.len()).any(|w| w == needle)
        })
    }
}

#[cfg(not(test))]
static RING: Mutex<Ring> = Mutex::new(Ring::new());

#[cfg(not(test))]
fn with_ring<R>(f: impl FnOnce(&mut Ring) -> R) -> R {
    f(&mut *RING.lock())
}

#[cfg(test)]
std::thread_local! {
    static RING: Mutex<Ring> = const { Mutex::new(Ring::new()) };
}

#[cfg(test)]
fn with_ring<R>(f: impl FnOnce(&mut Ring) -> R) -> R {
    RING.with(|r| f(&mut *r.lock()))
}

pub fn push_line(parts: &[&str]) {
    with_ring(|ring| ring.push(parts));
}

/// 直近のログ行に `needle` を含むものがあるか（テストでは呼んだスレッドの行だけ）
pub fn recent_contains(needle: &str) -> bool {
    with_ring(|ring| ring.contains(needle.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_from_other_threads_do_not_evict_ours() {
        push_line(&["ring_isolation_marker"]);

        std::thread::spawn(|| {
            for _ in 0..RING_LINES * 2 {
                push_line(&["ring_isolation_noise"]);
            }
            assert!(recent_contains("ring_isolation_noise"));
        })
        .join()
        .unwrap();

        assert!(recent_contains("ring_isolation_marker"));
        assert!(!recent_contains("ring_isolation_noise"));
    }

    #[test]
    fn oldest_line_is_overwritten_when_full() {
        push_line(&["ring_oldest_", "line"]);
        assert!(recent_contains("ring_oldest_line"));

        for _ in 0..RING_LINES {
            push_line(&["ring_filler"]);
        }
        assert!(!recent_contains("ring_oldest_line"));
        assert!(!recent_contains(""));
    }
}
