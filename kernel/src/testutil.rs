// src/testutil.rs
//
// hosted テスト用の差し替え実装。
// - FakePhysMem: 指定した物理アドレスから始まる 4KiB フレームの連続領域
// - RecordingMmu: root の書き込みとキャッシュ無効化を呼ばれた順に記録する

use crate::arch::boot_pd::BootTables;
use crate::arch::cpu::Mmu;
use crate::mem::addr::PhysAddr;
use crate::mem::layout::PAGE_BITS;
use crate::mem::paging::RawEntry;
use crate::mem::phys::PhysMem;

const FRAME_BYTES: usize = 1 << PAGE_BITS;

#[derive(Clone, Copy)]
#[repr(C, align(4096))]
struct Frame([u8; FRAME_BYTES]);

pub struct FakePhysMem {
    base: PhysAddr,
    frames: Vec<Frame>,
    next_free: usize,
}

impl FakePhysMem {
    pub fn new(base: PhysAddr, frame_count: usize) -> Self {
        assert!(base.is_aligned(PAGE_BITS));
        FakePhysMem {
            base,
            frames: vec![Frame([0; FRAME_BYTES]); frame_count],
            next_free: 0,
        }
    }

    /// 連続 `n` フレームを払い出す（ゼロ済み）
    pub fn alloc_frames(&mut self, n: usize) -> PhysAddr {
        assert!(self.next_free + n <= self.frames.len(), "FakePhysMem exhausted");
        let paddr = self.base.offset((self.next_free * FRAME_BYTES) as u64);
        self.next_free += n;
        paddr
    }

    /// `at` に置いた BootTables を直接組み立てる（変換無効のブート段階の代わり）
    pub fn with_boot_tables<R>(&mut self, at: PhysAddr, f: impl FnOnce(&mut BootTables) -> R) -> R {
        let off = self.byte_offset(at);
        assert_eq!(off % FRAME_BYTES, 0);
        assert!(off + core::mem::size_of::<BootTables>() <= self.frames.len() * FRAME_BYTES);

        // Safety: 4KiB 境界・範囲内・self を &mut で借りている
        let tables = unsafe {
            let bytes = self.frames.as_mut_ptr() as *mut u8;
            &mut *(bytes.add(off) as *mut BootTables)
        };
        f(tables)
    }

    /// 領域がすべて 0 か
    pub fn is_zeroed(&self, base: PhysAddr, size_bits: u32) -> bool {
        let off = self.byte_offset(base);
        self.bytes()[off..off + (1usize << size_bits)].iter().all(|&b| b == 0)
    }

    fn byte_offset(&self, paddr: PhysAddr) -> usize {
        let off = paddr
            .as_u64()
            .checked_sub(self.base.as_u64())
            .expect("paddr below FakePhysMem base") as usize;
        assert!(off < self.frames.len() * FRAME_BYTES, "paddr beyond FakePhysMem");
        off
    }

    fn bytes(&self) -> &[u8] {
        // Safety: Frame は u8 配列だけを持つ repr(C)
        unsafe {
            core::slice::from_raw_parts(
                self.frames.as_ptr() as *const u8,
                self.frames.len() * FRAME_BYTES,
            )
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        // Safety: 同上
        unsafe {
            core::slice::from_raw_parts_mut(
                self.frames.as_mut_ptr() as *mut u8,
                self.frames.len() * FRAME_BYTES,
            )
        }
    }
}

impl PhysMem for FakePhysMem {
    fn read_entry(&self, slot: PhysAddr) -> RawEntry {
        assert!(slot.is_aligned(3));
        let off = self.byte_offset(slot);
        let mut word = [0u8; 8];
        word.copy_from_slice(&self.bytes()[off..off + 8]);
        RawEntry(u64::from_ne_bytes(word))
    }

    fn write_entry(&mut self, slot: PhysAddr, entry: RawEntry) {
        assert!(slot.is_aligned(3));
        let off = self.byte_offset(slot);
        self.bytes_mut()[off..off + 8].copy_from_slice(&entry.0.to_ne_bytes());
    }

    fn clear(&mut self, base: PhysAddr, size_bits: u32) {
        let off = self.byte_offset(base);
        self.bytes_mut()[off..off + (1usize << size_bits)].fill(0);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MmuOp {
    WriteRoot(PhysAddr),
    Invalidate,
}

pub struct RecordingMmu {
    pub root: PhysAddr,
    pub ops: Vec<MmuOp>,
}

impl RecordingMmu {
    pub fn new(root: PhysAddr) -> Self {
        RecordingMmu {
            root,
            ops: Vec::new(),
        }
    }

    pub fn take_ops(&mut self) -> Vec<MmuOp> {
        core::mem::take(&mut self.ops)
    }
}

impl Mmu for RecordingMmu {
    fn read_root(&self) -> PhysAddr {
        self.root
    }

    fn write_root(&mut self, root: PhysAddr) {
        self.root = root;
        self.ops.push(MmuOp::WriteRoot(root));
    }

    fn invalidate_page_structure_cache(&mut self) {
        self.ops.push(MmuOp::Invalidate);
    }
}
