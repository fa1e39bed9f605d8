// src/cap.rs
//
// 役割:
// - この部分系が読む / 書く capability の欄だけを持つ最小の capability 表。
// - capability は固定長アリーナ（CapTable）に置き、CapSlot（index）で指す。
//
// やること:
// - 種別ごとのレコード（PDPT / PD / PT / Frame）と mapping 情報（Option<Mapping>）。
// - insert / derive_copy / delete / get / is_final_capability。
//
// やらないこと:
// - 導出木（CDT）や revoke。同じオブジェクトを指す別スロットがあるかどうかだけを見る。
//
// 不変条件:
// - PD capability の mapping が Some なのは、root の PDPT スロットにその PD が書かれている間だけ。
//   mapping の更新とスロットの書き込みは同じ invocation の中で続けて行う（kernel::invocation）。

use crate::mem::addr::{PhysAddr, VirtAddr};

/// capability 表のスロット数
pub const CAP_SLOTS: usize = 64;

/// アドレス空間識別子（上位 ASID_HIGH_BITS で pool、下位 ASID_LOW_BITS で pool 内 index）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Asid(pub u32);

/// どの root の、どの仮想アドレスに map されているか
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mapping {
    pub asid: Asid,
    pub vaddr: VirtAddr,
}

/// トップレベルテーブル（root）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PdptCap {
    pub base: PhysAddr,
    /// ASID に bind 済みならその ASID
    pub mapped_asid: Option<Asid>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageDirectoryCap {
    pub base: PhysAddr,
    pub mapping: Option<Mapping>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageTableCap {
    pub base: PhysAddr,
    pub mapping: Option<Mapping>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameCap {
    pub base: PhysAddr,
    /// 12（4KiB）または 21（2MiB）
    pub size_bits: u32,
    pub mapping: Option<Mapping>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cap {
    Null,
    Pdpt(PdptCap),
    PageDirectory(PageDirectoryCap),
    PageTable(PageTableCap),
    Frame(FrameCap),
}

/// オブジェクト種別（is_final_capability の同一性判定用）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapKind {
    Pdpt,
    PageDirectory,
    PageTable,
    Frame,
}

impl Cap {
    pub const fn kind(&self) -> Option<CapKind> {
        match self {
            Cap::Null => None,
            Cap::Pdpt(_) => Some(CapKind::Pdpt),
            Cap::PageDirectory(_) => Some(CapKind::PageDirectory),
            Cap::PageTable(_) => Some(CapKind::PageTable),
            Cap::Frame(_) => Some(CapKind::Frame),
        }
    }

    /// 指しているオブジェクトの物理アドレス
    pub const fn object_base(&self) -> Option<PhysAddr> {
        match self {
            Cap::Null => None,
            Cap::Pdpt(c) => Some(c.base),
            Cap::PageDirectory(c) => Some(c.base),
            Cap::PageTable(c) => Some(c.base),
            Cap::Frame(c) => Some(c.base),
        }
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Cap::Null)
    }

    fn same_object_as(&self, other: &Cap) -> bool {
        match (self.kind(), other.kind()) {
            (Some(a), Some(b)) => a == b && self.object_base() == other.object_base(),
            _ => false,
        }
    }
}

/// capability 表のスロット handle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapSlot(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapTableError {
    /// 空きスロットがない
    Full,
    /// 範囲外の handle
    BadSlot,
    /// Null スロットを derive / delete しようとした
    EmptySlot,
}

pub struct CapTable {
    slots: [Cap; CAP_SLOTS],
}

impl Default for CapTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CapTable {
    pub const fn new() -> Self {
        CapTable {
            slots: [Cap::Null; CAP_SLOTS],
        }
    }

    /// 空きスロットに置いて handle を返す
    pub fn insert(&mut self, cap: Cap) -> Result<CapSlot, CapTableError> {
        let free = self
            .slots
            .iter()
            .position(|c| c.is_null())
            .ok_or(CapTableError::Full)?;
        self.slots[free] = cap;
        Ok(CapSlot(free))
    }

    /// 同じオブジェクトを指すコピーを作る
    pub fn derive_copy(&mut self, src: CapSlot) -> Result<CapSlot, CapTableError> {
        let cap = *self.get(src)?;
        if cap.is_null() {
            return Err(CapTableError::EmptySlot);
        }
        self.insert(cap)
    }

    /// スロットを Null に戻し、入っていた capability を返す
    pub fn delete(&mut self, slot: CapSlot) -> Result<Cap, CapTableError> {
        let cap = *self.get(slot)?;
        if cap.is_null() {
            return Err(CapTableError::EmptySlot);
        }
        self.slots[slot.0] = Cap::Null;
        Ok(cap)
    }

    pub fn get(&self, slot: CapSlot) -> Result<&Cap, CapTableError> {
        self.slots.get(slot.0).ok_or(CapTableError::BadSlot)
    }

    pub fn get_mut(&mut self, slot: CapSlot) -> Result<&mut Cap, CapTableError> {
        self.slots.get_mut(slot.0).ok_or(CapTableError::BadSlot)
    }

    /// 同じオブジェクトを指す capability が他のスロットに残っていないか
    pub fn is_final_capability(&self, slot: CapSlot) -> bool {
        let cap = match self.get(slot) {
            Ok(c) => *c,
            Err(_) => return false,
        };
        !self
            .slots
            .iter()
            .enumerate()
            .any(|(i, other)| i != slot.0 && cap.same_object_as(other))
    }
}
