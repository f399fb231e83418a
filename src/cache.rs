use std::ops::{Not, Range};

use thiserror::Error;

use crate::replace::{lru::Lru, AccessResult, Replace};

const ADDR_BITS: u32 = u64::BITS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Addr {
    pub offset: u64,
    pub set: usize,
    pub tag: u64,
}

#[derive(Debug, Clone, Copy)]
struct BitSection {
    shift: u32,
    mask: u64,
}

impl BitSection {
    fn new(shift: u32, width: u32) -> Self {
        let mask = if width >= ADDR_BITS {
            0u64.not()
        } else {
            (1u64 << width) - 1
        };
        BitSection { shift, mask }
    }

    fn apply(&self, num: u64) -> u64 {
        num.checked_shr(self.shift).unwrap_or(0) & self.mask
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("associativity must be at least 1 line per set")]
    ZeroAssociativity,
    #[error("{set_bits} set bits plus {block_bits} block bits exceed a 64-bit address")]
    AddressBits { set_bits: u32, block_bits: u32 },
    #[error("2^{0} sets cannot be allocated on this host")]
    TooManySets(u32),
}

/// One block slot. `recency` is only meaningful while `valid` is set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    pub valid: bool,
    pub tag: u64,
    pub recency: u64,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SetData {
    /// Last recency value handed out in this set.
    pub clock: u64,
}

impl SetData {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// A set-associative cache of `2^s` sets with `E` lines each.
///
/// Lines live in one flat vector; set `i` owns `i * E..(i + 1) * E`.
#[derive(Debug)]
pub struct Cache<R: Replace = Lru> {
    lines: Vec<Line>,
    set_data: Vec<SetData>,
    set_bits: u32,
    block_bits: u32,
    n_ways: usize,
    n_sets: usize,
    offset_sec: BitSection,
    set_sec: BitSection,
    tag_sec: BitSection,
    repl: R,
}

impl Cache<Lru> {
    pub fn new(set_bits: u32, n_ways: usize, block_bits: u32) -> Result<Self, CacheError> {
        Cache::with_policy(set_bits, n_ways, block_bits, Lru::new())
    }
}

impl<R: Replace> Cache<R> {
    pub fn with_policy(
        set_bits: u32,
        n_ways: usize,
        block_bits: u32,
        repl: R,
    ) -> Result<Self, CacheError> {
        if n_ways == 0 {
            return Err(CacheError::ZeroAssociativity);
        }
        if set_bits
            .checked_add(block_bits)
            .map_or(true, |bits| bits > ADDR_BITS)
        {
            return Err(CacheError::AddressBits {
                set_bits,
                block_bits,
            });
        }
        let n_sets = 1usize
            .checked_shl(set_bits)
            .filter(|n| n.checked_mul(n_ways).is_some())
            .ok_or(CacheError::TooManySets(set_bits))?;

        let offset_sec = BitSection::new(0, block_bits);
        let set_sec = BitSection::new(block_bits, set_bits);
        let tag_sec = BitSection::new(block_bits + set_bits, ADDR_BITS);

        let too_many = || CacheError::TooManySets(set_bits);
        let lines = try_filled(n_sets * n_ways).ok_or_else(too_many)?;
        let set_data = try_filled(n_sets).ok_or_else(too_many)?;

        Ok(Cache {
            lines,
            set_data,
            set_bits,
            block_bits,
            n_ways,
            n_sets,
            offset_sec,
            set_sec,
            tag_sec,
            repl,
        })
    }

    pub fn split_addr(&self, addr: u64) -> Addr {
        let offset = self.offset_sec.apply(addr);
        // The mask is below 2^set_bits and set_bits was checked against usize.
        let set = self.set_sec.apply(addr) as usize;
        let tag = self.tag_sec.apply(addr);
        Addr { offset, set, tag }
    }

    fn get_set(&self, set: usize) -> Range<usize> {
        set * self.n_ways..(set + 1) * self.n_ways
    }

    /// Looks up `addr.tag` in set `addr.set`, filling or evicting on a miss.
    ///
    /// # Panics
    ///
    /// If `addr.set` is not below [`Cache::n_sets`]. Addresses produced by
    /// [`Cache::split_addr`] are always in range.
    pub fn access(&mut self, addr: &Addr) -> AccessResult {
        let set_range = self.get_set(addr.set);
        let set_slice = &mut self.lines[set_range];
        let set_data = &mut self.set_data[addr.set];

        if let Some(block) = set_slice
            .iter_mut()
            .find(|b| b.valid && b.tag == addr.tag)
        {
            block.recency = set_data.tick();
            return AccessResult::Hit;
        }

        let (way, result) = match set_slice.iter().position(|b| !b.valid) {
            Some(way) => (way, AccessResult::Miss),
            None => (self.repl.victim(set_slice), AccessResult::MissWithEviction),
        };
        let victim = &mut set_slice[way];
        victim.valid = true;
        victim.tag = addr.tag;
        victim.recency = set_data.tick();
        result
    }

    pub fn set(&self, set: usize) -> &[Line] {
        &self.lines[self.get_set(set)]
    }

    pub fn n_sets(&self) -> usize {
        self.n_sets
    }

    pub fn n_ways(&self) -> usize {
        self.n_ways
    }

    pub fn set_bits(&self) -> u32 {
        self.set_bits
    }

    pub fn block_bits(&self) -> u32 {
        self.block_bits
    }

    /// Block size in bytes, saturating for a 64-bit offset field.
    pub fn block_size(&self) -> u64 {
        1u64.checked_shl(self.block_bits).unwrap_or(u64::MAX)
    }
}

/// Allocates `len` default values, or `None` if the host cannot hold them.
fn try_filled<T: Default + Clone>(len: usize) -> Option<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).ok()?;
    v.resize(len, T::default());
    Some(v)
}
