use std::fmt;

use serde::Serialize;

use crate::{
    cache::Cache,
    replace::{AccessResult, Replace},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Load,
    Store,
    /// Load immediately followed by a store to the same block.
    Modify,
}

impl Op {
    pub fn code(self) -> char {
        match self {
            Op::Load => 'L',
            Op::Store => 'S',
            Op::Modify => 'M',
        }
    }
}

/// One trace record. `size` is carried through for reporting only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub op: Op,
    pub addr: u64,
    pub size: u32,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:x},{}", self.op.code(), self.addr, self.size)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl Counters {
    pub fn record(&mut self, result: AccessResult) {
        match result {
            AccessResult::Hit => self.hits += 1,
            AccessResult::Miss => self.misses += 1,
            AccessResult::MissWithEviction => {
                self.misses += 1;
                self.evictions += 1;
            }
        }
    }

    pub fn total(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn miss_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.misses as f64 / total as f64,
        }
    }
}

impl fmt::Display for Counters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits:{} misses:{} evictions:{}",
            self.hits, self.misses, self.evictions
        )
    }
}

/// How a single trace record was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub first: AccessResult,
    /// The store half of a `Modify`.
    pub second: Option<AccessResult>,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.first.as_str())?;
        if let Some(second) = self.second {
            write!(f, " {}", second.as_str())?;
        }
        Ok(())
    }
}

/// Replays accesses against a cache it owns and tallies the results.
#[derive(Debug)]
pub struct Simulator<R: Replace> {
    cache: Cache<R>,
    counters: Counters,
}

impl<R: Replace> Simulator<R> {
    pub fn new(cache: Cache<R>) -> Self {
        Simulator {
            cache,
            counters: Counters::default(),
        }
    }

    pub fn apply(&mut self, access: &Access) -> Outcome {
        let addr = self.cache.split_addr(access.addr);
        let first = self.cache.access(&addr);
        self.counters.record(first);

        let second = match access.op {
            Op::Load | Op::Store => None,
            Op::Modify => {
                let store = self.cache.access(&addr);
                debug_assert!(store.is_hit());
                self.counters.record(store);
                Some(store)
            }
        };

        log::trace!(
            "{access} -> set {} tag {:#x}: {first:?}{}",
            addr.set,
            addr.tag,
            if second.is_some() { " + store" } else { "" }
        );
        Outcome { first, second }
    }

    /// Applies every access in order, handing each outcome to `observe`.
    ///
    /// Stops at the first `Err` from `accesses` and returns it; counters keep
    /// everything applied before that point.
    pub fn run<I, E, F>(&mut self, accesses: I, mut observe: F) -> Result<(), E>
    where
        I: IntoIterator<Item = Result<Access, E>>,
        F: FnMut(&Access, Outcome),
    {
        for access in accesses {
            let access = access?;
            let outcome = self.apply(&access);
            observe(&access, outcome);
        }
        Ok(())
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn cache(&self) -> &Cache<R> {
        &self.cache
    }

    /// Ends the run, releasing the cache.
    pub fn finish(self) -> Counters {
        self.counters
    }
}
