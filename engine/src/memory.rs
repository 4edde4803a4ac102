//! Lock-free trade slot pool for zero-copy handoff
//!
//! The pool pre-allocates a fixed slab of trade slots. Producers move a
//! validated trade into a free slot and hand the resulting [`Slot`] index
//! through the ingress queue; the worker that finishes with the trade
//! returns the slot. The free list is a lock-free LIFO stack whose head
//! packs a 32-bit generation counter next to the slot index, so a stale
//! compare-and-swap cannot re-link a slot that was popped and pushed in
//! between (ABA).
//!
//! Contract: every successful [`TradePool::allocate`] is matched by exactly
//! one [`TradePool::deallocate`]. `Slot` is neither `Clone` nor `Copy`,
//! which makes double-free a move error rather than a runtime hazard.

use common::Trade;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

/// Sentinel index terminating the free list
const NIL: u32 = u32::MAX;

#[inline(always)]
fn pack(generation: u32, index: u32) -> u64 {
    (u64::from(generation) << 32) | u64::from(index)
}

#[inline(always)]
fn unpack_index(tagged: u64) -> u32 {
    (tagged & 0xFFFF_FFFF) as u32
}

#[inline(always)]
fn unpack_generation(tagged: u64) -> u32 {
    (tagged >> 32) as u32
}

/// Owning handle to one pool slot.
///
/// Obtained from [`TradePool::allocate`] and consumed by
/// [`TradePool::deallocate`].
#[derive(Debug)]
pub struct Slot {
    index: u32,
}

impl Slot {
    /// Slab position of this slot
    pub fn index(&self) -> u32 {
        self.index
    }
}

/// Fixed-capacity slab of trade slots with a lock-free free list
pub struct TradePool {
    slots: Box<[UnsafeCell<MaybeUninit<Trade>>]>,
    next: Box<[AtomicU32]>,
    head: AtomicU64,
    allocated: AtomicUsize,
}

// SAFETY: a slot is only ever touched by the single holder of its `Slot`
// handle between allocate and deallocate; the free list itself is atomic.
unsafe impl Send for TradePool {}
unsafe impl Sync for TradePool {}

impl TradePool {
    /// Create a pool with `capacity` pre-sized slots.
    ///
    /// # Panics
    /// Panics if `capacity` is zero or does not fit the 32-bit slot index.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "pool capacity must be positive");
        assert!(
            capacity < NIL as usize,
            "pool capacity {capacity} exceeds maximum {}",
            NIL - 1
        );

        let mut slots = Vec::with_capacity(capacity);
        let mut next = Vec::with_capacity(capacity);
        for i in 0..capacity {
            slots.push(UnsafeCell::new(MaybeUninit::uninit()));
            let succ = if i + 1 < capacity { (i + 1) as u32 } else { NIL };
            next.push(AtomicU32::new(succ));
        }

        Self {
            slots: slots.into_boxed_slice(),
            next: next.into_boxed_slice(),
            head: AtomicU64::new(pack(0, 0)),
            allocated: AtomicUsize::new(0),
        }
    }

    /// Move `trade` into a free slot.
    ///
    /// Returns the trade unchanged when the pool is exhausted so the caller
    /// can still log and account for the drop. Lock-free; the CAS loop only
    /// retries under contention.
    pub fn allocate(&self, trade: Trade) -> Result<Slot, Trade> {
        let Some(index) = self.pop_free() else {
            return Err(trade);
        };
        // SAFETY: `index` was just popped from the free list, so no other
        // thread holds a handle to it and the cell is vacant.
        unsafe {
            (*self.slots[index as usize].get()).write(trade);
        }
        self.allocated.fetch_add(1, Ordering::Relaxed);
        Ok(Slot { index })
    }

    /// Read the trade stored in `slot`.
    ///
    /// The borrow is tied to the `Slot` handle, so the reference cannot
    /// outlive deallocation.
    pub fn get<'a>(&'a self, slot: &'a Slot) -> &'a Trade {
        // SAFETY: the slot is occupied for as long as its handle exists.
        unsafe { (*self.slots[slot.index as usize].get()).assume_init_ref() }
    }

    /// Drop the stored trade and return the slot to the free list
    pub fn deallocate(&self, slot: Slot) {
        let index = slot.index;
        // SAFETY: consuming the handle ends all borrows of the slot; the
        // cell was initialized by `allocate`.
        unsafe {
            (*self.slots[index as usize].get()).assume_init_drop();
        }

        loop {
            let head = self.head.load(Ordering::Acquire);
            self.next[index as usize].store(unpack_index(head), Ordering::Release);
            let new_head = pack(unpack_generation(head).wrapping_add(1), index);
            if self
                .head
                .compare_exchange_weak(head, new_head, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.allocated.fetch_sub(1, Ordering::Relaxed);
                return;
            }
        }
    }

    /// Number of slots currently handed out
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    /// Total slot count
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Whether every slot is handed out
    pub fn is_exhausted(&self) -> bool {
        self.allocated() >= self.capacity()
    }

    fn pop_free(&self) -> Option<u32> {
        loop {
            let head = self.head.load(Ordering::Acquire);
            let index = unpack_index(head);
            if index == NIL {
                return None;
            }
            let next = self.next[index as usize].load(Ordering::Acquire);
            let new_head = pack(unpack_generation(head).wrapping_add(1), next);
            if self
                .head
                .compare_exchange_weak(head, new_head, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(index);
            }
        }
    }
}

impl Drop for TradePool {
    fn drop(&mut self) {
        // Slots still on the free list are vacant; drop the rest in place.
        let mut vacant = vec![false; self.slots.len()];
        let mut index = unpack_index(self.head.load(Ordering::Relaxed));
        while index != NIL {
            vacant[index as usize] = true;
            index = self.next[index as usize].load(Ordering::Relaxed);
        }
        for (i, cell) in self.slots.iter_mut().enumerate() {
            if !vacant[i] {
                // SAFETY: not on the free list means the slot holds a live
                // trade whose handle was never returned.
                unsafe { cell.get_mut().assume_init_drop() };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{MarketSegment, TradeType, Ts};

    fn trade(id: &str) -> Trade {
        Trade {
            trade_id: id.into(),
            instrument_symbol: "INFY".into(),
            account_id: "ACC1".into(),
            client_id: "CL1".into(),
            order_id: "O1".into(),
            trader_id: "TR1".into(),
            trade_type: TradeType::Buy,
            segment: MarketSegment::Equity,
            quantity: 10,
            price: 100.0,
            value: 1000.0,
            exchange: "NSE".into(),
            timestamp: Ts::from_secs(1),
            brokerage: None,
            taxes: None,
            is_own_account: None,
        }
    }

    #[test]
    fn test_allocate_read_deallocate() {
        let pool = TradePool::new(4);
        let slot = pool.allocate(trade("T1")).expect("slot");
        assert_eq!(pool.get(&slot).trade_id, "T1");
        assert_eq!(pool.allocated(), 1);
        pool.deallocate(slot);
        assert_eq!(pool.allocated(), 0);
    }

    #[test]
    fn test_exhaustion_returns_trade() {
        let pool = TradePool::new(2);
        let s1 = pool.allocate(trade("T1")).expect("slot");
        let s2 = pool.allocate(trade("T2")).expect("slot");
        assert!(pool.is_exhausted());

        let rejected = pool.allocate(trade("T3")).expect_err("exhausted");
        assert_eq!(rejected.trade_id, "T3");

        pool.deallocate(s1);
        let s3 = pool.allocate(trade("T4")).expect("slot after free");
        assert_eq!(pool.get(&s3).trade_id, "T4");
        pool.deallocate(s2);
        pool.deallocate(s3);
    }

    #[test]
    fn test_concurrent_allocate_deallocate() {
        use std::sync::Arc;

        let pool = Arc::new(TradePool::new(64));
        let handles: Vec<_> = (0..4)
            .map(|w| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for i in 0..1000 {
                        let id = format!("T{w}-{i}");
                        if let Ok(slot) = pool.allocate(trade(&id)) {
                            assert_eq!(pool.get(&slot).trade_id, id);
                            pool.deallocate(slot);
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("worker");
        }
        assert_eq!(pool.allocated(), 0);
    }

    #[test]
    fn test_drop_with_outstanding_slots() {
        let pool = TradePool::new(4);
        let _held = pool.allocate(trade("T1")).expect("slot");
        // Pool drop must reclaim the outstanding trade without touching
        // vacant slots.
        drop(pool);
    }
}
