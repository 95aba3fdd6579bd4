//! Fixed-size slot pools and the two claim strategies.
//!
//! A [`SlotPool`] tracks ownership of a chip's filter or monitor slots. How
//! an index is picked is decided once, at construction, from the chip's
//! [`SlotBinding`]:
//!
//! - [`UnitBound`]: the index is the ADC unit number. Claim and release are
//!   a single compare-and-swap on that index's flag; never blocks.
//! - [`FreePool`]: the first free index wins. The scan runs inside a
//!   critical section, the same one release uses.
//!
//! Slot payloads live in a `critical_section::Mutex<RefCell<_>>` table next
//! to the flags. Each index carries a generation counter that moves on every
//! release, so a handle that outlived its slot is rejected even after the
//! index has been claimed again.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use critical_section::{CriticalSection, Mutex};
use platform::{AdcUnit, SlotBinding};

use crate::error::{AdcError, Result};

/// Index-selection policy for a slot pool.
pub trait ClaimStrategy: Sync {
    /// Mark a slot claimed and return its index, or `None` if the slot
    /// `unit` may use is taken.
    fn claim(&self, flags: &[AtomicBool], unit: AdcUnit) -> Option<usize>;

    /// Mark slot `index` free. Returns `false` if it was not claimed.
    fn release(&self, flags: &[AtomicBool], index: usize) -> bool;
}

/// Slot index equals the ADC unit number.
#[derive(Debug, Clone, Copy)]
pub struct UnitBound;

impl ClaimStrategy for UnitBound {
    fn claim(&self, flags: &[AtomicBool], unit: AdcUnit) -> Option<usize> {
        let index = unit.index();
        flags
            .get(index)?
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| index)
    }

    fn release(&self, flags: &[AtomicBool], index: usize) -> bool {
        flags.get(index).is_some_and(|flag| {
            flag.compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        })
    }
}

/// Any free slot serves any unit.
#[derive(Debug, Clone, Copy)]
pub struct FreePool;

impl ClaimStrategy for FreePool {
    fn claim(&self, flags: &[AtomicBool], _unit: AdcUnit) -> Option<usize> {
        critical_section::with(|_| {
            let index = flags.iter().position(|f| !f.load(Ordering::Acquire))?;
            flags.get(index)?.store(true, Ordering::Release);
            Some(index)
        })
    }

    fn release(&self, flags: &[AtomicBool], index: usize) -> bool {
        critical_section::with(|_| match flags.get(index) {
            Some(flag) if flag.load(Ordering::Acquire) => {
                flag.store(false, Ordering::Release);
                true
            }
            _ => false,
        })
    }
}

static UNIT_BOUND: UnitBound = UnitBound;
static FREE_POOL: FreePool = FreePool;

/// Strategy matching a chip's binding.
pub fn strategy_for(binding: SlotBinding) -> &'static dyn ClaimStrategy {
    match binding {
        SlotBinding::Unit => &UNIT_BOUND,
        SlotBinding::FreePool => &FREE_POOL,
    }
}

/// Identity of a claimed slot as held by a handle.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct SlotId {
    pub index: usize,
    pub generation: u32,
}

/// Ownership flags plus payload table for `N` hardware slots.
pub(crate) struct SlotPool<T, const N: usize> {
    strategy: &'static dyn ClaimStrategy,
    count: usize,
    claimed: [AtomicBool; N],
    generation: [AtomicU32; N],
    slots: Mutex<RefCell<[Option<T>; N]>>,
}

impl<T, const N: usize> SlotPool<T, N> {
    /// Pool of `count` slots (clamped to `N`).
    pub fn new(binding: SlotBinding, count: usize) -> Self {
        Self {
            strategy: strategy_for(binding),
            count: count.min(N),
            claimed: core::array::from_fn(|_| AtomicBool::new(false)),
            generation: core::array::from_fn(|_| AtomicU32::new(0)),
            slots: Mutex::new(RefCell::new(core::array::from_fn(|_| None))),
        }
    }

    fn flags(&self) -> &[AtomicBool] {
        self.claimed.get(..self.count).unwrap_or(&[])
    }

    fn generation_of(&self, index: usize) -> Option<u32> {
        self.generation.get(index).map(|g| g.load(Ordering::Acquire))
    }

    /// Claim a slot for `unit` and store `make(index)` in it.
    ///
    /// # Errors
    ///
    /// [`AdcError::NotFound`] when no slot is available.
    pub fn claim(&self, unit: AdcUnit, make: impl FnOnce(usize) -> T) -> Result<SlotId> {
        let index = self.strategy.claim(self.flags(), unit).ok_or(AdcError::NotFound)?;
        let generation = self.generation_of(index).ok_or(AdcError::NotFound)?;
        critical_section::with(|cs| {
            if let Some(slot) = self.slots.borrow_ref_mut(cs).get_mut(index) {
                *slot = Some(make(index));
            }
        });
        Ok(SlotId { index, generation })
    }

    /// Run `f` on the live slot `id` refers to.
    ///
    /// # Errors
    ///
    /// [`AdcError::NotFound`] if the slot was released since `id` was
    /// issued; otherwise whatever `f` returns.
    pub fn with_slot<R>(
        &self,
        cs: CriticalSection<'_>,
        id: &SlotId,
        f: impl FnOnce(&mut T) -> Result<R>,
    ) -> Result<R> {
        let claimed = self.flags().get(id.index).is_some_and(|c| c.load(Ordering::Acquire));
        if !claimed || self.generation_of(id.index) != Some(id.generation) {
            return Err(AdcError::NotFound);
        }
        let mut slots = self.slots.borrow_ref_mut(cs);
        let slot = slots
            .get_mut(id.index)
            .and_then(Option::as_mut)
            .ok_or(AdcError::NotFound)?;
        f(slot)
    }

    /// Release slot `id` once `check` accepts its payload; returns the
    /// payload.
    ///
    /// The generation moves and the payload is taken while the flag is
    /// still set, so a claim racing with the release cannot win the index
    /// before the old handle is dead.
    ///
    /// # Errors
    ///
    /// [`AdcError::NotFound`] for a stale or unowned slot, or the error
    /// from `check` (nothing is released in that case).
    pub fn release(
        &self,
        cs: CriticalSection<'_>,
        id: &SlotId,
        check: impl FnOnce(&T) -> Result<()>,
    ) -> Result<T> {
        self.release_then(cs, id, check, || {})
    }

    /// [`release`](Self::release), running `before_free` after the slot is
    /// retired and before its flag drops.
    fn release_then(
        &self,
        cs: CriticalSection<'_>,
        id: &SlotId,
        check: impl FnOnce(&T) -> Result<()>,
        before_free: impl FnOnce(),
    ) -> Result<T> {
        self.with_slot(cs, id, |slot| check(slot))?;
        if let Some(g) = self.generation.get(id.index) {
            g.fetch_add(1, Ordering::AcqRel);
        }
        let payload = self
            .slots
            .borrow_ref_mut(cs)
            .get_mut(id.index)
            .and_then(Option::take)
            .ok_or(AdcError::NotFound)?;
        before_free();
        if self.strategy.release(self.flags(), id.index) {
            Ok(payload)
        } else {
            Err(AdcError::NotFound)
        }
    }

    /// Read the payload at `index` without a handle (ISR dispatch).
    pub fn peek<R>(&self, cs: CriticalSection<'_>, index: usize, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.slots.borrow_ref(cs).get(index).and_then(Option::as_ref).map(f)
    }

    /// Number of claimed slots.
    pub fn claimed_count(&self) -> usize {
        self.flags().iter().filter(|c| c.load(Ordering::Acquire)).count()
    }

    /// Number of slots this chip has.
    pub fn capacity(&self) -> usize {
        self.count
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn unit_bound_claims_the_unit_index() {
        let pool: SlotPool<u8, 2> = SlotPool::new(SlotBinding::Unit, 2);
        let a = pool.claim(AdcUnit::Unit2, |_| 7).unwrap();
        assert_eq!(a.index, 1);
        assert_eq!(pool.claim(AdcUnit::Unit2, |_| 8), Err(AdcError::NotFound));
        assert_eq!(pool.claim(AdcUnit::Unit1, |_| 9).unwrap().index, 0);
    }

    #[test]
    fn free_pool_hands_out_the_first_free_index() {
        let pool: SlotPool<u8, 2> = SlotPool::new(SlotBinding::FreePool, 2);
        let a = pool.claim(AdcUnit::Unit1, |_| 1).unwrap();
        let b = pool.claim(AdcUnit::Unit1, |_| 2).unwrap();
        assert_eq!((a.index, b.index), (0, 1));
        assert_eq!(pool.claim(AdcUnit::Unit2, |_| 3), Err(AdcError::NotFound));
        critical_section::with(|cs| pool.release(cs, &a, |_| Ok(()))).unwrap();
        assert_eq!(pool.claim(AdcUnit::Unit2, |_| 4).unwrap().index, 0);
    }

    #[test]
    fn released_slot_rejects_its_old_handle() {
        let pool: SlotPool<u8, 2> = SlotPool::new(SlotBinding::FreePool, 2);
        let a = pool.claim(AdcUnit::Unit1, |_| 1).unwrap();
        critical_section::with(|cs| pool.release(cs, &a, |_| Ok(()))).unwrap();
        let again = critical_section::with(|cs| pool.release(cs, &a, |_| Ok(())));
        assert_eq!(again, Err(AdcError::NotFound));

        let _b = pool.claim(AdcUnit::Unit1, |_| 2).unwrap();
        let stale = critical_section::with(|cs| pool.with_slot(cs, &a, |v| Ok(*v)));
        assert_eq!(stale, Err(AdcError::NotFound));
    }

    #[test]
    fn index_stays_taken_until_the_old_handle_is_dead() {
        let pool: SlotPool<u8, 2> = SlotPool::new(SlotBinding::Unit, 2);
        let a = pool.claim(AdcUnit::Unit1, |_| 1).unwrap();

        critical_section::with(|cs| {
            pool.release_then(cs, &a, |_| Ok(()), || {
                assert_eq!(pool.claim(AdcUnit::Unit1, |_| 2), Err(AdcError::NotFound));
                assert_eq!(pool.with_slot(cs, &a, |v| Ok(*v)), Err(AdcError::NotFound));
            })
        })
        .unwrap();

        let b = pool.claim(AdcUnit::Unit1, |_| 3).unwrap();
        assert_eq!(b.index, a.index);
        assert_ne!(b.generation, a.generation);
        assert_eq!(critical_section::with(|cs| pool.with_slot(cs, &b, |v| Ok(*v))), Ok(3));
        assert_eq!(critical_section::with(|cs| pool.with_slot(cs, &a, |v| Ok(*v))), Err(AdcError::NotFound));
    }

    #[test]
    fn failed_check_keeps_the_slot() {
        let pool: SlotPool<u8, 2> = SlotPool::new(SlotBinding::Unit, 2);
        let a = pool.claim(AdcUnit::Unit1, |_| 1).unwrap();
        let r = critical_section::with(|cs| pool.release(cs, &a, |_| Err(AdcError::InvalidState)));
        assert_eq!(r, Err(AdcError::InvalidState));
        assert_eq!(pool.claimed_count(), 1);
    }

    #[test]
    fn strategy_release_of_unclaimed_index_fails() {
        let flags = [AtomicBool::new(false), AtomicBool::new(false)];
        assert!(!UnitBound.release(&flags, 0));
        assert!(!FreePool.release(&flags, 1));
        assert!(!FreePool.release(&flags, 5));
    }

    #[test]
    fn zero_capacity_pool_never_claims() {
        let pool: SlotPool<u8, 2> = SlotPool::new(SlotBinding::FreePool, 0);
        assert_eq!(pool.claim(AdcUnit::Unit1, |_| 0), Err(AdcError::NotFound));
        let pool: SlotPool<u8, 2> = SlotPool::new(SlotBinding::Unit, 0);
        assert_eq!(pool.claim(AdcUnit::Unit1, |_| 0), Err(AdcError::NotFound));
    }
}
