//! Advisory pause slot shared by the units of work of one resource.
//!
//! A unit of work that needs the resource asks the run currently in flight to
//! step aside by writing its own id into the slot. The run sees the request at
//! its next step boundary, stops with a paused outcome and is resubmitted
//! later. The slot is a single atomic word updated with compare-and-swap, so
//! neither side ever blocks.

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::WorkId;

const EMPTY: u64 = 0;

/// Errors from pause slot bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PauseError {
    /// Tried to release a pause held by another unit of work.
    #[error("pause is not held by {requested} (holder: {holder:?})")]
    NotHeld {
        requested: WorkId,
        holder: Option<WorkId>,
    },
}

/// Lock-free pause request slot.
///
/// Id `0` is reserved for "no pause requested" and can never hold the slot.
#[derive(Debug, Default)]
pub struct PauseSignal {
    slot: AtomicU64,
}

impl PauseSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a pause on behalf of `id`.
    ///
    /// Returns `true` when the slot was free and is now held by `id`, or was
    /// already held by `id`. Returns `false` when another unit of work holds
    /// it; the slot is left untouched in that case.
    pub fn request(&self, id: WorkId) -> bool {
        if id.get() == EMPTY {
            warn!(work_id = %id, "pause request with reserved id rejected");
            return false;
        }

        match self
            .slot
            .compare_exchange(EMPTY, id.get(), Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                info!(work_id = %id, "pause requested");
                true
            }
            Err(current) if current == id.get() => {
                info!(work_id = %id, "pause already held");
                true
            }
            Err(current) => {
                info!(
                    work_id = %id,
                    holder = current,
                    "pause already requested by another unit of work"
                );
                false
            }
        }
    }

    /// Release a pause previously obtained with [`request`](Self::request).
    pub fn release(&self, id: WorkId) -> Result<(), PauseError> {
        match self
            .slot
            .compare_exchange(id.get(), EMPTY, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) if id.get() != EMPTY => {
                info!(work_id = %id, "pause released");
                Ok(())
            }
            Ok(_) | Err(_) => {
                let holder = self.triggering_id();
                error!(work_id = %id, holder = ?holder, "release of a pause that is not held");
                Err(PauseError::NotHeld {
                    requested: id,
                    holder,
                })
            }
        }
    }

    /// Whether the slot is currently held by `id`.
    pub fn is_held_by(&self, id: WorkId) -> bool {
        id.get() != EMPTY && self.slot.load(Ordering::Acquire) == id.get()
    }

    /// Whether any unit of work requested a pause.
    pub fn is_requested(&self) -> bool {
        let value = self.slot.load(Ordering::Acquire);
        if value != EMPTY {
            debug!(holder = value, "pause is requested");
            true
        } else {
            false
        }
    }

    /// Id of the unit of work that requested the pause, if any.
    pub fn triggering_id(&self) -> Option<WorkId> {
        match self.slot.load(Ordering::Acquire) {
            EMPTY => None,
            value => Some(WorkId::new(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn new_signal_is_not_requested() {
        let signal = PauseSignal::new();
        assert!(!signal.is_requested());
        assert_eq!(signal.triggering_id(), None);
    }

    #[test]
    fn request_sets_holder() {
        let signal = PauseSignal::new();
        assert!(signal.request(WorkId::new(12)));
        assert!(signal.is_requested());
        assert_eq!(signal.triggering_id(), Some(WorkId::new(12)));
        assert!(signal.is_held_by(WorkId::new(12)));
    }

    #[test]
    fn request_by_same_id_is_idempotent() {
        let signal = PauseSignal::new();
        assert!(signal.request(WorkId::new(3)));
        assert!(signal.request(WorkId::new(3)));
        assert_eq!(signal.triggering_id(), Some(WorkId::new(3)));
    }

    #[test]
    fn request_by_other_id_does_not_overwrite() {
        let signal = PauseSignal::new();
        assert!(signal.request(WorkId::new(3)));
        assert!(!signal.request(WorkId::new(4)));
        assert_eq!(signal.triggering_id(), Some(WorkId::new(3)));
        assert!(!signal.is_held_by(WorkId::new(4)));
    }

    #[test]
    fn reserved_id_is_rejected() {
        let signal = PauseSignal::new();
        assert!(!signal.request(WorkId::new(0)));
        assert!(!signal.is_requested());
    }

    #[test]
    fn release_clears_slot() {
        let signal = PauseSignal::new();
        signal.request(WorkId::new(9));
        signal.release(WorkId::new(9)).unwrap();
        assert!(!signal.is_requested());
        assert!(signal.request(WorkId::new(10)));
    }

    #[test]
    fn release_by_wrong_id_fails() {
        let signal = PauseSignal::new();
        signal.request(WorkId::new(9));
        let err = signal.release(WorkId::new(8)).unwrap_err();
        assert_eq!(
            err,
            PauseError::NotHeld {
                requested: WorkId::new(8),
                holder: Some(WorkId::new(9)),
            }
        );
        assert!(signal.is_held_by(WorkId::new(9)));
    }

    #[test]
    fn release_of_empty_slot_fails() {
        let signal = PauseSignal::new();
        assert!(signal.release(WorkId::new(1)).is_err());
        assert!(signal.release(WorkId::new(0)).is_err());
    }

    #[test]
    fn only_one_concurrent_requester_wins() {
        let signal = Arc::new(PauseSignal::new());
        let handles: Vec<_> = (1..=8)
            .map(|i| {
                let signal = Arc::clone(&signal);
                thread::spawn(move || signal.request(WorkId::new(i)))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert!(signal.is_requested());
    }
}
