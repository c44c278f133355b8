//! Critical section serializing access to the storage device.
//!
//! Every credential store operation runs inside one global section that owns
//! the driver. The driver is reachable only through the section's guard, so
//! no driver call, and no open file, can happen outside it.
//!
//! Operations on different credential slots are serialized against each
//! other as well: the driver is not known to tolerate concurrent callers.

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard};

use crate::error::{StoreError, StoreResult};

/// Global critical section owning the filesystem driver.
#[derive(Debug)]
pub struct CriticalSection<D> {
    driver: Mutex<D>,
}

/// Guard that holds the critical section for its lifetime.
#[derive(Debug)]
pub struct CriticalSectionGuard<'a, D> {
    driver: MutexGuard<'a, D>,
}

impl<D> CriticalSection<D> {
    /// Places `driver` under the critical section.
    pub const fn new(driver: D) -> Self {
        Self {
            driver: Mutex::new(driver),
        }
    }

    /// Enters the section, blocking until no other task holds it.
    ///
    /// # Errors
    ///
    /// Returns an error if a previous holder panicked inside the section;
    /// the driver state is then unknown.
    pub fn enter(&self) -> StoreResult<CriticalSectionGuard<'_, D>> {
        let driver = self.driver.lock().map_err(|_| poisoned())?;
        Ok(CriticalSectionGuard { driver })
    }

    /// Attempts to enter the section without blocking.
    #[cfg(test)]
    pub(crate) fn try_enter(&self) -> StoreResult<Option<CriticalSectionGuard<'_, D>>> {
        use std::sync::TryLockError;

        match self.driver.try_lock() {
            Ok(driver) => Ok(Some(CriticalSectionGuard { driver })),
            Err(TryLockError::WouldBlock) => Ok(None),
            Err(TryLockError::Poisoned(_)) => Err(poisoned()),
        }
    }
}

impl<D> Deref for CriticalSectionGuard<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.driver
    }
}

impl<D> DerefMut for CriticalSectionGuard<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}

fn poisoned() -> StoreError {
    StoreError::Lock("critical section poisoned".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{mpsc, Arc};

    #[test]
    fn test_section_is_exclusive() {
        let section = CriticalSection::new(0u32);
        let guard = section.enter().expect("enter");
        assert!(section.try_enter().expect("try enter").is_none());
        drop(guard);
        assert!(section.try_enter().expect("try enter").is_some());
    }

    #[test]
    fn test_section_serializes_across_threads() {
        let section = Arc::new(CriticalSection::new(Vec::<u32>::new()));

        let (entered_tx, entered_rx) = mpsc::channel();
        let (leave_tx, leave_rx) = mpsc::channel();

        let holder = {
            let section = Arc::clone(&section);
            std::thread::spawn(move || {
                let mut guard = section.enter().expect("enter in thread");
                guard.push(1);
                entered_tx.send(()).expect("signal entered");
                leave_rx.recv().expect("wait leave");
                guard.push(2);
            })
        };

        entered_rx.recv().expect("wait entered");
        assert!(section.try_enter().expect("try enter").is_none());
        leave_tx.send(()).expect("leave");
        holder.join().expect("thread join");

        let mut guard = section.enter().expect("enter");
        guard.push(3);
        assert_eq!(*guard, vec![1, 2, 3]);
    }

    #[test]
    fn test_poisoned_section_reports_error() {
        let section = Arc::new(CriticalSection::new(()));
        let clone = Arc::clone(&section);
        let _ = std::thread::spawn(move || {
            let _guard = clone.enter().expect("enter");
            panic!("task died inside the section");
        })
        .join();
        assert!(matches!(section.enter(), Err(StoreError::Lock(_))));
    }
}
