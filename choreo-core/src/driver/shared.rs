//! Shared Driver
//!
//! One [`Driver`] per page, created lazily on first use and torn down exactly
//! when the last user lets go. Users hold a [`DriverLease`]; dropping (or
//! explicitly releasing) the lease decrements the count. A later acquire
//! after teardown builds a fresh driver.

use std::ops::Deref;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::Driver;
use crate::config::DriverConfig;
use crate::platform::Platform;
use crate::store::StateStore;

#[derive(Default)]
struct Slot {
    driver: Option<Arc<Driver>>,
    leases: usize,
    created: u64,
    destroyed: u64,
}

/// Reference-counted owner of the page's continuous driver.
pub struct SharedDriver {
    platform: Arc<dyn Platform>,
    store: Arc<StateStore>,
    config: DriverConfig,
    slot: Mutex<Slot>,
}

impl SharedDriver {
    /// `store` is the state the engine's triggers patch; every driver built
    /// here reads its reduced-motion preference from it.
    pub fn new(
        platform: Arc<dyn Platform>,
        store: Arc<StateStore>,
        config: DriverConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            platform,
            store,
            config,
            slot: Mutex::new(Slot::default()),
        })
    }

    /// Take a lease, starting the driver if nobody holds one.
    pub fn acquire(self: &Arc<Self>) -> DriverLease {
        let mut slot = self.slot.lock();
        let driver = match slot.driver.clone() {
            Some(driver) => driver,
            None => {
                let driver = Driver::start(
                    Arc::clone(&self.platform),
                    Arc::clone(&self.store),
                    self.config.clone(),
                );
                slot.created += 1;
                slot.driver = Some(Arc::clone(&driver));
                debug!(generation = slot.created, "shared driver created");
                driver
            }
        };
        slot.leases += 1;

        DriverLease {
            shared: Arc::clone(self),
            driver,
            released: false,
        }
    }

    fn release(&self) {
        let retired = {
            let mut slot = self.slot.lock();
            slot.leases = slot.leases.saturating_sub(1);
            if slot.leases == 0 {
                let retired = slot.driver.take();
                if retired.is_some() {
                    slot.destroyed += 1;
                }
                retired
            } else {
                None
            }
        };
        // Tear down outside the slot lock.
        if let Some(driver) = retired {
            driver.destroy();
            debug!("shared driver released");
        }
    }

    /// Outstanding leases.
    pub fn lease_count(&self) -> usize {
        self.slot.lock().leases
    }

    /// The live driver, if any lease is held.
    pub fn current(&self) -> Option<Arc<Driver>> {
        self.slot.lock().driver.clone()
    }

    /// How many drivers have been constructed.
    pub fn created_count(&self) -> u64 {
        self.slot.lock().created
    }

    /// How many drivers have been torn down.
    pub fn destroyed_count(&self) -> u64 {
        self.slot.lock().destroyed
    }
}

impl std::fmt::Debug for SharedDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.slot.lock();
        f.debug_struct("SharedDriver")
            .field("leases", &slot.leases)
            .field("created", &slot.created)
            .field("destroyed", &slot.destroyed)
            .finish()
    }
}

/// A counted claim on the shared driver.
///
/// Dereferences to the [`Driver`]. Releasing twice is a no-op.
pub struct DriverLease {
    shared: Arc<SharedDriver>,
    driver: Arc<Driver>,
    released: bool,
}

impl DriverLease {
    /// Give the lease back now instead of at drop.
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.shared.release();
        }
    }
}

impl Deref for DriverLease {
    type Target = Driver;

    fn deref(&self) -> &Driver {
        &self.driver
    }
}

impl Drop for DriverLease {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl std::fmt::Debug for DriverLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverLease")
            .field("driver", &self.driver)
            .field("released", &self.released)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::headless::HeadlessPlatform;

    fn shared() -> (Arc<HeadlessPlatform>, Arc<SharedDriver>) {
        let platform = Arc::new(HeadlessPlatform::new(2000.0, 1000.0));
        let shared = SharedDriver::new(
            platform.clone(),
            Arc::new(StateStore::new()),
            DriverConfig::default(),
        );
        (platform, shared)
    }

    #[test]
    fn overlapping_leases_share_one_driver() {
        let (platform, shared) = shared();
        let first = shared.acquire();
        let second = shared.acquire();
        assert_eq!(shared.created_count(), 1);
        assert_eq!(shared.lease_count(), 2);

        drop(first);
        assert_eq!(shared.destroyed_count(), 0);
        assert!(!second.is_destroyed());
        assert_eq!(platform.scroll_listener_count(), 1);

        drop(second);
        assert_eq!(shared.destroyed_count(), 1);
        assert!(shared.current().is_none());
        assert_eq!(platform.scroll_listener_count(), 0);
        assert_eq!(platform.pending_frames(), 0);
    }

    #[test]
    fn reacquire_builds_a_fresh_driver() {
        let (_platform, shared) = shared();
        let lease = shared.acquire();
        let old = shared.current().unwrap();
        lease.release();
        assert!(old.is_destroyed());

        let lease = shared.acquire();
        assert_eq!(shared.created_count(), 2);
        assert!(!lease.is_destroyed());
        assert!(!Arc::ptr_eq(&old, &shared.current().unwrap()));
    }
}
