//! End-to-end license lifecycle over the public API.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use trustgate::crypto::digest::device_prefix;
use trustgate::license::code::master_signature;
use trustgate::{
    Clock, Expiry, FileStore, LicenseManager, LockKind, LockState, MemoryStore, RuntimeEnvironment,
    TrustStore, TrustgateConfig, TrustgateError,
};

const APP: &str = "com.example.otoservice";
const SECRET: &str = "lifecycle-secret";

/// Clock whose readings the test moves between calls.
struct TestClock {
    state: Mutex<(DateTime<Utc>, Duration)>,
}

impl TestClock {
    fn new(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new((now, Duration::from_secs(600))),
        })
    }

    fn advance(&self, by: chrono::Duration) {
        let mut state = self.state.lock().unwrap();
        state.0 = state.0 + by;
        state.1 += by.to_std().unwrap();
    }

    fn set_wall(&self, now: DateTime<Utc>) {
        self.state.lock().unwrap().0 = now;
    }

    fn set_elapsed(&self, elapsed: Duration) {
        self.state.lock().unwrap().1 = elapsed;
    }
}

impl Clock for TestClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.state.lock().unwrap().0
    }

    fn elapsed(&self) -> Duration {
        self.state.lock().unwrap().1
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

fn config() -> TrustgateConfig {
    TrustgateConfig::new(APP, SECRET, "trustgate-lifecycle")
}

fn manager(store: Arc<dyn TrustStore>, clock: Arc<TestClock>) -> LicenseManager {
    LicenseManager::with_clock(config(), store, clock).unwrap()
}

fn issue_for(manager: &LicenseManager) -> String {
    format!("{}-7F3A9C21B0", device_prefix(&manager.fingerprint().unwrap()))
}

#[test]
fn activation_survives_restart_on_file_store() {
    let dir = tempfile::TempDir::new().unwrap();
    let clock = TestClock::new(t0());

    let code = {
        let store = Arc::new(FileStore::with_path(dir.path().to_path_buf()).unwrap());
        let manager = manager(store, clock.clone());
        let code = issue_for(&manager);
        manager.validate_and_activate(&code).unwrap();
        code
    };

    clock.advance(chrono::Duration::hours(3));
    let store = Arc::new(FileStore::with_path(dir.path().to_path_buf()).unwrap());
    let manager = manager(store, clock);

    let record = manager.record().unwrap();
    assert_eq!(record.code.as_deref(), Some(code.as_str()));
    assert_eq!(
        record.expiry,
        Some(Expiry::At(t0() + chrono::Duration::days(365)))
    );
    assert_eq!(manager.validate_license().unwrap(), LockState::Valid);
}

#[test]
fn fingerprint_is_stable_across_managers() {
    let store: Arc<dyn TrustStore> = Arc::new(MemoryStore::new());
    let clock = TestClock::new(t0());
    let first = manager(store.clone(), clock.clone()).fingerprint().unwrap();
    let second = manager(store, clock).fingerprint().unwrap();
    assert_eq!(first, second);
}

#[test]
fn code_from_another_device_is_rejected() {
    let clock = TestClock::new(t0());
    let issuer = manager(Arc::new(MemoryStore::new()), clock.clone());
    let foreign_code = issue_for(&issuer);

    let store: Arc<dyn TrustStore> = Arc::new(MemoryStore::new());
    let manager = manager(store, clock);
    assert_ne!(issuer.fingerprint().unwrap(), manager.fingerprint().unwrap());

    assert_eq!(
        manager.validate_and_activate(&foreign_code).unwrap_err(),
        TrustgateError::DeviceMismatch
    );
    assert_eq!(manager.check_license_status().unwrap(), LockState::NoLicense);
}

#[test]
fn clock_rollback_locks_until_master_code() {
    let store: Arc<dyn TrustStore> = Arc::new(MemoryStore::new());
    let clock = TestClock::new(t0());
    let manager = manager(store, clock.clone());
    manager
        .validate_and_activate(&issue_for(&manager))
        .unwrap();

    clock.advance(chrono::Duration::days(2));
    assert_eq!(manager.validate_license().unwrap(), LockState::Valid);

    // User winds the calendar back a day to stretch the license.
    clock.set_wall(t0() + chrono::Duration::days(1));
    assert_eq!(manager.check_license_status().unwrap(), LockState::TimeTamper);
    assert!(!manager.snapshot().unwrap().locks.time());

    assert_eq!(manager.validate_license().unwrap(), LockState::TimeTamper);
    assert!(manager.snapshot().unwrap().locks.is_set(LockKind::Time));

    // Re-activating a standard code does not clear the lock.
    manager
        .validate_and_activate(&issue_for(&manager))
        .unwrap();
    assert_eq!(manager.validate_license().unwrap(), LockState::TimeTamper);

    let master = format!(
        "MASTER-UNLIMITED-{}-HELPDESK",
        master_signature("UNLIMITED", SECRET)
    );
    manager.validate_and_activate(&master).unwrap();
    assert_eq!(manager.validate_license().unwrap(), LockState::Valid);
    assert!(manager.snapshot().unwrap().locks.time());
}

#[test]
fn monotonic_rewind_is_time_tamper() {
    let store: Arc<dyn TrustStore> = Arc::new(MemoryStore::new());
    let clock = TestClock::new(t0());
    let manager = manager(store, clock.clone());
    manager
        .validate_and_activate(&issue_for(&manager))
        .unwrap();

    clock.advance(chrono::Duration::hours(1));
    clock.set_elapsed(Duration::from_secs(5));
    assert_eq!(manager.validate_license().unwrap(), LockState::TimeTamper);
}

#[test]
fn clone_checkpoint_wipes_license_but_keeps_lock() {
    let store: Arc<dyn TrustStore> = Arc::new(MemoryStore::new());
    let clock = TestClock::new(t0());
    let manager = manager(store.clone(), clock);
    manager
        .validate_and_activate(&issue_for(&manager))
        .unwrap();

    let env = RuntimeEnvironment {
        app_id: APP.to_string(),
        display_label: "OtoService".to_string(),
        data_dir: "/data/user/95/com.example.otoservice".to_string(),
        ..RuntimeEnvironment::default()
    };
    assert_eq!(
        manager.startup_checkpoint(&env).unwrap(),
        LockState::CloneTamper
    );

    let record = manager.record().unwrap();
    assert!(!record.active);
    assert_eq!(record.code, None);
    assert_eq!(
        manager
            .validate_and_activate(&issue_for(&manager))
            .unwrap_err(),
        TrustgateError::CloneLocked
    );
}

#[test]
fn interrupted_activation_is_not_valid() {
    let store: Arc<dyn TrustStore> = Arc::new(MemoryStore::new());
    let clock = TestClock::new(t0());
    let manager = manager(store.clone(), clock);
    manager
        .validate_and_activate(&issue_for(&manager))
        .unwrap();

    store
        .set_bool(trustgate::Namespace::License, "active", false)
        .unwrap();
    assert_eq!(manager.check_license_status().unwrap(), LockState::NoLicense);
}
