//! License activation example.
//!
//! Prints this install's fingerprint, activates a code, runs the startup
//! checkpoint and a background network time check.
//!
//! # Running
//!
//! ```bash
//! cargo run --example activate -- "YOUR-LICENSE-CODE"
//! ```
//!
//! # Note
//!
//! In production, `app_id` and `master_secret` should be compile-time
//! constants embedded in your binary, not loaded from environment variables.

use trustgate::{LicenseManager, LockState, RuntimeEnvironment, TrustgateConfig, TrustgateError};

// These would be your application's actual constants in production.
const APP_ID: &str = "activate";
const MASTER_SECRET: &str = "example-master-secret";

fn main() {
    let config = TrustgateConfig::new(APP_ID, MASTER_SECRET, "trustgate-example");

    let manager = match LicenseManager::new(config) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    match manager.fingerprint() {
        Ok(fp) => println!("Device fingerprint: {}", fp),
        Err(e) => {
            eprintln!("Could not read fingerprint: {}", e);
            std::process::exit(1);
        }
    }

    // Activate a code if one was given
    if let Some(code) = std::env::args().nth(1) {
        match manager.validate_and_activate(&code) {
            Ok(record) => {
                println!("✓ License activated");
                println!("  Master: {}", record.is_master);
                if let Some(expiry) = record.expiry {
                    println!("  Expiry: {:?}", expiry);
                }
            }
            Err(e) => {
                match &e {
                    TrustgateError::DeviceMismatch => {
                        eprintln!("This code was issued for a different device");
                    }
                    TrustgateError::CloneLocked | TrustgateError::CodeLocked => {
                        eprintln!("Installation is locked: {}", e);
                    }
                    _ => eprintln!("Activation failed: {}", e),
                }
                if !e.is_recoverable() {
                    std::process::exit(1);
                }
            }
        }
    }

    // App-start checkpoint: detectors, then a validating check
    let data_dir = dirs::data_dir().unwrap_or_default().join("trustgate-example");
    let env = RuntimeEnvironment::current(&data_dir, &[]);
    match manager.startup_checkpoint(&env) {
        Ok(LockState::Valid) => println!("✓ License valid"),
        Ok(state) => println!("✗ License state: {}", state),
        Err(e) => eprintln!("Checkpoint failed: {}", e),
    }

    // Network time check, fails open when offline
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Could not start runtime: {}", e);
            return;
        }
    };
    if let Ok(validator) = manager.network_time_validator() {
        let verdict = runtime.block_on(validator.refresh());
        println!("Network time: {:?}", verdict);
    }
}
