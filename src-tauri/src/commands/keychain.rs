//! OS keychain storage for provider API keys. Keys never touch the
//! preferences store or the frontend beyond a set/is-set/delete round trip.

use keyring::Entry;
use tracing::{info, warn};

use crate::error::DecorMateError;

const KEYRING_USER: &str = "decormate";

fn entry_for(service: &str) -> Result<Entry, String> {
    Entry::new(service, KEYRING_USER).map_err(|e| {
        warn!("Failed to create keyring entry for {}: {}", service, e);
        DecorMateError::Keychain(e.to_string()).into()
    })
}

#[tauri::command]
pub fn set_api_key(service: &str, key: &str) -> Result<(), String> {
    info!("Setting API key for service: {}", service);
    entry_for(service)?.set_password(key).map_err(|e| {
        warn!("Failed to set password for {}: {}", service, e);
        DecorMateError::Keychain(e.to_string()).into()
    })
}

#[tauri::command]
pub fn get_api_key(service: &str) -> Result<Option<String>, String> {
    info!("Getting API key for service: {}", service);
    match entry_for(service)?.get_password() {
        Ok(password) => Ok(Some(password)),
        Err(keyring::Error::NoEntry) => {
            info!("No API key found for service: {}", service);
            Ok(None)
        }
        Err(e) => {
            warn!("Failed to get password for {}: {}", service, e);
            Err(DecorMateError::Keychain(e.to_string()).into())
        }
    }
}

#[tauri::command]
pub fn delete_api_key(service: &str) -> Result<(), String> {
    info!("Deleting API key for service: {}", service);
    entry_for(service)?.delete_credential().map_err(|e| {
        warn!("Failed to delete credential for {}: {}", service, e);
        DecorMateError::Keychain(e.to_string()).into()
    })
}
