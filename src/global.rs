//! Process-wide store mirroring into the real process environment.
//!
//! Functions that write the environment are `unsafe` for the same reason as
//! [`TargetEnv::process`](crate::TargetEnv::process).

use std::path::PathBuf;
use std::sync::OnceLock;

use crate::error::Error;
use crate::model::{LoadReport, Persist};
use crate::store::EnvStore;

static GLOBAL: OnceLock<EnvStore> = OnceLock::new();

fn store() -> &'static EnvStore {
    GLOBAL.get_or_init(|| {
        // SAFETY: building the store writes nothing. The only ways to reach its
        // environment writes are `global`, `load_env`, `set` and `set_save`,
        // all of which are unsafe and pass the contract on.
        unsafe { EnvStore::process() }
    })
}

/// The process-wide store.
///
/// # Safety
///
/// The returned store writes the process environment through safe methods.
/// The caller must ensure no other thread reads or writes the process
/// environment outside this store while it is in use.
pub unsafe fn global() -> &'static EnvStore {
    store()
}

/// Set the backing file of the global store. Defaults to `.env`.
pub fn set_env_path(path: impl Into<PathBuf>) {
    store().set_path(path);
}

pub fn env_path() -> PathBuf {
    store().env_path()
}

/// Load the backing file into the global store and the process environment.
///
/// # Safety
///
/// See [`global`].
pub unsafe fn load_env() -> Result<LoadReport, Error> {
    store().load()
}

pub fn get(key: &str) -> String {
    store().get(key)
}

/// # Safety
///
/// See [`global`].
pub unsafe fn set(key: &str, value: &str) -> Result<(), Error> {
    store().set(key, value)
}

/// # Safety
///
/// See [`global`].
pub unsafe fn set_save(key: &str, value: &str, persist: Persist) -> Result<(), Error> {
    store().set_save(key, value, persist)
}

/// Write the global store to its backing file.
pub fn save_env() -> Result<(), Error> {
    store().save()
}
