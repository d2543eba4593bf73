use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::env::TargetEnv;
use crate::error::Error;
use crate::loader::load_file;
use crate::model::{LoadReport, ParseMode, Persist, SaveFormat};
use crate::persist::{Persister, SaveHandle};

const DEFAULT_PATH: &str = ".env";

/// In-memory key-value store backed by a `.env` file.
///
/// Every write goes to the store and then to its [`TargetEnv`] under one
/// lock, so readers never see one updated without the other. Saves are
/// written by a dedicated worker thread in the order they were requested.
///
/// ```no_run
/// use envkeep::{EnvStore, Persist};
///
/// let store = EnvStore::new().path("app.env");
/// store.load()?;
/// store.set_save("PORT", "8080", Persist::Blocking)?;
/// assert_eq!(store.get("PORT"), "8080");
/// # Ok::<(), envkeep::Error>(())
/// ```
#[derive(Debug)]
pub struct EnvStore {
    state: Mutex<State>,
    parse_mode: ParseMode,
    save_format: SaveFormat,
}

#[derive(Debug)]
struct State {
    entries: BTreeMap<String, String>,
    target: TargetEnv,
    path: PathBuf,
    persister: Option<Persister>,
}

impl State {
    fn set(&mut self, key: &str, value: &str) -> Result<(), Error> {
        // Not rolled back when the target refuses the key.
        self.entries.insert(key.to_owned(), value.to_owned());
        self.target.set_var(key, value)?;
        Ok(())
    }
}

impl EnvStore {
    /// Store reading `.env` and mirroring into an in-memory target.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store mirroring into the process environment.
    ///
    /// # Safety
    ///
    /// Same contract as [`TargetEnv::process`]: no other thread may read or
    /// write the process environment while this store mutates it.
    pub unsafe fn process() -> Self {
        // SAFETY: forwarded to our caller.
        Self::new().target(unsafe { TargetEnv::process() })
    }

    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_mut().path = path.into();
        self
    }

    pub fn parse_mode(mut self, parse_mode: ParseMode) -> Self {
        self.parse_mode = parse_mode;
        self
    }

    pub fn save_format(mut self, save_format: SaveFormat) -> Self {
        self.save_format = save_format;
        self
    }

    pub fn target(mut self, target: TargetEnv) -> Self {
        self.state_mut().target = target;
        self
    }

    /// Change the backing file used by later loads and saves.
    pub fn set_path(&self, path: impl Into<PathBuf>) {
        self.lock().path = path.into();
    }

    pub fn env_path(&self) -> PathBuf {
        self.lock().path.clone()
    }

    /// Reset the store and fill it from the backing file.
    ///
    /// A missing file is not an error and leaves the target untouched.
    pub fn load(&self) -> Result<LoadReport, Error> {
        let mut state = self.lock();
        let State {
            entries,
            target,
            path,
            ..
        } = &mut *state;
        load_file(path, self.parse_mode, entries, target)
    }

    /// Value for `key`, or an empty string when absent.
    pub fn get(&self, key: &str) -> String {
        self.get_opt(key).unwrap_or_default()
    }

    pub fn get_opt(&self, key: &str) -> Option<String> {
        self.lock().entries.get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.lock().entries.clone()
    }

    /// Value the target currently holds for `key`.
    pub fn mirrored(&self, key: &str) -> Option<String> {
        self.lock().target.get_var(key)
    }

    /// Contents of an in-memory target, `None` for the process environment.
    pub fn mirror_snapshot(&self) -> Option<BTreeMap<String, String>> {
        self.lock().target.as_memory().cloned()
    }

    /// Write `key=value` to the store and the target.
    ///
    /// Fails only when the target refuses the variable; the store keeps the
    /// new value in that case.
    pub fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.lock().set(key, value)
    }

    /// [`set`](Self::set), then persist the whole store.
    ///
    /// The save runs even when the target refused the variable. Its outcome
    /// is never returned: [`Persist::Blocking`] waits for it and drops the
    /// result, [`Persist::Background`] drops the handle right away. Use
    /// [`save`](Self::save) or [`save_in_background`](Self::save_in_background)
    /// to observe save errors.
    pub fn set_save(&self, key: &str, value: &str, persist: Persist) -> Result<(), Error> {
        let (result, handle) = {
            let mut state = self.lock();
            let result = state.set(key, value);
            (result, self.submit_save(&mut state))
        };

        match persist {
            Persist::Blocking => {
                if let Err(err) = handle.wait() {
                    debug!(error = %err, "blocking save failed, result discarded");
                }
            }
            Persist::Background => handle.discard(),
        }
        result
    }

    /// Write the store to the backing file and wait for the result.
    pub fn save(&self) -> Result<(), Error> {
        self.save_in_background().wait()
    }

    /// Queue a save of the current contents.
    pub fn save_in_background(&self) -> SaveHandle {
        let mut state = self.lock();
        self.submit_save(&mut state)
    }

    // Snapshot and enqueue under the caller's guard so queue order matches
    // mutation order.
    fn submit_save(&self, state: &mut State) -> SaveHandle {
        let persister = match state.persister.take() {
            Some(persister) => persister,
            None => match Persister::spawn() {
                Ok(persister) => persister,
                Err(err) => return SaveHandle::ready(Err(err.into())),
            },
        };

        let handle = persister.submit(state.path.clone(), state.entries.clone(), self.save_format);
        state.persister = Some(persister);
        handle
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&mut self) -> &mut State {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EnvStore {
    fn default() -> Self {
        Self {
            state: Mutex::new(State {
                entries: BTreeMap::new(),
                target: TargetEnv::memory(),
                path: PathBuf::from(DEFAULT_PATH),
                persister: None,
            }),
            parse_mode: ParseMode::Lenient,
            save_format: SaveFormat::LineSeparated,
        }
    }
}
