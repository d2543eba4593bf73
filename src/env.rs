use std::collections::BTreeMap;

use crate::error::{EnvWriteError, EnvWriteErrorKind};

/// Destination that store writes are mirrored into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEnv {
    kind: TargetEnvKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TargetEnvKind {
    /// Apply entries to the current process environment.
    ///
    /// This writes through [`std::env::set_var`], which mutates global process
    /// state and is not thread-safe for concurrent environment access.
    Process,
    /// Apply entries to an in-memory map.
    Memory(BTreeMap<String, String>),
}

impl Default for TargetEnv {
    fn default() -> Self {
        Self::memory()
    }
}

impl TargetEnv {
    /// Create a process-environment target.
    ///
    /// # Safety
    ///
    /// The caller must ensure no other threads concurrently read or write the
    /// process environment for the duration of operations that may mutate this
    /// target.
    pub unsafe fn process() -> Self {
        Self {
            kind: TargetEnvKind::Process,
        }
    }

    /// Create an in-memory environment target.
    ///
    /// Use this to avoid mutating the process environment.
    pub fn memory() -> Self {
        Self::from_memory(BTreeMap::new())
    }

    /// Create an in-memory environment target from an existing map.
    pub fn from_memory(map: BTreeMap<String, String>) -> Self {
        Self {
            kind: TargetEnvKind::Memory(map),
        }
    }

    pub fn is_process(&self) -> bool {
        matches!(self.kind, TargetEnvKind::Process)
    }

    pub fn as_memory(&self) -> Option<&BTreeMap<String, String>> {
        match &self.kind {
            TargetEnvKind::Memory(map) => Some(map),
            TargetEnvKind::Process => None,
        }
    }

    pub(crate) fn get_var(&self, key: &str) -> Option<String> {
        match &self.kind {
            TargetEnvKind::Process => {
                std::env::var_os(key).map(|value| value.to_string_lossy().into_owned())
            }
            TargetEnvKind::Memory(map) => map.get(key).cloned(),
        }
    }

    /// Write one variable, rejecting what the host would refuse.
    ///
    /// Memory targets apply the same rules so both behave alike.
    pub(crate) fn set_var(&mut self, key: &str, value: &str) -> Result<(), EnvWriteError> {
        check_var(key, value)?;
        match &mut self.kind {
            // SAFETY: a process target can only be built through the unsafe
            // `TargetEnv::process`, whose caller upholds the exclusivity contract.
            TargetEnvKind::Process => unsafe { std::env::set_var(key, value) },
            TargetEnvKind::Memory(map) => {
                map.insert(key.to_owned(), value.to_owned());
            }
        }
        Ok(())
    }
}

fn check_var(key: &str, value: &str) -> Result<(), EnvWriteError> {
    let kind = if key.is_empty() {
        EnvWriteErrorKind::EmptyKey
    } else if key.contains('=') {
        EnvWriteErrorKind::KeyContainsEquals
    } else if key.contains('\0') {
        EnvWriteErrorKind::KeyContainsNul
    } else if value.contains('\0') {
        EnvWriteErrorKind::ValueContainsNul
    } else {
        return Ok(());
    };

    Err(EnvWriteError {
        key: key.to_owned(),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_target_records_writes() {
        let mut target = TargetEnv::memory();
        target.set_var("A", "1").expect("valid key");

        assert_eq!(target.get_var("A").as_deref(), Some("1"));
        assert!(!target.is_process());
    }

    #[test]
    fn rejects_keys_the_host_refuses() {
        let mut target = TargetEnv::memory();
        for (key, value, kind) in [
            ("", "v", EnvWriteErrorKind::EmptyKey),
            ("A=B", "v", EnvWriteErrorKind::KeyContainsEquals),
            ("A\0", "v", EnvWriteErrorKind::KeyContainsNul),
            ("A", "v\0", EnvWriteErrorKind::ValueContainsNul),
        ] {
            let err = target.set_var(key, value).expect_err("expected env error");
            assert_eq!(err.kind, kind);
        }
        assert!(target.as_memory().expect("memory target").is_empty());
    }

    #[test]
    fn accepts_keys_with_spaces() {
        let mut target = TargetEnv::memory();
        target.set_var("FOO ", " bar").expect("spaces are allowed");
        assert_eq!(target.get_var("FOO ").as_deref(), Some(" bar"));
    }
}
