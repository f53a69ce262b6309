//! Start/stop state shared by the storage backends

use crate::error::{KvError, Result};

/// `Uninitialized → Started → Stopped`; `Stopped` is terminal
///
/// `T` is whatever the backend holds while running.
#[derive(Debug)]
pub enum Lifecycle<T> {
    Uninitialized,
    Started(T),
    Stopped,
}

impl<T> Default for Lifecycle<T> {
    fn default() -> Self {
        Lifecycle::Uninitialized
    }
}

impl<T> Lifecycle<T> {
    /// Transition to `Started` with the value produced by `init`
    ///
    /// `init` only runs from `Uninitialized`. If it fails, the state is left
    /// untouched.
    pub fn start_with(&mut self, init: impl FnOnce() -> Result<T>) -> Result<()> {
        match self {
            Lifecycle::Uninitialized => {
                *self = Lifecycle::Started(init()?);
                Ok(())
            }
            Lifecycle::Started(_) => Err(KvError::AlreadyStarted),
            Lifecycle::Stopped => Err(KvError::Stopped),
        }
    }

    /// Move to `Stopped`, handing back the running value the first time
    pub fn stop(&mut self) -> Option<T> {
        match std::mem::replace(self, Lifecycle::Stopped) {
            Lifecycle::Started(value) => Some(value),
            _ => None,
        }
    }

    pub fn running(&self) -> Result<&T> {
        match self {
            Lifecycle::Started(value) => Ok(value),
            Lifecycle::Uninitialized => Err(KvError::NotStarted),
            Lifecycle::Stopped => Err(KvError::Stopped),
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self, Lifecycle::Started(_))
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Lifecycle::Stopped)
    }
}
