//! Tests for the Lifecycle state machine

use rawkv::storage::Lifecycle;
use rawkv::KvError;

#[test]
fn test_starts_uninitialized() {
    let state: Lifecycle<u32> = Lifecycle::default();
    assert!(!state.is_started());
    assert!(!state.is_stopped());
    assert!(matches!(state.running(), Err(KvError::NotStarted)));
}

#[test]
fn test_start_then_stop() {
    let mut state = Lifecycle::default();
    state.start_with(|| Ok(7u32)).unwrap();

    assert!(state.is_started());
    assert_eq!(*state.running().unwrap(), 7);

    assert_eq!(state.stop(), Some(7));
    assert!(state.is_stopped());
    assert!(matches!(state.running(), Err(KvError::Stopped)));

    // Only the first stop hands the value back
    assert_eq!(state.stop(), None);
    assert!(state.is_stopped());
}

#[test]
fn test_second_start_rejected() {
    let mut state = Lifecycle::default();
    state.start_with(|| Ok(1u32)).unwrap();

    let mut ran = false;
    let result = state.start_with(|| {
        ran = true;
        Ok(2)
    });

    assert!(matches!(result, Err(KvError::AlreadyStarted)));
    assert!(!ran);
    assert_eq!(*state.running().unwrap(), 1);
}

#[test]
fn test_start_after_stop_rejected() {
    let mut state: Lifecycle<u32> = Lifecycle::default();
    state.stop();

    assert!(matches!(state.start_with(|| Ok(1)), Err(KvError::Stopped)));
}

#[test]
fn test_failed_init_leaves_state_untouched() {
    let mut state: Lifecycle<u32> = Lifecycle::default();

    let result = state.start_with(|| Err(KvError::Startup("disk on fire".to_string())));
    assert!(matches!(result, Err(KvError::Startup(_))));
    assert!(!state.is_started());

    // A later attempt may still succeed
    state.start_with(|| Ok(3)).unwrap();
    assert_eq!(*state.running().unwrap(), 3);
}
