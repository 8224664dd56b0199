//! Integration tests for the mock output backend

use std::sync::Arc;
use steamcon_rs::backend::{MockOutputBackend, OutputBackend, OutputCall};

fn keys(combo: &str) -> Vec<String> {
    steamcon_rs::backend::parse_keys(combo)
}

#[test]
fn test_mock_output_backend() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Info)
        .try_init();

    let backend = MockOutputBackend::new();

    // All operations should succeed and be logged
    assert!(backend.press(&keys("w")).is_ok());
    assert!(backend.release(&keys("w")).is_ok());
    assert!(backend.move_mouse(10, -5, true).is_ok());
    assert!(backend.scroll(-2, true).is_ok());
    assert!(backend.pull_left_trigger(128).is_ok());
    assert!(backend.set_right_stick(-100, 100).is_ok());

    // Mock accepts any key name
    assert!(backend.press(&keys("not_a_real_key")).is_ok());

    assert_eq!(backend.calls().len(), 7);
    assert_eq!(backend.held_keys(), keys("not_a_real_key"));
}

#[test]
fn test_tap_is_press_then_release() {
    let backend = MockOutputBackend::new();
    backend.tap(&keys("ctrl+c")).unwrap();
    assert_eq!(
        backend.take_calls(),
        vec![OutputCall::Press(keys("ctrl+c")), OutputCall::Release(keys("ctrl+c"))]
    );
    assert!(backend.calls().is_empty());
}

#[test]
fn test_mock_backends_share_log() {
    let backend = MockOutputBackend::new();
    let shared: Arc<dyn OutputBackend> = Arc::new(backend.clone());

    // Both should record into the same log
    assert!(shared.move_mouse(1, 1, true).is_ok());
    assert!(backend.move_mouse(2, 2, true).is_ok());
    assert_eq!(backend.total_motion(), (3, 3));
}
