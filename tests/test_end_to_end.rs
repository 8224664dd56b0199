//! Raw frames in, backend calls out

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use steamcon_rs::backend::{MockOutputBackend, OutputCall};
use steamcon_rs::mapping::config::Config;
use steamcon_rs::steamcon::constants::{MASK_A, MASK_B, MASK_RPAD_TOUCH, MASK_STEAM, MASK_X};
use steamcon_rs::steamcon::FrameBuilder;
use steamcon_rs::ControllerManager;

const CONFIG: &str = r#"
[bindings]
A = { type = "key", key = "space" }
X = { type = "key", key = "x" }
B = { type = "macro", pressed = [{ type = "press", keys = "a" }, { type = "wait", ms = 50 }, { type = "release", keys = "a" }] }
Steam = { type = "layer", name = "fn", transparent = true }
RightTrigger = { type = "trigger_button", button = { type = "key", key = "mouse_left" } }
Stick = { type = "stick_cross", north = { type = "key", key = "w" }, east = { type = "key", key = "d" } }
RPadTouch = { type = "pad_trackball", sensitivity = 0.01, has_inertia = false }

[action_maps.fn]
A = { type = "key", key = "f1" }
"#;

fn init_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Info)
        .try_init();
}

fn setup() -> (ControllerManager, MockOutputBackend) {
    init_logger();
    let config = Config::from_toml_str(CONFIG).unwrap();
    config.validate().unwrap();
    let mock = MockOutputBackend::new();
    let manager = ControllerManager::new(&config, Arc::new(mock.clone())).unwrap();
    (manager, mock)
}

fn keys(combo: &str) -> Vec<String> {
    steamcon_rs::backend::parse_keys(combo)
}

#[test]
fn test_button_press_release_pair() {
    let (mut manager, mock) = setup();

    manager.process_frame(&FrameBuilder::new().buttons(MASK_A).build()).unwrap();
    // Still held: no repeat
    manager.process_frame(&FrameBuilder::new().buttons(MASK_A).build()).unwrap();
    manager.process_frame(&FrameBuilder::new().build()).unwrap();

    assert_eq!(
        mock.calls(),
        vec![OutputCall::Press(keys("space")), OutputCall::Release(keys("space"))]
    );
}

#[test]
fn test_transparent_layer_from_frames() {
    let (mut manager, mock) = setup();

    manager.process_frame(&FrameBuilder::new().buttons(MASK_STEAM).build()).unwrap();
    assert_eq!(manager.router().layer_names(), vec!["base", "fn"]);

    // Bound in the layer
    manager
        .process_frame(&FrameBuilder::new().buttons(MASK_STEAM | MASK_A).build())
        .unwrap();
    // Falls through to the base
    manager
        .process_frame(&FrameBuilder::new().buttons(MASK_STEAM | MASK_A | MASK_X).build())
        .unwrap();
    manager.process_frame(&FrameBuilder::new().buttons(MASK_STEAM).build()).unwrap();
    manager.process_frame(&FrameBuilder::new().build()).unwrap();
    assert_eq!(manager.router().layer_names(), vec!["base"]);

    assert_eq!(
        mock.calls(),
        vec![
            OutputCall::Press(keys("f1")),
            OutputCall::Press(keys("x")),
            OutputCall::Release(keys("x")),
            OutputCall::Release(keys("f1")),
        ]
    );
}

#[test]
fn test_trigger_pull_clicks() {
    let (mut manager, mock) = setup();

    manager.process_frame(&FrameBuilder::new().triggers(0, 60).build()).unwrap();
    assert!(mock.calls().is_empty());
    manager.process_frame(&FrameBuilder::new().triggers(0, 200).build()).unwrap();
    manager.process_frame(&FrameBuilder::new().triggers(0, 0).build()).unwrap();

    assert_eq!(
        mock.calls(),
        vec![OutputCall::Press(keys("mouse_left")), OutputCall::Release(keys("mouse_left"))]
    );
}

#[test]
fn test_stick_cross_from_frames() {
    let (mut manager, mock) = setup();

    manager.process_frame(&FrameBuilder::new().slot_a(0, 30000).build()).unwrap();
    assert_eq!(mock.held_keys(), keys("w"));
    manager.process_frame(&FrameBuilder::new().slot_a(30000, 0).build()).unwrap();
    assert_eq!(mock.held_keys(), keys("d"));
    manager.process_frame(&FrameBuilder::new().build()).unwrap();
    assert!(mock.held_keys().is_empty());
}

#[test]
fn test_trackball_moves_pointer() {
    let (mut manager, mock) = setup();

    manager
        .process_frame(&FrameBuilder::new().buttons(MASK_RPAD_TOUCH).slot_b(0, 0).build())
        .unwrap();
    assert_eq!(mock.total_motion(), (0, 0));

    manager
        .process_frame(&FrameBuilder::new().buttons(MASK_RPAD_TOUCH).slot_b(10000, 0).build())
        .unwrap();
    let (dx, _) = mock.total_motion();
    assert!(dx > 0, "dx = {}", dx);
}

#[test]
fn test_shutdown_releases_everything() {
    let (mut manager, mock) = setup();
    manager
        .process_frame(&FrameBuilder::new().buttons(MASK_A | MASK_X).build())
        .unwrap();
    assert_eq!(mock.held_keys().len(), 2);

    manager.shutdown();
    assert!(mock.held_keys().is_empty());
}

#[test]
fn test_quick_macro_tap_plays_whole_sequence() {
    let (mut manager, mock) = setup();

    manager.process_frame(&FrameBuilder::new().buttons(MASK_B).build()).unwrap();
    thread::sleep(Duration::from_millis(5));
    manager.process_frame(&FrameBuilder::new().build()).unwrap();
    thread::sleep(Duration::from_millis(150));

    assert_eq!(
        mock.calls(),
        vec![OutputCall::Press(keys("a")), OutputCall::Release(keys("a"))]
    );
    manager.shutdown();
    assert!(mock.held_keys().is_empty());
}

#[test]
fn test_shutdown_mid_macro_releases_keys() {
    let (mut manager, mock) = setup();

    manager.process_frame(&FrameBuilder::new().buttons(MASK_B).build()).unwrap();
    thread::sleep(Duration::from_millis(5));
    manager.shutdown();

    assert!(mock.held_keys().is_empty());
}

#[test]
fn test_default_config_copy_paste_macro() {
    init_logger();
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/default.toml");
    let config = Config::load(path).unwrap();
    let mock = MockOutputBackend::new();
    let mut manager = ControllerManager::new(&config, Arc::new(mock.clone())).unwrap();

    manager.process_frame(&FrameBuilder::new().buttons(MASK_STEAM).build()).unwrap();
    manager
        .process_frame(&FrameBuilder::new().buttons(MASK_STEAM | MASK_X).build())
        .unwrap();
    thread::sleep(Duration::from_millis(5));
    manager.process_frame(&FrameBuilder::new().buttons(MASK_STEAM).build()).unwrap();
    thread::sleep(Duration::from_millis(150));
    manager.process_frame(&FrameBuilder::new().build()).unwrap();

    assert_eq!(
        mock.calls(),
        vec![
            OutputCall::Press(keys("ctrl+c")),
            OutputCall::Release(keys("ctrl+c")),
            OutputCall::Press(keys("ctrl+v")),
            OutputCall::Release(keys("ctrl+v")),
        ]
    );
}

#[test]
fn test_default_config_runs() {
    init_logger();
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/default.toml");
    let config = Config::load(path).unwrap();
    let mock = MockOutputBackend::new();
    let mut manager = ControllerManager::new(&config, Arc::new(mock.clone())).unwrap();

    manager.process_frame(&FrameBuilder::new().buttons(MASK_A).build()).unwrap();
    manager.process_frame(&FrameBuilder::new().build()).unwrap();
    assert_eq!(
        mock.calls(),
        vec![OutputCall::Press(keys("enter")), OutputCall::Release(keys("enter"))]
    );
}
