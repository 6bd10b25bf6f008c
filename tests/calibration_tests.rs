// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the calibration transform and key handling

use kinect_sandbox::app::input::{KeyInput, handle_key_down, handle_key_up};
use kinect_sandbox::app::{AppState, Bound, CalibrationRect, StepPrecision, ViewMode};

const EPSILON: f32 = 1e-5;

fn close(a: [f32; 2], b: [f32; 2]) -> bool {
    (a[0] - b[0]).abs() < EPSILON && (a[1] - b[1]).abs() < EPSILON
}

#[test]
fn test_corners_map_to_bounds_for_any_rectangle() {
    let rects = [
        CalibrationRect::default(),
        CalibrationRect::new(0.0, 1.0, 1.0, 0.0),
        // Mirrored on both axes
        CalibrationRect::new(0.9, 0.1, 0.2, 0.8),
        // Overshooting [0, 1]
        CalibrationRect::new(-0.5, 1.5, 2.0, -1.0),
    ];
    for rect in rects {
        assert!(close(rect.apply(0.0, 0.0), [rect.left, rect.bottom]), "{}", rect);
        assert!(close(rect.apply(1.0, 1.0), [rect.right, rect.top]), "{}", rect);
    }
}

#[test]
fn test_midpoint_scenario() {
    let rect = CalibrationRect::new(-0.008, 0.933, 0.969, 0.095);
    assert!(close(rect.apply(0.5, 0.5), [0.4625, 0.532]));
}

#[test]
fn test_calibration_session() {
    let mut state = AppState::new(
        CalibrationRect::new(0.0, 1.0, 1.0, 0.0),
        ViewMode::Depth,
        Default::default(),
    );

    // Coarse: pull the left edge in twice, push the top out once
    handle_key_down(&mut state, KeyInput::Char('a'));
    handle_key_down(&mut state, KeyInput::Char('a'));
    handle_key_down(&mut state, KeyInput::Char('w'));

    // Fine: back off the left edge a little
    handle_key_down(&mut state, KeyInput::Char('q'));
    assert_eq!(state.precision, StepPrecision::Fine);
    handle_key_down(&mut state, KeyInput::Char('A'));

    assert!((state.calibration.get(Bound::Left) - 0.099).abs() < EPSILON);
    assert!((state.calibration.get(Bound::Top) - 1.05).abs() < EPSILON);
    assert_eq!(state.calibration.get(Bound::Right), 1.0);
    assert_eq!(state.calibration.get(Bound::Bottom), 0.0);

    handle_key_up(&mut state, KeyInput::Space);
    assert_eq!(state.view_mode, ViewMode::Color);
    handle_key_up(&mut state, KeyInput::Space);
    assert_eq!(state.view_mode, ViewMode::Depth);
}
