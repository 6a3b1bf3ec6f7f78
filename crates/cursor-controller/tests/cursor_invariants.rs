use std::sync::Arc;

use autopilot_core_types::{AutomationError, Point};
use cursor_controller::{
    CursorConfig, CursorController, CursorUi, HeadlessCursor, MouseButton, OverlayFrame,
    RecordingOverlay, RenderedCursor,
};
use tokio_util::sync::CancellationToken;

fn rendered(overlay: Arc<RecordingOverlay>) -> RenderedCursor {
    let config = CursorConfig {
        render: true,
        move_duration_ms: 100,
        frame_interval_ms: 10,
        start: Point::new(0.0, 0.0),
    };
    RenderedCursor::new(&config, overlay)
}

#[tokio::test]
async fn nested_press_is_rejected() {
    let cursor = HeadlessCursor::default();
    cursor.left_button_down().await.unwrap();
    let err = cursor.left_button_down().await.unwrap_err();
    assert!(matches!(err, AutomationError::CursorState(_)));

    let err = cursor.right_button_down().await.unwrap_err();
    assert!(matches!(err, AutomationError::CursorState(_)));

    cursor.button_up().await.unwrap();
    cursor.right_button_down().await.unwrap();
    assert_eq!(cursor.snapshot().await.button, Some(MouseButton::Right));
}

#[tokio::test]
async fn release_without_press_is_a_noop() {
    let cursor = HeadlessCursor::default();
    tokio_test::assert_ok!(cursor.button_up().await);
    tokio_test::assert_ok!(cursor.button_up().await);
    assert_eq!(cursor.snapshot().await.button, None);
}

#[tokio::test]
async fn sequential_moves_end_at_last_target() {
    let cancel = CancellationToken::new();
    let cursor = HeadlessCursor::default();
    let targets = [
        Point::new(5.0, 5.0),
        Point::new(50.0, 10.0),
        Point::new(12.5, 80.0),
    ];
    for target in targets {
        cursor.move_to(target, &cancel).await.unwrap();
    }
    assert_eq!(cursor.position().await, Point::new(12.5, 80.0));
    assert!(!cursor.should_render());
}

#[tokio::test(start_paused = true)]
async fn rendered_move_animates_and_arrives() {
    let overlay = Arc::new(RecordingOverlay::new());
    let cursor = rendered(overlay.clone());
    let cancel = CancellationToken::new();

    cursor.move_to(Point::new(100.0, 50.0), &cancel).await.unwrap();

    assert_eq!(cursor.position().await, Point::new(100.0, 50.0));
    assert_eq!(overlay.last_position(), Some(Point::new(100.0, 50.0)));
    let draws = overlay
        .frames()
        .into_iter()
        .filter(|frame| matches!(frame, OverlayFrame::Draw { .. }))
        .count();
    assert_eq!(draws, 10);
}

#[tokio::test(start_paused = true)]
async fn overlapping_moves_are_serialized() {
    let overlay = Arc::new(RecordingOverlay::new());
    let cursor = Arc::new(rendered(overlay.clone()));
    let cancel = CancellationToken::new();

    let first = Point::new(100.0, 0.0);
    let second = Point::new(100.0, 100.0);
    let (a, b) = tokio::join!(cursor.move_to(first, &cancel), cursor.move_to(second, &cancel));
    a.unwrap();
    b.unwrap();

    let positions: Vec<Point> = overlay
        .frames()
        .into_iter()
        .filter_map(|frame| match frame {
            OverlayFrame::Draw { position, .. } => Some(position),
            OverlayFrame::Visibility(_) => None,
        })
        .collect();
    let arrival = positions
        .iter()
        .position(|p| *p == first)
        .expect("first move arrives");
    assert!(positions[..arrival].iter().all(|p| p.y == 0.0));
    assert!(positions[arrival..].iter().all(|p| p.x == 100.0));
    assert_eq!(cursor.position().await, second);
}

#[tokio::test(start_paused = true)]
async fn cancelled_move_settles_with_timeout() {
    let overlay = Arc::new(RecordingOverlay::new());
    let cursor = Arc::new(rendered(overlay));
    let cancel = CancellationToken::new();

    let pending = {
        let cursor = cursor.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { cursor.move_to(Point::new(300.0, 300.0), &cancel).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    cancel.cancel();

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, AutomationError::Timeout(_)));
    assert_ne!(cursor.position().await, Point::new(300.0, 300.0));
}

#[tokio::test]
async fn visibility_never_moves_the_pointer() {
    let overlay = Arc::new(RecordingOverlay::new());
    let controller = CursorController::from_config(
        &CursorConfig {
            move_duration_ms: 0,
            ..CursorConfig::default()
        },
        overlay.clone(),
    );
    let cancel = CancellationToken::new();
    controller
        .move_to(Point::new(7.0, 9.0), &cancel)
        .await
        .unwrap();

    let visual = controller.rendered().expect("rendered variant");
    visual.show().await;
    assert!(visual.is_visible().await);
    visual.hide().await;
    assert!(!visual.is_visible().await);
    assert_eq!(controller.position().await, Point::new(7.0, 9.0));
    assert!(overlay.frames().contains(&OverlayFrame::Visibility(true)));
}

#[test]
fn headless_config_selects_headless_variant() {
    let controller =
        CursorController::from_config(&CursorConfig::headless(), Arc::new(RecordingOverlay::new()));
    assert!(controller.rendered().is_none());
    assert!(!controller.should_render());
}
