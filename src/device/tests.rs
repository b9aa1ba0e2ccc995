use super::*;
use crate::error::SessionError;
use crate::sim::SimulatedCamera;
use async_trait::async_trait;
use std::sync::Arc;

fn supported() -> Vec<(u32, u32)> {
    vec![(640, 480), (1280, 720), (1920, 1080)]
}

fn front_camera_constraints() -> Constraints {
    Constraints::new(Facing::User, 1280, 720)
}

struct BrokenService;

#[async_trait]
impl DeviceCapabilityService for BrokenService {
    async fn request(&self, _constraints: &Constraints) -> Result<DeviceHandle, SessionError> {
        Err(SessionError::EncodeFailed {
            details: "driver crashed".to_string(),
        })
    }
}

struct TracklessService;

#[async_trait]
impl DeviceCapabilityService for TracklessService {
    async fn request(&self, _constraints: &Constraints) -> Result<DeviceHandle, SessionError> {
        Ok(DeviceHandle::new(Vec::new()))
    }
}

#[test]
fn test_nearest_resolution() {
    let constraints = front_camera_constraints();
    assert_eq!(constraints.nearest_resolution(&supported()), Some((1280, 720)));

    let odd = Constraints::new(Facing::User, 1000, 700);
    assert_eq!(odd.nearest_resolution(&supported()), Some((1280, 720)));

    let small = Constraints::new(Facing::Environment, 320, 240);
    assert_eq!(small.nearest_resolution(&supported()), Some((640, 480)));

    assert_eq!(constraints.nearest_resolution(&[]), None);
}

#[tokio::test]
async fn test_acquire_grants_nearest_capability() {
    let camera = Arc::new(SimulatedCamera::new(vec![(640, 480), (1920, 1080)]));
    let acquirer = DeviceAcquirer::new(camera.clone(), front_camera_constraints());

    let mut handle = acquirer.acquire(None).await.unwrap();
    let settings = handle.settings().unwrap();

    assert_eq!((settings.width, settings.height), (640, 480));
    assert_eq!(settings.facing, Facing::User);
    assert_eq!(camera.live_tracks(), 1);

    assert_eq!(handle.release(), 1);
    assert_eq!(camera.live_tracks(), 0);
}

#[tokio::test]
async fn test_acquire_while_held_is_rejected() {
    let camera = Arc::new(SimulatedCamera::new(supported()));
    let acquirer = DeviceAcquirer::new(camera.clone(), front_camera_constraints());

    let mut held = acquirer.acquire(None).await.unwrap();
    let result = acquirer.acquire(Some(held.id())).await;

    assert_eq!(result.unwrap_err(), SessionError::AlreadyActive);
    // rejected before the platform was asked
    assert_eq!(camera.request_count(), 1);
    assert!(!held.is_released());
    held.release();
}

#[tokio::test]
async fn test_acquire_failures() {
    let camera = Arc::new(SimulatedCamera::new(supported()));
    let acquirer = DeviceAcquirer::new(camera.clone(), front_camera_constraints());

    camera.set_deny_permission(true);
    assert!(matches!(
        acquirer.acquire(None).await,
        Err(SessionError::PermissionDenied { .. })
    ));

    camera.set_deny_permission(false);
    camera.set_disconnected(true);
    assert!(matches!(
        acquirer.acquire(None).await,
        Err(SessionError::DeviceUnavailable { .. })
    ));
    assert_eq!(camera.grant_count(), 0);
}

#[tokio::test]
async fn test_busy_camera_is_unavailable() {
    let camera = Arc::new(SimulatedCamera::new(supported()));
    let acquirer = DeviceAcquirer::new(camera.clone(), front_camera_constraints());

    let mut first = acquirer.acquire(None).await.unwrap();
    let second = acquirer.acquire(None).await;
    assert!(matches!(second, Err(SessionError::DeviceUnavailable { .. })));

    first.release();
    assert!(acquirer.acquire(None).await.is_ok());
}

#[tokio::test]
async fn test_unexpected_service_errors_become_unavailable() {
    let acquirer = DeviceAcquirer::new(Arc::new(BrokenService), front_camera_constraints());
    match acquirer.acquire(None).await {
        Err(SessionError::DeviceUnavailable { details }) => {
            assert!(details.contains("driver crashed"));
        }
        other => panic!("Expected DeviceUnavailable, got {:?}", other),
    }

    let acquirer = DeviceAcquirer::new(Arc::new(TracklessService), front_camera_constraints());
    assert!(matches!(
        acquirer.acquire(None).await,
        Err(SessionError::DeviceUnavailable { .. })
    ));
}

#[tokio::test]
async fn test_release_stops_each_track_once() {
    let camera = Arc::new(SimulatedCamera::new(supported()));
    let mut handle = camera.request(&front_camera_constraints()).await.unwrap();

    assert_eq!(handle.release(), 1);
    assert_eq!(handle.release(), 0);
    assert!(handle.is_released());
    drop(handle);

    assert_eq!(camera.stop_counts(), vec![1]);
}

#[tokio::test]
async fn test_release_tolerates_ended_tracks() {
    let camera = Arc::new(SimulatedCamera::new(supported()));
    let mut handle = camera.request(&front_camera_constraints()).await.unwrap();

    camera.unplug();
    assert_eq!(handle.release(), 0);
    assert_eq!(camera.stop_counts(), vec![0]);
    assert_eq!(camera.live_tracks(), 0);
}

#[tokio::test]
async fn test_dropping_unreleased_handle_stops_tracks() {
    let camera = Arc::new(SimulatedCamera::new(supported()));
    let handle = camera.request(&front_camera_constraints()).await.unwrap();
    assert_eq!(camera.live_tracks(), 1);

    drop(handle);

    assert_eq!(camera.live_tracks(), 0);
    assert_eq!(camera.stop_counts(), vec![1]);
}

#[tokio::test]
async fn test_handle_ids_are_unique() {
    let camera = Arc::new(SimulatedCamera::new(supported()));
    let mut first = camera.request(&front_camera_constraints()).await.unwrap();
    let first_id = first.id();
    first.release();

    let second = camera.request(&front_camera_constraints()).await.unwrap();
    assert_ne!(first_id, second.id());
    assert!(second.id().to_string().starts_with("cam-"));
}
