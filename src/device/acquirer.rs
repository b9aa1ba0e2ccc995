use super::{DeviceHandle, HandleId};
use crate::error::SessionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Which way the camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    User,
    Environment,
}

/// What the session asks of a camera; video only, audio is never requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constraints {
    pub facing: Facing,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Constraints {
    pub fn new(facing: Facing, ideal_width: u32, ideal_height: u32) -> Self {
        Self {
            facing,
            ideal_width,
            ideal_height,
        }
    }

    /// Closest supported resolution to the ideal one
    pub fn nearest_resolution(&self, supported: &[(u32, u32)]) -> Option<(u32, u32)> {
        supported.iter().copied().min_by_key(|&(w, h)| {
            (w as i64 - self.ideal_width as i64).abs() + (h as i64 - self.ideal_height as i64).abs()
        })
    }
}

/// Platform service that grants exclusive access to a camera
#[async_trait]
pub trait DeviceCapabilityService: Send + Sync {
    /// Resolves to a newly granted handle, `PermissionDenied`, or `DeviceUnavailable`
    async fn request(&self, constraints: &Constraints) -> Result<DeviceHandle, SessionError>;
}

/// Requests cameras on behalf of a capture session
#[derive(Clone)]
pub struct DeviceAcquirer {
    service: Arc<dyn DeviceCapabilityService>,
    constraints: Constraints,
}

impl DeviceAcquirer {
    pub fn new(service: Arc<dyn DeviceCapabilityService>, constraints: Constraints) -> Self {
        Self {
            service,
            constraints,
        }
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    /// Reject a new request while the caller still owns `held`
    pub fn ensure_released(&self, held: Option<HandleId>) -> Result<(), SessionError> {
        match held {
            Some(held) => {
                error!(
                    "Camera requested while {} is still held; tear down first",
                    held
                );
                Err(SessionError::AlreadyActive)
            }
            None => Ok(()),
        }
    }

    /// Acquire a camera; `held` is the handle the caller still owns, if any
    pub async fn acquire(&self, held: Option<HandleId>) -> Result<DeviceHandle, SessionError> {
        self.ensure_released(held)?;

        info!(
            "Requesting camera ({:?}, ideal {}x{})",
            self.constraints.facing, self.constraints.ideal_width, self.constraints.ideal_height
        );

        match self.service.request(&self.constraints).await {
            Ok(mut handle) => {
                if handle.tracks().is_empty() {
                    handle.release();
                    return Err(SessionError::DeviceUnavailable {
                        details: "camera granted without video tracks".to_string(),
                    });
                }
                if let Some(settings) = handle.settings() {
                    debug!(
                        "Camera {} granted at {}x{}",
                        handle.id(),
                        settings.width,
                        settings.height
                    );
                }
                Ok(handle)
            }
            Err(e) if e.is_acquisition_failure() => {
                warn!("Camera request failed: {}", e);
                Err(e)
            }
            Err(e) => {
                warn!("Camera request failed unexpectedly: {}", e);
                Err(SessionError::DeviceUnavailable {
                    details: e.to_string(),
                })
            }
        }
    }
}
