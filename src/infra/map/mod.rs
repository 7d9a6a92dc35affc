pub mod command;

use crate::domain::models::{AppError, FlyOptions, PanOptions, Position};
use thiserror::Error;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("marker is not attached to the map")]
    MarkerDetached,
    #[error("map surface has been released")]
    Released,
    #[error("map surface rejected command: {0}")]
    Rejected(String),
}

impl From<SurfaceError> for AppError {
    fn from(error: SurfaceError) -> Self {
        AppError::new(
            "MAP_SURFACE_ERROR",
            error.to_string(),
            Some("reload the map view".to_string()),
        )
    }
}

pub trait MapSurface: Send {
    fn marker_present(&self) -> bool;

    fn set_position(&mut self, position: Position) -> Result<(), SurfaceError>;

    fn pan_to(&mut self, position: Position, options: PanOptions) -> Result<(), SurfaceError>;

    fn set_popup_content(&mut self, html: &str) -> Result<(), SurfaceError>;

    fn invalidate_size(&mut self) -> Result<(), SurfaceError>;

    fn zoom_in(&mut self, step: f64) -> Result<(), SurfaceError>;

    fn zoom_out(&mut self, step: f64) -> Result<(), SurfaceError>;

    fn set_view(&mut self, center: Position, zoom: f64) -> Result<(), SurfaceError>;

    fn fly_to(
        &mut self,
        position: Position,
        zoom: f64,
        options: FlyOptions,
    ) -> Result<(), SurfaceError>;

    fn release(&mut self) -> Result<(), SurfaceError>;

    // Meters between two positions, using the same metric as the map library.
    fn distance_between(&self, a: Position, b: Position) -> f64 {
        haversine_distance(a, b)
    }
}

pub fn haversine_distance(a: Position, b: Position) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let sin_dlat = ((b.latitude - a.latitude).to_radians() / 2.0).sin();
    let sin_dlng = ((b.longitude - a.longitude).to_radians() / 2.0).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlng * sin_dlng;
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}
