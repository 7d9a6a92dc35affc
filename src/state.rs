use crate::core::tracking::session::TrackingSession;
use crate::domain::models::{AppError, TrackerSettings, TransportConfig};
use crate::infra::map::{MapSurface, SurfaceError};
use crate::infra::storage::settings_store::load_or_default_settings;
use crate::infra::transport::{TransportError, TransportEvent};
use std::path::PathBuf;
use tokio::sync::mpsc;

pub struct RuntimeState {
    pub settings: TrackerSettings,
    pub session: TrackingSession,
    transport: mpsc::UnboundedSender<TransportEvent>,
}

impl RuntimeState {
    pub fn new<M>(settings_path: PathBuf, mount_surface: M) -> Self
    where
        M: FnOnce(&TrackerSettings) -> Result<Box<dyn MapSurface>, SurfaceError>,
    {
        let settings = load_or_default_settings(&settings_path).unwrap_or_else(|error| {
            tracing::warn!("using default tracker settings: {error}");
            TrackerSettings::default()
        });
        let surface = match mount_surface(&settings) {
            Ok(surface) => Some(surface),
            Err(error) => {
                tracing::error!("error initializing map: {error}");
                None
            }
        };
        let session = TrackingSession::start(settings.clone(), surface);
        let (transport, events) = mpsc::unbounded_channel();
        session.subscribe_transport(events);
        Self {
            settings,
            session,
            transport,
        }
    }

    pub fn transport_config(&self) -> TransportConfig {
        self.settings.transport.clone()
    }

    pub fn push_transport_event(&self, event: TransportEvent) -> Result<(), AppError> {
        self.transport
            .send(event)
            .map_err(|_| AppError::from(TransportError::Closed))
    }
}

#[cfg(test)]
mod tests {
    use super::RuntimeState;
    use crate::domain::models::{LocationUpdate, Position};
    use crate::infra::map::command::{CommandSurface, MapCommand};
    use crate::infra::map::{MapSurface, SurfaceError};
    use crate::infra::transport::TransportEvent;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::tempdir;

    #[tokio::test(start_paused = true)]
    async fn pushed_events_reach_the_session() {
        let temp = tempdir().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink_log = log.clone();
        let state = RuntimeState::new(temp.path().join("settings.json"), move |settings| {
            let surface = CommandSurface::mount(
                move |command: MapCommand| -> Result<(), SurfaceError> {
                    sink_log.lock().unwrap().push(command);
                    Ok(())
                },
                &settings.view,
            )?;
            Ok(Box::new(surface) as Box<dyn MapSurface>)
        });
        assert_eq!(state.transport_config().reconnection_attempts, 5);

        state.push_transport_event(TransportEvent::Connect).unwrap();
        state
            .push_transport_event(TransportEvent::LocationUpdate(LocationUpdate {
                lat: Some(23.81),
                lng: Some(90.41),
                speed: Some(12.0),
                bearing: None,
            }))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(700)).await;

        let snapshot = state.session.snapshot().unwrap();
        assert_eq!(snapshot.status_label, "Connected");
        assert_eq!(snapshot.current_position, Some(Position::new(23.81, 90.41)));
        assert!(log
            .lock()
            .unwrap()
            .iter()
            .any(|command| matches!(command, MapCommand::PanTo { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn map_failure_degrades_to_headless_tracking() {
        let temp = tempdir().unwrap();
        let state = RuntimeState::new(temp.path().join("settings.json"), |_| {
            Err(SurfaceError::Rejected("webview not ready".to_string()))
        });
        state.push_transport_event(TransportEvent::Disconnect).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let snapshot = state.session.snapshot().unwrap();
        assert_eq!(snapshot.status_label, "Disconnected");
        assert!(state.session.center_on_rider().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn events_after_shutdown_are_rejected() {
        let temp = tempdir().unwrap();
        let state = RuntimeState::new(temp.path().join("settings.json"), |_| {
            Err(SurfaceError::Released)
        });
        state.session.shutdown();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(state.push_transport_event(TransportEvent::Connect).is_err());
    }
}
