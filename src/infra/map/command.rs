use crate::domain::models::{FlyOptions, PanOptions, Position, ViewSettings};
use crate::infra::map::{MapSurface, SurfaceError};
use serde::{Deserialize, Serialize};

pub const INITIAL_POPUP: &str = "<b>Rider Location</b><br>Waiting for updates...";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MapCommand {
    Mount {
        center: Position,
        zoom: f64,
    },
    AddMarker {
        position: Position,
        popup: String,
    },
    SetMarkerPosition {
        position: Position,
    },
    SetPopupContent {
        html: String,
    },
    PanTo {
        position: Position,
        options: PanOptions,
    },
    InvalidateSize,
    ZoomIn {
        step: f64,
    },
    ZoomOut {
        step: f64,
    },
    SetView {
        center: Position,
        zoom: f64,
    },
    FlyTo {
        position: Position,
        zoom: f64,
        options: FlyOptions,
    },
    RemoveMarker,
    RemoveMap,
}

pub trait CommandSink: Send {
    fn send(&mut self, command: MapCommand) -> Result<(), SurfaceError>;
}

impl<F> CommandSink for F
where
    F: FnMut(MapCommand) -> Result<(), SurfaceError> + Send,
{
    fn send(&mut self, command: MapCommand) -> Result<(), SurfaceError> {
        self(command)
    }
}

pub struct CommandSurface<S: CommandSink> {
    sink: S,
    marker_attached: bool,
    released: bool,
}

impl<S: CommandSink> CommandSurface<S> {
    pub fn mount(mut sink: S, view: &ViewSettings) -> Result<Self, SurfaceError> {
        sink.send(MapCommand::Mount {
            center: view.default_center,
            zoom: view.default_zoom,
        })?;
        sink.send(MapCommand::AddMarker {
            position: view.default_center,
            popup: INITIAL_POPUP.to_string(),
        })?;
        Ok(Self {
            sink,
            marker_attached: true,
            released: false,
        })
    }

    fn send(&mut self, command: MapCommand) -> Result<(), SurfaceError> {
        if self.released {
            return Err(SurfaceError::Released);
        }
        self.sink.send(command)
    }

    fn send_to_marker(&mut self, command: MapCommand) -> Result<(), SurfaceError> {
        if !self.marker_attached {
            return Err(SurfaceError::MarkerDetached);
        }
        self.send(command)
    }
}

impl<S: CommandSink> MapSurface for CommandSurface<S> {
    fn marker_present(&self) -> bool {
        self.marker_attached && !self.released
    }

    fn set_position(&mut self, position: Position) -> Result<(), SurfaceError> {
        self.send_to_marker(MapCommand::SetMarkerPosition { position })
    }

    fn pan_to(&mut self, position: Position, options: PanOptions) -> Result<(), SurfaceError> {
        self.send(MapCommand::PanTo { position, options })
    }

    fn set_popup_content(&mut self, html: &str) -> Result<(), SurfaceError> {
        self.send_to_marker(MapCommand::SetPopupContent {
            html: html.to_string(),
        })
    }

    fn invalidate_size(&mut self) -> Result<(), SurfaceError> {
        self.send(MapCommand::InvalidateSize)
    }

    fn zoom_in(&mut self, step: f64) -> Result<(), SurfaceError> {
        self.send(MapCommand::ZoomIn { step })
    }

    fn zoom_out(&mut self, step: f64) -> Result<(), SurfaceError> {
        self.send(MapCommand::ZoomOut { step })
    }

    fn set_view(&mut self, center: Position, zoom: f64) -> Result<(), SurfaceError> {
        self.send(MapCommand::SetView { center, zoom })
    }

    fn fly_to(
        &mut self,
        position: Position,
        zoom: f64,
        options: FlyOptions,
    ) -> Result<(), SurfaceError> {
        self.send(MapCommand::FlyTo {
            position,
            zoom,
            options,
        })
    }

    fn release(&mut self) -> Result<(), SurfaceError> {
        if self.released {
            return Ok(());
        }
        // Marked first so a failing sink still leaves the surface unusable.
        self.released = true;
        let marker_result = if self.marker_attached {
            self.marker_attached = false;
            self.sink.send(MapCommand::RemoveMarker)
        } else {
            Ok(())
        };
        let map_result = self.sink.send(MapCommand::RemoveMap);
        marker_result.and(map_result)
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandSurface, MapCommand, INITIAL_POPUP};
    use crate::domain::models::{Position, ViewSettings};
    use crate::infra::map::{MapSurface, SurfaceError};
    use std::sync::{Arc, Mutex};

    fn recording_surface() -> (
        CommandSurface<impl FnMut(MapCommand) -> Result<(), SurfaceError> + Send>,
        Arc<Mutex<Vec<MapCommand>>>,
    ) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink_log = log.clone();
        let surface = CommandSurface::mount(
            move |command: MapCommand| -> Result<(), SurfaceError> {
                sink_log.lock().unwrap().push(command);
                Ok(())
            },
            &ViewSettings::default(),
        )
        .unwrap();
        (surface, log)
    }

    #[test]
    fn mount_places_marker_at_default_center() {
        let (surface, log) = recording_surface();
        assert!(surface.marker_present());
        let center = Position::new(23.8, 90.4);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                MapCommand::Mount {
                    center,
                    zoom: 13.0
                },
                MapCommand::AddMarker {
                    position: center,
                    popup: INITIAL_POPUP.to_string()
                },
            ]
        );
    }

    #[test]
    fn released_surface_rejects_commands() {
        let (mut surface, log) = recording_surface();
        surface.release().unwrap();
        surface.release().unwrap();
        assert!(!surface.marker_present());
        assert!(matches!(
            surface.set_position(Position::new(1.0, 1.0)),
            Err(SurfaceError::MarkerDetached)
        ));
        assert!(matches!(surface.zoom_in(0.5), Err(SurfaceError::Released)));
        let log = log.lock().unwrap();
        assert_eq!(log[log.len() - 2], MapCommand::RemoveMarker);
        assert_eq!(log[log.len() - 1], MapCommand::RemoveMap);
    }

    #[test]
    fn commands_serialize_with_kind_tag() {
        let json = serde_json::to_value(MapCommand::ZoomIn { step: 0.5 }).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "zoom_in", "step": 0.5}));
    }
}
