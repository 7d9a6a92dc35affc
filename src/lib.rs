#[cfg(feature = "desktop")]
pub mod commands;
pub mod core;
pub mod domain;
pub mod infra;
pub mod state;

#[cfg(feature = "desktop")]
pub use desktop::run;

#[cfg(feature = "desktop")]
mod desktop {
    use crate::commands::tracking::{
        center_on_rider, get_tracking_snapshot, get_transport_config, notify_resize,
        push_socket_event, push_transport_event, reset_view, zoom_in, zoom_out,
    };
    use crate::infra::logging::init_tracing;
    use crate::infra::map::command::{CommandSurface, MapCommand};
    use crate::infra::map::{MapSurface, SurfaceError};
    use crate::state::RuntimeState;
    use tauri::{AppHandle, Emitter, Manager, WindowEvent};

    pub fn run() {
        init_tracing();

        tauri::Builder::default()
            .setup(|app| {
                let config_dir = app
                    .path()
                    .app_config_dir()
                    .map_err(|error| error.to_string())?;
                std::fs::create_dir_all(&config_dir).map_err(|error| error.to_string())?;
                let handle = app.handle().clone();
                let settings_path = config_dir.join("settings.json");
                // Built inside the runtime so the session can spawn its tasks.
                let state = tauri::async_runtime::block_on(async {
                    RuntimeState::new(settings_path, |settings| {
                        let surface = CommandSurface::mount(webview_sink(handle.clone()), &settings.view)?;
                        Ok(Box::new(surface) as Box<dyn MapSurface>)
                    })
                });
                forward_snapshots(handle, &state);
                app.manage(state);
                Ok(())
            })
            .on_window_event(|window, event| match event {
                WindowEvent::Resized(_) => {
                    let app = window.app_handle().clone();
                    tauri::async_runtime::spawn(async move {
                        if let Some(state) = app.try_state::<RuntimeState>() {
                            if let Err(error) = state.session.notify_resize() {
                                tracing::debug!("resize not forwarded: {}", error.message);
                            }
                        }
                    });
                }
                WindowEvent::Destroyed => {
                    if let Some(state) = window.try_state::<RuntimeState>() {
                        state.session.shutdown();
                    }
                }
                _ => {}
            })
            .invoke_handler(tauri::generate_handler![
                get_tracking_snapshot,
                get_transport_config,
                push_transport_event,
                push_socket_event,
                center_on_rider,
                reset_view,
                zoom_in,
                zoom_out,
                notify_resize
            ])
            .run(tauri::generate_context!())
            .expect("failed to run RiderTrack");
    }

    fn webview_sink(
        app: AppHandle,
    ) -> impl FnMut(MapCommand) -> Result<(), SurfaceError> + Send {
        move |command: MapCommand| {
            app.emit("map/command", command)
                .map_err(|error| SurfaceError::Rejected(error.to_string()))
        }
    }

    fn forward_snapshots(app: AppHandle, state: &RuntimeState) {
        let mut snapshots = state.session.watch();
        tauri::async_runtime::spawn(async move {
            while snapshots.changed().await.is_ok() {
                let snapshot = snapshots.borrow_and_update().clone();
                if app.emit("tracking/snapshot", snapshot).is_err() {
                    break;
                }
            }
        });
    }
}
