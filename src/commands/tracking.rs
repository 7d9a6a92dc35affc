use crate::domain::models::{AppError, TrackingSnapshot, TransportConfig};
use crate::infra::transport::TransportEvent;
use crate::state::RuntimeState;
use serde_json::Value;
use tauri::State;

#[tauri::command]
pub async fn get_tracking_snapshot(
    state: State<'_, RuntimeState>,
) -> Result<TrackingSnapshot, AppError> {
    state.session.snapshot()
}

#[tauri::command]
pub async fn get_transport_config(state: State<'_, RuntimeState>) -> Result<TransportConfig, AppError> {
    Ok(state.transport_config())
}

#[tauri::command]
pub async fn push_transport_event(
    state: State<'_, RuntimeState>,
    event: TransportEvent,
) -> Result<(), AppError> {
    state.push_transport_event(event)
}

#[tauri::command]
pub async fn push_socket_event(
    state: State<'_, RuntimeState>,
    name: String,
    payload: Value,
) -> Result<(), AppError> {
    let event = TransportEvent::decode(&name, payload)?;
    state.push_transport_event(event)
}

#[tauri::command]
pub async fn center_on_rider(state: State<'_, RuntimeState>) -> Result<bool, AppError> {
    state.session.center_on_rider()
}

#[tauri::command]
pub async fn reset_view(state: State<'_, RuntimeState>) -> Result<(), AppError> {
    state.session.reset_view()
}

#[tauri::command]
pub async fn zoom_in(state: State<'_, RuntimeState>) -> Result<(), AppError> {
    state.session.zoom_in()
}

#[tauri::command]
pub async fn zoom_out(state: State<'_, RuntimeState>) -> Result<(), AppError> {
    state.session.zoom_out()
}

#[tauri::command]
pub async fn notify_resize(state: State<'_, RuntimeState>) -> Result<(), AppError> {
    state.session.notify_resize()
}
