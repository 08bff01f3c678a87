//! `/api/{command}` device polling endpoint

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
};

use crate::errors::AppResult;
use crate::protocol::{DeviceCommand, DeviceHeaders, DevicePayload, DeviceReply, DeviceRequest};
use crate::web::{AppState, RequestOrigin};

pub async fn device_command(
    State(state): State<AppState>,
    Path(command): Path<String>,
    origin: RequestOrigin,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<DeviceReply> {
    let command = DeviceCommand::parse(&command)?;
    let device = state.protocol.device_config();

    let request = DeviceRequest {
        origin: origin.0,
        headers: DeviceHeaders::from_headers(&headers, device.default_width, device.default_height),
        payload: DevicePayload::from_bytes(&body),
    };

    state.protocol.dispatch(command, request).await
}
