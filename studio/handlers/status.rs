use std::io::Cursor;
use tiny_http::Response;

use crate::state::SharedState;

/// `GET /status`
///
/// Engine lifecycle state, the device in use (once probed) and the stats for
/// the latest prediction.
pub fn handle_get(state: &SharedState) -> Response<Cursor<Vec<u8>>> {
    let session = &state.session;
    let body = serde_json::json!({
        "engine": session.state(),
        "device": session.device_info(),
        "stats": session.stats(),
        "canvas_size": state.canvas_size(),
    });
    crate::routes::json_response(200, &body)
}
