use std::io::Cursor;
use tiny_http::{Request, Response};
use tracing::warn;

use ferrite_digit::{EngineError, PredictionResult, Surface};

use crate::routes::{error_response, json_response, request_content_type};
use crate::state::SharedState;
use crate::util::image::image_bytes_to_surface;
use crate::util::multipart::uploaded_image;

// ---------------------------------------------------------------------------
// POST /predict
// ---------------------------------------------------------------------------

/// Accepts either a multipart upload with one image file, or the raw RGBA
/// bytes of a `canvas_size`×`canvas_size` canvas.
pub fn handle_predict(request: &mut Request, state: &SharedState) -> Response<Cursor<Vec<u8>>> {
    let content_type = request_content_type(request);

    let mut body: Vec<u8> = Vec::new();
    if let Err(e) = request.as_reader().read_to_end(&mut body) {
        return error_response(400, &format!("could not read request body: {}", e));
    }

    let side = state.canvas_size();
    let surface = if content_type.starts_with("multipart/form-data") {
        match uploaded_image(&body, &content_type) {
            Ok(bytes) => image_bytes_to_surface(bytes, side as u32),
            Err(e) => return error_response(400, e.message()),
        }
    } else {
        Surface::new(side, body).map_err(|e| e.to_string())
    };

    let surface = match surface {
        Ok(s) => s,
        Err(msg) => return error_response(400, &msg),
    };

    match pollster::block_on(state.session.classify(&surface)) {
        Ok(result) => json_response(200, &prediction_json(&result, state)),
        Err(e) => {
            warn!(error = %e, "prediction failed");
            error_response(status_for(&e), &e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// POST /reset
// ---------------------------------------------------------------------------

pub fn handle_reset(state: &SharedState) -> Response<Cursor<Vec<u8>>> {
    let result = state.session.reset();
    json_response(200, &prediction_json(&result, state))
}

// ---------------------------------------------------------------------------
// Output formatting
// ---------------------------------------------------------------------------

fn prediction_json(result: &PredictionResult, state: &SharedState) -> serde_json::Value {
    serde_json::json!({
        "predictions": result.predictions,
        "top": result.top().map(|p| p.label),
        "inference_time": result.latency_label(),
        "stats": state.session.stats(),
    })
}

fn status_for(err: &EngineError) -> u16 {
    match err {
        EngineError::Busy => 429,
        EngineError::InputShape { .. } | EngineError::Preprocess(_) => 400,
        EngineError::InvalidState { .. } | EngineError::UnsupportedDevice(_) => 503,
        _ => 500,
    }
}
