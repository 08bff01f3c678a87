//! `/render` renders the configured page directly, without the device protocol

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::str::FromStr;

use crate::codec::container::CONTENT_TYPE;
use crate::codec::{BitDepth, Rotation};
use crate::errors::{AppError, AppResult};
use crate::orchestrator::RenderRequest;
use crate::web::AppState;

/// Raw query values; parsed by hand so bad input is a plain 400
#[derive(Debug, Default, Deserialize)]
pub struct RenderParams {
    pub w: Option<String>,
    pub h: Option<String>,
    pub r: Option<String>,
    pub b: Option<String>,
}

fn parse_param<T: FromStr>(name: &str, value: Option<&str>) -> AppResult<Option<T>> {
    value
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_| AppError::validation(format!("invalid value for '{name}': {v}")))
        })
        .transpose()
}

impl RenderParams {
    fn width(&self, default: u32) -> AppResult<u32> {
        Ok(parse_param("w", self.w.as_deref())?.unwrap_or(default))
    }

    fn height(&self, default: u32) -> AppResult<u32> {
        Ok(parse_param("h", self.h.as_deref())?.unwrap_or(default))
    }

    fn rotation(&self, default: Rotation) -> AppResult<Rotation> {
        match parse_param::<u16>("r", self.r.as_deref())? {
            Some(degrees) => Rotation::try_from(degrees).map_err(AppError::validation),
            None => Ok(default),
        }
    }

    fn depth(&self, default: BitDepth) -> AppResult<BitDepth> {
        match parse_param::<u8>("b", self.b.as_deref())? {
            Some(bits) => BitDepth::try_from(bits).map_err(AppError::validation),
            None => Ok(default),
        }
    }
}

pub async fn render_page(
    State(state): State<AppState>,
    Query(params): Query<RenderParams>,
) -> AppResult<Response> {
    let render = &state.config.render;
    let device = &state.config.device;

    let request = RenderRequest::new(
        render.page_url()?,
        params.width(device.default_width)?,
        params.height(device.default_height)?,
        params.rotation(render.rotation)?,
        params.depth(render.bit_depth)?,
    )?;
    let artifact = state.orchestrator.render(&request).await?;

    Ok((
        [
            (header::CONTENT_TYPE, CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        artifact.bytes,
    )
        .into_response())
}
