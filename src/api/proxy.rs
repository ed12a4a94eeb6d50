use std::sync::Arc;

use poem::{handler, web::Data, Body, Request, Response};
use tracing::debug;

use crate::core::{collect_body, ProxyError, TransformConfig, TransformError, TransformParams};

use super::{not_found, params::transform_params, AppState};

#[handler]
pub async fn serve_image(req: &Request, state: Data<&Arc<AppState>>) -> Response {
    let path = req.uri().path();

    // Ignore requests for favicons.
    if path.ends_with("/favicon.ico") {
        return not_found();
    }

    let Some((tenant, image_path)) = split_path(path) else {
        return not_found();
    };

    let params = transform_params::from_query(req.uri().query().unwrap_or_default());

    match handle(state.0, tenant, image_path, &params).await {
        Ok(jpeg) => Response::builder()
            .content_type("image/jpeg")
            .body(Body::from_vec(jpeg)),
        Err(e) => {
            debug!("{} failed: {}", path, e);
            Response::builder().status(e.status()).finish()
        }
    }
}

async fn handle(
    state: &AppState,
    tenant: &str,
    image_path: &str,
    params: &TransformParams,
) -> Result<Vec<u8>, ProxyError> {
    let base_url = state.config.resolve_tenant(tenant);
    let url = format!("{}/{}", base_url, image_path);
    debug!("fetching {}", url);

    let stream = state.upstream.open(&url).await?;
    let body = collect_body(stream, state.config.max_body_bytes).await?;

    let transform = TransformConfig::from_params(params);
    let jpeg = tokio::task::spawn_blocking(move || transform.apply(&body))
        .await
        .map_err(|_| TransformError::Join)??;

    Ok(jpeg)
}

/// Splits `/{tenant}/{image path...}` into its two parts. Both must be
/// non-empty.
fn split_path(path: &str) -> Option<(&str, &str)> {
    let (tenant, image_path) = path.strip_prefix('/')?.split_once('/')?;
    if tenant.is_empty() || image_path.is_empty() {
        return None;
    }
    Some((tenant, image_path))
}
