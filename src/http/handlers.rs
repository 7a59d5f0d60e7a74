//! HTTP handlers

use axum::{extract::State, http::Uri, response::Response};
use std::sync::Arc;

use crate::network::SourceOpener;
use crate::relay::Relay;

/// Relay the multicast group named in the request path
pub async fn relay_stream<O: SourceOpener>(
    State(relay): State<Arc<Relay<O>>>,
    uri: Uri,
) -> Response {
    relay.serve(uri.path()).await
}
