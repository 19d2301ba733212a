//! Static resources: cache first, then network with write-through.

use shellcache_core::Request;

use super::{Served, Source, StrategyContext};
use crate::fallback::{Placeholder, looks_like_image};
use crate::fetch::FetchError;

pub async fn cache_first(request: &Request, ctx: &StrategyContext<'_>) -> Result<Served, FetchError> {
    if let Some(cached) = ctx.lookup(request).await {
        tracing::debug!("static cache hit: {}", request.url);
        return Ok(Served::new(cached, Source::Cache));
    }

    match ctx.network.fetch(request).await {
        Ok(response) => {
            ctx.store(request, &response).await;
            Ok(Served::new(response, Source::Network))
        }
        Err(e) if looks_like_image(request) => {
            tracing::debug!("static image unavailable, serving placeholder: {} ({})", request.url, e);
            Ok(Served::new(ctx.fallback.placeholder_image(Placeholder::Static), Source::Fallback))
        }
        Err(e) => Err(e),
    }
}
