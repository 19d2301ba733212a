//! HTML navigations: network first, then the cached page, the app shell,
//! and finally the generated offline page.

use shellcache_core::Request;

use super::{Served, Source, StrategyContext};
use crate::fetch::FetchError;

pub async fn network_first(request: &Request, ctx: &StrategyContext<'_>) -> Result<Served, FetchError> {
    let error = match ctx.network.fetch(request).await {
        Ok(response) => {
            ctx.store(request, &response).await;
            return Ok(Served::new(response, Source::Network));
        }
        Err(e) => e,
    };

    tracing::debug!("navigation fetch failed for {}: {}", request.url, error);

    if let Some(cached) = ctx.lookup(request).await {
        return Ok(Served::new(cached, Source::Cache));
    }

    if let Some(shell) = ctx.lookup_url(ctx.app_shell).await {
        tracing::debug!("serving app shell {} for {}", ctx.app_shell, request.url);
        return Ok(Served::new(shell, Source::AppShell));
    }

    Ok(Served::new(ctx.fallback.offline_page(), Source::Fallback))
}
