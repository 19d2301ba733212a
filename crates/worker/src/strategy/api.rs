//! API requests: network first, cache fallback, offline JSON last.

use shellcache_core::Request;

use super::{Served, Source, StrategyContext};
use crate::fetch::FetchError;

/// Never propagates a network failure: the worst case is the 503 offline body.
pub async fn network_first(request: &Request, ctx: &StrategyContext<'_>) -> Result<Served, FetchError> {
    match ctx.network.fetch(request).await {
        Ok(response) => {
            ctx.store_in_background(request, &response);
            Ok(Served::new(response, Source::Network))
        }
        Err(e) => {
            tracing::debug!("api fetch failed for {}, checking cache: {}", request.url, e);

            if let Some(cached) = ctx.lookup(request).await {
                return Ok(Served::new(cached, Source::Cache));
            }

            Ok(Served::new(ctx.fallback.offline_json(), Source::Fallback))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::fixture::Fixture;
    use crate::testing::url;
    use shellcache_core::Response;

    #[tokio::test]
    async fn test_online_returns_live_and_populates() {
        let fx = Fixture::new().await;
        let predict = url("/predict");
        fx.network.route_text(&predict, "application/json", r#"{"food_name":"pho"}"#);

        let served = network_first(&Request::get(predict.clone()), &fx.ctx()).await.unwrap();
        assert_eq!(served.source, Source::Network);
        assert_eq!(served.response.text(), Some(r#"{"food_name":"pho"}"#));

        fx.waits.settle().await;
        let cached = fx.cache.match_url(&predict).await.unwrap().unwrap();
        assert_eq!(cached.body, served.response.body);
    }

    #[tokio::test]
    async fn test_offline_serves_cached_json() {
        let fx = Fixture::new().await;
        let predict = url("/predict");
        let req = Request::get(predict.clone());
        fx.cache
            .put(&req, &Response::new(200, r#"{"food_name":"pho"}"#).with_header("Content-Type", "application/json"))
            .await
            .unwrap();
        fx.network.set_offline(true);

        let served = network_first(&req, &fx.ctx()).await.unwrap();
        assert_eq!(served.source, Source::Cache);
        assert_eq!(served.response.status, 200);
        let body: serde_json::Value = serde_json::from_slice(&served.response.body).unwrap();
        assert_eq!(body["food_name"], "pho");
    }

    #[tokio::test]
    async fn test_offline_without_cache_is_503() {
        let fx = Fixture::new().await;
        fx.network.set_offline(true);

        let served = network_first(&Request::get(url("/api/health")), &fx.ctx()).await.unwrap();
        assert_eq!(served.source, Source::Fallback);
        assert_eq!(served.response.status, 503);
        let body: serde_json::Value = serde_json::from_slice(&served.response.body).unwrap();
        assert_eq!(body["offline"], true);
    }

    #[tokio::test]
    async fn test_error_status_is_returned_not_cached() {
        let fx = Fixture::new().await;
        let chat = url("/chat");
        fx.network.route(&chat, Response::new(500, "boom"));

        let served = network_first(&Request::get(chat.clone()), &fx.ctx()).await.unwrap();
        assert_eq!(served.source, Source::Network);
        assert_eq!(served.response.status, 500);

        fx.waits.settle().await;
        assert!(fx.cache.match_url(&chat).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_single_attempt_on_failure() {
        let fx = Fixture::new().await;
        let ask = url("/ask_ai");
        fx.network.fail(&ask);

        network_first(&Request::get(ask.clone()), &fx.ctx()).await.unwrap();
        assert_eq!(fx.network.calls_to(&ask), 1);
    }
}
