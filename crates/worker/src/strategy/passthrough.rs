//! Everything else: straight to the network, nothing cached.

use shellcache_core::{Destination, Request, RequestMode};

use super::{Served, Source, StrategyContext};
use crate::fallback::Placeholder;
use crate::fetch::FetchError;

pub async fn network_only(request: &Request, ctx: &StrategyContext<'_>) -> Result<Served, FetchError> {
    let result = if ctx.policy.is_degraded(&request.url) {
        let degraded = request.clone().with_mode(RequestMode::NoCors);
        ctx.network.fetch(&degraded).await
    } else {
        ctx.network.fetch(request).await
    };

    match result {
        Ok(response) => Ok(Served::new(response, Source::Network)),
        Err(e) if request.destination == Destination::Image => {
            tracing::debug!("external image failed, serving placeholder: {} ({})", request.url, e);
            Ok(Served::new(ctx.fallback.placeholder_image(Placeholder::Passthrough), Source::Fallback))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::fixture::Fixture;
    use crate::testing::url;
    use shellcache_core::{Response, ResponseKind};
    use url::Url;

    #[tokio::test]
    async fn test_never_caches() {
        let fx = Fixture::new().await;
        let manifest = url("/manifest.json");
        fx.network.route_text(&manifest, "application/json", "{}");

        let served = network_only(&Request::get(manifest.clone()), &fx.ctx()).await.unwrap();
        assert_eq!(served.source, Source::Network);
        assert!(fx.cache.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_degraded_host_is_opaque() {
        let fx = Fixture::new().await;
        let photo = Url::parse("https://images.unsplash.com/photo-1").unwrap();
        fx.network.route(&photo, Response::new(200, vec![0xff, 0xd8]));

        let served = network_only(&Request::get(photo).with_destination(Destination::Image), &fx.ctx())
            .await
            .unwrap();
        assert_eq!(served.response.kind, ResponseKind::Opaque);
        assert_eq!(served.response.status, 0);
    }

    #[tokio::test]
    async fn test_failed_image_gets_small_placeholder() {
        let fx = Fixture::new().await;
        fx.network.set_offline(true);
        let photo = Url::parse("https://images.unsplash.com/photo-1").unwrap();

        let served = network_only(&Request::get(photo).with_destination(Destination::Image), &fx.ctx())
            .await
            .unwrap();
        assert_eq!(served.source, Source::Fallback);
        assert!(served.response.text().unwrap().contains("No Image"));
    }

    #[tokio::test]
    async fn test_failed_non_image_propagates() {
        let fx = Fixture::new().await;
        fx.network.set_offline(true);

        let result = network_only(&Request::get(url("/manifest.json")), &fx.ctx()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_loopback_passes_through_uncached() {
        let fx = Fixture::new().await;
        let local = Url::parse("http://localhost:5000/predict").unwrap();
        fx.network.route_text(&local, "application/json", r#"{"ok":true}"#);

        let served = network_only(&Request::get(local.clone()), &fx.ctx()).await.unwrap();
        assert_eq!(served.response.status, 200);
        assert_eq!(fx.network.calls_to(&local), 1);
        assert!(fx.cache.is_empty().await.unwrap());
    }
}
