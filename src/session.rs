use crate::cache::LoadStateCache;
use crate::carousel::{CarouselController, CarouselItem};
use crate::config::CoordinatorConfig;
use crate::error::Result;
use crate::models::{CatalogItem, MediaKey};
use crate::reveal::{ContainerId, Presentation, RevealController, SignalHub};

/// Application session: owns the shared cache and signal hub and hands them
/// to every container and viewer it creates.
#[derive(Debug, Clone)]
pub struct MediaSession {
    base_url: String,
    config: CoordinatorConfig,
    cache: LoadStateCache,
    signals: SignalHub,
}

impl MediaSession {
    pub fn new(base_url: impl Into<String>, config: CoordinatorConfig) -> Self {
        Self::with_cache(base_url, config, LoadStateCache::new(config.retry))
    }

    pub fn with_cache(
        base_url: impl Into<String>,
        config: CoordinatorConfig,
        cache: LoadStateCache,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            config,
            cache,
            signals: SignalHub::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn cache(&self) -> &LoadStateCache {
        &self.cache
    }

    pub fn signals(&self) -> &SignalHub {
        &self.signals
    }

    pub fn media_key(&self, item: &CatalogItem) -> MediaKey {
        item.media_key(&self.base_url)
    }

    /// Create a container over `items`, already subscribed to the session's
    /// signal hub.
    pub fn container(
        &self,
        id: ContainerId,
        presentation: Presentation,
        items: &[CatalogItem],
    ) -> RevealController {
        let keys = items.iter().map(|item| self.media_key(item)).collect();
        let mut controller = RevealController::new(
            id,
            presentation,
            keys,
            self.cache.clone(),
            self.config.window,
        );
        controller.attach(&self.signals);
        controller
    }

    /// Create a viewer over `items`. Needs a tokio runtime for retry timers.
    pub fn viewer(&self, items: &[CatalogItem]) -> Result<CarouselController> {
        let slides = items
            .iter()
            .map(|item| CarouselItem::from_catalog(item, &self.base_url))
            .collect();
        CarouselController::new(slides, self.cache.clone(), self.config.carousel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reveal::VisibilitySignal;

    fn catalog() -> Vec<CatalogItem> {
        (0..70)
            .map(|i| CatalogItem::from_storage_key(format!("gallery/{i}.webp")))
            .collect()
    }

    #[tokio::test]
    async fn test_list_and_viewer_share_cache() {
        let session = MediaSession::new("https://cdn.test/", CoordinatorConfig::default());
        let items = catalog();

        let mut grid = session.container(ContainerId::new("gallery"), Presentation::Grid, &items);
        grid.open();
        grid.mark_content_loaded();
        assert!(!grid.should_load(60));

        let mut viewer = session.viewer(&items).unwrap();
        viewer.open(60);
        viewer.on_media_loading(60);
        viewer.on_media_loaded(60);

        assert!(grid.should_load(60));
        assert_eq!(session.cache().stats().loaded, 1);
    }

    #[tokio::test]
    async fn test_session_hub_drives_containers() {
        let session = MediaSession::new("https://cdn.test/", CoordinatorConfig::default());
        let id = ContainerId::new("gallery");
        let mut grid = session.container(id.clone(), Presentation::Grid, &catalog());
        grid.open();
        grid.mark_content_loaded();

        session
            .signals()
            .emit(&id, VisibilitySignal::NearEnd { remaining: 10.0 });
        assert!(grid.pump());
        assert_eq!(grid.window().end, 25);

        drop(grid);
        assert_eq!(session.signals().subscriber_count(&id), 0);
    }
}
