//! One end-to-end curation run.
//!
//! Selection (affinity, lottery, discovery and insertion) may stop early for
//! any reason, including a panic. The scraper release, the eviction pass and
//! the summary always happen afterwards.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use tracing::{info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use super::aggregator::AffinityAggregator;
use super::error::CurationError;
use super::maintainer::PlaylistMaintainer;
use super::models::{RunPhase, RunSummary};
use super::resolver::CandidateResolver;
use super::sampler::WeightedLottery;
use super::services::RunServices;
use super::settings::CurationSettings;
use super::validator::TrackValidator;
use crate::affinity_store::AffinityStore;
use crate::catalog::{ArtistRef, PacedCatalog};
use crate::lastfm::{ListeningHistory, SimilarityService};
use crate::notifications::NotificationError;
use crate::scraper::PlaylistScraper;

/// What a caller asks for when triggering a run.
#[derive(Debug, Clone, Deserialize)]
pub struct CurationRequest {
    pub access_token: String,
    pub playlist_id: String,
    /// Catalog user id; looked up from the token when absent.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Where to text the summary.
    #[serde(default)]
    pub phone: Option<String>,
    /// Listening-history account.
    #[serde(default)]
    pub lastfm_username: Option<String>,
}

pub struct CurationRun {
    services: RunServices,
    settings: CurationSettings,
    rng: StdRng,
}

fn enter(phase: RunPhase) {
    info!(phase = phase.as_str(), "Run phase");
}

fn enter_for(phase: RunPhase, artist: &ArtistRef) {
    info!(phase = phase.as_str(), artist = %artist.name, "Run phase");
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Borrowed view of what the selection phase needs.
struct Selection<'a> {
    catalog: &'a PacedCatalog,
    store: Arc<dyn AffinityStore>,
    history: &'a dyn ListeningHistory,
    similarity: &'a dyn SimilarityService,
    settings: &'a CurationSettings,
}

impl Selection<'_> {
    async fn run(
        &self,
        request: &CurationRequest,
        scraper: &mut dyn PlaylistScraper,
        rng: &mut StdRng,
        songs_added: &mut usize,
    ) -> Result<(), CurationError> {
        let user_id = match &request.user_id {
            Some(user_id) => user_id.clone(),
            None => self
                .catalog
                .current_user_id()
                .await
                .ok_or(CurationError::UnknownUser)?,
        };
        Span::current().record("user_id", user_id.as_str());

        let stats = AffinityAggregator::new(
            self.catalog,
            self.store.clone(),
            self.history,
            self.settings,
        )
        .compute(&user_id, request.lastfm_username.as_deref(), Utc::now())
        .await?;
        enter(RunPhase::AffinityComputed);

        let mut lottery = WeightedLottery::new(&stats, self.settings.bonus_min_likes);
        enter(RunPhase::LotteryReady);
        info!("{} artists in the lottery pool", lottery.remaining());

        let maintainer = PlaylistMaintainer::new(self.catalog, &request.playlist_id);
        let mut represented = maintainer
            .load_represented()
            .await
            .ok_or_else(|| CurationError::PlaylistUnreadable(request.playlist_id.clone()))?;

        let validator = TrackValidator::new(
            self.catalog,
            &stats,
            self.settings.known_artist_min_likes,
            self.settings.validation_delay,
        );
        let resolver = CandidateResolver::new(
            self.catalog,
            &validator,
            self.similarity,
            &self.settings.discovery,
        );

        while *songs_added < self.settings.target_songs {
            let Some(ticket) = lottery.draw(rng) else {
                info!("Lottery pool exhausted");
                break;
            };
            let artist = ArtistRef {
                id: ticket.artist_id,
                name: ticket.name,
            };
            info!(
                "Drew {} ({} left), {}/{} added",
                artist.name,
                lottery.remaining(),
                songs_added,
                self.settings.target_songs
            );

            enter_for(RunPhase::Resolving, &artist);
            let inserted = match resolver.resolve(&artist, &represented, scraper, rng).await {
                Some(candidate) => maintainer.insert(&candidate, &mut represented).await,
                None => {
                    info!("No new track found for {}", artist.name);
                    false
                }
            };
            if inserted {
                *songs_added += 1;
            }
            enter_for(RunPhase::artist_outcome(inserted), &artist);
        }
        Ok(())
    }
}

impl CurationRun {
    pub fn new(services: RunServices, settings: CurationSettings) -> Self {
        Self {
            services,
            settings,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Replace the run's randomness source.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Run the whole pass and return its summary.
    ///
    /// Never fails: errors end the selection early and are logged.
    pub async fn execute(self, request: &CurationRequest) -> RunSummary {
        let span = info_span!(
            "curation_run",
            run_id = %Uuid::new_v4(),
            user_id = tracing::field::Empty
        );
        self.run(request).instrument(span).await
    }

    async fn run(self, request: &CurationRequest) -> RunSummary {
        let CurationRun {
            services,
            settings,
            mut rng,
        } = self;
        let RunServices {
            catalog,
            store,
            history,
            similarity,
            mut scraper,
            notifier,
        } = services;
        let catalog = PacedCatalog::new(catalog, settings.run_policy());

        enter(RunPhase::Start);
        info!("Curating playlist {}", request.playlist_id);

        let mut songs_added = 0;
        let selection = Selection {
            catalog: &catalog,
            store,
            history: history.as_ref(),
            similarity: similarity.as_ref(),
            settings: &settings,
        };
        let outcome = AssertUnwindSafe(selection.run(
            request,
            scraper.as_mut(),
            &mut rng,
            &mut songs_added,
        ))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(CurationError::Panicked(panic_message(payload))));

        if let Err(e) = outcome {
            warn!("Selection stopped early: {}", e);
        }

        scraper.release().await;

        enter(RunPhase::Evicting);
        let maintainer = PlaylistMaintainer::new(&catalog, &request.playlist_id);
        let evicted = maintainer.evict(Utc::now(), settings.eviction_days).await;

        enter(RunPhase::Reporting);
        let summary = RunSummary {
            playlist_id: request.playlist_id.clone(),
            songs_added,
            target: settings.target_songs,
            evicted,
            eviction_days: settings.eviction_days,
        };
        info!(
            "Added {}/{} songs, evicted {}",
            summary.songs_added, summary.target, summary.evicted
        );

        if let Some(phone) = &request.phone {
            match notifier.send(phone, &summary.message(Utc::now())).await {
                Ok(()) => info!("Summary sent to {}", phone),
                Err(NotificationError::NotConfigured) => {
                    warn!("No notification transport configured, summary not sent")
                }
                Err(e) => warn!("Failed to send summary: {}", e),
            }
        }

        if catalog.cooldowns() > 0 {
            info!("Run hit {} rate-limit cooldowns", catalog.cooldowns());
        }
        enter(RunPhase::Done);
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affinity_store::SqliteAffinityStore;
    use crate::catalog::{
        CatalogError, MockCatalogService, PlaylistItem, SavedTracksPage, TrackRef,
    };
    use crate::lastfm::{MockListeningHistory, MockSimilarityService};
    use crate::notifications::MockNotificationTransport;
    use crate::scraper::MockPlaylistScraper;
    use chrono::Duration as ChronoDuration;

    fn request(phone: Option<&str>) -> CurationRequest {
        CurationRequest {
            access_token: "token".to_string(),
            playlist_id: "out".to_string(),
            user_id: Some("user".to_string()),
            phone: phone.map(str::to_string),
            lastfm_username: None,
        }
    }

    fn stale_item() -> PlaylistItem {
        PlaylistItem {
            track: Some(TrackRef {
                id: Some("old".to_string()),
                name: "Old".to_string(),
                artists: vec![ArtistRef {
                    id: "a0".to_string(),
                    name: "Veteran".to_string(),
                }],
            }),
            added_at: Some(Utc::now() - ChronoDuration::days(30)),
        }
    }

    fn released_scraper() -> MockPlaylistScraper {
        let mut scraper = MockPlaylistScraper::new();
        scraper.expect_release().times(1).returning(|| ());
        scraper
    }

    fn services(catalog: MockCatalogService, notifier: MockNotificationTransport) -> RunServices {
        let mut history = MockListeningHistory::new();
        history.expect_recent_plays_page().never();
        let mut similarity = MockSimilarityService::new();
        similarity.expect_similar_artists().never();

        RunServices {
            catalog: Arc::new(catalog),
            store: Arc::new(SqliteAffinityStore::in_memory().unwrap()),
            history: Arc::new(history),
            similarity: Arc::new(similarity),
            scraper: Box::new(released_scraper()),
            notifier: Arc::new(notifier),
        }
    }

    struct ExplodingHistory;

    #[async_trait::async_trait]
    impl ListeningHistory for ExplodingHistory {
        async fn recent_plays_page(
            &self,
            _user: &str,
            _page: u32,
        ) -> Result<crate::lastfm::RecentPlaysPage, crate::lastfm::HistoryError> {
            panic!("history exploded")
        }
    }

    #[tokio::test]
    async fn test_panic_in_selection_still_evicts_and_reports() {
        let mut catalog = MockCatalogService::new();
        catalog
            .expect_saved_tracks()
            .returning(|_, _| Ok(SavedTracksPage::default()));
        catalog
            .expect_playlist_items()
            .returning(|_| Ok(vec![stale_item()]));
        catalog
            .expect_remove_from_playlist()
            .times(1)
            .returning(|_, _| Ok(()));

        let mut notifier = MockNotificationTransport::new();
        notifier
            .expect_send()
            .times(1)
            .returning(|phone, message| {
                assert_eq!(phone, "+15551234567");
                assert!(message.contains("Songs added: 0/50"));
                assert!(message.contains("Playlist not fully updated"));
                Ok(())
            });

        let mut services = services(catalog, notifier);
        services.history = Arc::new(ExplodingHistory);
        let mut request = request(Some("+15551234567"));
        request.lastfm_username = Some("listener".to_string());

        let run = CurationRun::new(services, CurationSettings::default().without_delays())
            .with_rng(StdRng::seed_from_u64(1));
        let summary = run.execute(&request).await;

        assert_eq!(summary.songs_added, 0);
        assert_eq!(summary.evicted, 1);
        assert_eq!(summary.target, 50);
    }

    #[tokio::test]
    async fn test_unknown_user_skips_selection() {
        let mut catalog = MockCatalogService::new();
        catalog
            .expect_current_user_id()
            .returning(|| Err(CatalogError::Transient("expired".to_string())));
        catalog.expect_saved_tracks().never();
        catalog
            .expect_playlist_items()
            .times(1)
            .returning(|_| Ok(vec![]));

        let mut notifier = MockNotificationTransport::new();
        notifier.expect_send().never();

        let mut request = request(None);
        request.user_id = None;

        let run = CurationRun::new(
            services(catalog, notifier),
            CurationSettings::default().without_delays(),
        );
        let summary = run.execute(&request).await;
        assert_eq!(summary.songs_added, 0);
        assert_eq!(summary.evicted, 0);
    }

    #[tokio::test]
    async fn test_missing_transport_does_not_fail_run() {
        let mut catalog = MockCatalogService::new();
        catalog
            .expect_saved_tracks()
            .returning(|_, _| Ok(SavedTracksPage::default()));
        catalog.expect_playlist_items().returning(|_| Ok(vec![]));

        let mut notifier = MockNotificationTransport::new();
        notifier
            .expect_send()
            .times(1)
            .returning(|_, _| Err(NotificationError::NotConfigured));

        let mut settings = CurationSettings::default().without_delays();
        settings.target_songs = 5;
        let run = CurationRun::new(services(catalog, notifier), settings);
        let summary = run.execute(&request(Some("+15551234567"))).await;

        assert_eq!(summary.target, 5);
        assert!(!summary.is_complete());
    }

    #[test]
    fn test_request_optional_fields_default() {
        let request: CurationRequest =
            serde_json::from_str(r#"{"access_token":"t","playlist_id":"p"}"#).unwrap();
        assert!(request.user_id.is_none());
        assert!(request.phone.is_none());
        assert!(request.lastfm_username.is_none());
    }
}
