// src/lib.rs

pub mod aggregation;
pub mod banner;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod normalize;
pub mod notifier;
pub mod state;
pub mod stats;
pub mod telemetry;
pub mod ticker;

use crate::aggregation::price_distribution;
use crate::banner::{BannerPreferences, PreferenceStore};
use crate::client::{fetch_all, HttpPageSource, PageSource};
use crate::config::TickerConfig;
use crate::dashboard::Dashboard;
use crate::error::FetchError;
use crate::models::{MarketplaceRecord, ViewMode};
use crate::notifier::{format_listing_alert, ListingMatch, NotificationLedger};
use crate::state::{AppState, DataOrigin, FetchOutcome, FetchTicket};
use crate::stats::PriceSummary;
use crate::telemetry::{ClientCommand, FeedPacket, TelemetryServer};
use crate::ticker::TickerSnapshot;

use chrono::Local;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

type FetchResult = (FetchTicket, Result<Vec<MarketplaceRecord>, FetchError>);

/// Builds the HTTP source from config and runs the monitor until the
/// process is stopped.
pub async fn run(cfg: &TickerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let source = HttpPageSource::new(cfg.api_base_url.clone())?;
    Monitor::new(cfg.clone(), Arc::new(source)).run().await;
    Ok(())
}

/// Owns the application state and reacts to refresh ticks, overlay
/// commands, and finished fetches.
pub struct Monitor<S> {
    cfg: TickerConfig,
    source: Arc<S>,
    state: AppState,
    prefs: BannerPreferences,
    store: PreferenceStore,
    ledger: NotificationLedger,
    listings_seen: bool,
    listings_poll_pending: bool,
    feed: TelemetryServer,
    commands: mpsc::Receiver<ClientCommand>,
    done_tx: mpsc::Sender<FetchResult>,
    done_rx: mpsc::Receiver<FetchResult>,
}

impl<S> Monitor<S>
where
    S: PageSource + Send + Sync + 'static,
{
    pub fn new(cfg: TickerConfig, source: Arc<S>) -> Self {
        let store = PreferenceStore::new(&cfg.preferences_path);
        let prefs = store.load();
        let filters = prefs.filters.clone().unwrap_or_else(|| cfg.filters.clone());
        let state = AppState::new(filters, prefs.view_mode);

        let (cmd_tx, commands) = mpsc::channel(64);
        let feed = TelemetryServer::new(
            cfg.telemetry.enabled,
            cfg.telemetry.port,
            cfg.excluded_domains.clone(),
            cmd_tx,
        );
        let (done_tx, done_rx) = mpsc::channel(4);

        Self {
            cfg,
            source,
            state,
            prefs,
            store,
            ledger: NotificationLedger::default(),
            listings_seen: false,
            listings_poll_pending: false,
            feed,
            commands,
            done_tx,
            done_rx,
        }
    }

    pub async fn run(mut self) {
        let mut refresh = interval(Duration::from_secs(self.cfg.refresh_interval_secs));
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let report_every = Duration::from_secs(self.cfg.report.interval_secs.max(1));
        let mut report = interval_at(Instant::now() + report_every, report_every);

        info!(
            "🚀 Starting IPv4 ticker ({}, refresh every {}s, view: {})",
            self.cfg.api_base_url,
            self.cfg.refresh_interval_secs,
            self.state.view_mode().display_name()
        );

        loop {
            tokio::select! {
                _ = refresh.tick() => self.on_refresh(),
                Some(command) = self.commands.recv() => self.handle_command(command),
                Some((ticket, result)) = self.done_rx.recv() => self.apply_fetch(ticket, result),
                _ = report.tick(), if self.cfg.report.enabled => self.send_report(),
            }
        }
    }

    /// Refreshes the active view. With notify rules on and sales showing,
    /// listings are polled right after.
    fn on_refresh(&mut self) {
        self.request_fetch();
        if self.cfg.notify.enabled && self.state.view_mode() != ViewMode::NewListings {
            self.listings_poll_pending = true;
        }
        self.start_listings_poll();
    }

    /// Starts a background fetch of the active view unless one is running.
    fn request_fetch(&mut self) {
        self.spawn_fetch(self.state.view_mode());
    }

    fn start_listings_poll(&mut self) {
        if self.listings_poll_pending && !self.state.is_fetching() {
            self.listings_poll_pending = false;
            self.spawn_fetch(ViewMode::NewListings);
        }
    }

    fn spawn_fetch(&mut self, view: ViewMode) {
        let Some(ticket) = self.state.try_begin_fetch_for(view) else {
            return;
        };

        let source = Arc::clone(&self.source);
        let filters = self.state.filters().clone();
        let page_size = self.cfg.page_size;
        let done = self.done_tx.clone();

        tokio::spawn(async move {
            let today = Local::now().date_naive();
            let result = fetch_all(source.as_ref(), ticket.view, &filters, page_size, today).await;
            let _ = done.send((ticket, result)).await;
        });
    }

    fn apply_fetch(&mut self, ticket: FetchTicket, result: Result<Vec<MarketplaceRecord>, FetchError>) {
        let active = self.state.view_mode();
        match self.state.complete_fetch(ticket, result) {
            FetchOutcome::Stale { view } => {
                if view == ViewMode::NewListings && view != active && self.cfg.notify.enabled {
                    self.listings_poll_pending = true;
                }
                self.request_fetch();
            }
            outcome => {
                if let FetchOutcome::Applied { view: ViewMode::NewListings, .. } = outcome {
                    self.check_notifications();
                }
                if ticket.view == active {
                    self.publish();
                } else if self.state.dataset(active).origin == DataOrigin::Empty {
                    // The view was toggled mid-fetch; load the one now showing.
                    self.request_fetch();
                }
            }
        }
        self.start_listings_poll();
    }

    fn handle_command(&mut self, command: ClientCommand) {
        debug!("Client command: {:?}", command);
        match command {
            ClientCommand::Hello { viewport, .. } => {
                self.publish();
                match viewport {
                    Some(v) => {
                        let fitted = self.prefs.restored(&self.cfg.banner, v.width, v.height);
                        self.feed.send(&FeedPacket::Preferences(fitted));
                    }
                    None => self.publish_preferences(),
                }
            }
            ClientCommand::ToggleView => {
                let view = self.state.toggle_view_mode();
                self.prefs.view_mode = view;
                self.save_preferences();
                self.publish();
                self.request_fetch();
            }
            ClientCommand::SetFilters { filters } => {
                if self.state.set_filters(filters.clone()) {
                    info!("Filters changed: {:?}", filters);
                    self.prefs.filters = Some(filters);
                    self.save_preferences();
                    self.request_fetch();
                }
            }
            ClientCommand::ToggleMinimized => {
                self.prefs.toggle_minimized();
                self.save_preferences();
                self.publish_preferences();
            }
            ClientCommand::Move { anchor, viewport_height } => {
                self.prefs.move_to(&self.cfg.banner, anchor, viewport_height);
                self.save_preferences();
                self.publish_preferences();
            }
            ClientCommand::Resize { width, viewport_width } => {
                if self.prefs.record_width(&self.cfg.banner, width, viewport_width) {
                    self.save_preferences();
                }
                self.publish_preferences();
            }
            ClientCommand::Refresh => self.request_fetch(),
        }
    }

    /// Pushes the ticker line and dashboard for the active view.
    fn publish(&self) {
        let view = self.state.view_mode();
        let ticker = TickerSnapshot::build(view, self.state.dataset(view));
        let dashboard = Dashboard::build(view, self.state.chart_records(view));

        info!(
            "📊 {} {} entries ({:?}), avg ${:.2} over {} priced, {} overlay(s)",
            view.title(),
            ticker.entries.len(),
            ticker.origin,
            dashboard.summary.average,
            dashboard.summary.priced,
            self.feed.client_count()
        );
        debug!("Ticker: {}", ticker.line());

        self.feed.send(&FeedPacket::Ticker(ticker));
        self.feed.send(&FeedPacket::Dashboard(dashboard));
    }

    fn publish_preferences(&self) {
        self.feed.send(&FeedPacket::Preferences(self.prefs.clone()));
    }

    fn save_preferences(&self) {
        if let Err(e) = self.store.save(&self.prefs) {
            warn!("Error saving preferences to {}: {}", self.store.path().display(), e);
        }
    }

    /// Listings that newly match a rule. Matches present on the first
    /// successful load are recorded without being returned.
    fn collect_alerts(&mut self) -> Vec<ListingMatch> {
        let records = self.state.chart_records(ViewMode::NewListings);
        self.ledger.retain_listed(records);
        let matches = self.ledger.collect_new(&self.cfg.notify.rules, records);
        if !self.listings_seen {
            self.listings_seen = true;
            info!("🔔 Watching {} listing matches already on the market", matches.len());
            return Vec::new();
        }
        matches
    }

    fn check_notifications(&mut self) {
        if !self.cfg.notify.enabled {
            return;
        }

        for m in self.collect_alerts() {
            warn!("🔔 Listing match for rule {}: {}", m.rule_id, m.listing_key);
            if let Some(url) = self.cfg.slack_webhook() {
                notifier::send_listing_alert(url.to_string(), &m);
            }
            self.feed.send(&FeedPacket::Alert {
                text: format_listing_alert(&m),
                rule_id: m.rule_id,
            });
        }
    }

    fn send_report(&self) {
        let Some(url) = self.cfg.slack_webhook() else {
            return;
        };
        let view = self.state.view_mode();
        let records = self.state.chart_records(view);
        let report = stats::generate_report(
            view.display_name(),
            &PriceSummary::from_records(records),
            &price_distribution(records),
        );
        notifier::send_report(url.to_string(), report);
        info!("📊 Price report sent.");
    }
}
