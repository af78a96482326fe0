//! # Tide Widget
//!
//! Glues the pieces together into one running component:
//!
//! ```text
//! scheduler ──trigger──▶ ┌────────────┐ ──RequestPair──▶ fetcher task
//!                        │ event loop │                      │
//! surface ◀──ChartSpec── └────────────┘ ◀──TideSnapshot──────┘
//! ```
//!
//! The event loop is the only owner of the [`DataStore`] and the surface.
//! Timer firings and fetch replies arrive as messages and are handled one at
//! a time, so a snapshot is always applied and drawn before anything else
//! happens. Fetches run on their own tasks and are never awaited by the loop.
//!
//! On [`WidgetHandle::stop`] the timers are cancelled and the loop exits.
//! Fetches still in flight are left to finish; their replies land on a
//! closed channel and are discarded, so nothing is drawn after teardown.

use crate::chart::ChartRenderer;
use crate::config::Config;
use crate::renderer::ChartSurface;
use crate::request::RequestBuilder;
use crate::scheduler::{RefreshScheduler, Trigger};
use crate::store::DataStore;
use crate::tide_data::{TideError, TideFetcher};
use crate::TideSnapshot;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

type Reply = Result<TideSnapshot, TideError>;

/// A tide chart for one station.
pub struct TideWidget<F, S> {
    config: Config,
    fetcher: Arc<F>,
    surface: S,
}

impl<F: TideFetcher, S: ChartSurface> TideWidget<F, S> {
    pub fn new(config: Config, fetcher: F, surface: S) -> Self {
        TideWidget {
            config,
            fetcher: Arc::new(fetcher),
            surface,
        }
    }

    /// Start refreshing in the background.
    ///
    /// The surface immediately shows the loading placeholder; the first
    /// fetch is requested right away.
    pub fn start(self) -> WidgetHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(shutdown_rx));
        WidgetHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    /// Fetch, apply and draw once, then return.
    pub async fn refresh_once(mut self) -> Result<(), TideError> {
        let requests = RequestBuilder::new(&self.config.station);
        let renderer = ChartRenderer::new(requests.units(), self.config.chart.y_axis_suffix);
        let mut store = DataStore::new();

        let snapshot = self.fetcher.fetch(requests.build_today()).await?;
        store.apply_snapshot(snapshot)?;
        self.surface.present(&renderer.render(&store.current_snapshot()))
    }

    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        let requests = RequestBuilder::new(&self.config.station);
        let renderer = ChartRenderer::new(requests.units(), self.config.chart.y_axis_suffix);
        let mut store = DataStore::new();

        let (trigger_tx, mut triggers) = mpsc::unbounded_channel();
        let (reply_tx, mut replies) = mpsc::unbounded_channel::<Reply>();

        info!(
            station = %self.config.station.id,
            units = requests.units().as_str(),
            "tide widget starting"
        );
        self.redraw(&renderer, &store);
        let timers = RefreshScheduler::new(&self.config.refresh).start(trigger_tx);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                Some(trigger) = triggers.recv() => {
                    self.dispatch(trigger, &requests, &reply_tx);
                }
                Some(reply) = replies.recv() => {
                    self.on_reply(reply, &renderer, &mut store);
                }
            }
        }

        timers.stop();
        info!(station = %self.config.station.id, "tide widget stopped");
    }

    fn dispatch(
        &self,
        trigger: Trigger,
        requests: &RequestBuilder,
        replies: &mpsc::UnboundedSender<Reply>,
    ) {
        let request = requests.build_today();
        debug!(?trigger, url = %request.predicted, "requesting tide data");

        let fetcher = Arc::clone(&self.fetcher);
        let replies = replies.clone();
        tokio::spawn(async move {
            let reply = fetcher.fetch(request).await;
            // The widget may have stopped in the meantime
            let _ = replies.send(reply);
        });
    }

    fn on_reply(&mut self, reply: Reply, renderer: &ChartRenderer, store: &mut DataStore) {
        match reply.and_then(|snapshot| store.apply_snapshot(snapshot)) {
            Ok(()) => {
                let current = store.current_snapshot();
                info!(
                    station = %current.station_name,
                    predicted = current.predicted_values.len(),
                    measured = current.measured_values.len(),
                    "tide data updated"
                );
                self.redraw(renderer, store);
            }
            Err(e) => warn!("keeping previous tide data: {e}"),
        }
    }

    fn redraw(&mut self, renderer: &ChartRenderer, store: &DataStore) {
        let rendered = renderer.render(&store.current_snapshot());
        if let Err(e) = self.surface.present(&rendered) {
            error!("failed to draw tide chart: {e}");
        }
    }
}

/// Handle to a started [`TideWidget`].
#[derive(Debug)]
pub struct WidgetHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl WidgetHandle {
    /// Stop the timers and the event loop, and wait for the loop to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            error!("tide widget task failed: {e}");
        }
    }
}
