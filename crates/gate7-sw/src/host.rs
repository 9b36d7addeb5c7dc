//! Thin adapter between a hosting event loop and the controller.
//!
//! The host side sends [`HostEvent`]s through a [`HostHandle`]; the
//! [`ServiceWorkerHost`] loop dispatches them. Lifecycle events run in order
//! on the loop itself, fetch events each get their own task so a slow request
//! never holds up another.

use std::sync::Arc;

use gate7_net::Request;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use url::Url;

use crate::controller::{ActivateReport, FetchOutcome, InstallReport, OfflineCacheController};
use crate::lifecycle::{ServiceWorkerState, WorkerMessage};
use crate::{Result, SwError};

/// A fetch event as delivered by the host.
#[derive(Debug, Clone)]
pub struct FetchEvent {
    pub request: Request,

    /// Page that issued the request, if any.
    pub client_id: Option<String>,
}

impl FetchEvent {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            client_id: None,
        }
    }

    pub fn from_client(request: Request, client_id: impl Into<String>) -> Self {
        Self {
            request,
            client_id: Some(client_id.into()),
        }
    }
}

/// Events the host delivers to the worker.
#[derive(Debug)]
pub enum HostEvent {
    Install {
        done: oneshot::Sender<InstallReport>,
    },
    Activate {
        done: oneshot::Sender<ActivateReport>,
    },
    Fetch {
        event: FetchEvent,
        respond: oneshot::Sender<FetchOutcome>,
    },
    Message {
        data: String,
    },
    ClientOpened {
        url: Url,
        done: oneshot::Sender<String>,
    },
}

/// Notifications for the page side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceWorkerEvent {
    /// State changed.
    StateChange { new_state: ServiceWorkerState },
    /// A client is now controlled by this worker.
    ControllerChange { client_id: String },
}

/// Event loop driving an [`OfflineCacheController`].
pub struct ServiceWorkerHost {
    controller: Arc<OfflineCacheController>,
    events: mpsc::UnboundedReceiver<HostEvent>,
    notify: mpsc::UnboundedSender<ServiceWorkerEvent>,
}

impl ServiceWorkerHost {
    /// Create a host, the handle used to feed it, and the notification stream.
    pub fn new(
        controller: Arc<OfflineCacheController>,
    ) -> (
        Self,
        HostHandle,
        mpsc::UnboundedReceiver<ServiceWorkerEvent>,
    ) {
        let (tx, events) = mpsc::unbounded_channel();
        let (notify, notify_rx) = mpsc::unbounded_channel();

        (
            Self {
                controller,
                events,
                notify,
            },
            HostHandle { tx },
            notify_rx,
        )
    }

    /// Run until every [`HostHandle`] is dropped. The worker then waits for
    /// its cache writes and becomes redundant.
    pub async fn run(mut self) {
        info!(cache = %self.controller.config().cache_name, "Worker host started");

        while let Some(event) = self.events.recv().await {
            match event {
                HostEvent::Install { done } => {
                    let report = self.install().await;
                    let _ = done.send(report);
                }
                HostEvent::Activate { done } => {
                    let report = self.activate().await;
                    let _ = done.send(report);
                }
                HostEvent::Fetch { event, respond } => self.dispatch_fetch(event, respond),
                HostEvent::Message { data } => self.message(&data).await,
                HostEvent::ClientOpened { url, done } => {
                    let id = self.controller.open_client(url).await;
                    let _ = done.send(id);
                }
            }
        }

        self.controller.settle().await;
        self.controller.retire().await;
        self.notify_state().await;
        info!("Worker host stopped");
    }

    async fn install(&self) -> InstallReport {
        let report = self.controller.on_install().await;
        self.notify_state().await;

        if self.controller.skip_waiting_requested().await {
            self.activate().await;
        }
        report
    }

    async fn activate(&self) -> ActivateReport {
        let report = self.controller.on_activate().await;
        self.notify_state().await;

        for client_id in &report.claimed {
            let _ = self.notify.send(ServiceWorkerEvent::ControllerChange {
                client_id: client_id.clone(),
            });
        }
        report
    }

    async fn message(&self, data: &str) {
        let Some(message) = self.controller.on_message(data).await else {
            return;
        };
        debug!(?message, "Worker message handled");

        if message == WorkerMessage::SkipWaiting
            && self.controller.state().await == ServiceWorkerState::Installed
        {
            self.activate().await;
        }
    }

    fn dispatch_fetch(&self, event: FetchEvent, respond: oneshot::Sender<FetchOutcome>) {
        let controller = Arc::clone(&self.controller);

        tokio::spawn(async move {
            let outcome = if routes_to_worker(&controller, &event).await {
                controller.on_fetch(event.request).await
            } else {
                FetchOutcome::Passthrough(crate::IgnoreReason::NotControlled)
            };

            if respond.send(outcome).is_err() {
                debug!("Page went away before the response was delivered");
            }
        });
    }

    async fn notify_state(&self) {
        let new_state = self.controller.state().await;
        let _ = self
            .notify
            .send(ServiceWorkerEvent::StateChange { new_state });
    }
}

/// Fetches reach the worker only once it is active, and then only for
/// navigations or pages it controls.
async fn routes_to_worker(controller: &OfflineCacheController, event: &FetchEvent) -> bool {
    if !controller.state().await.can_intercept_fetch() {
        return false;
    }
    if event.request.destination == Some(gate7_net::Destination::Document) {
        return true;
    }
    match &event.client_id {
        Some(id) => controller.controls(id).await,
        None => true,
    }
}

/// Sending side of a [`ServiceWorkerHost`].
#[derive(Debug, Clone)]
pub struct HostHandle {
    tx: mpsc::UnboundedSender<HostEvent>,
}

impl HostHandle {
    fn send(&self, event: HostEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|_| SwError::state("worker host has stopped"))
    }

    async fn reply<T>(rx: oneshot::Receiver<T>) -> Result<T> {
        rx.await
            .map_err(|_| SwError::state("worker host dropped the event"))
    }

    /// Deliver the install event. Activation follows when the worker skips
    /// waiting.
    pub async fn install(&self) -> Result<InstallReport> {
        let (done, rx) = oneshot::channel();
        self.send(HostEvent::Install { done })?;
        Self::reply(rx).await
    }

    pub async fn activate(&self) -> Result<ActivateReport> {
        let (done, rx) = oneshot::channel();
        self.send(HostEvent::Activate { done })?;
        Self::reply(rx).await
    }

    pub async fn fetch(&self, event: FetchEvent) -> Result<FetchOutcome> {
        let (respond, rx) = oneshot::channel();
        self.send(HostEvent::Fetch { event, respond })?;
        Self::reply(rx).await
    }

    /// Post a message from a page. Delivery is fire-and-forget.
    pub fn post_message(&self, data: impl Into<String>) -> Result<()> {
        let data = data.into();
        if WorkerMessage::parse(&data).is_none() {
            warn!(%data, "Posting a message the worker does not understand");
        }
        self.send(HostEvent::Message { data })
    }

    /// Register an open page and return its client ID.
    pub async fn open_client(&self, url: Url) -> Result<String> {
        let (done, rx) = oneshot::channel();
        self.send(HostEvent::ClientOpened { url, done })?;
        Self::reply(rx).await
    }
}
