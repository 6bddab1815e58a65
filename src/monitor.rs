//! The emergency monitoring loop.
//!
//! Requests arrive on a channel and are handled as they come. Between them,
//! two tickers run: a short one that scans the tracker for disappearances,
//! and a slow housekeeping one that logs a heartbeat and re-assesses the
//! current plan against the forecast.

use std::time::Duration;

use jiff::{SignedDuration, Timestamp};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::MonitorSettings;
use crate::manifest;
use crate::request::{Request, Response};
use crate::station::Station;

/// One line of monitor output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Reply {
    Ok { response: Response },
    Error { request: String, message: String },
}

/// Wall-clock time that advances with the runtime's clock.
///
/// Scans compare tracker timestamps with "now"; reading the runtime clock
/// keeps that comparison consistent when time is paused in tests.
struct Clock {
    wall: Timestamp,
    mono: Instant,
}

impl Clock {
    fn start() -> Self {
        Self {
            wall: Timestamp::now(),
            mono: Instant::now(),
        }
    }

    fn now(&self) -> Timestamp {
        let elapsed = SignedDuration::try_from(self.mono.elapsed()).unwrap_or(SignedDuration::MAX);
        self.wall.checked_add(elapsed).unwrap_or(Timestamp::MAX)
    }
}

/// Run until the request channel closes or the reply channel is dropped.
/// Returns the station so the caller can inspect or persist its state.
pub async fn run(
    mut station: Station,
    settings: MonitorSettings,
    mut requests: mpsc::Receiver<Request>,
    replies: mpsc::Sender<Reply>,
) -> Station {
    let clock = Clock::start();
    let mut scan = time::interval(settings.scan_interval());
    scan.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let housekeeping_period = settings.housekeeping_interval();
    let mut housekeeping = time::interval_at(Instant::now() + housekeeping_period, housekeeping_period);
    housekeeping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        scan_ms = u64::try_from(settings.scan_interval().as_millis()).unwrap_or(u64::MAX),
        housekeeping_secs = housekeeping_period.as_secs(),
        "monitoring started"
    );

    loop {
        tokio::select! {
            request = requests.recv() => {
                let Some(request) = request else {
                    break;
                };
                let name = request.name();
                debug!(request = name, "request received");
                let reply = match station.handle(request) {
                    Ok(response) => Reply::Ok { response },
                    Err(e) => {
                        warn!(request = name, error = %e, "request failed");
                        Reply::Error {
                            request: name.to_string(),
                            message: e.to_string(),
                        }
                    }
                };
                if replies.send(reply).await.is_err() {
                    break;
                }
            }
            _ = scan.tick() => {
                for response in station.scan(clock.now()) {
                    if replies.send(Reply::Ok { response }).await.is_err() {
                        return station;
                    }
                }
            }
            _ = housekeeping.tick() => {
                heartbeat(&station);
                if let Some(reassessment) = station.reassess(clock.now())
                    && reassessment.worsened
                {
                    let response = Response::Reassessed { reassessment };
                    if replies.send(Reply::Ok { response }).await.is_err() {
                        return station;
                    }
                }
            }
        }
    }

    info!("monitoring stopped");
    station
}

fn heartbeat(station: &Station) {
    let onboard = manifest::lock(station.manifest()).onboard_count();
    info!(
        onboard,
        emergency = station.coordinator().is_active(),
        plan = station.plan().map(|p| p.short_id()).unwrap_or_default(),
        "heartbeat"
    );
}

/// Channel capacity for requests and replies.
pub const CHANNEL_CAPACITY: usize = 64;

/// Default wait for the loop to drain after input closes.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
