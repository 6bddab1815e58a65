//! The monitor command: JSON requests on stdin, JSON replies on stdout.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use jiff::Timestamp;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::autopilot::SimulatedAutopilot;
use crate::config::Config;
use crate::coordinator::Capabilities;
use crate::manifest::CrewManifest;
use crate::model::{NavigationFix, Position};
use crate::monitor::{self, CHANNEL_CAPACITY, DRAIN_TIMEOUT, Reply};
use crate::radio::SimulatedRadio;
use crate::request::Request;
use crate::station::Station;
use crate::storage::Storage;

use super::{build_planner, parse_position, resolve_plan};

#[derive(Debug, Args)]
pub struct MonitorArgs {
    /// Crew manifest JSON file. Starts with nobody aboard when omitted.
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Forecast JSON file used to re-assess the active plan.
    #[arg(long)]
    forecast: Option<PathBuf>,

    /// Anchorage catalog JSON file.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Saved plan to watch: full UUID or unambiguous prefix.
    #[arg(long)]
    plan: Option<String>,

    /// Starting position as `lat:lon`, until a navigation fix arrives.
    #[arg(long, value_parser = parse_position, default_value = "40.876:29.091")]
    position: Position,
}

pub(super) fn cmd_monitor(config: &Config, storage: &Storage, args: &MonitorArgs) -> Result<(), String> {
    let crew = match &args.manifest {
        Some(path) => {
            CrewManifest::load(path).map_err(|e| format!("failed to load manifest: {e}"))?
        }
        None => CrewManifest::new(config.vessel.name.clone()),
    };
    let planner = build_planner(config, args.forecast.as_deref(), args.catalog.as_deref())?;
    let plan = args
        .plan
        .as_deref()
        .map(|reference| resolve_plan(storage, reference))
        .transpose()?;
    let logbook = storage
        .logbook()
        .map_err(|e| format!("failed to open logbook: {e}"))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start runtime: {e}"))?;

    let capabilities = Capabilities {
        autopilot: Arc::new(SimulatedAutopilot::new(config.emergency.approach_speed_kn)),
        radio: Arc::new(SimulatedRadio::new()),
        audit: Arc::new(logbook),
    };
    let fix = NavigationFix {
        position: args.position,
        heading_deg: 0.0,
        speed_kn: 0.0,
        fixed_at: Timestamp::now(),
    };
    let mut station = Station::new(
        config,
        planner,
        crew.into_shared(),
        capabilities,
        fix,
        runtime.handle().clone(),
    );
    if let Some(plan) = plan {
        info!(plan_id = %plan.id, "watching plan");
        station.set_plan(plan);
    }

    let settings = config.monitor;
    let station = runtime.block_on(async move {
        let (request_tx, request_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (reply_tx, reply_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let reader = tokio::spawn(read_requests(request_tx, reply_tx.clone()));
        let writer = tokio::spawn(write_replies(tokio::io::stdout(), reply_rx));
        let station = monitor::run(station, settings, request_rx, reply_tx).await;

        reader.abort();
        if tokio::time::timeout(DRAIN_TIMEOUT, writer).await.is_err() {
            warn!("reply writer did not drain in time");
        }
        station
    });

    if station.coordinator().is_active() {
        warn!("monitor stopped with an emergency still active");
    }
    drop(station);
    runtime.shutdown_timeout(DRAIN_TIMEOUT);
    Ok(())
}

/// Parse one request per stdin line. Lines that do not parse are answered
/// with an error reply and skipped.
async fn read_requests(requests: mpsc::Sender<Request>, replies: mpsc::Sender<Reply>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "failed to read stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                if requests.send(request).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                let reply = Reply::Error {
                    request: "unparsed".into(),
                    message: format!("invalid request: {e}"),
                };
                if replies.send(reply).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Write one JSON reply per line. Stops at the first write failure.
async fn write_replies<W: AsyncWrite + Unpin>(mut out: W, mut replies: mpsc::Receiver<Reply>) {
    while let Some(reply) = replies.recv().await {
        let mut line = match serde_json::to_string(&reply) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "failed to encode reply");
                continue;
            }
        };
        line.push('\n');
        if let Err(e) = out.write_all(line.as_bytes()).await {
            warn!(error = %e, "failed to write reply");
            return;
        }
        if let Err(e) = out.flush().await {
            warn!(error = %e, "failed to flush replies");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    fn reply(n: usize) -> Reply {
        Reply::Error {
            request: format!("r{n}"),
            message: "nope".into(),
        }
    }

    #[tokio::test]
    async fn replies_are_written_one_per_line() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(reply(1)).await.unwrap();
        tx.send(reply(2)).await.unwrap();
        drop(tx);

        let mut out = Vec::new();
        write_replies(&mut out, rx).await;

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("r1"));
        assert!(lines[1].contains("r2"));
    }

    /// Accepts writes but never manages to flush them.
    struct BrokenPipe {
        writes: usize,
    }

    impl AsyncWrite for BrokenPipe {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.writes += 1;
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn writer_stops_when_flush_fails() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(reply(1)).await.unwrap();
        tx.send(reply(2)).await.unwrap();

        let mut out = BrokenPipe { writes: 0 };
        // The sender is still open, so returning at all means the writer gave up.
        write_replies(&mut out, rx).await;
        assert_eq!(out.writes, 1);
        drop(tx);
    }
}
