//! Lookup execution for the TUI dashboard.

use std::{net::IpAddr, sync::Arc, time::Instant};

use hedged_resolver::{HedgeError, Hedged, HedgedResolver, Resolver};
use tokio::sync::mpsc;

use crate::{
    app::{App, AppEvent, Lane, Mode},
    sim::{SimError, SimulatedResolver},
};

type LaneOutcome = (Option<Lane>, Result<String, String>);

/// Credits a hedged result to the call that settled it, failures included.
fn hedged_outcome(
    host: &str,
    result: Result<Hedged<Vec<IpAddr>>, HedgeError<SimError>>,
) -> LaneOutcome {
    match result {
        Ok(resolved) => (
            Some(Lane::from(resolved.branch)),
            Ok(format!("{host} -> {:?}", resolved.value)),
        ),
        Err(e) => {
            let lane = e.branch().map(Lane::from);
            let message = e
                .into_failure()
                .map_or_else(|| "cancelled".to_string(), |err| err.to_string());
            (lane, Err(message))
        }
    }
}

/// Spawns a lookup based on the current app configuration.
///
/// The lookup runs in a background task and reports its result through `tx`.
pub fn spawn_lookup(app: &App, tx: mpsc::UnboundedSender<AppEvent>) {
    let mode = app.mode;
    let host = app.host.clone();
    let hedged: HedgedResolver<Arc<SimulatedResolver>> = app.hedged.clone();
    let sim = Arc::clone(&app.sim);

    tokio::spawn(async move {
        let start = Instant::now();

        let (lane, result) = match mode {
            Mode::Hedged => hedged_outcome(&host, hedged.resolve_detailed(host.clone()).await),
            Mode::Direct => match sim.issue(host.clone()).await {
                Ok(addrs) => (Some(Lane::Direct), Ok(format!("{host} -> {addrs:?}"))),
                Err(e) => (Some(Lane::Direct), Err(e.to_string())),
            },
        };

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        let (ok, message) = match result {
            Ok(msg) => (true, msg),
            Err(msg) => (false, msg),
        };

        let _ = tx.send(AppEvent::LookupFinished {
            lane,
            latency_ms,
            ok,
            message,
        });
    });
}
