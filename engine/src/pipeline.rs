//! Wires the whole data flow from §2 together: Broker Consumer → Event Bus (raw) → Parser
//! Dispatch → Event Bus (domain) → Router → {Flight-State Store, Track/Identity actor} →
//! Client Fanout. This is the one place that owns the bus and every actor's `ActorRef`, handed
//! to the `swimd` binary's HTTP surface for snapshot/stats reads and client registration.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use ractor::{Actor, ActorRef};
use swim_common::Config;

use crate::actors::broker::{BrokerArgs, BrokerConsumerActor, DEFAULT_RECONNECT_DELAY};
use crate::actors::fanout::{FanoutActor, FanoutMsg};
use crate::actors::parser_dispatch::ParserDispatchActor;
use crate::actors::router::{RouterActor, RouterArgs};
use crate::actors::store::{StoreActor, StoreArgs, StoreMsg};
use crate::actors::track::{TrackActor, TrackArgs, TrackMsg};
use crate::bus::EventBus;
use crate::error::BrokerError;

/// Handles to every long-lived actor, held by the binary for the lifetime of the process.
pub struct Pipeline {
    pub bus: Arc<EventBus>,
    pub store: ActorRef<StoreMsg>,
    pub track: ActorRef<TrackMsg>,
    pub fanout: ActorRef<FanoutMsg>,
}

/// Spawns the full actor graph and the broker consumers for both feeds, returning the handles
/// the HTTP surface needs alongside a receiver for fatal broker failures. `0` for
/// `max_broker_attempts` means infinite retries, per spec.
///
/// Per spec, only a config error or a broker's reconnect attempts being exhausted terminates
/// the process; every broker consumer reports the latter on `fatal` before its `handle` returns
/// `Err` and the actor stops, since a plain `Actor::spawn(None, ...)` actor's exit reason
/// otherwise never reaches the caller.
pub async fn spawn(
    config: &Config,
    max_broker_attempts: u32,
) -> eyre::Result<(Pipeline, tokio::sync::mpsc::UnboundedReceiver<BrokerError>)> {
    let bus = Arc::new(EventBus::new(crate::bus::DEFAULT_BUS_CAPACITY));
    let (fatal_tx, fatal_rx) = tokio::sync::mpsc::unbounded_channel();

    let (fanout, _) = Actor::spawn(None, FanoutActor, ()).await?;
    let (track, _) = Actor::spawn(None, TrackActor, TrackArgs { fanout: fanout.clone() }).await?;
    let (store, _) = Actor::spawn(
        None,
        StoreActor,
        StoreArgs { stale_timeout: Duration::seconds(config.stale_timeout_secs as i64), fanout: fanout.clone() },
    )
    .await?;

    Actor::spawn(
        None,
        RouterActor,
        RouterArgs { bus: bus.clone(), store: store.clone(), track: track.clone() },
    )
    .await?;

    Actor::spawn(None, ParserDispatchActor, bus.clone()).await?;

    let (_sfdps_consumer, _) = Actor::spawn(
        None,
        BrokerConsumerActor,
        BrokerArgs {
            label: "SFDPS",
            config: config.sfdps.clone(),
            bus: bus.clone(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_attempts: max_broker_attempts,
            fatal: fatal_tx.clone(),
        },
    )
    .await?;

    let (_stdds_consumer, _) = Actor::spawn(
        None,
        BrokerConsumerActor,
        BrokerArgs {
            label: "STDDS",
            config: config.stdds.clone(),
            bus: bus.clone(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_attempts: max_broker_attempts,
            fatal: fatal_tx,
        },
    )
    .await?;

    Ok((Pipeline { bus, store, track, fanout }, fatal_rx))
}

/// Default backoff between broker reconnect attempts, re-exported for CLI help text.
pub const RECONNECT_DELAY: StdDuration = DEFAULT_RECONNECT_DELAY;
