//! Flight-state store: the single-writer reconciliation engine.
//!
//! One `ractor` actor owns the entire GUFI → [`FlightState`] map; every mutation runs inside
//! `handle`, so there is no locking around the map itself (ground truth:
//! `engine/src/actors/state.rs`'s file-backed `StateActor`, generalized from a job queue to a
//! flight map and from a file sync timer to a staleness sweep and a stats tick).

use std::collections::HashMap;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use swim_formats::FlightPlanData;
use tracing::{trace, warn};

use crate::actors::fanout::FanoutMsg;
use crate::envelope::Envelope;
use crate::state::{FlightState, FlightStatus};

/// Background sweep interval (spec: every 60 s).
const SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(60);
/// Stats broadcast interval (spec: once per second).
const STATS_INTERVAL: StdDuration = StdDuration::from_secs(1);
/// EWMA smoothing factor for the messages-per-second stat.
const STATS_ALPHA: f64 = 0.2;

pub struct StoreActor;

#[derive(Debug)]
pub enum StoreMsg {
    Ingest(Box<FlightPlanData>),
    Sweep,
    Tick,
    GetFlight(String, RpcReplyPort<Option<FlightState>>),
    Snapshot(RpcReplyPort<Vec<FlightState>>),
    Stats(RpcReplyPort<StatsSnapshot>),
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StatsSnapshot {
    pub msg_total: u64,
    pub msg_rate: f64,
    pub active_flights: usize,
}

pub struct StoreArgs {
    pub stale_timeout: Duration,
    pub fanout: ActorRef<FanoutMsg>,
}

pub struct StoreState {
    flights: HashMap<String, FlightState>,
    stale_timeout: Duration,
    fanout: ActorRef<FanoutMsg>,
    msg_total: u64,
    msg_rate: f64,
    window_count: u64,
}

#[ractor::async_trait]
impl Actor for StoreActor {
    type Msg = StoreMsg;
    type State = StoreState;
    type Arguments = StoreArgs;

    async fn pre_start(&self, myself: ActorRef<Self::Msg>, args: Self::Arguments) -> Result<Self::State, ActorProcessingErr> {
        myself.send_interval(SWEEP_INTERVAL, || StoreMsg::Sweep);
        myself.send_interval(STATS_INTERVAL, || StoreMsg::Tick);
        Ok(StoreState {
            flights: HashMap::new(),
            stale_timeout: args.stale_timeout,
            fanout: args.fanout,
            msg_total: 0,
            msg_rate: 0.0,
            window_count: 0,
        })
    }

    #[tracing::instrument(skip(self, _myself, state))]
    async fn handle(&self, _myself: ActorRef<Self::Msg>, message: Self::Msg, state: &mut Self::State) -> Result<(), ActorProcessingErr> {
        match message {
            StoreMsg::Ingest(event) => ingest(state, *event, Utc::now()),
            StoreMsg::Sweep => sweep(state, Utc::now()),
            StoreMsg::Tick => tick(state),
            StoreMsg::GetFlight(gufi, reply) => reply.send(state.flights.get(&gufi).cloned())?,
            StoreMsg::Snapshot(reply) => reply.send(state.flights.values().cloned().collect())?,
            StoreMsg::Stats(reply) => reply.send(StatsSnapshot {
                msg_total: state.msg_total,
                msg_rate: state.msg_rate,
                active_flights: state.flights.len(),
            })?,
        }
        Ok(())
    }
}

fn ingest(state: &mut StoreState, event: FlightPlanData, now: DateTime<Utc>) {
    let Some(gufi) = event.gufi.clone() else {
        warn!("dropping SFDPS event with no gufi");
        return;
    };

    state.msg_total += 1;
    state.window_count += 1;

    let is_new = !state.flights.contains_key(&gufi);
    let flight = state.flights.entry(gufi.clone()).or_insert_with(|| FlightState::new(gufi.clone()));
    let changed = flight.apply(&event, now);
    trace!(gufi = %gufi, changed = changed.len(), "flight state updated");

    let facility = flight.controlling_facility.clone();
    if is_new {
        let envelope = Envelope::Snapshot { flights: vec![flight.clone()] };
        let _ = state.fanout.cast(FanoutMsg::Broadcast { envelope, facility: facility.clone() });
    } else if !changed.is_empty() {
        let envelope = Envelope::Update { gufi: gufi.clone(), fields: flight.changed_fields_json(&changed).into_iter().collect() };
        let _ = state.fanout.cast(FanoutMsg::Broadcast { envelope, facility: facility.clone() });
    }

    if flight.status != FlightStatus::Active {
        let _ = state.fanout.cast(FanoutMsg::Broadcast { envelope: Envelope::Remove { gufi: gufi.clone() }, facility });
        state.flights.remove(&gufi);
    }
}

fn sweep(state: &mut StoreState, now: DateTime<Utc>) {
    let stale: Vec<String> = state
        .flights
        .iter()
        .filter(|(_, flight)| match flight.last_seen {
            Some(seen) => now - seen > state.stale_timeout,
            None => false,
        })
        .map(|(gufi, _)| gufi.clone())
        .collect();

    for gufi in stale {
        if let Some(flight) = state.flights.get(&gufi) {
            let facility = flight.controlling_facility.clone();
            let _ = state.fanout.cast(FanoutMsg::Broadcast { envelope: Envelope::Remove { gufi: gufi.clone() }, facility });
        }
        state.flights.remove(&gufi);
        trace!(gufi = %gufi, "evicted stale flight");
    }
}

fn tick(state: &mut StoreState) {
    state.msg_rate = STATS_ALPHA * state.window_count as f64 + (1.0 - STATS_ALPHA) * state.msg_rate;
    state.window_count = 0;
    let envelope = Envelope::Stats {
        msg_total: state.msg_total,
        msg_rate: state.msg_rate,
        active_flights: state.flights.len(),
    };
    let _ = state.fanout.cast(FanoutMsg::Broadcast { envelope, facility: None });
}

#[cfg(test)]
mod tests {
    use super::*;
    use swim_formats::SfdpsMsgKind;

    async fn spawn_store(stale_timeout: Duration) -> (ActorRef<StoreMsg>, ActorRef<FanoutMsg>) {
        let (fanout, _) = Actor::spawn(None, crate::actors::fanout::FanoutActor, ()).await.unwrap();
        let (store, _) = Actor::spawn(None, StoreActor, StoreArgs { stale_timeout, fanout: fanout.clone() }).await.unwrap();
        (store, fanout)
    }

    #[tokio::test]
    async fn unknown_flight_returns_none() {
        let (store, _fanout) = spawn_store(Duration::seconds(600)).await;
        let flight = ractor::call!(store, |port| StoreMsg::GetFlight("G404".to_string(), port)).unwrap();
        assert!(flight.is_none());
    }

    #[tokio::test]
    async fn ingest_creates_and_merges_flight() {
        let (store, _fanout) = spawn_store(Duration::seconds(600)).await;
        let mut event = FlightPlanData { gufi: Some("G1".to_string()), msg_kind: Some(SfdpsMsgKind::Fh), ..Default::default() };
        event.callsign = Some("UAL123".to_string());
        store.cast(StoreMsg::Ingest(Box::new(event))).unwrap();

        tokio::time::sleep(StdDuration::from_millis(20)).await;
        let flight = ractor::call!(store, |port| StoreMsg::GetFlight("G1".to_string(), port)).unwrap().expect("flight present");
        assert_eq!(flight.callsign.as_deref(), Some("UAL123"));
    }

    #[tokio::test]
    async fn cancel_removes_flight_from_the_map() {
        let (store, _fanout) = spawn_store(Duration::seconds(600)).await;
        let event = FlightPlanData { gufi: Some("G1".to_string()), msg_kind: Some(SfdpsMsgKind::Cl), ..Default::default() };
        store.cast(StoreMsg::Ingest(Box::new(event))).unwrap();

        tokio::time::sleep(StdDuration::from_millis(20)).await;
        let flight = ractor::call!(store, |port| StoreMsg::GetFlight("G1".to_string(), port)).unwrap();
        assert!(flight.is_none());
    }
}
