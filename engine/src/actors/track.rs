//! Legacy-track actor: owns the [`IdentityMapper`] and turns TAIS/ASDE-X domain events, which
//! carry no GUFI, into facility-scoped envelopes for the legacy radar-client protocol.
//!
//! Single-writer, same idiom as [`crate::actors::store`]: the identity map is only ever
//! touched from inside `handle`.

use std::time::Duration as StdDuration;

use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use swim_formats::{Departure, SurfaceMovement, TrackPosition};
use tracing::trace;

use crate::actors::fanout::FanoutMsg;
use crate::envelope::Envelope;
use crate::identity::IdentityMapper;

/// Background sweep interval, shared with the flight-state store's staleness pass.
const SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(60);

pub struct TrackActor;

#[derive(Debug)]
pub enum TrackMsg {
    Position(TrackPosition),
    Surface(SurfaceMovement),
    Departure(Departure),
    Sweep,
}

pub struct TrackArgs {
    pub fanout: ActorRef<FanoutMsg>,
}

pub struct TrackState {
    mapper: IdentityMapper,
    fanout: ActorRef<FanoutMsg>,
}

#[ractor::async_trait]
impl Actor for TrackActor {
    type Msg = TrackMsg;
    type State = TrackState;
    type Arguments = TrackArgs;

    async fn pre_start(&self, myself: ActorRef<Self::Msg>, args: Self::Arguments) -> Result<Self::State, ActorProcessingErr> {
        myself.send_interval(SWEEP_INTERVAL, || TrackMsg::Sweep);
        Ok(TrackState { mapper: IdentityMapper::new(), fanout: args.fanout })
    }

    #[tracing::instrument(skip(self, _myself, state))]
    async fn handle(&self, _myself: ActorRef<Self::Msg>, message: Self::Msg, state: &mut Self::State) -> Result<(), ActorProcessingErr> {
        match message {
            TrackMsg::Position(pos) => {
                let mode_s = pos.mode_s.clone().unwrap_or_default();
                let track_num = pos.track_num.unwrap_or(0);
                let track_id = state.mapper.resolve(&mode_s, track_num, &pos.facility, Utc::now());
                let envelope = Envelope::Track {
                    track_id,
                    facility: pos.facility.clone(),
                    lat: pos.lat,
                    lon: pos.lon,
                    altitude_ft: pos.altitude_ft,
                    ground_speed_kt: pos.ground_speed_kt,
                    ground_track_deg: pos.ground_track_deg,
                    mode_s: pos.mode_s.clone(),
                    squawk: pos.squawk.clone(),
                    on_ground: pos.on_ground,
                };
                let facility = Some(pos.facility);
                let _ = state.fanout.cast(FanoutMsg::Broadcast { envelope, facility });
            }
            TrackMsg::Surface(surf) => {
                let envelope = Envelope::Surface {
                    airport: surf.airport.clone(),
                    track_id: surf.asdex_track_id,
                    lat: surf.lat,
                    lon: surf.lon,
                    full: surf.full,
                };
                let _ = state.fanout.cast(FanoutMsg::Broadcast { envelope, facility: Some(surf.airport) });
            }
            TrackMsg::Departure(dep) => {
                let envelope = Envelope::Departure { callsign: dep.callsign, airport: dep.airport, runway: dep.runway };
                let _ = state.fanout.cast(FanoutMsg::Broadcast { envelope, facility: None });
            }
            TrackMsg::Sweep => {
                let before = state.mapper.len();
                state.mapper.sweep(Utc::now());
                trace!(evicted = before.saturating_sub(state.mapper.len()), "identity mapper sweep");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::fanout::FanoutActor;

    async fn spawn_track() -> ActorRef<TrackMsg> {
        let (fanout, _) = Actor::spawn(None, FanoutActor, ()).await.unwrap();
        let (track, _) = Actor::spawn(None, TrackActor, TrackArgs { fanout }).await.unwrap();
        track
    }

    #[tokio::test]
    async fn position_without_mode_s_still_resolves_a_stable_id() {
        let track = spawn_track().await;
        let pos = TrackPosition { facility: "BOS".to_string(), lat: 1.0, lon: 2.0, ..Default::default() };
        track.cast(TrackMsg::Position(pos)).unwrap();
        track.stop(None);
    }
}
