//! Domain-event router: subscribes to the bus for normalized events and forwards each one to
//! whichever single-writer actor owns its kind of state — flight-plan data to the
//! [`StoreActor`](crate::actors::store::StoreActor), everything else (which carries no GUFI)
//! to the [`TrackActor`](crate::actors::track::TrackActor).

use std::sync::Arc;

use ractor::{Actor, ActorProcessingErr, ActorRef};
use swim_formats::DomainEvent;
use tracing::trace;

use crate::actors::store::StoreMsg;
use crate::actors::track::TrackMsg;
use crate::bus::{BusMessage, EventBus};

pub struct RouterActor;

#[derive(Debug)]
pub enum RouterMsg {
    Run,
}

pub struct RouterArgs {
    pub bus: Arc<EventBus>,
    pub store: ActorRef<StoreMsg>,
    pub track: ActorRef<TrackMsg>,
}

pub struct RouterState {
    bus: Arc<EventBus>,
    store: ActorRef<StoreMsg>,
    track: ActorRef<TrackMsg>,
}

#[ractor::async_trait]
impl Actor for RouterActor {
    type Msg = RouterMsg;
    type State = RouterState;
    type Arguments = RouterArgs;

    async fn pre_start(&self, myself: ActorRef<Self::Msg>, args: Self::Arguments) -> Result<Self::State, ActorProcessingErr> {
        myself.cast(RouterMsg::Run)?;
        Ok(RouterState { bus: args.bus, store: args.store, track: args.track })
    }

    #[tracing::instrument(skip(self, _myself, state))]
    async fn handle(&self, _myself: ActorRef<Self::Msg>, message: Self::Msg, state: &mut Self::State) -> Result<(), ActorProcessingErr> {
        let RouterMsg::Run = message;
        let rx = state.bus.subscribe("DomainRouter");
        loop {
            let Some(msg) = rx.recv().await else { return Ok(()) };
            let BusMessage::Domain(event) = msg else { continue };
            trace!(?event, "routing domain event");
            match *event {
                DomainEvent::FlightPlanData(plan) => {
                    let _ = state.store.cast(StoreMsg::Ingest(plan));
                }
                DomainEvent::TrackPosition(pos) => {
                    let _ = state.track.cast(TrackMsg::Position(pos));
                }
                DomainEvent::SurfaceMovement(surf) => {
                    let _ = state.track.cast(TrackMsg::Surface(surf));
                }
                DomainEvent::Departure(dep) => {
                    let _ = state.track.cast(TrackMsg::Departure(dep));
                }
            }
        }
    }
}
