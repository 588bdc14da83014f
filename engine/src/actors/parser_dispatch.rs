//! Parser dispatch: subscribes once to the bus for raw messages, offers each one to every
//! registered parser, and republishes whatever domain events come back.
//!
//! Ground truth: the teacher's `Worker::handle(WorkerMsg::Consume)` in
//! `sources/access/senhive/actors.rs`, which loops forever inside one message handler
//! consuming AMQP feeds. Here the "feed" is the in-process bus instead of a second broker
//! connection.

use std::sync::Arc;

use ractor::{Actor, ActorProcessingErr, ActorRef};
use swim_formats::{dispatch, registry, Parser};
use tracing::trace;

use crate::bus::{BusMessage, EventBus};

pub struct ParserDispatchActor;

#[derive(Debug)]
pub enum ParserDispatchMsg {
    Run,
}

pub struct ParserDispatchState {
    bus: Arc<EventBus>,
    registry: Vec<Box<dyn Parser>>,
}

#[ractor::async_trait]
impl Actor for ParserDispatchActor {
    type Msg = ParserDispatchMsg;
    type State = ParserDispatchState;
    type Arguments = Arc<EventBus>;

    async fn pre_start(&self, myself: ActorRef<Self::Msg>, bus: Self::Arguments) -> Result<Self::State, ActorProcessingErr> {
        myself.cast(ParserDispatchMsg::Run)?;
        Ok(ParserDispatchState { bus, registry: registry() })
    }

    #[tracing::instrument(skip(self, _myself, state))]
    async fn handle(&self, _myself: ActorRef<Self::Msg>, message: Self::Msg, state: &mut Self::State) -> Result<(), ActorProcessingErr> {
        let ParserDispatchMsg::Run = message;
        let rx = state.bus.subscribe("ParserPipeline");
        loop {
            let Some(msg) = rx.recv().await else { return Ok(()) };
            let BusMessage::Raw(raw) = msg else { continue };
            let events = dispatch(&state.registry, &raw);
            trace!(topic = %raw.topic, produced = events.len(), "parser dispatch");
            for event in events {
                state.bus.publish(BusMessage::Domain(Box::new(event)));
            }
        }
    }
}
