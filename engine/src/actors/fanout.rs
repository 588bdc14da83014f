//! Client fanout: a registry of per-client bounded queues, broadcast facility-scoped.
//!
//! Mirrors the teacher's single-writer-behind-a-mailbox actors (`StatsActor`, `QueueActor`):
//! the registry itself is only ever mutated from inside `handle`, so no extra locking is
//! needed around it.

use std::collections::HashMap;

use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use tracing::{debug, trace};

use crate::bus::{self, SendOutcome};
use crate::envelope::Envelope;

/// Default per-client queue capacity (spec default 5,000).
pub const DEFAULT_CLIENT_CAPACITY: usize = 5_000;

pub struct FanoutActor;

#[derive(Debug)]
pub enum FanoutMsg {
    /// Registers a new client, scoped to `facility` if given; `None` ⇒ receives every broadcast
    /// regardless of the facility it carries.
    Register { id: u64, facility: Option<String>, sender: bus::Sender<Envelope> },
    Deregister(u64),
    /// Broadcasts to every client whose facility matches case-insensitively; `None` ⇒ all.
    Broadcast { envelope: Envelope, facility: Option<String> },
    /// Number of currently-registered clients, for the `/diag` endpoint.
    ClientCount(RpcReplyPort<usize>),
}

struct Client {
    facility: Option<String>,
    sender: bus::Sender<Envelope>,
}

#[derive(Default)]
pub struct FanoutState {
    clients: HashMap<u64, Client>,
}

#[ractor::async_trait]
impl Actor for FanoutActor {
    type Msg = FanoutMsg;
    type State = FanoutState;
    type Arguments = ();

    async fn pre_start(&self, _myself: ActorRef<Self::Msg>, _args: Self::Arguments) -> Result<Self::State, ActorProcessingErr> {
        Ok(FanoutState::default())
    }

    #[tracing::instrument(skip(self, _myself, state))]
    async fn handle(&self, _myself: ActorRef<Self::Msg>, message: Self::Msg, state: &mut Self::State) -> Result<(), ActorProcessingErr> {
        match message {
            FanoutMsg::Register { id, facility, sender } => {
                trace!(id, facility = facility.as_deref().unwrap_or("*"), "client registered");
                state.clients.insert(id, Client { facility, sender });
            }
            FanoutMsg::Deregister(id) => {
                trace!(id, "client deregistered");
                state.clients.remove(&id);
            }
            FanoutMsg::Broadcast { envelope, facility } => {
                state.clients.retain(|id, client| {
                    if client.sender.is_closed() {
                        return false;
                    }
                    let matches = match (&client.facility, &facility) {
                        (Some(client_facility), Some(f)) => client_facility.eq_ignore_ascii_case(f),
                        _ => true,
                    };
                    if matches && client.sender.send(envelope.clone()) == SendOutcome::DroppedOldest {
                        debug!(client = id, "client queue backpressure: dropped oldest envelope");
                    }
                    true
                });
            }
            FanoutMsg::ClientCount(reply) => reply.send(state.clients.len())?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures_util::FutureExt;

    use super::*;

    fn envelope() -> Envelope {
        Envelope::Remove { gufi: "G1".to_string() }
    }

    #[tokio::test]
    async fn unscoped_client_receives_a_facility_scoped_broadcast() {
        let (fanout, _) = Actor::spawn(None, FanoutActor, ()).await.unwrap();
        let (tx, rx) = bus::channel::<Envelope>(DEFAULT_CLIENT_CAPACITY);
        fanout.cast(FanoutMsg::Register { id: 1, facility: None, sender: tx }).unwrap();

        fanout.cast(FanoutMsg::Broadcast { envelope: envelope(), facility: Some("BOS".to_string()) }).unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(rx.recv().now_or_never().flatten().is_some());
    }

    #[tokio::test]
    async fn scoped_client_only_receives_its_own_facility() {
        let (fanout, _) = Actor::spawn(None, FanoutActor, ()).await.unwrap();
        let (tx, rx) = bus::channel::<Envelope>(DEFAULT_CLIENT_CAPACITY);
        fanout.cast(FanoutMsg::Register { id: 1, facility: Some("BOS".to_string()), sender: tx }).unwrap();

        fanout.cast(FanoutMsg::Broadcast { envelope: envelope(), facility: Some("ZNY".to_string()) }).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(rx.recv().now_or_never().flatten().is_none());

        fanout.cast(FanoutMsg::Broadcast { envelope: envelope(), facility: Some("bos".to_string()) }).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(rx.recv().now_or_never().flatten().is_some());
    }
}
