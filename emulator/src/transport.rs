//! MQTT transport backed by `rumqttc`.
//!
//! The blocking `Connection` lives on its own thread. It only starts (or
//! restarts) the network session when the control loop asks for an attempt,
//! so the loop keeps sole ownership of the reconnect cadence.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use companion_core::sync::{InboundMessage, OutboundMessage, Transport, TransportEvent};
use rumqttc::{Client, Connection, Event, MqttOptions, Packet, QoS};
use tracing::{debug, info, warn};

use crate::error::EmulatorError;
use crate::settings::Broker;

/// Requests buffered by the client before `try_publish` reports back-pressure.
const REQUEST_CAPACITY: usize = 64;

pub struct MqttTransport {
    client: Client,
    attempts: Sender<()>,
    events: Receiver<TransportEvent>,
}

impl MqttTransport {
    pub fn new(broker: &Broker) -> Result<Self, EmulatorError> {
        let mut options = MqttOptions::new(&broker.client_id, &broker.host, broker.port);
        options.set_keep_alive(Duration::from_secs(broker.keep_alive_secs.max(5)));
        options.set_clean_session(true);

        let (client, connection) = Client::new(options, REQUEST_CAPACITY);
        let (attempt_tx, attempt_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::Builder::new()
            .name("mqtt-connection".into())
            .spawn(move || drive(connection, &attempt_rx, &event_tx))?;

        info!("mqtt broker {}:{}", broker.host, broker.port);
        Ok(Self {
            client,
            attempts: attempt_tx,
            events: event_rx,
        })
    }
}

impl Transport for MqttTransport {
    type Error = EmulatorError;

    fn connect(&mut self) -> Result<(), Self::Error> {
        self.attempts
            .send(())
            .map_err(|_| EmulatorError::ConnectionClosed)
    }

    fn subscribe(&mut self, filter: &str) -> Result<(), Self::Error> {
        self.client.try_subscribe(filter, QoS::AtLeastOnce)?;
        Ok(())
    }

    fn publish(&mut self, message: &OutboundMessage) -> Result<(), Self::Error> {
        self.client.try_publish(
            message.topic.as_str(),
            QoS::AtLeastOnce,
            message.retain,
            message.payload.as_bytes().to_vec(),
        )?;
        Ok(())
    }

    fn poll(&mut self) -> Option<TransportEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                warn!("mqtt connection thread has exited");
                None
            }
        }
    }
}

/// Runs one network session per connection request until it fails.
fn drive(mut connection: Connection, attempts: &Receiver<()>, events: &Sender<TransportEvent>) {
    while attempts.recv().is_ok() {
        for notification in connection.iter() {
            let event = match notification {
                Ok(Event::Incoming(Packet::ConnAck(_))) => TransportEvent::Connected,
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    match InboundMessage::new(&publish.topic, &publish.payload) {
                        Some(message) => TransportEvent::Message(message),
                        None => {
                            debug!("oversized message on {} dropped", publish.topic);
                            continue;
                        }
                    }
                }
                Ok(_) => continue,
                Err(err) => {
                    warn!("mqtt connection error: {err}");
                    if events.send(TransportEvent::Disconnected).is_err() {
                        return;
                    }
                    break;
                }
            };

            if events.send(event).is_err() {
                return;
            }
        }

        // Attempts requested while the session was running are stale.
        while attempts.try_recv().is_ok() {}
    }
}
