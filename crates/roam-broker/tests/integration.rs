//! End-to-end subscriber tests against an in-process stub broker.
//!
//! The stub implements the broker traits with scripted connect failures
//! and manual delivery injection, so failover order, gate discipline,
//! and session-loss recovery are all observable without a real broker.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

use roam_broker::client::{BrokerChannel, BrokerConnector, Delivery, DeliveryStream, Publisher};
use roam_broker::responder::Responder;
use roam_broker::session::{SessionConfig, SessionManager, SessionState};
use roam_broker::subscriber::Subscriber;
use roam_core::{BrokerError, Credentials, Endpoint, Response};
use roam_link::Gate;

const TIMEOUT: Duration = Duration::from_secs(5);

// ── Stub broker ──

type DeliveryTx = mpsc::UnboundedSender<Result<Delivery, BrokerError>>;

/// Shared scripted broker state.
#[derive(Default)]
struct StubBroker {
    /// Remaining scripted connect failures per `host:port`.
    fail_connects: Mutex<HashMap<String, usize>>,
    /// Every connect attempt, in order.
    attempts: Mutex<Vec<String>>,
    declared: Mutex<Vec<(String, bool)>>,
    bound: Mutex<Vec<(String, String)>>,
    prefetch: Mutex<Option<u16>>,
    acked: Mutex<Vec<u64>>,
    published: Mutex<Vec<(String, Vec<u8>, bool)>>,
    consumer: Mutex<Option<DeliveryTx>>,
    consume_count: AtomicUsize,
    unacked: Mutex<HashMap<u64, Vec<u8>>>,
    next_tag: AtomicU64,
}

impl StubBroker {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn fail_next_connects(&self, authority: &str, count: usize) {
        let _ = self
            .fail_connects
            .lock()
            .insert(authority.to_owned(), count);
    }

    /// Inject one delivery to the current consumer.
    fn deliver(&self, payload: &[u8]) -> u64 {
        let tag = self.next_tag.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.unacked.lock().insert(tag, payload.to_vec());
        self.send(Delivery {
            delivery_tag: tag,
            payload: payload.to_vec(),
            redelivered: false,
        });
        tag
    }

    /// Resend everything unacknowledged, as the broker does after a
    /// consumer reconnect.
    fn redeliver_unacked(&self) {
        let pending: Vec<(u64, Vec<u8>)> = self
            .unacked
            .lock()
            .iter()
            .map(|(tag, payload)| (*tag, payload.clone()))
            .collect();
        for (tag, payload) in pending {
            self.send(Delivery {
                delivery_tag: tag,
                payload,
                redelivered: true,
            });
        }
    }

    /// Push a stream error, killing the current session.
    fn fail_stream(&self) {
        if let Some(tx) = self.consumer.lock().as_ref() {
            let _ = tx.send(Err(BrokerError::ChannelClosed("stub-induced".into())));
        }
    }

    fn send(&self, delivery: Delivery) {
        let guard = self.consumer.lock();
        let tx = guard.as_ref().expect("no consumer registered");
        tx.send(Ok(delivery)).expect("consumer stream dropped");
    }

    fn attempts(&self) -> Vec<String> {
        self.attempts.lock().clone()
    }

    fn ack_count(&self) -> usize {
        self.acked.lock().len()
    }

    fn responses(&self) -> Vec<Response> {
        self.published
            .lock()
            .iter()
            .map(|(_, payload, _)| serde_json::from_slice(payload).unwrap())
            .collect()
    }
}

struct StubConnector {
    broker: Arc<StubBroker>,
}

#[async_trait]
impl BrokerConnector for StubConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Arc<dyn BrokerChannel>, BrokerError> {
        let authority = endpoint.authority();
        self.broker.attempts.lock().push(authority.clone());

        let mut failures = self.broker.fail_connects.lock();
        if let Some(remaining) = failures.get_mut(&authority) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(BrokerError::Unreachable {
                    endpoint: authority,
                    message: "scripted failure".into(),
                    source: None,
                });
            }
        }
        drop(failures);

        Ok(Arc::new(StubChannel {
            broker: Arc::clone(&self.broker),
        }))
    }
}

struct StubChannel {
    broker: Arc<StubBroker>,
}

#[async_trait]
impl BrokerChannel for StubChannel {
    async fn declare_queue(&self, queue: &str, durable: bool) -> Result<(), BrokerError> {
        self.broker.declared.lock().push((queue.to_owned(), durable));
        Ok(())
    }

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        _routing_key: &str,
    ) -> Result<(), BrokerError> {
        self.broker
            .bound
            .lock()
            .push((queue.to_owned(), exchange.to_owned()));
        Ok(())
    }

    async fn set_prefetch(&self, count: u16) -> Result<(), BrokerError> {
        *self.broker.prefetch.lock() = Some(count);
        Ok(())
    }

    async fn consume(
        &self,
        _queue: &str,
        _consumer_tag: &str,
    ) -> Result<DeliveryStream, BrokerError> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.broker.consumer.lock() = Some(tx);
        let _ = self.broker.consume_count.fetch_add(1, Ordering::SeqCst);
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn ack(&self, delivery_tag: u64) -> Result<(), BrokerError> {
        self.broker.acked.lock().push(delivery_tag);
        let _ = self.broker.unacked.lock().remove(&delivery_tag);
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &[u8],
        persistent: bool,
    ) -> Result<(), BrokerError> {
        assert!(exchange.is_empty(), "responses go via the default exchange");
        self.broker
            .published
            .lock()
            .push((routing_key.to_owned(), payload.to_vec(), persistent));
        Ok(())
    }
}

// ── Harness ──

fn endpoint(host: &str) -> Endpoint {
    Endpoint::new(host, 5672, Credentials::new("myuser", "mypassword"))
}

fn session_config() -> SessionConfig {
    SessionConfig {
        exchange: "notifications".into(),
        queue: "subscriber_queue_host-a".into(),
        response_queue: "response_queue".into(),
        consumer_tag: "subscriber_queue_host-a".into(),
        connect_delay: Duration::from_millis(1),
        prefetch: 3,
    }
}

fn manager(broker: &Arc<StubBroker>, endpoints: Vec<Endpoint>) -> SessionManager {
    let connector = Arc::new(StubConnector {
        broker: Arc::clone(broker),
    });
    SessionManager::new(connector, endpoints, session_config()).unwrap()
}

/// Spawn a subscriber over the stub; returns the shutdown token and the
/// task handle.
fn spawn_subscriber(
    broker: &Arc<StubBroker>,
    endpoints: Vec<Endpoint>,
    gate: Gate,
) -> (CancellationToken, tokio::task::JoinHandle<()>) {
    let shutdown = CancellationToken::new();
    let responder = Responder::new("subscriber_queue_host-a", "response_queue");
    let subscriber = Subscriber::new(
        manager(broker, endpoints),
        gate,
        responder,
        shutdown.clone(),
    );
    let handle = tokio::spawn(subscriber.run());
    (shutdown, handle)
}

/// Poll until `predicate` holds or the deadline passes.
async fn wait_until(what: &str, predicate: impl Fn() -> bool) {
    let poll = async {
        while !predicate() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    assert!(
        timeout(TIMEOUT, poll).await.is_ok(),
        "timed out waiting for {what}"
    );
}

async fn wait_for_consumer(broker: &Arc<StubBroker>, registrations: usize) {
    let broker = Arc::clone(broker);
    wait_until("consumer registration", move || {
        broker.consume_count.load(Ordering::SeqCst) >= registrations
    })
    .await;
}

fn notification(id: &str) -> Vec<u8> {
    format!(r#"{{"id":"{id}","time_sent":"2024-01-01T00:00:00"}}"#).into_bytes()
}

// ── connect / failover ──

#[tokio::test]
async fn connect_tries_endpoints_in_round_robin_order() {
    let broker = StubBroker::new();
    broker.fail_next_connects("broker-a:5672", 1);
    broker.fail_next_connects("broker-b:5672", 1);

    let mut mgr = manager(
        &broker,
        vec![endpoint("broker-a"), endpoint("broker-b"), endpoint("broker-c")],
    );
    mgr.connect(&CancellationToken::new()).await.unwrap();

    assert_eq!(
        broker.attempts(),
        vec!["broker-a:5672", "broker-b:5672", "broker-c:5672"]
    );
    assert_eq!(mgr.state(), SessionState::Ready);
}

#[tokio::test]
async fn connect_wraps_around_the_ring() {
    let broker = StubBroker::new();
    broker.fail_next_connects("broker-a:5672", 2);
    broker.fail_next_connects("broker-b:5672", 1);

    let mut mgr = manager(&broker, vec![endpoint("broker-a"), endpoint("broker-b")]);
    mgr.connect(&CancellationToken::new()).await.unwrap();

    assert_eq!(
        broker.attempts(),
        vec![
            "broker-a:5672",
            "broker-b:5672",
            "broker-a:5672",
            "broker-b:5672"
        ]
    );
}

#[tokio::test]
async fn connect_declares_and_binds_topology() {
    let broker = StubBroker::new();
    let mut mgr = manager(&broker, vec![endpoint("broker-a")]);
    mgr.connect(&CancellationToken::new()).await.unwrap();

    let declared = broker.declared.lock().clone();
    assert!(declared.contains(&("subscriber_queue_host-a".to_owned(), true)));
    assert!(declared.contains(&("response_queue".to_owned(), true)));

    let bound = broker.bound.lock().clone();
    assert_eq!(
        bound,
        vec![("subscriber_queue_host-a".to_owned(), "notifications".to_owned())]
    );
    assert_eq!(*broker.prefetch.lock(), Some(3));
}

#[tokio::test]
async fn single_endpoint_is_the_length_one_case() {
    let broker = StubBroker::new();
    broker.fail_next_connects("broker-a:5672", 3);

    let mut mgr = manager(&broker, vec![endpoint("broker-a")]);
    mgr.connect(&CancellationToken::new()).await.unwrap();

    assert_eq!(broker.attempts().len(), 4);
}

// ── gate discipline ──

#[tokio::test]
async fn gate_closed_leaves_deliveries_unacknowledged() {
    let broker = StubBroker::new();
    let gate = Gate::new(false);
    let (shutdown, handle) = spawn_subscriber(&broker, vec![endpoint("broker-a")], gate.clone());
    wait_for_consumer(&broker, 1).await;

    let _ = broker.deliver(&notification("1"));
    let _ = broker.deliver(&notification("2"));
    let _ = broker.deliver(&notification("3"));

    // Give the loop time to (not) act on them.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(broker.ack_count(), 0, "gate closed must not ack");
    assert!(broker.responses().is_empty(), "gate closed must not respond");
    assert_eq!(broker.unacked.lock().len(), 3);

    // Reopen; the broker redelivers the outstanding window.
    gate.set(true);
    broker.redeliver_unacked();

    {
        let broker = Arc::clone(&broker);
        wait_until("3 acks after reopen", move || broker.ack_count() == 3).await;
    }
    assert_eq!(broker.responses().len(), 3);
    assert!(broker.unacked.lock().is_empty());

    shutdown.cancel();
    timeout(TIMEOUT, handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn open_gate_acks_after_response_publish() {
    let broker = StubBroker::new();
    let gate = Gate::new(true);
    let (shutdown, handle) = spawn_subscriber(&broker, vec![endpoint("broker-a")], gate);
    wait_for_consumer(&broker, 1).await;

    let tag = broker.deliver(&notification("42"));
    {
        let broker = Arc::clone(&broker);
        wait_until("ack", move || broker.ack_count() == 1).await;
    }

    assert_eq!(broker.acked.lock().clone(), vec![tag]);
    let responses = broker.responses();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].id, "42");
    assert_eq!(responses[0].tag, "subscriber_queue_host-a");
    assert_eq!(responses[0].time_sent, "2024-01-01T00:00:00");
    let (_, _, persistent) = broker.published.lock()[0].clone();
    assert!(persistent, "responses are published persistent");

    shutdown.cancel();
    timeout(TIMEOUT, handle).await.unwrap().unwrap();
}

// ── failure handling ──

#[tokio::test]
async fn malformed_message_leaves_delivery_unacked_and_loop_alive() {
    let broker = StubBroker::new();
    let gate = Gate::new(true);
    let (shutdown, handle) = spawn_subscriber(&broker, vec![endpoint("broker-a")], gate);
    wait_for_consumer(&broker, 1).await;

    let bad = broker.deliver(br#"{"id":"no-timestamp"}"#);
    let good = broker.deliver(&notification("ok"));

    {
        let broker = Arc::clone(&broker);
        wait_until("good delivery acked", move || broker.ack_count() == 1).await;
    }
    assert_eq!(broker.acked.lock().clone(), vec![good]);
    assert!(broker.unacked.lock().contains_key(&bad));
    assert_eq!(broker.responses().len(), 1);

    shutdown.cancel();
    timeout(TIMEOUT, handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn stream_error_triggers_reconnect() {
    let broker = StubBroker::new();
    let gate = Gate::new(true);
    let (shutdown, handle) = spawn_subscriber(&broker, vec![endpoint("broker-a")], gate);
    wait_for_consumer(&broker, 1).await;
    assert_eq!(broker.attempts().len(), 1);

    broker.fail_stream();
    wait_for_consumer(&broker, 2).await;
    assert!(broker.attempts().len() >= 2, "expected a reconnect attempt");

    // The fresh session still dispatches.
    let _ = broker.deliver(&notification("after-reconnect"));
    {
        let broker = Arc::clone(&broker);
        wait_until("ack after reconnect", move || broker.ack_count() == 1).await;
    }

    shutdown.cancel();
    timeout(TIMEOUT, handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn publish_without_session_does_not_crash_caller() {
    let broker = StubBroker::new();
    let mgr = manager(&broker, vec![endpoint("broker-a")]);
    let err = mgr.publish("response_queue", b"{}", true).await.unwrap_err();
    assert!(matches!(err, BrokerError::SessionInvalid(_)));
}

// ── shutdown ──

#[tokio::test]
async fn shutdown_stops_subscriber_between_deliveries() {
    let broker = StubBroker::new();
    let gate = Gate::new(true);
    let (shutdown, handle) = spawn_subscriber(&broker, vec![endpoint("broker-a")], gate);
    wait_for_consumer(&broker, 1).await;

    shutdown.cancel();
    timeout(TIMEOUT, handle)
        .await
        .expect("subscriber ignored shutdown")
        .unwrap();
}

#[tokio::test]
async fn shutdown_interrupts_endless_connect_retries() {
    let broker = StubBroker::new();
    broker.fail_next_connects("broker-a:5672", usize::MAX);

    let gate = Gate::new(true);
    let (shutdown, handle) = spawn_subscriber(&broker, vec![endpoint("broker-a")], gate);

    tokio::time::sleep(Duration::from_millis(20)).await;
    shutdown.cancel();
    timeout(TIMEOUT, handle)
        .await
        .expect("connect retry ignored shutdown")
        .unwrap();
}
