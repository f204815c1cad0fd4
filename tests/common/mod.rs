//! Shared utilities for supervisor integration tests.
//!
//! Provides an instrumented component factory whose backend client and
//! listeners append every lifecycle call to a shared event log, plus a
//! reporter that records crashes.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::watch;

use kafka_pixy::backend::BackendError;
use kafka_pixy::config::ServiceConfig;
use kafka_pixy::lifecycle::component::{
    crash_channel, BackendClient, ComponentFactory, CrashChannel, CrashSender, Listener,
    ListenerRole, Transport,
};
use kafka_pixy::lifecycle::CrashReporter;
use kafka_pixy::net::ListenerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    BackendCreated,
    BackendStart,
    BackendStop,
    BackendStopped,
    BackendWaitReturned,
    BackendDisposed,
    ListenerCreated(String),
    ListenerStart(String),
    ListenerStop(String),
    ListenerStopped(String),
    ListenerCrashed(String),
    ListenerClosed(String),
}

#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: &Event) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    pub fn contains(&self, event: &Event) -> bool {
        self.count(event) > 0
    }

    /// Position of the first occurrence of `event`.
    pub fn position(&self, event: &Event) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    /// Poll until `event` shows up.
    pub async fn wait_for(&self, event: Event) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while !self.contains(&event) {
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {event:?}; log: {:?}",
                self.events()
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

/// Upper bound for the random delays mock components take to stop.
#[derive(Debug, Clone, Copy)]
pub struct Jitter(pub u64);

impl Jitter {
    async fn sleep(self) {
        let ms = if self.0 == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.0)
        };
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

pub struct MockBackend {
    log: EventLog,
    jitter: Jitter,
    stopped_tx: watch::Sender<bool>,
}

#[async_trait]
impl BackendClient for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn start(&self) {
        self.log.push(Event::BackendStart);
    }

    fn stop(&self) {
        self.log.push(Event::BackendStop);
        let log = self.log.clone();
        let jitter = self.jitter;
        let stopped_tx = self.stopped_tx.clone();
        tokio::spawn(async move {
            jitter.sleep().await;
            log.push(Event::BackendStopped);
            stopped_tx.send_replace(true);
        });
    }

    async fn wait_for_stop(&self) {
        let mut rx = self.stopped_tx.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
        self.log.push(Event::BackendWaitReturned);
    }

    fn dispose(&self) {
        self.log.push(Event::BackendDisposed);
    }
}

/// Test-side handle to a mock listener's crash channel.
#[derive(Clone)]
pub struct ListenerControl {
    addr: String,
    log: EventLog,
    tx: Arc<Mutex<Option<CrashSender>>>,
}

impl ListenerControl {
    fn new(addr: &str, log: EventLog) -> Self {
        Self {
            addr: addr.to_string(),
            log,
            tx: Arc::new(Mutex::new(None)),
        }
    }

    fn take(&self) -> Option<CrashSender> {
        self.tx.lock().unwrap().take()
    }

    /// Report a crash: send the cause, then close the channel.
    pub fn crash(&self, message: &str) {
        if let Some(tx) = self.take() {
            self.log.push(Event::ListenerCrashed(self.addr.clone()));
            tx.try_send(ListenerError::Serve(io::Error::other(message.to_string())))
                .expect("crash channel has room for one value");
        }
    }

    /// Close the channel without a value, as a clean exit would.
    pub fn close(&self) {
        if self.take().is_some() {
            self.log.push(Event::ListenerClosed(self.addr.clone()));
        }
    }

    /// Finish a requested stop; a no-op if the channel already closed.
    fn finish_stop(&self) {
        if let Some(tx) = self.take() {
            self.log.push(Event::ListenerStopped(self.addr.clone()));
            drop(tx);
        }
    }
}

/// How a mock listener reacts to `stop`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnStop {
    /// Close the crash channel without a value.
    #[default]
    Close,
    /// Send a crash cause instead of closing cleanly.
    Crash,
    /// Panic inside `stop` itself.
    Panic,
}

pub struct MockListener {
    addr: String,
    transport: Transport,
    log: EventLog,
    jitter: Jitter,
    on_stop: OnStop,
    control: ListenerControl,
    _backend: Arc<dyn BackendClient>,
}

impl Listener for MockListener {
    fn transport(&self) -> Transport {
        self.transport
    }

    fn addr(&self) -> &str {
        &self.addr
    }

    fn start(&mut self) -> CrashChannel {
        let (tx, rx) = crash_channel();
        *self.control.tx.lock().unwrap() = Some(tx);
        self.log.push(Event::ListenerStart(self.addr.clone()));
        rx
    }

    fn stop(&self) {
        self.log.push(Event::ListenerStop(self.addr.clone()));
        if self.on_stop == OnStop::Panic {
            panic!("listener {} failed to stop", self.addr);
        }
        let jitter = self.jitter;
        let on_stop = self.on_stop;
        let control = self.control.clone();
        tokio::spawn(async move {
            jitter.sleep().await;
            match on_stop {
                OnStop::Crash => control.crash("failed while stopping"),
                _ => control.finish_stop(),
            }
        });
    }
}

pub struct MockFactory {
    pub log: EventLog,
    pub jitter: Jitter,
    pub fail_backend: bool,
    pub fail_listeners: HashSet<String>,
    pub stop_modes: HashMap<String, OnStop>,
    controls: Mutex<HashMap<String, ListenerControl>>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self {
            log: EventLog::default(),
            jitter: Jitter(0),
            fail_backend: false,
            fail_listeners: HashSet::new(),
            stop_modes: HashMap::new(),
            controls: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_jitter(mut self, max_ms: u64) -> Self {
        self.jitter = Jitter(max_ms);
        self
    }

    pub fn failing_backend(mut self) -> Self {
        self.fail_backend = true;
        self
    }

    pub fn failing_listener(mut self, addr: &str) -> Self {
        self.fail_listeners.insert(addr.to_string());
        self
    }

    /// Make the listener bound to `addr` react to `stop` with `on_stop`.
    pub fn on_stop(mut self, addr: &str, on_stop: OnStop) -> Self {
        self.stop_modes.insert(addr.to_string(), on_stop);
        self
    }

    /// Crash-channel control for the listener bound to `addr`.
    pub fn control(&self, addr: &str) -> ListenerControl {
        self.controls
            .lock()
            .unwrap()
            .get(addr)
            .cloned()
            .unwrap_or_else(|| panic!("no listener constructed for {addr}"))
    }
}

impl ComponentFactory for MockFactory {
    fn new_backend(&self, _broker_addrs: &[String]) -> Result<Arc<dyn BackendClient>, BackendError> {
        if self.fail_backend {
            return Err(BackendError::NoBrokers);
        }
        self.log.push(Event::BackendCreated);
        let (stopped_tx, _) = watch::channel(false);
        Ok(Arc::new(MockBackend {
            log: self.log.clone(),
            jitter: self.jitter,
            stopped_tx,
        }))
    }

    fn new_listener(
        &self,
        transport: Transport,
        addr: &str,
        backend: Arc<dyn BackendClient>,
    ) -> Result<Box<dyn Listener>, ListenerError> {
        if self.fail_listeners.contains(addr) {
            return Err(ListenerError::Bind(io::Error::new(
                io::ErrorKind::AddrInUse,
                "address in use",
            )));
        }
        self.log.push(Event::ListenerCreated(addr.to_string()));
        let control = ListenerControl::new(addr, self.log.clone());
        self.controls
            .lock()
            .unwrap()
            .insert(addr.to_string(), control.clone());
        Ok(Box::new(MockListener {
            addr: addr.to_string(),
            transport,
            log: self.log.clone(),
            jitter: self.jitter,
            on_stop: self.stop_modes.get(addr).copied().unwrap_or_default(),
            control,
            _backend: backend,
        }))
    }
}

/// Reporter that remembers every crash it is told about.
#[derive(Default)]
pub struct RecordingReporter {
    crashes: Mutex<Vec<(ListenerRole, String, String)>>,
}

impl RecordingReporter {
    /// (role, address, cause) triples in report order.
    pub fn crashes(&self) -> Vec<(ListenerRole, String, String)> {
        self.crashes.lock().unwrap().clone()
    }
}

impl CrashReporter for RecordingReporter {
    fn listener_crashed(&self, role: ListenerRole, addr: &str, cause: &ListenerError) {
        self.crashes
            .lock()
            .unwrap()
            .push((role, addr.to_string(), cause.to_string()));
    }
}

pub fn config(unix_addr: &str, tcp_addr: &str, brokers: &[&str]) -> ServiceConfig {
    ServiceConfig {
        unix_addr: unix_addr.to_string(),
        tcp_addr: tcp_addr.to_string(),
        broker_addrs: brokers.iter().map(|b| b.to_string()).collect(),
        ..ServiceConfig::default()
    }
}

/// Assert every listener in `addrs` fully stopped before the backend was
/// asked to stop, and the backend finished before waiting returned.
pub fn assert_shutdown_order(log: &EventLog, addrs: &[&str]) {
    let backend_stop = log
        .position(&Event::BackendStop)
        .unwrap_or_else(|| panic!("backend never stopped: {:?}", log.events()));

    for addr in addrs {
        let stop = log.position(&Event::ListenerStop(addr.to_string())).unwrap();
        let stopped = log.position(&Event::ListenerStopped(addr.to_string())).unwrap();
        assert!(stop < stopped, "{addr}: stop after stopped: {:?}", log.events());
        assert!(
            stopped < backend_stop,
            "{addr} still running when backend stopped: {:?}",
            log.events()
        );
    }

    let backend_stopped = log.position(&Event::BackendStopped).unwrap();
    let wait_returned = log.position(&Event::BackendWaitReturned).unwrap();
    assert!(backend_stop < backend_stopped && backend_stopped < wait_returned);
    assert_eq!(log.count(&Event::BackendStop), 1);
}

pub async fn within<F: std::future::Future>(what: &str, fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(3), fut)
        .await
        .unwrap_or_else(|_| panic!("timed out: {what}"))
}
