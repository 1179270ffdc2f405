use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bon::Builder;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, instrument, trace, warn};

use super::characteristic::{CommandCharacteristic, ValueCharacteristic};
use super::service::Services;
use super::session::{Session, SessionAction, SessionState};
use super::transport::{
    Transport, TransportEvent, TransportEventReceiver, TransportEventSender, WriteMode,
};
use crate::codec::{CharacteristicValue, Compose};
use crate::error::{OperationError, SessionError, TransportError};
use crate::protocol::CharacteristicId;
use crate::utils::format_hex;

/// Tunables for one peripheral session.
#[derive(Debug, Clone, Builder)]
pub struct SessionConfig {
    /// Upper bound for each connect, disconnect, read or write call.
    operation_timeout: Option<Duration>,
    #[builder(default)]
    write_mode: WriteMode,
    #[builder(default = 64)]
    signal_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SessionConfig {
    #[must_use]
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout
    }

    #[must_use]
    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }
}

/// Observable events republished by the session.
#[derive(Debug, Clone)]
pub enum SessionSignal {
    StateChanged(SessionState),
    Ready(bool),
    ValueUpdated {
        characteristic: CharacteristicId,
        bytes: Vec<u8>,
    },
    WriteCompleted {
        characteristic: CharacteristicId,
    },
    OperationFailed(OperationError),
    SessionFailed(SessionError),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
enum PendingKind {
    Read,
    Write,
}

type PendingKey = (CharacteristicId, PendingKind);

/// Outcome delivered to a pending operation. Writes complete with an empty payload.
type Completion = Result<Vec<u8>, OperationError>;

type SessionReply = oneshot::Sender<Result<(), SessionError>>;

struct Admission {
    characteristic: CharacteristicId,
    completion: Option<(PendingKind, oneshot::Sender<Completion>)>,
    reply: oneshot::Sender<Result<u64, OperationError>>,
}

enum GateWaiter {
    Connect(SessionReply),
    Operation(Admission),
}

impl GateWaiter {
    fn reject(self, error: &SessionError) {
        match self {
            Self::Connect(reply) => {
                let _ = reply.send(Err(error.clone()));
            }
            Self::Operation(admission) => {
                let _ = admission
                    .reply
                    .send(Err(OperationError::Session(error.clone())));
            }
        }
    }
}

enum Request {
    Connect(SessionReply),
    Disconnect(SessionReply),
    Begin(Admission),
    Release { key: PendingKey, id: u64 },
}

struct PendingEntry {
    id: u64,
    completion: oneshot::Sender<Completion>,
}

/// Handle to a running peripheral session.
///
/// Cloning is cheap; every clone talks to the same session task, which is
/// the only owner of the state machine and the ready gate.
#[derive(Clone)]
pub struct Peripheral {
    transport: Arc<dyn Transport>,
    services: Arc<Services>,
    requests: mpsc::UnboundedSender<Request>,
    signals: broadcast::Sender<SessionSignal>,
    state: watch::Receiver<SessionState>,
    config: SessionConfig,
}

impl fmt::Debug for Peripheral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peripheral")
            .field("state", &*self.state.borrow())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Peripheral {
    /// Starts the session task for `transport`, consuming its event stream.
    #[must_use]
    pub fn spawn(
        transport: Arc<dyn Transport>,
        events: TransportEventReceiver,
        config: SessionConfig,
    ) -> Self {
        let services = Arc::new(Services::new());
        let session = Session::new(services.expected_services(), services.expected_notifiable());
        let (requests, request_receiver) = mpsc::unbounded_channel();
        let (feedback, feedback_receiver) = mpsc::unbounded_channel();
        let (signals, _) = broadcast::channel(config.signal_capacity.max(1));
        let (state_sender, state) = watch::channel(SessionState::Disconnected);

        let task = SessionTask {
            transport: Arc::clone(&transport),
            session,
            services: Arc::clone(&services),
            signals: signals.clone(),
            state: state_sender,
            feedback,
            gate: VecDeque::new(),
            pending: HashMap::new(),
            disconnect_waiters: Vec::new(),
            next_id: 0,
        };
        tokio::spawn(task.run(request_receiver, events, feedback_receiver));

        Self {
            transport,
            services,
            requests,
            signals,
            state,
            config,
        }
    }

    #[must_use]
    pub fn services(&self) -> &Services {
        &self.services
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Stream of session signals emitted after this call.
    #[must_use]
    pub fn signals(&self) -> BroadcastStream<SessionSignal> {
        BroadcastStream::new(self.signals.subscribe())
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionSignal> {
        self.signals.subscribe()
    }

    /// Connects and resolves once the session is ready.
    ///
    /// # Errors
    ///
    /// Returns the session failure that rejected the ready gate, or
    /// [`OperationError::TimedOut`] when an operation timeout is configured.
    #[instrument(skip(self), level = "debug")]
    pub async fn connect(&self) -> Result<(), OperationError> {
        let result = self
            .with_timeout("connect", async {
                let (reply, receiver) = oneshot::channel();
                self.send(Request::Connect(reply))?;
                receiver.await.map_err(|_| SessionError::Closed)??;
                Ok::<(), OperationError>(())
            })
            .await;
        self.report(result)
    }

    /// Tears the link down and resolves once the transport reports it gone.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session task has stopped.
    #[instrument(skip(self), level = "debug")]
    pub async fn disconnect(&self) -> Result<(), OperationError> {
        let result = self
            .with_timeout("disconnect", async {
                let (reply, receiver) = oneshot::channel();
                self.send(Request::Disconnect(reply))?;
                receiver.await.map_err(|_| SessionError::Closed)??;
                Ok::<(), OperationError>(())
            })
            .await;
        self.report(result)
    }

    /// Composes `command` and writes it once the session is ready.
    ///
    /// # Errors
    ///
    /// Returns an [`OperationError`] local to this call.
    pub async fn write<C>(
        &self,
        characteristic: &CommandCharacteristic<C>,
        command: &C,
    ) -> Result<(), OperationError>
    where
        C: Compose + Sync,
    {
        self.write_bytes(characteristic.id(), command.compose())
            .await
    }

    #[instrument(skip(self, payload), level = "debug", fields(payload = %format_hex(&payload)))]
    pub(crate) async fn write_bytes(
        &self,
        characteristic: CharacteristicId,
        payload: Vec<u8>,
    ) -> Result<(), OperationError> {
        let mode = self.config.write_mode;
        let result = self
            .with_timeout("write", async {
                let kind = match mode {
                    WriteMode::WithResponse => Some(PendingKind::Write),
                    WriteMode::WithoutResponse => None,
                };
                let ticket = self.begin(characteristic, kind).await?;
                self.transport
                    .write(characteristic, &payload, mode)
                    .await
                    .map_err(|source| OperationError::WriteFailed {
                        characteristic,
                        source,
                    })?;
                ticket.wait().await?;
                Ok::<(), OperationError>(())
            })
            .await;
        self.report(result)
    }

    /// Reads and decodes the current value once the session is ready.
    ///
    /// # Errors
    ///
    /// Returns an [`OperationError`] local to this call.
    pub async fn read<C>(&self, characteristic: &C) -> Result<C::Value, OperationError>
    where
        C: ValueCharacteristic,
    {
        let id = characteristic.id();
        let result = self
            .with_timeout("read", async {
                let ticket = self.begin(id, Some(PendingKind::Read)).await?;
                self.transport.read(id).await.map_err(|source| {
                    OperationError::CouldNotReadValue {
                        characteristic: id,
                        source,
                    }
                })?;
                let bytes = ticket.wait().await?;
                C::Value::parse(&bytes).map_err(|source| OperationError::InvalidValue {
                    characteristic: id,
                    source,
                })
            })
            .await;
        self.report(result)
    }

    /// Writes `command` and resolves with the next value the device pushes on `reply`.
    ///
    /// Bus transfers answer this way: the command goes to the control
    /// characteristic and the received bytes arrive as a notification.
    ///
    /// # Errors
    ///
    /// Returns the write failure, a decode failure of the pushed value, or the
    /// session failure that ended the wait.
    #[instrument(skip_all, level = "debug", fields(reply = %reply.id()))]
    pub async fn request<C, R>(
        &self,
        characteristic: &CommandCharacteristic<C>,
        command: &C,
        reply: &R,
    ) -> Result<R::Value, OperationError>
    where
        C: Compose + Sync,
        R: ValueCharacteristic,
    {
        let id = reply.id();
        let mut signals = self.signals.subscribe();
        self.write(characteristic, command).await?;

        let result = self
            .with_timeout("request", async {
                loop {
                    match signals.recv().await {
                        Ok(SessionSignal::ValueUpdated {
                            characteristic,
                            bytes,
                        }) if characteristic == id => {
                            return R::Value::parse(&bytes).map_err(|source| {
                                OperationError::InvalidValue {
                                    characteristic: id,
                                    source,
                                }
                            });
                        }
                        Ok(SessionSignal::SessionFailed(error)) => return Err(error.into()),
                        Ok(SessionSignal::StateChanged(
                            SessionState::Disconnecting | SessionState::Disconnected,
                        )) => {
                            return Err(SessionError::Disconnected { source: None }.into());
                        }
                        Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(SessionError::Closed.into());
                        }
                    }
                }
            })
            .await;
        self.report(result)
    }

    async fn begin(
        &self,
        characteristic: CharacteristicId,
        kind: Option<PendingKind>,
    ) -> Result<Ticket, OperationError> {
        let (reply, admitted) = oneshot::channel();
        let (completion, receiver) = match kind {
            Some(kind) => {
                let (sender, receiver) = oneshot::channel();
                (Some((kind, sender)), Some(receiver))
            }
            None => (None, None),
        };
        self.send(Request::Begin(Admission {
            characteristic,
            completion,
            reply,
        }))?;
        let id = admitted.await.map_err(|_| SessionError::Closed)??;

        Ok(Ticket {
            completion: receiver,
            _guard: kind.map(|kind| PendingGuard {
                requests: self.requests.clone(),
                key: (characteristic, kind),
                id,
            }),
        })
    }

    fn send(&self, request: Request) -> Result<(), SessionError> {
        self.requests
            .send(request)
            .map_err(|_| SessionError::Closed)
    }

    async fn with_timeout<T>(
        &self,
        operation: &'static str,
        future: impl Future<Output = Result<T, OperationError>>,
    ) -> Result<T, OperationError> {
        match self.config.operation_timeout {
            Some(timeout) => tokio::time::timeout(timeout, future)
                .await
                .map_err(|_| OperationError::TimedOut { operation, timeout })?,
            None => future.await,
        }
    }

    fn report<T>(&self, result: Result<T, OperationError>) -> Result<T, OperationError> {
        if let Err(error) = &result {
            debug!(%error, "operation failed");
            let _ = self.signals.send(SessionSignal::OperationFailed(error.clone()));
        }
        result
    }
}

/// Admission into the pending table, released when dropped.
struct Ticket {
    completion: Option<oneshot::Receiver<Completion>>,
    _guard: Option<PendingGuard>,
}

impl Ticket {
    async fn wait(self) -> Completion {
        match self.completion {
            Some(receiver) => receiver
                .await
                .map_err(|_| OperationError::from(SessionError::Closed))?,
            None => Ok(Vec::new()),
        }
    }
}

struct PendingGuard {
    requests: mpsc::UnboundedSender<Request>,
    key: PendingKey,
    id: u64,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let _ = self.requests.send(Request::Release {
            key: self.key,
            id: self.id,
        });
    }
}

/// Sole owner of the state machine, the ready gate and the pending table.
struct SessionTask {
    transport: Arc<dyn Transport>,
    session: Session,
    services: Arc<Services>,
    signals: broadcast::Sender<SessionSignal>,
    state: watch::Sender<SessionState>,
    feedback: TransportEventSender,
    gate: VecDeque<GateWaiter>,
    pending: HashMap<PendingKey, VecDeque<PendingEntry>>,
    disconnect_waiters: Vec<SessionReply>,
    next_id: u64,
}

impl SessionTask {
    async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<Request>,
        mut events: TransportEventReceiver,
        mut feedback: TransportEventReceiver,
    ) {
        loop {
            tokio::select! {
                request = requests.recv() => match request {
                    Some(request) => self.handle_request(request),
                    None => break,
                },
                Some(event) = events.recv() => self.handle_event(event),
                Some(event) = feedback.recv() => self.handle_event(event),
            }
        }
        debug!("peripheral session task stopped");
    }

    fn handle_request(&mut self, request: Request) {
        match request {
            Request::Connect(reply) => {
                let actions = self.session.request_connect();
                self.execute(actions);
                if self.session.is_ready() {
                    let _ = reply.send(Ok(()));
                } else {
                    self.gate.push_back(GateWaiter::Connect(reply));
                }
            }
            Request::Disconnect(reply) => {
                self.disconnect_waiters.push(reply);
                let actions = self.session.request_disconnect();
                self.execute(actions);
                if matches!(self.session.state(), SessionState::Disconnected) {
                    self.resolve_disconnect_waiters();
                }
            }
            Request::Begin(admission) => self.admit(admission),
            Request::Release { key, id } => {
                if let Some(queue) = self.pending.get_mut(&key) {
                    queue.retain(|entry| entry.id != id);
                }
            }
        }
    }

    fn admit(&mut self, admission: Admission) {
        if self.session.is_ready() {
            self.register(admission);
        } else if let Some(error) = self.session.state().error() {
            let error = error.clone();
            GateWaiter::Operation(admission).reject(&error);
        } else {
            trace!(characteristic = %admission.characteristic, "waiting for ready");
            self.gate.push_back(GateWaiter::Operation(admission));
        }
    }

    fn register(&mut self, admission: Admission) {
        let Admission {
            characteristic,
            completion,
            reply,
        } = admission;
        if reply.is_closed() {
            return;
        }
        if !self.session.has_characteristic(characteristic) {
            let _ = reply.send(Err(OperationError::CharacteristicNotFound { characteristic }));
            return;
        }

        self.next_id += 1;
        let id = self.next_id;
        let key = completion.map(|(kind, completion)| {
            let key = (characteristic, kind);
            self.pending
                .entry(key)
                .or_default()
                .push_back(PendingEntry { id, completion });
            key
        });
        if reply.send(Ok(id)).is_err()
            && let Some(key) = key
            && let Some(queue) = self.pending.get_mut(&key)
        {
            queue.retain(|entry| entry.id != id);
        }
    }

    fn take_pending(&mut self, key: PendingKey) -> Option<PendingEntry> {
        let queue = self.pending.get_mut(&key)?;
        while let Some(entry) = queue.pop_front() {
            if !entry.completion.is_closed() {
                return Some(entry);
            }
        }
        None
    }

    fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::ValueUpdated {
                characteristic,
                result,
            } => self.on_value_updated(characteristic, result),
            TransportEvent::WriteCompleted {
                characteristic,
                result,
            } => self.on_write_completed(characteristic, result),
            event => {
                let actions = self.session.handle(event);
                self.execute(actions);
            }
        }
    }

    fn on_value_updated(
        &mut self,
        characteristic: CharacteristicId,
        result: Result<Option<Vec<u8>>, TransportError>,
    ) {
        let waiter = self.take_pending((characteristic, PendingKind::Read));

        if let Ok(Some(bytes)) = &result {
            trace!(%characteristic, payload = %format_hex(bytes), "value updated");
            if let Err(source) = self.services.update(characteristic, bytes) {
                warn!(%characteristic, error = %source, "discarding undecodable value");
                if waiter.is_none() {
                    self.broadcast(SessionSignal::OperationFailed(
                        OperationError::InvalidValue {
                            characteristic,
                            source,
                        },
                    ));
                }
            }
            self.broadcast(SessionSignal::ValueUpdated {
                characteristic,
                bytes: bytes.clone(),
            });
        }

        let Some(waiter) = waiter else {
            return;
        };
        let completion = match result {
            Ok(Some(bytes)) => Ok(bytes),
            Ok(None) => Err(OperationError::InvalidReadValue { characteristic }),
            Err(source) => Err(OperationError::CouldNotReadValue {
                characteristic,
                source,
            }),
        };
        let _ = waiter.completion.send(completion);
    }

    fn on_write_completed(
        &mut self,
        characteristic: CharacteristicId,
        result: Result<(), TransportError>,
    ) {
        if result.is_ok() {
            self.broadcast(SessionSignal::WriteCompleted { characteristic });
        }
        let Some(waiter) = self.take_pending((characteristic, PendingKind::Write)) else {
            trace!(%characteristic, "unsolicited write completion");
            return;
        };
        let completion = result
            .map(|()| Vec::new())
            .map_err(|source| OperationError::WriteFailed {
                characteristic,
                source,
            });
        let _ = waiter.completion.send(completion);
    }

    fn execute(&mut self, actions: Vec<SessionAction>) {
        for action in actions {
            match action {
                SessionAction::Connect => self.spawn_request(
                    |transport| async move { transport.connect().await },
                    TransportEvent::ConnectionFailed,
                ),
                SessionAction::Disconnect => self.spawn_request(
                    |transport| async move { transport.disconnect().await },
                    |error| TransportEvent::Disconnected { error: Some(error) },
                ),
                SessionAction::DiscoverServices => self.spawn_request(
                    |transport| async move { transport.discover_services().await },
                    |error| TransportEvent::ServicesDiscovered(Err(error)),
                ),
                SessionAction::DiscoverCharacteristics(service) => self.spawn_request(
                    move |transport| async move {
                        transport.discover_characteristics(service).await
                    },
                    move |error| TransportEvent::CharacteristicsDiscovered {
                        service,
                        result: Err(error),
                    },
                ),
                SessionAction::EnableNotifications(characteristic) => self.spawn_request(
                    move |transport| async move {
                        transport.set_notify(characteristic, true).await
                    },
                    move |error| TransportEvent::NotificationStateUpdated {
                        characteristic,
                        result: Err(error),
                    },
                ),
                SessionAction::StateChanged(state) => {
                    self.state.send_replace(state.clone());
                    self.broadcast(SessionSignal::StateChanged(state));
                }
                SessionAction::ReadinessChanged(ready) => {
                    self.broadcast(SessionSignal::Ready(ready));
                    if ready {
                        self.open_gate();
                    }
                }
                SessionAction::Failed(error) => {
                    warn!(%error, "peripheral session failed");
                    self.reject_gate(&error);
                    self.broadcast(SessionSignal::SessionFailed(error));
                }
                SessionAction::Disconnected(source) => {
                    let error = SessionError::Disconnected { source };
                    self.reject_gate(&error);
                    self.reject_pending(&error);
                    self.resolve_disconnect_waiters();
                }
            }
        }
    }

    fn spawn_request<F, Fut>(
        &self,
        request: F,
        on_error: impl FnOnce(TransportError) -> TransportEvent + Send + 'static,
    ) where
        F: FnOnce(Arc<dyn Transport>) -> Fut,
        Fut: Future<Output = Result<(), TransportError>> + Send + 'static,
    {
        let request = request(Arc::clone(&self.transport));
        let feedback = self.feedback.clone();
        tokio::spawn(async move {
            if let Err(error) = request.await {
                debug!(%error, "transport request failed");
                let _ = feedback.send(on_error(error));
            }
        });
    }

    fn open_gate(&mut self) {
        debug!(waiters = self.gate.len(), "session ready");
        while let Some(waiter) = self.gate.pop_front() {
            match waiter {
                GateWaiter::Connect(reply) => {
                    let _ = reply.send(Ok(()));
                }
                GateWaiter::Operation(admission) => self.register(admission),
            }
        }
    }

    fn reject_gate(&mut self, error: &SessionError) {
        for waiter in self.gate.drain(..) {
            waiter.reject(error);
        }
    }

    fn reject_pending(&mut self, error: &SessionError) {
        for (_, queue) in self.pending.drain() {
            for entry in queue {
                let _ = entry
                    .completion
                    .send(Err(OperationError::Session(error.clone())));
            }
        }
    }

    fn resolve_disconnect_waiters(&mut self) {
        for reply in self.disconnect_waiters.drain(..) {
            let _ = reply.send(Ok(()));
        }
    }

    fn broadcast(&self, signal: SessionSignal) {
        let _ = self.signals.send(signal);
    }
}
