use std::collections::HashSet;

use strum::IntoEnumIterator;
use strum_macros::Display;
use tracing::{debug, instrument, trace};

use super::transport::TransportEvent;
use crate::error::{SessionError, TransportError};
use crate::protocol::{CharacteristicId, ServiceId};

/// Lifecycle of one peripheral session.
#[derive(Debug, Clone, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    CharacteristicsDiscovering,
    CharacteristicsDiscovered,
    CharacteristicsConfiguring,
    Ready,
    Disconnecting,
    Error(SessionError),
}

impl SessionState {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    #[must_use]
    pub fn error(&self) -> Option<&SessionError> {
        match self {
            Self::Error(error) => Some(error),
            _ => None,
        }
    }
}

/// Side effects requested by the state machine, executed by the session task.
#[derive(Debug, Clone)]
pub(crate) enum SessionAction {
    Connect,
    Disconnect,
    DiscoverServices,
    DiscoverCharacteristics(ServiceId),
    EnableNotifications(CharacteristicId),
    StateChanged(SessionState),
    ReadinessChanged(bool),
    Failed(SessionError),
    Disconnected(Option<TransportError>),
}

/// The three independent readiness flags.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct Readiness {
    pub connected: bool,
    pub discovered: bool,
    pub configured: bool,
}

impl Readiness {
    #[must_use]
    pub fn is_ready(self) -> bool {
        self.connected && self.discovered && self.configured
    }
}

/// Event-driven discovery and configuration sequence for one peripheral.
///
/// The machine performs no I/O. Each call returns the actions the owner must
/// carry out, in order. Accumulators are only touched by [`Session::handle`]
/// and the two explicit requests.
#[derive(Debug)]
pub(crate) struct Session {
    state: SessionState,
    readiness: Readiness,
    expected_services: HashSet<ServiceId>,
    expected_notifiable: HashSet<CharacteristicId>,
    discovered_services: HashSet<ServiceId>,
    available_characteristics: HashSet<CharacteristicId>,
    configured_characteristics: HashSet<CharacteristicId>,
    last_ready: bool,
}

impl Session {
    pub(crate) fn new(
        expected_services: HashSet<ServiceId>,
        expected_notifiable: HashSet<CharacteristicId>,
    ) -> Self {
        Self {
            state: SessionState::Disconnected,
            readiness: Readiness::default(),
            expected_services,
            expected_notifiable,
            discovered_services: HashSet::new(),
            available_characteristics: HashSet::new(),
            configured_characteristics: HashSet::new(),
            last_ready: false,
        }
    }

    pub(crate) fn state(&self) -> &SessionState {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn readiness(&self) -> Readiness {
        self.readiness
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    #[cfg(test)]
    pub(crate) fn discovered_service_count(&self) -> usize {
        self.discovered_services.len()
    }

    #[cfg(test)]
    pub(crate) fn configured_count(&self) -> usize {
        self.configured_characteristics.len()
    }

    /// Whether discovery reported `characteristic` on the connected peripheral.
    pub(crate) fn has_characteristic(&self, characteristic: CharacteristicId) -> bool {
        self.available_characteristics.contains(&characteristic)
    }

    /// Starts a fresh connection cycle. Ignored while a cycle is already underway.
    pub(crate) fn request_connect(&mut self) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        if !matches!(self.state, SessionState::Disconnected | SessionState::Error(_)) {
            trace!(state = %self.state, "connect already in progress");
            return actions;
        }
        self.reset();
        self.transition(SessionState::Connecting, &mut actions);
        actions.push(SessionAction::Connect);
        actions
    }

    pub(crate) fn request_disconnect(&mut self) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        match self.state {
            SessionState::Disconnected | SessionState::Disconnecting => {}
            SessionState::Error(_) if !self.readiness.connected => {
                self.reset();
                self.transition(SessionState::Disconnected, &mut actions);
                actions.push(SessionAction::Disconnected(None));
            }
            _ => {
                self.transition(SessionState::Disconnecting, &mut actions);
                actions.push(SessionAction::Disconnect);
            }
        }
        self.evaluate_readiness(&mut actions);
        actions
    }

    /// Feeds one transport event and returns the resulting actions.
    ///
    /// Value updates and write completions carry no sequencing meaning and
    /// produce no actions here.
    #[instrument(skip(self), level = "debug", fields(state = %self.state))]
    pub(crate) fn handle(&mut self, event: TransportEvent) -> Vec<SessionAction> {
        let mut actions = Vec::new();

        if matches!(self.state, SessionState::Error(_)) {
            if let TransportEvent::Disconnected { error } = event {
                self.reset();
                actions.push(SessionAction::Disconnected(error));
            } else {
                trace!("session is in its error state; event ignored");
            }
            return actions;
        }

        match event {
            TransportEvent::Connected => self.on_connected(&mut actions),
            TransportEvent::ConnectionFailed(error) => {
                if matches!(self.state, SessionState::Connecting) {
                    self.fail(SessionError::ConnectionFailed(error), &mut actions);
                } else {
                    trace!(%error, "stale connection failure");
                }
            }
            TransportEvent::ServicesDiscovered(result) => {
                self.on_services_discovered(result, &mut actions);
            }
            TransportEvent::CharacteristicsDiscovered { service, result } => {
                self.on_characteristics_discovered(service, result, &mut actions);
            }
            TransportEvent::NotificationStateUpdated {
                characteristic,
                result,
            } => self.on_notification_state(characteristic, result, &mut actions),
            TransportEvent::ServicesInvalidated => self.on_services_invalidated(&mut actions),
            TransportEvent::Disconnected { error } => self.on_disconnected(error, &mut actions),
            TransportEvent::ValueUpdated { .. } | TransportEvent::WriteCompleted { .. } => {}
        }

        self.evaluate_readiness(&mut actions);
        actions
    }

    fn on_connected(&mut self, actions: &mut Vec<SessionAction>) {
        match self.state {
            SessionState::Connecting => {}
            SessionState::Disconnected => {
                debug!("link came up after the session was torn down; dropping it");
                actions.push(SessionAction::Disconnect);
                return;
            }
            _ => {
                trace!("unsolicited connected event");
                return;
            }
        }
        self.reset();
        self.readiness.connected = true;
        self.transition(SessionState::Connected, actions);
        actions.push(SessionAction::DiscoverServices);
    }

    fn on_services_discovered(
        &mut self,
        result: Result<Vec<ServiceId>, TransportError>,
        actions: &mut Vec<SessionAction>,
    ) {
        if !matches!(self.state, SessionState::Connected) {
            trace!("stale service discovery result");
            return;
        }
        let services = match result {
            Ok(services) => services,
            Err(error) => {
                self.fail(SessionError::ServiceDiscoveryFailed(error), actions);
                return;
            }
        };

        let found: HashSet<ServiceId> = services.into_iter().collect();
        let missing = self.expected_service_order().find(|id| !found.contains(id));
        if let Some(service) = missing {
            self.fail(SessionError::MissingService { service }, actions);
            return;
        }

        self.transition(SessionState::CharacteristicsDiscovering, actions);
        let requests: Vec<_> = self
            .expected_service_order()
            .map(SessionAction::DiscoverCharacteristics)
            .collect();
        actions.extend(requests);
    }

    fn on_characteristics_discovered(
        &mut self,
        service: ServiceId,
        result: Result<Vec<CharacteristicId>, TransportError>,
        actions: &mut Vec<SessionAction>,
    ) {
        if !matches!(self.state, SessionState::CharacteristicsDiscovering) {
            trace!(%service, "stale characteristic discovery result");
            return;
        }
        let characteristics = match result {
            Ok(characteristics) => characteristics,
            Err(source) => {
                self.fail(
                    SessionError::CharacteristicDiscoveryFailed { service, source },
                    actions,
                );
                return;
            }
        };
        if !self.expected_services.contains(&service) {
            return;
        }

        self.available_characteristics.extend(
            characteristics
                .into_iter()
                .filter(|characteristic| characteristic.service() == service),
        );
        let missing = self.expected_notifiable_order().find(|characteristic| {
            characteristic.service() == service
                && !self.available_characteristics.contains(characteristic)
        });
        if let Some(characteristic) = missing {
            self.fail(SessionError::MissingCharacteristic { characteristic }, actions);
            return;
        }

        self.discovered_services.insert(service);
        debug!(
            discovered = self.discovered_services.len(),
            expected = self.expected_services.len(),
            "characteristics discovered"
        );
        if self.discovered_services.len() < self.expected_services.len() {
            return;
        }

        self.readiness.discovered = true;
        self.transition(SessionState::CharacteristicsDiscovered, actions);
        if self.expected_notifiable.is_empty() {
            self.readiness.configured = true;
            return;
        }
        self.transition(SessionState::CharacteristicsConfiguring, actions);
        let requests: Vec<_> = self
            .expected_notifiable_order()
            .map(SessionAction::EnableNotifications)
            .collect();
        actions.extend(requests);
    }

    fn on_notification_state(
        &mut self,
        characteristic: CharacteristicId,
        result: Result<(), TransportError>,
        actions: &mut Vec<SessionAction>,
    ) {
        if !matches!(self.state, SessionState::CharacteristicsConfiguring) {
            trace!(%characteristic, "stale notification state");
            return;
        }
        if let Err(source) = result {
            self.fail(
                SessionError::NotificationConfigurationFailed {
                    characteristic,
                    source,
                },
                actions,
            );
            return;
        }
        if !self.expected_notifiable.contains(&characteristic) {
            return;
        }

        self.configured_characteristics.insert(characteristic);
        if self.configured_characteristics.len() == self.expected_notifiable.len() {
            self.readiness.configured = true;
        }
    }

    fn on_services_invalidated(&mut self, actions: &mut Vec<SessionAction>) {
        if !self.readiness.connected || matches!(self.state, SessionState::Disconnecting) {
            return;
        }
        self.clear_discovery();
        self.transition(SessionState::Connected, actions);
        actions.push(SessionAction::DiscoverServices);
    }

    fn on_disconnected(&mut self, error: Option<TransportError>, actions: &mut Vec<SessionAction>) {
        let previous = self.state.clone();
        self.reset();

        match (previous, error) {
            (SessionState::Disconnected, _) => {}
            (SessionState::Disconnecting, error) | (_, error @ None) => {
                self.transition(SessionState::Disconnected, actions);
                actions.push(SessionAction::Disconnected(error));
            }
            (_, Some(error)) => {
                self.fail(
                    SessionError::Disconnected {
                        source: Some(error.clone()),
                    },
                    actions,
                );
                actions.push(SessionAction::Disconnected(Some(error)));
            }
        }
    }

    fn fail(&mut self, error: SessionError, actions: &mut Vec<SessionAction>) {
        debug!(%error, "session failed");
        self.transition(SessionState::Error(error.clone()), actions);
        actions.push(SessionAction::Failed(error));
    }

    fn transition(&mut self, state: SessionState, actions: &mut Vec<SessionAction>) {
        debug!(from = %self.state, to = %state, "session state changed");
        self.state = state.clone();
        actions.push(SessionAction::StateChanged(state));
    }

    /// Enters `Ready` once all three flags hold and reports edges of readiness once each.
    fn evaluate_readiness(&mut self, actions: &mut Vec<SessionAction>) {
        let entering = self.readiness.is_ready()
            && matches!(
                self.state,
                SessionState::CharacteristicsDiscovered | SessionState::CharacteristicsConfiguring
            );
        if entering {
            self.transition(SessionState::Ready, actions);
        }

        let ready = self.state.is_ready();
        if ready != self.last_ready {
            self.last_ready = ready;
            actions.push(SessionAction::ReadinessChanged(ready));
        }
    }

    fn clear_discovery(&mut self) {
        self.readiness.discovered = false;
        self.readiness.configured = false;
        self.discovered_services.clear();
        self.available_characteristics.clear();
        self.configured_characteristics.clear();
    }

    fn reset(&mut self) {
        self.clear_discovery();
        self.readiness.connected = false;
    }

    fn expected_service_order(&self) -> impl Iterator<Item = ServiceId> + '_ {
        ServiceId::iter().filter(|id| self.expected_services.contains(id))
    }

    fn expected_notifiable_order(&self) -> impl Iterator<Item = CharacteristicId> + '_ {
        CharacteristicId::iter().filter(|id| self.expected_notifiable.contains(id))
    }
}
