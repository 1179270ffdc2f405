use std::fmt;
use std::marker::PhantomData;

use tokio::sync::watch;
use tracing::trace;

use crate::codec::{CharacteristicValue, CodecError, Compose};
use crate::protocol::{CharacteristicId, CharacteristicKind, ServiceId};
use crate::utils::format_hex;

/// Common contract shared by every characteristic shape.
pub trait Characteristic: Send + Sync {
    /// Fixed identity of this characteristic.
    fn id(&self) -> CharacteristicId;

    /// Feeds raw bytes received from the peripheral.
    ///
    /// # Errors
    ///
    /// Returns the decode error when `bytes` do not parse; the held value is left unchanged.
    fn update(&self, bytes: &[u8]) -> Result<(), CodecError>;

    fn service(&self) -> ServiceId {
        self.id().service()
    }

    fn kind(&self) -> CharacteristicKind {
        self.id().kind()
    }
}

/// A characteristic whose held value can be pulled with a read.
pub trait ValueCharacteristic: Characteristic {
    type Value: CharacteristicValue + Clone + Send + Sync + 'static;

    /// Most recently decoded value, if any.
    fn current(&self) -> Option<Self::Value>;
}

/// Write-only characteristic accepting one command union.
pub struct CommandCharacteristic<C> {
    id: CharacteristicId,
    command: PhantomData<fn(&C)>,
}

impl<C: Compose> CommandCharacteristic<C> {
    pub(crate) fn new(id: CharacteristicId) -> Self {
        Self {
            id,
            command: PhantomData,
        }
    }

    #[must_use]
    pub fn id(&self) -> CharacteristicId {
        self.id
    }
}

impl<C> fmt::Debug for CommandCharacteristic<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandCharacteristic")
            .field("id", &self.id)
            .finish()
    }
}

impl<C: Compose> Characteristic for CommandCharacteristic<C> {
    fn id(&self) -> CharacteristicId {
        self.id
    }

    fn update(&self, bytes: &[u8]) -> Result<(), CodecError> {
        trace!(characteristic = %self.id, payload = %format_hex(bytes), "ignoring value for command characteristic");
        Ok(())
    }
}

/// Characteristic holding the last successfully decoded value in an observable slot.
pub struct ReadableCharacteristic<V> {
    id: CharacteristicId,
    value: watch::Sender<Option<V>>,
}

impl<V> ReadableCharacteristic<V>
where
    V: CharacteristicValue + Clone + Send + Sync + 'static,
{
    pub(crate) fn new(id: CharacteristicId) -> Self {
        let (value, _) = watch::channel(None);
        Self { id, value }
    }

    #[must_use]
    pub fn id(&self) -> CharacteristicId {
        self.id
    }

    /// Returns a receiver that observes every successfully decoded value.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<V>> {
        self.value.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> Option<V> {
        self.value.borrow().clone()
    }

    fn store(&self, bytes: &[u8]) -> Result<(), CodecError> {
        let value = V::parse(bytes)?;
        self.value.send_replace(Some(value));
        Ok(())
    }
}

impl<V> fmt::Debug for ReadableCharacteristic<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadableCharacteristic")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl<V> Characteristic for ReadableCharacteristic<V>
where
    V: CharacteristicValue + Clone + Send + Sync + 'static,
{
    fn id(&self) -> CharacteristicId {
        self.id
    }

    fn update(&self, bytes: &[u8]) -> Result<(), CodecError> {
        self.store(bytes)
    }
}

impl<V> ValueCharacteristic for ReadableCharacteristic<V>
where
    V: CharacteristicValue + Clone + Send + Sync + 'static,
{
    type Value = V;

    fn current(&self) -> Option<V> {
        Self::current(self)
    }
}

/// Readable characteristic that the peripheral also pushes through notifications.
pub struct NotifiableCharacteristic<V> {
    inner: ReadableCharacteristic<V>,
}

impl<V> NotifiableCharacteristic<V>
where
    V: CharacteristicValue + Clone + Send + Sync + 'static,
{
    pub(crate) fn new(id: CharacteristicId) -> Self {
        Self {
            inner: ReadableCharacteristic::new(id),
        }
    }

    #[must_use]
    pub fn id(&self) -> CharacteristicId {
        self.inner.id
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<V>> {
        self.inner.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> Option<V> {
        self.inner.current()
    }
}

impl<V> fmt::Debug for NotifiableCharacteristic<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifiableCharacteristic")
            .field("id", &self.inner.id)
            .finish_non_exhaustive()
    }
}

impl<V> Characteristic for NotifiableCharacteristic<V>
where
    V: CharacteristicValue + Clone + Send + Sync + 'static,
{
    fn id(&self) -> CharacteristicId {
        self.inner.id
    }

    fn update(&self, bytes: &[u8]) -> Result<(), CodecError> {
        self.inner.store(bytes)
    }
}

impl<V> ValueCharacteristic for NotifiableCharacteristic<V>
where
    V: CharacteristicValue + Clone + Send + Sync + 'static,
{
    type Value = V;

    fn current(&self) -> Option<V> {
        self.inner.current()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::codec::{BluetoothSettings, GpioPin, GpioValues, Level, TxPower};

    #[test]
    fn failed_update_keeps_previous_value() {
        let characteristic =
            ReadableCharacteristic::<BluetoothSettings>::new(CharacteristicId::BluetoothSettings);
        assert_eq!(None, characteristic.current());

        characteristic
            .update(&[0x05, 0x00, 0x64])
            .expect("valid settings should decode");
        let stored = Some(BluetoothSettings::new(TxPower::ZeroDbm, 100));
        assert_eq!(stored, characteristic.current());

        assert_matches!(
            characteristic.update(&[0x09, 0x00, 0x64]),
            Err(CodecError::InvalidTxPower { value: 9 })
        );
        assert_matches!(
            characteristic.update(&[0x05]),
            Err(CodecError::InvalidByteSize { .. })
        );
        assert_eq!(stored, characteristic.current());
    }

    #[tokio::test]
    async fn notifiable_publishes_to_observers() {
        let characteristic =
            NotifiableCharacteristic::<GpioValues>::new(CharacteristicId::GpioInput);
        let mut observer = characteristic.subscribe();

        characteristic
            .update(&[0x11, 0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x10])
            .expect("eight-byte input should decode");

        observer
            .changed()
            .await
            .expect("characteristic should still be alive");
        let values = observer
            .borrow_and_update()
            .clone()
            .expect("observer should see the decoded value");
        assert_eq!(Level::High, values.value(GpioPin::Pin0).level);
        assert_eq!(CharacteristicKind::Notifiable, characteristic.kind());
    }

    #[test]
    fn command_characteristic_has_no_value() {
        let characteristic = CommandCharacteristic::<crate::codec::ControlCommand>::new(
            CharacteristicId::ControlCommand,
        );
        assert!(characteristic.update(&[0x01, 0x11]).is_ok());
        assert_eq!(ServiceId::Control, characteristic.service());
    }
}
