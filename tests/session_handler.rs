use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use bleio::codec::{BoundsError, GpioPin, GpioValue, GpioValues, I2cData, Level};
use bleio::{
    AckMode, CharacteristicId, FakeController, FakeDeviceConfig, FakeTransport, GpioHandler,
    I2cHandler, OperationError, Peripheral, ServiceId, SessionConfig, SessionError,
    SessionSignal, SessionState, SystemHandler, Transport, TransportError, TransportEvent,
    WriteMode,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tokio_stream::StreamExt;

fn spawn_peripheral(
    device: FakeDeviceConfig,
    session: SessionConfig,
) -> (Peripheral, FakeController) {
    let (transport, controller, events) = FakeTransport::new(device);
    let peripheral = Peripheral::spawn(Arc::new(transport), events, session);
    (peripheral, controller)
}

fn manual_ack_peripheral() -> (Peripheral, FakeController) {
    spawn_peripheral(
        FakeDeviceConfig::builder().ack_mode(AckMode::Manual).build(),
        SessionConfig::builder().build(),
    )
}

async fn wait_for_writes(controller: &FakeController, count: usize) {
    while controller.written().len() < count {
        tokio::task::yield_now().await;
    }
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

/// Fake device behind a slower link: connects after `connect_delay` and,
/// when `answer_reads` is off, accepts reads without ever answering them.
struct SlowLink {
    inner: FakeTransport,
    connect_delay: Duration,
    answer_reads: bool,
}

impl SlowLink {
    fn spawn(connect_delay: Duration, answer_reads: bool) -> (Peripheral, FakeController) {
        let (inner, controller, events) = FakeTransport::new(FakeDeviceConfig::default());
        let transport = Self {
            inner,
            connect_delay,
            answer_reads,
        };
        let peripheral =
            Peripheral::spawn(Arc::new(transport), events, SessionConfig::builder().build());
        (peripheral, controller)
    }
}

#[async_trait]
impl Transport for SlowLink {
    async fn connect(&self) -> Result<(), TransportError> {
        tokio::time::sleep(self.connect_delay).await;
        self.inner.connect().await
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.inner.disconnect().await
    }

    async fn discover_services(&self) -> Result<(), TransportError> {
        self.inner.discover_services().await
    }

    async fn discover_characteristics(&self, service: ServiceId) -> Result<(), TransportError> {
        self.inner.discover_characteristics(service).await
    }

    async fn set_notify(
        &self,
        characteristic: CharacteristicId,
        enabled: bool,
    ) -> Result<(), TransportError> {
        self.inner.set_notify(characteristic, enabled).await
    }

    async fn read(&self, characteristic: CharacteristicId) -> Result<(), TransportError> {
        if self.answer_reads {
            self.inner.read(characteristic).await
        } else {
            Ok(())
        }
    }

    async fn write(
        &self,
        characteristic: CharacteristicId,
        payload: &[u8],
        mode: WriteMode,
    ) -> Result<(), TransportError> {
        self.inner.write(characteristic, payload, mode).await
    }
}

#[tokio::test]
async fn connect_enables_every_notifiable_characteristic() -> anyhow::Result<()> {
    let (peripheral, controller) =
        spawn_peripheral(FakeDeviceConfig::default(), SessionConfig::builder().build());
    assert_matches!(peripheral.state(), SessionState::Disconnected);

    peripheral.connect().await?;

    assert!(peripheral.state().is_ready());
    for characteristic in [
        CharacteristicId::BluetoothSettings,
        CharacteristicId::GpioInput,
        CharacteristicId::AnalogInput,
        CharacteristicId::I2cData,
        CharacteristicId::SpiData,
        CharacteristicId::UartData,
    ] {
        assert!(controller.is_notifying(characteristic), "{characteristic}");
    }
    Ok(())
}

#[tokio::test]
async fn write_resolves_only_on_its_own_acknowledgement() -> anyhow::Result<()> {
    let (peripheral, controller) = manual_ack_peripheral();
    peripheral.connect().await?;

    let writer = peripheral.clone();
    let write = tokio::spawn(async move {
        GpioHandler::digital_write(&writer, GpioPin::Pin1, Level::High).await
    });
    wait_for_writes(&controller, 1).await;

    controller.complete_write(CharacteristicId::ConfigCommand, Ok(()));
    settle().await;
    assert!(!write.is_finished());

    controller.complete_write(CharacteristicId::ControlCommand, Ok(()));
    write.await??;

    let written = controller.written();
    assert_eq!(CharacteristicId::ControlCommand, written[0].characteristic);
    assert_eq!(vec![0x01, 0x11], written[0].payload);
    Ok(())
}

#[tokio::test]
async fn dropped_link_rejects_in_flight_writes() -> anyhow::Result<()> {
    let (peripheral, controller) = manual_ack_peripheral();
    peripheral.connect().await?;

    let writer = peripheral.clone();
    let write = tokio::spawn(async move {
        GpioHandler::digital_write(&writer, GpioPin::Pin0, Level::Low).await
    });
    wait_for_writes(&controller, 1).await;
    controller.disconnect(None);

    assert_matches!(
        write.await?,
        Err(OperationError::Session(SessionError::Disconnected { .. }))
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unacknowledged_write_times_out() -> anyhow::Result<()> {
    let (peripheral, _controller) = spawn_peripheral(
        FakeDeviceConfig::builder().ack_mode(AckMode::Manual).build(),
        SessionConfig::builder()
            .operation_timeout(Duration::from_secs(2))
            .build(),
    );
    peripheral.connect().await?;

    let result = GpioHandler::digital_write(&peripheral, GpioPin::Pin2, Level::High).await;

    assert_matches!(
        result,
        Err(OperationError::TimedOut {
            operation: "write",
            timeout,
        }) if timeout == Duration::from_secs(2)
    );
    Ok(())
}

#[tokio::test]
async fn missing_readable_characteristic_fails_only_its_operations() -> anyhow::Result<()> {
    let (peripheral, _controller) = spawn_peripheral(
        FakeDeviceConfig::builder()
            .missing("device_name".parse()?)
            .build(),
        SessionConfig::builder().build(),
    );
    peripheral.connect().await?;

    assert_matches!(
        SystemHandler::device_name(&peripheral).await,
        Err(OperationError::CharacteristicNotFound {
            characteristic: CharacteristicId::DeviceName
        })
    );
    let info = SystemHandler::info(&peripheral).await?;
    assert_eq!("1.4.2", info.firmware_version());
    Ok(())
}

#[tokio::test]
async fn missing_notifiable_characteristic_fails_the_session() -> anyhow::Result<()> {
    let (peripheral, _controller) = spawn_peripheral(
        FakeDeviceConfig::builder().missing("uart_data".parse()?).build(),
        SessionConfig::builder().build(),
    );

    assert_matches!(
        peripheral.connect().await,
        Err(OperationError::Session(SessionError::MissingCharacteristic {
            characteristic: CharacteristicId::UartData
        }))
    );
    assert_matches!(peripheral.state(), SessionState::Error(_));
    Ok(())
}

#[tokio::test]
async fn i2c_read_resolves_with_the_pushed_data() -> anyhow::Result<()> {
    let (peripheral, _controller) =
        spawn_peripheral(FakeDeviceConfig::default(), SessionConfig::builder().build());
    peripheral.connect().await?;

    let response = I2cHandler::read(&peripheral, 0x48, 3).await?;

    assert_eq!(
        I2cData {
            address: 0x48,
            data: vec![0x00, 0x01, 0x02],
        },
        response
    );
    Ok(())
}

#[rstest]
#[case(0x80, 1)]
#[case(0x48, 127)]
#[case(0x48, 0)]
#[tokio::test]
async fn i2c_read_rejects_out_of_range_requests(
    #[case] address: u8,
    #[case] length: u8,
) -> anyhow::Result<()> {
    let (peripheral, controller) =
        spawn_peripheral(FakeDeviceConfig::default(), SessionConfig::builder().build());
    peripheral.connect().await?;

    assert_matches!(
        I2cHandler::read(&peripheral, address, length).await,
        Err(OperationError::Bounds(
            BoundsError::InvalidSlaveAddress { .. } | BoundsError::InvalidReadLength { .. }
        ))
    );
    assert!(controller.written().is_empty());
    Ok(())
}

#[tokio::test]
async fn i2c_read_accepts_the_largest_address_and_length() -> anyhow::Result<()> {
    let (peripheral, _controller) =
        spawn_peripheral(FakeDeviceConfig::default(), SessionConfig::builder().build());
    peripheral.connect().await?;

    let response = I2cHandler::read(&peripheral, 0x7F, 126).await?;

    assert_eq!(0x7F, response.address);
    assert_eq!(126, response.data.len());
    Ok(())
}

#[tokio::test]
async fn notifications_update_the_cache_and_are_republished() -> anyhow::Result<()> {
    let (peripheral, controller) =
        spawn_peripheral(FakeDeviceConfig::default(), SessionConfig::builder().build());
    peripheral.connect().await?;
    let mut signals = peripheral.signals();

    controller.notify(CharacteristicId::AnalogInput, vec![0x01, 0x00, 0x00, 0x20, 0x0F, 0xFF]);

    let (characteristic, bytes) = loop {
        match signals.next().await {
            Some(Ok(SessionSignal::ValueUpdated {
                characteristic,
                bytes,
            })) => break (characteristic, bytes),
            Some(_) => {}
            None => anyhow::bail!("signal stream ended"),
        }
    };
    assert_eq!(CharacteristicId::AnalogInput, characteristic);
    assert_eq!(vec![0x01, 0x00, 0x00, 0x20, 0x0F, 0xFF], bytes);

    let cached = peripheral.services().control.analog_input.current();
    assert_eq!(
        Some(vec![0x0100, 0x0020, 0x0FFF]),
        cached.map(|values| bleio::codec::AnalogPin::all().map(|pin| values.value(pin)).collect())
    );
    Ok(())
}

#[tokio::test]
async fn reboot_ends_the_session() -> anyhow::Result<()> {
    let (peripheral, _controller) =
        spawn_peripheral(FakeDeviceConfig::default(), SessionConfig::builder().build());
    peripheral.connect().await?;
    let mut states = peripheral.state_changes();

    SystemHandler::reboot(&peripheral).await?;
    states
        .wait_for(|state| matches!(state, SessionState::Disconnected))
        .await?;

    assert_matches!(peripheral.state(), SessionState::Disconnected);
    Ok(())
}

#[tokio::test]
async fn operations_queued_before_ready_resolve_in_arrival_order() -> anyhow::Result<()> {
    let (peripheral, controller) = manual_ack_peripheral();

    let writer = peripheral.clone();
    let first = tokio::spawn(async move {
        GpioHandler::digital_write(&writer, GpioPin::Pin0, Level::High).await
    });
    settle().await;
    let writer = peripheral.clone();
    let second = tokio::spawn(async move {
        GpioHandler::digital_write(&writer, GpioPin::Pin1, Level::High).await
    });
    settle().await;

    assert!(controller.written().is_empty());
    assert!(!first.is_finished());
    assert!(!second.is_finished());

    peripheral.connect().await?;
    wait_for_writes(&controller, 2).await;

    controller.complete_write(CharacteristicId::ControlCommand, Ok(()));
    first.await??;
    settle().await;
    assert!(!second.is_finished());

    controller.complete_write(CharacteristicId::ControlCommand, Ok(()));
    second.await??;

    let mut payloads: Vec<_> = controller
        .written()
        .into_iter()
        .map(|written| written.payload)
        .collect();
    payloads.sort();
    assert_eq!(vec![vec![0x01, 0x01], vec![0x01, 0x11]], payloads);
    Ok(())
}

#[tokio::test]
async fn read_resolves_only_on_its_own_characteristic() -> anyhow::Result<()> {
    let (peripheral, controller) = SlowLink::spawn(Duration::ZERO, false);
    peripheral.connect().await?;

    let reader = peripheral.clone();
    let read = tokio::spawn(async move {
        reader.read(&reader.services().control.gpio_input).await
    });
    settle().await;

    controller.notify(CharacteristicId::AnalogInput, vec![0x00, 0x10, 0x00, 0x20, 0x00, 0x30]);
    settle().await;
    assert!(!read.is_finished());

    controller.inject(TransportEvent::ValueUpdated {
        characteristic: CharacteristicId::GpioInput,
        result: Ok(Some(vec![0x11, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00])),
    });

    let values = read.await??;
    assert_eq!(GpioValue::new(Level::High, true), values.value(GpioPin::Pin0));
    assert_eq!(GpioValue::new(Level::Low, true), values.value(GpioPin::Pin1));
    assert_eq!(
        GpioValues::new(std::array::from_fn(|index| match index {
            0 => GpioValue::new(Level::High, true),
            1 => GpioValue::new(Level::Low, true),
            _ => GpioValue::new(Level::Low, false),
        })),
        values
    );
    Ok(())
}

#[tokio::test]
async fn peripheral_reconnects_after_disconnect() -> anyhow::Result<()> {
    let (peripheral, controller) =
        spawn_peripheral(FakeDeviceConfig::default(), SessionConfig::builder().build());
    peripheral.connect().await?;
    assert!(controller.is_notifying(CharacteristicId::GpioInput));

    peripheral.disconnect().await?;
    assert_matches!(peripheral.state(), SessionState::Disconnected);
    assert!(!controller.is_notifying(CharacteristicId::GpioInput));

    peripheral.connect().await?;
    assert!(peripheral.state().is_ready());
    assert!(controller.is_notifying(CharacteristicId::GpioInput));

    controller.set_value(
        CharacteristicId::GpioInput,
        vec![0x10, 0x11, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
    );
    let values = peripheral.read(&peripheral.services().control.gpio_input).await?;
    assert_eq!(GpioValue::new(Level::High, true), values.value(GpioPin::Pin1));

    GpioHandler::digital_write(&peripheral, GpioPin::Pin3, Level::High).await?;
    assert_eq!(vec![0x01, 0x31], controller.written()[0].payload);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn link_completing_after_disconnect_does_not_revive_the_session() -> anyhow::Result<()> {
    let (peripheral, _controller) = SlowLink::spawn(Duration::from_millis(50), true);
    let mut signals = peripheral.subscribe();

    let connector = peripheral.clone();
    let connect = tokio::spawn(async move { connector.connect().await });
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_matches!(peripheral.state(), SessionState::Connecting);

    peripheral.disconnect().await?;
    assert_matches!(peripheral.state(), SessionState::Disconnected);
    assert_matches!(
        connect.await?,
        Err(OperationError::Session(SessionError::Disconnected { .. }))
    );

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_matches!(peripheral.state(), SessionState::Disconnected);
    while let Ok(signal) = signals.try_recv() {
        assert!(
            !matches!(
                signal,
                SessionSignal::Ready(true)
                    | SessionSignal::StateChanged(
                        SessionState::Connected | SessionState::CharacteristicsDiscovering
                    )
            ),
            "session resumed after disconnect: {signal:?}"
        );
    }
    Ok(())
}
