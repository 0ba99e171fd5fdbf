//! Connection and discovery state machine for the central role.
//!
//! Each platform delegate callback maps to one event method, keyed off
//! the current phase. The machine tracks at most one peer at a time, fans
//! discovery out across every matching service instance rather than
//! short-circuiting on the first, and after any failure or disconnect
//! runs its cleanup policy and returns to scanning. There are no timeouts
//! and no retry budget: a stalled step waits for its callback forever,
//! and a permanently failing peer loops scan/connect/fail.

use tracing::{debug, info, warn};

use crate::core::config::TransferConfig;
use crate::core::error::TransportError;
use crate::core::traits::{
    CentralRadio, CharacteristicHandle, CharacteristicInfo, DeviceId, ServiceHandle,
};
use crate::transfer::receiver::{ReceiveOutcome, TransferReceiver};

/// Phase of the central link state machine.
///
/// Apart from `PoweredOff`, every phase waits on exactly one transport
/// callback; the scanning/streaming cycle loops for the lifetime of the
/// central.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPhase {
    /// Adapter not ready yet.
    PoweredOff,
    /// Scanning for the transfer service.
    Scanning,
    /// Connect requested, waiting for the result.
    Connecting,
    /// Connected; service discovery in flight.
    DiscoveringServices,
    /// Characteristic discovery in flight.
    DiscoveringCharacteristics,
    /// Subscription requested on the transfer characteristic.
    Subscribing,
    /// Subscribed; chunks are streaming in.
    Streaming,
    /// Unsubscribed (or revoked); waiting for the disconnect
    /// confirmation.
    Disconnecting,
}

/// Central role: scans, connects, subscribes, and reassembles messages.
///
/// Event methods correspond one-to-one to the platform's callbacks and
/// must be invoked serially on a single execution context. A completed
/// message is returned from [`on_value_updated`](Self::on_value_updated).
#[derive(Debug)]
pub struct TransferCentral {
    config: TransferConfig,
    phase: LinkPhase,
    /// The one tracked peer; present from connect initiation to
    /// disconnect confirmation.
    device: Option<DeviceId>,
    characteristic: Option<CharacteristicHandle>,
    subscribed: bool,
    receiver: TransferReceiver,
}

impl TransferCentral {
    /// Create a central in the powered-off phase.
    pub fn new(config: TransferConfig) -> Self {
        Self {
            config,
            phase: LinkPhase::PoweredOff,
            device: None,
            characteristic: None,
            subscribed: false,
            receiver: TransferReceiver::new(),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> LinkPhase {
        self.phase
    }

    /// The device currently being connected to or streamed from.
    pub fn tracked_device(&self) -> Option<DeviceId> {
        self.device
    }

    /// Whether a notification subscription is active.
    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// The adapter became ready: start scanning.
    pub fn on_adapter_ready<R: CentralRadio>(&mut self, radio: &mut R) {
        if self.phase != LinkPhase::PoweredOff {
            return;
        }
        info!("adapter ready, scanning for {}", self.config.service_uuid);
        self.phase = LinkPhase::Scanning;
        radio.start_scan(self.config.service_uuid, true);
    }

    /// A device advertising the transfer service was discovered.
    ///
    /// Repeated advertisements are expected (duplicates are allowed so
    /// discovery keeps refreshing); only the first sighting while no peer
    /// is tracked starts a connection.
    pub fn on_device_discovered<R: CentralRadio>(
        &mut self,
        radio: &mut R,
        device: DeviceId,
        rssi: i16,
    ) {
        if self.phase == LinkPhase::PoweredOff {
            return;
        }
        if let Some(min) = self.config.min_rssi {
            if rssi < min {
                debug!("ignoring {}: rssi {} below threshold {}", device, rssi, min);
                return;
            }
        }
        if self.device.is_some() {
            // Already working on a peer; later sightings of any device
            // are ignored until that link is torn down.
            return;
        }

        info!("discovered {} at {} dBm, connecting", device, rssi);
        self.device = Some(device);
        radio.stop_scan();
        radio.connect(device);
        self.phase = LinkPhase::Connecting;
    }

    /// The connection attempt succeeded.
    pub fn on_connected<R: CentralRadio>(&mut self, radio: &mut R, device: DeviceId) {
        if self.device != Some(device) || self.phase != LinkPhase::Connecting {
            return;
        }
        info!("connected to {}", device);

        // Drop anything accumulated on a previous link.
        self.receiver.reset();

        radio.discover_services(device, self.config.service_uuid);
        self.phase = LinkPhase::DiscoveringServices;
    }

    /// The connection attempt failed.
    pub fn on_connect_failed<R: CentralRadio>(
        &mut self,
        radio: &mut R,
        device: DeviceId,
        error: TransportError,
    ) {
        warn!("failed to connect to {}: {}", device, error);
        if self.device != Some(device) {
            return;
        }
        self.fail(radio);
    }

    /// Service discovery completed (or failed).
    pub fn on_services_discovered<R: CentralRadio>(
        &mut self,
        radio: &mut R,
        device: DeviceId,
        services: &[ServiceHandle],
        error: Option<TransportError>,
    ) {
        if self.device != Some(device) || self.phase != LinkPhase::DiscoveringServices {
            return;
        }
        if let Some(error) = error {
            warn!("service discovery on {} failed: {}", device, error);
            self.fail(radio);
            return;
        }
        if services.is_empty() {
            debug!("no transfer service on {}", device);
            return;
        }

        // More than one matching instance is possible; discover on all of
        // them rather than picking the first.
        for service in services {
            radio.discover_characteristics(device, *service, self.config.characteristic_uuid);
        }
        self.phase = LinkPhase::DiscoveringCharacteristics;
    }

    /// Characteristic discovery on one service completed (or failed).
    pub fn on_characteristics_discovered<R: CentralRadio>(
        &mut self,
        radio: &mut R,
        device: DeviceId,
        service: ServiceHandle,
        characteristics: &[CharacteristicInfo],
        error: Option<TransportError>,
    ) {
        if self.device != Some(device) || self.phase != LinkPhase::DiscoveringCharacteristics {
            return;
        }
        if let Some(error) = error {
            warn!("characteristic discovery on {} failed: {}", device, error);
            self.fail(radio);
            return;
        }
        debug!(
            "service {:?} on {} reported {} characteristic(s)",
            service,
            device,
            characteristics.len()
        );

        for info in characteristics {
            if info.uuid == self.config.characteristic_uuid {
                self.characteristic = Some(info.handle);
                radio.set_notify(device, info.handle, true);
                self.phase = LinkPhase::Subscribing;
            }
        }
    }

    /// A characteristic value (or an error in its place) arrived.
    ///
    /// Returns the completed message once the terminator has been seen;
    /// the link then unsubscribes, and the notify-state callback drives
    /// the disconnect.
    pub fn on_value_updated<R: CentralRadio>(
        &mut self,
        radio: &mut R,
        characteristic: CharacteristicHandle,
        value: Result<&[u8], TransportError>,
    ) -> Option<String> {
        if Some(characteristic) != self.characteristic {
            return None;
        }
        if !matches!(self.phase, LinkPhase::Subscribing | LinkPhase::Streaming) {
            return None;
        }

        let chunk = match value {
            Ok(chunk) => chunk,
            Err(error) => {
                // Abandon this message without emitting a partial result;
                // the buffer is dropped when the next connection starts.
                warn!("value update failed: {}", error);
                return None;
            }
        };

        match self.receiver.on_chunk(chunk) {
            ReceiveOutcome::Completed(text) => {
                info!("message complete ({} bytes)", text.len());
                if let Some(device) = self.device {
                    radio.set_notify(device, characteristic, false);
                }
                Some(text)
            }
            ReceiveOutcome::Failed(error) => {
                warn!("dropping message: {}", error);
                None
            }
            ReceiveOutcome::Accumulated { .. } | ReceiveOutcome::Ignored => None,
        }
    }

    /// The subscription state of the transfer characteristic changed.
    ///
    /// `notifying == false` covers both our own unsubscribe after a
    /// completed message and a revocation by the peer; either way the
    /// link comes down.
    pub fn on_notify_state_changed<R: CentralRadio>(
        &mut self,
        radio: &mut R,
        characteristic: CharacteristicHandle,
        notifying: bool,
        error: Option<TransportError>,
    ) {
        if Some(characteristic) != self.characteristic {
            return;
        }
        if let Some(error) = error {
            warn!("notify state change failed: {}", error);
            self.fail(radio);
            return;
        }

        if notifying {
            info!("notification began");
            self.subscribed = true;
            if self.phase == LinkPhase::Subscribing {
                self.phase = LinkPhase::Streaming;
            }
        } else {
            info!("notification stopped, disconnecting");
            self.subscribed = false;
            if let Some(device) = self.device {
                radio.disconnect(device);
                self.phase = LinkPhase::Disconnecting;
            }
        }
    }

    /// The link to the tracked device dropped, for any reason.
    pub fn on_disconnected<R: CentralRadio>(
        &mut self,
        radio: &mut R,
        device: DeviceId,
        error: Option<TransportError>,
    ) {
        if self.device != Some(device) {
            return;
        }
        match error {
            Some(error) => warn!("{} disconnected: {}", device, error),
            None => info!("{} disconnected", device),
        }
        self.resume_scan(radio);
    }

    /// Whether the tracked device has reported a successful connection.
    fn is_connected(&self) -> bool {
        matches!(
            self.phase,
            LinkPhase::DiscoveringServices
                | LinkPhase::DiscoveringCharacteristics
                | LinkPhase::Subscribing
                | LinkPhase::Streaming
        )
    }

    /// Cleanup policy for any failure: unsubscribe first if a
    /// subscription is active (its confirmation drives the disconnect),
    /// disconnect directly if merely connected, and rescan straight away
    /// if the link never came up.
    fn fail<R: CentralRadio>(&mut self, radio: &mut R) {
        let Some(device) = self.device else {
            self.resume_scan(radio);
            return;
        };
        if !self.is_connected() {
            self.resume_scan(radio);
            return;
        }

        match self.characteristic {
            Some(characteristic) if self.subscribed => {
                radio.set_notify(device, characteristic, false);
                self.phase = LinkPhase::Disconnecting;
            }
            _ => {
                radio.disconnect(device);
                self.phase = LinkPhase::Disconnecting;
            }
        }
    }

    /// Forget the tracked device and go back to scanning.
    fn resume_scan<R: CentralRadio>(&mut self, radio: &mut R) {
        self.device = None;
        self.characteristic = None;
        self.subscribed = false;
        self.phase = LinkPhase::Scanning;
        radio.start_scan(self.config.service_uuid, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const DEVICE_A: DeviceId = DeviceId::new(0xA);
    const DEVICE_B: DeviceId = DeviceId::new(0xB);
    const SERVICE: ServiceHandle = ServiceHandle::new(1);
    const SERVICE_ALT: ServiceHandle = ServiceHandle::new(2);
    const CHR: CharacteristicHandle = CharacteristicHandle::new(10);
    const CHR_OTHER: CharacteristicHandle = CharacteristicHandle::new(11);

    /// Records every request the link issues to the platform.
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Command {
        StartScan { service: Uuid, allow_duplicates: bool },
        StopScan,
        Connect(DeviceId),
        Disconnect(DeviceId),
        DiscoverServices { device: DeviceId, service: Uuid },
        DiscoverCharacteristics { service: ServiceHandle, characteristic: Uuid },
        SetNotify { characteristic: CharacteristicHandle, enabled: bool },
    }

    #[derive(Default)]
    struct MockRadio {
        commands: Vec<Command>,
    }

    impl CentralRadio for MockRadio {
        fn start_scan(&mut self, service: Uuid, allow_duplicates: bool) {
            self.commands.push(Command::StartScan { service, allow_duplicates });
        }

        fn stop_scan(&mut self) {
            self.commands.push(Command::StopScan);
        }

        fn connect(&mut self, device: DeviceId) {
            self.commands.push(Command::Connect(device));
        }

        fn disconnect(&mut self, device: DeviceId) {
            self.commands.push(Command::Disconnect(device));
        }

        fn discover_services(&mut self, device: DeviceId, service: Uuid) {
            self.commands.push(Command::DiscoverServices { device, service });
        }

        fn discover_characteristics(
            &mut self,
            _device: DeviceId,
            service: ServiceHandle,
            characteristic: Uuid,
        ) {
            self.commands.push(Command::DiscoverCharacteristics { service, characteristic });
        }

        fn set_notify(
            &mut self,
            _device: DeviceId,
            characteristic: CharacteristicHandle,
            enabled: bool,
        ) {
            self.commands.push(Command::SetNotify { characteristic, enabled });
        }
    }

    fn config() -> TransferConfig {
        TransferConfig::default()
    }

    fn transfer_characteristic() -> CharacteristicInfo {
        CharacteristicInfo {
            handle: CHR,
            uuid: config().characteristic_uuid,
        }
    }

    /// Drive a fresh central up to the streaming phase.
    fn streaming_central(radio: &mut MockRadio) -> TransferCentral {
        let mut central = TransferCentral::new(config());
        central.on_adapter_ready(radio);
        central.on_device_discovered(radio, DEVICE_A, -40);
        central.on_connected(radio, DEVICE_A);
        central.on_services_discovered(radio, DEVICE_A, &[SERVICE], None);
        central.on_characteristics_discovered(
            radio,
            DEVICE_A,
            SERVICE,
            &[transfer_characteristic()],
            None,
        );
        central.on_notify_state_changed(radio, CHR, true, None);
        assert_eq!(central.phase(), LinkPhase::Streaming);
        central
    }

    mod discovery {
        use super::*;

        #[test]
        fn test_powers_on_into_scanning() {
            let mut radio = MockRadio::default();
            let mut central = TransferCentral::new(config());

            central.on_adapter_ready(&mut radio);

            assert_eq!(central.phase(), LinkPhase::Scanning);
            assert_eq!(
                radio.commands,
                vec![Command::StartScan {
                    service: config().service_uuid,
                    allow_duplicates: true,
                }]
            );
        }

        #[test]
        fn test_discovery_stops_scan_and_connects() {
            let mut radio = MockRadio::default();
            let mut central = TransferCentral::new(config());
            central.on_adapter_ready(&mut radio);

            central.on_device_discovered(&mut radio, DEVICE_A, -40);

            assert_eq!(central.phase(), LinkPhase::Connecting);
            assert_eq!(central.tracked_device(), Some(DEVICE_A));
            assert_eq!(radio.commands[1..], [Command::StopScan, Command::Connect(DEVICE_A)]);
        }

        #[test]
        fn test_second_device_ignored_while_connecting() {
            let mut radio = MockRadio::default();
            let mut central = TransferCentral::new(config());
            central.on_adapter_ready(&mut radio);
            central.on_device_discovered(&mut radio, DEVICE_A, -40);

            central.on_device_discovered(&mut radio, DEVICE_B, -30);

            assert_eq!(central.tracked_device(), Some(DEVICE_A));
            assert!(!radio.commands.contains(&Command::Connect(DEVICE_B)));
        }

        #[test]
        fn test_duplicate_advertisement_of_tracked_device_ignored() {
            let mut radio = MockRadio::default();
            let mut central = TransferCentral::new(config());
            central.on_adapter_ready(&mut radio);
            central.on_device_discovered(&mut radio, DEVICE_A, -40);
            let issued = radio.commands.len();

            central.on_device_discovered(&mut radio, DEVICE_A, -40);

            assert_eq!(radio.commands.len(), issued);
        }

        #[test]
        fn test_weak_advertisement_filtered() {
            let mut radio = MockRadio::default();
            let mut central = TransferCentral::new(config().with_min_rssi(-35));
            central.on_adapter_ready(&mut radio);

            central.on_device_discovered(&mut radio, DEVICE_A, -60);
            assert_eq!(central.phase(), LinkPhase::Scanning);

            central.on_device_discovered(&mut radio, DEVICE_A, -30);
            assert_eq!(central.phase(), LinkPhase::Connecting);
        }

        #[test]
        fn test_discovery_fans_out_over_all_service_instances() {
            let mut radio = MockRadio::default();
            let mut central = TransferCentral::new(config());
            central.on_adapter_ready(&mut radio);
            central.on_device_discovered(&mut radio, DEVICE_A, -40);
            central.on_connected(&mut radio, DEVICE_A);

            central.on_services_discovered(&mut radio, DEVICE_A, &[SERVICE, SERVICE_ALT], None);

            let wanted = config().characteristic_uuid;
            assert_eq!(
                radio.commands[radio.commands.len() - 2..],
                [
                    Command::DiscoverCharacteristics { service: SERVICE, characteristic: wanted },
                    Command::DiscoverCharacteristics {
                        service: SERVICE_ALT,
                        characteristic: wanted,
                    },
                ]
            );
        }

        #[test]
        fn test_subscribes_to_matching_characteristic_only() {
            let mut radio = MockRadio::default();
            let mut central = TransferCentral::new(config());
            central.on_adapter_ready(&mut radio);
            central.on_device_discovered(&mut radio, DEVICE_A, -40);
            central.on_connected(&mut radio, DEVICE_A);
            central.on_services_discovered(&mut radio, DEVICE_A, &[SERVICE], None);

            let unrelated = CharacteristicInfo {
                handle: CHR_OTHER,
                uuid: Uuid::from_u128(0xDEAD_BEEF),
            };
            central.on_characteristics_discovered(
                &mut radio,
                DEVICE_A,
                SERVICE,
                &[unrelated, transfer_characteristic()],
                None,
            );

            assert_eq!(central.phase(), LinkPhase::Subscribing);
            assert_eq!(
                radio.commands.last(),
                Some(&Command::SetNotify { characteristic: CHR, enabled: true })
            );
        }
    }

    mod failures {
        use super::*;

        #[test]
        fn test_connect_failure_resumes_scanning() {
            let mut radio = MockRadio::default();
            let mut central = TransferCentral::new(config());
            central.on_adapter_ready(&mut radio);
            central.on_device_discovered(&mut radio, DEVICE_A, -40);

            central.on_connect_failed(
                &mut radio,
                DEVICE_A,
                TransportError::ConnectFailed("refused".into()),
            );

            assert_eq!(central.phase(), LinkPhase::Scanning);
            assert_eq!(central.tracked_device(), None);
            assert_eq!(
                radio.commands.last(),
                Some(&Command::StartScan {
                    service: config().service_uuid,
                    allow_duplicates: true,
                })
            );
        }

        #[test]
        fn test_discovery_error_disconnects_directly() {
            let mut radio = MockRadio::default();
            let mut central = TransferCentral::new(config());
            central.on_adapter_ready(&mut radio);
            central.on_device_discovered(&mut radio, DEVICE_A, -40);
            central.on_connected(&mut radio, DEVICE_A);

            // Connected but not subscribed: cleanup disconnects directly.
            central.on_services_discovered(
                &mut radio,
                DEVICE_A,
                &[],
                Some(TransportError::ServiceDiscovery("gatt error".into())),
            );

            assert_eq!(central.phase(), LinkPhase::Disconnecting);
            assert_eq!(radio.commands.last(), Some(&Command::Disconnect(DEVICE_A)));

            central.on_disconnected(&mut radio, DEVICE_A, None);
            assert_eq!(central.phase(), LinkPhase::Scanning);
        }

        #[test]
        fn test_failure_while_subscribed_unsubscribes_first() {
            let mut radio = MockRadio::default();
            let mut central = streaming_central(&mut radio);

            central.on_notify_state_changed(
                &mut radio,
                CHR,
                true,
                Some(TransportError::NotifyState("peer error".into())),
            );

            // Cleanup goes through unsubscribe; its confirmation then
            // drives the disconnect.
            assert_eq!(
                radio.commands.last(),
                Some(&Command::SetNotify { characteristic: CHR, enabled: false })
            );
            central.on_notify_state_changed(&mut radio, CHR, false, None);
            assert_eq!(radio.commands.last(), Some(&Command::Disconnect(DEVICE_A)));
        }

        #[test]
        fn test_value_update_error_keeps_link() {
            let mut radio = MockRadio::default();
            let mut central = streaming_central(&mut radio);
            central.on_value_updated(&mut radio, CHR, Ok(b"partial"));

            let result = central.on_value_updated(
                &mut radio,
                CHR,
                Err(TransportError::ValueUpdate("bad packet".into())),
            );

            assert_eq!(result, None);
            assert_eq!(central.phase(), LinkPhase::Streaming);
        }
    }

    mod streaming {
        use super::*;

        #[test]
        fn test_message_completion_tears_the_link_down() {
            let mut radio = MockRadio::default();
            let mut central = streaming_central(&mut radio);

            assert_eq!(central.on_value_updated(&mut radio, CHR, Ok(b"Hello ")), None);
            assert_eq!(central.on_value_updated(&mut radio, CHR, Ok(b"world")), None);
            let message = central.on_value_updated(&mut radio, CHR, Ok(b"EOM"));

            assert_eq!(message.as_deref(), Some("Hello world"));
            assert_eq!(
                radio.commands.last(),
                Some(&Command::SetNotify { characteristic: CHR, enabled: false })
            );

            // Unsubscribe confirmation, then disconnect, then rescan.
            central.on_notify_state_changed(&mut radio, CHR, false, None);
            assert_eq!(central.phase(), LinkPhase::Disconnecting);
            central.on_disconnected(&mut radio, DEVICE_A, None);
            assert_eq!(central.phase(), LinkPhase::Scanning);
            assert_eq!(central.tracked_device(), None);
        }

        #[test]
        fn test_peer_revoked_notification_disconnects() {
            let mut radio = MockRadio::default();
            let mut central = streaming_central(&mut radio);

            central.on_notify_state_changed(&mut radio, CHR, false, None);

            assert_eq!(central.phase(), LinkPhase::Disconnecting);
            assert_eq!(radio.commands.last(), Some(&Command::Disconnect(DEVICE_A)));
        }

        #[test]
        fn test_stale_buffer_cleared_on_reconnect() {
            let mut radio = MockRadio::default();
            let mut central = streaming_central(&mut radio);
            central.on_value_updated(&mut radio, CHR, Ok(b"half a mess"));

            // The peer drops the link mid-message.
            central.on_disconnected(
                &mut radio,
                DEVICE_A,
                Some(TransportError::Disconnected("link lost".into())),
            );
            assert_eq!(central.phase(), LinkPhase::Scanning);

            // Next connection starts a clean accumulation.
            central.on_device_discovered(&mut radio, DEVICE_A, -40);
            central.on_connected(&mut radio, DEVICE_A);
            central.on_services_discovered(&mut radio, DEVICE_A, &[SERVICE], None);
            central.on_characteristics_discovered(
                &mut radio,
                DEVICE_A,
                SERVICE,
                &[transfer_characteristic()],
                None,
            );
            central.on_notify_state_changed(&mut radio, CHR, true, None);

            let message = central.on_value_updated(&mut radio, CHR, Ok(b"fresh"));
            assert_eq!(message, None);
            let message = central.on_value_updated(&mut radio, CHR, Ok(b"EOM"));
            assert_eq!(message.as_deref(), Some("fresh"));
        }

        #[test]
        fn test_updates_for_unknown_characteristic_ignored() {
            let mut radio = MockRadio::default();
            let mut central = streaming_central(&mut radio);

            let message = central.on_value_updated(&mut radio, CHR_OTHER, Ok(b"noise"));
            assert_eq!(message, None);

            central.on_value_updated(&mut radio, CHR, Ok(b"real"));
            let message = central.on_value_updated(&mut radio, CHR, Ok(b"EOM"));
            assert_eq!(message.as_deref(), Some("real"));
        }
    }
}
