//! In-memory radio pair for tests and demos.
//!
//! Wires a [`TransferCentral`] and a [`TransferPeripheral`] back-to-back
//! without any real hardware. Control-plane requests are buffered in a
//! queue and replayed as platform callbacks by a deterministic
//! single-threaded dispatcher; the data plane is a bounded notification
//! queue whose full state is the backpressure signal, with the readiness
//! callback delivered as capacity frees up. That is enough to exercise
//! the whole protocol: discovery, connection, subscription, flow-controlled
//! streaming, teardown, and the return to scanning.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::trace;
use uuid::Uuid;

use crate::central::TransferCentral;
use crate::core::config::TransferConfig;
use crate::core::traits::{
    CentralRadio, CharacteristicHandle, CharacteristicInfo, DeviceId, PeripheralRadio,
    ServiceHandle,
};
use crate::peripheral::TransferPeripheral;

/// Default capacity of the simulated outbound notification queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 4;

/// Identity the simulated peripheral appears under.
const PEER: DeviceId = DeviceId::new(1);

/// Handle of the one simulated service instance.
const SERVICE: ServiceHandle = ServiceHandle::new(1);

/// Handle of the published transfer characteristic.
const CHARACTERISTIC: CharacteristicHandle = CharacteristicHandle::new(1);

/// Signal strength reported for every simulated advertisement.
const LOOPBACK_RSSI: i16 = -30;

/// A central request waiting to be dispatched.
#[derive(Debug)]
enum CentralRequest {
    StartScan {
        service: Uuid,
        allow_duplicates: bool,
    },
    StopScan,
    Connect(DeviceId),
    Disconnect(DeviceId),
    DiscoverServices {
        device: DeviceId,
        service: Uuid,
    },
    DiscoverCharacteristics {
        device: DeviceId,
        service: ServiceHandle,
    },
    SetNotify {
        characteristic: CharacteristicHandle,
        enabled: bool,
    },
}

/// Shared state of the simulated air interface.
#[derive(Debug, Default)]
struct BusState {
    /// Control-plane requests awaiting dispatch.
    requests: VecDeque<CentralRequest>,
    /// Undelivered notifications, bounded by `capacity`.
    notifications: VecDeque<Vec<u8>>,
    capacity: usize,
    /// Whether a refused write owes the peripheral a readiness signal.
    starved: bool,
    scanning: Option<(Uuid, bool)>,
    advertising: Option<Uuid>,
    published: Option<(Uuid, Uuid)>,
    subscribed: bool,
}

type SharedBus = Rc<RefCell<BusState>>;

/// The central's side of the simulated stack.
#[derive(Debug)]
pub struct CentralPort {
    bus: SharedBus,
}

impl CentralRadio for CentralPort {
    fn start_scan(&mut self, service: Uuid, allow_duplicates: bool) {
        self.bus
            .borrow_mut()
            .requests
            .push_back(CentralRequest::StartScan { service, allow_duplicates });
    }

    fn stop_scan(&mut self) {
        self.bus.borrow_mut().requests.push_back(CentralRequest::StopScan);
    }

    fn connect(&mut self, device: DeviceId) {
        self.bus.borrow_mut().requests.push_back(CentralRequest::Connect(device));
    }

    fn disconnect(&mut self, device: DeviceId) {
        self.bus.borrow_mut().requests.push_back(CentralRequest::Disconnect(device));
    }

    fn discover_services(&mut self, device: DeviceId, service: Uuid) {
        self.bus
            .borrow_mut()
            .requests
            .push_back(CentralRequest::DiscoverServices { device, service });
    }

    fn discover_characteristics(
        &mut self,
        device: DeviceId,
        service: ServiceHandle,
        _characteristic: Uuid,
    ) {
        self.bus
            .borrow_mut()
            .requests
            .push_back(CentralRequest::DiscoverCharacteristics { device, service });
    }

    fn set_notify(&mut self, _device: DeviceId, characteristic: CharacteristicHandle, enabled: bool) {
        self.bus
            .borrow_mut()
            .requests
            .push_back(CentralRequest::SetNotify { characteristic, enabled });
    }
}

/// The peripheral's side of the simulated stack.
#[derive(Debug)]
pub struct PeripheralPort {
    bus: SharedBus,
}

impl PeripheralRadio for PeripheralPort {
    fn publish_service(&mut self, service: Uuid, characteristic: Uuid) -> CharacteristicHandle {
        self.bus.borrow_mut().published = Some((service, characteristic));
        CHARACTERISTIC
    }

    fn start_advertising(&mut self, service: Uuid) {
        self.bus.borrow_mut().advertising = Some(service);
    }

    fn stop_advertising(&mut self) {
        self.bus.borrow_mut().advertising = None;
    }

    fn write_notify(&mut self, _characteristic: CharacteristicHandle, value: &[u8]) -> bool {
        let mut bus = self.bus.borrow_mut();
        if !bus.subscribed {
            trace!("dropping notification, no subscriber");
            return true;
        }
        if bus.notifications.len() >= bus.capacity {
            bus.starved = true;
            return false;
        }
        bus.notifications.push_back(value.to_vec());
        true
    }
}

/// Both roles wired together over the simulated stack.
///
/// Events flow strictly single-threaded: every call into the harness runs
/// the affected state machines to completion before returning, and
/// [`pump`](Self::pump) drains buffered requests and notifications one at
/// a time until the air goes quiet.
#[derive(Debug)]
pub struct LoopbackHarness {
    /// The central role under simulation.
    pub central: TransferCentral,
    /// The peripheral role under simulation.
    pub peripheral: TransferPeripheral,
    central_port: CentralPort,
    peripheral_port: PeripheralPort,
    bus: SharedBus,
    messages: Vec<String>,
}

impl LoopbackHarness {
    /// Create a harness with the default notification queue capacity.
    pub fn new(config: TransferConfig) -> Self {
        Self::with_queue_capacity(config, DEFAULT_QUEUE_CAPACITY)
    }

    /// Create a harness with an explicit notification queue capacity.
    ///
    /// A small capacity forces backpressure; a capacity of one refuses
    /// every second write, which is the harshest schedule the sender can
    /// face.
    pub fn with_queue_capacity(config: TransferConfig, capacity: usize) -> Self {
        let bus: SharedBus = Rc::new(RefCell::new(BusState {
            capacity,
            ..BusState::default()
        }));
        Self {
            central: TransferCentral::new(config.clone()),
            peripheral: TransferPeripheral::new(config),
            central_port: CentralPort { bus: Rc::clone(&bus) },
            peripheral_port: PeripheralPort { bus: Rc::clone(&bus) },
            bus,
            messages: Vec::new(),
        }
    }

    /// Power both adapters on: the peripheral publishes its service and
    /// the central starts scanning.
    pub fn power_on(&mut self) {
        self.peripheral.on_adapter_ready(&mut self.peripheral_port);
        self.central.on_adapter_ready(&mut self.central_port);
        self.pump();
    }

    /// Deliver one advertisement to the central, if the peripheral is
    /// advertising the service the central is scanning for.
    pub fn advertise(&mut self) {
        let heard = {
            let bus = self.bus.borrow();
            match (bus.advertising, bus.scanning) {
                (Some(advertised), Some((wanted, _))) => advertised == wanted,
                _ => false,
            }
        };
        if heard {
            self.central
                .on_device_discovered(&mut self.central_port, PEER, LOOPBACK_RSSI);
        }
    }

    /// Drain buffered requests and notifications until nothing is
    /// pending.
    pub fn pump(&mut self) {
        while self.step() {}
    }

    /// Messages delivered to the central so far.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Run one full transfer of `text` and return the delivered message.
    ///
    /// Stages the payload, switches advertising on, lets the central hear
    /// one advertisement, and pumps the air until quiet.
    pub fn transfer(&mut self, text: &str) -> Option<String> {
        let before = self.messages.len();
        self.peripheral
            .supply_outgoing_payload(&mut self.peripheral_port, text.as_bytes().to_vec());
        self.peripheral.set_advertising(&mut self.peripheral_port, true);
        self.pump();
        self.advertise();
        self.pump();
        if self.messages.len() > before {
            self.messages.last().cloned()
        } else {
            None
        }
    }

    /// Process one buffered item. Returns `false` once the air is quiet.
    fn step(&mut self) -> bool {
        let request = self.bus.borrow_mut().requests.pop_front();
        if let Some(request) = request {
            self.dispatch(request);
            return true;
        }

        let value = self.bus.borrow_mut().notifications.pop_front();
        if let Some(value) = value {
            let completed =
                self.central
                    .on_value_updated(&mut self.central_port, CHARACTERISTIC, Ok(&value));
            if let Some(text) = completed {
                self.messages.push(text);
            }
            // Delivering freed a queue slot; settle the readiness debt.
            let starved = std::mem::take(&mut self.bus.borrow_mut().starved);
            if starved {
                self.peripheral.on_ready_to_send(&mut self.peripheral_port);
            }
            return true;
        }

        false
    }

    /// Replay one central request as the platform callbacks it produces.
    fn dispatch(&mut self, request: CentralRequest) {
        match request {
            CentralRequest::StartScan { service, allow_duplicates } => {
                self.bus.borrow_mut().scanning = Some((service, allow_duplicates));
            }
            CentralRequest::StopScan => {
                self.bus.borrow_mut().scanning = None;
            }
            CentralRequest::Connect(device) => {
                self.central.on_connected(&mut self.central_port, device);
            }
            CentralRequest::Disconnect(device) => {
                {
                    let mut bus = self.bus.borrow_mut();
                    bus.subscribed = false;
                    bus.starved = false;
                    // Undelivered notifications die with the link.
                    bus.notifications.clear();
                }
                self.central.on_disconnected(&mut self.central_port, device, None);
            }
            CentralRequest::DiscoverServices { device, service } => {
                let present = self.bus.borrow().published.map(|(s, _)| s) == Some(service);
                let matching = [SERVICE];
                let services: &[ServiceHandle] = if present { &matching } else { &[] };
                self.central
                    .on_services_discovered(&mut self.central_port, device, services, None);
            }
            CentralRequest::DiscoverCharacteristics { device, service } => {
                let characteristics: Vec<CharacteristicInfo> = self
                    .bus
                    .borrow()
                    .published
                    .map(|(_, uuid)| CharacteristicInfo { handle: CHARACTERISTIC, uuid })
                    .into_iter()
                    .collect();
                self.central.on_characteristics_discovered(
                    &mut self.central_port,
                    device,
                    service,
                    &characteristics,
                    None,
                );
            }
            CentralRequest::SetNotify { characteristic, enabled } => {
                self.bus.borrow_mut().subscribed = enabled;
                self.central.on_notify_state_changed(
                    &mut self.central_port,
                    characteristic,
                    enabled,
                    None,
                );
                if enabled {
                    self.peripheral.on_subscribe(&mut self.peripheral_port);
                } else {
                    self.peripheral.on_unsubscribe();
                }
            }
        }
    }
}
