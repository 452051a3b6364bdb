//! The device model: typed descriptions of inputs, outputs, adders,
//! multipliers, and registers, with their own port ID spaces.
//!
//! `Device` is a tagged union rather than a trait object — the emitter
//! pattern-matches on it directly, avoiding virtual dispatch entirely.

use exprc_utils::decl_id;

decl_id!(
    /// Identity of a device (input pad, output pad, adder, multiplier, or
    /// register).
    DeviceId
);
decl_id!(
    /// Identity of a device input port. Disjoint from [`OutPortId`].
    InPortId
);
decl_id!(
    /// Identity of a device output port. Disjoint from [`InPortId`].
    OutPortId
);

/// A device, tagged by kind, carrying exactly the ports its kind allows:
/// `Input{out}`, `Output{in0}`, `Register{out, in0}`, `Adder{out, in0,
/// in1}`, `Multiplier{out, in0, in1}`.
#[derive(Debug, Clone)]
pub enum Device {
    /// Latches one named user input. No input ports.
    Input { id: DeviceId, name: String, out: OutPortId },
    /// Drives one named user output. No output ports.
    Output { id: DeviceId, name: String, in0: InPortId },
    /// Holds an 8-bit value across control steps.
    Register { id: DeviceId, out: OutPortId, in0: InPortId },
    Adder { id: DeviceId, out: OutPortId, in0: InPortId, in1: InPortId },
    Multiplier { id: DeviceId, out: OutPortId, in0: InPortId, in1: InPortId },
}

impl Device {
    pub fn id(&self) -> DeviceId {
        match self {
            Device::Input { id, .. }
            | Device::Output { id, .. }
            | Device::Register { id, .. }
            | Device::Adder { id, .. }
            | Device::Multiplier { id, .. } => *id,
        }
    }

    /// The device's single output port, if it has one (everything but
    /// `Output`).
    pub fn out_port(&self) -> Option<OutPortId> {
        match self {
            Device::Input { out, .. }
            | Device::Register { out, .. }
            | Device::Adder { out, .. }
            | Device::Multiplier { out, .. } => Some(*out),
            Device::Output { .. } => None,
        }
    }

    /// The device's input ports in order, if it has any (everything but
    /// `Input`).
    pub fn in_ports(&self) -> Vec<InPortId> {
        match self {
            Device::Input { .. } => vec![],
            Device::Output { in0, .. } | Device::Register { in0, .. } => vec![*in0],
            Device::Adder { in0, in1, .. } | Device::Multiplier { in0, in1, .. } => {
                vec![*in0, *in1]
            }
        }
    }
}

/// The complete datapath: every device, plus the driver map wiring them
/// together. `drivers` is ordered by `(step, InPortId)` so emission is
/// deterministic given a fixed input.
#[derive(Debug, Clone, Default)]
pub struct Datapath {
    pub devices: exprc_utils::IdVec<DeviceId, Device>,
    /// Allocation-order device lists, one per kind — the order the
    /// emitter renders declarations and instances in.
    pub inputs: Vec<DeviceId>,
    pub outputs: Vec<DeviceId>,
    pub adders: Vec<DeviceId>,
    pub multipliers: Vec<DeviceId>,
    pub registers: Vec<DeviceId>,
    /// `(step, InPortId) -> OutPortId`: the complete wiring. For every
    /// step and every input port that must be driven, which output port
    /// supplies it.
    pub drivers: std::collections::BTreeMap<(u32, InPortId), OutPortId>,
    out_port_count: usize,
    in_port_count: usize,
}

impl Datapath {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, device: Device) -> DeviceId {
        let id = device.id();
        debug_assert_eq!(
            id,
            exprc_utils::ArenaId::from_index(self.devices.len()),
            "device id must match its arena slot"
        );
        self.devices.push(device);
        id
    }

    /// Allocates a fresh `Input` device named `name`, returning its
    /// output port. I/O devices are never reused (no pool).
    pub fn new_input(&mut self, name: String) -> (DeviceId, OutPortId) {
        let dev_id = exprc_utils::ArenaId::from_index(self.devices.len());
        let out = exprc_utils::ArenaId::from_index(self.out_port_count());
        self.out_port_count += 1;
        let id = self.push(Device::Input { id: dev_id, name, out });
        self.inputs.push(id);
        (id, out)
    }

    /// Allocates a fresh `Output` device named `name`, returning its
    /// input port.
    pub fn new_output(&mut self, name: String) -> (DeviceId, InPortId) {
        let dev_id = exprc_utils::ArenaId::from_index(self.devices.len());
        let in0 = exprc_utils::ArenaId::from_index(self.in_port_count());
        self.in_port_count += 1;
        let id = self.push(Device::Output { id: dev_id, name, in0 });
        self.outputs.push(id);
        (id, in0)
    }

    /// Allocates a fresh `Register` device, returning `(out, in0)`.
    pub fn new_register(&mut self) -> (DeviceId, OutPortId, InPortId) {
        let dev_id = exprc_utils::ArenaId::from_index(self.devices.len());
        let out = exprc_utils::ArenaId::from_index(self.out_port_count());
        self.out_port_count += 1;
        let in0 = exprc_utils::ArenaId::from_index(self.in_port_count());
        self.in_port_count += 1;
        let id = self.push(Device::Register { id: dev_id, out, in0 });
        self.registers.push(id);
        (id, out, in0)
    }

    /// Allocates a fresh `Adder`, returning `(out, in0, in1)`.
    pub fn new_adder(&mut self) -> (DeviceId, OutPortId, InPortId, InPortId) {
        let dev_id = exprc_utils::ArenaId::from_index(self.devices.len());
        let out = exprc_utils::ArenaId::from_index(self.out_port_count());
        self.out_port_count += 1;
        let in0 = exprc_utils::ArenaId::from_index(self.in_port_count());
        self.in_port_count += 1;
        let in1 = exprc_utils::ArenaId::from_index(self.in_port_count());
        self.in_port_count += 1;
        let id = self.push(Device::Adder { id: dev_id, out, in0, in1 });
        self.adders.push(id);
        (id, out, in0, in1)
    }

    /// Allocates a fresh `Multiplier`, returning `(out, in0, in1)`.
    pub fn new_multiplier(&mut self) -> (DeviceId, OutPortId, InPortId, InPortId) {
        let dev_id = exprc_utils::ArenaId::from_index(self.devices.len());
        let out = exprc_utils::ArenaId::from_index(self.out_port_count());
        self.out_port_count += 1;
        let in0 = exprc_utils::ArenaId::from_index(self.in_port_count());
        self.in_port_count += 1;
        let in1 = exprc_utils::ArenaId::from_index(self.in_port_count());
        self.in_port_count += 1;
        let id = self.push(Device::Multiplier { id: dev_id, out, in0, in1 });
        self.multipliers.push(id);
        (id, out, in0, in1)
    }

    fn out_port_count(&self) -> usize {
        self.out_port_count
    }
    fn in_port_count(&self) -> usize {
        self.in_port_count
    }
}
