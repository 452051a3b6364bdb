//! Resource binding / datapath allocation — the hardest pass in the
//! pipeline. Runs in two phases over a fixed [`Schedule`]:
//!
//! - **H.1** assigns registers to operands that must survive across
//!   control steps, reusing a register the moment its previous tenant's
//!   definition is reached on a reverse walk (a linear-scan allocator
//!   rotated into reverse time).
//! - **H.2** walks forward, allocating functional units from step-local,
//!   cursor-reset pools and building the `(step, InPortId) -> OutPortId`
//!   driver map that is the complete wiring of the datapath.

use crate::device::{Datapath, Device, DeviceId, InPortId, OutPortId};
use crate::schedule::Schedule;
use exprc_ir::{InstrId, Instruction, Ir, Opcode, OperandId};
use exprc_utils::Named;
use std::collections::{HashMap, VecDeque};

pub struct Allocator;

impl Named for Allocator {
    fn name() -> &'static str {
        "allocator"
    }
    fn description() -> &'static str {
        "binds a schedule to a concrete pool of devices and a driver map"
    }
}

/// A dynamic array plus an unallocated-cursor, reset to the front at the
/// start of every control step. `alloc` returns the device under the
/// cursor, extending the pool with a freshly made device when the cursor
/// runs past the end — the textbook functional-unit pool.
#[derive(Default)]
struct Pool {
    devices: Vec<DeviceId>,
    cursor: usize,
}

impl Pool {
    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn alloc(&mut self, make: impl FnOnce() -> DeviceId) -> DeviceId {
        let id = if self.cursor < self.devices.len() {
            self.devices[self.cursor]
        } else {
            let id = make();
            self.devices.push(id);
            id
        };
        self.cursor += 1;
        id
    }
}

impl Allocator {
    pub fn allocate(ir: &Ir, schedule: &Schedule) -> Datapath {
        let mut datapath = Datapath::new();
        let reg_mapping = Self::allocate_registers(ir, schedule, &mut datapath);
        Self::allocate_devices_and_drivers(ir, schedule, &mut datapath, &reg_mapping);
        datapath
    }

    /// H.1: register allocation with lifetime reuse. Walks the schedule
    /// in reverse step order, from `last_step` down to but excluding step
    /// 1 (step 0 holds only `INPUT`s; step 1 is fed directly by input
    /// pads, never a register — an operand consumed only at step 1 never
    /// needs to survive a control-step boundary).
    fn allocate_registers(
        ir: &Ir,
        schedule: &Schedule,
        datapath: &mut Datapath,
    ) -> HashMap<OperandId, DeviceId> {
        let mut reg_mapping: HashMap<OperandId, DeviceId> = HashMap::new();
        let mut free_pool: VecDeque<DeviceId> = VecDeque::new();

        for step in (2..=schedule.last_step()).rev() {
            for &instr_id in schedule.at(step) {
                let instr = instr_at(ir, instr_id);

                if let Some(dst) = instr.dst {
                    if let Some(&reg_id) = reg_mapping.get(&dst) {
                        log::trace!(
                            "{}: releasing {reg_id} at the definition of {dst}",
                            Allocator::name()
                        );
                        free_pool.push_back(reg_id);
                    }
                }

                for &src in &instr.src {
                    reg_mapping.entry(src).or_insert_with(|| {
                        let reg_id = free_pool.pop_front().unwrap_or_else(|| {
                            let (id, ..) = datapath.new_register();
                            id
                        });
                        log::trace!(
                            "{}: {src} lives in {reg_id}",
                            Allocator::name()
                        );
                        reg_id
                    });
                }
            }
        }

        reg_mapping
    }

    /// H.2: forward walk allocating `Input`/`Output`/`Adder`/`Multiplier`
    /// devices from step-reusable pools and constructing the driver map.
    fn allocate_devices_and_drivers(
        ir: &Ir,
        schedule: &Schedule,
        datapath: &mut Datapath,
        reg_mapping: &HashMap<OperandId, DeviceId>,
    ) {
        let mut adder_pool = Pool::default();
        let mut mul_pool = Pool::default();
        let mut fed_by_input: HashMap<OperandId, OutPortId> = HashMap::new();
        let mut fed_by_reg: HashMap<OperandId, OutPortId> = HashMap::new();

        for step in 0..=schedule.last_step() {
            adder_pool.reset();
            mul_pool.reset();

            for &instr_id in schedule.at(step) {
                let instr = instr_at(ir, instr_id);
                debug_assert!(
                    step > 0 || instr.op == Opcode::Input,
                    "step 0 must contain only INPUT instructions"
                );

                let (out_port, in_ports) = Self::device_for(
                    instr_id,
                    instr,
                    ir,
                    datapath,
                    &mut adder_pool,
                    &mut mul_pool,
                );
                debug_assert_eq!(
                    in_ports.len(),
                    instr.src.len(),
                    "device input arity must match instruction src count"
                );

                for (in_port, &src) in in_ports.iter().zip(&instr.src) {
                    let driver = route(src, step, &fed_by_input, &fed_by_reg);
                    datapath.drivers.insert((step, *in_port), driver);
                }

                if let (Some(dst), Some(out)) = (instr.dst, out_port) {
                    if let Some(&reg_id) = reg_mapping.get(&dst) {
                        let (reg_out, reg_in0) = register_ports(datapath, reg_id);
                        // Even a value "produced at step 0" by an INPUT
                        // device is latched no earlier than step 1 — step
                        // 0 is not a real control state.
                        let latch_step = step.max(1);
                        datapath.drivers.insert((latch_step, reg_in0), out);
                        fed_by_reg.insert(dst, reg_out);
                    } else {
                        debug_assert_eq!(
                            instr.op,
                            Opcode::Input,
                            "an operand with no register must be an INPUT at step 0"
                        );
                        fed_by_input.insert(dst, out);
                    }
                }
            }
        }
    }

    /// Allocates (or reuses, for `ADD`/`MUL`) the device matching
    /// `instr`'s opcode, returning its output port (if any) and its input
    /// ports in `src` order.
    fn device_for(
        instr_id: InstrId,
        instr: &Instruction,
        ir: &Ir,
        datapath: &mut Datapath,
        adder_pool: &mut Pool,
        mul_pool: &mut Pool,
    ) -> (Option<OutPortId>, Vec<InPortId>) {
        match instr.op {
            Opcode::Input => {
                let dst = instr.dst.expect("INPUT always defines dst");
                let name = ir.name_by_operand[&dst].clone();
                let (_id, out) = datapath.new_input(name);
                (Some(out), vec![])
            }
            Opcode::Output => {
                // Named from the `out` statement itself, not from
                // `name_by_operand`: the source operand keeps the name of
                // whatever defined it, which for a bare passthrough
                // (`out Z = A;`) is the input's own name, not `Z`.
                let name = ir.output_names[&instr_id].clone();
                let (_id, in0) = datapath.new_output(name);
                (None, vec![in0])
            }
            Opcode::Add => {
                let id = adder_pool.alloc(|| {
                    let (id, ..) = datapath.new_adder();
                    id
                });
                let (out, in0, in1) = adder_ports(datapath, id);
                (Some(out), vec![in0, in1])
            }
            Opcode::Mul => {
                let id = mul_pool.alloc(|| {
                    let (id, ..) = datapath.new_multiplier();
                    id
                });
                let (out, in0, in1) = multiplier_ports(datapath, id);
                (Some(out), vec![in0, in1])
            }
        }
    }
}

fn instr_at(ir: &Ir, id: InstrId) -> &Instruction {
    ir.instrs.get(id)
}

fn register_ports(datapath: &Datapath, id: DeviceId) -> (OutPortId, InPortId) {
    match datapath.devices.get(id) {
        Device::Register { out, in0, .. } => (*out, *in0),
        other => unreachable!("expected Register device, found {other:?}"),
    }
}

fn adder_ports(datapath: &Datapath, id: DeviceId) -> (OutPortId, InPortId, InPortId) {
    match datapath.devices.get(id) {
        Device::Adder { out, in0, in1, .. } => (*out, *in0, *in1),
        other => unreachable!("expected Adder device, found {other:?}"),
    }
}

fn multiplier_ports(datapath: &Datapath, id: DeviceId) -> (OutPortId, InPortId, InPortId) {
    match datapath.devices.get(id) {
        Device::Multiplier { out, in0, in1, .. } => (*out, *in0, *in1),
        other => unreachable!("expected Multiplier device, found {other:?}"),
    }
}

/// Looks up the output port feeding `src` when consumed at `step`: input
/// pads directly at step 1 (every step-1 operand is produced by an
/// `INPUT`, by construction of the ASAP schedule), registers at step >= 2.
fn route(
    src: OperandId,
    step: u32,
    fed_by_input: &HashMap<OperandId, OutPortId>,
    fed_by_reg: &HashMap<OperandId, OutPortId>,
) -> OutPortId {
    if step <= 1 {
        *fed_by_input
            .get(&src)
            .unwrap_or_else(|| panic!("step-1 consumer of {src} must be fed by an input pad"))
    } else {
        *fed_by_reg
            .get(&src)
            .unwrap_or_else(|| panic!("step-{step} consumer of {src} must be fed by a register"))
    }
}
