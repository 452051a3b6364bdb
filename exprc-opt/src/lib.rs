//! Scheduling, device modeling, and resource allocation: ASAP control
//! steps, typed functional-unit/register devices, and driver maps.
mod alloc;
mod device;
mod schedule;

pub use alloc::Allocator;
pub use device::{Datapath, Device, DeviceId, InPortId, OutPortId};
pub use schedule::{Schedule, Scheduler};
