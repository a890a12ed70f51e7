//! External hardware control interface.
//!
//! The engine drives motors and plungers through this narrow trait; the
//! wire-level drivers behind it live in a separate package. The
//! [`SimulatedHardwareApi`] stands in for them in tests and simulation
//! runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use aria_common::entities::TipGeometry;
use aria_common::error::EngineError;
use aria_common::types::{MotorAxis, MountType, Point};

pub trait HardwareApi: Send + Sync {
    fn aspirate(&self, mount: MountType, volume: f64, flow_rate: f64) -> Result<(), EngineError>;

    fn dispense(
        &self,
        mount: MountType,
        volume: f64,
        flow_rate: f64,
        push_out: Option<f64>,
    ) -> Result<(), EngineError>;

    fn blow_out(&self, mount: MountType, flow_rate: f64) -> Result<(), EngineError>;

    /// Return the plunger to the bottom position without moving liquid.
    fn prepare_for_aspirate(&self, mount: MountType) -> Result<(), EngineError>;

    /// Move the mount to an absolute deck position, returning the
    /// position actually reached.
    fn move_to(
        &self,
        mount: MountType,
        target: Point,
        force_direct: bool,
        speed: Option<f64>,
    ) -> Result<Point, EngineError>;

    fn pick_up_tip(&self, mount: MountType, tip: &TipGeometry) -> Result<(), EngineError>;

    fn drop_tip(&self, mount: MountType, home_after: bool) -> Result<(), EngineError>;

    fn home(&self, axes: &[MotorAxis]) -> Result<(), EngineError>;

    fn get_serial_number(&self, mount: MountType) -> Result<String, EngineError>;
}

/// In-memory hardware double: tracks gantry position per mount and hands
/// out stable serial numbers. Every operation succeeds instantly.
#[derive(Debug, Default)]
pub struct SimulatedHardwareApi {
    positions: Mutex<HashMap<MountType, Point>>,
    serials: Mutex<HashMap<MountType, String>>,
    serial_counter: AtomicU64,
}

impl SimulatedHardwareApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self, mount: MountType) -> Point {
        self.positions
            .lock()
            .get(&mount)
            .copied()
            .unwrap_or_default()
    }
}

impl HardwareApi for SimulatedHardwareApi {
    fn aspirate(&self, _mount: MountType, _volume: f64, _flow_rate: f64) -> Result<(), EngineError> {
        Ok(())
    }

    fn dispense(
        &self,
        _mount: MountType,
        _volume: f64,
        _flow_rate: f64,
        _push_out: Option<f64>,
    ) -> Result<(), EngineError> {
        Ok(())
    }

    fn blow_out(&self, _mount: MountType, _flow_rate: f64) -> Result<(), EngineError> {
        Ok(())
    }

    fn prepare_for_aspirate(&self, _mount: MountType) -> Result<(), EngineError> {
        Ok(())
    }

    fn move_to(
        &self,
        mount: MountType,
        target: Point,
        _force_direct: bool,
        _speed: Option<f64>,
    ) -> Result<Point, EngineError> {
        self.positions.lock().insert(mount, target);
        Ok(target)
    }

    fn pick_up_tip(&self, _mount: MountType, _tip: &TipGeometry) -> Result<(), EngineError> {
        Ok(())
    }

    fn drop_tip(&self, _mount: MountType, _home_after: bool) -> Result<(), EngineError> {
        Ok(())
    }

    fn home(&self, _axes: &[MotorAxis]) -> Result<(), EngineError> {
        Ok(())
    }

    fn get_serial_number(&self, mount: MountType) -> Result<String, EngineError> {
        let mut serials = self.serials.lock();
        if let Some(serial) = serials.get(&mount) {
            return Ok(serial.clone());
        }
        let n = self.serial_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let serial = format!("SIM-{n:04}");
        serials.insert(mount, serial.clone());
        Ok(serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_to_tracks_position_per_mount() {
        let hardware = SimulatedHardwareApi::new();
        let target = Point::new(10.0, 20.0, 30.0);
        let reached = hardware
            .move_to(MountType::Left, target, false, None)
            .unwrap();
        assert_eq!(reached, target);
        assert_eq!(hardware.position(MountType::Left), target);
        assert_eq!(hardware.position(MountType::Right), Point::default());
    }

    #[test]
    fn serial_numbers_are_stable_per_mount() {
        let hardware = SimulatedHardwareApi::new();
        let left = hardware.get_serial_number(MountType::Left).unwrap();
        assert_eq!(hardware.get_serial_number(MountType::Left).unwrap(), left);
        assert_ne!(hardware.get_serial_number(MountType::Right).unwrap(), left);
    }
}
