// SPDX-License-Identifier: GPL-3.0-only

//! `list` subcommand

use kinect_sandbox::backends::{SensorBackendType, enumerate_sensors};
use kinect_sandbox::errors::AppResult;

/// Print every sensor reachable through `backend`
pub fn list_sensors(backend: SensorBackendType) -> AppResult<()> {
    let sensors = enumerate_sensors(backend);

    if sensors.is_empty() {
        println!("No sensors found.");
        return Ok(());
    }

    println!("Available sensors:");
    println!();
    for (index, sensor) in sensors.iter().enumerate() {
        println!("  [{}] {}", index, sensor.name);
        println!("      Backend: {}", sensor.backend);
        println!("      Path:    {}", sensor.path);
        if let Some(serial) = &sensor.serial {
            println!("      Serial:  {}", serial);
        }
        println!();
    }

    Ok(())
}
