pub mod adb;
pub mod driver;
pub mod uiautomator;

pub use driver::{AndroidConfig, AndroidDriver};

use anyhow::Result;
use colored::Colorize;

/// List connected Android devices
pub async fn list_devices() -> Result<()> {
    let devices = adb::get_devices().await?;

    if devices.is_empty() {
        println!("  No Android devices connected");
    } else {
        println!("  Found {} device(s):", devices.len());
        for device in devices {
            println!(
                "    {} {} ({})",
                "•".green(),
                device.serial.white().bold(),
                device.state.dimmed()
            );
        }
    }

    Ok(())
}
