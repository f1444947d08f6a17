pub mod android;
pub mod common;
pub mod dry_run;
pub mod switch;
pub mod traits;
pub mod web;

pub use traits::Actor;

use anyhow::Result;

/// List connected devices for the specified platform
pub async fn list_devices(platform: &str) -> Result<()> {
    match platform {
        "android" => android::list_devices().await,
        "web" | "dry-run" => {
            println!("  Device listing not applicable for {}", platform);
            Ok(())
        }
        _ => {
            anyhow::bail!("Unknown platform: {}", platform);
        }
    }
}
