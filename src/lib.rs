pub mod data;
pub mod driver;
pub mod error;
pub mod locator;
pub mod pages;
pub mod parser;
pub mod report;
pub mod runner;
pub mod steps;
pub mod utils;

// Re-export common items
pub use data::{DataResolver, DataValue, TestData};
pub use driver::{list_devices, Actor};
pub use error::{SlotError, StepError};
pub use locator::Locator;
pub use report::generate_report;
pub use runner::{run_tests, Platform, RunOptions};
pub use steps::{default_registry, next_available_slot, StepRegistry, World};
pub use utils::Config;
