pub mod definitions;
pub mod registry;
pub mod slot;

pub use definitions::default_registry;
pub use registry::{StepArgs, StepDefinition, StepHandler, StepRegistry, World};
pub use slot::{next_available_slot, SlotWindow};
