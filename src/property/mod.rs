pub mod engine;
pub mod generators;
pub mod properties;
pub mod shrink;

pub use engine::{run_property_stage, PropertyEngine, PropertyRun};
pub use generators::TrialGenerator;
pub use properties::{Property, TrialInput};
