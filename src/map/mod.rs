mod registry;
mod unit;

pub use registry::{Exclusion, Exclusions, UnitRegistry};
pub use unit::{Unit, UnitId, UnitRecord};
pub(crate) use unit::pad_code;
