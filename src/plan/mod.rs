mod assignment;
mod io;
mod plan;
mod stats;

pub use assignment::{DistrictAssignment, DistrictLabel};
pub use plan::Plan;
pub use stats::DistrictStats;
