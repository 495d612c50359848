mod policy;
mod solver;

pub use policy::StoppingPolicy;
pub use solver::{SolveOutcome, SolveStatus, SolvedValues, Solver, INTEGRALITY_TOLERANCE};
