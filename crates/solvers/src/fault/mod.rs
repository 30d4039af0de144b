//! Data structures, types, and the game solver implementation for the various
//! fault dispute game variants.

mod error;
pub use error::FaultError;

mod position;
pub use position::{compute_gindex, Position};

mod types;
pub use types::*;

mod game;
pub use game::{ClaimTree, Game};

mod provider;
pub use provider::TraceProvider;

mod alphabet;
pub use alphabet::AlphabetTraceProvider;

mod solver;
pub use solver::Solver;
