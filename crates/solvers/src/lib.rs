//! Game state, trace providers, and move solvers for the op-challenger.

pub mod fault;
