//! # sr-methods
//!
//! Discretizations of short-rate models on which contingent claims are
//! valued by backward induction.
//!
//! Every discretization implements the [`Lattice`] trait: a [`TimeGrid`], a
//! number of nodes per slice, and a one-step rollback operator. Trees and
//! one-factor meshes are fitted to the model's discount curve during
//! construction, so that rolling back a unit payoff from any slice
//! reproduces the curve's discount factor.
//!
//! # Modules
//!
//! * [`lattice`]: time grid, trinomial trees and the one- and two-factor
//!   tree lattices
//! * [`finite_differences`]: tridiagonal operators and θ-scheme / ADI meshes
//! * [`builder`]: configuration and construction of a lattice for a model

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Time grid, lattice trait and tree lattices.
pub mod lattice;

/// Finite-difference meshes.
pub mod finite_differences;

/// Lattice configuration and builder.
pub mod builder;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use builder::{
    LatticeBuilder, LatticeConfig, LatticeKind, DEFAULT_FD_STEPS, DEFAULT_STD_DEVS, DEFAULT_TREE_STEPS,
};
pub use finite_differences::{FdScheme, FdShortRateMesh1d, FdShortRateMesh2d, TridiagonalOperator};
pub use lattice::{
    Lattice, OneFactorTreeLattice, TimeGrid, TrinomialTree, TwoFactorTreeLattice,
};
