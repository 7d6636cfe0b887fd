//! momentum-allocator — cross-sectional equity momentum allocation engine.
//!
//! Hexagonal architecture: the decision engine and its supporting domain
//! logic live in [`domain`], collaborator traits in [`ports`], and concrete
//! implementations (CSV data, INI config, CSV reports) in
//! [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
