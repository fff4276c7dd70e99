// verity-core/src/lib.rs

// 1. Mandatory documentation for production code
#![allow(missing_docs)] // relaxed until doc coverage catches up

// 2. Memory safety
#![deny(unsafe_code)]
// 3. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 4. Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports (interfaces / traits)
// Defines the contracts (WarehouseClient, StateStore, ManifestLoader...).
pub mod ports;

// 2. Domain (core business logic)
// Dependency graph, manifest, plan, state. Depends on NOTHING else
// (neither infra nor application).
pub mod domain;

// 3. Infrastructure (adapters)
// Technical implementations (DuckDB, config files, Jinja, discovery).
// Depends on domain and ports.
pub mod infrastructure;

// 4. Application (use cases)
// Orchestration (pipeline, planner, materialization, validation).
// Depends on domain, infra and ports.
pub mod application;

// --- GLOBAL ERROR HANDLING ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
// So callers can just `use verity_core::VerityError;`
pub use error::VerityError;
