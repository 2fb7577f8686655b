//! Implementación Diesel del trait `PlanRepository`.
//! Este archivo expone el módulo `schema` y reexporta el repositorio Diesel
//! que implementa el contrato de persistencia del dominio de planes. La
//! implementación detallada está en `plan_persistence.rs`.

mod plan_persistence;
pub mod schema;

#[cfg(not(feature = "pg"))]
pub use plan_persistence::new_sqlite_for_test;
pub use plan_persistence::{new_from_env, new_plan_repo_from_env, DieselPlanRepository};
