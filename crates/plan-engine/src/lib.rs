//! Crate `plan-engine` — contrato de persistencia y orquestación de planes
//!
//! Define el trait `PlanRepository` (operaciones compuestas y atómicas de
//! ordenación, versionado, clonado y exportación), la capa de servicio
//! `PlanService` pensada para ser invocada desde handlers HTTP, y una
//! implementación en memoria útil para pruebas (`InMemoryPlanRepository`).
//!
//! Diseño resumido:
//! - Orden denso: `order` 1-based por grupo de hermanos; append cuenta las
//!   filas vivas dentro de la transacción y el borrado cierra el hueco.
//! - Versionado por slot: la cadena de versiones de un prompt se identifica
//!   por (project_id, step_id), no por el id de una fila; crear versión es
//!   append-only.
//! - Clonado polimórfico: un único recorrido del árbol parametrizado por
//!   `CloneMode`.
//!
//! Ejemplo rápido:
//! ```rust
//! use plan_engine::{InMemoryPlanRepository, PlanService};
//! use std::sync::Arc;
//! let repo = Arc::new(InMemoryPlanRepository::new());
//! let service = PlanService::new(repo);
//! ```
pub mod repository;
pub mod service;
pub mod stubs;

pub use repository::*;
pub use service::*;
pub use stubs::*;
