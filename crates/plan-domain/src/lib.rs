//! Crate `plan-domain` — tipos del dominio de gestión de proyectos
//!
//! Define las entidades (`Project`, `Step`, `Prompt`), sus datos de alta
//! (`NewProject`, `NewStep`, `NewPrompt`), los patch de actualización
//! parcial, las reglas de clonado estructural (`CloneMode`/`CloneSpec`),
//! el serializador de exportación y la taxonomía de errores. Sin I/O:
//! la persistencia vive en `plan-persistence` y el contrato de repositorio
//! en `plan-engine`.
mod clone_spec;
mod errors;
mod export;
mod project;
mod prompt;
mod step;

pub use clone_spec::{CloneMode, CloneSpec, COPY_MARKER, TEMPLATE_MARKER};
pub use errors::{PlanError, Result};
pub use export::{export_document, ExportDocument, ExportProject, ExportPrompt, ExportStep};
pub use project::{NewProject, Project, ProjectFilter, ProjectPage, ProjectPatch, ProjectStatus, TechStack};
pub use prompt::{NewPrompt, Prompt, PromptPatch, PromptVariables};
pub use step::{NewStep, OrderAssignment, Step, StepPatch};
