// prompt.rs
use crate::{PlanError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Variables de sustitución del prompt, por ejemplo:
/// {"project_name": "MyApp", "language": "Rust"}
pub type PromptVariables = BTreeMap<String, String>;

/// Prompt versionado dentro de un paso. La historia de versiones de un
/// "slot" es el conjunto de filas que comparten el mismo par
/// (project_id, step_id); crear una versión nunca muta las anteriores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
  pub id: Uuid,
  pub project_id: Uuid,
  /// Un prompt puede vivir sin paso (step_id = None) sólo si se creó así;
  /// el borrado de un paso cascada sobre sus prompts, nunca los desacopla.
  pub step_id: Option<Uuid>,
  pub title: String,
  pub content: String,
  pub response: Option<String>,
  pub variables: PromptVariables,
  pub version: i32,
  pub order: i32,
  pub is_template: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Datos de entrada para crear un prompt. Ni `order` ni `version` se pasan:
/// el repositorio asigna `order = hermanos + 1` y `version = 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPrompt {
  pub project_id: Uuid,
  pub step_id: Option<Uuid>,
  pub title: String,
  pub content: String,
  pub variables: PromptVariables,
}

/// Patch de actualización parcial de un prompt. `version`, `order` e
/// `is_template` no son mutables por patch: la versión la gestiona el
/// gestor de cadena de versiones, el orden las operaciones de reordenación
/// y el flag de plantilla el clonador.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptPatch {
  pub title: Option<String>,
  pub content: Option<String>,
  pub variables: Option<PromptVariables>,
  pub response: Option<String>,
}

impl Prompt {
  /// Construye un prompt nuevo (versión 1) validando título y contenido.
  pub fn create(input: NewPrompt, order: i32) -> Result<Self> {
    if input.title.trim().is_empty() {
      return Err(PlanError::Validation("El título del prompt no puede estar vacío".to_string()));
    }
    if input.content.trim().is_empty() {
      return Err(PlanError::Validation("El contenido del prompt no puede estar vacío".to_string()));
    }
    if order < 1 {
      return Err(PlanError::Validation(format!("Orden inválido para el prompt: {}", order)));
    }
    let now = Utc::now();
    Ok(Self { id: Uuid::new_v4(),
              project_id: input.project_id,
              step_id: input.step_id,
              title: input.title,
              content: input.content,
              response: None,
              variables: input.variables,
              version: 1,
              order,
              is_template: false,
              created_at: now,
              updated_at: now })
  }

  /// Aplica un patch campo a campo y refresca `updated_at`.
  pub fn apply_patch(&mut self, patch: PromptPatch) -> Result<()> {
    if let Some(title) = patch.title {
      if title.trim().is_empty() {
        return Err(PlanError::Validation("El título del prompt no puede estar vacío".to_string()));
      }
      self.title = title;
    }
    if let Some(content) = patch.content {
      self.content = content;
    }
    if let Some(variables) = patch.variables {
      self.variables = variables;
    }
    if let Some(response) = patch.response {
      self.response = Some(response);
    }
    self.updated_at = Utc::now();
    Ok(())
  }

  /// Construye la siguiente versión del slot a partir de esta fila y un
  /// patch. Los campos vacíos o ausentes del patch caen al valor original
  /// (cadena en blanco y mapa vacío cuentan como ausentes). La fila original
  /// no se toca; la nueva empieza sin respuesta y sin flag de plantilla,
  /// conservando el `order` del slot.
  pub fn next_version(&self, patch: PromptPatch, version: i32) -> Self {
    let title = match patch.title {
      Some(t) if !t.trim().is_empty() => t,
      _ => self.title.clone(),
    };
    let content = match patch.content {
      Some(c) if !c.trim().is_empty() => c,
      _ => self.content.clone(),
    };
    let variables = match patch.variables {
      Some(v) if !v.is_empty() => v,
      _ => self.variables.clone(),
    };
    let now = Utc::now();
    Self { id: Uuid::new_v4(),
           project_id: self.project_id,
           step_id: self.step_id,
           title,
           content,
           response: None,
           variables,
           version,
           order: self.order,
           is_template: false,
           created_at: now,
           updated_at: now }
  }

  /// Dos prompts pertenecen al mismo slot si comparten (project_id, step_id).
  pub fn same_slot(&self, other: &Prompt) -> bool {
    self.project_id == other.project_id && self.step_id == other.step_id
  }
}

impl fmt::Display for Prompt {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f,
           "Prompt(id: {}, order: {}, version: {}, title: {})",
           self.id, self.order, self.version, self.title)
  }
}
