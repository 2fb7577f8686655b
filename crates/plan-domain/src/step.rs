// step.rs
use crate::{PlanError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Paso de un proyecto. El campo `order` es 1-based y denso dentro del
/// proyecto: tras cualquier secuencia de altas/bajas el conjunto de valores
/// es exactamente {1..N}.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
  pub id: Uuid,
  pub project_id: Uuid,
  pub title: String,
  pub description: String,
  pub order: i32,
  pub is_completed: bool,
  pub expected_output: Option<String>,
  pub actual_output: Option<String>,
  pub notes: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Datos de entrada para crear un paso. El `order` no se pasa: lo asigna el
/// repositorio contando los hermanos vivos dentro de la misma transacción.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStep {
  pub project_id: Uuid,
  pub title: String,
  pub description: String,
  pub expected_output: Option<String>,
  pub actual_output: Option<String>,
  pub notes: Option<String>,
}

/// Patch de actualización parcial de un paso. `order` se admite aquí por
/// compatibilidad con el endpoint de update; la densidad sólo se garantiza
/// usando reorder/delete del motor de ordenación.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepPatch {
  pub title: Option<String>,
  pub description: Option<String>,
  pub order: Option<i32>,
  pub is_completed: Option<bool>,
  pub expected_output: Option<String>,
  pub actual_output: Option<String>,
  pub notes: Option<String>,
}

impl Step {
  /// Construye un paso validando título y descripción. El `order` viene del
  /// motor de ordenación (count de hermanos + 1).
  pub fn create(input: NewStep, order: i32) -> Result<Self> {
    if input.title.trim().is_empty() {
      return Err(PlanError::Validation("El título del paso no puede estar vacío".to_string()));
    }
    if input.description.trim().is_empty() {
      return Err(PlanError::Validation("La descripción del paso no puede estar vacía".to_string()));
    }
    if order < 1 {
      return Err(PlanError::Validation(format!("Orden inválido para el paso: {}", order)));
    }
    let now = Utc::now();
    Ok(Self { id: Uuid::new_v4(),
              project_id: input.project_id,
              title: input.title,
              description: input.description,
              order,
              is_completed: false,
              expected_output: input.expected_output,
              actual_output: input.actual_output,
              notes: input.notes,
              created_at: now,
              updated_at: now })
  }

  /// Aplica un patch campo a campo y refresca `updated_at`.
  pub fn apply_patch(&mut self, patch: StepPatch) -> Result<()> {
    if let Some(title) = patch.title {
      if title.trim().is_empty() {
        return Err(PlanError::Validation("El título del paso no puede estar vacío".to_string()));
      }
      self.title = title;
    }
    if let Some(description) = patch.description {
      self.description = description;
    }
    if let Some(order) = patch.order {
      if order < 1 {
        return Err(PlanError::Validation(format!("Orden inválido para el paso: {}", order)));
      }
      self.order = order;
    }
    if let Some(is_completed) = patch.is_completed {
      self.is_completed = is_completed;
    }
    if let Some(expected_output) = patch.expected_output {
      self.expected_output = Some(expected_output);
    }
    if let Some(actual_output) = patch.actual_output {
      self.actual_output = Some(actual_output);
    }
    if let Some(notes) = patch.notes {
      self.notes = Some(notes);
    }
    self.updated_at = Utc::now();
    Ok(())
  }
}

impl fmt::Display for Step {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Step(id: {}, order: {}, title: {})", self.id, self.order, self.title)
  }
}

/// Asignación (id, nuevo orden) usada por las operaciones de reordenación.
/// Los ids que no pertenecen al grupo de hermanos se ignoran en silencio.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderAssignment {
  pub id: Uuid,
  pub order: i32,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn new_step(project_id: Uuid) -> NewStep {
    NewStep { project_id,
              title: "Diseño".into(),
              description: "Diseñar el esquema".into(),
              expected_output: Some("esquema.sql".into()),
              actual_output: None,
              notes: None }
  }

  #[test]
  fn create_starts_not_completed() -> Result<()> {
    let s = Step::create(new_step(Uuid::new_v4()), 1)?;
    assert!(!s.is_completed);
    assert_eq!(s.order, 1);
    Ok(())
  }

  #[test]
  fn create_rejects_blank_title_and_bad_order() {
    let mut input = new_step(Uuid::new_v4());
    input.title = " ".into();
    assert!(matches!(Step::create(input, 1), Err(PlanError::Validation(_))));
    assert!(matches!(Step::create(new_step(Uuid::new_v4()), 0), Err(PlanError::Validation(_))));
  }

  #[test]
  fn patch_keeps_unset_fields() -> Result<()> {
    let mut s = Step::create(new_step(Uuid::new_v4()), 2)?;
    s.apply_patch(StepPatch { is_completed: Some(true), notes: Some("ok".into()), ..Default::default() })?;
    assert!(s.is_completed);
    assert_eq!(s.order, 2);
    assert_eq!(s.notes.as_deref(), Some("ok"));
    assert_eq!(s.expected_output.as_deref(), Some("esquema.sql"));
    Ok(())
  }
}
