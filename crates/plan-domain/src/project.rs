// project.rs
use crate::{PlanError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Stack tecnológico del proyecto: categoría -> lista ordenada de tecnologías.
/// Ejemplo: {"frontend": ["React", "Next.js"], "backend": ["Axum", "Diesel"]}
pub type TechStack = BTreeMap<String, Vec<String>>;

/// Estado del ciclo de vida de un proyecto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
  Planning,
  InProgress,
  Completed,
  Archived,
}

impl ProjectStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      ProjectStatus::Planning => "planning",
      ProjectStatus::InProgress => "in_progress",
      ProjectStatus::Completed => "completed",
      ProjectStatus::Archived => "archived",
    }
  }

  /// Interpreta el valor textual almacenado. Valores desconocidos se
  /// rechazan con `Validation`.
  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "planning" => Ok(ProjectStatus::Planning),
      "in_progress" => Ok(ProjectStatus::InProgress),
      "completed" => Ok(ProjectStatus::Completed),
      "archived" => Ok(ProjectStatus::Archived),
      other => Err(PlanError::Validation(format!("Estado de proyecto desconocido: {}", other))),
    }
  }
}

impl Default for ProjectStatus {
  fn default() -> Self {
    ProjectStatus::Planning
  }
}

impl fmt::Display for ProjectStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Proyecto: raíz de propiedad de todos los pasos y prompts que contiene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
  pub id: Uuid,
  pub user_id: Uuid,
  pub name: String,
  pub description: String,
  pub tech_stack: TechStack,
  pub status: ProjectStatus,
  pub is_template: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Datos de entrada para crear un proyecto.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProject {
  pub name: String,
  pub description: String,
  pub tech_stack: TechStack,
  pub status: Option<ProjectStatus>,
}

/// Patch de actualización parcial: sólo los campos presentes se aplican.
/// El flag `is_template` no es mutable por patch; sólo el clonador lo asigna.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectPatch {
  pub name: Option<String>,
  pub description: Option<String>,
  pub tech_stack: Option<TechStack>,
  pub status: Option<ProjectStatus>,
}

impl Project {
  /// Construye un proyecto nuevo validando los campos requeridos. El id y
  /// los timestamps se generan aquí; la persistencia sólo inserta la fila.
  pub fn create(user_id: Uuid, input: NewProject) -> Result<Self> {
    if input.name.trim().is_empty() {
      return Err(PlanError::Validation("El nombre del proyecto no puede estar vacío".to_string()));
    }
    if input.description.trim().is_empty() {
      return Err(PlanError::Validation("La descripción del proyecto no puede estar vacía".to_string()));
    }
    let now = Utc::now();
    Ok(Self { id: Uuid::new_v4(),
              user_id,
              name: input.name,
              description: input.description,
              tech_stack: input.tech_stack,
              status: input.status.unwrap_or_default(),
              is_template: false,
              created_at: now,
              updated_at: now })
  }

  /// Aplica un patch campo a campo (sólo los presentes) y refresca
  /// `updated_at`.
  pub fn apply_patch(&mut self, patch: ProjectPatch) -> Result<()> {
    if let Some(name) = patch.name {
      if name.trim().is_empty() {
        return Err(PlanError::Validation("El nombre del proyecto no puede estar vacío".to_string()));
      }
      self.name = name;
    }
    if let Some(description) = patch.description {
      self.description = description;
    }
    if let Some(tech_stack) = patch.tech_stack {
      self.tech_stack = tech_stack;
    }
    if let Some(status) = patch.status {
      self.status = status;
    }
    self.updated_at = Utc::now();
    Ok(())
  }
}

impl fmt::Display for Project {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f,
           "Project(id: {}, name: {}, status: {}, template: {})",
           self.id, self.name, self.status, self.is_template)
  }
}

/// Filtro de listado de proyectos: búsqueda por subcadena del nombre,
/// filtro por estado y paginación 1-based.
#[derive(Debug, Clone)]
pub struct ProjectFilter {
  pub search: Option<String>,
  pub status: Option<ProjectStatus>,
  pub page: i64,
  pub page_size: i64,
}

impl Default for ProjectFilter {
  fn default() -> Self {
    Self { search: None, status: None, page: 1, page_size: 10 }
  }
}

/// Página de resultados con el total sin paginar.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectPage {
  pub total: i64,
  pub items: Vec<Project>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn stack() -> TechStack {
    let mut ts = TechStack::new();
    ts.insert("backend".into(), vec!["Axum".into(), "Diesel".into()]);
    ts
  }

  #[test]
  fn create_validates_required_fields() {
    let user = Uuid::new_v4();
    let err = Project::create(user, NewProject { name: "  ".into(), description: "d".into(), ..Default::default() });
    assert!(matches!(err, Err(PlanError::Validation(_))));
    let err = Project::create(user, NewProject { name: "p".into(), description: "".into(), ..Default::default() });
    assert!(matches!(err, Err(PlanError::Validation(_))));
  }

  #[test]
  fn create_defaults_to_planning_and_not_template() -> Result<()> {
    let p = Project::create(Uuid::new_v4(),
                            NewProject { name: "Demo".into(),
                                         description: "demo".into(),
                                         tech_stack: stack(),
                                         status: None })?;
    assert_eq!(p.status, ProjectStatus::Planning);
    assert!(!p.is_template);
    Ok(())
  }

  #[test]
  fn patch_applies_only_present_fields() -> Result<()> {
    let mut p = Project::create(Uuid::new_v4(),
                                NewProject { name: "Demo".into(),
                                             description: "demo".into(),
                                             tech_stack: stack(),
                                             status: None })?;
    p.apply_patch(ProjectPatch { status: Some(ProjectStatus::InProgress), ..Default::default() })?;
    assert_eq!(p.name, "Demo");
    assert_eq!(p.status, ProjectStatus::InProgress);
    Ok(())
  }

  #[test]
  fn status_round_trip() -> Result<()> {
    for s in [ProjectStatus::Planning, ProjectStatus::InProgress, ProjectStatus::Completed, ProjectStatus::Archived] {
      assert_eq!(ProjectStatus::parse(s.as_str())?, s);
    }
    assert!(ProjectStatus::parse("paused").is_err());
    Ok(())
  }
}
