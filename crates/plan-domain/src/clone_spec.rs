// clone_spec.rs
// Reglas de campo por modo de clonado. Las tres variantes comparten el mismo
// recorrido del árbol; sólo cambian estas reglas, centralizadas aquí para que
// el clonador sea una única operación polimórfica.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Marcador que identifica a un proyecto plantilla en su nombre.
pub const TEMPLATE_MARKER: &str = " (Template)";
/// Marcador añadido al duplicar un proyecto.
pub const COPY_MARKER: &str = " (copy)";

/// Modo de clonado estructural de un proyecto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneMode {
  /// Copia 1:1 para seguir trabajando: conserva salidas reales y notas.
  Duplicate,
  /// Extrae una plantilla reutilizable: marca proyecto y prompts como
  /// plantilla y descarta el estado de ejecución.
  SaveAsTemplate,
  /// Instancia un proyecto de trabajo desde una plantilla existente.
  InstantiateFromTemplate,
}

/// Reglas de arrastre de campos de un modo de clonado.
#[derive(Debug, Clone, Copy)]
pub struct CloneSpec {
  /// Arrastrar `actual_output` y `notes` de cada paso (sólo Duplicate).
  pub carry_outputs: bool,
  /// Marcar proyecto y prompts clonados como plantilla.
  pub mark_template: bool,
  /// El origen debe ser una plantilla (`is_template = true`).
  pub require_template_source: bool,
}

impl CloneMode {
  pub fn spec(&self) -> CloneSpec {
    match self {
      CloneMode::Duplicate => CloneSpec { carry_outputs: true, mark_template: false, require_template_source: false },
      CloneMode::SaveAsTemplate => CloneSpec { carry_outputs: false, mark_template: true, require_template_source: false },
      CloneMode::InstantiateFromTemplate => {
        CloneSpec { carry_outputs: false, mark_template: false, require_template_source: true }
      }
    }
  }

  /// Transforma el nombre del proyecto origen según el modo: Duplicate
  /// añade el marcador de copia, SaveAsTemplate el de plantilla e
  /// InstantiateFromTemplate elimina este último.
  pub fn transform_name(&self, name: &str) -> String {
    match self {
      CloneMode::Duplicate => format!("{}{}", name, COPY_MARKER),
      CloneMode::SaveAsTemplate => format!("{}{}", name, TEMPLATE_MARKER),
      CloneMode::InstantiateFromTemplate => name.replace(TEMPLATE_MARKER, ""),
    }
  }
}

impl fmt::Display for CloneMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      CloneMode::Duplicate => "duplicate",
      CloneMode::SaveAsTemplate => "save_as_template",
      CloneMode::InstantiateFromTemplate => "instantiate_from_template",
    };
    f.write_str(s)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn name_transforms_per_mode() {
    assert_eq!(CloneMode::Duplicate.transform_name("Foo"), "Foo (copy)");
    assert_eq!(CloneMode::SaveAsTemplate.transform_name("Foo"), "Foo (Template)");
    assert_eq!(CloneMode::InstantiateFromTemplate.transform_name("Foo (Template)"), "Foo");
    // sin marcador el nombre queda igual
    assert_eq!(CloneMode::InstantiateFromTemplate.transform_name("Foo"), "Foo");
  }

  #[test]
  fn only_duplicate_carries_outputs() {
    assert!(CloneMode::Duplicate.spec().carry_outputs);
    assert!(!CloneMode::SaveAsTemplate.spec().carry_outputs);
    assert!(!CloneMode::InstantiateFromTemplate.spec().carry_outputs);
  }

  #[test]
  fn only_instantiate_requires_template_source() {
    assert!(!CloneMode::Duplicate.spec().require_template_source);
    assert!(!CloneMode::SaveAsTemplate.spec().require_template_source);
    assert!(CloneMode::InstantiateFromTemplate.spec().require_template_source);
  }
}
