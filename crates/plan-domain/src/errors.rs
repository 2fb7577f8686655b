// Archivo: errors.rs
// Propósito: definir los errores del dominio y el alias Result<T> usado por
// las APIs del workspace.
use thiserror::Error;
/// Errores comunes del dominio de planes.
///
/// - `NotFound`: entidad ausente o no perteneciente al usuario autenticado.
///   Ambos casos son indistinguibles a propósito: la existencia de datos de
///   otros usuarios nunca se revela.
/// - `Validation`: entrada malformada o campos requeridos ausentes; se
///   detecta antes de cualquier escritura.
/// - `Conflict`: conflicto de concurrencia detectado por el almacenamiento.
/// - `Storage`: error al acceder al almacenamiento externo (pool, BD).
#[derive(Error, Debug, Clone)]
pub enum PlanError {
  /// Entidad no encontrada o no visible para el usuario.
  #[error("No encontrado: {0}")]
  NotFound(String),
  /// Error de validación de campos de entrada.
  #[error("Error de validación: {0}")]
  Validation(String),
  /// Conflicto de concurrencia (lock/versión).
  #[error("Conflicto: {0}")]
  Conflict(String),
  /// Error genérico de almacenamiento (BD, pool, serialización).
  #[error("Error de almacenamiento: {0}")]
  Storage(String),
}

impl From<serde_json::Error> for PlanError {
  fn from(e: serde_json::Error) -> Self {
    Self::Storage(format!("serialización: {}", e))
  }
}

/// Alias de resultado usado por las APIs del workspace.
pub type Result<T> = std::result::Result<T, PlanError>;
