// Archivo: repository.rs
// Propósito: definir el trait `PlanRepository`, el contrato que deben
// implementar las persistencias (Diesel, in-memory, etc.). Toda operación
// recibe el `user_id` autenticado y resuelve la propiedad transitivamente a
// través del proyecto; "no existe" y "no es tuyo" son indistinguibles.
use plan_domain::{CloneMode, NewProject, NewPrompt, NewStep, OrderAssignment, Project, ProjectFilter, ProjectPage,
                  ProjectPatch, Prompt, PromptPatch, Result, Step, StepPatch};
use uuid::Uuid;

/// Contrato del repositorio de planes.
///
/// Las operaciones compuestas (append con asignación de orden, cierre de
/// hueco al borrar, reordenación, creación de versión, clonado) deben ser
/// atómicas: la implementación concreta las ejecuta dentro de una única
/// transacción y serializa la asignación de orden/versión por grupo de
/// hermanos (ver notas de concurrencia en cada método).
pub trait PlanRepository: Send + Sync {
    // ------------------------------------------------------------------
    // Proyectos
    // ------------------------------------------------------------------

    /// Crea un proyecto para el usuario. Valida campos antes de escribir.
    fn create_project(&self, user_id: &Uuid, input: NewProject) -> Result<Project>;

    /// Recupera un proyecto del usuario, o `NotFound`.
    fn get_project(&self, user_id: &Uuid, project_id: &Uuid) -> Result<Project>;

    /// Lista paginada de proyectos del usuario, con búsqueda opcional por
    /// subcadena del nombre y filtro por estado. Devuelve el total sin
    /// paginar junto a la página pedida.
    fn list_projects(&self, user_id: &Uuid, filter: &ProjectFilter) -> Result<ProjectPage>;

    /// Lista los proyectos plantilla del usuario.
    fn list_templates(&self, user_id: &Uuid) -> Result<Vec<Project>>;

    /// Aplica un patch parcial al proyecto (sólo campos presentes).
    fn update_project(&self, user_id: &Uuid, project_id: &Uuid, patch: ProjectPatch) -> Result<Project>;

    /// Elimina el proyecto y cascada sobre todos sus pasos y prompts.
    fn delete_project(&self, user_id: &Uuid, project_id: &Uuid) -> Result<()>;

    // ------------------------------------------------------------------
    // Pasos (motor de ordenación: grupo de hermanos = proyecto)
    // ------------------------------------------------------------------

    /// Crea un paso al final del proyecto: `order = hermanos vivos + 1`,
    /// contado dentro de la misma transacción de escritura para que dos
    /// appends concurrentes no compartan orden.
    fn create_step(&self, user_id: &Uuid, input: NewStep) -> Result<Step>;

    /// Pasos del proyecto en orden ascendente.
    fn steps_for_project(&self, user_id: &Uuid, project_id: &Uuid) -> Result<Vec<Step>>;

    /// Aplica un patch parcial al paso.
    fn update_step(&self, user_id: &Uuid, step_id: &Uuid, patch: StepPatch) -> Result<Step>;

    /// Elimina el paso (cascada sobre sus prompts) y cierra el hueco:
    /// todo hermano con `order` mayor se decrementa en uno, en la misma
    /// transacción.
    fn delete_step(&self, user_id: &Uuid, step_id: &Uuid) -> Result<()>;

    /// Aplica asignaciones (id, orden) sobre los pasos del proyecto en una
    /// transacción. Ids que no pertenecen al proyecto se ignoran en
    /// silencio (semántica best-effort deliberada); no se valida densidad
    /// ni unicidad de los valores asignados. Devuelve el conjunto completo
    /// releído en orden ascendente.
    fn reorder_steps(&self, user_id: &Uuid, project_id: &Uuid, assignments: &[OrderAssignment]) -> Result<Vec<Step>>;

    // ------------------------------------------------------------------
    // Prompts (ordenación por paso + cadena de versiones por slot)
    // ------------------------------------------------------------------

    /// Crea un prompt al final de su grupo de hermanos (mismo
    /// project_id/step_id), con `version = 1`. Si trae `step_id`, el paso
    /// debe existir bajo el mismo proyecto.
    fn create_prompt(&self, user_id: &Uuid, input: NewPrompt) -> Result<Prompt>;

    /// Prompts del paso ordenados por `(order ASC, version DESC)`: orden
    /// estructural primero y, dentro de un mismo slot, la versión más
    /// nueva antes.
    fn prompts_for_step(&self, user_id: &Uuid, step_id: &Uuid) -> Result<Vec<Prompt>>;

    /// Aplica un patch parcial al prompt (incluida la respuesta post-hoc).
    fn update_prompt(&self, user_id: &Uuid, prompt_id: &Uuid, patch: PromptPatch) -> Result<Prompt>;

    /// Elimina el prompt y cierra el hueco de orden entre sus hermanos de
    /// slot (misma política que los pasos).
    fn delete_prompt(&self, user_id: &Uuid, prompt_id: &Uuid) -> Result<()>;

    /// Reordenación best-effort de los prompts de un paso; misma semántica
    /// que `reorder_steps`.
    fn reorder_prompts(&self, user_id: &Uuid, step_id: &Uuid, assignments: &[OrderAssignment]) -> Result<Vec<Prompt>>;

    // ------------------------------------------------------------------
    // Cadena de versiones
    // ------------------------------------------------------------------

    /// Crea la siguiente versión del slot del prompt: nueva fila con
    /// `version = filas vivas del slot + 1` (contadas en la transacción),
    /// campos del patch con fallback al original cuando vienen vacíos o
    /// ausentes. La fila original no se muta jamás.
    fn create_prompt_version(&self, user_id: &Uuid, prompt_id: &Uuid, patch: PromptPatch) -> Result<Prompt>;

    /// Todas las filas del slot del prompt, por versión descendente.
    fn prompt_versions(&self, user_id: &Uuid, prompt_id: &Uuid) -> Result<Vec<Prompt>>;

    // ------------------------------------------------------------------
    // Clonador estructural y exportación
    // ------------------------------------------------------------------

    /// Copia profunda del subárbol del proyecto (pasos → prompts) según el
    /// modo. Una única transacción: si la comprobación de propiedad (o de
    /// plantilla, para InstantiateFromTemplate) falla, no se crea ninguna
    /// fila hija. Devuelve el proyecto nuevo.
    fn clone_project(&self, user_id: &Uuid, project_id: &Uuid, mode: CloneMode) -> Result<Project>;

    /// Lee el subárbol completo para exportar: pasos en orden ascendente y
    /// los prompts de cada paso en orden de inserción del slot.
    fn project_tree(&self, user_id: &Uuid, project_id: &Uuid) -> Result<(Project, Vec<(Step, Vec<Prompt>)>)>;
}
