// Archivo: service.rs
// Propósito: implementar `PlanService`, la capa orquestadora que expone las
// operaciones de alto nivel sobre proyectos/pasos/prompts. Esta capa debe
// ser invocada desde handlers HTTP, que le entregan el `user_id` ya
// autenticado por el servicio de identidad.
use crate::repository::PlanRepository;
use plan_domain::{export_document, CloneMode, ExportDocument, NewProject, NewPrompt, NewStep, OrderAssignment, Project,
                  ProjectFilter, ProjectPage, ProjectPatch, Prompt, PromptPatch, Result, Step, StepPatch};
use std::sync::Arc;
use uuid::Uuid;

/// Servicio de alto nivel sobre el repositorio de planes.
///
/// El repositorio concreto (Diesel o in-memory) ya garantiza la atomicidad
/// de las operaciones compuestas; esta capa añade la orquestación que no
/// toca la persistencia, como el serializador de exportación.
pub struct PlanService<R> where R: PlanRepository
{
    repo: Arc<R>,
}

impl<R> PlanService<R> where R: PlanRepository + 'static
{
    /// Crea el servicio inyectando el `PlanRepository`.
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    // --- Proyectos ---

    pub fn create_project(&self, user_id: &Uuid, input: NewProject) -> Result<Project> {
        self.repo.create_project(user_id, input)
    }

    pub fn get_project(&self, user_id: &Uuid, project_id: &Uuid) -> Result<Project> {
        self.repo.get_project(user_id, project_id)
    }

    pub fn list_projects(&self, user_id: &Uuid, filter: &ProjectFilter) -> Result<ProjectPage> {
        self.repo.list_projects(user_id, filter)
    }

    pub fn list_templates(&self, user_id: &Uuid) -> Result<Vec<Project>> {
        self.repo.list_templates(user_id)
    }

    pub fn update_project(&self, user_id: &Uuid, project_id: &Uuid, patch: ProjectPatch) -> Result<Project> {
        self.repo.update_project(user_id, project_id, patch)
    }

    pub fn delete_project(&self, user_id: &Uuid, project_id: &Uuid) -> Result<()> {
        self.repo.delete_project(user_id, project_id)
    }

    // --- Pasos ---

    pub fn create_step(&self, user_id: &Uuid, input: NewStep) -> Result<Step> {
        self.repo.create_step(user_id, input)
    }

    pub fn steps_for_project(&self, user_id: &Uuid, project_id: &Uuid) -> Result<Vec<Step>> {
        self.repo.steps_for_project(user_id, project_id)
    }

    pub fn update_step(&self, user_id: &Uuid, step_id: &Uuid, patch: StepPatch) -> Result<Step> {
        self.repo.update_step(user_id, step_id, patch)
    }

    pub fn delete_step(&self, user_id: &Uuid, step_id: &Uuid) -> Result<()> {
        self.repo.delete_step(user_id, step_id)
    }

    pub fn reorder_steps(&self, user_id: &Uuid, project_id: &Uuid, assignments: &[OrderAssignment]) -> Result<Vec<Step>> {
        self.repo.reorder_steps(user_id, project_id, assignments)
    }

    // --- Prompts y versiones ---

    pub fn create_prompt(&self, user_id: &Uuid, input: NewPrompt) -> Result<Prompt> {
        self.repo.create_prompt(user_id, input)
    }

    pub fn prompts_for_step(&self, user_id: &Uuid, step_id: &Uuid) -> Result<Vec<Prompt>> {
        self.repo.prompts_for_step(user_id, step_id)
    }

    pub fn update_prompt(&self, user_id: &Uuid, prompt_id: &Uuid, patch: PromptPatch) -> Result<Prompt> {
        self.repo.update_prompt(user_id, prompt_id, patch)
    }

    pub fn delete_prompt(&self, user_id: &Uuid, prompt_id: &Uuid) -> Result<()> {
        self.repo.delete_prompt(user_id, prompt_id)
    }

    pub fn reorder_prompts(&self, user_id: &Uuid, step_id: &Uuid, assignments: &[OrderAssignment]) -> Result<Vec<Prompt>> {
        self.repo.reorder_prompts(user_id, step_id, assignments)
    }

    pub fn create_prompt_version(&self, user_id: &Uuid, prompt_id: &Uuid, patch: PromptPatch) -> Result<Prompt> {
        self.repo.create_prompt_version(user_id, prompt_id, patch)
    }

    pub fn prompt_versions(&self, user_id: &Uuid, prompt_id: &Uuid) -> Result<Vec<Prompt>> {
        self.repo.prompt_versions(user_id, prompt_id)
    }

    // --- Clonado y exportación ---

    pub fn clone_project(&self, user_id: &Uuid, project_id: &Uuid, mode: CloneMode) -> Result<Project> {
        self.repo.clone_project(user_id, project_id, mode)
    }

    /// Exporta el proyecto como documento de replay: lee el subárbol del
    /// repositorio (pasos ascendentes, prompts en orden de inserción) y lo
    /// aplana con el serializador puro.
    pub fn export_project(&self, user_id: &Uuid, project_id: &Uuid) -> Result<ExportDocument> {
        let (project, steps) = self.repo.project_tree(user_id, project_id)?;
        Ok(export_document(&project, &steps))
    }
}
