// Archivo: stubs.rs
// Propósito: implementación en memoria del `PlanRepository` para pruebas y
// wiring rápido. No es durable; se usa en demos y en los tests de los
// motores de ordenación/versionado/clonado.
use crate::repository::PlanRepository;
use plan_domain::{CloneMode, NewProject, NewPrompt, NewStep, OrderAssignment, PlanError, Project, ProjectFilter,
                  ProjectPage, ProjectPatch, ProjectStatus, Prompt, PromptPatch, Result, Step, StepPatch};
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Tablas en memoria. Los `Vec` conservan el orden de inserción, que es el
/// orden de iteración observable por el clonador y el exportador.
#[derive(Default)]
struct PlanState {
    projects: Vec<Project>,
    steps: Vec<Step>,
    prompts: Vec<Prompt>,
}

/// Repositorio en memoria. Un único `Mutex` sobre todas las tablas hace de
/// límite transaccional: cada operación compuesta se ejecuta completa bajo
/// el lock, igual que una transacción del backend real serializa la
/// asignación de orden/versión.
pub struct InMemoryPlanRepository {
    state: Mutex<PlanState>,
}

impl InMemoryPlanRepository {
    /// Crea una nueva instancia vacía.
    pub fn new() -> Self {
        Self { state: Mutex::new(PlanState::default()) }
    }

    /// Helper para mapear `Mutex::lock()` en un `Result` con
    /// `PlanError::Storage`.
    fn lock(&self) -> Result<MutexGuard<'_, PlanState>> {
        self.state.lock().map_err(|e| PlanError::Storage(format!("mutex poisoned: {:?}", e)))
    }
}

impl Default for InMemoryPlanRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn project_not_found(id: &Uuid) -> PlanError {
    PlanError::NotFound(format!("project {}", id))
}

fn step_not_found(id: &Uuid) -> PlanError {
    PlanError::NotFound(format!("step {}", id))
}

fn prompt_not_found(id: &Uuid) -> PlanError {
    PlanError::NotFound(format!("prompt {}", id))
}

/// Búsquedas con comprobación de propiedad: el proyecto debe pertenecer al
/// usuario; pasos y prompts resuelven la propiedad a través de su proyecto.
fn find_project(state: &PlanState, user_id: &Uuid, project_id: &Uuid) -> Result<Project> {
    state.projects
         .iter()
         .find(|p| &p.id == project_id && &p.user_id == user_id)
         .cloned()
         .ok_or_else(|| project_not_found(project_id))
}

fn find_step(state: &PlanState, user_id: &Uuid, step_id: &Uuid) -> Result<Step> {
    let step = state.steps.iter().find(|s| &s.id == step_id).cloned().ok_or_else(|| step_not_found(step_id))?;
    find_project(state, user_id, &step.project_id).map_err(|_| step_not_found(step_id))?;
    Ok(step)
}

fn find_prompt(state: &PlanState, user_id: &Uuid, prompt_id: &Uuid) -> Result<Prompt> {
    let prompt = state.prompts.iter().find(|p| &p.id == prompt_id).cloned().ok_or_else(|| prompt_not_found(prompt_id))?;
    find_project(state, user_id, &prompt.project_id).map_err(|_| prompt_not_found(prompt_id))?;
    Ok(prompt)
}

/// Número de filas del slot (project_id, step_id): los hermanos de orden de
/// un prompt y, a la vez, la longitud de su cadena de versiones.
fn slot_count(state: &PlanState, project_id: &Uuid, step_id: &Option<Uuid>) -> i32 {
    state.prompts.iter().filter(|p| &p.project_id == project_id && &p.step_id == step_id).count() as i32
}

impl PlanRepository for InMemoryPlanRepository {
    fn create_project(&self, user_id: &Uuid, input: NewProject) -> Result<Project> {
        let project = Project::create(*user_id, input)?;
        let mut state = self.lock()?;
        state.projects.push(project.clone());
        Ok(project)
    }

    fn get_project(&self, user_id: &Uuid, project_id: &Uuid) -> Result<Project> {
        let state = self.lock()?;
        find_project(&state, user_id, project_id)
    }

    fn list_projects(&self, user_id: &Uuid, filter: &ProjectFilter) -> Result<ProjectPage> {
        let state = self.lock()?;
        let needle = filter.search.as_ref().map(|s| s.to_lowercase());
        let matches: Vec<Project> = state.projects
                                         .iter()
                                         .filter(|p| &p.user_id == user_id)
                                         .filter(|p| match &needle {
                                             Some(n) => p.name.to_lowercase().contains(n),
                                             None => true,
                                         })
                                         .filter(|p| match filter.status {
                                             Some(status) => p.status == status,
                                             None => true,
                                         })
                                         .cloned()
                                         .collect();
        let total = matches.len() as i64;
        let offset = (filter.page.max(1) - 1) * filter.page_size;
        let items = matches.into_iter().skip(offset.max(0) as usize).take(filter.page_size.max(0) as usize).collect();
        Ok(ProjectPage { total, items })
    }

    fn list_templates(&self, user_id: &Uuid) -> Result<Vec<Project>> {
        let state = self.lock()?;
        Ok(state.projects.iter().filter(|p| &p.user_id == user_id && p.is_template).cloned().collect())
    }

    fn update_project(&self, user_id: &Uuid, project_id: &Uuid, patch: ProjectPatch) -> Result<Project> {
        let mut state = self.lock()?;
        // aplicar sobre una copia: si el patch no valida, no queda mutación
        // parcial visible
        let mut project = find_project(&state, user_id, project_id)?;
        project.apply_patch(patch)?;
        let stored = state.projects.iter_mut().find(|p| &p.id == project_id).ok_or_else(|| project_not_found(project_id))?;
        *stored = project.clone();
        Ok(project)
    }

    fn delete_project(&self, user_id: &Uuid, project_id: &Uuid) -> Result<()> {
        let mut state = self.lock()?;
        find_project(&state, user_id, project_id)?;
        // cascada explícita hijo-primero: prompts, pasos, proyecto
        state.prompts.retain(|p| &p.project_id != project_id);
        state.steps.retain(|s| &s.project_id != project_id);
        state.projects.retain(|p| &p.id != project_id);
        Ok(())
    }

    fn create_step(&self, user_id: &Uuid, input: NewStep) -> Result<Step> {
        let mut state = self.lock()?;
        find_project(&state, user_id, &input.project_id)?;
        // count de hermanos vivos bajo el lock: dos appends concurrentes no
        // pueden observar el mismo count
        let count = state.steps.iter().filter(|s| s.project_id == input.project_id).count() as i32;
        let step = Step::create(input, count + 1)?;
        state.steps.push(step.clone());
        Ok(step)
    }

    fn steps_for_project(&self, user_id: &Uuid, project_id: &Uuid) -> Result<Vec<Step>> {
        let state = self.lock()?;
        find_project(&state, user_id, project_id)?;
        let mut steps: Vec<Step> = state.steps.iter().filter(|s| &s.project_id == project_id).cloned().collect();
        steps.sort_by_key(|s| s.order);
        Ok(steps)
    }

    fn update_step(&self, user_id: &Uuid, step_id: &Uuid, patch: StepPatch) -> Result<Step> {
        let mut state = self.lock()?;
        let mut step = find_step(&state, user_id, step_id)?;
        step.apply_patch(patch)?;
        let stored = state.steps.iter_mut().find(|s| &s.id == step_id).ok_or_else(|| step_not_found(step_id))?;
        *stored = step.clone();
        Ok(step)
    }

    fn delete_step(&self, user_id: &Uuid, step_id: &Uuid) -> Result<()> {
        let mut state = self.lock()?;
        let step = find_step(&state, user_id, step_id)?;
        let removed_order = step.order;
        let project_id = step.project_id;
        // cascada sobre los prompts del paso (nunca quedan huérfanos)
        state.prompts.retain(|p| p.step_id != Some(*step_id));
        state.steps.retain(|s| &s.id != step_id);
        // cierre de hueco: los hermanos posteriores bajan una posición
        for s in state.steps.iter_mut().filter(|s| s.project_id == project_id && s.order > removed_order) {
            s.order -= 1;
        }
        Ok(())
    }

    fn reorder_steps(&self, user_id: &Uuid, project_id: &Uuid, assignments: &[OrderAssignment]) -> Result<Vec<Step>> {
        let mut state = self.lock()?;
        find_project(&state, user_id, project_id)?;
        for assignment in assignments {
            // ids ajenos al proyecto se ignoran en silencio (best-effort)
            if let Some(step) = state.steps
                                     .iter_mut()
                                     .find(|s| s.id == assignment.id && &s.project_id == project_id)
            {
                step.order = assignment.order;
                step.updated_at = Utc::now();
            }
        }
        let mut steps: Vec<Step> = state.steps.iter().filter(|s| &s.project_id == project_id).cloned().collect();
        steps.sort_by_key(|s| s.order);
        Ok(steps)
    }

    fn create_prompt(&self, user_id: &Uuid, input: NewPrompt) -> Result<Prompt> {
        let mut state = self.lock()?;
        find_project(&state, user_id, &input.project_id)?;
        if let Some(step_id) = input.step_id {
            let belongs = state.steps.iter().any(|s| s.id == step_id && s.project_id == input.project_id);
            if !belongs {
                return Err(step_not_found(&step_id));
            }
        }
        let count = slot_count(&state, &input.project_id, &input.step_id);
        let prompt = Prompt::create(input, count + 1)?;
        state.prompts.push(prompt.clone());
        Ok(prompt)
    }

    fn prompts_for_step(&self, user_id: &Uuid, step_id: &Uuid) -> Result<Vec<Prompt>> {
        let state = self.lock()?;
        find_step(&state, user_id, step_id)?;
        let mut prompts: Vec<Prompt> = state.prompts.iter().filter(|p| p.step_id == Some(*step_id)).cloned().collect();
        // doble clave: orden estructural ascendente y, a igual slot/orden,
        // la versión más nueva primero
        prompts.sort_by(|a, b| a.order.cmp(&b.order).then(b.version.cmp(&a.version)));
        Ok(prompts)
    }

    fn update_prompt(&self, user_id: &Uuid, prompt_id: &Uuid, patch: PromptPatch) -> Result<Prompt> {
        let mut state = self.lock()?;
        let mut prompt = find_prompt(&state, user_id, prompt_id)?;
        prompt.apply_patch(patch)?;
        let stored = state.prompts.iter_mut().find(|p| &p.id == prompt_id).ok_or_else(|| prompt_not_found(prompt_id))?;
        *stored = prompt.clone();
        Ok(prompt)
    }

    fn delete_prompt(&self, user_id: &Uuid, prompt_id: &Uuid) -> Result<()> {
        let mut state = self.lock()?;
        let prompt = find_prompt(&state, user_id, prompt_id)?;
        state.prompts.retain(|p| &p.id != prompt_id);
        // misma política de cierre de hueco que los pasos
        for p in state.prompts
                      .iter_mut()
                      .filter(|p| p.project_id == prompt.project_id
                                  && p.step_id == prompt.step_id
                                  && p.order > prompt.order)
        {
            p.order -= 1;
        }
        Ok(())
    }

    fn reorder_prompts(&self, user_id: &Uuid, step_id: &Uuid, assignments: &[OrderAssignment]) -> Result<Vec<Prompt>> {
        let mut state = self.lock()?;
        find_step(&state, user_id, step_id)?;
        for assignment in assignments {
            if let Some(prompt) = state.prompts
                                       .iter_mut()
                                       .find(|p| p.id == assignment.id && p.step_id == Some(*step_id))
            {
                prompt.order = assignment.order;
                prompt.updated_at = Utc::now();
            }
        }
        let mut prompts: Vec<Prompt> = state.prompts.iter().filter(|p| p.step_id == Some(*step_id)).cloned().collect();
        prompts.sort_by_key(|p| p.order);
        Ok(prompts)
    }

    fn create_prompt_version(&self, user_id: &Uuid, prompt_id: &Uuid, patch: PromptPatch) -> Result<Prompt> {
        let mut state = self.lock()?;
        let original = find_prompt(&state, user_id, prompt_id)?;
        // versión = filas vivas del slot + 1, contadas bajo el mismo lock
        // que inserta: no hay ventana para versiones duplicadas
        let next = slot_count(&state, &original.project_id, &original.step_id) + 1;
        let version = original.next_version(patch, next);
        state.prompts.push(version.clone());
        Ok(version)
    }

    fn prompt_versions(&self, user_id: &Uuid, prompt_id: &Uuid) -> Result<Vec<Prompt>> {
        let state = self.lock()?;
        let prompt = find_prompt(&state, user_id, prompt_id)?;
        let mut versions: Vec<Prompt> = state.prompts.iter().filter(|p| p.same_slot(&prompt)).cloned().collect();
        versions.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(versions)
    }

    fn clone_project(&self, user_id: &Uuid, project_id: &Uuid, mode: CloneMode) -> Result<Project> {
        let mut state = self.lock()?;
        let source = find_project(&state, user_id, project_id)?;
        let spec = mode.spec();
        if spec.require_template_source && !source.is_template {
            // no revelar que el proyecto existe pero no es plantilla
            return Err(PlanError::NotFound(format!("template {}", project_id)));
        }

        let now = Utc::now();
        let new_project = Project { id: Uuid::new_v4(),
                                    user_id: *user_id,
                                    name: mode.transform_name(&source.name),
                                    description: source.description.clone(),
                                    tech_stack: source.tech_stack.clone(),
                                    status: ProjectStatus::Planning,
                                    is_template: spec.mark_template,
                                    created_at: now,
                                    updated_at: now };

        let mut source_steps: Vec<Step> = state.steps.iter().filter(|s| &s.project_id == project_id).cloned().collect();
        source_steps.sort_by_key(|s| s.order);

        let mut new_steps: Vec<Step> = Vec::with_capacity(source_steps.len());
        let mut new_prompts: Vec<Prompt> = Vec::new();
        for src_step in &source_steps {
            let new_step = Step { id: Uuid::new_v4(),
                                  project_id: new_project.id,
                                  title: src_step.title.clone(),
                                  description: src_step.description.clone(),
                                  order: src_step.order,
                                  is_completed: false,
                                  expected_output: src_step.expected_output.clone(),
                                  actual_output: if spec.carry_outputs { src_step.actual_output.clone() } else { None },
                                  notes: if spec.carry_outputs { src_step.notes.clone() } else { None },
                                  created_at: now,
                                  updated_at: now };
            // prompts del paso en orden de inserción del slot, sin reordenar
            for src_prompt in state.prompts.iter().filter(|p| p.step_id == Some(src_step.id)) {
                new_prompts.push(Prompt { id: Uuid::new_v4(),
                                          project_id: new_project.id,
                                          step_id: Some(new_step.id),
                                          title: src_prompt.title.clone(),
                                          content: src_prompt.content.clone(),
                                          response: None,
                                          variables: src_prompt.variables.clone(),
                                          version: 1,
                                          order: src_prompt.order,
                                          is_template: spec.mark_template,
                                          created_at: now,
                                          updated_at: now });
            }
            new_steps.push(new_step);
        }

        state.projects.push(new_project.clone());
        state.steps.extend(new_steps);
        state.prompts.extend(new_prompts);
        Ok(new_project)
    }

    fn project_tree(&self, user_id: &Uuid, project_id: &Uuid) -> Result<(Project, Vec<(Step, Vec<Prompt>)>)> {
        let state = self.lock()?;
        let project = find_project(&state, user_id, project_id)?;
        let mut steps: Vec<Step> = state.steps.iter().filter(|s| &s.project_id == project_id).cloned().collect();
        steps.sort_by_key(|s| s.order);
        let tree = steps.into_iter()
                        .map(|step| {
                            let prompts: Vec<Prompt> =
                                state.prompts.iter().filter(|p| p.step_id == Some(step.id)).cloned().collect();
                            (step, prompts)
                        })
                        .collect();
        Ok((project, tree))
    }
}
