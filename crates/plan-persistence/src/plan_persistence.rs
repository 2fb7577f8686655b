use crate::schema;
use crate::schema::project_prompts::dsl as prompts_dsl;
use crate::schema::project_steps::dsl as steps_dsl;
use crate::schema::projects::dsl as projects_dsl;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::Error as DieselError;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use plan_domain::{CloneMode, NewProject, NewPrompt, NewStep, OrderAssignment, PlanError, Project, ProjectFilter,
                  ProjectPage, ProjectPatch, ProjectStatus, Prompt, PromptPatch, Step, StepPatch};
use plan_engine::PlanRepository;
use std::sync::Arc;
use uuid::Uuid;
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");
#[cfg(all(feature = "pg", not(test)))]
type DbPool = Pool<ConnectionManager<PgConnection>>;
#[cfg(any(test, not(feature = "pg")))]
type DbPool = Pool<ConnectionManager<SqliteConnection>>;
#[cfg(all(feature = "pg", not(test)))]
type DbConn = PgConnection;
#[cfg(any(test, not(feature = "pg")))]
type DbConn = SqliteConnection;
/// Repo Diesel que implementa `PlanRepository`.
pub struct DieselPlanRepository {
  pool: Arc<DbPool>,
}
impl DieselPlanRepository {
  pub fn new(database_url: &str) -> Self {
    #[cfg(any(test, not(feature = "pg")))]
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    #[cfg(all(feature = "pg", not(test)))]
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder().max_size(4).build(manager).expect("no se pudo crear el pool de conexiones");
    let repo = DieselPlanRepository { pool: Arc::new(pool) };
    if let Ok(mut c) = repo.conn_raw() {
      let _ = diesel::sql_query("PRAGMA journal_mode = WAL;").execute(&mut c);
      let _ = diesel::sql_query("PRAGMA busy_timeout = 5000;").execute(&mut c);
      let _ = c.run_pending_migrations(MIGRATIONS);
      log::debug!("plan-persistence: migraciones aplicadas");
    }
    repo
  }
  fn conn_raw(&self) -> std::result::Result<PooledConnection<ConnectionManager<DbConn>>, r2d2::Error> {
    // Note: when built with pg feature this will be adjusted by cfg above
    self.pool.get()
  }
  fn conn(&self) -> Result<PooledConnection<ConnectionManager<DbConn>>, PlanError> {
    self.conn_raw().map_err(|e| PlanError::Storage(format!("pool: {}", e)))
  }
}
// Diesel row structs for the plan tables
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::projects)]
struct ProjectRow {
  pub id: String,
  pub user_id: String,
  pub name: String,
  pub description: String,
  pub tech_stack: String,
  pub status: String,
  pub is_template: bool,
  pub created_at_ts: i64,
  pub updated_at_ts: i64,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::project_steps)]
struct StepRow {
  pub id: String,
  pub project_id: String,
  pub title: String,
  pub description: String,
  pub order: i32,
  pub is_completed: bool,
  pub expected_output: Option<String>,
  pub actual_output: Option<String>,
  pub notes: Option<String>,
  pub created_at_ts: i64,
  pub updated_at_ts: i64,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::project_prompts)]
struct PromptRow {
  pub id: String,
  pub project_id: String,
  pub step_id: Option<String>,
  pub title: String,
  pub content: String,
  pub response: Option<String>,
  pub variables: String,
  pub version: i32,
  pub order: i32,
  pub is_template: bool,
  pub created_at_ts: i64,
  pub updated_at_ts: i64,
}
fn map_db_err<T>(res: std::result::Result<T, DieselError>) -> Result<T, PlanError> {
  res.map_err(|e| PlanError::Storage(format!("db: {}", e)))
}
/// Error interno de las transacciones: desacopla los tipos de error de
/// Diesel y del dominio dentro del closure transaccional (un rollback se
/// dispara con cualquiera de los dos).
enum TxError {
  Db(DieselError),
  Plan(PlanError),
}
impl From<DieselError> for TxError {
  fn from(e: DieselError) -> Self {
    TxError::Db(e)
  }
}
impl From<PlanError> for TxError {
  fn from(e: PlanError) -> Self {
    TxError::Plan(e)
  }
}
impl TxError {
  fn into_plan(self) -> PlanError {
    match self {
      TxError::Db(e) => PlanError::Storage(format!("db: {}", e)),
      TxError::Plan(e) => e,
    }
  }
}
/// Ejecuta `f` dentro de una transacción de escritura. En SQLite se usa
/// `immediate_transaction`: toma el write-lock al entrar, de modo que los
/// counts de orden/versión quedan serializados frente a appends
/// concurrentes. En Postgres la serialización la da el `FOR UPDATE` sobre
/// la fila del proyecto (ver `lock_project_row`).
#[cfg(any(test, not(feature = "pg")))]
fn write_tx<T, F>(conn: &mut DbConn, f: F) -> Result<T, PlanError>
  where F: FnOnce(&mut DbConn) -> std::result::Result<T, TxError>
{
  conn.immediate_transaction(f).map_err(TxError::into_plan)
}
#[cfg(all(feature = "pg", not(test)))]
fn write_tx<T, F>(conn: &mut DbConn, f: F) -> Result<T, PlanError>
  where F: FnOnce(&mut DbConn) -> std::result::Result<T, TxError>
{
  conn.transaction(f).map_err(TxError::into_plan)
}
/// Lock de fila sobre el proyecto padre para serializar la asignación de
/// orden/versión por grupo de hermanos.
#[cfg(all(feature = "pg", not(test)))]
fn lock_project_row(conn: &mut DbConn, project_id: &str) -> std::result::Result<(), TxError> {
  diesel::sql_query("SELECT id FROM projects WHERE id = $1 FOR UPDATE").bind::<diesel::sql_types::Text, _>(project_id)
                                                                       .execute(conn)?;
  Ok(())
}
#[cfg(any(test, not(feature = "pg")))]
fn lock_project_row(_conn: &mut DbConn, _project_id: &str) -> std::result::Result<(), TxError> {
  // SQLite: immediate_transaction ya serializa a los escritores
  Ok(())
}
fn parse_uuid(s: &str) -> Result<Uuid, PlanError> {
  Uuid::parse_str(s).map_err(|e| PlanError::Storage(format!("uuid inválido: {}", e)))
}
fn ts_to_datetime(ts: i64) -> DateTime<Utc> {
  DateTime::from_timestamp_micros(ts).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
fn project_from_row(r: ProjectRow) -> Result<Project, PlanError> {
  Ok(Project { id: parse_uuid(&r.id)?,
               user_id: parse_uuid(&r.user_id)?,
               name: r.name,
               description: r.description,
               tech_stack: serde_json::from_str(&r.tech_stack).unwrap_or_default(),
               status: ProjectStatus::parse(&r.status).unwrap_or_default(),
               is_template: r.is_template,
               created_at: ts_to_datetime(r.created_at_ts),
               updated_at: ts_to_datetime(r.updated_at_ts) })
}
fn row_from_project(p: &Project) -> ProjectRow {
  ProjectRow { id: p.id.to_string(),
               user_id: p.user_id.to_string(),
               name: p.name.clone(),
               description: p.description.clone(),
               tech_stack: serde_json::to_string(&p.tech_stack).unwrap_or_else(|_| "{}".into()),
               status: p.status.as_str().to_string(),
               is_template: p.is_template,
               created_at_ts: p.created_at.timestamp_micros(),
               updated_at_ts: p.updated_at.timestamp_micros() }
}
fn step_from_row(r: StepRow) -> Result<Step, PlanError> {
  Ok(Step { id: parse_uuid(&r.id)?,
            project_id: parse_uuid(&r.project_id)?,
            title: r.title,
            description: r.description,
            order: r.order,
            is_completed: r.is_completed,
            expected_output: r.expected_output,
            actual_output: r.actual_output,
            notes: r.notes,
            created_at: ts_to_datetime(r.created_at_ts),
            updated_at: ts_to_datetime(r.updated_at_ts) })
}
fn row_from_step(s: &Step) -> StepRow {
  StepRow { id: s.id.to_string(),
            project_id: s.project_id.to_string(),
            title: s.title.clone(),
            description: s.description.clone(),
            order: s.order,
            is_completed: s.is_completed,
            expected_output: s.expected_output.clone(),
            actual_output: s.actual_output.clone(),
            notes: s.notes.clone(),
            created_at_ts: s.created_at.timestamp_micros(),
            updated_at_ts: s.updated_at.timestamp_micros() }
}
fn prompt_from_row(r: PromptRow) -> Result<Prompt, PlanError> {
  let step_id = match r.step_id {
    Some(s) => Some(parse_uuid(&s)?),
    None => None,
  };
  Ok(Prompt { id: parse_uuid(&r.id)?,
              project_id: parse_uuid(&r.project_id)?,
              step_id,
              title: r.title,
              content: r.content,
              response: r.response,
              variables: serde_json::from_str(&r.variables).unwrap_or_default(),
              version: r.version,
              order: r.order,
              is_template: r.is_template,
              created_at: ts_to_datetime(r.created_at_ts),
              updated_at: ts_to_datetime(r.updated_at_ts) })
}
fn row_from_prompt(p: &Prompt) -> PromptRow {
  PromptRow { id: p.id.to_string(),
              project_id: p.project_id.to_string(),
              step_id: p.step_id.map(|s| s.to_string()),
              title: p.title.clone(),
              content: p.content.clone(),
              response: p.response.clone(),
              variables: serde_json::to_string(&p.variables).unwrap_or_else(|_| "{}".into()),
              version: p.version,
              order: p.order,
              is_template: p.is_template,
              created_at_ts: p.created_at.timestamp_micros(),
              updated_at_ts: p.updated_at.timestamp_micros() }
}
/// Carga el proyecto comprobando la propiedad: ausencia y propiedad ajena
/// son ambas `NotFound` (no se revela la existencia de datos de otros).
fn project_owned(conn: &mut DbConn, user_id: &Uuid, project_id: &Uuid) -> Result<ProjectRow, PlanError> {
  let opt = map_db_err(projects_dsl::projects.filter(projects_dsl::id.eq(project_id.to_string()))
                                             .filter(projects_dsl::user_id.eq(user_id.to_string()))
                                             .first::<ProjectRow>(conn)
                                             .optional())?;
  opt.ok_or_else(|| PlanError::NotFound(format!("project {}", project_id)))
}
fn step_owned(conn: &mut DbConn, user_id: &Uuid, step_id: &Uuid) -> Result<StepRow, PlanError> {
  let opt = map_db_err(steps_dsl::project_steps.filter(steps_dsl::id.eq(step_id.to_string()))
                                               .first::<StepRow>(conn)
                                               .optional())?;
  let row = opt.ok_or_else(|| PlanError::NotFound(format!("step {}", step_id)))?;
  let project_id = parse_uuid(&row.project_id)?;
  project_owned(conn, user_id, &project_id).map_err(|e| match e {
                                             PlanError::NotFound(_) => PlanError::NotFound(format!("step {}", step_id)),
                                             other => other,
                                           })?;
  Ok(row)
}
fn prompt_owned(conn: &mut DbConn, user_id: &Uuid, prompt_id: &Uuid) -> Result<PromptRow, PlanError> {
  let opt = map_db_err(prompts_dsl::project_prompts.filter(prompts_dsl::id.eq(prompt_id.to_string()))
                                                   .first::<PromptRow>(conn)
                                                   .optional())?;
  let row = opt.ok_or_else(|| PlanError::NotFound(format!("prompt {}", prompt_id)))?;
  let project_id = parse_uuid(&row.project_id)?;
  project_owned(conn, user_id, &project_id).map_err(|e| match e {
                                             PlanError::NotFound(_) => {
                                               PlanError::NotFound(format!("prompt {}", prompt_id))
                                             }
                                             other => other,
                                           })?;
  Ok(row)
}
/// Número de filas vivas del slot (project_id, step_id): hermanos de orden
/// del prompt y, a la vez, longitud de su cadena de versiones.
fn slot_count(conn: &mut DbConn, project_id: &str, step_id: &Option<String>) -> Result<i64, PlanError> {
  let res = match step_id {
    Some(sid) => prompts_dsl::project_prompts.filter(prompts_dsl::project_id.eq(project_id))
                                             .filter(prompts_dsl::step_id.eq(sid))
                                             .count()
                                             .get_result::<i64>(conn),
    None => prompts_dsl::project_prompts.filter(prompts_dsl::project_id.eq(project_id))
                                        .filter(prompts_dsl::step_id.is_null())
                                        .count()
                                        .get_result::<i64>(conn),
  };
  map_db_err(res)
}
fn load_slot_rows(conn: &mut DbConn, project_id: &str, step_id: &Option<String>) -> Result<Vec<PromptRow>, PlanError> {
  let res = match step_id {
    Some(sid) => prompts_dsl::project_prompts.filter(prompts_dsl::project_id.eq(project_id))
                                             .filter(prompts_dsl::step_id.eq(sid))
                                             .order(prompts_dsl::version.desc())
                                             .load::<PromptRow>(conn),
    None => prompts_dsl::project_prompts.filter(prompts_dsl::project_id.eq(project_id))
                                        .filter(prompts_dsl::step_id.is_null())
                                        .order(prompts_dsl::version.desc())
                                        .load::<PromptRow>(conn),
  };
  map_db_err(res)
}
impl PlanRepository for DieselPlanRepository {
  fn create_project(&self, user_id: &Uuid, input: NewProject) -> Result<Project, PlanError> {
    let project = Project::create(*user_id, input)?;
    let mut conn = self.conn()?;
    let row = row_from_project(&project);
    map_db_err(diesel::insert_into(schema::projects::table).values(&row).execute(&mut conn))?;
    Ok(project)
  }
  fn get_project(&self, user_id: &Uuid, project_id: &Uuid) -> Result<Project, PlanError> {
    let mut conn = self.conn()?;
    project_from_row(project_owned(&mut conn, user_id, project_id)?)
  }
  fn list_projects(&self, user_id: &Uuid, filter: &ProjectFilter) -> Result<ProjectPage, PlanError> {
    let mut conn = self.conn()?;
    // Se filtra en memoria sobre los proyectos del usuario: mantiene la
    // búsqueda case-insensitive idéntica entre SQLite y Postgres.
    let rows = map_db_err(projects_dsl::projects.filter(projects_dsl::user_id.eq(user_id.to_string()))
                                                .order(projects_dsl::created_at_ts.asc())
                                                .load::<ProjectRow>(&mut conn))?;
    let needle = filter.search.as_ref().map(|s| s.to_lowercase());
    let mut matches = Vec::new();
    for row in rows {
      let project = project_from_row(row)?;
      if let Some(n) = &needle {
        if !project.name.to_lowercase().contains(n) {
          continue;
        }
      }
      if let Some(status) = filter.status {
        if project.status != status {
          continue;
        }
      }
      matches.push(project);
    }
    let total = matches.len() as i64;
    let offset = (filter.page.max(1) - 1) * filter.page_size;
    let items = matches.into_iter().skip(offset.max(0) as usize).take(filter.page_size.max(0) as usize).collect();
    Ok(ProjectPage { total, items })
  }
  fn list_templates(&self, user_id: &Uuid) -> Result<Vec<Project>, PlanError> {
    let mut conn = self.conn()?;
    let rows = map_db_err(projects_dsl::projects.filter(projects_dsl::user_id.eq(user_id.to_string()))
                                                .filter(projects_dsl::is_template.eq(true))
                                                .order(projects_dsl::created_at_ts.asc())
                                                .load::<ProjectRow>(&mut conn))?;
    rows.into_iter().map(project_from_row).collect()
  }
  fn update_project(&self, user_id: &Uuid, project_id: &Uuid, patch: ProjectPatch) -> Result<Project, PlanError> {
    let mut conn = self.conn()?;
    write_tx(&mut conn, |conn| {
      let mut project = project_from_row(project_owned(conn, user_id, project_id)?)?;
      project.apply_patch(patch)?;
      diesel::update(projects_dsl::projects.filter(projects_dsl::id.eq(project_id.to_string())))
        .set((projects_dsl::name.eq(project.name.clone()),
              projects_dsl::description.eq(project.description.clone()),
              projects_dsl::tech_stack.eq(serde_json::to_string(&project.tech_stack).unwrap_or_else(|_| "{}".into())),
              projects_dsl::status.eq(project.status.as_str()),
              projects_dsl::updated_at_ts.eq(project.updated_at.timestamp_micros())))
        .execute(conn)?;
      Ok(project)
    })
  }
  fn delete_project(&self, user_id: &Uuid, project_id: &Uuid) -> Result<(), PlanError> {
    let mut conn = self.conn()?;
    write_tx(&mut conn, |conn| {
      project_owned(conn, user_id, project_id)?;
      let id_s = project_id.to_string();
      // cascada explícita hijo-primero: prompts, pasos, proyecto
      diesel::delete(prompts_dsl::project_prompts.filter(prompts_dsl::project_id.eq(&id_s))).execute(conn)?;
      diesel::delete(steps_dsl::project_steps.filter(steps_dsl::project_id.eq(&id_s))).execute(conn)?;
      diesel::delete(projects_dsl::projects.filter(projects_dsl::id.eq(&id_s))).execute(conn)?;
      log::debug!("plan-persistence: proyecto {} eliminado en cascada", id_s);
      Ok(())
    })
  }
  fn create_step(&self, user_id: &Uuid, input: NewStep) -> Result<Step, PlanError> {
    let mut conn = self.conn()?;
    write_tx(&mut conn, |conn| {
      project_owned(conn, user_id, &input.project_id)?;
      lock_project_row(conn, &input.project_id.to_string())?;
      // count de hermanos vivos dentro de la transacción serializada: dos
      // appends concurrentes no pueden observar el mismo count
      let count: i64 = steps_dsl::project_steps.filter(steps_dsl::project_id.eq(input.project_id.to_string()))
                                               .count()
                                               .get_result(conn)?;
      let step = Step::create(input, count as i32 + 1)?;
      diesel::insert_into(schema::project_steps::table).values(&row_from_step(&step)).execute(conn)?;
      Ok(step)
    })
  }
  fn steps_for_project(&self, user_id: &Uuid, project_id: &Uuid) -> Result<Vec<Step>, PlanError> {
    let mut conn = self.conn()?;
    project_owned(&mut conn, user_id, project_id)?;
    let rows = map_db_err(steps_dsl::project_steps.filter(steps_dsl::project_id.eq(project_id.to_string()))
                                                  .order(steps_dsl::order.asc())
                                                  .load::<StepRow>(&mut conn))?;
    rows.into_iter().map(step_from_row).collect()
  }
  fn update_step(&self, user_id: &Uuid, step_id: &Uuid, patch: StepPatch) -> Result<Step, PlanError> {
    let mut conn = self.conn()?;
    write_tx(&mut conn, |conn| {
      let mut step = step_from_row(step_owned(conn, user_id, step_id)?)?;
      step.apply_patch(patch)?;
      diesel::update(steps_dsl::project_steps.filter(steps_dsl::id.eq(step_id.to_string())))
        .set((steps_dsl::title.eq(step.title.clone()),
              steps_dsl::description.eq(step.description.clone()),
              steps_dsl::order.eq(step.order),
              steps_dsl::is_completed.eq(step.is_completed),
              steps_dsl::expected_output.eq(step.expected_output.clone()),
              steps_dsl::actual_output.eq(step.actual_output.clone()),
              steps_dsl::notes.eq(step.notes.clone()),
              steps_dsl::updated_at_ts.eq(step.updated_at.timestamp_micros())))
        .execute(conn)?;
      Ok(step)
    })
  }
  fn delete_step(&self, user_id: &Uuid, step_id: &Uuid) -> Result<(), PlanError> {
    let mut conn = self.conn()?;
    write_tx(&mut conn, |conn| {
      let row = step_owned(conn, user_id, step_id)?;
      let id_s = step_id.to_string();
      // cascada sobre los prompts del paso (nunca quedan huérfanos)
      diesel::delete(prompts_dsl::project_prompts.filter(prompts_dsl::step_id.eq(&id_s))).execute(conn)?;
      diesel::delete(steps_dsl::project_steps.filter(steps_dsl::id.eq(&id_s))).execute(conn)?;
      // cierre de hueco: los hermanos posteriores bajan una posición
      diesel::update(steps_dsl::project_steps.filter(steps_dsl::project_id.eq(&row.project_id))
                                             .filter(steps_dsl::order.gt(row.order)))
        .set(steps_dsl::order.eq(steps_dsl::order - 1))
        .execute(conn)?;
      Ok(())
    })
  }
  fn reorder_steps(&self,
                   user_id: &Uuid,
                   project_id: &Uuid,
                   assignments: &[OrderAssignment])
                   -> Result<Vec<Step>, PlanError> {
    let mut conn = self.conn()?;
    let rows = write_tx(&mut conn, |conn| {
      project_owned(conn, user_id, project_id)?;
      let pid = project_id.to_string();
      let now = Utc::now().timestamp_micros();
      for assignment in assignments {
        // ids ajenos al proyecto afectan 0 filas: se ignoran en silencio
        diesel::update(steps_dsl::project_steps.filter(steps_dsl::id.eq(assignment.id.to_string()))
                                               .filter(steps_dsl::project_id.eq(&pid)))
          .set((steps_dsl::order.eq(assignment.order), steps_dsl::updated_at_ts.eq(now)))
          .execute(conn)?;
      }
      let rows = steps_dsl::project_steps.filter(steps_dsl::project_id.eq(&pid))
                                         .order(steps_dsl::order.asc())
                                         .load::<StepRow>(conn)?;
      Ok(rows)
    })?;
    rows.into_iter().map(step_from_row).collect()
  }
  fn create_prompt(&self, user_id: &Uuid, input: NewPrompt) -> Result<Prompt, PlanError> {
    let mut conn = self.conn()?;
    write_tx(&mut conn, |conn| {
      project_owned(conn, user_id, &input.project_id)?;
      lock_project_row(conn, &input.project_id.to_string())?;
      if let Some(step_id) = input.step_id {
        let exists = steps_dsl::project_steps.filter(steps_dsl::id.eq(step_id.to_string()))
                                             .filter(steps_dsl::project_id.eq(input.project_id.to_string()))
                                             .first::<StepRow>(conn)
                                             .optional()?;
        if exists.is_none() {
          return Err(PlanError::NotFound(format!("step {}", step_id)).into());
        }
      }
      let step_s = input.step_id.map(|s| s.to_string());
      let count = slot_count(conn, &input.project_id.to_string(), &step_s)?;
      let prompt = Prompt::create(input, count as i32 + 1)?;
      diesel::insert_into(schema::project_prompts::table).values(&row_from_prompt(&prompt)).execute(conn)?;
      Ok(prompt)
    })
  }
  fn prompts_for_step(&self, user_id: &Uuid, step_id: &Uuid) -> Result<Vec<Prompt>, PlanError> {
    let mut conn = self.conn()?;
    step_owned(&mut conn, user_id, step_id)?;
    // doble clave: orden estructural ascendente y, dentro de un slot, la
    // versión más nueva primero
    let rows = map_db_err(prompts_dsl::project_prompts.filter(prompts_dsl::step_id.eq(step_id.to_string()))
                                                      .order((prompts_dsl::order.asc(), prompts_dsl::version.desc()))
                                                      .load::<PromptRow>(&mut conn))?;
    rows.into_iter().map(prompt_from_row).collect()
  }
  fn update_prompt(&self, user_id: &Uuid, prompt_id: &Uuid, patch: PromptPatch) -> Result<Prompt, PlanError> {
    let mut conn = self.conn()?;
    write_tx(&mut conn, |conn| {
      let mut prompt = prompt_from_row(prompt_owned(conn, user_id, prompt_id)?)?;
      prompt.apply_patch(patch)?;
      diesel::update(prompts_dsl::project_prompts.filter(prompts_dsl::id.eq(prompt_id.to_string())))
        .set((prompts_dsl::title.eq(prompt.title.clone()),
              prompts_dsl::content.eq(prompt.content.clone()),
              prompts_dsl::response.eq(prompt.response.clone()),
              prompts_dsl::variables.eq(serde_json::to_string(&prompt.variables).unwrap_or_else(|_| "{}".into())),
              prompts_dsl::updated_at_ts.eq(prompt.updated_at.timestamp_micros())))
        .execute(conn)?;
      Ok(prompt)
    })
  }
  fn delete_prompt(&self, user_id: &Uuid, prompt_id: &Uuid) -> Result<(), PlanError> {
    let mut conn = self.conn()?;
    write_tx(&mut conn, |conn| {
      let row = prompt_owned(conn, user_id, prompt_id)?;
      diesel::delete(prompts_dsl::project_prompts.filter(prompts_dsl::id.eq(prompt_id.to_string()))).execute(conn)?;
      // misma política de cierre de hueco que los pasos, sobre el slot
      match &row.step_id {
        Some(sid) => {
          diesel::update(prompts_dsl::project_prompts.filter(prompts_dsl::project_id.eq(&row.project_id))
                                                     .filter(prompts_dsl::step_id.eq(sid))
                                                     .filter(prompts_dsl::order.gt(row.order)))
            .set(prompts_dsl::order.eq(prompts_dsl::order - 1))
            .execute(conn)?;
        }
        None => {
          diesel::update(prompts_dsl::project_prompts.filter(prompts_dsl::project_id.eq(&row.project_id))
                                                     .filter(prompts_dsl::step_id.is_null())
                                                     .filter(prompts_dsl::order.gt(row.order)))
            .set(prompts_dsl::order.eq(prompts_dsl::order - 1))
            .execute(conn)?;
        }
      }
      Ok(())
    })
  }
  fn reorder_prompts(&self,
                     user_id: &Uuid,
                     step_id: &Uuid,
                     assignments: &[OrderAssignment])
                     -> Result<Vec<Prompt>, PlanError> {
    let mut conn = self.conn()?;
    let rows = write_tx(&mut conn, |conn| {
      step_owned(conn, user_id, step_id)?;
      let sid = step_id.to_string();
      let now = Utc::now().timestamp_micros();
      for assignment in assignments {
        diesel::update(prompts_dsl::project_prompts.filter(prompts_dsl::id.eq(assignment.id.to_string()))
                                                   .filter(prompts_dsl::step_id.eq(&sid)))
          .set((prompts_dsl::order.eq(assignment.order), prompts_dsl::updated_at_ts.eq(now)))
          .execute(conn)?;
      }
      let rows = prompts_dsl::project_prompts.filter(prompts_dsl::step_id.eq(&sid))
                                             .order(prompts_dsl::order.asc())
                                             .load::<PromptRow>(conn)?;
      Ok(rows)
    })?;
    rows.into_iter().map(prompt_from_row).collect()
  }
  fn create_prompt_version(&self, user_id: &Uuid, prompt_id: &Uuid, patch: PromptPatch) -> Result<Prompt, PlanError> {
    let mut conn = self.conn()?;
    write_tx(&mut conn, |conn| {
      let original = prompt_from_row(prompt_owned(conn, user_id, prompt_id)?)?;
      lock_project_row(conn, &original.project_id.to_string())?;
      // versión = filas vivas del slot + 1, contadas en la misma
      // transacción que inserta: sin ventana para duplicados
      let step_s = original.step_id.map(|s| s.to_string());
      let count = slot_count(conn, &original.project_id.to_string(), &step_s)?;
      let version = original.next_version(patch, count as i32 + 1);
      diesel::insert_into(schema::project_prompts::table).values(&row_from_prompt(&version)).execute(conn)?;
      Ok(version)
    })
  }
  fn prompt_versions(&self, user_id: &Uuid, prompt_id: &Uuid) -> Result<Vec<Prompt>, PlanError> {
    let mut conn = self.conn()?;
    let row = prompt_owned(&mut conn, user_id, prompt_id)?;
    let rows = load_slot_rows(&mut conn, &row.project_id, &row.step_id)?;
    rows.into_iter().map(prompt_from_row).collect()
  }
  fn clone_project(&self, user_id: &Uuid, project_id: &Uuid, mode: CloneMode) -> Result<Project, PlanError> {
    let mut conn = self.conn()?;
    write_tx(&mut conn, |conn| {
      let source = project_from_row(project_owned(conn, user_id, project_id)?)?;
      let spec = mode.spec();
      if spec.require_template_source && !source.is_template {
        // no revelar que el proyecto existe pero no es plantilla
        return Err(PlanError::NotFound(format!("template {}", project_id)).into());
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
      // la fila del proyecto se inserta antes que cualquier hija para que
      // su id esté disponible como FK
      diesel::insert_into(schema::projects::table).values(&row_from_project(&new_project)).execute(conn)?;
      let src_steps = steps_dsl::project_steps.filter(steps_dsl::project_id.eq(project_id.to_string()))
                                              .order(steps_dsl::order.asc())
                                              .load::<StepRow>(conn)?;
      for src_step in src_steps {
        let new_step_id = Uuid::new_v4();
        let new_step = StepRow { id: new_step_id.to_string(),
                                 project_id: new_project.id.to_string(),
                                 title: src_step.title.clone(),
                                 description: src_step.description.clone(),
                                 order: src_step.order,
                                 is_completed: false,
                                 expected_output: src_step.expected_output.clone(),
                                 actual_output: if spec.carry_outputs { src_step.actual_output.clone() } else { None },
                                 notes: if spec.carry_outputs { src_step.notes.clone() } else { None },
                                 created_at_ts: now.timestamp_micros(),
                                 updated_at_ts: now.timestamp_micros() };
        diesel::insert_into(schema::project_steps::table).values(&new_step).execute(conn)?;
        // prompts del paso en orden de inserción del slot, sin reordenar
        // por `order`
        let src_prompts = prompts_dsl::project_prompts.filter(prompts_dsl::step_id.eq(&src_step.id))
                                                      .order((prompts_dsl::created_at_ts.asc(),
                                                              prompts_dsl::version.asc()))
                                                      .load::<PromptRow>(conn)?;
        for src_prompt in src_prompts {
          let new_prompt = PromptRow { id: Uuid::new_v4().to_string(),
                                       project_id: new_project.id.to_string(),
                                       step_id: Some(new_step_id.to_string()),
                                       title: src_prompt.title.clone(),
                                       content: src_prompt.content.clone(),
                                       response: None,
                                       variables: src_prompt.variables.clone(),
                                       version: 1,
                                       order: src_prompt.order,
                                       is_template: spec.mark_template,
                                       created_at_ts: now.timestamp_micros(),
                                       updated_at_ts: now.timestamp_micros() };
          diesel::insert_into(schema::project_prompts::table).values(&new_prompt).execute(conn)?;
        }
      }
      log::debug!("plan-persistence: proyecto {} clonado como {} ({})", project_id, new_project.id, mode);
      Ok(new_project)
    })
  }
  fn project_tree(&self,
                  user_id: &Uuid,
                  project_id: &Uuid)
                  -> Result<(Project, Vec<(Step, Vec<Prompt>)>), PlanError> {
    let mut conn = self.conn()?;
    let project = project_from_row(project_owned(&mut conn, user_id, project_id)?)?;
    let step_rows = map_db_err(steps_dsl::project_steps.filter(steps_dsl::project_id.eq(project_id.to_string()))
                                                       .order(steps_dsl::order.asc())
                                                       .load::<StepRow>(&mut conn))?;
    let mut tree = Vec::with_capacity(step_rows.len());
    for step_row in step_rows {
      let prompt_rows = map_db_err(prompts_dsl::project_prompts.filter(prompts_dsl::step_id.eq(&step_row.id))
                                                               .order((prompts_dsl::created_at_ts.asc(),
                                                                       prompts_dsl::version.asc()))
                                                               .load::<PromptRow>(&mut conn))?;
      let prompts = prompt_rows.into_iter().map(prompt_from_row).collect::<Result<Vec<Prompt>, PlanError>>()?;
      tree.push((step_from_row(step_row)?, prompts));
    }
    Ok((project, tree))
  }
}
/// Crear repo desde las variables de entorno (o default sqlite in-memory en
/// tests)
pub fn new_plan_repo_from_env() -> Result<DieselPlanRepository, PlanError> {
  dotenvy::dotenv().ok();
  // When compiled with Postgres support prefer PLAN_DB_URL, but allow
  // DATABASE_URL as a fallback.
  if cfg!(all(feature = "pg", not(test))) {
    let url = std::env::var("PLAN_DB_URL").or_else(|_| std::env::var("DATABASE_URL"))
                                          .map_err(|_| PlanError::Storage("PLAN_DB_URL / DATABASE_URL not set".into()))?;
    let l = url.to_lowercase();
    if !(l.starts_with("postgres") || l.starts_with("postgresql://") || url.contains("@")) {
      return Err(PlanError::Storage("PLAN_DB_URL / DATABASE_URL does not look like Postgres URL".into()));
    }
    Ok(DieselPlanRepository::new(&url))
  } else {
    let url = std::env::var("PLAN_DB_URL").or_else(|_| std::env::var("DATABASE_URL"))
                                          .unwrap_or_else(|_| "file:plandb?mode=memory&cache=shared".into());
    Ok(DieselPlanRepository::new(&url))
  }
}
// Provide a canonical `new_from_env` so callers (examples, mains) do not
// need to decide between sqlite/postgres.
#[cfg(all(feature = "pg", not(test)))]
pub fn new_from_env() -> Result<DieselPlanRepository, PlanError> {
  dotenvy::dotenv().ok();
  let url = std::env::var("PLAN_DB_URL").or_else(|_| std::env::var("DATABASE_URL"))
                                        .map_err(|_| PlanError::Storage("PLAN_DB_URL / DATABASE_URL not set".into()))?;
  if !(url.starts_with("postgres") || url.starts_with("postgresql://") || url.contains("@")) {
    return Err(PlanError::Storage("plan-persistence: PLAN_DB_URL does not look like Postgres URL".into()));
  }
  Ok(DieselPlanRepository::new(&url))
}
#[cfg(test)]
pub fn new_from_env() -> Result<DieselPlanRepository, PlanError> {
  dotenvy::dotenv().ok();
  let url = std::env::var("PLAN_DB_URL").unwrap_or_else(|_| "file:planmemdb1?mode=memory&cache=shared".into());
  let repo = DieselPlanRepository::new(&url);
  Ok(repo)
}
#[cfg(all(not(feature = "pg"), not(test)))]
pub fn new_from_env() -> Result<DieselPlanRepository, PlanError> {
  dotenvy::dotenv().ok();
  let url = std::env::var("PLAN_DB_URL").or_else(|_| std::env::var("DATABASE_URL"))
                                        .map_err(|_| PlanError::Storage("PLAN_DB_URL / DATABASE_URL not set".into()))?;
  let url_l = url.to_lowercase();
  if url_l.starts_with("file:") || url_l.contains("mode=memory") || url_l.contains("sqlite") {
    let repo = DieselPlanRepository::new(&url);
    return Ok(repo);
  }
  Err(PlanError::Storage("plan-persistence was compiled without 'pg' feature; enable the 'pg' feature to use Postgres \
                          in production"
                                        .into()))
}
// Test helper: construct a DieselPlanRepository backed by explicit SQLite
// connection manager. This bypasses environment parsing and avoids cases
// where the build or features might cause the ConnectionManager to treat
// the string as Postgres connection info.
#[cfg(not(feature = "pg"))]
pub fn new_sqlite_for_test(database_url: &str) -> DieselPlanRepository {
  use diesel::r2d2::ConnectionManager;
  use diesel::sqlite::SqliteConnection;
  let manager = ConnectionManager::<SqliteConnection>::new(database_url);
  let pool = Pool::builder().max_size(4).build(manager).expect("no se pudo crear el pool de conexiones");
  let repo = DieselPlanRepository { pool: Arc::new(pool) };
  if let Ok(mut c) = repo.conn_raw() {
    let _ = diesel::sql_query("PRAGMA journal_mode = WAL;").execute(&mut c);
    let _ = diesel::sql_query("PRAGMA busy_timeout = 5000;").execute(&mut c);
    let _ = c.run_pending_migrations(MIGRATIONS);
  }
  repo
}
