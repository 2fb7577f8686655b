use plan_domain::{CloneMode, NewProject, NewPrompt, NewStep, OrderAssignment, PlanError, PromptPatch, PromptVariables};
use plan_engine::PlanRepository;
use plan_persistence::new_plan_repo_from_env;
use uuid::Uuid;
#[test]
fn diesel_plan_persistence_project_lifecycle() {
  // Use a temporary file-backed SQLite DB for tests to avoid URI parsing
  // options problems with different sqlite builds.
  let tmp_path = std::env::temp_dir().join(format!("plan_test_{}.db", Uuid::new_v4()));
  let db_url = tmp_path.to_str().unwrap().to_string();
  std::env::set_var("PLAN_DB_URL", &db_url);
  // If crate was built with the `pg` feature, skip this sqlite-only test at
  // runtime.
  if cfg!(feature = "pg") {
    eprintln!("skipping sqlite-only persistence test because 'pg' feature is enabled");
    return;
  }
  // Create repo from environment (the PLAN_DB_URL we set above). When
  // compiled without `pg` this will use SQLite.
  let repo = new_plan_repo_from_env().expect("failed to create repo");
  let user = Uuid::new_v4();
  let project = repo.create_project(&user,
                                    NewProject { name: "Foo".into(),
                                                 description: "proyecto de prueba".into(),
                                                 ..Default::default() })
                    .expect("create project");
  // Append de tres pasos: orden denso 1..3
  let mut step_ids = Vec::new();
  for title in ["A", "B", "C"] {
    let step = repo.create_step(&user,
                                NewStep { project_id: project.id,
                                          title: title.into(),
                                          description: format!("paso {}", title),
                                          expected_output: None,
                                          actual_output: None,
                                          notes: None })
                   .expect("create step");
    step_ids.push(step.id);
  }
  let steps = repo.steps_for_project(&user, &project.id).expect("list steps");
  let orders: Vec<i32> = steps.iter().map(|s| s.order).collect();
  assert_eq!(orders, vec![1, 2, 3]);
  // Borrar B cierra el hueco: A=1, C=2
  repo.delete_step(&user, &step_ids[1]).expect("delete step");
  let steps = repo.steps_for_project(&user, &project.id).expect("list steps");
  let pairs: Vec<(String, i32)> = steps.iter().map(|s| (s.title.clone(), s.order)).collect();
  assert_eq!(pairs, vec![("A".into(), 1), ("C".into(), 2)]);
  // Prompt con dos versiones nuevas: la cadena queda 1, 2, 3 y la fila
  // original intacta
  let prompt = repo.create_prompt(&user,
                                  NewPrompt { project_id: project.id,
                                              step_id: Some(step_ids[0]),
                                              title: "P".into(),
                                              content: "contenido original".into(),
                                              variables: PromptVariables::new() })
                   .expect("create prompt");
  assert_eq!(prompt.version, 1);
  assert_eq!(prompt.order, 1);
  let v2 = repo.create_prompt_version(&user,
                                      &prompt.id,
                                      PromptPatch { content: Some("v2".into()), ..Default::default() })
               .expect("create version 2");
  let v3 = repo.create_prompt_version(&user, &prompt.id, PromptPatch::default()).expect("create version 3");
  assert_eq!(v2.version, 2);
  assert_eq!(v3.version, 3);
  // v3 con patch vacío cae al contenido original, no al de v2: la versión
  // siempre se construye desde la fila pedida
  assert_eq!(v3.content, "contenido original");
  let versions = repo.prompt_versions(&user, &prompt.id).expect("list versions");
  let listed: Vec<i32> = versions.iter().map(|p| p.version).collect();
  assert_eq!(listed, vec![3, 2, 1]);
  // El listado del paso usa la doble clave (order asc, version desc)
  let listed = repo.prompts_for_step(&user, &step_ids[0]).expect("list prompts");
  assert_eq!(listed[0].version, 3);
  // Reorder best-effort: un id inexistente se ignora
  let steps = repo.reorder_steps(&user,
                                 &project.id,
                                 &[OrderAssignment { id: step_ids[2], order: 1 },
                                   OrderAssignment { id: step_ids[0], order: 2 },
                                   OrderAssignment { id: Uuid::new_v4(), order: 9 }])
                  .expect("reorder steps");
  let titles: Vec<String> = steps.iter().map(|s| s.title.clone()).collect();
  assert_eq!(titles, vec!["C".to_string(), "A".to_string()]);
  // Clonado como plantilla: marca el nombre, resetea versiones y no
  // arrastra respuestas
  let template = repo.clone_project(&user, &project.id, CloneMode::SaveAsTemplate).expect("save as template");
  assert_eq!(template.name, "Foo (Template)");
  assert!(template.is_template);
  for step in repo.steps_for_project(&user, &template.id).expect("template steps") {
    for p in repo.prompts_for_step(&user, &step.id).expect("template prompts") {
      assert_eq!(p.version, 1);
      assert!(p.is_template);
      assert!(p.response.is_none());
    }
  }
  // Instanciar desde la plantilla recupera el nombre limpio
  let instance = repo.clone_project(&user, &template.id, CloneMode::InstantiateFromTemplate).expect("instantiate");
  assert_eq!(instance.name, "Foo");
  assert!(!instance.is_template);
  // El export aplana el árbol sin identificadores
  let (exported, tree) = repo.project_tree(&user, &project.id).expect("project tree");
  assert_eq!(exported.id, project.id);
  assert_eq!(tree.len(), 2);
  // Propiedad: otro usuario no ve nada
  match repo.get_project(&Uuid::new_v4(), &project.id) {
    Err(PlanError::NotFound(_)) => {}
    other => panic!("expected NotFound for foreign user, got: {:?}", other),
  }
  // Borrado del proyecto en cascada
  repo.delete_project(&user, &project.id).expect("delete project");
  match repo.steps_for_project(&user, &project.id) {
    Err(PlanError::NotFound(_)) => {}
    other => panic!("expected NotFound after delete, got: {:?}", other),
  }
  // Cleanup temporary DB file
  let _ = std::fs::remove_file(tmp_path);
}
