use plan_domain::{NewProject, NewStep, OrderAssignment, PlanError, ProjectFilter, ProjectStatus};
use plan_engine::{InMemoryPlanRepository, PlanRepository};
use uuid::Uuid;

fn project(repo: &InMemoryPlanRepository, user: &Uuid, name: &str) -> Uuid {
  repo.create_project(user,
                      NewProject { name: name.into(), description: "demo".into(), ..Default::default() })
      .expect("create project")
      .id
}

fn step(repo: &InMemoryPlanRepository, user: &Uuid, project_id: Uuid, title: &str) -> Uuid {
  repo.create_step(user,
                   NewStep { project_id,
                             title: title.into(),
                             description: format!("paso {}", title),
                             expected_output: None,
                             actual_output: None,
                             notes: None })
      .expect("create step")
      .id
}

#[test]
fn append_assigns_dense_one_based_orders() {
  let repo = InMemoryPlanRepository::new();
  let user = Uuid::new_v4();
  let pid = project(&repo, &user, "orden");
  for title in ["A", "B", "C", "D"] {
    step(&repo, &user, pid, title);
  }
  let steps = repo.steps_for_project(&user, &pid).unwrap();
  let orders: Vec<i32> = steps.iter().map(|s| s.order).collect();
  assert_eq!(orders, vec![1, 2, 3, 4]);
}

#[test]
fn delete_middle_step_closes_the_gap() {
  // Escenario de la especificación: [A=1, B=2, C=3], borrar B => A=1, C=2
  let repo = InMemoryPlanRepository::new();
  let user = Uuid::new_v4();
  let pid = project(&repo, &user, "huecos");
  let _a = step(&repo, &user, pid, "A");
  let b = step(&repo, &user, pid, "B");
  let _c = step(&repo, &user, pid, "C");

  repo.delete_step(&user, &b).unwrap();

  let steps = repo.steps_for_project(&user, &pid).unwrap();
  assert_eq!(steps.len(), 2);
  assert_eq!((steps[0].title.as_str(), steps[0].order), ("A", 1));
  assert_eq!((steps[1].title.as_str(), steps[1].order), ("C", 2));
}

#[test]
fn density_invariant_after_mixed_appends_and_deletes() {
  let repo = InMemoryPlanRepository::new();
  let user = Uuid::new_v4();
  let pid = project(&repo, &user, "densidad");
  let mut ids = Vec::new();
  for i in 0..6 {
    ids.push(step(&repo, &user, pid, &format!("s{}", i)));
  }
  repo.delete_step(&user, &ids[0]).unwrap(); // borra el primero
  repo.delete_step(&user, &ids[3]).unwrap(); // borra uno del medio
  ids.push(step(&repo, &user, pid, "extra")); // y vuelve a añadir

  let steps = repo.steps_for_project(&user, &pid).unwrap();
  let mut orders: Vec<i32> = steps.iter().map(|s| s.order).collect();
  orders.sort();
  let expected: Vec<i32> = (1..=steps.len() as i32).collect();
  assert_eq!(orders, expected);
}

#[test]
fn reorder_applies_assignments_and_returns_ascending() {
  let repo = InMemoryPlanRepository::new();
  let user = Uuid::new_v4();
  let pid = project(&repo, &user, "reorden");
  let a = step(&repo, &user, pid, "A");
  let b = step(&repo, &user, pid, "B");
  let c = step(&repo, &user, pid, "C");

  let assignments = [OrderAssignment { id: c, order: 1 },
                     OrderAssignment { id: a, order: 2 },
                     OrderAssignment { id: b, order: 3 }];
  let steps = repo.reorder_steps(&user, &pid, &assignments).unwrap();
  let titles: Vec<&str> = steps.iter().map(|s| s.title.as_str()).collect();
  assert_eq!(titles, vec!["C", "A", "B"]);

  // idempotencia: aplicar la misma asignación otra vez no cambia nada
  let again = repo.reorder_steps(&user, &pid, &assignments).unwrap();
  let titles_again: Vec<&str> = again.iter().map(|s| s.title.as_str()).collect();
  assert_eq!(titles_again, vec!["C", "A", "B"]);
}

#[test]
fn reorder_silently_skips_foreign_ids() {
  let repo = InMemoryPlanRepository::new();
  let user = Uuid::new_v4();
  let pid = project(&repo, &user, "mio");
  let other_pid = project(&repo, &user, "otro");
  let a = step(&repo, &user, pid, "A");
  let foreign = step(&repo, &user, other_pid, "X");

  // el id del otro proyecto y un id inexistente se ignoran sin error
  let assignments = [OrderAssignment { id: a, order: 5 },
                     OrderAssignment { id: foreign, order: 9 },
                     OrderAssignment { id: Uuid::new_v4(), order: 1 }];
  let steps = repo.reorder_steps(&user, &pid, &assignments).unwrap();
  assert_eq!(steps.len(), 1);
  assert_eq!(steps[0].order, 5);

  // el paso del otro proyecto conserva su orden original
  let others = repo.steps_for_project(&user, &other_pid).unwrap();
  assert_eq!(others[0].order, 1);
}

#[test]
fn ownership_is_indistinguishable_from_absence() {
  let repo = InMemoryPlanRepository::new();
  let owner = Uuid::new_v4();
  let intruder = Uuid::new_v4();
  let pid = project(&repo, &owner, "privado");
  let sid = step(&repo, &owner, pid, "A");

  match repo.get_project(&intruder, &pid) {
    Err(PlanError::NotFound(_)) => {}
    other => panic!("expected NotFound for foreign project, got {:?}", other),
  }
  match repo.delete_step(&intruder, &sid) {
    Err(PlanError::NotFound(_)) => {}
    other => panic!("expected NotFound for foreign step, got {:?}", other),
  }
  // el propietario sigue viendo su paso intacto
  assert_eq!(repo.steps_for_project(&owner, &pid).unwrap().len(), 1);
}

#[test]
fn delete_project_cascades_to_children() {
  let repo = InMemoryPlanRepository::new();
  let user = Uuid::new_v4();
  let pid = project(&repo, &user, "cascada");
  let sid = step(&repo, &user, pid, "A");
  repo.create_prompt(&user,
                     plan_domain::NewPrompt { project_id: pid,
                                              step_id: Some(sid),
                                              title: "P".into(),
                                              content: "c".into(),
                                              variables: Default::default() })
      .unwrap();

  repo.delete_project(&user, &pid).unwrap();
  match repo.steps_for_project(&user, &pid) {
    Err(PlanError::NotFound(_)) => {}
    other => panic!("expected NotFound after cascade delete, got {:?}", other),
  }
}

#[test]
fn list_projects_filters_and_paginates() {
  let repo = InMemoryPlanRepository::new();
  let user = Uuid::new_v4();
  for i in 0..5 {
    project(&repo, &user, &format!("alpha {}", i));
  }
  let beta = project(&repo, &user, "beta");
  repo.update_project(&user,
                      &beta,
                      plan_domain::ProjectPatch { status: Some(ProjectStatus::Completed), ..Default::default() })
      .unwrap();

  let page = repo.list_projects(&user,
                                &ProjectFilter { search: Some("ALPHA".into()), page: 2, page_size: 2, status: None })
                 .unwrap();
  assert_eq!(page.total, 5);
  assert_eq!(page.items.len(), 2);

  let done = repo.list_projects(&user,
                                &ProjectFilter { status: Some(ProjectStatus::Completed), ..Default::default() })
                 .unwrap();
  assert_eq!(done.total, 1);
  assert_eq!(done.items[0].name, "beta");
}
