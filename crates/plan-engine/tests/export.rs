use plan_domain::{NewProject, NewPrompt, NewStep, OrderAssignment, PlanError, PromptPatch, PromptVariables, TechStack};
use plan_engine::{InMemoryPlanRepository, PlanService};
use std::sync::Arc;
use uuid::Uuid;

fn service() -> (PlanService<InMemoryPlanRepository>, Uuid) {
  (PlanService::new(Arc::new(InMemoryPlanRepository::new())), Uuid::new_v4())
}

#[test]
fn export_flattens_the_tree_in_ascending_step_order() {
  let (service, user) = service();
  let mut stack = TechStack::new();
  stack.insert("backend".into(), vec!["Diesel".into()]);
  let project = service.create_project(&user,
                                       NewProject { name: "Exportable".into(),
                                                    description: "para replay".into(),
                                                    tech_stack: stack,
                                                    status: None })
                       .unwrap();
  let first = service.create_step(&user,
                                  NewStep { project_id: project.id,
                                            title: "uno".into(),
                                            description: "d".into(),
                                            expected_output: Some("x".into()),
                                            actual_output: None,
                                            notes: None })
                     .unwrap();
  let second = service.create_step(&user,
                                   NewStep { project_id: project.id,
                                             title: "dos".into(),
                                             description: "d".into(),
                                             expected_output: None,
                                             actual_output: None,
                                             notes: None })
                      .unwrap();
  let prompt = service.create_prompt(&user,
                                     NewPrompt { project_id: project.id,
                                                 step_id: Some(first.id),
                                                 title: "P".into(),
                                                 content: "haz algo".into(),
                                                 variables: PromptVariables::new() })
                      .unwrap();
  service.update_prompt(&user, &prompt.id, PromptPatch { response: Some("hecho".into()), ..Default::default() })
         .unwrap();

  // invertir el orden estructural: el export debe reflejarlo
  service.reorder_steps(&user,
                        &project.id,
                        &[OrderAssignment { id: second.id, order: 1 }, OrderAssignment { id: first.id, order: 2 }])
         .unwrap();

  let doc = service.export_project(&user, &project.id).unwrap();
  assert_eq!(doc.project.name, "Exportable");
  assert_eq!(doc.steps.len(), 2);
  assert_eq!(doc.steps[0].title, "dos");
  assert_eq!(doc.steps[1].title, "uno");
  assert_eq!(doc.steps[1].prompts.len(), 1);
  assert_eq!(doc.steps[1].prompts[0].response.as_deref(), Some("hecho"));
}

#[test]
fn export_is_lossy_by_design() {
  let (service, user) = service();
  let project = service.create_project(&user,
                                       NewProject { name: "Secreto".into(),
                                                    description: "d".into(),
                                                    ..Default::default() })
                       .unwrap();
  let step = service.create_step(&user,
                                 NewStep { project_id: project.id,
                                           title: "s".into(),
                                           description: "d".into(),
                                           expected_output: None,
                                           actual_output: None,
                                           notes: None })
                    .unwrap();
  let prompt = service.create_prompt(&user,
                                     NewPrompt { project_id: project.id,
                                                 step_id: Some(step.id),
                                                 title: "P".into(),
                                                 content: "c".into(),
                                                 variables: PromptVariables::new() })
                      .unwrap();
  service.create_prompt_version(&user, &prompt.id, PromptPatch::default()).unwrap();

  let doc = service.export_project(&user, &project.id).unwrap();
  let json = serde_json::to_value(&doc).unwrap();
  // sin ids ni historial de versiones: el slot con dos versiones exporta
  // sus filas como prompts planos
  assert!(json["project"].get("id").is_none());
  assert!(json["steps"][0].get("id").is_none());
  assert!(json["steps"][0]["prompts"][0].get("version").is_none());
  assert_eq!(doc.steps[0].prompts.len(), 2);
}

#[test]
fn export_of_foreign_project_is_not_found() {
  let (service, user) = service();
  let project = service.create_project(&user,
                                       NewProject { name: "p".into(), description: "d".into(), ..Default::default() })
                       .unwrap();
  match service.export_project(&Uuid::new_v4(), &project.id) {
    Err(PlanError::NotFound(_)) => {}
    other => panic!("expected NotFound, got {:?}", other),
  }
}

#[test]
fn unattached_prompts_stay_out_of_the_export() {
  let (service, user) = service();
  let project = service.create_project(&user,
                                       NewProject { name: "p".into(), description: "d".into(), ..Default::default() })
                       .unwrap();
  service.create_prompt(&user,
                        NewPrompt { project_id: project.id,
                                    step_id: None,
                                    title: "suelto".into(),
                                    content: "c".into(),
                                    variables: PromptVariables::new() })
         .unwrap();
  let doc = service.export_project(&user, &project.id).unwrap();
  // el documento sólo recorre pasos; un prompt sin paso no aparece
  assert!(doc.steps.is_empty());
}
