// export.rs
// Serializador de exportación: aplana el subárbol de un proyecto en un
// documento ordenado y acíclico apto para replay externo. Sin ids ni
// historial de versiones; con pérdida a propósito.
use crate::{Project, Prompt, PromptVariables, Step, TechStack};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDocument {
  pub project: ExportProject,
  pub steps: Vec<ExportStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportProject {
  pub name: String,
  pub description: String,
  pub tech_stack: TechStack,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportStep {
  pub title: String,
  pub description: String,
  pub order: i32,
  pub expected_output: Option<String>,
  pub prompts: Vec<ExportPrompt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportPrompt {
  pub title: String,
  pub content: String,
  pub variables: PromptVariables,
  pub response: Option<String>,
}

/// Función pura sobre colecciones ya leídas: emite pasos y prompts en el
/// orden de iteración recibido, sin reordenar. Si el consumidor necesita
/// orden ascendente, la capa que lee de la persistencia debe entregarlo así.
pub fn export_document(project: &Project, steps: &[(Step, Vec<Prompt>)]) -> ExportDocument {
  let steps = steps.iter()
                   .map(|(step, prompts)| ExportStep { title: step.title.clone(),
                                                       description: step.description.clone(),
                                                       order: step.order,
                                                       expected_output: step.expected_output.clone(),
                                                       prompts: prompts.iter().map(export_prompt).collect() })
                   .collect();
  ExportDocument { project: ExportProject { name: project.name.clone(),
                                            description: project.description.clone(),
                                            tech_stack: project.tech_stack.clone() },
                   steps }
}

fn export_prompt(prompt: &Prompt) -> ExportPrompt {
  ExportPrompt { title: prompt.title.clone(),
                 content: prompt.content.clone(),
                 variables: prompt.variables.clone(),
                 response: prompt.response.clone() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{NewProject, NewPrompt, NewStep};
  use uuid::Uuid;

  #[test]
  fn document_has_no_identifiers_and_keeps_input_order() -> crate::Result<()> {
    let user = Uuid::new_v4();
    let project = Project::create(user,
                                  NewProject { name: "Demo".into(),
                                               description: "demo".into(),
                                               ..Default::default() })?;
    let step_b = Step::create(NewStep { project_id: project.id,
                                        title: "B".into(),
                                        description: "b".into(),
                                        expected_output: None,
                                        actual_output: Some("secreto".into()),
                                        notes: None },
                              2)?;
    let prompt = Prompt::create(NewPrompt { project_id: project.id,
                                            step_id: Some(step_b.id),
                                            title: "P".into(),
                                            content: "c".into(),
                                            variables: PromptVariables::new() },
                                1)?;
    let step_a = Step::create(NewStep { project_id: project.id,
                                        title: "A".into(),
                                        description: "a".into(),
                                        expected_output: Some("x".into()),
                                        actual_output: None,
                                        notes: None },
                              1)?;
    // el serializador no reordena: B llega primero y sale primero
    let doc = export_document(&project, &[(step_b, vec![prompt]), (step_a, vec![])]);
    assert_eq!(doc.steps[0].title, "B");
    assert_eq!(doc.steps[0].order, 2);
    assert_eq!(doc.steps[1].title, "A");
    assert_eq!(doc.steps[0].prompts.len(), 1);

    let json = serde_json::to_value(&doc).unwrap();
    // sin ids, sin versiones, sin salidas reales
    assert!(json["project"].get("id").is_none());
    assert!(json["steps"][0].get("actual_output").is_none());
    assert!(json["steps"][0]["prompts"][0].get("version").is_none());
    Ok(())
  }
}
