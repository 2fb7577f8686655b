use plan_domain::{CloneMode, NewProject, NewStep, ProjectFilter};
use plan_engine::PlanService;
use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;
use uuid::Uuid;

/// Pequeño menú interactivo para administrar proyectos usando el
/// repositorio proporcionado por `plan-persistence`.
///
/// Opciones soportadas:
/// 1) Ver proyectos (tabla con id y estado)
/// 2) Crear proyecto
/// 3) Crear paso (append) en un proyecto
/// 4) Duplicar / guardar como plantilla / instanciar
/// 5) Exportar proyecto como JSON
/// 6) Eliminar proyecto
/// 7) Salir
fn main() -> Result<(), Box<dyn Error>> {
    // Inicializar repo (aplica migraciones embebidas si procede)
    let repo = plan_persistence::new_from_env().map_err(|e| Box::new(e) as Box<dyn Error>)?;
    let service = PlanService::new(Arc::new(repo));

    // El servicio de identidad es un colaborador externo: aquí el usuario
    // autenticado llega por variable de entorno o se genera uno efímero.
    let user_id = match std::env::var("PLAN_USER_ID").ok().and_then(|s| Uuid::parse_str(s.trim()).ok()) {
        Some(u) => u,
        None => {
            let u = Uuid::new_v4();
            println!("PLAN_USER_ID no definido; usando usuario efímero {}", u);
            u
        }
    };

    loop {
        println!("\n== Plan CLI menu ==");
        println!("1) Ver proyectos");
        println!("2) Crear proyecto");
        println!("3) Crear paso (append) en un proyecto");
        println!("4) Clonar proyecto (duplicar/plantilla/instanciar)");
        println!("5) Exportar proyecto como JSON");
        println!("6) Eliminar proyecto");
        println!("7) Salir");
        print!("Elige una opción: ");
        io::stdout().flush().ok();

        let mut choice = String::new();
        io::stdin().read_line(&mut choice)?;
        match choice.trim() {
            "1" => {
                match service.list_projects(&user_id, &ProjectFilter { page_size: 50, ..Default::default() }) {
                    Ok(page) => {
                        println!("\nID                                   | STATUS      | TPL | NAME");
                        println!("--------------------------------------------------------------------");
                        for p in page.items {
                            let tpl = if p.is_template { "sí" } else { "no" };
                            println!("{} | {:<11} | {:<3} | {}", p.id, p.status.as_str(), tpl, p.name);
                        }
                        println!("({} en total)", page.total);
                    }
                    Err(e) => eprintln!("Error listando proyectos: {}", e),
                }
            }
            "2" => {
                let name = prompt("Nombre: ")?;
                let description = prompt("Descripción: ")?;
                match service.create_project(&user_id,
                                             NewProject { name: name.trim().to_string(),
                                                          description: description.trim().to_string(),
                                                          ..Default::default() }) {
                    Ok(p) => println!("Proyecto creado: {}", p.id),
                    Err(e) => eprintln!("Error creando proyecto: {}", e),
                }
            }
            "3" => {
                let pid_s = prompt("Project id (UUID): ")?;
                let pid = match Uuid::parse_str(pid_s.trim()) {
                    Ok(u) => u,
                    Err(_) => { eprintln!("UUID inválido"); continue; }
                };
                let title = prompt("Título del paso: ")?;
                let description = prompt("Descripción del paso: ")?;
                match service.create_step(&user_id,
                                          NewStep { project_id: pid,
                                                    title: title.trim().to_string(),
                                                    description: description.trim().to_string(),
                                                    expected_output: None,
                                                    actual_output: None,
                                                    notes: None }) {
                    Ok(s) => println!("Paso creado: {} (order {})", s.id, s.order),
                    Err(e) => eprintln!("Error creando paso: {}", e),
                }
            }
            "4" => {
                let pid_s = prompt("Project id (UUID): ")?;
                let pid = match Uuid::parse_str(pid_s.trim()) {
                    Ok(u) => u,
                    Err(_) => { eprintln!("UUID inválido"); continue; }
                };
                let mode_s = prompt("Modo (d=duplicar, t=plantilla, i=instanciar): ")?;
                let mode = match mode_s.trim() {
                    "d" => CloneMode::Duplicate,
                    "t" => CloneMode::SaveAsTemplate,
                    "i" => CloneMode::InstantiateFromTemplate,
                    other => { eprintln!("Modo inválido: {}", other); continue; }
                };
                match service.clone_project(&user_id, &pid, mode) {
                    Ok(p) => println!("Proyecto clonado: {} ({})", p.id, p.name),
                    Err(e) => eprintln!("Error clonando proyecto: {}", e),
                }
            }
            "5" => {
                let pid_s = prompt("Project id (UUID): ")?;
                let pid = match Uuid::parse_str(pid_s.trim()) {
                    Ok(u) => u,
                    Err(_) => { eprintln!("UUID inválido"); continue; }
                };
                match service.export_project(&user_id, &pid) {
                    Ok(doc) => match serde_json::to_string_pretty(&doc) {
                        Ok(json) => println!("{}", json),
                        Err(e) => eprintln!("Error serializando export: {}", e),
                    },
                    Err(e) => eprintln!("Error exportando proyecto: {}", e),
                }
            }
            "6" => {
                let pid_s = prompt("Project id a eliminar (UUID): ")?;
                let pid = match Uuid::parse_str(pid_s.trim()) {
                    Ok(u) => u,
                    Err(_) => { eprintln!("UUID inválido"); continue; }
                };
                let confirm = prompt(&format!("Confirma borrado de {}? escribir 'yes' para confirmar: ", pid))?;
                if confirm.trim().to_lowercase() == "yes" {
                    match service.delete_project(&user_id, &pid) {
                        Ok(()) => println!("Proyecto eliminado: {}", pid),
                        Err(e) => eprintln!("Error eliminando proyecto: {}", e),
                    }
                } else {
                    println!("Borrado cancelado");
                }
            }
            "7" => {
                println!("Saliendo...");
                break;
            }
            other => {
                println!("Opción inválida: {}", other);
            }
        }
    }

    Ok(())
}

fn prompt(msg: &str) -> io::Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s)
}
