use std::path::PathBuf;

use matopt_core::analyzer::{self, ResolveContext};
use matopt_core::Database;

use super::settings_for;

/// Execute the analyze command: load both databases, resolve every
/// texture reference and print per-material findings.
pub fn cmd_analyze(
    config: Option<PathBuf>,
    errors_only: bool,
    candidates_only: bool,
) -> Result<(), String> {
    let handle = settings_for(config.as_deref());
    let settings = &handle.settings;

    let mut db = Database::new();
    db.load_materials(&settings.materials_database_path())
        .map_err(|e| format!("Failed to load materials database: {}", e))?;
    db.load_textures(&settings.textures_database_path())
        .map_err(|e| format!("Failed to load textures database: {}", e))?;

    let ctx = ResolveContext::new(settings.textures_base.clone());
    analyzer::analyze(&mut db, &ctx).map_err(|e| e.to_string())?;

    let mut error_count = 0;
    let mut warning_count = 0;
    let mut candidate_count = 0;

    for material in &db.materials {
        if material.has_errors() {
            error_count += 1;
        }
        if material.has_warnings() {
            warning_count += 1;
        }
        let hint = material.optimization_hint();
        if hint.is_some() {
            candidate_count += 1;
        }

        if candidates_only {
            if let Some(hint) = hint {
                println!(
                    "{} ({}) can be optimized:",
                    material.name,
                    material.source_file.display()
                );
                print!("{}", hint);
            }
            continue;
        }

        if material.has_errors() {
            println!(
                "{} ({}) has errors:",
                material.name,
                material.source_file.display()
            );
            print!("{}", material.error_string());
        }
        if !errors_only && material.has_warnings() {
            println!(
                "{} ({}) has warnings:",
                material.name,
                material.source_file.display()
            );
            print!("{}", material.warning_string());
        }
    }

    println!(
        "Analyzed {} materials against {} textures: {} with errors, {} with warnings, {} optimization candidates",
        db.materials.len(),
        db.textures.len(),
        error_count,
        warning_count,
        candidate_count
    );
    Ok(())
}
