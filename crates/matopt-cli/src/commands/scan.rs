use std::path::PathBuf;

use matopt_core::Database;

use super::settings_for;

/// Execute the scan command: recursively parse every material script
/// under the materials base and persist the materials database.
pub fn cmd_scan(
    config: Option<PathBuf>,
    dir: Option<PathBuf>,
    extension: Option<String>,
) -> Result<(), String> {
    let handle = settings_for(config.as_deref());
    let settings = &handle.settings;

    let dir = dir.unwrap_or_else(|| settings.materials_base.clone());
    let extension = extension.unwrap_or_else(|| settings.material_extension.clone());

    let mut db = Database::new();
    db.scan_materials(&dir, &extension)
        .map_err(|e| format!("Failed to scan {}: {}", dir.display(), e))?;

    println!(
        "Parsed {} materials from {} ({} files failed)",
        db.materials.len(),
        dir.display(),
        db.material_errors.len()
    );
    for error in &db.material_errors {
        eprintln!("{}", error);
    }

    let path = handle.settings.materials_database_path();
    db.save_materials(&path)
        .map_err(|e| format!("Failed to save materials database: {}", e))?;
    println!("Saved materials database to {}", path.display());
    Ok(())
}
