use std::path::PathBuf;

use matopt_core::Database;

use super::settings_for;

/// Execute the collect command: walk the textures base, probe every
/// image file's header and persist the textures database.
pub fn cmd_collect(config: Option<PathBuf>, dir: Option<PathBuf>) -> Result<(), String> {
    let handle = settings_for(config.as_deref());
    let settings = &handle.settings;

    let dir = dir.unwrap_or_else(|| settings.textures_base.clone());

    let mut db = Database::new();
    db.collect_textures(&dir)
        .map_err(|e| format!("Failed to collect textures from {}: {}", dir.display(), e))?;

    println!(
        "Collected {} textures from {} ({} files failed)",
        db.textures.len(),
        dir.display(),
        db.texture_errors.len()
    );
    for error in &db.texture_errors {
        eprintln!("{}", error);
    }

    let path = handle.settings.textures_database_path();
    db.save_textures(&path)
        .map_err(|e| format!("Failed to save textures database: {}", e))?;
    println!("Saved textures database to {}", path.display());
    Ok(())
}
