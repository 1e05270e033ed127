use super::{analyze, resolve, AnalyzeError, ResolveContext, Severity};
use crate::database::{parse_material_source, Database};
use crate::models::{TextureFileInfo, TextureFileType, TextureUsage};

fn ctx() -> ResolveContext {
    ResolveContext::new("/game")
}

/// Database with materials parsed from `script` and textures registered
/// under the given base-relative paths.
fn db_with(script: &str, textures: &[&str]) -> Database {
    let mut db = Database::new();
    db.materials = parse_material_source("test.m2".as_ref(), script).expect("script should parse");
    for path in textures {
        db.insert_texture(TextureFileInfo {
            path: format!("/game/{}", path),
            width: 256,
            height: 256,
            file_type: TextureFileType::Tga,
            usage: TextureUsage::Other,
            ref_count: 0,
        });
    }
    db
}

const CLEAN: &str = r#"
material rock/cliff_a {
    physicsMaterial stone
    diffuseMap textures/rock/cliff_a_d.tga
}
"#;

#[test]
fn analyze_requires_both_database_halves() {
    let mut db = Database::new();
    assert_eq!(analyze(&mut db, &ctx()), Err(AnalyzeError::NoMaterials));

    let mut db = db_with(CLEAN, &[]);
    assert_eq!(analyze(&mut db, &ctx()), Err(AnalyzeError::NoTextures));
}

#[test]
fn clean_material_has_no_diagnostics() {
    let mut db = db_with(CLEAN, &["textures/rock/cliff_a_d.tga"]);
    analyze(&mut db, &ctx()).unwrap();
    assert!(db.materials[0].diagnostics.is_empty());
    assert_eq!(db.materials[0].error_string(), "");
}

#[test]
fn resolver_counts_references_and_is_idempotent() {
    let script = r#"
    material a { physicsMaterial stone diffuseMap textures/shared_d.tga }
    material b { physicsMaterial stone diffuseMap textures/shared_d.tga }
    material c { physicsMaterial stone diffuseMap textures/lost_d.tga }
    "#;
    let mut db = db_with(script, &["textures/shared_d.tga"]);

    resolve(&mut db, &ctx());
    resolve(&mut db, &ctx());

    // Two materials share the file; re-resolving must not double-count.
    assert_eq!(db.textures[0].ref_count, 2);
    assert_eq!(db.materials[0].layers[0].diffuse.texture.as_ref().unwrap().resolved, Some(0));
    assert_eq!(db.materials[2].layers[0].diffuse.texture.as_ref().unwrap().resolved, None);
}

#[test]
fn resolver_accepts_absolute_and_differently_cased_paths() {
    let script = r#"
    material a { physicsMaterial stone diffuseMap /game/Textures/Rock/CLIFF_A_D.TGA }
    "#;
    let mut db = db_with(script, &["textures/rock/cliff_a_d.tga"]);
    resolve(&mut db, &ctx());
    assert_eq!(db.textures[0].ref_count, 1);
}

#[test]
fn missing_physics_material_is_an_error() {
    let script = r#"
    material a { diffuseMap textures/rock/cliff_a_d.tga }
    "#;
    let mut db = db_with(script, &["textures/rock/cliff_a_d.tga"]);
    analyze(&mut db, &ctx()).unwrap();

    let m = &db.materials[0];
    assert_eq!(m.diagnostics.len(), 1);
    assert_eq!(m.diagnostics[0].severity, Severity::Error);
    assert_eq!(m.diagnostics[0].message, "Physics material is not setup!");
    assert_eq!(m.error_string(), "\t\u{2022} Physics material is not setup!\n");
    assert_eq!(m.optimization_hint(), None);
}

#[test]
fn default_gloss_range_flags_an_uninitialized_material() {
    let script = r#"
    material a {
        physicsMaterial stone
        hasGlossMap 1
        diffuseMap textures/a_d.tga
        glossMap textures/a_g.tga
    }
    "#;
    let mut db = db_with(script, &["textures/a_d.tga", "textures/a_g.tga"]);
    analyze(&mut db, &ctx()).unwrap();

    let m = &db.materials[0];
    assert!(m
        .diagnostics
        .iter()
        .any(|d| d.message == "Gloss min/max are the default values! Material is not initialized!"));
}

#[test]
fn collapsed_gloss_range_flags_a_useless_map() {
    let script = r#"
    material a {
        physicsMaterial stone
        hasGlossMap 1
        glossMinMax 0.3 0.3
        diffuseMap textures/a_d.tga
        glossMap textures/a_g.tga
    }
    "#;
    let mut db = db_with(script, &["textures/a_d.tga", "textures/a_g.tga"]);
    analyze(&mut db, &ctx()).unwrap();

    let m = &db.materials[0];
    assert!(m.has_errors());
    assert!(m.diagnostics.iter().any(|d| d.message.contains("empty range")));
}

#[test]
fn gloss_range_ignored_when_gloss_map_disabled() {
    let script = r#"
    material a {
        physicsMaterial stone
        diffuseMap textures/a_d.tga
    }
    "#;
    let mut db = db_with(script, &["textures/a_d.tga"]);
    analyze(&mut db, &ctx()).unwrap();
    assert!(db.materials[0].diagnostics.is_empty());
}

#[test]
fn missing_and_unresolved_textures_are_reported_per_slot() {
    let script = r#"
    material a {
        physicsMaterial stone
        hasBumpMap 1
        diffuseMap textures/a_d.tga
    }
    "#;
    let mut db = db_with(script, &["textures/elsewhere.tga"]);
    analyze(&mut db, &ctx()).unwrap();

    let m = &db.materials[0];
    assert_eq!(m.diagnostics.len(), 2);
    assert!(m
        .diagnostics
        .iter()
        .any(|d| d.message == "diffuse texture for layer 0 not found on disk: textures/a_d.tga"));
    assert!(m
        .diagnostics
        .iter()
        .any(|d| d.message == "Missing normal texture for layer 0!"));
}

#[test]
fn layer_count_mismatch_is_a_warning() {
    let script = r#"
    material a {
        physicsMaterial stone
        diffuseMap textures/a_d.tga
        Layer1_diffuseMap textures/b_d.tga
    }
    "#;
    let mut db = db_with(script, &["textures/a_d.tga", "textures/b_d.tga"]);
    analyze(&mut db, &ctx()).unwrap();

    let m = &db.materials[0];
    assert!(!m.has_errors());
    assert!(m.has_warnings());
    assert!(m
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Warning
            && d.message.contains("extraLayer=0")
            && d.message.contains("2 layers")));
}

#[test]
fn shared_file_across_layers_is_an_optimization_candidate() {
    let script = r#"
    material a {
        physicsMaterial stone
        extraLayer 1
        diffuseMap textures/a_d.tga
        Layer1_diffuseMap textures/a_d.tga
        Layer1_maskMode 0
    }
    "#;
    let mut db = db_with(script, &["textures/a_d.tga"]);
    analyze(&mut db, &ctx()).unwrap();

    let m = &db.materials[0];
    assert!(!m.has_errors());
    let hint = m.optimization_hint().expect("redundancy should be flagged");
    assert!(hint.contains("Same file used by diffuse texture (layer 1) and diffuse texture (layer 0)!"));
    // Both slots resolve to the one file, so it is referenced twice.
    assert_eq!(db.textures[0].ref_count, 2);
}

#[test]
fn reuse_flag_suppresses_the_redundancy_finding() {
    let script = r#"
    material a {
        physicsMaterial stone
        extraLayer 1
        diffuseMap textures/a_d.tga
        Layer1_diffuseReuseLayer 1
        Layer1_maskMode 0
    }
    "#;
    let mut db = db_with(script, &["textures/a_d.tga"]);
    analyze(&mut db, &ctx()).unwrap();

    let m = &db.materials[0];
    assert!(m.diagnostics.is_empty());
    assert_eq!(m.optimization_hint(), None);
    assert_eq!(db.textures[0].ref_count, 1);
}

#[test]
fn masked_layer_requires_its_mask_map() {
    let script = r#"
    material a {
        physicsMaterial stone
        extraLayer 1
        diffuseMap textures/a_d.tga
        Layer1_diffuseMap textures/b_d.tga
        Layer1_maskMode 1
    }
    "#;
    let mut db = db_with(script, &["textures/a_d.tga", "textures/b_d.tga"]);
    analyze(&mut db, &ctx()).unwrap();

    assert!(db.materials[0]
        .diagnostics
        .iter()
        .any(|d| d.message == "Missing mask texture for layer 1!"));
}

#[test]
fn analysis_is_idempotent() {
    let script = r#"
    material a {
        physicsMaterial stone
        extraLayer 1
        diffuseMap textures/a_d.tga
        Layer1_diffuseMap textures/a_d.tga
        Layer1_maskMode 0
    }
    "#;
    let mut db = db_with(script, &["textures/a_d.tga"]);
    analyze(&mut db, &ctx()).unwrap();
    let first = db.materials[0].diagnostics.clone();
    analyze(&mut db, &ctx()).unwrap();

    assert_eq!(db.materials[0].diagnostics, first);
    assert_eq!(db.textures[0].ref_count, 2);
}
