use std::fs;

use tempfile::tempdir;

use super::{parse_material_source, Database};
use crate::error::{DatabaseError, MaterialError, ParseError};
use crate::models::{MaskingMode, ReuseMode, TextureFileInfo, TextureFileType, TextureUsage};

const SIMPLE: &str = r#"
material rock/cliff_a {
    programs { arkDefault }
    physicsMaterial    stone
    diffuseMap         textures/rock/cliff_a_d.tga
    bumpMap            textures/rock/cliff_a_n.tga
    hasBumpMap         1
}
"#;

const TWO_MATERIALS: &str = r#"
// shared cliff set
material rock/cliff_a {
    physicsMaterial stone
    diffuseMap textures/rock/cliff_a_d.tga
}
material rock/cliff_b {
    physicsMaterial stone
    diffuseMap textures/rock/cliff_b_d.tga
}
"#;

fn parse_one(text: &str) -> crate::models::Material {
    let mut materials =
        parse_material_source("test.m2".as_ref(), text).expect("source should parse");
    assert_eq!(materials.len(), 1);
    materials.pop().unwrap()
}

#[test]
fn parses_multiple_materials_per_source() {
    let materials = parse_material_source("cliffs.m2".as_ref(), TWO_MATERIALS).unwrap();
    assert_eq!(materials.len(), 2);
    assert_eq!(materials[0].name, "rock/cliff_a");
    assert_eq!(materials[1].name, "rock/cliff_b");
}

#[test]
fn material_name_glued_to_brace() {
    let materials =
        parse_material_source("glued.m2".as_ref(), "material rock/cliff_a{ physicsMaterial stone }")
            .unwrap();
    assert_eq!(materials.len(), 1);
    assert_eq!(materials[0].name, "rock/cliff_a");
    assert_eq!(materials[0].physics_material.as_deref(), Some("stone"));
}

#[test]
fn missing_material_name_is_an_error() {
    let err = parse_material_source("bad.m2".as_ref(), "material { }").unwrap_err();
    assert!(matches!(
        err,
        MaterialError::Syntax(ParseError::MissingMaterialName)
    ));
}

#[test]
fn unterminated_block_names_the_material() {
    let err =
        parse_material_source("bad.m2".as_ref(), "material rock/cliff_a { diffuseMap a.tga")
            .unwrap_err();
    match err {
        MaterialError::BadBlock { name, source } => {
            assert_eq!(name, "rock/cliff_a");
            assert!(matches!(source, ParseError::UnterminatedBlock(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn scan_materials_walks_subdirectories_and_records_errors() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("rock");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("cliff.m2"), SIMPLE).unwrap();
    fs::write(dir.path().join("broken.m2"), "material { }").unwrap();
    fs::write(dir.path().join("notes.txt"), "not a material").unwrap();

    let mut db = Database::new();
    db.scan_materials(dir.path(), "m2").unwrap();

    assert_eq!(db.materials.len(), 1);
    assert_eq!(db.materials[0].name, "rock/cliff_a");
    assert_eq!(db.material_errors.len(), 1);
    assert!(db.material_errors[0]
        .file
        .to_string_lossy()
        .ends_with("broken.m2"));
    assert!(db.material_errors[0]
        .message
        .contains("material name"));
}

#[test]
fn materials_round_trip_through_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("materials.db");

    let mut db = Database::new();
    db.materials = parse_material_source(
        "layered.m2".as_ref(),
        r#"
        material props/crate {
            physicsMaterial wood
            extraLayer 1
            diffuseMap textures/props/crate_d.tga
            Layer1_diffuseReuseLayer 1
            Layer1_maskMode 1
            Layer1_maskMap textures/props/crate_mask.tga
            Layer1_scaleBias 2 2 0.5 0.5
            Layer1_rescaleValues 0.1 0.9
            glossMinMax 0.2 0.8
        }
        "#,
    )
    .unwrap();
    db.material_errors.push(super::FileError {
        file: "bad.m2".into(),
        message: "parse failure in material \"x\"\nmissing material name".into(),
    });
    db.save_materials(&path).unwrap();

    let mut loaded = Database::new();
    loaded.load_materials(&path).unwrap();

    assert_eq!(loaded.materials.len(), 1);
    let m = &loaded.materials[0];
    assert_eq!(m.name, "props/crate");
    assert_eq!(m.physics_material.as_deref(), Some("wood"));
    assert_eq!(m.options.extra_layers, 1);
    assert_eq!(m.gloss_min_max, [0.2, 0.8]);
    assert_eq!(m.layers.len(), 2);
    assert_eq!(
        m.layers[0].diffuse.texture.as_ref().unwrap().raw_path,
        "textures/props/crate_d.tga"
    );
    assert_eq!(m.layers[1].diffuse.reuse, ReuseMode::ReuseLayer0);
    assert_eq!(m.layers[1].diffuse.texture, None);
    assert_eq!(m.layers[1].masking_mode, MaskingMode::Map);
    assert_eq!(m.layers[1].scale_bias, [2.0, 2.0, 0.5, 0.5]);
    assert_eq!(m.layers[1].rescale_values, Some([0.1, 0.9]));
    assert!(m.diagnostics.is_empty());

    assert_eq!(loaded.material_errors.len(), 1);
    assert!(loaded.material_errors[0].message.contains('\n'));
}

#[test]
fn textures_round_trip_and_rebuild_the_index() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("textures.db");

    let mut db = Database::new();
    db.insert_texture(TextureFileInfo {
        path: "c:/game/textures/rock/cliff_a_d.tga".into(),
        width: 1024,
        height: 512,
        file_type: TextureFileType::Tga,
        usage: TextureUsage::Diffuse,
        ref_count: 7, // derived, must not survive the round trip
    });
    db.save_textures(&path).unwrap();

    let mut loaded = Database::new();
    loaded.load_textures(&path).unwrap();

    assert_eq!(loaded.textures.len(), 1);
    let t = &loaded.textures[0];
    assert_eq!(t.path, "c:/game/textures/rock/cliff_a_d.tga");
    assert_eq!((t.width, t.height), (1024, 512));
    assert_eq!(t.file_type, TextureFileType::Tga);
    assert_eq!(t.usage, TextureUsage::Diffuse);
    assert_eq!(t.ref_count, 0);
    assert_eq!(
        loaded.texture_index.get("c:/game/textures/rock/cliff_a_d.tga"),
        Some(&0)
    );
}

#[test]
fn load_rejects_foreign_files_and_clears_state() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("materials.db");
    fs::write(&path, b"not a database at all").unwrap();

    let mut db = Database::new();
    db.materials = vec![parse_one(SIMPLE)];
    let err = db.load_materials(&path).unwrap_err();
    assert!(matches!(err, DatabaseError::BadMagic { .. }));
    // Failed loads leave an empty database, not half the old one.
    assert!(db.materials.is_empty());
}

#[test]
fn load_rejects_wrong_version() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("materials.db");
    let mut bytes = b"MTDB".to_vec();
    bytes.extend_from_slice(&99u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    fs::write(&path, &bytes).unwrap();

    let mut db = Database::new();
    let err = db.load_materials(&path).unwrap_err();
    match err {
        DatabaseError::BadVersion { found, expected, .. } => {
            assert_eq!(found, 99);
            assert_eq!(expected, super::FORMAT_VERSION);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn huge_record_count_is_corrupt_not_fatal() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("materials.db");
    let mut bytes = b"MTDB".to_vec();
    bytes.extend_from_slice(&super::FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&u32::MAX.to_le_bytes());
    fs::write(&path, &bytes).unwrap();

    // A bogus count must come back as an error, not abort on allocation.
    let mut db = Database::new();
    let err = db.load_materials(&path).unwrap_err();
    assert!(matches!(err, DatabaseError::Corrupt { .. }));
    assert!(db.materials.is_empty());

    let path = dir.path().join("textures.db");
    fs::write(&path, &bytes).unwrap();
    let err = db.load_textures(&path).unwrap_err();
    assert!(matches!(err, DatabaseError::Corrupt { .. }));
    assert!(db.textures.is_empty());
}

#[test]
fn truncated_database_is_corrupt() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("materials.db");

    let mut db = Database::new();
    db.materials = vec![parse_one(SIMPLE)];
    db.save_materials(&path).unwrap();

    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 5]).unwrap();

    let err = db.load_materials(&path).unwrap_err();
    assert!(matches!(err, DatabaseError::Corrupt { .. }));
}
