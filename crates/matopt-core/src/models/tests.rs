//! Tests for the material block builder and texture records

use std::path::Path;

use super::*;

fn build(block: &str) -> Material {
    Material::from_block(Path::new("/decls/test.m2"), "test_mat", block).unwrap()
}

#[test]
fn test_minimal_material() {
    let m = build("{ diffuseMap textures/rock_d.tga\n physicsMaterial stone }");
    assert_eq!(m.layers.len(), 1);
    assert_eq!(m.options.extra_layers, 0);
    assert_eq!(m.physics_material.as_deref(), Some("stone"));
    assert_eq!(
        m.layers[0].diffuse.texture.as_ref().unwrap().raw_path,
        "textures/rock_d.tga"
    );
    assert_eq!(m.gloss_min_max, DEFAULT_MIN_MAX);
}

#[test]
fn test_layered_material_with_reuse() {
    let m = build(
        "{\n\
         $extraLayer 2\n\
         $diffuseMap textures/base_d.tga\n\
         $Layer1_diffuseMap textures/top_d.tga\n\
         $Layer1_bumpReuseLayer 1\n\
         $Layer2_diffuseReuseLayer 2\n\
         $Layer2_MaskMode 1\n\
         $Layer2_Maskmap textures/blend_mask.tga\n\
         }",
    );
    assert_eq!(m.options.extra_layers, 2);
    assert_eq!(m.layers.len(), 3);
    assert_eq!(m.layers[1].normal.reuse, ReuseMode::ReuseLayer0);
    assert_eq!(m.layers[2].diffuse.reuse, ReuseMode::ReuseLayer1);
    assert_eq!(m.layers[2].masking_mode, MaskingMode::Map);
    assert!(m.layers[2].mask.texture.is_some());
}

#[test]
fn test_reused_slot_drops_own_path() {
    // A reused slot must stay a value-less placeholder even if the script
    // also declares a path for it.
    let m = build(
        "{ $extraLayer 1\n\
         $Layer1_diffuseMap textures/ignored_d.tga\n\
         $Layer1_diffuseReuseLayer 1\n }",
    );
    assert_eq!(m.layers[1].diffuse.reuse, ReuseMode::ReuseLayer0);
    assert!(m.layers[1].diffuse.texture.is_none());
}

#[test]
fn test_layer_declarations_beyond_extra_layer_count() {
    // extraLayer says 0 but Layer1_ parameters exist: both survive so the
    // analyzer can warn about the mismatch.
    let m = build("{ $Layer1_diffuseMap textures/top_d.tga }");
    assert_eq!(m.options.extra_layers, 0);
    assert_eq!(m.layers.len(), 2);
    assert_eq!(m.used_layer_count(), 1);
}

#[test]
fn test_unknown_keys_are_ignored() {
    let m = build(
        "{ futureFeature 42 13 nonsense\n\
         nestedThing { deeply { nested } stuff }\n\
         diffuseMap textures/a_d.png\n }",
    );
    assert!(m.layers[0].diffuse.texture.is_some());
}

#[test]
fn test_comments_inside_block() {
    let m = build(
        "{ // line comment\n\
         /* block\n comment */ diffuseMap textures/a_d.png\n\
         glossMinMax 0.2 0.8\n }",
    );
    assert!(m.layers[0].diffuse.texture.is_some());
    assert_eq!(m.gloss_min_max, [0.2, 0.8]);
}

#[test]
fn test_bad_numeric_value_names_material() {
    let err = Material::from_block(
        Path::new("/decls/test.m2"),
        "broken_mat",
        "{ glossMinMax zero 0.5 }",
    )
    .unwrap_err();
    assert!(err.to_string().contains("broken_mat"));
}

#[test]
fn test_layer1_cannot_reuse_layer1() {
    let err = Material::from_block(
        Path::new("/decls/test.m2"),
        "bad_reuse",
        "{ $extraLayer 1\n $Layer1_diffuseReuseLayer 2 }",
    )
    .unwrap_err();
    assert!(err.to_string().contains("bad_reuse"));
}

#[test]
fn test_program_classification() {
    let m = build("{ programs { wood_default_hq } }");
    assert_eq!(m.programs.kind, ProgramType::Default);

    let m = build("{ programs { char_skin_wet } }");
    assert_eq!(m.programs.kind, ProgramType::Skin);

    let m = build("{ programs { particles_additive } }");
    assert_eq!(m.programs.kind, ProgramType::Other);

    let m = build("{ }");
    assert_eq!(m.programs.kind, ProgramType::Default);
}

#[test]
fn test_scale_bias_and_uv_sets() {
    let m = build(
        "{ $extraLayer 1\n\
         $Layer1_UVset 1\n\
         $Layer1_ScaleBias 2.0 2.0 0.5 0.5\n\
         $Layer1_RescaleValues 0.4 0.6\n }",
    );
    assert_eq!(m.layers[1].uv_set, 1);
    assert_eq!(m.layers[1].scale_bias, [2.0, 2.0, 0.5, 0.5]);
    assert_eq!(m.layers[1].rescale_values, Some([0.4, 0.6]));
}

#[test]
fn test_normalize_path() {
    assert_eq!(
        normalize_path(Path::new("V:\\Game\\Textures\\Rock_D.TGA")),
        "v:/game/textures/rock_d.tga"
    );
}

#[test]
fn test_usage_from_suffix() {
    let cases = [
        ("rock_d", TextureUsage::Diffuse),
        ("rock_n", TextureUsage::Normal),
        ("rock_gloss", TextureUsage::Gloss),
        ("rock_m", TextureUsage::Metal),
        ("sign_em", TextureUsage::Emissive),
        ("rock", TextureUsage::Other),
    ];
    for (stem, expected) in cases {
        let path = format!("/textures/{}.png", stem);
        // Classification only needs the name, so probe failures for the
        // nonexistent file are fine to assert on separately.
        let usage = TextureUsage::from_stem(stem);
        assert_eq!(usage, expected, "stem {} ({})", stem, path);
    }
}
