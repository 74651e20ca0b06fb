use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;
use variantset::{PassKind, VariantConfig, VariantKey};

const SCRIPT: &str = r#"
[baseline]
variants = [{ shader = "Hidden/Blit", pass = "normal" }]

[[steps]]
label = "Cube"
variants = [
    { shader = "Lit", pass = "forward", keywords = ["FOG"] },
    { shader = "Lit", pass = "shadow_caster" },
]

[[steps]]
label = "Sphere"
settle_ticks = 2
variants = [
    { shader = "Unlit", pass = "normal" },
    { shader = "Lit", pass = "forward", keywords = ["FOG"] },
]

[[extra]]
label = "Fallback"
variants = [{ shader = "Unlit", pass = "vertex", keywords = ["B", "A"] }]
"#;

fn variantctl(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_variantctl"))
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run variantctl")
}

fn record(root: &Path, out: &str, extra_args: &[&str]) -> std::path::PathBuf {
    let script = root.join("capture.toml");
    fs::write(&script, SCRIPT).unwrap();
    let out = root.join(out);
    let mut args = vec![
        "record",
        script.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
    ];
    args.extend_from_slice(extra_args);
    let output = variantctl(&args);
    assert!(
        output.status.success(),
        "record failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    out
}

#[test]
fn record_filters_baseline_and_orders_catalog() {
    let root = TempDir::new().unwrap();
    let out = record(root.path(), "variants.json", &[]);

    let config = VariantConfig::load(&out).expect("load exported config");
    let labels: Vec<&str> = config.labels().collect();
    assert_eq!(labels, vec!["Cube", "Fallback", "Sphere"]);

    let shaders: Vec<&str> = config.catalog().iter().map(|g| g.shader.as_str()).collect();
    assert_eq!(shaders, vec!["Lit", "Unlit"]);
    assert_eq!(config.total_variants(), 4);

    assert_eq!(config.item("Cube").unwrap().variants, vec![0, 1]);
    assert_eq!(config.item("Sphere").unwrap().variants, vec![0, 2]);
    assert_eq!(config.item("Fallback").unwrap().variants, vec![3]);
    assert_eq!(
        config.variant_at(3),
        Some(VariantKey::new("Unlit", PassKind::Vertex, ["A", "B"]))
    );
    assert_eq!(config.variant_at(3).unwrap().keywords, vec!["A", "B"]);

    let leftovers: Vec<_> = fs::read_dir(root.path())
        .unwrap()
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(leftovers.len(), 2, "unexpected files: {leftovers:?}");
}

#[test]
fn keep_defaults_retains_baseline_variants() {
    let root = TempDir::new().unwrap();
    let out = record(root.path(), "variants.toml", &["--keep-defaults"]);

    let raw = fs::read_to_string(&out).unwrap();
    assert!(raw.contains("version = 1"));
    let config = VariantConfig::load(&out).unwrap();
    let cube = config.variants_for("Cube").unwrap();
    assert!(cube.contains(&VariantKey::new(
        "Hidden/Blit",
        PassKind::Normal,
        Vec::<String>::new()
    )));
    assert_eq!(config.catalog()[0].shader, "Hidden/Blit");
}

#[test]
fn repeated_record_is_byte_identical() {
    let root = TempDir::new().unwrap();
    let out = record(root.path(), "variants.json", &[]);
    let first = fs::read(&out).unwrap();
    record(root.path(), "variants.json", &[]);
    let second = fs::read(&out).unwrap();
    assert_eq!(first, second);
}

#[test]
fn warmup_prints_label_variants() {
    let root = TempDir::new().unwrap();
    let out = record(root.path(), "variants.json", &[]);

    let output = variantctl(&[
        "warmup",
        out.to_str().unwrap(),
        "--label",
        "Cube",
        "--label",
        "Missing",
    ]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "Lit/forward/[FOG]\nLit/shadow_caster/[]\n"
    );

    let all = variantctl(&[
        "warmup",
        out.to_str().unwrap(),
        "--all",
        "--exclude-keyword",
        "FOG",
    ]);
    assert!(all.status.success());
    assert_eq!(String::from_utf8_lossy(&all.stdout).lines().count(), 3);
}

#[test]
fn warmup_fails_on_unresolved_shader() {
    let root = TempDir::new().unwrap();
    let out = record(root.path(), "variants.json", &[]);
    let shaders = root.path().join("shaders.txt");
    fs::write(&shaders, "# available shaders\nLit\n").unwrap();

    let output = variantctl(&[
        "warmup",
        out.to_str().unwrap(),
        "--label",
        "Sphere",
        "--shaders",
        shaders.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty(), "nothing may be submitted");
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unlit"));
}

#[test]
fn inspect_lists_labels_and_groups() {
    let root = TempDir::new().unwrap();
    let out = record(root.path(), "variants.json", &[]);

    let output = variantctl(&["inspect", out.to_str().unwrap(), "--verbose"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("3 labels, 4 variants, 2 shaders"));
    assert!(stdout.contains("Sphere"));
    assert!(stdout.contains("Unlit/normal/[]"));
}

#[test]
fn inspect_rejects_corrupt_config() {
    let root = TempDir::new().unwrap();
    let bad = root.path().join("bad.json");
    fs::write(
        &bad,
        r#"{ "version": 1, "items": [{ "key": "Cube", "variants": [4] }], "catalog": [] }"#,
    )
    .unwrap();
    let output = variantctl(&["inspect", bad.to_str().unwrap()]);
    assert!(!output.status.success());
}
