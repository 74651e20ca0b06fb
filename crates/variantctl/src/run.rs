use std::collections::HashSet;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use recorder::{ArtifactCapture, CaptureBuffer, CycleStatus, Recorder, DEFAULT_ARTIFACT};
use tracing_subscriber::EnvFilter;
use variantset::{VariantConfig, VariantKey};
use warmup::Manager;

use crate::cli::{InspectArgs, RecordArgs, WarmupArgs};
use crate::engine::{load_shader_list, DryRunEngine, ScriptedDump};
use crate::script::CaptureScript;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

pub fn record(args: RecordArgs) -> Result<()> {
    let script = CaptureScript::load(&args.script)?;
    let scratch = tempfile::tempdir().context("failed to create capture scratch directory")?;
    let capture = ArtifactCapture::new(
        ScriptedDump::new(script.baseline.variants.clone()),
        scratch.path().join(DEFAULT_ARTIFACT),
    );
    let mut recorder = Recorder::new(capture);

    let status = recorder
        .initialize(!args.keep_defaults)
        .context("failed to start recording session")?;
    drive(&mut recorder, status, "baseline")?;

    for step in &script.steps {
        recorder.begin_record()?;
        recorder
            .capture_mut()
            .dump_mut()
            .touch(step.variants.iter().cloned());
        let ticks = step.settle_ticks.unwrap_or(args.settle_ticks);
        let status = recorder
            .schedule_end(step.label.clone(), step.mode, ticks)
            .with_context(|| format!("failed to record step '{}'", step.label))?;
        drive(&mut recorder, status, &step.label)?;
    }

    for extra in &script.extra {
        recorder
            .add_extra(extra.label.clone(), extra.variants.iter().cloned())
            .with_context(|| format!("failed to add extra variants for '{}'", extra.label))?;
    }

    let config = recorder
        .export(&args.out)
        .with_context(|| format!("failed to export variant config to {}", args.out.display()))?;
    println!(
        "Exported {} labels and {} variants across {} shaders to {}",
        config.items().len(),
        config.total_variants(),
        config.catalog().len(),
        args.out.display()
    );
    Ok(())
}

fn drive<C: CaptureBuffer>(
    recorder: &mut Recorder<C>,
    mut status: CycleStatus,
    label: &str,
) -> Result<()> {
    let mut ticks = 0u32;
    while status == CycleStatus::Pending {
        status = recorder
            .advance()
            .with_context(|| format!("capture cycle for '{label}' failed"))?;
        ticks += 1;
    }
    tracing::debug!(%label, ticks, "capture cycle settled");
    Ok(())
}

pub fn inspect(args: InspectArgs) -> Result<()> {
    let config = load_config(&args.config)?;

    println!(
        "Variant config v{}: {} labels, {} variants, {} shaders",
        config.version(),
        config.items().len(),
        config.total_variants(),
        config.catalog().len()
    );

    println!("Labels:");
    for item in config.items() {
        println!("  {:<28} variants={}", item.key, item.variants.len());
        if args.verbose {
            for variant in config.variants_for(&item.key).unwrap_or_default() {
                println!("    {variant}");
            }
        }
    }

    println!("Catalog:");
    let mut offset = 0;
    for group in config.catalog() {
        println!(
            "  {:<28} variants={:<4} first_index={offset}",
            group.shader,
            group.variants.len()
        );
        offset += group.variants.len();
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<VariantConfig> {
    VariantConfig::load(path)
        .with_context(|| format!("failed to load variant config {}", path.display()))
}

pub fn warmup(args: WarmupArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let known = args
        .shaders
        .as_ref()
        .map(|path| {
            load_shader_list(path)
                .with_context(|| format!("failed to read shader list {}", path.display()))
        })
        .transpose()?;

    let mut manager = Manager::new();
    if !args.exclude_keywords.is_empty() {
        let excluded: HashSet<String> = args.exclude_keywords.iter().cloned().collect();
        manager = manager.with_filter(move |key: &VariantKey| {
            !key.keywords.iter().any(|keyword| excluded.contains(keyword))
        });
    }
    let mut engine = DryRunEngine::new(known, io::stdout());

    let report = if args.all {
        manager.warm_up_all(&config, &mut engine)?
    } else {
        manager.set_config(config);
        for label in &args.labels {
            manager.append_to_warm_up(label.clone());
        }
        manager.warm_up(&mut engine)?
    };

    let source = if args.all {
        "the full catalog".to_string()
    } else {
        format!("{} labels", report.labels)
    };
    eprintln!(
        "Warm-up resolved {} variants ({} dropped) from {source} across {} shaders in {:.1} ms",
        report.variants,
        report.dropped,
        report.shaders_resolved,
        report.elapsed.as_secs_f64() * 1000.0
    );
    Ok(())
}
