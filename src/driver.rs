//! Batch-sequential extraction: one image is fully preprocessed, inferred
//! and serialized before the next begins.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufWriter, Write},
};

use anyhow::{Context, Result, bail};
use featmap::{FeatureRecord, PreprocessConfig, load_channel_mean, preprocess, valid_region};
use log::info;
use ndarray::{Array1, Array3};
use netgraph::{
    DATA_LAYER, NetDef, SpatialSize, layer_rate, output_size, receptive_field, validate_path,
};

use crate::{
    cli::Cli,
    config::preprocess_table,
    engine::{Engine, Network, copy_weights, mock::MockEngine},
    input::load_image,
    jobs::load_jobs,
    tempmodel::TempModel,
};

/// Dispatches on the engine selection and runs the batch.
pub fn run_cli(cli: &Cli) -> Result<()> {
    match cli.engine.as_str() {
        "mock" => run(&MockEngine::new(), cli),
        other => bail!("unsupported engine: {other} (expected mock)"),
    }
}

/// Runs the whole extraction batch against `engine`.
///
/// Graph shape and weight structure are checked before the first image, so
/// a malformed run aborts without leaving partial output behind.
pub fn run<E: Engine>(engine: &E, cli: &Cli) -> Result<()> {
    let base = NetDef::load(&cli.model)
        .with_context(|| format!("load model {}", cli.model.display()))?;
    base.check()?;
    {
        let graph = base.graph();
        validate_path(&graph, &cli.layer)?;
        let rate = layer_rate(&graph, &cli.layer)?;
        let field = receptive_field(&graph, &cli.layer)?;
        info!(
            "target {}: downsampling rate {rate}, receptive field {field}px",
            cli.layer
        );
    }

    let mean = load_channel_mean(&cli.mean)
        .with_context(|| format!("load mean {}", cli.mean.display()))?;
    let table = preprocess_table(cli.preprocess.as_deref()).context("load preprocess table")?;

    let reference = engine
        .instantiate(&cli.model, Some(&cli.weights))
        .context("instantiate pretrained network")?;
    check_weight_structure(engine, &reference, &base, &cli.layer)?;

    let jobs = load_jobs(&cli.jobs)
        .with_context(|| format!("load job list {}", cli.jobs.display()))?;
    info!("{} images to process", jobs.len());

    for job in &jobs {
        let image = load_image(&job.input)?;
        let record = process_image(engine, &reference, &base, &cli.layer, &mean, &table, image)
            .with_context(|| format!("process {}", job.input.display()))?;
        let file = File::create(&job.output)
            .with_context(|| format!("create {}", job.output.display()))?;
        let mut writer = BufWriter::new(file);
        record.write_to(&mut writer)?;
        writer.flush()?;
    }
    Ok(())
}

/// Probes `copy_weights` against a throwaway instantiation so a structural
/// mismatch surfaces before any image is processed.
fn check_weight_structure<E: Engine>(
    engine: &E,
    reference: &E::Net,
    base: &NetDef,
    layer: &str,
) -> Result<()> {
    let subset = base.subset_for_output(layer);
    let scratch = TempModel::write(&subset)?;
    let mut probe = engine.instantiate(scratch.path(), None)?;
    drop(scratch);
    copy_weights(&mut probe, reference).context("validate weight structure")?;
    Ok(())
}

/// Extracts one image's feature record.
///
/// The engine is never touched when the valid region is already empty.
pub fn process_image<E: Engine>(
    engine: &E,
    reference: &E::Net,
    base: &NetDef,
    layer: &str,
    mean: &Array1<f32>,
    table: &HashMap<String, PreprocessConfig>,
    image: Array3<f32>,
) -> Result<FeatureRecord> {
    let (height, width, _) = image.dim();
    let size = SpatialSize::new(height, width);
    let valid = output_size(&base.graph(), layer, size)?;
    info!("{layer}: {size} -> {valid}");
    if valid.is_empty() {
        info!("valid region is empty, skipping inference");
        return Ok(FeatureRecord::empty());
    }

    let bound = base.bind_input(size).subset_for_output(layer);
    let scratch = TempModel::write(&bound)?;
    let mut net = engine
        .instantiate(scratch.path(), None)
        .context("instantiate network")?;
    drop(scratch);
    copy_weights(&mut net, reference)?;

    let cfg = table.get(DATA_LAYER).cloned().unwrap_or_default();
    let input = preprocess(image, mean, &cfg)?;
    net.forward(input)?;
    let blob = net
        .output(layer)
        .with_context(|| format!("network exposes no output blob for {layer}"))?;
    let (_, rows, cols) = blob.dim();
    info!("crop {valid} from ({rows}, {cols})");
    Ok(FeatureRecord::from_view(valid_region(blob, valid)))
}
