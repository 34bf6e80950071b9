use clap::Parser;
use ndarray::Array4;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use yolobox::{
    Anchor, AnchorMask, AnchorSpec, Detection, ImageShape, PostProcessor, PostprocessConfig,
};

const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "yolobox CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
struct FeatureMapJson {
    shape: [usize; 4],
    data: Vec<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    /// Detector input as `[height, width]`.
    input_shape: [usize; 2],
    num_classes: usize,
    /// Anchors as `[width, height]` in input pixels.
    anchors: Vec<[f32; 2]>,
    anchors_mask: Vec<Vec<usize>>,
    conf_thres: f32,
    nms_thres: f32,
    letterbox: bool,
    parallel: bool,
    /// Original image sizes as `[height, width]`, one per batch element.
    image_shapes: Vec<[usize; 2]>,
    feature_maps: Vec<FeatureMapJson>,
    output_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let cfg = PostprocessConfig::default();
        Self {
            input_shape: [cfg.input_shape.height, cfg.input_shape.width],
            num_classes: cfg.num_classes,
            anchors: cfg
                .anchors
                .anchors()
                .iter()
                .map(|a| [a.width, a.height])
                .collect(),
            anchors_mask: cfg.anchors.mask().groups().to_vec(),
            conf_thres: cfg.conf_thres,
            nms_thres: cfg.nms_thres,
            letterbox: true,
            parallel: cfg.parallel,
            image_shapes: Vec::new(),
            feature_maps: Vec::new(),
            output_path: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct DetectionRecord {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    objectness: f32,
    class_confidence: f32,
    class_index: usize,
}

impl From<Detection> for DetectionRecord {
    fn from(value: Detection) -> Self {
        Self {
            x1: value.bbox.x1,
            y1: value.bbox.y1,
            x2: value.bbox.x2,
            y2: value.bbox.y2,
            objectness: value.objectness,
            class_confidence: value.class_confidence,
            class_index: value.class_index,
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    images: Vec<Vec<DetectionRecord>>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("yolobox=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.feature_maps.is_empty() {
        return Err("feature_maps must be set in the config".into());
    }

    let anchors = AnchorSpec::new(
        config
            .anchors
            .iter()
            .map(|&[w, h]| Anchor::new(w, h))
            .collect(),
        AnchorMask::new(config.anchors_mask.clone()),
    )?;
    let pp = PostProcessor::new(PostprocessConfig {
        anchors,
        num_classes: config.num_classes,
        input_shape: ImageShape::new(config.input_shape[0], config.input_shape[1]),
        conf_thres: config.conf_thres,
        nms_thres: config.nms_thres,
        parallel: config.parallel,
    })?;

    let maps = config
        .feature_maps
        .into_iter()
        .map(|map| Array4::from_shape_vec(map.shape, map.data))
        .collect::<Result<Vec<_>, _>>()?;
    let views: Vec<_> = maps.iter().map(|m| m.view()).collect();
    let image_shapes: Vec<_> = config
        .image_shapes
        .iter()
        .map(|&[h, w]| ImageShape::new(h, w))
        .collect();

    let batch = pp.process(&views, &image_shapes, config.letterbox)?;
    tracing::info!(
        images = batch.len(),
        detections = batch.iter().map(Vec::len).sum::<usize>(),
        "post-processing finished"
    );

    let output = Output {
        images: batch
            .into_iter()
            .map(|dets| dets.into_iter().map(DetectionRecord::from).collect())
            .collect(),
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
