//! CLI command implementations.

use std::path::Path;

use crate::config::MatcherConfig;
use crate::engine::{MotionMatcher, QueryEngine};
use crate::features::CharacterContext;
use crate::format::MmdbReader;
use crate::index::DistanceMetric;
use crate::types::{CategoryFilter, CategoryMask, ClipLibrary, MotionError, MotionResult};

/// Parse a category mask written as decimal, `0x` hex or `0b` binary.
pub fn parse_mask(text: &str) -> Result<CategoryMask, String> {
    let text = text.trim().replace('_', "");
    let parsed = if let Some(hex) = text.strip_prefix("0x") {
        u64::from_str_radix(hex, 16)
    } else if let Some(bin) = text.strip_prefix("0b") {
        u64::from_str_radix(bin, 2)
    } else {
        text.parse::<u64>()
    };
    parsed.map_err(|e| format!("invalid category mask {text:?}: {e}"))
}

/// Parse a comma-separated feature vector.
pub fn parse_vector(text: &str) -> Result<Vec<f32>, String> {
    text.split(',')
        .map(|v| {
            v.trim()
                .parse::<f32>()
                .map_err(|e| format!("invalid value {v:?}: {e}"))
        })
        .collect()
}

/// Bake a clip library into an .mmdb file.
pub fn cmd_bake(
    clips: &Path,
    config_path: Option<&Path>,
    output: &Path,
    motion_scale: f32,
    json: bool,
) -> MotionResult<()> {
    let config = match config_path {
        Some(path) => MatcherConfig::load(path)?,
        None => MatcherConfig::default(),
    };
    let library = ClipLibrary::from_json_file(clips)?;

    let mut matcher = MotionMatcher::from_config(config)?;
    matcher.setup(CharacterContext::new("cli").with_motion_scale(motion_scale))?;
    let report = matcher.bake(&library)?;
    matcher.save(output)?;

    if json {
        let info = serde_json::json!({
            "output": output.display().to_string(),
            "report": report,
        });
        println!("{}", serde_json::to_string_pretty(&info).unwrap_or_default());
    } else {
        println!("Baked {} -> {}", clips.display(), output.display());
        println!("  Dimension: {}", report.dimension);
        println!("  Poses: {}", report.poses);
        println!("  Discarded: {}", report.discarded);
        println!("  Dropped: {}", report.dropped);
        if !report.floored_dimensions.is_empty() {
            println!("  Constant dimensions: {:?}", report.floored_dimensions);
        }
        for clip in &report.clips {
            println!("    {}: {} poses", clip.name, clip.poses);
        }
        println!("  Time: {:.2} ms", report.elapsed_ms);
    }
    Ok(())
}

/// Display information about an .mmdb file.
pub fn cmd_info(path: &Path, json: bool) -> MotionResult<()> {
    let header = MmdbReader::read_header(path)?;
    let snapshot = MmdbReader::read_from_file(path, MatcherConfig::default().leaf_size)?;
    let file_size = std::fs::metadata(path)?.len();
    let database = &snapshot.database;

    let mut per_clip = vec![0usize; database.clip_names().len()];
    for &clip in database.clip_indices() {
        if let Some(count) = per_clip.get_mut(clip as usize) {
            *count += 1;
        }
    }

    if json {
        let clips: Vec<serde_json::Value> = database
            .clip_names()
            .iter()
            .zip(&per_clip)
            .map(|(name, poses)| serde_json::json!({ "name": name, "poses": poses }))
            .collect();
        let info = serde_json::json!({
            "file": path.display().to_string(),
            "version": header.version,
            "dimension": snapshot.dimension(),
            "poses": snapshot.len(),
            "metric": snapshot.metric().name(),
            "baked_at": header.baked_at,
            "file_size": file_size,
            "weights": snapshot.weights,
            "clips": clips,
        });
        println!("{}", serde_json::to_string_pretty(&info).unwrap_or_default());
    } else {
        println!("File: {}", path.display());
        println!("Version: {}", header.version);
        println!("Dimension: {}", snapshot.dimension());
        println!("Poses: {}", snapshot.len());
        println!("Metric: {}", snapshot.metric());
        println!("Baked: {}", format_timestamp(header.baked_at));
        println!("File size: {}", format_size(file_size));
        println!("Clips:");
        for (name, poses) in database.clip_names().iter().zip(&per_clip) {
            println!("  {name}: {poses} poses");
        }
    }
    Ok(())
}

/// Per-dimension statistics of an .mmdb file.
pub fn cmd_stats(path: &Path, dimension: Option<usize>, json: bool) -> MotionResult<()> {
    let snapshot = MmdbReader::read_from_file(path, MatcherConfig::default().leaf_size)?;
    let stats = snapshot.database.stats();
    let dims: Vec<usize> = match dimension {
        Some(d) if d < stats.dimension() => vec![d],
        Some(d) => {
            return Err(MotionError::DimensionMismatch {
                expected: stats.dimension(),
                got: d,
            })
        }
        None => (0..stats.dimension()).collect(),
    };

    if json {
        let rows: Vec<serde_json::Value> = dims
            .iter()
            .map(|&d| {
                serde_json::json!({
                    "dimension": d,
                    "mean": stats.means[d],
                    "variance": stats.variances[d],
                    "weight": snapshot.weights.get(d).copied().unwrap_or(1.0),
                    "density": stats.densities[d],
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows).unwrap_or_default());
    } else {
        println!("Dataset Statistics ({} poses):", snapshot.len());
        for &d in &dims {
            println!(
                "  [{d}] mean {:.4}  variance {:.4}  weight {:.4}",
                stats.means[d],
                stats.variances[d],
                snapshot.weights.get(d).copied().unwrap_or(1.0)
            );
            if dimension.is_some() {
                for &(position, frequency) in &stats.densities[d] {
                    println!("      {position:>10.4}  {:>6.2}%", frequency * 100.0);
                }
            }
        }
    }
    Ok(())
}

/// Search an .mmdb file with a raw vector.
#[allow(clippy::too_many_arguments)]
pub fn cmd_search(
    path: &Path,
    query: &[f32],
    k: usize,
    include: CategoryMask,
    exclude: CategoryMask,
    normalize: bool,
    metric: Option<DistanceMetric>,
    json: bool,
) -> MotionResult<()> {
    let mut snapshot = MmdbReader::read_from_file(path, MatcherConfig::default().leaf_size)?;
    if let Some(metric) = metric {
        snapshot.set_metric(metric);
    }
    let query = if normalize {
        snapshot.database.stats().normalize(query)?
    } else {
        query.to_vec()
    };
    let filter = CategoryFilter::new(include, exclude);
    let hits = QueryEngine::new().search_raw(&snapshot, &query, k, Some(&filter))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits).unwrap_or_default());
    } else {
        for hit in &hits {
            println!(
                "Row {} ({} @ {:.3}s, category {:#x}): distance {:.4}",
                hit.row, hit.clip_name, hit.timestamp, hit.category, hit.distance
            );
        }
        println!("\n{} results", hits.len());
    }
    Ok(())
}

/// Write a default configuration file.
pub fn cmd_init_config(path: &Path, force: bool) -> MotionResult<()> {
    if path.exists() && !force {
        return Err(MotionError::InvalidConfig(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    MatcherConfig::default().save(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn format_timestamp(micros: u64) -> String {
    let secs = (micros / 1_000_000) as i64;
    match chrono::DateTime::from_timestamp(secs, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("{} us", micros),
    }
}
