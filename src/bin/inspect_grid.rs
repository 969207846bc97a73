//! Print what a raw grid file holds and what it pads into.
//!
//! Optionally samples every layer at one coordinate with both interpolation
//! methods, which is handy when checking a freshly converted dataset.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;

use redplanet::data_loader::load_raw_grid;
use redplanet::InterpolationMethod;

#[derive(Parser, Debug)]
#[command(name = "inspect_grid")]
#[command(about = "Inspect a redplanet raw grid file")]
struct Args {
    /// Raw grid JSON file
    path: PathBuf,

    /// Longitude to sample at
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Latitude to sample at
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let raw = load_raw_grid(&args.path)
        .with_context(|| format!("reading {}", args.path.display()))?;

    println!("Inspecting raw grid: {}", args.path.display());
    println!("\n=== RAW AXES ===");
    print_axis("lon", &raw.lon);
    print_axis("lat", &raw.lat);
    println!("  cyclic = {}", raw.cyclic);

    println!("\nAttributes:");
    let mut attributes: Vec<_> = raw.attributes.iter().collect();
    attributes.sort_by(|a, b| a.0.cmp(b.0));
    for (name, value) in attributes {
        println!("  {}: {:?}", name, value);
    }

    println!("\nLayers:");
    let mut names: Vec<_> = raw.layers.keys().cloned().collect();
    names.sort();
    for name in &names {
        let values = &raw.layers[name];
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let (min, max) = finite
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        println!(
            "  {} {:?}: min = {}, max = {}, non-finite = {}",
            name,
            values.dim(),
            min,
            max,
            values.len() - finite.len()
        );
    }

    let model = raw.into_model().context("padding grid")?;
    let summary = model.summary();
    println!("\n=== PADDED MODEL ===");
    println!(
        "  {} x {} points, lon {:?}, lat {:?}, {} convention{}, {} KiB",
        summary.lon_points,
        summary.lat_points,
        summary.lon_extent,
        summary.lat_extent,
        summary.lon_convention,
        if model.is_cyclic() { ", wrapped" } else { "" },
        model.memory_usage() / 1024
    );

    if let (Some(lon), Some(lat)) = (args.lon, args.lat) {
        if !(-90.0..=90.0).contains(&lat) {
            bail!("latitude {} is outside [-90, 90]", lat);
        }
        println!("\n=== SAMPLE at lon = {}, lat = {} ===", lon, lat);
        for name in &names {
            for method in [InterpolationMethod::Nearest, InterpolationMethod::Linear] {
                let value = method
                    .interpolate(&model, name, lon, lat)
                    .with_context(|| format!("sampling {} with {}", name, method))?;
                let note = if model.is_sentinel(value) { " (undefined)" } else { "" };
                println!("  {} [{}] = {}{}", name, method, value, note);
            }
        }
    }

    Ok(())
}

fn print_axis(name: &str, axis: &[f64]) {
    match (axis.first(), axis.last()) {
        (Some(first), Some(last)) => {
            println!("  {} = {} points from {} to {}", name, axis.len(), first, last)
        }
        _ => println!("  {} = empty", name),
    }
}
