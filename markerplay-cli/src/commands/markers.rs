//! Markers command - list the marker catalog.

use markerplay::config::ConfigFile;
use markerplay::marker::{load_reference_images, MarkerDescriptor};

use super::common::{build_runtime, resolve_catalog, CatalogArgs};
use crate::error::CliError;

/// Arguments for the markers command.
pub struct MarkersArgs {
    pub catalog: CatalogArgs,
    /// Fetch and decode every reference image.
    pub verify: bool,
    /// Print JSON instead of a table.
    pub json: bool,
}

/// Run the markers command.
pub fn run(args: MarkersArgs, config: &ConfigFile) -> Result<(), CliError> {
    let catalog = resolve_catalog(&args.catalog, config)?;
    let runtime = build_runtime()?;

    runtime.block_on(async move {
        let markers = catalog.list_markers().await?;

        let skipped = if args.verify {
            let loaded = load_reference_images(catalog.as_ref(), markers.clone()).await;
            loaded.skipped
        } else {
            Vec::new()
        };

        if args.json {
            print_json(&markers, &skipped);
        } else {
            print_table(&markers, &skipped, args.verify);
        }
        Ok(())
    })
}

fn print_table(markers: &[MarkerDescriptor], skipped: &[(MarkerDescriptor, String)], verify: bool) {
    if markers.is_empty() {
        println!("No markers in catalog.");
        return;
    }

    println!("{:<16} {:<28} {:>8}  VIDEO", "ID", "TITLE", "WIDTH");
    for marker in markers {
        println!(
            "{:<16} {:<28} {:>7.2}m  {}",
            marker.id,
            truncate(&marker.title, 28),
            marker.physical_width_m,
            marker.video_ref
        );
    }
    println!();
    println!("{} marker(s)", markers.len());

    if verify {
        if skipped.is_empty() {
            println!("All reference images are usable.");
        } else {
            println!();
            println!("Excluded from tracking:");
            for (marker, reason) in skipped {
                println!("  {}: {}", marker.id, reason);
            }
        }
    }
}

fn print_json(markers: &[MarkerDescriptor], skipped: &[(MarkerDescriptor, String)]) {
    let entries: Vec<_> = markers
        .iter()
        .map(|marker| {
            let excluded = skipped
                .iter()
                .find(|(s, _)| s.id == marker.id)
                .map(|(_, reason)| reason.clone());
            serde_json::json!({
                "id": marker.id,
                "title": marker.title,
                "marker_image_url": marker.image_ref.as_str(),
                "video_url": marker.video_ref.as_str(),
                "physical_width": marker.physical_width_m,
                "excluded": excluded,
            })
        })
        .collect();

    match serde_json::to_string_pretty(&entries) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode markers: {}", e),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
