use std::env;
use std::path::Path;
use std::time::Instant;

use vessel_recon::config::rings::{self, RingsMethod};
use vessel_recon::diagnostics::timing::elapsed_ms;
use vessel_recon::diagnostics::{RingCorrectionReport, TimingBreakdown};
use vessel_recon::image::io::{load_grayscale_i16, save_grayscale_i16, write_json_file};
use vessel_recon::image::{ImageI16, ImageView};
use vessel_recon::rings::RingsReducer;
use vessel_recon::volume::Volume;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = rings::load_config(Path::new(&config_path))?;
    let start = Instant::now();
    let mut timing = TimingBreakdown::default();

    let image = timing.time("load", || load_grayscale_i16(&config.input))?;
    let (w, h) = (image.width(), image.height());
    let center = config.center_for(w, h);
    let reducer = RingsReducer::new(config.params.clone());

    let (corrected, correction) = timing.time("correct", || match &config.method {
        RingsMethod::MmdPolarRd => {
            let mut dst = ImageI16::new(w, h);
            let correction = reducer.mmd_polar_rd_2d(&image, &mut dst, center, config.dr);
            (dst, correction)
        }
        RingsMethod::Sijbers { blur } => {
            let src = Volume::from_image(&image);
            let mut dst = Volume::new(src.get_size());
            let correction = reducer.sijbers(&src, &mut dst, config.dr, center, *blur);
            (slice_to_image(&dst), correction)
        }
        RingsMethod::PolarRd {
            option,
            subpixel_on_ring,
        } => {
            let src = Volume::from_image(&image);
            let mut dst = Volume::new(src.get_size());
            let correction =
                reducer.polar_rd(&src, &mut dst, *option, config.dr, center, *subpixel_on_ring);
            (slice_to_image(&dst), correction)
        }
    });

    timing.time("save", || save_grayscale_i16(&corrected, &config.output.image))?;
    timing.total_ms = elapsed_ms(start);

    let report = RingCorrectionReport {
        method: config.method.label(),
        width: w,
        height: h,
        dr: config.dr,
        center,
        correction,
        timing,
    };
    write_json_file(&config.output.report_json, &report)?;

    println!(
        "Corrected {} ({}x{}, {} rings, {}) in {:.1} ms",
        config.input.display(),
        w,
        h,
        report.correction.len(),
        report.method,
        report.timing.total_ms
    );
    println!("Saved corrected image to {}", config.output.image.display());
    println!("Saved report to {}", config.output.report_json.display());
    Ok(())
}

fn slice_to_image(volume: &Volume<i16>) -> ImageI16 {
    let slice = volume.slice(0);
    ImageI16::from_fn(volume.sx(), volume.sy(), |x, y| slice.get(x, y))
}

fn usage() -> String {
    "Usage: rings_reduction <config.json>".to_string()
}
