mod common;

use common::synthetic::{banded_rings, radial_image, radial_profile, std_dev};
use vessel_recon::image::{ImageI16, ImageView};
use vessel_recon::rings::{
    correct_slice, BlurKind, PolarRdOption, RingParams, RingsReducer,
};
use vessel_recon::volume::Volume;

fn ring_profile(r: f64) -> f64 {
    1000.0 + 30.0 * (r / 6.0).sin()
}

fn stack(slices: &[ImageI16]) -> Volume<i16> {
    let (w, h) = (slices[0].w, slices[0].h);
    let mut data = Vec::with_capacity(w * h * slices.len());
    for s in slices {
        data.extend_from_slice(&s.data);
    }
    Volume::from_vec([w, h, slices.len()], data)
}

#[test]
fn zero_correction_leaves_every_slice_unchanged() {
    let slice = banded_rings(48, 40, [20.0, 17.0], 6, 2, 300.0, -45.0);
    let src = stack(&[slice.clone(), slice]);
    let mut dst = Volume::new([1, 1, 1]);
    let correction = vec![0.0; 40];
    for z in 0..src.sz() {
        correct_slice(&src, &mut dst, &correction, z, [20.0, 17.0], 1.0);
    }
    assert_eq!(dst, src);
}

#[test]
fn mmd_recovers_smooth_ring_profile() {
    let _ = env_logger::builder().is_test(true).try_init();
    let center = [128.0, 128.0];
    let src = radial_image(256, 256, center, ring_profile);
    let mut dst = ImageI16::new(256, 256);
    let reducer = RingsReducer::default();

    let correction = reducer.mmd_polar_rd_2d(&src, &mut dst, center, 1.0);

    assert_eq!(correction[100], 0.0);
    for ri in 5..=120 {
        let expected = ring_profile(ri as f64) - ring_profile(100.0);
        assert!(
            (correction[ri] - expected).abs() < 2.0,
            "ring {ri}: correction {:.3}, expected {expected:.3}",
            correction[ri]
        );
    }

    let target = ring_profile(100.0);
    for y in 0..256 {
        for x in 0..256 {
            let r = ((x as f64 - center[0]).powi(2) + (y as f64 - center[1]).powi(2)).sqrt();
            if (5.0..=100.0).contains(&r) {
                let v = dst.get(x, y) as f64;
                assert!((v - target).abs() < 3.5, "pixel ({x}, {y}) r={r:.2}: {v} vs {target:.2}");
            }
        }
    }
}

#[test]
fn mmd_3d_follows_drifting_centre() {
    let _ = env_logger::builder().is_test(true).try_init();
    let centers = [[90.0, 100.0], [100.0, 100.0], [110.0, 100.0]];
    let slices: Vec<ImageI16> = centers
        .iter()
        .map(|&c| radial_image(200, 200, c, ring_profile))
        .collect();
    let src = stack(&slices);
    let mut dst = Volume::new([1, 1, 1]);
    let reducer = RingsReducer::new(RingParams {
        reference_radius: 40.0,
        ..Default::default()
    });

    let corrections = reducer.mmd_polar_rd_3d(&src, &mut dst, centers[0], centers[2], 1.0);

    assert_eq!(corrections.len(), 3);
    assert_eq!(dst.get_size(), src.get_size());
    let target = ring_profile(40.0);
    for (z, c) in centers.iter().enumerate() {
        assert_eq!(corrections[z][40], 0.0);
        let slice = dst.slice(z);
        for y in 0..200 {
            for x in 0..200 {
                let r = ((x as f64 - c[0]).powi(2) + (y as f64 - c[1]).powi(2)).sqrt();
                if (5.0..=60.0).contains(&r) {
                    let v = slice.get(x, y) as f64;
                    assert!(
                        (v - target).abs() < 3.5,
                        "slice {z} pixel ({x}, {y}): {v} vs {target:.2}"
                    );
                }
            }
        }
    }
}

#[test]
fn sijbers_flattens_banded_rings() {
    let _ = env_logger::builder().is_test(true).try_init();
    let center = [32.0, 32.0];
    let image = banded_rings(64, 64, center, 12, 4, 500.0, 40.0);
    let src = Volume::from_image(&image);
    let mut dst = Volume::new(src.get_size());
    let reducer = RingsReducer::default();

    let correction = reducer.sijbers(&src, &mut dst, 1.0, center, BlurKind::Mean);
    assert_eq!(correction.len(), 45);

    let corrected = ImageI16 {
        w: 64,
        h: 64,
        stride: 64,
        data: dst.as_slice().to_vec(),
    };
    let before = std_dev(&radial_profile(&image, center, 29)[2..]);
    let after = std_dev(&radial_profile(&corrected, center, 29)[2..]);
    assert!(
        after < 0.6 * before,
        "radial std before {before:.3}, after {after:.3}"
    );
}

#[test]
fn sijbers_gaussian_runs_per_slice() {
    let center = [24.0, 24.0];
    let image = banded_rings(48, 48, center, 10, 3, 200.0, 25.0);
    let src = Volume::from_image(&image);
    let mut dst = Volume::new([1, 1, 1]);
    let correction = RingsReducer::default().sijbers(&src, &mut dst, 1.0, center, BlurKind::Gaussian);

    assert_eq!(dst.get_size(), src.get_size());
    // Bright band at radius 10..13 shows up as a positive correction.
    assert!(correction[11] > 5.0, "correction {:?}", &correction[..16]);
    assert!(correction[16] < correction[11]);
}

#[test]
fn polar_rd_compares_against_reference_ring() {
    let _ = env_logger::builder().is_test(true).try_init();
    let center = [40.0, 40.0];
    let image = radial_image(80, 80, center, |r| if (10.0..13.0).contains(&r) { 330.0 } else { 300.0 });
    let src = stack(&[image.clone(), image.clone(), image]);
    let reducer = RingsReducer::new(RingParams {
        reference_radius: 20.0,
        ..Default::default()
    });

    for option in [PolarRdOption::AvgDiff, PolarRdOption::MedDiff] {
        let mut dst = Volume::new([1, 1, 1]);
        let correction = reducer.polar_rd(&src, &mut dst, option, 1.0, center, 1.0);

        assert_eq!(correction[20], 0.0);
        assert!(correction[11] > 20.0, "{option}: {:?}", &correction[..16]);
        assert!(correction[30].abs() < 1.0, "{option}: {:.3}", correction[30]);
        // The centre-slice correction is applied to every slice alike.
        assert_eq!(dst.slice(0).data, dst.slice(2).data);
        assert!((dst.slice(1).get(40, 51) as i32 - 300).abs() <= 6);
    }
}
