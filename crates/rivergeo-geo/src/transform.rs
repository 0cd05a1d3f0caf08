//! CRS comparison and reprojection

use std::path::PathBuf;

use geo::{Coord, MapCoords};
use proj::Proj;
use rivergeo_core::models::{Crs, Geometry, Layer};
use rivergeo_core::{Result, RiverGeoError};

/// Check if two CRS are the same
///
/// EPSG codes are compared when both have one; otherwise the WKT text.
pub fn crs_match(crs1: &Crs, crs2: &Crs) -> bool {
    match (crs1.epsg, crs2.epsg) {
        (Some(a), Some(b)) => a == b,
        (None, None) => crs1.wkt.is_some() && crs1.wkt == crs2.wkt,
        _ => false,
    }
}

/// Detect CRS mismatch and return error if they don't match
pub fn check_crs_mismatch(dataset_crs: &Crs, expected_crs: &Crs) -> Result<()> {
    if !crs_match(dataset_crs, expected_crs) {
        return Err(RiverGeoError::CrsMismatch {
            dataset_crs: dataset_crs.to_string(),
            expected_crs: expected_crs.to_string(),
        });
    }
    Ok(())
}

/// Reproject a geometry from one CRS to another
pub fn reproject_geometry(geometry: &Geometry, from_crs: &Crs, to_crs: &Crs) -> Result<Geometry> {
    if crs_match(from_crs, to_crs) {
        return Ok(geometry.clone());
    }

    let proj = build_proj(from_crs, to_crs)?;
    project(&proj, geometry, from_crs, to_crs)
}

/// Reproject every feature of a layer
///
/// The returned layer carries `to_crs`. A layer without a CRS cannot be
/// reprojected.
pub fn reproject_layer(layer: &Layer, to_crs: &Crs) -> Result<Layer> {
    let from_crs = layer
        .crs
        .as_ref()
        .ok_or_else(|| RiverGeoError::CrsUndefined { path: PathBuf::from(&layer.name) })?;

    let mut reprojected = layer.clone();
    reprojected.crs = Some(to_crs.clone());

    if crs_match(from_crs, to_crs) {
        return Ok(reprojected);
    }

    let proj = build_proj(from_crs, to_crs)?;
    for feature in reprojected.features.iter_mut() {
        if let Some(geometry) = feature.geometry.as_ref() {
            feature.geometry = Some(project(&proj, geometry, from_crs, to_crs)?);
        }
    }

    tracing::debug!(
        "Reprojected {} feature(s) of {} from {} to {}",
        layer.len(),
        layer.name,
        from_crs,
        to_crs
    );
    Ok(reprojected)
}

fn build_proj(from_crs: &Crs, to_crs: &Crs) -> Result<Proj> {
    let definition = |crs: &Crs| {
        crs.definition().ok_or_else(|| RiverGeoError::Projection {
            from: from_crs.to_string(),
            to: to_crs.to_string(),
            reason: "CRS has neither an EPSG code nor WKT".to_string(),
        })
    };
    let from = definition(from_crs)?;
    let to = definition(to_crs)?;

    Proj::new_known_crs(&from, &to, None).map_err(|e| RiverGeoError::Projection {
        from: from_crs.to_string(),
        to: to_crs.to_string(),
        reason: e.to_string(),
    })
}

fn project(proj: &Proj, geometry: &Geometry, from_crs: &Crs, to_crs: &Crs) -> Result<Geometry> {
    geometry.try_map_coords(|coord| {
        proj.convert((coord.x, coord.y))
            .map(|(x, y)| Coord { x, y })
            .map_err(|e| RiverGeoError::Projection {
                from: from_crs.to_string(),
                to: to_crs.to_string(),
                reason: e.to_string(),
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point};
    use proptest::prelude::*;
    use rivergeo_core::models::Feature;

    fn assert_close(a: &Geometry, b: &Geometry, tolerance: f64) {
        let a: Vec<Coord<f64>> = coords(a);
        let b: Vec<Coord<f64>> = coords(b);
        assert_eq!(a.len(), b.len());
        for (p, q) in a.iter().zip(&b) {
            assert!((p.x - q.x).abs() < tolerance, "{:?} vs {:?}", p, q);
            assert!((p.y - q.y).abs() < tolerance, "{:?} vs {:?}", p, q);
        }
    }

    fn coords(geometry: &Geometry) -> Vec<Coord<f64>> {
        use geo::CoordsIter;
        geometry.coords_iter().collect()
    }

    #[test]
    fn test_crs_match() {
        assert!(crs_match(&Crs::from_epsg(25832), &Crs::etrs89_utm32n()));
        assert!(!crs_match(&Crs::from_epsg(25832), &Crs::wgs84()));
        assert!(crs_match(&Crs::from_wkt("LOCAL_CS[\"x\"]", None), &Crs::from_wkt("LOCAL_CS[\"x\"]", None)));
        let undefined = Crs { epsg: None, wkt: None };
        assert!(!crs_match(&undefined, &undefined));
    }

    #[test]
    fn test_check_crs_mismatch() {
        assert!(check_crs_mismatch(&Crs::wgs84(), &Crs::wgs84()).is_ok());

        let err = check_crs_mismatch(&Crs::wgs84(), &Crs::etrs89_utm32n()).unwrap_err();
        assert!(err.to_string().contains("EPSG:4326"));
        assert!(err.to_string().contains("EPSG:25832"));
    }

    #[test]
    fn test_same_crs_is_identity() {
        let geometry: Geometry = point!(x: 1.0, y: 2.0).into();
        let out = reproject_geometry(&geometry, &Crs::wgs84(), &Crs::wgs84()).unwrap();
        assert_eq!(out, geometry);
    }

    #[test]
    fn test_wgs84_to_utm32n() {
        // 9°E is the central meridian of zone 32, so easting is 500 000 m
        let geometry: Geometry = point!(x: 9.0, y: 0.0).into();
        let out = reproject_geometry(&geometry, &Crs::wgs84(), &Crs::etrs89_utm32n()).unwrap();

        match out {
            Geometry::Point(p) => {
                assert!((p.x() - 500_000.0).abs() < 1e-3);
                assert!(p.y().abs() < 1e-3);
            }
            other => panic!("unexpected geometry: {:?}", other),
        }
    }

    #[test]
    fn test_layer_without_crs_is_rejected() {
        let layer = Layer::new("no_crs", None)
            .with_features(vec![Feature::new(point!(x: 0.0, y: 0.0))]);
        let err = reproject_layer(&layer, &Crs::wgs84()).unwrap_err();
        assert!(matches!(err, RiverGeoError::CrsUndefined { .. }));
    }

    #[test]
    fn test_reproject_layer_sets_target_crs() {
        let layer = Layer::new("rivers", Some(Crs::etrs89_utm32n())).with_features(vec![
            Feature::new(line_string![(x: 500000.0, y: 5400000.0), (x: 500100.0, y: 5400100.0)]),
            Feature::default(),
        ]);

        let out = reproject_layer(&layer, &Crs::wgs84()).unwrap();
        assert_eq!(out.crs, Some(Crs::wgs84()));
        assert!(out.features[1].geometry.is_none());
        match out.geometry(0) {
            Some(Geometry::LineString(line)) => assert!((line.0[0].x - 9.0).abs() < 1e-6),
            other => panic!("unexpected geometry: {:?}", other),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_round_trip_returns_original(
            x in 300_000.0..700_000.0f64,
            y in 5_000_000.0..6_000_000.0f64,
            dx in -500.0..500.0f64,
        ) {
            let geometry: Geometry = line_string![(x: x, y: y), (x: x + dx, y: y + 10.0)].into();
            let utm = Crs::etrs89_utm32n();
            let zone33 = Crs::from_epsg(25833);

            let there = reproject_geometry(&geometry, &utm, &zone33).unwrap();
            let back = reproject_geometry(&there, &zone33, &utm).unwrap();
            assert_close(&back, &geometry, 1e-3);
        }
    }
}
