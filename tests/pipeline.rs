//! End-to-end runs of resolve + process against local GeoTIFF fixtures.
use std::path::{Path, PathBuf};

use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager, Metadata};

use hls_super::api;
use hls_super::core::filter::{parse_bands, DateRange, QueryFilter, Roi};
use hls_super::io::catalog::CatalogConfig;
use hls_super::io::results::save_results;
use hls_super::{GranuleRecord, OutputFormat, ProcessingParams, Product};

const SIZE: usize = 20;
/// 0.01 degree cells starting at 10E, 46N
const GEOTRANSFORM: [f64; 6] = [10.0, 0.01, 0.0, 46.0, 0.0, -0.01];
/// Half-pixel inside cells 5..15 in both directions
const ROI: &str = "10.055,45.855,10.145,45.945";

fn write_i16(path: &Path, base: i16) {
    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut ds = driver
        .create_with_band_type::<i16, _>(path, SIZE, SIZE, 1)
        .unwrap();
    ds.set_geo_transform(&GEOTRANSFORM).unwrap();
    ds.set_projection(&SpatialRef::from_epsg(4326).unwrap().to_wkt().unwrap())
        .unwrap();
    let mut band = ds.rasterband(1).unwrap();
    band.set_no_data_value(Some(-9999.0)).unwrap();
    band.set_metadata_item("scale_factor", "0.0001", "").unwrap();
    let data: Vec<i16> = (0..SIZE * SIZE).map(|i| base + i as i16).collect();
    let mut buf = Buffer::new((SIZE, SIZE), data);
    band.write((0, 0), (SIZE, SIZE), &mut buf).unwrap();
}

/// Clear everywhere except one cloudy cell at row 7, col 7.
fn write_fmask(path: &Path) {
    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut ds = driver
        .create_with_band_type::<u8, _>(path, SIZE, SIZE, 1)
        .unwrap();
    ds.set_geo_transform(&GEOTRANSFORM).unwrap();
    ds.set_projection(&SpatialRef::from_epsg(4326).unwrap().to_wkt().unwrap())
        .unwrap();
    let mut data = vec![0u8; SIZE * SIZE];
    data[7 * SIZE + 7] = 0b0000_0010;
    let mut buf = Buffer::new((SIZE, SIZE), data);
    ds.rasterband(1)
        .unwrap()
        .write((0, 0), (SIZE, SIZE), &mut buf)
        .unwrap();
}

/// A granule whose assets are GeoTIFFs in `dir`; `missing` keys point nowhere.
/// Band `i` holds `offset + 1000 * (i + 1) + cell index`.
fn granule(dir: &Path, id: &str, keys: &[&str], missing: &[&str]) -> GranuleRecord {
    granule_with_offset(dir, id, keys, missing, 0)
}

fn granule_with_offset(
    dir: &Path,
    id: &str,
    keys: &[&str],
    missing: &[&str],
    offset: i16,
) -> GranuleRecord {
    let mut assets = Vec::new();
    for (i, key) in keys.iter().enumerate() {
        let path = dir.join(format!("{}.{}.tif", id, key));
        if !missing.contains(key) {
            write_i16(&path, offset + 1000 * (i as i16 + 1));
        }
        assets.push((key.to_string(), path.to_string_lossy().into_owned()));
    }
    let fmask = dir.join(format!("{}.Fmask.tif", id));
    write_fmask(&fmask);
    assets.push(("Fmask".to_string(), fmask.to_string_lossy().into_owned()));
    GranuleRecord::new(id, Some(5.0), assets).unwrap()
}

fn filter(bands: &str) -> QueryFilter {
    filter_over(Roi::parse(ROI).unwrap(), bands)
}

fn filter_over(roi: Roi, bands: &str) -> QueryFilter {
    QueryFilter::new(
        roi,
        DateRange::parse("2021-06-01", "2021-06-30").unwrap(),
        vec![Product::S30],
        100,
        parse_bands(bands).unwrap(),
    )
    .unwrap()
}

fn read_all(path: &Path) -> (usize, usize, Vec<f64>) {
    let ds = Dataset::open(path).unwrap();
    let (w, h) = ds.raster_size();
    let buf = ds
        .rasterband(1)
        .unwrap()
        .read_as::<f64>((0, 0), (w, h), (w, h), None)
        .unwrap();
    (w, h, buf.data().to_vec())
}

#[test]
fn cog_batch_skips_only_the_unreachable_asset() {
    let inputs = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let id = "HLS.S30.T32TNS.2021166T102021.v2.0";
    let record = granule(
        inputs.path(),
        id,
        &["B02", "B03", "B04", "B8A", "B11"],
        &["B11"],
    );

    let filter = filter("BLUE,GREEN,RED,NIR1,SWIR1");
    let params = ProcessingParams::default();
    let resolution = api::resolve(&[record], &filter, &params);
    assert_eq!(resolution.task_count(), 5);

    let report = api::process(&resolution, &filter, &params, out.path()).unwrap();
    assert_eq!(report.processed, 4);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.errors, 0);
    assert_eq!(report.outputs.len(), 4);
    assert!(report.skips[0].item.ends_with("B11.tif"));

    let red: PathBuf = out.path().join(format!("{}.B04.subset.tif", id));
    assert!(report.outputs.contains(&red));
    let (w, h, values) = read_all(&red);
    assert_eq!((w, h), (10, 10));
    // window starts at source cell (5, 5); B04 is the third fixture (base 3000)
    assert_eq!(values[0], 3000.0 + (5 * SIZE + 5) as f64);
    // source cell (7, 7) is cloudy
    assert_eq!(values[2 * 10 + 2], -9999.0);
    assert_eq!(values[2 * 10 + 3], 3000.0 + (7 * SIZE + 8) as f64);

    // no staging leftovers
    let hidden = std::fs::read_dir(out.path())
        .unwrap()
        .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().starts_with('.'))
        .count();
    assert_eq!(hidden, 0);
}

#[test]
fn scaling_writes_physical_values() {
    let inputs = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let id = "HLS.S30.T32TNS.2021166T102021.v2.0";
    let record = granule(inputs.path(), id, &["B04"], &[]);

    let filter = filter("RED");
    let params = ProcessingParams {
        format: OutputFormat::Cog,
        quality_filter: false,
        scale: true,
    };
    let resolution = api::resolve(&[record], &filter, &params);
    let report = api::process(&resolution, &filter, &params, out.path()).unwrap();
    assert_eq!(report.processed, 1);

    let (_, _, values) = read_all(&report.outputs[0]);
    let expected = (1000.0 + (5 * SIZE + 5) as f64) * 0.0001;
    assert!((values[0] - expected).abs() < 1e-6);
    // quality filtering is off: the cloudy cell keeps its value
    assert_ne!(values[2 * 10 + 2], -9999.0);
}

fn netcdf_available() -> bool {
    if DriverManager::get_driver_by_name("netCDF").is_ok() {
        return true;
    }
    eprintln!("skipping NC4 test: this GDAL build has no netCDF driver");
    false
}

fn band_values(ds: &Dataset, index: usize) -> Vec<f64> {
    let (w, h) = ds.raster_size();
    ds.rasterband(index)
        .unwrap()
        .read_as::<f64>((0, 0), (w, h), (w, h), None)
        .unwrap()
        .data()
        .to_vec()
}

#[test]
fn nc4_series_stacks_bands_in_time_order() {
    if !netcdf_available() {
        return;
    }
    let inputs = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let keys = ["B04", "B8A"];
    // the later granule carries values above 10000, the earlier one below
    let later = granule_with_offset(
        inputs.path(),
        "HLS.S30.T32TNS.2021171T102021.v2.0",
        &keys,
        &[],
        10_000,
    );
    let earlier = granule(inputs.path(), "HLS.S30.T32TNS.2021166T102021.v2.0", &keys, &[]);

    let filter = filter("RED,NIR1");
    let params = ProcessingParams {
        format: OutputFormat::Nc4,
        quality_filter: true,
        scale: false,
    };
    let resolution = api::resolve(&[later, earlier], &filter, &params);
    let report = api::process(&resolution, &filter, &params, out.path()).unwrap();

    let path = out.path().join("HLS.T32TNS.06152021.06202021.subset.nc4");
    assert_eq!(report.processed, 4);
    assert_eq!(report.errors, 0);
    assert_eq!(report.outputs, vec![path.clone()]);

    for variable in ["RED", "NIR1"] {
        let ds = Dataset::open(format!("NETCDF:\"{}\":{}", path.display(), variable)).unwrap();
        assert_eq!(ds.raster_count(), 2, "{} should have two time steps", variable);
        assert_eq!(ds.raster_size(), (10, 10));

        let times: Vec<f64> = (1..=2)
            .map(|i| {
                ds.rasterband(i)
                    .unwrap()
                    .metadata_item("NETCDF_DIM_time", "")
                    .unwrap()
                    .parse()
                    .unwrap()
            })
            .collect();
        assert!(times[0] < times[1], "{} time axis {:?} is not increasing", variable, times);

        let first = band_values(&ds, 1);
        let second = band_values(&ds, 2);
        let valid = |v: &&f64| **v != -9999.0;
        assert!(first.iter().filter(valid).all(|v| *v < 10_000.0));
        assert!(second.iter().filter(valid).all(|v| *v > 10_000.0));
        // one cloudy cell per layer
        assert_eq!(first.iter().filter(|v| **v == -9999.0).count(), 1);
        assert_eq!(second.iter().filter(|v| **v == -9999.0).count(), 1);
    }
}

/// Web Mercator coordinates of a lon/lat point.
fn to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    const R: f64 = 6_378_137.0;
    let x = R * lon.to_radians();
    let y = R * ((std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan()).ln();
    (x, y)
}

fn mercator_rect(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> String {
    let corners = [
        (min_lon, min_lat),
        (max_lon, min_lat),
        (max_lon, max_lat),
        (min_lon, max_lat),
        (min_lon, min_lat),
    ];
    let ring: Vec<String> = corners
        .iter()
        .map(|(lon, lat)| {
            let (x, y) = to_mercator(*lon, *lat);
            format!("[{:.6}, {:.6}]", x, y)
        })
        .collect();
    format!(
        r#"{{"type": "Feature", "properties": {{}}, "geometry": {{"type": "Polygon", "coordinates": [[{}]]}}}}"#,
        ring.join(", ")
    )
}

#[test]
fn projected_vector_roi_masks_cells_outside_the_polygon() {
    let inputs = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    // an L shape: a full-width top strip plus the lower-left quarter
    let geojson = format!(
        r#"{{"type": "FeatureCollection",
            "crs": {{"type": "name", "properties": {{"name": "urn:ogc:def:crs:EPSG::3857"}}}},
            "features": [{}, {}]}}"#,
        mercator_rect(10.052, 45.902, 10.148, 45.948),
        mercator_rect(10.052, 45.852, 10.098, 45.902)
    );
    let roi_path = inputs.path().join("roi.geojson");
    std::fs::write(&roi_path, geojson).unwrap();

    let roi = Roi::parse(&roi_path.to_string_lossy()).unwrap();
    let bbox = roi.bbox.as_array();
    for (got, want) in bbox.iter().zip([10.052, 45.852, 10.148, 45.948]) {
        assert!((got - want).abs() < 1e-6, "bbox {:?}", bbox);
    }
    assert!(roi.polygon_wkt.is_some());

    let id = "HLS.S30.T32TNS.2021166T102021.v2.0";
    let record = granule(inputs.path(), id, &["B04"], &[]);
    let filter = filter_over(roi, "RED");
    let params = ProcessingParams {
        format: OutputFormat::Cog,
        quality_filter: false,
        scale: false,
    };
    let resolution = api::resolve(&[record], &filter, &params);
    let report = api::process(&resolution, &filter, &params, out.path()).unwrap();
    assert_eq!(report.processed, 1);

    let (w, h, values) = read_all(&report.outputs[0]);
    assert_eq!((w, h), (10, 10));
    let at = |row: usize, col: usize| values[row * 10 + col];
    let source = |row: usize, col: usize| 1000.0 + ((row + 5) * SIZE + col + 5) as f64;
    // top strip and lower-left quarter keep their values
    assert_eq!(at(0, 9), source(0, 9));
    assert_eq!(at(4, 5), source(4, 5));
    assert_eq!(at(9, 0), source(9, 0));
    assert_eq!(at(5, 4), source(5, 4));
    // the lower-right quarter is outside the polygon
    for row in 5..10 {
        for col in 5..10 {
            assert_eq!(at(row, col), -9999.0, "cell ({}, {})", row, col);
        }
    }
}

#[test]
fn cached_results_avoid_the_catalog() {
    let out = tempfile::tempdir().unwrap();
    let filter = filter("RED");
    let record = GranuleRecord::new(
        "HLS.S30.T32TNS.2021166T102021.v2.0",
        Some(1.0),
        vec![("B04".to_string(), "https://data.test/B04.tif".to_string())],
    )
    .unwrap();
    save_results(
        &out.path().join(hls_super::core::config::RESULTS_FILE),
        &filter,
        &[record.clone()],
    )
    .unwrap();

    let config = CatalogConfig {
        endpoint: "http://127.0.0.1:9/unreachable".to_string(),
        max_attempts: 1,
        ..CatalogConfig::default()
    };
    let records = api::search_or_load(&filter, &config, out.path(), false).unwrap();
    assert_eq!(records, vec![record]);
}
