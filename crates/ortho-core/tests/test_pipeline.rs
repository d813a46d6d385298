mod common;

use std::sync::{Arc, Mutex};

use ortho_core::error::OrthoError;
use ortho_core::io::geotiff::read_geotiff_info;
use ortho_core::pipeline::{
    init_project, run_pipeline, run_pipeline_reported, run_project, DataType, PipelineStage,
    ProgressReporter, ProjectConfig,
};

use common::{textured_scene, write_flight_log, write_gray_png};

#[derive(Default)]
struct Recorder {
    stages: Mutex<Vec<PipelineStage>>,
}

impl ProgressReporter for Recorder {
    fn begin_stage(&self, stage: PipelineStage, _total_items: Option<usize>) {
        self.stages.lock().unwrap().push(stage);
    }
}

/// A multispectral project with two overlapping captures in two bands.
fn multispectral_project(root: &std::path::Path) -> ProjectConfig {
    let project = init_project("field-a", &root.join("data"), &root.join("output"), false)
        .unwrap()
        .config;
    let mut config = project;
    config.data_type = DataType::Multispectral;

    let scene = textured_scene(160, 260, 42);
    let left = scene.slice(ndarray::s![.., 0..200]).to_owned();
    let right = scene.slice(ndarray::s![.., 60..260]).to_owned();
    let dir = &config.paths.multispectral;
    write_gray_png(&dir.join("img_0001_band1.png"), &left);
    write_gray_png(&dir.join("img_0002_band1.png"), &right);
    write_gray_png(&dir.join("img_0001_band2.png"), &left.mapv(|v| v * 0.5));
    write_gray_png(&dir.join("img_0002_band2.png"), &right.mapv(|v| v * 0.5));
    config
}

#[test]
fn test_init_creates_tree_and_refuses_overwrite() {
    let root = tempfile::tempdir().unwrap();
    let data = root.path().join("data");
    let output = root.path().join("output");

    let project = init_project("field-a", &data, &output, false).unwrap();
    for dir in project.config.paths.data_dirs() {
        assert!(dir.is_dir(), "{} missing", dir.display());
    }
    assert!(project.config_path.is_file());
    assert_eq!(project.config_path, data.join("field-a").join("project_config.toml"));

    assert!(matches!(
        init_project("field-a", &data, &output, false),
        Err(OrthoError::ProjectExists(_))
    ));

    // Raw data survives a forced re-init.
    let keep = project.config.paths.flight_logs.join("log.csv");
    std::fs::write(&keep, "timestamp_ms,latitude,longitude\n").unwrap();
    init_project("field-a", &data, &output, true).unwrap();
    assert!(keep.exists());
}

#[test]
fn test_config_round_trip() {
    let root = tempfile::tempdir().unwrap();
    let mut config = ProjectConfig::new_default("p", root.path(), &root.path().join("out"));
    config.data_type = DataType::Other("lidar".into());
    config.processing_params.blur_threshold = 42.5;
    config.stitching.max_neighbors = 3;

    let path = root.path().join("cfg.toml");
    config.save(&path).unwrap();
    let loaded = ProjectConfig::load(&path).unwrap();
    assert_eq!(loaded, config);

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("data_type = \"lidar\""));
    assert!(text.contains("[processing_params]"));
}

#[test]
fn test_missing_config_is_a_stop_condition() {
    let root = tempfile::tempdir().unwrap();
    let err = run_project(root.path(), "ghost", Arc::new(Recorder::default())).unwrap_err();
    assert!(matches!(err, OrthoError::ConfigMissing(_)));
    assert!(err.is_stop_condition());
}

#[test]
fn test_unknown_data_type_stops_with_no_frames() {
    let root = tempfile::tempdir().unwrap();
    let mut config = ProjectConfig::new_default("p", root.path(), root.path());
    config.data_type = DataType::Other("thermal".into());

    let err = run_pipeline(&config).unwrap_err();
    assert!(matches!(err, OrthoError::NoUsableFrames(_)));
    assert!(err.is_stop_condition());
}

#[test]
fn test_multispectral_run_writes_geotiff() {
    let root = tempfile::tempdir().unwrap();
    let config = multispectral_project(root.path());
    write_flight_log(
        &config.paths.flight_logs.join("flight.csv"),
        &[(1000.0, 10.001, 20.001), (0.0, 10.0, 20.0), (500.0, 10.0005, 20.0005)],
    );

    let recorder = Arc::new(Recorder::default());
    let report = run_pipeline_reported(&config, recorder.clone()).unwrap();

    assert_eq!(report.frames_selected, 4);
    assert_eq!(report.frames_stitched, 2);
    assert!((report.composite_width as i64 - 260).abs() <= 2);
    assert_eq!(report.composite_height, 160);
    assert_eq!(report.flight_log_points, 3);
    assert_eq!(report.output, config.paths.output.join("stitched_georeferenced.tif"));

    let info = read_geotiff_info(&report.output).unwrap();
    assert_eq!(info.epsg, Some(4326));
    assert_eq!(info.bands, 1);
    let (x, y) = info.transform.apply(0.0, 0.0);
    assert!((x - 20.0).abs() < 1e-9 && (y - 10.0).abs() < 1e-9);

    let stages = recorder.stages.lock().unwrap().clone();
    assert_eq!(
        stages,
        vec![
            PipelineStage::FrameSelection,
            PipelineStage::Stitching,
            PipelineStage::LoadingFlightLog,
            PipelineStage::Georeferencing
        ]
    );
}

#[test]
fn test_missing_flight_log_leaves_no_output() {
    let root = tempfile::tempdir().unwrap();
    let config = multispectral_project(root.path());

    let err = run_pipeline(&config).unwrap_err();
    assert!(matches!(err, OrthoError::NoFlightLog(_)));
    assert!(!config.output_path().exists());
}

#[test]
fn test_single_reference_band_frame_is_insufficient() {
    let root = tempfile::tempdir().unwrap();
    let mut config = multispectral_project(root.path());
    std::fs::remove_file(config.paths.multispectral.join("img_0002_band1.png")).unwrap();
    config.processing_params.multispectral_band_for_stitching = 1;

    assert!(matches!(
        run_pipeline(&config),
        Err(OrthoError::InsufficientFrames { count: 1 })
    ));
}

#[test]
fn test_video_project_without_videos_stops() {
    let root = tempfile::tempdir().unwrap();
    let config = init_project("v", &root.path().join("data"), &root.path().join("out"), false)
        .unwrap()
        .config;

    let err = run_pipeline(&config).unwrap_err();
    assert!(matches!(err, OrthoError::NoUsableFrames(_)));
}
