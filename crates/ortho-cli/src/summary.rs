use console::Style;
use ortho_core::error::OrthoError;
use ortho_core::pipeline::{InitializedProject, PipelineReport, ProjectConfig};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    warning: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            warning: Style::new().yellow().bold(),
            path: Style::new().underlined(),
        }
    }
}

fn print_title(s: &Styles, title: &str) {
    println!();
    println!("  {}", s.title.apply_to(title));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(title.chars().count())));
    println!();
}

pub fn print_pipeline_summary(config: &ProjectConfig) {
    let s = Styles::new();
    print_title(&s, "Ortho Pipeline");

    println!(
        "  {:<14}{}",
        s.label.apply_to("Project"),
        s.value.apply_to(&config.project_name)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Data type"),
        s.method.apply_to(&config.data_type)
    );
    if let Some(dir) = config.source_dir() {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Source"),
            s.path.apply_to(dir.display())
        );
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Flight logs"),
        s.path.apply_to(config.paths.flight_logs.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(config.output_path().display())
    );
    println!();

    let params = &config.processing_params;
    println!("  {}", s.header.apply_to("Frame Selection"));
    if config.data_type.is_still_imagery() {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Band"),
            s.value.apply_to(params.multispectral_band_for_stitching)
        );
    } else {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Interval"),
            s.value.apply_to(format!("{} ms", params.frame_extraction_interval_ms))
        );
        println!(
            "    {:<12}{}",
            s.label.apply_to("Blur"),
            s.value.apply_to(params.blur_threshold)
        );
    }
    println!();

    let st = &config.stitching;
    println!("  {}", s.header.apply_to("Stitching"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Confidence"),
        s.value.apply_to(st.min_confidence)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Overlap"),
        s.value.apply_to(format!("{:.0}%", st.min_overlap * 100.0))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Neighbors"),
        s.value.apply_to(if st.max_neighbors == 0 {
            "all".to_string()
        } else {
            st.max_neighbors.to_string()
        })
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Feather"),
        s.value.apply_to(if st.feather { "yes" } else { "no" })
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Register at"),
        s.value.apply_to(if st.registration_megapixels > 0.0 {
            format!("{} MP", st.registration_megapixels)
        } else {
            "full size".to_string()
        })
    );
    println!();
}

pub fn print_report(report: &PipelineReport) {
    let s = Styles::new();
    print_title(&s, "Result");

    println!(
        "  {:<14}{}",
        s.label.apply_to("Frames"),
        s.value.apply_to(format!(
            "{} selected, {} stitched",
            report.frames_selected, report.frames_stitched
        ))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Mosaic"),
        s.value.apply_to(format!(
            "{}x{} ({} band{})",
            report.composite_width,
            report.composite_height,
            report.channels,
            if report.channels == 1 { "" } else { "s" }
        ))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Log points"),
        s.value.apply_to(report.flight_log_points)
    );

    let t = &report.georeference.transform;
    let (min_x, min_y, max_x, max_y) =
        t.bounds(report.composite_width, report.composite_height);
    println!(
        "  {:<14}{}",
        s.label.apply_to("Extent"),
        s.value.apply_to(format!(
            "lon {min_x:.6}..{max_x:.6}, lat {min_y:.6}..{max_y:.6}"
        ))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(report.output.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Elapsed"),
        s.value.apply_to(format!("{:.2} s", report.elapsed.as_secs_f64()))
    );
    println!();
}

pub fn print_init_summary(project: &InitializedProject) {
    let s = Styles::new();
    print_title(&s, "Project Created");

    let paths = &project.config.paths;
    println!(
        "  {:<14}{}",
        s.label.apply_to("Project"),
        s.value.apply_to(&project.config.project_name)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Config"),
        s.path.apply_to(project.config_path.display())
    );
    for (label, dir) in [
        ("RGB video", &paths.rgb_video),
        ("Multispec", &paths.multispectral),
        ("Hyperspec", &paths.hyperspectral),
        ("Flight logs", &paths.flight_logs),
        ("Frames", &paths.frames),
        ("Output", &paths.output),
    ] {
        println!(
            "  {:<14}{}",
            s.label.apply_to(label),
            s.path.apply_to(dir.display())
        );
    }
    println!();
    println!("  Place raw data files into the matching subdirectories.");
    println!();
}

/// Expected stop: reported, but not a failure.
pub fn print_stop(err: &OrthoError) {
    let s = Styles::new();
    println!();
    println!("  {} {}", s.warning.apply_to("Pipeline stopped:"), err);
    println!();
}
