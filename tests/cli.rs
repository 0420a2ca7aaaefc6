use assert_cmd::Command;
use predicates::prelude::*;

const SKY: &str = "tests/fixtures/filtered_sky.csv";
const DETECTIONS: &str = "tests/fixtures/detection_result_512px.csv";
const INVALID_DETECTIONS: &str = "tests/fixtures/detection_invalid.csv";

fn evaluate_cmd() -> Command {
    let mut cmd = Command::cargo_bin("skymatch").unwrap();
    cmd.env_remove("SKYMATCH_TOLERANCE_PX")
        .env_remove("SKYMATCH_PROJECTION")
        .args([
            "evaluate",
            "--sky",
            SKY,
            "--detections",
            DETECTIONS,
            "--phase-center-ra",
            "250",
            "--phase-center-dec=-80",
            "--pixel-scale",
            "0.002",
            "--image-size",
            "512",
        ]);
    cmd
}

#[test]
fn runs() {
    let mut cmd = Command::cargo_bin("skymatch").unwrap();
    cmd.assert().success();
}

#[test]
fn outputs_tool_name() {
    let mut cmd = Command::cargo_bin("skymatch").unwrap();
    cmd.arg("-V");
    cmd.assert().success().stdout("skymatch 0.1.0\n");
}

// Evaluate subcommand tests

#[test]
fn evaluate_fixture_reports_counts() {
    evaluate_cmd()
        .assert()
        .success()
        .stdout(predicates::str::contains(
            "34 true positives, 3 false positives, 8 false negatives",
        ))
        .stdout(predicates::str::contains("Tolerance:   5 px"));
}

#[test]
fn evaluate_json_output_format() {
    let output = evaluate_cmd()
        .args(["--output", "json"])
        .output()
        .expect("run skymatch");
    assert!(output.status.success());

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(report["counts"]["true_positives"], 34);
    assert_eq!(report["counts"]["false_positives"], 3);
    assert_eq!(report["counts"]["false_negatives"], 8);
}

#[test]
fn evaluate_clip_to_image_reports_excluded_sources() {
    evaluate_cmd()
        .arg("--clip-to-image")
        .assert()
        .success()
        .stdout(predicates::str::contains("Excluded:    2 truth, 0 detections"));
}

#[test]
fn evaluate_grid_index_gives_same_counts() {
    evaluate_cmd()
        .args(["--index", "grid"])
        .assert()
        .success()
        .stdout(predicates::str::contains("34 true positives"));
}

#[test]
fn evaluate_tolerance_from_env() {
    evaluate_cmd()
        .env("SKYMATCH_TOLERANCE_PX", "2.5")
        .assert()
        .success()
        .stdout(predicates::str::contains("Tolerance:   2.5 px"));
}

#[test]
fn evaluate_writes_mapping_and_overlay() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let mapping = temp.path().join("mapped.csv");
    let overlay = temp.path().join("overlay.json");

    evaluate_cmd()
        .arg("--mapping-out")
        .arg(&mapping)
        .arg("--overlay-out")
        .arg(&overlay)
        .assert()
        .success();

    let mapped = std::fs::read_to_string(&mapping).expect("mapped CSV written");
    // header + 42 truth rows + 3 spurious detections
    assert_eq!(mapped.lines().count(), 46);
    assert!(mapped.starts_with(
        "truth_id,detection_id,truth_x,truth_y,detection_x,detection_y,distance,matched\n"
    ));

    let overlay: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&overlay).expect("overlay written"))
            .expect("overlay is JSON");
    assert_eq!(overlay["links"].as_array().unwrap().len(), 34);
}

#[test]
fn evaluate_missing_source_image_still_succeeds() {
    evaluate_cmd()
        .args(["--source-image", "tests/fixtures/no_such_image.fits"])
        .assert()
        .success()
        .stdout(predicates::str::contains("34 true positives"));
}

#[test]
fn evaluate_negative_tolerance_fails() {
    evaluate_cmd()
        .arg("--tolerance=-1")
        .assert()
        .failure()
        .stderr(predicates::str::contains("tolerance"));
}

#[test]
fn evaluate_nonexistent_sky_fails() {
    let mut cmd = Command::cargo_bin("skymatch").unwrap();
    cmd.args([
        "evaluate",
        "--sky",
        "nonexistent_sky.csv",
        "--detections",
        DETECTIONS,
        "--phase-center-ra",
        "250",
        "--phase-center-dec=-80",
        "--pixel-scale",
        "0.002",
        "--image-size",
        "512",
    ]);
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("not found"));
}

// Validate subcommand tests

#[test]
fn validate_valid_catalog_succeeds() {
    let mut cmd = Command::cargo_bin("skymatch").unwrap();
    cmd.args(["validate", "--detections", DETECTIONS, "--sky", SKY]);
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("Validation passed"));
}

#[test]
fn validate_invalid_catalog_fails() {
    let mut cmd = Command::cargo_bin("skymatch").unwrap();
    cmd.args(["validate", "--detections", INVALID_DETECTIONS]);
    cmd.assert()
        .failure()
        .stdout(predicates::str::contains("2 error(s)"))
        .stdout(predicates::str::contains("NonFinitePixelPosition"))
        .stdout(predicates::str::contains("DecOutOfRange"))
        .stdout(predicates::str::contains("NonPositiveFlux"));
}

#[test]
fn validate_reports_out_of_bounds_with_image_size() {
    let mut cmd = Command::cargo_bin("skymatch").unwrap();
    cmd.args([
        "validate",
        "--detections",
        INVALID_DETECTIONS,
        "--image-size",
        "512",
    ]);
    cmd.assert()
        .failure()
        .stdout(predicates::str::contains("OutOfImageBounds"));
}

fn validate_sky_cmd() -> Command {
    let mut cmd = Command::cargo_bin("skymatch").unwrap();
    cmd.env_remove("SKYMATCH_PROJECTION").args([
        "validate",
        "--detections",
        DETECTIONS,
        "--sky",
        SKY,
        "--image-size",
        "512",
        "--phase-center-ra",
        "250",
        "--phase-center-dec=-80",
        "--pixel-scale",
        "0.002",
    ]);
    cmd
}

#[test]
fn validate_sky_with_transform_reports_off_image_sources() {
    // two sky sources project outside the 512 px image
    validate_sky_cmd()
        .assert()
        .success()
        .stdout(predicates::str::contains("0 error(s) and 2 warning(s)"))
        .stdout(predicates::str::contains("OutOfImageBounds in sky source 40"))
        .stdout(predicates::str::contains("OutOfImageBounds in sky source 41"))
        .stdout(predicates::str::contains("MissingTransform").not());
}

#[test]
fn validate_strict_fails_on_warnings() {
    validate_sky_cmd().arg("--strict").assert().failure();
}

#[test]
fn validate_sky_without_transform_skips_bounds() {
    let mut cmd = Command::cargo_bin("skymatch").unwrap();
    cmd.args([
        "validate",
        "--detections",
        DETECTIONS,
        "--sky",
        SKY,
        "--image-size",
        "512",
    ]);
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("MissingTransform"))
        .stdout(predicates::str::contains("OutOfImageBounds").not());
}

#[test]
fn validate_transform_flags_need_the_full_set() {
    let mut cmd = Command::cargo_bin("skymatch").unwrap();
    cmd.args([
        "validate",
        "--detections",
        DETECTIONS,
        "--sky",
        SKY,
        "--image-size",
        "512",
        "--phase-center-ra",
        "250",
    ]);
    cmd.assert().failure();
}

#[test]
fn validate_json_output_format() {
    let mut cmd = Command::cargo_bin("skymatch").unwrap();
    cmd.args(["validate", "--detections", DETECTIONS, "--output", "json"]);
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("\"error_count\": 0"))
        .stdout(predicates::str::contains("\"warning_count\": 0"));
}

#[test]
fn validate_nonexistent_file_fails() {
    let mut cmd = Command::cargo_bin("skymatch").unwrap();
    cmd.args(["validate", "--detections", "nonexistent_file.csv"]);
    cmd.assert().failure();
}
