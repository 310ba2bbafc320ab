//! Tests for error types

use std::path::PathBuf;

use mlflow_cli::Error;

#[test]
fn test_config_error() {
    let error = Error::Config("tracking URI is required".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Configuration error"));
    assert!(error_str.contains("tracking URI is required"));
}

#[test]
fn test_unsupported_scheme_lists_supported() {
    let error = Error::UnsupportedScheme {
        uri: "s3://bucket/run".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("s3://bucket/run"));
    assert!(error_str.contains("mlflow-artifacts:/"));
    assert!(error_str.contains("file://"));
}

#[test]
fn test_not_found_error() {
    let error = Error::NotFound {
        path: PathBuf::from("/data/model.pkl"),
    };
    assert_eq!(format!("{error}"), "File not found: /data/model.pkl");
}

#[test]
fn test_upload_rejected_carries_status_and_body() {
    let error = Error::UploadRejected {
        status: 403,
        body: "<Error>SignatureDoesNotMatch</Error>".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("403"));
    assert!(error_str.contains("SignatureDoesNotMatch"));
    assert!(error.is_upload_error());
}

#[test]
fn test_upload_error_class() {
    assert!(Error::Upload("connection reset".to_string()).is_upload_error());
    assert!(Error::MissingCredentials {
        path: "a.txt".to_string()
    }
    .is_upload_error());
    assert!(!Error::Auth("no token".to_string()).is_upload_error());
    assert!(!Error::NotFound {
        path: PathBuf::from("x")
    }
    .is_upload_error());
}

#[test]
fn test_partial_failure_error() {
    let error = Error::PartialFailure {
        failures: vec![
            (
                PathBuf::from("model.pkl"),
                Error::UploadRejected {
                    status: 403,
                    body: "AccessDenied".to_string(),
                },
            ),
            (
                PathBuf::from("plot.png"),
                Error::NotFound {
                    path: PathBuf::from("plot.png"),
                },
            ),
        ],
        total: 2,
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Failed to upload any artifacts"));
    assert!(error_str.contains("2 of 2"));
    assert!(error_str.contains("model.pkl: Upload rejected with HTTP 403: AccessDenied"));
    assert!(error_str.contains("plot.png: File not found"));
}

#[test]
fn test_time_series_errors_list_valid_values() {
    assert!(Error::UnsupportedResolution("2m".to_string())
        .to_string()
        .contains("1m, 5m, 1h"));
    assert!(Error::UnsupportedAlignment("nearest".to_string())
        .to_string()
        .contains("floor, ceil, round"));
    assert!(Error::UnsupportedStepMode("wall".to_string())
        .to_string()
        .contains("auto, timestamp, sequence"));
}

#[test]
fn test_api_error() {
    let error = Error::Api {
        status: 404,
        body: "RESOURCE_DOES_NOT_EXIST".to_string(),
    };
    assert!(format!("{error}").contains("Tracking API returned HTTP 404"));
}

#[test]
fn test_unsupported_format_error() {
    let error = Error::UnsupportedFormat(".csv".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains(".csv"));
    assert!(error_str.contains(".json, .yaml, .yml"));
}

#[test]
fn test_invalid_input_error() {
    let error = Error::InvalidInput("invalid tag format".to_string());
    assert!(format!("{error}").contains("Invalid input"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let error: Error = io_error.into();
    assert!(matches!(error, Error::Io(_)));
    assert!(format!("{error}").contains("IO error"));
}

#[test]
fn test_json_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: Error = json_error.into();
    assert!(matches!(error, Error::Json(_)));
}

#[test]
fn test_error_debug() {
    let error = Error::RunNotFound("abc".to_string());
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("RunNotFound"));
}
