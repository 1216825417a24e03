use std::path::{Path, PathBuf};

use crate::forecast::{io_csv, io_json, *};

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// A path relative to the directory of the configuration.
pub fn join_path(root: &str, file_path: &str) -> String {
    let p: PathBuf = [root, file_path].iter().collect();
    p.as_path().display().to_string()
}

pub fn source_path(root: &str, cfs: &FileSource) -> String {
    join_path(root, &cfs.file_path)
}

pub fn read_forecast_rows(root: &str, cfs: &FileSource) -> FcResult<Vec<ForecastRow>> {
    let p = source_path(root, cfs);
    info!("Attempting to read forecast file {:?}", p);
    let rows = match cfs.provider.as_str() {
        "json" => io_json::read_json_rows(p),
        "csv" => io_csv::read_csv_rows(p),
        x => whatever!("Provider not implemented {:?}", x),
    }?;
    debug!("read_forecast_rows: {} rows", rows.len());
    Ok(rows)
}

/// County codes may be written as numbers by some exports.
pub fn js_to_code(x: &JSValue) -> FcResult<String> {
    match x {
        JSValue::String(s) => Ok(s.trim().to_string()),
        JSValue::Number(n) => Ok(n.to_string()),
        _ => whatever!("Could not read a county code from {}", x),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths() {
        assert_eq!(simplify_file_name("tests/case/rows.csv"), "rows.csv");
        assert_eq!(join_path("tests/case", "rows.csv"), "tests/case/rows.csv");
    }

    #[test]
    fn county_codes() {
        assert_eq!(js_to_code(&json!("07")).unwrap(), "07");
        assert_eq!(js_to_code(&json!(7)).unwrap(), "7");
        assert!(js_to_code(&json!(null)).is_err());
    }
}
