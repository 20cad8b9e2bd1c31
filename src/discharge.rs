//! EFAS historical river-discharge retrievals.
//!
//! Request shapes match the `efas-historical` query schema on CDS: one year
//! per request, all months, all day-of-month labels, the four synoptic times.
//! Day labels that do not exist in a month (e.g. `31` in February) are
//! silently ignored by the service.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::client::{DataClient, Retrieved};
use crate::error::Result;
use crate::request::Request;

pub const DATASET: &str = "efas-historical";

const MONTHS: [&str; 12] = [
    "01", "02", "03", "04", "05", "06", "07", "08", "09", "10", "11", "12",
];

const DAYS: [&str; 31] = [
    "01", "02", "03", "04", "05", "06", "07", "08", "09", "10", "11", "12", "13", "14", "15", "16",
    "17", "18", "19", "20", "21", "22", "23", "24", "25", "26", "27", "28", "29", "30", "31",
];

const TIMES: [&str; 4] = ["00:00", "06:00", "12:00", "18:00"];

/// Bounding box `[north, west, south, east]` used by the cropped request.
const AREA: [i64; 4] = [54, 14, 49, 20];

/// Whether a retrieval asks for the entire model domain or a server-side
/// geographic subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    Full,
    Cropped,
}

pub fn output_filename(year: i32, coverage: Coverage) -> String {
    match coverage {
        Coverage::Full => format!("discharge_{year}_full.nc.zip"),
        Coverage::Cropped => format!("discharge_{year}.nc.zip"),
    }
}

fn base_request(year: i32) -> Request {
    Request::new()
        .system_version("version_4_0")
        .variable("river_discharge_in_the_last_6_hours")
        .model_levels("surface_level")
        .hyear(year.to_string())
        .hmonth(MONTHS)
        .hday(DAYS)
        .time(TIMES)
        .format("netcdf")
}

/// Selector set for one year of the full (uncropped) domain.
pub fn full_request(year: i32) -> Request {
    base_request(year)
}

/// Selector set for one year cropped to [`AREA`].
///
/// CDS cropping for EFAS 4.0 is broken upstream (still unfixed as of
/// 2023-09-07): area-restricted requests are silently not honored. Until that
/// is resolved the CLI always takes the full-domain path, at the cost of
/// multi-gigabyte files instead of tens of megabytes.
pub fn cropped_request(year: i32) -> Request {
    base_request(year).area(AREA)
}

fn retrieve(
    client: &impl DataClient,
    year: i32,
    coverage: Coverage,
    out_dir: &Path,
) -> Result<Option<Retrieved>> {
    let target: PathBuf = out_dir.join(output_filename(year, coverage));

    // Idempotent by file existence only; content is never verified.
    if target.exists() {
        info!(target = %target.display(), "already downloaded, skipping");
        return Ok(None);
    }

    let request = match coverage {
        Coverage::Full => full_request(year),
        Coverage::Cropped => cropped_request(year),
    };

    let retrieved = client.retrieve(DATASET, &request, &target)?;
    Ok(Some(retrieved))
}

/// Download one year of the full domain into `out_dir`, unless the target
/// file already exists.
pub fn retrieve_full(
    client: &impl DataClient,
    year: i32,
    out_dir: &Path,
) -> Result<Option<Retrieved>> {
    retrieve(client, year, Coverage::Full, out_dir)
}

/// Download one year cropped to [`AREA`]. Not wired into the CLI; see
/// [`cropped_request`].
pub fn retrieve_cropped(
    client: &impl DataClient,
    year: i32,
    out_dir: &Path,
) -> Result<Option<Retrieved>> {
    retrieve(client, year, Coverage::Cropped, out_dir)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::Path;

    use super::*;
    use crate::client::{DataClient, Retrieved};
    use crate::request::RequestValue;

    /// Records every delegated call instead of touching the network.
    struct RecordingClient {
        calls: RefCell<Vec<(String, Request, std::path::PathBuf)>>,
    }

    impl RecordingClient {
        fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl DataClient for RecordingClient {
        fn retrieve(&self, dataset: &str, request: &Request, target: &Path) -> Result<Retrieved> {
            self.calls.borrow_mut().push((
                dataset.to_string(),
                request.clone(),
                target.to_path_buf(),
            ));
            Ok(Retrieved {
                target: target.to_path_buf(),
                size_bytes: 0,
            })
        }
    }

    #[test]
    fn full_request_covers_the_whole_year() {
        let r = full_request(2019);
        assert_eq!(r.get("hyear"), Some(&RequestValue::Str("2019".to_string())));
        assert_eq!(r.get("hmonth").unwrap().as_strings().len(), 12);
        assert_eq!(r.get("hday").unwrap().as_strings().len(), 31);
        assert_eq!(
            r.get("time").unwrap().as_strings(),
            vec!["00:00", "06:00", "12:00", "18:00"]
        );
        assert_eq!(
            r.get("format"),
            Some(&RequestValue::Str("netcdf".to_string()))
        );
        assert!(r.get("area").is_none());
    }

    #[test]
    fn cropped_request_adds_bounding_box() {
        let r = cropped_request(2019);
        assert_eq!(
            r.get("area"),
            Some(&RequestValue::IntList(vec![54, 14, 49, 20]))
        );
    }

    #[test]
    fn output_filenames_are_year_derived() {
        assert_eq!(
            output_filename(2019, Coverage::Full),
            "discharge_2019_full.nc.zip"
        );
        assert_eq!(
            output_filename(2019, Coverage::Cropped),
            "discharge_2019.nc.zip"
        );
    }

    #[test]
    fn missing_file_triggers_exactly_one_call() {
        let dir = tempfile::tempdir().unwrap();
        let client = RecordingClient::new();

        let out = retrieve_full(&client, 2019, dir.path()).unwrap();
        assert!(out.is_some());

        let calls = client.calls.borrow();
        assert_eq!(calls.len(), 1);
        let (dataset, request, target) = &calls[0];
        assert_eq!(dataset, "efas-historical");
        assert_eq!(
            request.get("hyear"),
            Some(&RequestValue::Str("2019".to_string()))
        );
        assert!(target.ends_with("discharge_2019_full.nc.zip"));
    }

    #[test]
    fn existing_file_skips_the_delegated_call() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("discharge_2019_full.nc.zip"), b"stale").unwrap();

        let client = RecordingClient::new();
        let out = retrieve_full(&client, 2019, dir.path()).unwrap();

        assert!(out.is_none());
        assert!(client.calls.borrow().is_empty());
    }

    #[test]
    fn full_and_cropped_targets_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("discharge_2019.nc.zip"), b"cropped").unwrap();

        // A cropped file on disk must not suppress the full download.
        let client = RecordingClient::new();
        let out = retrieve_full(&client, 2019, dir.path()).unwrap();
        assert!(out.is_some());
        assert_eq!(client.calls.borrow().len(), 1);
    }
}
