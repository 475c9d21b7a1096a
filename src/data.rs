//! Customer record loading using Polars

use std::collections::BTreeMap;
use std::path::Path;

use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::LoadError;
use crate::filter::CategoricalField;

/// Columns that must be present in the input file
pub const REQUIRED_COLUMNS: [&str; 17] = [
    "customerID",
    "gender",
    "SeniorCitizen",
    "tenure",
    "PhoneService",
    "MultipleLines",
    "InternetService",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
    "Contract",
    "PaymentMethod",
    "MonthlyCharges",
    "Churn",
];

/// Churn status value counted as churned
pub const CHURNED: &str = "Yes";

/// Position of a row in the store, carried through filtering
pub(crate) const ROW_INDEX: &str = "row_index";

/// One customer row, immutable once loaded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerRecord {
    #[serde(rename = "customerID")]
    pub customer_id: String,
    pub gender: String,
    /// 0/1 code as stored in the source file
    #[serde(rename = "SeniorCitizen")]
    pub senior_citizen: u8,
    pub tenure: i64,
    #[serde(rename = "PhoneService")]
    pub phone_service: String,
    #[serde(rename = "MultipleLines")]
    pub multiple_lines: String,
    #[serde(rename = "InternetService")]
    pub internet_service: String,
    #[serde(rename = "OnlineSecurity")]
    pub online_security: String,
    #[serde(rename = "OnlineBackup")]
    pub online_backup: String,
    #[serde(rename = "DeviceProtection")]
    pub device_protection: String,
    #[serde(rename = "TechSupport")]
    pub tech_support: String,
    #[serde(rename = "StreamingTV")]
    pub streaming_tv: String,
    #[serde(rename = "StreamingMovies")]
    pub streaming_movies: String,
    #[serde(rename = "Contract")]
    pub contract: String,
    #[serde(rename = "PaymentMethod")]
    pub payment_method: String,
    #[serde(rename = "MonthlyCharges")]
    pub monthly_charges: f64,
    #[serde(rename = "Churn")]
    pub churn: String,
}

impl CustomerRecord {
    /// Human-readable senior citizen label ("No" for 0, "Yes" for 1)
    pub fn senior_label(&self) -> &'static str {
        senior_label(self.senior_citizen)
    }

    pub fn is_churned(&self) -> bool {
        self.churn == CHURNED
    }
}

/// Map a senior citizen code to its display label
pub fn senior_label(code: u8) -> &'static str {
    if code == 1 {
        "Yes"
    } else {
        "No"
    }
}

/// Map a senior citizen display label back to its code
pub fn senior_code(label: &str) -> Option<u8> {
    match label {
        "No" => Some(0),
        "Yes" => Some(1),
        _ => None,
    }
}

/// Senior citizen display label of each row
pub fn senior_label_expr() -> Expr {
    when(col("SeniorCitizen").eq(lit(1i64)))
        .then(lit("Yes"))
        .otherwise(lit("No"))
}

/// Inclusive integer bounds offered by a range selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliderBounds {
    pub min: i64,
    pub max: i64,
}

/// Selectable options derived from the full record store.
///
/// Domains never depend on the current filters, so options do not shrink as
/// filters are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDomains {
    /// Distinct values per categorical field, in first-appearance order
    pub categorical: BTreeMap<CategoricalField, Vec<String>>,
    /// Senior citizen options are fixed labels, not observed values
    pub senior_labels: [&'static str; 2],
    pub tenure: SliderBounds,
    pub monthly_charges: SliderBounds,
}

impl FieldDomains {
    pub fn values(&self, field: CategoricalField) -> &[String] {
        self.categorical
            .get(&field)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// The full dataset, loaded once and read-only afterwards
#[derive(Debug, Clone)]
pub struct RecordStore {
    records: Vec<CustomerRecord>,
    /// Same rows as `records`, tagged with `ROW_INDEX`
    frame: DataFrame,
}

impl RecordStore {
    pub fn from_records(records: Vec<CustomerRecord>) -> crate::Result<Self> {
        let frame = customer_frame(&records.iter().collect::<Vec<_>>())?;
        Ok(Self { records, frame })
    }

    pub fn records(&self) -> &[CustomerRecord] {
        &self.records
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Compute the filter domains of the whole store
    pub fn domains(&self) -> FieldDomains {
        let categorical = CategoricalField::ALL
            .iter()
            .map(|&field| {
                let mut seen: Vec<String> = Vec::new();
                for record in &self.records {
                    let value = field.value(record);
                    if !seen.iter().any(|v| v == value) {
                        seen.push(value.to_string());
                    }
                }
                (field, seen)
            })
            .collect();

        let tenure = self
            .records
            .iter()
            .map(|r| r.tenure)
            .fold(None, |acc: Option<(i64, i64)>, t| match acc {
                Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
                None => Some((t, t)),
            })
            .map(|(min, max)| SliderBounds { min, max })
            .unwrap_or(SliderBounds { min: 0, max: 0 });

        // Charges are fractional; round outward so the default range keeps every row
        let monthly_charges = self
            .records
            .iter()
            .map(|r| r.monthly_charges)
            .fold(None, |acc: Option<(f64, f64)>, c| match acc {
                Some((lo, hi)) => Some((lo.min(c), hi.max(c))),
                None => Some((c, c)),
            })
            .map(|(min, max)| SliderBounds {
                min: min.floor() as i64,
                max: max.ceil() as i64,
            })
            .unwrap_or(SliderBounds { min: 0, max: 0 });

        FieldDomains {
            categorical,
            senior_labels: ["No", "Yes"],
            tenure,
            monthly_charges,
        }
    }
}

/// Load the customer CSV into a record store
///
/// # Arguments
/// * `file_path` - Path to the CSV file (header row required)
///
/// # Returns
/// * `RecordStore` with one record per data row, or a `LoadError` if the file is
///   missing, malformed, or lacks a required column
pub fn load_records(file_path: impl AsRef<Path>) -> crate::Result<RecordStore> {
    let path = file_path.as_ref();
    info!(path = %path.display(), "loading customer records");

    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .finish()
        .map_err(LoadError::from)?
        .collect()
        .map_err(LoadError::from)?;

    let records = records_from_frame(&df)?;
    info!(rows = records.len(), "customer records loaded");

    RecordStore::from_records(records)
}

fn text_series(
    name: &str,
    rows: &[&CustomerRecord],
    value: impl Fn(&CustomerRecord) -> &str,
) -> Series {
    Series::new(name, rows.iter().map(|r| value(*r)).collect::<Vec<&str>>())
}

/// Build the typed frame of a set of records, indexed by position
pub(crate) fn customer_frame(rows: &[&CustomerRecord]) -> PolarsResult<DataFrame> {
    let index: Vec<u32> = (0..rows.len() as u32).collect();
    let senior: Vec<i64> = rows.iter().map(|r| i64::from(r.senior_citizen)).collect();
    let tenure: Vec<i64> = rows.iter().map(|r| r.tenure).collect();
    let charges: Vec<f64> = rows.iter().map(|r| r.monthly_charges).collect();

    DataFrame::new(vec![
        Series::new(ROW_INDEX, index),
        text_series("customerID", rows, |r| r.customer_id.as_str()),
        text_series("gender", rows, |r| r.gender.as_str()),
        Series::new("SeniorCitizen", senior),
        Series::new("tenure", tenure),
        text_series("PhoneService", rows, |r| r.phone_service.as_str()),
        text_series("MultipleLines", rows, |r| r.multiple_lines.as_str()),
        text_series("InternetService", rows, |r| r.internet_service.as_str()),
        text_series("OnlineSecurity", rows, |r| r.online_security.as_str()),
        text_series("OnlineBackup", rows, |r| r.online_backup.as_str()),
        text_series("DeviceProtection", rows, |r| r.device_protection.as_str()),
        text_series("TechSupport", rows, |r| r.tech_support.as_str()),
        text_series("StreamingTV", rows, |r| r.streaming_tv.as_str()),
        text_series("StreamingMovies", rows, |r| r.streaming_movies.as_str()),
        text_series("Contract", rows, |r| r.contract.as_str()),
        text_series("PaymentMethod", rows, |r| r.payment_method.as_str()),
        Series::new("MonthlyCharges", charges),
        text_series("Churn", rows, |r| r.churn.as_str()),
    ])
}

/// Convert a loaded DataFrame into typed records
fn records_from_frame(df: &DataFrame) -> Result<Vec<CustomerRecord>, LoadError> {
    let present = df.get_column_names();
    if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| !present.contains(*c)) {
        return Err(LoadError::MissingColumn(missing.to_string()));
    }
    debug!(columns = df.width(), rows = df.height(), "input schema validated");

    let ids = string_column(df, "customerID")?;
    let gender = string_column(df, "gender")?;
    let senior = whole_column(df, "SeniorCitizen")?;
    let tenure = whole_column(df, "tenure")?;
    let phone = string_column(df, "PhoneService")?;
    let lines = string_column(df, "MultipleLines")?;
    let internet = string_column(df, "InternetService")?;
    let security = string_column(df, "OnlineSecurity")?;
    let backup = string_column(df, "OnlineBackup")?;
    let protection = string_column(df, "DeviceProtection")?;
    let support = string_column(df, "TechSupport")?;
    let tv = string_column(df, "StreamingTV")?;
    let movies = string_column(df, "StreamingMovies")?;
    let contract = string_column(df, "Contract")?;
    let payment = string_column(df, "PaymentMethod")?;
    let charges = float_column(df, "MonthlyCharges")?;
    let churn = string_column(df, "Churn")?;

    let mut records = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let senior_citizen = match senior[row] {
            0 => 0,
            1 => 1,
            other => {
                return Err(LoadError::InvalidValue {
                    column: "SeniorCitizen".to_string(),
                    row,
                    value: other.to_string(),
                })
            }
        };

        records.push(CustomerRecord {
            customer_id: ids[row].clone(),
            gender: gender[row].clone(),
            senior_citizen,
            tenure: tenure[row],
            phone_service: phone[row].clone(),
            multiple_lines: lines[row].clone(),
            internet_service: internet[row].clone(),
            online_security: security[row].clone(),
            online_backup: backup[row].clone(),
            device_protection: protection[row].clone(),
            tech_support: support[row].clone(),
            streaming_tv: tv[row].clone(),
            streaming_movies: movies[row].clone(),
            contract: contract[row].clone(),
            payment_method: payment[row].clone(),
            monthly_charges: charges[row],
            churn: churn[row].clone(),
        });
    }

    Ok(records)
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<String>, LoadError> {
    let series = df.column(name)?.cast(&DataType::String)?;
    series
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.map(str::to_string).ok_or_else(|| LoadError::NullValue {
                column: name.to_string(),
                row,
            })
        })
        .collect()
}

/// Integer column; fractional values are rejected instead of truncated
fn whole_column(df: &DataFrame, name: &str) -> Result<Vec<i64>, LoadError> {
    float_column(df, name)?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            if value.fract() == 0.0 {
                Ok(value as i64)
            } else {
                Err(LoadError::InvalidValue {
                    column: name.to_string(),
                    row,
                    value: value.to_string(),
                })
            }
        })
        .collect()
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<f64>, LoadError> {
    let series = df.column(name)?.cast(&DataType::Float64)?;
    series
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(v) if v.is_finite() => Ok(v),
            Some(v) => Err(LoadError::InvalidValue {
                column: name.to_string(),
                row,
                value: v.to_string(),
            }),
            None => Err(LoadError::NullValue {
                column: name.to_string(),
                row,
            }),
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::record;
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "customerID,gender,SeniorCitizen,Partner,Dependents,tenure,PhoneService,MultipleLines,InternetService,OnlineSecurity,OnlineBackup,DeviceProtection,TechSupport,StreamingTV,StreamingMovies,Contract,PaperlessBilling,PaymentMethod,MonthlyCharges,TotalCharges,Churn";

    fn create_test_csv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        writeln!(file, "7590-VHVEG,Female,0,Yes,No,1,No,No phone service,DSL,No,Yes,No,No,No,No,Month-to-month,Yes,Electronic check,29.85,29.85,No").unwrap();
        writeln!(file, "5575-GNVDE,Male,0,No,No,34,Yes,No,DSL,Yes,No,Yes,No,No,No,One year,No,Mailed check,56.95,1889.5,No").unwrap();
        writeln!(file, "3668-QPYBK,Male,1,No,No,2,Yes,No,DSL,Yes,Yes,No,No,No,No,Month-to-month,Yes,Mailed check,53.85,108.15,Yes").unwrap();
        writeln!(file, "9237-HQITU,Female,0,No,No,2,Yes,No,Fiber optic,No,No,No,No,No,No,Month-to-month,Yes,Electronic check,70.7,151.65,Yes").unwrap();
        file
    }

    #[test]
    fn test_load_records() {
        let test_file = create_test_csv();
        let store = load_records(test_file.path()).unwrap();

        assert_eq!(store.len(), 4);
        let first = &store.records()[0];
        assert_eq!(first.customer_id, "7590-VHVEG");
        assert_eq!(first.tenure, 1);
        assert_eq!(first.multiple_lines, "No phone service");
        assert!((first.monthly_charges - 29.85).abs() < 1e-9);
        assert!(!first.is_churned());

        let senior = &store.records()[2];
        assert_eq!(senior.senior_citizen, 1);
        assert_eq!(senior.senior_label(), "Yes");
        assert!(senior.is_churned());
    }

    #[test]
    fn test_missing_column_is_load_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "customerID,gender,tenure,MonthlyCharges").unwrap();
        writeln!(file, "1,Female,3,20.0").unwrap();

        let err = load_records(file.path()).unwrap_err();
        match err.downcast_ref::<LoadError>() {
            Some(LoadError::MissingColumn(column)) => assert_eq!(column, "SeniorCitizen"),
            other => panic!("expected missing column, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(load_records("/nonexistent/customer_churn.csv").is_err());
    }

    #[test]
    fn test_domains_cover_full_store() {
        let test_file = create_test_csv();
        let store = load_records(test_file.path()).unwrap();
        let domains = store.domains();

        assert_eq!(domains.values(CategoricalField::Gender), ["Female", "Male"]);
        assert_eq!(
            domains.values(CategoricalField::Contract),
            ["Month-to-month", "One year"]
        );
        assert_eq!(domains.tenure, SliderBounds { min: 1, max: 34 });
        assert_eq!(domains.monthly_charges, SliderBounds { min: 29, max: 71 });
    }

    #[test]
    fn test_fractional_tenure_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        writeln!(file, "7590-VHVEG,Female,0,Yes,No,1.7,No,No phone service,DSL,No,Yes,No,No,No,No,Month-to-month,Yes,Electronic check,29.85,29.85,No").unwrap();

        let err = load_records(file.path()).unwrap_err();
        match err.downcast_ref::<LoadError>() {
            Some(LoadError::InvalidValue { column, row, value }) => {
                assert_eq!(column, "tenure");
                assert_eq!(*row, 0);
                assert_eq!(value, "1.7");
            }
            other => panic!("expected invalid tenure, got {:?}", other),
        }
    }

    #[test]
    fn test_store_frame_matches_records() {
        let test_file = create_test_csv();
        let store = load_records(test_file.path()).unwrap();
        let frame = store.frame();

        assert_eq!(frame.height(), store.len());
        let index: Vec<u32> = frame
            .column(ROW_INDEX)
            .unwrap()
            .u32()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(index, [0, 1, 2, 3]);
        let tenure: Vec<i64> = frame
            .column("tenure")
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(tenure, [1, 34, 2, 2]);
    }

    #[test]
    fn test_empty_store_domains() {
        let domains = RecordStore::from_records(Vec::new()).unwrap().domains();
        assert!(domains.values(CategoricalField::Churn).is_empty());
        assert_eq!(domains.tenure, SliderBounds { min: 0, max: 0 });
    }

    #[test]
    fn test_single_valued_domain() {
        let store = RecordStore::from_records(vec![
            record("a", 1, 10.0, "No"),
            record("b", 2, 20.0, "No"),
        ])
        .unwrap();
        assert_eq!(store.domains().values(CategoricalField::Churn), ["No"]);
    }

    #[test]
    fn test_senior_label_mapping() {
        assert_eq!(senior_label(0), "No");
        assert_eq!(senior_label(1), "Yes");
        assert_eq!(senior_code("Yes"), Some(1));
        assert_eq!(senior_code("No"), Some(0));
        assert_eq!(senior_code("maybe"), None);
    }
}
