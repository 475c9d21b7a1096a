//! Integration tests for ChurnBoard

use churnboard::aggregate::stacked_percentages;
use churnboard::data::senior_label_expr;
use churnboard::bucket::NO_DATA;
use churnboard::{
    load_records, CategoricalField, ChartKind, Dashboard, LoadError, NumericRange,
    CHARGE_BANDS, TENURE_BANDS,
};
use std::io::Write;
use tempfile::NamedTempFile;

const HEADER: &str = "customerID,gender,SeniorCitizen,Partner,Dependents,tenure,PhoneService,MultipleLines,InternetService,OnlineSecurity,OnlineBackup,DeviceProtection,TechSupport,StreamingTV,StreamingMovies,Contract,PaperlessBilling,PaymentMethod,MonthlyCharges,TotalCharges,Churn";

/// One data row with the fields the tests vary
fn row(id: &str, gender: &str, senior: u8, tenure: i64, contract: &str, charges: f64, churn: &str) -> String {
    format!(
        "{id},{gender},{senior},No,No,{tenure},Yes,No,Fiber optic,No,No,No,No,Yes,Yes,{contract},Yes,Electronic check,{charges},{total},{churn}",
        total = charges * tenure as f64,
    )
}

fn write_csv(rows: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    for line in rows {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

/// Ten customers, three churned, tenure 1-3 months, all paying 95
fn scenario_csv() -> NamedTempFile {
    let tenures = [1, 1, 1, 2, 2, 2, 2, 3, 3, 3];
    let rows: Vec<String> = tenures
        .iter()
        .enumerate()
        .map(|(i, &tenure)| {
            let gender = if i % 2 == 0 { "Female" } else { "Male" };
            let churn = if i < 3 { "Yes" } else { "No" };
            let senior = if i == 0 || i == 5 { 1 } else { 0 };
            row(&format!("C{:03}", i), gender, senior, tenure, "Month-to-month", 95.0, churn)
        })
        .collect();
    write_csv(&rows)
}

/// A mixed dataset spanning every band
fn mixed_csv() -> NamedTempFile {
    let rows = vec![
        row("M01", "Female", 0, 1, "Month-to-month", 29.85, "No"),
        row("M02", "Male", 0, 34, "One year", 56.95, "No"),
        row("M03", "Male", 0, 2, "Month-to-month", 53.85, "Yes"),
        row("M04", "Male", 0, 45, "One year", 42.3, "No"),
        row("M05", "Female", 0, 2, "Month-to-month", 70.7, "Yes"),
        row("M06", "Female", 1, 8, "Month-to-month", 99.65, "Yes"),
        row("M07", "Male", 0, 22, "Month-to-month", 89.1, "No"),
        row("M08", "Female", 0, 10, "Month-to-month", 29.75, "No"),
        row("M09", "Female", 1, 28, "Month-to-month", 104.8, "Yes"),
        row("M10", "Male", 0, 62, "One year", 56.15, "No"),
        row("M11", "Male", 1, 72, "Two year", 118.75, "No"),
        row("M12", "Female", 0, 6, "Two year", 60.0, "No"),
    ];
    write_csv(&rows)
}

#[test]
fn test_scenario_all_inclusive_heatmap() {
    let file = scenario_csv();
    let dashboard = Dashboard::load(file.path()).unwrap();
    let frame = dashboard.interact(&dashboard.default_filters()).unwrap();

    assert_eq!(frame.view.len(), 10);
    assert_eq!(frame.view.churned_count(), 3);

    let rate = frame.grid.rate_by_label("0-6", "90-120").unwrap();
    assert!((rate - 0.30).abs() < 1e-12);

    for (row, tenure) in TENURE_BANDS.labels().iter().enumerate() {
        for (column, charge) in CHARGE_BANDS.labels().iter().enumerate() {
            if (*tenure, *charge) != ("0-6", "90-120") {
                assert!(frame.grid.rate(row, column).is_none());
            }
        }
    }
    assert!(frame.grid.to_string().contains("0.30"));
    assert!(frame.grid.to_string().contains(NO_DATA));
}

#[test]
fn test_scenario_churned_only() {
    let file = scenario_csv();
    let dashboard = Dashboard::load(file.path()).unwrap();
    let filters = dashboard
        .default_filters()
        .with_values(CategoricalField::Churn, ["Yes"]);
    let frame = dashboard.interact(&filters).unwrap();

    let churned_in_store = dashboard
        .store()
        .records()
        .iter()
        .filter(|r| r.churn == "Yes")
        .count();
    assert_eq!(frame.view.len(), churned_in_store);

    let shares = stacked_percentages(&frame.view, senior_label_expr()).unwrap();
    for category in &shares.categories {
        assert_eq!(shares.share(category, "Yes"), Some(100.0));
        assert_eq!(shares.share(category, "No").unwrap_or(0.0), 0.0);
    }
}

#[test]
fn test_scenario_empty_tenure_range_still_exports() {
    let file = scenario_csv();
    let dashboard = Dashboard::load(file.path()).unwrap();
    let filters = dashboard
        .default_filters()
        .with_tenure(NumericRange::new(0.0, 0.0));
    let frame = dashboard.interact(&filters).unwrap();

    assert!(frame.view.is_empty());
    assert!(frame.grid.rates().iter().flatten().all(Option::is_none));
    assert!(frame.charts.iter().all(|c| c.is_empty()));

    let bytes = frame.export_pdf().unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
}

#[test]
fn test_end_to_end_export_order() {
    let file = mixed_csv();
    let dashboard = Dashboard::load(file.path()).unwrap();
    let frame = dashboard.interact(&dashboard.default_filters()).unwrap();

    assert_eq!(frame.view.len(), 12);
    let rendered = frame.render().unwrap();
    let kinds: Vec<ChartKind> = rendered.iter().map(|c| c.kind).collect();
    assert_eq!(kinds, ChartKind::ORDER);
    assert!(rendered.iter().all(|c| c.is_valid()));

    let bytes = churnboard::export_pdf(&rendered).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
}

#[test]
fn test_band_edges_follow_left_closed_rule() {
    let file = mixed_csv();
    let dashboard = Dashboard::load(file.path()).unwrap();
    let frame = dashboard.interact(&dashboard.default_filters()).unwrap();

    // M12: tenure 6 and charge 60 sit on lower edges
    assert_eq!(frame.grid.rate_by_label("6-12", "60-90"), Some(0.0));
    // M11: tenure 72 and charge 118.75 fall in the closed last bands
    assert_eq!(frame.grid.rate_by_label("48-72", "90-120"), Some(0.0));
    assert_eq!(frame.grid.unassigned, 0);
}

#[test]
fn test_filters_respect_predicates() {
    let file = mixed_csv();
    let dashboard = Dashboard::load(file.path()).unwrap();
    let filters = dashboard
        .default_filters()
        .with_values(CategoricalField::Contract, ["Month-to-month"])
        .with_senior_codes([0])
        .with_monthly_charges(NumericRange::new(30.0, 90.0));
    let frame = dashboard.interact(&filters).unwrap();

    let ids: Vec<&str> = frame.view.iter().map(|r| r.customer_id.as_str()).collect();
    assert_eq!(ids, ["M03", "M05", "M07"]);

    for record in dashboard.store().records() {
        let included = ids.contains(&record.customer_id.as_str());
        assert_eq!(included, filters.matches(record));
    }
}

#[test]
fn test_empty_selection_yields_no_rows() {
    let file = mixed_csv();
    let dashboard = Dashboard::load(file.path()).unwrap();
    let filters = dashboard
        .default_filters()
        .with_values(CategoricalField::Gender, Vec::<String>::new());
    assert!(dashboard.interact(&filters).unwrap().view.is_empty());
}

#[test]
fn test_fractional_tenure_fails_to_load() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    writeln!(file, "{}", row("F01", "Female", 0, 3, "Month-to-month", 40.0, "No")).unwrap();
    writeln!(
        file,
        "F02,Male,0,No,No,2.5,Yes,No,DSL,No,No,No,No,No,No,One year,No,Mailed check,55.0,137.5,Yes"
    )
    .unwrap();

    let err = Dashboard::load(file.path()).unwrap_err();
    match err.downcast_ref::<LoadError>() {
        Some(LoadError::InvalidValue { column, row, .. }) => {
            assert_eq!(column, "tenure");
            assert_eq!(*row, 1);
        }
        other => panic!("expected invalid tenure, got {:?}", other),
    }
}

#[test]
fn test_missing_required_column() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "customerID,gender,SeniorCitizen,tenure,MonthlyCharges").unwrap();
    writeln!(file, "X1,Female,0,5,20.0").unwrap();

    let err = load_records(file.path()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LoadError>(),
        Some(LoadError::MissingColumn(_))
    ));
    assert!(Dashboard::load(file.path()).is_err());
}
