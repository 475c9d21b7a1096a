//! Filter predicates and the filtered view of the record store

use std::collections::{BTreeMap, BTreeSet};
use std::io;

use polars::prelude::*;
use tracing::debug;

use crate::data::{
    customer_frame, senior_code, CustomerRecord, FieldDomains, RecordStore, SliderBounds,
    ROW_INDEX,
};

/// Categorical fields filtered by set membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CategoricalField {
    Gender,
    Churn,
    Contract,
    InternetService,
    PaymentMethod,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 5] = [
        CategoricalField::Gender,
        CategoricalField::Churn,
        CategoricalField::Contract,
        CategoricalField::InternetService,
        CategoricalField::PaymentMethod,
    ];

    /// Source column name
    pub fn column(self) -> &'static str {
        match self {
            CategoricalField::Gender => "gender",
            CategoricalField::Churn => "Churn",
            CategoricalField::Contract => "Contract",
            CategoricalField::InternetService => "InternetService",
            CategoricalField::PaymentMethod => "PaymentMethod",
        }
    }

    pub fn value(self, record: &CustomerRecord) -> &str {
        match self {
            CategoricalField::Gender => &record.gender,
            CategoricalField::Churn => &record.churn,
            CategoricalField::Contract => &record.contract,
            CategoricalField::InternetService => &record.internet_service,
            CategoricalField::PaymentMethod => &record.payment_method,
        }
    }
}

/// Inclusive numeric range: `low <= value <= high`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    pub low: f64,
    pub high: f64,
}

impl NumericRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }

    /// `low <= column <= high` as a polars predicate
    pub fn expr(&self, column: &str) -> Expr {
        let value = col(column).cast(DataType::Float64);
        value
            .clone()
            .gt_eq(lit(self.low))
            .and(value.lt_eq(lit(self.high)))
    }
}

impl From<SliderBounds> for NumericRange {
    fn from(bounds: SliderBounds) -> Self {
        Self::new(bounds.min as f64, bounds.max as f64)
    }
}

/// The current selection: allowed values per categorical field plus an
/// inclusive range per numeric field.
///
/// A filter set is rebuilt for every interaction; builders consume and return
/// `self` rather than mutating a shared selection.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSet {
    categorical: BTreeMap<CategoricalField, BTreeSet<String>>,
    senior_citizen: BTreeSet<u8>,
    tenure: NumericRange,
    monthly_charges: NumericRange,
}

impl FilterSet {
    /// Select every observed value and the full numeric ranges
    pub fn all(domains: &FieldDomains) -> Self {
        let categorical = CategoricalField::ALL
            .iter()
            .map(|&field| {
                let allowed: BTreeSet<String> = domains.values(field).iter().cloned().collect();
                (field, allowed)
            })
            .collect();

        Self {
            categorical,
            senior_citizen: [0, 1].into_iter().collect(),
            tenure: domains.tenure.into(),
            monthly_charges: domains.monthly_charges.into(),
        }
    }

    /// Replace the allowed values of one categorical field
    pub fn with_values<I, S>(mut self, field: CategoricalField, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categorical
            .insert(field, values.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the allowed senior citizen codes (0/1)
    pub fn with_senior_codes<I: IntoIterator<Item = u8>>(mut self, codes: I) -> Self {
        self.senior_citizen = codes.into_iter().collect();
        self
    }

    /// Replace the allowed senior citizen codes from display labels
    pub fn with_senior_labels<I, S>(self, labels: I) -> crate::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let codes = labels
            .into_iter()
            .map(|label| {
                let label = label.as_ref();
                senior_code(label).ok_or_else(|| {
                    anyhow::anyhow!("Invalid senior citizen label: {} (expected Yes or No)", label)
                })
            })
            .collect::<crate::Result<Vec<u8>>>()?;
        Ok(self.with_senior_codes(codes))
    }

    pub fn with_tenure(mut self, range: NumericRange) -> Self {
        self.tenure = range;
        self
    }

    pub fn with_monthly_charges(mut self, range: NumericRange) -> Self {
        self.monthly_charges = range;
        self
    }

    pub fn values(&self, field: CategoricalField) -> Option<&BTreeSet<String>> {
        self.categorical.get(&field)
    }

    pub fn senior_codes(&self) -> &BTreeSet<u8> {
        &self.senior_citizen
    }

    pub fn tenure(&self) -> NumericRange {
        self.tenure
    }

    pub fn monthly_charges(&self) -> NumericRange {
        self.monthly_charges
    }

    /// True iff the record satisfies every predicate
    pub fn matches(&self, record: &CustomerRecord) -> bool {
        self.categorical
            .iter()
            .all(|(field, allowed)| allowed.contains(field.value(record)))
            && self.senior_citizen.contains(&record.senior_citizen)
            && self.tenure.contains(record.tenure as f64)
            && self.monthly_charges.contains(record.monthly_charges)
    }

    /// Every predicate AND-combined into one polars expression.
    ///
    /// An empty allowed set yields `is_in` against an empty list, which
    /// matches nothing.
    pub fn to_expr(&self) -> Expr {
        let codes: Vec<i64> = self.senior_citizen.iter().map(|&c| i64::from(c)).collect();
        let senior = col("SeniorCitizen").is_in(lit(Series::new("", codes)));

        self.categorical
            .iter()
            .map(|(field, allowed)| {
                let values: Vec<&str> = allowed.iter().map(String::as_str).collect();
                col(field.column()).is_in(lit(Series::new("", values)))
            })
            .fold(senior, |acc, predicate| acc.and(predicate))
            .and(self.tenure.expr("tenure"))
            .and(self.monthly_charges.expr("MonthlyCharges"))
    }

    /// Produce the filtered view of the store
    pub fn apply<'a>(&self, store: &'a RecordStore) -> crate::Result<FilteredView<'a>> {
        let frame = store
            .frame()
            .clone()
            .lazy()
            .filter(self.to_expr())
            .collect()?;

        let records = store.records();
        let rows: Vec<&CustomerRecord> = frame
            .column(ROW_INDEX)?
            .u32()?
            .into_no_null_iter()
            .filter_map(|index| records.get(index as usize))
            .collect();
        debug!(total = store.len(), matched = rows.len(), "filters applied");

        Ok(FilteredView { rows, frame })
    }
}

/// Records of the store that match the current filter set, together with
/// their polars frame
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    rows: Vec<&'a CustomerRecord>,
    frame: DataFrame,
}

impl Default for FilteredView<'_> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            frame: DataFrame::empty(),
        }
    }
}

impl PartialEq for FilteredView<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
    }
}

impl<'a> FilteredView<'a> {
    pub fn from_rows(rows: Vec<&'a CustomerRecord>) -> crate::Result<Self> {
        let frame = customer_frame(&rows)?;
        Ok(Self { rows, frame })
    }

    pub fn rows(&self) -> &[&'a CustomerRecord] {
        &self.rows
    }

    /// Matching rows as a frame; has no columns for an empty default view
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a CustomerRecord> + '_ {
        self.rows.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn churned_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_churned()).count()
    }

    /// Write the view as CSV with the source column names
    pub fn write_csv<W: io::Write>(&self, writer: W) -> crate::Result<()> {
        let mut wtr = ::csv::Writer::from_writer(writer);
        for record in &self.rows {
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::record;

    fn sample_store() -> RecordStore {
        let mut rows = vec![
            record("a", 1, 20.0, "Yes"),
            record("b", 12, 55.5, "No"),
            record("c", 30, 89.9, "No"),
            record("d", 72, 110.0, "Yes"),
            record("e", 5, 95.0, "No"),
        ];
        rows[1].gender = "Male".to_string();
        rows[2].contract = "Two year".to_string();
        rows[3].senior_citizen = 1;
        rows[4].payment_method = "Mailed check".to_string();
        RecordStore::from_records(rows).unwrap()
    }

    fn ids(view: &FilteredView<'_>) -> Vec<String> {
        view.iter().map(|r| r.customer_id.clone()).collect()
    }

    #[test]
    fn test_all_filters_keep_everything() {
        let store = sample_store();
        let filters = FilterSet::all(&store.domains());
        assert_eq!(filters.apply(&store).unwrap().len(), store.len());
    }

    #[test]
    fn test_categorical_membership() {
        let store = sample_store();
        let filters =
            FilterSet::all(&store.domains()).with_values(CategoricalField::Gender, ["Male"]);
        assert_eq!(ids(&filters.apply(&store).unwrap()), ["b"]);
    }

    #[test]
    fn test_empty_selection_matches_nothing() {
        let store = sample_store();
        let filters = FilterSet::all(&store.domains())
            .with_values(CategoricalField::Contract, Vec::<String>::new());
        assert!(filters.apply(&store).unwrap().is_empty());
    }

    #[test]
    fn test_senior_filter_uses_codes() {
        let store = sample_store();
        let filters = FilterSet::all(&store.domains())
            .with_senior_labels(["Yes"])
            .unwrap();
        assert_eq!(filters.senior_codes().iter().copied().collect::<Vec<_>>(), [1]);
        assert_eq!(ids(&filters.apply(&store).unwrap()), ["d"]);

        assert!(FilterSet::all(&store.domains())
            .with_senior_labels(["1"])
            .is_err());
    }

    #[test]
    fn test_numeric_range_is_inclusive() {
        let store = sample_store();
        let filters = FilterSet::all(&store.domains()).with_tenure(NumericRange::new(12.0, 30.0));
        assert_eq!(ids(&filters.apply(&store).unwrap()), ["b", "c"]);

        let filters =
            FilterSet::all(&store.domains()).with_monthly_charges(NumericRange::new(20.0, 20.0));
        assert_eq!(ids(&filters.apply(&store).unwrap()), ["a"]);
    }

    #[test]
    fn test_predicates_combine_with_and() {
        let store = sample_store();
        let filters = FilterSet::all(&store.domains())
            .with_values(CategoricalField::Churn, ["Yes"])
            .with_tenure(NumericRange::new(0.0, 10.0));
        assert_eq!(ids(&filters.apply(&store).unwrap()), ["a"]);
    }

    #[test]
    fn test_membership_iff_match() {
        let store = sample_store();
        let filters = FilterSet::all(&store.domains())
            .with_values(CategoricalField::Churn, ["No"])
            .with_monthly_charges(NumericRange::new(50.0, 100.0));
        let view = filters.apply(&store).unwrap();

        for record in store.records() {
            let included = view.iter().any(|r| std::ptr::eq(r, record));
            assert_eq!(included, filters.matches(record), "record {}", record.customer_id);
        }
    }

    #[test]
    fn test_widening_never_removes_rows() {
        let store = sample_store();
        let narrow = FilterSet::all(&store.domains())
            .with_values(CategoricalField::PaymentMethod, ["Electronic check"])
            .with_tenure(NumericRange::new(1.0, 12.0));
        let wider = narrow
            .clone()
            .with_values(
                CategoricalField::PaymentMethod,
                ["Electronic check", "Mailed check"],
            )
            .with_tenure(NumericRange::new(0.0, 40.0));

        let narrow_ids = ids(&narrow.apply(&store).unwrap());
        let wider_ids = ids(&wider.apply(&store).unwrap());
        assert!(narrow_ids.iter().all(|id| wider_ids.contains(id)));
        assert!(wider_ids.len() > narrow_ids.len());
    }

    #[test]
    fn test_apply_is_idempotent() {
        let store = sample_store();
        let filters = FilterSet::all(&store.domains()).with_values(CategoricalField::Churn, ["No"]);
        assert_eq!(filters.apply(&store).unwrap(), filters.apply(&store).unwrap());
    }

    #[test]
    fn test_view_frame_holds_matching_rows() {
        let store = sample_store();
        let filters =
            FilterSet::all(&store.domains()).with_values(CategoricalField::Churn, ["Yes"]);
        let view = filters.apply(&store).unwrap();

        assert_eq!(view.frame().height(), view.len());
        let churn: Vec<&str> = view
            .frame()
            .column("Churn")
            .unwrap()
            .str()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(churn, ["Yes", "Yes"]);
    }

    #[test]
    fn test_empty_senior_selection_matches_nothing() {
        let store = sample_store();
        let filters = FilterSet::all(&store.domains()).with_senior_codes(Vec::<u8>::new());
        assert!(filters.apply(&store).unwrap().is_empty());
    }

    #[test]
    fn test_write_csv_uses_source_columns() {
        let store = sample_store();
        let filters = FilterSet::all(&store.domains()).with_values(CategoricalField::Gender, ["Male"]);
        let mut out = Vec::new();
        filters.apply(&store).unwrap().write_csv(&mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("customerID,gender,SeniorCitizen,tenure"));
        assert!(header.ends_with("MonthlyCharges,Churn"));
        assert_eq!(lines.count(), 1);
    }
}
