//! Static insight captions and the narrative summary

use crate::charts::ChartKind;

/// One-line insight shown under a chart
pub fn insight(kind: ChartKind) -> &'static str {
    match kind {
        ChartKind::ChurnByGender => {
            "Churn is slightly higher among female customers compared to male customers."
        }
        ChartKind::ChurnBySeniorCitizen => "Senior citizens have a noticeably higher churn rate.",
        ChartKind::TenureDistribution => {
            "Most churn occurs in the early months of tenure, especially within the first 10 months."
        }
        ChartKind::ChurnByContract => "Month-to-month contract users churn much more than others.",
        ChartKind::ChurnByServices => "Customers without support services tend to churn more.",
        ChartKind::ChurnByPaymentMethod => {
            "Electronic Check users churn more, pointing to potential trust or friction issues."
        }
        ChartKind::ChurnHeatmap => {
            "Churn is highest in the first 6 months for high-charge users (₹90–₹120)."
        }
    }
}

pub const KEY_FINDINGS: [(&str, &str); 6] = [
    (
        "New, High-Paying Customers Churn the Most",
        "Especially those with tenure < 6 months and charges > ₹90.",
    ),
    (
        "Senior Citizens Are at Risk",
        "Need better onboarding, support, and possibly simpler plans.",
    ),
    (
        "Long-Term Customers Stay",
        "Loyalty increases after 24 months even at high prices.",
    ),
    (
        "Month-to-Month Users Are Volatile",
        "Much higher churn rate than contract users.",
    ),
    (
        "Support Services Reduce Churn",
        "Tech Support, Security, and Backup features correlate with loyalty.",
    ),
    (
        "Electronic Check Payment = Risk",
        "Needs investigation into user trust/friction.",
    ),
];

pub const RECOMMENDATIONS: [&str; 5] = [
    "Provide discounts, onboarding calls, or welcome benefits in the first 6 months.",
    "Incentivize upgrades to long-term contracts.",
    "Bundle security/support services as default in new user plans.",
    "Offer senior-friendly plans with simple UIs and billing.",
    "Investigate why Electronic Check users leave and streamline the payment flow.",
];

pub const FOCUS_ZONES: [&str; 5] = [
    "Senior Citizens",
    "Tenure < 6 Months",
    "Monthly Charges > ₹90",
    "Month-to-Month Contracts",
    "Electronic Check Payments",
];

/// Render the summary and recommendations as plain text
pub fn narrative() -> String {
    let mut out = String::from("Summary & Recommendations\n\nKey Findings\n");
    for (headline, detail) in KEY_FINDINGS {
        out.push_str(&format!("  - {}: {}\n", headline, detail));
    }
    out.push_str("\nRecommendations\n");
    for item in RECOMMENDATIONS {
        out.push_str(&format!("  - {}\n", item));
    }
    out.push_str("\nFocus Zones\n");
    for item in FOCUS_ZONES {
        out.push_str(&format!("  - {}\n", item));
    }
    out
}
