//! CVE detail page records

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Vulnerability, is_zero};

/// Data extracted from one CVE detail page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CveDetail {
    /// CVE number, e.g. `CVE-2023-1234`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cve_id: String,

    /// NVD publication date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<NaiveDate>,

    /// Last modification date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<NaiveDate>,

    /// Long-form vulnerability description
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Weakness type label, e.g. `CWE-79`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cwe_type: String,

    /// CVSS base score, 0.0 when the score widget is absent
    #[serde(skip_serializing_if = "is_zero")]
    pub cvss_base_score: f64,

    /// CVSS impact subscore
    #[serde(skip_serializing_if = "is_zero")]
    pub cvss_impact_score: f64,

    /// CVSS exploitability subscore
    #[serde(skip_serializing_if = "is_zero")]
    pub cvss_exploit_score: f64,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub exploit_range: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub attack_complexity: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub authentication: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub confidentiality_impact: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub integrity_impact: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub availability_impact: String,

    /// Vendor/product pairs listed as affected
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub affected_software: Vec<AffectedSoftware>,

    /// Absolute reference URLs
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,

    /// Advisories in the WLB database covering this CVE; partial records
    /// without tags
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_vulnerabilities: Vec<Vulnerability>,
}

/// One vendor/product pair from the affected-software table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffectedSoftware {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub vendor_name: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub vendor_url: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub product_name: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub product_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cve_detail_round_trip() {
        let detail = CveDetail {
            cve_id: "CVE-2023-1234".to_string(),
            published: NaiveDate::from_ymd_opt(2023, 6, 1),
            description: "A stack overflow in the parser.".to_string(),
            cwe_type: "CWE-121".to_string(),
            cvss_base_score: 7.5,
            cvss_impact_score: 6.4,
            cvss_exploit_score: 8.6,
            exploit_range: "Remote".to_string(),
            affected_software: vec![AffectedSoftware {
                vendor_name: "Example".to_string(),
                vendor_url: "https://cxsecurity.com/vendor/example/".to_string(),
                product_name: "Widget".to_string(),
                product_url: "https://cxsecurity.com/product/widget/".to_string(),
            }],
            references: vec!["https://example.com/advisory".to_string()],
            ..Default::default()
        };

        let json = serde_json::to_string(&detail).unwrap();
        let back: CveDetail = serde_json::from_str(&json).unwrap();
        assert_eq!(back, detail);
    }

    #[test]
    fn zero_scores_are_omitted() {
        let json = serde_json::to_value(CveDetail::default()).unwrap();
        assert!(json.get("cvss_base_score").is_none());
    }
}
