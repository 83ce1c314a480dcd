use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seller-onboarding fields as they travel on the wire.
///
/// The client holds one of these while the form is open; the server validates
/// it before storing a [`SellerApplication`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SellerApplicationDraft {
    pub business_name: String,
    pub business_type: String,
    pub description: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub gst_number: String,
    pub bank_account: String,
    pub ifsc_code: String,
}

/// Business categories offered by the onboarding form.
pub const BUSINESS_TYPES: &[&str] = &[
    "handicrafts",
    "textiles",
    "jewelry",
    "food",
    "beauty",
    "art",
    "other",
];

impl SellerApplicationDraft {
    /// Values that must be non-empty before a submission leaves the client.
    pub fn required_fields(&self) -> [&str; 7] {
        [
            self.business_name.as_str(),
            self.business_type.as_str(),
            self.address.as_str(),
            self.city.as_str(),
            self.state.as_str(),
            self.pincode.as_str(),
            self.description.as_str(),
        ]
    }

    pub fn has_required_fields(&self) -> bool {
        self.required_fields()
            .iter()
            .all(|value| !value.is_empty())
    }

    fn trimmed(&self) -> Self {
        Self {
            business_name: self.business_name.trim().to_string(),
            business_type: self.business_type.trim().to_string(),
            description: self.description.trim().to_string(),
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            pincode: self.pincode.trim().to_string(),
            gst_number: self.gst_number.trim().to_uppercase(),
            bank_account: self.bank_account.trim().to_string(),
            ifsc_code: self.ifsc_code.trim().to_uppercase(),
        }
    }
}

/// One field-level validation failure, shaped like the `errors` entries of a
/// rejected submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub path: &'static str,
    pub msg: String,
}

impl FieldViolation {
    fn new(path: &'static str, msg: impl Into<String>) -> Self {
        Self {
            path,
            msg: msg.into(),
        }
    }
}

/// Server-side checks. Returns the normalised draft or every violation found.
pub fn validate_submission(
    draft: &SellerApplicationDraft,
) -> Result<SellerApplicationDraft, Vec<FieldViolation>> {
    let draft = draft.trimmed();
    let mut violations = Vec::new();

    let required = [
        ("businessName", &draft.business_name, "Business name is required"),
        ("businessType", &draft.business_type, "Business type is required"),
        ("description", &draft.description, "Business description is required"),
        ("address", &draft.address, "Address is required"),
        ("city", &draft.city, "City is required"),
        ("state", &draft.state, "State is required"),
        ("pincode", &draft.pincode, "Pincode is required"),
    ];
    for (path, value, message) in required {
        if value.is_empty() {
            violations.push(FieldViolation::new(path, message));
        }
    }

    if !draft.business_type.is_empty() && !BUSINESS_TYPES.contains(&draft.business_type.as_str())
    {
        violations.push(FieldViolation::new("businessType", "Invalid business type"));
    }

    if !draft.pincode.is_empty()
        && !(draft.pincode.len() == 6 && draft.pincode.bytes().all(|b| b.is_ascii_digit()))
    {
        violations.push(FieldViolation::new("pincode", "Invalid pincode"));
    }

    if !draft.gst_number.is_empty()
        && !(draft.gst_number.len() == 15
            && draft.gst_number.bytes().all(|b| b.is_ascii_alphanumeric()))
    {
        violations.push(FieldViolation::new("gstNumber", "Invalid GST number"));
    }

    if !draft.bank_account.is_empty()
        && !((9..=18).contains(&draft.bank_account.len())
            && draft.bank_account.bytes().all(|b| b.is_ascii_digit()))
    {
        violations.push(FieldViolation::new("bankAccount", "Invalid bank account number"));
    }

    if !draft.ifsc_code.is_empty() && !is_ifsc(&draft.ifsc_code) {
        violations.push(FieldViolation::new("ifscCode", "Invalid IFSC code"));
    }

    if violations.is_empty() {
        Ok(draft)
    } else {
        Err(violations)
    }
}

// Four bank letters, a literal zero, six alphanumerics for the branch.
fn is_ifsc(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == 11
        && bytes[..4].iter().all(|b| b.is_ascii_uppercase())
        && bytes[4] == b'0'
        && bytes[5..].iter().all(|b| b.is_ascii_alphanumeric())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(ApplicationStatus::Pending),
            "approved" => Some(ApplicationStatus::Approved),
            "rejected" => Some(ApplicationStatus::Rejected),
            _ => None,
        }
    }
}

/// A stored application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerApplication {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub details: SellerApplicationDraft,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_draft() -> SellerApplicationDraft {
        SellerApplicationDraft {
            business_name: "Kala Crafts".into(),
            business_type: "handicrafts".into(),
            description: "Hand-painted pottery".into(),
            address: "12 Market Road".into(),
            city: "Jaipur".into(),
            state: "Rajasthan".into(),
            pincode: "302001".into(),
            ..Default::default()
        }
    }

    #[test]
    fn wire_format_is_camel_case_with_optional_defaults() {
        let draft: SellerApplicationDraft = serde_json::from_str(
            r#"{"businessName":"Kala","businessType":"art","description":"d","address":"a","city":"c","state":"s","pincode":"302001"}"#,
        )
        .expect("deserialize");
        assert_eq!(draft.business_name, "Kala");
        assert_eq!(draft.gst_number, "");
        assert_eq!(draft.ifsc_code, "");

        let json = serde_json::to_value(&draft).expect("serialize");
        assert_eq!(json["bankAccount"], "");
        assert_eq!(json["pincode"], "302001");
    }

    #[test]
    fn missing_description_fails_required_check() {
        let mut draft = complete_draft();
        assert!(draft.has_required_fields());
        draft.description.clear();
        assert!(!draft.has_required_fields());
    }

    #[test]
    fn valid_submission_is_normalised() {
        let mut draft = complete_draft();
        draft.business_name = "  Kala Crafts ".into();
        draft.ifsc_code = "sbin0001234".into();

        let cleaned = validate_submission(&draft).expect("valid");
        assert_eq!(cleaned.business_name, "Kala Crafts");
        assert_eq!(cleaned.ifsc_code, "SBIN0001234");
    }

    #[test]
    fn reports_every_violation() {
        let mut draft = complete_draft();
        draft.pincode = "30200".into();
        draft.business_type = "weapons".into();
        draft.gst_number = "short".into();
        draft.city = "   ".into();

        let violations = validate_submission(&draft).expect_err("invalid");
        let paths: Vec<_> = violations.iter().map(|v| v.path).collect();
        assert_eq!(paths, vec!["city", "businessType", "pincode", "gstNumber"]);
        assert_eq!(violations[2].msg, "Invalid pincode");
    }

    #[test]
    fn ifsc_shape() {
        assert!(is_ifsc("HDFC0ABC123"));
        assert!(!is_ifsc("HDFC1ABC123"));
        assert!(!is_ifsc("HDF0ABC123"));
    }
}
