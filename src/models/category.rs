use serde::{Deserialize, Serialize};

/// Attack category a payload belongs to. Report keys use the serialized form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    SqlInjection,
    Xss,
    Unauthorized,
    Boundary,
    Idor,
    /// Malformed file uploads
    MalformedFile,
    /// Randomized property trials
    PropertyTrial,
}

/// Declared execution order of the structured-API campaign.
pub const API_CAMPAIGN_ORDER: [Category; 5] = [
    Category::SqlInjection,
    Category::Xss,
    Category::Unauthorized,
    Category::Boundary,
    Category::Idor,
];

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SqlInjection => "SQL_INJECTION",
            Self::Xss => "XSS",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Boundary => "BOUNDARY",
            Self::Idor => "IDOR",
            Self::MalformedFile => "MALFORMED_FILE",
            Self::PropertyTrial => "PROPERTY_TRIAL",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SqlInjection => "SQL Injection",
            Self::Xss => "Cross-Site Scripting",
            Self::Unauthorized => "Unauthorized Access",
            Self::Boundary => "Boundary Values",
            Self::Idor => "Identifier Enumeration (IDOR)",
            Self::MalformedFile => "Malformed File Upload",
            Self::PropertyTrial => "Property Trial",
        }
    }

    /// Categories that swap the shared session credential. They always run
    /// serialized and inside a credential override scope.
    pub fn mutates_credential(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
