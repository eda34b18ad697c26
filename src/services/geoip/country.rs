//! ISO 3166-1 alpha-2 国家代码

use std::fmt;

use serde::{Serialize, Serializer};

use crate::errors::{GeoBlockError, Result};

const UNKNOWN_LABEL: &str = "UNKNOWN";

/// Upper-case two-letter country code, or the `UNKNOWN` sentinel when
/// resolution failed.
///
/// The sentinel can only be produced by [`CountryCode::UNKNOWN`]; parsing the
/// string `"UNKNOWN"` is rejected, so it never ends up in a block list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CountryCode(Option<[u8; 2]>);

impl CountryCode {
    pub const UNKNOWN: CountryCode = CountryCode(None);

    /// Trim + upper-case, then require exactly two ASCII letters.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let bytes = trimmed.as_bytes();
        if bytes.len() != 2 || !bytes.iter().all(u8::is_ascii_alphabetic) {
            return Err(GeoBlockError::validation(format!(
                "invalid country code '{}': expected two letters (ISO 3166-1 alpha-2)",
                raw
            )));
        }
        Ok(Self(Some([
            bytes[0].to_ascii_uppercase(),
            bytes[1].to_ascii_uppercase(),
        ])))
    }

    /// Provider answers are best effort: anything unusable becomes `None`.
    pub fn from_provider(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|s| Self::parse(s).ok())
    }

    pub fn is_unknown(&self) -> bool {
        self.0.is_none()
    }

    pub fn as_str(&self) -> &str {
        match &self.0 {
            // 只会存放 ASCII 大写字母
            Some(bytes) => std::str::from_utf8(bytes).unwrap_or(UNKNOWN_LABEL),
            None => UNKNOWN_LABEL,
        }
    }

    /// English country name, when known.
    pub fn name(&self) -> Option<&'static str> {
        country_name(self.as_str())
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CountryCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Normalize a list of raw codes: validated, upper-cased, de-duplicated, sorted.
pub fn parse_country_list<S: AsRef<str>>(raw: &[S]) -> Result<Vec<CountryCode>> {
    let mut codes = raw
        .iter()
        .map(|s| CountryCode::parse(s.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    codes.sort();
    codes.dedup();
    Ok(codes)
}

pub fn country_name(code: &str) -> Option<&'static str> {
    let name = match code {
        "AE" => "United Arab Emirates",
        "AR" => "Argentina",
        "AT" => "Austria",
        "AU" => "Australia",
        "BE" => "Belgium",
        "BR" => "Brazil",
        "BY" => "Belarus",
        "CA" => "Canada",
        "CH" => "Switzerland",
        "CL" => "Chile",
        "CN" => "China",
        "CO" => "Colombia",
        "CU" => "Cuba",
        "CZ" => "Czech Republic",
        "DE" => "Germany",
        "DK" => "Denmark",
        "EG" => "Egypt",
        "ES" => "Spain",
        "FI" => "Finland",
        "FR" => "France",
        "GB" => "United Kingdom",
        "GR" => "Greece",
        "HK" => "Hong Kong",
        "HU" => "Hungary",
        "ID" => "Indonesia",
        "IE" => "Ireland",
        "IL" => "Israel",
        "IN" => "India",
        "IR" => "Iran",
        "IT" => "Italy",
        "JP" => "Japan",
        "KP" => "North Korea",
        "KR" => "South Korea",
        "MX" => "Mexico",
        "MY" => "Malaysia",
        "NG" => "Nigeria",
        "NL" => "Netherlands",
        "NO" => "Norway",
        "NZ" => "New Zealand",
        "PH" => "Philippines",
        "PK" => "Pakistan",
        "PL" => "Poland",
        "PT" => "Portugal",
        "RO" => "Romania",
        "RU" => "Russia",
        "SA" => "Saudi Arabia",
        "SE" => "Sweden",
        "SG" => "Singapore",
        "SY" => "Syria",
        "TH" => "Thailand",
        "TR" => "Turkey",
        "TW" => "Taiwan",
        "UA" => "Ukraine",
        "US" => "United States",
        "VE" => "Venezuela",
        "VN" => "Vietnam",
        "ZA" => "South Africa",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        let code = CountryCode::parse(" de ").unwrap();
        assert_eq!(code.as_str(), "DE");
        assert_eq!(code, CountryCode::parse("DE").unwrap());
    }

    #[test]
    fn test_parse_rejects_non_alpha2() {
        assert!(CountryCode::parse("").is_err());
        assert!(CountryCode::parse("D").is_err());
        assert!(CountryCode::parse("DEU").is_err());
        assert!(CountryCode::parse("1A").is_err());
        assert!(CountryCode::parse("UNKNOWN").is_err());
        assert!(CountryCode::parse("ÄÖ").is_err());
    }

    #[test]
    fn test_unknown_sentinel() {
        assert!(CountryCode::UNKNOWN.is_unknown());
        assert_eq!(CountryCode::UNKNOWN.to_string(), "UNKNOWN");
        assert_eq!(CountryCode::UNKNOWN.name(), None);
        assert_eq!(
            serde_json::to_string(&CountryCode::UNKNOWN).unwrap(),
            "\"UNKNOWN\""
        );
    }

    #[test]
    fn test_parse_country_list_dedups_and_sorts() {
        let codes = parse_country_list(&["ru", "CN", "RU"]).unwrap();
        let labels: Vec<_> = codes.iter().map(|c| c.as_str()).collect();
        assert_eq!(labels, vec!["CN", "RU"]);
        assert!(parse_country_list(&["RU", "Russia"]).is_err());
    }

    #[test]
    fn test_country_names() {
        assert_eq!(CountryCode::parse("us").unwrap().name(), Some("United States"));
        assert_eq!(country_name("ZZ"), None);
    }
}
