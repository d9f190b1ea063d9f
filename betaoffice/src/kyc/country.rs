//! Country normalisation to ISO 3166-1 alpha-2 codes.

use isocountry::CountryCode;

/// Informal names customers type that are not ISO short names, mapped to alpha-2.
const ALIASES: &[(&str, &str)] = &[
    ("uk", "GB"),
    ("united kingdom", "GB"),
    ("great britain", "GB"),
    ("britain", "GB"),
    ("england", "GB"),
    ("scotland", "GB"),
    ("wales", "GB"),
    ("northern ireland", "GB"),
    ("republic of ireland", "IE"),
    ("usa", "US"),
    ("united states", "US"),
    ("america", "US"),
    ("the netherlands", "NL"),
    ("netherlands", "NL"),
    ("holland", "NL"),
    ("uae", "AE"),
    ("russia", "RU"),
    ("south korea", "KR"),
    ("korea", "KR"),
    ("north korea", "KP"),
    ("vietnam", "VN"),
    ("iran", "IR"),
    ("syria", "SY"),
    ("laos", "LA"),
    ("moldova", "MD"),
    ("tanzania", "TZ"),
    ("bolivia", "BO"),
    ("venezuela", "VE"),
    ("taiwan", "TW"),
    ("czech republic", "CZ"),
    ("czechia", "CZ"),
    ("turkey", "TR"),
    ("turkiye", "TR"),
    ("ivory coast", "CI"),
    ("cape verde", "CV"),
    ("swaziland", "SZ"),
    ("macedonia", "MK"),
    ("burma", "MM"),
    ("palestine", "PS"),
    ("vatican", "VA"),
];

/// Normalise a user-supplied country to an upper-case alpha-2 code.
///
/// Accepts assigned ISO 3166-1 alpha-2 and alpha-3 codes, ISO short names and the informal names
/// in [`ALIASES`], all case-insensitively. Returns `None` for anything else, including
/// unassigned or user-assigned codes such as `ZZ` or `EU`.
pub fn normalize_country(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lowered = trimmed.to_lowercase();

    if let Some((_, code)) = ALIASES.iter().find(|(alias, _)| *alias == lowered) {
        return Some(code.to_string());
    }

    let upper = trimmed.to_ascii_uppercase();
    let by_code = match upper.len() {
        2 => CountryCode::for_alpha2(&upper).ok(),
        3 => CountryCode::for_alpha3(&upper).ok(),
        _ => None,
    };

    by_code
        .or_else(|| CountryCode::iter().find(|c| c.name().to_lowercase() == lowered).cloned())
        .map(|c| c.alpha2().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_country() {
        assert_eq!(normalize_country("United Kingdom").as_deref(), Some("GB"));
        assert_eq!(normalize_country(" uk ").as_deref(), Some("GB"));
        assert_eq!(normalize_country("gb").as_deref(), Some("GB"));
        assert_eq!(normalize_country("GBR").as_deref(), Some("GB"));
        assert_eq!(normalize_country("USA").as_deref(), Some("US"));
        assert_eq!(normalize_country("Republic of Ireland").as_deref(), Some("IE"));
        assert_eq!(normalize_country("fr").as_deref(), Some("FR"));
        assert_eq!(normalize_country("Germany").as_deref(), Some("DE"));
        assert_eq!(normalize_country("Atlantis"), None);
        assert_eq!(normalize_country("1A"), None);
        assert_eq!(normalize_country(""), None);
    }

    #[test]
    fn test_countries_outside_europe() {
        assert_eq!(normalize_country("Kenya").as_deref(), Some("KE"));
        assert_eq!(normalize_country("KEN").as_deref(), Some("KE"));
        assert_eq!(normalize_country("ke").as_deref(), Some("KE"));
        assert_eq!(normalize_country("Japan").as_deref(), Some("JP"));
        assert_eq!(normalize_country("bra").as_deref(), Some("BR"));
    }

    #[test]
    fn test_unassigned_codes_are_rejected() {
        assert_eq!(normalize_country("ZZ"), None);
        assert_eq!(normalize_country("EU"), None);
        assert_eq!(normalize_country("XX"), None);
        assert_eq!(normalize_country("ZZZ"), None);
    }
}
