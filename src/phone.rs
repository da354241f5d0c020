//! Phone number utilities: normalization, stored-format expansion, E.164
//! composition and the dial-code table.

use serde::Serialize;

/// Strip everything but ASCII digits. This is the canonical contact key.
pub fn normalize(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// True when the input consists only of digits and phone punctuation
/// (`+ - ( )` and spaces) and contains at least one digit.
pub fn is_phone_shaped(input: &str) -> bool {
    input.chars().any(|c| c.is_ascii_digit())
        && input
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' ' | '.'))
}

/// Every format a normalized number may be stored under in the handle table.
///
/// Handles are written by whichever protocol first saw the number, so the
/// same person may appear as `5551234567`, `15551234567` or `+15551234567`.
pub fn stored_formats(normalized: &str) -> Vec<String> {
    let mut formats = vec![normalized.to_string()];

    if normalized.starts_with('1') && normalized.len() > 10 {
        formats.push(normalized[1..].to_string());
        formats.push(format!("+{}", normalized));
    } else if normalized.len() == 10 {
        formats.push(format!("1{}", normalized));
        formats.push(format!("+1{}", normalized));
    } else {
        formats.push(format!("+{}", normalized));
    }

    formats
}

/// Lookup variants for the contact map: raw, then without/with the assumed
/// North American country code.
pub fn lookup_variants(normalized: &str) -> Vec<String> {
    let mut variants = vec![normalized.to_string()];
    if normalized.starts_with('1') && normalized.len() > 10 {
        variants.push(normalized[1..].to_string());
    } else if normalized.len() == 10 {
        variants.push(format!("1{}", normalized));
    }
    variants
}

/// Form used as a send target: digits only, keeping a leading `+`.
pub fn send_form(phone: &str) -> String {
    let digits = normalize(phone);
    if phone.trim_start().starts_with('+') {
        format!("+{}", digits)
    } else {
        digits
    }
}

/// Combine a dial code and local digits into E.164 (`"+1"`, `"555-123-4567"`
/// gives `"+15551234567"`).
pub fn format_e164(dial_code: &str, local_number: &str) -> String {
    let code = dial_code.trim();
    let code = if code.starts_with('+') {
        code.to_string()
    } else {
        format!("+{}", code)
    };
    format!("{}{}", code, normalize(local_number))
}

// ============================================================================
// Dial codes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Country {
    pub dial_code: &'static str,
    pub alpha2: &'static str,
    pub name: &'static str,
    pub flag: String,
}

const COUNTRY_DATA: &[(&str, &str, &str)] = &[
    ("+1", "US", "United States"),
    ("+1", "CA", "Canada"),
    ("+44", "GB", "United Kingdom"),
    ("+33", "FR", "France"),
    ("+49", "DE", "Germany"),
    ("+39", "IT", "Italy"),
    ("+34", "ES", "Spain"),
    ("+31", "NL", "Netherlands"),
    ("+32", "BE", "Belgium"),
    ("+41", "CH", "Switzerland"),
    ("+43", "AT", "Austria"),
    ("+46", "SE", "Sweden"),
    ("+47", "NO", "Norway"),
    ("+45", "DK", "Denmark"),
    ("+358", "FI", "Finland"),
    ("+353", "IE", "Ireland"),
    ("+351", "PT", "Portugal"),
    ("+48", "PL", "Poland"),
    ("+420", "CZ", "Czech Republic"),
    ("+36", "HU", "Hungary"),
    ("+30", "GR", "Greece"),
    ("+90", "TR", "Turkey"),
    ("+7", "RU", "Russia"),
    ("+380", "UA", "Ukraine"),
    ("+61", "AU", "Australia"),
    ("+64", "NZ", "New Zealand"),
    ("+81", "JP", "Japan"),
    ("+82", "KR", "South Korea"),
    ("+86", "CN", "China"),
    ("+91", "IN", "India"),
    ("+62", "ID", "Indonesia"),
    ("+60", "MY", "Malaysia"),
    ("+65", "SG", "Singapore"),
    ("+63", "PH", "Philippines"),
    ("+66", "TH", "Thailand"),
    ("+84", "VN", "Vietnam"),
    ("+971", "AE", "United Arab Emirates"),
    ("+966", "SA", "Saudi Arabia"),
    ("+972", "IL", "Israel"),
    ("+27", "ZA", "South Africa"),
    ("+234", "NG", "Nigeria"),
    ("+254", "KE", "Kenya"),
    ("+233", "GH", "Ghana"),
    ("+55", "BR", "Brazil"),
    ("+52", "MX", "Mexico"),
    ("+54", "AR", "Argentina"),
    ("+57", "CO", "Colombia"),
    ("+56", "CL", "Chile"),
    ("+51", "PE", "Peru"),
];

/// Flag emoji for an ISO 3166-1 alpha-2 code, built from regional indicators.
pub fn flag_emoji(alpha2: &str) -> String {
    if alpha2.chars().count() != 2 {
        return String::new();
    }
    alpha2
        .to_ascii_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase())
        .filter_map(|c| char::from_u32(0x1F1E6 + (c as u32 - 'A' as u32)))
        .collect()
}

fn country(entry: &(&'static str, &'static str, &'static str)) -> Country {
    Country {
        dial_code: entry.0,
        alpha2: entry.1,
        name: entry.2,
        flag: flag_emoji(entry.1),
    }
}

/// All known countries, in table order.
pub fn list_countries() -> Vec<Country> {
    COUNTRY_DATA.iter().map(country).collect()
}

/// First country using the dial code (with or without `+`).
pub fn country_for_dial_code(dial_code: &str) -> Option<Country> {
    let code = dial_code.trim();
    let code = if code.starts_with('+') {
        code.to_string()
    } else {
        format!("+{}", code)
    };
    COUNTRY_DATA
        .iter()
        .find(|entry| entry.0 == code)
        .map(country)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("(555) 123-4567"), "5551234567");
        assert_eq!(normalize("+1 (415) 555-1234"), "14155551234");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_phone_shape() {
        assert!(is_phone_shaped("+1 (555) 123-4567"));
        assert!(is_phone_shaped("5551234567"));
        assert!(!is_phone_shaped("alice"));
        assert!(!is_phone_shaped("a@b.com"));
        assert!(!is_phone_shaped("()-"));
    }

    #[test]
    fn test_stored_formats_ten_digits() {
        assert_eq!(
            stored_formats("5551234567"),
            vec!["5551234567", "15551234567", "+15551234567"]
        );
    }

    #[test]
    fn test_stored_formats_with_country_code() {
        assert_eq!(
            stored_formats("15551234567"),
            vec!["15551234567", "5551234567", "+15551234567"]
        );
    }

    #[test]
    fn test_lookup_variants() {
        assert_eq!(lookup_variants("15551234567"), vec!["15551234567", "5551234567"]);
        assert_eq!(lookup_variants("5551234567"), vec!["5551234567", "15551234567"]);
        assert_eq!(lookup_variants("447700900123"), vec!["447700900123"]);
    }

    #[test]
    fn test_send_form_keeps_plus() {
        assert_eq!(send_form("+1 (555) 123-4567"), "+15551234567");
        assert_eq!(send_form("(555) 123-4567"), "5551234567");
    }

    #[test]
    fn test_format_e164() {
        assert_eq!(format_e164("+1", "555-123-4567"), "+15551234567");
        assert_eq!(format_e164("44", "7700 900123"), "+447700900123");
    }

    #[test]
    fn test_flag_emoji() {
        assert_eq!(flag_emoji("US"), "\u{1F1FA}\u{1F1F8}");
        assert_eq!(flag_emoji("gb"), "\u{1F1EC}\u{1F1E7}");
        assert_eq!(flag_emoji("USA"), "");
    }

    #[test]
    fn test_country_lookup() {
        let us = country_for_dial_code("1").unwrap();
        assert_eq!(us.alpha2, "US");
        assert_eq!(country_for_dial_code("+33").unwrap().name, "France");
        assert!(country_for_dial_code("+999").is_none());
        assert_eq!(list_countries().len(), COUNTRY_DATA.len());
    }
}
