use unicode_normalization::UnicodeNormalization as _;

/// Excel compares sheet names case-insensitively across Unicode, not ASCII.
///
/// Approximated by normalizing both inputs with NFKC and then applying Unicode uppercasing.
pub fn sheet_name_eq_case_insensitive(a: &str, b: &str) -> bool {
    a.nfkc()
        .flat_map(|c| c.to_uppercase())
        .eq(b.nfkc().flat_map(|c| c.to_uppercase()))
}

/// Resolve a requested sheet name against the names present in a workbook.
///
/// An exact match wins; otherwise the first case-insensitive match is returned. `None`
/// requested selects the first sheet.
pub fn resolve_sheet_name<'a>(names: &'a [String], requested: Option<&str>) -> Option<&'a str> {
    match requested {
        None => names.first().map(String::as_str),
        Some(wanted) => names
            .iter()
            .find(|name| name.as_str() == wanted)
            .or_else(|| {
                names
                    .iter()
                    .find(|name| sheet_name_eq_case_insensitive(name, wanted))
            })
            .map(String::as_str),
    }
}
