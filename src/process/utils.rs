use std::collections::HashSet;

/// Tokens a dataframe CSV reader treats as missing by default.
pub const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// 1) Raw CSV field → cell value, `None` for NA tokens.
pub fn to_cell(raw: &str) -> Option<String> {
    if NA_VALUES.contains(&raw) {
        None
    } else {
        Some(raw.to_string())
    }
}

/// 2) Header row → column names.
///  - a leading UTF-8 BOM is stripped
///  - blank names become `Unnamed: <position>`
///  - repeated names get `.1`, `.2`, … suffixes
pub fn normalise_headers<'a, I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut headers = Vec::new();

    for (i, name) in raw.into_iter().enumerate() {
        let name = if i == 0 {
            name.trim_start_matches('\u{feff}')
        } else {
            name
        };
        let base = if name.trim().is_empty() {
            format!("Unnamed: {}", i)
        } else {
            name.to_string()
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        seen.insert(candidate.clone());
        headers.push(candidate);
    }

    headers
}

/// 3) Boolean literals recognised during type inference.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "True" | "TRUE" | "true" => Some(true),
        "False" | "FALSE" | "false" => Some(false),
        _ => None,
    }
}
