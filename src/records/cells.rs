//! Cell-level parsing and formatting shared by every row mapper.

/// Trimmed text at `idx`, or `""` when the row is shorter.
#[must_use]
pub fn text(row: &[String], idx: usize) -> &str {
    row.get(idx).map_or("", |cell| cell.trim())
}

/// Owned trimmed text at `idx`.
#[must_use]
pub fn owned(row: &[String], idx: usize) -> String {
    text(row, idx).to_string()
}

/// `None` for blank cells.
#[must_use]
pub fn optional(row: &[String], idx: usize) -> Option<String> {
    let value = text(row, idx);
    (!value.is_empty()).then(|| value.to_string())
}

/// Numeric cell, blank or unreadable cells count as zero.
#[must_use]
pub fn amount(row: &[String], idx: usize) -> f64 {
    parse_amount(text(row, idx)).unwrap_or(0.0)
}

/// Numeric cell where blank means "not recorded".
#[must_use]
pub fn optional_amount(row: &[String], idx: usize) -> Option<f64> {
    parse_amount(text(row, idx))
}

/// Parses `50000`, `Rp 50.000`, `1.500.000`, `50.000,50` or `-15000`.
#[must_use]
pub fn parse_amount(raw: &str) -> Option<f64> {
    let compact: String = raw
        .trim()
        .trim_start_matches("Rp")
        .trim_start_matches("rp")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if compact.is_empty() {
        return None;
    }

    let (negative, digits) = compact
        .strip_prefix('-')
        .map_or((false, compact.as_str()), |rest| (true, rest));
    let digits = digits.strip_prefix("Rp").unwrap_or(digits);

    let normalized = if digits.contains(',') && digits.contains('.') {
        // 1.500.000,50
        digits.replace('.', "").replace(',', ".")
    } else if is_thousands_grouped(digits) {
        digits.replace('.', "")
    } else {
        digits.replace(',', ".")
    };

    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(|value| if negative { -value } else { value })
}

/// `1.500` or `12.500.000`: leading group of 1-3 digits then groups of exactly three.
fn is_thousands_grouped(digits: &str) -> bool {
    let mut groups = digits.split('.');
    let Some(first) = groups.next() else {
        return false;
    };
    let rest: Vec<&str> = groups.collect();
    !rest.is_empty()
        && (1..=3).contains(&first.len())
        && first.chars().all(|c| c.is_ascii_digit())
        && rest
            .iter()
            .all(|group| group.len() == 3 && group.chars().all(|c| c.is_ascii_digit()))
}

/// Formats an amount for a RAW cell write: integral values without a fractional part,
/// fractions with a decimal comma so `1,125` is never read back as thousands grouping.
#[must_use]
pub fn format_amount(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string().replace('.', ",")
    }
}

/// Formats an optional cell, `None` becomes an empty cell.
#[must_use]
pub fn format_optional(value: Option<&String>) -> String {
    value.cloned().unwrap_or_default()
}
