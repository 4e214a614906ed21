/// Read the percentage at the start of `text`, e.g. `"12.5%"` or `"100%APR"`.
///
/// Everything before the first `%` must be a decimal number (surrounding
/// whitespace allowed). Returns `None` when there is no `%`, nothing before
/// it, or the prefix is not a finite number. Callers holding optional text
/// use `text.and_then(parse_percentage)`.
///
/// ```
/// use aprwatch_scrape::parse_percentage;
///
/// assert_eq!(parse_percentage("12.5%"), Some(12.5));
/// assert_eq!(parse_percentage("100%APR"), Some(100.0));
/// assert_eq!(parse_percentage("—"), None);
/// assert_eq!(parse_percentage(""), None);
/// ```
pub fn parse_percentage(text: &str) -> Option<f64> {
    let pos = text.find('%')?;
    let number = text[..pos].trim();
    if number.is_empty() {
        return None;
    }
    number.parse::<f64>().ok().filter(|v| v.is_finite())
}
