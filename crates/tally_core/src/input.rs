/// Splits one input line into URL tokens.
///
/// Lines are whitespace-delimited; blank lines yield nothing. Tokens are not
/// validated here, a malformed URL surfaces later as a fetch failure.
pub fn urls_in_line(line: &str) -> impl Iterator<Item = &str> + '_ {
    line.split_whitespace()
}
