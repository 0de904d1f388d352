//! Command name / attribute splitter.
//!
//! A completed line has the form `<name>[ <attr>]`. The first ASCII space
//! separates the command name from the free-form attribute string that is
//! handed to the handler untouched.

/// Split a completed command line into name and attribute.
///
/// Returns the command name and, when a space was found, everything after
/// it. The distinction between "no attribute" (`None`) and "empty
/// attribute" (`Some("")`, a space as the last character) is meaningful:
/// handlers use `None` to detect that no arguments were given at all.
pub(crate) fn split(line: &str) -> (&str, Option<&str>) {
    match line.find(' ') {
        Some(pos) => (&line[..pos], Some(&line[pos + 1..])),
        None => (line, None),
    }
}
