//! Random string generation from regex patterns.
//!
//! Fronting dial addresses and transformed host names may be specified as
//! regexes in server entries and tactics; this module samples a concrete
//! string matching such a pattern.

use rand::distributions::Distribution;

use crate::PrngError;

// Bounds unbounded repetitions (`*`, `+`, `{n,}`) so hostile patterns cannot
// produce pathological strings.
const MAX_REPEAT: u32 = 24;

/// Generate a random string matching `pattern`.
///
/// The pattern is treated as anchored: the returned string matches the whole
/// pattern, not a substring. Unsupported constructs (anchors, backreferences,
/// lookaround) are rejected.
pub fn generate(pattern: &str) -> Result<String, PrngError> {
    let generator = rand_regex::Regex::compile(pattern, MAX_REPEAT)
        .map_err(|e| PrngError::Pattern(format!("{}: {}", pattern, e)))?;
    if !generator.is_utf8() {
        return Err(PrngError::Pattern(format!(
            "{}: pattern generates non-UTF-8 strings",
            pattern
        )));
    }
    Ok(generator.sample(&mut rand::thread_rng()))
}
