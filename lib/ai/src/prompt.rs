//! Prompts for feedback-conditioned generation.

/// Base prompt for moving a garment from a flat-lay or hanger shot onto a
/// studio mannequin.
pub const MANNEQUIN_TRANSFER_PROMPT: &str = "Place the garment from the source image on a neutral \
grey studio mannequin. Keep the garment's exact color, texture, print, stitching and proportions. \
Show the full garment, front-facing, on a plain light grey background with soft even lighting. \
Do not add accessories, text or watermarks.";

/// Builds the prompt for `attempt` (1-based).
///
/// The first attempt gets `base` unchanged; later attempts append the
/// verifier's feedback on the previous candidate.
#[must_use]
pub fn prompt_for_attempt(base: &str, attempt: u32, last_feedback: &str) -> String {
    if attempt <= 1 {
        return base.to_string();
    }
    format!(
        "{base}\n\nPREVIOUS ATTEMPT FAILED because: {last_feedback}\n\nPLEASE FIX THESE SPECIFIC ISSUES."
    )
}
