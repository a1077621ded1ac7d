// Shared prompt fragments and prompt-building utilities.
// Each pipeline stage keeps its own templates in its module's prompts.rs;
// fragments used by more than one stage live here.

/// Spelling convention enforced on every generated artefact.
pub const SPELLING_INSTRUCTION: &str =
    "Use Australian English spelling throughout (organised, analysed, optimised).";

/// Output contract for any prompt that must return a standalone HTML document.
pub const HTML_DOCUMENT_INSTRUCTION: &str = "\
IMPORTANT OUTPUT FORMAT:
- Start with: <!DOCTYPE html>
- Include complete HTML structure with <html>, <head>, <body> tags
- Include all CSS styles inline or in <style> tags
- End with: </html>
- DO NOT include any explanations, questions, or markdown
- DO NOT ask for confirmation
- Generate the complete document immediately";

/// Fills `{name}` placeholders in `template` in a single pass, so text
/// inside a bound value is never substituted again. Unknown placeholders are
/// left as-is so a missing binding shows up in the prompt rather than vanishing.
pub fn render(template: &str, bindings: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let bound = after.find('}').and_then(|close| {
            let name = &after[..close];
            bindings
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, value)| (close, *value))
        });

        match bound {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
