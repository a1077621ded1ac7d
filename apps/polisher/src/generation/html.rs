//! Pulls a standalone HTML document out of free-form model output.

const DOCTYPE: &str = "<!DOCTYPE";
const HTML_OPEN: &str = "<html";
const HTML_CLOSE: &str = "</html>";

/// Returns the body of the first ```html fence, or of the first bare ```
/// fence when there is no html-tagged one.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```html").or_else(|| text.find("```"))?;
    let after_marker = &text[open + 3..];
    // Skip the info string (e.g. "html") up to the end of the opening line.
    let body_start = after_marker.find('\n')? + 1;
    let body = &after_marker[body_start..];
    let close = body.find("\n```")?;
    Some(&body[..close])
}

/// Best-effort extraction of the HTML document from model output:
/// unwraps a markdown fence, drops any preamble before `<!DOCTYPE`/`<html`,
/// and cuts anything after the last `</html>`.
pub fn extract_html_document(output: &str) -> String {
    let mut html = fenced_block(output).unwrap_or(output);

    let trimmed = html.trim_start();
    if !trimmed.starts_with(DOCTYPE) && !trimmed.starts_with(HTML_OPEN) {
        if let Some(start) = html.find(DOCTYPE).or_else(|| html.find(HTML_OPEN)) {
            html = &html[start..];
        }
    }

    if let Some(end) = html.rfind(HTML_CLOSE) {
        html = &html[..end + HTML_CLOSE.len()];
    }

    html.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "<!DOCTYPE html>\n<html><body><h1>Alex</h1></body></html>";

    #[test]
    fn test_plain_document_is_unchanged() {
        assert_eq!(extract_html_document(DOC), DOC);
    }

    #[test]
    fn test_html_fence_is_unwrapped() {
        let output = format!("Here is your resume:\n```html\n{DOC}\n```\nGood luck!");
        assert_eq!(extract_html_document(&output), DOC);
    }

    #[test]
    fn test_bare_fence_is_unwrapped() {
        let output = format!("```\n{DOC}\n```");
        assert_eq!(extract_html_document(&output), DOC);
    }

    #[test]
    fn test_preamble_and_trailer_are_dropped() {
        let output = format!("Sure! I tailored it.\n\n{DOC}\n\nLet me know if you want changes.");
        assert_eq!(extract_html_document(&output), DOC);
    }

    #[test]
    fn test_html_tag_without_doctype() {
        let output = "Result: <html><body>x</body></html> done";
        assert_eq!(extract_html_document(output), "<html><body>x</body></html>");
    }

    #[test]
    fn test_unterminated_fence_falls_back_to_raw_output() {
        let output = format!("```html\n{DOC}");
        assert_eq!(extract_html_document(&output), DOC);
    }

    #[test]
    fn test_non_html_output_is_returned_as_is() {
        assert_eq!(extract_html_document("no markup here"), "no markup here");
    }
}
