// src/notify/format.rs
// =============================================================================
// Builds the chat message from what the crawler wrote.
//
// Output lines look like `<page> <link>` and are rewritten as sentences:
//   https://site.com http://ext.com
//   -> You can change http://ext.com on page https://site.com to https.
//
// Anything that doesn't have exactly two fields is passed through as-is.
// Error lines are appended under an "Errors:" heading.
// =============================================================================

pub fn format_message(output: &str, errors: &str) -> String {
    let mut message = String::new();

    for line in non_blank_lines(output) {
        match line.split_whitespace().collect::<Vec<_>>().as_slice() {
            [page, link] => {
                message.push_str(&format!("You can change {} on page {} to https.\n", link, page));
            }
            _ => {
                message.push_str(line);
                message.push('\n');
            }
        }
    }

    let errors: Vec<&str> = non_blank_lines(errors).collect();
    if !errors.is_empty() {
        if !message.is_empty() {
            message.push('\n');
        }
        message.push_str("Errors:\n");
        for line in errors {
            message.push_str(line);
            message.push('\n');
        }
    }

    message
}

fn non_blank_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}
