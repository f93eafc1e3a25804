/// Removes `--` line comments. The newline that ends a comment is kept, since
/// newlines terminate statements. `--` inside a string literal is not a comment.
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if c == '"' {
            in_string = !in_string;
        } else if !in_string && c == '-' && chars.peek() == Some(&'-') {
            while chars.peek().is_some_and(|&c| c != '\n') {
                chars.next();
            }
            continue;
        }
        out.push(c);
    }

    out
}
