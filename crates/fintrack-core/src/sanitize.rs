//! Display policy for untrusted message text.
//!
//! Answers come from a model reading an arbitrary document, so nothing in
//! them may reach the terminal as a control sequence. Raw HTML is never
//! interpreted by any renderer in this workspace; it is shown as text.

use std::borrow::Cow;

const TAB: &str = "    ";

/// Remove C0/C1 control characters (ESC included) and expand tabs.
/// Newlines are kept.
pub fn for_display(text: &str) -> Cow<'_, str> {
    if !text.chars().any(needs_cleaning) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\t' => out.push_str(TAB),
            '\n' => out.push('\n'),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn needs_cleaning(c: char) -> bool {
    c != '\n' && c.is_control()
}
