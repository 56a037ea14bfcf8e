use std::borrow::Cow;

const TOKEN_FIELDS: [&str; 4] = [
    "\"accessToken\"",
    "\"refreshToken\"",
    "\"access_token\"",
    "\"refresh_token\"",
];

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let nee = needle.as_bytes();
    if nee.is_empty() {
        return Some(0);
    }
    if nee.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - nee.len()).find(|&i| hay[i..i + nee.len()].eq_ignore_ascii_case(nee))
}

fn is_token_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '~' | '+' | '/' | '=')
}

/// `Bearer <token>` becomes `Bearer REDACTED`, whatever the case of "bearer".
pub fn redact_bearer(input: &str) -> Cow<'_, str> {
    const MARKER: &str = "bearer ";
    if find_ascii_case_insensitive(input, MARKER).is_none() {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(idx) = find_ascii_case_insensitive(rest, MARKER) {
        out.push_str(&rest[..idx + MARKER.len()]);
        rest = &rest[idx + MARKER.len()..];

        let consumed: usize = rest
            .chars()
            .take_while(|&ch| is_token_char(ch))
            .map(char::len_utf8)
            .sum();
        if consumed > 0 {
            out.push_str("REDACTED");
        }
        rest = &rest[consumed..];
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Index of the quote closing a JSON string body, skipping `\"` escapes.
fn closing_quote(body: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, b) in body.bytes().enumerate() {
        match b {
            _ if escaped => escaped = false,
            b'\\' => escaped = true,
            b'"' => return Some(i),
            _ => {}
        }
    }
    None
}

/// Blanks the string value of token fields in a JSON text.
fn redact_token_fields(input: &str) -> Cow<'_, str> {
    if !TOKEN_FIELDS.iter().any(|f| input.contains(f)) {
        return Cow::Borrowed(input);
    }

    let mut value = input.to_string();
    for field in TOKEN_FIELDS {
        if !value.contains(field) {
            continue;
        }
        let mut out = String::with_capacity(value.len());
        let mut rest = value.as_str();
        while let Some(idx) = rest.find(field) {
            out.push_str(&rest[..idx + field.len()]);
            rest = &rest[idx + field.len()..];

            // Expect `: "value"`; anything else is left alone.
            let after_colon = rest.trim_start().strip_prefix(':').map(str::trim_start);
            let Some(quoted) = after_colon.and_then(|s| s.strip_prefix('"')) else {
                continue;
            };
            let Some(end) = closing_quote(quoted) else {
                continue;
            };
            out.push_str(":\"REDACTED\"");
            rest = &quoted[end + 1..];
        }
        out.push_str(rest);
        value = out;
    }
    Cow::Owned(value)
}

pub fn redact_secrets(input: &str) -> Cow<'_, str> {
    let after_bearer = redact_bearer(input);
    let value = redact_token_fields(&after_bearer).into_owned();

    if value == input {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(value)
    }
}
