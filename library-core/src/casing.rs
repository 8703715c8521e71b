//! Key casing between the wire (camelCase) and the schema (snake_case)

/// Convert a camelCase wire key into its snake_case column name.
///
/// An underscore is inserted before every uppercase letter except a leading one,
/// then the whole key is lowercased: `publicationYear` -> `publication_year`.
pub fn to_storage_casing(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Convert a snake_case or UPPER_CASE column name into its camelCase wire key.
///
/// Only an underscore followed by a letter is folded; `line_2` stays as is.
pub fn to_wire_casing(key: &str) -> String {
    let lower = key.to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut chars = lower.chars().peekable();

    while let Some(ch) = chars.next() {
        match (ch, chars.peek()) {
            ('_', Some(next)) if next.is_ascii_lowercase() => {
                let next = *next;
                chars.next();
                out.push(next.to_ascii_uppercase());
            }
            _ => out.push(ch),
        }
    }
    out
}
