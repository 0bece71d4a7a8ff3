//! Type-shape checks on rendered return types.
//!
//! These run after resolution, on the text that would be written. They look
//! through exactly one level of wrapping (`Promise<…>`, `Array<…>`, `T[]`,
//! `Record<K, V>`) so `Promise<{ a: string }>` counts as an inline object
//! type just like `{ a: string }`.

use common::{AnnotateOptions, Exclusion};

/// Splits `text` on `sep` at bracket depth zero, ignoring string literals
/// and the `>` of `=>`.
pub fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut prev = '\0';
    for (i, ch) in text.char_indices() {
        if let Some(q) = quote {
            if ch == q && prev != '\\' {
                quote = None;
            }
        } else {
            match ch {
                '"' | '\'' | '`' => quote = Some(ch),
                '<' | '(' | '[' | '{' => depth += 1,
                '>' if prev == '=' => {}
                '>' | ')' | ']' | '}' => depth -= 1,
                c if c == sep && depth == 0 => {
                    parts.push(text[start..i].trim());
                    start = i + c.len_utf8();
                }
                _ => {}
            }
        }
        prev = ch;
    }
    parts.push(text[start..].trim());
    parts
}

/// Byte index of the bracket that closes the one opening at `open`.
fn matching_close(text: &str, open: usize) -> Option<usize> {
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut prev = '\0';
    for (i, ch) in text[open..].char_indices() {
        if let Some(q) = quote {
            if ch == q && prev != '\\' {
                quote = None;
            }
        } else {
            match ch {
                '"' | '\'' | '`' => quote = Some(ch),
                '<' | '(' | '[' | '{' => depth += 1,
                '>' if prev == '=' => {}
                '>' | ')' | ']' | '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(open + i);
                    }
                }
                _ => {}
            }
        }
        prev = ch;
    }
    None
}

/// `true` when `text` is a single bracketed group opened by `open`.
fn is_enclosed(text: &str, open: char) -> bool {
    text.starts_with(open) && matching_close(text, 0) == Some(text.len() - 1)
}

/// Removes redundant outer parentheses: `((string | number))` → `string | number`.
pub fn strip_outer_parens(mut text: &str) -> &str {
    text = text.trim();
    while is_enclosed(text, '(') {
        text = text[1..text.len() - 1].trim();
    }
    text
}

/// Arguments of `Name<…>` when the generic spans the whole text.
fn generic_args<'a>(text: &'a str, name: &str) -> Option<Vec<&'a str>> {
    let rest = text.strip_prefix(name)?;
    if !rest.starts_with('<') {
        return None;
    }
    let open = name.len();
    if matching_close(text, open)? != text.len() - 1 {
        return None;
    }
    Some(split_top_level(&text[open + 1..text.len() - 1], ','))
}

/// Peels one wrapper off a type: `Promise<T>`, `Array<T>`,
/// `ReadonlyArray<T>`, `Record<K, V>` (yields `V`) and `T[]`.
pub fn unwrap_once(text: &str) -> Option<&str> {
    let text = strip_outer_parens(text);
    for wrapper in ["Promise", "Array", "ReadonlyArray"] {
        if let Some(args) = generic_args(text, wrapper) {
            return match args.as_slice() {
                [inner] => Some(strip_outer_parens(inner)),
                _ => None,
            };
        }
    }
    if let Some(args) = generic_args(text, "Record") {
        return match args.as_slice() {
            [_, value] => Some(strip_outer_parens(value)),
            _ => None,
        };
    }
    let element = text.strip_prefix("readonly ").unwrap_or(text);
    let element = element.strip_suffix("[]")?;
    // `A | B[]` is a union, not an array of `A | B`.
    if split_top_level(element, '|').len() > 1 {
        return None;
    }
    Some(strip_outer_parens(element))
}

/// `true` for an inline object type such as `{ a: string; }`.
pub fn is_object_literal(text: &str) -> bool {
    is_enclosed(strip_outer_parens(text), '{')
}

/// `true` if the type is an inline object type, directly, as a union
/// member, or one wrapper level down.
pub fn is_anonymous_object(text: &str) -> bool {
    let text = strip_outer_parens(text);
    split_top_level(text, '|').into_iter().any(|member| {
        is_object_literal(member) || unwrap_once(member).is_some_and(is_object_literal)
    })
}

fn is_keyword_type(text: &str, keyword: &str) -> bool {
    let text = strip_outer_parens(text);
    if text == keyword {
        return true;
    }
    matches!(generic_args(text, "Promise").as_deref(), Some([inner]) if strip_outer_parens(inner) == keyword)
}

/// `any` or `Promise<any>`.
pub fn is_any(text: &str) -> bool {
    is_keyword_type(text, "any")
}

/// `unknown` or `Promise<unknown>`.
pub fn is_unknown(text: &str) -> bool {
    is_keyword_type(text, "unknown")
}

/// The shape exclusion that applies to `text` under `options`, if any.
pub fn shape_exclusion(text: &str, options: &AnnotateOptions) -> Option<Exclusion> {
    if options.ignore_anonymous_objects && is_anonymous_object(text) {
        return Some(Exclusion::AnonymousObject);
    }
    if options.ignore_any && is_any(text) {
        return Some(Exclusion::AnyType);
    }
    if options.ignore_unknown && is_unknown(text) {
        return Some(Exclusion::UnknownType);
    }
    None
}
