/// Normalize a compiler-produced C-style parameter list into a comma
/// separated JS argument identifier list.
///
/// Handles:
/// - a lone `void`, surrounding parentheses, array suffixes (`[16]`), and
///   `= default` / `WA_ARG(default)` tails, all stripped;
/// - `<type> <name>` pairs, which become just `name` unless `<type>` is a
///   64-bit integer type, in which case it becomes two 32-bit halves
///   `nameLo, nameHi` (matching the legalize-JS-interface convention of
///   splitting `i64` across a pair of `i32`s);
/// - plain identifiers with no type prefix, which pass through unchanged
///   so the function is idempotent on its own output.
#[must_use]
pub fn normalize_args(raw: &str) -> String {
    let trimmed = strip_outer_parens(raw.trim());
    if trimmed.is_empty() || trimmed == "void" {
        return String::new();
    }

    split_top_level_commas(trimmed)
        .iter()
        .filter_map(|param| normalize_one_param(param))
        .collect::<Vec<_>>()
        .join(", ")
}

fn strip_outer_parens(s: &str) -> &str {
    s.strip_prefix('(').and_then(|s| s.strip_suffix(')')).unwrap_or(s).trim()
}

fn split_top_level_commas(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in s.chars() {
        match c {
            '(' | '[' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts
}

fn normalize_one_param(param: &str) -> Option<String> {
    let mut text = param.trim();
    if text.is_empty() {
        return None;
    }

    // Strip a `WA_ARG(default)` tail.
    if let Some(idx) = text.find("WA_ARG(") {
        text = text[..idx].trim_end();
    }
    // Strip a `= default` tail (but not inside already-removed parens).
    if let Some(idx) = top_level_eq(text) {
        text = text[..idx].trim_end();
    }
    // Strip array suffixes like `[16]` or `[]`.
    if let Some(idx) = text.find('[') {
        text = text[..idx].trim_end();
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    let name = *tokens.last()?;
    let name = name.trim_start_matches('*');

    if tokens.len() <= 1 {
        // No type prefix: either a bare identifier (already-normalized
        // input) or a lone `void`/empty slot.
        return if name.is_empty() || name == "void" { None } else { Some(name.to_string()) };
    }

    let type_text = tokens[..tokens.len() - 1].join(" ");
    if is_64_bit_type(&type_text) {
        Some(format!("{name}Lo, {name}Hi"))
    } else {
        Some(name.to_string())
    }
}

fn top_level_eq(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth -= 1,
            b'=' if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

fn is_64_bit_type(type_text: &str) -> bool {
    let normalized = type_text.replace("const", "").replace("unsigned", "").trim().to_string();
    normalized.contains("int64_t")
        || normalized.contains("uint64_t")
        || normalized.contains("long long")
        || normalized == "int64"
        || normalized == "uint64"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_void() {
        assert_eq!(normalize_args("(void)"), "");
        assert_eq!(normalize_args("void"), "");
    }

    #[test]
    fn passes_through_plain_identifiers_idempotently() {
        assert_eq!(normalize_args("x, y"), "x, y");
        assert_eq!(normalize_args(""), "");
    }

    #[test]
    fn strips_types_array_suffix_and_default() {
        assert_eq!(normalize_args("(int x, float buf[16] = WA_ARG(0))"), "x, buf");
    }

    #[test]
    fn splits_64_bit_types_into_two_halves() {
        assert_eq!(normalize_args("(int64_t big)"), "bigLo, bigHi");
        assert_eq!(normalize_args("(uint64_t big, int small)"), "bigLo, bigHi, small");
    }

    #[test]
    fn handles_default_argument_expressions() {
        assert_eq!(normalize_args("(int x = 5)"), "x");
    }
}
