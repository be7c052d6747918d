/// Checks that `source` parses as a Rust file and normalizes its layout.
///
/// Trailing whitespace is removed, runs of blank lines collapse to one and the text
/// ends with exactly one newline. Lines are rewritten independently, so the input
/// must not contain multi-line string literals; the emitter escapes every newline.
pub fn canonicalize(source: &str) -> Result<String, syn::Error> {
    syn::parse_file(source)?;

    let mut out = String::with_capacity(source.len());
    let mut previous_blank = true;

    for line in source.lines() {
        let line = line.trim_end();
        let blank = line.is_empty();

        if blank && previous_blank {
            continue;
        }

        out.push_str(line);
        out.push('\n');
        previous_blank = blank;
    }

    while out.ends_with("\n\n") {
        out.pop();
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_blank_lines_and_trailing_space() {
        let source = "\n\nmod a {   \n\n\n    fn f() {}\n}\n\n\n";

        assert_eq!(canonicalize(source).unwrap(), "mod a {\n\n    fn f() {}\n}\n");
    }

    #[test]
    fn rejects_malformed_source() {
        assert!(canonicalize("pub mod {").is_err());
    }
}
