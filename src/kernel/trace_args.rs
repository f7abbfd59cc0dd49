//! Rendering of ACPICA `ex_trace_args` records.
//!
//! Firmware trace points log a printf-style format string followed by the
//! raw argument values in hexadecimal:
//!
//! ```text
//! ex_trace_args: "  POST CODE: %X  ACPI TIMER: %X\n", b0003f33, 83528798, 0, 0, 0, 0
//! ```
//!
//! [`sscanf_bios_args`] substitutes the arguments back into the format string.

const TRACE_ARGS_MARKER: &str = "ex_trace_args";
const UNKNOWN_ARG: &str = "Unknown";
/// Upper bound on field width and precision.
const MAX_FIELD: usize = 256;

/// Render a BIOS trace-argument record into its message text.
///
/// Returns `None` if the line does not start with the `ex_trace_args:` marker
/// or has no quoted format string. Arguments that are missing or can't be
/// decoded render as empty text; extra arguments are ignored.
pub fn sscanf_bios_args(line: &str) -> Option<String> {
    let rest = strip_marker(line.trim())?;
    let (format, tail) = split_format(rest)?;
    let args = split_args(tail);
    let format = format.replace("\\n", "");
    Some(render(&format, &args).trim().to_string())
}

fn strip_marker(line: &str) -> Option<&str> {
    line.strip_prefix(TRACE_ARGS_MARKER)?
        .trim_start()
        .strip_prefix(':')
}

/// Split off the first double-quoted segment, returning it and the text after it.
fn split_format(rest: &str) -> Option<(&str, &str)> {
    let open = rest.find('"')?;
    let body = &rest[open + 1..];
    let close = body.find('"')?;
    Some((&body[..close], &body[close + 1..]))
}

fn split_args(tail: &str) -> Vec<&str> {
    match tail.trim_start().strip_prefix(',') {
        Some(list) => list.split(',').map(str::trim).collect(),
        None => Vec::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    UpperHex,
    LowerHex,
    Decimal,
}

#[derive(Debug, Default, Clone, Copy)]
struct Flags {
    left: bool,
    zero: bool,
    plus: bool,
    space: bool,
    alternate: bool,
}

#[derive(Debug, Clone, Copy)]
struct Specifier {
    flags: Flags,
    width: usize,
    precision: Option<usize>,
    conversion: Conversion,
}

enum Directive {
    Percent,
    Convert(Specifier),
}

fn render(format: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut args = args.iter();
    let mut rest = format;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        match parse_directive(after) {
            Some((Directive::Percent, used)) => {
                out.push('%');
                rest = &after[used..];
            }
            Some((Directive::Convert(spec), used)) => {
                out.push_str(&substitute(&spec, args.next().copied()));
                rest = &after[used..];
            }
            None => {
                out.push('%');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Parse `[flags][width][.precision]conversion` following a `%`.
/// Returns the directive and the number of bytes it spans.
fn parse_directive(s: &str) -> Option<(Directive, usize)> {
    if s.starts_with('%') {
        return Some((Directive::Percent, 1));
    }

    let bytes = s.as_bytes();
    let mut i = 0;
    let mut flags = Flags::default();
    while let Some(&b) = bytes.get(i) {
        match b {
            b'-' => flags.left = true,
            b'0' => flags.zero = true,
            b'+' => flags.plus = true,
            b' ' => flags.space = true,
            b'#' => flags.alternate = true,
            _ => break,
        }
        i += 1;
    }

    let (width, used) = leading_number(&s[i..]);
    i += used;

    let mut precision = None;
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        let (p, used) = leading_number(&s[i..]);
        precision = Some(p);
        i += used;
    }

    let conversion = match bytes.get(i)? {
        b'X' => Conversion::UpperHex,
        b'x' => Conversion::LowerHex,
        b'd' => Conversion::Decimal,
        _ => return None,
    };

    Some((
        Directive::Convert(Specifier {
            flags,
            width,
            precision,
            conversion,
        }),
        i + 1,
    ))
}

fn leading_number(s: &str) -> (usize, usize) {
    let len = s.bytes().take_while(u8::is_ascii_digit).count();
    if len == 0 {
        return (0, 0);
    }
    let value = s[..len].parse().unwrap_or(MAX_FIELD);
    (value.min(MAX_FIELD), len)
}

fn substitute(spec: &Specifier, arg: Option<&str>) -> String {
    let Some(token) = arg else {
        return pad_text("", spec);
    };
    if token == UNKNOWN_ARG {
        return pad_text(UNKNOWN_ARG, spec);
    }
    match decode(token, spec.conversion) {
        Some(value) => format_integer(value, spec),
        None => pad_text("", spec),
    }
}

/// Decode an argument token. Tokens are logged in hex; for `%d` a token made
/// only of decimal digits is read as decimal. Values wider than 128 bits
/// don't decode.
fn decode(token: &str, conversion: Conversion) -> Option<u128> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    if conversion == Conversion::Decimal
        && digits.len() == token.len()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && let Ok(value) = digits.parse()
    {
        return Some(value);
    }
    u128::from_str_radix(digits, 16).ok()
}

fn format_integer(value: u128, spec: &Specifier) -> String {
    let mut digits = if spec.precision == Some(0) && value == 0 {
        String::new()
    } else {
        match spec.conversion {
            Conversion::UpperHex => format!("{:X}", value),
            Conversion::LowerHex => format!("{:x}", value),
            Conversion::Decimal => value.to_string(),
        }
    };
    if let Some(precision) = spec.precision
        && digits.len() < precision
    {
        digits.insert_str(0, &"0".repeat(precision - digits.len()));
    }

    let prefix = match spec.conversion {
        Conversion::UpperHex if spec.flags.alternate && value != 0 => "0X",
        Conversion::LowerHex if spec.flags.alternate && value != 0 => "0x",
        Conversion::Decimal if spec.flags.plus => "+",
        Conversion::Decimal if spec.flags.space => " ",
        _ => "",
    };

    let len = prefix.len() + digits.len();
    if len >= spec.width {
        return format!("{}{}", prefix, digits);
    }
    let fill = spec.width - len;
    if spec.flags.left {
        format!("{}{}{}", prefix, digits, " ".repeat(fill))
    } else if spec.flags.zero && spec.precision.is_none() {
        format!("{}{}{}", prefix, "0".repeat(fill), digits)
    } else {
        format!("{}{}{}", " ".repeat(fill), prefix, digits)
    }
}

fn pad_text(text: &str, spec: &Specifier) -> String {
    if spec.flags.left {
        format!("{:<w$}", text, w = spec.width)
    } else {
        format!("{:>w$}", text, w = spec.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_specifiers_ignores_arguments() {
        let line = r#"ex_trace_args: "format_string", 0x1234, 0x5678"#;
        assert_eq!(sscanf_bios_args(line).as_deref(), Some("format_string"));

        let line = r#"ex_trace_args: "format_string", Unknown, 0x5678"#;
        assert_eq!(sscanf_bios_args(line).as_deref(), Some("format_string"));
    }

    #[test]
    fn test_other_markers_rejected() {
        assert_eq!(
            sscanf_bios_args(r#"invalid_line: "format_string", 0x1234, 0x5678"#),
            None
        );
        assert_eq!(
            sscanf_bios_args(r#"ex_trace_point: "format_string", 0x1234, 0x5678"#),
            None
        );
        assert_eq!(sscanf_bios_args("ex_trace_argsX: \"fmt\", 1"), None);
        assert_eq!(sscanf_bios_args("foo ex_trace_args: \"fmt\", 1"), None);
        assert_eq!(sscanf_bios_args(""), None);
    }

    #[test]
    fn test_missing_format_string() {
        assert_eq!(sscanf_bios_args("ex_trace_args: no quotes, 1, 2"), None);
        assert_eq!(sscanf_bios_args(r#"ex_trace_args: "unterminated, 1"#), None);
        assert_eq!(sscanf_bios_args(r#"ex_trace_args "fmt", 1"#), None);
    }

    #[test]
    fn test_post_code() {
        let line = r#"ex_trace_args: "  POST CODE: %X  ACPI TIMER: %X  TIME: %d.%d ms\n", b0003f33, 83528798, 0, 77, 0, 0"#;
        assert_eq!(
            sscanf_bios_args(line).as_deref(),
            Some("POST CODE: B0003F33  ACPI TIMER: 83528798  TIME: 0.77 ms")
        );
    }

    #[test]
    fn test_reg_print() {
        let line = r#"ex_trace_args:  "  OEM-ASL-PCIe Address (0x%X)._REG (%d %d)  PCSA = %d\n", ec303000, 2, 0, 0, 0, 0"#;
        assert_eq!(
            sscanf_bios_args(line).as_deref(),
            Some("OEM-ASL-PCIe Address (0xEC303000)._REG (2 0)  PCSA = 0")
        );
    }

    #[test]
    fn test_whitespace_before_colon_and_excess_args() {
        let line = r#"ex_trace_args         :  "  APGE                  = %d\n", 1, 0, 0, 0, 0, 0"#;
        assert_eq!(
            sscanf_bios_args(line).as_deref(),
            Some("APGE                  = 1")
        );
    }

    #[test]
    fn test_lowercase_hex_reencoded() {
        let line = r#"ex_trace_args: "val=%x", B0003F33"#;
        assert_eq!(sscanf_bios_args(line).as_deref(), Some("val=b0003f33"));
    }

    #[test]
    fn test_decimal_from_hex_token() {
        let line = r#"ex_trace_args: "count=%d", 1f"#;
        assert_eq!(sscanf_bios_args(line).as_deref(), Some("count=31"));
    }

    #[test]
    fn test_unknown_argument() {
        let line = r#"ex_trace_args: "A=%X B=%d", Unknown, Unknown"#;
        assert_eq!(sscanf_bios_args(line).as_deref(), Some("A=Unknown B=Unknown"));
    }

    #[test]
    fn test_missing_arguments_render_empty() {
        let line = r#"ex_trace_args: "A=%X B=%X end", 5"#;
        assert_eq!(sscanf_bios_args(line).as_deref(), Some("A=5 B= end"));

        let line = r#"ex_trace_args: "A=%X""#;
        assert_eq!(sscanf_bios_args(line).as_deref(), Some("A="));
    }

    #[test]
    fn test_unparsable_argument_is_local() {
        let line = r#"ex_trace_args: "A=%X B=%X C=%d", zz!, 10, 2"#;
        assert_eq!(sscanf_bios_args(line).as_deref(), Some("A= B=10 C=2"));
    }

    #[test]
    fn test_width_and_flags() {
        let line = r#"ex_trace_args: "[%08X] [%4d] [%-4d] [%#x] [%.3d] [%+d]", 3f33, 7, 7, ff, 5, 9"#;
        assert_eq!(
            sscanf_bios_args(line).as_deref(),
            Some("[00003F33] [   7] [7   ] [0xff] [005] [+9]")
        );
    }

    #[test]
    fn test_width_applies_to_text() {
        let line = r#"ex_trace_args: "[%8X] [%-8d]", Unknown"#;
        assert_eq!(
            sscanf_bios_args(line).as_deref(),
            Some("[ Unknown] [        ]")
        );
    }

    #[test]
    fn test_literal_percent_and_unsupported_conversions() {
        let line = r#"ex_trace_args: "100%% done %s %X", 1a"#;
        assert_eq!(sscanf_bios_args(line).as_deref(), Some("100% done %s 1A"));
    }

    #[test]
    fn test_prefixed_tokens() {
        let line = r#"ex_trace_args: "%X %x %d", 0x1a, 0X1A, 0x10"#;
        assert_eq!(sscanf_bios_args(line).as_deref(), Some("1A 1a 16"));
    }

    #[test]
    fn test_wide_tokens() {
        let line = r#"ex_trace_args: "%X", ffffffffffffffffff"#;
        assert_eq!(sscanf_bios_args(line).as_deref(), Some("FFFFFFFFFFFFFFFFFF"));

        let too_wide = format!(r#"ex_trace_args: "[%X]", {}"#, "f".repeat(33));
        assert_eq!(sscanf_bios_args(&too_wide).as_deref(), Some("[]"));
    }

    #[test]
    fn test_width_is_capped() {
        let line = r#"ex_trace_args: "%-300d|", 1"#;
        let rendered = sscanf_bios_args(line).unwrap();
        assert_eq!(rendered.len(), MAX_FIELD + 1);
        assert!(rendered.starts_with("1 "));
        assert!(rendered.ends_with(" |"));

        let line = r#"ex_trace_args: "%.99999999999999999999999X", 1"#;
        assert_eq!(sscanf_bios_args(line).unwrap().len(), MAX_FIELD);
    }

    #[test]
    fn test_deterministic() {
        let line = r#"ex_trace_args: "%X-%d", abc, 10"#;
        assert_eq!(sscanf_bios_args(line), sscanf_bios_args(line));
    }
}
