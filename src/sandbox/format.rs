//! String formatting: the format-spec mini-language used by `format()`,
//! f-strings and `str.format`, plus printf-style `%` formatting.

use crate::sandbox::budget::Budget;
use crate::sandbox::fault::Fault;
use crate::sandbox::ops::{int_to_f64, normalize_index};
use crate::sandbox::value::{raise, type_error, value_error, EvalResult, Value};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    pub fill: char,
    pub align: Option<char>,
    pub sign: char,
    pub alternate: bool,
    pub width: usize,
    pub grouping: Option<char>,
    pub precision: Option<usize>,
    pub kind: Option<char>,
}

impl Default for FormatSpec {
    fn default() -> Self {
        Self {
            fill: ' ',
            align: None,
            sign: '-',
            alternate: false,
            width: 0,
            grouping: None,
            precision: None,
            kind: None,
        }
    }
}

const ALIGNS: [char; 4] = ['<', '>', '^', '='];

impl FormatSpec {
    /// Parse `[[fill]align][sign][#][0][width][grouping][.precision][type]`.
    pub fn parse<'a>(text: &str) -> EvalResult<'a, Self> {
        let chars: Vec<char> = text.chars().collect();
        let mut spec = FormatSpec::default();
        let mut i = 0;
        if chars.len() >= 2 && ALIGNS.contains(&chars[1]) {
            spec.fill = chars[0];
            spec.align = Some(chars[1]);
            i = 2;
        } else if !chars.is_empty() && ALIGNS.contains(&chars[0]) {
            spec.align = Some(chars[0]);
            i = 1;
        }
        if let Some(&c @ ('+' | '-' | ' ')) = chars.get(i) {
            spec.sign = c;
            i += 1;
        }
        if chars.get(i) == Some(&'#') {
            spec.alternate = true;
            i += 1;
        }
        if chars.get(i) == Some(&'0') {
            if spec.align.is_none() {
                spec.fill = '0';
                spec.align = Some('=');
            }
            i += 1;
        }
        let (width, next) = digits(&chars, i);
        spec.width = width.unwrap_or(0);
        i = next;
        if let Some(&c @ (',' | '_')) = chars.get(i) {
            spec.grouping = Some(c);
            i += 1;
        }
        if chars.get(i) == Some(&'.') {
            let (precision, next) = digits(&chars, i + 1);
            match precision {
                Some(p) => spec.precision = Some(p),
                None => return value_error("Format specifier missing precision"),
            }
            i = next;
        }
        if i < chars.len() {
            spec.kind = Some(chars[i]);
            i += 1;
        }
        if i != chars.len() {
            return value_error("Invalid format specifier");
        }
        Ok(spec)
    }

    /// Width and precision are allocation sizes; reject them before any
    /// padding or digit string is built.
    pub fn check_size(&self, budget: &Budget) -> Result<(), Fault> {
        budget.check_len(self.width)?;
        budget.check_len(self.precision.unwrap_or(0))
    }

    fn pad(&self, sign: &str, body: &str, default_align: char) -> String {
        let len = sign.chars().count() + body.chars().count();
        if len >= self.width {
            return format!("{}{}", sign, body);
        }
        let padding = self.width - len;
        let fill = |n: usize| self.fill.to_string().repeat(n);
        match self.align.unwrap_or(default_align) {
            '<' => format!("{}{}{}", sign, body, fill(padding)),
            '^' => format!(
                "{}{}{}{}",
                fill(padding / 2),
                sign,
                body,
                fill(padding - padding / 2)
            ),
            '=' => format!("{}{}{}", sign, fill(padding), body),
            _ => format!("{}{}{}", fill(padding), sign, body),
        }
    }

    fn sign_for(&self, negative: bool) -> &'static str {
        match (negative, self.sign) {
            (true, _) => "-",
            (false, '+') => "+",
            (false, ' ') => " ",
            _ => "",
        }
    }
}

fn digits(chars: &[char], start: usize) -> (Option<usize>, usize) {
    let mut end = start;
    while end < chars.len() && chars[end].is_ascii_digit() {
        end += 1;
    }
    if end == start {
        return (None, start);
    }
    let text: String = chars[start..end].iter().collect();
    // all digits, so a parse failure is overflow
    (Some(text.parse().unwrap_or(usize::MAX)), end)
}

/// `format(value, spec)`.
pub fn format_value<'a>(budget: &Budget, value: &Value<'a>, spec: &str) -> EvalResult<'a, String> {
    if spec.is_empty() {
        return Ok(value.to_str());
    }
    let parsed = FormatSpec::parse(spec)?;
    parsed.check_size(budget)?;
    render(value, &parsed)
}

fn render<'a>(value: &Value<'a>, spec: &FormatSpec) -> EvalResult<'a, String> {
    match value {
        Value::Int(_) | Value::Bool(_) => {
            let n = value.as_int().unwrap_or_default();
            match spec.kind {
                Some('e' | 'E' | 'f' | 'F' | 'g' | 'G' | '%') => {
                    render_float(int_to_f64(&n)?, spec)
                }
                _ => render_int(&n, spec),
            }
        }
        Value::Float(f) => render_float(*f, spec),
        Value::Str(s) => match spec.kind {
            None | Some('s') => {
                let body: String = match spec.precision {
                    Some(p) => s.chars().take(p).collect(),
                    None => s.to_string(),
                };
                if spec.sign != '-' {
                    return value_error("Sign not allowed in string format specifier");
                }
                Ok(spec.pad("", &body, '<'))
            }
            Some(kind) => unknown_code(kind, "str"),
        },
        other if *spec == FormatSpec::default() => Ok(other.to_str()),
        other => type_error(format!(
            "unsupported format string passed to {}.__format__",
            other.type_name()
        )),
    }
}

fn unknown_code<'a, T>(kind: char, type_name: &str) -> EvalResult<'a, T> {
    value_error(format!(
        "Unknown format code '{}' for object of type '{}'",
        kind, type_name
    ))
}

fn render_int<'a>(n: &BigInt, spec: &FormatSpec) -> EvalResult<'a, String> {
    let magnitude = n.abs();
    let (digits, prefix, group_size) = match spec.kind {
        None | Some('d') | Some('n') => (magnitude.to_str_radix(10), "", 3),
        Some('b') => (magnitude.to_str_radix(2), "0b", 4),
        Some('o') => (magnitude.to_str_radix(8), "0o", 4),
        Some('x') => (magnitude.to_str_radix(16), "0x", 4),
        Some('X') => (magnitude.to_str_radix(16).to_uppercase(), "0X", 4),
        Some('c') => {
            let c = n
                .to_u32()
                .and_then(char::from_u32)
                .map(String::from);
            return match c {
                Some(c) => Ok(spec.pad("", &c, '>')),
                None => raise("OverflowError", "%c arg not in range(0x110000)"),
            };
        }
        Some(kind) => return unknown_code(kind, "int"),
    };
    let digits = match spec.grouping {
        Some(sep) => group_digits(&digits, sep, group_size),
        None => digits,
    };
    let prefix = if spec.alternate { prefix } else { "" };
    let sign = format!("{}{}", spec.sign_for(n.is_negative()), prefix);
    Ok(spec.pad(&sign, &digits, '>'))
}

fn group_digits(digits: &str, sep: char, size: usize) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let mut out = String::new();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % size == 0 {
            out.push(sep);
        }
        out.push(*c);
    }
    out
}

fn render_float<'a>(value: f64, spec: &FormatSpec) -> EvalResult<'a, String> {
    let negative = value.is_sign_negative() && !value.is_nan();
    let magnitude = value.abs();
    let upper = matches!(spec.kind, Some('E' | 'F' | 'G'));
    let body = if !magnitude.is_finite() {
        let text = if magnitude.is_nan() { "nan" } else { "inf" };
        let text = if upper {
            text.to_uppercase()
        } else {
            text.to_string()
        };
        match spec.kind {
            Some('%') => format!("{}%", text),
            _ => text,
        }
    } else {
        match spec.kind {
            Some('f' | 'F') => fixed(magnitude, spec.precision.unwrap_or(6), spec),
            Some('e' | 'E') => {
                let text = scientific(magnitude, spec.precision.unwrap_or(6), spec.alternate);
                if upper {
                    text.to_uppercase()
                } else {
                    text
                }
            }
            Some('g' | 'G') => {
                let text = general(magnitude, spec.precision.unwrap_or(6), spec.alternate, spec);
                if upper {
                    text.to_uppercase()
                } else {
                    text
                }
            }
            Some('%') => format!(
                "{}%",
                fixed(magnitude * 100.0, spec.precision.unwrap_or(6), spec)
            ),
            None => match spec.precision {
                Some(p) => {
                    let text = general(magnitude, p, spec.alternate, spec);
                    if text.contains(['.', 'e']) {
                        text
                    } else {
                        format!("{}.0", text)
                    }
                }
                None => {
                    let text = crate::python::unparse::float_repr(magnitude);
                    match spec.grouping {
                        Some(sep) => group_fixed(&text, sep),
                        None => text,
                    }
                }
            },
            Some(kind) => return unknown_code(kind, "float"),
        }
    };
    Ok(spec.pad(spec.sign_for(negative), &body, '>'))
}

fn fixed(value: f64, precision: usize, spec: &FormatSpec) -> String {
    let mut text = format!("{:.*}", precision, value);
    if spec.alternate && precision == 0 {
        text.push('.');
    }
    match spec.grouping {
        Some(sep) => group_fixed(&text, sep),
        None => text,
    }
}

fn group_fixed(text: &str, sep: char) -> String {
    match text.split_once('.') {
        Some((int_part, frac)) => format!("{}.{}", group_digits(int_part, sep, 3), frac),
        None => group_digits(text, sep, 3),
    }
}

fn scientific(value: f64, precision: usize, alternate: bool) -> String {
    let text = format!("{:.*e}", precision, value);
    let (mantissa, exponent) = text.split_once('e').unwrap_or((&text, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let mantissa = if alternate && precision == 0 {
        format!("{}.", mantissa)
    } else {
        mantissa.to_string()
    };
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{}e{}{:02}", mantissa, sign, exponent.abs())
}

fn general(value: f64, precision: usize, alternate: bool, spec: &FormatSpec) -> String {
    let precision = precision.max(1);
    if value == 0.0 {
        return if alternate {
            format!("{:.*}", precision - 1, 0.0)
        } else {
            "0".to_string()
        };
    }
    let sci = format!("{:.*e}", precision - 1, value);
    let exponent: i64 = sci
        .split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);
    let text = if exponent >= -4 && exponent < precision as i64 {
        let decimals = (precision as i64 - 1 - exponent).max(0) as usize;
        fixed(value, decimals, &FormatSpec { alternate: false, ..spec.clone() })
    } else {
        scientific(value, precision - 1, false)
    };
    if alternate {
        return text;
    }
    strip_trailing_zeros(&text)
}

fn strip_trailing_zeros(text: &str) -> String {
    let (mantissa, exponent) = match text.split_once('e') {
        Some((m, e)) => (m, Some(e)),
        None => (text, None),
    };
    let mantissa = if mantissa.contains('.') {
        mantissa.trim_end_matches('0').trim_end_matches('.')
    } else {
        mantissa
    };
    match exponent {
        Some(e) => format!("{}e{}", mantissa, e),
        None => mantissa.to_string(),
    }
}

/// `template % args`.
pub fn percent_format<'a>(
    budget: &Budget,
    template: &str,
    args: &Value<'a>,
) -> EvalResult<'a, String> {
    let (positional, mapping): (Vec<Value<'a>>, Option<&Value<'a>>) = match args {
        Value::Tuple(items) => (items.as_ref().clone(), None),
        Value::Dict(_) => (vec![args.clone()], Some(args)),
        other => (vec![other.clone()], None),
    };
    let mut next_arg = positional.into_iter();
    let mut used_mapping = false;
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '%' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        i += 1;
        let mut key = None;
        if chars.get(i) == Some(&'(') {
            let close = match chars[i..].iter().position(|&c| c == ')') {
                Some(offset) => i + offset,
                None => return value_error("incomplete format key"),
            };
            key = Some(chars[i + 1..close].iter().collect::<String>());
            i = close + 1;
        }
        let mut spec = FormatSpec::default();
        while let Some(&flag @ ('-' | '+' | ' ' | '#' | '0')) = chars.get(i) {
            match flag {
                '-' => spec.align = Some('<'),
                '+' | ' ' => {
                    if spec.sign != '+' {
                        spec.sign = flag;
                    }
                }
                '#' => spec.alternate = true,
                _ => {
                    if spec.align.is_none() {
                        spec.fill = '0';
                        spec.align = Some('=');
                    }
                }
            }
            i += 1;
        }
        if spec.align == Some('<') {
            spec.fill = ' ';
        }
        if chars.get(i) == Some(&'*') {
            spec.width = star_arg(next_arg.next())?;
            i += 1;
        } else {
            let (width, next) = digits(&chars, i);
            spec.width = width.unwrap_or(0);
            i = next;
        }
        if chars.get(i) == Some(&'.') {
            i += 1;
            if chars.get(i) == Some(&'*') {
                spec.precision = Some(star_arg(next_arg.next())?);
                i += 1;
            } else {
                let (precision, next) = digits(&chars, i);
                spec.precision = Some(precision.unwrap_or(0));
                i = next;
            }
        }
        spec.check_size(budget)?;
        while matches!(chars.get(i), Some('h' | 'l' | 'L')) {
            i += 1;
        }
        let Some(&conversion) = chars.get(i) else {
            return value_error("incomplete format");
        };
        i += 1;
        if conversion == '%' {
            out.push('%');
            continue;
        }
        let arg = match (&key, mapping) {
            (Some(key), Some(Value::Dict(table))) => {
                used_mapping = true;
                match table.borrow().get(&Value::str(key.as_str())) {
                    Ok(Some(v)) => v.clone(),
                    _ => return raise("KeyError", Value::str(key.as_str()).repr()),
                }
            }
            (Some(_), _) => return type_error("format requires a mapping"),
            (None, _) => match next_arg.next() {
                Some(v) => v,
                None => return type_error("not enough arguments for format string"),
            },
        };
        out.push_str(&percent_one(&arg, conversion, spec)?);
        budget.check_len(out.len())?;
    }
    if !used_mapping && next_arg.next().is_some() && mapping.is_none() {
        return type_error("not all arguments converted during string formatting");
    }
    Ok(out)
}

fn star_arg<'a>(arg: Option<Value<'a>>) -> EvalResult<'a, usize> {
    match arg.as_ref().and_then(Value::as_i64) {
        Some(n) => Ok(usize::try_from(n.max(0)).unwrap_or(usize::MAX)),
        None => type_error("* wants int"),
    }
}

fn percent_one<'a>(arg: &Value<'a>, conversion: char, mut spec: FormatSpec) -> EvalResult<'a, String> {
    match conversion {
        's' | 'r' | 'a' => {
            let text = if conversion == 's' {
                arg.to_str()
            } else {
                arg.repr()
            };
            let text: String = match spec.precision {
                Some(p) => text.chars().take(p).collect(),
                None => text,
            };
            if spec.align == Some('=') {
                spec.fill = ' ';
                spec.align = Some('>');
            }
            Ok(spec.pad("", &text, '>'))
        }
        'd' | 'i' | 'u' | 'x' | 'X' | 'o' => {
            let n = match arg {
                Value::Float(f) if f.is_finite() => {
                    num_traits::FromPrimitive::from_f64(f.trunc()).unwrap_or_else(BigInt::zero)
                }
                other => match other.as_int() {
                    Some(n) => n,
                    None => {
                        return type_error(format!(
                            "%{} format: a real number is required, not {}",
                            conversion,
                            other.type_name()
                        ))
                    }
                },
            };
            spec.kind = match conversion {
                'x' | 'X' | 'o' => Some(conversion),
                _ => None,
            };
            if let Some(p) = spec.precision.take() {
                let magnitude = n.abs();
                let (digits, prefix) = match conversion {
                    'x' => (magnitude.to_str_radix(16), "0x"),
                    'X' => (magnitude.to_str_radix(16).to_uppercase(), "0X"),
                    'o' => (magnitude.to_str_radix(8), "0o"),
                    _ => (magnitude.to_str_radix(10), ""),
                };
                let digits = format!("{:0>p$}", digits, p = p);
                let prefix = if spec.alternate { prefix } else { "" };
                let sign = format!("{}{}", spec.sign_for(n.is_negative()), prefix);
                return Ok(spec.pad(&sign, &digits, '>'));
            }
            render_int(&n, &spec)
        }
        'e' | 'E' | 'f' | 'F' | 'g' | 'G' => {
            let f = match arg {
                Value::Float(f) => *f,
                other => match other.as_int() {
                    Some(n) => int_to_f64(&n)?,
                    None => {
                        return type_error(format!(
                            "must be real number, not {}",
                            other.type_name()
                        ))
                    }
                },
            };
            spec.kind = Some(conversion);
            if spec.precision.is_none() {
                spec.precision = Some(6);
            }
            render_float(f, &spec)
        }
        'c' => match arg {
            Value::Str(s) if s.chars().count() == 1 => Ok(spec.pad("", s, '>')),
            other => match other.as_int() {
                Some(n) => {
                    spec.kind = Some('c');
                    render_int(&n, &spec)
                }
                None => type_error("%c requires int or char"),
            },
        },
        other => value_error(format!(
            "unsupported format character '{}' (0x{:x})",
            other, other as u32
        )),
    }
}

/// `template.format(*positional, **keywords)`.
pub fn str_format<'a>(
    budget: &Budget,
    template: &str,
    positional: &[Value<'a>],
    keywords: &[(String, Value<'a>)],
) -> EvalResult<'a, String> {
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::new();
    let mut auto_index = 0usize;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '{' if chars.get(i + 1) == Some(&'{') => {
                out.push('{');
                i += 2;
            }
            '}' if chars.get(i + 1) == Some(&'}') => {
                out.push('}');
                i += 2;
            }
            '}' => return value_error("Single '}' encountered in format string"),
            '{' => {
                let close = match chars[i..].iter().position(|&c| c == '}') {
                    Some(offset) => i + offset,
                    None => return value_error("Single '{' encountered in format string"),
                };
                let field: String = chars[i + 1..close].iter().collect();
                if field.contains('{') {
                    return value_error("nested replacement fields are not supported");
                }
                out.push_str(&replacement_field(
                    budget,
                    &field,
                    positional,
                    keywords,
                    &mut auto_index,
                )?);
                budget.check_len(out.len())?;
                i = close + 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Ok(out)
}

fn replacement_field<'a>(
    budget: &Budget,
    field: &str,
    positional: &[Value<'a>],
    keywords: &[(String, Value<'a>)],
    auto_index: &mut usize,
) -> EvalResult<'a, String> {
    let (head, spec) = match field.split_once(':') {
        Some((head, spec)) => (head, spec),
        None => (field, ""),
    };
    let (name, conversion) = match head.split_once('!') {
        Some((name, conv)) => (name, conv.chars().next()),
        None => (head, None),
    };
    let (base, accessors) = match name.find('[') {
        Some(pos) => (&name[..pos], &name[pos..]),
        None => (name, ""),
    };
    let mut value = if base.is_empty() {
        let index = *auto_index;
        *auto_index += 1;
        match positional.get(index) {
            Some(v) => v.clone(),
            None => {
                return raise(
                    "IndexError",
                    format!("Replacement index {} out of range for positional args tuple", index),
                )
            }
        }
    } else if let Ok(index) = base.parse::<usize>() {
        match positional.get(index) {
            Some(v) => v.clone(),
            None => {
                return raise(
                    "IndexError",
                    format!("Replacement index {} out of range for positional args tuple", index),
                )
            }
        }
    } else {
        match keywords.iter().find(|(k, _)| k == base) {
            Some((_, v)) => v.clone(),
            None => return raise("KeyError", Value::str(base).repr()),
        }
    };
    for accessor in accessors.split('[').filter(|a| !a.is_empty()) {
        let key = accessor.trim_end_matches(']');
        value = index_field(&value, key)?;
    }
    let value = match conversion {
        None => value,
        Some('s') => Value::str(value.to_str()),
        Some('r' | 'a') => Value::str(value.repr()),
        Some(other) => {
            return value_error(format!(
                "Unknown conversion specifier {}",
                other
            ))
        }
    };
    format_value(budget, &value, spec)
}

fn index_field<'a>(value: &Value<'a>, key: &str) -> EvalResult<'a, Value<'a>> {
    let index = key.parse::<i64>().ok();
    match (value, index) {
        (Value::List(items), Some(i)) => {
            let items = items.borrow();
            match normalize_index(&BigInt::from(i), items.len()) {
                Some(pos) => Ok(items[pos].clone()),
                None => raise("IndexError", "list index out of range"),
            }
        }
        (Value::Tuple(items), Some(i)) => match normalize_index(&BigInt::from(i), items.len()) {
            Some(pos) => Ok(items[pos].clone()),
            None => raise("IndexError", "tuple index out of range"),
        },
        (Value::Dict(table), _) => {
            let key_value = match index {
                Some(i) => Value::int(i),
                None => Value::str(key),
            };
            match table.borrow().get(&key_value) {
                Ok(Some(v)) => Ok(v.clone()),
                _ => raise("KeyError", key_value.repr()),
            }
        }
        (other, _) => type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::budget::SandboxLimits;
    use crate::sandbox::value::Signal;
    use pretty_assertions::assert_eq;

    fn budget() -> Budget {
        Budget::start(SandboxLimits::default())
    }

    fn fmt(value: Value<'_>, spec: &str) -> String {
        format_value(&budget(), &value, spec).unwrap()
    }

    fn percent<'a>(template: &str, args: &Value<'a>) -> EvalResult<'a, String> {
        percent_format(&budget(), template, args)
    }

    #[test]
    fn test_int_specs() {
        assert_eq!(fmt(Value::int(42), "5d"), "   42");
        assert_eq!(fmt(Value::int(42), "<5"), "42   ");
        assert_eq!(fmt(Value::int(42), "^6"), "  42  ");
        assert_eq!(fmt(Value::int(-42), "05"), "-0042");
        assert_eq!(fmt(Value::int(255), "#x"), "0xff");
        assert_eq!(fmt(Value::int(255), "08b"), "11111111");
        assert_eq!(fmt(Value::int(1234567), ","), "1,234,567");
        assert_eq!(fmt(Value::int(5), "+"), "+5");
    }

    #[test]
    fn test_float_specs() {
        assert_eq!(fmt(Value::Float(3.14159), ".2f"), "3.14");
        assert_eq!(fmt(Value::Float(1234.5), "e"), "1.234500e+03");
        assert_eq!(fmt(Value::Float(0.0001234), "g"), "0.0001234");
        assert_eq!(fmt(Value::Float(123456789.0), "g"), "1.23457e+08");
        assert_eq!(fmt(Value::Float(0.5), ".1%"), "50.0%");
        assert_eq!(fmt(Value::Float(2.0), ".3"), "2.0");
        assert_eq!(fmt(Value::int(3), ".1f"), "3.0");
    }

    #[test]
    fn test_string_specs() {
        assert_eq!(fmt(Value::str("ab"), ">4"), "  ab");
        assert_eq!(fmt(Value::str("abcdef"), ".3"), "abc");
        assert_eq!(fmt(Value::str("x"), "*^5"), "**x**");
        assert!(format_value(&budget(), &Value::str("x"), "d").is_err());
    }

    #[test]
    fn test_percent_format() {
        let args = Value::tuple(vec![Value::int(7), Value::str("x")]);
        assert_eq!(percent("%d-%s", &args).unwrap(), "7-x");
        assert_eq!(percent("%5.2f|", &Value::Float(3.14159)).unwrap(), " 3.14|");
        assert_eq!(percent("%-4d|", &Value::int(3)).unwrap(), "3   |");
        assert_eq!(percent("100%%", &Value::tuple(vec![])).unwrap(), "100%");
        assert!(percent("%d %d", &Value::int(1)).is_err());
        assert!(percent("%d", &args).is_err());
    }

    #[test]
    fn test_str_format() {
        let positional = vec![Value::int(1), Value::str("b")];
        let keywords = vec![("name".to_string(), Value::Float(0.5))];
        assert_eq!(
            str_format(&budget(), "{0} {1}/{0}/{name:.2f} {{x}}", &positional, &keywords).unwrap(),
            "1 b/1/0.50 {x}"
        );
        assert_eq!(str_format(&budget(), "{1!r}", &positional, &keywords).unwrap(), "'b'");
        assert!(str_format(&budget(), "{5}", &positional, &keywords).is_err());
    }

    fn is_memory_limit<T>(result: EvalResult<'_, T>) -> bool {
        matches!(result, Err(Signal::Abort(Fault::MemoryLimit(_))))
    }

    #[test]
    fn test_oversized_width_is_rejected_before_padding() {
        let star = Value::tuple(vec![Value::int(1_000_000_000_000_000_000i64), Value::int(1)]);
        assert!(is_memory_limit(percent("%*d", &star)));
        assert!(is_memory_limit(percent("%.999999999d", &Value::int(1))));
        assert!(is_memory_limit(format_value(&budget(), &Value::int(1), "0999999999d")));
        assert!(is_memory_limit(format_value(
            &budget(),
            &Value::int(1),
            "99999999999999999999999999d"
        )));
        assert!(is_memory_limit(format_value(&budget(), &Value::Float(1.0), ".99999999f")));
        assert!(is_memory_limit(str_format(
            &budget(),
            "{0:>99999999}",
            &[Value::int(1)],
            &[]
        )));
        assert_eq!(percent("%*d", &Value::tuple(vec![Value::int(4), Value::int(7)])).unwrap(), "   7");
    }
}
