//! Format-spec mini-language shared by f-strings, `format()`,
//! `str.format` and `%` interpolation.

use crate::value::{Value, MAX_LENGTH};
use crate::{ExceptionKind, InterpreterError};

#[derive(Debug, Default, Clone, PartialEq)]
struct Spec {
  fill: Option<char>,
  align: Option<char>,
  sign: Option<char>,
  zero: bool,
  width: usize,
  grouping: bool,
  precision: Option<usize>,
  kind: Option<char>,
}

fn value_error(message: impl Into<String>) -> InterpreterError {
  InterpreterError::raise(ExceptionKind::ValueError, message)
}

fn parse_spec(spec: &str) -> Result<Spec, InterpreterError> {
  let chars: Vec<char> = spec.chars().collect();
  let mut out = Spec::default();
  let mut i = 0;
  let is_align = |c: char| matches!(c, '<' | '>' | '^' | '=');

  if chars.len() >= 2 && is_align(chars[1]) {
    out.fill = Some(chars[0]);
    out.align = Some(chars[1]);
    i = 2;
  } else if chars.first().copied().is_some_and(is_align) {
    out.align = Some(chars[0]);
    i = 1;
  }
  if let Some(&c @ ('+' | '-' | ' ')) = chars.get(i) {
    out.sign = Some(c);
    i += 1;
  }
  if chars.get(i) == Some(&'0') {
    out.zero = true;
    i += 1;
  }
  let start = i;
  while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
    i += 1;
  }
  if i > start {
    out.width = chars[start..i]
      .iter()
      .collect::<String>()
      .parse()
      .ok()
      .filter(|&width| width <= MAX_LENGTH)
      .ok_or_else(|| value_error("Too many decimal digits in format string"))?;
  }
  if chars.get(i) == Some(&',') {
    out.grouping = true;
    i += 1;
  }
  if chars.get(i) == Some(&'.') {
    i += 1;
    let start = i;
    while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
      i += 1;
    }
    if i == start {
      return Err(value_error("Format specifier missing precision"));
    }
    let precision = chars[start..i]
      .iter()
      .collect::<String>()
      .parse()
      .ok()
      .filter(|&precision| precision <= MAX_LENGTH)
      .ok_or_else(|| value_error("Too many decimal digits in format string"))?;
    out.precision = Some(precision);
  }
  if let Some(&c) = chars.get(i) {
    out.kind = Some(c);
    i += 1;
  }
  if i != chars.len() {
    return Err(value_error("Invalid format specifier"));
  }
  Ok(out)
}

fn group_thousands(digits: &str) -> String {
  let (int_part, rest) = match digits.find(|c: char| !c.is_ascii_digit()) {
    Some(pos) => digits.split_at(pos),
    None => (digits, ""),
  };
  let mut grouped = String::new();
  for (i, c) in int_part.chars().enumerate() {
    if i > 0 && (int_part.len() - i) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(c);
  }
  grouped + rest
}

/// Rust writes `1.5e3`; snippets expect `1.5e+03`.
fn exponent_form(x: f64, precision: usize, upper: bool) -> String {
  let text = format!("{x:.precision$e}");
  let (mantissa, exponent) = text.split_once('e').unwrap_or((text.as_str(), "0"));
  let exponent: i32 = exponent.parse().unwrap_or(0);
  let sign = if exponent < 0 { '-' } else { '+' };
  let e = if upper { 'E' } else { 'e' };
  format!("{mantissa}{e}{sign}{:02}", exponent.abs())
}

/// `%g`: fixed or exponent notation depending on magnitude, trailing
/// zeros removed.
fn general_form(x: f64, precision: usize, upper: bool) -> String {
  let precision = precision.max(1);
  if x == 0.0 {
    return "0".to_string();
  }
  let exponent = x.abs().log10().floor() as i32;
  let strip = |s: String| {
    if s.contains('.') {
      s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
      s
    }
  };
  if exponent < -4 || exponent >= precision as i32 {
    let text = exponent_form(x, precision - 1, upper);
    let e = if upper { 'E' } else { 'e' };
    match text.split_once(e) {
      Some((mantissa, rest)) => format!("{}{e}{rest}", strip(mantissa.to_string())),
      None => text,
    }
  } else {
    let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
    strip(format!("{x:.decimals$}"))
  }
}

fn format_number(value: &Value, spec: &Spec) -> Result<String, InterpreterError> {
  let kind = spec.kind;
  let type_error = || {
    value_error(format!(
      "Unknown format code '{}' for object of type '{}'",
      kind.unwrap_or('?'),
      value.type_name()
    ))
  };
  let x = value.as_f64().ok_or_else(type_error)?;
  let int = match value {
    Value::Int(n) => Some(*n),
    Value::Bool(b) => Some(*b as i64),
    _ => None,
  };
  let body = match kind {
    Some('d') | Some('n') => match int {
      Some(n) => n.unsigned_abs().to_string(),
      None => return Err(type_error()),
    },
    Some(c @ ('x' | 'X' | 'o' | 'b')) => {
      let n = int.ok_or_else(type_error)?.unsigned_abs();
      match c {
        'x' => format!("{n:x}"),
        'X' => format!("{n:X}"),
        'o' => format!("{n:o}"),
        _ => format!("{n:b}"),
      }
    }
    Some('f') | Some('F') => {
      let precision = spec.precision.unwrap_or(6);
      format!("{:.precision$}", x.abs())
    }
    Some(c @ ('e' | 'E')) => {
      exponent_form(x.abs(), spec.precision.unwrap_or(6), c == 'E')
    }
    Some(c @ ('g' | 'G')) => {
      general_form(x.abs(), spec.precision.unwrap_or(6), c == 'G')
    }
    Some('%') => {
      let precision = spec.precision.unwrap_or(6);
      format!("{:.precision$}%", x.abs() * 100.0)
    }
    None => match (int, spec.precision) {
      (Some(n), _) => n.unsigned_abs().to_string(),
      (None, Some(p)) => general_form(x.abs(), p, false),
      (None, None) => Value::Float(x.abs()).to_string(),
    },
    Some(_) => return Err(type_error()),
  };
  if !x.is_finite() && !matches!(kind, Some('d' | 'x' | 'X' | 'o' | 'b')) {
    let text = if x.is_nan() { "nan" } else { "inf" };
    return Ok(pad(&sign_prefix(x, spec), text, spec, '>'));
  }
  let body = if spec.grouping { group_thousands(&body) } else { body };
  Ok(pad(&sign_prefix(x, spec), &body, spec, '>'))
}

fn sign_prefix(x: f64, spec: &Spec) -> String {
  if x.is_sign_negative() && !x.is_nan() && x != 0.0 {
    "-".to_string()
  } else {
    match spec.sign {
      Some('+') => "+".to_string(),
      Some(' ') => " ".to_string(),
      _ => String::new(),
    }
  }
}

fn pad(sign: &str, body: &str, spec: &Spec, default_align: char) -> String {
  let len = sign.chars().count() + body.chars().count();
  if spec.width <= len {
    return format!("{sign}{body}");
  }
  let gap = spec.width - len;
  let (fill, align) = match (spec.fill, spec.align) {
    (Some(fill), Some(align)) => (fill, align),
    (None, Some(align)) => (' ', align),
    (_, None) if spec.zero => ('0', '='),
    _ => (' ', default_align),
  };
  let run = |n: usize| std::iter::repeat(fill).take(n).collect::<String>();
  match align {
    '<' => format!("{sign}{body}{}", run(gap)),
    '^' => format!("{}{sign}{body}{}", run(gap / 2), run(gap - gap / 2)),
    '=' => format!("{sign}{}{body}", run(gap)),
    _ => format!("{}{sign}{body}", run(gap)),
  }
}

/// `format(value, spec)`.
pub fn format_value(value: &Value, spec: &str) -> Result<String, InterpreterError> {
  if spec.is_empty() {
    return Ok(value.to_string());
  }
  let parsed = parse_spec(spec)?;
  match value {
    Value::Int(_) | Value::Float(_) | Value::Bool(_)
      if parsed.kind != Some('s') =>
    {
      format_number(value, &parsed)
    }
    _ => {
      if parsed.kind.is_some_and(|k| k != 's') {
        return Err(value_error(format!(
          "Unknown format code '{}' for object of type '{}'",
          parsed.kind.unwrap_or('s'),
          value.type_name()
        )));
      }
      let mut text = value.to_string();
      if let Some(precision) = parsed.precision {
        text = text.chars().take(precision).collect();
      }
      Ok(pad("", &text, &parsed, '<'))
    }
  }
}

/// `str.format(*args, **kwargs)`.
pub fn format_template(
  template: &str,
  positional: &[Value],
  keywords: &[(String, Value)],
) -> Result<String, InterpreterError> {
  let mut out = String::new();
  let mut chars = template.chars().peekable();
  let mut auto_index = 0;
  while let Some(c) = chars.next() {
    match c {
      '{' if chars.peek() == Some(&'{') => {
        chars.next();
        out.push('{');
      }
      '}' if chars.peek() == Some(&'}') => {
        chars.next();
        out.push('}');
      }
      '}' => {
        return Err(value_error("Single '}' encountered in format string"));
      }
      '{' => {
        let mut field = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
          if c == '}' {
            closed = true;
            break;
          }
          field.push(c);
        }
        if !closed {
          return Err(value_error("Single '{' encountered in format string"));
        }
        let (field, spec) = field.split_once(':').unwrap_or((field.as_str(), ""));
        let (name, conversion) = match field.split_once('!') {
          Some((name, conv)) => (name, conv.chars().next()),
          None => (field, None),
        };
        let value = if name.is_empty() {
          let value = positional.get(auto_index);
          auto_index += 1;
          value.ok_or_else(|| {
            InterpreterError::raise(
              ExceptionKind::IndexError,
              format!(
                "Replacement index {} out of range for positional args tuple",
                auto_index - 1
              ),
            )
          })?
        } else if let Ok(index) = name.parse::<usize>() {
          positional.get(index).ok_or_else(|| {
            InterpreterError::raise(
              ExceptionKind::IndexError,
              format!(
                "Replacement index {index} out of range for positional args tuple"
              ),
            )
          })?
        } else {
          keywords
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
            .ok_or_else(|| {
              InterpreterError::raise(
                ExceptionKind::KeyError,
                Value::str(name).repr(),
              )
            })?
        };
        let converted;
        let value = match conversion {
          Some('r') => {
            converted = Value::Str(value.repr());
            &converted
          }
          Some('s') => {
            converted = Value::Str(value.to_string());
            &converted
          }
          _ => value,
        };
        out.push_str(&format_value(value, spec)?);
      }
      c => out.push(c),
    }
  }
  Ok(out)
}

/// `template % args`, printf style.
pub fn percent_format(
  template: &str,
  args: &Value,
) -> Result<String, InterpreterError> {
  let mapping = matches!(args, Value::Dict(_));
  let values: Vec<Value> = match args {
    Value::Tuple(items) => items.as_ref().clone(),
    other => vec![other.clone()],
  };
  let mut next = 0;
  let mut out = String::new();
  let chars: Vec<char> = template.chars().collect();
  let mut i = 0;
  while i < chars.len() {
    let c = chars[i];
    i += 1;
    if c != '%' {
      out.push(c);
      continue;
    }
    if chars.get(i) == Some(&'%') {
      out.push('%');
      i += 1;
      continue;
    }
    let mut key = None;
    if chars.get(i) == Some(&'(') {
      let end = chars[i..]
        .iter()
        .position(|&c| c == ')')
        .ok_or_else(|| value_error("incomplete format key"))?;
      key = Some(chars[i + 1..i + end].iter().collect::<String>());
      i += end + 1;
    }
    let mut flags = String::new();
    while let Some(&f @ ('-' | '+' | ' ' | '0' | '#')) = chars.get(i) {
      flags.push(f);
      i += 1;
    }
    let mut width = String::new();
    while let Some(&d) = chars.get(i).filter(|c| c.is_ascii_digit()) {
      width.push(d);
      i += 1;
    }
    let mut precision = None;
    if chars.get(i) == Some(&'.') {
      i += 1;
      let mut digits = String::new();
      while let Some(&d) = chars.get(i).filter(|c| c.is_ascii_digit()) {
        digits.push(d);
        i += 1;
      }
      precision = Some(digits.parse::<usize>().unwrap_or(0));
    }
    let conversion = chars
      .get(i)
      .copied()
      .ok_or_else(|| value_error("incomplete format"))?;
    i += 1;

    let value = match (&key, args) {
      (Some(key), Value::Dict(items)) => items
        .borrow()
        .iter()
        .find(|(k, _)| k.as_str() == Some(key.as_str()))
        .map(|(_, v)| v.clone())
        .ok_or_else(|| {
          InterpreterError::raise(ExceptionKind::KeyError, Value::str(key).repr())
        })?,
      (Some(_), _) => {
        return Err(InterpreterError::raise(
          ExceptionKind::TypeError,
          "format requires a mapping",
        ));
      }
      (None, _) => {
        let value = values.get(next).cloned().ok_or_else(|| {
          InterpreterError::raise(
            ExceptionKind::TypeError,
            "not enough arguments for format string",
          )
        })?;
        next += 1;
        value
      }
    };

    let mut spec = String::new();
    if flags.contains('-') {
      spec.push('<');
    } else if !flags.contains('0') && !width.is_empty() {
      spec.push('>');
    }
    if flags.contains('+') {
      spec.push('+');
    } else if flags.contains(' ') {
      spec.push(' ');
    }
    if flags.contains('0') && !flags.contains('-') {
      spec.push('0');
    }
    spec.push_str(&width);
    if let Some(p) = precision {
      spec.push_str(&format!(".{p}"));
    }
    let text = match conversion {
      's' => format_value(&Value::Str(value.to_string()), &spec)?,
      'r' => format_value(&Value::Str(value.repr()), &spec)?,
      'd' | 'i' | 'u' => {
        let truncated = match &value {
          Value::Float(x) => Value::Int(x.trunc() as i64),
          other => other.clone(),
        };
        spec.push('d');
        format_value(&truncated, &spec).map_err(|_| {
          InterpreterError::raise(
            ExceptionKind::TypeError,
            format!(
              "%{conversion} format: a real number is required, not {}",
              value.type_name()
            ),
          )
        })?
      }
      'f' | 'F' | 'e' | 'E' | 'g' | 'G' | 'x' | 'X' | 'o' => {
        spec.push(conversion);
        format_value(&value, &spec)?
      }
      other => {
        return Err(value_error(format!(
          "unsupported format character '{other}'"
        )));
      }
    };
    out.push_str(&text);
  }
  if !mapping && next < values.len() {
    return Err(InterpreterError::raise(
      ExceptionKind::TypeError,
      "not all arguments converted during string formatting",
    ));
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn fmt(value: Value, spec: &str) -> String {
    format_value(&value, spec).unwrap()
  }

  #[test]
  fn fixed_and_percent() {
    assert_eq!(fmt(Value::Float(3.14159), ".2f"), "3.14");
    assert_eq!(fmt(Value::Int(2), ".1f"), "2.0");
    assert_eq!(fmt(Value::Float(0.256), ".1%"), "25.6%");
    assert_eq!(fmt(Value::Float(-1.5), "+.1f"), "-1.5");
  }

  #[test]
  fn widths_and_alignment() {
    assert_eq!(fmt(Value::Int(42), "5d"), "   42");
    assert_eq!(fmt(Value::Int(-42), "05d"), "-0042");
    assert_eq!(fmt(Value::str("ab"), "4"), "ab  ");
    assert_eq!(fmt(Value::str("ab"), "*^6"), "**ab**");
    assert_eq!(fmt(Value::Int(1234567), ","), "1,234,567");
  }

  #[test]
  fn exponent_and_general() {
    assert_eq!(fmt(Value::Float(12345.678), ".2e"), "1.23e+04");
    assert_eq!(fmt(Value::Float(0.0001234), "g"), "0.0001234");
    assert_eq!(fmt(Value::Float(1234567.0), "g"), "1.23457e+06");
  }

  #[test]
  fn integer_codes_reject_floats() {
    assert!(format_value(&Value::Float(1.5), "d").is_err());
  }

  #[test]
  fn template_fields() {
    let out = format_template(
      "{} + {1} = {total:.1f} {{ok}}",
      &[Value::Int(1), Value::Int(2)],
      &[("total".to_string(), Value::Float(3.0))],
    )
    .unwrap();
    assert_eq!(out, "1 + 2 = 3.0 {ok}");
  }

  #[test]
  fn printf_style() {
    let args = Value::tuple(vec![Value::str("x"), Value::Float(2.5), Value::Int(7)]);
    assert_eq!(
      percent_format("%s=%.2f (%3d) 100%%", &args).unwrap(),
      "x=2.50 (  7) 100%"
    );
    assert!(percent_format("%s %s", &Value::Int(1)).is_err());
    assert!(percent_format("%s", &Value::tuple(vec![Value::Int(1), Value::Int(2)])).is_err());
  }
}
