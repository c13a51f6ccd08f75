//! `matplotlib.pyplot`: a state-machine API over the figure registry,
//! plus the methods of figure and axes values.

use std::path::Path;

use crate::evaluator::Interpreter;
use crate::figures::{
  self, AxesHandle, Close, FigureHandle, Marker, PlotError, Series, SeriesKind,
  COLOR_CYCLE,
};
use crate::functions::numeric::NdArray;
use crate::functions::plot::axis_bounds;
use crate::value::{check_length, Args, Value};
use crate::{ExceptionKind, InterpreterError};

pub const FIGURE_METHODS: &[&str] = &[
  "savefig",
  "suptitle",
  "gca",
  "clf",
  "add_subplot",
  "set_size_inches",
  "tight_layout",
  "show",
];

pub const AXES_METHODS: &[&str] = &[
  "plot",
  "scatter",
  "bar",
  "hist",
  "set_title",
  "set_xlabel",
  "set_ylabel",
  "set_xlim",
  "set_ylim",
  "get_title",
  "get_xlim",
  "get_ylim",
  "legend",
  "grid",
  "clear",
  "cla",
];

fn value_error(message: impl Into<String>) -> InterpreterError {
  InterpreterError::raise(ExceptionKind::ValueError, message)
}

fn type_error(message: impl Into<String>) -> InterpreterError {
  InterpreterError::raise(ExceptionKind::TypeError, message)
}

fn plot_error(err: PlotError) -> InterpreterError {
  match err {
    PlotError::UnsupportedFormat(_) | PlotError::GridTooLarge { .. } => {
      value_error(err.to_string())
    }
    PlotError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
      InterpreterError::raise(ExceptionKind::FileNotFoundError, io.to_string())
    }
    PlotError::Io(io) => InterpreterError::raise(ExceptionKind::OSError, io.to_string()),
    other => InterpreterError::raise(ExceptionKind::RuntimeError, other.to_string()),
  }
}

fn floats(value: &Value) -> Result<Vec<f64>, InterpreterError> {
  Ok(NdArray::from_value(value)?.data)
}

fn text(value: &Value) -> String {
  value.to_string()
}

fn count(value: &Value, name: &str) -> Result<usize, InterpreterError> {
  match value.as_int() {
    Some(n) if n > 0 => Ok(n as usize),
    _ => Err(value_error(format!(
      "{name} must be a positive integer, not {}",
      value.repr()
    ))),
  }
}

// ── Colours and format strings ───────────────────────────────────────

fn named_color(name: &str) -> Option<(u8, u8, u8)> {
  let name = name.strip_prefix("tab:").unwrap_or(name);
  Some(match name {
    "b" => (0x00, 0x00, 0xff),
    "g" => (0x00, 0x80, 0x00),
    "r" => (0xff, 0x00, 0x00),
    "c" => (0x00, 0xbf, 0xbf),
    "m" => (0xbf, 0x00, 0xbf),
    "y" => (0xbf, 0xbf, 0x00),
    "k" | "black" => (0x00, 0x00, 0x00),
    "w" | "white" => (0xff, 0xff, 0xff),
    "blue" => COLOR_CYCLE[0],
    "orange" => COLOR_CYCLE[1],
    "green" => COLOR_CYCLE[2],
    "red" => COLOR_CYCLE[3],
    "purple" => COLOR_CYCLE[4],
    "brown" => COLOR_CYCLE[5],
    "pink" => COLOR_CYCLE[6],
    "gray" | "grey" => COLOR_CYCLE[7],
    "olive" => COLOR_CYCLE[8],
    "cyan" => COLOR_CYCLE[9],
    "magenta" => (0xff, 0x00, 0xff),
    "yellow" => (0xff, 0xff, 0x00),
    _ => {
      if let Some(digit) = name.strip_prefix('C') {
        let index: usize = digit.parse().ok()?;
        return Some(COLOR_CYCLE[index % COLOR_CYCLE.len()]);
      }
      let hex = name.strip_prefix('#')?;
      if hex.len() != 6 {
        return None;
      }
      let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
      return Some((channel(0)?, channel(2)?, channel(4)?));
    }
  })
}

fn parse_color(value: &Value) -> Result<(u8, u8, u8), InterpreterError> {
  match value {
    Value::Str(name) => named_color(name).ok_or_else(|| {
      value_error(format!("{} is not a valid value for color", value.repr()))
    }),
    Value::Tuple(_) | Value::List(_) => {
      let channels = floats(value)?;
      match channels.as_slice() {
        [r, g, b] | [r, g, b, _] => {
          let scale = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
          Ok((scale(*r), scale(*g), scale(*b)))
        }
        _ => Err(value_error(format!(
          "{} is not a valid value for color",
          value.repr()
        ))),
      }
    }
    other => Err(value_error(format!(
      "{} is not a valid value for color",
      other.repr()
    ))),
  }
}

fn marker_for(c: char) -> Option<Marker> {
  match c {
    'o' => Some(Marker::Circle),
    '.' => Some(Marker::Point),
    's' | 'D' | 'd' => Some(Marker::Square),
    '^' | 'v' | '<' | '>' => Some(Marker::Triangle),
    '+' => Some(Marker::Plus),
    'x' | 'X' => Some(Marker::Cross),
    _ => None,
  }
}

/// A parsed `'[color][marker][line]'` format string.
#[derive(Debug, Default, PartialEq)]
struct LineFormat {
  color: Option<(u8, u8, u8)>,
  marker: Option<Marker>,
  line: Option<bool>,
}

fn parse_fmt(fmt: &str) -> Result<LineFormat, InterpreterError> {
  let mut out = LineFormat::default();
  let mut rest = fmt;
  while !rest.is_empty() {
    if let Some(after) = ["--", "-.", "-", ":"]
      .iter()
      .find_map(|style| rest.strip_prefix(style))
    {
      out.line = Some(true);
      rest = after;
      continue;
    }
    if let Some(digit) = rest
      .strip_prefix('C')
      .and_then(|r| r.get(..1))
      .filter(|d| d.chars().all(|c| c.is_ascii_digit())) {
      out.color = named_color(&format!("C{digit}"));
      rest = &rest[2..];
      continue;
    }
    let mut chars = rest.chars();
    let c = chars.next().unwrap_or_default();
    if "bgrcmykw".contains(c) {
      out.color = named_color(&c.to_string());
    } else if let Some(marker) = marker_for(c) {
      out.marker = Some(marker);
    } else {
      return Err(value_error(format!(
        "Unrecognized character {c} in format string '{fmt}'"
      )));
    }
    rest = chars.as_str();
  }
  Ok(out)
}

// ── Axes methods ─────────────────────────────────────────────────────

fn series_color(
  axes: &AxesHandle,
  args: &Args,
  explicit: Option<(u8, u8, u8)>,
) -> Result<(u8, u8, u8), InterpreterError> {
  if let Some(color) = args.keyword("color") {
    if !matches!(color, Value::None) {
      return parse_color(color);
    }
  }
  // `c=` may also be a per-point value list, which is not drawn.
  if let Some(color @ Value::Str(_)) = args.keyword("c") {
    return parse_color(color);
  }
  match explicit {
    Some(color) => Ok(color),
    None => Ok(axes.with_mut(|a| a.next_color())),
  }
}

fn label(args: &Args) -> Option<String> {
  match args.keyword("label") {
    None | Some(Value::None) => None,
    Some(value) => Some(text(value)),
  }
}

fn same_length(x: &[f64], y: &[f64]) -> Result<(), InterpreterError> {
  if x.len() != y.len() {
    return Err(value_error(format!(
      "x and y must have same first dimension, but have shapes ({},) and ({},)",
      x.len(),
      y.len()
    )));
  }
  Ok(())
}

fn add_series(axes: &AxesHandle, series: Series) {
  axes.with_mut(|a| a.series.push(series));
  figures::activate(&axes.figure);
}

fn plot(axes: &AxesHandle, args: &Args) -> Result<Value, InterpreterError> {
  let p = &args.positional;
  if p.is_empty() {
    return Ok(Value::list(Vec::new()));
  }
  let mut i = 0;
  while i < p.len() {
    let first = &p[i];
    i += 1;
    let (x, y) = match p.get(i) {
      Some(second) if !matches!(second, Value::Str(_)) => {
        i += 1;
        (floats(first)?, floats(second)?)
      }
      _ => {
        let y = floats(first)?;
        ((0..y.len()).map(|k| k as f64).collect(), y)
      }
    };
    same_length(&x, &y)?;
    let mut fmt = LineFormat::default();
    if let Some(Value::Str(spec)) = p.get(i) {
      fmt = parse_fmt(spec)?;
      i += 1;
    }
    if let Some(marker) = args.keyword("marker") {
      fmt.marker = match marker {
        Value::Str(m) => m.chars().next().and_then(marker_for),
        _ => None,
      };
    }
    if let Some(style) = args.keyword("linestyle").or_else(|| args.keyword("ls")) {
      let style = text(style);
      fmt.line = Some(!matches!(style.as_str(), "" | "None" | "none" | " "));
    }
    let line = fmt.line.unwrap_or(fmt.marker.is_none());
    let color = series_color(axes, args, fmt.color)?;
    add_series(
      axes,
      Series {
        kind: SeriesKind::Line {
          line,
          marker: fmt.marker,
        },
        x,
        y,
        color,
        label: label(args),
      },
    );
  }
  Ok(Value::None)
}

fn scatter(axes: &AxesHandle, args: &Args) -> Result<Value, InterpreterError> {
  let x = floats(args.required("scatter", 0, "x")?)?;
  let y = floats(args.required("scatter", 1, "y")?)?;
  same_length(&x, &y)?;
  let color = series_color(axes, args, None)?;
  add_series(
    axes,
    Series {
      kind: SeriesKind::Scatter,
      x,
      y,
      color,
      label: label(args),
    },
  );
  Ok(Value::None)
}

fn bar(axes: &AxesHandle, args: &Args) -> Result<Value, InterpreterError> {
  let positions = args.required("bar", 0, "x")?;
  let heights = floats(args.required("bar", 1, "height")?)?;
  let x = match positions.to_vec() {
    Ok(items) if items.iter().any(|v| matches!(v, Value::Str(_))) => {
      (0..items.len()).map(|k| k as f64).collect()
    }
    _ => floats(positions)?,
  };
  same_length(&x, &heights)?;
  let width = match args.get(2, "width") {
    Some(w) => w.as_f64().ok_or_else(|| type_error("bar width must be a number"))?,
    None => 0.8,
  };
  let color = series_color(axes, args, None)?;
  add_series(
    axes,
    Series {
      kind: SeriesKind::Bar { width },
      x,
      y: heights,
      color,
      label: label(args),
    },
  );
  Ok(Value::None)
}

/// Equal-width histogram over the data range; the last bin is closed.
fn histogram(data: &[f64], bins: usize) -> (Vec<f64>, Vec<f64>) {
  let finite: Vec<f64> = data.iter().copied().filter(|x| x.is_finite()).collect();
  let (mut lo, mut hi) = finite
    .iter()
    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
      (lo.min(x), hi.max(x))
    });
  if finite.is_empty() {
    (lo, hi) = (0.0, 1.0);
  } else if lo == hi {
    (lo, hi) = (lo - 0.5, hi + 0.5);
  }
  let width = (hi - lo) / bins as f64;
  let edges: Vec<f64> = (0..=bins).map(|i| lo + i as f64 * width).collect();
  let mut counts = vec![0.0; bins];
  for x in finite {
    let index = (((x - lo) / width) as usize).min(bins - 1);
    counts[index] += 1.0;
  }
  (counts, edges)
}

fn hist(axes: &AxesHandle, args: &Args) -> Result<Value, InterpreterError> {
  let data = floats(args.required("hist", 0, "x")?)?;
  let bins = match args.get(1, "bins") {
    Some(b) => check_length(count(b, "bins")?)?,
    None => 10,
  };
  let (counts, edges) = histogram(&data, bins);
  let width = edges[1] - edges[0];
  let centers = edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
  let color = series_color(axes, args, None)?;
  add_series(
    axes,
    Series {
      kind: SeriesKind::Bar { width },
      x: centers,
      y: counts.clone(),
      color,
      label: label(args),
    },
  );
  Ok(Value::tuple(vec![
    NdArray::floats(counts).into_value(),
    NdArray::floats(edges).into_value(),
    Value::None,
  ]))
}

fn limits(args: &Args, func: &str) -> Result<Option<(f64, f64)>, InterpreterError> {
  let p = &args.positional;
  let pair = match p.as_slice() {
    [] => {
      let left = args.keyword("left").or_else(|| args.keyword("bottom"));
      let right = args.keyword("right").or_else(|| args.keyword("top"));
      match (left, right) {
        (Some(l), Some(r)) => vec![l.clone(), r.clone()],
        _ => return Ok(None),
      }
    }
    [single @ (Value::Tuple(_) | Value::List(_))] => single.to_vec()?,
    many => many.to_vec(),
  };
  match pair.as_slice() {
    [lo, hi] => match (lo.as_f64(), hi.as_f64()) {
      (Some(lo), Some(hi)) => Ok(Some((lo, hi))),
      _ => Err(type_error(format!("{func}() limits must be numbers"))),
    },
    _ => Err(type_error(format!("{func}() expects a (left, right) pair"))),
  }
}

fn bounds_value((lo, hi): (f64, f64)) -> Value {
  Value::tuple(vec![Value::Float(lo), Value::Float(hi)])
}

fn legend(axes: &AxesHandle, args: &Args) -> Result<Value, InterpreterError> {
  let labels = match args.positional.first() {
    Some(labels @ (Value::List(_) | Value::Tuple(_))) => Some(labels.to_vec()?),
    _ => None,
  };
  axes.with_mut(|a| {
    if let Some(labels) = labels {
      for (series, label) in a.series.iter_mut().zip(labels) {
        series.label = Some(text(&label));
      }
    }
    a.legend = true;
  });
  Ok(Value::None)
}

/// Dispatch a method call on an axes value.
pub fn axes_method(
  axes: &AxesHandle,
  name: &str,
  args: Args,
) -> Result<Value, InterpreterError> {
  let result = match name {
    "plot" => plot(axes, &args)?,
    "scatter" => scatter(axes, &args)?,
    "bar" => bar(axes, &args)?,
    "hist" => hist(axes, &args)?,
    "set_title" | "set_xlabel" | "set_ylabel" => {
      let value = args.required(name, 0, "label")?;
      let label = match value {
        Value::None => None,
        other => Some(text(other)),
      };
      axes.with_mut(|a| match name {
        "set_title" => a.title = label,
        "set_xlabel" => a.xlabel = label,
        _ => a.ylabel = label,
      });
      Value::None
    }
    "get_title" => {
      Value::Str(axes.with_mut(|a| a.title.clone()).unwrap_or_default())
    }
    "set_xlim" | "set_ylim" => {
      let range = limits(&args, name)?;
      let is_x = name == "set_xlim";
      axes.with_mut(|a| {
        if is_x {
          a.xlim = range;
        } else {
          a.ylim = range;
        }
        let (x, y) = axis_bounds(a);
        bounds_value(if is_x { x } else { y })
      })
    }
    "get_xlim" => bounds_value(axes.with_mut(|a| axis_bounds(a).0)),
    "get_ylim" => bounds_value(axes.with_mut(|a| axis_bounds(a).1)),
    "legend" => legend(axes, &args)?,
    "grid" => {
      let visible = match args.get(0, "visible") {
        None | Some(Value::None) => true,
        Some(value) => value.truthy()?,
      };
      axes.with_mut(|a| a.grid = visible);
      Value::None
    }
    "clear" | "cla" => {
      axes.with_mut(|a| a.clear());
      Value::None
    }
    other => {
      return Err(InterpreterError::raise(
        ExceptionKind::AttributeError,
        format!("'Axes' object has no attribute '{other}'"),
      ));
    }
  };
  if !name.starts_with("get_") {
    figures::draw_if_interactive();
  }
  Ok(result)
}

// ── Figure methods ───────────────────────────────────────────────────

fn figsize(value: &Value) -> Result<(u32, u32), InterpreterError> {
  match floats(value)?.as_slice() {
    [w, h] if *w > 0.0 && *h > 0.0 => {
      Ok(((w * 100.0).round() as u32, (h * 100.0).round() as u32))
    }
    _ => Err(value_error(format!(
      "figure size must be a (width, height) pair of positive numbers, not {}",
      value.repr()
    ))),
  }
}

/// `subplot(2, 1, 1)` or the packed form `subplot(211)`.
fn subplot_position(
  args: &Args,
  func: &str,
) -> Result<(usize, usize, usize), InterpreterError> {
  let p = &args.positional;
  let (rows, cols, index) = match p.as_slice() {
    [] => (1, 1, 1),
    [packed] => {
      let n = count(packed, func)?;
      if !(111..=999).contains(&n) {
        return Err(value_error(format!(
          "Integer subplot specification must be a three-digit number, not {n}"
        )));
      }
      (n / 100, n / 10 % 10, n % 10)
    }
    [rows, cols, index] => (
      count(rows, "nrows")?,
      count(cols, "ncols")?,
      count(index, "index")?,
    ),
    _ => {
      return Err(type_error(format!(
        "{func}() takes 1 or 3 positional arguments but {} were given",
        p.len()
      )));
    }
  };
  let cells = figures::grid_cells(rows, cols).map_err(plot_error)?;
  if index == 0 || index > cells {
    return Err(value_error(format!(
      "num must be an integer with 1 <= num <= {cells}, not {index}"
    )));
  }
  Ok((rows, cols, index))
}

fn add_subplot(
  figure: &FigureHandle,
  args: &Args,
  func: &str,
) -> Result<Value, InterpreterError> {
  let (rows, cols, index) = subplot_position(args, func)?;
  figure
    .with_mut(|f| {
      if f.rows != rows || f.cols != cols || f.axes.is_empty() {
        f.make_grid(rows, cols)?;
      }
      f.current_axes = index - 1;
      Ok::<_, PlotError>(())
    })
    .map_err(plot_error)?;
  figures::activate(figure);
  Ok(Value::Axes(AxesHandle {
    figure: figure.clone(),
    index: index - 1,
  }))
}

fn save(figure: &FigureHandle, args: &Args) -> Result<Value, InterpreterError> {
  let path = match args.required("savefig", 0, "fname")? {
    Value::Str(path) => path.clone(),
    other => {
      return Err(type_error(format!(
        "savefig() fname must be a string, not '{}'",
        other.type_name()
      )));
    }
  };
  figure.save_svg(Path::new(&path)).map_err(plot_error)?;
  Ok(Value::None)
}

pub fn figure_method(
  figure: &FigureHandle,
  name: &str,
  args: Args,
) -> Result<Value, InterpreterError> {
  match name {
    "savefig" => save(figure, &args),
    "suptitle" => {
      let title = text(args.required("suptitle", 0, "t")?);
      figure.with_mut(|f| f.suptitle = Some(title));
      figures::draw_if_interactive();
      Ok(Value::None)
    }
    "gca" => Ok(Value::Axes(figure.gca())),
    "clf" => {
      figure.with_mut(|f| f.clear());
      Ok(Value::None)
    }
    "add_subplot" => add_subplot(figure, &args, "add_subplot"),
    "set_size_inches" => {
      let size = match args.positional.as_slice() {
        [w, h] => figsize(&Value::tuple(vec![w.clone(), h.clone()]))?,
        [pair] => figsize(pair)?,
        _ => return Err(type_error("set_size_inches() expects (w, h)")),
      };
      figure.with_mut(|f| (f.width, f.height) = size);
      Ok(Value::None)
    }
    "tight_layout" => Ok(Value::None),
    "show" => {
      figures::show();
      Ok(Value::None)
    }
    other => Err(InterpreterError::raise(
      ExceptionKind::AttributeError,
      format!("'Figure' object has no attribute '{other}'"),
    )),
  }
}

pub fn figure_attribute(figure: &FigureHandle, name: &str) -> Option<Value> {
  match name {
    "number" => Some(Value::Int(figure.number() as i64)),
    "axes" => Some(Value::list(
      figure.axes().into_iter().map(Value::Axes).collect(),
    )),
    _ => None,
  }
}

// ── pyplot functions ─────────────────────────────────────────────────

fn on_current_axes(name: &str, args: Args) -> Result<Value, InterpreterError> {
  axes_method(&figures::gca(), name, args)
}

pub fn plt_plot(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  on_current_axes("plot", args)
}

pub fn plt_scatter(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  on_current_axes("scatter", args)
}

pub fn plt_bar(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  on_current_axes("bar", args)
}

pub fn plt_hist(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  on_current_axes("hist", args)
}

pub fn plt_title(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  on_current_axes("set_title", args)
}

pub fn plt_xlabel(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  on_current_axes("set_xlabel", args)
}

pub fn plt_ylabel(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  on_current_axes("set_ylabel", args)
}

pub fn plt_legend(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  on_current_axes("legend", args)
}

pub fn plt_grid(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  on_current_axes("grid", args)
}

pub fn plt_cla(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  on_current_axes("cla", args)
}

/// `xlim()` reads the limits, `xlim(lo, hi)` sets them.
pub fn plt_xlim(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  if args.is_empty() {
    on_current_axes("get_xlim", args)
  } else {
    on_current_axes("set_xlim", args)
  }
}

pub fn plt_ylim(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  if args.is_empty() {
    on_current_axes("get_ylim", args)
  } else {
    on_current_axes("set_ylim", args)
  }
}

pub fn plt_figure(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  let num = match args.get(0, "num") {
    None | Some(Value::None) => None,
    Some(Value::Figure(existing)) => {
      figures::activate(existing);
      return Ok(Value::Figure(existing.clone()));
    }
    Some(n) => Some(count(n, "num")? as u32),
  };
  let size = match args.get(1, "figsize") {
    None | Some(Value::None) => None,
    Some(value) => Some(figsize(value)?),
  };
  Ok(Value::Figure(figures::figure(num, size)))
}

pub fn plt_subplots(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  let rows = match args.get(0, "nrows") {
    Some(n) => count(n, "nrows")?,
    None => 1,
  };
  let cols = match args.get(1, "ncols") {
    Some(n) => count(n, "ncols")?,
    None => 1,
  };
  let size = match args.keyword("figsize") {
    None | Some(Value::None) => None,
    Some(value) => Some(figsize(value)?),
  };
  figures::grid_cells(rows, cols).map_err(plot_error)?;
  let figure = figures::figure(None, size);
  figure
    .with_mut(|f| f.make_grid(rows, cols))
    .map_err(plot_error)?;
  let axes: Vec<Value> = figure.axes().into_iter().map(Value::Axes).collect();
  let axes = match (rows, cols) {
    (1, 1) => axes.into_iter().next().unwrap_or(Value::None),
    (1, _) | (_, 1) => Value::list(axes),
    _ => Value::list(
      axes
        .chunks(cols)
        .map(|row| Value::list(row.to_vec()))
        .collect(),
    ),
  };
  Ok(Value::tuple(vec![Value::Figure(figure), axes]))
}

pub fn plt_subplot(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  add_subplot(&figures::gcf(), &args, "subplot")
}

pub fn plt_suptitle(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  figure_method(&figures::gcf(), "suptitle", args)
}

pub fn plt_savefig(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  save(&figures::gcf(), &args)
}

pub fn plt_show(_: &mut Interpreter, _: Args) -> Result<Value, InterpreterError> {
  figures::show();
  Ok(Value::None)
}

pub fn plt_close(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  let which = match args.get(0, "fig") {
    None | Some(Value::None) => Close::Current,
    Some(Value::Str(s)) if s == "all" => Close::All,
    Some(Value::Figure(handle)) => Close::Figure(handle.clone()),
    Some(other) => match other.as_int() {
      Some(n) if n > 0 => Close::Number(n as u32),
      _ => {
        return Err(type_error(format!(
          "close() argument must be a Figure, an int or 'all', not {}",
          other.repr()
        )));
      }
    },
  };
  figures::close(which);
  Ok(Value::None)
}

pub fn plt_clf(_: &mut Interpreter, _: Args) -> Result<Value, InterpreterError> {
  figures::gcf().with_mut(|f| f.clear());
  Ok(Value::None)
}

pub fn plt_gcf(_: &mut Interpreter, _: Args) -> Result<Value, InterpreterError> {
  Ok(Value::Figure(figures::gcf()))
}

pub fn plt_gca(_: &mut Interpreter, _: Args) -> Result<Value, InterpreterError> {
  Ok(Value::Axes(figures::gca()))
}

pub fn plt_get_fignums(_: &mut Interpreter, _: Args) -> Result<Value, InterpreterError> {
  Ok(Value::list(
    figures::figure_numbers()
      .into_iter()
      .map(|n| Value::Int(n as i64))
      .collect(),
  ))
}

pub fn plt_ion(_: &mut Interpreter, _: Args) -> Result<Value, InterpreterError> {
  figures::set_interactive(true);
  Ok(Value::None)
}

pub fn plt_ioff(_: &mut Interpreter, _: Args) -> Result<Value, InterpreterError> {
  figures::set_interactive(false);
  Ok(Value::None)
}

pub fn plt_isinteractive(_: &mut Interpreter, _: Args) -> Result<Value, InterpreterError> {
  Ok(Value::Bool(figures::is_interactive()))
}

pub fn plt_tight_layout(_: &mut Interpreter, _: Args) -> Result<Value, InterpreterError> {
  Ok(Value::None)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn format_strings() {
    let fmt = parse_fmt("r--").unwrap();
    assert_eq!(fmt.color, Some((0xff, 0, 0)));
    assert_eq!(fmt.line, Some(true));
    assert_eq!(fmt.marker, None);

    let fmt = parse_fmt("bo").unwrap();
    assert_eq!(fmt.marker, Some(Marker::Circle));
    assert_eq!(fmt.line, None);

    assert_eq!(parse_fmt("C3").unwrap().color, Some(COLOR_CYCLE[3]));
    assert!(parse_fmt("q").is_err());
  }

  #[test]
  fn hex_and_named_colors() {
    assert_eq!(named_color("#102030"), Some((0x10, 0x20, 0x30)));
    assert_eq!(named_color("tab:orange"), Some(COLOR_CYCLE[1]));
    assert_eq!(named_color("chartreuse-ish"), None);
  }

  #[test]
  fn histogram_closes_the_last_bin() {
    let (counts, edges) = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0], 4);
    assert_eq!(counts, vec![1.0, 1.0, 1.0, 2.0]);
    assert_eq!(edges, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
  }
}
