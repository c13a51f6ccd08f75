use plotters::coord::Shift;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;

use crate::figures::{Axes, Figure, Marker, PlotError, SeriesKind};

type Chart<'a, 'b> =
  ChartContext<'a, SVGBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

const SUPTITLE_SPACE: u32 = 30;

fn render_err<E: std::fmt::Display>(err: E) -> PlotError {
  PlotError::Render(err.to_string())
}

/// Split points into contiguous finite runs, breaking at NaN/Infinity.
pub(crate) fn split_into_segments(
  points: &[(f64, f64)],
) -> Vec<Vec<(f64, f64)>> {
  let mut segments: Vec<Vec<(f64, f64)>> = Vec::new();
  let mut current: Vec<(f64, f64)> = Vec::new();

  for &(x, y) in points {
    if x.is_finite() && y.is_finite() {
      current.push((x, y));
    } else if !current.is_empty() {
      segments.push(std::mem::take(&mut current));
    }
  }
  if !current.is_empty() {
    segments.push(current);
  }
  segments
}

/// Format a tick value, dropping the fractional part for integers.
pub(crate) fn format_tick(v: &f64) -> String {
  if (v - v.round()).abs() < 1e-9 {
    format!("{}", v.round() as i64)
  } else {
    let text = format!("{v:.3}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
  }
}

fn html_escape(s: &str) -> String {
  s.replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
    .replace('"', "&quot;")
}

/// Widen a data range by 5% on each side, the way autoscaled axes do.
fn padded((lo, hi): (f64, f64)) -> (f64, f64) {
  if !lo.is_finite() || !hi.is_finite() {
    return (0.0, 1.0);
  }
  if lo == hi {
    let delta = if lo == 0.0 { 0.5 } else { lo.abs() * 0.05 };
    return (lo - delta, hi + delta);
  }
  let margin = (hi - lo) * 0.05;
  (lo - margin, hi + margin)
}

fn non_degenerate((lo, hi): (f64, f64)) -> (f64, f64) {
  if lo == hi { (lo - 0.5, hi + 0.5) } else { (lo, hi) }
}

pub(crate) fn axis_bounds(axes: &Axes) -> ((f64, f64), (f64, f64)) {
  let mut xs = (f64::INFINITY, f64::NEG_INFINITY);
  let mut ys = (f64::INFINITY, f64::NEG_INFINITY);
  let extend = |range: &mut (f64, f64), v: f64| {
    if v.is_finite() {
      range.0 = range.0.min(v);
      range.1 = range.1.max(v);
    }
  };
  for series in &axes.series {
    for (&x, &y) in series.x.iter().zip(&series.y) {
      if let SeriesKind::Bar { width } = series.kind {
        extend(&mut xs, x - width / 2.0);
        extend(&mut xs, x + width / 2.0);
        extend(&mut ys, 0.0);
      } else {
        extend(&mut xs, x);
      }
      extend(&mut ys, y);
    }
  }
  let x = axes.xlim.unwrap_or_else(|| padded(xs));
  let y = axes.ylim.unwrap_or_else(|| padded(ys));
  (non_degenerate(x), non_degenerate(y))
}

/// Render a whole figure (all axes in its grid) to an SVG document.
pub fn render_figure(figure: &Figure) -> Result<String, PlotError> {
  let mut buf = String::new();
  {
    let root = SVGBackend::with_string(&mut buf, (figure.width, figure.height))
      .into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let body = if figure.suptitle.is_some() {
      root.margin(SUPTITLE_SPACE, 0, 0, 0)
    } else {
      root.clone()
    };
    if !figure.axes.is_empty() {
      let areas = body.split_evenly((figure.rows, figure.cols));
      for (axes, area) in figure.axes.iter().zip(areas.iter()) {
        draw_axes(axes, area)?;
      }
    }
    root.present().map_err(render_err)?;
  }

  if let Some(title) = &figure.suptitle {
    if let Some(insert_pos) = buf.rfind("</svg>") {
      let cx = figure.width as f64 / 2.0;
      let ty = SUPTITLE_SPACE as f64 * 0.7;
      buf.insert_str(
        insert_pos,
        &format!(
          "<text x=\"{cx:.1}\" y=\"{ty:.1}\" text-anchor=\"middle\" \
           font-family=\"sans-serif\" font-size=\"16\" \
           fill=\"#333\">{}</text>\n",
          html_escape(title)
        ),
      );
    }
  }

  Ok(buf)
}

fn draw_axes(
  axes: &Axes,
  area: &DrawingArea<SVGBackend<'_>, Shift>,
) -> Result<(), PlotError> {
  let ((x0, x1), (y0, y1)) = axis_bounds(axes);

  let mut builder = ChartBuilder::on(area);
  builder
    .margin(10)
    .x_label_area_size(if axes.xlabel.is_some() { 45 } else { 30 })
    .y_label_area_size(if axes.ylabel.is_some() { 60 } else { 45 });
  if let Some(title) = &axes.title {
    builder.caption(title, ("sans-serif", 16));
  }
  let mut chart = builder
    .build_cartesian_2d(x0..x1, y0..y1)
    .map_err(render_err)?;

  let dark_gray = RGBColor(0x44, 0x44, 0x44);
  {
    let mut mesh = chart.configure_mesh();
    if axes.grid {
      mesh
        .bold_line_style(RGBColor(0xdd, 0xdd, 0xdd).stroke_width(1))
        .light_line_style(WHITE.stroke_width(0));
    } else {
      mesh.disable_mesh();
    }
    mesh
      .x_labels(7)
      .y_labels(7)
      .x_label_formatter(&format_tick)
      .y_label_formatter(&format_tick)
      .axis_style(dark_gray.stroke_width(1))
      .label_style(("sans-serif", 12).into_font().color(&dark_gray));
    if let Some(label) = &axes.xlabel {
      mesh.x_desc(label.as_str());
    }
    if let Some(label) = &axes.ylabel {
      mesh.y_desc(label.as_str());
    }
    mesh.draw().map_err(render_err)?;
  }

  let mut labelled = false;
  for series in &axes.series {
    let (r, g, b) = series.color;
    let color = RGBColor(r, g, b);
    let points: Vec<(f64, f64)> = series
      .x
      .iter()
      .copied()
      .zip(series.y.iter().copied())
      .collect();

    let glyph_width = match &series.kind {
      SeriesKind::Line { line, marker } => {
        if *line {
          chart
            .draw_series(
              split_into_segments(&points)
                .into_iter()
                .map(|segment| PathElement::new(segment, color.stroke_width(2))),
            )
            .map_err(render_err)?;
        }
        if let Some(marker) = marker {
          draw_markers(&mut chart, &points, *marker, color)?;
        }
        if *line { 2 } else { 6 }
      }
      SeriesKind::Scatter => {
        draw_markers(&mut chart, &points, Marker::Circle, color)?;
        6
      }
      SeriesKind::Bar { width } => {
        let half = width / 2.0;
        chart
          .draw_series(
            points
              .iter()
              .filter(|(x, y)| x.is_finite() && y.is_finite())
              .map(|&(x, y)| {
                Rectangle::new([(x - half, 0.0), (x + half, y)], color.filled())
              }),
          )
          .map_err(render_err)?;
        8
      }
    };

    if let Some(label) = &series.label {
      labelled = true;
      chart
        .draw_series(std::iter::empty::<PathElement<(f64, f64)>>())
        .map_err(render_err)?
        .label(label.as_str())
        .legend(move |(x, y)| {
          PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(glyph_width))
        });
    }
  }

  if axes.legend && labelled {
    chart
      .configure_series_labels()
      .position(SeriesLabelPosition::UpperRight)
      .background_style(&WHITE.mix(0.85))
      .border_style(&RGBColor(0xcc, 0xcc, 0xcc))
      .label_font(("sans-serif", 12))
      .draw()
      .map_err(render_err)?;
  }
  Ok(())
}

fn draw_markers(
  chart: &mut Chart<'_, '_>,
  points: &[(f64, f64)],
  marker: Marker,
  color: RGBColor,
) -> Result<(), PlotError> {
  let style = color.filled();
  let line = color.stroke_width(1);
  let points = points
    .iter()
    .copied()
    .filter(|(x, y)| x.is_finite() && y.is_finite());
  let drawn = match marker {
    Marker::Circle => chart
      .draw_series(points.map(|p| Circle::new(p, 3, style)))
      .map(|_| ()),
    Marker::Point => chart
      .draw_series(points.map(|p| Circle::new(p, 2, style)))
      .map(|_| ()),
    Marker::Square => chart
      .draw_series(points.map(|p| {
        EmptyElement::at(p) + Rectangle::new([(-3, -3), (3, 3)], style)
      }))
      .map(|_| ()),
    Marker::Triangle => chart
      .draw_series(points.map(|p| TriangleMarker::new(p, 4, style)))
      .map(|_| ()),
    Marker::Cross => chart
      .draw_series(points.map(|p| Cross::new(p, 3, line)))
      .map(|_| ()),
    Marker::Plus => chart
      .draw_series(points.map(|p| {
        EmptyElement::at(p)
          + PathElement::new(vec![(-3, 0), (3, 0)], line)
          + PathElement::new(vec![(0, -3), (0, 3)], line)
      }))
      .map(|_| ()),
  };
  drawn.map_err(render_err)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::figures::Series;

  #[test]
  fn segments_break_at_non_finite_points() {
    let segments = split_into_segments(&[
      (0.0, 1.0),
      (1.0, f64::NAN),
      (2.0, 3.0),
      (3.0, 4.0),
    ]);
    assert_eq!(segments, vec![vec![(0.0, 1.0)], vec![(2.0, 3.0), (3.0, 4.0)]]);
  }

  #[test]
  fn ticks_drop_trailing_zeros() {
    assert_eq!(format_tick(&2.0), "2");
    assert_eq!(format_tick(&0.25), "0.25");
    assert_eq!(format_tick(&-1.5), "-1.5");
  }

  #[test]
  fn bar_bounds_include_the_baseline() {
    let mut axes = Axes::default();
    axes.series.push(Series {
      kind: SeriesKind::Bar { width: 0.8 },
      x: vec![0.0, 1.0],
      y: vec![3.0, 5.0],
      color: (0, 0, 0),
      label: None,
    });
    let ((x0, x1), (y0, y1)) = axis_bounds(&axes);
    assert!(x0 < -0.4 && x1 > 1.4);
    assert!(y0 < 0.0 && y1 > 5.0);
  }

  #[test]
  fn explicit_limits_win() {
    let mut axes = Axes::default();
    axes.xlim = Some((0.0, 10.0));
    assert_eq!(axis_bounds(&axes).0, (0.0, 10.0));
  }
}
