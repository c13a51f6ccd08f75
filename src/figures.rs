//! Figure registry, display hook and the guards around them.
//!
//! The registry is per thread, the same way every other piece of
//! interpreter state is: figures are numbered from 1, one of them is
//! "current", and `show()` hands the open figures to whatever
//! [`FigureDisplay`] is installed.

use std::cell::{Ref, RefCell};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::functions::plot;

pub const DEFAULT_SIZE: (u32, u32) = (640, 480);

/// Most axes a single figure grid may hold.
pub const MAX_GRID_CELLS: usize = 1024;

/// The "tab10" colour cycle used for series without an explicit colour.
pub const COLOR_CYCLE: [(u8, u8, u8); 10] = [
  (0x1f, 0x77, 0xb4),
  (0xff, 0x7f, 0x0e),
  (0x2c, 0xa0, 0x2c),
  (0xd6, 0x27, 0x28),
  (0x94, 0x67, 0xbd),
  (0x8c, 0x56, 0x4b),
  (0xe3, 0x77, 0xc2),
  (0x7f, 0x7f, 0x7f),
  (0xbc, 0xbd, 0x22),
  (0x17, 0xbe, 0xcf),
];

#[derive(Error, Debug)]
pub enum PlotError {
  #[error("Plot: {0}")]
  Render(String),
  #[error("Format '{0}' is not supported (supported formats: svg)")]
  UnsupportedFormat(String),
  #[error("figure is in use")]
  Busy,
  #[error(
    "a {rows}x{cols} subplot grid is too large (at most {} axes)",
    MAX_GRID_CELLS
  )]
  GridTooLarge { rows: usize, cols: usize },
  #[error(transparent)]
  Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
  Circle,
  Point,
  Square,
  Triangle,
  Plus,
  Cross,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SeriesKind {
  Line { line: bool, marker: Option<Marker> },
  Scatter,
  Bar { width: f64 },
}

#[derive(Debug, Clone)]
pub struct Series {
  pub kind: SeriesKind,
  pub x: Vec<f64>,
  pub y: Vec<f64>,
  pub color: (u8, u8, u8),
  pub label: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Axes {
  pub title: Option<String>,
  pub xlabel: Option<String>,
  pub ylabel: Option<String>,
  pub xlim: Option<(f64, f64)>,
  pub ylim: Option<(f64, f64)>,
  pub grid: bool,
  pub legend: bool,
  pub series: Vec<Series>,
  color_index: usize,
}

impl Axes {
  pub fn next_color(&mut self) -> (u8, u8, u8) {
    let color = COLOR_CYCLE[self.color_index % COLOR_CYCLE.len()];
    self.color_index += 1;
    color
  }

  pub fn clear(&mut self) {
    *self = Axes::default();
  }
}

#[derive(Debug, Clone)]
pub struct Figure {
  pub number: u32,
  pub width: u32,
  pub height: u32,
  pub suptitle: Option<String>,
  pub rows: usize,
  pub cols: usize,
  pub axes: Vec<Axes>,
  pub current_axes: usize,
}

impl Figure {
  fn new(number: u32, (width, height): (u32, u32)) -> Self {
    Figure {
      number,
      width,
      height,
      suptitle: None,
      rows: 1,
      cols: 1,
      axes: Vec::new(),
      current_axes: 0,
    }
  }

  /// Index of the current axes, creating a single axes if there is none.
  pub fn current_axes_index(&mut self) -> usize {
    if self.axes.is_empty() {
      self.axes.push(Axes::default());
      self.rows = 1;
      self.cols = 1;
      self.current_axes = 0;
    }
    self.current_axes.min(self.axes.len() - 1)
  }

  /// Replace the layout with a `rows` x `cols` grid of empty axes.
  pub fn make_grid(
    &mut self,
    rows: usize,
    cols: usize,
  ) -> Result<(), PlotError> {
    let (rows, cols) = (rows.max(1), cols.max(1));
    let cells = grid_cells(rows, cols)?;
    self.rows = rows;
    self.cols = cols;
    self.axes = vec![Axes::default(); cells];
    self.current_axes = 0;
    Ok(())
  }

  pub fn clear(&mut self) {
    self.axes.clear();
    self.suptitle = None;
    self.rows = 1;
    self.cols = 1;
    self.current_axes = 0;
  }
}

/// Number of axes in a `rows` x `cols` grid, if it is not too large.
pub fn grid_cells(rows: usize, cols: usize) -> Result<usize, PlotError> {
  rows
    .checked_mul(cols)
    .filter(|&cells| cells <= MAX_GRID_CELLS)
    .ok_or(PlotError::GridTooLarge { rows, cols })
}

/// Shared handle to a figure owned by the registry.
#[derive(Clone)]
pub struct FigureHandle(Rc<RefCell<Figure>>);

impl FigureHandle {
  fn new(figure: Figure) -> Self {
    FigureHandle(Rc::new(RefCell::new(figure)))
  }

  pub fn number(&self) -> u32 {
    self.0.borrow().number
  }

  pub fn ptr_eq(&self, other: &FigureHandle) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }

  pub fn borrow(&self) -> Ref<'_, Figure> {
    self.0.borrow()
  }

  pub fn with_mut<R>(&self, f: impl FnOnce(&mut Figure) -> R) -> R {
    f(&mut self.0.borrow_mut())
  }

  pub fn describe(&self) -> String {
    let figure = self.0.borrow();
    format!(
      "<Figure size {}x{} with {} Axes>",
      figure.width,
      figure.height,
      figure.axes.len()
    )
  }

  /// The current axes of this figure, created on demand.
  pub fn gca(&self) -> AxesHandle {
    let index = self.with_mut(Figure::current_axes_index);
    AxesHandle {
      figure: self.clone(),
      index,
    }
  }

  pub fn axes(&self) -> Vec<AxesHandle> {
    (0..self.0.borrow().axes.len())
      .map(|index| AxesHandle {
        figure: self.clone(),
        index,
      })
      .collect()
  }

  pub fn to_svg(&self) -> Result<String, PlotError> {
    let figure = self.0.try_borrow().map_err(|_| PlotError::Busy)?;
    plot::render_figure(&figure)
  }

  /// Write the figure as SVG. A path without extension gets `.svg`; any
  /// other extension is rejected. Returns the path written.
  pub fn save_svg(&self, path: &Path) -> Result<PathBuf, PlotError> {
    let path = match path.extension().and_then(|e| e.to_str()) {
      None => path.with_extension("svg"),
      Some(ext) if ext.eq_ignore_ascii_case("svg") => path.to_path_buf(),
      Some(ext) => return Err(PlotError::UnsupportedFormat(ext.to_string())),
    };
    std::fs::write(&path, self.to_svg()?)?;
    Ok(path)
  }
}

/// One axes of a figure, addressed by position.
#[derive(Clone)]
pub struct AxesHandle {
  pub figure: FigureHandle,
  pub index: usize,
}

impl PartialEq for AxesHandle {
  fn eq(&self, other: &Self) -> bool {
    self.figure.ptr_eq(&other.figure) && self.index == other.index
  }
}

impl AxesHandle {
  pub fn with_mut<R>(&self, f: impl FnOnce(&mut Axes) -> R) -> R {
    self.figure.with_mut(|figure| {
      if figure.axes.len() <= self.index {
        figure.axes.resize(self.index + 1, Axes::default());
      }
      figure.current_axes = self.index;
      f(&mut figure.axes[self.index])
    })
  }
}

/// Where `show()` sends figures.
pub trait FigureDisplay {
  /// Called once for every newly created figure.
  fn register(&self, _figure: &FigureHandle) {}

  fn display(&self, figures: &[FigureHandle]) -> Result<(), PlotError>;
}

/// Writes each figure as SVG into a directory and opens it with the
/// platform's default viewer.
pub struct SystemViewer {
  dir: PathBuf,
}

impl Default for SystemViewer {
  fn default() -> Self {
    SystemViewer {
      dir: std::env::temp_dir(),
    }
  }
}

impl SystemViewer {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    SystemViewer { dir: dir.into() }
  }
}

impl FigureDisplay for SystemViewer {
  fn display(&self, figures: &[FigureHandle]) -> Result<(), PlotError> {
    for figure in figures {
      let file = self.dir.join(format!(
        "scratchpad-{}-figure-{}.svg",
        std::process::id(),
        figure.number()
      ));
      let written = figure.save_svg(&file)?;
      let opener = if cfg!(target_os = "macos") {
        Command::new("open").arg(&written).spawn()
      } else if cfg!(target_os = "windows") {
        Command::new("explorer").arg(&written).spawn()
      } else {
        Command::new("xdg-open")
          .arg(&written)
          .stdout(Stdio::null())
          .stderr(Stdio::null())
          .spawn()
      };
      opener?;
    }
    Ok(())
  }
}

/// A display that keeps figures registered but never shows them.
pub struct SuppressedDisplay;

impl FigureDisplay for SuppressedDisplay {
  fn display(&self, figures: &[FigureHandle]) -> Result<(), PlotError> {
    debug!(count = figures.len(), "show() intercepted");
    Ok(())
  }
}

struct PlotState {
  figures: BTreeMap<u32, FigureHandle>,
  current: Option<u32>,
  interactive: bool,
  display: Rc<dyn FigureDisplay>,
}

impl Default for PlotState {
  fn default() -> Self {
    PlotState {
      figures: BTreeMap::new(),
      current: None,
      interactive: false,
      display: Rc::new(SystemViewer::default()),
    }
  }
}

thread_local! {
    static PLOT_STATE: RefCell<PlotState> = RefCell::new(PlotState::default());
}

/// Activate figure `num`, creating it (with `size`) if needed.
pub fn figure(num: Option<u32>, size: Option<(u32, u32)>) -> FigureHandle {
  let (handle, created, display) = PLOT_STATE.with(|state| {
    let mut state = state.borrow_mut();
    if let Some(existing) = num.and_then(|n| state.figures.get(&n).cloned()) {
      state.current = num;
      return (existing, false, state.display.clone());
    }
    let number = num.unwrap_or_else(|| {
      state.figures.keys().next_back().map_or(1, |last| last + 1)
    });
    let handle =
      FigureHandle::new(Figure::new(number, size.unwrap_or(DEFAULT_SIZE)));
    state.figures.insert(number, handle.clone());
    state.current = Some(number);
    (handle, true, state.display.clone())
  });
  if created {
    display.register(&handle);
  }
  handle
}

pub fn current_figure() -> Option<FigureHandle> {
  PLOT_STATE.with(|state| {
    let state = state.borrow();
    state.current.and_then(|n| state.figures.get(&n).cloned())
  })
}

/// The current figure, created if the registry is empty.
pub fn gcf() -> FigureHandle {
  current_figure().unwrap_or_else(|| figure(None, None))
}

pub fn gca() -> AxesHandle {
  gcf().gca()
}

/// Make an existing figure current again.
pub fn activate(handle: &FigureHandle) {
  let number = handle.number();
  PLOT_STATE.with(|state| {
    let mut state = state.borrow_mut();
    if state.figures.contains_key(&number) {
      state.current = Some(number);
    }
  });
}

pub fn figure_numbers() -> Vec<u32> {
  PLOT_STATE.with(|state| state.borrow().figures.keys().copied().collect())
}

pub enum Close {
  Current,
  All,
  Number(u32),
  Figure(FigureHandle),
}

pub fn close(which: Close) {
  PLOT_STATE.with(|state| {
    let mut state = state.borrow_mut();
    match which {
      Close::All => state.figures.clear(),
      Close::Current => {
        if let Some(n) = state.current {
          state.figures.remove(&n);
        }
      }
      Close::Number(n) => {
        state.figures.remove(&n);
      }
      Close::Figure(handle) => {
        state.figures.retain(|_, f| !f.ptr_eq(&handle));
      }
    }
    let current_open = state
      .current
      .is_some_and(|n| state.figures.contains_key(&n));
    if !current_open {
      state.current = state.figures.keys().next_back().copied();
    }
  });
}

pub fn set_interactive(on: bool) {
  PLOT_STATE.with(|state| state.borrow_mut().interactive = on);
}

pub fn is_interactive() -> bool {
  PLOT_STATE.with(|state| state.borrow().interactive)
}

/// Hand every open figure to the installed display.
pub fn show() {
  let (figures, display) = PLOT_STATE.with(|state| {
    let state = state.borrow();
    (
      state.figures.values().cloned().collect::<Vec<_>>(),
      state.display.clone(),
    )
  });
  if figures.is_empty() {
    return;
  }
  if let Err(err) = display.display(&figures) {
    warn!(%err, "figure display failed");
  }
}

/// In interactive mode every drawing call shows the current figure.
pub fn draw_if_interactive() {
  if !is_interactive() {
    return;
  }
  let (Some(figure), display) = (
    current_figure(),
    PLOT_STATE.with(|state| state.borrow().display.clone()),
  ) else {
    return;
  };
  if let Err(err) = display.display(&[figure]) {
    warn!(%err, "figure display failed");
  }
}

fn swap_display(hook: Rc<dyn FigureDisplay>) -> Rc<dyn FigureDisplay> {
  PLOT_STATE.with(|state| {
    std::mem::replace(&mut state.borrow_mut().display, hook)
  })
}

/// Replace the display hook for good, e.g. to embed figures in a host UI.
pub fn set_display(hook: Rc<dyn FigureDisplay>) {
  swap_display(hook);
}

/// Scoped replacement of the display hook. While installed, `show()` and
/// interactive redraws do nothing visible; figures stay registered.
pub struct PlotInterceptor {
  previous: Option<Rc<dyn FigureDisplay>>,
}

impl PlotInterceptor {
  pub fn install() -> Self {
    Self::install_with(Rc::new(SuppressedDisplay))
  }

  pub fn install_with(hook: Rc<dyn FigureDisplay>) -> Self {
    PlotInterceptor {
      previous: Some(swap_display(hook)),
    }
  }
}

impl Drop for PlotInterceptor {
  fn drop(&mut self) {
    if let Some(previous) = self.previous.take() {
      swap_display(previous);
    }
  }
}

/// Read-only access to the figures left in the registry.
pub struct FigureHarvester;

impl FigureHarvester {
  /// Every registered figure in ascending number order. Figures that are
  /// mutably borrowed at the time of the call are skipped.
  pub fn get_all_figures() -> Vec<FigureHandle> {
    PLOT_STATE.with(|state| {
      state
        .borrow()
        .figures
        .iter()
        .filter_map(|(number, handle)| match handle.0.try_borrow() {
          Ok(_) => Some(handle.clone()),
          Err(_) => {
            debug!(number, "skipping figure in use");
            None
          }
        })
        .collect()
    })
  }

  pub fn get_current_figure() -> Option<FigureHandle> {
    current_figure()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::Cell;

  struct Counting(Rc<Cell<usize>>);

  impl FigureDisplay for Counting {
    fn display(&self, figures: &[FigureHandle]) -> Result<(), PlotError> {
      self.0.set(self.0.get() + figures.len());
      Ok(())
    }
  }

  #[test]
  fn numbers_figures_from_one_and_tracks_current() {
    close(Close::All);
    let first = figure(None, None);
    let second = figure(None, None);
    assert_eq!((first.number(), second.number()), (1, 2));
    assert!(current_figure().unwrap().ptr_eq(&second));
    close(Close::Current);
    assert_eq!(figure_numbers(), vec![1]);
    assert!(current_figure().unwrap().ptr_eq(&first));
    close(Close::All);
    assert!(current_figure().is_none());
  }

  #[test]
  fn interceptor_swaps_and_restores_the_hook() {
    close(Close::All);
    let shown = Rc::new(Cell::new(0));
    let _outer =
      PlotInterceptor::install_with(Rc::new(Counting(shown.clone())));
    figure(None, None);
    {
      let _inner = PlotInterceptor::install();
      show();
      assert_eq!(shown.get(), 0);
    }
    show();
    assert_eq!(shown.get(), 1);
    close(Close::All);
  }

  #[test]
  fn grid_cells_are_capped() {
    assert_eq!(grid_cells(2, 3).unwrap(), 6);
    assert_eq!(grid_cells(32, 32).unwrap(), MAX_GRID_CELLS);
    assert!(matches!(
      grid_cells(33, 32),
      Err(PlotError::GridTooLarge { rows: 33, cols: 32 })
    ));
    assert!(grid_cells(usize::MAX, 2).is_err());
  }

  #[test]
  fn save_rejects_other_formats() {
    close(Close::All);
    let handle = figure(None, None);
    let err = handle.save_svg(Path::new("plot.png")).unwrap_err();
    assert!(matches!(err, PlotError::UnsupportedFormat(ext) if ext == "png"));
    close(Close::All);
  }
}
