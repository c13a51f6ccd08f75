use pest::Parser;
use pest::iterators::Pair;
use std::rc::Rc;

use crate::{InterpreterError, Rule, SnippetParser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
  Add,
  Sub,
  Mul,
  Div,
  FloorDiv,
  Mod,
  Pow,
}

impl BinaryOperator {
  pub fn symbol(self) -> &'static str {
    match self {
      BinaryOperator::Add => "+",
      BinaryOperator::Sub => "-",
      BinaryOperator::Mul => "*",
      BinaryOperator::Div => "/",
      BinaryOperator::FloorDiv => "//",
      BinaryOperator::Mod => "%",
      BinaryOperator::Pow => "** or pow()",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
  Neg,
  Pos,
  Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOperator {
  And,
  Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
  Eq,
  NotEq,
  Lt,
  LtE,
  Gt,
  GtE,
  In,
  NotIn,
  Is,
  IsNot,
}

#[derive(Debug, Clone)]
pub enum Expr {
  None,
  Bool(bool),
  Int(i64),
  Float(f64),
  Str(String),
  FString(Vec<FStringPart>),
  Name(String),
  List(Vec<Expr>),
  Tuple(Vec<Expr>),
  Dict(Vec<(Expr, Expr)>),
  ListComp {
    element: Box<Expr>,
    target: Box<Target>,
    iter: Box<Expr>,
    condition: Option<Box<Expr>>,
  },
  BinaryOp {
    op: BinaryOperator,
    left: Box<Expr>,
    right: Box<Expr>,
  },
  UnaryOp {
    op: UnaryOperator,
    operand: Box<Expr>,
  },
  BoolOp {
    op: BoolOperator,
    left: Box<Expr>,
    right: Box<Expr>,
  },
  Compare {
    first: Box<Expr>,
    rest: Vec<(ComparisonOp, Expr)>,
  },
  Conditional {
    condition: Box<Expr>,
    then: Box<Expr>,
    otherwise: Box<Expr>,
  },
  Call {
    func: Box<Expr>,
    args: Vec<Argument>,
  },
  Attribute {
    value: Box<Expr>,
    name: String,
  },
  Subscript {
    value: Box<Expr>,
    index: Box<Index>,
  },
}

#[derive(Debug, Clone)]
pub enum FStringPart {
  Literal(String),
  Field {
    expr: Box<Expr>,
    conversion: Option<char>,
    spec: Option<String>,
  },
}

#[derive(Debug, Clone)]
pub enum Argument {
  Positional(Expr),
  Keyword(String, Expr),
}

#[derive(Debug, Clone)]
pub enum Index {
  Single(Expr),
  Slice {
    lower: Option<Expr>,
    upper: Option<Expr>,
    step: Option<Expr>,
  },
}

#[derive(Debug, Clone)]
pub enum Target {
  Name(String),
  Attribute { value: Expr, name: String },
  Subscript { value: Expr, index: Index },
  Tuple(Vec<Target>),
}

#[derive(Debug, Clone)]
pub struct Param {
  pub name: String,
  pub default: Option<Expr>,
}

#[derive(Debug)]
pub struct FunctionDef {
  pub name: String,
  pub params: Vec<Param>,
  pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct ImportName {
  pub module: String,
  pub alias: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExceptHandler {
  pub kind: Option<Expr>,
  pub name: Option<String>,
  pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
  Expr(Expr),
  Assign {
    targets: Vec<Target>,
    value: Expr,
  },
  AugAssign {
    target: Target,
    op: BinaryOperator,
    value: Expr,
  },
  If {
    branches: Vec<(Expr, Vec<Stmt>)>,
    orelse: Vec<Stmt>,
  },
  While {
    condition: Expr,
    body: Vec<Stmt>,
  },
  For {
    target: Target,
    iter: Expr,
    body: Vec<Stmt>,
  },
  FunctionDef(Rc<FunctionDef>),
  Return(Option<Expr>),
  Pass,
  Break,
  Continue,
  Global(Vec<String>),
  Import(Vec<ImportName>),
  ImportFrom {
    module: String,
    names: Vec<(String, Option<String>)>,
  },
  Raise(Option<Expr>),
  Try {
    body: Vec<Stmt>,
    handlers: Vec<ExceptHandler>,
    orelse: Vec<Stmt>,
    finally: Vec<Stmt>,
  },
  Assert {
    test: Expr,
    message: Option<Expr>,
  },
  Delete(Vec<Target>),
}

// ── Logical lines ────────────────────────────────────────────────────

/// One logical line: physical lines joined across open brackets and
/// backslash continuations, with comments removed.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLine {
  pub number: usize,
  pub indent: usize,
  pub text: String,
}

fn syntax_error(line: usize, message: impl Into<String>) -> InterpreterError {
  InterpreterError::SyntaxError {
    line,
    message: message.into(),
  }
}

pub fn logical_lines(source: &str) -> Result<Vec<SourceLine>, InterpreterError> {
  let chars: Vec<char> = source.replace("\r\n", "\n").chars().collect();
  let mut lines = Vec::new();
  let mut current = String::new();
  let mut indent = 0;
  let mut at_line_start = true;
  let mut line_no = 1;
  let mut start_line = 1;
  let mut depth: usize = 0;
  let mut i = 0;

  let mut flush = |current: &mut String, indent: usize, number: usize| {
    let text = current.trim_end();
    if !text.is_empty() {
      lines.push(SourceLine {
        number,
        indent,
        text: text.to_string(),
      });
    }
    current.clear();
  };

  while i < chars.len() {
    if at_line_start {
      let mut width = 0;
      while i < chars.len() && (chars[i] == ' ' || chars[i] == '\t') {
        width = if chars[i] == '\t' {
          (width / 8 + 1) * 8
        } else {
          width + 1
        };
        i += 1;
      }
      indent = width;
      start_line = line_no;
      at_line_start = false;
      continue;
    }

    let c = chars[i];
    match c {
      '#' => {
        while i < chars.len() && chars[i] != '\n' {
          i += 1;
        }
      }
      '\n' => {
        line_no += 1;
        i += 1;
        if depth > 0 {
          current.push(' ');
        } else {
          flush(&mut current, indent, start_line);
          at_line_start = true;
        }
      }
      '\\' if chars.get(i + 1) == Some(&'\n') => {
        line_no += 1;
        i += 2;
        current.push(' ');
      }
      '\'' | '"' => {
        let triple = chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c);
        let quote_len = if triple { 3 } else { 1 };
        for _ in 0..quote_len {
          current.push(c);
        }
        i += quote_len;
        let mut closed = false;
        while i < chars.len() {
          let ch = chars[i];
          if ch == '\\' && i + 1 < chars.len() {
            if chars[i + 1] == '\n' {
              line_no += 1;
            }
            current.push(ch);
            current.push(chars[i + 1]);
            i += 2;
            continue;
          }
          if ch == '\n' {
            if !triple {
              break;
            }
            line_no += 1;
          }
          if ch == c
            && (!triple
              || (chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c)))
          {
            for _ in 0..quote_len {
              current.push(c);
            }
            i += quote_len;
            closed = true;
            break;
          }
          current.push(ch);
          i += 1;
        }
        if !closed {
          return Err(syntax_error(line_no, "unterminated string literal"));
        }
      }
      '(' | '[' | '{' => {
        depth += 1;
        current.push(c);
        i += 1;
      }
      ')' | ']' | '}' => {
        depth = depth.saturating_sub(1);
        current.push(c);
        i += 1;
      }
      _ => {
        current.push(c);
        i += 1;
      }
    }
  }

  if depth > 0 {
    return Err(syntax_error(start_line, "unexpected EOF while parsing"));
  }
  flush(&mut current, indent, start_line);
  Ok(lines)
}

// ── Blocks ───────────────────────────────────────────────────────────

enum Header {
  If(Expr),
  Elif(Expr),
  Else,
  While(Expr),
  For(Target, Expr),
  Def(String, Vec<Param>),
  Try,
  Except(Option<Expr>, Option<String>),
  Finally,
}

enum ParsedLine {
  Simple(Vec<Stmt>),
  Clause(Header, Option<Vec<Stmt>>),
}

/// Parse a whole snippet or module source into statements.
pub fn parse_program(source: &str) -> Result<Vec<Stmt>, InterpreterError> {
  let lines = logical_lines(source)?;
  if let Some(first) = lines.first() {
    if first.indent > 0 {
      return Err(syntax_error(first.number, "unexpected indent"));
    }
  }
  let mut cursor = 0;
  let body = parse_block(&lines, &mut cursor, 0)?;
  if let Some(line) = lines.get(cursor) {
    return Err(syntax_error(line.number, "unexpected indent"));
  }
  Ok(body)
}

/// Parse a single expression (used for f-string fields).
pub fn parse_expression(
  text: &str,
  line: usize,
) -> Result<Expr, InterpreterError> {
  let mut pairs = SnippetParser::parse(Rule::StandaloneExpr, text.trim())
    .map_err(|err| {
      tracing::debug!(%err, "expression parse failed");
      syntax_error(line, "f-string: invalid syntax")
    })?;
  let standalone = pairs
    .next()
    .ok_or_else(|| syntax_error(line, "f-string: empty expression"))?;
  let expr = children(standalone)
    .next()
    .ok_or_else(|| syntax_error(line, "f-string: empty expression"))?;
  LineBuilder { line }.expr(expr)
}

fn parse_block(
  lines: &[SourceLine],
  cursor: &mut usize,
  indent: usize,
) -> Result<Vec<Stmt>, InterpreterError> {
  let mut body = Vec::new();
  while let Some(line) = lines.get(*cursor) {
    if line.indent < indent {
      break;
    }
    if line.indent > indent {
      return Err(syntax_error(line.number, "unexpected indent"));
    }
    *cursor += 1;
    match parse_line(line)? {
      ParsedLine::Simple(stmts) => body.extend(stmts),
      ParsedLine::Clause(header, inline) => {
        let stmt = match header {
          Header::If(condition) => {
            let first = clause_body(lines, cursor, line, inline)?;
            let mut branches = vec![(condition, first)];
            let mut orelse = Vec::new();
            while let Some((next, header, inline)) =
              continuation(lines, *cursor, indent)?
            {
              match header {
                Header::Elif(condition) => {
                  *cursor += 1;
                  let branch = clause_body(lines, cursor, next, inline)?;
                  branches.push((condition, branch));
                }
                Header::Else => {
                  *cursor += 1;
                  orelse = clause_body(lines, cursor, next, inline)?;
                  break;
                }
                _ => break,
              }
            }
            Stmt::If { branches, orelse }
          }
          Header::While(condition) => Stmt::While {
            condition,
            body: clause_body(lines, cursor, line, inline)?,
          },
          Header::For(target, iter) => Stmt::For {
            target,
            iter,
            body: clause_body(lines, cursor, line, inline)?,
          },
          Header::Def(name, params) => {
            let body = clause_body(lines, cursor, line, inline)?;
            Stmt::FunctionDef(Rc::new(FunctionDef { name, params, body }))
          }
          Header::Try => parse_try(lines, cursor, line, inline, indent)?,
          Header::Elif(_) | Header::Else | Header::Except(..) | Header::Finally => {
            return Err(syntax_error(line.number, "invalid syntax"));
          }
        };
        body.push(stmt);
      }
    }
  }
  Ok(body)
}

fn parse_try(
  lines: &[SourceLine],
  cursor: &mut usize,
  line: &SourceLine,
  inline: Option<Vec<Stmt>>,
  indent: usize,
) -> Result<Stmt, InterpreterError> {
  let body = clause_body(lines, cursor, line, inline)?;
  let mut handlers = Vec::new();
  let mut orelse = Vec::new();
  let mut finally = Vec::new();
  while let Some((next, header, inline)) = continuation(lines, *cursor, indent)?
  {
    match header {
      Header::Except(kind, name) if orelse.is_empty() && finally.is_empty() => {
        *cursor += 1;
        let body = clause_body(lines, cursor, next, inline)?;
        handlers.push(ExceptHandler { kind, name, body });
      }
      Header::Else if !handlers.is_empty() && finally.is_empty() => {
        *cursor += 1;
        orelse = clause_body(lines, cursor, next, inline)?;
      }
      Header::Finally => {
        *cursor += 1;
        finally = clause_body(lines, cursor, next, inline)?;
        break;
      }
      _ => break,
    }
  }
  if handlers.is_empty() && finally.is_empty() {
    return Err(syntax_error(line.number, "expected 'except' or 'finally' block"));
  }
  Ok(Stmt::Try {
    body,
    handlers,
    orelse,
    finally,
  })
}

/// Peek at the next line of the same block and return it if it continues
/// a compound statement (`elif`, `else`, `except`, `finally`).
fn continuation<'a>(
  lines: &'a [SourceLine],
  cursor: usize,
  indent: usize,
) -> Result<Option<(&'a SourceLine, Header, Option<Vec<Stmt>>)>, InterpreterError>
{
  let Some(line) = lines.get(cursor) else {
    return Ok(None);
  };
  if line.indent != indent {
    return Ok(None);
  }
  match parse_line(line)? {
    ParsedLine::Clause(
      header @ (Header::Elif(_)
      | Header::Else
      | Header::Except(..)
      | Header::Finally),
      inline,
    ) => Ok(Some((line, header, inline))),
    _ => Ok(None),
  }
}

fn clause_body(
  lines: &[SourceLine],
  cursor: &mut usize,
  header_line: &SourceLine,
  inline: Option<Vec<Stmt>>,
) -> Result<Vec<Stmt>, InterpreterError> {
  if let Some(body) = inline {
    return Ok(body);
  }
  match lines.get(*cursor) {
    Some(next) if next.indent > header_line.indent => {
      parse_block(lines, cursor, next.indent)
    }
    _ => Err(syntax_error(
      header_line.number,
      "expected an indented block",
    )),
  }
}

fn parse_line(line: &SourceLine) -> Result<ParsedLine, InterpreterError> {
  let mut pairs =
    SnippetParser::parse(Rule::Line, &line.text).map_err(|err| {
      tracing::debug!(line = line.number, %err, "line parse failed");
      syntax_error(line.number, "invalid syntax")
    })?;
  let builder = LineBuilder { line: line.number };
  let root = pairs
    .next()
    .and_then(|p| children(p).next())
    .ok_or_else(|| syntax_error(line.number, "invalid syntax"))?;
  match root.as_rule() {
    Rule::SimpleLine => Ok(ParsedLine::Simple(builder.simple_line(root)?)),
    Rule::CompoundLine => {
      let mut inner = children(root);
      let header_pair = inner
        .next()
        .ok_or_else(|| syntax_error(line.number, "invalid syntax"))?;
      let header = builder.header(header_pair)?;
      let inline = match inner.next() {
        Some(simple) => Some(builder.simple_line(simple)?),
        None => None,
      };
      Ok(ParsedLine::Clause(header, inline))
    }
    _ => Err(syntax_error(line.number, "invalid syntax")),
  }
}

// ── Pair → AST ───────────────────────────────────────────────────────

fn is_structural(rule: Rule) -> bool {
  matches!(
    rule,
    Rule::EOI
      | Rule::kw_and
      | Rule::kw_as
      | Rule::kw_assert
      | Rule::kw_break
      | Rule::kw_continue
      | Rule::kw_def
      | Rule::kw_del
      | Rule::kw_elif
      | Rule::kw_else
      | Rule::kw_except
      | Rule::kw_finally
      | Rule::kw_for
      | Rule::kw_from
      | Rule::kw_global
      | Rule::kw_if
      | Rule::kw_import
      | Rule::kw_in
      | Rule::kw_is
      | Rule::kw_not
      | Rule::kw_or
      | Rule::kw_pass
      | Rule::kw_raise
      | Rule::kw_return
      | Rule::kw_try
      | Rule::kw_while
  )
}

fn children(pair: Pair<'_, Rule>) -> impl Iterator<Item = Pair<'_, Rule>> {
  pair.into_inner().filter(|p| !is_structural(p.as_rule()))
}

struct LineBuilder {
  line: usize,
}

impl LineBuilder {
  fn error(&self, message: impl Into<String>) -> InterpreterError {
    syntax_error(self.line, message)
  }

  fn next<'a>(
    &self,
    iter: &mut impl Iterator<Item = Pair<'a, Rule>>,
  ) -> Result<Pair<'a, Rule>, InterpreterError> {
    iter.next().ok_or_else(|| self.error("invalid syntax"))
  }

  fn header(&self, pair: Pair<Rule>) -> Result<Header, InterpreterError> {
    let rule = pair.as_rule();
    let mut inner = children(pair);
    Ok(match rule {
      Rule::if_header => Header::If(self.expr(self.next(&mut inner)?)?),
      Rule::elif_header => Header::Elif(self.expr(self.next(&mut inner)?)?),
      Rule::else_header => Header::Else,
      Rule::while_header => Header::While(self.expr(self.next(&mut inner)?)?),
      Rule::for_header => {
        let target = self.target_list(self.next(&mut inner)?)?;
        let iter = self.expr_list(self.next(&mut inner)?)?;
        Header::For(target, iter)
      }
      Rule::def_header => {
        let name = self.next(&mut inner)?.as_str().to_string();
        let mut params = Vec::new();
        for param in inner {
          let mut parts = children(param);
          let name = self.next(&mut parts)?.as_str().to_string();
          let default = match parts.next() {
            Some(expr) => Some(self.expr(expr)?),
            None => None,
          };
          if default.is_none() && params.iter().any(|p: &Param| p.default.is_some())
          {
            return Err(
              self.error("non-default argument follows default argument"),
            );
          }
          params.push(Param { name, default });
        }
        Header::Def(name, params)
      }
      Rule::try_header => Header::Try,
      Rule::except_header => {
        let kind = match inner.next() {
          Some(expr) => Some(self.expr(expr)?),
          None => None,
        };
        let name = inner.next().map(|p| p.as_str().to_string());
        Header::Except(kind, name)
      }
      Rule::finally_header => Header::Finally,
      _ => return Err(self.error("invalid syntax")),
    })
  }

  fn simple_line(&self, pair: Pair<Rule>) -> Result<Vec<Stmt>, InterpreterError> {
    children(pair).map(|stmt| self.stmt(stmt)).collect()
  }

  fn stmt(&self, pair: Pair<Rule>) -> Result<Stmt, InterpreterError> {
    let rule = pair.as_rule();
    let mut inner = children(pair);
    Ok(match rule {
      Rule::pass_stmt => Stmt::Pass,
      Rule::break_stmt => Stmt::Break,
      Rule::continue_stmt => Stmt::Continue,
      Rule::return_stmt => match inner.next() {
        Some(value) => Stmt::Return(Some(self.expr_list(value)?)),
        None => Stmt::Return(None),
      },
      Rule::raise_stmt => match inner.next() {
        Some(value) => Stmt::Raise(Some(self.expr(value)?)),
        None => Stmt::Raise(None),
      },
      Rule::global_stmt => {
        Stmt::Global(inner.map(|p| p.as_str().to_string()).collect())
      }
      Rule::del_stmt => match self.target_list(self.next(&mut inner)?)? {
        Target::Tuple(targets) => Stmt::Delete(targets),
        target => Stmt::Delete(vec![target]),
      },
      Rule::assert_stmt => {
        let test = self.expr(self.next(&mut inner)?)?;
        let message = match inner.next() {
          Some(message) => Some(self.expr(message)?),
          None => None,
        };
        Stmt::Assert { test, message }
      }
      Rule::import_stmt => {
        let mut names = Vec::new();
        for alias in inner {
          let mut parts = children(alias);
          let module = self.next(&mut parts)?.as_str().to_string();
          let alias = parts.next().map(|p| p.as_str().to_string());
          names.push(ImportName { module, alias });
        }
        Stmt::Import(names)
      }
      Rule::from_import_stmt => {
        let module = self.next(&mut inner)?.as_str().to_string();
        let list = self.next(&mut inner)?;
        let mut names = Vec::new();
        if list.as_rule() == Rule::import_star {
          names.push(("*".to_string(), None));
        }
        for alias in children(list) {
          let mut parts = children(alias);
          let name = self.next(&mut parts)?.as_str().to_string();
          let alias = parts.next().map(|p| p.as_str().to_string());
          names.push((name, alias));
        }
        Stmt::ImportFrom { module, names }
      }
      Rule::aug_assign_stmt => {
        let target = self.target_list(self.next(&mut inner)?)?;
        if matches!(target, Target::Tuple(_)) {
          return Err(self.error(
            "'tuple' is an illegal expression for augmented assignment",
          ));
        }
        let op = match self.next(&mut inner)?.as_str() {
          "+=" => BinaryOperator::Add,
          "-=" => BinaryOperator::Sub,
          "*=" => BinaryOperator::Mul,
          "/=" => BinaryOperator::Div,
          "//=" => BinaryOperator::FloorDiv,
          "%=" => BinaryOperator::Mod,
          _ => BinaryOperator::Pow,
        };
        let value = self.expr_list(self.next(&mut inner)?)?;
        Stmt::AugAssign { target, op, value }
      }
      Rule::assign_stmt => {
        let mut parts = inner
          .map(|p| self.expr_list(p))
          .collect::<Result<Vec<_>, _>>()?;
        let value = parts.pop().ok_or_else(|| self.error("invalid syntax"))?;
        let targets = parts
          .into_iter()
          .map(|expr| self.to_target(expr))
          .collect::<Result<Vec<_>, _>>()?;
        Stmt::Assign { targets, value }
      }
      Rule::expr_stmt => Stmt::Expr(self.expr_list(self.next(&mut inner)?)?),
      _ => return Err(self.error("invalid syntax")),
    })
  }

  fn to_target(&self, expr: Expr) -> Result<Target, InterpreterError> {
    match expr {
      Expr::Name(name) => Ok(Target::Name(name)),
      Expr::Attribute { value, name } => Ok(Target::Attribute {
        value: *value,
        name,
      }),
      Expr::Subscript { value, index } => Ok(Target::Subscript {
        value: *value,
        index: *index,
      }),
      Expr::Tuple(items) | Expr::List(items) => Ok(Target::Tuple(
        items
          .into_iter()
          .map(|item| self.to_target(item))
          .collect::<Result<Vec<_>, _>>()?,
      )),
      Expr::Call { .. } => Err(self.error("cannot assign to function call")),
      _ => Err(self.error("cannot assign to literal")),
    }
  }

  fn target_list(&self, pair: Pair<Rule>) -> Result<Target, InterpreterError> {
    let mut targets = Vec::new();
    let mut trailing = false;
    for part in children(pair) {
      match part.as_rule() {
        Rule::trailing_comma => trailing = true,
        Rule::target_group => {
          let list = self.next(&mut children(part))?;
          targets.push(self.target_list(list)?);
        }
        _ => targets.push(self.to_target(self.expr(part)?)?),
      }
    }
    if targets.len() == 1 && !trailing {
      targets.pop().ok_or_else(|| self.error("invalid syntax"))
    } else {
      Ok(Target::Tuple(targets))
    }
  }

  fn expr_list(&self, pair: Pair<Rule>) -> Result<Expr, InterpreterError> {
    let mut items = Vec::new();
    let mut trailing = false;
    for part in children(pair) {
      if part.as_rule() == Rule::trailing_comma {
        trailing = true;
      } else {
        items.push(self.expr(part)?);
      }
    }
    if items.len() == 1 && !trailing {
      items.pop().ok_or_else(|| self.error("invalid syntax"))
    } else {
      Ok(Expr::Tuple(items))
    }
  }

  fn fold_binary(
    &self,
    pair: Pair<Rule>,
    combine: impl Fn(&str, Expr, Expr) -> Expr,
  ) -> Result<Expr, InterpreterError> {
    let mut inner = children(pair);
    let mut acc = self.expr(self.next(&mut inner)?)?;
    while let Some(op) = inner.next() {
      let rhs = self.expr(self.next(&mut inner)?)?;
      acc = combine(op.as_str(), acc, rhs);
    }
    Ok(acc)
  }

  pub(crate) fn expr(&self, pair: Pair<Rule>) -> Result<Expr, InterpreterError> {
    match pair.as_rule() {
      Rule::expr => {
        let mut inner = children(pair);
        let value = self.expr(self.next(&mut inner)?)?;
        match inner.next() {
          Some(condition) => {
            let condition = self.expr(condition)?;
            let otherwise = self.expr(self.next(&mut inner)?)?;
            Ok(Expr::Conditional {
              condition: Box::new(condition),
              then: Box::new(value),
              otherwise: Box::new(otherwise),
            })
          }
          None => Ok(value),
        }
      }
      Rule::or_test | Rule::and_test => {
        let op = if pair.as_rule() == Rule::or_test {
          BoolOperator::Or
        } else {
          BoolOperator::And
        };
        let mut inner = children(pair);
        let mut acc = self.expr(self.next(&mut inner)?)?;
        for rhs in inner {
          acc = Expr::BoolOp {
            op,
            left: Box::new(acc),
            right: Box::new(self.expr(rhs)?),
          };
        }
        Ok(acc)
      }
      Rule::not_expr => Ok(Expr::UnaryOp {
        op: UnaryOperator::Not,
        operand: Box::new(self.expr(self.next(&mut children(pair))?)?),
      }),
      Rule::comparison => {
        let mut inner = children(pair);
        let first = self.expr(self.next(&mut inner)?)?;
        let mut rest = Vec::new();
        while let Some(op) = inner.next() {
          let normalized =
            op.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
          let op = match normalized.as_str() {
            "==" => ComparisonOp::Eq,
            "!=" => ComparisonOp::NotEq,
            "<" => ComparisonOp::Lt,
            "<=" => ComparisonOp::LtE,
            ">" => ComparisonOp::Gt,
            ">=" => ComparisonOp::GtE,
            "in" => ComparisonOp::In,
            "not in" => ComparisonOp::NotIn,
            "is" => ComparisonOp::Is,
            _ => ComparisonOp::IsNot,
          };
          rest.push((op, self.expr(self.next(&mut inner)?)?));
        }
        if rest.is_empty() {
          Ok(first)
        } else {
          Ok(Expr::Compare {
            first: Box::new(first),
            rest,
          })
        }
      }
      Rule::arith | Rule::term => self.fold_binary(pair, |op, left, right| {
        let op = match op {
          "+" => BinaryOperator::Add,
          "-" => BinaryOperator::Sub,
          "*" => BinaryOperator::Mul,
          "/" => BinaryOperator::Div,
          "//" => BinaryOperator::FloorDiv,
          _ => BinaryOperator::Mod,
        };
        Expr::BinaryOp {
          op,
          left: Box::new(left),
          right: Box::new(right),
        }
      }),
      Rule::unary => {
        let mut inner = children(pair);
        let op = match self.next(&mut inner)?.as_str() {
          "-" => UnaryOperator::Neg,
          _ => UnaryOperator::Pos,
        };
        let operand = self.expr(self.next(&mut inner)?)?;
        match (op, operand) {
          (UnaryOperator::Neg, Expr::Int(n)) => Ok(Expr::Int(-n)),
          (UnaryOperator::Neg, Expr::Float(f)) => Ok(Expr::Float(-f)),
          (op, operand) => Ok(Expr::UnaryOp {
            op,
            operand: Box::new(operand),
          }),
        }
      }
      Rule::power => {
        let mut inner = children(pair);
        let base = self.expr(self.next(&mut inner)?)?;
        match inner.next() {
          Some(exponent) => Ok(Expr::BinaryOp {
            op: BinaryOperator::Pow,
            left: Box::new(base),
            right: Box::new(self.expr(exponent)?),
          }),
          None => Ok(base),
        }
      }
      Rule::postfix => {
        let mut inner = children(pair);
        let mut acc = self.expr(self.next(&mut inner)?)?;
        for trailer in inner {
          acc = match trailer.as_rule() {
            Rule::call => Expr::Call {
              func: Box::new(acc),
              args: self.arguments(trailer)?,
            },
            Rule::attribute_ref => Expr::Attribute {
              value: Box::new(acc),
              name: self.next(&mut children(trailer))?.as_str().to_string(),
            },
            _ => Expr::Subscript {
              value: Box::new(acc),
              index: Box::new(self.index(trailer)?),
            },
          };
        }
        Ok(acc)
      }
      Rule::empty_tuple => Ok(Expr::Tuple(Vec::new())),
      Rule::paren => self.expr_list(self.next(&mut children(pair))?),
      Rule::list_display => match children(pair).next() {
        None => Ok(Expr::List(Vec::new())),
        Some(inner) if inner.as_rule() == Rule::list_comp => {
          let mut parts = children(inner);
          let element = self.expr(self.next(&mut parts)?)?;
          let target = self.target_list(self.next(&mut parts)?)?;
          let iter = self.expr(self.next(&mut children(self.next(&mut parts)?))?)?;
          let condition = match parts.next() {
            Some(filter) => {
              Some(Box::new(self.expr(self.next(&mut children(filter))?)?))
            }
            None => None,
          };
          Ok(Expr::ListComp {
            element: Box::new(element),
            target: Box::new(target),
            iter: Box::new(iter),
            condition,
          })
        }
        Some(inner) => match self.expr_list(inner)? {
          Expr::Tuple(items) => Ok(Expr::List(items)),
          single => Ok(Expr::List(vec![single])),
        },
      },
      Rule::dict_display => {
        let mut items = Vec::new();
        for item in children(pair) {
          let mut parts = children(item);
          let key = self.expr(self.next(&mut parts)?)?;
          let value = self.expr(self.next(&mut parts)?)?;
          items.push((key, value));
        }
        Ok(Expr::Dict(items))
      }
      Rule::integer => {
        let digits = pair.as_str().replace('_', "");
        digits
          .parse::<i64>()
          .map(Expr::Int)
          .map_err(|_| self.error("integer literal too large"))
      }
      Rule::float => pair
        .as_str()
        .replace('_', "")
        .parse::<f64>()
        .map(Expr::Float)
        .map_err(|_| self.error("invalid float literal")),
      Rule::strings => self.strings(pair),
      Rule::true_lit => Ok(Expr::Bool(true)),
      Rule::false_lit => Ok(Expr::Bool(false)),
      Rule::none_lit => Ok(Expr::None),
      Rule::identifier => Ok(Expr::Name(pair.as_str().to_string())),
      _ => Err(self.error("invalid syntax")),
    }
  }

  fn arguments(&self, pair: Pair<Rule>) -> Result<Vec<Argument>, InterpreterError> {
    let mut args = Vec::new();
    for arg in children(pair) {
      if arg.as_rule() == Rule::keyword_arg {
        let mut parts = children(arg);
        let name = self.next(&mut parts)?.as_str().to_string();
        let value = self.expr(self.next(&mut parts)?)?;
        args.push(Argument::Keyword(name, value));
      } else {
        if args.iter().any(|a| matches!(a, Argument::Keyword(..))) {
          return Err(
            self.error("positional argument follows keyword argument"),
          );
        }
        args.push(Argument::Positional(self.expr(arg)?));
      }
    }
    Ok(args)
  }

  fn index(&self, pair: Pair<Rule>) -> Result<Index, InterpreterError> {
    let inner = self.next(&mut children(pair))?;
    if inner.as_rule() != Rule::slice {
      return Ok(Index::Single(self.expr_list(inner)?));
    }
    let (mut lower, mut upper, mut step) = (None, None, None);
    for part in children(inner) {
      let value = Some(self.expr(self.next(&mut children(part.clone()))?)?);
      match part.as_rule() {
        Rule::slice_lower => lower = value,
        Rule::slice_upper => upper = value,
        _ => step = value,
      }
    }
    Ok(Index::Slice { lower, upper, step })
  }

  fn strings(&self, pair: Pair<Rule>) -> Result<Expr, InterpreterError> {
    let mut parts: Vec<FStringPart> = Vec::new();
    let mut formatted = false;
    for literal in children(pair) {
      let mut prefix = String::new();
      let mut body = "";
      for part in literal.into_inner() {
        match part.as_rule() {
          Rule::string_prefix => prefix = part.as_str().to_ascii_lowercase(),
          _ => body = part.as_str(),
        }
      }
      let quote_len = if body.starts_with("\"\"\"") || body.starts_with("'''")
      {
        3
      } else {
        1
      };
      let content = &body[quote_len..body.len() - quote_len];
      let raw = prefix.contains('r');
      if prefix.contains('f') {
        formatted = true;
        parts.extend(self.fstring(content, raw)?);
      } else {
        let text = if raw {
          content.to_string()
        } else {
          unescape(content)
        };
        parts.push(FStringPart::Literal(text));
      }
    }
    if !formatted {
      let text = parts
        .into_iter()
        .map(|part| match part {
          FStringPart::Literal(text) => text,
          FStringPart::Field { .. } => String::new(),
        })
        .collect();
      return Ok(Expr::Str(text));
    }
    Ok(Expr::FString(parts))
  }

  fn fstring(
    &self,
    content: &str,
    raw: bool,
  ) -> Result<Vec<FStringPart>, InterpreterError> {
    let chars: Vec<char> = content.chars().collect();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut i = 0;
    let push_literal = |literal: &mut String, parts: &mut Vec<FStringPart>| {
      if !literal.is_empty() {
        let text = if raw {
          literal.clone()
        } else {
          unescape(literal)
        };
        parts.push(FStringPart::Literal(text));
        literal.clear();
      }
    };
    while i < chars.len() {
      let c = chars[i];
      if c == '{' && chars.get(i + 1) == Some(&'{') {
        literal.push('{');
        i += 2;
      } else if c == '}' && chars.get(i + 1) == Some(&'}') {
        literal.push('}');
        i += 2;
      } else if c == '}' {
        return Err(self.error("f-string: single '}' is not allowed"));
      } else if c == '{' {
        push_literal(&mut literal, &mut parts);
        let start = i + 1;
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut end = None;
        let mut conversion_at = None;
        let mut spec_at = None;
        let mut j = start;
        while j < chars.len() {
          let ch = chars[j];
          if let Some(q) = quote {
            if ch == q {
              quote = None;
            }
          } else {
            match ch {
              '\'' | '"' => quote = Some(ch),
              '(' | '[' | '{' => depth += 1,
              ')' | ']' => depth = depth.saturating_sub(1),
              '}' if depth > 0 => depth -= 1,
              '}' => {
                end = Some(j);
                break;
              }
              '!' if depth == 0
                && spec_at.is_none()
                && chars.get(j + 1) != Some(&'=') =>
              {
                conversion_at = Some(j);
              }
              ':' if depth == 0 && spec_at.is_none() => spec_at = Some(j),
              _ => {}
            }
          }
          j += 1;
        }
        let end = end.ok_or_else(|| self.error("f-string: expecting '}'"))?;
        let expr_end = conversion_at.or(spec_at).unwrap_or(end);
        let expr_text: String = chars[start..expr_end].iter().collect();
        if expr_text.trim().is_empty() {
          return Err(self.error("f-string: empty expression not allowed"));
        }
        let conversion = match conversion_at {
          Some(at) => match chars.get(at + 1) {
            Some(c @ ('r' | 's')) => Some(*c),
            _ => {
              return Err(self.error("f-string: invalid conversion character"));
            }
          },
          None => None,
        };
        let spec = spec_at.map(|at| chars[at + 1..end].iter().collect());
        parts.push(FStringPart::Field {
          expr: Box::new(parse_expression(&expr_text, self.line)?),
          conversion,
          spec,
        });
        i = end + 1;
      } else {
        literal.push(c);
        i += 1;
      }
    }
    push_literal(&mut literal, &mut parts);
    Ok(parts)
  }
}

/// Decode backslash escapes in a (non-raw) string literal body.
pub fn unescape(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  let mut chars = text.chars().peekable();
  while let Some(c) = chars.next() {
    if c != '\\' {
      out.push(c);
      continue;
    }
    match chars.next() {
      Some('n') => out.push('\n'),
      Some('t') => out.push('\t'),
      Some('r') => out.push('\r'),
      Some('0') => out.push('\0'),
      Some('\\') => out.push('\\'),
      Some('\'') => out.push('\''),
      Some('"') => out.push('"'),
      Some('\n') => {}
      Some(kind @ ('x' | 'u')) => {
        let width = if kind == 'x' { 2 } else { 4 };
        let digits: String = (0..width).filter_map(|_| chars.next()).collect();
        match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
          Some(decoded) if digits.len() == width => out.push(decoded),
          _ => {
            out.push('\\');
            out.push(kind);
            out.push_str(&digits);
          }
        }
      }
      Some(other) => {
        out.push('\\');
        out.push(other);
      }
      None => out.push('\\'),
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn joins_bracketed_lines_and_strips_comments() {
    let lines = logical_lines("x = [1,\n  2]  # two\n\nprint(x)\n").unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].text, "x = [1,   2]");
    assert_eq!(lines[1].number, 4);
  }

  #[test]
  fn hash_inside_string_is_not_a_comment() {
    let lines = logical_lines("s = '# not a comment'").unwrap();
    assert_eq!(lines[0].text, "s = '# not a comment'");
  }

  #[test]
  fn records_indentation() {
    let lines = logical_lines("if x:\n    y = 1\n\ty = 2\n").unwrap();
    assert_eq!(
      lines.iter().map(|l| l.indent).collect::<Vec<_>>(),
      vec![0, 4, 8]
    );
  }

  #[test]
  fn unterminated_string_is_a_syntax_error() {
    assert!(matches!(
      logical_lines("print('oops)"),
      Err(InterpreterError::SyntaxError { line: 1, .. })
    ));
  }

  #[test]
  fn unescape_handles_common_escapes() {
    assert_eq!(unescape(r"a\tb\n\x41\u00e9\q"), "a\tb\nAé\\q");
  }

  #[test]
  fn builds_if_elif_else_chain() {
    let program =
      parse_program("if a:\n  x = 1\nelif b:\n  x = 2\nelse:\n  x = 3\n")
        .unwrap();
    match &program[..] {
      [Stmt::If { branches, orelse }] => {
        assert_eq!(branches.len(), 2);
        assert_eq!(orelse.len(), 1);
      }
      other => panic!("unexpected program: {other:?}"),
    }
  }

  #[test]
  fn semicolons_separate_statements() {
    let program = parse_program("a = 1; b = 2; print(a + b)").unwrap();
    assert_eq!(program.len(), 3);
  }

  #[test]
  fn missing_block_is_reported() {
    assert!(matches!(
      parse_program("for i in range(3):\nprint(i)"),
      Err(InterpreterError::SyntaxError { line: 1, .. })
    ));
  }

  #[test]
  fn fstring_fields_are_parsed() {
    match parse_expression("f'{x:.2f} and {y!r}'", 1).unwrap() {
      Expr::FString(parts) => assert_eq!(parts.len(), 3),
      other => panic!("expected f-string, got {other:?}"),
    }
  }
}
