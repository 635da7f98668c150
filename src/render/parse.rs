//! Recursive-descent parser for generated component source

use super::CompileError;

/// Byte offset into the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos
{   pub offset: usize
}

impl Pos
{   /// 1-based line and column
    pub fn locate(&self, src: &str) -> (usize, usize)
    {   let before = &src[..self.offset.min(src.len())];
        let line = before.matches('\n').count() + 1;
        let column = before.rsplit('\n')
          .next()
          .map(|l| l.chars().count() + 1)
          .unwrap_or(1);
        (line, column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr
{   Str(String)
  , Num(f64)
  , Bool(bool)
  , Null
  , Ident
    {   name: String
      , pos: Pos
    }
  , Call
    {   callee: String
      , args: Vec<Expr>
      , pos: Pos
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern
{   Name(String)
  , Array(Vec<String>)
}

impl Pattern
{   pub fn names(&self) -> Vec<&str>
    {   match self
        {   Pattern::Name(n) => vec![n.as_str()]
          , Pattern::Array(ns) => ns.iter().map(String::as_str).collect()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement
{   Bind
    {   pattern: Pattern
      , value: Expr
      , pos: Pos
    }
  , Call(Expr)
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue
{   Str(String)
  , Expr(Expr)
  , Flag
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attr
{   pub name: String
  , pub value: AttrValue
}

#[derive(Debug, Clone, PartialEq)]
pub enum Child
{   Element(Element)
  , Text(String)
  , Expr(Expr)
}

/// `name` is `None` for a `<>...</>` fragment
#[derive(Debug, Clone, PartialEq)]
pub struct Element
{   pub name: Option<String>
  , pub attrs: Vec<Attr>
  , pub children: Vec<Child>
  , pub pos: Pos
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program
{   pub statements: Vec<Statement>
  , pub root: Element
}

pub fn parse(src: &str, max_depth: usize) -> Result<Program, CompileError>
{   Parser { src, pos: 0, depth: 0, max_depth }.program()
}

struct Parser<'a>
{   src: &'a str
  , pos: usize
  , depth: usize
  , max_depth: usize
}

fn is_ident_start(c: char) -> bool
{   c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool
{   c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

impl<'a> Parser<'a>
{   fn rest(&self) -> &'a str
    {   &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char>
    {   self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char>
    {   self.rest().chars().nth(n)
    }

    fn at(&self, s: &str) -> bool
    {   self.rest().starts_with(s)
    }

    fn bump(&mut self) -> Option<char>
    {   let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eof(&self) -> bool
    {   self.pos >= self.src.len()
    }

    fn position(&self) -> Pos
    {   Pos { offset: self.pos }
    }

    fn error(&self, message: impl Into<String>) -> CompileError
    {   let (line, column) = self.position().locate(self.src);
        CompileError::syntax(line, column, message)
    }

    fn unexpected(&self, wanted: &str) -> CompileError
    {   match self.peek()
        {   Some(c) => self.error(format!("expected {}, found '{}'", wanted, c))
          , None => self.error(format!("expected {}, found end of input", wanted))
        }
    }

    fn skip_ws(&mut self)
    {   while self.peek().map_or(false, char::is_whitespace)
        {   self.bump();
        }
    }

    /// Whitespace and comments
    fn skip_trivia(&mut self) -> Result<(), CompileError>
    {   loop
        {   self.skip_ws();
            if self.at("//")
            {   match self.rest().find('\n')
                {   Some(n) => self.pos += n
                  , None => self.pos = self.src.len()
                }
            } else if self.at("/*")
            {   match self.rest()[2..].find("*/")
                {   Some(n) => self.pos += n + 4
                  , None => return Err(self.error("unterminated comment"))
                }
            } else
            {   return Ok(());
            }
        }
    }

    fn expect(&mut self, s: &str) -> Result<(), CompileError>
    {   if self.at(s)
        {   self.pos += s.len();
            Ok(())
        } else
        {   Err(self.unexpected(&format!("'{}'", s)))
        }
    }

    fn eat(&mut self, s: &str) -> bool
    {   if self.at(s)
        {   self.pos += s.len();
            true
        } else
        {   false
        }
    }

    fn keyword(&mut self, kw: &str) -> bool
    {   if !self.at(kw)
        {   return false;
        }
        let next = self.rest()[kw.len()..].chars().next();
        if next.map_or(false, is_ident_char)
        {   return false;
        }
        self.pos += kw.len();
        true
    }

    fn ident(&mut self) -> Result<String, CompileError>
    {   match self.peek()
        {   Some(c) if is_ident_start(c) => {}
          , _ => return Err(self.unexpected("an identifier"))
        }
        let start = self.pos;
        while self.peek().map_or(false, is_ident_char)
        {   self.bump();
        }
        Ok(self.src[start..self.pos].to_string())
    }

    /// Attribute names may contain dashes (`aria-label`)
    fn attr_name(&mut self) -> Result<String, CompileError>
    {   let mut name = self.ident()?;
        while self.peek() == Some('-')
          && self.peek_nth(1).map_or(false, is_ident_char)
        {   self.bump();
            name.push('-');
            while self.peek().map_or(false, is_ident_char)
            {   name.push(self.bump().unwrap_or_default());
            }
        }
        Ok(name)
    }

    fn program(mut self) -> Result<Program, CompileError>
    {   self.skip_trivia()?;
        if self.keyword("export")
        {   self.skip_trivia()?;
            self.keyword("default");
            self.skip_trivia()?;
        }
        let program = if self.keyword("function")
        {   self.skip_trivia()?;
            let name = self.ident()?;
            self.skip_trivia()?;
            self.expect("(")?;
            self.skip_trivia()?;
            self.expect(")")?;
            self.skip_trivia()?;
            self.expect("{")?;
            let body = self.body()?;
            self.skip_trivia()?;
            self.expect("}")?;
            self.skip_trivia()?;
            if self.keyword("return") || self.keyword("export")
            {   self.skip_trivia()?;
                self.keyword("default");
                self.skip_trivia()?;
                let exported = self.ident()?;
                if exported != name
                {   return Err(self.error(format!(
                      "'{}' is not defined", exported
                    )));
                }
                self.skip_trivia()?;
                self.eat(";");
            }
            body
        } else
        {   self.body()?
        };
        self.skip_trivia()?;
        if !self.eof()
        {   return Err(self.unexpected("end of input"));
        }
        Ok(program)
    }

    /// Statements up to and including the returned element
    fn body(&mut self) -> Result<Program, CompileError>
    {   let mut statements = Vec::new();
        loop
        {   self.skip_trivia()?;
            let pos = self.position();
            if self.keyword("const") || self.keyword("let") || self.keyword("var")
            {   self.skip_trivia()?;
                let pattern = self.pattern()?;
                self.skip_trivia()?;
                self.expect("=")?;
                let value = self.expr()?;
                self.skip_trivia()?;
                self.eat(";");
                statements.push(Statement::Bind { pattern, value, pos });
            } else if self.keyword("return")
            {   self.skip_trivia()?;
                let root = if self.eat("(")
                {   self.skip_trivia()?;
                    let root = self.element()?;
                    self.skip_trivia()?;
                    self.expect(")")?;
                    root
                } else
                {   self.element()?
                };
                self.skip_trivia()?;
                self.eat(";");
                return Ok(Program { statements, root });
            } else if self.peek() == Some('<')
            {   let root = self.element()?;
                self.skip_trivia()?;
                self.eat(";");
                return Ok(Program { statements, root });
            } else if self.peek().map_or(false, is_ident_start)
            {   let call = self.expr()?;
                if !matches!(call, Expr::Call { .. })
                {   return Err(self.error("expected a statement"));
                }
                self.skip_trivia()?;
                self.eat(";");
                statements.push(Statement::Call(call));
            } else
            {   return Err(self.unexpected("a statement or element"));
            }
        }
    }

    fn pattern(&mut self) -> Result<Pattern, CompileError>
    {   if !self.eat("[")
        {   return Ok(Pattern::Name(self.ident()?));
        }
        let mut names = Vec::new();
        loop
        {   self.skip_trivia()?;
            names.push(self.ident()?);
            self.skip_trivia()?;
            if self.eat("]")
            {   return Ok(Pattern::Array(names));
            }
            self.expect(",")?;
        }
    }

    /// Elements and expressions share one nesting budget
    fn enter(&mut self) -> Result<(), CompileError>
    {   self.depth += 1;
        if self.depth > self.max_depth
        {   return Err(CompileError::budget(format!(
              "nesting exceeds {} levels", self.max_depth
            )));
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Expr, CompileError>
    {   self.enter()?;
        let expr = self.expr_inner();
        self.depth -= 1;
        expr
    }

    fn expr_inner(&mut self) -> Result<Expr, CompileError>
    {   self.skip_trivia()?;
        let pos = self.position();
        match self.peek()
        {   Some('"') | Some('\'') | Some('`') => Ok(Expr::Str(self.string()?))
          , Some(c) if c.is_ascii_digit() || c == '-' => self.number()
          , Some(c) if is_ident_start(c) => {
              let name = self.ident()?;
              match name.as_str()
              {   "true" => return Ok(Expr::Bool(true))
                , "false" => return Ok(Expr::Bool(false))
                , "null" | "undefined" => return Ok(Expr::Null)
                , _ => {}
              }
              self.skip_trivia()?;
              if !self.eat("(")
              {   return Ok(Expr::Ident { name, pos });
              }
              let mut args = Vec::new();
              self.skip_trivia()?;
              if !self.eat(")")
              {   loop
                  {   args.push(self.expr()?);
                      self.skip_trivia()?;
                      if self.eat(")")
                      {   break;
                      }
                      self.expect(",")?;
                  }
              }
              Ok(Expr::Call { callee: name, args, pos })
            }
          , _ => Err(self.unexpected("an expression"))
        }
    }

    fn string(&mut self) -> Result<String, CompileError>
    {   let quote = self.bump().unwrap_or('"');
        let mut out = String::new();
        loop
        {   match self.bump()
            {   None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('$') if quote == '`' && self.peek() == Some('{') => {
                  return Err(self.error("template interpolation is not supported"));
                }
                Some('\\') => {
                  let escaped = match self.bump()
                  {   Some('n') => '\n'
                    , Some('t') => '\t'
                    , Some('r') => '\r'
                    , Some(c) => c
                    , None => return Err(self.error("unterminated string"))
                  };
                  out.push(escaped);
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn number(&mut self) -> Result<Expr, CompileError>
    {   let start = self.pos;
        self.eat("-");
        while self.peek().map_or(false, |c| c.is_ascii_digit() || c == '.')
        {   self.bump();
        }
        let text = &self.src[start..self.pos];
        text.parse::<f64>()
          .map(Expr::Num)
          .map_err(|_| self.error(format!("invalid number '{}'", text)))
    }

    fn element(&mut self) -> Result<Element, CompileError>
    {   let pos = self.position();
        self.enter()?;
        self.expect("<")?;
        if self.eat(">")
        {   let children = self.children(None)?;
            self.depth -= 1;
            return Ok(Element { name: None, attrs: Vec::new(), children, pos });
        }

        let name = self.ident()?;
        let mut attrs = Vec::new();
        let children = loop
        {   self.skip_trivia()?;
            if self.eat("/>")
            {   break Vec::new();
            }
            if self.eat(">")
            {   break self.children(Some(&name))?;
            }
            let attr = self.attr_name()?;
            self.skip_ws();
            let value = if self.eat("=")
            {   self.skip_ws();
                match self.peek()
                {   Some('"') | Some('\'') => AttrValue::Str(self.string()?)
                  , Some('{') => {
                      self.bump();
                      let expr = self.expr()?;
                      self.skip_trivia()?;
                      self.expect("}")?;
                      AttrValue::Expr(expr)
                    }
                  , _ => return Err(self.unexpected("an attribute value"))
                }
            } else
            {   AttrValue::Flag
            };
            attrs.push(Attr { name: attr, value });
        };
        self.depth -= 1;
        Ok(Element { name: Some(name), attrs, children, pos })
    }

    fn children(&mut self, parent: Option<&str>) -> Result<Vec<Child>, CompileError>
    {   let mut children = Vec::new();
        loop
        {   if self.eof()
            {   return Err(self.error(format!(
                  "unclosed <{}>", parent.unwrap_or("")
                )));
            }
            if self.eat("</")
            {   self.skip_ws();
                let closing = if self.peek() == Some('>')
                {   None
                } else
                {   Some(self.ident()?)
                };
                if closing.as_deref() != parent
                {   return Err(self.error(format!(
                      "expected </{}>, found </{}>",
                      parent.unwrap_or(""),
                      closing.as_deref().unwrap_or("")
                    )));
                }
                self.skip_ws();
                self.expect(">")?;
                return Ok(children);
            }
            match self.peek()
            {   Some('<') => children.push(Child::Element(self.element()?))
              , Some('{') => {
                  self.bump();
                  self.skip_trivia()?;
                  if self.eat("}")
                  {   continue;
                  }
                  let expr = self.expr()?;
                  self.skip_trivia()?;
                  self.expect("}")?;
                  children.push(Child::Expr(expr));
                }
              , _ => {
                  let start = self.pos;
                  while self.peek().map_or(false, |c| c != '<' && c != '{')
                  {   self.bump();
                  }
                  if let Some(text) = normalize_text(&self.src[start..self.pos])
                  {   children.push(Child::Text(text));
                  }
                }
            }
        }
    }
}

/// JSX whitespace: collapse runs, drop edges that cross a line break
fn normalize_text(raw: &str) -> Option<String>
{   let words: Vec<&str> = raw.split_whitespace().collect();
    if words.is_empty()
    {   return None;
    }
    let lead = &raw[..raw.len() - raw.trim_start().len()];
    let trail = &raw[raw.trim_end().len()..];
    let mut text = String::new();
    if !lead.is_empty() && !lead.contains('\n')
    {   text.push(' ');
    }
    text.push_str(&words.join(" "));
    if !trail.is_empty() && !trail.contains('\n')
    {   text.push(' ');
    }
    Some(text)
}
