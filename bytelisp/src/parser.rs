use crate::{Heap, Value};

/// Characters besides alphabetic ones that may start a symbol.
const SYMBOL_SPECIALS: &str = "+-*/=%&_!@?§<>λ°'$";

/// Deepest list or quote nesting the reader and the compiler accept.
pub const MAX_NESTING: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    /// Byte offset into the source.
    pub offset: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.message, self.offset)
    }
}

impl std::error::Error for ParseError {}

/// Result of reading a whole source text.
#[derive(Debug, Default)]
pub struct Parsed {
    /// Every form read before `error`, if any.
    pub forms: Vec<Value>,
    pub error: Option<ParseError>,
}

/// Reads s-expressions from source text into heap data.
pub struct Parser<'src> {
    code: &'src str,
    offset: usize,
    depth: usize,
}

impl<'src> Parser<'src> {
    pub fn new(code: &'src str) -> Self {
        Self {
            code,
            offset: 0,
            depth: 0,
        }
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.offset >= self.code.len()
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.code[self.offset..].chars().next()
    }

    #[inline]
    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        Some(c)
    }

    /// Skip whitespace and `;` comments.
    pub fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else if c == ';' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    /// Read the next top-level form, or `None` at end of input.
    pub fn parse_next(
        &mut self,
        heap: &mut Heap,
    ) -> Option<Result<Value, ParseError>> {
        self.skip_whitespace();
        if self.is_done() {
            return None;
        }
        self.depth = 0;
        Some(self.parse_form(heap))
    }

    fn parse_form(&mut self, heap: &mut Heap) -> Result<Value, ParseError> {
        self.skip_whitespace();
        let start = self.offset;
        match self.peek() {
            None => Err(ParseError::new("unexpected end of input", start)),
            Some('(') => {
                self.bump();
                self.nested(start, |parser| parser.parse_list(heap, start))
            }
            Some(')') => Err(ParseError::new("unexpected ')'", start)),
            Some('\'') => {
                self.bump();
                let quoted =
                    self.nested(start, |parser| parser.parse_form(heap))?;
                let quote = heap.make_symbol("quote");
                Ok(heap.make_list(&[quote, quoted]))
            }
            Some('"') => {
                self.bump();
                self.parse_text(heap, start)
            }
            Some(c) if c.is_ascii_digit() => self.parse_number(heap, start),
            Some(c) if is_symbol_start(c) => {
                let token = self.token();
                Ok(heap.make_symbol(token))
            }
            Some(c) => {
                Err(ParseError::new(format!("unexpected character {c:?}"), start))
            }
        }
    }

    /// Run `inner` one nesting level deeper.
    fn nested(
        &mut self,
        start: usize,
        inner: impl FnOnce(&mut Self) -> Result<Value, ParseError>,
    ) -> Result<Value, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::new("form nested too deeply", start));
        }
        self.depth += 1;
        let result = inner(self);
        self.depth -= 1;
        result
    }

    fn parse_list(
        &mut self,
        heap: &mut Heap,
        start: usize,
    ) -> Result<Value, ParseError> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => {
                    return Err(ParseError::new(
                        "missing ending parenthesis",
                        start,
                    ));
                }
                Some(')') => {
                    self.bump();
                    break;
                }
                Some(_) => items.push(self.parse_form(heap)?),
            }
        }
        Ok(heap.make_list(&items))
    }

    /// Text literal without escape processing.
    fn parse_text(
        &mut self,
        heap: &mut Heap,
        start: usize,
    ) -> Result<Value, ParseError> {
        let content_start = self.offset;
        while let Some(c) = self.bump() {
            if c == '"' {
                let content = &self.code[content_start..self.offset - 1];
                return Ok(heap.make_text(content));
            }
        }
        Err(ParseError::new("unterminated text", start))
    }

    fn parse_number(
        &mut self,
        heap: &mut Heap,
        start: usize,
    ) -> Result<Value, ParseError> {
        let token = self.token();
        token
            .parse::<f64>()
            .map(|number| heap.make_number(number))
            .map_err(|_| {
                ParseError::new(format!("invalid number {token:?}"), start)
            })
    }

    /// Consume up to the next delimiter.
    fn token(&mut self) -> &'src str {
        let start = self.offset;
        while let Some(c) = self.peek() {
            if c.is_whitespace() || matches!(c, '(' | ')' | ';') {
                break;
            }
            self.bump();
        }
        &self.code[start..self.offset]
    }
}

fn is_symbol_start(c: char) -> bool {
    c.is_alphabetic() || SYMBOL_SPECIALS.contains(c)
}

/// Read every form in `source`.
///
/// Reading stops at the first error; forms read before it are kept.
pub fn parse(heap: &mut Heap, source: &str) -> Parsed {
    let mut parser = Parser::new(source);
    let mut parsed = Parsed::default();
    while let Some(result) = parser.parse_next(heap) {
        match result {
            Ok(form) => parsed.forms.push(form),
            Err(e) => {
                parsed.error = Some(e);
                break;
            }
        }
    }
    parsed
}
