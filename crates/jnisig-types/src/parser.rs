//! C declaration parser.
//!
//! This parser handles the subset of C found in JNI headers and in
//! synthesized native-method prototypes:
//! - struct, union, enum definitions and forward declarations
//! - typedef declarations, including typedefs of inline tagged definitions
//! - function declarations, named or unnamed parameters, variadic `...`
//! - function-pointer declarators (`jint (JNICALL *GetVersion)(JNIEnv *env)`)
//! - pointers, arrays, bit fields, const/volatile/restrict
//!
//! It does NOT handle:
//! - Preprocessing: directive lines are skipped, macros are not expanded
//! - Expressions beyond integer literals
//! - Function bodies
//!
//! `JNIEXPORT`, `JNIIMPORT`, `JNICALL` and `__attribute__((...))` are
//! ignored. `__declspec(...)` is ignored when [`ParserOptions::declspec`] is
//! set and rejected otherwise. `__cdecl`, `__stdcall` and `__fastcall` are
//! recorded on the function type they qualify.
//!
//! After an error the parser skips to the end of the offending top-level
//! declaration and keeps going, so a failed unit reports every diagnostic.

use crate::types::*;
use crate::unit::{ParsedUnit, TypeKind};
use thiserror::Error;

/// Errors that can occur during parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Unexpected token: expected {expected}, got {got}")]
    UnexpectedToken { expected: String, got: String },

    #[error("Unexpected end of input")]
    UnexpectedEof,

    #[error("Invalid type: {0}")]
    InvalidType(String),

    #[error("Unknown type name '{0}'")]
    UnknownType(String),

    #[error("Redefinition of '{0}'")]
    Redefinition(String),

    #[error("Conflicting types for '{0}'")]
    ConflictingTypes(String),

    #[error("'__declspec' attributes are not enabled")]
    DeclspecDisabled,

    #[error("Function definitions are not supported")]
    FunctionBody,

    #[error("'{0}' is too large")]
    TypeTooLarge(String),

    #[error("Declarators nested deeper than {} levels", MAX_NESTING)]
    TooDeeplyNested,

    #[error("Syntax error at position {pos}: {message}")]
    SyntaxError { pos: usize, message: String },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Deepest nesting of declarators and aggregate bodies accepted.
pub const MAX_NESTING: usize = 128;

/// A located parser error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Unit the error was found in.
    pub unit: String,
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
    /// Error message.
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}: error: {}",
            self.unit, self.line, self.column, self.message
        )
    }
}

/// A unit that failed to parse, with every diagnostic collected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} error(s) parsing {unit}", .diagnostics.len())]
pub struct ParseFailure {
    pub unit: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parser behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserOptions {
    /// Accept Microsoft-style `__declspec(...)` declaration specifiers.
    pub declspec: bool,
}

impl ParserOptions {
    /// Options used for JNI headers and synthesized prototypes.
    pub fn jni() -> Self {
        Self { declspec: true }
    }
}

/// Token types for the lexer.
#[derive(Debug, Clone, PartialEq)]
enum Token {
    // Keywords
    Struct,
    Union,
    Enum,
    Typedef,
    Const,
    Volatile,
    Restrict,
    Static,
    Extern,
    Inline,
    Signed,
    Unsigned,
    Void,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,

    // Extensions
    Linkage,
    CallConv(CallingConvention),
    Attribute,
    Declspec,

    // Punctuation
    Semicolon,
    Comma,
    Star,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    OpenParen,
    CloseParen,
    Equals,
    Ellipsis,
    Colon,

    // Identifiers and literals
    Ident(String),
    Number(i64),

    // End of input
    Eof,
}

/// A simple lexer for C headers.
struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Tokenize the whole input. Bad characters are reported and skipped.
    fn tokenize(mut self) -> (Vec<(Token, usize)>, Vec<(usize, ParseError)>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();
        loop {
            self.skip_trivia();
            let start = self.pos;
            match self.next_token() {
                Ok(Token::Eof) => {
                    tokens.push((Token::Eof, start));
                    break;
                }
                Ok(token) => tokens.push((token, start)),
                Err(e) => {
                    errors.push((start, e));
                    if self.pos == start {
                        self.next_char();
                    }
                }
            }
        }
        (tokens, errors)
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn next_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn at_line_start(&self) -> bool {
        self.input[..self.pos]
            .chars()
            .rev()
            .take_while(|&c| c != '\n')
            .all(char::is_whitespace)
    }

    /// Skip whitespace, comments and preprocessor directive lines.
    fn skip_trivia(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.next_char();
            } else if ch == '#' && self.at_line_start() {
                self.skip_directive();
            } else if self.input[self.pos..].starts_with("//") {
                while let Some(ch) = self.next_char() {
                    if ch == '\n' {
                        break;
                    }
                }
            } else if self.input[self.pos..].starts_with("/*") {
                self.pos += 2;
                match self.input[self.pos..].find("*/") {
                    Some(end) => self.pos += end + 2,
                    None => self.pos = self.input.len(),
                }
            } else {
                break;
            }
        }
    }

    fn skip_directive(&mut self) {
        let mut continued = false;
        while let Some(ch) = self.next_char() {
            match ch {
                '\\' => continued = true,
                '\n' if continued => continued = false,
                '\n' => break,
                c if !c.is_whitespace() => continued = false,
                _ => {}
            }
        }
    }

    fn next_token(&mut self) -> ParseResult<Token> {
        let ch = match self.peek_char() {
            Some(ch) => ch,
            None => return Ok(Token::Eof),
        };

        let single = match ch {
            ';' => Some(Token::Semicolon),
            ',' => Some(Token::Comma),
            '*' => Some(Token::Star),
            '{' => Some(Token::OpenBrace),
            '}' => Some(Token::CloseBrace),
            '[' => Some(Token::OpenBracket),
            ']' => Some(Token::CloseBracket),
            '(' => Some(Token::OpenParen),
            ')' => Some(Token::CloseParen),
            '=' => Some(Token::Equals),
            ':' => Some(Token::Colon),
            _ => None,
        };
        if let Some(token) = single {
            self.next_char();
            return Ok(token);
        }

        match ch {
            '.' => {
                if self.input[self.pos..].starts_with("...") {
                    self.pos += 3;
                    Ok(Token::Ellipsis)
                } else {
                    Err(ParseError::SyntaxError {
                        pos: self.pos,
                        message: "Unexpected '.'".to_string(),
                    })
                }
            }
            _ if ch.is_ascii_digit() || ch == '-' => self.parse_number(),
            _ if ch.is_ascii_alphabetic() || ch == '_' => Ok(self.parse_ident_or_keyword()),
            _ => Err(ParseError::SyntaxError {
                pos: self.pos,
                message: format!("Unexpected character: '{}'", ch),
            }),
        }
    }

    fn parse_number(&mut self) -> ParseResult<Token> {
        let start = self.pos;
        let mut is_negative = false;

        if self.peek_char() == Some('-') {
            is_negative = true;
            self.next_char();
        }

        if self.input[self.pos..].starts_with("0x") || self.input[self.pos..].starts_with("0X") {
            self.pos += 2;
            let hex_start = self.pos;
            while let Some(ch) = self.peek_char() {
                if ch.is_ascii_hexdigit() {
                    self.next_char();
                } else {
                    break;
                }
            }
            let hex_str = &self.input[hex_start..self.pos];
            let value = i64::from_str_radix(hex_str, 16).map_err(|_| ParseError::SyntaxError {
                pos: start,
                message: "Invalid hex number".to_string(),
            })?;
            self.skip_int_suffix();
            return Ok(Token::Number(if is_negative { -value } else { value }));
        }

        let digits_start = self.pos;
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_digit() {
                self.next_char();
            } else {
                break;
            }
        }
        let num_str = &self.input[digits_start..self.pos];
        self.skip_int_suffix();

        let value: i64 = num_str.parse().map_err(|_| ParseError::SyntaxError {
            pos: start,
            message: format!("Invalid number: {}", &self.input[start..self.pos]),
        })?;

        Ok(Token::Number(if is_negative { -value } else { value }))
    }

    // L, UL, LL, etc.
    fn skip_int_suffix(&mut self) {
        while let Some(ch) = self.peek_char() {
            if matches!(ch, 'L' | 'l' | 'U' | 'u') {
                self.next_char();
            } else {
                break;
            }
        }
    }

    fn parse_ident_or_keyword(&mut self) -> Token {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.next_char();
            } else {
                break;
            }
        }

        let ident = &self.input[start..self.pos];
        match ident {
            "struct" => Token::Struct,
            "union" => Token::Union,
            "enum" => Token::Enum,
            "typedef" => Token::Typedef,
            "const" => Token::Const,
            "volatile" => Token::Volatile,
            "restrict" | "__restrict" | "__restrict__" => Token::Restrict,
            "static" => Token::Static,
            "extern" => Token::Extern,
            "inline" | "__inline" | "__inline__" => Token::Inline,
            "signed" | "__signed__" => Token::Signed,
            "unsigned" => Token::Unsigned,
            "void" => Token::Void,
            "char" => Token::Char,
            "short" => Token::Short,
            "int" => Token::Int,
            "long" => Token::Long,
            "float" => Token::Float,
            "double" => Token::Double,
            "JNIEXPORT" | "JNIIMPORT" | "JNICALL" | "__extension__" => Token::Linkage,
            "__cdecl" | "_cdecl" => Token::CallConv(CallingConvention::Cdecl),
            "__stdcall" | "_stdcall" => Token::CallConv(CallingConvention::Stdcall),
            "__fastcall" | "_fastcall" => Token::CallConv(CallingConvention::Fastcall),
            "__attribute__" | "__attribute" => Token::Attribute,
            "__declspec" => Token::Declspec,
            _ => Token::Ident(ident.to_string()),
        }
    }
}

/// Declaration specifiers collected before a declarator.
#[derive(Debug, Default)]
struct Specifiers {
    base: Option<CType>,
    signed: Option<bool>,
    short: bool,
    long: usize,
    int: bool,
    char: bool,
}

impl Specifiers {
    fn is_empty(&self) -> bool {
        self.base.is_none()
            && self.signed.is_none()
            && !self.short
            && self.long == 0
            && !self.int
            && !self.char
    }
}

/// One step of a declarator, applied to the base type in order.
#[derive(Debug, Clone)]
enum Derivation {
    Pointer,
    Array(Option<usize>),
    Function(Vec<FunctionParam>, bool),
    CallConv(CallingConvention),
}

fn apply_derivations(base: CType, derivations: Vec<Derivation>) -> CType {
    let mut ty = base;
    let mut pending_cc = None;
    for derivation in derivations {
        ty = match derivation {
            Derivation::Pointer => CType::Pointer(Box::new(ty)),
            Derivation::Array(length) => CType::Array(ArrayType::new(ty, length)),
            Derivation::Function(parameters, variadic) => CType::Function(FunctionType {
                return_type: Box::new(ty),
                parameters,
                variadic,
                calling_convention: pending_cc.take(),
            }),
            Derivation::CallConv(cc) => match ty {
                CType::Function(mut f) => {
                    f.calling_convention = Some(cc);
                    CType::Function(f)
                }
                other => {
                    pending_cc = Some(cc);
                    other
                }
            },
        };
    }
    ty
}

/// C declaration parser.
pub struct Parser<'a> {
    input: &'a str,
    tokens: Vec<(Token, usize)>,
    index: usize,
    lex_errors: Vec<(usize, ParseError)>,
    options: ParserOptions,
    unit: ParsedUnit,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given input.
    pub fn new(input: &'a str, unit_name: &str, options: ParserOptions, arch: ArchInfo) -> Self {
        let (tokens, lex_errors) = Lexer::new(input).tokenize();
        Self {
            input,
            tokens,
            index: 0,
            lex_errors,
            options,
            unit: ParsedUnit::new(unit_name, arch),
            depth: 0,
        }
    }

    /// Parse all declarations. Any diagnostic fails the whole unit.
    pub fn parse(mut self) -> Result<ParsedUnit, ParseFailure> {
        let mut errors = std::mem::take(&mut self.lex_errors);

        while *self.current() != Token::Eof {
            let start = self.index;
            if let Err(e) = self.parse_declaration() {
                errors.push((self.pos(), e));
                self.recover(start);
            }
        }

        if errors.is_empty() {
            return Ok(self.unit);
        }

        errors.sort_by_key(|(pos, _)| *pos);
        let unit = self.unit.name().to_string();
        let diagnostics = errors
            .into_iter()
            .map(|(pos, e)| {
                let (line, column) = line_col(self.input, pos);
                Diagnostic {
                    unit: unit.clone(),
                    line,
                    column,
                    message: e.to_string(),
                }
            })
            .collect();
        Err(ParseFailure { unit, diagnostics })
    }

    /// Skip from the start of a failed declaration past its terminating
    /// top-level `;`.
    fn recover(&mut self, start: usize) {
        self.index = start;
        let mut depth = 0usize;
        loop {
            match self.current() {
                Token::Eof => return,
                Token::OpenBrace => depth += 1,
                Token::CloseBrace => depth = depth.saturating_sub(1),
                Token::Semicolon if depth == 0 => {
                    self.index += 1;
                    return;
                }
                _ => {}
            }
            self.index += 1;
        }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.index.min(self.tokens.len() - 1)].0
    }

    fn peek(&self, offset: usize) -> &Token {
        let i = (self.index + offset).min(self.tokens.len() - 1);
        &self.tokens[i].0
    }

    fn pos(&self) -> usize {
        self.tokens[self.index.min(self.tokens.len() - 1)].1
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token != Token::Eof {
            self.index += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if *self.current() == expected {
            self.advance();
            Ok(())
        } else if *self.current() == Token::Eof {
            Err(ParseError::UnexpectedEof)
        } else {
            Err(ParseError::UnexpectedToken {
                expected: format!("{:?}", expected),
                got: format!("{:?}", self.current()),
            })
        }
    }

    fn parse_declaration(&mut self) -> ParseResult<()> {
        if *self.current() == Token::Semicolon {
            self.advance();
            return Ok(());
        }

        let is_typedef = self.skip_storage_class()?;
        let base_type = self.parse_type()?;

        if *self.current() == Token::Semicolon {
            // Tag definition or forward declaration only.
            self.advance();
            return Ok(());
        }

        loop {
            let (final_type, name) = self.parse_declarator(base_type.clone())?;
            self.skip_attributes()?;

            if is_typedef {
                if name.is_empty() {
                    return Err(ParseError::UnexpectedToken {
                        expected: "typedef name".to_string(),
                        got: format!("{:?}", self.current()),
                    });
                }
                self.unit.add_typedef(&name, final_type)?;
            } else if let CType::Function(signature) = final_type {
                if *self.current() == Token::OpenBrace {
                    return Err(ParseError::FunctionBody);
                }
                self.unit.add_function(FunctionPrototype { name, signature })?;
            } else if *self.current() == Token::Equals {
                // Variable with initializer; skip to the end of the declarator.
                while !matches!(self.current(), Token::Comma | Token::Semicolon | Token::Eof) {
                    self.advance();
                }
            }

            if *self.current() == Token::Comma {
                self.advance();
                continue;
            }
            break;
        }

        self.expect(Token::Semicolon)
    }

    /// Skip leading storage-class and linkage noise. Returns true for `typedef`.
    fn skip_storage_class(&mut self) -> ParseResult<bool> {
        let mut is_typedef = false;
        loop {
            match self.current() {
                Token::Typedef => {
                    is_typedef = true;
                    self.advance();
                }
                Token::Static | Token::Extern | Token::Inline | Token::Linkage => {
                    self.advance();
                }
                Token::Attribute | Token::Declspec => self.skip_attributes()?,
                _ => return Ok(is_typedef),
            }
        }
    }

    /// Skip `__attribute__((...))` and, when enabled, `__declspec(...)`.
    fn skip_attributes(&mut self) -> ParseResult<()> {
        loop {
            match self.current() {
                Token::Attribute => {
                    self.advance();
                    self.skip_balanced_parens()?;
                }
                Token::Declspec => {
                    if !self.options.declspec {
                        return Err(ParseError::DeclspecDisabled);
                    }
                    self.advance();
                    self.skip_balanced_parens()?;
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_balanced_parens(&mut self) -> ParseResult<()> {
        self.expect(Token::OpenParen)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.advance() {
                Token::OpenParen => depth += 1,
                Token::CloseParen => depth -= 1,
                Token::Eof => return Err(ParseError::UnexpectedEof),
                _ => {}
            }
        }
        Ok(())
    }

    fn parse_type(&mut self) -> ParseResult<CType> {
        let mut spec = Specifiers::default();

        loop {
            match self.current().clone() {
                Token::Const
                | Token::Volatile
                | Token::Restrict
                | Token::Static
                | Token::Extern
                | Token::Inline
                | Token::Linkage => {
                    self.advance();
                }
                Token::Attribute | Token::Declspec => self.skip_attributes()?,
                Token::Signed => {
                    spec.signed = Some(true);
                    self.advance();
                }
                Token::Unsigned => {
                    spec.signed = Some(false);
                    self.advance();
                }
                Token::Short => {
                    spec.short = true;
                    self.advance();
                }
                Token::Long => {
                    spec.long += 1;
                    self.advance();
                }
                Token::Int => {
                    spec.int = true;
                    self.advance();
                }
                Token::Char => {
                    spec.char = true;
                    self.advance();
                }
                Token::Void if spec.base.is_none() => {
                    spec.base = Some(CType::Void);
                    self.advance();
                }
                Token::Float if spec.base.is_none() => {
                    spec.base = Some(CType::Float(FloatType::float()));
                    self.advance();
                }
                Token::Double if spec.base.is_none() => {
                    spec.base = Some(CType::Float(FloatType::double()));
                    self.advance();
                }
                Token::Struct if spec.is_empty() => {
                    spec.base = Some(self.nested(Self::parse_struct)?)
                }
                Token::Union if spec.is_empty() => spec.base = Some(self.nested(Self::parse_union)?),
                Token::Enum if spec.is_empty() => spec.base = Some(self.parse_enum()?),
                Token::Ident(name) if spec.is_empty() => {
                    if !self.unit.is_typedef(&name) {
                        return Err(ParseError::UnknownType(name));
                    }
                    self.advance();
                    spec.base = Some(CType::Named(name));
                }
                _ => break,
            }
        }

        self.finish_specifiers(spec)
    }

    fn finish_specifiers(&self, spec: Specifiers) -> ParseResult<CType> {
        let signed = spec.signed.unwrap_or(true);
        if let Some(base) = spec.base {
            return Ok(match base {
                CType::Float(f) if f.size == 8 && spec.long > 0 => CType::Float(FloatType::new(16)),
                other => other,
            });
        }
        let ty = if spec.char {
            CType::Int(IntType::new(1, signed))
        } else if spec.short {
            CType::Int(IntType::new(2, signed))
        } else if spec.long >= 2 {
            CType::Int(IntType::new(8, signed))
        } else if spec.long == 1 {
            CType::Int(IntType::new(self.unit.arch().long_size, signed))
        } else if spec.int || spec.signed.is_some() {
            CType::Int(IntType::new(4, signed))
        } else {
            return Err(ParseError::InvalidType(format!("{:?}", self.current())));
        };
        Ok(ty)
    }

    fn parse_tag_name(&mut self) -> Option<String> {
        if let Token::Ident(n) = self.current() {
            let n = n.clone();
            self.advance();
            Some(n)
        } else {
            None
        }
    }

    fn parse_struct(&mut self) -> ParseResult<CType> {
        self.expect(Token::Struct)?;
        self.skip_attributes()?;
        let name = self.parse_tag_name();

        // Forward declaration or reference
        if *self.current() != Token::OpenBrace {
            return match name {
                Some(n) => Ok(CType::Named(format!("struct {}", n))),
                None => Err(ParseError::InvalidType("anonymous struct without body".to_string())),
            };
        }

        self.expect(Token::OpenBrace)?;

        let mut st = StructType::new(name.clone());

        while *self.current() != Token::CloseBrace && *self.current() != Token::Eof {
            let field_type = self.parse_type()?;
            loop {
                let (final_type, field_name) = self.parse_declarator(field_type.clone())?;
                let too_large = || ParseError::TypeTooLarge(field_name.clone());
                let layout = self.unit.layout_of(&final_type).map_err(|_| too_large())?;
                st.add_field(field_name.clone(), final_type, layout)
                    .map_err(|_| too_large())?;

                if *self.current() == Token::Colon {
                    self.advance();
                    if let Token::Number(width) = *self.current() {
                        self.advance();
                        if let Some(field) = st.fields.last_mut() {
                            field.bit_field = Some(BitFieldInfo {
                                bit_width: width.max(0) as usize,
                            });
                        }
                    }
                }

                if *self.current() == Token::Comma {
                    self.advance();
                    continue;
                }
                break;
            }
            self.expect(Token::Semicolon)?;
        }

        self.expect(Token::CloseBrace)?;
        st.finalize()
            .map_err(|_| ParseError::TypeTooLarge(tag_label("struct", &name)))?;

        let ty = CType::Struct(st);
        if let Some(n) = &name {
            self.unit.add_tagged(TypeKind::Struct, n, ty.clone())?;
        }
        Ok(ty)
    }

    fn parse_union(&mut self) -> ParseResult<CType> {
        self.expect(Token::Union)?;
        self.skip_attributes()?;
        let name = self.parse_tag_name();

        if *self.current() != Token::OpenBrace {
            return match name {
                Some(n) => Ok(CType::Named(format!("union {}", n))),
                None => Err(ParseError::InvalidType("anonymous union without body".to_string())),
            };
        }

        self.expect(Token::OpenBrace)?;

        let mut un = UnionType::new(name.clone());

        while *self.current() != Token::CloseBrace && *self.current() != Token::Eof {
            let member_type = self.parse_type()?;
            let (final_type, member_name) = self.parse_declarator(member_type)?;
            let layout = self
                .unit
                .layout_of(&final_type)
                .map_err(|_| ParseError::TypeTooLarge(member_name.clone()))?;
            un.add_member(member_name, final_type, layout);
            self.expect(Token::Semicolon)?;
        }

        self.expect(Token::CloseBrace)?;
        un.finalize()
            .map_err(|_| ParseError::TypeTooLarge(tag_label("union", &name)))?;

        let ty = CType::Union(un);
        if let Some(n) = &name {
            self.unit.add_tagged(TypeKind::Union, n, ty.clone())?;
        }
        Ok(ty)
    }

    fn parse_enum(&mut self) -> ParseResult<CType> {
        self.expect(Token::Enum)?;
        let name = self.parse_tag_name();

        if *self.current() != Token::OpenBrace {
            return match name {
                Some(n) => Ok(CType::Named(format!("enum {}", n))),
                None => Err(ParseError::InvalidType("anonymous enum without body".to_string())),
            };
        }

        self.expect(Token::OpenBrace)?;

        let mut en = EnumType::new(name.clone());
        let mut next_value: i64 = 0;

        while *self.current() != Token::CloseBrace && *self.current() != Token::Eof {
            let enum_name = match self.current() {
                Token::Ident(n) => {
                    let n = n.clone();
                    self.advance();
                    n
                }
                other => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "identifier".to_string(),
                        got: format!("{:?}", other),
                    })
                }
            };

            if *self.current() == Token::Equals {
                self.advance();
                match self.advance() {
                    Token::Number(v) => next_value = v,
                    Token::Ident(other) => {
                        next_value = en.value_of(&other).ok_or_else(|| ParseError::SyntaxError {
                            pos: self.pos(),
                            message: format!("Unknown enumerator '{}'", other),
                        })?
                    }
                    other => {
                        return Err(ParseError::UnexpectedToken {
                            expected: "integer constant".to_string(),
                            got: format!("{:?}", other),
                        })
                    }
                }
            }

            en.add_value(enum_name, next_value);
            next_value += 1;

            if *self.current() == Token::Comma {
                self.advance();
            }
        }

        self.expect(Token::CloseBrace)?;

        let ty = CType::Enum(en);
        if let Some(n) = &name {
            self.unit.add_tagged(TypeKind::Enum, n, ty.clone())?;
        }
        Ok(ty)
    }

    /// Parse a (possibly abstract) declarator and apply it to `base_type`.
    fn parse_declarator(&mut self, base_type: CType) -> ParseResult<(CType, String)> {
        let (name, derivations) = self.parse_declarator_derivations()?;
        Ok((apply_derivations(base_type, derivations), name))
    }

    /// Returns the declared name (empty if abstract) and the derivation steps
    /// in application order. Suffixes bind tighter than prefix pointers, and a
    /// parenthesized inner declarator applies last.
    fn parse_declarator_derivations(&mut self) -> ParseResult<(String, Vec<Derivation>)> {
        self.nested(Self::parse_declarator_derivations_inner)
    }

    /// Run `f` one nesting level deeper, failing past [`MAX_NESTING`].
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::TooDeeplyNested);
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn parse_declarator_derivations_inner(&mut self) -> ParseResult<(String, Vec<Derivation>)> {
        let mut prefix = Vec::new();
        loop {
            match self.current() {
                Token::Star => {
                    self.advance();
                    prefix.push(Derivation::Pointer);
                }
                Token::Const | Token::Volatile | Token::Restrict | Token::Linkage => {
                    self.advance();
                }
                Token::CallConv(cc) => {
                    let cc = *cc;
                    self.advance();
                    prefix.push(Derivation::CallConv(cc));
                }
                Token::Attribute | Token::Declspec => self.skip_attributes()?,
                _ => break,
            }
        }

        let mut inner = None;
        let mut name = String::new();
        if *self.current() == Token::OpenParen && self.starts_nested_declarator() {
            self.advance();
            inner = Some(self.parse_declarator_derivations()?);
            self.expect(Token::CloseParen)?;
        } else if let Token::Ident(n) = self.current() {
            name = n.clone();
            self.advance();
        }

        let mut suffixes = Vec::new();
        loop {
            match self.current() {
                Token::OpenBracket => {
                    self.advance();
                    let length = if let Token::Number(n) = *self.current() {
                        self.advance();
                        Some(n.max(0) as usize)
                    } else {
                        None
                    };
                    self.expect(Token::CloseBracket)?;
                    suffixes.push(Derivation::Array(length));
                }
                Token::OpenParen => {
                    let (params, variadic) = self.parse_parameter_list()?;
                    suffixes.push(Derivation::Function(params, variadic));
                }
                _ => break,
            }
        }

        let mut derivations = prefix;
        derivations.extend(suffixes.into_iter().rev());
        if let Some((inner_name, inner_derivations)) = inner {
            name = inner_name;
            derivations.extend(inner_derivations);
        }
        Ok((name, derivations))
    }

    /// At `(`: decide between a nested declarator and a parameter list.
    fn starts_nested_declarator(&self) -> bool {
        match self.peek(1) {
            Token::Star | Token::CallConv(_) | Token::Linkage | Token::OpenParen => true,
            Token::Attribute | Token::Declspec | Token::OpenBracket => true,
            Token::Ident(n) => !self.unit.is_typedef(n),
            _ => false,
        }
    }

    fn parse_parameter_list(&mut self) -> ParseResult<(Vec<FunctionParam>, bool)> {
        self.expect(Token::OpenParen)?;

        let mut params = Vec::new();
        let mut variadic = false;

        if *self.current() == Token::Void && *self.peek(1) == Token::CloseParen {
            self.advance();
            self.advance();
            return Ok((params, false));
        }

        while *self.current() != Token::CloseParen && *self.current() != Token::Eof {
            if *self.current() == Token::Ellipsis {
                self.advance();
                variadic = true;
                break;
            }

            let param_type = self.parse_type()?;
            let (final_type, name) = self.parse_declarator(param_type)?;
            params.push(FunctionParam {
                name,
                param_type: final_type,
            });

            if *self.current() == Token::Comma {
                self.advance();
            } else if *self.current() != Token::CloseParen {
                return Err(ParseError::UnexpectedToken {
                    expected: "',' or ')'".to_string(),
                    got: format!("{:?}", self.current()),
                });
            }
        }

        self.expect(Token::CloseParen)?;

        Ok((params, variadic))
    }
}

fn tag_label(keyword: &str, name: &Option<String>) -> String {
    match name {
        Some(n) => format!("{} {}", keyword, n),
        None => format!("anonymous {}", keyword),
    }
}

fn line_col(input: &str, pos: usize) -> (usize, usize) {
    let before = &input[..pos.min(input.len())];
    let line = before.matches('\n').count() + 1;
    let column = before
        .rfind('\n')
        .map(|nl| before.len() - nl)
        .unwrap_or(before.len() + 1);
    (line, column)
}

/// Parse source text into a unit.
pub fn parse_source(
    input: &str,
    unit_name: &str,
    options: ParserOptions,
    arch: ArchInfo,
) -> Result<ParsedUnit, ParseFailure> {
    Parser::new(input, unit_name, options, arch).parse()
}

/// Parse a C header string with default options and an LP64 data model.
pub fn parse_header(input: &str) -> Result<ParsedUnit, ParseFailure> {
    parse_source(input, "<source>", ParserOptions::default(), ArchInfo::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::TypeKind;

    #[test]
    fn test_parse_typedef() {
        let input = "typedef unsigned long size_t;";
        let unit = parse_header(input).unwrap();
        assert!(unit.has_type("size_t"));
        assert!(unit.is_typedef("size_t"));
    }

    #[test]
    fn test_parse_struct() {
        let input = r#"
            struct point {
                int x;
                int y;
            };
        "#;
        let unit = parse_header(input).unwrap();
        assert!(unit.has_type("point"));
        assert!(unit.has_type("struct point"));

        let ty = unit.get_type("point").unwrap();
        if let CType::Struct(s) = ty {
            assert_eq!(s.fields.len(), 2);
            assert_eq!(s.fields[0].name, "x");
            assert_eq!(s.fields[1].name, "y");
            assert_eq!(s.fields[1].offset, 4);
        } else {
            panic!("Expected struct type");
        }
    }

    #[test]
    fn test_parse_function() {
        let input = "int printf(const char *format, ...);";
        let unit = parse_header(input).unwrap();
        assert!(unit.has_function("printf"));

        let func = unit.get_function("printf").unwrap();
        assert!(func.signature.variadic);
        assert_eq!(func.signature.parameters.len(), 1);
    }

    #[test]
    fn test_parse_enum() {
        let input = r#"
            enum color {
                RED,
                GREEN = 5,
                BLUE
            };
        "#;
        let unit = parse_header(input).unwrap();

        let ty = unit.get_type("enum color").unwrap();
        if let CType::Enum(e) = ty {
            assert_eq!(e.value_of("RED"), Some(0));
            assert_eq!(e.value_of("GREEN"), Some(5));
            assert_eq!(e.value_of("BLUE"), Some(6));
        } else {
            panic!("Expected enum type");
        }
    }

    #[test]
    fn test_parse_enum_negative_and_hex_values() {
        let input = "enum flags { ERR = -1, A = 0x01, ALL = 0xff };";
        let unit = parse_header(input).unwrap();

        if let Some(CType::Enum(e)) = unit.get_type("flags") {
            assert_eq!(e.value_of("ERR"), Some(-1));
            assert_eq!(e.value_of("A"), Some(1));
            assert_eq!(e.value_of("ALL"), Some(255));
        } else {
            panic!("Expected enum type");
        }
    }

    #[test]
    fn test_parse_pointer_typedef() {
        let input = "typedef char **string_array;";
        let unit = parse_header(input).unwrap();

        let ty = unit.get_type("string_array").unwrap();
        if let CType::Pointer(inner) = ty {
            assert!(inner.is_pointer());
        } else {
            panic!("Expected pointer type");
        }
    }

    #[test]
    fn test_parse_nested_array() {
        let input = "struct matrix { int data[2][3]; };";
        let unit = parse_header(input).unwrap();

        let Some(CType::Struct(s)) = unit.get_type("matrix") else {
            panic!("Expected struct type");
        };
        let CType::Array(outer) = &s.fields[0].field_type else {
            panic!("Expected outer array");
        };
        assert_eq!(outer.length, Some(2));
        let CType::Array(inner) = outer.element.as_ref() else {
            panic!("Expected inner array");
        };
        assert_eq!(inner.length, Some(3));
        assert_eq!(s.size, 24);
    }

    #[test]
    fn test_array_of_pointers() {
        let input = "struct table { char *names[4]; };";
        let unit = parse_header(input).unwrap();

        let Some(CType::Struct(s)) = unit.get_type("table") else {
            panic!("Expected struct type");
        };
        let CType::Array(a) = &s.fields[0].field_type else {
            panic!("Expected array");
        };
        assert!(a.element.is_pointer());
        assert_eq!(s.size, 32);
    }

    #[test]
    fn test_parse_union() {
        let input = r#"
            typedef unsigned char jboolean;
            typedef long long jlong;
            typedef union jvalue {
                jboolean z;
                jlong j;
                void *l;
            } jvalue;
        "#;
        let unit = parse_header(input).unwrap();

        let entry = unit.get_entry("jvalue").unwrap();
        assert_eq!(entry.kind, TypeKind::Union);
        assert!(unit.is_typedef("jvalue"));
        if let CType::Union(u) = &entry.ty {
            assert_eq!(u.members.len(), 3);
            assert_eq!(u.size, 8);
        } else {
            panic!("Expected union type");
        }
    }

    #[test]
    fn test_parse_function_pointer_field() {
        let input = r#"
            typedef int jint;
            struct JNINativeInterface_;
            typedef const struct JNINativeInterface_ *JNIEnv;
            struct JNINativeInterface_ {
                void *reserved0;
                jint (JNICALL *GetVersion)(JNIEnv *env);
            };
        "#;
        let unit = parse_header(input).unwrap();

        let Some(CType::Struct(s)) = unit.get_type("JNINativeInterface_") else {
            panic!("Expected struct type");
        };
        assert_eq!(s.fields.len(), 2);
        let field = &s.fields[1];
        assert_eq!(field.name, "GetVersion");
        assert_eq!(field.offset, 8);

        let CType::Pointer(inner) = &field.field_type else {
            panic!("Expected function pointer");
        };
        let CType::Function(f) = inner.as_ref() else {
            panic!("Expected function type");
        };
        assert_eq!(*f.return_type, CType::named("jint"));
        assert_eq!(f.parameters.len(), 1);
        assert_eq!(f.parameters[0].name, "env");
        assert_eq!(f.parameters[0].param_type, CType::ptr(CType::named("JNIEnv")));
    }

    #[test]
    fn test_layout_follows_arch() {
        let input = "struct s { void *a; void *b; };";
        let unit = parse_source(input, "t.h", ParserOptions::default(), ArchInfo::ilp32()).unwrap();

        let Some(CType::Struct(s)) = unit.get_type("s") else {
            panic!("Expected struct type");
        };
        assert_eq!(s.fields[1].offset, 4);
        assert_eq!(s.size, 8);
    }

    #[test]
    fn test_unnamed_parameters() {
        let input = r#"
            typedef int jint;
            typedef void *jobject;
            typedef struct JNIEnv_ JNIEnv;
            jint Java_Foo_bar(JNIEnv*,jobject);
        "#;
        let unit = parse_header(input).unwrap();

        let func = unit.get_function("Java_Foo_bar").unwrap();
        assert_eq!(func.signature.parameters.len(), 2);
        assert!(func.signature.parameters[0].name.is_empty());
        assert_eq!(func.to_c_string(), "jint Java_Foo_bar(JNIEnv*, jobject)");
    }

    #[test]
    fn test_jniexport_and_calling_convention() {
        let input = r#"
            typedef int jint;
            JNIEXPORT jint JNICALL JNI_OnLoad(void *vm, void *reserved);
            int __stdcall WinMain(void);
            void (__cdecl *handler)(int);
        "#;
        let unit = parse_header(input).unwrap();

        let onload = unit.get_function("JNI_OnLoad").unwrap();
        assert_eq!(onload.signature.parameters.len(), 2);
        assert_eq!(onload.signature.calling_convention, None);

        let winmain = unit.get_function("WinMain").unwrap();
        assert_eq!(
            winmain.signature.calling_convention,
            Some(CallingConvention::Stdcall)
        );
        // A function pointer variable is not a function declaration.
        assert!(!unit.has_function("handler"));
    }

    #[test]
    fn test_declspec_requires_option() {
        let input = "__declspec(dllexport) int f(void);";

        let failure = parse_header(input).unwrap_err();
        assert!(failure.diagnostics[0].message.contains("__declspec"));

        let unit = parse_source(input, "t.h", ParserOptions::jni(), ArchInfo::default()).unwrap();
        assert!(unit.has_function("f"));
    }

    #[test]
    fn test_attribute_is_ignored() {
        let unit = parse_header("int g(int x) __attribute__((noreturn));").unwrap();
        assert!(unit.has_function("g"));

        let unit = parse_header("struct __attribute__((packed)) p { char c; };").unwrap();
        assert!(unit.has_type("p"));
    }

    #[test]
    fn test_preprocessor_lines_skipped() {
        let input = r#"
            #ifndef _JNI_H
            #define _JNI_H
            #define JNI_VERSION_1_6 \
                0x00010006
            typedef int jint;
            #endif
        "#;
        let unit = parse_header(input).unwrap();
        assert!(unit.has_type("jint"));
        assert_eq!(unit.stats().typedef_count, 1);
    }

    #[test]
    fn test_unknown_type_name() {
        let input = "jint f(void);";
        let failure = parse_header(input).unwrap_err();
        assert_eq!(failure.diagnostics.len(), 1);
        let diag = &failure.diagnostics[0];
        assert_eq!(diag.line, 1);
        assert_eq!(diag.column, 1);
        assert!(diag.message.contains("'jint'"));
        assert_eq!(diag.to_string(), "<source>:1:1: error: Unknown type name 'jint'");
    }

    #[test]
    fn test_error_recovery_reports_every_diagnostic() {
        let input = "typedef int jint;\nFoo a(void);\njint ok(void);\nBar b(jint);\n";
        let failure = parse_source(input, "jni_ext.h", ParserOptions::jni(), ArchInfo::default())
            .unwrap_err();

        assert_eq!(failure.unit, "jni_ext.h");
        assert_eq!(failure.diagnostics.len(), 2);
        assert_eq!(failure.diagnostics[0].line, 2);
        assert_eq!(failure.diagnostics[1].line, 4);
        assert!(failure.to_string().contains("2 error(s)"));
    }

    #[test]
    fn test_oversized_array_is_diagnosed() {
        let failure = parse_header("struct s { int a[0x4000000000000000]; };").unwrap_err();
        assert_eq!(failure.diagnostics.len(), 1);
        assert!(failure.diagnostics[0].message.contains("'a' is too large"));

        let input = "struct s { char a[0x7fffffffffffffff]; char b[0x7fffffffffffffff]; char c[4]; };\n\
                     typedef int jint;";
        let failure = parse_header(input).unwrap_err();
        assert_eq!(failure.diagnostics.len(), 1);
        assert!(failure.diagnostics[0].message.contains("'c' is too large"));
    }

    #[test]
    fn test_nesting_limit() {
        let unit = parse_header("int ((((x))));").unwrap();
        assert!(unit.get_function("x").is_none());
        assert!(unit.get_type("x").is_none());

        let depth = 100_000;
        let input = format!("int {}x{};\nint ok(void);", "(".repeat(depth), ")".repeat(depth));
        let failure = parse_header(&input).unwrap_err();
        assert_eq!(failure.diagnostics.len(), 1);
        assert!(failure.diagnostics[0].message.contains("nested deeper"));
        assert_eq!(failure.diagnostics[0].line, 1);
    }

    #[test]
    fn test_conflicting_function_declarations() {
        let input = "int f(int);\nint f(char*);";
        let failure = parse_header(input).unwrap_err();
        assert!(failure.diagnostics[0].message.contains("Conflicting types for 'f'"));
    }

    #[test]
    fn test_identical_redeclaration_accepted() {
        let input = "typedef int jint;\njint f(jint x);\njint f(jint y);\ntypedef int jint;";
        let unit = parse_header(input).unwrap();
        assert_eq!(unit.functions().count(), 1);
    }

    #[test]
    fn test_struct_redefinition_rejected() {
        let input = "struct a { int x; };\nstruct a { char y; };";
        let failure = parse_header(input).unwrap_err();
        assert!(failure.diagnostics[0].message.contains("Redefinition of 'a'"));
    }

    #[test]
    fn test_typedef_struct_same_name() {
        let input = r#"
            typedef struct {
                char *name;
            } anon_t;
            typedef struct JNINativeMethod {
                char *name;
                char *signature;
                void *fnPtr;
            } JNINativeMethod;
            typedef struct later later;
            struct later { int x; };
            int RegisterNatives(const JNINativeMethod *methods, later *l);
        "#;
        let unit = parse_header(input).unwrap();

        let names: Vec<_> = unit.type_names().collect();
        assert_eq!(names, vec!["anon_t", "JNINativeMethod", "later"]);
        assert_eq!(unit.get_entry("JNINativeMethod").unwrap().kind, TypeKind::Struct);
        assert_eq!(unit.get_entry("later").unwrap().kind, TypeKind::Struct);
        assert!(unit.has_function("RegisterNatives"));
    }

    #[test]
    fn test_long_follows_arch() {
        let input = "typedef long L; typedef unsigned long long ULL; typedef long double LD;";
        let unit = parse_source(input, "t.h", ParserOptions::default(), ArchInfo::ilp32()).unwrap();

        assert_eq!(unit.get_type("L"), Some(&CType::Int(IntType::new(4, true))));
        assert_eq!(unit.get_type("ULL"), Some(&CType::ulonglong()));
        assert_eq!(unit.get_type("LD"), Some(&CType::Float(FloatType::new(16))));
    }

    #[test]
    fn test_function_returning_function_pointer() {
        let input = "void (*signal(int sig, void (*func)(int)))(int);";
        let unit = parse_header(input).unwrap();

        let f = unit.get_function("signal").unwrap();
        assert_eq!(f.signature.parameters.len(), 2);
        assert!(f.signature.parameters[1].param_type.is_pointer());
        assert!(f.signature.return_type.is_pointer());
    }

    #[test]
    fn test_bit_fields() {
        let input = "struct flags { unsigned int a : 1, b : 3; };";
        let unit = parse_header(input).unwrap();

        let Some(CType::Struct(s)) = unit.get_type("flags") else {
            panic!("Expected struct type");
        };
        assert_eq!(s.fields.len(), 2);
        assert_eq!(s.fields[1].bit_field.as_ref().map(|b| b.bit_width), Some(3));
    }

    #[test]
    fn test_parse_empty_and_comment_only_input() {
        for input in ["", "   \n\t\n   ", "// just comments\n/* more comments */"] {
            let unit = parse_header(input).unwrap();
            assert_eq!(unit.stats().type_count, 0);
            assert_eq!(unit.stats().function_count, 0);
        }
    }

    #[test]
    fn test_parse_missing_semicolon() {
        assert!(parse_header("typedef int myint").is_err());
        assert!(parse_header("struct test { int x;").is_err());
    }

    #[test]
    fn test_function_body_rejected() {
        let failure = parse_header("int f(void) { return 0; }").unwrap_err();
        assert!(failure.diagnostics[0].message.contains("Function definitions"));
    }

    #[test]
    fn test_bad_character_reported() {
        let failure = parse_header("typedef int a;\n@\n").unwrap_err();
        assert_eq!(failure.diagnostics[0].line, 2);
        assert!(failure.diagnostics[0].message.contains("'@'"));
    }

    #[test]
    fn test_line_col() {
        assert_eq!(line_col("abc", 0), (1, 1));
        assert_eq!(line_col("abc\ndef", 5), (2, 2));
    }
}
