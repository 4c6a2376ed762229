//! # jnisig-demangle
//!
//! Itanium C++ ABI name demangling for jnisig.
//!
//! Only the qualified name of a symbol is recovered; template argument
//! lists and the parameter signature are skipped. This is what dispatch
//! stub matching needs: `_ZN7_JNIEnv16CallObjectMethodEP8_jobjectP10_jmethodIDz`
//! becomes `_JNIEnv::CallObjectMethod`.
//!
//! Supported:
//! - Nested names (`N...E`) with CV and ref qualifiers
//! - `St` and the standard abbreviations (`Sa`, `Ss`, ...)
//! - Prefix substitutions (`S_`, `S<seq-id>_`)
//! - Constructors and destructors
//! - Common operator names
//! - Internal linkage (`_ZL`) and ELF version / clone suffixes

/// Attempt to demangle a symbol name.
///
/// Returns the qualified name if successful, or None if the symbol is not
/// an Itanium mangled name or uses an unsupported construct.
pub fn demangle(symbol: &str) -> Option<String> {
    let symbol = strip_suffixes(symbol);
    let mangled = symbol.strip_prefix("_Z")?;
    let mut parser = Demangler::new(mangled);
    let name = parser.parse_name()?;
    if name.is_empty() {
        return None;
    }
    Some(name)
}

/// Returns the demangled name, or the symbol itself if it does not demangle.
pub fn short_name(symbol: &str) -> String {
    demangle(symbol).unwrap_or_else(|| symbol.to_string())
}

/// Drop `@VERSION` / `@@VERSION` and `.cfi` / `.constprop.0` style suffixes.
fn strip_suffixes(symbol: &str) -> &str {
    let symbol = symbol.split('@').next().unwrap_or(symbol);
    match symbol.find('.') {
        Some(i) if symbol.starts_with("_Z") => &symbol[..i],
        _ => symbol,
    }
}

struct Demangler<'a> {
    input: &'a [u8],
    pos: usize,
    subs: Vec<String>,
}

impl<'a> Demangler<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            subs: Vec::new(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_name(&mut self) -> Option<String> {
        // Internal linkage marker
        self.eat(b'L');

        match self.peek()? {
            b'N' => self.parse_nested_name(),
            b'S' => {
                let prefix = self.parse_substitution()?;
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    let name = self.parse_unqualified_name(&prefix)?;
                    self.skip_template_args()?;
                    Some(format!("{}::{}", prefix, name))
                } else {
                    self.skip_template_args()?;
                    Some(prefix)
                }
            }
            // Local names need the full type grammar.
            b'Z' => None,
            _ => {
                let name = self.parse_unqualified_name("")?;
                self.skip_template_args()?;
                Some(name)
            }
        }
    }

    fn parse_nested_name(&mut self) -> Option<String> {
        if !self.eat(b'N') {
            return None;
        }
        while matches!(self.peek(), Some(b'r' | b'V' | b'K')) {
            self.pos += 1;
        }
        if matches!(self.peek(), Some(b'R' | b'O')) {
            self.pos += 1;
        }

        let mut prefix = String::new();
        let mut last = String::new();
        loop {
            match self.peek()? {
                b'E' => {
                    self.pos += 1;
                    break;
                }
                b'S' if prefix.is_empty() => {
                    prefix = self.parse_substitution()?;
                    last = prefix.rsplit("::").next().unwrap_or_default().to_string();
                }
                b'I' if !prefix.is_empty() => {
                    self.skip_template_args()?;
                    self.subs.push(prefix.clone());
                }
                b'L' => self.pos += 1,
                _ => {
                    let name = self.parse_unqualified_name(&last)?;
                    if !prefix.is_empty() {
                        prefix.push_str("::");
                    }
                    prefix.push_str(&name);
                    last = name;
                    self.subs.push(prefix.clone());
                }
            }
        }

        if prefix.is_empty() {
            None
        } else {
            Some(prefix)
        }
    }

    /// `last` is the enclosing class name, used for constructors and
    /// destructors.
    fn parse_unqualified_name(&mut self, last: &str) -> Option<String> {
        let c = self.peek()?;
        let name = match c {
            b'0'..=b'9' => self.parse_source_name()?,
            b'C' => {
                self.pos += 1;
                self.eat(b'I');
                match self.peek()? {
                    b'1'..=b'5' => self.pos += 1,
                    _ => return None,
                }
                if last.is_empty() {
                    return None;
                }
                last.to_string()
            }
            b'D' if matches!(self.peek_at(1), Some(b'0'..=b'5')) => {
                self.pos += 2;
                if last.is_empty() {
                    return None;
                }
                format!("~{}", last)
            }
            b'U' if self.peek_at(1) == Some(b't') => {
                self.pos += 2;
                let n = self.parse_seq_id_until(b'_')?;
                format!("{{unnamed type#{}}}", n + 1)
            }
            b'a'..=b'z' => self.parse_operator_name()?,
            _ => return None,
        };

        // ABI tags
        while self.eat(b'B') {
            self.parse_source_name()?;
        }
        Some(name)
    }

    fn parse_source_name(&mut self) -> Option<String> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let len: usize = std::str::from_utf8(&self.input[start..self.pos])
            .ok()?
            .parse()
            .ok()?;
        let end = self.pos.checked_add(len)?;
        let bytes = self.input.get(self.pos..end)?;
        let name = std::str::from_utf8(bytes).ok()?;
        self.pos = end;

        if name.starts_with("_GLOBAL__N") {
            Some("(anonymous namespace)".to_string())
        } else {
            Some(name.to_string())
        }
    }

    fn parse_operator_name(&mut self) -> Option<String> {
        let code = self.input.get(self.pos..self.pos + 2)?;
        let op = match code {
            b"nw" => "new",
            b"na" => "new[]",
            b"dl" => "delete",
            b"da" => "delete[]",
            b"ps" | b"pl" => "+",
            b"ng" | b"mi" => "-",
            b"ad" | b"an" => "&",
            b"de" | b"ml" => "*",
            b"co" => "~",
            b"dv" => "/",
            b"rm" => "%",
            b"or" => "|",
            b"eo" => "^",
            b"aS" => "=",
            b"pL" => "+=",
            b"mI" => "-=",
            b"mL" => "*=",
            b"dV" => "/=",
            b"ls" => "<<",
            b"rs" => ">>",
            b"eq" => "==",
            b"ne" => "!=",
            b"lt" => "<",
            b"gt" => ">",
            b"le" => "<=",
            b"ge" => ">=",
            b"nt" => "!",
            b"aa" => "&&",
            b"oo" => "||",
            b"pp" => "++",
            b"mm" => "--",
            b"cm" => ",",
            b"pt" => "->",
            b"cl" => "()",
            b"ix" => "[]",
            _ => return None,
        };
        self.pos += 2;
        if op.starts_with(|c: char| c.is_ascii_alphabetic()) {
            Some(format!("operator {}", op))
        } else {
            Some(format!("operator{}", op))
        }
    }

    fn parse_substitution(&mut self) -> Option<String> {
        if !self.eat(b'S') {
            return None;
        }
        let abbreviation = match self.peek()? {
            b't' => Some("std"),
            b'a' => Some("std::allocator"),
            b'b' => Some("std::basic_string"),
            b's' => Some("std::string"),
            b'i' => Some("std::istream"),
            b'o' => Some("std::ostream"),
            b'd' => Some("std::iostream"),
            _ => None,
        };
        if let Some(name) = abbreviation {
            self.pos += 1;
            return Some(name.to_string());
        }

        let index = if self.eat(b'_') {
            0
        } else {
            self.parse_seq_id_until(b'_')?
        };
        self.subs.get(index).cloned()
    }

    /// Base-36 sequence id terminated by `end`, offset by one so that an
    /// empty id is zero and `0` is one.
    fn parse_seq_id_until(&mut self, end: u8) -> Option<usize> {
        let mut value: usize = 0;
        let mut digits = 0;
        loop {
            let c = self.peek()?;
            if c == end {
                self.pos += 1;
                return Some(if digits == 0 { 0 } else { value + 1 });
            }
            let digit = match c {
                b'0'..=b'9' => c - b'0',
                b'A'..=b'Z' => c - b'A' + 10,
                _ => return None,
            };
            value = value.checked_mul(36)?.checked_add(digit as usize)?;
            digits += 1;
            self.pos += 1;
        }
    }

    /// Skip an `I...E` template argument list if present.
    fn skip_template_args(&mut self) -> Option<()> {
        if self.peek() != Some(b'I') {
            return Some(());
        }
        let mut depth = 0usize;
        loop {
            match self.peek()? {
                b'I' | b'N' => {
                    depth += 1;
                    self.pos += 1;
                }
                b'E' => {
                    self.pos += 1;
                    depth -= 1;
                    if depth == 0 {
                        return Some(());
                    }
                }
                b'L' => {
                    // Literal: L <type> <value> E, or L _Z <encoding> E
                    while self.peek()? != b'E' {
                        self.pos += 1;
                    }
                    self.pos += 1;
                }
                b'0'..=b'9' => {
                    self.parse_source_name()?;
                }
                b'S' | b'T' => {
                    self.pos += 1;
                    if self.peek().is_some_and(|c| c.is_ascii_lowercase()) {
                        self.pos += 1;
                    } else {
                        while self.peek()? != b'_' {
                            self.pos += 1;
                        }
                        self.pos += 1;
                    }
                }
                _ => self.pos += 1,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jnienv_dispatch_stub() {
        assert_eq!(
            demangle("_ZN7_JNIEnv16CallObjectMethodEP8_jobjectP10_jmethodIDz"),
            Some("_JNIEnv::CallObjectMethod".to_string())
        );
        assert_eq!(
            demangle("_ZN7_JNIEnv12NewStringUTFEPKc"),
            Some("_JNIEnv::NewStringUTF".to_string())
        );
    }

    #[test]
    fn test_simple_function() {
        assert_eq!(demangle("_Z4mainv"), Some("main".to_string()));
        assert_eq!(demangle("_Z4main"), Some("main".to_string()));
        assert_eq!(demangle("_ZL6helperi"), Some("helper".to_string()));
    }

    #[test]
    fn test_const_method() {
        assert_eq!(
            demangle("_ZNK3foo3bar3getEv"),
            Some("foo::bar::get".to_string())
        );
    }

    #[test]
    fn test_std_names() {
        assert_eq!(
            demangle("_ZNSt6vectorIiSaIiEE9push_backERKi"),
            Some("std::vector::push_back".to_string())
        );
        assert_eq!(demangle("_ZSt9terminatev"), Some("std::terminate".to_string()));
    }

    #[test]
    fn test_ctor_dtor() {
        assert_eq!(demangle("_ZN3FooC2Ev"), Some("Foo::Foo".to_string()));
        assert_eq!(demangle("_ZN3FooD0Ev"), Some("Foo::~Foo".to_string()));
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            demangle("_ZN3FooaSERKS_"),
            Some("Foo::operator=".to_string())
        );
        assert_eq!(demangle("_Znwm"), Some("operator new".to_string()));
    }

    #[test]
    fn test_substitution_in_prefix() {
        // S_ refers to the first recorded prefix.
        let mut parser = Demangler::new("NS_3barE");
        parser.subs.push("foo".to_string());
        assert_eq!(parser.parse_name(), Some("foo::bar".to_string()));

        let mut parser = Demangler::new("NS0_3bazE");
        parser.subs.push("a".to_string());
        parser.subs.push("a::b".to_string());
        assert_eq!(parser.parse_name(), Some("a::b::baz".to_string()));
    }

    #[test]
    fn test_anonymous_namespace() {
        assert_eq!(
            demangle("_ZN12_GLOBAL__N_14initEv"),
            Some("(anonymous namespace)::init".to_string())
        );
    }

    #[test]
    fn test_suffixes_stripped() {
        assert_eq!(
            demangle("_ZN7_JNIEnv11GetMethodIDEP7_jclassPKcS3_.cfi"),
            Some("_JNIEnv::GetMethodID".to_string())
        );
        assert_eq!(demangle("_Z4mainv@@LIBC"), Some("main".to_string()));
    }

    #[test]
    fn test_non_mangled() {
        assert_eq!(demangle("printf"), None);
        assert_eq!(demangle("Java_Foo_bar"), None);
        assert_eq!(demangle("_Z"), None);
        assert_eq!(demangle("_Z99abc"), None);
        assert_eq!(demangle("_ZN3fooE3bar"), Some("foo".to_string()));
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("Java_Foo_bar"), "Java_Foo_bar");
        assert_eq!(
            short_name("_ZN7_JNIEnv13CallIntMethodEP8_jobjectP10_jmethodIDz"),
            "_JNIEnv::CallIntMethod"
        );
    }
}
