use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::trace;
use logos::Logos;

use crate::ast::SourceLocation;
use crate::ty::Type;

/// Syntactic category of a token.
///
/// Single-character punctuation and any character the lexer does not
/// recognise are tagged by the character itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    Id,
    Num,
    Real,
    True,
    False,
    If,
    Else,
    While,
    Do,
    Break,
    /// A basic type keyword (`int`, `float`, `bool`, `char`).
    Basic,
    Or,
    And,
    Eq,
    Ne,
    Le,
    Ge,
    /// Unary minus, produced by the parser rather than the lexer.
    Minus,
    End,
    Char(char),
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Char(c) => write!(f, "'{}'", c),
            Tag::End => f.write_str("end of input"),
            other => write!(f, "{:?}", other),
        }
    }
}

/// A named token: identifier, keyword, basic type or multi-character operator.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub lexeme: Rc<str>,
    pub tag: Tag,
    /// The type a `Tag::Basic` word denotes.
    pub basic: Option<Type>,
}

impl Word {
    pub fn new(lexeme: &str, tag: Tag) -> Self {
        Self { lexeme: Rc::from(lexeme), tag, basic: None }
    }

    pub fn basic(ty: Type) -> Self {
        Self { lexeme: Rc::from(ty.to_string()), tag: Tag::Basic, basic: Some(ty) }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Num(i64),
    Real(f64),
    Word(Rc<Word>),
    Char(char),
    End,
}

/// A token with its literal text and the location of its first character.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: Rc<str>,
    pub loc: SourceLocation,
}

impl Token {
    pub fn num(value: i64, loc: SourceLocation) -> Self {
        Self { kind: TokenKind::Num(value), lexeme: Rc::from(value.to_string()), loc }
    }

    /// A floating literal; `text` is the literal as written.
    pub fn real(value: f64, text: &str, loc: SourceLocation) -> Self {
        Self { kind: TokenKind::Real(value), lexeme: Rc::from(text), loc }
    }

    pub fn word(word: Rc<Word>, loc: SourceLocation) -> Self {
        let lexeme = Rc::clone(&word.lexeme);
        Self { kind: TokenKind::Word(word), lexeme, loc }
    }

    pub fn char(c: char, loc: SourceLocation) -> Self {
        Self { kind: TokenKind::Char(c), lexeme: Rc::from(c.to_string()), loc }
    }

    pub fn end(loc: SourceLocation) -> Self {
        Self { kind: TokenKind::End, lexeme: Rc::from(""), loc }
    }

    pub fn tag(&self) -> Tag {
        match &self.kind {
            TokenKind::Num(_) => Tag::Num,
            TokenKind::Real(_) => Tag::Real,
            TokenKind::Word(w) => w.tag,
            TokenKind::Char(c) => Tag::Char(*c),
            TokenKind::End => Tag::End,
        }
    }

    pub fn as_word(&self) -> Option<&Rc<Word>> {
        match &self.kind {
            TokenKind::Word(w) => Some(w),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::End => f.write_str("end of input"),
            _ => write!(f, "'{}'", self.lexeme),
        }
    }
}

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r]+")]
enum Raw {
    #[token("\n")]
    Newline,

    #[regex(r"[0-9]+\.[0-9]*", fold_real)]
    Real(f64),

    #[regex(r"[0-9]+", |lex| fold_integer(lex.slice()))]
    Num(i64),

    #[regex(r"[a-zA-Z][a-zA-Z0-9]*")]
    Word,

    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LessEq,
    #[token(">=")]
    GreaterEq,

    #[regex(r"[-+*/<>=!&|;,(){}\[\]]", |lex| lex.slice().chars().next())]
    Punct(char),
}

// Saturates instead of overflowing so scanning never fails.
fn fold_integer(digits: &str) -> i64 {
    digits
        .bytes()
        .fold(0i64, |value, b| value.saturating_mul(10).saturating_add(i64::from(b - b'0')))
}

fn fold_real(lex: &logos::Lexer<Raw>) -> f64 {
    let (int_part, frac_part) = lex.slice().split_once('.').unwrap_or((lex.slice(), ""));
    let mut fraction = 0.0;
    let mut divisor = 10.0;
    for b in frac_part.bytes() {
        fraction += f64::from(b - b'0') / divisor;
        divisor *= 10.0;
    }
    fold_integer(int_part) as f64 + fraction
}

const RESERVED: [(&str, Tag); 7] = [
    ("if", Tag::If),
    ("else", Tag::Else),
    ("while", Tag::While),
    ("do", Tag::Do),
    ("break", Tag::Break),
    ("true", Tag::True),
    ("false", Tag::False),
];

/// Converts source text into tokens, one `scan` at a time.
///
/// Identifiers are memoised: the first occurrence registers a [`Word`] in the
/// table and later occurrences share it, so only the location differs.
pub struct Lexer<'src> {
    raw: logos::Lexer<'src, Raw>,
    words: HashMap<String, Rc<Word>>,
    line: usize,
    line_start: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        let mut lexer = Self { raw: Raw::lexer(source), words: HashMap::new(), line: 1, line_start: 0 };
        for (lexeme, tag) in RESERVED {
            lexer.reserve(Rc::new(Word::new(lexeme, tag)));
        }
        for ty in [Type::Int, Type::Float, Type::Bool, Type::Char] {
            lexer.reserve(Rc::new(Word::basic(ty)));
        }
        lexer
    }

    /// Registers a word so later occurrences of its lexeme resolve to it.
    pub fn reserve(&mut self, word: Rc<Word>) {
        self.words.insert(word.lexeme.to_string(), word);
    }

    fn location(&self, offset: usize) -> SourceLocation {
        let source = self.raw.source();
        let column = source.get(self.line_start..offset).map_or(0, |s| s.chars().count());
        SourceLocation::new(self.line, column + 1)
    }

    /// Returns the next token, or an end token once the input is exhausted.
    ///
    /// Never fails: a character that starts no token comes back as a
    /// `Tag::Char` token and is left for the parser to reject.
    pub fn scan(&mut self) -> Token {
        loop {
            let next = self.raw.next();
            let span = self.raw.span();
            let loc = self.location(span.start);
            let token = match next {
                None => Token::end(self.location(self.raw.source().len())),
                Some(Ok(Raw::Newline)) => {
                    self.line += 1;
                    self.line_start = span.end;
                    continue;
                }
                Some(Ok(Raw::Num(value))) => Token::num(value, loc),
                Some(Ok(Raw::Real(value))) => Token::real(value, self.raw.slice(), loc),
                Some(Ok(Raw::Word)) => {
                    let text = self.raw.slice();
                    self.word(text, loc)
                }
                Some(Ok(Raw::AndAnd)) => Token::word(Rc::new(Word::new("&&", Tag::And)), loc),
                Some(Ok(Raw::OrOr)) => Token::word(Rc::new(Word::new("||", Tag::Or)), loc),
                Some(Ok(Raw::EqEq)) => Token::word(Rc::new(Word::new("==", Tag::Eq)), loc),
                Some(Ok(Raw::NotEq)) => Token::word(Rc::new(Word::new("!=", Tag::Ne)), loc),
                Some(Ok(Raw::LessEq)) => Token::word(Rc::new(Word::new("<=", Tag::Le)), loc),
                Some(Ok(Raw::GreaterEq)) => Token::word(Rc::new(Word::new(">=", Tag::Ge)), loc),
                Some(Ok(Raw::Punct(c))) => Token::char(c, loc),
                Some(Err(())) => match self.raw.slice().chars().next() {
                    Some(c) => Token::char(c, loc),
                    None => continue,
                },
            };
            trace!("scanned {:?} {:?} at {}", token.tag(), token.lexeme, token.loc);
            return token;
        }
    }

    fn word(&mut self, text: &str, loc: SourceLocation) -> Token {
        let word = match self.words.get(text) {
            Some(word) => Rc::clone(word),
            None => {
                trace!("registering identifier `{}`", text);
                let word = Rc::new(Word::new(text, Tag::Id));
                self.reserve(Rc::clone(&word));
                word
            }
        };
        Token::word(word, loc)
    }
}

/// Scans the whole source. The trailing end token is not included.
pub fn tokenize(src: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(src);
    let mut out = Vec::new();
    loop {
        let tok = lexer.scan();
        if tok.tag() == Tag::End {
            break;
        }
        out.push(tok);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(src: &str) -> Vec<Tag> {
        tokenize(src).iter().map(Token::tag).collect()
    }

    #[test]
    fn recognizes_keywords() {
        assert_eq!(tags("if else while"), vec![Tag::If, Tag::Else, Tag::While]);
        assert_eq!(tags("do break true false"), vec![Tag::Do, Tag::Break, Tag::True, Tag::False]);
    }

    #[test]
    fn recognizes_integer() {
        let toks = tokenize("123");
        assert_eq!(toks.len(), 1);
        assert_eq!(toks[0].kind, TokenKind::Num(123));
        assert_eq!(&*toks[0].lexeme, "123");
    }

    #[test]
    fn recognizes_float() {
        let toks = tokenize("3.14");
        match toks[0].kind {
            TokenKind::Real(v) => assert!((v - 3.14).abs() < 1e-6),
            ref other => panic!("expected real, found {:?}", other),
        }
        assert_eq!(toks[0].tag(), Tag::Real);
        assert_eq!(&*toks[0].lexeme, "3.14");
    }

    #[test]
    fn trailing_dot_is_still_a_float() {
        let toks = tokenize("3. 7");
        assert_eq!(toks[0].kind, TokenKind::Real(3.0));
        assert_eq!(toks[1].kind, TokenKind::Num(7));
    }

    #[test]
    fn recognizes_identifier() {
        let toks = tokenize("hello");
        assert_eq!(toks[0].tag(), Tag::Id);
        assert_eq!(&*toks[0].lexeme, "hello");
    }

    #[test]
    fn identifiers_are_memoised_with_fresh_locations() {
        let toks = tokenize("count\n  count");
        let (a, b) = (toks[0].as_word().unwrap(), toks[1].as_word().unwrap());
        assert!(Rc::ptr_eq(a, b));
        assert_eq!(toks[0].loc, SourceLocation::new(1, 1));
        assert_eq!(toks[1].loc, SourceLocation::new(2, 3));
    }

    #[test]
    fn basic_types_carry_their_type() {
        let toks = tokenize("int float bool char");
        let basics: Vec<_> = toks.iter().map(|t| t.as_word().and_then(|w| w.basic.clone())).collect();
        assert_eq!(basics, vec![Some(Type::Int), Some(Type::Float), Some(Type::Bool), Some(Type::Char)]);
        assert!(toks.iter().all(|t| t.tag() == Tag::Basic));
    }

    #[test]
    fn keywords_are_stable_across_lexers() {
        assert_eq!(tags("int while x"), tags("int while x"));
    }

    #[test]
    fn two_char_operators_fall_back_to_single() {
        assert_eq!(
            tags("&& || == != <= >= & | = ! < >"),
            vec![
                Tag::And,
                Tag::Or,
                Tag::Eq,
                Tag::Ne,
                Tag::Le,
                Tag::Ge,
                Tag::Char('&'),
                Tag::Char('|'),
                Tag::Char('='),
                Tag::Char('!'),
                Tag::Char('<'),
                Tag::Char('>'),
            ]
        );
        assert_eq!(tags("a<b"), vec![Tag::Id, Tag::Char('<'), Tag::Id]);
        assert_eq!(tags("a<=b"), vec![Tag::Id, Tag::Le, Tag::Id]);
    }

    #[test]
    fn unknown_characters_become_char_tokens() {
        assert_eq!(tags("@ x_1"), vec![Tag::Char('@'), Tag::Id, Tag::Char('_'), Tag::Num]);
    }

    #[test]
    fn locations_track_lines_and_columns() {
        let toks = tokenize("{\n\tint x;\n}");
        let locs: Vec<_> = toks.iter().map(|t| (t.loc.line, t.loc.column)).collect();
        assert_eq!(locs, vec![(1, 1), (2, 2), (2, 6), (2, 7), (3, 1)]);
    }

    #[test]
    fn end_of_input_repeats() {
        let mut lexer = Lexer::new("x");
        assert_eq!(lexer.scan().tag(), Tag::Id);
        assert_eq!(lexer.scan().tag(), Tag::End);
        assert_eq!(lexer.scan().tag(), Tag::End);
    }

    #[test]
    fn huge_integers_saturate() {
        assert_eq!(tokenize("99999999999999999999999")[0].kind, TokenKind::Num(i64::MAX));
    }
}
