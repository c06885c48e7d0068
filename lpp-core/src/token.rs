use std::fmt::{Display, Formatter};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    SemiColon,
    Colon,
    Dot,

    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Less,
    Greater,

    EqualEqual,
    BangEqual,
    LessEqual,
    GreaterEqual,
    And,
    Or,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    Increment,
    Decrement,
    Power,
    Arrow,

    Identifier,
    Int,
    Float,
    Str,

    Var,
    Function,
    Return,
    If,
    Else,
    While,
    For,
    In,
    True,
    False,
    Null,

    Illegal,
    Eof,
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Type::LeftParen => "(",
            Type::RightParen => ")",
            Type::LeftBrace => "{",
            Type::RightBrace => "}",
            Type::LeftBracket => "[",
            Type::RightBracket => "]",
            Type::Comma => ",",
            Type::SemiColon => ";",
            Type::Colon => ":",
            Type::Dot => ".",
            Type::Assign => "=",
            Type::Plus => "+",
            Type::Minus => "-",
            Type::Star => "*",
            Type::Slash => "/",
            Type::Percent => "%",
            Type::Bang => "!",
            Type::Less => "<",
            Type::Greater => ">",
            Type::EqualEqual => "==",
            Type::BangEqual => "!=",
            Type::LessEqual => "<=",
            Type::GreaterEqual => ">=",
            Type::And => "&&",
            Type::Or => "||",
            Type::PlusAssign => "+=",
            Type::MinusAssign => "-=",
            Type::StarAssign => "*=",
            Type::SlashAssign => "/=",
            Type::Increment => "++",
            Type::Decrement => "--",
            Type::Power => "**",
            Type::Arrow => "=>",
            Type::Identifier => "identificador",
            Type::Int => "entero",
            Type::Float => "decimal",
            Type::Str => "texto",
            Type::Var => "var",
            Type::Function => "funcion",
            Type::Return => "regresa",
            Type::If => "si",
            Type::Else => "si_no",
            Type::While => "mientras",
            Type::For => "por",
            Type::In => "en",
            Type::True => "verdadero",
            Type::False => "falso",
            Type::Null => "nulo",
            Type::Illegal => "ilegal",
            Type::Eof => "fin de archivo",
        };

        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub ty: Type,
    pub lexeme: String,
    pub line: usize,
    pub col: usize,
}

impl Token {
    pub fn new(ty: Type, lexeme: String, line: usize, col: usize) -> Self {
        Token {
            ty,
            lexeme,
            line,
            col,
        }
    }
}
