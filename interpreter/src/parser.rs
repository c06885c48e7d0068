use std::rc::Rc;

use lpp_core::{tokenize, Token, TokenStream, Type};
use tracing::debug;

use crate::ast::{Block, Expr, Program, Stmt};
use crate::error::ParseError;

// Helper alias for shorter return types
type ParseResult<T> = Result<T, ParseError>;
type PrefixFn = fn(&mut Parser) -> ParseResult<Expr>;
type InfixFn = fn(&mut Parser, Expr) -> ParseResult<Expr>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    None,
    Assignment,
    Logical,
    Equality,
    Comparison,
    Term,
    Factor,
    Power,
    Prefix,
    Call,
}

impl Precedence {
    fn next(&self) -> Self {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Logical,
            Precedence::Logical => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Power,
            Precedence::Power => Precedence::Prefix,
            Precedence::Prefix => Precedence::Call,
            Precedence::Call => Precedence::Call,
        }
    }
}

struct ParseRule {
    prefix: Option<PrefixFn>,
    infix: Option<InfixFn>,
    precedence: Precedence,
}

impl ParseRule {
    fn new(prefix: Option<PrefixFn>, infix: Option<InfixFn>, precedence: Precedence) -> Self {
        ParseRule {
            prefix,
            infix,
            precedence,
        }
    }
}

pub struct Parser {
    stream: TokenStream,
    curr: Token,
    prev: Token,
    errs: Vec<ParseError>,
}

/// Parses `src` in one go. The program is only handed out when no syntax error was found.
pub fn parse(src: &str) -> Result<Program, Vec<ParseError>> {
    let mut parser = Parser::new(tokenize(src));
    let program = parser.parse_program();

    if parser.errs.is_empty() {
        Ok(program)
    } else {
        Err(parser.errs)
    }
}

impl Parser {
    // A Pratt parser's table translated as a match. The first column maps a token type to the
    // function parsing an expression that starts with it, the second to the function continuing
    // an expression when the token follows one. The third column is the binding strength of the
    // token when used in the infix position.
    fn rule(ty: Type) -> ParseRule {
        match ty {
            Type::LeftParen => {
                ParseRule::new(Some(Self::grouping), Some(Self::call), Precedence::Call)
            }
            Type::LeftBracket => {
                ParseRule::new(Some(Self::array), Some(Self::index), Precedence::Call)
            }
            Type::LeftBrace => ParseRule::new(Some(Self::map), None, Precedence::None),
            Type::Colon => ParseRule::new(None, Some(Self::method), Precedence::Call),
            Type::Increment | Type::Decrement => {
                ParseRule::new(None, Some(Self::suffix), Precedence::Call)
            }
            Type::Minus => ParseRule::new(Some(Self::prefix), Some(Self::binary), Precedence::Term),
            Type::Bang => ParseRule::new(Some(Self::prefix), None, Precedence::None),
            Type::Plus | Type::PlusAssign | Type::MinusAssign => {
                ParseRule::new(None, Some(Self::binary), Precedence::Term)
            }
            Type::Star | Type::Slash | Type::Percent | Type::StarAssign | Type::SlashAssign => {
                ParseRule::new(None, Some(Self::binary), Precedence::Factor)
            }
            Type::Power => ParseRule::new(None, Some(Self::power), Precedence::Power),
            Type::EqualEqual | Type::BangEqual => {
                ParseRule::new(None, Some(Self::binary), Precedence::Equality)
            }
            Type::Less | Type::Greater | Type::LessEqual | Type::GreaterEqual => {
                ParseRule::new(None, Some(Self::binary), Precedence::Comparison)
            }
            Type::And | Type::Or => ParseRule::new(None, Some(Self::binary), Precedence::Logical),
            Type::Assign => ParseRule::new(None, Some(Self::reassign), Precedence::Assignment),
            Type::Identifier => ParseRule::new(Some(Self::identifier), None, Precedence::None),
            Type::Int => ParseRule::new(Some(Self::integer), None, Precedence::None),
            Type::Float => ParseRule::new(Some(Self::float), None, Precedence::None),
            Type::Str => ParseRule::new(Some(Self::string), None, Precedence::None),
            Type::True | Type::False => {
                ParseRule::new(Some(Self::boolean), None, Precedence::None)
            }
            Type::Null => ParseRule::new(Some(Self::null), None, Precedence::None),
            Type::Function => ParseRule::new(Some(Self::function), None, Precedence::None),
            Type::If => ParseRule::new(Some(Self::if_expression), None, Precedence::None),
            Type::While => ParseRule::new(Some(Self::while_expression), None, Precedence::None),
            Type::For => ParseRule::new(Some(Self::for_expression), None, Precedence::None),
            Type::RightParen
            | Type::RightBrace
            | Type::RightBracket
            | Type::Comma
            | Type::SemiColon
            | Type::Dot
            | Type::Arrow
            | Type::Var
            | Type::Return
            | Type::Else
            | Type::In
            | Type::Illegal
            | Type::Eof => ParseRule::new(None, None, Precedence::None),
        }
    }

    pub fn new(mut stream: TokenStream) -> Self {
        let curr = stream.next_token();
        Parser {
            stream,
            prev: curr.clone(),
            curr,
            errs: Vec::new(),
        }
    }

    /// Parses statements until the end of input. A statement with a syntax error is recorded in
    /// `errors()` and left out of the program, parsing then carries on with the next statement.
    pub fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();

        while !self.check(Type::Eof) {
            if self.match_type(Type::SemiColon) {
                continue;
            }

            match self.statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    debug!(%err, "syntax error recorded");
                    self.errs.push(err);
                    self.synchronize();
                }
            }
        }

        Program { statements }
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errs
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        if self.match_type(Type::Var) {
            self.let_statement()
        } else if self.match_type(Type::Return) {
            self.return_statement()
        } else if self.match_type(Type::If) {
            self.construct_statement(Self::if_expression)
        } else if self.match_type(Type::While) {
            self.construct_statement(Self::while_expression)
        } else if self.match_type(Type::For) {
            self.construct_statement(Self::for_expression)
        } else {
            self.expression_statement()
        }
    }

    fn let_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.prev.clone();
        let name = self
            .consume(Type::Identifier, "Se esperaba un identificador después de 'var'.")?
            .clone();
        self.consume(Type::Assign, "Se esperaba '=' después del nombre de la variable.")?;
        let value = self.expression()?;
        self.consume(
            Type::SemiColon,
            "Se esperaba ';' al final de la declaración de variable.",
        )?;

        Ok(Stmt::Let {
            keyword,
            name,
            value,
        })
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.prev.clone();
        let value = self.expression()?;
        self.match_type(Type::SemiColon);
        Ok(Stmt::Return { keyword, value })
    }

    // `si`, `mientras` and `por` at the start of a statement. Their keyword is already consumed,
    // and unlike other expression statements they are never continued by an infix operator.
    fn construct_statement(&mut self, construct: PrefixFn) -> ParseResult<Stmt> {
        let token = self.prev.clone();
        let expression = construct(self)?;
        self.match_type(Type::SemiColon);
        Ok(Stmt::expression(token, expression))
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let token = self.curr.clone();
        let expression = self.expression()?;
        self.match_type(Type::SemiColon);
        Ok(Stmt::expression(token, expression))
    }

    fn block(&mut self) -> ParseResult<Block> {
        let token = self
            .consume(Type::LeftBrace, "Se esperaba '{' al inicio del bloque.")?
            .clone();

        let mut statements = Vec::new();
        while !self.check(Type::RightBrace) && !self.check(Type::Eof) {
            if self.match_type(Type::SemiColon) {
                continue;
            }
            statements.push(self.statement()?);
        }

        self.consume(Type::RightBrace, "Se esperaba '}' al final del bloque.")?;
        Ok(Block { token, statements })
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.parse_precedence(Precedence::Assignment)
    }

    // Parses an expression whose operators bind at least as strongly as `precedence`.
    // The first token always starts a prefix expression, otherwise it's a syntax error. After
    // that, as long as the next token is an infix operator binding at least as strongly as
    // `precedence`, the expression parsed so far becomes its left operand.
    fn parse_precedence(&mut self, precedence: Precedence) -> ParseResult<Expr> {
        self.advance();

        let mut expr = match Self::rule(self.prev.ty).prefix {
            Some(prefix) => prefix(self)?,
            None => {
                return Err(self.error_at_prev(&format!(
                    "Se esperaba una expresión, se obtuvo {}.",
                    describe(&self.prev)
                )))
            }
        };

        while precedence <= Self::rule(self.curr.ty).precedence {
            self.advance();
            match Self::rule(self.prev.ty).infix {
                Some(infix) => expr = infix(self, expr)?,
                None => break,
            }
        }

        Ok(expr)
    }

    fn identifier(&mut self) -> ParseResult<Expr> {
        Ok(Expr::Identifier {
            name: self.prev.clone(),
        })
    }

    fn integer(&mut self) -> ParseResult<Expr> {
        let token = self.prev.clone();
        match token.lexeme.parse::<i64>() {
            Ok(value) => Ok(Expr::Integer { token, value }),
            Err(_) => Err(self.error_at_prev(&format!(
                "No se pudo interpretar '{}' como entero.",
                token.lexeme
            ))),
        }
    }

    fn float(&mut self) -> ParseResult<Expr> {
        let token = self.prev.clone();
        match token.lexeme.parse::<f64>() {
            Ok(value) => Ok(Expr::Float { token, value }),
            Err(_) => Err(self.error_at_prev(&format!(
                "No se pudo interpretar '{}' como decimal.",
                token.lexeme
            ))),
        }
    }

    fn string(&mut self) -> ParseResult<Expr> {
        Ok(Expr::Str {
            token: self.prev.clone(),
        })
    }

    fn boolean(&mut self) -> ParseResult<Expr> {
        let token = self.prev.clone();
        let value = token.ty == Type::True;
        Ok(Expr::Boolean { token, value })
    }

    fn null(&mut self) -> ParseResult<Expr> {
        Ok(Expr::Null {
            token: self.prev.clone(),
        })
    }

    fn prefix(&mut self) -> ParseResult<Expr> {
        let operator = self.prev.clone();
        let right = self.parse_precedence(Precedence::Prefix)?;
        Ok(Expr::prefix(operator, right))
    }

    fn grouping(&mut self) -> ParseResult<Expr> {
        let expr = self.expression()?;
        self.consume(Type::RightParen, "Se esperaba ')' después de la expresión.")?;
        Ok(expr)
    }

    fn array(&mut self) -> ParseResult<Expr> {
        let token = self.prev.clone();
        let elements = self.expression_list(Type::RightBracket, "Se esperaba ']' al final de la lista.")?;
        Ok(Expr::Array { token, elements })
    }

    fn map(&mut self) -> ParseResult<Expr> {
        let token = self.prev.clone();
        let mut pairs = Vec::new();

        if !self.check(Type::RightBrace) {
            loop {
                let key = self.expression()?;
                self.consume(Type::Arrow, "Se esperaba '=>' después de la llave.")?;
                let value = self.expression()?;
                pairs.push((key, value));

                if !self.match_type(Type::Comma) {
                    break;
                }
            }
        }

        self.consume(Type::RightBrace, "Se esperaba '}' al final del diccionario.")?;
        Ok(Expr::Map { token, pairs })
    }

    fn function(&mut self) -> ParseResult<Expr> {
        let token = self.prev.clone();
        self.consume(Type::LeftParen, "Se esperaba '(' después de 'funcion'.")?;

        let mut params = Vec::new();
        if !self.check(Type::RightParen) {
            loop {
                params.push(
                    self.consume(Type::Identifier, "Se esperaba el nombre de un parámetro.")?
                        .clone(),
                );
                if !self.match_type(Type::Comma) {
                    break;
                }
            }
        }

        self.consume(Type::RightParen, "Se esperaba ')' después de los parámetros.")?;
        let body = self.block()?;

        Ok(Expr::Function {
            token,
            params: Rc::new(params),
            body: Rc::new(body),
        })
    }

    fn if_expression(&mut self) -> ParseResult<Expr> {
        let token = self.prev.clone();
        let condition = self.condition("si")?;
        let consequence = self.block()?;

        let alternative = if self.match_type(Type::Else) {
            if self.match_type(Type::If) {
                // `si_no si (...)` chains: the nested `si` becomes the only statement of the
                // alternative block.
                let else_token = self.prev.clone();
                let nested = self.if_expression()?;
                Some(Block {
                    token: else_token.clone(),
                    statements: vec![Stmt::expression(else_token, nested)],
                })
            } else {
                Some(self.block()?)
            }
        } else {
            None
        };

        Ok(Expr::If {
            token,
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn while_expression(&mut self) -> ParseResult<Expr> {
        let token = self.prev.clone();
        let condition = self.condition("mientras")?;
        let body = self.block()?;

        Ok(Expr::While {
            token,
            condition: Box::new(condition),
            body,
        })
    }

    fn for_expression(&mut self) -> ParseResult<Expr> {
        let token = self.prev.clone();
        self.consume(Type::LeftParen, "Se esperaba '(' después de 'por'.")?;
        let condition = self.range()?;
        self.consume(Type::RightParen, "Se esperaba ')' después del rango.")?;
        let body = self.block()?;

        Ok(Expr::For {
            token,
            condition: Box::new(condition),
            body,
        })
    }

    // `identificador en expresion`, only valid inside a `por (...)` header.
    fn range(&mut self) -> ParseResult<Expr> {
        let variable = self
            .consume(Type::Identifier, "Se esperaba la variable del ciclo.")?
            .clone();
        let keyword = self
            .consume(Type::In, "Se esperaba 'en' después de la variable del ciclo.")?
            .clone();
        let iterable = self.expression()?;

        Ok(Expr::Range {
            variable,
            keyword,
            iterable: Box::new(iterable),
        })
    }

    fn condition(&mut self, keyword: &str) -> ParseResult<Expr> {
        self.consume(
            Type::LeftParen,
            &format!("Se esperaba '(' después de '{}'.", keyword),
        )?;
        let condition = self.expression()?;
        self.consume(Type::RightParen, "Se esperaba ')' después de la condición.")?;
        Ok(condition)
    }

    fn binary(&mut self, left: Expr) -> ParseResult<Expr> {
        let operator = self.prev.clone();
        let is_compound = matches!(
            operator.ty,
            Type::PlusAssign | Type::MinusAssign | Type::StarAssign | Type::SlashAssign
        );
        if is_compound && !left.is_assignable() {
            return Err(self.error_at_prev(&format!(
                "Objetivo de asignación inválido: {}",
                left
            )));
        }

        // The right operand must bind tighter than the operator itself, so "2 + 3 * 10" parses
        // "3 * 10" as a whole, while "1 - 2 - 3" stops at the second "-" and stays left
        // associative. Compound assignments take a whole expression on the right, like `=`.
        let precedence = if is_compound {
            Precedence::Assignment
        } else {
            Self::rule(operator.ty).precedence.next()
        };
        let right = self.parse_precedence(precedence)?;
        Ok(Expr::infix(left, operator, right))
    }

    // `**` is exponentiation when followed by an operand, and squares its left side otherwise.
    fn power(&mut self, left: Expr) -> ParseResult<Expr> {
        if Self::rule(self.curr.ty).prefix.is_none() {
            return self.suffix(left);
        }

        self.binary(left)
    }

    fn suffix(&mut self, left: Expr) -> ParseResult<Expr> {
        Ok(Expr::suffix(left, self.prev.clone()))
    }

    fn reassign(&mut self, target: Expr) -> ParseResult<Expr> {
        let equals = self.prev.clone();
        if !target.is_assignable() {
            return Err(self.error_at_prev(&format!(
                "Objetivo de asignación inválido: {}",
                target
            )));
        }

        // Same precedence again instead of the next one, "a = b = c" groups to the right.
        let value = self.parse_precedence(Precedence::Assignment)?;
        Ok(Expr::reassign(target, equals, value))
    }

    fn call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let paren = self.prev.clone();
        let args = self.expression_list(Type::RightParen, "Se esperaba ')' después de los argumentos.")?;
        Ok(Expr::call(callee, paren, args))
    }

    fn index(&mut self, left: Expr) -> ParseResult<Expr> {
        let bracket = self.prev.clone();
        let index = self.expression()?;
        self.consume(Type::RightBracket, "Se esperaba ']' después del índice.")?;
        Ok(Expr::index(left, bracket, index))
    }

    // `receptor:metodo(args)`. The right side has to be a call on a plain name, so that chains
    // like `a:b():c()` stay left associative.
    fn method(&mut self, receiver: Expr) -> ParseResult<Expr> {
        let colon = self.prev.clone();
        let name = self
            .consume(Type::Identifier, "Se esperaba el nombre de un método después de ':'.")?
            .clone();
        self.consume(Type::LeftParen, "Se esperaba '(' después del nombre del método.")?;
        let paren = self.prev.clone();
        let args = self.expression_list(Type::RightParen, "Se esperaba ')' después de los argumentos.")?;

        let call = Expr::call(Expr::identifier(name), paren, args);
        Ok(Expr::method(receiver, colon, call))
    }

    fn expression_list(&mut self, end: Type, msg: &str) -> ParseResult<Vec<Expr>> {
        let mut items = Vec::new();
        if !self.check(end) {
            loop {
                items.push(self.expression()?);
                if !self.match_type(Type::Comma) {
                    break;
                }
            }
        }

        self.consume(end, msg)?;
        Ok(items)
    }

    // Skip tokens after a syntax error until something that looks like the start of the next
    // statement: right after a ';' or at a statement keyword.
    fn synchronize(&mut self) {
        while !self.check(Type::Eof) {
            if self.prev.ty == Type::SemiColon {
                return;
            }

            match self.curr.ty {
                Type::Var | Type::Return | Type::If | Type::While | Type::For => return,
                _ => self.advance(),
            }
        }
    }

    fn advance(&mut self) {
        let next = self.stream.next_token();
        self.prev = std::mem::replace(&mut self.curr, next);
    }

    fn check(&self, ty: Type) -> bool {
        self.curr.ty == ty
    }

    fn match_type(&mut self, ty: Type) -> bool {
        if self.check(ty) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, ty: Type, msg: &str) -> ParseResult<&Token> {
        if self.check(ty) {
            self.advance();
            Ok(&self.prev)
        } else {
            Err(self.error_at_curr(msg))
        }
    }

    fn error_at_curr(&self, msg: &str) -> ParseError {
        ParseError::new(
            &self.curr,
            &format!("{} Se obtuvo {}.", msg, describe(&self.curr)),
        )
    }

    fn error_at_prev(&self, msg: &str) -> ParseError {
        ParseError::new(&self.prev, msg)
    }
}

fn describe(token: &Token) -> String {
    match token.ty {
        Type::Eof => token.ty.to_string(),
        _ => format!("'{}'", token.lexeme),
    }
}
