use std::fmt::{Display, Formatter};
use std::rc::Rc;

use lpp_core::Token;

use crate::error::Control;

// Tokens are cloned into the nodes during parsing. Function bodies are the only part of the tree
// that outlives a single evaluation pass (closures keep them), so they are behind an `Rc` and
// shared instead of cloned.

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub token: Token,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let {
        keyword: Token,
        name: Token,
        value: Expr,
    },
    Return { keyword: Token, value: Expr },
    Expression { token: Token, expression: Expr },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Identifier {
        name: Token,
    },
    Integer {
        token: Token,
        value: i64,
    },
    Float {
        token: Token,
        value: f64,
    },
    Boolean {
        token: Token,
        value: bool,
    },
    Str {
        token: Token,
    },
    Null {
        token: Token,
    },
    Prefix {
        operator: Token,
        right: Box<Expr>,
    },
    Infix {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Suffix {
        left: Box<Expr>,
        operator: Token,
    },
    Function {
        token: Token,
        params: Rc<Vec<Token>>,
        body: Rc<Block>,
    },
    Call {
        callee: Box<Expr>,
        paren: Token,
        args: Vec<Expr>,
    },
    Array {
        token: Token,
        elements: Vec<Expr>,
    },
    Index {
        left: Box<Expr>,
        bracket: Token,
        index: Box<Expr>,
    },
    Map {
        token: Token,
        pairs: Vec<(Expr, Expr)>,
    },
    Method {
        receiver: Box<Expr>,
        colon: Token,
        call: Box<Expr>,
    },
    Reassign {
        target: Box<Expr>,
        equals: Token,
        value: Box<Expr>,
    },
    Range {
        variable: Token,
        keyword: Token,
        iterable: Box<Expr>,
    },
    If {
        token: Token,
        condition: Box<Expr>,
        consequence: Block,
        alternative: Option<Block>,
    },
    While {
        token: Token,
        condition: Box<Expr>,
        body: Block,
    },
    For {
        token: Token,
        condition: Box<Expr>,
        body: Block,
    },
}

pub(crate) trait ExprVisitor {
    type Item;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Item, Control> {
        match expr {
            Expr::Identifier { name } => self.visit_identifier(name),
            Expr::Integer { value, .. } => self.visit_integer(*value),
            Expr::Float { value, .. } => self.visit_float(*value),
            Expr::Boolean { value, .. } => self.visit_boolean(*value),
            Expr::Str { token } => self.visit_str(&token.lexeme),
            Expr::Null { .. } => self.visit_null(),
            Expr::Prefix { operator, right } => self.visit_prefix(operator, right),
            Expr::Infix {
                left,
                operator,
                right,
            } => self.visit_infix(left, operator, right),
            Expr::Suffix { left, operator } => self.visit_suffix(left, operator),
            Expr::Function { params, body, .. } => self.visit_function(params, body),
            Expr::Call { callee, args, .. } => self.visit_call(callee, args),
            Expr::Array { elements, .. } => self.visit_array(elements),
            Expr::Index { left, index, .. } => self.visit_index(left, index),
            Expr::Map { pairs, .. } => self.visit_map(pairs),
            Expr::Method { receiver, call, .. } => self.visit_method(receiver, call),
            Expr::Reassign { target, value, .. } => self.visit_reassign(target, value),
            Expr::Range {
                variable, iterable, ..
            } => self.visit_range(variable, iterable),
            Expr::If {
                condition,
                consequence,
                alternative,
                ..
            } => self.visit_if(condition, consequence, alternative.as_ref()),
            Expr::While {
                condition, body, ..
            } => self.visit_while(condition, body),
            Expr::For {
                condition, body, ..
            } => self.visit_for(condition, body),
        }
    }

    fn visit_identifier(&mut self, name: &Token) -> Result<Self::Item, Control>;
    fn visit_integer(&mut self, value: i64) -> Result<Self::Item, Control>;
    fn visit_float(&mut self, value: f64) -> Result<Self::Item, Control>;
    fn visit_boolean(&mut self, value: bool) -> Result<Self::Item, Control>;
    fn visit_str(&mut self, value: &str) -> Result<Self::Item, Control>;
    fn visit_null(&mut self) -> Result<Self::Item, Control>;
    fn visit_prefix(&mut self, operator: &Token, right: &Expr) -> Result<Self::Item, Control>;
    fn visit_infix(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> Result<Self::Item, Control>;
    fn visit_suffix(&mut self, left: &Expr, operator: &Token) -> Result<Self::Item, Control>;
    fn visit_function(
        &mut self,
        params: &Rc<Vec<Token>>,
        body: &Rc<Block>,
    ) -> Result<Self::Item, Control>;
    fn visit_call(&mut self, callee: &Expr, args: &[Expr]) -> Result<Self::Item, Control>;
    fn visit_array(&mut self, elements: &[Expr]) -> Result<Self::Item, Control>;
    fn visit_index(&mut self, left: &Expr, index: &Expr) -> Result<Self::Item, Control>;
    fn visit_map(&mut self, pairs: &[(Expr, Expr)]) -> Result<Self::Item, Control>;
    fn visit_method(&mut self, receiver: &Expr, call: &Expr) -> Result<Self::Item, Control>;
    fn visit_reassign(&mut self, target: &Expr, value: &Expr) -> Result<Self::Item, Control>;
    fn visit_range(&mut self, variable: &Token, iterable: &Expr)
        -> Result<Self::Item, Control>;
    fn visit_if(
        &mut self,
        condition: &Expr,
        consequence: &Block,
        alternative: Option<&Block>,
    ) -> Result<Self::Item, Control>;
    fn visit_while(&mut self, condition: &Expr, body: &Block) -> Result<Self::Item, Control>;
    fn visit_for(&mut self, condition: &Expr, body: &Block) -> Result<Self::Item, Control>;
}

pub(crate) trait StmtVisitor {
    type Item;

    fn visit_stmt(&mut self, stmt: &Stmt) -> Result<Self::Item, Control> {
        match stmt {
            Stmt::Let { name, value, .. } => self.visit_let(name, value),
            Stmt::Return { value, .. } => self.visit_return(value),
            Stmt::Expression { expression, .. } => self.visit_expression(expression),
        }
    }

    fn visit_let(&mut self, name: &Token, value: &Expr) -> Result<Self::Item, Control>;
    fn visit_return(&mut self, value: &Expr) -> Result<Self::Item, Control>;
    fn visit_expression(&mut self, expression: &Expr) -> Result<Self::Item, Control>;
    fn visit_block(&mut self, block: &Block) -> Result<Self::Item, Control>;
}

// Creator methods
impl Expr {
    pub(crate) fn identifier(name: Token) -> Self {
        Expr::Identifier { name }
    }

    pub(crate) fn prefix(operator: Token, right: Expr) -> Self {
        Expr::Prefix {
            operator,
            right: Box::new(right),
        }
    }

    pub(crate) fn infix(left: Expr, operator: Token, right: Expr) -> Self {
        Expr::Infix {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    pub(crate) fn suffix(left: Expr, operator: Token) -> Self {
        Expr::Suffix {
            left: Box::new(left),
            operator,
        }
    }

    pub(crate) fn call(callee: Expr, paren: Token, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            paren,
            args,
        }
    }

    pub(crate) fn index(left: Expr, bracket: Token, index: Expr) -> Self {
        Expr::Index {
            left: Box::new(left),
            bracket,
            index: Box::new(index),
        }
    }

    pub(crate) fn method(receiver: Expr, colon: Token, call: Expr) -> Self {
        Expr::Method {
            receiver: Box::new(receiver),
            colon,
            call: Box::new(call),
        }
    }

    pub(crate) fn reassign(target: Expr, equals: Token, value: Expr) -> Self {
        Expr::Reassign {
            target: Box::new(target),
            equals,
            value: Box::new(value),
        }
    }

    /// The lexeme of the token this node was built from.
    pub fn token_literal(&self) -> &str {
        let token = match self {
            Expr::Identifier { name } => name,
            Expr::Integer { token, .. }
            | Expr::Float { token, .. }
            | Expr::Boolean { token, .. }
            | Expr::Str { token }
            | Expr::Null { token }
            | Expr::Function { token, .. }
            | Expr::Array { token, .. }
            | Expr::Map { token, .. }
            | Expr::If { token, .. }
            | Expr::While { token, .. }
            | Expr::For { token, .. } => token,
            Expr::Prefix { operator, .. }
            | Expr::Infix { operator, .. }
            | Expr::Suffix { operator, .. } => operator,
            Expr::Call { paren, .. } => paren,
            Expr::Index { bracket, .. } => bracket,
            Expr::Method { colon, .. } => colon,
            Expr::Reassign { equals, .. } => equals,
            Expr::Range { keyword, .. } => keyword,
        };

        &token.lexeme
    }

    /// Whether the expression can appear on the left of `=` or a compound assignment.
    pub(crate) fn is_assignable(&self) -> bool {
        matches!(self, Expr::Identifier { .. } | Expr::Index { .. })
    }
}

impl Stmt {
    pub(crate) fn expression(token: Token, expression: Expr) -> Self {
        Stmt::Expression { token, expression }
    }

    pub fn token_literal(&self) -> &str {
        match self {
            Stmt::Let { keyword, .. } => &keyword.lexeme,
            Stmt::Return { keyword, .. } => &keyword.lexeme,
            Stmt::Expression { token, .. } => &token.lexeme,
        }
    }
}

impl Program {
    pub fn token_literal(&self) -> &str {
        self.statements
            .first()
            .map(|stmt| stmt.token_literal())
            .unwrap_or("")
    }
}

impl Block {
    pub fn token_literal(&self) -> &str {
        &self.token.lexeme
    }
}

fn join<T: Display>(items: &[T], sep: &str) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<String>>()
        .join(sep)
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", join(&self.statements, " "))
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.statements.is_empty() {
            write!(f, "{{ }}")
        } else {
            write!(f, "{{ {} }}", join(&self.statements, " "))
        }
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Stmt::Let { name, value, .. } => write!(f, "var {} = {};", name.lexeme, value),
            Stmt::Return { value, .. } => write!(f, "regresa {};", value),
            Stmt::Expression { expression, .. } => write!(f, "{};", expression),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Identifier { name } => write!(f, "{}", name.lexeme),
            Expr::Integer { token, .. }
            | Expr::Float { token, .. }
            | Expr::Boolean { token, .. }
            | Expr::Null { token } => write!(f, "{}", token.lexeme),
            Expr::Str { token } => write!(f, "\"{}\"", token.lexeme),
            Expr::Prefix { operator, right } => write!(f, "({}{})", operator.lexeme, right),
            Expr::Infix {
                left,
                operator,
                right,
            } => write!(f, "({} {} {})", left, operator.lexeme, right),
            Expr::Suffix { left, operator } => write!(f, "({}{})", left, operator.lexeme),
            Expr::Function { params, body, .. } => {
                let names: Vec<&str> = params.iter().map(|param| param.lexeme.as_str()).collect();
                write!(f, "funcion({}) {}", names.join(", "), body)
            }
            Expr::Call { callee, args, .. } => write!(f, "{}({})", callee, join(args, ", ")),
            Expr::Array { elements, .. } => write!(f, "[{}]", join(elements, ", ")),
            Expr::Index { left, index, .. } => write!(f, "({}[{}])", left, index),
            Expr::Map { pairs, .. } => {
                let pairs: Vec<String> = pairs
                    .iter()
                    .map(|(key, value)| format!("{} => {}", key, value))
                    .collect();
                write!(f, "{{{}}}", pairs.join(", "))
            }
            Expr::Method { receiver, call, .. } => write!(f, "({}:{})", receiver, call),
            Expr::Reassign { target, value, .. } => write!(f, "({} = {})", target, value),
            Expr::Range {
                variable, iterable, ..
            } => write!(f, "{} en {}", variable.lexeme, iterable),
            Expr::If {
                condition,
                consequence,
                alternative,
                ..
            } => {
                write!(f, "si ({}) {}", condition, consequence)?;
                if let Some(alternative) = alternative {
                    write!(f, " si_no {}", alternative)?;
                }
                Ok(())
            }
            Expr::While {
                condition, body, ..
            } => write!(f, "mientras ({}) {}", condition, body),
            Expr::For {
                condition, body, ..
            } => write!(f, "por ({}) {}", condition, body),
        }
    }
}
