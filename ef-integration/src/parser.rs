//! A minimal s-expression reader for the REPL's goal surface syntax (§6.2's
//! term-construction interface, exposed as text). Not part of the core: the
//! core takes terms built directly against `ef_ir::Store` (as every test in
//! this workspace does); this is the thin front end `ef-repl` needs to take
//! a line of user input and turn it into one.
//!
//! Grammar (symbols are case-sensitive, parens required, quantifiers bind
//! one variable each):
//!
//! ```text
//! formula  := "(" "forall" "(" ID WIDTH ")" formula ")"
//!           | "(" "exists" "(" ID WIDTH ")" formula ")"
//!           | "(" op formula+ ")"
//!           | "(" "not" formula ")"
//!           | "(" "slice" formula HI LO ")"
//!           | "(" "const" WIDTH VALUE ")"
//!           | ID
//! op       := "and" | "or" | "xor" | "add" | "sub" | "mul" | "udiv" | "urem"
//!           | "sll" | "srl" | "ult" | "ulte" | "=" | "eq" | "ite"
//! ```
use crate::error::{IntegrationError, Result};
use ef_ir::{BinOp, ChildRef, QuantKind, Sort, Store, TermId, VarRole};

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    LParen,
    RParen,
    Atom(String),
}

fn tokenize(input: &str) -> Vec<(usize, Tok)> {
    let mut out = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some(&(pos, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                out.push((pos, Tok::LParen));
                chars.next();
            }
            ')' => {
                out.push((pos, Tok::RParen));
                chars.next();
            }
            _ => {
                let start = pos;
                let mut end = pos;
                while let Some(&(p, c)) = chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' {
                        break;
                    }
                    end = p + c.len_utf8();
                    chars.next();
                }
                out.push((start, Tok::Atom(input[start..end].to_string())));
            }
        }
    }
    out
}

/// A bound-variable scope: a simple association list searched from the end,
/// so an inner binder shadows an outer one of the same name.
struct Scope {
    vars: Vec<(String, TermId)>,
}

impl Scope {
    fn new() -> Scope {
        Scope { vars: Vec::new() }
    }

    fn lookup(&self, name: &str) -> Option<TermId> {
        self.vars.iter().rev().find(|(n, _)| n == name).map(|(_, id)| *id)
    }
}

struct Parser<'a> {
    toks: Vec<(usize, Tok)>,
    pos: usize,
    store: &'a mut Store,
    scope: Scope,
}

impl<'a> Parser<'a> {
    fn err(&self, msg: impl Into<String>) -> IntegrationError {
        let pos = self.toks.get(self.pos).map(|(p, _)| *p).unwrap_or(usize::MAX);
        IntegrationError::Parse { pos, msg: msg.into() }
    }

    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos).map(|(_, t)| t)
    }

    fn bump(&mut self) -> Option<Tok> {
        let t = self.toks.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        t
    }

    fn expect(&mut self, want: &Tok) -> Result<()> {
        match self.bump() {
            Some(ref t) if t == want => Ok(()),
            other => Err(self.err(format!("expected {:?}, found {:?}", want, other))),
        }
    }

    fn expect_atom(&mut self) -> Result<String> {
        match self.bump() {
            Some(Tok::Atom(s)) => Ok(s),
            other => Err(self.err(format!("expected an atom, found {:?}", other))),
        }
    }

    fn expect_u32(&mut self) -> Result<u32> {
        let s = self.expect_atom()?;
        s.parse::<u32>()
            .map_err(|_| self.err(format!("expected a number, found `{}`", s)))
    }

    fn parse_formula(&mut self) -> Result<ChildRef> {
        match self.peek() {
            Some(Tok::Atom(_)) => {
                let name = self.expect_atom()?;
                let id = self
                    .scope
                    .lookup(&name)
                    .ok_or_else(|| IntegrationError::UnboundVariable(name.clone()))?;
                Ok(ChildRef::pos(id))
            }
            Some(Tok::LParen) => self.parse_list(),
            other => Err(self.err(format!("expected a formula, found {:?}", other))),
        }
    }

    fn parse_list(&mut self) -> Result<ChildRef> {
        self.expect(&Tok::LParen)?;
        let head = self.expect_atom()?;
        let result = match head.as_str() {
            "forall" | "exists" => self.parse_quantifier(&head)?,
            "not" => {
                let arg = self.parse_formula()?;
                arg.inverted()
            }
            "neg" => {
                let arg = self.parse_formula()?;
                ChildRef::pos(self.store.mk_neg(arg)?)
            }
            "slice" => {
                let arg = self.parse_formula()?;
                let hi = self.expect_u32()?;
                let lo = self.expect_u32()?;
                ChildRef::pos(self.store.mk_slice(arg, hi, lo)?)
            }
            "const" => {
                let width = self.expect_u32()?;
                let value = self.expect_u32()?;
                ChildRef::pos(self.store.mk_const(ef_ir::BvValue::from_u64(width, value as u64)))
            }
            "ite" => {
                let cond = self.parse_formula()?;
                let then_ = self.parse_formula()?;
                let else_ = self.parse_formula()?;
                ChildRef::pos(self.store.mk_cond(cond, then_, else_)?)
            }
            _ => self.parse_binop(&head)?,
        };
        self.expect(&Tok::RParen)?;
        Ok(result)
    }

    fn parse_binop(&mut self, head: &str) -> Result<ChildRef> {
        let op = match head {
            "and" => BinOp::And,
            "or" => BinOp::Or,
            "xor" => BinOp::Xor,
            "add" => BinOp::Add,
            "sub" => BinOp::Sub,
            "mul" => BinOp::Mul,
            "udiv" => BinOp::Udiv,
            "urem" => BinOp::Urem,
            "sll" => BinOp::Sll,
            "srl" => BinOp::Srl,
            "ult" => BinOp::Ult,
            "ulte" => BinOp::Ulte,
            "=" | "eq" => BinOp::Eq,
            other => return Err(self.err(format!("unknown operator `{}`", other))),
        };
        let mut acc = self.parse_formula()?;
        loop {
            if matches!(self.peek(), Some(Tok::RParen)) {
                break;
            }
            let next = self.parse_formula()?;
            acc = ChildRef::pos(self.store.mk_bin(op, acc, next)?);
        }
        Ok(acc)
    }

    fn parse_quantifier(&mut self, head: &str) -> Result<ChildRef> {
        self.expect(&Tok::LParen)?;
        let name = self.expect_atom()?;
        let width = self.expect_u32()?;
        self.expect(&Tok::RParen)?;

        let role = if head == "forall" {
            VarRole::Universal
        } else {
            VarRole::Existential
        };
        let param = self.store.fresh_param(Sort::bv(width), &name, role);
        self.scope.vars.push((name, param));
        let body = self.parse_formula()?;
        self.scope.vars.pop();

        let kind = if head == "forall" { QuantKind::Forall } else { QuantKind::Exists };
        Ok(ChildRef::pos(self.store.mk_quantifier(kind, param, body)))
    }
}

/// Parses one formula from `input`, allocating every node (including fresh
/// quantifier parameters) into `store`. Returns the root's `TermId` with its
/// own polarity resolved (a bare `(not X)` at top level returns `X`'s node
/// inverted through `ef_ir`'s NOT-is-a-tag convention applied once more by
/// the caller, since a formula root must be a concrete id, not a `ChildRef`,
/// to be handed to `ef_driver::solve`).
pub fn parse_formula(store: &mut Store, input: &str) -> Result<TermId> {
    let toks = tokenize(input);
    let mut parser = Parser {
        toks,
        pos: 0,
        store,
        scope: Scope::new(),
    };
    let root = parser.parse_formula()?;
    if parser.pos != parser.toks.len() {
        return Err(parser.err("trailing input after a complete formula"));
    }
    if root.polarity.is_neg() {
        return Err(parser.err("a top-level negated formula is not supported; wrap it in `(not ...)` inside a quantifier body instead"));
    }
    Ok(root.id)
}
