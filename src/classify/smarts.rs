//! Substructure query language (SMARTS subset)
//!
//! Atoms: organic symbols (aliphatic upper case, aromatic lower case), `*`,
//! `a`, `A`, and bracket expressions over `#n`, element symbols, `H<n>`,
//! `D<n>`, `X<n>`, `R`/`R<n>`, `r<n>`, charges, combined with `!`, `&`,
//! `,` and `;` (high-precedence and, or, low-precedence and).
//! Bonds: `- = # : ~ @` combined with `!`, `,`, `&` and `;`. An omitted bond
//! matches single or aromatic.

use crate::canonical::molecule::atomic_number;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid pattern at {position}: {reason}")]
pub struct SmartsError {
    pub position: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AtomPrimitive {
    Any,
    Aromatic,
    Aliphatic,
    /// Element with optional aromaticity constraint
    Element { number: u8, aromatic: Option<bool> },
    /// Total hydrogen count
    HydrogenCount(u8),
    /// Explicit connections
    Degree(u8),
    /// Total connections including hydrogens
    Connectivity(u8),
    /// In any ring (`true`) or none (`false`)
    InRing(bool),
    /// Smallest ring size
    RingSize(u8),
    Charge(i8),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr<P> {
    Primitive(P),
    Not(Box<Expr<P>>),
    And(Box<Expr<P>>, Box<Expr<P>>),
    Or(Box<Expr<P>>, Box<Expr<P>>),
}

impl<P> Expr<P> {
    pub fn eval(&self, test: &impl Fn(&P) -> bool) -> bool {
        match self {
            Self::Primitive(p) => test(p),
            Self::Not(inner) => !inner.eval(test),
            Self::And(a, b) => a.eval(test) && b.eval(test),
            Self::Or(a, b) => a.eval(test) || b.eval(test),
        }
    }

    fn and(a: Self, b: Self) -> Self {
        Self::And(Box::new(a), Box::new(b))
    }

    fn or(a: Self, b: Self) -> Self {
        Self::Or(Box::new(a), Box::new(b))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BondPrimitive {
    Single,
    Double,
    Triple,
    Aromatic,
    Any,
    Ring,
}

pub type AtomExpr = Expr<AtomPrimitive>;
pub type BondExpr = Expr<BondPrimitive>;

#[derive(Debug, Clone, PartialEq)]
pub struct QueryBond {
    pub a: usize,
    pub b: usize,
    pub expr: BondExpr,
}

/// Parsed substructure query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryGraph {
    pub atoms: Vec<AtomExpr>,
    pub bonds: Vec<QueryBond>,
}

impl QueryGraph {
    pub fn parse(pattern: &str) -> Result<Self, SmartsError> {
        SmartsParser::new(pattern).parse()
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Per query atom: (neighbor, bond index)
    pub fn adjacency(&self) -> Vec<Vec<(usize, usize)>> {
        let mut adj = vec![Vec::new(); self.atoms.len()];
        for (idx, bond) in self.bonds.iter().enumerate() {
            adj[bond.a].push((bond.b, idx));
            adj[bond.b].push((bond.a, idx));
        }
        adj
    }
}

fn default_bond() -> BondExpr {
    Expr::or(
        Expr::Primitive(BondPrimitive::Single),
        Expr::Primitive(BondPrimitive::Aromatic),
    )
}

struct SmartsParser {
    chars: Vec<char>,
    pos: usize,
    graph: QueryGraph,
    prev: Option<usize>,
    branches: Vec<Option<usize>>,
    pending_bond: Option<BondExpr>,
    ring_open: BTreeMap<u16, (usize, Option<BondExpr>)>,
}

impl SmartsParser {
    fn new(pattern: &str) -> Self {
        Self {
            chars: pattern.chars().filter(|c| !c.is_whitespace()).collect(),
            pos: 0,
            graph: QueryGraph {
                atoms: Vec::new(),
                bonds: Vec::new(),
            },
            prev: None,
            branches: Vec::new(),
            pending_bond: None,
            ring_open: BTreeMap::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn error(&self, reason: impl Into<String>) -> SmartsError {
        SmartsError {
            position: self.pos,
            reason: reason.into(),
        }
    }

    fn parse(mut self) -> Result<QueryGraph, SmartsError> {
        if self.chars.is_empty() {
            return Err(self.error("empty pattern"));
        }
        while let Some(c) = self.peek() {
            match c {
                '(' => {
                    if self.prev.is_none() {
                        return Err(self.error("branch without a preceding atom"));
                    }
                    self.branches.push(self.prev);
                    self.pos += 1;
                }
                ')' => {
                    if self.pending_bond.is_some() {
                        return Err(self.error("bond before ')'"));
                    }
                    self.prev = self.branches.pop().ok_or_else(|| self.error("unbalanced ')'"))?;
                    self.pos += 1;
                }
                '.' => {
                    self.prev = None;
                    self.pos += 1;
                }
                '-' | '=' | '#' | ':' | '~' | '@' | '!' | '/' | '\\' => {
                    if self.pending_bond.is_some() {
                        return Err(self.error("consecutive bond expressions"));
                    }
                    let bond = self.bond_expr()?;
                    self.pending_bond = Some(bond);
                }
                '%' | '0'..='9' => self.ring_closure()?,
                '[' => {
                    self.pos += 1;
                    let expr = self.atom_expr_low()?;
                    if self.peek() != Some(']') {
                        return Err(self.error("unterminated bracket atom"));
                    }
                    self.pos += 1;
                    self.attach(expr)?;
                }
                _ => {
                    let expr = self.bare_atom()?;
                    self.attach(expr)?;
                }
            }
        }
        if let Some(number) = self.ring_open.keys().next() {
            return Err(self.error(format!("ring closure {} never closed", number)));
        }
        if !self.branches.is_empty() {
            return Err(self.error("unbalanced '('"));
        }
        if self.pending_bond.is_some() {
            return Err(self.error("dangling bond"));
        }
        Ok(self.graph)
    }

    fn attach(&mut self, expr: AtomExpr) -> Result<(), SmartsError> {
        let idx = self.graph.atoms.len();
        self.graph.atoms.push(expr);
        let bond = self.pending_bond.take();
        match self.prev {
            Some(prev) => self.graph.bonds.push(QueryBond {
                a: prev,
                b: idx,
                expr: bond.unwrap_or_else(default_bond),
            }),
            None if bond.is_some() => return Err(self.error("bond without a preceding atom")),
            None => {}
        }
        self.prev = Some(idx);
        Ok(())
    }

    fn ring_closure(&mut self) -> Result<(), SmartsError> {
        let number = if self.peek() == Some('%') {
            let (Some(d1), Some(d2)) = (
                self.peek_at(1).and_then(|c| c.to_digit(10)),
                self.peek_at(2).and_then(|c| c.to_digit(10)),
            ) else {
                return Err(self.error("'%' must be followed by two digits"));
            };
            self.pos += 3;
            (d1 * 10 + d2) as u16
        } else {
            let d = self.peek().and_then(|c| c.to_digit(10)).unwrap_or(0);
            self.pos += 1;
            d as u16
        };
        let current = self.prev.ok_or_else(|| self.error("ring closure without an atom"))?;
        let bond = self.pending_bond.take();
        match self.ring_open.remove(&number) {
            Some((partner, opened_with)) => {
                let expr = bond.or(opened_with).unwrap_or_else(default_bond);
                self.graph.bonds.push(QueryBond {
                    a: partner,
                    b: current,
                    expr,
                });
            }
            None => {
                self.ring_open.insert(number, (current, bond));
            }
        }
        Ok(())
    }

    fn bare_atom(&mut self) -> Result<AtomExpr, SmartsError> {
        let c = self.peek().ok_or_else(|| self.error("unexpected end"))?;
        let next = self.peek_at(1);
        let (prim, width) = match (c, next) {
            ('C', Some('l')) => (element("Cl", Some(false)), 2),
            ('B', Some('r')) => (element("Br", Some(false)), 2),
            ('B' | 'C' | 'N' | 'O' | 'P' | 'S' | 'F' | 'I', _) => (element(&c.to_string(), Some(false)), 1),
            ('b' | 'c' | 'n' | 'o' | 'p' | 's', _) => {
                (element(&c.to_ascii_uppercase().to_string(), Some(true)), 1)
            }
            ('*', _) => (Some(AtomPrimitive::Any), 1),
            ('a', _) => (Some(AtomPrimitive::Aromatic), 1),
            ('A', _) => (Some(AtomPrimitive::Aliphatic), 1),
            _ => (None, 0),
        };
        let prim = prim.ok_or_else(|| self.error(format!("unexpected character '{}'", c)))?;
        self.pos += width;
        Ok(Expr::Primitive(prim))
    }

    // Precedence, lowest first: ';'  ','  '&' or juxtaposition  '!'

    fn atom_expr_low(&mut self) -> Result<AtomExpr, SmartsError> {
        let mut expr = self.atom_expr_or()?;
        while self.peek() == Some(';') {
            self.pos += 1;
            let rhs = self.atom_expr_or()?;
            expr = Expr::and(expr, rhs);
        }
        Ok(expr)
    }

    fn atom_expr_or(&mut self) -> Result<AtomExpr, SmartsError> {
        let mut expr = self.atom_expr_and()?;
        while self.peek() == Some(',') {
            self.pos += 1;
            let rhs = self.atom_expr_and()?;
            expr = Expr::or(expr, rhs);
        }
        Ok(expr)
    }

    fn atom_expr_and(&mut self) -> Result<AtomExpr, SmartsError> {
        let mut expr = self.atom_expr_not()?;
        loop {
            match self.peek() {
                Some('&') => {
                    self.pos += 1;
                }
                Some(']' | ',' | ';') | None => break,
                Some(_) => {}
            }
            let rhs = self.atom_expr_not()?;
            expr = Expr::and(expr, rhs);
        }
        Ok(expr)
    }

    fn atom_expr_not(&mut self) -> Result<AtomExpr, SmartsError> {
        if self.peek() == Some('!') {
            self.pos += 1;
            let inner = self.atom_expr_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        Ok(Expr::Primitive(self.bracket_primitive()?))
    }

    fn read_number(&mut self) -> Option<u32> {
        let start = self.pos;
        let mut value: u32 = 0;
        while let Some(d) = self.peek().and_then(|c| c.to_digit(10)) {
            value = value.saturating_mul(10).saturating_add(d);
            self.pos += 1;
        }
        (self.pos > start).then_some(value)
    }

    fn bracket_primitive(&mut self) -> Result<AtomPrimitive, SmartsError> {
        let c = self.peek().ok_or_else(|| self.error("unterminated bracket atom"))?;

        // Two-letter element symbols take precedence over single-letter
        // primitives (`Rh` is rhodium, not ring membership and `h`).
        if c.is_ascii_uppercase() {
            if let Some(lower) = self.peek_at(1).filter(|l| l.is_ascii_lowercase()) {
                let two: String = [c, lower].iter().collect();
                if let Some(number) = atomic_number(&two) {
                    self.pos += 2;
                    return Ok(AtomPrimitive::Element {
                        number,
                        aromatic: Some(false),
                    });
                }
            }
        }

        self.pos += 1;
        let prim = match c {
            '*' => AtomPrimitive::Any,
            'a' => AtomPrimitive::Aromatic,
            'A' => AtomPrimitive::Aliphatic,
            '#' => {
                let number = self.read_number().ok_or_else(|| self.error("'#' needs a number"))?;
                AtomPrimitive::Element {
                    number: number.min(255) as u8,
                    aromatic: None,
                }
            }
            'H' => AtomPrimitive::HydrogenCount(self.read_number().unwrap_or(1) as u8),
            'D' => AtomPrimitive::Degree(self.read_number().unwrap_or(1) as u8),
            'X' => AtomPrimitive::Connectivity(self.read_number().unwrap_or(1) as u8),
            'R' => AtomPrimitive::InRing(self.read_number().map_or(true, |n| n > 0)),
            'r' => match self.read_number() {
                Some(n) => AtomPrimitive::RingSize(n as u8),
                None => AtomPrimitive::InRing(true),
            },
            '+' | '-' => {
                let unit: i32 = if c == '+' { 1 } else { -1 };
                let magnitude = match self.read_number() {
                    Some(n) => n as i32,
                    None => {
                        let mut count = 1;
                        while self.peek() == Some(c) {
                            count += 1;
                            self.pos += 1;
                        }
                        count
                    }
                };
                AtomPrimitive::Charge((unit * magnitude).clamp(-15, 15) as i8)
            }
            'b' | 'c' | 'n' | 'o' | 'p' | 's' => {
                if c == 's' && self.peek() == Some('e') {
                    self.pos += 1;
                    element("Se", Some(true)).ok_or_else(|| self.error("unknown element"))?
                } else {
                    element(&c.to_ascii_uppercase().to_string(), Some(true))
                        .ok_or_else(|| self.error("unknown element"))?
                }
            }
            u if u.is_ascii_uppercase() => element(&u.to_string(), Some(false))
                .ok_or_else(|| self.error(format!("unknown element '{}'", u)))?,
            other => return Err(self.error(format!("unexpected '{}' in bracket atom", other))),
        };
        Ok(prim)
    }

    fn bond_expr(&mut self) -> Result<BondExpr, SmartsError> {
        let mut expr = self.bond_or()?;
        while self.peek() == Some(';') {
            self.pos += 1;
            let rhs = self.bond_or()?;
            expr = Expr::and(expr, rhs);
        }
        Ok(expr)
    }

    fn bond_or(&mut self) -> Result<BondExpr, SmartsError> {
        let mut expr = self.bond_and()?;
        while self.peek() == Some(',') {
            self.pos += 1;
            let rhs = self.bond_and()?;
            expr = Expr::or(expr, rhs);
        }
        Ok(expr)
    }

    fn bond_and(&mut self) -> Result<BondExpr, SmartsError> {
        let mut expr = self.bond_not()?;
        loop {
            match self.peek() {
                Some('&') => self.pos += 1,
                Some('-' | '=' | '#' | ':' | '~' | '@' | '!' | '/' | '\\') => {}
                _ => break,
            }
            let rhs = self.bond_not()?;
            expr = Expr::and(expr, rhs);
        }
        Ok(expr)
    }

    fn bond_not(&mut self) -> Result<BondExpr, SmartsError> {
        match self.peek() {
            Some('!') => {
                self.pos += 1;
                let inner = self.bond_not()?;
                Ok(Expr::Not(Box::new(inner)))
            }
            Some(c) => {
                let prim = match c {
                    '-' | '/' | '\\' => BondPrimitive::Single,
                    '=' => BondPrimitive::Double,
                    '#' => BondPrimitive::Triple,
                    ':' => BondPrimitive::Aromatic,
                    '~' => BondPrimitive::Any,
                    '@' => BondPrimitive::Ring,
                    other => return Err(self.error(format!("unexpected '{}' in bond", other))),
                };
                self.pos += 1;
                Ok(Expr::Primitive(prim))
            }
            None => Err(self.error("unexpected end in bond")),
        }
    }
}

fn element(symbol: &str, aromatic: Option<bool>) -> Option<AtomPrimitive> {
    atomic_number(symbol).map(|number| AtomPrimitive::Element { number, aromatic })
}
