//! Line-notation structure parser
//!
//! Accepts the organic subset and bracket atoms with isotopes, explicit
//! hydrogens, charges, chirality marks and atom classes; branches; ring
//! closures including `%nn`; bond symbols and dot-separated fragments.
//! Chirality and directional bonds are read but not kept.

use super::molecule::{atomic_number, Atom, BondOrder, Molecule};
use super::CanonicalError;
use std::collections::BTreeMap;

/// Parse a structure string into a validated molecular graph.
///
/// The string must not contain whitespace.
pub fn parse(input: &str) -> Result<Molecule, CanonicalError> {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
        mol: Molecule::new(),
        prev: None,
        branches: Vec::new(),
        pending_bond: None,
        ring_open: BTreeMap::new(),
        organic: Vec::new(),
    };
    parser.run()?;
    parser.finish()
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    mol: Molecule,
    prev: Option<usize>,
    branches: Vec<Option<usize>>,
    pending_bond: Option<BondOrder>,
    ring_open: BTreeMap<u16, (usize, Option<BondOrder>)>,
    /// Atoms written without brackets; their hydrogens are implicit.
    organic: Vec<usize>,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn error(&self, reason: impl Into<String>) -> CanonicalError {
        CanonicalError::Syntax {
            position: self.pos,
            reason: reason.into(),
        }
    }

    fn run(&mut self) -> Result<(), CanonicalError> {
        if self.chars.is_empty() {
            return Err(CanonicalError::Empty);
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
                    self.prev = self
                        .branches
                        .pop()
                        .ok_or_else(|| self.error("unbalanced ')'"))?;
                    self.pos += 1;
                }
                '-' | '=' | '#' | '$' | ':' | '/' | '\\' => {
                    if self.pending_bond.is_some() {
                        return Err(self.error("consecutive bond symbols"));
                    }
                    self.pending_bond = Some(match c {
                        '=' => BondOrder::Double,
                        '#' => BondOrder::Triple,
                        '$' => BondOrder::Quadruple,
                        ':' => BondOrder::Aromatic,
                        _ => BondOrder::Single,
                    });
                    self.pos += 1;
                }
                '.' => {
                    if self.pending_bond.is_some() || self.prev.is_none() {
                        return Err(self.error("misplaced '.'"));
                    }
                    self.prev = None;
                    self.pos += 1;
                }
                '%' | '0'..='9' => self.ring_closure()?,
                '[' => {
                    let atom = self.bracket_atom()?;
                    self.attach(atom, false)?;
                }
                _ => {
                    let atom = self.organic_atom()?;
                    self.attach(atom, true)?;
                }
            }
        }
        Ok(())
    }

    fn attach(&mut self, atom: Atom, organic: bool) -> Result<(), CanonicalError> {
        let aromatic = atom.aromatic;
        let idx = self.mol.add_atom(atom);
        if organic {
            self.organic.push(idx);
        }
        if let Some(prev) = self.prev {
            let order = self
                .pending_bond
                .take()
                .unwrap_or_else(|| default_bond(self.mol.atoms[prev].aromatic, aromatic));
            self.mol.add_bond(prev, idx, order)?;
        } else if self.pending_bond.is_some() {
            return Err(self.error("bond without a preceding atom"));
        }
        self.prev = Some(idx);
        Ok(())
    }

    fn ring_closure(&mut self) -> Result<(), CanonicalError> {
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
            let digit = self.peek().and_then(|c| c.to_digit(10)).unwrap_or(0);
            self.pos += 1;
            digit as u16
        };

        let current = self
            .prev
            .ok_or_else(|| self.error("ring closure without a preceding atom"))?;
        let bond = self.pending_bond.take();

        match self.ring_open.remove(&number) {
            Some((partner, opened_with)) => {
                let order = match (opened_with, bond) {
                    (Some(a), Some(b)) if a != b => {
                        return Err(self.error(format!("conflicting bonds on ring closure {}", number)))
                    }
                    (Some(a), _) | (None, Some(a)) => a,
                    (None, None) => default_bond(
                        self.mol.atoms[partner].aromatic,
                        self.mol.atoms[current].aromatic,
                    ),
                };
                self.mol.add_bond(partner, current, order)?;
            }
            None => {
                self.ring_open.insert(number, (current, bond));
            }
        }
        Ok(())
    }

    fn organic_atom(&mut self) -> Result<Atom, CanonicalError> {
        let c = self.peek().ok_or_else(|| self.error("unexpected end"))?;
        let next = self.peek_at(1);
        let (symbol, aromatic, width) = match (c, next) {
            ('C', Some('l')) => ("Cl", false, 2),
            ('B', Some('r')) => ("Br", false, 2),
            ('B' | 'C' | 'N' | 'O' | 'P' | 'S' | 'F' | 'I', _) => (upper_symbol(c), false, 1),
            ('b' | 'c' | 'n' | 'o' | 'p' | 's', _) => (upper_symbol(c.to_ascii_uppercase()), true, 1),
            ('*', _) => ("*", false, 1),
            _ => return Err(self.error(format!("unexpected character '{}'", c))),
        };
        self.pos += width;
        let number = atomic_number(symbol).ok_or_else(|| self.error("unknown element"))?;
        Ok(Atom::new(number, aromatic))
    }

    fn bracket_atom(&mut self) -> Result<Atom, CanonicalError> {
        self.pos += 1; // '['

        let isotope = self.read_number();

        let (number, aromatic) = self.bracket_symbol()?;
        let mut atom = Atom::new(number, aromatic);
        atom.bracket = true;
        atom.isotope = isotope
            .map(u16::try_from)
            .transpose()
            .map_err(|_| self.error("isotope out of range"))?;

        // Chirality: @, @@, @TH1, @AL2, @SP3, @TB10, @OH25
        if self.peek() == Some('@') {
            self.pos += 1;
            if self.peek() == Some('@') {
                self.pos += 1;
            } else if matches!(
                (self.peek(), self.peek_at(1)),
                (Some('T'), Some('H' | 'B')) | (Some('A'), Some('L')) | (Some('S'), Some('P')) | (Some('O'), Some('H'))
            ) {
                self.pos += 2;
                if self.read_number().is_none() {
                    return Err(self.error("chirality class without a number"));
                }
            }
        }

        if self.peek() == Some('H') {
            self.pos += 1;
            let count = self.read_number().unwrap_or(1);
            atom.hydrogens = u8::try_from(count).map_err(|_| self.error("hydrogen count out of range"))?;
        }

        if let Some(sign @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let unit: i32 = if sign == '+' { 1 } else { -1 };
            let magnitude = match self.read_number() {
                Some(n) => n as i32,
                None => {
                    let mut count = 1;
                    while self.peek() == Some(sign) {
                        count += 1;
                        self.pos += 1;
                    }
                    count
                }
            };
            let charge = unit * magnitude;
            if !(-15..=15).contains(&charge) {
                return Err(self.error("charge out of range"));
            }
            atom.charge = charge as i8;
        }

        // Atom class is informational only.
        if self.peek() == Some(':') {
            self.pos += 1;
            if self.read_number().is_none() {
                return Err(self.error("atom class without a number"));
            }
        }

        if self.peek() != Some(']') {
            return Err(self.error("unterminated bracket atom"));
        }
        self.pos += 1;
        Ok(atom)
    }

    fn bracket_symbol(&mut self) -> Result<(u8, bool), CanonicalError> {
        let c = self.peek().ok_or_else(|| self.error("empty bracket atom"))?;
        if c == '*' {
            self.pos += 1;
            return Ok((0, false));
        }
        if c.is_ascii_lowercase() {
            for (text, symbol) in [("se", "Se"), ("as", "As")] {
                if self.matches_ahead(text) {
                    self.pos += 2;
                    return Ok((atomic_number(symbol).unwrap_or(0), true));
                }
            }
            if matches!(c, 'b' | 'c' | 'n' | 'o' | 'p' | 's') {
                self.pos += 1;
                let number = atomic_number(upper_symbol(c.to_ascii_uppercase()))
                    .ok_or_else(|| self.error("unknown element"))?;
                return Ok((number, true));
            }
            return Err(self.error(format!("unknown aromatic symbol '{}'", c)));
        }
        if !c.is_ascii_uppercase() {
            return Err(self.error(format!("unexpected character '{}'", c)));
        }
        if let Some(lower) = self.peek_at(1).filter(|l| l.is_ascii_lowercase()) {
            let two: String = [c, lower].iter().collect();
            if let Some(number) = atomic_number(&two) {
                self.pos += 2;
                return Ok((number, false));
            }
        }
        let one = c.to_string();
        let number = atomic_number(&one).ok_or_else(|| self.error(format!("unknown element '{}'", c)))?;
        self.pos += 1;
        Ok((number, false))
    }

    fn matches_ahead(&self, text: &str) -> bool {
        text.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
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

    fn finish(mut self) -> Result<Molecule, CanonicalError> {
        if let Some(number) = self.ring_open.keys().next() {
            return Err(CanonicalError::UnclosedRing(*number));
        }
        if !self.branches.is_empty() {
            return Err(self.error("unbalanced '('"));
        }
        if self.pending_bond.is_some() {
            return Err(self.error("dangling bond"));
        }

        for &idx in &self.organic {
            let atom = &self.mol.atoms[idx];
            if atom.atomic_number == 0 {
                continue;
            }
            let hydrogens = self.mol.implicit_hydrogens(idx).ok_or_else(|| CanonicalError::Valence {
                atom: idx,
                symbol: super::molecule::element_symbol(atom.atomic_number).to_string(),
                valence: self.mol.bond_valence(idx),
            })?;
            self.mol.atoms[idx].hydrogens = hydrogens;
        }

        self.mol.validate()?;
        self.mol.perceive_aromaticity();
        Ok(self.mol)
    }
}

fn default_bond(a_aromatic: bool, b_aromatic: bool) -> BondOrder {
    if a_aromatic && b_aromatic {
        BondOrder::Aromatic
    } else {
        BondOrder::Single
    }
}

fn upper_symbol(c: char) -> &'static str {
    match c {
        'B' => "B",
        'C' => "C",
        'N' => "N",
        'O' => "O",
        'P' => "P",
        'S' => "S",
        'F' => "F",
        'I' => "I",
        _ => "*",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chain_with_branch() {
        let mol = parse("CC(=O)O").unwrap();
        assert_eq!(mol.atom_count(), 4);
        assert_eq!(mol.bonds.len(), 3);
        assert_eq!(mol.bond_between(1, 2).unwrap().order, BondOrder::Double);
    }

    #[test]
    fn parses_bracket_atoms() {
        let mol = parse("[N-]=[N+]=C").unwrap();
        assert_eq!(mol.atoms[0].charge, -1);
        assert_eq!(mol.atoms[1].charge, 1);
        assert_eq!(mol.atoms[2].hydrogens, 2);

        let mol = parse("[13CH3][NH3+]").unwrap();
        assert_eq!(mol.atoms[0].isotope, Some(13));
        assert_eq!(mol.atoms[0].hydrogens, 3);
        assert_eq!(mol.atoms[1].hydrogens, 3);
    }

    #[test]
    fn two_letter_bracket_elements() {
        let mol = parse("[Na+].[Cl-]").unwrap();
        assert_eq!(mol.atoms[0].atomic_number, 11);
        assert_eq!(mol.atoms[1].atomic_number, 17);
        assert_eq!(mol.components().len(), 2);
    }

    #[test]
    fn chirality_is_read_and_dropped() {
        let mol = parse("N[C@@H](C)C(=O)O").unwrap();
        assert_eq!(mol.atoms[1].hydrogens, 1);
        assert!(parse("F/C=C/F").is_ok());
    }

    #[test]
    fn percent_ring_closures() {
        let mol = parse("C%10CCCCC%10").unwrap();
        assert_eq!(mol.bonds.len(), 6);
    }

    #[test]
    fn aromatic_ring_closure_defaults_to_aromatic() {
        let mol = parse("c1ccccc1").unwrap();
        assert!(mol.bonds.iter().all(|b| b.order == BondOrder::Aromatic));
        assert!(mol.atoms.iter().all(|a| a.hydrogens == 1));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(parse(""), Err(CanonicalError::Empty)));
        assert!(matches!(parse("C1CC"), Err(CanonicalError::UnclosedRing(1))));
        assert!(parse("CC(C").is_err());
        assert!(parse("CC)C").is_err());
        assert!(parse("C==C").is_err());
        assert!(parse("C[Xx]").is_err());
        assert!(parse("MOCK_SMILES_STRING").is_err());
        assert!(parse("Hemin").is_err());
    }

    #[test]
    fn rejects_over_valent_atoms() {
        assert!(matches!(parse("C(C)(C)(C)(C)C"), Err(CanonicalError::Valence { .. })));
        assert!(parse("O=O=O").is_err());
    }

    #[test]
    fn rejects_counts_that_do_not_fit() {
        assert!(parse("[FeH300]").is_err());
        assert!(parse("[FeH255]").is_ok());
        assert!(parse("[70000C]").is_err());
        assert!(parse("[CH255]C").is_err());
    }

    #[test]
    fn rejects_aromatic_atoms_outside_rings() {
        assert!(matches!(parse("ccc"), Err(CanonicalError::AromaticOutsideRing(_))));
    }
}
