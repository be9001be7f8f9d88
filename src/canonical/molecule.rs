//! Molecular graph: atoms, bonds, ring perception and aromaticity

use super::CanonicalError;
use std::collections::{BTreeSet, VecDeque};

const ELEMENTS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh",
    "Fl", "Mc", "Lv", "Ts", "Og",
];

/// Atomic number for an element symbol (case-sensitive), 0 for `*`.
pub fn atomic_number(symbol: &str) -> Option<u8> {
    if symbol == "*" {
        return Some(0);
    }
    ELEMENTS
        .iter()
        .position(|s| *s == symbol)
        .map(|i| (i + 1) as u8)
}

/// Element symbol for an atomic number, `*` for 0.
pub fn element_symbol(number: u8) -> &'static str {
    match number {
        0 => "*",
        n => ELEMENTS.get(n as usize - 1).copied().unwrap_or("*"),
    }
}

/// Normal valences of the organic subset, lowest first.
pub(crate) fn default_valences(number: u8) -> &'static [u8] {
    match number {
        5 => &[3],
        6 => &[4],
        7 => &[3, 5],
        8 => &[2],
        15 => &[3, 5],
        16 => &[2, 4, 6],
        9 | 17 | 35 | 53 => &[1],
        _ => &[],
    }
}

pub(crate) fn is_organic_subset(number: u8) -> bool {
    !default_valences(number).is_empty()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
}

impl BondOrder {
    /// Contribution to an atom's valence; aromatic bonds count as one.
    pub fn valence(self) -> u8 {
        match self {
            Self::Single | Self::Aromatic => 1,
            Self::Double => 2,
            Self::Triple => 3,
            Self::Quadruple => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub atomic_number: u8,
    pub aromatic: bool,
    pub charge: i8,
    pub isotope: Option<u16>,
    /// Total attached hydrogens (implicit or bracket count)
    pub hydrogens: u8,
    /// Written in brackets in the source
    pub bracket: bool,
}

impl Atom {
    pub fn new(atomic_number: u8, aromatic: bool) -> Self {
        Self {
            atomic_number,
            aromatic,
            charge: 0,
            isotope: None,
            hydrogens: 0,
            bracket: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bond {
    pub a: usize,
    pub b: usize,
    pub order: BondOrder,
}

impl Bond {
    pub fn other(&self, atom: usize) -> usize {
        if self.a == atom {
            self.b
        } else {
            self.a
        }
    }
}

/// An undirected molecular graph without explicit hydrogen atoms
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Molecule {
    pub atoms: Vec<Atom>,
    pub bonds: Vec<Bond>,
    /// Per atom: (neighbor atom, bond index)
    adjacency: Vec<Vec<(usize, usize)>>,
}

impl Molecule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.adjacency.push(Vec::new());
        self.atoms.len() - 1
    }

    pub fn add_bond(&mut self, a: usize, b: usize, order: BondOrder) -> Result<usize, CanonicalError> {
        if a == b || self.bond_between(a, b).is_some() {
            return Err(CanonicalError::InvalidBond { a, b });
        }
        let idx = self.bonds.len();
        self.bonds.push(Bond { a, b, order });
        self.adjacency[a].push((b, idx));
        self.adjacency[b].push((a, idx));
        Ok(idx)
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn neighbors(&self, atom: usize) -> &[(usize, usize)] {
        &self.adjacency[atom]
    }

    pub fn degree(&self, atom: usize) -> usize {
        self.adjacency[atom].len()
    }

    pub fn bond_between(&self, a: usize, b: usize) -> Option<&Bond> {
        self.adjacency
            .get(a)?
            .iter()
            .find(|(n, _)| *n == b)
            .map(|(_, idx)| &self.bonds[*idx])
    }

    /// Sum of bond valence contributions at an atom
    pub fn bond_valence(&self, atom: usize) -> u8 {
        self.adjacency[atom]
            .iter()
            .fold(0u8, |acc, (_, idx)| acc.saturating_add(self.bonds[*idx].order.valence()))
    }

    /// Hydrogens an organic-subset atom carries implicitly, given its bonds.
    ///
    /// Returns `None` when the atom is outside the organic subset or its
    /// bonds exceed every normal valence.
    pub fn implicit_hydrogens(&self, atom: usize) -> Option<u8> {
        let a = &self.atoms[atom];
        let valences = default_valences(a.atomic_number);
        let used = self.bond_valence(atom);
        if a.aromatic {
            let lowest = *valences.first()?;
            let highest = *valences.last()?;
            if used > highest {
                return None;
            }
            return Some(lowest.saturating_sub(used.saturating_add(1)));
        }
        valences.iter().find(|v| **v >= used).map(|v| v - used)
    }

    /// Connected components as lists of atom indices
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut seen = vec![false; self.atoms.len()];
        let mut out = Vec::new();
        for start in 0..self.atoms.len() {
            if seen[start] {
                continue;
            }
            let mut comp = Vec::new();
            let mut queue = VecDeque::from([start]);
            seen[start] = true;
            while let Some(u) = queue.pop_front() {
                comp.push(u);
                for &(v, _) in &self.adjacency[u] {
                    if !seen[v] {
                        seen[v] = true;
                        queue.push_back(v);
                    }
                }
            }
            out.push(comp);
        }
        out
    }

    /// Per bond: whether it lies on a cycle (is not a bridge).
    pub fn ring_bonds(&self) -> Vec<bool> {
        let n = self.atoms.len();
        let mut disc = vec![usize::MAX; n];
        let mut low = vec![0usize; n];
        let mut in_ring = vec![true; self.bonds.len()];
        let mut timer = 0usize;

        // Iterative Tarjan bridge search: (atom, parent bond, next neighbor)
        for root in 0..n {
            if disc[root] != usize::MAX {
                continue;
            }
            let mut stack: Vec<(usize, Option<usize>, usize)> = vec![(root, None, 0)];
            disc[root] = timer;
            low[root] = timer;
            timer += 1;

            while let Some(frame) = stack.last_mut() {
                let (u, parent_bond, next) = *frame;
                if next < self.adjacency[u].len() {
                    frame.2 += 1;
                    let (v, bond) = self.adjacency[u][next];
                    if Some(bond) == parent_bond {
                        continue;
                    }
                    if disc[v] == usize::MAX {
                        disc[v] = timer;
                        low[v] = timer;
                        timer += 1;
                        stack.push((v, Some(bond), 0));
                    } else {
                        low[u] = low[u].min(disc[v]);
                    }
                } else {
                    stack.pop();
                    if let (Some(&(p, _, _)), Some(bond)) = (stack.last(), parent_bond) {
                        low[p] = low[p].min(low[u]);
                        if low[u] > disc[p] {
                            in_ring[bond] = false;
                        }
                    }
                }
            }
        }
        in_ring
    }

    pub fn ring_atoms(&self) -> Vec<bool> {
        let ring_bonds = self.ring_bonds();
        let mut out = vec![false; self.atoms.len()];
        for (bond, in_ring) in self.bonds.iter().zip(&ring_bonds) {
            if *in_ring {
                out[bond.a] = true;
                out[bond.b] = true;
            }
        }
        out
    }

    /// Size of the smallest ring through each atom (0 when acyclic).
    pub fn smallest_ring_sizes(&self) -> Vec<usize> {
        let ring_bonds = self.ring_bonds();
        let mut sizes = vec![0usize; self.atoms.len()];
        for (idx, bond) in self.bonds.iter().enumerate() {
            if !ring_bonds[idx] {
                continue;
            }
            if let Some(len) = self.shortest_path_avoiding(bond.a, bond.b, idx) {
                let ring = len + 1;
                for atom in [bond.a, bond.b] {
                    if sizes[atom] == 0 || ring < sizes[atom] {
                        sizes[atom] = ring;
                    }
                }
            }
        }
        sizes
    }

    fn shortest_path_avoiding(&self, from: usize, to: usize, skip_bond: usize) -> Option<usize> {
        let mut dist = vec![usize::MAX; self.atoms.len()];
        dist[from] = 0;
        let mut queue = VecDeque::from([from]);
        while let Some(u) = queue.pop_front() {
            if u == to {
                return Some(dist[u]);
            }
            for &(v, bond) in &self.adjacency[u] {
                if bond != skip_bond && dist[v] == usize::MAX {
                    dist[v] = dist[u] + 1;
                    queue.push_back(v);
                }
            }
        }
        None
    }

    /// Simple cycles of five or six atoms, each as an ordered atom walk.
    pub fn small_rings(&self) -> Vec<Vec<usize>> {
        let ring_atoms = self.ring_atoms();
        let mut seen: BTreeSet<Vec<usize>> = BTreeSet::new();
        let mut rings = Vec::new();
        for start in 0..self.atoms.len() {
            if !ring_atoms[start] {
                continue;
            }
            let mut path = vec![start];
            self.extend_ring_walk(start, &mut path, &ring_atoms, &mut seen, &mut rings);
        }
        rings
    }

    fn extend_ring_walk(
        &self,
        start: usize,
        path: &mut Vec<usize>,
        ring_atoms: &[bool],
        seen: &mut BTreeSet<Vec<usize>>,
        rings: &mut Vec<Vec<usize>>,
    ) {
        let Some(&last) = path.last() else { return };
        for &(next, _) in &self.adjacency[last] {
            if next == start && path.len() >= 5 {
                let mut key = path.clone();
                key.sort_unstable();
                if seen.insert(key) {
                    rings.push(path.clone());
                }
                continue;
            }
            // The start is the lowest index of the cycle.
            if next <= start || !ring_atoms[next] || path.contains(&next) || path.len() >= 6 {
                continue;
            }
            path.push(next);
            self.extend_ring_walk(start, path, ring_atoms, seen, rings);
            path.pop();
        }
    }

    /// Mark Kekulé five- and six-membered rings aromatic.
    ///
    /// A ring qualifies when every member can donate to the ring's pi system
    /// and the members donate six electrons in total. Repeats until fused
    /// systems stop changing, so rings sharing atoms with an aromatic ring
    /// are counted with those atoms already aromatic.
    pub fn perceive_aromaticity(&mut self) {
        let rings = self.small_rings();
        loop {
            let mut changed = false;
            for ring in &rings {
                if ring.iter().all(|&a| self.atoms[a].aromatic) {
                    continue;
                }
                let electrons: Option<u8> = ring.iter().map(|&a| self.pi_electrons(a, ring)).sum();
                if electrons == Some(6) {
                    self.mark_ring_aromatic(ring);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    /// Electrons a ring member puts into the ring's pi system, `None` when
    /// the atom cannot take part.
    ///
    /// A double bond inside the ring gives one; a carbon whose only double
    /// bond is exocyclic to N, O or S gives none; a saturated N, O or S lone
    /// pair gives two. Ring nitrogens may carry a positive charge.
    fn pi_electrons(&self, atom: usize, ring: &[usize]) -> Option<u8> {
        let a = &self.atoms[atom];
        let mut ring_double = false;
        let mut exo_double = None;
        for &(nbr, bond) in &self.adjacency[atom] {
            match self.bonds[bond].order {
                BondOrder::Triple | BondOrder::Quadruple => return None,
                BondOrder::Double if ring.contains(&nbr) => ring_double = true,
                BondOrder::Double => exo_double = Some(self.atoms[nbr].atomic_number),
                BondOrder::Single | BondOrder::Aromatic => {}
            }
        }
        let connections = self.degree(atom) + a.hydrogens as usize;

        match (a.atomic_number, a.charge) {
            (6, 0) => match exo_double {
                _ if ring_double && exo_double.is_some() => None,
                _ if ring_double => Some(1),
                Some(7 | 8 | 16) => Some(0),
                Some(_) => None,
                None if a.aromatic => Some(1),
                None => None,
            },
            (7, 0) => {
                if exo_double.is_some() {
                    None
                } else if ring_double {
                    Some(1)
                } else if connections == 3 {
                    Some(2)
                } else if a.aromatic && connections == 2 {
                    Some(1)
                } else {
                    None
                }
            }
            (7, 1) if exo_double.is_none() && (ring_double || a.aromatic) => Some(1),
            (8 | 16, 0) if exo_double.is_none() && !ring_double && connections == 2 => Some(2),
            _ => None,
        }
    }

    fn mark_ring_aromatic(&mut self, ring: &[usize]) {
        for (i, &a) in ring.iter().enumerate() {
            let b = ring[(i + 1) % ring.len()];
            self.atoms[a].aromatic = true;
            if let Some(&(_, idx)) = self.adjacency[a].iter().find(|(n, _)| *n == b) {
                self.bonds[idx].order = BondOrder::Aromatic;
            }
        }
    }

    /// Check bracket atoms and aromatic flags against allowed valences.
    pub fn validate(&self) -> Result<(), CanonicalError> {
        let ring_atoms = self.ring_atoms();
        for (idx, atom) in self.atoms.iter().enumerate() {
            if atom.aromatic && !ring_atoms[idx] {
                return Err(CanonicalError::AromaticOutsideRing(idx));
            }
            let shifted = atom.atomic_number as i16 - atom.charge as i16;
            if !(1..=118).contains(&shifted) {
                continue;
            }
            // Charged atoms take the valences of their isoelectronic neighbor.
            let valences = default_valences(shifted as u8);
            let Some(&max) = valences.last() else { continue };
            let total = self.bond_valence(idx).saturating_add(atom.hydrogens);
            if total > max {
                return Err(CanonicalError::Valence {
                    atom: idx,
                    symbol: element_symbol(atom.atomic_number).to_string(),
                    valence: total,
                });
            }
        }
        Ok(())
    }
}
