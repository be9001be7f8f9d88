//! Backtracking substructure matcher

use super::smarts::{AtomPrimitive, BondPrimitive, QueryGraph};
use crate::canonical::{BondOrder, Molecule};

/// Per-atom facts the query primitives test against, computed once per
/// molecule and shared by every rule.
#[derive(Debug, Clone)]
pub struct MatchTarget<'a> {
    mol: &'a Molecule,
    ring_atoms: Vec<bool>,
    ring_bonds: Vec<bool>,
    ring_sizes: Vec<usize>,
}

impl<'a> MatchTarget<'a> {
    pub fn new(mol: &'a Molecule) -> Self {
        Self {
            mol,
            ring_atoms: mol.ring_atoms(),
            ring_bonds: mol.ring_bonds(),
            ring_sizes: mol.smallest_ring_sizes(),
        }
    }

    fn atom_matches(&self, prim: &AtomPrimitive, idx: usize) -> bool {
        let atom = &self.mol.atoms[idx];
        match *prim {
            AtomPrimitive::Any => true,
            AtomPrimitive::Aromatic => atom.aromatic,
            AtomPrimitive::Aliphatic => !atom.aromatic,
            AtomPrimitive::Element { number, aromatic } => {
                atom.atomic_number == number && aromatic.map_or(true, |a| a == atom.aromatic)
            }
            AtomPrimitive::HydrogenCount(n) => atom.hydrogens == n,
            AtomPrimitive::Degree(n) => self.mol.degree(idx) == n as usize,
            AtomPrimitive::Connectivity(n) => {
                self.mol.degree(idx) + atom.hydrogens as usize == n as usize
            }
            AtomPrimitive::InRing(expected) => self.ring_atoms[idx] == expected,
            AtomPrimitive::RingSize(n) => self.ring_sizes[idx] == n as usize,
            AtomPrimitive::Charge(c) => atom.charge == c,
        }
    }

    fn bond_matches(&self, prim: &BondPrimitive, bond_idx: usize) -> bool {
        let order = self.mol.bonds[bond_idx].order;
        match prim {
            BondPrimitive::Single => order == BondOrder::Single,
            BondPrimitive::Double => order == BondOrder::Double,
            BondPrimitive::Triple => order == BondOrder::Triple,
            BondPrimitive::Aromatic => order == BondOrder::Aromatic,
            BondPrimitive::Any => true,
            BondPrimitive::Ring => self.ring_bonds[bond_idx],
        }
    }

    /// Whether the query occurs anywhere in the molecule.
    pub fn has_match(&self, query: &QueryGraph) -> bool {
        if query.atom_count() == 0 || query.atom_count() > self.mol.atom_count() {
            return false;
        }
        let order = search_order(query);
        let query_adj = query.adjacency();
        let mut mapping = vec![usize::MAX; query.atom_count()];
        let mut used = vec![false; self.mol.atom_count()];
        self.extend(query, &query_adj, &order, 0, &mut mapping, &mut used)
    }

    fn extend(
        &self,
        query: &QueryGraph,
        query_adj: &[Vec<(usize, usize)>],
        order: &[usize],
        depth: usize,
        mapping: &mut [usize],
        used: &mut [bool],
    ) -> bool {
        let Some(&q) = order.get(depth) else {
            return true;
        };

        // Candidates: neighbors of an already-mapped query neighbor, or all atoms.
        let anchor = query_adj[q]
            .iter()
            .find(|(nbr, _)| mapping[*nbr] != usize::MAX)
            .map(|(nbr, _)| mapping[*nbr]);
        let candidates: Vec<usize> = match anchor {
            Some(m) => self.mol.neighbors(m).iter().map(|(n, _)| *n).collect(),
            None => (0..self.mol.atom_count()).collect(),
        };

        for m in candidates {
            if used[m] || !query.atoms[q].eval(&|p| self.atom_matches(p, m)) {
                continue;
            }
            let bonds_ok = query_adj[q].iter().all(|&(nbr, qb)| {
                let mapped = mapping[nbr];
                if mapped == usize::MAX {
                    return true;
                }
                match self.mol.neighbors(m).iter().find(|(n, _)| *n == mapped) {
                    Some(&(_, mb)) => query.bonds[qb].expr.eval(&|p| self.bond_matches(p, mb)),
                    None => false,
                }
            });
            if !bonds_ok {
                continue;
            }

            mapping[q] = m;
            used[m] = true;
            if self.extend(query, query_adj, order, depth + 1, mapping, used) {
                return true;
            }
            mapping[q] = usize::MAX;
            used[m] = false;
        }
        false
    }
}

/// Breadth-first order over the query so each atom after the first in a
/// component is adjacent to an earlier one.
fn search_order(query: &QueryGraph) -> Vec<usize> {
    let adj = query.adjacency();
    let mut seen = vec![false; query.atom_count()];
    let mut order = Vec::with_capacity(query.atom_count());
    for start in 0..query.atom_count() {
        if seen[start] {
            continue;
        }
        seen[start] = true;
        let mut head = order.len();
        order.push(start);
        while head < order.len() {
            let u = order[head];
            head += 1;
            for &(v, _) in &adj[u] {
                if !seen[v] {
                    seen[v] = true;
                    order.push(v);
                }
            }
        }
    }
    order
}

/// Convenience wrapper for a single query.
pub fn has_substructure(mol: &Molecule, query: &QueryGraph) -> bool {
    MatchTarget::new(mol).has_match(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::smiles::parse;

    fn matches(smiles: &str, smarts: &str) -> bool {
        has_substructure(&parse(smiles).unwrap(), &QueryGraph::parse(smarts).unwrap())
    }

    #[test]
    fn aromatic_and_aliphatic_are_distinguished() {
        assert!(matches("C=Cc1ccccc1", "C=C-c"));
        assert!(!matches("C=CC", "C=C-c"));
        assert!(matches("Nc1ccccc1", "Nc"));
        assert!(!matches("NCC", "Nc"));
    }

    #[test]
    fn diazo_contexts() {
        assert!(matches("CCOC(=O)C=[N+]=[N-]", "[N-]=[N+]=C-C(=O)O"));
        assert!(matches("CCOC(=O)CN=[N+]=[N-]", "[N-]=[N+]=[#6,#7]"));
        assert!(!matches("CCOC(=O)C", "[N-]=[N+]=[#6,#7]"));
    }

    #[test]
    fn ring_patterns() {
        assert!(matches("C1CC1C(=O)OCC", "C1CC1"));
        assert!(!matches("CCCC", "C1CC1"));
        assert!(matches("C1CO1", "C1OC1"));
        assert!(matches("c1cc[nH]c1", "n1cccc1"));
    }

    #[test]
    fn bracket_primitives() {
        assert!(matches("CCO", "[CH3]"));
        assert!(matches("CCO", "[OX2H1]"));
        assert!(!matches("C1CCCCC1", "[C;!R]"));
        assert!(matches("C1CCCCC1", "[Cr6]"));
        assert!(!matches("C1CCCCC1", "[Cr5]"));
        assert!(matches("C[N+](C)(C)C", "[N+;D4]"));
    }

    #[test]
    fn bond_primitives() {
        assert!(matches("C1CCCCC1C", "C@C"));
        assert!(matches("CC#N", "C#N"));
        assert!(matches("CC=O", "C~O"));
        assert!(!matches("CC=O", "C-O"));
        assert!(matches("CC=O", "C!-O"));
    }

    #[test]
    fn query_larger_than_molecule_never_matches() {
        assert!(!matches("C", "CC"));
    }
}
