//! Canonical atom ranking and canonical string writer
//!
//! Ranking starts from per-atom invariants and refines by neighbor ranks
//! until the partition is stable, then breaks remaining ties one class at a
//! time. Atoms left tied after refinement are symmetry-equivalent, so which
//! member is picked does not change the written string.

use super::molecule::{element_symbol, is_organic_subset, BondOrder, Molecule};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Write the canonical string of a molecule.
///
/// Fragments are written independently and joined by `.` in sorted order.
pub fn canonical_smiles(mol: &Molecule) -> String {
    let ranks = canonical_ranks(mol);
    let mut fragments: Vec<String> = mol
        .components()
        .into_iter()
        .map(|atoms| {
            let start = atoms
                .iter()
                .copied()
                .min_by_key(|a| ranks[*a])
                .unwrap_or(atoms[0]);
            Writer::new(mol, &ranks).write_component(start)
        })
        .collect();
    fragments.sort();
    fragments.join(".")
}

/// Canonical rank per atom, a permutation of `0..n`.
pub fn canonical_ranks(mol: &Molecule) -> Vec<usize> {
    let n = mol.atom_count();
    if n == 0 {
        return Vec::new();
    }
    let ring_atoms = mol.ring_atoms();
    let invariants: Vec<_> = (0..n)
        .map(|i| {
            let a = &mol.atoms[i];
            (
                mol.degree(i),
                a.atomic_number,
                a.isotope.unwrap_or(0),
                a.charge,
                a.hydrogens,
                a.aromatic,
                ring_atoms[i],
                mol.bond_valence(i),
            )
        })
        .collect();

    let mut partition = Partition::new(&invariants);
    let cells = partition.cell_starts();
    partition.refine(mol, cells);

    let mut cursor = 0;
    while cursor < n {
        if partition.cell_size(cursor) == 1 {
            cursor += 1;
            continue;
        }
        let singleton = partition.individualize(cursor);
        partition.refine(mol, vec![singleton]);
    }
    partition.position
}

/// Ordered partition of the atoms into cells of equal rank.
///
/// Atoms are laid out cell by cell in `order`; a cell is named by its first
/// position. Refinement splits cells by how many neighbors, per bond order,
/// each atom has in a splitter cell, until no splitter changes anything.
struct Partition {
    order: Vec<usize>,
    position: Vec<usize>,
    cell_of: Vec<usize>,
    /// Exclusive end of the cell starting at each position
    cell_end: Vec<usize>,
}

impl Partition {
    fn new<K: Ord>(invariants: &[K]) -> Self {
        let n = invariants.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|a, b| invariants[*a].cmp(&invariants[*b]));

        let mut position = vec![0; n];
        let mut cell_of = vec![0; n];
        let mut cell_end = vec![n; n];
        let mut start = 0;
        for p in 0..n {
            if invariants[order[p]] != invariants[order[start]] {
                cell_end[start] = p;
                start = p;
            }
            position[order[p]] = p;
            cell_of[order[p]] = start;
        }
        cell_end[start] = n;
        Self {
            order,
            position,
            cell_of,
            cell_end,
        }
    }

    fn cell_starts(&self) -> Vec<usize> {
        let mut starts = Vec::new();
        let mut p = 0;
        while p < self.order.len() {
            starts.push(p);
            p = self.cell_end[p];
        }
        starts
    }

    fn cell_size(&self, start: usize) -> usize {
        self.cell_end[start] - start
    }

    fn move_to(&mut self, atom: usize, target: usize) {
        let from = self.position[atom];
        let displaced = self.order[target];
        self.order.swap(from, target);
        self.position[atom] = target;
        self.position[displaced] = from;
    }

    /// Split the last member of a cell off into its own cell, ranked after
    /// the rest. Returns the new singleton cell.
    fn individualize(&mut self, start: usize) -> usize {
        let end = self.cell_end[start];
        let last = end - 1;
        self.cell_end[start] = last;
        self.cell_end[last] = end;
        self.cell_of[self.order[last]] = last;
        last
    }

    fn refine(&mut self, mol: &Molecule, splitters: Vec<usize>) {
        let n = self.order.len();
        let mut queued = vec![false; n];
        for s in &splitters {
            queued[*s] = true;
        }
        let mut queue = VecDeque::from(splitters);
        let mut counts = vec![[0u32; 5]; n];

        while let Some(splitter) = queue.pop_front() {
            queued[splitter] = false;
            let members = self.order[splitter..self.cell_end[splitter]].to_vec();
            let mut touched = Vec::new();
            for atom in members {
                for &(nbr, bond) in mol.neighbors(atom) {
                    if counts[nbr] == [0; 5] {
                        touched.push(nbr);
                    }
                    counts[nbr][bond_code(mol.bonds[bond].order) as usize - 1] += 1;
                }
            }

            let mut by_cell: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
            for &atom in &touched {
                by_cell.entry(self.cell_of[atom]).or_default().push(atom);
            }
            for (start, mut hit) in by_cell {
                let end = self.cell_end[start];
                if end - start == 1 {
                    continue;
                }
                // Untouched members keep the front of the cell; touched ones
                // move to the back in ascending count order.
                hit.sort_by(|a, b| counts[*a].cmp(&counts[*b]));
                let mut tail = end;
                for &atom in hit.iter().rev() {
                    tail -= 1;
                    self.move_to(atom, tail);
                }
                let mut bounds = vec![start];
                let mut p = tail;
                while p < end {
                    let key = counts[self.order[p]];
                    if p > start {
                        bounds.push(p);
                    }
                    while p < end && counts[self.order[p]] == key {
                        p += 1;
                    }
                }
                if bounds.len() == 1 {
                    continue;
                }

                for (i, &s) in bounds.iter().enumerate() {
                    let e = bounds.get(i + 1).copied().unwrap_or(end);
                    self.cell_end[s] = e;
                    if i > 0 {
                        for q in s..e {
                            self.cell_of[self.order[q]] = s;
                        }
                    }
                }

                // A cell already waiting covers its first part; otherwise the
                // largest part is implied by the others.
                let skip = if queued[start] {
                    Some(start)
                } else {
                    bounds
                        .iter()
                        .copied()
                        .max_by(|a, b| self.cell_size(*a).cmp(&self.cell_size(*b)).then(b.cmp(a)))
                };
                for &s in &bounds {
                    if Some(s) != skip && !queued[s] {
                        queued[s] = true;
                        queue.push_back(s);
                    }
                }
            }

            for atom in touched {
                counts[atom] = [0; 5];
            }
        }
    }
}

fn bond_code(order: BondOrder) -> u8 {
    match order {
        BondOrder::Single => 1,
        BondOrder::Double => 2,
        BondOrder::Triple => 3,
        BondOrder::Quadruple => 4,
        BondOrder::Aromatic => 5,
    }
}

struct Writer<'a> {
    mol: &'a Molecule,
    ranks: &'a [usize],
    visited: Vec<bool>,
    ring_bond: Vec<bool>,
    children: Vec<Vec<(usize, usize)>>,
    /// Ring bonds opened at each atom (partner, bond), discovery order
    ring_opens: Vec<Vec<(usize, usize)>>,
    /// Ring bonds closed at each atom
    ring_closes: Vec<Vec<usize>>,
    digits: BTreeMap<usize, u16>,
    free_digits: BTreeSet<u16>,
    next_digit: u16,
}

impl<'a> Writer<'a> {
    fn new(mol: &'a Molecule, ranks: &'a [usize]) -> Self {
        let n = mol.atom_count();
        Self {
            mol,
            ranks,
            visited: vec![false; n],
            ring_bond: vec![false; mol.bonds.len()],
            children: vec![Vec::new(); n],
            ring_opens: vec![Vec::new(); n],
            ring_closes: vec![Vec::new(); n],
            digits: BTreeMap::new(),
            free_digits: BTreeSet::new(),
            next_digit: 1,
        }
    }

    fn write_component(mut self, start: usize) -> String {
        self.build_tree(start);
        let mut out = String::new();
        self.emit(start, &mut out);
        out
    }

    fn sorted_neighbors(&self, atom: usize) -> Vec<(usize, usize)> {
        let mut nbrs = self.mol.neighbors(atom).to_vec();
        nbrs.sort_by_key(|(n, _)| self.ranks[*n]);
        nbrs
    }

    fn build_tree(&mut self, start: usize) {
        // Iterative DFS: (atom, parent bond, neighbor list, cursor)
        self.visited[start] = true;
        let mut stack: Vec<(usize, Option<usize>, Vec<(usize, usize)>, usize)> =
            vec![(start, None, self.sorted_neighbors(start), 0)];

        while let Some(top) = stack.last_mut() {
            let (u, parent_bond) = (top.0, top.1);
            if top.3 >= top.2.len() {
                stack.pop();
                continue;
            }
            let (v, bond) = top.2[top.3];
            top.3 += 1;
            if Some(bond) == parent_bond {
                continue;
            }
            if self.visited[v] {
                if !self.ring_bond[bond] {
                    self.ring_bond[bond] = true;
                    self.ring_opens[v].push((u, bond));
                    self.ring_closes[u].push(bond);
                }
            } else {
                self.visited[v] = true;
                self.children[u].push((v, bond));
                let nbrs = self.sorted_neighbors(v);
                stack.push((v, Some(bond), nbrs, 0));
            }
        }
    }

    fn take_digit(&mut self) -> u16 {
        if let Some(d) = self.free_digits.pop_first() {
            return d;
        }
        let d = self.next_digit;
        self.next_digit += 1;
        d
    }

    /// Depth-first write from `start`. Frames are (atom, next child, opened
    /// a branch); the last child of an atom continues the chain unbracketed.
    fn emit(&mut self, start: usize, out: &mut String) {
        self.emit_atom(start, out);
        let mut stack: Vec<(usize, usize, bool)> = vec![(start, 0, false)];
        while let Some(frame) = stack.last_mut() {
            let (atom, next, _) = *frame;
            let count = self.children[atom].len();
            if next == count {
                if let Some((_, _, true)) = stack.pop() {
                    out.push(')');
                }
                continue;
            }
            frame.1 += 1;
            let (child, bond) = self.children[atom][next];
            let branch = next + 1 < count;
            if branch {
                out.push('(');
            }
            out.push_str(self.bond_symbol(bond));
            self.emit_atom(child, out);
            stack.push((child, 0, branch));
        }
    }

    fn emit_atom(&mut self, atom: usize, out: &mut String) {
        out.push_str(&self.atom_symbol(atom));

        let mut released = Vec::new();
        let mut closes: Vec<(u16, usize)> = self.ring_closes[atom]
            .iter()
            .filter_map(|b| self.digits.get(b).map(|d| (*d, *b)))
            .collect();
        closes.sort_unstable();
        for (digit, bond) in closes {
            out.push_str(self.bond_symbol(bond));
            push_digit(out, digit);
            released.push(digit);
        }

        let mut opens = self.ring_opens[atom].clone();
        opens.sort_by_key(|(partner, _)| self.ranks[*partner]);
        for (_, bond) in opens {
            let digit = self.take_digit();
            self.digits.insert(bond, digit);
            push_digit(out, digit);
        }
        self.free_digits.extend(released);
    }

    fn bond_symbol(&self, bond: usize) -> &'static str {
        let b = &self.mol.bonds[bond];
        match b.order {
            BondOrder::Single => {
                if self.mol.atoms[b.a].aromatic && self.mol.atoms[b.b].aromatic {
                    "-"
                } else {
                    ""
                }
            }
            BondOrder::Double => "=",
            BondOrder::Triple => "#",
            BondOrder::Quadruple => "$",
            BondOrder::Aromatic => "",
        }
    }

    fn atom_symbol(&self, idx: usize) -> String {
        let atom = &self.mol.atoms[idx];
        let symbol = element_symbol(atom.atomic_number);
        let written = if atom.aromatic {
            symbol.to_ascii_lowercase()
        } else {
            symbol.to_string()
        };

        let implicit = if atom.atomic_number == 0 {
            Some(0)
        } else if is_organic_subset(atom.atomic_number) {
            self.mol.implicit_hydrogens(idx)
        } else {
            None
        };
        let plain = atom.isotope.is_none()
            && atom.charge == 0
            && implicit == Some(atom.hydrogens)
            && (!atom.aromatic || matches!(atom.atomic_number, 5 | 6 | 7 | 8 | 15 | 16));
        if plain {
            return written;
        }

        let mut out = String::from("[");
        if let Some(isotope) = atom.isotope {
            out.push_str(&isotope.to_string());
        }
        out.push_str(&written);
        match atom.hydrogens {
            0 => {}
            1 => out.push('H'),
            h => {
                out.push('H');
                out.push_str(&h.to_string());
            }
        }
        match atom.charge {
            0 => {}
            1 => out.push('+'),
            -1 => out.push('-'),
            c if c > 0 => out.push_str(&format!("+{}", c)),
            c => out.push_str(&format!("-{}", -c)),
        }
        out.push(']');
        out
    }
}

fn push_digit(out: &mut String, digit: u16) {
    if digit < 10 {
        out.push_str(&digit.to_string());
    } else {
        out.push_str(&format!("%{:02}", digit));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::smiles::parse;

    fn canon(s: &str) -> String {
        canonical_smiles(&parse(s).unwrap())
    }

    #[test]
    fn atom_order_does_not_matter() {
        assert_eq!(canon("OCC"), canon("CCO"));
        assert_eq!(canon("C(C)O"), canon("CCO"));
        assert_eq!(canon("CC(=O)O"), canon("OC(C)=O"));
        assert_eq!(canon("CCOC(=O)CN=[N+]=[N-]"), canon("[N-]=[N+]=NCC(=O)OCC"));
    }

    #[test]
    fn kekule_and_aromatic_forms_agree() {
        assert_eq!(canon("C1=CC=CC=C1"), canon("c1ccccc1"));
        assert_eq!(canon("c1ccccc1"), "c1ccccc1");
        assert_eq!(canon("Cc1ccccc1"), canon("C1=CC=C(C)C=C1"));
        assert_eq!(canon("c1cc[nH]c1"), canon("N1C=CC=C1"));
    }

    #[test]
    fn charged_and_carbonyl_rings_agree_across_notations() {
        assert_eq!(canon("C1=CC=[NH+]C=C1"), canon("c1cc[nH+]cc1"));
        assert_eq!(canon("O=C1C=CC=CN1"), canon("O=c1cccc[nH]1"));
        assert_eq!(
            canon("CN1C=NC2=C1C(=O)N(C)C(=O)N2C"),
            canon("Cn1cnc2c1c(=O)n(C)c(=O)n2C")
        );
    }

    #[test]
    fn long_chains_do_not_exhaust_the_stack() {
        let chain = "C".repeat(20_000);
        assert_eq!(canon(&chain), chain);

        let branched = format!("{}(C)O", "C".repeat(20_000));
        let reversed = format!("OC(C){}", "C".repeat(19_999));
        assert_eq!(canon(&branched), canon(&reversed));
    }

    #[test]
    fn ring_numbering_does_not_matter() {
        assert_eq!(canon("C1CCCCC1"), canon("C2CCCCC2"));
        assert_eq!(canon("C1CC2CCCC2C1"), canon("C12CCCC1CCC2"));
        assert_eq!(canon("C%12CCC%12"), canon("C1CCC1"));
    }

    #[test]
    fn fragments_are_sorted() {
        assert_eq!(canon("[Na+].[Cl-]"), canon("[Cl-].[Na+]"));
    }

    #[test]
    fn distinct_molecules_differ() {
        assert_ne!(canon("CCO"), canon("COC"));
        assert_ne!(canon("C=CC"), canon("CCC"));
        assert_ne!(canon("Oc1ccccc1C"), canon("Oc1ccc(C)cc1"));
    }

    #[test]
    fn output_parses_back_to_same_string() {
        for s in [
            "CCOC(=O)C=[N+]=[N-]",
            "c1ccc2[nH]ccc2c1",
            "C1CC1C(=O)OCC",
            "[13CH3]O",
            "OC(=O)C[NH3+]",
            "C=Cc1ccccc1",
            "O=C1C=CC=CN1",
            "CN1C=NC2=C1C(=O)N(C)C(=O)N2C",
            "C1=CC=[NH+]C=C1",
        ] {
            let first = canon(s);
            assert_eq!(canon(&first), first, "not stable for {}", s);
        }
    }

    #[test]
    fn ranks_are_a_permutation() {
        let mol = parse("CC(C)(C)C").unwrap();
        let mut ranks = canonical_ranks(&mol);
        ranks.sort_unstable();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4]);
    }
}
