use super::ModelError;
use std::collections::BTreeSet;

/// Per-atom identity and annotation fields, as read from a structure file.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomRecord {
    pub serial: usize,
    pub name: String,
    pub residue_name: String,
    pub chain_id: char,
    pub residue_number: isize,
    pub insertion_code: char,
    pub occupancy: f64,
    pub beta: f64,
    pub element: String,
    pub is_hetero: bool,
}

impl Default for AtomRecord {
    fn default() -> Self {
        Self {
            serial: 0,
            name: String::new(),
            residue_name: String::new(),
            chain_id: ' ',
            residue_number: 0,
            insertion_code: ' ',
            occupancy: 1.0,
            beta: 0.0,
            element: String::new(),
            is_hetero: false,
        }
    }
}

impl AtomRecord {
    fn same_residue(&self, other: &AtomRecord) -> bool {
        self.chain_id == other.chain_id
            && self.residue_number == other.residue_number
            && self.insertion_code == other.insertion_code
            && self.residue_name == other.residue_name
    }
}

/// Static description of a molecular system: atoms, bonds and the groupings derived
/// from them.
///
/// Two groupings are precomputed because wrapping treats them as rigid units:
///
/// - **residue**: a 0-based sequential index that increments whenever the
///   (chain, residue number, insertion code, residue name) tuple changes between
///   consecutive atoms.
/// - **fragment**: connected components of the bond graph, numbered in order of
///   their lowest atom index. An atom without bonds is a fragment on its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    atoms: Vec<AtomRecord>,
    bonds: Vec<(usize, usize)>,
    residue_index: Vec<usize>,
    fragment_index: Vec<usize>,
}

impl Topology {
    pub fn new(atoms: Vec<AtomRecord>, bonds: Vec<(usize, usize)>) -> Result<Self, ModelError> {
        let num_atoms = atoms.len();
        let mut unique = BTreeSet::new();
        for &(a, b) in &bonds {
            for index in [a, b] {
                if index >= num_atoms {
                    return Err(ModelError::BondOutOfRange { index, num_atoms });
                }
            }
            if a != b {
                unique.insert((a.min(b), a.max(b)));
            }
        }
        let bonds: Vec<_> = unique.into_iter().collect();

        let residue_index = assign_residues(&atoms);
        let fragment_index = assign_fragments(num_atoms, &bonds);

        Ok(Self {
            atoms,
            bonds,
            residue_index,
            fragment_index,
        })
    }

    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn atoms(&self) -> &[AtomRecord] {
        &self.atoms
    }

    pub fn atom(&self, index: usize) -> Option<&AtomRecord> {
        self.atoms.get(index)
    }

    pub fn bonds(&self) -> &[(usize, usize)] {
        &self.bonds
    }

    pub fn residue(&self, index: usize) -> Option<usize> {
        self.residue_index.get(index).copied()
    }

    pub fn fragment(&self, index: usize) -> Option<usize> {
        self.fragment_index.get(index).copied()
    }

    pub fn num_residues(&self) -> usize {
        self.residue_index.last().map_or(0, |&r| r + 1)
    }

    pub fn num_fragments(&self) -> usize {
        self.fragment_index.iter().max().map_or(0, |&f| f + 1)
    }
}

fn assign_residues(atoms: &[AtomRecord]) -> Vec<usize> {
    let mut indices = Vec::with_capacity(atoms.len());
    let mut current = 0;
    for (i, atom) in atoms.iter().enumerate() {
        if i > 0 && !atom.same_residue(&atoms[i - 1]) {
            current += 1;
        }
        indices.push(current);
    }
    indices
}

fn assign_fragments(num_atoms: usize, bonds: &[(usize, usize)]) -> Vec<usize> {
    let mut parent: Vec<usize> = (0..num_atoms).collect();

    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }

    for &(a, b) in bonds {
        let ra = find(&mut parent, a);
        let rb = find(&mut parent, b);
        if ra != rb {
            parent[ra.max(rb)] = ra.min(rb);
        }
    }

    let mut label = vec![usize::MAX; num_atoms];
    let mut next = 0;
    let mut fragments = Vec::with_capacity(num_atoms);
    for atom in 0..num_atoms {
        let root = find(&mut parent, atom);
        if label[root] == usize::MAX {
            label[root] = next;
            next += 1;
        }
        fragments.push(label[root]);
    }
    fragments
}
