//! Evaluates a parsed selection against a topology.

use super::parser::{Expr, IntegerField, RealField, StringField};
use crate::core::models::topology::{AtomRecord, Topology};

const WATER_RESIDUE_NAMES: &[&str] = &[
    "HOH", "WAT", "SOL", "H2O", "TIP", "TIP3", "TIP4", "TIP5", "TIP3P", "SPC", "SPCE",
];

/// Returns the indices of all atoms matching `expr`, in ascending order.
pub fn evaluate(expr: &Expr, topology: &Topology) -> Vec<usize> {
    mask(expr, topology)
        .into_iter()
        .enumerate()
        .filter_map(|(i, selected)| selected.then_some(i))
        .collect()
}

fn mask(expr: &Expr, topology: &Topology) -> Vec<bool> {
    let n = topology.num_atoms();
    match expr {
        Expr::All => vec![true; n],
        Expr::Nothing => vec![false; n],
        Expr::Water => per_atom(topology, |_, atom| {
            WATER_RESIDUE_NAMES.contains(&atom.residue_name.to_ascii_uppercase().as_str())
        }),
        Expr::Not(inner) => mask(inner, topology).into_iter().map(|m| !m).collect(),
        Expr::And(lhs, rhs) => combine(mask(lhs, topology), mask(rhs, topology), |a, b| a && b),
        Expr::Or(lhs, rhs) => combine(mask(lhs, topology), mask(rhs, topology), |a, b| a || b),
        Expr::Strings { field, patterns } => per_atom(topology, |_, atom| {
            let value = string_value(atom, *field);
            patterns.iter().any(|p| p.matches(&value))
        }),
        Expr::Integers { field, ranges } => per_atom(topology, |i, atom| {
            let value = integer_value(topology, i, atom, *field);
            ranges.iter().any(|&(lo, hi)| lo <= value && value <= hi)
        }),
        Expr::Reals { field, values } => per_atom(topology, |_, atom| {
            let value = real_value(atom, *field);
            values.iter().any(|&v| v == value)
        }),
        Expr::Compare { field, op, value } => {
            per_atom(topology, |_, atom| op.apply(real_value(atom, *field), *value))
        }
    }
}

fn per_atom(topology: &Topology, pred: impl Fn(usize, &AtomRecord) -> bool) -> Vec<bool> {
    topology
        .atoms()
        .iter()
        .enumerate()
        .map(|(i, atom)| pred(i, atom))
        .collect()
}

fn combine(lhs: Vec<bool>, rhs: Vec<bool>, op: impl Fn(bool, bool) -> bool) -> Vec<bool> {
    lhs.into_iter().zip(rhs).map(|(a, b)| op(a, b)).collect()
}

fn string_value(atom: &AtomRecord, field: StringField) -> String {
    match field {
        StringField::Name => atom.name.clone(),
        StringField::Resname => atom.residue_name.clone(),
        StringField::Chain => atom.chain_id.to_string(),
        StringField::Element => atom.element.clone(),
    }
}

fn integer_value(topology: &Topology, index: usize, atom: &AtomRecord, field: IntegerField) -> i64 {
    match field {
        IntegerField::Index => index as i64,
        IntegerField::Serial => atom.serial as i64,
        IntegerField::Resid => atom.residue_number as i64,
        IntegerField::Residue => topology.residue(index).map_or(-1, |r| r as i64),
        IntegerField::Fragment => topology.fragment(index).map_or(-1, |f| f as i64),
    }
}

fn real_value(atom: &AtomRecord, field: RealField) -> f64 {
    match field {
        RealField::Beta => atom.beta,
        RealField::Occupancy => atom.occupancy,
    }
}
