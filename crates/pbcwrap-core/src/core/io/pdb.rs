use crate::core::geometry::UnitCell;
use crate::core::io::traits::TrajectoryFile;
use crate::core::models::ModelError;
use crate::core::models::frame::Frame;
use crate::core::models::topology::{AtomRecord, Topology};
use crate::core::models::trajectory::Trajectory;
use std::collections::{BTreeMap, HashMap};
use std::io::{self, BufRead, Write};
use thiserror::Error;

const MIN_ATOM_LINE_LEN: usize = 54;
const MIN_CRYST1_LINE_LEN: usize = 54;
const CONECT_PARTNER_COLUMNS: [(usize, usize); 4] = [(11, 16), (16, 21), (21, 26), (26, 31)];
const COORDINATE_WIDTH: usize = 8;

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: PdbParseErrorKind },
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
    #[error("Invalid structure: {0}")]
    Model(#[from] ModelError),
    #[error("No ATOM or HETATM records found")]
    Empty,
    #[error("Coordinate {value} of atom {atom} in frame {frame} does not fit the 8.3 PDB column")]
    CoordinateOverflow { frame: usize, atom: usize, value: f32 },
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: &'static str, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: &'static str, value: String },
    #[error("{record} record is too short (must be at least {min_len} chars)")]
    LineTooShort { record: &'static str, min_len: usize },
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

fn column_char(line: &str, index: usize) -> char {
    line.get(index..index + 1)
        .and_then(|s| s.chars().next())
        .unwrap_or(' ')
}

fn parse_float(
    line: &str,
    line_num: usize,
    (start, end): (usize, usize),
    columns: &'static str,
) -> Result<f64, PdbError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns,
            value: value.into(),
        },
    })
}

fn parse_float_or(
    line: &str,
    line_num: usize,
    range: (usize, usize),
    columns: &'static str,
    default: f64,
) -> Result<f64, PdbError> {
    if slice_and_trim(line, range.0, range.1).is_empty() {
        return Ok(default);
    }
    parse_float(line, line_num, range, columns)
}

fn parse_int<T: std::str::FromStr>(
    value: &str,
    line_num: usize,
    columns: &'static str,
) -> Result<T, PdbError> {
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidInt {
            columns,
            value: value.into(),
        },
    })
}

/// Accumulates atoms and frames while streaming through a PDB file.
#[derive(Default)]
struct PdbReadState {
    atoms: Vec<AtomRecord>,
    frames: Vec<Frame>,
    coords: Vec<f32>,
    cell: UnitCell,
    conect: Vec<(usize, usize)>,
}

impl PdbReadState {
    fn in_first_frame(&self) -> bool {
        self.frames.is_empty()
    }

    fn finish_frame(&mut self) -> Result<(), PdbError> {
        if self.coords.is_empty() {
            return Ok(());
        }
        let expected = 3 * self.atoms.len();
        if self.coords.len() != expected {
            return Err(PdbError::Inconsistency(format!(
                "Frame {} has {} atoms, but the first frame has {}",
                self.frames.len(),
                self.coords.len() / 3,
                self.atoms.len()
            )));
        }
        let coords = std::mem::take(&mut self.coords);
        self.frames.push(Frame::new(self.cell, coords));
        Ok(())
    }

    fn read_atom(&mut self, line: &str, line_num: usize, is_hetero: bool) -> Result<(), PdbError> {
        if line.len() < MIN_ATOM_LINE_LEN {
            return Err(PdbError::Parse {
                line: line_num,
                kind: PdbParseErrorKind::LineTooShort {
                    record: "ATOM/HETATM",
                    min_len: MIN_ATOM_LINE_LEN,
                },
            });
        }

        let x = parse_float(line, line_num, (30, 38), "31-38")?;
        let y = parse_float(line, line_num, (38, 46), "39-46")?;
        let z = parse_float(line, line_num, (46, 54), "47-54")?;
        self.coords.extend([x as f32, y as f32, z as f32]);

        if !self.in_first_frame() {
            return Ok(());
        }

        let serial_str = slice_and_trim(line, 6, 11);
        // Writers overflow the 5-column serial field with asterisks on large systems.
        let serial = if serial_str.is_empty() || serial_str.chars().all(|c| c == '*') {
            self.atoms.len() + 1
        } else {
            parse_int(serial_str, line_num, "7-11")?
        };
        let residue_number = parse_int(slice_and_trim(line, 22, 26), line_num, "23-26")?;

        self.atoms.push(AtomRecord {
            serial,
            name: slice_and_trim(line, 12, 16).to_string(),
            residue_name: slice_and_trim(line, 17, 21).to_string(),
            chain_id: column_char(line, 21),
            residue_number,
            insertion_code: column_char(line, 26),
            occupancy: parse_float_or(line, line_num, (54, 60), "55-60", 1.0)?,
            beta: parse_float_or(line, line_num, (60, 66), "61-66", 0.0)?,
            element: slice_and_trim(line, 76, 78).to_string(),
            is_hetero,
        });
        Ok(())
    }

    fn read_cryst1(&mut self, line: &str, line_num: usize) -> Result<(), PdbError> {
        if line.len() < MIN_CRYST1_LINE_LEN {
            return Err(PdbError::Parse {
                line: line_num,
                kind: PdbParseErrorKind::LineTooShort {
                    record: "CRYST1",
                    min_len: MIN_CRYST1_LINE_LEN,
                },
            });
        }
        self.cell = UnitCell::new(
            [
                parse_float(line, line_num, (6, 15), "7-15")?,
                parse_float(line, line_num, (15, 24), "16-24")?,
                parse_float(line, line_num, (24, 33), "25-33")?,
            ],
            [
                parse_float(line, line_num, (33, 40), "34-40")?,
                parse_float(line, line_num, (40, 47), "41-47")?,
                parse_float(line, line_num, (47, 54), "48-54")?,
            ],
        );
        Ok(())
    }

    fn read_conect(&mut self, line: &str, line_num: usize) -> Result<(), PdbError> {
        let origin: usize = parse_int(slice_and_trim(line, 6, 11), line_num, "7-11")?;
        for (start, end) in CONECT_PARTNER_COLUMNS {
            let value = slice_and_trim(line, start, end);
            if value.is_empty() {
                continue;
            }
            let partner = parse_int(value, line_num, "12-31")?;
            self.conect.push((origin, partner));
        }
        Ok(())
    }

    fn into_trajectory(mut self) -> Result<Trajectory, PdbError> {
        self.finish_frame()?;
        if self.atoms.is_empty() {
            return Err(PdbError::Empty);
        }

        let by_serial: HashMap<usize, usize> = self
            .atoms
            .iter()
            .enumerate()
            .map(|(i, a)| (a.serial, i))
            .collect();
        let lookup = |serial: usize| {
            by_serial.get(&serial).copied().ok_or_else(|| {
                PdbError::Inconsistency(format!("CONECT record references unknown atom serial {}", serial))
            })
        };
        let mut bonds = Vec::with_capacity(self.conect.len());
        for &(a, b) in &self.conect {
            bonds.push((lookup(a)?, lookup(b)?));
        }

        let topology = Topology::new(self.atoms, bonds)?;
        Ok(Trajectory::new(topology, self.frames)?)
    }
}

/// Multi-model PDB trajectories.
///
/// Frames are delimited by `MODEL`/`ENDMDL` (or `END`); a file without them is a
/// single frame. The most recent `CRYST1` record applies to every following frame
/// until another one appears. Only the first frame contributes atom records; later
/// frames must list the same number of atoms in the same order.
pub struct PdbFile;

impl TrajectoryFile for PdbFile {
    type Error = PdbError;

    fn read_from(reader: &mut impl BufRead) -> Result<Trajectory, Self::Error> {
        let mut state = PdbReadState::default();

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;

            match slice_and_trim(&line, 0, 6) {
                "ATOM" => state.read_atom(&line, line_num, false)?,
                "HETATM" => state.read_atom(&line, line_num, true)?,
                "CRYST1" => state.read_cryst1(&line, line_num)?,
                "CONECT" => state.read_conect(&line, line_num)?,
                "MODEL" | "ENDMDL" | "END" => state.finish_frame()?,
                _ => {}
            }
        }

        state.into_trajectory()
    }

    fn write_to(trajectory: &Trajectory, writer: &mut impl Write) -> Result<(), Self::Error> {
        check_coordinate_widths(trajectory)?;
        let topology = trajectory.topology();
        for (index, frame) in trajectory.frames().iter().enumerate() {
            if frame.cell.lengths.iter().any(|&l| l != 0.0) {
                writeln!(writer, "{}", format_cryst1(&frame.cell))?;
            }
            writeln!(writer, "MODEL     {:>4}", index + 1)?;
            for (atom, position) in topology.atoms().iter().zip(frame.coords.chunks_exact(3)) {
                writeln!(writer, "{}", format_atom(atom, position))?;
            }
            writeln!(writer, "ENDMDL")?;
        }

        let mut partners: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for &(a, b) in topology.bonds() {
            partners.entry(a).or_default().push(b);
            partners.entry(b).or_default().push(a);
        }
        let atoms = topology.atoms();
        for (atom, bonded) in partners {
            for chunk in bonded.chunks(CONECT_PARTNER_COLUMNS.len()) {
                write!(writer, "CONECT{:>5}", atoms[atom].serial % 100_000)?;
                for &partner in chunk {
                    write!(writer, "{:>5}", atoms[partner].serial % 100_000)?;
                }
                writeln!(writer)?;
            }
        }
        writeln!(writer, "END")?;
        Ok(())
    }
}

/// Rejects trajectories whose coordinates would spill out of the fixed-width fields.
fn check_coordinate_widths(trajectory: &Trajectory) -> Result<(), PdbError> {
    for (frame, data) in trajectory.frames().iter().enumerate() {
        for (index, &value) in data.coords.iter().enumerate() {
            if format!("{:.3}", value).len() > COORDINATE_WIDTH {
                return Err(PdbError::CoordinateOverflow {
                    frame,
                    atom: index / 3,
                    value,
                });
            }
        }
    }
    Ok(())
}

fn format_cryst1(cell: &UnitCell) -> String {
    format!(
        "CRYST1{:>9.3}{:>9.3}{:>9.3}{:>7.2}{:>7.2}{:>7.2} P 1           1",
        cell.lengths[0], cell.lengths[1], cell.lengths[2], cell.angles[0], cell.angles[1], cell.angles[2]
    )
}

fn truncated(s: &str, width: usize) -> &str {
    match s.char_indices().nth(width) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn format_atom(atom: &AtomRecord, position: &[f32]) -> String {
    let record = if atom.is_hetero { "HETATM" } else { "ATOM  " };
    let name = truncated(&atom.name, 4);
    // Names shorter than four characters start in column 14 unless the element symbol
    // takes two characters.
    let name_field = if name.len() < 4 && atom.element.len() < 2 {
        format!(" {:<3}", name)
    } else {
        format!("{:<4}", name)
    };
    format!(
        "{}{:>5} {} {:<4}{}{:>4}{}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}",
        record,
        atom.serial % 100_000,
        name_field,
        truncated(&atom.residue_name, 4),
        atom.chain_id,
        atom.residue_number % 10_000,
        atom.insertion_code,
        position[0],
        position[1],
        position[2],
        atom.occupancy,
        atom.beta,
        truncated(&atom.element, 2),
    )
}
