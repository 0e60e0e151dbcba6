//! PDB reading and writing for pose structures

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use thiserror::Error;

use crate::atom::{Atom, Element};
use crate::pose::{Pose, Residue, ResidueId};
use nalgebra::Vector3;

/// Errors that can occur during file I/O operations
#[derive(Error, Debug)]
pub enum IoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),
}

/// Parse a PDB file into a Pose
pub fn parse_pdb_file<P: AsRef<Path>>(path: P) -> Result<Pose, IoError> {
    let file = File::open(path.as_ref())?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    std::io::Read::read_to_string(&mut reader, &mut contents)?;

    let name = path
        .as_ref()
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");

    parse_pdb_string_named(&contents, name)
}

/// Parse PDB text into a Pose
pub fn parse_pdb_string(pdb: &str) -> Result<Pose, IoError> {
    parse_pdb_string_named(pdb, "unknown")
}

fn parse_pdb_string_named(pdb: &str, name: &str) -> Result<Pose, IoError> {
    let mut pose = Pose::new(name);
    let mut line_number = 0;

    for line in pdb.lines() {
        line_number += 1;

        // Skip empty lines and comments
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with("ATOM") || line.starts_with("HETATM") {
            let (atom, residue_name, residue_id) = parse_pdb_atom(line, line_number)?;

            // Atoms sharing chain/number/name extend the current residue
            let extends_current = pose
                .residues
                .last()
                .map(|r| r.id == residue_id && r.name == residue_name)
                .unwrap_or(false);

            if !extends_current {
                pose.residues.push(Residue::new(&residue_name, residue_id));
            }
            pose.residues
                .last_mut()
                .expect("residue was just pushed")
                .atoms
                .push(atom);
        } else if line.starts_with("ENDMDL") {
            // Only the first model is read
            break;
        } else {
            // TER, REMARK, MODEL, CONECT and everything else are ignored
        }
    }

    if pose.residues.is_empty() {
        return Err(IoError::InvalidFormat(
            "No ATOM or HETATM records found".to_string(),
        ));
    }

    pose.rebuild_fold_tree();

    Ok(pose)
}

/// Parse one ATOM/HETATM record into an atom plus its residue tags
fn parse_pdb_atom(
    line: &str,
    line_number: usize,
) -> Result<(Atom, String, ResidueId), IoError> {
    if line.len() < 54 {
        return Err(IoError::Parse {
            line: line_number,
            message: format!("Line too short for atom record: {}", line),
        });
    }

    let is_hetatm = line.starts_with("HETATM");

    // Parse atom serial number
    let serial = line[6..11]
        .trim()
        .parse::<u32>()
        .map_err(|_| IoError::Parse {
            line: line_number,
            message: format!("Invalid atom serial number: {}", &line[6..11]),
        })?;

    // Parse atom name
    let atom_name = line[12..16].trim().to_string();

    // Parse residue name
    let residue_name = line[17..20].trim().to_string();

    // Parse chain ID
    let chain = line[21..22].chars().next().unwrap_or('A');

    // Parse residue number
    let residue_num = line[22..26]
        .trim()
        .parse::<i32>()
        .map_err(|_| IoError::Parse {
            line: line_number,
            message: format!("Invalid residue number: {}", &line[22..26]),
        })?;

    // Parse coordinates
    let x = line[30..38]
        .trim()
        .parse::<f64>()
        .map_err(|_| IoError::Parse {
            line: line_number,
            message: format!("Invalid x coordinate: {}", &line[30..38]),
        })?;

    let y = line[38..46]
        .trim()
        .parse::<f64>()
        .map_err(|_| IoError::Parse {
            line: line_number,
            message: format!("Invalid y coordinate: {}", &line[38..46]),
        })?;

    let z = line[46..54]
        .trim()
        .parse::<f64>()
        .map_err(|_| IoError::Parse {
            line: line_number,
            message: format!("Invalid z coordinate: {}", &line[46..54]),
        })?;

    // Element column is optional; fall back to the atom name
    let element = if line.len() >= 78 && !line[76..78].trim().is_empty() {
        Element::from_pdb_string(line[76..78].trim())
    } else {
        Element::from_atom_name(&atom_name)
    };

    let atom = Atom::new(
        element,
        Vector3::new(x, y, z),
        atom_name,
        serial,
        0.0,
        is_hetatm,
    );

    Ok((atom, residue_name, ResidueId::new(chain, residue_num)))
}

/// Serialize a pose to PDB text
pub fn pdb_string(pose: &Pose) -> String {
    let mut out = String::new();
    out.push_str("REMARK PDB file generated by vscreenml\n");

    let mut serial = 0;
    let mut prev_chain = None;

    for residue in &pose.residues {
        // TER between chains
        if let Some(prev) = prev_chain {
            if prev != residue.id.chain {
                out.push_str("TER\n");
            }
        }
        prev_chain = Some(residue.id.chain);

        for atom in &residue.atoms {
            serial += 1;
            let record_type = if atom.is_hetatm { "HETATM" } else { "ATOM  " };

            out.push_str(&format!(
                "{}{:5} {:<4}{:>4} {:1}{:4}    {:8.3}{:8.3}{:8.3}{:6.2}{:6.2}          {:>2}\n",
                record_type,
                serial,
                atom.name,
                residue.name,
                residue.id.chain,
                residue.id.number,
                atom.coordinates.x,
                atom.coordinates.y,
                atom.coordinates.z,
                1.0, // Occupancy
                0.0, // Temperature factor
                atom.element.to_pdb_string(),
            ));
        }
    }

    out.push_str("END\n");
    out
}

/// Write a pose to a PDB file
pub fn write_pdb<P: AsRef<Path>>(pose: &Pose, path: P) -> Result<(), IoError> {
    let mut file = File::create(path)?;
    file.write_all(pdb_string(pose).as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PDB: &str = "\
ATOM      1  N   GLY A   1      10.000  10.000  10.000  1.00  0.00           N
ATOM      2  CA  GLY A   1      11.200  10.500  10.300  1.00  0.00           C
ATOM      3  C   GLY A   1      12.100   9.600  11.000  1.00  0.00           C
ATOM      4  N   ALA A   2      13.000  10.100  11.800  1.00  0.00           N
ATOM      5  CA  ALA A   2      14.000   9.400  12.500  1.00  0.00           C
TER
HETATM    6  C1  LIG X   1      12.500  12.500  12.500  1.00  0.00           C
HETATM    7  O1  LIG X   1      13.400  13.100  13.000  1.00  0.00           O
END
";

    #[test]
    fn test_parse_pdb_string() {
        let pose = parse_pdb_string(SAMPLE_PDB).expect("Should parse");

        assert_eq!(pose.size(), 3);
        assert_eq!(pose.total_atoms(), 7);
        assert_eq!(pose.residues[0].name, "GLY");
        assert_eq!(pose.residues[2].id, ResidueId::new('X', 1));
        assert!(pose.residues[2].atoms[0].is_hetatm);

        // One jump: chain X relative to chain A
        assert_eq!(pose.fold_tree.num_jumps(), 1);
    }

    #[test]
    fn test_parse_rejects_empty_input() {
        assert!(parse_pdb_string("REMARK nothing here\n").is_err());
    }

    #[test]
    fn test_parse_rejects_short_atom_record() {
        let err = parse_pdb_string("ATOM      1  N   GLY A   1\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let pose = parse_pdb_string(SAMPLE_PDB).expect("Should parse");
        let text = pdb_string(&pose);
        let reloaded = parse_pdb_string(&text).expect("Should reparse");

        assert_eq!(reloaded.size(), pose.size());
        assert_eq!(reloaded.total_atoms(), pose.total_atoms());

        for (orig, new) in pose.residues.iter().zip(reloaded.residues.iter()) {
            assert_eq!(orig.id, new.id);
            assert_eq!(orig.name, new.name);
            for (a, b) in orig.atoms.iter().zip(new.atoms.iter()) {
                assert!((a.coordinates - b.coordinates).norm() < 1e-3);
            }
        }
    }
}
