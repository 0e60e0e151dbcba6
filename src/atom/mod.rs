//! Atom representation and element classification

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chemical elements recognized when reading PDB records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Element {
    Carbon,     // C
    Nitrogen,   // N
    Oxygen,     // O
    Sulfur,     // S
    Phosphorus, // P
    Fluorine,   // F
    Chlorine,   // Cl
    Bromine,    // Br
    Iodine,     // I
    Hydrogen,   // H

    // Common metal centers in binding sites
    Zinc,      // Zn
    Calcium,   // Ca
    Manganese, // Mn
    Magnesium, // Mg
    Iron,      // Fe

    // For atoms that don't match any of the above
    Unknown,
}

impl Element {
    /// Returns the van der Waals radius of the element in Angstroms
    pub fn radius(&self) -> f64 {
        match self {
            Element::Carbon => 1.7,
            Element::Nitrogen => 1.55,
            Element::Oxygen => 1.52,
            Element::Sulfur => 1.8,
            Element::Phosphorus => 1.8,
            Element::Fluorine => 1.47,
            Element::Chlorine => 1.75,
            Element::Bromine => 1.85,
            Element::Iodine => 1.98,
            Element::Hydrogen => 1.2,
            Element::Zinc => 1.39,
            Element::Calcium => 1.97,
            Element::Manganese => 1.3,
            Element::Magnesium => 1.73,
            Element::Iron => 1.3,
            Element::Unknown => 1.7, // Default radius
        }
    }

    /// Parse an element from the symbol column of a PDB record
    pub fn from_pdb_string(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "C" => Element::Carbon,
            "N" => Element::Nitrogen,
            "O" => Element::Oxygen,
            "S" => Element::Sulfur,
            "P" => Element::Phosphorus,
            "F" => Element::Fluorine,
            "CL" => Element::Chlorine,
            "BR" => Element::Bromine,
            "I" => Element::Iodine,
            "H" => Element::Hydrogen,
            "ZN" => Element::Zinc,
            "CA" => Element::Calcium,
            "MN" => Element::Manganese,
            "MG" => Element::Magnesium,
            "FE" => Element::Iron,
            _ => Element::Unknown,
        }
    }

    /// Convert the element to its PDB symbol
    pub fn to_pdb_string(&self) -> &'static str {
        match self {
            Element::Carbon => "C",
            Element::Nitrogen => "N",
            Element::Oxygen => "O",
            Element::Sulfur => "S",
            Element::Phosphorus => "P",
            Element::Fluorine => "F",
            Element::Chlorine => "Cl",
            Element::Bromine => "Br",
            Element::Iodine => "I",
            Element::Hydrogen => "H",
            Element::Zinc => "Zn",
            Element::Calcium => "Ca",
            Element::Manganese => "Mn",
            Element::Magnesium => "Mg",
            Element::Iron => "Fe",
            Element::Unknown => "X",
        }
    }

    /// Guess the element from a PDB atom name when the symbol column is absent
    pub fn from_atom_name(name: &str) -> Self {
        let stripped: String = name
            .trim()
            .chars()
            .skip_while(|c| c.is_ascii_digit())
            .collect();

        // Two-letter symbols first, then the leading letter
        let upper = stripped.to_uppercase();
        for sym in ["CL", "BR", "ZN", "MN", "MG", "FE"] {
            if upper.starts_with(sym) {
                return Element::from_pdb_string(sym);
            }
        }

        match upper.chars().next() {
            Some(c) => Element::from_pdb_string(&c.to_string()),
            None => Element::Unknown,
        }
    }
}

/// Represents an atom in 3D space
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Atom {
    /// Element of this atom
    pub element: Element,

    /// 3D coordinates (in Angstroms)
    pub coordinates: Vector3<f64>,

    /// Atom name from PDB format (e.g., "CA", "N", "O")
    pub name: String,

    /// Atom serial number from PDB
    pub serial: u32,

    /// Partial charge
    pub charge: f64,

    /// Was this atom read from a HETATM record?
    pub is_hetatm: bool,
}

impl Atom {
    /// Create a new atom
    pub fn new(
        element: Element,
        coordinates: Vector3<f64>,
        name: String,
        serial: u32,
        charge: f64,
        is_hetatm: bool,
    ) -> Self {
        Self {
            element,
            coordinates,
            name,
            serial,
            charge,
            is_hetatm,
        }
    }

    /// Calculate distance to another atom
    pub fn distance(&self, other: &Atom) -> f64 {
        (self.coordinates - other.coordinates).norm()
    }

    /// Check if this atom can participate in hydrogen bonds
    pub fn is_polar(&self) -> bool {
        matches!(
            self.element,
            Element::Nitrogen | Element::Oxygen | Element::Sulfur
        )
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}, {}, {}) [{}]",
            self.element.to_pdb_string(),
            self.coordinates.x,
            self.coordinates.y,
            self.coordinates.z,
            self.charge
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn test_element_radius() {
        assert_eq!(Element::Carbon.radius(), 1.7);
        assert_eq!(Element::Nitrogen.radius(), 1.55);
        assert_eq!(Element::Oxygen.radius(), 1.52);
        assert_eq!(Element::Hydrogen.radius(), 1.2);
    }

    #[test]
    fn test_element_from_pdb_string() {
        assert_eq!(Element::from_pdb_string("C"), Element::Carbon);
        assert_eq!(Element::from_pdb_string("CL"), Element::Chlorine);
        assert_eq!(Element::from_pdb_string("Zn"), Element::Zinc);
        assert_eq!(Element::from_pdb_string(" N "), Element::Nitrogen);
        assert_eq!(Element::from_pdb_string("XYZ"), Element::Unknown);
    }

    #[test]
    fn test_element_from_atom_name() {
        assert_eq!(Element::from_atom_name("CA"), Element::Carbon);
        assert_eq!(Element::from_atom_name("OD1"), Element::Oxygen);
        assert_eq!(Element::from_atom_name("1HB"), Element::Hydrogen);
        assert_eq!(Element::from_atom_name("CL1"), Element::Chlorine);
        assert_eq!(Element::from_atom_name("N"), Element::Nitrogen);
    }

    #[test]
    fn test_atom_creation() {
        let atom = Atom::new(
            Element::Carbon,
            Vector3::new(1.0, 2.0, 3.0),
            "CA".to_string(),
            1,
            0.0,
            false,
        );

        assert_eq!(atom.element, Element::Carbon);
        assert_eq!(atom.coordinates, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(atom.name, "CA");
        assert_eq!(atom.serial, 1);
        assert_eq!(atom.charge, 0.0);
        assert!(!atom.is_hetatm);
    }

    #[test]
    fn test_atom_distance() {
        let atom1 = Atom::new(
            Element::Carbon,
            Vector3::new(0.0, 0.0, 0.0),
            "CA".to_string(),
            1,
            0.0,
            false,
        );

        let atom2 = Atom::new(
            Element::Carbon,
            Vector3::new(1.0, 1.0, 1.0),
            "CA".to_string(),
            2,
            0.0,
            false,
        );

        // Distance should be sqrt(3) ~ 1.732
        assert!((atom1.distance(&atom2) - 1.732).abs() < 0.001);
    }

    #[test]
    fn test_atom_polarity() {
        let oxygen = Atom::new(
            Element::Oxygen,
            Vector3::zeros(),
            "O".to_string(),
            1,
            0.0,
            false,
        );
        let carbon = Atom::new(
            Element::Carbon,
            Vector3::zeros(),
            "C".to_string(),
            2,
            0.0,
            false,
        );

        assert!(oxygen.is_polar());
        assert!(!carbon.is_polar());
    }
}
