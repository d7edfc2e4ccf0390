//! Property-Based Invariant Testing
//!
//! Invariants that must hold for any input:
//! - Value inference is deterministic and quoting beats separators
//! - Separator-bearing text never keeps blank parts
//! - Row assignments never change a column's applicability
//! - Records are owned by exactly one purpose group

mod support;

use excel2ids::grid::RawCellValue;
use excel2ids::{FacetBuilder, InferredValue, compile, infer};
use proptest::prelude::*;
use support::{MatrixBuilder, matrix_schema};

// =============================================================================
// Value Inference Invariants
// =============================================================================

proptest! {
    #[test]
    fn prop_infer_is_deterministic(text in "\\PC{0,40}") {
        let raw = RawCellValue::Text(text.clone());
        prop_assert_eq!(infer(&raw), infer(&raw.clone()));
    }

    #[test]
    fn prop_quoted_text_is_always_a_pattern(inner in "[a-zA-Z0-9,;. *-]{0,20}") {
        let raw = RawCellValue::Text(format!("\"{inner}\""));
        prop_assert_eq!(infer(&raw), InferredValue::Pattern(inner));
    }

    #[test]
    fn prop_enumerations_have_no_blank_parts(
        parts in prop::collection::vec("[A-Za-z0-9]{0,6}", 2..6),
        separator in prop::sample::select(vec![",", ";", "\n", " , "]),
    ) {
        let raw = RawCellValue::Text(parts.join(separator));
        match infer(&raw) {
            InferredValue::Enumeration(items) => {
                prop_assert!(items.len() >= 2);
                prop_assert!(items.iter().all(|item| !item.trim().is_empty()));
            }
            InferredValue::Literal(text) => prop_assert!(!text.contains([',', ';', '\n'])),
            InferredValue::Empty => prop_assert!(parts.iter().all(|p| p.is_empty())),
            other => prop_assert!(false, "unexpected {:?}", other),
        }
    }
}

// =============================================================================
// Grid Walk Invariants
// =============================================================================

proptest! {
    #[test]
    fn prop_assignments_never_change_applicability(
        assignments in prop::collection::vec(
            prop::option::of(prop::sample::select(vec!["X", "x", "30", "REPLACEME", " "])),
            3,
        ),
    ) {
        let schema = matrix_schema();
        let mut builder = MatrixBuilder::new()
            .column("L", "IfcDoor.Gate", "Doors")
            .property(20, "Pset_DoorCommon", "FireRating", "IfcLabel")
            .property(21, "Pset_DoorCommon", "AcousticRating", "IfcLabel")
            .property(22, "Pset_DoorCommon", "IsExternal", "IfcBoolean")
            .cell("E22", "REPLACEME");
        let baseline = {
            let grid = builder.clone().build();
            FacetBuilder::new(&schema, &grid).applicability(12).unwrap()
        };

        for (offset, assignment) in assignments.iter().enumerate() {
            if let Some(value) = assignment {
                builder = builder.assign("L", 20 + offset as u32, value);
            }
        }
        let grid = builder.build();
        prop_assert_eq!(
            &FacetBuilder::new(&schema, &grid).applicability(12).unwrap(),
            &baseline
        );

        let compilation = compile(&schema, &grid).unwrap();
        for spec in compilation.groups.iter().flat_map(|g| &g.specifications) {
            prop_assert_eq!(&spec.applicability, &baseline);
        }
    }

    #[test]
    fn prop_records_belong_to_exactly_one_group(
        purposes in prop::collection::vec(
            prop::sample::select(vec!["Fire", "Acoustics", "Fire;Acoustics", "", "Energy"]),
            3,
        ),
    ) {
        let mut builder = MatrixBuilder::new()
            .column("L", "IfcWall", "Walls")
            .column("M", "IfcSlab", "Slabs")
            .property(20, "Pset_A", "One", "IfcLabel")
            .property(21, "Pset_A", "Two", "IfcLabel")
            .property(22, "Pset_A", "Three", "IfcLabel");
        for (offset, purpose) in purposes.iter().enumerate() {
            let row = 20 + offset as u32;
            builder = builder
                .cell(&format!("K{row}"), purpose)
                .assign("L", row, "X")
                .assign("M", row, "X");
        }
        let compilation = compile(&matrix_schema(), &builder.build()).unwrap();

        let mut seen = std::collections::HashSet::new();
        for group in &compilation.groups {
            for spec in &group.specifications {
                prop_assert_eq!(&spec.purpose, &group.purpose);
                prop_assert!(seen.insert(spec.identity()));
            }
        }
    }
}
