//! Writing of DRAT proofs.
use std::io::{self, Write};

use glimsat_formula::Lit;

use super::ProofStep;

/// Write a proof step in text DRAT format.
pub fn write_step(target: &mut impl Write, step: &ProofStep) -> io::Result<()> {
    match step {
        ProofStep::AddClause { clause } => write_literals(target, clause)?,
        ProofStep::UnitClauses { units } => {
            for &unit in units.iter() {
                write_literals(target, &[unit])?;
            }
        }
        ProofStep::DeleteClause { clause } => {
            target.write_all(b"d ")?;
            write_literals(target, clause)?;
        }
        ProofStep::End => write_literals(target, &[])?,
    }

    Ok(())
}

/// Write a proof step in binary DRAT format.
pub fn write_binary_step(target: &mut impl Write, step: &ProofStep) -> io::Result<()> {
    match step {
        ProofStep::AddClause { clause } => {
            target.write_all(b"a")?;
            write_binary_literals(target, clause)?;
        }
        ProofStep::UnitClauses { units } => {
            for &unit in units.iter() {
                target.write_all(b"a")?;
                write_binary_literals(target, &[unit])?;
            }
        }
        ProofStep::DeleteClause { clause } => {
            target.write_all(b"d")?;
            write_binary_literals(target, clause)?;
        }
        ProofStep::End => {
            target.write_all(b"a")?;
            write_binary_literals(target, &[])?;
        }
    }

    Ok(())
}

/// Write the literals of a clause for a step in a text DRAT proof.
fn write_literals(target: &mut impl Write, literals: &[Lit]) -> io::Result<()> {
    for &lit in literals {
        itoa::write(&mut *target, lit.to_dimacs())?;
        target.write_all(b" ")?;
    }
    target.write_all(b"0\n")?;
    Ok(())
}

/// Write the literals of a clause for a step in a binary DRAT proof.
fn write_binary_literals(target: &mut impl Write, literals: &[Lit]) -> io::Result<()> {
    for &lit in literals {
        let drat_code = lit.code() as u64 + 2;
        leb128::write::unsigned(target, drat_code)?;
    }
    target.write_all(&[0])?;
    Ok(())
}
