//! Proof generation.
//!
//! The solver can emit a DRAT certificate of its clause database mutations: every learned or
//! derived clause is recorded when it is added and again when it is deleted, and an
//! unsatisfiability result ends the proof with the empty clause. The certificate can be checked
//! by external tools such as `drat-trim`.
use std::io::{self, sink, BufWriter, Write};

use glimsat_formula::Lit;

mod drat;

/// Proof formats that can be generated during solving.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ProofFormat {
    Drat,
    BinaryDrat,
}

/// A single proof step.
///
/// Represents a mutation of the current formula and is emitted where the mutation happens.
#[derive(Debug)]
pub enum ProofStep<'a> {
    /// Add a clause that is implied by the current formula.
    AddClause { clause: &'a [Lit] },
    /// Unit clauses found by top-level propagation.
    UnitClauses { units: &'a [Lit] },
    /// Delete a clause consisting of the given literals.
    DeleteClause { clause: &'a [Lit] },
    /// The formula was proven unsatisfiable.
    End,
}

/// Proof generation.
///
/// IO errors do not abort solving: the failed writer is replaced by a sink and the error is kept
/// until queried through [`take_io_error`](Proof::take_io_error).
pub struct Proof<'a> {
    format: Option<ProofFormat>,
    target: BufWriter<Box<dyn Write + 'a>>,
    io_error: Option<io::Error>,
}

impl<'a> Default for Proof<'a> {
    fn default() -> Proof<'a> {
        Proof {
            format: None,
            target: BufWriter::new(Box::new(sink())),
            io_error: None,
        }
    }
}

impl<'a> Proof<'a> {
    /// Start writing proof steps to the given target with the given format.
    pub fn write_proof(&mut self, target: impl Write + 'a, format: ProofFormat) {
        self.format = Some(format);
        self.target = BufWriter::new(Box::new(target))
    }

    /// Stop writing proof steps.
    pub fn close_proof(&mut self) {
        // We need to explicitly flush to handle IO errors.
        let result = self.target.flush();
        self.handle_io_errors(result);
        self.format = None;
        self.target = BufWriter::new(Box::new(sink()));
    }

    /// Whether proof steps are currently recorded.
    pub fn is_active(&self) -> bool {
        self.format.is_some()
    }

    /// Add a proof step.
    pub fn add_step(&mut self, step: &ProofStep) {
        let result = match self.format {
            None => Ok(()),
            Some(ProofFormat::Drat) => drat::write_step(&mut self.target, step),
            Some(ProofFormat::BinaryDrat) => drat::write_binary_step(&mut self.target, step),
        };
        self.handle_io_errors(result);
    }

    /// Called when solving ends with an unsatisfiability result.
    ///
    /// Emits the empty clause and flushes the proof.
    pub fn solve_finished_unsat(&mut self) {
        self.add_step(&ProofStep::End);
        let result = self.target.flush();
        self.handle_io_errors(result);
    }

    /// The first IO error encountered while writing the proof, if any.
    pub fn take_io_error(&mut self) -> Option<io::Error> {
        self.io_error.take()
    }

    /// Remember the first IO error and stop writing on error.
    fn handle_io_errors(&mut self, result: io::Result<()>) {
        if let Err(error) = result {
            if self.io_error.is_none() {
                self.io_error = Some(error);
            }
            self.format = None;
            self.target = BufWriter::new(Box::new(sink()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;

    use glimsat_formula::lits;

    /// Shared buffer so the proof writer can borrow the output while the test keeps reading it.
    #[derive(Default)]
    struct SharedBuf(RefCell<Vec<u8>>);

    impl Write for &SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn drat_text_output() {
        let buf = SharedBuf::default();
        {
            let mut proof = Proof::default();
            proof.write_proof(&buf, ProofFormat::Drat);

            proof.add_step(&ProofStep::AddClause {
                clause: &lits![1, -2],
            });
            proof.add_step(&ProofStep::UnitClauses { units: &lits![-3] });
            proof.add_step(&ProofStep::DeleteClause {
                clause: &lits![1, -2],
            });
            proof.solve_finished_unsat();
        }

        let output = String::from_utf8(buf.0.borrow().clone()).unwrap();
        assert_eq!(output, "1 -2 0\n-3 0\nd 1 -2 0\n0\n");
    }

    #[test]
    fn inactive_proof_writes_nothing() {
        let buf = SharedBuf::default();
        {
            let mut proof = Proof::default();
            assert!(!proof.is_active());
            proof.add_step(&ProofStep::AddClause {
                clause: &lits![1, 2],
            });
            proof.write_proof(&buf, ProofFormat::Drat);
            assert!(proof.is_active());
            proof.close_proof();
            assert!(!proof.is_active());
            proof.add_step(&ProofStep::AddClause {
                clause: &lits![1, 2],
            });
        }

        assert!(buf.0.borrow().is_empty());
    }

    #[test]
    fn io_errors_are_captured() {
        struct FailingWriter;

        impl Write for FailingWriter {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "no space"))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut proof = Proof::default();
        proof.write_proof(FailingWriter, ProofFormat::Drat);

        for _ in 0..3 {
            proof.add_step(&ProofStep::AddClause {
                clause: &lits![1, 2],
            });
        }
        proof.solve_finished_unsat();

        assert!(!proof.is_active());
        assert!(proof.take_io_error().is_some());
        assert!(proof.take_io_error().is_none());
    }
}
