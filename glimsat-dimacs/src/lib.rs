//! DIMACS CNF parser and writer for the glimsat SAT solver.

use std::{borrow::Borrow, io, mem::replace};

use glimsat_formula::{CnfFormula, Lit, Var};

use anyhow::Error;
use thiserror::Error;

/// Possible errors while parsing a DIMACS CNF formula.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("line {}: unexpected character in DIMACS CNF input: '{}'", line, unexpected)]
    UnexpectedInput { line: usize, unexpected: char },
    #[error("line {}: literal index is too large: {}{}...", line, index, final_digit)]
    LiteralTooLarge {
        line: usize,
        index: usize,
        final_digit: usize,
    },
    #[error("line {}: invalid header syntax: {}", line, header)]
    InvalidHeader { line: usize, header: String },
    #[error("line {}: unterminated clause", line)]
    UnterminatedClause { line: usize },
    #[error(
        "formula has {} variables while the header specifies {} variables",
        var_count,
        header_var_count
    )]
    VarCount {
        var_count: usize,
        header_var_count: usize,
    },
    #[error(
        "formula has {} clauses while the header specifies {} clauses",
        clause_count,
        header_clause_count
    )]
    ClauseCount {
        clause_count: usize,
        header_clause_count: usize,
    },
    #[error("parser invoked after a previous error")]
    PreviousError,
}

/// Variable and clause count of a DIMACS CNF header.
#[derive(Copy, Clone, Debug)]
pub struct DimacsHeader {
    pub var_count: usize,
    pub clause_count: usize,
}

/// Parser for DIMACS CNF files.
///
/// Consumes the input in chunks and can hand out the parsed clauses in chunks, so arbitrarily
/// large inputs can be processed in constant memory.
#[derive(Default)]
pub struct DimacsParser {
    formula: CnfFormula,
    partial_clause: Vec<Lit>,
    header: Option<DimacsHeader>,

    line_number: usize,
    clause_count: usize,
    pending_index: usize,
    pending_negative: bool,

    in_lit: bool,
    skipping_line: bool,
    in_header: bool,
    start_of_line: bool,
    error: bool,

    header_line: Vec<u8>,
}

impl DimacsParser {
    /// Create a new DIMACS CNF parser.
    pub fn new() -> DimacsParser {
        DimacsParser {
            line_number: 1,
            start_of_line: true,
            ..DimacsParser::default()
        }
    }

    /// Parse the given input and check the header if present.
    ///
    /// This parses the whole input into a single [`CnfFormula`](glimsat_formula::CnfFormula). Use
    /// [`parse_incremental`](DimacsParser::parse_incremental) or
    /// [`parse_chunk`](DimacsParser::parse_chunk) to process the clauses in chunks.
    pub fn parse(input: impl io::Read) -> Result<CnfFormula, Error> {
        Ok(Self::parse_incremental(input, |_| Ok(()))?.take_formula())
    }

    /// Parse the given input incrementally and check the header if present.
    ///
    /// The callback is invoked after each chunk and can drain the clauses parsed so far by calling
    /// [`take_formula`](DimacsParser::take_formula) on the passed parser.
    pub fn parse_incremental(
        input: impl io::Read,
        mut callback: impl FnMut(&mut DimacsParser) -> Result<(), Error>,
    ) -> Result<DimacsParser, Error> {
        use io::BufRead;

        let mut buffer = io::BufReader::new(input);
        let mut parser = Self::new();

        loop {
            let data = buffer.fill_buf()?;
            if data.is_empty() {
                break;
            }
            parser.parse_chunk(data)?;
            let len = data.len();
            buffer.consume(len);

            callback(&mut parser)?;
        }
        parser.eof()?;
        callback(&mut parser)?;
        parser.check_header()?;

        Ok(parser)
    }

    /// Parse a chunk of input.
    ///
    /// After the last chunk call the [`eof`](DimacsParser::eof) method.
    ///
    /// When this returns an error the parser state is invalid and further chunks cannot be parsed.
    pub fn parse_chunk(&mut self, chunk: &[u8]) -> Result<(), ParserError> {
        if self.error {
            return Err(ParserError::PreviousError);
        }
        for &byte in chunk.iter() {
            if byte == b'\n' {
                self.line_number += 1;
            }
            match byte {
                b'\n' | b'\r' if self.skipping_line => {
                    if self.in_header {
                        self.in_header = false;
                        self.parse_header_line()?;
                    }
                    self.skipping_line = false;
                    self.start_of_line = true
                }
                _ if self.skipping_line => {
                    if self.in_header {
                        self.header_line.push(byte);
                    }
                }
                b'0'..=b'9' => {
                    self.in_lit = true;
                    let digit = (byte - b'0') as usize;

                    const CAN_OVERFLOW: usize = Var::max_count() / 10;
                    const OVERFLOW_DIGIT: usize = Var::max_count() % 10;

                    // Overflow check that stays correct if LitIdx is as wide as usize
                    if CAN_OVERFLOW <= self.pending_index {
                        let carry = (digit <= OVERFLOW_DIGIT) as usize;

                        if CAN_OVERFLOW + carry <= self.pending_index {
                            self.error = true;
                            return Err(ParserError::LiteralTooLarge {
                                line: self.line_number,
                                index: self.pending_index,
                                final_digit: digit,
                            });
                        }
                    }

                    self.pending_index = self.pending_index * 10 + digit;

                    self.start_of_line = false
                }
                b'-' if !self.pending_negative && !self.in_lit => {
                    self.pending_negative = true;
                    self.start_of_line = false
                }
                b' ' | b'\t' | b'\n' | b'\r' if !self.pending_negative || self.in_lit => {
                    self.finish_literal();
                    self.pending_negative = false;
                    self.in_lit = false;
                    self.pending_index = 0;
                    self.start_of_line = byte == b'\n' || byte == b'\r';
                }
                b'c' if self.start_of_line => {
                    self.skipping_line = true;
                }
                b'p' if self.start_of_line && self.header.is_none() => {
                    self.skipping_line = true;
                    self.in_header = true;
                    self.header_line.push(b'p');
                }
                _ => {
                    self.error = true;
                    return Err(ParserError::UnexpectedInput {
                        line: self.line_number,
                        unexpected: byte as char,
                    });
                }
            }
        }

        Ok(())
    }

    /// Finish parsing the input.
    ///
    /// This does not check the header counts, call [`check_header`](DimacsParser::check_header)
    /// for that.
    pub fn eof(&mut self) -> Result<(), ParserError> {
        if self.in_header {
            self.parse_header_line()?;
        }

        self.finish_literal();

        if !self.partial_clause.is_empty() {
            return Err(ParserError::UnterminatedClause {
                line: self.line_number,
            });
        }

        Ok(())
    }

    /// Verify the header counts when a header is present.
    pub fn check_header(&self) -> Result<(), ParserError> {
        if let Some(header) = self.header {
            let var_count = self.formula.var_count();
            if var_count != header.var_count {
                return Err(ParserError::VarCount {
                    var_count,
                    header_var_count: header.var_count,
                });
            }

            if self.clause_count != header.clause_count {
                return Err(ParserError::ClauseCount {
                    clause_count: self.clause_count,
                    header_clause_count: header.clause_count,
                });
            }
        }

        Ok(())
    }

    /// Returns the subformula of everything parsed since the last call of this method.
    ///
    /// The variable count of the returned formula is the maximum of the variable count so far and
    /// the header variable count if a header was present.
    pub fn take_formula(&mut self) -> CnfFormula {
        let mut new_formula = CnfFormula::new();
        new_formula.set_var_count(self.formula.var_count());
        replace(&mut self.formula, new_formula)
    }

    /// The DIMACS CNF header data if present.
    pub fn header(&self) -> Option<DimacsHeader> {
        self.header
    }

    /// Number of clauses parsed so far.
    pub fn clause_count(&self) -> usize {
        self.clause_count
    }

    /// Number of variables of the formula parsed so far.
    pub fn var_count(&self) -> usize {
        self.formula.var_count()
    }

    fn finish_literal(&mut self) {
        if self.in_lit {
            if self.pending_index == 0 {
                self.formula.add_clause(&self.partial_clause);
                self.partial_clause.clear();
                self.clause_count += 1;
            } else {
                self.partial_clause
                    .push(Var::from_dimacs(self.pending_index as isize).lit(!self.pending_negative));
            }
        }
    }

    fn parse_header_line(&mut self) -> Result<(), ParserError> {
        let header_line = String::from_utf8_lossy(&self.header_line).into_owned();

        if !header_line.starts_with("p ") {
            return self.invalid_header(header_line);
        }

        let mut header_values = header_line[2..].split_whitespace();

        if header_values.next() != Some("cnf") {
            return self.invalid_header(header_line);
        }

        let var_count: usize = match header_values
            .next()
            .and_then(|value| str::parse(value).ok())
        {
            None => return self.invalid_header(header_line),
            Some(value) => value,
        };

        if var_count > Var::max_count() {
            self.error = true;
            return Err(ParserError::LiteralTooLarge {
                line: self.line_number,
                index: var_count / 10,
                final_digit: var_count % 10,
            });
        }

        let clause_count: usize = match header_values
            .next()
            .and_then(|value| str::parse(value).ok())
        {
            None => return self.invalid_header(header_line),
            Some(value) => value,
        };

        if header_values.next().is_some() {
            return self.invalid_header(header_line);
        }

        self.header = Some(DimacsHeader {
            var_count,
            clause_count,
        });

        self.formula.set_var_count(var_count);

        Ok(())
    }

    fn invalid_header(&mut self, header_line: String) -> Result<(), ParserError> {
        self.error = true;
        Err(ParserError::InvalidHeader {
            line: self.line_number,
            header: header_line,
        })
    }
}

/// Write a DIMACS CNF header.
pub fn write_dimacs_header(target: &mut impl io::Write, header: DimacsHeader) -> io::Result<()> {
    writeln!(
        target,
        "p cnf {var_count} {clause_count}",
        var_count = header.var_count,
        clause_count = header.clause_count
    )
}

/// Write an iterator of clauses as headerless DIMACS CNF.
///
/// Can be combined with [`write_dimacs_header`] for incremental writing.
pub fn write_dimacs_clauses(
    target: &mut impl io::Write,
    clauses: impl IntoIterator<Item = impl IntoIterator<Item = impl Borrow<Lit>>>,
) -> io::Result<()> {
    for clause in clauses.into_iter() {
        for lit in clause.into_iter() {
            itoa::write(&mut *target, lit.borrow().to_dimacs())?;
            target.write_all(b" ")?;
        }
        target.write_all(b"0\n")?;
    }
    Ok(())
}

/// Write a formula as DIMACS CNF.
pub fn write_dimacs(target: &mut impl io::Write, formula: &CnfFormula) -> io::Result<()> {
    write_dimacs_header(
        &mut *target,
        DimacsHeader {
            var_count: formula.var_count(),
            clause_count: formula.len(),
        },
    )?;
    write_dimacs_clauses(target, formula.iter())
}

#[cfg(test)]
mod tests {
    use super::*;

    use glimsat_formula::{cnf::strategy::*, cnf_formula};
    use proptest::*;

    #[test]
    fn parse_simple_input() {
        let input = b"p cnf 3 2\n1 -2 0\n2 3 0\n";
        let formula = DimacsParser::parse(&input[..]).unwrap();

        let expected = cnf_formula![
            1, -2;
            2, 3;
        ];

        assert_eq!(formula, expected);
    }

    #[test]
    fn parse_comments_and_whitespace() {
        let input = b"c a comment\nc another comment\np cnf 4 2\n 1  2 0\nc between clauses\n-3\n-4 0\n";
        let formula = DimacsParser::parse(&input[..]).unwrap();

        let expected = cnf_formula![
            1, 2;
            -3, -4;
        ];

        assert_eq!(formula, expected);
    }

    #[test]
    fn parse_headerless_input() {
        let input = b"1 2 0\n-1 -2 0\n";
        let formula = DimacsParser::parse(&input[..]).unwrap();

        let expected = cnf_formula![
            1, 2;
            -1, -2;
        ];

        assert_eq!(formula, expected);
    }

    #[test]
    fn rejects_unexpected_character() {
        let input = b"p cnf 2 1\n1 x 0\n";
        match DimacsParser::parse(&input[..]) {
            Err(err) => match err.downcast_ref::<ParserError>() {
                Some(ParserError::UnexpectedInput { line: 2, .. }) => (),
                other => panic!("unexpected error {:?}", other),
            },
            Ok(_) => panic!("expected a parse error"),
        }
    }

    #[test]
    fn rejects_unterminated_clause() {
        let input = b"p cnf 2 1\n1 2\n";
        match DimacsParser::parse(&input[..]) {
            Err(err) => match err.downcast_ref::<ParserError>() {
                Some(ParserError::UnterminatedClause { .. }) => (),
                other => panic!("unexpected error {:?}", other),
            },
            Ok(_) => panic!("expected a parse error"),
        }
    }

    #[test]
    fn rejects_wrong_header_counts() {
        let input = b"p cnf 2 5\n1 2 0\n";
        match DimacsParser::parse(&input[..]) {
            Err(err) => match err.downcast_ref::<ParserError>() {
                Some(ParserError::ClauseCount { .. }) => (),
                other => panic!("unexpected error {:?}", other),
            },
            Ok(_) => panic!("expected a parse error"),
        }
    }

    proptest! {
        #[test]
        fn write_parse_roundtrip(formula in cnf_formula(1..100usize, 0..1000, 0..10)) {
            let mut output = vec![];
            write_dimacs(&mut output, &formula).unwrap();

            let parsed = DimacsParser::parse(&output[..]).unwrap();

            prop_assert_eq!(parsed, formula);
        }

        #[test]
        fn chunked_parsing(formula in cnf_formula(1..100usize, 0..500, 0..10), chunk_len in 1..40usize) {
            let mut output = vec![];
            write_dimacs(&mut output, &formula).unwrap();

            let mut parser = DimacsParser::new();
            let mut parsed = CnfFormula::new();

            for chunk in output.chunks(chunk_len) {
                parser.parse_chunk(chunk).unwrap();
                for clause in parser.take_formula().iter() {
                    parsed.add_clause(clause.iter().cloned());
                }
            }
            parser.eof().unwrap();
            parser.check_header().unwrap();
            for clause in parser.take_formula().iter() {
                parsed.add_clause(clause.iter().cloned());
            }
            parsed.set_var_count(parser.var_count());

            prop_assert_eq!(parsed, formula);
        }
    }
}
