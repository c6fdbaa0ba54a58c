// Copyright (c) The esop-min Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    cover::Cover,
    cube::{AlgebraicSymbol, Cube, MatrixDisplayFormat},
};
use itertools::Itertools;
use std::{borrow::Cow, fmt};

impl<const IL: usize, const OL: usize> fmt::Debug for Cover<IL, OL> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut debug_struct = f.debug_struct("Cover");
        for output_ix in 0..OL {
            let name = AlgebraicSymbol::output(output_ix).to_string();
            let terms = XorTerms::new(self.output_component(output_ix));
            debug_struct.field(&name, &format_args!("{}", terms));
        }
        // Cubes feeding no output leave the function alone but still cost something.
        let unused = XorTerms::new(
            self.elements()
                .iter()
                .filter(|elem| !elem.output.contains(&true))
                .map(Cube::as_input_cube),
        );
        if !unused.is_empty() {
            debug_struct.field("(no outputs)", &format_args!("{}", unused));
        }
        debug_struct.finish()
    }
}

/// Text written between consecutive items, and optionally after the last one.
#[derive(Clone, Debug)]
struct Separator<'a> {
    text: Cow<'a, str>,
    trailing: bool,
}

impl<'a> Separator<'a> {
    fn newline() -> Self {
        Self {
            text: Cow::Borrowed("\n"),
            trailing: true,
        }
    }

    fn write_all<T: fmt::Display>(
        &self,
        f: &mut fmt::Formatter,
        items: impl IntoIterator<Item = T>,
    ) -> fmt::Result {
        write!(f, "{}", items.into_iter().format(&self.text))?;
        if self.trailing {
            f.write_str(&self.text)?;
        }
        Ok(())
    }
}

/// Displays a cover as one matrix row per cube, in cover order.
#[derive(Clone, Debug)]
pub struct CoverMatrixDisplay<'a, const IL: usize, const OL: usize> {
    cover: &'a Cover<IL, OL>,
    format: MatrixDisplayFormat,
    internal_separator: Cow<'a, str>,
    input_output_separator: Cow<'a, str>,
    rows: Separator<'a>,
}

impl<'a, const IL: usize, const OL: usize> CoverMatrixDisplay<'a, IL, OL> {
    pub fn new(cover: &'a Cover<IL, OL>) -> Self {
        Self {
            cover,
            format: MatrixDisplayFormat::default(),
            internal_separator: Cow::Borrowed(""),
            input_output_separator: Cow::Borrowed(" "),
            rows: Separator::newline(),
        }
    }

    pub fn with_format(mut self, format: MatrixDisplayFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_internal_separator(mut self, separator: impl Into<Cow<'a, str>>) -> Self {
        self.internal_separator = separator.into();
        self
    }

    pub fn with_input_output_separator(mut self, separator: impl Into<Cow<'a, str>>) -> Self {
        self.input_output_separator = separator.into();
        self
    }

    /// Sets the text between rows. With `trailing`, it is also written after the last row.
    pub fn with_cube_separator(mut self, separator: impl Into<Cow<'a, str>>, trailing: bool) -> Self {
        self.rows = Separator {
            text: separator.into(),
            trailing,
        };
        self
    }
}

impl<'a, const IL: usize, const OL: usize> fmt::Display for CoverMatrixDisplay<'a, IL, OL> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.cover.is_empty() {
            return Ok(());
        }
        let rows = self.cover.elements().iter().map(|elem| {
            elem.matrix_display()
                .with_format(self.format)
                .with_internal_separator(&*self.internal_separator)
                .with_input_output_separator(&*self.input_output_separator)
        });
        self.rows.write_all(f, rows)
    }
}

/// Displays each output as the XOR of the products feeding it, e.g. `A = a ⊕ b'c`.
pub struct CoverAlgebraicDisplay<'a, const IL: usize, const OL: usize> {
    cover: &'a Cover<IL, OL>,
    outputs: Separator<'a>,
}

impl<'a, const IL: usize, const OL: usize> CoverAlgebraicDisplay<'a, IL, OL> {
    pub fn new(cover: &'a Cover<IL, OL>) -> Self {
        Self {
            cover,
            outputs: Separator::newline(),
        }
    }

    pub fn with_separator(mut self, separator: impl Into<Cow<'a, str>>, trailing: bool) -> Self {
        self.outputs = Separator {
            text: separator.into(),
            trailing,
        };
        self
    }
}

impl<'a, const IL: usize, const OL: usize> fmt::Display for CoverAlgebraicDisplay<'a, IL, OL> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if OL == 0 {
            return Ok(());
        }
        let equations = (0..OL).map(|output_ix| {
            format!(
                "{} = {}",
                AlgebraicSymbol::output(output_ix),
                XorTerms::new(self.cover.output_component(output_ix))
            )
        });
        self.outputs.write_all(f, equations)
    }
}

/// Product terms joined by `⊕`. Terms with `a` sort first, then `a'`, then terms without `a`,
/// and so on down the variables.
struct XorTerms<const IL: usize> {
    terms: Vec<Cube<IL, 0>>,
}

impl<const IL: usize> XorTerms<IL> {
    fn new(terms: impl IntoIterator<Item = Cube<IL, 0>>) -> Self {
        let mut terms: Vec<_> = terms.into_iter().collect();
        terms.sort_by_key(|term| {
            term.input.map(|literal| match literal {
                Some(true) => 0_u8,
                Some(false) => 1,
                None => 2,
            })
        });
        Self { terms }
    }

    fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl<const IL: usize> fmt::Display for XorTerms<IL> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.terms.is_empty() {
            return f.write_str("0");
        }
        let products = self.terms.iter().map(Cube::algebraic_display);
        write!(f, "{}", products.format(" ⊕ "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adder() -> Cover<3, 2> {
        Cover::from_numeric([
            ([1, 2, 2], [4, 3]),
            ([2, 1, 2], [4, 3]),
            ([2, 2, 1], [4, 3]),
            ([1, 1, 2], [3, 4]),
            ([1, 2, 1], [3, 4]),
            ([2, 1, 1], [3, 4]),
        ])
        .unwrap()
    }

    #[test]
    fn test_algebraic_display() {
        assert_eq!(
            adder().algebraic_display().with_separator("; ", false).to_string(),
            "A = a ⊕ b ⊕ c; B = ab ⊕ ac ⊕ bc"
        );
        let empty = Cover::<2, 1>::new([]);
        assert_eq!(empty.algebraic_display().to_string(), "A = 0\n");
    }

    #[test]
    fn test_matrix_display() {
        let cover = Cover::from_numeric([([1, 0, 2], [4, 3]), ([2, 2, 0], [4, 4])]).unwrap();
        assert_eq!(
            cover.matrix_display().to_string(),
            "10- 10\n--0 11\n"
        );
        assert_eq!(
            cover
                .matrix_display()
                .with_format(MatrixDisplayFormat::Numeric)
                .with_cube_separator(", ", false)
                .to_string(),
            "102 43, 220 44"
        );
    }

    #[test]
    fn test_debug() {
        let cover = Cover::from_numeric([([1, 0], [4, 3]), ([2, 2], [3, 3])]).unwrap();
        assert_eq!(
            format!("{:?}", cover),
            "Cover { A: ab', B: 0, (no outputs): 1 }"
        );
    }
}
