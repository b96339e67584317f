/// Textual syntax rule used when parsing string-valued cell references,
/// e.g. the argument of an INDIRECT-style function.
///
/// `Unspecified` is the "never assigned" state; configuration that wants to
/// distinguish "assigned to the default" from "never assigned" tracks that
/// separately (see `CalcConfig` in the eval crate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressConvention {
    /// No convention has been assigned.
    Unspecified,
    /// Native A1 syntax with `.` as the sheet separator (`Sheet1.A1`).
    Native,
    /// Excel A1 syntax with `!` as the sheet separator (`Sheet1!A1`).
    XlA1,
    /// Excel R1C1 syntax (`R1C1`, `R[-1]C[2]`).
    XlR1C1,
    /// OOXML flavor of A1: like `XlA1` but single quotes around sheet names
    /// are mandatory whenever the name needs them in the file format.
    XlOox,
    /// Lotus 1-2-3 A1 syntax.
    LotusA1,
}
