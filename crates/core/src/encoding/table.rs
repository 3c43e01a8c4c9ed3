//! Static answer table
//!
//! The same string maps to the same code in every column. Several questions
//! reuse the 1..=4 range for unrelated scales.

/// Known answers and their codes
pub const STATIC_CODES: &[(&str, i64)] = &[
    // Yes/no questions
    ("Sim", 1),
    ("Não", 2),
    // Purpose
    ("Industrial", 1),
    ("Comercial", 2),
    ("Doméstico", 3),
    // Capacity (kg per minute)
    ("Até 1Kg", 1),
    ("Até 6.5Kg", 2),
    ("Até 9Kg", 3),
    ("Acima de 10Kg", 4),
    // Voltage
    ("127V", 1),
    ("220V", 2),
    ("Trifásico", 3),
    // Material
    ("Embutidos", 1),
    ("Carne, Frango", 2),
    ("Diversos (Castanhas, Frutas, Graõs, Etc)", 3),
    // Budget
    ("Até R$ 2,500,00", 1),
    ("Até R$ 15,000,00", 2),
    ("Acima de R$ 15,000,00", 3),
    // Power
    ("Até 0,25kW", 1),
    ("Até 2,2kW", 2),
    ("Até 5,5kW", 3),
    ("Até 7,5kW", 4),
];

/// Look up an answer in the static table (exact match)
pub fn static_code(value: &str) -> Option<i64> {
    STATIC_CODES
        .iter()
        .find(|(known, _)| *known == value)
        .map(|(_, code)| *code)
}
