// Address-expression evaluator: numbers, PC-relative offsets, labels, and
// label-relative offsets, plus the `A:B` range form. Grammar lifted from the
// debugger's own help text in
// original_source/src/debug-runtime/debug-runtime.c (executeHelpCommand):
// "PC+C or PC-C", "L+C or L-C".

use std::fmt;

use crate::machine::MEMORY_SIZE;
use crate::symbols::SymbolTable;

#[derive(Debug)]
pub enum ExprError {
    UnknownLabel(String),
    BadOffset(String),
    OutOfRange(String),
    RangeBackwards(String),
    MalformedRange(String),
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprError::UnknownLabel(raw) => write!(f, "Unknown label in \"{}\".", raw),
            ExprError::BadOffset(raw) => write!(f, "Could not parse \"{}\" as an address.", raw),
            ExprError::OutOfRange(raw) => write!(f, "Address \"{}\" is out of range.", raw),
            ExprError::RangeBackwards(raw) => write!(f, "Range \"{}\" ends before it starts.", raw),
            ExprError::MalformedRange(raw) => write!(f, "Malformed range \"{}\".", raw),
        }
    }
}

fn in_range(addr: i64, raw: &str) -> Result<u16, ExprError> {
    if addr < 0 || addr as usize >= MEMORY_SIZE {
        Err(ExprError::OutOfRange(raw.to_string()))
    } else {
        Ok(addr as u16)
    }
}

/// Evaluates a single address expression against the current PC and symbol
/// table. An empty expression defaults to the current PC.
pub fn parse_address(text: &str, pc: u16, symbols: &SymbolTable) -> Result<u16, ExprError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(pc);
    }

    if let Some(offset) = trimmed.strip_prefix('+') {
        let n: i64 = offset.trim().parse().map_err(|_| ExprError::BadOffset(trimmed.to_string()))?;
        return in_range(pc as i64 + n, trimmed);
    }
    if let Some(offset) = trimmed.strip_prefix('-') {
        let n: i64 = offset.trim().parse().map_err(|_| ExprError::BadOffset(trimmed.to_string()))?;
        return in_range(pc as i64 - n, trimmed);
    }

    if let Ok(n) = parse_plain_number(trimmed) {
        return in_range(n, trimmed);
    }

    // label, or label+N / label-N
    if let Some(split_at) = trimmed[1..].find(|c| c == '+' || c == '-').map(|i| i + 1) {
        let (label, rest) = trimmed.split_at(split_at);
        let base = symbols
            .address_of(label)
            .ok_or_else(|| ExprError::UnknownLabel(trimmed.to_string()))?;
        let sign: i64 = if rest.starts_with('-') { -1 } else { 1 };
        let n: i64 = rest[1..]
            .trim()
            .parse()
            .map_err(|_| ExprError::BadOffset(trimmed.to_string()))?;
        return in_range(base as i64 + sign * n, trimmed);
    }

    let base = symbols
        .address_of(trimmed)
        .ok_or_else(|| ExprError::UnknownLabel(trimmed.to_string()))?;
    Ok(base)
}

fn parse_plain_number(token: &str) -> Result<i64, ()> {
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).map_err(|_| ())
    } else {
        token.parse::<i64>().map_err(|_| ())
    }
}

/// Evaluates `expr` or `expr:expr`. An empty expression is `PC:PC`.
pub fn parse_range(text: &str, pc: u16, symbols: &SymbolTable) -> Result<(u16, u16), ExprError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok((pc, pc));
    }

    let mut parts = trimmed.splitn(3, ':');
    let first = parts.next().unwrap_or("");
    match (parts.next(), parts.next()) {
        (None, None) => {
            let addr = parse_address(first, pc, symbols)?;
            Ok((addr, addr))
        }
        (Some(second), None) => {
            let start = parse_address(first, pc, symbols)?;
            let end = parse_address(second, pc, symbols)?;
            if start > end {
                Err(ExprError::RangeBackwards(trimmed.to_string()))
            } else {
                Ok((start, end))
            }
        }
        _ => Err(ExprError::MalformedRange(trimmed.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_greeting() -> SymbolTable {
        let mut contents = String::new();
        contents.push_str("0x0004 char greeting\n");
        let path = std::env::temp_dir().join("w16sim-exprtest-greeting.txt");
        std::fs::write(&path, &contents).unwrap();
        let table = SymbolTable::load(path.to_str().unwrap()).unwrap();
        let _ = std::fs::remove_file(&path);
        table
    }

    #[test]
    fn plus_offset_is_pc_relative() {
        let table = SymbolTable::empty();
        assert_eq!(parse_address("+4", 0x0010, &table).unwrap(), 0x0014);
    }

    #[test]
    fn label_plus_offset() {
        let table = table_with_greeting();
        assert_eq!(parse_address("greeting+2", 0x0010, &table).unwrap(), 0x0006);
    }

    #[test]
    fn range_with_relative_end() {
        let table = SymbolTable::empty();
        let (start, end) = parse_range("0x0000:+2", 0x0010, &table).unwrap();
        assert_eq!(start, 0x0000);
        assert_eq!(end, 0x0012);
    }

    #[test]
    fn backwards_range_is_an_error() {
        let table = table_with_greeting();
        // Add a "start" label after greeting to exercise the backwards case.
        let path = std::env::temp_dir().join("w16sim-exprtest-start.txt");
        std::fs::write(&path, "0x0004 char greeting\n0x0002 int start\n").unwrap();
        let table2 = SymbolTable::load(path.to_str().unwrap()).unwrap();
        let _ = std::fs::remove_file(&path);
        let result = parse_range("greeting:start", 0x0010, &table2);
        assert!(result.is_err());
        let _ = table;
    }

    #[test]
    fn empty_expression_defaults_to_pc() {
        let table = SymbolTable::empty();
        assert_eq!(parse_address("", 0x0042, &table).unwrap(), 0x0042);
        assert_eq!(parse_range("", 0x0042, &table).unwrap(), (0x0042, 0x0042));
    }

    #[test]
    fn unknown_label_is_an_error() {
        let table = SymbolTable::empty();
        assert!(matches!(
            parse_address("nope", 0, &table),
            Err(ExprError::UnknownLabel(_))
        ));
    }
}
