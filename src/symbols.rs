// Symbols-file parsing and the address/label/data-type table it populates.
// Grounded on original_source/src/debug-runtime/debug-runtime.c's
// parseSymbolsFile and stringEqualCaseInsensitive (case-insensitive matching
// of the three type keywords, strtok-style whitespace/comma tokenizing).

use std::fmt;
use std::fs;

use crate::machine::{IO_PORT_ADDRESS, MEMORY_SIZE};

pub const LABEL_NAME_MAX_LENGTH: usize = 31;
const MAX_LINE_LENGTH: usize = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    None,
    Int,
    Char,
    Instruction,
}

impl DataType {
    fn parse(token: &str) -> Option<DataType> {
        if token.eq_ignore_ascii_case("int") {
            Some(DataType::Int)
        } else if token.eq_ignore_ascii_case("char") {
            Some(DataType::Char)
        } else if token.eq_ignore_ascii_case("instruction") {
            Some(DataType::Instruction)
        } else {
            None
        }
    }
}

#[derive(Debug)]
pub enum SymbolError {
    Unreadable(String),
    LineTooLong { path: String, line: usize },
    TooFewColumns { path: String, line: usize },
    BadAddress { path: String, line: usize, token: String },
    AddressOutOfRange { path: String, line: usize, token: String },
    DuplicateAddress { path: String, line: usize, address: u16 },
    UnknownDataType { path: String, line: usize, token: String },
    LabelTooLong { path: String, line: usize },
    InvalidLabel { path: String, line: usize, label: String },
    DuplicateLabel { path: String, line: usize, label: String },
}

impl fmt::Display for SymbolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolError::Unreadable(path) => write!(f, "Error: could not read file \"{}\".", path),
            SymbolError::LineTooLong { path, line } => write!(
                f,
                "Error: in file \"{}\" line {}: line exceeds {} characters.",
                path, line, MAX_LINE_LENGTH
            ),
            SymbolError::TooFewColumns { path, line } => {
                write!(f, "Error: in file \"{}\" line {} has too few columns.", path, line)
            }
            SymbolError::BadAddress { path, line, token } => write!(
                f,
                "Error: in file \"{}\" line {}: {} could not be parsed as a number.",
                path, line, token
            ),
            SymbolError::AddressOutOfRange { path, line, token } => write!(
                f,
                "Error: in file \"{}\" line {}: address {} is out of range.",
                path, line, token
            ),
            SymbolError::DuplicateAddress { path, line, address } => write!(
                f,
                "Error: in file \"{}\" line {}: address 0x{:04X} was described multiple times.",
                path, line, address
            ),
            SymbolError::UnknownDataType { path, line, token } => write!(
                f,
                "Error: in file \"{}\" line {}: unknown data type \"{}\".",
                path, line, token
            ),
            SymbolError::LabelTooLong { path, line } => write!(
                f,
                "Error: in file \"{}\" line {}: label name must not be longer than {} characters.",
                path, line, LABEL_NAME_MAX_LENGTH
            ),
            SymbolError::InvalidLabel { path, line, label } => write!(
                f,
                "Error: in file \"{}\" line {}: \"{}\" is not a valid label name (must start with a letter or underscore, followed by letters, digits, or underscores).",
                path, line, label
            ),
            SymbolError::DuplicateLabel { path, line, label } => write!(
                f,
                "Error: in file \"{}\" line {}: label \"{}\" was defined multiple times.",
                path, line, label
            ),
        }
    }
}

pub struct SymbolTable {
    data_types: Vec<DataType>,
    labels: Vec<Option<String>>,
    addresses: std::collections::HashMap<String, u16>,
}

impl SymbolTable {
    pub fn empty() -> Self {
        let mut data_types = vec![DataType::None; MEMORY_SIZE];
        data_types[IO_PORT_ADDRESS as usize] = DataType::Char;
        SymbolTable {
            data_types,
            labels: vec![None; MEMORY_SIZE],
            addresses: std::collections::HashMap::new(),
        }
    }

    pub fn load(path: &str) -> Result<Self, SymbolError> {
        let contents = fs::read_to_string(path).map_err(|_| SymbolError::Unreadable(path.to_string()))?;
        let mut table = SymbolTable::empty();
        let mut described = vec![false; MEMORY_SIZE];

        for (index, raw_line) in contents.lines().enumerate() {
            let line_number = index + 1;
            if raw_line.len() > MAX_LINE_LENGTH {
                return Err(SymbolError::LineTooLong {
                    path: path.to_string(),
                    line: line_number,
                });
            }

            let mut tokens = raw_line.split(|c: char| c == ' ' || c == ',' || c == '\t');
            let address_token = match tokens.next().map(str::trim).filter(|s| !s.is_empty()) {
                Some(t) => t,
                None => continue,
            };
            let remaining: Vec<&str> = tokens.map(str::trim).filter(|s| !s.is_empty()).collect();
            let data_type_token = match remaining.first() {
                Some(t) => *t,
                None => {
                    return Err(SymbolError::TooFewColumns {
                        path: path.to_string(),
                        line: line_number,
                    })
                }
            };
            let label_token = remaining.get(1).copied();

            let address = parse_c_integer(address_token).ok_or_else(|| SymbolError::BadAddress {
                path: path.to_string(),
                line: line_number,
                token: address_token.to_string(),
            })?;
            if address < 0 || address as usize >= MEMORY_SIZE {
                return Err(SymbolError::AddressOutOfRange {
                    path: path.to_string(),
                    line: line_number,
                    token: address_token.to_string(),
                });
            }
            let address = address as u16;
            if described[address as usize] {
                return Err(SymbolError::DuplicateAddress {
                    path: path.to_string(),
                    line: line_number,
                    address,
                });
            }
            described[address as usize] = true;

            let data_type = DataType::parse(data_type_token).ok_or_else(|| SymbolError::UnknownDataType {
                path: path.to_string(),
                line: line_number,
                token: data_type_token.to_string(),
            })?;
            table.data_types[address as usize] = data_type;

            if let Some(label) = label_token {
                if label.len() > LABEL_NAME_MAX_LENGTH {
                    return Err(SymbolError::LabelTooLong {
                        path: path.to_string(),
                        line: line_number,
                    });
                }
                if !is_valid_label(label) {
                    return Err(SymbolError::InvalidLabel {
                        path: path.to_string(),
                        line: line_number,
                        label: label.to_string(),
                    });
                }
                if table.addresses.contains_key(label) {
                    return Err(SymbolError::DuplicateLabel {
                        path: path.to_string(),
                        line: line_number,
                        label: label.to_string(),
                    });
                }
                table.labels[address as usize] = Some(label.to_string());
                table.addresses.insert(label.to_string(), address);
            }
        }

        for address in 0..MEMORY_SIZE {
            if table.data_types[address] == DataType::Instruction {
                let next = (address + 1) % MEMORY_SIZE;
                if !described[next] {
                    table.data_types[next] = DataType::None;
                }
            }
        }

        Ok(table)
    }

    pub fn data_type(&self, address: u16) -> DataType {
        self.data_types[address as usize % MEMORY_SIZE]
    }

    pub fn label(&self, address: u16) -> Option<&str> {
        self.labels[address as usize % MEMORY_SIZE].as_deref()
    }

    pub fn address_of(&self, label: &str) -> Option<u16> {
        self.addresses.get(label).copied()
    }

    pub fn labels_iter(&self) -> impl Iterator<Item = (u16, &str)> {
        self.labels.iter().enumerate().filter_map(|(addr, label)| {
            label.as_deref().map(|l| (addr as u16, l))
        })
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`: first character not a digit, rest alphanumeric
/// or underscore. Length is checked separately by the caller.
fn is_valid_label(label: &str) -> bool {
    let mut chars = label.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Mimics `strtol(str, NULL, 0)`: accepts "0x"/"0X" hex, leading-zero octal,
/// and plain decimal, with an optional sign.
fn parse_c_integer(token: &str) -> Option<i64> {
    let (sign, rest) = match token.strip_prefix('-') {
        Some(r) => (-1i64, r),
        None => (1i64, token.strip_prefix('+').unwrap_or(token)),
    };
    let value = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if rest.len() > 1 && rest.starts_with('0') {
        i64::from_str_radix(&rest[1..], 8).ok()?
    } else {
        rest.parse::<i64>().ok()?
    };
    Some(sign * value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> String {
        let path = std::env::temp_dir().join(format!("w16sim-symtest-{:p}", contents.as_ptr()));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn parses_labels_and_auto_types_second_byte() {
        let path = write_temp("0x0000 instruction start\n0x0004 char greeting\n");
        let table = SymbolTable::load(&path).unwrap();
        assert_eq!(table.address_of("start"), Some(0x0000));
        assert_eq!(table.address_of("greeting"), Some(0x0004));
        assert_eq!(table.data_type(0x0000), DataType::Instruction);
        assert_eq!(table.data_type(0x0001), DataType::None);
        assert_eq!(table.data_type(0x0004), DataType::Char);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn rejects_duplicate_address() {
        let path = write_temp("0x0000 int a\n0x0000 int b\n");
        let err = SymbolTable::load(&path).unwrap_err();
        assert!(matches!(err, SymbolError::DuplicateAddress { .. }));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn rejects_duplicate_label() {
        let path = write_temp("0x0000 int a\n0x0001 int a\n");
        let err = SymbolTable::load(&path).unwrap_err();
        assert!(matches!(err, SymbolError::DuplicateLabel { .. }));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn rejects_label_with_leading_digit() {
        let path = write_temp("0x0000 int 123\n");
        let err = SymbolTable::load(&path).unwrap_err();
        assert!(matches!(err, SymbolError::InvalidLabel { .. }));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn rejects_label_with_disallowed_characters() {
        let path = write_temp("0x0000 int a$b\n");
        let err = SymbolTable::load(&path).unwrap_err();
        assert!(matches!(err, SymbolError::InvalidLabel { .. }));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn accepts_label_with_underscore_and_digits() {
        let path = write_temp("0x0000 int _a1\n");
        let table = SymbolTable::load(&path).unwrap();
        assert_eq!(table.address_of("_a1"), Some(0x0000));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn rejects_unknown_data_type() {
        let path = write_temp("0x0000 bogus a\n");
        let err = SymbolTable::load(&path).unwrap_err();
        assert!(matches!(err, SymbolError::UnknownDataType { .. }));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn rejects_out_of_range_address() {
        let path = write_temp("0x3000 int a\n");
        let err = SymbolTable::load(&path).unwrap_err();
        assert!(matches!(err, SymbolError::AddressOutOfRange { .. }));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_type_column_is_fatal() {
        let path = write_temp("0x0000\n");
        let err = SymbolTable::load(&path).unwrap_err();
        assert!(matches!(err, SymbolError::TooFewColumns { .. }));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn io_port_is_pretyped_char_by_default() {
        let table = SymbolTable::empty();
        assert_eq!(table.data_type(IO_PORT_ADDRESS), DataType::Char);
    }

    #[test]
    fn parse_c_integer_handles_hex_octal_decimal() {
        assert_eq!(parse_c_integer("0x10"), Some(16));
        assert_eq!(parse_c_integer("010"), Some(8));
        assert_eq!(parse_c_integer("10"), Some(10));
        assert_eq!(parse_c_integer("-5"), Some(-5));
    }
}
