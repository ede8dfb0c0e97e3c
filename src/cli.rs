// Command-line argument parsing. Grounded on
// original_source/src/program-input/program-input.c's manual flag loop
// (duplicate-flag / missing-value checks, the help banner text); the
// `Configuration` record shape mirrors lib.rs's own top-level configuration
// struct.

use std::fmt;

pub const DEFAULT_CLOCK_FREQUENCY_KHZ: u32 = 1000;
const MIN_CLOCK_FREQUENCY_KHZ: u32 = 1;
const MAX_CLOCK_FREQUENCY_KHZ: u32 = 1_000_000;

pub struct Configuration {
    pub debug: bool,
    pub binary_path: String,
    pub symbols_path: Option<String>,
    pub clock_frequency_khz: u32,
}

#[derive(Debug)]
pub enum ArgError {
    DuplicatedFlag(&'static str),
    MissingValue(&'static str),
    UnknownFlag(String),
    MultipleBinaryPaths,
    MissingBinaryPath,
    InvalidClockFrequency(String),
}

impl fmt::Display for ArgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgError::DuplicatedFlag(flag) => write!(f, "Error: {} flag was used more than once.", flag),
            ArgError::MissingValue(flag) => write!(f, "Error: {} value was not provided.", flag),
            ArgError::UnknownFlag(flag) => write!(f, "Error: unknown flag \"{}\".", flag),
            ArgError::MultipleBinaryPaths => {
                write!(f, "Error: binary file path was provided more than once.")
            }
            ArgError::MissingBinaryPath => write!(f, "Error: binary file path was not provided."),
            ArgError::InvalidClockFrequency(token) => {
                write!(f, "Error: \"{}\" is not a valid clock frequency.", token)
            }
        }
    }
}

pub const HELP_BANNER: &str = "\
W16 simulator.
Usage:
w16sim [path/to/binary.bin]
runs the simulator until ^C is pressed, or until a JMP instruction to the current address (unconditional infinite loop) is detected.

Options:
-c [frequency] or --clock [frequency] - sets maximum clock frequency in kHz. Must be between 1 and 1000000. Default is 1000.
-h or --help - prints this message.
-d or --debug - runs the simulator in paused state and enables the debugger.
-s [path/to/symbols.csv] or --symbols [path/to/symbols.csv] - supplies the debugger with symbols info. Without -d or --debug it is ignored.

The symbols file must be in CSV format with three columns:
- the memory address,
- data type (one of following: \"char\", \"int\", or \"instruction\"),
- label name (unique; 0-31 characters: digits, upper- or lowercase letters, and underscores; the first character can't be a digit).
";

pub enum ParsedArgs {
    Help,
    Run(Configuration),
}

pub fn parse_args(args: &[String]) -> Result<ParsedArgs, ArgError> {
    let mut binary_path: Option<String> = None;
    let mut symbols_path: Option<String> = None;
    let mut clock_frequency_khz = DEFAULT_CLOCK_FREQUENCY_KHZ;

    let mut help_flag = false;
    let mut symbols_flag = false;
    let mut debug_flag = false;
    let mut clock_flag = false;

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if arg.starts_with('-') {
            match arg.as_str() {
                "-h" | "--help" => {
                    if help_flag {
                        return Err(ArgError::DuplicatedFlag("help"));
                    }
                    help_flag = true;
                }
                "-s" | "--symbols" => {
                    if symbols_flag {
                        return Err(ArgError::DuplicatedFlag("symbols"));
                    }
                    i += 1;
                    let value = args.get(i).ok_or(ArgError::MissingValue("symbols file path"))?;
                    symbols_path = Some(value.clone());
                    symbols_flag = true;
                }
                "-d" | "--debug" => {
                    if debug_flag {
                        return Err(ArgError::DuplicatedFlag("debug"));
                    }
                    debug_flag = true;
                }
                "-c" | "--clock" => {
                    if clock_flag {
                        return Err(ArgError::DuplicatedFlag("clock"));
                    }
                    i += 1;
                    let value = args.get(i).ok_or(ArgError::MissingValue("clock frequency"))?;
                    let parsed: Option<u32> = value.parse().ok();
                    match parsed {
                        Some(khz) if (MIN_CLOCK_FREQUENCY_KHZ..=MAX_CLOCK_FREQUENCY_KHZ).contains(&khz) => {
                            clock_frequency_khz = khz;
                        }
                        _ => return Err(ArgError::InvalidClockFrequency(value.clone())),
                    }
                    clock_flag = true;
                }
                other => return Err(ArgError::UnknownFlag(other.to_string())),
            }
        } else if binary_path.is_some() {
            return Err(ArgError::MultipleBinaryPaths);
        } else {
            binary_path = Some(arg.clone());
        }
        i += 1;
    }

    if args.is_empty() || help_flag {
        return Ok(ParsedArgs::Help);
    }

    let binary_path = binary_path.ok_or(ArgError::MissingBinaryPath)?;

    Ok(ParsedArgs::Run(Configuration {
        debug: debug_flag,
        binary_path,
        symbols_path,
        clock_frequency_khz,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_args_is_help() {
        assert!(matches!(parse_args(&args(&[])), Ok(ParsedArgs::Help)));
    }

    #[test]
    fn plain_binary_path_uses_defaults() {
        let config = match parse_args(&args(&["prog.bin"])).unwrap() {
            ParsedArgs::Run(c) => c,
            _ => panic!("expected run"),
        };
        assert_eq!(config.binary_path, "prog.bin");
        assert!(!config.debug);
        assert_eq!(config.clock_frequency_khz, DEFAULT_CLOCK_FREQUENCY_KHZ);
    }

    #[test]
    fn debug_and_symbols_flags_combine() {
        let config = match parse_args(&args(&["-d", "-s", "sym.csv", "prog.bin"])).unwrap() {
            ParsedArgs::Run(c) => c,
            _ => panic!("expected run"),
        };
        assert!(config.debug);
        assert_eq!(config.symbols_path.as_deref(), Some("sym.csv"));
    }

    #[test]
    fn clock_flag_accepts_full_widened_range() {
        let config = match parse_args(&args(&["-c", "1000000", "prog.bin"])).unwrap() {
            ParsedArgs::Run(c) => c,
            _ => panic!("expected run"),
        };
        assert_eq!(config.clock_frequency_khz, 1_000_000);
    }

    #[test]
    fn clock_flag_rejects_out_of_range() {
        assert!(matches!(
            parse_args(&args(&["-c", "0", "prog.bin"])),
            Err(ArgError::InvalidClockFrequency(_))
        ));
        assert!(matches!(
            parse_args(&args(&["-c", "2000000", "prog.bin"])),
            Err(ArgError::InvalidClockFrequency(_))
        ));
    }

    #[test]
    fn duplicated_flag_is_an_error() {
        assert!(matches!(
            parse_args(&args(&["-d", "-d", "prog.bin"])),
            Err(ArgError::DuplicatedFlag("debug"))
        ));
    }

    #[test]
    fn multiple_binary_paths_is_an_error() {
        assert!(matches!(
            parse_args(&args(&["a.bin", "b.bin"])),
            Err(ArgError::MultipleBinaryPaths)
        ));
    }

    #[test]
    fn unknown_flag_is_an_error() {
        assert!(matches!(
            parse_args(&args(&["--bogus", "prog.bin"])),
            Err(ArgError::UnknownFlag(_))
        ));
    }

    #[test]
    fn missing_symbols_value_is_an_error() {
        assert!(matches!(
            parse_args(&args(&["prog.bin", "-s"])),
            Err(ArgError::MissingValue("symbols file path"))
        ));
    }
}
