// Debugger command parsing and the `l`/`lb`/`a`/`r` listing formatters.
// Grounded on original_source/src/debug-runtime/debug-runtime.c's
// parseCommand/printInstruction/executeHelpCommand for the dispatch shape and
// formatting rules; breakpoint/PC row coloring mirrors
// processor::Disassembly's Display impl, which uses termion::color the same
// way (red for a breakpoint marker, green for the current instruction).

use std::fmt;

use termion::color;

use crate::keyboard::KeyboardPort;
use crate::machine::{decode, peek_instruction, peek_memory, MachineState};
use crate::symbols::{DataType, SymbolTable};

#[derive(Debug)]
pub enum Command {
    Help,
    List(Option<String>),
    ListBreakpoints,
    ListLabels,
    ListRegisters,
    AddBreakpoint(Option<String>),
    DeleteBreakpoint(Option<String>),
    DeleteAllBreakpoints,
    Continue,
    Step,
    Quit,
}

#[derive(Debug)]
pub enum CommandError {
    Unrecognized(String),
    TakesNoArguments(char),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Unrecognized(line) => write!(
                f,
                "Unrecognized command \"{}\". Type \"h\" to list all commands.",
                line.trim()
            ),
            CommandError::TakesNoArguments(keyword) => write!(
                f,
                "Command \"{}\" doesn't take any arguments. Type \"h\" to list all commands.",
                keyword
            ),
        }
    }
}

pub const HELP_TEXT: &str = "Commands:\n\
h     - prints this message\n\
l     - lists memory values from PC-3 to PC+3\n\
l X   - lists the memory value of X\n\
l X:Y - lists memory values from X to Y\n\
lb    - lists all breakpoints\n\
a     - lists all registered label names and their values\n\
r     - lists register A value, program counter value, and instruction at PC\n\
b     - sets a breakpoint at PC\n\
b X   - sets a breakpoint at X\n\
d     - deletes a breakpoint at PC\n\
d X   - deletes a breakpoint at X\n\
da    - deletes all breakpoints\n\
c     - continues simulation\n\
s     - steps simulation (executes one instruction and pauses)\n\
q     - quits\n\
For a command argument value you may use one of the following:\n\
- a hexadecimal number starting with \"0x\",\n\
- PC,\n\
- PC+C or PC-C where C is a decimal number constant,\n\
- a label name,\n\
- L+C or L-C where L is a label name and C is a decimal number constant.\n";

/// Splits off the one-letter (or two-letter, for `lb`/`da`) keyword and
/// whatever follows, the way the source tests `command[1]` for end-of-token.
fn split_keyword(line: &str) -> (&str, &str) {
    let trimmed = line.trim_start();
    let two_letter = trimmed.len() >= 2 && trimmed.as_bytes()[1].is_ascii_alphabetic();
    if two_letter {
        let lowered = &trimmed[..2.min(trimmed.len())];
        if lowered.eq_ignore_ascii_case("lb") || lowered.eq_ignore_ascii_case("da") {
            return trimmed.split_at(2);
        }
    }
    if trimmed.is_empty() {
        ("", "")
    } else {
        trimmed.split_at(1)
    }
}

fn ensure_no_argument(keyword: &str, rest: &str) -> Result<(), CommandError> {
    if rest.trim().is_empty() {
        Ok(())
    } else {
        Err(CommandError::TakesNoArguments(
            keyword.chars().next().unwrap_or('?'),
        ))
    }
}

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let (keyword, rest) = split_keyword(line);
    let lower = keyword.to_ascii_lowercase();
    match lower.as_str() {
        "h" => {
            ensure_no_argument(&lower, rest)?;
            Ok(Command::Help)
        }
        "l" => Ok(Command::List(non_empty(rest))),
        "lb" => {
            ensure_no_argument(&lower, rest)?;
            Ok(Command::ListBreakpoints)
        }
        "a" => {
            ensure_no_argument(&lower, rest)?;
            Ok(Command::ListLabels)
        }
        "r" => {
            ensure_no_argument(&lower, rest)?;
            Ok(Command::ListRegisters)
        }
        "b" => Ok(Command::AddBreakpoint(non_empty(rest))),
        "d" => Ok(Command::DeleteBreakpoint(non_empty(rest))),
        "da" => {
            ensure_no_argument(&lower, rest)?;
            Ok(Command::DeleteAllBreakpoints)
        }
        "c" => {
            ensure_no_argument(&lower, rest)?;
            Ok(Command::Continue)
        }
        "s" => {
            ensure_no_argument(&lower, rest)?;
            Ok(Command::Step)
        }
        "q" => {
            ensure_no_argument(&lower, rest)?;
            Ok(Command::Quit)
        }
        _ => Err(CommandError::Unrecognized(line.to_string())),
    }
}

fn non_empty(rest: &str) -> Option<String> {
    let trimmed = rest.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// One of the debugger's printable/control-name renderings, used both for
/// the accumulator display and for `char`-typed memory cells.
pub fn printable_char_form(byte: u8) -> String {
    match byte {
        0x00 => "NUL".to_string(),
        0x09 => "TAB".to_string(),
        0x0A => "LF".to_string(),
        0x1B => "ESC".to_string(),
        0x7F => "DEL".to_string(),
        0x20..=0x7E => format!("'{}'", byte as char),
        _ => format!("0x{:02X}", byte),
    }
}

fn abbreviate_label(label: &str) -> String {
    if label.len() > 8 {
        format!("{}...", &label[..5])
    } else {
        label.to_string()
    }
}

fn format_value(value: u8, data_type: DataType) -> String {
    match data_type {
        DataType::Char => printable_char_form(value),
        DataType::Int => format!("{}", value),
        DataType::Instruction | DataType::None => format!("0x{:02X}", value),
    }
}

/// Renders the decoded instruction at `addr` the way `r`/`l` do: mnemonic,
/// then the argument (label if one exists, else a hex address), then for
/// operand-reading opcodes the resolved `M[ARG] = VALUE` tail.
pub fn format_instruction(
    state: &MachineState,
    keyboard: &KeyboardPort,
    symbols: &SymbolTable,
    addr: u16,
) -> String {
    let word = peek_instruction(state, addr, keyboard);
    let instruction = decode(word);
    let argument = instruction.argument();
    let label = symbols.label(argument);
    let full_arg_text = match label {
        Some(label) => label.to_string(),
        None => format!("0x{:04X}", argument),
    };

    let mut out = format!("{} {}", instruction.mnemonic(), full_arg_text);

    if instruction.reads_operand() {
        let operand_text = match label {
            Some(label) => abbreviate_label(label),
            None => format!("0x{:04X}", argument),
        };
        let value = peek_memory(state, argument, keyboard);
        out.push_str(&format!(
            " M[{}] = {}",
            operand_text,
            format_value(value, symbols.data_type(argument))
        ));
    }
    out
}

/// One row of an `l`/`lb` listing.
pub struct ListingRow {
    pub is_pc: bool,
    pub is_breakpoint: bool,
    pub address: u16,
    pub label: Option<String>,
    pub text: String,
}

pub fn format_listing_row(
    state: &MachineState,
    keyboard: &KeyboardPort,
    symbols: &SymbolTable,
    breakpoints: &[bool],
    pc: u16,
    addr: u16,
    is_first_row: bool,
) -> ListingRow {
    let is_pc = addr == pc;
    let is_breakpoint = breakpoints[addr as usize];
    let label = symbols.label(addr).map(str::to_string);
    let data_type = symbols.data_type(addr);

    let text = match data_type {
        DataType::Instruction => format_instruction(state, keyboard, symbols, addr),
        DataType::Char => printable_char_form(peek_memory(state, addr, keyboard)),
        DataType::Int => format!("{}", peek_memory(state, addr, keyboard)),
        DataType::None => {
            let previous_is_instruction = addr > 0 && symbols.data_type(addr - 1) == DataType::Instruction;
            let value = peek_memory(state, addr, keyboard);
            if previous_is_instruction && !(is_first_row || label.is_some()) {
                String::new()
            } else if previous_is_instruction {
                let prior = decode(peek_instruction(state, addr.wrapping_sub(1), keyboard));
                format!(
                    "0x{:02X} (second byte of a {} instruction)",
                    value,
                    prior.mnemonic()
                )
            } else {
                format!("0x{:02X}", value)
            }
        }
    };

    ListingRow {
        is_pc,
        is_breakpoint,
        address: addr,
        label,
        text,
    }
}

pub fn render_listing_row(row: &ListingRow, label_width: usize) -> String {
    let pc_marker = if row.is_pc {
        format!("{g}PC{n}", g = color::Fg(color::Green), n = color::Fg(color::Reset))
    } else {
        "  ".to_string()
    };
    let bp_marker = if row.is_breakpoint {
        format!("{r}B{n}", r = color::Fg(color::Red), n = color::Fg(color::Reset))
    } else {
        " ".to_string()
    };
    let label = row.label.as_deref().unwrap_or("");
    format!(
        "{pc} {bp} 0x{addr:04X} {label:<width$} {sep} {text}",
        pc = pc_marker,
        bp = bp_marker,
        addr = row.address,
        label = label,
        width = label_width,
        sep = if label.is_empty() { " " } else { ":" },
        text = row.text,
    )
}
