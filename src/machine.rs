// Machine state and fetch-decode-execute cycle for the W16 toy architecture:
// 8 KiB of byte-addressed memory, a 13-bit program counter, an 8-bit
// accumulator, two memory-mapped regions (a one-byte keyboard port and a
// four-byte time window), and eight 16-bit instructions.
//
// Grounded on processor::CPU::clock_cycle/next_instruction/lookahead for the
// fetch-decode-execute shape, and on original_source/machine-state/machine-state.c
// for the (corrected, per SPEC_FULL.md's Open Questions) opcode semantics.

use crate::clock::Clock;
use crate::keyboard::KeyboardPort;

pub const MEMORY_SIZE: usize = 0x2000;
pub const IO_PORT_ADDRESS: u16 = 0x1FFF;
pub const TIME_WINDOW_START: u16 = 0x1FFB;
pub const TIME_WINDOW_END: u16 = 0x1FFE;

pub struct MachineState {
    pub memory: [u8; MEMORY_SIZE],
    pub pc: u16,
    pub a: u8,
    pub halted: bool,
    pub start_time_ms: u64,
    pub measured_time_ms: u64,
    pub idle_time_ms: u64,
}

impl MachineState {
    pub fn get_initial_state(clock: &Clock) -> Self {
        let now = clock.now_ms();
        MachineState {
            memory: [0; MEMORY_SIZE],
            pc: 0,
            a: 0,
            halted: false,
            start_time_ms: now,
            measured_time_ms: now,
            idle_time_ms: 0,
        }
    }

    fn elapsed_window(&self) -> u32 {
        self.measured_time_ms
            .wrapping_sub(self.start_time_ms)
            .wrapping_sub(self.idle_time_ms) as u32
    }
}

pub fn wrap(addr: u16) -> u16 {
    addr % MEMORY_SIZE as u16
}

/// What happened to the outside world during a step. The interpreter itself
/// performs no I/O; the runtime that drives it decides how to act on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent {
    None,
    Output(u8),
}

/// Read a byte with no side effects: no keyboard consumption, no time latch.
pub fn peek_memory(state: &MachineState, addr: u16, keyboard: &KeyboardPort) -> u8 {
    let addr = wrap(addr);
    if addr == IO_PORT_ADDRESS {
        keyboard.peek_last_char()
    } else if (TIME_WINDOW_START..=TIME_WINDOW_END).contains(&addr) {
        let window = state.elapsed_window().to_le_bytes();
        window[(addr - TIME_WINDOW_START) as usize]
    } else {
        state.memory[addr as usize]
    }
}

/// Read a byte honoring side effects: keyboard reads consume, and reading the
/// first byte of the time window re-latches it to the current monotonic time.
pub fn get_memory(state: &mut MachineState, addr: u16, keyboard: &KeyboardPort, clock: &Clock) -> u8 {
    let addr = wrap(addr);
    if addr == IO_PORT_ADDRESS {
        keyboard.get_last_char()
    } else if addr == TIME_WINDOW_START {
        state.measured_time_ms = clock.now_ms();
        peek_memory(state, addr, keyboard)
    } else {
        peek_memory(state, addr, keyboard)
    }
}

pub fn peek_instruction(state: &MachineState, addr: u16, keyboard: &KeyboardPort) -> u16 {
    let lo = peek_memory(state, addr, keyboard);
    let hi = peek_memory(state, wrap(addr.wrapping_add(1)), keyboard);
    u16::from_le_bytes([lo, hi])
}

pub fn get_instruction(
    state: &mut MachineState,
    addr: u16,
    keyboard: &KeyboardPort,
    clock: &Clock,
) -> u16 {
    let lo = get_memory(state, addr, keyboard, clock);
    let hi = get_memory(state, wrap(addr.wrapping_add(1)), keyboard, clock);
    u16::from_le_bytes([lo, hi])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Ld(u16),
    Not(u16),
    Add(u16),
    And(u16),
    St(u16),
    Jmp(u16),
    Jmn(u16),
    Jmz(u16),
}

impl Instruction {
    pub fn argument(&self) -> u16 {
        match *self {
            Instruction::Ld(x)
            | Instruction::Not(x)
            | Instruction::Add(x)
            | Instruction::And(x)
            | Instruction::St(x)
            | Instruction::Jmp(x)
            | Instruction::Jmn(x)
            | Instruction::Jmz(x) => x,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match *self {
            Instruction::Ld(_) => "LD",
            Instruction::Not(_) => "NOT",
            Instruction::Add(_) => "ADD",
            Instruction::And(_) => "AND",
            Instruction::St(_) => "ST",
            Instruction::Jmp(_) => "JMP",
            Instruction::Jmn(_) => "JMN",
            Instruction::Jmz(_) => "JMZ",
        }
    }

    /// True for the four opcodes (LD/NOT/ADD/AND) whose argument addresses an
    /// operand to read, as opposed to a jump target or a store destination.
    pub fn reads_operand(&self) -> bool {
        matches!(
            self,
            Instruction::Ld(_) | Instruction::Not(_) | Instruction::Add(_) | Instruction::And(_)
        )
    }
}

pub fn decode(word: u16) -> Instruction {
    let opcode = word >> 13;
    let argument = word & 0x1FFF;
    match opcode {
        0 => Instruction::Ld(argument),
        1 => Instruction::Not(argument),
        2 => Instruction::Add(argument),
        3 => Instruction::And(argument),
        4 => Instruction::St(argument),
        5 => Instruction::Jmp(argument),
        6 => Instruction::Jmn(argument),
        7 => Instruction::Jmz(argument),
        _ => unreachable!("3-bit opcode field"),
    }
}

pub fn encode(instruction: Instruction) -> u16 {
    let opcode: u16 = match instruction {
        Instruction::Ld(_) => 0,
        Instruction::Not(_) => 1,
        Instruction::Add(_) => 2,
        Instruction::And(_) => 3,
        Instruction::St(_) => 4,
        Instruction::Jmp(_) => 5,
        Instruction::Jmn(_) => 6,
        Instruction::Jmz(_) => 7,
    };
    (opcode << 13) | (instruction.argument() & 0x1FFF)
}

/// Execute exactly one instruction. Never fails: every address is in range by
/// construction (13-bit argument field, 13-bit memory).
pub fn step(state: &mut MachineState, keyboard: &KeyboardPort, clock: &Clock) -> StepEvent {
    let word = get_instruction(state, state.pc, keyboard, clock);
    let instruction = decode(word);
    let pc_before = state.pc;
    let argument = instruction.argument();

    let mut event = StepEvent::None;

    if instruction.reads_operand() {
        let operand = get_memory(state, argument, keyboard, clock);
        match instruction {
            Instruction::Ld(_) => state.a = operand,
            Instruction::Not(_) => state.a = !operand,
            Instruction::Add(_) => state.a = state.a.wrapping_add(operand),
            Instruction::And(_) => state.a &= operand,
            _ => unreachable!(),
        }
        state.pc = wrap(pc_before.wrapping_add(2));
    } else {
        match instruction {
            Instruction::St(_) => {
                if argument == IO_PORT_ADDRESS {
                    event = StepEvent::Output(state.a);
                } else {
                    state.memory[wrap(argument) as usize] = state.a;
                }
                state.pc = wrap(pc_before.wrapping_add(2));
            }
            Instruction::Jmp(_) => {
                if argument == pc_before {
                    state.halted = true;
                } else {
                    state.pc = wrap(argument);
                }
            }
            Instruction::Jmn(_) => {
                state.pc = if state.a & 0x80 != 0 {
                    wrap(argument)
                } else {
                    wrap(pc_before.wrapping_add(2))
                };
            }
            Instruction::Jmz(_) => {
                state.pc = if state.a == 0 {
                    wrap(argument)
                } else {
                    wrap(pc_before.wrapping_add(2))
                };
            }
            _ => unreachable!(),
        }
    }

    event
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> (MachineState, KeyboardPort, Clock) {
        let clock = Clock::new();
        (MachineState::get_initial_state(&clock), KeyboardPort::new(), clock)
    }

    #[test]
    fn decode_roundtrips_through_encode() {
        for opcode in 0u16..8 {
            let argument = 0x1234 & 0x1FFF;
            let word = (opcode << 13) | argument;
            let instr = decode(word);
            assert_eq!(encode(instr), word);
        }
    }

    #[test]
    fn add_wraps_on_overflow() {
        let (mut state, kb, clock) = fresh();
        state.a = 0xFF;
        state.memory[0x10] = 0x01;
        let word = encode(Instruction::Add(0x10));
        let bytes = word.to_le_bytes();
        state.memory[0] = bytes[0];
        state.memory[1] = bytes[1];
        step(&mut state, &kb, &clock);
        assert_eq!(state.a, 0x00);
    }

    #[test]
    fn not_inverts_bits() {
        let (mut state, kb, clock) = fresh();
        state.memory[0x10] = 0xAA;
        let word = encode(Instruction::Not(0x10));
        let bytes = word.to_le_bytes();
        state.memory[0] = bytes[0];
        state.memory[1] = bytes[1];
        step(&mut state, &kb, &clock);
        assert_eq!(state.a, 0x55);
    }

    #[test]
    fn jmn_branches_on_sign_bit_only() {
        let (mut state, kb, clock) = fresh();
        let word = encode(Instruction::Jmn(0x100));
        let bytes = word.to_le_bytes();
        state.memory[0] = bytes[0];
        state.memory[1] = bytes[1];
        state.a = 0x7F;
        step(&mut state, &kb, &clock);
        assert_eq!(state.pc, 2, "0x7F must not branch");

        state.pc = 0;
        state.a = 0x80;
        step(&mut state, &kb, &clock);
        assert_eq!(state.pc, 0x100, "0x80 must branch");
    }

    #[test]
    fn jmz_branches_iff_accumulator_zero() {
        let (mut state, kb, clock) = fresh();
        let word = encode(Instruction::Jmz(0x100));
        let bytes = word.to_le_bytes();
        state.memory[0] = bytes[0];
        state.memory[1] = bytes[1];
        state.a = 1;
        step(&mut state, &kb, &clock);
        assert_eq!(state.pc, 2);

        state.pc = 0;
        state.a = 0;
        step(&mut state, &kb, &clock);
        assert_eq!(state.pc, 0x100);
    }

    #[test]
    fn jmp_to_self_halts_without_moving_pc() {
        let (mut state, kb, clock) = fresh();
        let word = encode(Instruction::Jmp(0));
        let bytes = word.to_le_bytes();
        state.memory[0] = bytes[0];
        state.memory[1] = bytes[1];
        step(&mut state, &kb, &clock);
        assert!(state.halted);
        assert_eq!(state.pc, 0);
    }

    #[test]
    fn jmp_elsewhere_does_not_halt() {
        let (mut state, kb, clock) = fresh();
        let word = encode(Instruction::Jmp(0x50));
        let bytes = word.to_le_bytes();
        state.memory[0] = bytes[0];
        state.memory[1] = bytes[1];
        step(&mut state, &kb, &clock);
        assert!(!state.halted);
        assert_eq!(state.pc, 0x50);
    }

    #[test]
    fn st_to_io_port_emits_output_without_touching_memory() {
        let (mut state, kb, clock) = fresh();
        state.a = b'A';
        let word = encode(Instruction::St(IO_PORT_ADDRESS));
        let bytes = word.to_le_bytes();
        state.memory[0] = bytes[0];
        state.memory[1] = bytes[1];
        let event = step(&mut state, &kb, &clock);
        assert_eq!(event, StepEvent::Output(b'A'));
        assert_eq!(state.memory[IO_PORT_ADDRESS as usize], 0);
    }

    #[test]
    fn pc_wraps_at_fetch_boundary() {
        let (state, kb, _clock) = fresh();
        // PC = 0x1FFE: low byte at 0x1FFE (plain RAM), high byte at 0x1FFF (keyboard port).
        let word = peek_instruction(&state, 0x1FFE, &kb);
        assert_eq!(word & 0xFF, 0);
    }

    #[test]
    fn peek_memory_is_idempotent_and_side_effect_free() {
        let (state, kb, _clock) = fresh();
        let first = peek_memory(&state, 0x10, &kb);
        let second = peek_memory(&state, 0x10, &kb);
        assert_eq!(first, second);
    }

    #[test]
    fn get_memory_matches_peek_away_from_special_addresses() {
        let (mut state, kb, clock) = fresh();
        state.memory[0x42] = 7;
        assert_eq!(
            get_memory(&mut state, 0x42, &kb, &clock),
            peek_memory(&state, 0x42, &kb)
        );
    }
}
