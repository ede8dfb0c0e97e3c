// The interactive debug runtime: pause latch driven by SIGINT, breakpoint
// bitmap, and the prompt loop built on top of commands.rs. Grounded on
// original_source/src/debug-runtime/debug-runtime.c's runDebug/handleSigInt/
// interactivePrompt, redesigned per this implementation's cleaner "always
// step once per iteration after any pause handling" loop (the source's
// nested if/else around `step` collapses the breakpoint and step-once cases
// into one path here). The pause flag itself mirrors
// processor::Debugger::update's pause/resume-around-a-flag shape, made
// process-wide and atomic since it must also be touched by a signal handler.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::clock::Clock;
use crate::commands::{self, Command, HELP_TEXT};
use crate::expr::{parse_address, parse_range};
use crate::keyboard::KeyboardPort;
use crate::machine::{self, MachineState, MEMORY_SIZE, StepEvent};
use crate::symbols::SymbolTable;

static PAUSE_REQUESTED: AtomicBool = AtomicBool::new(true);

extern "C" fn handle_sigint(_signum: libc::c_int) {
    if PAUSE_REQUESTED.load(Ordering::SeqCst) {
        println!("\nQuitting.");
        std::process::exit(0);
    } else {
        PAUSE_REQUESTED.store(true, Ordering::SeqCst);
    }
}

fn install_sigint_handler() {
    unsafe {
        libc::signal(libc::SIGINT, handle_sigint as libc::sighandler_t);
    }
}

pub struct DebugRuntime {
    breakpoints: Vec<bool>,
    symbols: SymbolTable,
}

impl DebugRuntime {
    pub fn new(symbols: SymbolTable) -> Self {
        DebugRuntime {
            breakpoints: vec![false; MEMORY_SIZE],
            symbols,
        }
    }

    pub fn run(&mut self, state: &mut MachineState) -> io::Result<()> {
        println!(
            "Starting in debug mode. Type \"h\" to list all commands or \"c\" to begin simulation. Press ^C during simulation to pause."
        );

        install_sigint_handler();

        let mut keyboard = KeyboardPort::new();
        let clock = Clock::new();
        keyboard.start_character_input();

        let mut stepping = false;
        PAUSE_REQUESTED.store(true, Ordering::SeqCst);

        loop {
            let should_pause =
                PAUSE_REQUESTED.load(Ordering::SeqCst) || stepping || self.breakpoints[state.pc as usize];

            if should_pause {
                PAUSE_REQUESTED.store(true, Ordering::SeqCst);
                stepping = false;

                let idle_start = clock.now_ms();
                keyboard.end_character_input();
                self.interactive_prompt(state, &keyboard, &mut stepping)?;
                keyboard.start_character_input();
                state.idle_time_ms += clock.now_ms() - idle_start;

                PAUSE_REQUESTED.store(false, Ordering::SeqCst);
            }

            if let StepEvent::Output(byte) = machine::step(state, &keyboard, &clock) {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle.write_all(&[byte])?;
                handle.flush()?;
            }

            if state.halted {
                break;
            }
        }

        keyboard.end_character_input();
        println!("Unconditional infinite loop detected. Ending simulation.");
        Ok(())
    }

    /// Runs the prompt until a command resumes simulation (`c` or `s`).
    /// Sets `stepping` when the resuming command was `s`.
    fn interactive_prompt(
        &mut self,
        state: &mut MachineState,
        keyboard: &KeyboardPort,
        stepping: &mut bool,
    ) -> io::Result<()> {
        print!("Paused.   ");
        self.print_registers(state, keyboard);

        let stdin = io::stdin();
        loop {
            print!("> ");
            io::stdout().flush()?;
            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                *stepping = false;
                return Ok(());
            }

            match commands::parse_command(&line) {
                Ok(Command::Help) => println!("{}", HELP_TEXT),
                Ok(Command::ListRegisters) => self.print_registers(state, keyboard),
                Ok(Command::ListLabels) => self.print_labels(),
                Ok(Command::List(arg)) => {
                    self.print_listing(state, keyboard, arg.as_deref().unwrap_or(""), state.pc)
                }
                Ok(Command::ListBreakpoints) => self.print_breakpoints(state, keyboard),
                Ok(Command::AddBreakpoint(arg)) => self.add_breakpoint(state.pc, arg.as_deref()),
                Ok(Command::DeleteBreakpoint(arg)) => self.delete_breakpoint(state.pc, arg.as_deref()),
                Ok(Command::DeleteAllBreakpoints) => self.delete_all_breakpoints(),
                Ok(Command::Continue) => {
                    *stepping = false;
                    return Ok(());
                }
                Ok(Command::Step) => {
                    *stepping = true;
                    return Ok(());
                }
                Ok(Command::Quit) => {
                    println!("Quitting.");
                    std::process::exit(0);
                }
                Err(err) => println!("{}", err),
            }
        }
    }

    fn print_registers(&self, state: &MachineState, keyboard: &KeyboardPort) {
        let mut a_repr = format!("0x{:02X} ({})", state.a, state.a);
        if state.a <= 0x7F {
            a_repr.push_str(&format!(" {}", commands::printable_char_form(state.a)));
        }
        let pc_label = match self.symbols.label(state.pc) {
            Some(label) => format!(" ({})", label),
            None => String::new(),
        };
        println!(
            "A = {}   PC = 0x{:04X}{}   instruction = {}",
            a_repr,
            state.pc,
            pc_label,
            commands::format_instruction(state, keyboard, &self.symbols, state.pc)
        );
    }

    fn print_labels(&self) {
        let mut any = false;
        for (addr, label) in self.symbols.labels_iter() {
            println!("0x{:04X} {}", addr, label);
            any = true;
        }
        if !any {
            println!("No labels defined");
        }
    }

    fn print_listing(&self, state: &MachineState, keyboard: &KeyboardPort, arg: &str, pc: u16) {
        let (start, end) = if arg.is_empty() {
            (pc.saturating_sub(3), pc.saturating_add(3).min((MEMORY_SIZE - 1) as u16))
        } else {
            match parse_range(arg, pc, &self.symbols) {
                Ok(range) => range,
                Err(err) => {
                    println!("{}", err);
                    return;
                }
            }
        };
        let label_width = self.label_width_in(start, end);
        for (i, addr) in (start..=end).enumerate() {
            let row = commands::format_listing_row(
                state,
                keyboard,
                &self.symbols,
                &self.breakpoints,
                pc,
                addr,
                i == 0,
            );
            println!("{}", commands::render_listing_row(&row, label_width));
        }
    }

    fn print_breakpoints(&self, state: &MachineState, keyboard: &KeyboardPort) {
        let addresses: Vec<u16> = (0..MEMORY_SIZE as u16).filter(|&a| self.breakpoints[a as usize]).collect();
        if addresses.is_empty() {
            println!("No breakpoints set");
            return;
        }
        let label_width = addresses
            .iter()
            .filter_map(|&a| self.symbols.label(a))
            .map(str::len)
            .max()
            .unwrap_or(0);
        for (i, addr) in addresses.iter().enumerate() {
            let row = commands::format_listing_row(
                state,
                keyboard,
                &self.symbols,
                &self.breakpoints,
                state.pc,
                *addr,
                i == 0,
            );
            println!("{}", commands::render_listing_row(&row, label_width));
        }
    }

    fn label_width_in(&self, start: u16, end: u16) -> usize {
        (start..=end)
            .filter_map(|a| self.symbols.label(a))
            .map(str::len)
            .max()
            .unwrap_or(0)
    }

    fn add_breakpoint(&mut self, pc: u16, arg: Option<&str>) {
        match parse_address(arg.unwrap_or(""), pc, &self.symbols) {
            Ok(addr) => {
                self.breakpoints[addr as usize] = true;
                println!("Breakpoint set at 0x{:04X}.", addr);
            }
            Err(err) => println!("{}", err),
        }
    }

    fn delete_breakpoint(&mut self, pc: u16, arg: Option<&str>) {
        match parse_address(arg.unwrap_or(""), pc, &self.symbols) {
            Ok(addr) => {
                self.breakpoints[addr as usize] = false;
                println!("Breakpoint at 0x{:04X} removed.", addr);
            }
            Err(err) => println!("{}", err),
        }
    }

    fn delete_all_breakpoints(&mut self) {
        let count = self.breakpoints.iter().filter(|&&b| b).count();
        for b in self.breakpoints.iter_mut() {
            *b = false;
        }
        println!("Removed {} breakpoint(s).", count);
    }
}
