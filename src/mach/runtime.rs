use super::{Compiler, Limits, Program, Status, Vm};
use crate::error;
use crate::lang::Error;
use std::collections::VecDeque;
use tracing::{debug, trace};

/// ## Interactive shell state
///
/// Lines go in through `enter`. Output and program execution come back
/// out of `execute`, a slice of cycles at a time, so a front end can
/// stay responsive and break into a running program.

pub struct Runtime {
    limits: Limits,
    mode: Mode,
    buffer: String,
    program: Option<Program>,
    vm: Vm,
    running: bool,
    pending: VecDeque<Event>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Stopped,
    Running,
    Print(String),
    Errors(Vec<Error>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Direct,
    Program,
}

const HELP: &str = "\
help   show this list
ops    list the opcodes of the last compiled program
clear  forget the program buffer and all state
prog   enter program mode: lines are collected, not run
dir    return to direct mode: each line runs immediately
run    compile and run the collected program
";

impl Default for Runtime {
    fn default() -> Self {
        Runtime::new(&Limits::default())
    }
}

impl Runtime {
    pub fn new(limits: &Limits) -> Runtime {
        let limits = limits.clone().normalized();
        Runtime {
            mode: Mode::Direct,
            buffer: String::new(),
            program: None,
            vm: Vm::new(&limits),
            running: false,
            pending: VecDeque::new(),
            limits,
        }
    }

    pub fn is_program_mode(&self) -> bool {
        self.mode == Mode::Program
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Last successfully compiled program.
    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    pub fn enter(&mut self, line: &str) {
        let line = line.trim_end_matches(|c| c == '\n' || c == '\r');
        if line.len() > self.limits.line_len {
            self.report(error!(LineBufferOverflow;
                format!("LINE LONGER THAN {}", self.limits.line_len)));
            return;
        }
        let command = line.trim();
        trace!(command, mode = ?self.mode, "enter");
        match command {
            "help" => self.print(HELP),
            "ops" => {
                let listing = match &self.program {
                    Some(program) => program.to_string(),
                    None => Program::new(&self.limits).to_string(),
                };
                self.print(&listing);
            }
            "clear" => {
                self.buffer.clear();
                self.program = None;
                self.vm.reset();
                self.running = false;
                self.print("Cleared.\n");
            }
            "prog" => {
                self.mode = Mode::Program;
                debug!("program mode");
                self.print("Program mode.\n");
            }
            "dir" => {
                self.mode = Mode::Direct;
                debug!("direct mode");
                self.print("Direct mode.\n");
            }
            "run" => {
                let source = std::mem::take(&mut self.buffer);
                self.compile_and_run(&source);
                self.buffer = source;
            }
            "" => {}
            _ => match self.mode {
                Mode::Direct => self.compile_and_run(line),
                Mode::Program => self.append(line),
            },
        }
    }

    fn append(&mut self, line: &str) {
        if self.buffer.len() + line.len() + 1 > self.limits.program_buffer {
            self.report(error!(OutOfMemory; "PROGRAM BUFFER FULL"));
            return;
        }
        self.buffer.push_str(line);
        self.buffer.push('\n');
    }

    fn compile_and_run(&mut self, source: &str) {
        self.vm.reset();
        self.running = false;
        match Compiler::new(source, &self.limits).compile() {
            Ok(program) => {
                self.program = Some(program);
                self.running = true;
            }
            Err(error) => {
                self.program = None;
                self.report(error);
            }
        }
    }

    fn print(&mut self, text: &str) {
        self.pending.push_back(Event::Print(text.to_string()));
    }

    fn report(&mut self, error: Error) {
        self.pending.push_back(Event::Errors(vec![error]));
    }

    /// Stops a running program with BREAK.
    pub fn interrupt(&mut self) {
        if self.running {
            self.running = false;
            let error = error!(Break, @self.vm.ip());
            debug!(%error, "interrupted");
            self.report(error);
        }
    }

    /// Advances by at most `cycles` instructions. Call until `Stopped`.
    pub fn execute(&mut self, cycles: usize) -> Event {
        if let Some(event) = self.pending.pop_front() {
            return event;
        }
        if !self.running {
            return Event::Stopped;
        }
        let program = match &self.program {
            Some(program) => program,
            None => {
                self.running = false;
                return Event::Stopped;
            }
        };
        let mut text = String::new();
        let result = self.vm.execute(program, cycles, &mut text);
        let event = match result {
            Ok(Status::Running) => Event::Running,
            Ok(Status::Halted) => {
                self.running = false;
                Event::Stopped
            }
            Err(error) => {
                self.running = false;
                Event::Errors(vec![error])
            }
        };
        if text.is_empty() {
            event
        } else {
            if event != Event::Running {
                self.pending.push_back(event);
            }
            Event::Print(text)
        }
    }
}
