/*!
## Rust Terminal Module

Line-editing front end for the Yap shell.

*/

use crate::mach::{Event, Limits, Runtime};
use ansi_term::Style;
use linefeed::{Interface, ReadResult, Signal};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

const CYCLES: usize = 5000;

pub fn main(limits: &Limits) -> io::Result<()> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let int_moved = interrupted.clone();
    ctrlc::set_handler(move || {
        int_moved.store(true, Ordering::SeqCst);
    })
    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    main_loop(Runtime::new(limits), interrupted)
}

fn main_loop(mut runtime: Runtime, interrupted: Arc<AtomicBool>) -> io::Result<()> {
    let command = Interface::new("yap")?;
    command.set_report_signal(Signal::Interrupt, true);
    command.write_fmt(format_args!("Welcome to the Yap Language!\n"))?;

    loop {
        if interrupted.swap(false, Ordering::SeqCst) {
            runtime.interrupt();
        }
        match runtime.execute(CYCLES) {
            Event::Stopped => {
                let prompt = if runtime.is_program_mode() { "prog> " } else { "> " };
                command.set_prompt(prompt)?;
                let string = match command.read_line()? {
                    ReadResult::Input(string) => string,
                    ReadResult::Signal(Signal::Interrupt) => {
                        command.set_buffer("")?;
                        continue;
                    }
                    ReadResult::Signal(_) | ReadResult::Eof => break,
                };
                if string.trim() == "exit" {
                    debug!("exit");
                    break;
                }
                runtime.enter(&string);
                if !string.trim().is_empty() {
                    command.add_history_unique(string);
                }
            }
            Event::Errors(errors) => {
                for error in errors.iter() {
                    command.write_fmt(format_args!(
                        "{}\n",
                        Style::new().bold().paint(error.to_string())
                    ))?;
                }
            }
            Event::Running => {}
            Event::Print(s) => {
                command.write_fmt(format_args!("{}", s))?;
            }
        }
    }
    Ok(())
}
