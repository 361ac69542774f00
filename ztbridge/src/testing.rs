//! Scripted command runner for module tests: answers from a canned table and
//! records every command (and stdin payload) it was asked to run.

use std::cell::RefCell;

use host_ops_core::runner::render_command;
use host_ops_core::{CmdOutput, CommandRunner, RunError};

#[derive(Default)]
pub struct ScriptedRunner {
    responses: Vec<(String, CmdOutput)>,
    pub calls: RefCell<Vec<String>>,
    pub inputs: RefCell<Vec<(String, String)>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        ScriptedRunner::default()
    }

    /// Script a response for an exact command line; unscripted commands
    /// succeed with empty output.
    pub fn respond(mut self, command: &str, output: CmdOutput) -> Self {
        self.responses.push((command.to_string(), output));
        self
    }

    pub fn ran(&self, command: &str) -> bool {
        self.calls.borrow().iter().any(|line| line == command)
    }

    pub fn count(&self, command: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|line| line.as_str() == command)
            .count()
    }

    fn lookup(&self, line: &str) -> CmdOutput {
        self.responses
            .iter()
            .find(|(key, _)| key == line)
            .map(|(_, out)| out.clone())
            .unwrap_or_else(|| CmdOutput::ok(""))
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CmdOutput, RunError> {
        let line = render_command(program, args);
        self.calls.borrow_mut().push(line.clone());
        Ok(self.lookup(&line))
    }

    fn run_with_input(
        &self,
        program: &str,
        args: &[&str],
        input: &str,
    ) -> Result<CmdOutput, RunError> {
        let line = render_command(program, args);
        self.calls.borrow_mut().push(line.clone());
        self.inputs
            .borrow_mut()
            .push((line.clone(), input.to_string()));
        Ok(self.lookup(&line))
    }
}
