use std::io::{self, BufRead, StdinLock, Stdout, Write};

use similar::TextDiff;

use crate::model::ProposedEdit;

const RULE_WIDTH: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmResponse {
    ApproveOne,
    SkipOne,
    ApproveAll,
}

/// Decides whether a proposed edit is submitted. Never consulted for skips.
pub trait ConfirmEdits {
    fn confirm(&mut self, edit: &ProposedEdit) -> io::Result<ConfirmResponse>;
}

/// Non-interactive mode: everything is approved up front.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl ConfirmEdits for AutoApprove {
    fn confirm(&mut self, _edit: &ProposedEdit) -> io::Result<ConfirmResponse> {
        Ok(ConfirmResponse::ApproveAll)
    }
}

/// Shows a diff of each edit and reads `y`/`n`/`a` from the terminal.
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompt<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> ConfirmEdits for TerminalPrompt<R, W> {
    fn confirm(&mut self, edit: &ProposedEdit) -> io::Result<ConfirmResponse> {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(self.output, "\n{rule}")?;
        writeln!(self.output, "Target: {}", edit.after.title)?;
        writeln!(self.output, "{rule}")?;
        write!(
            self.output,
            "{}",
            render_diff(&edit.before.content, &edit.after.content)
        )?;
        writeln!(self.output, "{rule}")?;
        writeln!(
            self.output,
            "Options: [y]es / [n]o / [a]ll (approve all remaining)"
        )?;
        write!(self.output, "Confirm edit? [Y/n/a]: ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(ConfirmResponse::SkipOne);
        }
        let response = parse_response(&line);
        match response {
            ConfirmResponse::ApproveAll => {
                writeln!(self.output, "Auto-approving all remaining edits.")?
            }
            ConfirmResponse::SkipOne => writeln!(self.output, "Edit skipped.")?,
            ConfirmResponse::ApproveOne => {}
        }
        Ok(response)
    }
}

/// Empty input and `y`/`yes` approve, `a`/`all` approves the rest of the run,
/// anything else skips.
pub fn parse_response(input: &str) -> ConfirmResponse {
    match input.trim().to_lowercase().as_str() {
        "" | "y" | "yes" => ConfirmResponse::ApproveOne,
        "a" | "all" => ConfirmResponse::ApproveAll,
        _ => ConfirmResponse::SkipOne,
    }
}

/// Unified diff with no context lines.
pub fn render_diff(before: &str, after: &str) -> String {
    TextDiff::from_lines(before, after)
        .unified_diff()
        .context_radius(0)
        .header("before", "after")
        .to_string()
}
