//! Shell completion scripts.

use clap::CommandFactory;
use clap_complete::Shell;

use crate::cli::args::Cli;
use crate::error::RepsyncError;

/// Binary name completions are generated for.
const BIN_NAME: &str = "repsync";

/// Generate the completion script for `shell`.
///
/// # Errors
///
/// Returns an error if the generated script is not valid UTF-8.
pub fn generate_completions(shell: Shell) -> Result<String, RepsyncError> {
    let mut cmd = Cli::command();
    let mut buf = Vec::new();
    clap_complete::generate(shell, &mut cmd, BIN_NAME, &mut buf);
    String::from_utf8(buf).map_err(|e| RepsyncError::Config(format!("UTF-8 error: {e}")))
}

/// How to install the script for `shell`.
#[must_use]
pub fn completion_install_instructions(shell: Shell) -> String {
    match shell {
        Shell::Bash => "# Add to ~/.bashrc:\nsource <(repsync completions bash)\n".to_string(),
        Shell::Zsh => "# Save to your fpath, then run compinit:\n\
                       repsync completions zsh > ~/.zsh/completions/_repsync\n"
            .to_string(),
        Shell::Fish => "repsync completions fish > ~/.config/fish/completions/repsync.fish\n"
            .to_string(),
        Shell::PowerShell => "# Add to $PROFILE:\n\
                              repsync completions powershell | Out-String | Invoke-Expression\n"
            .to_string(),
        _ => format!("repsync completions {shell}\n"),
    }
}
