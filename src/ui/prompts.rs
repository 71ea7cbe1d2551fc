// UI prompts and user interaction module

use colored::Colorize;

/// Ask for a yes/no answer. Defaults to "no" so a stray Enter never kills
/// anything.
pub fn confirm(message: &str) -> anyhow::Result<bool> {
    let answer = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()?;
    Ok(answer)
}

/// Display a warning message
pub fn warn(message: &str) {
    println!("{}", format!("Warning: {}", message).yellow().bold());
}

/// Display a success message
pub fn success(message: &str) {
    println!("{}", message.green().bold());
}

pub fn dimmed(message: &str) {
    println!("{}", message.dimmed());
}
